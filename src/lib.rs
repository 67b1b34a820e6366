//! # livetree Architecture
//!
//! livetree is a **display-agnostic view-model library**: it mirrors a live,
//! self-expiring discovery/telemetry feed as ordered trees that any
//! list/tree widget can bind to. It owns no widgets, no wire protocol and no
//! merge logic — just the indexed shape of the data and the change protocol
//! that keeps a display surface consistent with it.
//!
//! ## The layers
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Host display surface (any tree/list widget toolkit)          │
//! │  - navigates by TreePath, queries data(path, column, role)    │
//! │  - re-renders on TreeChange notifications                     │
//! └───────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  View models (system_tree, components_tree, points_table)     │
//! │  - ordered, address-indexed node trees                        │
//! │  - apply(FeedEvent) is the only mutation entry point          │
//! │  - emit rows-inserted / rows-removed / data-changed           │
//! └───────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  DataSource trait (source.rs)                                 │
//! │  - the external discovery/merge layer, read-only              │
//! │  - MemorySource (memory.rs) for tests and replay              │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key principles
//!
//! - **Displayed values are never cached.** Every `data()` call queries the
//!   `DataSource` at that instant; the trees only cache *structure*.
//! - **Expiry is decoration, not structure.** An entity that goes quiet
//!   stays in the tree and renders flagged; only an explicit removal event
//!   deletes nodes.
//! - **Feed inconsistencies are tolerated.** Duplicate discoveries,
//!   removals of unknowns and cross-scope events are silent no-ops — a live
//!   feed repeats and reorders itself, and that must never take the host
//!   down.
//! - **Single-threaded and reactive.** Trees mutate only inside `apply()`,
//!   reads are cheap and side-effect free, and nothing blocks or suspends.
//!
//! See each module's documentation for the details of its contract.

pub mod address;
pub mod components_tree;
pub mod error;
pub mod memory;
pub mod node;
pub mod notify;
pub mod path;
pub mod points_table;
pub mod source;
pub mod system_tree;

pub use address::{Address, Axis, ComponentId, FieldKind, GroupId, Level, PointId, Quantity, SourceId, SystemId};
pub use components_tree::ComponentsTree;
pub use error::{Result, TreeError};
pub use memory::MemorySource;
pub use node::{
    AxisDetailKind, CellValue, ComponentField, DetailKind, Node, NodeId, NodeKind, Role,
    COLUMN_DETAILS, COLUMN_NAME, UNKNOWN_VALUE,
};
pub use notify::{ChangeNotifier, Recorder, TreeChange};
pub use path::TreePath;
pub use points_table::PointsTable;
pub use source::{
    ComponentInfo, ComponentKind, DataSource, FeedEvent, FieldSample, ModuleDescription,
    ModuleIdent,
};
pub use system_tree::SystemTree;
