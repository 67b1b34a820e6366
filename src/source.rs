//! # The data source seam
//!
//! [`DataSource`] is the crate's only view of the outside world: the
//! protocol/merge layer that discovers components, tracks systems, groups and
//! points, decides which source's value currently wins, and ages entries out.
//! This trait handles the "what is live right now" questions, while the trees
//! handle the "where does it sit and what changed" questions.
//!
//! Every accessor is synchronous, cheap and side-effect free — `data()` calls
//! them during display repaints, potentially very frequently. Nothing here
//! may block on I/O; the adapter is expected to answer from its own in-memory
//! merge state.
//!
//! Event delivery is inverted relative to a callback registry: the host owns
//! the feed's event loop and forwards each [`FeedEvent`] into
//! [`crate::SystemTree::apply`] / [`crate::ComponentsTree::apply`]. That
//! keeps this trait object-safe and read-only, and keeps all tree mutation
//! inside a single caller as the concurrency model requires.

use crate::address::{
    Address, Axis, ComponentId, FieldKind, GroupId, Level, PointId, Quantity, SourceId, SystemId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// One merged value for a spatial field, as decided by the external merge
/// layer. `source` and `priority` identify the winning source; the tree
/// renders them as opaque display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSample {
    pub value: f64,
    pub unit: String,
    pub timestamp_ms: u64,
    pub source: SourceId,
    pub priority: u8,
}

/// What a component declares itself to be.
///
/// Consumers don't advertise system lists; the components tree renders their
/// system row as "N/A" and ignores system events for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentKind {
    Producer,
    Consumer,
}

/// Identity of a protocol module a component advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleIdent {
    pub manufacturer_id: u16,
    pub module_number: u16,
}

/// Human-readable names for a [`ModuleIdent`], looked up by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescription {
    pub manufacturer: String,
    pub name: String,
}

/// The declared fields of a discovered component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub name: String,
    pub kind: ComponentKind,
    pub ip: IpAddr,
    pub modules: Vec<ModuleIdent>,
}

/// A discrete notification from the feed.
///
/// Events identify entities by their minimal key only; receivers re-query the
/// adapter for everything else. Trees ignore events outside their scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEvent {
    GroupDiscovered { system: SystemId, group: GroupId },
    GroupRemoved { system: SystemId, group: GroupId },
    PointDiscovered(Address),
    PointRemoved(Address),
    PointUpdated(Address),
    /// A point crossed the expiry threshold. Display-only: receivers refresh
    /// decorations, no structure changes.
    PointExpired(Address),
    ComponentDiscovered(ComponentId),
    /// A component went silent past its timeout. Depending on
    /// [`DataSource::remove_lost_components`] this either flags or deletes it.
    ComponentLost(ComponentId),
    /// A component's declared fields (name, type, IP) changed.
    ComponentUpdated(ComponentId),
    SystemAdvertised(ComponentId),
    SystemWithdrawn(ComponentId),
    ModuleListChanged(ComponentId),
}

/// Abstract interface to the live discovery/merge layer.
///
/// Implementations answer from current merge state; the trees never cache a
/// displayed value, so every call reflects this instant. Expiry is a
/// predicate here, never a structural fact: an expired entity still
/// enumerates until the feed explicitly removes it.
pub trait DataSource {
    // --- Enumeration (used to seed trees at construction) ---

    /// Currently known groups of a system, ascending.
    fn groups(&self, system: SystemId) -> Vec<GroupId>;

    /// Currently known points of a group, ascending.
    fn points(&self, system: SystemId, group: GroupId) -> Vec<PointId>;

    /// Currently known components, in discovery order.
    fn components(&self) -> Vec<ComponentId>;

    // --- Liveness ---

    /// Whether the entity at `address`, taken at `level`, has gone stale.
    fn is_expired(&self, address: Address, level: Level) -> bool;

    fn is_component_expired(&self, component: ComponentId) -> bool;

    // --- Point details ---

    fn point_name(&self, address: Address) -> String;

    fn point_last_seen(&self, address: Address) -> Option<DateTime<Utc>>;

    /// The point this point's values are relative to, if any.
    fn reference_frame(&self, address: Address) -> Option<Address>;

    // --- Values ---

    /// The winning sample for one spatial field, or `None` if no source has
    /// supplied it yet.
    fn sample(
        &self,
        address: Address,
        quantity: Quantity,
        field: FieldKind,
        axis: Axis,
    ) -> Option<FieldSample>;

    /// All live samples for one spatial field, winner first. Used for the
    /// "other sources" tooltip.
    fn samples(
        &self,
        address: Address,
        quantity: Quantity,
        field: FieldKind,
        axis: Axis,
    ) -> Vec<FieldSample>;

    // --- Components ---

    fn component(&self, component: ComponentId) -> Option<ComponentInfo>;

    /// System numbers the component advertises, ascending. Empty for
    /// consumers.
    fn advertised_systems(&self, component: ComponentId) -> Vec<SystemId>;

    fn module_description(&self, module: ModuleIdent) -> ModuleDescription;

    // --- Policy ---

    /// Whether [`FeedEvent::ComponentLost`] deletes the component subtree
    /// (`true`) or merely leaves it flagged expired (`false`).
    fn remove_lost_components(&self) -> bool;
}
