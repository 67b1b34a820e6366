//! # Nodes and the arena
//!
//! A [`Node`] is one position in a view-model tree: a kind tag, the
//! [`Address`] (or component id) it represents, a back-reference to its
//! parent and an ordered map of children. Nodes live in an [`Arena`] owned by
//! their tree — parents hold child ids, never pointers, so destroying a node
//! frees its whole subtree without reference cycles.
//!
//! ## Ordering
//!
//! `children` is a `BTreeMap<u64, NodeId>` keyed by a numeric sort key, so
//! iteration order is key order regardless of insertion order. Group and
//! point nodes use their numeric id as the key; fixed-schema nodes (details,
//! quantity groupings, axes) use their declaration ordinal; component and
//! list-item nodes use a monotonic arrival sequence.
//!
//! ## Rows are computed, never stored
//!
//! A node's row is its current position among its parent's children, found by
//! identity. Removing an earlier sibling shifts every later row, so rows are
//! recomputed at query/notification time — caching one on the node would go
//! stale silently.
//!
//! ## `data()`
//!
//! [`Node::data`] answers display queries by exhaustive dispatch on the kind,
//! querying the [`DataSource`] live at call time; nothing is cached. Queries
//! that fall outside any recognized branch come back as [`CellValue::None`]
//! or the `"???"` sentinel — never a panic, since a repaint must not be able
//! to take the host down.

use crate::address::{Address, Axis, ComponentId, FieldKind, Level, Quantity};
use crate::path::TreePath;
use crate::source::{ComponentKind, DataSource, FieldSample};
use std::collections::BTreeMap;

/// Sentinel rendered when a query does not match any recognized branch.
pub const UNKNOWN_VALUE: &str = "???";

/// Default tooltip for rows of the point subtree.
pub const POINT_TOOLTIP: &str = "Double click point to open history chart";

/// Fixed detail rows of a point, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailKind {
    Name,
    LastSeen,
    ReferenceFrame,
}

impl DetailKind {
    pub const ALL: [DetailKind; 3] = [
        DetailKind::Name,
        DetailKind::LastSeen,
        DetailKind::ReferenceFrame,
    ];

    fn label(self) -> &'static str {
        match self {
            DetailKind::Name => "Name",
            DetailKind::LastSeen => "Last Seen",
            DetailKind::ReferenceFrame => "Reference Frame",
        }
    }
}

/// Fixed detail rows under an axis, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisDetailKind {
    Source,
    Priority,
    Timestamp,
}

impl AxisDetailKind {
    pub const ALL: [AxisDetailKind; 3] = [
        AxisDetailKind::Source,
        AxisDetailKind::Priority,
        AxisDetailKind::Timestamp,
    ];

    fn label(self) -> &'static str {
        match self {
            AxisDetailKind::Source => "Winning Source",
            AxisDetailKind::Priority => "Priority",
            AxisDetailKind::Timestamp => "Timestamp",
        }
    }
}

/// Fixed field rows of a component, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentField {
    Cid,
    Name,
    Kind,
    Ip,
    SystemList,
    ModuleList,
}

impl ComponentField {
    pub const ALL: [ComponentField; 6] = [
        ComponentField::Cid,
        ComponentField::Name,
        ComponentField::Kind,
        ComponentField::Ip,
        ComponentField::SystemList,
        ComponentField::ModuleList,
    ];
}

/// The kind tag of a tree node.
///
/// Schema positions carry their full discrimination (quantity, field, axis)
/// in the variant payload, so rendering never has to walk ancestors to work
/// out what a leaf means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // System tree
    Root,
    Group,
    Point,
    PointDetails,
    Detail(DetailKind),
    QuantityGroup(Quantity),
    FieldGroup(Quantity, FieldKind),
    AxisRow(Quantity, FieldKind, Axis),
    AxisDetail(Quantity, FieldKind, Axis, AxisDetailKind),

    // Components tree
    ComponentsRoot,
    Component,
    Field(ComponentField),
    SystemListItem,
    ModuleListItem,
}

impl NodeKind {
    /// Number of columns a node of this kind answers for. The system tree is
    /// two-column (name, details); the components tree is single-column.
    pub fn column_count(self) -> usize {
        match self {
            NodeKind::ComponentsRoot
            | NodeKind::Component
            | NodeKind::Field(_)
            | NodeKind::SystemListItem
            | NodeKind::ModuleListItem => 1,
            _ => 2,
        }
    }
}

/// Column indices of the system tree.
pub const COLUMN_NAME: usize = 0;
pub const COLUMN_DETAILS: usize = 1;

/// What aspect of a cell a display query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Display,
    Font,
    Background,
    Tooltip,
}

/// Answer to a display query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    /// No answer for this column/role — render nothing.
    None,
    Text(String),
    /// Font decoration: render italic (the "gone quiet" styling).
    Italic,
    /// Background decoration: highlight (stale last-seen styling).
    Highlight,
}

impl CellValue {
    pub fn text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Identifier of a node within its tree's arena.
///
/// Valid until the node is removed; slots are recycled afterwards, so ids
/// must not be held across structural removals of the node they name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// One position in a view-model tree.
#[derive(Debug)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) address: Address,
    pub(crate) component: Option<ComponentId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: BTreeMap<u64, NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, address: Address) -> Self {
        Self {
            kind,
            address,
            component: None,
            parent: None,
            children: BTreeMap::new(),
        }
    }

    pub(crate) fn for_component(kind: NodeKind, component: ComponentId) -> Self {
        Self {
            kind,
            address: Address::default(),
            component: Some(component),
            parent: None,
            children: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn component(&self) -> Option<ComponentId> {
        self.component
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn column_count(&self) -> usize {
        self.kind.column_count()
    }
}

/// Id-keyed node storage with exclusive subtree ownership.
#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
}

impl Arena {
    pub fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    /// Links `child` under `parent` at `key` in the parent's sort order.
    pub fn attach(&mut self, parent: NodeId, key: u64, child: NodeId) {
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.insert(key, child);
        }
    }

    /// Unlinks the child at `key` and frees its entire subtree. Returns the
    /// freed child id if one was linked there.
    pub fn remove_child(&mut self, parent: NodeId, key: u64) -> Option<NodeId> {
        let child = self.get_mut(parent)?.children.remove(&key)?;
        self.free_subtree(child);
        Some(child)
    }

    /// Frees `id` and, recursively, everything below it.
    pub fn free_subtree(&mut self, id: NodeId) {
        let children: Vec<NodeId> = match self.get(id) {
            Some(node) => node.children.values().copied().collect(),
            None => return,
        };
        for child in children {
            self.free_subtree(child);
        }
        self.slots[id.0] = None;
        self.free.push(id.0);
    }

    pub fn child_at(&self, id: NodeId, row: usize) -> Option<NodeId> {
        self.get(id)?.children.values().nth(row).copied()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.get(id).map_or(0, |node| node.children.len())
    }

    /// The row where a child keyed `key` would land: the number of existing
    /// siblings with a smaller sort key.
    pub fn insertion_row(&self, parent: NodeId, key: u64) -> usize {
        self.get(parent)
            .map_or(0, |node| node.children.range(..key).count())
    }

    /// This node's ordinal among its parent's children, found by identity so
    /// duplicate-valued siblings can never be confused. The root is row 0.
    pub fn row_of(&self, id: NodeId) -> usize {
        let parent = match self.get(id).and_then(|node| node.parent) {
            Some(parent) => parent,
            None => return 0,
        };
        self.get(parent)
            .and_then(|node| node.children.values().position(|&child| child == id))
            .unwrap_or(0)
    }

    /// The row path from the root down to `id`.
    pub fn path_of(&self, id: NodeId) -> TreePath {
        let mut rows = Vec::new();
        let mut current = id;
        while let Some(parent) = self.get(current).and_then(|node| node.parent) {
            rows.push(self.row_of(current));
            current = parent;
        }
        rows.reverse();
        TreePath::from_rows(rows)
    }

    /// Walks `path` down from `root`.
    pub fn node_at_path(&self, root: NodeId, path: &TreePath) -> Option<NodeId> {
        let mut current = root;
        for &row in path.rows() {
            current = self.child_at(current, row)?;
        }
        Some(current)
    }
}

impl Node {
    /// Answers one display query, dispatching on the node's kind and querying
    /// `source` live. Structural kinds answer static labels; leaf kinds
    /// format adapter state; decorations derive from the expiry predicates.
    ///
    /// `arena` is only consulted for the node's current row (variable-length
    /// list items display the value at their position).
    pub(crate) fn data<A: DataSource>(
        &self,
        arena: &Arena,
        self_id: NodeId,
        source: &A,
        column: usize,
        role: Role,
    ) -> CellValue {
        if column >= self.column_count() {
            log::debug!("data query for out-of-range column {column} on {:?}", self.kind);
            return CellValue::None;
        }

        match self.kind {
            NodeKind::Root
            | NodeKind::Group
            | NodeKind::Point
            | NodeKind::PointDetails
            | NodeKind::Detail(_)
            | NodeKind::QuantityGroup(_)
            | NodeKind::FieldGroup(..)
            | NodeKind::AxisRow(..)
            | NodeKind::AxisDetail(..) => self.system_data(source, column, role),

            NodeKind::ComponentsRoot
            | NodeKind::Component
            | NodeKind::Field(_)
            | NodeKind::SystemListItem
            | NodeKind::ModuleListItem => {
                self.component_data(arena, self_id, source, role)
            }
        }
    }

    fn system_data<A: DataSource>(&self, source: &A, column: usize, role: Role) -> CellValue {
        let addr = self.address;
        let group_expired = || source.is_expired(addr, Level::Group);
        let point_expired = || source.is_expired(addr, Level::Point);

        match self.kind {
            NodeKind::Root => match role {
                Role::Display => CellValue::Text(String::new()),
                _ => CellValue::None,
            },

            NodeKind::Group => match (role, column) {
                (Role::Display, COLUMN_NAME) => CellValue::Text(format!("Group {}", addr.group)),
                (Role::Display, COLUMN_DETAILS) if group_expired() => {
                    CellValue::Text("(Expired)".into())
                }
                (Role::Font, _) if group_expired() => CellValue::Italic,
                _ => CellValue::None,
            },

            NodeKind::Point => match (role, column) {
                (Role::Display, COLUMN_NAME) => CellValue::Text(format!("Point {}", addr.point)),
                (Role::Display, COLUMN_DETAILS) if point_expired() => {
                    CellValue::Text("(Expired)".into())
                }
                (Role::Font, _) if point_expired() => CellValue::Italic,
                (Role::Tooltip, _) => CellValue::Text(POINT_TOOLTIP.into()),
                _ => CellValue::None,
            },

            NodeKind::PointDetails => match (role, column) {
                (Role::Display, COLUMN_NAME) => CellValue::Text("Details".into()),
                (Role::Display, COLUMN_DETAILS) if point_expired() => {
                    CellValue::Text("(Expired)".into())
                }
                (Role::Font, _) if point_expired() => CellValue::Italic,
                (Role::Tooltip, _) => CellValue::Text(POINT_TOOLTIP.into()),
                _ => CellValue::None,
            },

            NodeKind::Detail(detail) => match (role, column) {
                (Role::Display, COLUMN_NAME) => CellValue::Text(detail.label().into()),
                (Role::Display, COLUMN_DETAILS) => CellValue::Text(match detail {
                    DetailKind::Name => source.point_name(addr),
                    DetailKind::LastSeen => source
                        .point_last_seen(addr)
                        .map(|seen| seen.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
                        .unwrap_or_else(|| UNKNOWN_VALUE.into()),
                    DetailKind::ReferenceFrame => source
                        .reference_frame(addr)
                        .map(|reference| reference.to_string())
                        .unwrap_or_else(|| "None".into()),
                }),
                (Role::Font, _) if point_expired() => CellValue::Italic,
                (Role::Background, _)
                    if detail == DetailKind::LastSeen && point_expired() =>
                {
                    CellValue::Highlight
                }
                (Role::Tooltip, _) => CellValue::Text(POINT_TOOLTIP.into()),
                _ => CellValue::None,
            },

            NodeKind::QuantityGroup(quantity) => match (role, column) {
                (Role::Display, COLUMN_NAME) => CellValue::Text(
                    match quantity {
                        Quantity::Position => "Position",
                        Quantity::Rotation => "Rotation",
                        Quantity::Scale => "Scale",
                    }
                    .into(),
                ),
                (Role::Tooltip, _) => CellValue::Text(POINT_TOOLTIP.into()),
                _ => CellValue::None,
            },

            NodeKind::FieldGroup(_, field) => match (role, column) {
                (Role::Display, COLUMN_NAME) => CellValue::Text(
                    match field {
                        FieldKind::Value => "Value",
                        FieldKind::Velocity => "Velocity",
                        FieldKind::Acceleration => "Acceleration",
                    }
                    .into(),
                ),
                (Role::Tooltip, _) => CellValue::Text(POINT_TOOLTIP.into()),
                _ => CellValue::None,
            },

            NodeKind::AxisRow(quantity, field, axis) => match (role, column) {
                (Role::Display, COLUMN_NAME) => CellValue::Text(axis.label().into()),
                (Role::Display, COLUMN_DETAILS) => CellValue::Text(
                    source
                        .sample(addr, quantity, field, axis)
                        .map(|sample| format_sample(quantity, &sample))
                        .unwrap_or_else(|| UNKNOWN_VALUE.into()),
                ),
                (Role::Tooltip, _) => CellValue::Text(other_sources_tooltip(
                    &source.samples(addr, quantity, field, axis),
                )),
                _ => CellValue::None,
            },

            NodeKind::AxisDetail(quantity, field, axis, detail) => match (role, column) {
                (Role::Display, COLUMN_NAME) => CellValue::Text(detail.label().into()),
                (Role::Display, COLUMN_DETAILS) => CellValue::Text(
                    source
                        .sample(addr, quantity, field, axis)
                        .map(|sample| match detail {
                            AxisDetailKind::Source => sample.source.to_string(),
                            AxisDetailKind::Priority => sample.priority.to_string(),
                            AxisDetailKind::Timestamp => sample.timestamp_ms.to_string(),
                        })
                        .unwrap_or_else(|| UNKNOWN_VALUE.into()),
                ),
                (Role::Tooltip, _) => CellValue::Text(POINT_TOOLTIP.into()),
                _ => CellValue::None,
            },

            _ => {
                log::warn!("unmatched display query on {:?}", self.kind);
                CellValue::Text(UNKNOWN_VALUE.into())
            }
        }
    }

    fn component_data<A: DataSource>(
        &self,
        arena: &Arena,
        self_id: NodeId,
        source: &A,
        role: Role,
    ) -> CellValue {
        // Expiry styles the whole component subtree italic.
        if role == Role::Font {
            return match self.component {
                Some(cid) if source.is_component_expired(cid) => CellValue::Italic,
                _ => CellValue::None,
            };
        }
        if role != Role::Display {
            return CellValue::None;
        }

        match self.kind {
            NodeKind::ComponentsRoot => CellValue::Text("Components".into()),

            NodeKind::Component => match self.component {
                Some(cid) => CellValue::Text(cid.to_string()),
                None => CellValue::Text(UNKNOWN_VALUE.into()),
            },

            NodeKind::Field(field) => {
                let cid = match self.component {
                    Some(cid) => cid,
                    None => return CellValue::Text(UNKNOWN_VALUE.into()),
                };
                let offline = source.is_component_expired(cid);
                let info = source.component(cid);
                CellValue::Text(match field {
                    ComponentField::Cid => format!("ID: {cid}"),
                    ComponentField::Name => format!(
                        "Name: {}",
                        if offline {
                            "Offline".into()
                        } else {
                            info.map(|i| i.name).unwrap_or_else(|| UNKNOWN_VALUE.into())
                        }
                    ),
                    ComponentField::Kind => format!(
                        "Type: {}",
                        if offline {
                            "Offline"
                        } else {
                            match info.map(|i| i.kind) {
                                Some(ComponentKind::Consumer) => "Consumer",
                                Some(ComponentKind::Producer) => "Producer",
                                None => UNKNOWN_VALUE,
                            }
                        }
                    ),
                    ComponentField::Ip => format!(
                        "IP: {}",
                        if offline {
                            "Offline".into()
                        } else {
                            info.map(|i| i.ip.to_string())
                                .unwrap_or_else(|| UNKNOWN_VALUE.into())
                        }
                    ),
                    ComponentField::SystemList => {
                        if info.map(|i| i.kind) == Some(ComponentKind::Consumer) {
                            // Consumers don't send system lists.
                            "Systems: N/A".into()
                        } else if source.advertised_systems(cid).is_empty() {
                            "Systems: None".into()
                        } else {
                            "Systems".into()
                        }
                    }
                    ComponentField::ModuleList => {
                        let advertised = info.as_ref().map(|i| i.kind)
                            == Some(ComponentKind::Consumer);
                        let empty = info.map(|i| i.modules.is_empty()).unwrap_or(true);
                        format!(
                            "Modules ({}){}",
                            if advertised { "Advertised" } else { "Active" },
                            if empty { ": None" } else { "" }
                        )
                    }
                })
            }

            NodeKind::SystemListItem => {
                let cid = match self.component {
                    Some(cid) => cid,
                    None => return CellValue::Text(UNKNOWN_VALUE.into()),
                };
                let row = arena.row_of(self_id);
                CellValue::Text(
                    source
                        .advertised_systems(cid)
                        .get(row)
                        .map(|system| system.to_string())
                        .unwrap_or_else(|| UNKNOWN_VALUE.into()),
                )
            }

            NodeKind::ModuleListItem => {
                let cid = match self.component {
                    Some(cid) => cid,
                    None => return CellValue::Text(UNKNOWN_VALUE.into()),
                };
                let row = arena.row_of(self_id);
                match source
                    .component(cid)
                    .and_then(|info| info.modules.get(row).copied())
                {
                    Some(module) => {
                        let description = source.module_description(module);
                        CellValue::Text(format!(
                            "{} (0x{:04x}) / {} (0x{:04x})",
                            description.manufacturer,
                            module.manufacturer_id,
                            description.name,
                            module.module_number
                        ))
                    }
                    None => CellValue::Text(UNKNOWN_VALUE.into()),
                }
            }

            _ => {
                log::warn!("unmatched display query on {:?}", self.kind);
                CellValue::Text(UNKNOWN_VALUE.into())
            }
        }
    }
}

fn format_sample(quantity: Quantity, sample: &FieldSample) -> String {
    match quantity {
        Quantity::Scale => format!("{} ({})", sample.value, sample.unit),
        _ => format!("{} {}", sample.value, sample.unit),
    }
}

/// The "other sources" tooltip body: every sample after the winner.
fn other_sources_tooltip(samples: &[FieldSample]) -> String {
    let mut out = String::from("Other sources");
    let losing = samples.iter().skip(1);
    let mut any = false;
    for sample in losing {
        any = true;
        out.push_str(&format!(
            "\r\n{} {} {}",
            sample.source, sample.value, sample.unit
        ));
    }
    if !any {
        out.push_str("\r\nNone");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena_with_chain() -> (Arena, NodeId, NodeId, NodeId) {
        let mut arena = Arena::default();
        let root = arena.alloc(Node::new(NodeKind::Root, Address::new(7, 0, 0)));
        let group = arena.alloc(Node::new(NodeKind::Group, Address::new(7, 2, 0)));
        let point = arena.alloc(Node::new(NodeKind::Point, Address::new(7, 2, 9)));
        arena.attach(root, 2, group);
        arena.attach(group, 9, point);
        (arena, root, group, point)
    }

    #[test]
    fn test_children_iterate_in_key_order() {
        let mut arena = Arena::default();
        let root = arena.alloc(Node::new(NodeKind::Root, Address::new(7, 0, 0)));
        for group in [9u16, 3, 7] {
            let node = arena.alloc(Node::new(NodeKind::Group, Address::new(7, group, 0)));
            arena.attach(root, group as u64, node);
        }
        let groups: Vec<u16> = (0..arena.child_count(root))
            .map(|row| {
                let id = arena.child_at(root, row).unwrap();
                arena.get(id).unwrap().address().group
            })
            .collect();
        assert_eq!(groups, vec![3, 7, 9]);
    }

    #[test]
    fn test_insertion_row_counts_smaller_keys() {
        let mut arena = Arena::default();
        let root = arena.alloc(Node::new(NodeKind::Root, Address::new(7, 0, 0)));
        for group in [3u16, 9] {
            let node = arena.alloc(Node::new(NodeKind::Group, Address::new(7, group, 0)));
            arena.attach(root, group as u64, node);
        }
        assert_eq!(arena.insertion_row(root, 1), 0);
        assert_eq!(arena.insertion_row(root, 5), 1);
        assert_eq!(arena.insertion_row(root, 20), 2);
    }

    #[test]
    fn test_row_of_and_path_of() {
        let (arena, root, group, point) = arena_with_chain();
        assert_eq!(arena.row_of(root), 0);
        assert_eq!(arena.row_of(group), 0);
        assert_eq!(arena.row_of(point), 0);
        assert_eq!(arena.path_of(point), TreePath::from_rows(vec![0, 0]));
        assert_eq!(arena.node_at_path(root, &arena.path_of(point)), Some(point));
    }

    #[test]
    fn test_free_subtree_recurses() {
        let (mut arena, root, group, point) = arena_with_chain();
        arena.remove_child(root, 2);
        assert!(arena.get(group).is_none());
        assert!(arena.get(point).is_none());
        assert_eq!(arena.child_count(root), 0);
    }

    #[test]
    fn test_slot_reuse_after_free() {
        let (mut arena, root, ..) = arena_with_chain();
        arena.remove_child(root, 2);
        // Two slots were freed; the next two allocations reuse them.
        let a = arena.alloc(Node::new(NodeKind::Group, Address::new(7, 5, 0)));
        let b = arena.alloc(Node::new(NodeKind::Group, Address::new(7, 6, 0)));
        assert!(a.0 <= 2 && b.0 <= 2);
    }

    #[test]
    fn test_other_sources_tooltip_none() {
        assert_eq!(other_sources_tooltip(&[]), "Other sources\r\nNone");
    }
}
