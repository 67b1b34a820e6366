//! # The group/point tree
//!
//! [`SystemTree`] mirrors one numbered system as an ordered tree: groups
//! under the root, points under groups, and under every point the full
//! fixed schema (details, position, rotation, scale, axes, axis details).
//! Groups and points appear and disappear with the feed; the schema subtree
//! is materialized whole the instant its point is created and lives exactly
//! as long as the point does, so a display surface can never observe a
//! half-built point.
//!
//! The tree is bound to its system for life. Events naming any other system
//! are silently ignored — cross-scope traffic is expected, not an error. A
//! tree for a different system is a new [`SystemTree`].
//!
//! ## Update protocol
//!
//! The host forwards every [`FeedEvent`] to [`SystemTree::apply`]. Structural
//! handlers are tolerant by design:
//!
//! - discovery of an already-present id: no-op, nothing emitted
//! - removal of an absent id: no-op
//! - a point for a group the tree has not seen: no-op (the group's own
//!   discovery is expected to arrive first or never)
//!
//! Expiry never arrives here as structure: it is a predicate the nodes
//! evaluate per `data()` call, so an expired group keeps its rows and merely
//! renders decorated.

use crate::address::{Address, Axis, FieldKind, GroupId, Level, Quantity, SystemId};
use crate::node::{
    Arena, AxisDetailKind, CellValue, DetailKind, Node, NodeId, NodeKind, Role,
};
use crate::notify::{ChangeNotifier, TreeChange};
use crate::path::TreePath;
use crate::source::{DataSource, FeedEvent};
use std::rc::Rc;

/// Sort keys of a point's fixed children, declaration order.
const KEY_DETAILS: u64 = 0;
const KEY_POSITION: u64 = 1;
const KEY_ROTATION: u64 = 2;
const KEY_SCALE: u64 = 3;

/// View model of one system's group/point hierarchy.
pub struct SystemTree<A: DataSource> {
    source: Rc<A>,
    system: SystemId,
    arena: Arena,
    root: NodeId,
    notifier: ChangeNotifier,
}

impl<A: DataSource> SystemTree<A> {
    /// Builds a tree bound to `system` and seeds it with everything the
    /// source already knows about.
    pub fn new(source: Rc<A>, system: SystemId) -> Self {
        let mut arena = Arena::default();
        let root = arena.alloc(Node::new(NodeKind::Root, Address::new(system, 0, 0)));
        let mut tree = Self {
            source,
            system,
            arena,
            root,
            notifier: ChangeNotifier::new(),
        };

        for group in tree.source.groups(system) {
            tree.group_discovered(system, group);
            for point in tree.source.points(system, group) {
                tree.point_discovered(Address::new(system, group, point));
            }
        }
        tree
    }

    pub fn system(&self) -> SystemId {
        self.system
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    /// Registers a change listener.
    pub fn subscribe<F: FnMut(&TreeChange) + 'static>(&mut self, listener: F) {
        self.notifier.subscribe(listener);
    }

    pub fn notifier_mut(&mut self) -> &mut ChangeNotifier {
        &mut self.notifier
    }

    // --- Host navigation ---

    pub fn node_at(&self, path: &TreePath) -> Option<NodeId> {
        self.arena.node_at_path(self.root, path)
    }

    pub fn child_at(&self, path: &TreePath, row: usize) -> Option<TreePath> {
        let parent = self.node_at(path)?;
        self.arena.child_at(parent, row)?;
        Some(path.child(row))
    }

    pub fn row_count_at(&self, path: &TreePath) -> usize {
        self.node_at(path)
            .map_or(0, |id| self.arena.child_count(id))
    }

    pub fn column_count_at(&self, path: &TreePath) -> usize {
        self.node_at(path)
            .and_then(|id| self.arena.get(id))
            .map_or(0, |node| node.column_count())
    }

    /// Answers a display query for the node at `path`; [`CellValue::None`]
    /// when the path is dangling.
    pub fn data_at(&self, path: &TreePath, column: usize, role: Role) -> CellValue {
        match self.node_at(path) {
            Some(id) => self.data(id, column, role),
            None => CellValue::None,
        }
    }

    pub fn data(&self, id: NodeId, column: usize, role: Role) -> CellValue {
        match self.arena.get(id) {
            Some(node) => node.data(&self.arena, id, self.source.as_ref(), column, role),
            None => CellValue::None,
        }
    }

    // --- Address resolution ---

    /// Walks from the root to the node for `address` at `level`. `None` for
    /// cross-scope addresses and not-yet-discovered entities alike.
    pub fn resolve(&self, address: Address, level: Level) -> Option<NodeId> {
        match level {
            Level::Root => (address.system == self.system).then_some(self.root),
            Level::Group => {
                let root = self.resolve(address, Level::Root)?;
                self.find_child(root, |node| {
                    node.kind() == NodeKind::Group && node.address().group == address.group
                })
            }
            Level::Point => {
                let group = self.resolve(address, Level::Group)?;
                self.find_child(group, |node| {
                    node.kind() == NodeKind::Point && node.address().point == address.point
                })
            }
        }
    }

    /// Path-returning variant of [`SystemTree::resolve`], for notification
    /// addressing.
    pub fn resolve_path(&self, address: Address, level: Level) -> Option<TreePath> {
        self.resolve(address, level)
            .map(|id| self.arena.path_of(id))
    }

    fn find_child(&self, parent: NodeId, pred: impl Fn(&Node) -> bool) -> Option<NodeId> {
        let node = self.arena.get(parent)?;
        node.children
            .values()
            .copied()
            .find(|&child| self.arena.get(child).map(&pred).unwrap_or(false))
    }

    // --- Event application ---

    /// Applies one feed event. Component-registry events are out of this
    /// tree's scope and ignored.
    pub fn apply(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::GroupDiscovered { system, group } => self.group_discovered(system, group),
            FeedEvent::GroupRemoved { system, group } => self.group_removed(system, group),
            FeedEvent::PointDiscovered(address) => self.point_discovered(address),
            FeedEvent::PointRemoved(address) => self.point_removed(address),
            FeedEvent::PointUpdated(address) | FeedEvent::PointExpired(address) => {
                self.point_updated(address)
            }
            _ => {}
        }
    }

    fn group_discovered(&mut self, system: SystemId, group: GroupId) {
        if system != self.system {
            return;
        }
        let key = u64::from(group);
        if self.has_child_key(self.root, key) {
            return;
        }

        let row = self.arena.insertion_row(self.root, key);
        let id = self
            .arena
            .alloc(Node::new(NodeKind::Group, Address::new(system, group, 0)));
        self.arena.attach(self.root, key, id);

        log::debug!("group {group} inserted at row {row} (system {system})");
        self.notifier.emit(TreeChange::RowsInserted {
            parent: TreePath::root(),
            first: row,
            last: row,
        });
    }

    fn group_removed(&mut self, system: SystemId, group: GroupId) {
        if system != self.system {
            return;
        }
        // Find by value, not by position: earlier removals may have shifted
        // rows since the feed observed this group.
        let target = self.find_child(self.root, |node| node.address().group == group);
        let id = match target {
            Some(id) => id,
            None => return,
        };
        let row = self.arena.row_of(id);
        self.arena.remove_child(self.root, u64::from(group));

        log::debug!("group {group} removed from row {row} (system {system})");
        self.notifier.emit(TreeChange::RowsRemoved {
            parent: TreePath::root(),
            first: row,
            last: row,
        });
    }

    fn point_discovered(&mut self, address: Address) {
        if address.system != self.system {
            return;
        }
        let group = match self.resolve(address, Level::Group) {
            Some(group) => group,
            // Parent group not known yet: tolerate, its discovery may still
            // be in flight.
            None => return,
        };
        let key = u64::from(address.point);
        if self.has_child_key(group, key) {
            return;
        }

        // Materialize the point and its whole schema before linking it in,
        // so the insert notification covers a fully-built subtree.
        let point = self.arena.alloc(Node::new(NodeKind::Point, address));
        self.build_point_schema(point, address);

        let row = self.arena.insertion_row(group, key);
        self.arena.attach(group, key, point);

        log::debug!("point {address} inserted at row {row}");
        let parent = self.arena.path_of(group);
        self.notifier.emit(TreeChange::RowsInserted {
            parent,
            first: row,
            last: row,
        });
    }

    fn point_removed(&mut self, address: Address) {
        if address.system != self.system {
            return;
        }
        let group = match self.resolve(address, Level::Group) {
            Some(group) => group,
            None => return,
        };
        let target = self.find_child(group, |node| {
            node.kind() == NodeKind::Point && node.address().point == address.point
        });
        let id = match target {
            Some(id) => id,
            None => return,
        };
        let row = self.arena.row_of(id);
        self.arena.remove_child(group, u64::from(address.point));

        log::debug!("point {address} removed from row {row}");
        let parent = self.arena.path_of(group);
        self.notifier.emit(TreeChange::RowsRemoved {
            parent,
            first: row,
            last: row,
        });
    }

    /// A value changed (or expired) somewhere under a point. Emits one
    /// conservative range over the point and its schema subtree rather than
    /// diffing which leaf moved — consumers re-query `data()` live anyway.
    fn point_updated(&mut self, address: Address) {
        if address.system != self.system {
            return;
        }
        let point = match self.resolve(address, Level::Point) {
            Some(point) => point,
            None => return,
        };
        let start = self.arena.path_of(point);
        let last_child = self.arena.child_count(point).saturating_sub(1);
        let end = start.child(last_child);
        self.notifier.emit(TreeChange::DataChanged { start, end });
    }

    fn has_child_key(&self, parent: NodeId, key: u64) -> bool {
        self.arena
            .get(parent)
            .is_some_and(|node| node.children.contains_key(&key))
    }

    // --- Fixed schema ---

    fn build_point_schema(&mut self, point: NodeId, address: Address) {
        // Details
        let details = self
            .arena
            .alloc(Node::new(NodeKind::PointDetails, address));
        self.arena.attach(point, KEY_DETAILS, details);
        for (ordinal, detail) in DetailKind::ALL.iter().enumerate() {
            let child = self
                .arena
                .alloc(Node::new(NodeKind::Detail(*detail), address));
            self.arena.attach(details, ordinal as u64, child);
        }

        // Position and rotation carry value/velocity/acceleration groupings.
        self.build_quantity(point, KEY_POSITION, Quantity::Position, address);
        self.build_quantity(point, KEY_ROTATION, Quantity::Rotation, address);

        // Scale has no derivatives: axes hang directly off the grouping.
        let scale = self
            .arena
            .alloc(Node::new(NodeKind::QuantityGroup(Quantity::Scale), address));
        self.arena.attach(point, KEY_SCALE, scale);
        self.build_axes(scale, Quantity::Scale, FieldKind::Value, address);
    }

    fn build_quantity(&mut self, point: NodeId, key: u64, quantity: Quantity, address: Address) {
        let group = self
            .arena
            .alloc(Node::new(NodeKind::QuantityGroup(quantity), address));
        self.arena.attach(point, key, group);

        let fields = [FieldKind::Value, FieldKind::Velocity, FieldKind::Acceleration];
        for (ordinal, field) in fields.iter().enumerate() {
            let field_node = self
                .arena
                .alloc(Node::new(NodeKind::FieldGroup(quantity, *field), address));
            self.arena.attach(group, ordinal as u64, field_node);
            self.build_axes(field_node, quantity, *field, address);
        }
    }

    fn build_axes(&mut self, parent: NodeId, quantity: Quantity, field: FieldKind, address: Address) {
        for (ordinal, axis) in Axis::ALL.iter().enumerate() {
            let axis_node = self
                .arena
                .alloc(Node::new(NodeKind::AxisRow(quantity, field, *axis), address));
            self.arena.attach(parent, ordinal as u64, axis_node);

            for (detail_ordinal, detail) in AxisDetailKind::ALL.iter().enumerate() {
                let detail_node = self.arena.alloc(Node::new(
                    NodeKind::AxisDetail(quantity, field, *axis, *detail),
                    address,
                ));
                self.arena.attach(axis_node, detail_ordinal as u64, detail_node);
            }
        }
    }
}

impl<A: DataSource> std::fmt::Debug for SystemTree<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemTree")
            .field("system", &self.system)
            .field("groups", &self.arena.child_count(self.root))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySource;
    use crate::notify::Recorder;

    fn tree_with_source() -> (Rc<MemorySource>, SystemTree<MemorySource>) {
        let source = Rc::new(MemorySource::new());
        let tree = SystemTree::new(Rc::clone(&source), 7);
        (source, tree)
    }

    fn drive(source: &MemorySource, tree: &mut SystemTree<MemorySource>) {
        for event in source.take_events() {
            tree.apply(event);
        }
    }

    #[test]
    fn test_seeds_existing_entities() {
        let source = Rc::new(MemorySource::new());
        source.add_group(7, 2);
        source.add_point(Address::new(7, 2, 3), "spot");
        source.add_point(Address::new(7, 2, 9), "wash");
        source.take_events(); // construction seeds from enumeration, not events

        let tree = SystemTree::new(Rc::clone(&source), 7);
        assert_eq!(tree.row_count_at(&TreePath::root()), 1);
        let group = tree.resolve(Address::new(7, 2, 0), Level::Group).unwrap();
        assert_eq!(tree.node(group).unwrap().child_count(), 2);
    }

    #[test]
    fn test_point_schema_is_fully_materialized() {
        let (source, mut tree) = tree_with_source();
        source.add_group(7, 2);
        source.add_point(Address::new(7, 2, 3), "spot");
        drive(&source, &mut tree);

        let point = tree.resolve(Address::new(7, 2, 3), Level::Point).unwrap();
        // Details, Position, Rotation, Scale
        assert_eq!(tree.node(point).unwrap().child_count(), 4);

        let path = tree.resolve_path(Address::new(7, 2, 3), Level::Point).unwrap();
        let details = path.child(0);
        assert_eq!(tree.row_count_at(&details), 3);

        // Position -> Value/Velocity/Acceleration -> X/Y/Z -> 3 details
        let position = path.child(1);
        assert_eq!(tree.row_count_at(&position), 3);
        let value = position.child(0);
        assert_eq!(tree.row_count_at(&value), 3);
        let axis_x = value.child(0);
        assert_eq!(tree.row_count_at(&axis_x), 3);

        // Scale -> X/Y/Z directly
        let scale = path.child(3);
        assert_eq!(tree.row_count_at(&scale), 3);
    }

    #[test]
    fn test_groups_sorted_regardless_of_arrival() {
        let (source, mut tree) = tree_with_source();
        for group in [9u16, 2, 5] {
            source.add_group(7, group);
        }
        drive(&source, &mut tree);

        let groups: Vec<u16> = (0..tree.row_count_at(&TreePath::root()))
            .map(|row| {
                let id = tree.child_at(&TreePath::root(), row).unwrap();
                tree.node_at(&id)
                    .and_then(|id| tree.node(id))
                    .unwrap()
                    .address()
                    .group
            })
            .collect();
        assert_eq!(groups, vec![2, 5, 9]);
    }

    #[test]
    fn test_duplicate_discovery_is_silent() {
        let (source, mut tree) = tree_with_source();
        source.add_group(7, 2);
        drive(&source, &mut tree);

        let recorder = Recorder::new();
        recorder.attach(tree.notifier_mut());
        tree.apply(FeedEvent::GroupDiscovered { system: 7, group: 2 });
        assert!(recorder.is_empty());
        assert_eq!(tree.row_count_at(&TreePath::root()), 1);
    }

    #[test]
    fn test_point_without_group_is_ignored() {
        let (source, mut tree) = tree_with_source();
        source.add_point(Address::new(7, 4, 1), "orphan");
        drive(&source, &mut tree);
        assert_eq!(tree.row_count_at(&TreePath::root()), 0);
        assert_eq!(tree.resolve(Address::new(7, 4, 1), Level::Point), None);
    }

    #[test]
    fn test_cross_scope_events_are_ignored() {
        let (_, mut tree) = tree_with_source();
        let recorder = Recorder::new();
        recorder.attach(tree.notifier_mut());

        tree.apply(FeedEvent::GroupDiscovered { system: 9, group: 2 });
        tree.apply(FeedEvent::PointDiscovered(Address::new(9, 2, 1)));
        assert!(recorder.is_empty());
        assert_eq!(tree.resolve(Address::new(9, 2, 0), Level::Group), None);
    }

    #[test]
    fn test_removal_finds_row_by_value() {
        let (source, mut tree) = tree_with_source();
        source.add_group(7, 2);
        for point in [3u32, 9, 15] {
            source.add_point(Address::new(7, 2, point), "p");
        }
        drive(&source, &mut tree);

        let recorder = Recorder::new();
        recorder.attach(tree.notifier_mut());

        // Point 9 sits at row 1; removing it must report exactly that row.
        tree.apply(FeedEvent::PointRemoved(Address::new(7, 2, 9)));
        let group_path = tree.resolve_path(Address::new(7, 2, 0), Level::Group).unwrap();
        assert_eq!(
            recorder.take(),
            vec![TreeChange::RowsRemoved {
                parent: group_path.clone(),
                first: 1,
                last: 1,
            }]
        );
        assert_eq!(tree.row_count_at(&group_path), 2);
        // Point 15 shifted up to row 1.
        let shifted = tree.node_at(&group_path.child(1)).and_then(|id| tree.node(id));
        assert_eq!(shifted.unwrap().address().point, 15);
    }

    #[test]
    fn test_update_emits_conservative_range() {
        let (source, mut tree) = tree_with_source();
        source.add_group(7, 2);
        source.add_point(Address::new(7, 2, 3), "spot");
        drive(&source, &mut tree);

        let recorder = Recorder::new();
        recorder.attach(tree.notifier_mut());
        tree.apply(FeedEvent::PointUpdated(Address::new(7, 2, 3)));

        let point_path = tree.resolve_path(Address::new(7, 2, 3), Level::Point).unwrap();
        assert_eq!(
            recorder.take(),
            vec![TreeChange::DataChanged {
                start: point_path.clone(),
                end: point_path.child(3),
            }]
        );
    }

    #[test]
    fn test_bijection_between_resolve_and_address() {
        let (source, mut tree) = tree_with_source();
        source.add_group(7, 2);
        source.add_group(7, 5);
        source.add_point(Address::new(7, 2, 3), "a");
        source.add_point(Address::new(7, 5, 1), "b");
        drive(&source, &mut tree);

        for (addr, level) in [
            (Address::new(7, 2, 0), Level::Group),
            (Address::new(7, 5, 0), Level::Group),
            (Address::new(7, 2, 3), Level::Point),
            (Address::new(7, 5, 1), Level::Point),
        ] {
            let id = tree.resolve(addr, level).unwrap();
            let node = tree.node(id).unwrap();
            assert_eq!(node.address().group, addr.group);
            assert_eq!(node.address().point, addr.point);
            assert_eq!(tree.resolve(node.address(), level), Some(id));
        }
    }

    #[test]
    fn test_rediscovery_after_removal_creates_fresh_node() {
        let (source, mut tree) = tree_with_source();
        source.add_group(7, 2);
        source.add_point(Address::new(7, 2, 3), "spot");
        drive(&source, &mut tree);

        tree.apply(FeedEvent::PointRemoved(Address::new(7, 2, 3)));
        assert_eq!(tree.resolve(Address::new(7, 2, 3), Level::Point), None);

        tree.apply(FeedEvent::PointDiscovered(Address::new(7, 2, 3)));
        let point = tree.resolve(Address::new(7, 2, 3), Level::Point).unwrap();
        assert_eq!(tree.node(point).unwrap().child_count(), 4);
    }
}
