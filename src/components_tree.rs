//! # The component registry tree
//!
//! [`ComponentsTree`] mirrors the set of discovered remote components under a
//! single "Components" root. Each component node eagerly creates its six
//! fixed field rows (id, name, type, IP, system list, module list) at
//! creation time; only the two list groupings ever change shape afterwards.
//!
//! System-list and module-list entries are a narrower contract than groups
//! and points: they are addressable by *count only*, not by value. The tree
//! holds exactly as many entry rows as the adapter reports and each row asks
//! the adapter what currently lives at its position. When the live count
//! drops, the excess tail rows are truncated — never searched for by value.
//!
//! Component siblings keep arrival order (the feed has no meaningful numeric
//! order for component ids), unlike the numerically sorted groups and points.
//!
//! ## Loss policy
//!
//! What [`FeedEvent::ComponentLost`] does is the adapter's call, queried at
//! event time via [`DataSource::remove_lost_components`]: either the whole
//! component subtree is deleted, or the node stays and merely renders
//! expired ("Offline" fields, italic) until the component reappears.

use crate::address::ComponentId;
use crate::node::{Arena, CellValue, ComponentField, Node, NodeId, NodeKind, Role};
use crate::notify::{ChangeNotifier, TreeChange};
use crate::path::TreePath;
use crate::source::{ComponentKind, DataSource, FeedEvent};
use std::rc::Rc;

/// View model of the discovered component registry.
pub struct ComponentsTree<A: DataSource> {
    source: Rc<A>,
    arena: Arena,
    root: NodeId,
    notifier: ChangeNotifier,
    /// Arrival-order sort keys for component nodes.
    next_seq: u64,
}

impl<A: DataSource> ComponentsTree<A> {
    /// Builds the registry tree and seeds it with every component the source
    /// already knows about.
    pub fn new(source: Rc<A>) -> Self {
        let mut arena = Arena::default();
        let root = arena.alloc(Node::new(
            NodeKind::ComponentsRoot,
            crate::address::Address::default(),
        ));
        let mut tree = Self {
            source,
            arena,
            root,
            notifier: ChangeNotifier::new(),
            next_seq: 0,
        };
        for component in tree.source.components() {
            tree.component_discovered(component);
        }
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

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

    /// The component node for `component`, if discovered.
    pub fn resolve(&self, component: ComponentId) -> Option<NodeId> {
        let root = self.arena.get(self.root)?;
        root.children.values().copied().find(|&child| {
            self.arena
                .get(child)
                .is_some_and(|node| node.component() == Some(component))
        })
    }

    pub fn resolve_path(&self, component: ComponentId) -> Option<TreePath> {
        self.resolve(component).map(|id| self.arena.path_of(id))
    }

    // --- Event application ---

    /// Applies one feed event. Group/point traffic is not this tree's scope.
    pub fn apply(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::ComponentDiscovered(component) => self.component_discovered(component),
            FeedEvent::ComponentLost(component) => self.component_lost(component),
            FeedEvent::ComponentUpdated(component) => self.component_updated(component),
            FeedEvent::SystemAdvertised(component) | FeedEvent::SystemWithdrawn(component) => {
                self.sync_system_list(component)
            }
            FeedEvent::ModuleListChanged(component) => self.sync_module_list(component),
            _ => {}
        }
    }

    fn component_discovered(&mut self, component: ComponentId) {
        if self.resolve(component).is_some() {
            return;
        }

        let node = self
            .arena
            .alloc(Node::for_component(NodeKind::Component, component));
        for (ordinal, field) in ComponentField::ALL.iter().enumerate() {
            let child = self
                .arena
                .alloc(Node::for_component(NodeKind::Field(*field), component));
            self.arena.attach(node, ordinal as u64, child);
        }

        // New components append after everything already known.
        let row = self.arena.child_count(self.root);
        let key = self.next_seq;
        self.next_seq += 1;
        self.arena.attach(self.root, key, node);

        log::debug!("component {component} inserted at row {row}");
        self.notifier.emit(TreeChange::RowsInserted {
            parent: TreePath::root(),
            first: row,
            last: row,
        });

        // Lists start sized to whatever the adapter already reports.
        self.sync_system_list(component);
        self.sync_module_list(component);
    }

    fn component_lost(&mut self, component: ComponentId) {
        let id = match self.resolve(component) {
            Some(id) => id,
            None => return,
        };

        if self.source.remove_lost_components() {
            let row = self.arena.row_of(id);
            let key = match self.component_key(id) {
                Some(key) => key,
                None => return,
            };
            self.arena.remove_child(self.root, key);

            log::debug!("component {component} removed from row {row}");
            self.notifier.emit(TreeChange::RowsRemoved {
                parent: TreePath::root(),
                first: row,
                last: row,
            });
        } else {
            // Decorative only: the node stays, every field re-renders as
            // offline/italic.
            self.emit_component_changed(id);
        }
    }

    fn component_updated(&mut self, component: ComponentId) {
        if let Some(id) = self.resolve(component) {
            self.emit_component_changed(id);
        }
    }

    fn emit_component_changed(&mut self, id: NodeId) {
        let start = self.arena.path_of(id);
        let last = self.arena.child_count(id).saturating_sub(1);
        let end = start.child(last);
        self.notifier.emit(TreeChange::DataChanged { start, end });
    }

    /// The sort key of a component node under the root.
    fn component_key(&self, id: NodeId) -> Option<u64> {
        let root = self.arena.get(self.root)?;
        root.children
            .iter()
            .find(|(_, &child)| child == id)
            .map(|(&key, _)| key)
    }

    fn sync_system_list(&mut self, component: ComponentId) {
        // Consumers don't send system lists.
        if self.source.component(component).map(|info| info.kind)
            == Some(ComponentKind::Consumer)
        {
            return;
        }
        let live = self.source.advertised_systems(component).len();
        self.sync_list(component, ComponentField::SystemList, NodeKind::SystemListItem, live);
    }

    fn sync_module_list(&mut self, component: ComponentId) {
        let live = self
            .source
            .component(component)
            .map_or(0, |info| info.modules.len());
        self.sync_list(component, ComponentField::ModuleList, NodeKind::ModuleListItem, live);
    }

    /// Resizes a count-only child list to `live` entries: grow by appending,
    /// shrink by truncating the tail. Entries are never matched by value.
    fn sync_list(
        &mut self,
        component: ComponentId,
        field: ComponentField,
        item_kind: NodeKind,
        live: usize,
    ) {
        let list = match self.field_node(component, field) {
            Some(list) => list,
            None => return,
        };
        let current = self.arena.child_count(list);
        if live == current {
            return;
        }

        let parent = self.arena.path_of(list);
        if live > current {
            for index in current..live {
                let item = self.arena.alloc(Node::for_component(item_kind, component));
                self.arena.attach(list, index as u64, item);
            }
            self.notifier.emit(TreeChange::RowsInserted {
                parent: parent.clone(),
                first: current,
                last: live - 1,
            });
        } else {
            for index in live..current {
                self.arena.remove_child(list, index as u64);
            }
            self.notifier.emit(TreeChange::RowsRemoved {
                parent: parent.clone(),
                first: live,
                last: current - 1,
            });
        }

        // The grouping row's label carries emptiness/count hints; refresh it.
        self.notifier.emit(TreeChange::DataChanged {
            start: parent.clone(),
            end: parent,
        });
    }

    fn field_node(&self, component: ComponentId, field: ComponentField) -> Option<NodeId> {
        let node = self.resolve(component)?;
        self.arena.get(node)?.children.values().copied().find(|&child| {
            self.arena
                .get(child)
                .is_some_and(|n| n.kind() == NodeKind::Field(field))
        })
    }
}

impl<A: DataSource> std::fmt::Debug for ComponentsTree<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentsTree")
            .field("components", &self.arena.child_count(self.root))
            .finish()
    }
}
