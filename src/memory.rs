//! # In-memory data source
//!
//! [`MemorySource`] is a complete [`DataSource`] over plain maps, for tests
//! and for hosts that replay captured feeds. Uses `RefCell` for interior
//! mutability since livetree is single-threaded; the trait can keep `&self`
//! accessors without locking overhead.
//!
//! The clock is a stored value, not `Utc::now()`: tests move time with
//! [`MemorySource::set_now`] / [`MemorySource::advance`] and staleness
//! becomes deterministic. Every mutator also records the [`FeedEvent`] it implies;
//! drain them with [`MemorySource::take_events`] and forward them to the
//! trees to imitate a live feed.

use crate::address::{
    Address, Axis, ComponentId, FieldKind, GroupId, Level, PointId, Quantity, SystemId,
};
use crate::source::{
    ComponentInfo, DataSource, FeedEvent, FieldSample, ModuleDescription, ModuleIdent,
};
use chrono::{DateTime, Duration, Utc};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone)]
struct PointState {
    name: String,
    last_seen: DateTime<Utc>,
    reference: Option<Address>,
    /// Winner first, losing sources after.
    samples: HashMap<(Quantity, FieldKind, Axis), Vec<FieldSample>>,
}

#[derive(Debug, Clone)]
struct ComponentState {
    info: ComponentInfo,
    systems: BTreeSet<SystemId>,
    lost: bool,
}

#[derive(Debug)]
struct World {
    now: DateTime<Utc>,
    expiry_window: Duration,
    /// Group id -> last seen, per system.
    groups: BTreeMap<(SystemId, GroupId), DateTime<Utc>>,
    points: BTreeMap<Address, PointState>,
    /// Discovery order.
    component_order: Vec<ComponentId>,
    components: HashMap<ComponentId, ComponentState>,
    module_names: HashMap<ModuleIdent, ModuleDescription>,
    remove_lost: bool,
    events: Vec<FeedEvent>,
}

/// An in-memory [`DataSource`] with a settable clock.
pub struct MemorySource {
    world: RefCell<World>,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self {
            world: RefCell::new(World {
                now: DateTime::UNIX_EPOCH,
                expiry_window: Duration::seconds(30),
                groups: BTreeMap::new(),
                points: BTreeMap::new(),
                component_order: Vec::new(),
                components: HashMap::new(),
                module_names: HashMap::new(),
                remove_lost: false,
                events: Vec::new(),
            }),
        }
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Clock & policy ---

    pub fn set_now(&self, now: DateTime<Utc>) {
        self.world.borrow_mut().now = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut world = self.world.borrow_mut();
        world.now += by;
    }

    pub fn set_expiry_window(&self, window: Duration) {
        self.world.borrow_mut().expiry_window = window;
    }

    pub fn set_remove_lost_components(&self, remove: bool) {
        self.world.borrow_mut().remove_lost = remove;
    }

    /// Drains the events recorded by mutators since the last call, in order.
    pub fn take_events(&self) -> Vec<FeedEvent> {
        self.world.borrow_mut().events.drain(..).collect()
    }

    // --- Group / point mutators ---

    pub fn add_group(&self, system: SystemId, group: GroupId) {
        let mut world = self.world.borrow_mut();
        let now = world.now;
        world.groups.insert((system, group), now);
        world.events.push(FeedEvent::GroupDiscovered { system, group });
    }

    pub fn remove_group(&self, system: SystemId, group: GroupId) {
        let mut world = self.world.borrow_mut();
        world.groups.remove(&(system, group));
        world
            .points
            .retain(|addr, _| !(addr.system == system && addr.group == group));
        world.events.push(FeedEvent::GroupRemoved { system, group });
    }

    pub fn add_point(&self, address: Address, name: &str) {
        let mut world = self.world.borrow_mut();
        let now = world.now;
        world.points.insert(
            address,
            PointState {
                name: name.to_string(),
                last_seen: now,
                reference: None,
                samples: HashMap::new(),
            },
        );
        world.events.push(FeedEvent::PointDiscovered(address));
    }

    pub fn remove_point(&self, address: Address) {
        let mut world = self.world.borrow_mut();
        world.points.remove(&address);
        world.events.push(FeedEvent::PointRemoved(address));
    }

    pub fn set_reference_frame(&self, address: Address, reference: Option<Address>) {
        let mut world = self.world.borrow_mut();
        if let Some(point) = world.points.get_mut(&address) {
            point.reference = reference;
        }
        world.events.push(FeedEvent::PointUpdated(address));
    }

    /// Replaces all samples for one field, winner first, and refreshes the
    /// point's last-seen stamp.
    pub fn set_samples(
        &self,
        address: Address,
        quantity: Quantity,
        field: FieldKind,
        axis: Axis,
        samples: Vec<FieldSample>,
    ) {
        let mut world = self.world.borrow_mut();
        let now = world.now;
        if let Some(point) = world.points.get_mut(&address) {
            point.samples.insert((quantity, field, axis), samples);
            point.last_seen = now;
        }
        world.events.push(FeedEvent::PointUpdated(address));
    }

    /// Backdates a point's last-seen stamp; staleness testing device.
    pub fn set_point_last_seen(&self, address: Address, last_seen: DateTime<Utc>) {
        let mut world = self.world.borrow_mut();
        if let Some(point) = world.points.get_mut(&address) {
            point.last_seen = last_seen;
        }
        world.events.push(FeedEvent::PointExpired(address));
    }

    pub fn set_group_last_seen(&self, system: SystemId, group: GroupId, last_seen: DateTime<Utc>) {
        let mut world = self.world.borrow_mut();
        world.groups.insert((system, group), last_seen);
    }

    // --- Component mutators ---

    pub fn add_component(&self, component: ComponentId, info: ComponentInfo) {
        let mut world = self.world.borrow_mut();
        world.component_order.push(component);
        world.components.insert(
            component,
            ComponentState {
                info,
                systems: BTreeSet::new(),
                lost: false,
            },
        );
        world.events.push(FeedEvent::ComponentDiscovered(component));
    }

    pub fn update_component(&self, component: ComponentId, info: ComponentInfo) {
        let mut world = self.world.borrow_mut();
        if let Some(state) = world.components.get_mut(&component) {
            state.info = info;
        }
        world.events.push(FeedEvent::ComponentUpdated(component));
    }

    /// Marks the component lost. Under the remove policy the feed also drops
    /// it from enumeration, matching a deleting consumer.
    pub fn mark_component_lost(&self, component: ComponentId) {
        let mut world = self.world.borrow_mut();
        if let Some(state) = world.components.get_mut(&component) {
            state.lost = true;
        }
        if world.remove_lost {
            world.component_order.retain(|&cid| cid != component);
            world.components.remove(&component);
        }
        world.events.push(FeedEvent::ComponentLost(component));
    }

    pub fn advertise_system(&self, component: ComponentId, system: SystemId) {
        let mut world = self.world.borrow_mut();
        if let Some(state) = world.components.get_mut(&component) {
            state.systems.insert(system);
        }
        world.events.push(FeedEvent::SystemAdvertised(component));
    }

    pub fn withdraw_system(&self, component: ComponentId, system: SystemId) {
        let mut world = self.world.borrow_mut();
        if let Some(state) = world.components.get_mut(&component) {
            state.systems.remove(&system);
        }
        world.events.push(FeedEvent::SystemWithdrawn(component));
    }

    pub fn set_modules(&self, component: ComponentId, modules: Vec<ModuleIdent>) {
        let mut world = self.world.borrow_mut();
        if let Some(state) = world.components.get_mut(&component) {
            state.info.modules = modules;
        }
        world.events.push(FeedEvent::ModuleListChanged(component));
    }

    pub fn set_module_description(&self, module: ModuleIdent, description: ModuleDescription) {
        self.world.borrow_mut().module_names.insert(module, description);
    }
}

impl DataSource for MemorySource {
    fn groups(&self, system: SystemId) -> Vec<GroupId> {
        self.world
            .borrow()
            .groups
            .keys()
            .filter(|(sys, _)| *sys == system)
            .map(|(_, group)| *group)
            .collect()
    }

    fn points(&self, system: SystemId, group: GroupId) -> Vec<PointId> {
        self.world
            .borrow()
            .points
            .keys()
            .filter(|addr| addr.system == system && addr.group == group)
            .map(|addr| addr.point)
            .collect()
    }

    fn components(&self) -> Vec<ComponentId> {
        self.world.borrow().component_order.clone()
    }

    fn is_expired(&self, address: Address, level: Level) -> bool {
        let world = self.world.borrow();
        let last_seen = match level {
            Level::Root => return false,
            Level::Group => world.groups.get(&(address.system, address.group)).copied(),
            Level::Point => world.points.get(&address).map(|point| point.last_seen),
        };
        match last_seen {
            Some(last_seen) => world.now - last_seen > world.expiry_window,
            None => false,
        }
    }

    fn is_component_expired(&self, component: ComponentId) -> bool {
        self.world
            .borrow()
            .components
            .get(&component)
            .is_some_and(|state| state.lost)
    }

    fn point_name(&self, address: Address) -> String {
        self.world
            .borrow()
            .points
            .get(&address)
            .map(|point| point.name.clone())
            .unwrap_or_default()
    }

    fn point_last_seen(&self, address: Address) -> Option<DateTime<Utc>> {
        self.world
            .borrow()
            .points
            .get(&address)
            .map(|point| point.last_seen)
    }

    fn reference_frame(&self, address: Address) -> Option<Address> {
        self.world
            .borrow()
            .points
            .get(&address)
            .and_then(|point| point.reference)
    }

    fn sample(
        &self,
        address: Address,
        quantity: Quantity,
        field: FieldKind,
        axis: Axis,
    ) -> Option<FieldSample> {
        self.world
            .borrow()
            .points
            .get(&address)
            .and_then(|point| point.samples.get(&(quantity, field, axis)))
            .and_then(|samples| samples.first().cloned())
    }

    fn samples(
        &self,
        address: Address,
        quantity: Quantity,
        field: FieldKind,
        axis: Axis,
    ) -> Vec<FieldSample> {
        self.world
            .borrow()
            .points
            .get(&address)
            .and_then(|point| point.samples.get(&(quantity, field, axis)))
            .cloned()
            .unwrap_or_default()
    }

    fn component(&self, component: ComponentId) -> Option<ComponentInfo> {
        self.world
            .borrow()
            .components
            .get(&component)
            .map(|state| state.info.clone())
    }

    fn advertised_systems(&self, component: ComponentId) -> Vec<SystemId> {
        self.world
            .borrow()
            .components
            .get(&component)
            .map(|state| state.systems.iter().copied().collect())
            .unwrap_or_default()
    }

    fn module_description(&self, module: ModuleIdent) -> ModuleDescription {
        self.world
            .borrow()
            .module_names
            .get(&module)
            .cloned()
            .unwrap_or(ModuleDescription {
                manufacturer: "Unknown".into(),
                name: "Unknown".into(),
            })
    }

    fn remove_lost_components(&self) -> bool {
        self.world.borrow().remove_lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: f64) -> FieldSample {
        FieldSample {
            value,
            unit: "m".into(),
            timestamp_ms: 1_000,
            source: uuid::Uuid::new_v4(),
            priority: 100,
        }
    }

    #[test]
    fn test_enumeration_is_sorted() {
        let source = MemorySource::new();
        source.add_group(7, 9);
        source.add_group(7, 2);
        source.add_group(8, 1);
        assert_eq!(source.groups(7), vec![2, 9]);

        source.add_point(Address::new(7, 2, 9), "a");
        source.add_point(Address::new(7, 2, 3), "b");
        assert_eq!(source.points(7, 2), vec![3, 9]);
    }

    #[test]
    fn test_expiry_follows_clock() {
        let source = MemorySource::new();
        source.set_expiry_window(Duration::seconds(30));
        let addr = Address::new(7, 2, 3);
        source.add_group(7, 2);
        source.add_point(addr, "p");

        assert!(!source.is_expired(addr, Level::Point));
        source.advance(Duration::seconds(31));
        assert!(source.is_expired(addr, Level::Point));

        // A fresh sample revives the point.
        source.set_samples(addr, Quantity::Position, FieldKind::Value, Axis::X, vec![sample(1.0)]);
        assert!(!source.is_expired(addr, Level::Point));
    }

    #[test]
    fn test_winner_is_first_sample() {
        let source = MemorySource::new();
        let addr = Address::new(7, 2, 3);
        source.add_group(7, 2);
        source.add_point(addr, "p");
        source.set_samples(
            addr,
            Quantity::Position,
            FieldKind::Value,
            Axis::X,
            vec![sample(5.0), sample(1.0)],
        );
        let winner = source
            .sample(addr, Quantity::Position, FieldKind::Value, Axis::X)
            .unwrap();
        assert_eq!(winner.value, 5.0);
        assert_eq!(
            source
                .samples(addr, Quantity::Position, FieldKind::Value, Axis::X)
                .len(),
            2
        );
    }

    #[test]
    fn test_mutators_record_events() {
        let source = MemorySource::new();
        source.add_group(7, 2);
        source.add_point(Address::new(7, 2, 3), "p");
        source.remove_point(Address::new(7, 2, 3));
        let events = source.take_events();
        assert_eq!(
            events,
            vec![
                FeedEvent::GroupDiscovered { system: 7, group: 2 },
                FeedEvent::PointDiscovered(Address::new(7, 2, 3)),
                FeedEvent::PointRemoved(Address::new(7, 2, 3)),
            ]
        );
        assert!(source.take_events().is_empty());
    }

    #[test]
    fn test_lost_component_removed_under_policy() {
        let source = MemorySource::new();
        let cid = uuid::Uuid::new_v4();
        source.add_component(
            cid,
            ComponentInfo {
                name: "mover".into(),
                kind: crate::source::ComponentKind::Producer,
                ip: "10.0.0.1".parse().unwrap(),
                modules: vec![],
            },
        );

        source.mark_component_lost(cid);
        // Flag-only policy keeps it enumerable but expired.
        assert_eq!(source.components(), vec![cid]);
        assert!(source.is_component_expired(cid));

        source.set_remove_lost_components(true);
        source.mark_component_lost(cid);
        assert!(source.components().is_empty());
    }
}
