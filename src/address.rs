//! # Addressing
//!
//! Every controllable entity in the feed lives at a three-level numeric
//! address: a *system* contains *groups*, a group contains *points*. The
//! [`Address`] triple is the universal key of this crate: trees resolve it,
//! nodes carry it, and the [`crate::source::DataSource`] accessors are keyed
//! by it.
//!
//! Leaf cells narrow an address further with an [`Axis`] (X/Y/Z) and a
//! ([`Quantity`], [`FieldKind`]) pair selecting which spatial field of the
//! point is meant. Those discriminators are not part of the address itself —
//! they are carried by the tree node's kind — so `Address` stays a plain,
//! totally ordered, hashable triple.
//!
//! The canonical text form is `system/group/point` (e.g. `7/2/9`), the same
//! shape the flat points table renders.

use crate::error::{Result, TreeError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Numeric id of a system (the top-level scope a tree binds to).
pub type SystemId = u16;
/// Numeric id of a group within a system.
pub type GroupId = u16;
/// Numeric id of a point within a group.
pub type PointId = u32;

/// Stable identifier of a discovered remote component.
pub type ComponentId = Uuid;
/// Identifier of the source that produced a value sample.
pub type SourceId = Uuid;

/// A spatial axis for position/rotation/scale fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

/// Which spatial quantity of a point a cell refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantity {
    Position,
    Rotation,
    Scale,
}

/// Which derivative of a quantity a cell refers to.
///
/// Scale only carries `Value`; position and rotation carry all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Value,
    Velocity,
    Acceleration,
}

/// Structural depth of an address lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Root,
    Group,
    Point,
}

/// The `(system, group, point)` triple identifying one entity in the feed.
///
/// Total order is lexicographic on (system, group, point), which the derived
/// `Ord` provides given the field declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Address {
    pub system: SystemId,
    pub group: GroupId,
    pub point: PointId,
}

impl Address {
    pub fn new(system: SystemId, group: GroupId, point: PointId) -> Self {
        Self {
            system,
            group,
            point,
        }
    }

    /// The address of the enclosing group (point zeroed).
    pub fn group_address(self) -> Self {
        Self::new(self.system, self.group, 0)
    }

    /// The address of the enclosing system (group and point zeroed).
    pub fn system_address(self) -> Self {
        Self::new(self.system, 0, 0)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.system, self.group, self.point)
    }
}

impl std::str::FromStr for Address {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 3 {
            return Err(TreeError::AddressFormat(s.to_string()));
        }
        let system = parts[0]
            .parse()
            .map_err(|_| TreeError::AddressRange(s.to_string()))?;
        let group = parts[1]
            .parse()
            .map_err(|_| TreeError::AddressRange(s.to_string()))?;
        let point = parts[2]
            .parse()
            .map_err(|_| TreeError::AddressRange(s.to_string()))?;
        Ok(Address::new(system, group, point))
    }
}
