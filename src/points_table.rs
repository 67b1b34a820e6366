//! # Flat points table
//!
//! A single-column, always-sorted table of the points currently known under
//! one (system, group). Unlike the trees this model holds no structure at
//! all: every query re-enumerates the adapter, so it can never drift from
//! the feed and needs no event plumbing beyond "something changed, repaint".
//! Selection dialogs and editors use it to offer the live point list.

use crate::address::{Address, GroupId, SystemId};
use crate::node::{CellValue, Role};
use crate::source::DataSource;
use std::rc::Rc;

/// Flat view of one group's points, rendered as `system/group/point`.
pub struct PointsTable<A: DataSource> {
    source: Rc<A>,
    system: SystemId,
    group: GroupId,
}

impl<A: DataSource> PointsTable<A> {
    pub fn new(source: Rc<A>, system: SystemId, group: GroupId) -> Self {
        Self {
            source,
            system,
            group,
        }
    }

    /// Retargets the table to another group; takes effect on the next query.
    pub fn set_group(&mut self, group: GroupId) {
        self.group = group;
    }

    pub fn set_system(&mut self, system: SystemId) {
        self.system = system;
    }

    pub fn row_count(&self) -> usize {
        self.source.points(self.system, self.group).len()
    }

    pub fn column_count(&self) -> usize {
        1
    }

    /// The address shown at `row`, by ascending point id.
    pub fn address_at(&self, row: usize) -> Option<Address> {
        let mut points = self.source.points(self.system, self.group);
        points.sort_unstable();
        points
            .get(row)
            .map(|&point| Address::new(self.system, self.group, point))
    }

    pub fn data(&self, row: usize, role: Role) -> CellValue {
        if role != Role::Display {
            return CellValue::None;
        }
        match self.address_at(row) {
            Some(address) => CellValue::Text(address.to_string()),
            None => CellValue::None,
        }
    }

    pub fn header(&self) -> &'static str {
        "Address"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySource;

    #[test]
    fn test_rows_follow_live_feed() {
        let source = Rc::new(MemorySource::new());
        let table = PointsTable::new(Rc::clone(&source), 7, 2);
        assert_eq!(table.row_count(), 0);

        source.add_group(7, 2);
        source.add_point(Address::new(7, 2, 9), "a");
        source.add_point(Address::new(7, 2, 3), "b");
        assert_eq!(table.row_count(), 2);

        // Sorted by point id regardless of arrival order.
        assert_eq!(table.address_at(0), Some(Address::new(7, 2, 3)));
        assert_eq!(table.address_at(1), Some(Address::new(7, 2, 9)));
        assert_eq!(
            table.data(1, Role::Display),
            CellValue::Text("7/2/9".into())
        );
    }

    #[test]
    fn test_out_of_range_row_is_none() {
        let source = Rc::new(MemorySource::new());
        let table = PointsTable::new(Rc::clone(&source), 7, 2);
        assert_eq!(table.address_at(5), None);
        assert_eq!(table.data(5, Role::Display), CellValue::None);
    }

    #[test]
    fn test_retargeting() {
        let source = Rc::new(MemorySource::new());
        source.add_group(7, 2);
        source.add_group(7, 4);
        source.add_point(Address::new(7, 2, 1), "a");
        source.add_point(Address::new(7, 4, 8), "b");

        let mut table = PointsTable::new(Rc::clone(&source), 7, 2);
        assert_eq!(table.address_at(0), Some(Address::new(7, 2, 1)));
        table.set_group(4);
        assert_eq!(table.address_at(0), Some(Address::new(7, 4, 8)));
    }
}
