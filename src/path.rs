//! # Tree paths
//!
//! A [`TreePath`] addresses a node positionally: the sequence of child rows
//! walked from the root. The empty path is the root itself. Paths are what
//! change notifications carry and what a host display surface navigates by —
//! they are stable for exactly as long as no structural mutation shifts the
//! rows they pass through, which is why rows are always recomputed from the
//! live tree at notification time and never cached on nodes.
//!
//! The text form is dot-separated rows (`"0.2.1"`), with `"."` unused and the
//! empty string denoting the root.

use crate::error::{Result, TreeError};
use serde::{Deserialize, Serialize};

/// A row path from the root of a tree to one of its nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TreePath(Vec<usize>);

impl TreePath {
    /// The root path (empty).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_rows(rows: Vec<usize>) -> Self {
        Self(rows)
    }

    /// This path extended by one child row.
    pub fn child(&self, row: usize) -> Self {
        let mut rows = self.0.clone();
        rows.push(row);
        Self(rows)
    }

    /// The parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// The final row of this path, or `None` for the root.
    pub fn row(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn rows(&self) -> &[usize] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Display for TreePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", s.join("."))
    }
}

impl std::str::FromStr for TreePath {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let rows: std::result::Result<Vec<usize>, _> =
            s.split('.').map(|part| part.parse()).collect();
        rows.map(Self).map_err(|_| TreeError::PathFormat(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_root_path() {
        let root = TreePath::root();
        assert!(root.is_root());
        assert_eq!(root.parent(), None);
        assert_eq!(root.row(), None);
        assert_eq!(root.to_string(), "");
    }

    #[test]
    fn test_child_and_parent() {
        let path = TreePath::root().child(0).child(2).child(1);
        assert_eq!(path.rows(), &[0, 2, 1]);
        assert_eq!(path.row(), Some(1));
        assert_eq!(path.parent(), Some(TreePath::from_rows(vec![0, 2])));
        assert_eq!(path.depth(), 3);
    }

    #[test]
    fn test_display_round_trip() {
        let path = TreePath::from_rows(vec![0, 2, 1]);
        assert_eq!(path.to_string(), "0.2.1");
        assert_eq!(TreePath::from_str("0.2.1").unwrap(), path);
        assert_eq!(TreePath::from_str("").unwrap(), TreePath::root());
        assert!(TreePath::from_str("0.x.1").is_err());
    }
}
