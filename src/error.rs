use thiserror::Error;

/// Errors raised by livetree.
///
/// The error surface is deliberately tiny. Feed inconsistencies (duplicate
/// discovery, removal of an unknown id, events for a system this tree is not
/// bound to, insertions whose parent has not been discovered yet) are all
/// tolerated as silent no-ops — a live feed reorders and repeats itself, and
/// the trees must absorb that without complaint. Only programming-contract
/// violations, i.e. malformed textual input, surface as errors.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Invalid address format: {0}")]
    AddressFormat(String),

    #[error("Address component out of range: {0}")]
    AddressRange(String),

    #[error("Invalid tree path: {0}")]
    PathFormat(String),
}

pub type Result<T> = std::result::Result<T, TreeError>;
