//! Error type for the graph core.
//!
//! Only two things are ever reported to the caller: edit operations handed an
//! index outside the array, and a degenerate configuration at construction.
//! Not-found lookups, deletes of absent synapses, and undo-log underflow are
//! benign no-ops by design, and structural drift is repaired (not raised) by
//! the reconciliation pass.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    /// An edit named a neuron outside `[0, capacity)`. Rejected before any
    /// mutation; the graph and undo log are untouched.
    #[error("neuron index {index} out of range (capacity {capacity})")]
    IndexOutOfRange { index: usize, capacity: usize },

    /// Degenerate construction parameters (zero rows or zero capacity) would
    /// make the coordinate mapping undefined; rejected up front rather than
    /// surfacing later as a division fault.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// A snapshot could not be decoded.
    #[cfg(all(feature = "std", feature = "serde"))]
    #[error("snapshot error: {0}")]
    Snapshot(String),
}
