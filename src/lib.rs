//! # neurograph
//!
//! A simulation engine for large mutable directed graphs of neurons joined
//! by weighted synapses, advanced through discrete, globally synchronized
//! generations.
//!
//! The population lives in a fixed-capacity [`NeuronArray`]. Each `tick()`
//! fires the registered module hooks, then runs a two-phase update over
//! every neuron: a read-only phase that collects pending charges from the
//! previous generation's committed state, a barrier, and a commit phase that
//! promotes charges and applies per-synapse weight rules. Both phases are
//! data-parallel under the `parallel` feature.
//!
//! ## Quick start
//!
//! ```
//! use neurograph::prelude::*;
//!
//! let mut array = NeuronArray::new(ArrayConfig::with_size(100, 10))?;
//! array.add_synapse_with_undo(5, 42, 0.75, SynapseModel::Fixed)?;
//! array.stimulate(5, 1.0)?;
//! array.tick();
//! assert_eq!(array.fire_count(), 1);
//!
//! array.undo_last(); // the interactive edit is reversible
//! # Ok::<(), neurograph::GraphError>(())
//! ```
//!
//! ## Feature flags
//!
//! - `std` (default): snapshot storage and file helpers
//! - `serde` (default): serializable graph types and snapshots
//! - `parallel`: rayon data-parallel phase passes
//! - `cli`: the `neurograph` demo binary (tracing-based run logs)
//!
//! ## Modules
//!
//! - [`array`]: the array itself: ticking, editing, undo, reconciliation
//! - [`neuron`]: per-neuron state and the two-phase update
//! - [`synapse`]: edge records and back-references
//! - [`module`]: the per-tick hook contract
//! - [`storage`]: framed, compressed snapshots

#[path = "core/array.rs"]
pub mod array;

#[path = "core/error.rs"]
pub mod error;

#[path = "core/module.rs"]
pub mod module;

#[path = "core/neuron.rs"]
pub mod neuron;

#[path = "core/prng.rs"]
pub mod prng;

#[cfg(all(feature = "std", feature = "serde"))]
#[path = "core/storage.rs"]
pub mod storage;

#[path = "core/synapse.rs"]
pub mod synapse;

pub use array::{ArrayConfig, ArrayStats, NeuronArray, UndoRecord};
pub use error::GraphError;
pub use module::{Module, ModuleSlot};
pub use neuron::{Neuron, SynapseChange, FIRE_THRESHOLD};
pub use synapse::{BackRef, NeuronId, Synapse, SynapseModel};

/// Commonly used types, for glob import.
pub mod prelude {
    pub use crate::array::{ArrayConfig, ArrayStats, NeuronArray, UndoRecord};
    pub use crate::error::GraphError;
    pub use crate::module::{Module, ModuleSlot};
    pub use crate::neuron::{Neuron, SynapseChange, FIRE_THRESHOLD};
    pub use crate::synapse::{BackRef, NeuronId, Synapse, SynapseModel};
}
