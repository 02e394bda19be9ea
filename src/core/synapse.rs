//! Synapse records: directed weighted edges plus their derived back-references.
//!
//! A synapse lives in the outgoing list of the neuron that owns it. Deletion
//! is soft: the target is cleared to the sentinel (`None`) and the record is
//! physically removed later by [`NeuronArray::reconcile_graph`], so indices
//! into the list stay valid during iteration.
//!
//! [`NeuronArray::reconcile_graph`]: crate::array::NeuronArray::reconcile_graph

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable index of a neuron inside its owning array.
pub type NeuronId = usize;

/// Per-synapse weight update rule, applied at the end of phase 2 by the
/// synapse's owning neuron.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SynapseModel {
    /// Weight never changes on its own.
    #[default]
    Fixed,
    /// One-shot learning: the first co-firing of owner and target clamps the
    /// weight to the terminal value, permanently.
    Binary,
    /// Three-level Hebbian rule: co-firing promotes the weight one level up
    /// the ladder, firing into a silent target demotes it one level.
    Hebbian,
}

/// A directed weighted edge owned by its source neuron.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Synapse {
    /// Destination neuron, or `None` once the synapse is soft-deleted.
    pub target: Option<NeuronId>,
    pub weight: f32,
    pub model: SynapseModel,
}

impl Synapse {
    /// A new live synapse. Values are taken verbatim; range checking the
    /// target is the array's job, not ours.
    pub fn new(target: NeuronId, weight: f32, model: SynapseModel) -> Self {
        Self {
            target: Some(target),
            weight,
            model,
        }
    }

    /// True until the synapse has been soft-deleted.
    pub fn is_live(&self) -> bool {
        self.target.is_some()
    }

    /// Soft-delete: clear the target to the sentinel. The record stays in
    /// place until the next reconciliation pass compacts it away.
    pub fn clear(&mut self) {
        self.target = None;
    }
}

impl Default for Synapse {
    fn default() -> Self {
        Self {
            target: None,
            weight: 1.0,
            model: SynapseModel::Fixed,
        }
    }
}

/// Incoming-edge record kept on the *target* neuron.
///
/// Back-references are a derived index over the forward adjacency, not a
/// second source of truth. The weight is duplicated here for fast
/// incoming-sum queries and is refreshed from the forward synapse by the
/// reconciliation pass; the model tag is not needed on the receiving side.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BackRef {
    /// Source neuron, or `None` once the record is soft-deleted.
    pub source: Option<NeuronId>,
    pub weight: f32,
}

impl BackRef {
    pub fn new(source: NeuronId, weight: f32) -> Self {
        Self {
            source: Some(source),
            weight,
        }
    }

    pub fn is_live(&self) -> bool {
        self.source.is_some()
    }

    pub fn clear(&mut self) {
        self.source = None;
    }
}
