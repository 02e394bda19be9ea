//! A single neuron: label, charge state, adjacency lists, and the two halves
//! of the per-generation update.
//!
//! The update is split so the whole population can be advanced with
//! unrestricted data parallelism:
//!
//! - **Phase 1** ([`Neuron::collect_charge`]) reads only state committed by
//!   the previous generation and writes nothing; the array stores the result
//!   in its own pending slot for this neuron.
//! - **Phase 2** ([`Neuron::commit`]) promotes the pending charge to the new
//!   committed state and applies weight-update rules to the neuron's *own*
//!   outgoing synapses only. Co-activation of targets is read from the frozen
//!   pending slice, never from a neighbor's in-flight committed state.
//!
//! No neuron ever writes to another neuron's state during either phase, which
//! is what makes the two rayon passes in the array race-free.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::synapse::{BackRef, NeuronId, Synapse, SynapseModel};

/// Accumulated charge at which a neuron fires during phase 2.
pub const FIRE_THRESHOLD: f32 = 1.0;

/// Terminal weight for the one-shot `Binary` synapse model.
pub const BINARY_TERMINAL_WEIGHT: f32 = 1.0;

/// Weight ladder for the three-level `Hebbian` synapse model, low to high.
pub const HEBBIAN_LEVELS: [f32; 3] = [1.0 / 3.0, 2.0 / 3.0, 1.0];

const LEVEL_EPS: f32 = 1e-4;

/// Outcome of [`Neuron::add_synapse`], used by the array to decide what (if
/// anything) to record in the undo log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SynapseChange {
    /// No synapse to that target existed; one was appended.
    Created,
    /// A synapse existed; its previous weight and model are reported.
    Updated {
        previous_weight: f32,
        previous_model: SynapseModel,
    },
    /// A synapse with identical weight and model already existed. No-op.
    Unchanged,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Neuron {
    /// Identity: kept equal to the neuron's array index. Reassigned by the
    /// reconciliation pass after any compaction.
    pub id: NeuronId,
    /// Free-form label, unique by convention, for editor lookups.
    pub label: Option<String>,
    /// Charge carried between generations (accumulates until the threshold).
    pub charge: f32,
    /// Committed output of the latest completed generation: 1.0 if the
    /// neuron fired, 0.0 otherwise. This is the only cross-neuron state
    /// phase 1 reads.
    pub last_charge: f32,
    /// Outgoing synapses, owned exclusively by this neuron.
    pub outgoing: Vec<Synapse>,
    /// Derived incoming records; see [`BackRef`].
    pub incoming: Vec<BackRef>,
}

impl Neuron {
    pub fn new(id: NeuronId) -> Self {
        Self {
            id,
            label: None,
            charge: 0.0,
            last_charge: 0.0,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// Outgoing synapses that have not been soft-deleted.
    pub fn live_outgoing(&self) -> impl Iterator<Item = &Synapse> {
        self.outgoing.iter().filter(|s| s.is_live())
    }

    /// Incoming back-references that have not been soft-deleted.
    pub fn live_incoming(&self) -> impl Iterator<Item = &BackRef> {
        self.incoming.iter().filter(|b| b.is_live())
    }

    /// The live outgoing synapse to `target`, if any.
    pub fn find_synapse(&self, target: NeuronId) -> Option<&Synapse> {
        self.outgoing.iter().find(|s| s.target == Some(target))
    }

    pub fn find_synapse_mut(&mut self, target: NeuronId) -> Option<&mut Synapse> {
        self.outgoing.iter_mut().find(|s| s.target == Some(target))
    }

    /// Append a synapse to `target`, or update the existing one in place.
    ///
    /// The matching back-reference on the target neuron is the caller's
    /// (the array's) responsibility; a neuron cannot reach its peers.
    pub fn add_synapse(
        &mut self,
        target: NeuronId,
        weight: f32,
        model: SynapseModel,
    ) -> SynapseChange {
        if let Some(existing) = self.find_synapse_mut(target) {
            if existing.weight == weight && existing.model == model {
                return SynapseChange::Unchanged;
            }
            let change = SynapseChange::Updated {
                previous_weight: existing.weight,
                previous_model: existing.model,
            };
            existing.weight = weight;
            existing.model = model;
            return change;
        }
        self.outgoing.push(Synapse::new(target, weight, model));
        SynapseChange::Created
    }

    /// Soft-delete the outgoing synapse to `target`. Silent no-op when no
    /// such synapse exists, so interactive deletes stay idempotent.
    pub fn delete_synapse(&mut self, target: NeuronId) {
        if let Some(s) = self.find_synapse_mut(target) {
            s.clear();
        }
    }

    /// The live back-reference from `source`, if any.
    pub fn find_back_ref(&self, source: NeuronId) -> Option<&BackRef> {
        self.incoming.iter().find(|b| b.source == Some(source))
    }

    /// Insert or refresh the back-reference from `source`.
    pub fn add_back_ref(&mut self, source: NeuronId, weight: f32) {
        if let Some(b) = self.incoming.iter_mut().find(|b| b.source == Some(source)) {
            b.weight = weight;
        } else {
            self.incoming.push(BackRef::new(source, weight));
        }
    }

    /// Soft-delete the back-reference from `source`. Silent no-op if absent.
    pub fn remove_back_ref(&mut self, source: NeuronId) {
        if let Some(b) = self.incoming.iter_mut().find(|b| b.source == Some(source)) {
            b.clear();
        }
    }

    /// Phase 1: compute this neuron's pending charge for the generation in
    /// flight. Reads only committed (`last_charge`) state from the previous
    /// generation, so the whole population can run this concurrently.
    ///
    /// Inputs are pulled through the incoming back-references, but the weight
    /// comes from the source's forward synapse (the authoritative copy); a
    /// back-reference whose forward synapse has vanished contributes nothing,
    /// and is left for the reconciliation pass to clean up.
    pub fn collect_charge(&self, neurons: &[Neuron]) -> f32 {
        let mut total = self.charge;
        for back in self.live_incoming() {
            let Some(source_id) = back.source else {
                continue;
            };
            let Some(source) = neurons.get(source_id) else {
                continue;
            };
            if source.last_charge == 0.0 {
                continue;
            }
            if let Some(forward) = source.find_synapse(self.id) {
                total += forward.weight * source.last_charge;
            }
        }
        total
    }

    /// Phase 2: promote this neuron's pending charge to the committed state
    /// and apply weight-update rules to its outgoing synapses.
    ///
    /// `pending` is the full phase-1 result for the population; it is frozen
    /// between the phases, so reading a target's slot here is race-free.
    /// Returns whether the neuron fired.
    pub fn commit(&mut self, index: NeuronId, pending: &[f32]) -> bool {
        let own = pending[index];
        let fired = own >= FIRE_THRESHOLD;
        if fired {
            self.last_charge = 1.0;
            self.charge = 0.0;
        } else {
            self.last_charge = 0.0;
            self.charge = own.max(0.0);
        }

        if fired {
            for synapse in &mut self.outgoing {
                let Some(target) = synapse.target else {
                    continue;
                };
                let target_fired = pending
                    .get(target)
                    .is_some_and(|&p| p >= FIRE_THRESHOLD);
                match synapse.model {
                    SynapseModel::Fixed => {}
                    SynapseModel::Binary => {
                        if target_fired {
                            synapse.weight = BINARY_TERMINAL_WEIGHT;
                        }
                    }
                    SynapseModel::Hebbian => {
                        synapse.weight = if target_fired {
                            promote_level(synapse.weight)
                        } else {
                            demote_level(synapse.weight)
                        };
                    }
                }
            }
        }

        fired
    }
}

/// Next rung up the Hebbian ladder; saturates at the top level.
fn promote_level(weight: f32) -> f32 {
    for &level in &HEBBIAN_LEVELS {
        if level > weight + LEVEL_EPS {
            return level;
        }
    }
    HEBBIAN_LEVELS[HEBBIAN_LEVELS.len() - 1]
}

/// Next rung down the Hebbian ladder; floors at the bottom level.
fn demote_level(weight: f32) -> f32 {
    for &level in HEBBIAN_LEVELS.iter().rev() {
        if level < weight - LEVEL_EPS {
            return level;
        }
    }
    HEBBIAN_LEVELS[0]
}
