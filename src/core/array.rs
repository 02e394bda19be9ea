//! The neuron array: fixed-capacity store, per-tick orchestration, the 2D
//! index mapping, undo-logged interactive editing, and graph reconciliation.
//!
//! One `tick()` advances the whole population a single generation:
//!
//! 1. registered modules fire, one at a time, in registration order;
//! 2. phase 1 runs over every neuron (parallel under the `parallel`
//!    feature), collecting pending charges from committed state only;
//! 3. phase 2 runs over every neuron, promoting pending charges and applying
//!    synapse weight rules.
//!
//! Collecting the full phase-1 result before phase 2 begins is the barrier
//! the update protocol requires: no neuron can observe a neighbor's
//! same-tick commit. `tick()` and every edit operation take `&mut self`, so
//! edits cannot overlap a running tick.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use hashbrown::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::module::ModuleSlot;
use crate::neuron::{Neuron, SynapseChange};
use crate::synapse::{NeuronId, SynapseModel};

/// Construction parameters for a [`NeuronArray`].
///
/// Capacity is fixed for the lifetime of the array; there is no resize
/// operation. `rows` defines the 2D mapping `index = x * rows + y` used by
/// editors to lay neurons out on a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArrayConfig {
    pub capacity: usize,
    pub rows: usize,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            rows: 100,
        }
    }
}

impl ArrayConfig {
    pub fn with_size(capacity: usize, rows: usize) -> Self {
        Self { capacity, rows }
    }

    /// Degenerate geometry is a configuration error, caught here rather than
    /// later as a division fault inside the coordinate mapping.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.capacity == 0 {
            return Err(GraphError::InvalidConfig("capacity must be at least 1"));
        }
        if self.rows == 0 {
            return Err(GraphError::InvalidConfig("rows must be at least 1"));
        }
        Ok(())
    }
}

/// One reversible structural edit, recorded by the `*_with_undo` operations.
///
/// `Created` undoes to a delete; `Overwrote` undoes to a re-add of the
/// previous weight and model. There is no redo stack: popping a record
/// consumes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UndoRecord {
    Created {
        source: NeuronId,
        target: NeuronId,
    },
    Overwrote {
        source: NeuronId,
        target: NeuronId,
        weight: f32,
        model: SynapseModel,
    },
}

/// On-demand counters for diagnostics, the demo binary, and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayStats {
    pub capacity: usize,
    pub rows: usize,
    pub generation: u64,
    pub live_synapses: usize,
    pub back_refs: usize,
    pub fire_count: u64,
    pub last_fire_count: u64,
    pub undo_depth: usize,
}

#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NeuronArray {
    capacity: usize,
    rows: usize,
    generation: u64,
    /// Free-form notes about this network; travels with snapshots.
    notes: String,
    neurons: Vec<Neuron>,

    // Session-scoped state, rebuilt or reset on snapshot restore.
    #[cfg_attr(feature = "serde", serde(skip))]
    fire_count: u64,
    #[cfg_attr(feature = "serde", serde(skip))]
    last_fire_count: u64,
    /// Phase-1 scratch: one pending charge per neuron. Frozen between the
    /// phases so phase 2 can read any slot race-free.
    #[cfg_attr(feature = "serde", serde(skip))]
    pending: Vec<f32>,
    #[cfg_attr(feature = "serde", serde(skip))]
    undo_log: Vec<UndoRecord>,
    #[cfg_attr(feature = "serde", serde(skip))]
    modules: Vec<ModuleSlot>,
    /// Label interning for editor lookups; derived from the neurons.
    #[cfg_attr(feature = "serde", serde(skip))]
    labels: HashMap<String, NeuronId>,
}

impl NeuronArray {
    pub fn new(config: ArrayConfig) -> Result<Self, GraphError> {
        config.validate()?;

        #[cfg(feature = "parallel")]
        let neurons: Vec<Neuron> = (0..config.capacity).into_par_iter().map(Neuron::new).collect();
        #[cfg(not(feature = "parallel"))]
        let neurons: Vec<Neuron> = (0..config.capacity).map(Neuron::new).collect();

        Ok(Self {
            capacity: config.capacity,
            rows: config.rows,
            generation: 0,
            notes: String::new(),
            neurons,
            fire_count: 0,
            last_fire_count: 0,
            pending: vec![0.0; config.capacity],
            undo_log: Vec::new(),
            modules: Vec::new(),
            labels: HashMap::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Neurons that fired during the most recently completed tick.
    pub fn fire_count(&self) -> u64 {
        self.fire_count
    }

    /// Neurons that fired during the tick before that.
    pub fn last_fire_count(&self) -> u64 {
        self.last_fire_count
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn neuron(&self, id: NeuronId) -> Option<&Neuron> {
        self.neurons.get(id)
    }

    pub fn neuron_mut(&mut self, id: NeuronId) -> Option<&mut Neuron> {
        self.neurons.get_mut(id)
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut String {
        &mut self.notes
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    // ---- coordinate mapping ------------------------------------------------

    /// `index = x * rows + y`. The inverse of [`coordinates_of`] for every
    /// index in `[0, capacity)`.
    ///
    /// [`coordinates_of`]: NeuronArray::coordinates_of
    pub fn index_of(&self, x: usize, y: usize) -> NeuronId {
        x * self.rows + y
    }

    /// `(index / rows, index % rows)`.
    pub fn coordinates_of(&self, index: NeuronId) -> (usize, usize) {
        (index / self.rows, index % self.rows)
    }

    // ---- tick orchestration ------------------------------------------------

    /// Advance the whole population one generation.
    ///
    /// Module hooks run first, single-threaded and in registration order.
    /// Then the two phase passes run over all neurons; under the `parallel`
    /// feature each pass fans out across the rayon pool. Exclusive `&mut`
    /// access makes a tick non-reentrant and keeps structural edits out of
    /// an in-flight tick by construction.
    pub fn tick(&mut self) {
        self.fire_modules();

        self.last_fire_count = self.fire_count;
        self.fire_count = 0;

        self.phase_one();
        // phase_one has fully materialized `pending` for every neuron before
        // this point; that is the inter-phase barrier.
        self.fire_count = self.phase_two();

        self.generation += 1;
    }

    fn fire_modules(&mut self) {
        // The registry is taken out so each module can borrow the array
        // mutably while it runs.
        let mut slots = core::mem::take(&mut self.modules);
        for slot in slots.iter_mut() {
            if let Some(module) = slot.module.as_mut() {
                module.fire(self);
            }
        }
        // A module may itself have registered new slots; keep those after
        // the original registration order.
        let registered_during = core::mem::replace(&mut self.modules, slots);
        self.modules.extend(registered_during);
    }

    fn phase_one(&mut self) {
        let neurons = &self.neurons;

        #[cfg(feature = "parallel")]
        let pending: Vec<f32> = neurons
            .par_iter()
            .map(|n| n.collect_charge(neurons))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let pending: Vec<f32> = neurons.iter().map(|n| n.collect_charge(neurons)).collect();

        self.pending = pending;
    }

    fn phase_two(&mut self) -> u64 {
        let pending = &self.pending;

        #[cfg(feature = "parallel")]
        let fired: u64 = self
            .neurons
            .par_iter_mut()
            .enumerate()
            .map(|(i, n)| u64::from(n.commit(i, pending)))
            .sum();

        #[cfg(not(feature = "parallel"))]
        let fired: u64 = self
            .neurons
            .iter_mut()
            .enumerate()
            .map(|(i, n)| u64::from(n.commit(i, pending)))
            .sum();

        fired
    }

    /// Inject charge into one neuron, as a module hook or an interactive
    /// driver would. The charge participates in the next phase 1.
    pub fn stimulate(&mut self, index: NeuronId, amount: f32) -> Result<(), GraphError> {
        self.check_index(index)?;
        self.neurons[index].charge += amount;
        Ok(())
    }

    // ---- structural edits --------------------------------------------------

    fn check_index(&self, index: NeuronId) -> Result<(), GraphError> {
        if index >= self.capacity {
            return Err(GraphError::IndexOutOfRange {
                index,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Add or update a synapse and keep the target's back-reference in step.
    /// Does not touch the undo log; modules and programmatic wiring use this
    /// directly, the editor goes through [`add_synapse_with_undo`].
    ///
    /// [`add_synapse_with_undo`]: NeuronArray::add_synapse_with_undo
    pub fn add_synapse(
        &mut self,
        source: NeuronId,
        target: NeuronId,
        weight: f32,
        model: SynapseModel,
    ) -> Result<SynapseChange, GraphError> {
        self.check_index(source)?;
        self.check_index(target)?;
        let change = self.neurons[source].add_synapse(target, weight, model);
        if change != SynapseChange::Unchanged {
            self.neurons[target].add_back_ref(source, weight);
        }
        Ok(change)
    }

    /// Soft-delete a synapse and its back-reference. Missing synapse: no-op.
    pub fn delete_synapse(&mut self, source: NeuronId, target: NeuronId) -> Result<(), GraphError> {
        self.check_index(source)?;
        self.check_index(target)?;
        if self.neurons[source].find_synapse(target).is_none() {
            return Ok(());
        }
        self.neurons[source].delete_synapse(target);
        self.neurons[target].remove_back_ref(source);
        Ok(())
    }

    /// Editor-facing add: validates, records the inverse operation, then
    /// applies. An add that changes nothing records nothing.
    pub fn add_synapse_with_undo(
        &mut self,
        source: NeuronId,
        target: NeuronId,
        weight: f32,
        model: SynapseModel,
    ) -> Result<(), GraphError> {
        let change = self.add_synapse(source, target, weight, model)?;
        match change {
            SynapseChange::Created => {
                self.undo_log.push(UndoRecord::Created { source, target });
            }
            SynapseChange::Updated {
                previous_weight,
                previous_model,
            } => {
                self.undo_log.push(UndoRecord::Overwrote {
                    source,
                    target,
                    weight: previous_weight,
                    model: previous_model,
                });
            }
            SynapseChange::Unchanged => {}
        }
        Ok(())
    }

    /// Editor-facing delete: records the pre-deletion weight and model so the
    /// edge can be restored, then soft-deletes synapse and back-reference.
    pub fn delete_synapse_with_undo(
        &mut self,
        source: NeuronId,
        target: NeuronId,
    ) -> Result<(), GraphError> {
        self.check_index(source)?;
        self.check_index(target)?;
        let Some((weight, model)) = self.neurons[source]
            .find_synapse(target)
            .map(|s| (s.weight, s.model))
        else {
            return Ok(());
        };
        self.undo_log.push(UndoRecord::Overwrote {
            source,
            target,
            weight,
            model,
        });
        self.neurons[source].delete_synapse(target);
        self.neurons[target].remove_back_ref(source);
        Ok(())
    }

    /// Reverse the most recent recorded edit. LIFO; consuming, no redo
    /// stack. Empty log: silent no-op.
    pub fn undo_last(&mut self) {
        let Some(record) = self.undo_log.pop() else {
            return;
        };
        // Indices were range-checked when the record was pushed and the
        // capacity never changes, so direct indexing is safe here.
        match record {
            UndoRecord::Created { source, target } => {
                self.neurons[source].delete_synapse(target);
                self.neurons[target].remove_back_ref(source);
            }
            UndoRecord::Overwrote {
                source,
                target,
                weight,
                model,
            } => {
                self.neurons[source].add_synapse(target, weight, model);
                self.neurons[target].add_back_ref(source, weight);
            }
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_log.len()
    }

    // ---- reconciliation ----------------------------------------------------

    /// Compaction and self-healing pass. Physically removes soft-deleted
    /// entries from both adjacency lists, drops entries pointing outside the
    /// array, reassigns every neuron's stored id to its index, discards
    /// back-references whose forward synapse is gone, and synthesizes or
    /// refreshes the back-reference for every live forward synapse.
    ///
    /// The forward lists are the single source of truth; back-references are
    /// rebuilt from them. Running this twice in a row changes nothing.
    pub fn reconcile_graph(&mut self) {
        let capacity = self.capacity;

        // Compact both lists and repair identifier drift.
        for (i, n) in self.neurons.iter_mut().enumerate() {
            n.id = i;
            n.outgoing
                .retain(|s| s.target.is_some_and(|t| t < capacity));
            n.incoming
                .retain(|b| b.source.is_some_and(|s| s < capacity));
        }

        // Drop back-references no live forward synapse backs.
        for j in 0..capacity {
            let incoming = core::mem::take(&mut self.neurons[j].incoming);
            let kept = incoming
                .into_iter()
                .filter(|b| {
                    b.source
                        .is_some_and(|s| self.neurons[s].find_synapse(j).is_some())
                })
                .collect();
            self.neurons[j].incoming = kept;
        }

        // Synthesize missing back-references and refresh stale weights.
        let forward: Vec<(NeuronId, NeuronId, f32)> = self
            .neurons
            .iter()
            .enumerate()
            .flat_map(|(i, n)| {
                n.live_outgoing()
                    .filter_map(move |s| s.target.map(|t| (i, t, s.weight)))
            })
            .collect();
        for (source, target, weight) in forward {
            self.neurons[target].add_back_ref(source, weight);
        }
    }

    // ---- module registry ---------------------------------------------------

    /// Append a module slot. Slots fire in registration order, once per tick.
    pub fn register_module(&mut self, slot: ModuleSlot) {
        self.modules.push(slot);
    }

    pub fn modules(&self) -> &[ModuleSlot] {
        &self.modules
    }

    /// Exact-match lookup on the trimmed label.
    pub fn find_module_by_label(&self, label: &str) -> Option<&ModuleSlot> {
        self.modules.iter().find(|s| s.label.trim() == label)
    }

    /// Prefix match on the command line; first registration-order hit wins.
    pub fn find_module_by_command(&self, command: &str) -> Option<&ModuleSlot> {
        self.modules
            .iter()
            .find(|s| s.command_line.starts_with(command))
    }

    // ---- labels ------------------------------------------------------------

    /// Label a neuron and index the label for lookup. Labels are unique by
    /// convention; relabeling steals the name from its previous owner.
    pub fn set_label(&mut self, index: NeuronId, label: impl Into<String>) -> Result<(), GraphError> {
        self.check_index(index)?;
        let label = label.into();
        if let Some(old) = self.neurons[index].label.take() {
            self.labels.remove(&old);
        }
        // The neuron fields and the map must agree at all times: the map is
        // rebuilt from the fields on snapshot restore.
        if let Some(previous_owner) = self.labels.insert(label.clone(), index) {
            self.neurons[previous_owner].label = None;
        }
        self.neurons[index].label = Some(label);
        Ok(())
    }

    pub fn clear_label(&mut self, index: NeuronId) -> Result<(), GraphError> {
        self.check_index(index)?;
        if let Some(old) = self.neurons[index].label.take() {
            self.labels.remove(&old);
        }
        Ok(())
    }

    pub fn neuron_by_label(&self, label: &str) -> Option<NeuronId> {
        self.labels.get(label).copied()
    }

    // ---- diagnostics -------------------------------------------------------

    pub fn stats(&self) -> ArrayStats {
        ArrayStats {
            capacity: self.capacity,
            rows: self.rows,
            generation: self.generation,
            live_synapses: self.neurons.iter().map(|n| n.live_outgoing().count()).sum(),
            back_refs: self.neurons.iter().map(|n| n.live_incoming().count()).sum(),
            fire_count: self.fire_count,
            last_fire_count: self.last_fire_count,
            undo_depth: self.undo_log.len(),
        }
    }

    /// Recreate session state a snapshot does not carry: the phase scratch
    /// buffer and the label index. Validates the restored geometry.
    #[cfg(all(feature = "std", feature = "serde"))]
    pub(crate) fn rebuild_runtime_state(&mut self) -> Result<(), GraphError> {
        ArrayConfig::with_size(self.capacity, self.rows).validate()?;
        if self.neurons.len() != self.capacity {
            return Err(GraphError::Snapshot(format!(
                "snapshot holds {} neurons but declares capacity {}",
                self.neurons.len(),
                self.capacity
            )));
        }
        self.pending = vec![0.0; self.capacity];
        self.labels = self
            .neurons
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.label.clone().map(|label| (label, i)))
            .collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;
    use crate::synapse::SynapseModel::{Binary, Fixed, Hebbian};

    fn small() -> NeuronArray {
        NeuronArray::new(ArrayConfig::with_size(100, 10)).expect("valid config")
    }

    /// Snapshot of the live adjacency, for exact before/after comparisons.
    fn live_edges(array: &NeuronArray) -> Vec<(usize, usize, f32, SynapseModel)> {
        let mut edges: Vec<_> = array
            .neurons()
            .iter()
            .enumerate()
            .flat_map(|(i, n)| {
                n.live_outgoing()
                    .filter_map(move |s| s.target.map(|t| (i, t, s.weight, s.model)))
            })
            .collect();
        edges.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        edges
    }

    #[test]
    fn degenerate_geometry_is_rejected_at_construction() {
        assert_eq!(
            NeuronArray::new(ArrayConfig::with_size(100, 0)).unwrap_err(),
            GraphError::InvalidConfig("rows must be at least 1")
        );
        assert_eq!(
            NeuronArray::new(ArrayConfig::with_size(0, 10)).unwrap_err(),
            GraphError::InvalidConfig("capacity must be at least 1")
        );
    }

    #[test]
    fn coordinate_mapping_is_a_bijection() {
        let array = small();
        for index in 0..array.capacity() {
            let (x, y) = array.coordinates_of(index);
            assert_eq!(array.index_of(x, y), index);
        }
        for x in 0..10 {
            for y in 0..10 {
                assert_eq!(array.coordinates_of(array.index_of(x, y)), (x, y));
            }
        }
    }

    #[test]
    fn fresh_array_has_index_matching_ids_and_no_edges() {
        let array = small();
        assert_eq!(array.neurons().len(), 100);
        for (i, n) in array.neurons().iter().enumerate() {
            assert_eq!(n.id, i);
            assert_eq!(n.outgoing.len(), 0);
            assert_eq!(n.incoming.len(), 0);
        }
    }

    #[test]
    fn add_then_undo_removes_edge_and_back_reference() {
        let mut array = small();
        array.add_synapse_with_undo(5, 42, 0.75, Fixed).unwrap();

        let s = array.neuron(5).unwrap().find_synapse(42).unwrap();
        assert_eq!(s.weight, 0.75);
        let b = array.neuron(42).unwrap().find_back_ref(5).unwrap();
        assert_eq!(b.weight, 0.75);

        array.undo_last();
        assert_eq!(array.neuron(5).unwrap().live_outgoing().count(), 0);
        assert_eq!(array.neuron(42).unwrap().live_incoming().count(), 0);
        assert_eq!(array.undo_depth(), 0);
    }

    #[test]
    fn overwrite_then_undo_restores_weight_without_deleting() {
        let mut array = small();
        array.add_synapse_with_undo(5, 42, 0.2, Fixed).unwrap();
        array.add_synapse_with_undo(5, 42, 0.9, Fixed).unwrap();
        assert_eq!(array.neuron(5).unwrap().find_synapse(42).unwrap().weight, 0.9);

        array.undo_last();
        let s = array.neuron(5).unwrap().find_synapse(42).unwrap();
        assert_eq!(s.weight, 0.2);
        assert_eq!(array.neuron(5).unwrap().live_outgoing().count(), 1);
        // The back-reference weight followed the restore.
        assert_eq!(array.neuron(42).unwrap().find_back_ref(5).unwrap().weight, 0.2);
    }

    #[test]
    fn identical_re_add_records_no_undo_entry() {
        let mut array = small();
        array.add_synapse_with_undo(5, 42, 0.75, Fixed).unwrap();
        array.add_synapse_with_undo(5, 42, 0.75, Fixed).unwrap();
        assert_eq!(array.undo_depth(), 1);
    }

    #[test]
    fn out_of_range_edit_is_rejected_without_side_effects() {
        let mut array = small();
        let before = live_edges(&array);

        let err = array.add_synapse_with_undo(5, 150, 0.5, Fixed).unwrap_err();
        assert_eq!(
            err,
            GraphError::IndexOutOfRange {
                index: 150,
                capacity: 100
            }
        );
        assert_eq!(live_edges(&array), before);
        assert_eq!(array.undo_depth(), 0);

        assert!(array.delete_synapse_with_undo(150, 5).is_err());
        assert_eq!(array.undo_depth(), 0);
    }

    #[test]
    fn delete_then_undo_restores_the_edge() {
        let mut array = small();
        array.add_synapse_with_undo(5, 42, 0.3, Hebbian).unwrap();
        array.delete_synapse_with_undo(5, 42).unwrap();
        assert_eq!(array.neuron(5).unwrap().live_outgoing().count(), 0);
        assert_eq!(array.neuron(42).unwrap().live_incoming().count(), 0);

        array.undo_last();
        let s = array.neuron(5).unwrap().find_synapse(42).unwrap();
        assert_eq!(s.weight, 0.3);
        assert_eq!(s.model, Hebbian);
        assert_eq!(array.neuron(42).unwrap().find_back_ref(5).unwrap().weight, 0.3);
    }

    #[test]
    fn deleting_a_missing_synapse_is_a_silent_no_op() {
        let mut array = small();
        array.delete_synapse_with_undo(5, 42).unwrap();
        assert_eq!(array.undo_depth(), 0);
    }

    #[test]
    fn undo_on_an_empty_log_is_a_silent_no_op() {
        let mut array = small();
        array.undo_last();
        assert_eq!(array.generation(), 0);
    }

    #[test]
    fn mixed_edit_sequence_fully_unwinds_lifo() {
        let mut array = small();
        array.add_synapse_with_undo(1, 2, 0.4, Fixed).unwrap();
        array.add_synapse_with_undo(3, 4, 0.5, Binary).unwrap();
        let before = live_edges(&array);

        array.add_synapse_with_undo(1, 2, 0.9, Hebbian).unwrap(); // overwrite
        array.delete_synapse_with_undo(3, 4).unwrap(); // delete
        array.add_synapse_with_undo(7, 8, 0.1, Fixed).unwrap(); // create
        assert_eq!(array.undo_depth(), 5);

        array.undo_last();
        array.undo_last();
        array.undo_last();
        assert_eq!(live_edges(&array), before);
        assert_eq!(array.undo_depth(), 2);
    }

    #[test]
    fn reconcile_compacts_sentinels_and_repairs_ids() {
        let mut array = small();
        array.add_synapse_with_undo(1, 2, 0.4, Fixed).unwrap();
        array.add_synapse_with_undo(1, 3, 0.5, Fixed).unwrap();
        array.delete_synapse_with_undo(1, 2).unwrap();
        // Simulate identifier drift from external corruption.
        array.neuron_mut(1).unwrap().id = 77;

        array.reconcile_graph();

        let n1 = array.neuron(1).unwrap();
        assert_eq!(n1.id, 1);
        assert_eq!(n1.outgoing.len(), 1); // sentinel physically removed
        assert_eq!(n1.outgoing[0].target, Some(3));
        assert_eq!(array.neuron(2).unwrap().incoming.len(), 0);
    }

    #[test]
    fn reconcile_synthesizes_missing_back_references() {
        let mut array = small();
        // Raw edit behind the array's back: forward synapse only.
        array.neuron_mut(6).unwrap().add_synapse(9, 0.8, Fixed);
        assert!(array.neuron(9).unwrap().find_back_ref(6).is_none());

        array.reconcile_graph();

        let b = array.neuron(9).unwrap().find_back_ref(6).unwrap();
        assert_eq!(b.weight, 0.8);
    }

    #[test]
    fn reconcile_refreshes_stale_back_reference_weights() {
        let mut array = small();
        array.add_synapse(6, 9, 0.8, Fixed).unwrap();
        // Drift the cached copy.
        array.neuron_mut(9).unwrap().incoming[0].weight = 0.1;

        array.reconcile_graph();
        assert_eq!(array.neuron(9).unwrap().find_back_ref(6).unwrap().weight, 0.8);
    }

    #[test]
    fn reconcile_drops_orphaned_back_references() {
        let mut array = small();
        array.neuron_mut(9).unwrap().add_back_ref(6, 0.8); // no forward edge

        array.reconcile_graph();
        assert_eq!(array.neuron(9).unwrap().incoming.len(), 0);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut array = small();
        array.add_synapse_with_undo(1, 2, 0.4, Fixed).unwrap();
        array.delete_synapse_with_undo(1, 2).unwrap();
        array.neuron_mut(6).unwrap().add_synapse(9, 0.8, Fixed);
        array.neuron_mut(3).unwrap().add_back_ref(50, 0.5);

        array.reconcile_graph();
        let once = live_edges(&array);
        let incoming_once: Vec<_> = array
            .neurons()
            .iter()
            .map(|n| n.incoming.clone())
            .collect();

        array.reconcile_graph();
        assert_eq!(live_edges(&array), once);
        let incoming_twice: Vec<_> = array
            .neurons()
            .iter()
            .map(|n| n.incoming.clone())
            .collect();
        assert_eq!(incoming_once, incoming_twice);
    }

    #[test]
    fn tick_counters_track_exactly_the_firing_population() {
        let mut array = small();
        for id in [3, 4, 5] {
            array.stimulate(id, 1.0).unwrap();
        }

        array.tick();
        assert_eq!(array.generation(), 1);
        assert_eq!(array.fire_count(), 3);
        assert_eq!(array.last_fire_count(), 0);

        // Nothing stimulated: next tick fires nobody, and the previous
        // count shifts into last_fire_count.
        array.tick();
        assert_eq!(array.generation(), 2);
        assert_eq!(array.fire_count(), 0);
        assert_eq!(array.last_fire_count(), 3);
    }

    #[test]
    fn a_pulse_propagates_exactly_one_hop_per_tick() {
        // If a phase-1 read could observe a same-tick phase-2 commit, the
        // pulse would jump more than one link in a single generation.
        let mut array = small();
        array.add_synapse(0, 1, 1.0, Fixed).unwrap();
        array.add_synapse(1, 2, 1.0, Fixed).unwrap();
        array.stimulate(0, 1.0).unwrap();

        array.tick();
        let fired: Vec<f32> = (0..3).map(|i| array.neuron(i).unwrap().last_charge).collect();
        assert_eq!(fired, vec![1.0, 0.0, 0.0]);

        array.tick();
        let fired: Vec<f32> = (0..3).map(|i| array.neuron(i).unwrap().last_charge).collect();
        assert_eq!(fired, vec![0.0, 1.0, 0.0]);

        array.tick();
        let fired: Vec<f32> = (0..3).map(|i| array.neuron(i).unwrap().last_charge).collect();
        assert_eq!(fired, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn sub_threshold_charge_accumulates_across_ticks() {
        let mut array = small();
        array.stimulate(7, 0.6).unwrap();
        array.tick();
        assert_eq!(array.fire_count(), 0);

        array.stimulate(7, 0.6).unwrap();
        array.tick();
        assert_eq!(array.fire_count(), 1);
        assert_eq!(array.neuron(7).unwrap().charge, 0.0);
    }

    struct Stimulator {
        target: usize,
        amount: f32,
    }

    impl Module for Stimulator {
        fn fire(&mut self, array: &mut NeuronArray) {
            array.stimulate(self.target, self.amount).unwrap();
        }
    }

    struct NoteWriter {
        mark: char,
    }

    impl Module for NoteWriter {
        fn fire(&mut self, array: &mut NeuronArray) {
            array.notes_mut().push(self.mark);
        }
    }

    #[test]
    fn modules_fire_before_the_phases_of_the_same_tick() {
        let mut array = small();
        array.register_module(ModuleSlot::new(
            "stim",
            "stim neuron0",
            Some(Box::new(Stimulator {
                target: 0,
                amount: 1.0,
            })),
        ));

        // The hook's stimulation reaches phase 1 of the very same tick.
        array.tick();
        assert_eq!(array.fire_count(), 1);
    }

    #[test]
    fn modules_fire_in_registration_order_and_empty_slots_are_skipped() {
        let mut array = small();
        array.register_module(ModuleSlot::new("a", "a", Some(Box::new(NoteWriter { mark: 'a' }))));
        array.register_module(ModuleSlot::placeholder("hole", "hole"));
        array.register_module(ModuleSlot::new("b", "b", Some(Box::new(NoteWriter { mark: 'b' }))));

        array.tick();
        array.tick();
        assert_eq!(array.notes(), "abab");
    }

    #[test]
    fn module_lookup_by_label_and_command_prefix() {
        let mut array = small();
        array.register_module(ModuleSlot::placeholder(" vision ", "vision 12 8"));
        array.register_module(ModuleSlot::placeholder("motor", "motor left"));
        array.register_module(ModuleSlot::placeholder("motor2", "motor right"));

        assert_eq!(array.find_module_by_label("vision").unwrap().label.trim(), "vision");
        assert!(array.find_module_by_label("nope").is_none());

        // Prefix match, first in registration order wins.
        let hit = array.find_module_by_command("motor").unwrap();
        assert_eq!(hit.label, "motor");
        assert!(array.find_module_by_command("audio").is_none());
    }

    #[test]
    fn labels_resolve_to_indices_and_relabeling_moves_the_name() {
        let mut array = small();
        array.set_label(4, "input").unwrap();
        assert_eq!(array.neuron_by_label("input"), Some(4));

        array.set_label(9, "input").unwrap();
        assert_eq!(array.neuron_by_label("input"), Some(9));
        // The displaced owner's field is cleared too; neuron state and the
        // lookup map never disagree.
        assert_eq!(array.neuron(4).unwrap().label, None);
        assert_eq!(array.neuron(9).unwrap().label.as_deref(), Some("input"));

        array.clear_label(9).unwrap();
        assert_eq!(array.neuron_by_label("input"), None);
        assert!(array.set_label(200, "far").is_err());
    }

    #[test]
    fn array_is_debug_formattable() {
        // unwrap_err on Result<NeuronArray, _> needs this; keep it covered.
        let array = small();
        let rendered = format!("{array:?}");
        assert!(rendered.contains("NeuronArray"));
    }

    #[test]
    fn stats_count_live_structures_only() {
        let mut array = small();
        array.add_synapse_with_undo(1, 2, 0.4, Fixed).unwrap();
        array.add_synapse_with_undo(2, 3, 0.5, Fixed).unwrap();
        array.delete_synapse_with_undo(2, 3).unwrap();

        let stats = array.stats();
        assert_eq!(stats.live_synapses, 1);
        assert_eq!(stats.back_refs, 1);
        assert_eq!(stats.undo_depth, 3);
        assert_eq!(stats.capacity, 100);
        assert_eq!(stats.rows, 10);
    }
}
