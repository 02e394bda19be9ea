//! The module-hook contract.
//!
//! Modules are externally supplied per-tick callbacks with full read/write
//! access to the array. The array fires each registered module exactly once
//! per tick, in registration order, single-threaded, before the neuron
//! phases begin, so modules never race each other or the parallel passes.

use crate::array::NeuronArray;

/// A per-tick hook. `fire` is the single operation the array ever invokes.
pub trait Module: Send {
    fn fire(&mut self, array: &mut NeuronArray);
}

/// Registry entry for one module.
///
/// A slot may be registered before its module is constructed; an empty slot
/// (`module: None`) is skipped during the tick, not treated as an error.
pub struct ModuleSlot {
    /// Exact-match lookup key (compared trimmed).
    pub label: String,
    /// Command string this module answers to; matched by prefix.
    pub command_line: String,
    pub module: Option<Box<dyn Module>>,
}

impl ModuleSlot {
    pub fn new(
        label: impl Into<String>,
        command_line: impl Into<String>,
        module: Option<Box<dyn Module>>,
    ) -> Self {
        Self {
            label: label.into(),
            command_line: command_line.into(),
            module,
        }
    }

    /// An empty slot: registered, looked up by label/command, never fired.
    pub fn placeholder(label: impl Into<String>, command_line: impl Into<String>) -> Self {
        Self::new(label, command_line, None)
    }
}

impl core::fmt::Debug for ModuleSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleSlot")
            .field("label", &self.label)
            .field("command_line", &self.command_line)
            .field("module", &self.module.as_ref().map(|_| "<module>"))
            .finish()
    }
}
