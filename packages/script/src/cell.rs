//! ScriptCell: a call site's snippet and the unit bound from it.

use std::sync::{Arc, Mutex, OnceLock};

use loadstone_source::Result;

use crate::compiler::CompiledUnit;

/// Holds snippet text and, once bound, the unit compiled from it.
///
/// A cell binds at most once and is never cleared. Every caller that
/// observes a bound cell gets the same instance.
pub struct ScriptCell {
    source: String,
    bound: OnceLock<Arc<dyn CompiledUnit>>,
    gate: Mutex<()>,
}

impl ScriptCell {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            bound: OnceLock::new(),
            gate: Mutex::new(()),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The bound unit, if binding has happened.
    pub fn bound(&self) -> Option<&Arc<dyn CompiledUnit>> {
        self.bound.get()
    }

    pub fn is_bound(&self) -> bool {
        self.bound.get().is_some()
    }

    /// Return the bound unit, running `bind` first if there is none.
    ///
    /// `bind` runs at most once per successful binding: concurrent callers
    /// wait on the cell's gate and then see the bound unit. A failed `bind`
    /// leaves the cell unbound.
    pub(crate) fn bind_with<F>(&self, bind: F) -> Result<Arc<dyn CompiledUnit>>
    where
        F: FnOnce(&str) -> Result<Arc<dyn CompiledUnit>>,
    {
        if let Some(unit) = self.bound.get() {
            return Ok(Arc::clone(unit));
        }

        let _guard = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(unit) = self.bound.get() {
            return Ok(Arc::clone(unit));
        }

        let unit = bind(&self.source)?;
        Ok(Arc::clone(self.bound.get_or_init(|| unit)))
    }
}

impl std::fmt::Debug for ScriptCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptCell")
            .field("source", &self.source)
            .field("bound", &self.bound().map(|unit| unit.qualified_name()))
            .finish()
    }
}
