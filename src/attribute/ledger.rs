//! Used-attribute ledger.
//!
//! Translators record every engine attribute they consume into a first-class
//! output channel (positions, UVs, particle channels...). The extra-attribute
//! pass then skips those names instead of exporting them a second time.
//! The ledger is explicit per-pass state: it is cleared at the start of each
//! part translation and never shared between passes.

use std::collections::HashSet;

/// Set of attribute names consumed during one translation pass.
#[derive(Clone, Debug, Default)]
pub struct AttributeLedger {
    used: HashSet<String>,
}

impl AttributeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a name. Recording the same name twice has no effect.
    pub fn mark_used(&mut self, name: &str) {
        if !self.used.contains(name) {
            self.used.insert(name.to_string());
        }
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// Forget every recorded name.
    pub fn clear(&mut self) {
        self.used.clear();
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
