//! Module-level symbol information consulted by the lowering.
//!
//! Two namespaces share one table: external symbols with fixed addresses and
//! procedures declared in the current unit. A call site only needs a target's
//! address (for the short-call decision) and its stack-argument count; both
//! are fixed at declaration time, never by the callee's body.

use std::collections::HashMap;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct ProcedureInfo {
    /// Entry address within the unit.
    pub address: u32,
    pub param_count: usize,
    /// Number of arguments callers pass on the stack (`param_count - 4`,
    /// floored at zero).
    pub stack_args: usize,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    externals: HashMap<String, u32>,
    procedures: HashMap<String, ProcedureInfo>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an external symbol with a known address.
    pub fn define_external(&mut self, name: &str, address: u32) -> Result<()> {
        if self.externals.contains_key(name) || self.procedures.contains_key(name) {
            return Err(Error::DuplicateSymbol(name.to_string()));
        }
        self.externals.insert(name.to_string(), address);
        Ok(())
    }

    /// Register a procedure at its entry address. Called by procedure
    /// lowering when the declaration is processed, which is what makes the
    /// frame contract visible to later call sites.
    pub fn declare_procedure(&mut self, name: &str, info: ProcedureInfo) -> Result<()> {
        if self.externals.contains_key(name) || self.procedures.contains_key(name) {
            return Err(Error::DuplicateSymbol(name.to_string()));
        }
        self.procedures.insert(name.to_string(), info);
        Ok(())
    }

    #[must_use]
    pub fn procedure(&self, name: &str) -> Option<&ProcedureInfo> {
        self.procedures.get(name)
    }

    /// Address of a procedure or external symbol, if known.
    #[must_use]
    pub fn address_of(&self, name: &str) -> Option<u32> {
        self.procedures
            .get(name)
            .map(|p| p.address)
            .or_else(|| self.externals.get(name).copied())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.externals.contains_key(name) || self.procedures.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn externals_and_procedures_share_a_namespace() {
        let mut syms = SymbolTable::new();
        syms.define_external("memcpy", 0x1000).unwrap();
        let info = ProcedureInfo {
            address: 0x2000,
            param_count: 2,
            stack_args: 0,
        };
        assert!(syms.declare_procedure("memcpy", info).is_err());
        syms.declare_procedure("copy", info).unwrap();
        assert!(syms.define_external("copy", 0x3000).is_err());
    }

    #[test]
    fn address_lookup_covers_both_namespaces() {
        let mut syms = SymbolTable::new();
        syms.define_external("puts", 0x1f00).unwrap();
        syms.declare_procedure(
            "main",
            ProcedureInfo {
                address: 0x8000,
                param_count: 6,
                stack_args: 2,
            },
        )
        .unwrap();
        assert_eq!(syms.address_of("puts"), Some(0x1f00));
        assert_eq!(syms.address_of("main"), Some(0x8000));
        assert_eq!(syms.address_of("missing"), None);
        assert_eq!(syms.procedure("main").unwrap().stack_args, 2);
    }
}
