//! Flattening of the `netstandard` compatibility facade.
//!
//! A facade assembly defines no types of its own; it forwards every name to the real
//! implementation assemblies through its exported-type table. Flattening moves the type
//! definitions of those implementation assemblies into the facade's manifest module, so
//! a lookup against the facade finds the definition in one hop.

use std::sync::Arc;

use crate::metadata::{
    assembly::AssemblyRc, identity::AssemblyIdentity, module::Module,
    references::ExportedTypeRc,
};

/// Outcome of flattening one facade.
#[derive(Debug, Default)]
pub struct FlattenReport {
    /// Number of top-level types moved into the facade.
    pub moved_types: usize,
    /// Implementation assemblies whose types were moved out.
    pub touched: Vec<AssemblyRc>,
    /// Forwarding entries whose type did not end up in the facade. These are restored to
    /// the exported-type table.
    pub unresolved: Vec<ExportedTypeRc>,
}

impl FlattenReport {
    /// Returns true if nothing was moved and nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moved_types == 0 && self.touched.is_empty() && self.unresolved.is_empty()
    }
}

/// Merges the implementation assemblies of `facade` into its manifest module.
///
/// `resolve` is asked for every assembly reference the facade declares. A facade without
/// forwarding entries is left alone.
pub(crate) fn flatten(
    facade: &AssemblyRc,
    mut resolve: impl FnMut(&AssemblyIdentity, &Module) -> Option<AssemblyRc>,
) -> FlattenReport {
    let mut report = FlattenReport::default();
    let Some(manifest) = facade.manifest_module() else {
        return report;
    };

    // Cleared up front: an interrupted flatten leaves an empty facade, not a mixed one.
    let forwarded: Vec<ExportedTypeRc> = facade
        .modules()
        .iter()
        .flat_map(|module| module.take_exported_types())
        .collect();
    if forwarded.is_empty() {
        return report;
    }

    for reference in manifest.assembly_refs() {
        let Some(implementation) = resolve(&reference.identity, &manifest) else {
            log::warn!(
                "facade {} references unresolvable assembly {}",
                facade.name(),
                reference.identity.display_name()
            );
            continue;
        };
        if Arc::ptr_eq(&implementation, facade)
            || report
                .touched
                .iter()
                .any(|seen| Arc::ptr_eq(seen, &implementation))
        {
            continue;
        }

        for module in implementation.modules() {
            for ty in module.take_types() {
                manifest.add_type(ty);
                report.moved_types += 1;
            }
        }
        report.touched.push(implementation);
    }

    for exported in forwarded {
        if facade.type_exists(&exported.to_type_ref()) {
            continue;
        }
        log::warn!(
            "facade {} could not flatten forwarded type {}",
            facade.name(),
            exported.full_name()
        );
        manifest.add_exported_type(exported.clone());
        report.unresolved.push(exported);
    }

    log::debug!(
        "flattened facade {}: {} types from {} assemblies, {} unresolved",
        facade.name(),
        report.moved_types,
        report.touched.len(),
        report.unresolved.len()
    );
    report
}
