//! Listing operations
//!
//! Each operation obtains one raw collection from a host capability,
//! flattens it into records and funnels it through the filter engine. The
//! engine's output is what the controller sees; nothing else is computed
//! here.

use crate::filter;
use crate::host::{ProcessInspector, RuntimeInspector};
use scry_common::{ExportKind, Protection, Record, Result, ToRecord, Token};
use tracing::debug;

fn run<T: ToRecord>(raw: &[T], filter_expr: Option<&[Token]>) -> Vec<Record> {
    let records: Vec<Record> = raw.iter().map(ToRecord::to_record).collect();
    filter::apply(&records, filter_expr)
}

/// Loaded modules.
pub fn modules(
    inspector: &dyn ProcessInspector,
    filter_expr: Option<&[Token]>,
) -> Result<Vec<Record>> {
    let raw = inspector.enumerate_modules()?;
    debug!(target: "scry_core::listing", count = raw.len(), "Enumerated modules");
    Ok(run(&raw, filter_expr))
}

/// Mapped ranges carrying at least `min` protection.
pub fn ranges(
    inspector: &dyn ProcessInspector,
    min: Protection,
    filter_expr: Option<&[Token]>,
) -> Result<Vec<Record>> {
    let raw = inspector.enumerate_ranges(min)?;
    debug!(target: "scry_core::listing", count = raw.len(), protect = %min, "Enumerated ranges");
    Ok(run(&raw, filter_expr))
}

/// Ranges fully contained in the module whose image holds `addr`.
///
/// An address outside every known module yields an empty collection.
pub fn ranges_in_module(
    inspector: &dyn ProcessInspector,
    addr: usize,
    min: Protection,
    filter_expr: Option<&[Token]>,
) -> Result<Vec<Record>> {
    let module = match inspector.module_containing(addr)? {
        Some(m) => m,
        None => {
            debug!(target: "scry_core::listing", address = format!("{:#x}", addr), "Address not in any module");
            return Ok(Vec::new());
        }
    };

    let module_end = module.base.saturating_add(module.size);
    let raw: Vec<_> = inspector
        .enumerate_ranges(min)?
        .into_iter()
        .filter(|r| r.base >= module.base && r.end() <= module_end)
        .collect();
    debug!(
        target: "scry_core::listing",
        module = %module.name,
        count = raw.len(),
        "Enumerated module ranges"
    );
    Ok(run(&raw, filter_expr))
}

/// Exports of the module whose image holds `addr`, optionally restricted to
/// one export kind before the filter expression applies.
///
/// An address outside every known module yields an empty collection.
pub fn exports(
    inspector: &dyn ProcessInspector,
    addr: usize,
    kind: Option<ExportKind>,
    filter_expr: Option<&[Token]>,
) -> Result<Vec<Record>> {
    let module = match inspector.module_containing(addr)? {
        Some(m) => m,
        None => {
            debug!(target: "scry_core::listing", address = format!("{:#x}", addr), "Address not in any module");
            return Ok(Vec::new());
        }
    };

    let mut raw = inspector.enumerate_exports(&module.name)?;
    if let Some(kind) = kind {
        raw.retain(|e| e.kind == kind);
    }
    debug!(target: "scry_core::listing", module = %module.name, count = raw.len(), "Enumerated exports");
    Ok(run(&raw, filter_expr))
}

/// Classes loaded by the managed runtime.
pub fn classes(
    runtime: &dyn RuntimeInspector,
    filter_expr: Option<&[Token]>,
) -> Result<Vec<Record>> {
    let raw = runtime.loaded_classes()?;
    debug!(target: "scry_core::listing", count = raw.len(), "Enumerated classes");
    Ok(run(&raw, filter_expr))
}

/// Methods of one loaded class.
pub fn methods(
    runtime: &dyn RuntimeInspector,
    class: &str,
    filter_expr: Option<&[Token]>,
) -> Result<Vec<Record>> {
    let raw = runtime.class_methods(class)?;
    debug!(target: "scry_core::listing", class, count = raw.len(), "Enumerated methods");
    Ok(run(&raw, filter_expr))
}
