//! Live backend for the agent's own process (Linux)
//!
//! Modules and ranges come from `/proc/self/maps`, re-read on every call so
//! listings reflect the current layout. Raw memory access goes through
//! pointers, gated by a maps lookup: a span is only dereferenced after the
//! whole of it is confirmed mapped with the required protection. The gate is
//! advisory - a mapping can change between check and copy - which is the
//! accepted trade-off for an in-process agent.

use scry_common::{
    ClassInfo, Error, ExportInfo, MethodInfo, ModuleInfo, Protection, RangeInfo, Result,
    RuntimeKind,
};
use scry_core::host::{MemoryAccess, ProcessInspector, RuntimeInspector};
use tracing::debug;

/// One line of `/proc/self/maps`.
#[derive(Debug, Clone)]
struct MapsEntry {
    base: usize,
    end: usize,
    protection: Protection,
    path: Option<String>,
}

impl MapsEntry {
    fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr < self.end
    }
}

/// Parse the text of a maps file. Unparseable lines are skipped.
///
/// The path column is everything after the inode column and may itself
/// contain spaces, so the line is split into at most six columns.
fn parse_maps(content: &str) -> Vec<MapsEntry> {
    let mut entries = Vec::new();
    for line in content.lines() {
        let mut cols = line.splitn(6, ' ');
        let (Some(span), Some(perms)) = (cols.next(), cols.next()) else {
            continue;
        };
        let Some((base, end)) = span.split_once('-') else {
            continue;
        };
        let (Ok(base), Ok(end)) = (
            usize::from_str_radix(base, 16),
            usize::from_str_radix(end, 16),
        ) else {
            continue;
        };
        // skip offset, dev, inode; a leading slash distinguishes file-backed
        // mappings from [heap], [stack] and anonymous ones
        let path = cols
            .nth(3)
            .map(str::trim)
            .filter(|p| p.starts_with('/'))
            .map(str::to_string);
        entries.push(MapsEntry {
            base,
            end,
            protection: Protection::from_mask(perms),
            path,
        });
    }
    entries
}

/// Group file-backed entries into modules, first-seen order, one module per
/// image path spanning its lowest base to its highest end.
fn modules_from_entries(entries: &[MapsEntry]) -> Vec<ModuleInfo> {
    let mut modules: Vec<ModuleInfo> = Vec::new();
    for entry in entries {
        let Some(path) = &entry.path else { continue };
        if let Some(module) = modules.iter_mut().find(|m| &m.path == path) {
            let end = module.base.saturating_add(module.size).max(entry.end);
            module.base = module.base.min(entry.base);
            module.size = end - module.base;
        } else {
            modules.push(ModuleInfo {
                name: module_name(path),
                path: path.clone(),
                base: entry.base,
                size: entry.end - entry.base,
            });
        }
    }
    modules
}

fn module_name(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Whether `[addr, addr + len)` is fully covered by entries carrying `need`.
fn span_covered(entries: &[MapsEntry], addr: usize, len: usize, need: Protection) -> bool {
    let Some(end) = addr.checked_add(len) else {
        return false;
    };
    let mut pos = addr;
    while pos < end {
        match entries
            .iter()
            .find(|e| e.contains(pos) && e.protection.includes(need))
        {
            Some(entry) => pos = entry.end,
            None => return false,
        }
    }
    true
}

/// Introspection and memory access for the process the agent runs inside.
pub struct ProcBackend;

impl ProcBackend {
    pub fn new() -> Self {
        Self
    }

    fn entries(&self) -> Result<Vec<MapsEntry>> {
        let content = std::fs::read_to_string("/proc/self/maps")
            .map_err(|e| Error::Internal(format!("Failed to read /proc/self/maps: {}", e)))?;
        Ok(parse_maps(&content))
    }
}

impl Default for ProcBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessInspector for ProcBackend {
    fn arch(&self) -> String {
        match std::env::consts::ARCH {
            "x86" => "ia32".to_string(),
            "x86_64" => "x64".to_string(),
            "aarch64" => "arm64".to_string(),
            other => other.to_string(),
        }
    }

    fn enumerate_modules(&self) -> Result<Vec<ModuleInfo>> {
        let modules = modules_from_entries(&self.entries()?);
        debug!(target: "scry_agent::proc", count = modules.len(), "Parsed modules from maps");
        Ok(modules)
    }

    fn enumerate_ranges(&self, min: Protection) -> Result<Vec<RangeInfo>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.protection.includes(min))
            .map(|e| RangeInfo {
                base: e.base,
                size: e.end - e.base,
                protection: e.protection,
            })
            .collect())
    }

    fn module_containing(&self, addr: usize) -> Result<Option<ModuleInfo>> {
        Ok(modules_from_entries(&self.entries()?)
            .into_iter()
            .find(|m| m.contains(addr)))
    }

    fn enumerate_exports(&self, module: &str) -> Result<Vec<ExportInfo>> {
        // Symbol tables are a loader/runtime service this bare backend does
        // not parse
        Err(Error::Unsupported(format!(
            "export enumeration not available for {}",
            module
        )))
    }
}

impl MemoryAccess for ProcBackend {
    fn read(&self, addr: usize, len: usize) -> Result<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        if !span_covered(&self.entries()?, addr, len, Protection::from_mask("r")) {
            return Err(Error::MemoryAccess {
                address: addr,
                message: format!("span of {} bytes is not readable", len),
            });
        }
        let mut buf = vec![0u8; len];
        unsafe {
            std::ptr::copy_nonoverlapping(addr as *const u8, buf.as_mut_ptr(), len);
        }
        Ok(buf)
    }

    fn write(&self, addr: usize, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if !span_covered(&self.entries()?, addr, data.len(), Protection::from_mask("w")) {
            return Err(Error::MemoryAccess {
                address: addr,
                message: format!("span of {} bytes is not writable", data.len()),
            });
        }
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), addr as *mut u8, data.len());
        }
        Ok(())
    }
}

/// Runtime inspector for a plain native process: no managed runtime, no
/// classes to enumerate.
pub struct NullRuntime;

impl RuntimeInspector for NullRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Native
    }

    fn loaded_classes(&self) -> Result<Vec<ClassInfo>> {
        Err(Error::Unsupported("no managed runtime loaded".to_string()))
    }

    fn class_methods(&self, _class: &str) -> Result<Vec<MethodInfo>> {
        Err(Error::Unsupported("no managed runtime loaded".to_string()))
    }
}
