//! Module and export types

use super::record::{Record, ToRecord};
use serde::{Deserialize, Serialize};

/// A loaded module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    pub path: String,
    pub base: usize,
    pub size: usize,
}

impl ModuleInfo {
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr < self.base.saturating_add(self.size)
    }
}

impl ToRecord for ModuleInfo {
    fn to_record(&self) -> Record {
        Record::new()
            .field("name", self.name.as_str())
            .field("path", self.path.as_str())
            .field("base", self.base)
            .field("size", self.size)
    }
}

/// Kind of an exported symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Function,
    Variable,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Function => "function",
            ExportKind::Variable => "variable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "function" => Some(ExportKind::Function),
            "variable" => Some(ExportKind::Variable),
            _ => None,
        }
    }
}

/// An exported symbol of one module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportInfo {
    pub name: String,
    pub address: usize,
    pub kind: ExportKind,
    pub module: String,
}

impl ToRecord for ExportInfo {
    fn to_record(&self) -> Record {
        Record::new()
            .field("name", self.name.as_str())
            .field("address", self.address)
            .field("kind", self.kind.as_str())
            .field("module", self.module.as_str())
    }
}
