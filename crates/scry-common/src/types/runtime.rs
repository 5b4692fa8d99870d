//! Managed-runtime and agent status types

use super::record::{Record, ToRecord};
use serde::{Deserialize, Serialize};

/// Kind of managed runtime available inside the target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeKind {
    Android,
    #[serde(rename = "iOS")]
    Ios,
    Native,
}

impl RuntimeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeKind::Android => "Android",
            RuntimeKind::Ios => "iOS",
            RuntimeKind::Native => "Native",
        }
    }
}

/// A class loaded by the managed runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
}

impl ToRecord for ClassInfo {
    fn to_record(&self) -> Record {
        Record::new().field("name", self.name.as_str())
    }
}

/// A method of a loaded class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodInfo {
    pub class: String,
    pub name: String,
}

impl ToRecord for MethodInfo {
    fn to_record(&self) -> Record {
        Record::new()
            .field("class", self.class.as_str())
            .field("name", self.name.as_str())
    }
}

/// Snapshot returned by the agent status operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub pid: u32,
    pub arch: String,
    pub runtime: RuntimeKind,
}
