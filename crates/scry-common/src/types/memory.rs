//! Memory range and primitive value types

use super::record::{Record, ToRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory protection flags, rendered in the conventional `rwx` mask form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protection {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl Protection {
    pub fn new(read: bool, write: bool, execute: bool) -> Self {
        Self {
            read,
            write,
            execute,
        }
    }

    /// Parse a mask like `"rw-"` or `"r-xp"`; unknown characters are ignored,
    /// so `"---"` means no flags required.
    pub fn from_mask(mask: &str) -> Self {
        let mut prot = Self::default();
        for c in mask.chars() {
            match c {
                'r' => prot.read = true,
                'w' => prot.write = true,
                'x' => prot.execute = true,
                _ => {}
            }
        }
        prot
    }

    /// Whether this protection grants at least the flags of `min`.
    pub fn includes(&self, min: Protection) -> bool {
        (self.read || !min.read) && (self.write || !min.write) && (self.execute || !min.execute)
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.read { 'r' } else { '-' },
            if self.write { 'w' } else { '-' },
            if self.execute { 'x' } else { '-' },
        )
    }
}

/// A mapped memory range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeInfo {
    pub base: usize,
    pub size: usize,
    pub protection: Protection,
}

impl RangeInfo {
    pub fn end(&self) -> usize {
        self.base.saturating_add(self.size)
    }
}

impl ToRecord for RangeInfo {
    fn to_record(&self) -> Record {
        Record::new()
            .field("base", self.base)
            .field("size", self.size)
            .field("protection", self.protection.to_string())
    }
}

/// Primitive value types for typed memory reads and writes.
///
/// Names follow the wire method suffixes (`reader_byte`, `writer_ulong`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimType {
    Byte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    String,
    Bytes,
}

impl PrimType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "byte" => Some(PrimType::Byte),
            "short" => Some(PrimType::Short),
            "ushort" => Some(PrimType::UShort),
            "int" => Some(PrimType::Int),
            "uint" => Some(PrimType::UInt),
            "long" => Some(PrimType::Long),
            "ulong" => Some(PrimType::ULong),
            "float" => Some(PrimType::Float),
            "double" => Some(PrimType::Double),
            "string" => Some(PrimType::String),
            "bytes" => Some(PrimType::Bytes),
            _ => None,
        }
    }
}
