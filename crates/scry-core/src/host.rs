//! Host capability traits
//!
//! The introspection primitives live in the host process (or its managed
//! runtime) and are injected into the core as trait objects, one contract
//! per capability. The listing operations and the filter engine only ever
//! see the result collections, so everything here can be backed by
//! synthetic data in tests.

use scry_common::{ClassInfo, ExportInfo, MethodInfo, ModuleInfo, Protection, RangeInfo, Result, RuntimeKind};

/// Native process introspection: modules and memory ranges.
pub trait ProcessInspector: Send + Sync {
    /// Target architecture name ("x64", "arm64", ...).
    fn arch(&self) -> String;

    /// All loaded modules, in load order.
    fn enumerate_modules(&self) -> Result<Vec<ModuleInfo>>;

    /// All mapped ranges carrying at least the given protection.
    fn enumerate_ranges(&self, min: Protection) -> Result<Vec<RangeInfo>>;

    /// The module whose image contains `addr`, if any.
    fn module_containing(&self, addr: usize) -> Result<Option<ModuleInfo>>;

    /// Exports of the named module.
    fn enumerate_exports(&self, module: &str) -> Result<Vec<ExportInfo>>;
}

/// Managed-runtime introspection: loaded classes and their methods.
pub trait RuntimeInspector: Send + Sync {
    fn kind(&self) -> RuntimeKind;

    /// All classes currently loaded by the runtime.
    fn loaded_classes(&self) -> Result<Vec<ClassInfo>>;

    /// Methods of one loaded class.
    fn class_methods(&self, class: &str) -> Result<Vec<MethodInfo>>;
}

/// Raw memory access within the target process.
pub trait MemoryAccess: Send + Sync {
    /// Read `len` bytes starting at `addr`.
    fn read(&self, addr: usize, len: usize) -> Result<Vec<u8>>;

    /// Write bytes starting at `addr`.
    fn write(&self, addr: usize, data: &[u8]) -> Result<()>;
}
