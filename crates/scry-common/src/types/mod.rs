//! Common types used across Scry components
//!
//! Organized by concern:
//! - `record` - flat field→scalar records and the scalar value type
//! - `filter` - filter expression tokens
//! - `module` - module and export types
//! - `memory` - memory range, protection and primitive value types
//! - `runtime` - managed runtime, class/method and agent status types

pub mod filter;
pub mod memory;
pub mod module;
pub mod record;
pub mod runtime;

pub use filter::Token;
pub use memory::{PrimType, Protection, RangeInfo};
pub use module::{ExportInfo, ExportKind, ModuleInfo};
pub use record::{Record, ToRecord, Value};
pub use runtime::{AgentStatus, ClassInfo, MethodInfo, RuntimeKind};
