//! Request dispatch over the injected capabilities
//!
//! The agent itself is stateless: every request is served from a fresh
//! collection obtained through the capability traits, so concurrent and
//! repeated calls need no coordination.

use scry_common::ipc::{error_codes, Request, Response};
use scry_common::{
    AgentStatus, Error, ExportKind, PrimType, Protection, Result, Token, Value,
};
use scry_core::host::{MemoryAccess, ProcessInspector, RuntimeInspector};
use scry_core::{listing, memory};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The in-process agent: capability handles plus the request dispatcher.
pub struct Agent {
    process: Arc<dyn ProcessInspector>,
    runtime: Arc<dyn RuntimeInspector>,
    memory: Arc<dyn MemoryAccess>,
}

impl Agent {
    pub fn new(
        process: Arc<dyn ProcessInspector>,
        runtime: Arc<dyn RuntimeInspector>,
        memory: Arc<dyn MemoryAccess>,
    ) -> Self {
        Self {
            process,
            runtime,
            memory,
        }
    }

    /// Agent over the process it is loaded into.
    #[cfg(target_os = "linux")]
    pub fn for_current_process() -> Self {
        let backend = Arc::new(crate::proc::ProcBackend::new());
        Self::new(backend.clone(), Arc::new(crate::proc::NullRuntime), backend)
    }

    /// Handle one request and produce exactly one response.
    pub fn handle_request(&self, request: &Request) -> Response {
        let start = std::time::Instant::now();
        info!(target: "scry_agent::backend", method = %request.method, id = request.id, "Handling request");

        // Dot and underscore notation are both accepted
        let method = request.method.replace('.', "_");
        let result = self.dispatch_method(&method, request);
        let elapsed = start.elapsed();

        match result {
            Ok(value) => {
                debug!(target: "scry_agent::backend", method = %method, elapsed_ms = elapsed.as_millis(), "Request successful");
                Response::success(request.id, value)
            }
            Err(e) => {
                warn!(target: "scry_agent::backend", method = %method, error = %e, elapsed_ms = elapsed.as_millis(), "Request failed");
                Response::error(request.id, error_code(&e), e.to_string())
            }
        }
    }

    fn dispatch_method(&self, method: &str, request: &Request) -> Result<serde_json::Value> {
        if let Some(suffix) = method.strip_prefix("reader_") {
            return self.handle_read(suffix, request);
        }
        if let Some(suffix) = method.strip_prefix("writer_") {
            return self.handle_write(suffix, request);
        }

        match method {
            "agent_ping" => Ok(serde_json::json!({"pong": true})),
            "agent_status" => {
                let status = AgentStatus {
                    pid: std::process::id(),
                    arch: self.process.arch(),
                    runtime: self.runtime.kind(),
                };
                Ok(serde_json::to_value(status)?)
            }
            "get_env" => Ok(serde_json::json!([
                self.runtime.kind().as_str(),
                self.process.arch(),
            ])),
            "list_modules" => {
                let filter = filter_param(request);
                let records = listing::modules(self.process.as_ref(), filter.as_deref())?;
                Ok(serde_json::to_value(records)?)
            }
            "list_ranges" => {
                let filter = filter_param(request);
                let records = listing::ranges(
                    self.process.as_ref(),
                    protect_param(request),
                    filter.as_deref(),
                )?;
                Ok(serde_json::to_value(records)?)
            }
            "list_ranges_by_module" => {
                let addr = address_param(request)?;
                let filter = filter_param(request);
                let records = listing::ranges_in_module(
                    self.process.as_ref(),
                    addr,
                    protect_param(request),
                    filter.as_deref(),
                )?;
                Ok(serde_json::to_value(records)?)
            }
            "list_exports" => {
                let addr = address_param(request)?;
                let kind = match request.params.get("type").and_then(|v| v.as_str()) {
                    None => None,
                    Some(s) => match ExportKind::parse(s) {
                        Some(kind) => Some(kind),
                        None => {
                            // An unknown kind matches no export
                            warn!(target: "scry_agent::backend", kind = s, "Unknown export type");
                            return Ok(serde_json::json!([]));
                        }
                    },
                };
                let filter = filter_param(request);
                let records =
                    listing::exports(self.process.as_ref(), addr, kind, filter.as_deref())?;
                Ok(serde_json::to_value(records)?)
            }
            "list_java_classes" => {
                let filter = filter_param(request);
                let records = listing::classes(self.runtime.as_ref(), filter.as_deref())?;
                Ok(serde_json::to_value(records)?)
            }
            "list_java_methods" => {
                let class = request
                    .params
                    .get("class")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| Error::InvalidArgument("Missing class".to_string()))?;
                let filter = filter_param(request);
                let records = listing::methods(self.runtime.as_ref(), class, filter.as_deref())?;
                Ok(serde_json::to_value(records)?)
            }
            other => Err(Error::Unsupported(format!("unknown method: {}", other))),
        }
    }

    fn handle_read(&self, type_name: &str, request: &Request) -> Result<serde_json::Value> {
        let ty = PrimType::from_name(type_name)
            .ok_or_else(|| Error::Unsupported(format!("unknown read type: {}", type_name)))?;
        let addr = address_param(request)?;
        let len = request
            .params
            .get("length")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize);
        debug!(target: "scry_agent::backend", address = format!("{:#x}", addr), ty = ?ty, "Reading memory");
        let value = memory::read_typed(self.memory.as_ref(), ty, addr, len)?;
        Ok(serde_json::to_value(value)?)
    }

    fn handle_write(&self, type_name: &str, request: &Request) -> Result<serde_json::Value> {
        let ty = PrimType::from_name(type_name)
            .ok_or_else(|| Error::Unsupported(format!("unknown write type: {}", type_name)))?;
        let addr = address_param(request)?;
        // A missing key indexes to null, which the scalar model accepts as
        // Absent, so presence has to be checked before deserializing
        let raw = request
            .params
            .get("value")
            .filter(|v| !v.is_null())
            .ok_or_else(|| Error::InvalidArgument("Missing value".to_string()))?;
        let value: Value = serde_json::from_value(raw.clone())
            .map_err(|_| Error::InvalidArgument("Non-scalar value".to_string()))?;
        debug!(target: "scry_agent::backend", address = format!("{:#x}", addr), ty = ?ty, "Writing memory");
        memory::write_typed(self.memory.as_ref(), ty, addr, &value)?;
        Ok(serde_json::json!({"success": true}))
    }
}

fn error_code(err: &Error) -> i32 {
    match err {
        Error::InvalidArgument(_) => error_codes::INVALID_PARAMS,
        Error::Unsupported(_) => error_codes::METHOD_NOT_FOUND,
        _ => error_codes::INTERNAL_ERROR,
    }
}

/// Parse an address given as a JSON integer or a string, `0x`-prefixed or
/// decimal.
pub fn parse_address(value: &serde_json::Value) -> Result<usize> {
    if let Some(n) = value.as_u64() {
        return Ok(n as usize);
    }
    if let Some(s) = value.as_str() {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => usize::from_str_radix(hex, 16),
            None => s.parse(),
        };
        if let Ok(addr) = parsed {
            return Ok(addr);
        }
    }
    Err(Error::InvalidArgument(format!("Invalid address: {}", value)))
}

fn address_param(request: &Request) -> Result<usize> {
    match request.params.get("address") {
        Some(v) => parse_address(v),
        None => Err(Error::InvalidArgument("Missing address".to_string())),
    }
}

fn protect_param(request: &Request) -> Protection {
    request
        .params
        .get("protect")
        .and_then(|v| v.as_str())
        .map(Protection::from_mask)
        .unwrap_or_default()
}

/// Extract the filter expression, if any. A filter that does not even
/// deserialize as a token sequence degrades to "no filtering" with a
/// diagnostic, matching the engine's lenient posture.
fn filter_param(request: &Request) -> Option<Vec<Token>> {
    let raw = request.params.get("filter")?;
    if raw.is_null() {
        return None;
    }
    match serde_json::from_value(raw.clone()) {
        Ok(tokens) => Some(tokens),
        Err(e) => {
            warn!(target: "scry_agent::backend", error = %e, "Ignoring malformed filter");
            None
        }
    }
}
