//! Scry Agent
//!
//! The in-process half of Scry: loaded into a target process, it answers
//! controller queries about live process state (modules, memory ranges,
//! exports, loaded classes and methods) and performs raw memory reads and
//! writes. Every listing funnels through the scry-core filter engine before
//! it leaves the process.
//!
//! The agent holds no cross-call state; each request is served from fresh
//! collections produced by the injected capability backends.

pub mod backend;
pub mod ipc;
#[cfg(target_os = "linux")]
pub mod proc;

pub use backend::Agent;
pub use ipc::{IpcServer, AGENT_PORT};

use scry_common::{error, info, init_agent_logging};
use std::panic;

/// Install a panic hook that reports through the agent log; stderr belongs
/// to the target process.
fn install_panic_handler() {
    panic::set_hook(Box::new(|panic_info| {
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_else(|| "unknown location".to_string());
        error!(target: "scry_agent::panic", message = %message, location = %location, "PANIC in scry-agent");
    }));
}

/// Start the agent inside the current process on the default port.
///
/// Spawns a worker thread and returns immediately so a loader hook can call
/// this without blocking target startup.
#[cfg(target_os = "linux")]
pub fn start() {
    start_on_port(AGENT_PORT)
}

/// Start the agent on a specific port.
#[cfg(target_os = "linux")]
pub fn start_on_port(port: u16) {
    std::thread::spawn(move || {
        init_agent_logging();
        install_panic_handler();
        info!(target: "scry_agent", pid = std::process::id(), "Agent thread started");

        let agent = Agent::for_current_process();
        loop {
            match IpcServer::bind(port).and_then(|server| server.serve(&agent)) {
                Ok(()) => break,
                Err(e) => {
                    error!(target: "scry_agent", error = %e, "IPC server error, restarting");
                    std::thread::sleep(std::time::Duration::from_secs(2));
                }
            }
        }

        info!(target: "scry_agent", "Agent thread exiting");
    });
}
