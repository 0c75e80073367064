//! Recording session controller.
//!
//! This crate coordinates capture, mixing, encoding and persistence to
//! provide the recording engine: a single command loop that owns the
//! session state machine and every long-lived resource, with phased
//! start-up and full rollback on error paths.

mod orchestrator;
mod preview;
mod resources;
mod settings;

#[cfg(test)]
pub(crate) mod testutil;

pub use orchestrator::{Engine, PlatformHosts};
pub use settings::{JsonSettingsStore, Settings, SettingsStore};

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use screenrec_ipc::{SessionCommand, SessionEvent};

/// Create an engine instance with IPC channels and injected platform hosts.
pub fn create_engine(
    hosts: PlatformHosts,
    settings_store: Arc<dyn SettingsStore>,
    command_rx: Receiver<SessionCommand>,
    event_tx: Sender<SessionEvent>,
) -> Engine {
    Engine::new(hosts, settings_store, command_rx, event_tx)
}
