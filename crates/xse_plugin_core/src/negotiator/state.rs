//! Mutable record of one process's handshake.

use crate::abi::HostInterface;
use crate::plugin::ExtenderPlugin;
use std::ffi::CString;
use std::fmt;

/// Handshake progress. Created empty with the negotiator and never reset:
/// the one-shot flags only move from `false` to `true`, and the host fields are
/// written once during `Query`.
#[derive(Default)]
pub struct HandshakeState {
    pub(super) query_called: bool,
    pub(super) load_called: bool,
    pub(super) host_version: Option<u32>,
    pub(super) host_interface: Option<HostInterface>,
    pub(super) plugin_handle: Option<u32>,
    pub(super) plugin: Option<Box<dyn ExtenderPlugin>>,
    /// Backing storage for the name pointer handed to the host in `PluginInfo`.
    pub(super) info_name: Option<CString>,
}

impl HandshakeState {
    pub fn query_called(&self) -> bool {
        self.query_called
    }

    pub fn load_called(&self) -> bool {
        self.load_called
    }

    pub fn host_version(&self) -> Option<u32> {
        self.host_version
    }

    pub fn host_interface(&self) -> Option<&HostInterface> {
        self.host_interface.as_ref()
    }

    pub fn plugin_handle(&self) -> Option<u32> {
        self.plugin_handle
    }

    pub fn is_bound(&self) -> bool {
        self.plugin.is_some()
    }

    pub fn plugin(&self) -> Option<&dyn ExtenderPlugin> {
        self.plugin.as_deref()
    }
}

impl fmt::Debug for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeState")
            .field("query_called", &self.query_called)
            .field("load_called", &self.load_called)
            .field("host_version", &self.host_version)
            .field("plugin_handle", &self.plugin_handle)
            .field("plugin", &self.plugin.as_ref().map(|plugin| plugin.name().to_string()))
            .finish()
    }
}
