//! The initialization handshake engine.
//!
//! A host calls `Query` once and `Load` once, in that order, from its loader
//! thread. [`InitializationNegotiator`] enforces that contract, gates the plugin
//! on version and editor compatibility, and forwards both callbacks to the
//! plugin as [`EventKind::Query`] and [`EventKind::Load`] events.
//!
//! Every decision is written to the diagnostic sink. Failures carry a
//! [`HandshakeError`] internally but leave the negotiator as a plain `bool`,
//! which is all the host understands.

mod state;


pub use state::HandshakeState;

use crate::abi::{HostInterface, PluginInfo};
use crate::config::CoreSettings;
use crate::diagnostics::{install_framework_redirect, DiagnosticSink};
use crate::error::{ConfigError, HandshakeError};
use crate::event::{self, EventKind, EventOutcome, InitializationEvent};
use crate::paths::PlatformDirectories;
use crate::platform::PlatformType;
use crate::plugin::ExtenderPlugin;
use crate::subsystems::{PanicHookModule, SubsystemModule, Subsystems};
use std::ffi::{c_void, CString};

pub struct InitializationNegotiator {
    platform: PlatformType,
    compiled_version: u32,
    sink: DiagnosticSink,
    directories: PlatformDirectories,
    settings: Option<CoreSettings>,
    state: HandshakeState,
    subsystems: Option<Subsystems>,
    initialization_failed: bool,
    framework_redirect: bool,
}

impl InitializationNegotiator {
    /// Creates a negotiator for `platform` that expects hosts to report
    /// `compiled_version`. All diagnostics go through `sink`.
    pub fn new(platform: PlatformType, compiled_version: u32, sink: DiagnosticSink) -> Self {
        Self {
            platform,
            compiled_version,
            sink,
            directories: PlatformDirectories::discover(platform),
            settings: None,
            state: HandshakeState::default(),
            subsystems: None,
            initialization_failed: false,
            framework_redirect: false,
        }
    }

    pub fn with_directories(mut self, directories: PlatformDirectories) -> Self {
        self.directories = directories;
        self
    }

    /// Uses `settings` instead of reading the plugin's configuration file.
    pub fn with_settings(mut self, settings: CoreSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn platform(&self) -> PlatformType {
        self.platform
    }

    pub fn compiled_version(&self) -> u32 {
        self.compiled_version
    }

    pub fn state(&self) -> &HandshakeState {
        &self.state
    }

    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    pub fn directories(&self) -> &PlatformDirectories {
        &self.directories
    }

    pub fn settings(&self) -> CoreSettings {
        self.settings.clone().unwrap_or_default()
    }

    pub fn subsystems(&self) -> Option<&Subsystems> {
        self.subsystems.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.state.is_bound()
    }

    /// Whether subsystem bring-up failed for the bound plugin. While set, `Query`
    /// and `Load` refuse to run.
    pub fn initialization_failed(&self) -> bool {
        self.initialization_failed
    }

    /// Whether framework messages are redirected into the plugin log.
    pub fn framework_redirected(&self) -> bool {
        self.framework_redirect
    }

    fn log(&self, indent: usize, message: &str) {
        self.sink.log("", message, indent);
    }

    fn report(&self, error: &HandshakeError, indent: usize) {
        self.sink.log(error.category(), &error.to_string(), indent);
    }

    /// Binds `plugin`. Only the first successful call binds; later calls return
    /// the outcome of that bind without touching the bound plugin.
    pub fn initialize(&mut self, mut plugin: Box<dyn ExtenderPlugin>) -> bool {
        if self.state.is_bound() {
            return !self.initialization_failed;
        }

        if plugin.initialization_handler().is_none() {
            let error = HandshakeError::MissingEventHandler(plugin.name().to_string());
            self.report(&error, 0);
            return false;
        }

        let name = plugin.name().to_string();
        let modules = plugin.modules();
        self.state.plugin = Some(plugin);
        self.initialization_failed = false;

        let config_error = self.load_settings(&name).err();
        self.initialize_logger(&name);
        if let Some(error) = config_error {
            self.sink.log("Config", &format!("Using default settings: {error}"), 0);
        }

        self.log(0, "Initializing framework");
        match self.initialize_modules(modules) {
            Ok(()) => true,
            Err(error) => {
                self.initialization_failed = true;
                self.log(1, "Initializing framework: failed");
                self.report(&error, 1);
                false
            }
        }
    }

    /// Releases the bound plugin. The one-shot flags stay set.
    pub fn terminate(&mut self) {
        if let Some(plugin) = self.state.plugin.take() {
            self.log(0, &format!("Terminating plugin '{}'", plugin.name()));
        }
    }

    fn load_settings(&mut self, plugin_name: &str) -> Result<(), ConfigError> {
        if self.settings.is_some() {
            return Ok(());
        }

        let result = match self.directories.plugins_dir() {
            Some(dir) => CoreSettings::load_from_file(&dir.join(format!("{plugin_name}.toml"))),
            None => Ok(CoreSettings::default()),
        };

        match result {
            Ok(settings) => {
                self.settings = Some(settings);
                Ok(())
            }
            Err(error) => {
                self.settings = Some(CoreSettings::default());
                Err(error)
            }
        }
    }

    fn initialize_logger(&mut self, plugin_name: &str) {
        let logging = self.settings().logging;

        if !logging.enabled {
            self.sink.detach();
            return;
        }

        if !self.sink.is_active() {
            let directory = logging.directory.clone().or_else(|| self.directories.logs_dir());
            if let Some(directory) = directory {
                // Without a log file every log call degrades to a no-op.
                let _ = self.sink.open_file(&directory.join(format!("{plugin_name}.log")));
            }
        }

        if self.sink.is_active() && logging.redirect_framework {
            self.framework_redirect = install_framework_redirect(&self.sink, &logging.level);
        }
    }

    fn initialize_modules(&mut self, modules: Vec<Box<dyn SubsystemModule>>) -> Result<(), HandshakeError> {
        let settings = self.settings().subsystems;

        let mut all: Vec<Box<dyn SubsystemModule>> = Vec::with_capacity(modules.len() + 1);
        if settings.panic_hook {
            all.push(Box::new(PanicHookModule::new(self.sink.clone())));
        }
        all.extend(modules);

        let subsystems = Subsystems::bring_up(settings.preload_native_libraries, all)?;
        self.subsystems = Some(subsystems);
        Ok(())
    }

    /// Handles the host's `Query` call.
    ///
    /// # Safety
    ///
    /// A non-null `host` must point to a live interface structure of this
    /// platform's layout.
    pub unsafe fn query(&mut self, host: *const c_void, info: Option<&mut PluginInfo>) -> bool {
        self.log(0, &format!("{} Query", self.platform));

        match self.try_query(host, info) {
            Ok(()) => {
                self.log(1, "Query: OK");
                true
            }
            Err(error) => {
                self.report(&error, 1);
                self.log(1, "Query: failed");
                false
            }
        }
    }

    unsafe fn try_query(&mut self, host: *const c_void, info: Option<&mut PluginInfo>) -> Result<(), HandshakeError> {
        if self.state.query_called {
            return Err(HandshakeError::QueryAlreadyCalled);
        }
        self.state.query_called = true;

        let descriptor = match self.state.plugin.as_ref() {
            Some(plugin) => *plugin.descriptor(),
            None => return Err(HandshakeError::PluginNotBound),
        };
        if self.initialization_failed {
            return Err(HandshakeError::InitializationFailed);
        }

        match self.platform.interface_layout() {
            Some(layout) => {
                if let Some(interface) = HostInterface::from_raw(host, layout) {
                    self.state.host_version = Some(interface.extender_version);
                    self.state.host_interface = Some(interface);
                    self.log(
                        1,
                        &format!(
                            "Host interface: extender version {:#010x}, runtime version {:#010x}, editor: {}",
                            interface.extender_version, interface.runtime_version, interface.is_editor
                        ),
                    );

                    let mirror = self.settings().logging.mirror_to_host
                        && interface.extender_version == self.compiled_version;
                    self.sink.set_mirror_enabled(mirror);
                } else {
                    self.log(1, "No host interface supplied");
                }
            }
            None => self.log(1, "Platform has no interface layout, host interface ignored"),
        }

        if let Some(info) = info {
            let name = CString::new(descriptor.name.replace('\0', "")).unwrap_or_default();
            let name = self.state.info_name.insert(name);
            info.fill(name, descriptor.version.packed());
            self.log(
                1,
                &format!(
                    "Plugin info: '{}' version {} ({:#010x})",
                    descriptor.name,
                    descriptor.version,
                    descriptor.version.packed()
                ),
            );
        }

        let flags = descriptor.flags;
        self.log(
            1,
            &format!(
                "Plugin flags: version-independent: {}, allow-editor: {}",
                flags.is_version_independent(),
                flags.allows_editor()
            ),
        );

        let host_version = self.state.host_version.unwrap_or(0);
        if host_version != self.compiled_version {
            if !flags.is_version_independent() {
                return Err(HandshakeError::VersionMismatch {
                    host: host_version,
                    compiled: self.compiled_version,
                });
            }
            self.log(
                2,
                &format!(
                    "Host version {:#010x} differs from compiled version {:#010x}, accepted as version-independent",
                    host_version, self.compiled_version
                ),
            );
        }

        let is_editor = self.state.host_interface.map_or(false, |interface| interface.is_editor);
        if is_editor && !flags.allows_editor() {
            return Err(HandshakeError::EditorNotAllowed);
        }

        self.state.plugin_handle = self.state.host_interface.and_then(|interface| interface.plugin_handle());
        match self.state.plugin_handle {
            Some(handle) => self.log(1, &format!("Plugin handle: {handle}")),
            None => self.log(1, "Plugin handle: none"),
        }

        self.dispatch(EventKind::Query)
    }

    /// Handles the host's `Load` call, running `Query` first on hosts that skip it.
    ///
    /// # Safety
    ///
    /// Same contract as [`Self::query`].
    pub unsafe fn load(&mut self, host: *const c_void) -> bool {
        self.log(0, &format!("{} Load", self.platform));

        match self.try_load(host) {
            Ok(()) => {
                self.log(1, "Load: OK");
                true
            }
            Err(error) => {
                self.report(&error, 1);
                self.log(1, "Load: failed");
                false
            }
        }
    }

    unsafe fn try_load(&mut self, host: *const c_void) -> Result<(), HandshakeError> {
        if self.state.load_called {
            return Err(HandshakeError::LoadAlreadyCalled);
        }
        self.state.load_called = true;

        if self.initialization_failed {
            return Err(HandshakeError::InitializationFailed);
        }

        if self.platform.requires_implicit_query() && !self.state.query_called {
            self.log(1, "Host skipped Query, running it before Load");
            if !self.query(host, None) {
                return Err(HandshakeError::ImplicitQueryFailed);
            }
        }

        self.dispatch(EventKind::Load)
    }

    fn dispatch(&mut self, kind: EventKind) -> Result<(), HandshakeError> {
        let event = InitializationEvent {
            kind,
            platform: self.platform,
            host: self.state.host_interface,
            plugin_handle: self.state.plugin_handle,
        };

        let plugin = self.state.plugin.as_mut().ok_or(HandshakeError::PluginNotBound)?;
        let name = plugin.name().to_string();
        let handler = plugin
            .initialization_handler()
            .ok_or(HandshakeError::MissingEventHandler(name))?;

        match event::dispatch(handler, &event) {
            EventOutcome::Handled => {
                self.log(1, &format!("{kind} event: handled"));
                Ok(())
            }
            EventOutcome::Ignored => {
                self.sink.log("Delivery", &format!("{kind} event was not processed by the plugin"), 1);
                Ok(())
            }
            EventOutcome::Failed(reason) => Err(HandshakeError::EventRejected { kind, reason }),
        }
    }
}
