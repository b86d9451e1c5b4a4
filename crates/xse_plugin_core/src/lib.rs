//! # xSE Plugin Core
//!
//! Platform layer that lets one plugin body run on any of the script extender
//! host runtimes: MWSE, OBSE, FOSE, NVSE, SKSE, SKSE64, SKSEVR, F4SE and F4SEVR.
//!
//! Every host loads the plugin library and calls two exported functions,
//! `<PREFIX>Plugin_Query` and `<PREFIX>Plugin_Load`, with its own ABI structures.
//! This crate owns that handshake so the plugin itself only sees two
//! host-agnostic events.
//!
//! ## Key Features
//!
//! - **Build-time variant selection**: one cargo feature per host (`skse64`,
//!   `f4se`, ...) picks the entry point names, ABI layout and SDK version
//! - **Ordered, one-shot handshake**: `Query` and `Load` each run at most once,
//!   with an implicit `Query` on hosts that skip it
//! - **Compatibility gates**: exact host version match unless the plugin is
//!   version-independent, and an editor gate
//! - **Diagnostics**: a per-plugin, timestamped log file with framework messages
//!   redirected into it
//! - **Safety**: panics never unwind into the host
//!
//! ## Architecture
//!
//! - [`PlatformType`]: identity of the compiled host and everything derived from it
//! - [`InitializationNegotiator`]: the handshake state machine
//! - [`ExtenderPlugin`] / [`InitializationHandler`]: what a plugin implements
//! - [`DiagnosticSink`]: the log destination shared by all components
//! - [`export_extender_plugin!`]: generates the exported entry points
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xse_plugin_core::*;
//!
//! const DESCRIPTOR: PluginDescriptor = PluginDescriptor::new(
//!     "MyPlugin",
//!     "Me",
//!     PluginVersion::new(1, 0, 0),
//!     PluginFlags::VERSION_INDEPENDENT,
//! );
//!
//! struct MyPlugin;
//!
//! impl InitializationHandler for MyPlugin {
//!     fn on_initialization(&mut self, event: &InitializationEvent) -> EventOutcome {
//!         match event.kind {
//!             EventKind::Query => EventOutcome::Ignored,
//!             EventKind::Load => {
//!                 xse_plugin_core::host::log("", "MyPlugin loaded", 1);
//!                 EventOutcome::Handled
//!             }
//!         }
//!     }
//! }
//!
//! impl ExtenderPlugin for MyPlugin {
//!     fn descriptor(&self) -> &PluginDescriptor {
//!         &DESCRIPTOR
//!     }
//!
//!     fn initialization_handler(&mut self) -> Option<&mut dyn InitializationHandler> {
//!         Some(self)
//!     }
//! }
//!
//! fn create() -> MyPlugin {
//!     MyPlugin
//! }
//!
//! // Copies log lines into the host's console once Query sees the exact version.
//! fn host_console(line: &str) {
//!     eprintln!("{line}");
//! }
//!
//! export_extender_plugin!(descriptor: DESCRIPTOR, create: create, mirror: host_console);
//! ```
//!
//! Handlers log through [`host::log`]; the process-wide negotiator is locked
//! while they run.

pub mod abi;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod host;
mod macros;
pub mod negotiator;
pub mod paths;
pub mod platform;
pub mod plugin;
pub mod subsystems;

pub use abi::{pack_version, HostInterface, PluginInfo, VersionDataBlock};
pub use config::CoreSettings;
pub use diagnostics::DiagnosticSink;
pub use error::{ConfigError, HandshakeError, ModuleError};
pub use event::{EventKind, EventOutcome, InitializationEvent, InitializationHandler};
pub use negotiator::{HandshakeState, InitializationNegotiator};
pub use paths::PlatformDirectories;
pub use platform::{compiled_sdk_version, InterfaceLayout, PlatformType, COMPILED_PLATFORM};
pub use plugin::{ExtenderPlugin, PluginDescriptor, PluginFlags, PluginVersion};
pub use subsystems::SubsystemModule;
