use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use xse_plugin_core::{
    export_extender_plugin, pack_version, EventKind, EventOutcome, ExtenderPlugin, InitializationEvent,
    InitializationHandler, ModuleError, PluginDescriptor, PluginFlags, PluginVersion, SubsystemModule,
};

// ============================================================================
// Sample Plugin: runtime check and load counter
// ============================================================================

pub const DESCRIPTOR: PluginDescriptor = PluginDescriptor::new(
    "SamplePlugin",
    "xse_plugin_core",
    PluginVersion::new(0, 1, 0),
    PluginFlags::VERSION_INDEPENDENT,
);

/// Oldest game runtime the sample accepts.
pub const MINIMUM_RUNTIME: u32 = pack_version(1, 5, 0);

/// Refuses old game runtimes during `Query` and counts `Load` events.
pub struct SamplePlugin {
    loads: Arc<AtomicUsize>,
    runtime_version: Option<u32>,
}

impl SamplePlugin {
    pub fn new() -> Self {
        Self {
            loads: Arc::new(AtomicUsize::new(0)),
            runtime_version: None,
        }
    }

    /// Shared counter of handled `Load` events.
    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        self.loads.clone()
    }

    pub fn runtime_version(&self) -> Option<u32> {
        self.runtime_version
    }
}

impl Default for SamplePlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl InitializationHandler for SamplePlugin {
    fn on_initialization(&mut self, event: &InitializationEvent) -> EventOutcome {
        match event.kind {
            EventKind::Query => {
                let Some(host) = event.host else {
                    return EventOutcome::Ignored;
                };
                self.runtime_version = Some(host.runtime_version);

                if host.runtime_version < MINIMUM_RUNTIME {
                    warn!(
                        "SamplePlugin: runtime {:#010x} is older than {:#010x}",
                        host.runtime_version, MINIMUM_RUNTIME
                    );
                    return EventOutcome::Failed(format!("unsupported runtime {:#010x}", host.runtime_version));
                }
                EventOutcome::Handled
            }
            EventKind::Load => {
                let count = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
                info!("SamplePlugin: loaded on {} (load #{})", event.platform, count);
                EventOutcome::Handled
            }
        }
    }
}

impl ExtenderPlugin for SamplePlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &DESCRIPTOR
    }

    fn initialization_handler(&mut self) -> Option<&mut dyn InitializationHandler> {
        Some(self)
    }

    fn modules(&mut self) -> Vec<Box<dyn SubsystemModule>> {
        vec![Box::new(BannerModule)]
    }
}

/// Announces the plugin in the framework log once subsystems come up.
pub struct BannerModule;

impl SubsystemModule for BannerModule {
    fn name(&self) -> &str {
        "banner"
    }

    fn initialize(&mut self) -> Result<(), ModuleError> {
        info!("{} {} by {}", DESCRIPTOR.name, DESCRIPTOR.version, DESCRIPTOR.author);
        Ok(())
    }
}

fn create() -> SamplePlugin {
    SamplePlugin::new()
}

/// Receives log lines for the host console once Query sees the exact SDK version.
fn host_console(line: &str) {
    eprintln!("{line}");
}

export_extender_plugin!(descriptor: DESCRIPTOR, create: create, mirror: host_console);

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::c_void;
    use xse_plugin_core::abi::{InterfaceHeader, ModernInterface};
    use xse_plugin_core::config::{CoreSettings, LoggingSettings, SubsystemSettings};
    use xse_plugin_core::{DiagnosticSink, InitializationNegotiator, PlatformDirectories, PlatformType};

    unsafe extern "C" fn handle_3() -> u32 {
        3
    }

    fn host(runtime_version: u32) -> ModernInterface {
        ModernInterface {
            header: InterfaceHeader {
                extender_version: pack_version(2, 2, 6),
                runtime_version,
                editor_version: 0,
                is_editor: 0,
            },
            query_interface: None,
            get_plugin_handle: Some(handle_3),
            get_release_index: None,
        }
    }

    fn negotiator() -> InitializationNegotiator {
        let platform = PlatformType::Skse64;
        InitializationNegotiator::new(platform, pack_version(2, 0, 0), DiagnosticSink::new(platform))
            .with_directories(PlatformDirectories::with_roots(platform, None, None))
            .with_settings(CoreSettings {
                logging: LoggingSettings {
                    redirect_framework: false,
                    ..Default::default()
                },
                subsystems: SubsystemSettings {
                    preload_native_libraries: false,
                    panic_hook: false,
                },
            })
    }

    #[test]
    fn test_sample_loads_on_supported_runtime() {
        let plugin = SamplePlugin::new();
        let loads = plugin.load_counter();
        let mut negotiator = negotiator();
        assert!(negotiator.initialize(Box::new(plugin)));

        let interface = host(pack_version(1, 6, 640));
        let ptr = &interface as *const ModernInterface as *const c_void;
        assert!(unsafe { negotiator.load(ptr) });

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(negotiator.state().plugin_handle(), Some(3));
        assert_eq!(
            negotiator.subsystems().map(|subsystems| subsystems.modules().initialized().to_vec()),
            Some(vec!["banner".to_string()])
        );
    }

    #[test]
    fn test_sample_refuses_old_runtime() {
        let plugin = SamplePlugin::new();
        let loads = plugin.load_counter();
        let mut negotiator = negotiator();
        negotiator.initialize(Box::new(plugin));

        let interface = host(pack_version(1, 4, 15));
        let ptr = &interface as *const ModernInterface as *const c_void;
        assert!(!unsafe { negotiator.load(ptr) });
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_query_without_host_is_ignored() {
        let mut plugin = SamplePlugin::new();
        let event = InitializationEvent {
            kind: EventKind::Query,
            platform: PlatformType::Skse64,
            host: None,
            plugin_handle: None,
        };
        assert_eq!(plugin.on_initialization(&event), EventOutcome::Ignored);
        assert_eq!(plugin.runtime_version(), None);
    }

    #[cfg(feature = "skse64")]
    #[test]
    fn test_version_block_exported() {
        assert_eq!(SKSEPlugin_Version.name(), "SamplePlugin");
        assert_eq!(SKSEPlugin_Version.plugin_version, DESCRIPTOR.version.packed());
        assert_ne!(SKSEPlugin_Version.address_independence, 0);
    }
}
