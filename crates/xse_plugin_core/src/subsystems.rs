//! One-time bring-up of process-wide native facilities.
//!
//! Two steps: preload a fixed set of system libraries (best effort, failures are
//! only logged) and initialize the registered passive modules (a failing module
//! fails the bring-up).

use crate::diagnostics::DiagnosticSink;
use crate::error::ModuleError;
use libloading::Library;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// System libraries preloaded during bring-up.
#[cfg(windows)]
pub const NATIVE_LIBRARIES: &[&str] = &[
    "ntdll.dll",
    "kernel32.dll",
    "kernelbase.dll",
    "user32.dll",
    "shlwapi.dll",
    "dbghelp.dll",
];

#[cfg(target_os = "macos")]
pub const NATIVE_LIBRARIES: &[&str] = &["libSystem.B.dylib"];

#[cfg(not(any(windows, target_os = "macos")))]
pub const NATIVE_LIBRARIES: &[&str] = &["libc.so.6", "libm.so.6"];

/// A passive module initialized once during bring-up.
pub trait SubsystemModule: Send {
    fn name(&self) -> &str;

    fn initialize(&mut self) -> Result<(), ModuleError>;
}

/// Libraries kept loaded for the lifetime of the platform.
#[derive(Default)]
pub struct NativeLibraries {
    loaded: Vec<(String, Library)>,
}

impl NativeLibraries {
    pub fn preload(names: &[&str]) -> Self {
        let mut loaded = Vec::with_capacity(names.len());

        for name in names {
            // SAFETY: system libraries with no initialization side effects we rely on.
            match unsafe { Library::new(name) } {
                Ok(library) => {
                    debug!("Preloaded native library {}", name);
                    loaded.push((name.to_string(), library));
                }
                Err(e) => {
                    warn!("Could not preload native library {}: {}", name, e);
                }
            }
        }

        Self { loaded }
    }

    pub fn loaded_names(&self) -> Vec<&str> {
        self.loaded.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Ordered set of passive modules.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Box<dyn SubsystemModule>>,
    initialized: Vec<String>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Box<dyn SubsystemModule>) {
        self.modules.push(module);
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn initialized(&self) -> &[String] {
        &self.initialized
    }

    /// Initializes modules in registration order, stopping at the first failure.
    pub fn initialize_all(&mut self) -> Result<(), ModuleError> {
        for module in self.modules.iter_mut() {
            let name = module.name().to_string();
            if self.initialized.contains(&name) {
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| module.initialize())) {
                Ok(Ok(())) => {
                    debug!("Module {} initialized", name);
                    self.initialized.push(name);
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => return Err(ModuleError::Panicked(name)),
            }
        }
        Ok(())
    }
}

/// Routes panic messages into the diagnostic log before the previous hook runs.
pub struct PanicHookModule {
    sink: DiagnosticSink,
}

impl PanicHookModule {
    pub fn new(sink: DiagnosticSink) -> Self {
        Self { sink }
    }
}

impl SubsystemModule for PanicHookModule {
    fn name(&self) -> &str {
        "panic-hook"
    }

    fn initialize(&mut self) -> Result<(), ModuleError> {
        let sink = self.sink.clone();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            sink.log("Panic", &info.to_string(), 0);
            previous(info);
        }));
        Ok(())
    }
}

/// Everything brought up during `Initialize`.
#[derive(Default)]
pub struct Subsystems {
    libraries: NativeLibraries,
    registry: ModuleRegistry,
}

impl Subsystems {
    pub fn bring_up(
        preload_libraries: bool,
        modules: Vec<Box<dyn SubsystemModule>>,
    ) -> Result<Self, ModuleError> {
        let libraries = if preload_libraries {
            NativeLibraries::preload(NATIVE_LIBRARIES)
        } else {
            NativeLibraries::default()
        };

        let mut registry = ModuleRegistry::new();
        for module in modules {
            registry.register(module);
        }
        registry.initialize_all()?;

        info!(
            "Subsystems ready: {} native libraries, {} modules",
            libraries.loaded.len(),
            registry.initialized().len()
        );
        Ok(Self { libraries, registry })
    }

    pub fn libraries(&self) -> &NativeLibraries {
        &self.libraries
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.registry
    }
}
