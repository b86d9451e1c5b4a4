//! Process-wide platform instance and the glue behind the exported entry points.
//!
//! The host loads one plugin per library and calls into it from its loader
//! thread only, so a single lazily created [`InitializationNegotiator`] serves the
//! whole process. [`query_entry`] and [`load_entry`] are what
//! [`export_extender_plugin!`] expands into.
//!
//! The negotiator stays locked while a plugin handler runs. Handlers reach the
//! log through [`log`] and [`sink`], which never touch that lock; [`platform`]
//! must not be called from a handler, use [`try_platform`] there instead.
//!
//! [`export_extender_plugin!`]: crate::export_extender_plugin

use crate::abi::PluginInfo;
use crate::diagnostics::{DiagnosticSink, HostMirror};
use crate::negotiator::InitializationNegotiator;
use crate::platform::{compiled_sdk_version, COMPILED_PLATFORM};
use crate::plugin::ExtenderPlugin;
use once_cell::sync::{Lazy, OnceCell};
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use tracing::error;

static SINK: Lazy<DiagnosticSink> = Lazy::new(|| DiagnosticSink::new(COMPILED_PLATFORM));

static MIRROR_FN: OnceCell<fn(&str)> = OnceCell::new();

static PLATFORM: Lazy<Mutex<InitializationNegotiator>> = Lazy::new(|| {
    Mutex::new(InitializationNegotiator::new(
        COMPILED_PLATFORM,
        compiled_sdk_version(COMPILED_PLATFORM),
        SINK.clone(),
    ))
});

/// The process-wide diagnostic log. Safe to use from plugin handlers.
pub fn sink() -> &'static DiagnosticSink {
    &SINK
}

/// Writes one line to the plugin log. Safe to use from plugin handlers.
pub fn log(category: &str, message: &str, indent: usize) {
    SINK.log(category, message, indent);
}

/// Installs the callback that receives lines for the host's own log.
///
/// Lines only reach it once `Query` has seen a host whose version equals the
/// compiled one and `logging.mirror_to_host` is on.
pub fn set_host_mirror(mirror: HostMirror) {
    SINK.set_host_mirror(mirror);
}

/// Installs the mirror named in `export_extender_plugin!`, once per process.
#[doc(hidden)]
pub fn install_mirror_fn(mirror: Option<fn(&str)>) {
    if let Some(mirror) = mirror {
        MIRROR_FN.get_or_init(|| {
            let callback: HostMirror = Arc::new(mirror);
            set_host_mirror(callback);
            mirror
        });
    }
}

fn lock(platform: &Mutex<InitializationNegotiator>) -> MutexGuard<'_, InitializationNegotiator> {
    platform.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Locks the process-wide negotiator. A panic inside an earlier call does not
/// poison it for the host's next call.
///
/// Blocks forever when called from inside a plugin handler.
pub fn platform() -> MutexGuard<'static, InitializationNegotiator> {
    lock(&PLATFORM)
}

/// Like [`platform`], but returns `None` instead of blocking while an entry
/// point is running, e.g. when called from a plugin handler.
pub fn try_platform() -> Option<MutexGuard<'static, InitializationNegotiator>> {
    match PLATFORM.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}

fn ensure_bound<F>(negotiator: &mut InitializationNegotiator, create: F) -> bool
where
    F: FnOnce() -> Box<dyn ExtenderPlugin>,
{
    if negotiator.is_bound() {
        return !negotiator.initialization_failed();
    }
    negotiator.initialize(create())
}

fn contain<F: FnOnce() -> bool>(entry: &str, call: F) -> bool {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(_) => {
            error!("{} panicked, reporting failure to the host", entry);
            false
        }
    }
}

fn enter<C, F>(platform: &Mutex<InitializationNegotiator>, entry: &str, create: C, call: F) -> bool
where
    C: FnOnce() -> Box<dyn ExtenderPlugin>,
    F: FnOnce(&mut InitializationNegotiator) -> bool,
{
    contain(entry, || {
        let mut negotiator = lock(platform);
        if !ensure_bound(&mut negotiator, create) {
            return false;
        }
        call(&mut negotiator)
    })
}

/// Body of the exported `Query` function.
///
/// # Safety
///
/// `host` must be null or point to the host interface of the compiled variant;
/// `info` must be null or point to a writable [`PluginInfo`].
pub unsafe fn query_entry<F>(create: F, host: *const c_void, info: *mut PluginInfo) -> bool
where
    F: FnOnce() -> Box<dyn ExtenderPlugin>,
{
    enter(&PLATFORM, "Query", create, |negotiator| negotiator.query(host, info.as_mut()))
}

/// Body of the exported `Load` function.
///
/// # Safety
///
/// `host` must be null or point to the host interface of the compiled variant.
pub unsafe fn load_entry<F>(create: F, host: *const c_void) -> bool
where
    F: FnOnce() -> Box<dyn ExtenderPlugin>,
{
    enter(&PLATFORM, "Load", create, |negotiator| negotiator.load(host))
}

/// Releases the plugin bound to the process-wide negotiator.
///
/// Returns `false` without releasing anything while an entry point is running.
pub fn terminate() -> bool {
    match try_platform() {
        Some(mut negotiator) => {
            negotiator.terminate();
            true
        }
        None => false,
    }
}
