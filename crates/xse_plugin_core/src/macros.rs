//! Export macro for plugin libraries.
//!
//! A plugin crate invokes [`export_extender_plugin!`] once at its root. The
//! expansion depends on the host variant `xse_plugin_core` was built for: it
//! defines the two `#[no_mangle]` entry points under the names that host looks
//! up and, for SKSE64, the static version data block.
//!
//! ```ignore
//! const DESCRIPTOR: PluginDescriptor = PluginDescriptor::new(
//!     "Sample",
//!     "Someone",
//!     PluginVersion::new(1, 0, 0),
//!     PluginFlags::VERSION_INDEPENDENT,
//! );
//!
//! fn create() -> SamplePlugin {
//!     SamplePlugin::new(&DESCRIPTOR)
//! }
//!
//! fn host_console(line: &str) {
//!     eprintln!("{line}");
//! }
//!
//! xse_plugin_core::export_extender_plugin!(descriptor: DESCRIPTOR, create: create, mirror: host_console);
//! ```

/// Defines the host entry points for the compiled variant.
///
/// `descriptor` names a `const` [`PluginDescriptor`](crate::PluginDescriptor);
/// `create` names a function returning the plugin object, called once on the
/// first host call. The optional `mirror` names a `fn(&str)` that receives log
/// lines for the host's own log (see [`host::set_host_mirror`](crate::host::set_host_mirror)).
#[macro_export]
macro_rules! export_extender_plugin {
    (descriptor: $descriptor:path, create: $create:path $(,)?) => {
        const _: &$crate::PluginDescriptor = &$descriptor;
        $crate::__xse_entry_points!($descriptor, $create, ::std::option::Option::None);
    };
    (descriptor: $descriptor:path, create: $create:path, mirror: $mirror:path $(,)?) => {
        const _: &$crate::PluginDescriptor = &$descriptor;
        $crate::__xse_entry_points!(
            $descriptor,
            $create,
            ::std::option::Option::Some($mirror as fn(&str))
        );
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __xse_define_entry_points {
    ($query:ident, $load:ident, $create:path, $mirror:expr) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn $query(
            host: *const ::std::ffi::c_void,
            info: *mut $crate::abi::PluginInfo,
        ) -> bool {
            $crate::host::install_mirror_fn($mirror);
            $crate::host::query_entry(
                || -> ::std::boxed::Box<dyn $crate::ExtenderPlugin> { ::std::boxed::Box::new($create()) },
                host,
                info,
            )
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn $load(host: *const ::std::ffi::c_void) -> bool {
            $crate::host::install_mirror_fn($mirror);
            $crate::host::load_entry(
                || -> ::std::boxed::Box<dyn $crate::ExtenderPlugin> { ::std::boxed::Box::new($create()) },
                host,
            )
        }
    };
}

#[cfg(xse_platform = "none")]
#[doc(hidden)]
#[macro_export]
macro_rules! __xse_entry_points {
    ($descriptor:path, $create:path, $mirror:expr) => {};
}

#[cfg(xse_platform = "mwse")]
#[doc(hidden)]
#[macro_export]
macro_rules! __xse_entry_points {
    ($descriptor:path, $create:path, $mirror:expr) => {
        $crate::__xse_define_entry_points!(MWSEPlugin_Query, MWSEPlugin_Load, $create, $mirror);
    };
}

#[cfg(xse_platform = "obse")]
#[doc(hidden)]
#[macro_export]
macro_rules! __xse_entry_points {
    ($descriptor:path, $create:path, $mirror:expr) => {
        $crate::__xse_define_entry_points!(OBSEPlugin_Query, OBSEPlugin_Load, $create, $mirror);
    };
}

#[cfg(xse_platform = "fose")]
#[doc(hidden)]
#[macro_export]
macro_rules! __xse_entry_points {
    ($descriptor:path, $create:path, $mirror:expr) => {
        $crate::__xse_define_entry_points!(FOSEPlugin_Query, FOSEPlugin_Load, $create, $mirror);
    };
}

#[cfg(xse_platform = "nvse")]
#[doc(hidden)]
#[macro_export]
macro_rules! __xse_entry_points {
    ($descriptor:path, $create:path, $mirror:expr) => {
        $crate::__xse_define_entry_points!(NVSEPlugin_Query, NVSEPlugin_Load, $create, $mirror);
    };
}

#[cfg(any(xse_platform = "skse", xse_platform = "sksevr"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __xse_entry_points {
    ($descriptor:path, $create:path, $mirror:expr) => {
        $crate::__xse_define_entry_points!(SKSEPlugin_Query, SKSEPlugin_Load, $create, $mirror);
    };
}

// SKSE64 reads the version block instead of calling Query; Query stays exported
// for older hosts.
#[cfg(xse_platform = "skse64")]
#[doc(hidden)]
#[macro_export]
macro_rules! __xse_entry_points {
    ($descriptor:path, $create:path, $mirror:expr) => {
        #[no_mangle]
        #[allow(non_upper_case_globals)]
        pub static SKSEPlugin_Version: $crate::abi::VersionDataBlock =
            $crate::abi::VersionDataBlock::from_descriptor(&$descriptor);

        $crate::__xse_define_entry_points!(SKSEPlugin_Query, SKSEPlugin_Load, $create, $mirror);
    };
}

#[cfg(any(xse_platform = "f4se", xse_platform = "f4sevr"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __xse_entry_points {
    ($descriptor:path, $create:path, $mirror:expr) => {
        $crate::__xse_define_entry_points!(F4SEPlugin_Query, F4SEPlugin_Load, $create, $mirror);
    };
}
