//! Host ABI structures.
//!
//! The hosts pass a pointer to a variant-specific interface structure into both
//! entry points. All variants start with the same four-integer header; what
//! follows depends on the [`InterfaceLayout`]. Nothing here owns host memory:
//! [`HostInterface`] is a copy of the fields the handshake needs plus the raw
//! pointer, which the host keeps alive for the lifetime of the process.

use crate::platform::InterfaceLayout;
use crate::plugin::PluginDescriptor;
use std::ffi::{c_char, c_void, CStr};
use std::ptr::NonNull;

/// Schema version written into [`PluginInfo::info_version`].
pub const INFO_VERSION: u32 = 1;

/// Schema version written into [`VersionDataBlock::data_version`].
pub const VERSION_DATA_VERSION: u32 = 1;

pub type QueryInterfaceFn = unsafe extern "C" fn(id: u32) -> *mut c_void;
pub type GetPluginHandleFn = unsafe extern "C" fn() -> u32;
pub type GetReleaseIndexFn = unsafe extern "C" fn() -> u32;

/// Packs a version the way the extender SDKs pack executable versions.
///
/// Only the low 8 bits of `major` and `minor` and the low 12 bits of `patch`
/// are kept.
pub const fn pack_version(major: u32, minor: u32, patch: u32) -> u32 {
    ((major & 0xFF) << 24) | ((minor & 0xFF) << 16) | ((patch & 0xFFF) << 4)
}

/// Inverse of [`pack_version`].
pub const fn unpack_version(packed: u32) -> (u32, u32, u32) {
    ((packed >> 24) & 0xFF, (packed >> 16) & 0xFF, (packed >> 4) & 0xFFF)
}

/// Leading fields shared by every host interface structure.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct InterfaceHeader {
    pub extender_version: u32,
    pub runtime_version: u32,
    pub editor_version: u32,
    pub is_editor: u32,
}

/// Interface structure of MWSE, OBSE, FOSE and NVSE.
#[repr(C)]
#[derive(Debug)]
pub struct LegacyInterface {
    pub header: InterfaceHeader,
    pub register_command: *const c_void,
    pub set_opcode_base: *const c_void,
    pub query_interface: Option<QueryInterfaceFn>,
    pub get_plugin_handle: Option<GetPluginHandleFn>,
}

/// Interface structure of the SKSE and F4SE families.
#[repr(C)]
#[derive(Debug)]
pub struct ModernInterface {
    pub header: InterfaceHeader,
    pub query_interface: Option<QueryInterfaceFn>,
    pub get_plugin_handle: Option<GetPluginHandleFn>,
    pub get_release_index: Option<GetReleaseIndexFn>,
}

/// Snapshot of a host interface taken during the handshake.
#[derive(Debug, Clone, Copy)]
pub struct HostInterface {
    raw: NonNull<c_void>,
    layout: InterfaceLayout,
    pub extender_version: u32,
    pub runtime_version: u32,
    pub editor_version: u32,
    pub is_editor: bool,
    query_interface: Option<QueryInterfaceFn>,
    get_plugin_handle: Option<GetPluginHandleFn>,
}

// The host owns the structure for the whole process and only ever calls the
// plugin from its loader thread.
unsafe impl Send for HostInterface {}

impl HostInterface {
    /// Reads the interface behind `ptr` according to `layout`.
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point to a live structure of the given layout.
    pub unsafe fn from_raw(ptr: *const c_void, layout: InterfaceLayout) -> Option<Self> {
        let raw = NonNull::new(ptr as *mut c_void)?;

        let (header, query_interface, get_plugin_handle) = match layout {
            InterfaceLayout::Legacy => {
                let interface = &*(ptr as *const LegacyInterface);
                (interface.header, interface.query_interface, interface.get_plugin_handle)
            }
            InterfaceLayout::Modern => {
                let interface = &*(ptr as *const ModernInterface);
                (interface.header, interface.query_interface, interface.get_plugin_handle)
            }
        };

        Some(Self {
            raw,
            layout,
            extender_version: header.extender_version,
            runtime_version: header.runtime_version,
            editor_version: header.editor_version,
            is_editor: header.is_editor != 0,
            query_interface,
            get_plugin_handle,
        })
    }

    pub fn as_ptr(&self) -> *const c_void {
        self.raw.as_ptr()
    }

    pub fn layout(&self) -> InterfaceLayout {
        self.layout
    }

    /// Asks the host for the handle it assigned to this plugin.
    pub fn plugin_handle(&self) -> Option<u32> {
        // SAFETY: the function pointer was read from a live host structure.
        self.get_plugin_handle.map(|get| unsafe { get() })
    }

    /// Looks up one of the host's auxiliary interfaces by id.
    ///
    /// # Safety
    ///
    /// The caller must interpret the returned pointer as the structure the host
    /// documents for `id`.
    pub unsafe fn query_interface(&self, id: u32) -> *mut c_void {
        match self.query_interface {
            Some(query) => query(id),
            None => std::ptr::null_mut(),
        }
    }
}

/// Plugin info out-slot filled during `Query`.
#[repr(C)]
#[derive(Debug)]
pub struct PluginInfo {
    pub info_version: u32,
    pub name: *const c_char,
    pub version: u32,
}

impl Default for PluginInfo {
    fn default() -> Self {
        Self {
            info_version: 0,
            name: std::ptr::null(),
            version: 0,
        }
    }
}

impl PluginInfo {
    /// Fills the slot. `name` must outlive every host read of the slot.
    pub fn fill(&mut self, name: &CStr, version: u32) {
        self.info_version = INFO_VERSION;
        self.name = name.as_ptr();
        self.version = version;
    }
}

/// `addressIndependence`: plugin resolves addresses through the address library.
pub const ADDRESS_INDEPENDENCE_ADDRESS_LIBRARY: u32 = 1 << 1;
/// `structureIndependence`: plugin touches no game structures directly.
pub const STRUCTURE_INDEPENDENCE_NO_STRUCTS: u32 = 1 << 0;

/// Version data block read by hosts that load plugins without calling `Query`.
#[repr(C)]
#[derive(Debug)]
pub struct VersionDataBlock {
    pub data_version: u32,
    pub plugin_version: u32,
    pub name: [u8; 256],
    pub author: [u8; 256],
    pub address_independence: u32,
    pub structure_independence: u32,
    pub compatible_versions: [u32; 16],
    pub se_version_required: u32,
    pub reserved_non_breaking: u32,
    pub reserved_breaking: u32,
    pub reserved: [u8; 512],
}

impl VersionDataBlock {
    pub const fn from_descriptor(descriptor: &PluginDescriptor) -> Self {
        let independent = descriptor.flags.is_version_independent();

        Self {
            data_version: VERSION_DATA_VERSION,
            plugin_version: descriptor.version.packed(),
            name: fixed_str(descriptor.name),
            author: fixed_str(descriptor.author),
            address_independence: if independent { ADDRESS_INDEPENDENCE_ADDRESS_LIBRARY } else { 0 },
            structure_independence: if independent { STRUCTURE_INDEPENDENCE_NO_STRUCTS } else { 0 },
            compatible_versions: [0; 16],
            se_version_required: 0,
            reserved_non_breaking: 0,
            reserved_breaking: 0,
            reserved: [0; 512],
        }
    }

    /// Name stored in the block, up to the first NUL.
    pub fn name(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        std::str::from_utf8(&self.name[..len]).unwrap_or_default()
    }
}

/// Copies `value` into a NUL-terminated fixed buffer, truncating if needed.
const fn fixed_str<const N: usize>(value: &str) -> [u8; N] {
    let bytes = value.as_bytes();
    let mut out = [0u8; N];
    let mut i = 0;
    while i < bytes.len() && i + 1 < N {
        out[i] = bytes[i];
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{PluginFlags, PluginVersion};

    unsafe extern "C" fn handle_42() -> u32 {
        42
    }

    unsafe extern "C" fn echo_interface(id: u32) -> *mut c_void {
        id as usize as *mut c_void
    }

    #[test]
    fn test_pack_version() {
        assert_eq!(pack_version(2, 2, 6), 0x0202_0060);
        assert_eq!(unpack_version(pack_version(1, 7, 3)), (1, 7, 3));
        assert_eq!(pack_version(0, 0, 0), 0);
    }

    #[test]
    fn test_read_modern_interface() {
        let interface = ModernInterface {
            header: InterfaceHeader {
                extender_version: 100,
                runtime_version: 7,
                editor_version: 0,
                is_editor: 1,
            },
            query_interface: Some(echo_interface),
            get_plugin_handle: Some(handle_42),
            get_release_index: None,
        };
        let ptr = &interface as *const ModernInterface as *const c_void;

        let host = unsafe { HostInterface::from_raw(ptr, InterfaceLayout::Modern) }.unwrap();
        assert_eq!(host.extender_version, 100);
        assert_eq!(host.runtime_version, 7);
        assert!(host.is_editor);
        assert_eq!(host.plugin_handle(), Some(42));
        assert_eq!(unsafe { host.query_interface(5) } as usize, 5);
        assert_eq!(host.as_ptr(), ptr);
    }

    #[test]
    fn test_read_legacy_interface() {
        let interface = LegacyInterface {
            header: InterfaceHeader {
                extender_version: 21,
                ..Default::default()
            },
            register_command: std::ptr::null(),
            set_opcode_base: std::ptr::null(),
            query_interface: None,
            get_plugin_handle: Some(handle_42),
        };
        let ptr = &interface as *const LegacyInterface as *const c_void;

        let host = unsafe { HostInterface::from_raw(ptr, InterfaceLayout::Legacy) }.unwrap();
        assert_eq!(host.extender_version, 21);
        assert!(!host.is_editor);
        assert_eq!(host.plugin_handle(), Some(42));
        assert!(unsafe { host.query_interface(1) }.is_null());
    }

    #[test]
    fn test_null_interface() {
        let host = unsafe { HostInterface::from_raw(std::ptr::null(), InterfaceLayout::Modern) };
        assert!(host.is_none());
    }

    #[test]
    fn test_version_data_block() {
        const DESCRIPTOR: PluginDescriptor = PluginDescriptor::new(
            "Sample",
            "Someone",
            PluginVersion::new(1, 2, 3),
            PluginFlags::VERSION_INDEPENDENT,
        );
        static BLOCK: VersionDataBlock = VersionDataBlock::from_descriptor(&DESCRIPTOR);

        assert_eq!(BLOCK.data_version, VERSION_DATA_VERSION);
        assert_eq!(BLOCK.plugin_version, pack_version(1, 2, 3));
        assert_eq!(BLOCK.name(), "Sample");
        assert_eq!(BLOCK.address_independence, ADDRESS_INDEPENDENCE_ADDRESS_LIBRARY);
        assert_eq!(BLOCK.structure_independence, STRUCTURE_INDEPENDENCE_NO_STRUCTS);
    }

    #[test]
    fn test_fixed_str_truncates() {
        let out: [u8; 4] = fixed_str("abcdef");
        assert_eq!(&out, b"abc\0");
    }
}
