//! Plugin capability contract.
//!
//! The platform layer never knows the concrete plugin type. It sees a boxed
//! [`ExtenderPlugin`] that describes itself through a const
//! [`PluginDescriptor`] and exposes optional facets: the initialization event
//! handler, which the handshake cannot run without, and any passive subsystem
//! modules the plugin wants brought up alongside the built-in ones.

use crate::abi::pack_version;
use crate::event::InitializationHandler;
use crate::subsystems::SubsystemModule;
use std::fmt;

/// Semantic version of a plugin.
///
/// The host sees the packed form, which keeps 8 bits of `major`, 8 bits of
/// `minor` and 12 bits of `patch`. Components above [`Self::MAX_MAJOR`],
/// [`Self::MAX_MINOR`] or [`Self::MAX_PATCH`] do not fit: [`Self::parse`]
/// rejects them and [`Self::packed`] asserts against them in debug builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PluginVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PluginVersion {
    pub const MAX_MAJOR: u32 = 0xFF;
    pub const MAX_MINOR: u32 = 0xFF;
    pub const MAX_PATCH: u32 = 0xFFF;

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Whether every component survives [`Self::packed`] unchanged.
    pub const fn is_packable(&self) -> bool {
        self.major <= Self::MAX_MAJOR && self.minor <= Self::MAX_MINOR && self.patch <= Self::MAX_PATCH
    }

    /// Packed 32-bit form handed to the host. Out-of-range components are
    /// masked in release builds.
    pub const fn packed(&self) -> u32 {
        debug_assert!(self.is_packable(), "plugin version does not fit the packed host format");
        pack_version(self.major, self.minor, self.patch)
    }

    /// Parses `major.minor.patch`, ignoring any pre-release or build suffix.
    pub fn parse(version: &str) -> Option<Self> {
        let core = version.split(['-', '+']).next()?;
        let mut parts = core.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        let version = Self::new(major, minor, patch);
        version.is_packable().then_some(version)
    }
}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Feature flags a plugin declares about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PluginFlags(u32);

impl PluginFlags {
    pub const NONE: PluginFlags = PluginFlags(0);
    /// Skip the exact host-version match.
    pub const VERSION_INDEPENDENT: PluginFlags = PluginFlags(1 << 0);
    /// Allow loading inside the editor / construction set.
    pub const ALLOW_EDITOR: PluginFlags = PluginFlags(1 << 1);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn union(self, other: PluginFlags) -> PluginFlags {
        PluginFlags(self.0 | other.0)
    }

    pub const fn contains(self, other: PluginFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_version_independent(self) -> bool {
        self.contains(PluginFlags::VERSION_INDEPENDENT)
    }

    pub const fn allows_editor(self) -> bool {
        self.contains(PluginFlags::ALLOW_EDITOR)
    }
}

impl std::ops::BitOr for PluginFlags {
    type Output = PluginFlags;

    fn bitor(self, rhs: PluginFlags) -> PluginFlags {
        self.union(rhs)
    }
}

/// Static identity of a plugin. Const-constructible so the same value can feed
/// both the runtime handshake and the embedded version data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub name: &'static str,
    pub author: &'static str,
    pub version: PluginVersion,
    pub flags: PluginFlags,
}

impl PluginDescriptor {
    pub const fn new(
        name: &'static str,
        author: &'static str,
        version: PluginVersion,
        flags: PluginFlags,
    ) -> Self {
        Self { name, author, version, flags }
    }
}

/// The host-agnostic plugin object bound to the platform by `Initialize`.
pub trait ExtenderPlugin: Send {
    fn descriptor(&self) -> &PluginDescriptor;

    /// Event-handling facet. A plugin returning `None` cannot be bound.
    fn initialization_handler(&mut self) -> Option<&mut dyn InitializationHandler>;

    /// Passive modules to bring up together with the built-in ones.
    fn modules(&mut self) -> Vec<Box<dyn SubsystemModule>> {
        Vec::new()
    }

    fn name(&self) -> &str {
        self.descriptor().name
    }

    fn author(&self) -> &str {
        self.descriptor().author
    }

    fn version(&self) -> PluginVersion {
        self.descriptor().version
    }

    fn flags(&self) -> PluginFlags {
        self.descriptor().flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parsing() {
        assert_eq!(PluginVersion::parse("1.2.3"), Some(PluginVersion::new(1, 2, 3)));
        assert_eq!(PluginVersion::parse("0.1.0-beta.2"), Some(PluginVersion::new(0, 1, 0)));
        assert_eq!(PluginVersion::parse("1.2"), None);
        assert_eq!(PluginVersion::parse("1.2.3.4"), None);
        assert_eq!(PluginVersion::parse("invalid"), None);
    }

    #[test]
    fn test_version_limits_follow_packed_format() {
        let widest = PluginVersion::new(255, 255, 4095);
        assert!(widest.is_packable());
        assert_eq!(crate::abi::unpack_version(widest.packed()), (255, 255, 4095));
        assert_eq!(PluginVersion::parse("255.255.4095"), Some(widest));

        assert_eq!(PluginVersion::parse("1.256.0"), None);
        assert_eq!(PluginVersion::parse("1.0.4096"), None);
        assert_eq!(PluginVersion::parse("256.0.0"), None);
        assert!(!PluginVersion::new(1, 300, 0).is_packable());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "does not fit the packed host format")]
    fn test_packing_out_of_range_version_panics_in_debug() {
        PluginVersion::new(1, 256, 0).packed();
    }

    #[test]
    fn test_version_display_and_packing() {
        let version = PluginVersion::new(1, 4, 2);
        assert_eq!(version.to_string(), "1.4.2");
        assert_eq!(version.packed(), pack_version(1, 4, 2));
    }

    #[test]
    fn test_flags() {
        let flags = PluginFlags::VERSION_INDEPENDENT | PluginFlags::ALLOW_EDITOR;
        assert!(flags.is_version_independent());
        assert!(flags.allows_editor());
        assert!(!PluginFlags::NONE.is_version_independent());
        assert!(!PluginFlags::VERSION_INDEPENDENT.allows_editor());
        assert_eq!(flags.bits(), 0b11);
    }
}
