//! Host variant identity and the pure lookup table describing each variant.
//!
//! Every accessor is a function of [`PlatformType`] alone. The `None` identity is
//! the fail-safe sentinel: it answers every name and directory query with an
//! empty result instead of guessing.

use crate::abi::pack_version;
use std::fmt;

/// Script extender host variants the plugin can be compiled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlatformType {
    /// No variant selected.
    #[default]
    None,
    Mwse,
    Obse,
    Fose,
    Nvse,
    Skse,
    Skse64,
    SkseVr,
    F4se,
    F4seVr,
}

/// Memory layout family of the interface structure a host passes to `Query`/`Load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceLayout {
    /// OBSE-style layout: command registration slots precede `QueryInterface`.
    Legacy,
    /// SKSE/F4SE-style layout: `QueryInterface` directly follows the header.
    Modern,
}

/// The variant selected at build time through the crate's cargo features.
#[cfg(xse_platform = "none")]
pub const COMPILED_PLATFORM: PlatformType = PlatformType::None;
#[cfg(xse_platform = "mwse")]
pub const COMPILED_PLATFORM: PlatformType = PlatformType::Mwse;
#[cfg(xse_platform = "obse")]
pub const COMPILED_PLATFORM: PlatformType = PlatformType::Obse;
#[cfg(xse_platform = "fose")]
pub const COMPILED_PLATFORM: PlatformType = PlatformType::Fose;
#[cfg(xse_platform = "nvse")]
pub const COMPILED_PLATFORM: PlatformType = PlatformType::Nvse;
#[cfg(xse_platform = "skse")]
pub const COMPILED_PLATFORM: PlatformType = PlatformType::Skse;
#[cfg(xse_platform = "skse64")]
pub const COMPILED_PLATFORM: PlatformType = PlatformType::Skse64;
#[cfg(xse_platform = "sksevr")]
pub const COMPILED_PLATFORM: PlatformType = PlatformType::SkseVr;
#[cfg(xse_platform = "f4se")]
pub const COMPILED_PLATFORM: PlatformType = PlatformType::F4se;
#[cfg(xse_platform = "f4sevr")]
pub const COMPILED_PLATFORM: PlatformType = PlatformType::F4seVr;

impl PlatformType {
    /// All real variants, in declaration order.
    pub const ALL: [PlatformType; 9] = [
        PlatformType::Mwse,
        PlatformType::Obse,
        PlatformType::Fose,
        PlatformType::Nvse,
        PlatformType::Skse,
        PlatformType::Skse64,
        PlatformType::SkseVr,
        PlatformType::F4se,
        PlatformType::F4seVr,
    ];

    pub fn is_none(self) -> bool {
        self == PlatformType::None
    }

    /// Short extender name, e.g. `SKSE64`.
    pub fn name(self) -> &'static str {
        match self {
            PlatformType::None => "",
            PlatformType::Mwse => "MWSE",
            PlatformType::Obse => "OBSE",
            PlatformType::Fose => "FOSE",
            PlatformType::Nvse => "NVSE",
            PlatformType::Skse => "SKSE",
            PlatformType::Skse64 => "SKSE64",
            PlatformType::SkseVr => "SKSEVR",
            PlatformType::F4se => "F4SE",
            PlatformType::F4seVr => "F4SEVR",
        }
    }

    /// Name of the game the extender runs on.
    pub fn game_name(self) -> &'static str {
        match self {
            PlatformType::None => "",
            PlatformType::Mwse => "Morrowind",
            PlatformType::Obse => "Oblivion",
            PlatformType::Fose => "Fallout 3",
            PlatformType::Nvse => "Fallout: New Vegas",
            PlatformType::Skse => "Skyrim",
            PlatformType::Skse64 => "SkyrimSE",
            PlatformType::SkseVr => "SkyrimVR",
            PlatformType::F4se => "Fallout 4",
            PlatformType::F4seVr => "Fallout 4 VR",
        }
    }

    /// Human-readable extender name, e.g. `Oblivion Script Extender`.
    pub fn full_name(self) -> String {
        let game = self.game_name();
        if game.is_empty() {
            String::new()
        } else {
            format!("{game} Script Extender")
        }
    }

    /// Folder the extender uses under the game's `Data` directory and under the
    /// per-game configuration directory. Variants of one game share a folder.
    pub fn folder_name(self) -> &'static str {
        match self {
            PlatformType::None => "",
            PlatformType::Mwse => "MWSE",
            PlatformType::Obse => "OBSE",
            PlatformType::Fose => "FOSE",
            PlatformType::Nvse => "NVSE",
            PlatformType::Skse | PlatformType::Skse64 | PlatformType::SkseVr => "SKSE",
            PlatformType::F4se | PlatformType::F4seVr => "F4SE",
        }
    }

    /// Directory of the game under `Documents/My Games`.
    pub fn game_config_dir(self) -> &'static str {
        match self {
            PlatformType::None => "",
            PlatformType::Mwse => "Morrowind",
            PlatformType::Obse => "Oblivion",
            PlatformType::Fose => "Fallout3",
            PlatformType::Nvse => "FalloutNV",
            PlatformType::Skse => "Skyrim",
            PlatformType::Skse64 => "Skyrim Special Edition",
            PlatformType::SkseVr => "Skyrim VR",
            PlatformType::F4se => "Fallout4",
            PlatformType::F4seVr => "Fallout4VR",
        }
    }

    /// Packed extender version of the SDK release this crate targets.
    ///
    /// OBSE, FOSE and NVSE report a plain release integer; the others use the
    /// packed `major.minor.build` form.
    pub fn sdk_version(self) -> u32 {
        match self {
            PlatformType::None => 0,
            PlatformType::Mwse => pack_version(2, 1, 0),
            PlatformType::Obse => 21,
            PlatformType::Fose => 1,
            PlatformType::Nvse => 6,
            PlatformType::Skse => pack_version(1, 7, 3),
            PlatformType::Skse64 => pack_version(2, 2, 6),
            PlatformType::SkseVr => pack_version(2, 0, 12),
            PlatformType::F4se => pack_version(0, 7, 2),
            PlatformType::F4seVr => pack_version(0, 6, 21),
        }
    }

    pub fn interface_layout(self) -> Option<InterfaceLayout> {
        match self {
            PlatformType::None => None,
            PlatformType::Mwse | PlatformType::Obse | PlatformType::Fose | PlatformType::Nvse => {
                Some(InterfaceLayout::Legacy)
            }
            PlatformType::Skse
            | PlatformType::Skse64
            | PlatformType::SkseVr
            | PlatformType::F4se
            | PlatformType::F4seVr => Some(InterfaceLayout::Modern),
        }
    }

    /// Whether the host may call `Load` without calling `Query` first.
    ///
    /// Current SKSE64 releases read the embedded version data block instead of
    /// calling `Query`.
    pub fn requires_implicit_query(self) -> bool {
        matches!(self, PlatformType::Skse64)
    }

    /// Whether the host reads a static version data block from the binary.
    pub fn embeds_version_data(self) -> bool {
        matches!(self, PlatformType::Skse64)
    }

    /// Exported symbol prefix of the entry points, e.g. `SKSE` for `SKSEPlugin_Load`.
    pub fn entry_point_prefix(self) -> &'static str {
        match self {
            PlatformType::None => "",
            PlatformType::Mwse => "MWSE",
            PlatformType::Obse => "OBSE",
            PlatformType::Fose => "FOSE",
            PlatformType::Nvse => "NVSE",
            PlatformType::Skse | PlatformType::Skse64 | PlatformType::SkseVr => "SKSE",
            PlatformType::F4se | PlatformType::F4seVr => "F4SE",
        }
    }

    /// Names of the exported `Query` and `Load` functions.
    pub fn entry_point_names(self) -> Option<(String, String)> {
        if self.is_none() {
            return None;
        }
        let prefix = self.entry_point_prefix();
        Some((format!("{prefix}Plugin_Query"), format!("{prefix}Plugin_Load")))
    }

    /// Parses a cfg-style variant name such as `skse64`.
    pub fn from_cfg_name(name: &str) -> PlatformType {
        PlatformType::ALL
            .into_iter()
            .find(|platform| platform.name().eq_ignore_ascii_case(name))
            .unwrap_or(PlatformType::None)
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("<none>")
        } else {
            f.write_str(self.name())
        }
    }
}

/// Extender version the build compares host versions against.
///
/// `XSE_SDK_VERSION` at build time overrides the table value.
pub fn compiled_sdk_version(platform: PlatformType) -> u32 {
    option_env!("XSE_COMPILED_SDK_VERSION")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| platform.sdk_version())
}
