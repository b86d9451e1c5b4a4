//! Build script for xse_plugin_core crate.
//!
//! This build script turns the selected host-variant cargo feature into a single
//! `xse_platform` cfg value and forwards an optional SDK version override so the
//! crate can compare against the extender release it was really built for.

/// Host variants in selection priority order.
const PLATFORMS: [&str; 9] = [
    "mwse", "obse", "fose", "nvse", "skse", "skse64", "sksevr", "f4se", "f4sevr",
];

fn main() {
    let selected = select_platform();

    println!(
        "cargo:rustc-check-cfg=cfg(xse_platform, values(\"none\", {}))",
        PLATFORMS
            .iter()
            .map(|name| format!("\"{name}\""))
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("cargo:rustc-cfg=xse_platform=\"{selected}\"");
    println!("cargo:rustc-env=XSE_PLATFORM={selected}");

    if let Some(version) = get_sdk_version_override() {
        println!("cargo:rustc-env=XSE_COMPILED_SDK_VERSION={version}");
    }

    println!("cargo:rerun-if-env-changed=XSE_SDK_VERSION");
    println!("cargo:rerun-if-changed=build.rs");
}

fn select_platform() -> &'static str {
    let enabled: Vec<&str> = PLATFORMS
        .iter()
        .copied()
        .filter(|name| std::env::var(format!("CARGO_FEATURE_{}", name.to_uppercase())).is_ok())
        .collect();

    if enabled.len() > 1 {
        println!(
            "cargo:warning=several host variants enabled ({}), using '{}'",
            enabled.join(", "),
            enabled[0]
        );
    }
    enabled.first().copied().unwrap_or("none")
}

fn get_sdk_version_override() -> Option<u32> {
    let raw = std::env::var("XSE_SDK_VERSION").ok()?;
    let raw = raw.trim();

    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => raw.parse::<u32>(),
    };

    match parsed {
        Ok(version) => Some(version),
        Err(_) => {
            println!("cargo:warning=ignoring malformed XSE_SDK_VERSION '{raw}'");
            None
        }
    }
}
