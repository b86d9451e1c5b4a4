//! Error types for the platform layer.
//!
//! None of these cross the host boundary: the entry points log them and report a
//! plain `bool`, because that is all the host ABI carries.

use crate::event::EventKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("Query has already been called")]
    QueryAlreadyCalled,

    #[error("Load has already been called")]
    LoadAlreadyCalled,

    #[error("implicit Query before Load failed")]
    ImplicitQueryFailed,

    #[error("no plugin is bound to the platform")]
    PluginNotBound,

    #[error("plugin '{0}' exposes no initialization event handler")]
    MissingEventHandler(String),

    #[error("host version {host} does not match compiled version {compiled}")]
    VersionMismatch { host: u32, compiled: u32 },

    #[error("plugin does not allow loading in the editor")]
    EditorNotAllowed,

    #[error("plugin rejected the {kind} event: {reason}")]
    EventRejected { kind: EventKind, reason: String },

    #[error("subsystem bring-up failed: {0}")]
    Subsystem(#[from] ModuleError),

    #[error("plugin initialization failed, handshake refused")]
    InitializationFailed,
}

impl HandshakeError {
    /// Short category label used as the diagnostic log category.
    pub fn category(&self) -> &'static str {
        match self {
            HandshakeError::QueryAlreadyCalled
            | HandshakeError::LoadAlreadyCalled
            | HandshakeError::ImplicitQueryFailed => "Protocol",
            HandshakeError::PluginNotBound | HandshakeError::MissingEventHandler(_) => "Binding",
            HandshakeError::VersionMismatch { .. } | HandshakeError::EditorNotAllowed => "Compatibility",
            HandshakeError::EventRejected { .. } => "Delivery",
            HandshakeError::Subsystem(_) | HandshakeError::InitializationFailed => "Subsystem",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    #[error("module '{name}' failed to initialize: {reason}")]
    InitializationFailed { name: String, reason: String },

    #[error("module '{0}' panicked during initialization")]
    Panicked(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_mismatch_message() {
        let error = HandshakeError::VersionMismatch { host: 200, compiled: 100 };
        let message = error.to_string();
        assert!(message.contains("200"));
        assert!(message.contains("100"));
        assert_eq!(error.category(), "Compatibility");
    }

    #[test]
    fn test_categories() {
        assert_eq!(HandshakeError::QueryAlreadyCalled.category(), "Protocol");
        assert_eq!(HandshakeError::PluginNotBound.category(), "Binding");
        assert_eq!(
            HandshakeError::EventRejected {
                kind: EventKind::Load,
                reason: "nope".to_string()
            }
            .category(),
            "Delivery"
        );
    }

    #[test]
    fn test_module_error_converts() {
        let error: HandshakeError = ModuleError::Panicked("hooks".to_string()).into();
        assert!(matches!(error, HandshakeError::Subsystem(_)));
        assert!(error.to_string().contains("hooks"));
        assert_eq!(HandshakeError::InitializationFailed.category(), "Subsystem");
    }
}
