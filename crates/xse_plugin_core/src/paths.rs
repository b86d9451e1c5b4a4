//! Directory layout derived from the platform identity.
//!
//! Game-side directories hang off the folder that holds the game executable;
//! the log directory lives under `Documents/My Games/<game>/<extender folder>`.
//! A `None` platform resolves every directory to `None`.

use crate::platform::PlatformType;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDirectories {
    platform: PlatformType,
    game_root: Option<PathBuf>,
    documents: Option<PathBuf>,
}

impl PlatformDirectories {
    /// Resolves the roots from the running process and the user's Documents folder.
    pub fn discover(platform: PlatformType) -> Self {
        let game_root = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let documents = dirs::document_dir();
        debug!(
            "Resolved directory roots for {}: game={:?}, documents={:?}",
            platform, game_root, documents
        );
        Self::with_roots(platform, game_root, documents)
    }

    pub fn with_roots(
        platform: PlatformType,
        game_root: Option<PathBuf>,
        documents: Option<PathBuf>,
    ) -> Self {
        Self { platform, game_root, documents }
    }

    pub fn platform(&self) -> PlatformType {
        self.platform
    }

    pub fn game_root(&self) -> Option<PathBuf> {
        if self.platform.is_none() {
            return None;
        }
        self.game_root.clone()
    }

    pub fn game_data(&self) -> Option<PathBuf> {
        self.game_root().map(|root| root.join("Data"))
    }

    /// `<game>/Data/<extender folder>`
    pub fn platform_dir(&self) -> Option<PathBuf> {
        self.game_data().map(|data| data.join(self.platform.folder_name()))
    }

    pub fn plugins_dir(&self) -> Option<PathBuf> {
        self.platform_dir().map(|dir| dir.join("Plugins"))
    }

    /// `<Documents>/My Games/<game config dir>/<extender folder>`
    pub fn logs_dir(&self) -> Option<PathBuf> {
        if self.platform.is_none() {
            return None;
        }
        self.documents.as_ref().map(|documents| {
            documents
                .join("My Games")
                .join(self.platform.game_config_dir())
                .join(self.platform.folder_name())
        })
    }
}
