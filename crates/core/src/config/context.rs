use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{load_session_config, open_signature_db, SessionConfig, SessionLayout};
use crate::guest::FlatMemory;
use crate::signatures::SignatureDb;

/// Layout and config of one session, loaded together.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub layout: SessionLayout,
    pub config: SessionConfig,
}

impl SessionContext {
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self> {
        let layout = SessionLayout::new(root);
        let config = load_session_config(&layout)?;
        Ok(Self { layout, config })
    }

    pub fn open_signature_db(&self) -> Result<(PathBuf, SignatureDb)> {
        open_signature_db(&self.layout, &self.config)
    }

    /// Memory image from `memory.image`, or an empty image when none is configured.
    pub fn load_memory(&self) -> Result<FlatMemory> {
        let Some(image) = self.config.memory.image.as_deref() else {
            return Ok(FlatMemory::new(self.config.memory.base, Vec::new()));
        };
        let path = self.layout.resolve(image);
        FlatMemory::from_file(&path, self.config.memory.base)
            .with_context(|| format!("Failed to read memory image at {}", path.display()))
    }
}
