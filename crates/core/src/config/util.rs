use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::config::{SessionConfig, SessionLayout};
use crate::guest::Guest;
use crate::signatures::SignatureDb;
use crate::symbols::SymbolDb;

/// Load the session config for a layout: JSON first, then YAML (`.yaml` or `.yml`).
pub fn load_session_config(layout: &SessionLayout) -> Result<SessionConfig> {
    if layout.config_path.exists() {
        return load_session_config_file(&layout.config_path);
    }
    for candidate in [layout.yaml_config_path.clone(), layout.yaml_config_path.with_extension("yml")] {
        if candidate.exists() {
            return load_session_config_file(&candidate);
        }
    }
    bail!("No session config found at {}", layout.config_path.display())
}

fn load_session_config_file(path: &Path) -> Result<SessionConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session config at {}", path.display()))?;
    let is_yaml = matches!(path.extension().and_then(|ext| ext.to_str()), Some("yaml" | "yml"));
    let config = if is_yaml {
        serde_yaml::from_str(&text).context("Failed to parse session config YAML")?
    } else {
        serde_json::from_str(&text).context("Failed to parse session config JSON")?
    };
    Ok(config)
}

/// Resolve the signature DB path (respecting relative/absolute config) and open it.
pub fn open_signature_db(layout: &SessionLayout, config: &SessionConfig) -> Result<(PathBuf, SignatureDb)> {
    let db_path = layout.resolve(&config.signature_db.path);
    let db = SignatureDb::open(&db_path)
        .with_context(|| format!("Failed to open signature database at {}", db_path.display()))?;
    Ok((db_path, db))
}

/// Map file locations for a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapFileLookup {
    /// The map file, if it exists.
    pub existing: Option<PathBuf>,
    /// Where a map for this title should be written.
    pub writable: PathBuf,
}

pub fn find_map_file(layout: &SessionLayout, game_id: &str) -> MapFileLookup {
    let writable = layout.map_path(game_id);
    let existing = writable.exists().then(|| writable.clone());
    MapFileLookup { existing, writable }
}

/// Load the title's map into `symbols` when a session starts.
///
/// Returns whether the table changed. An already-loaded copy of the same
/// map is kept; a missing or unreadable map clears the table.
pub fn load_map_on_boot(
    symbols: &SymbolDb,
    guest: &dyn Guest,
    layout: &SessionLayout,
    config: &SessionConfig,
) -> bool {
    let Some(map_path) = find_map_file(layout, &config.game_id).existing else {
        return symbols.clear();
    };

    if !symbols.is_empty() && symbols.map_name().as_deref() == Some(map_path.as_path()) {
        return false;
    }

    match symbols.load_map(guest, &map_path, config.lenient_maps) {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(error = %err, "map load on boot failed");
            symbols.clear()
        }
    }
}
