use std::path::{Path, PathBuf};

/// Logical layout of a session on disk.
///
/// Derived from a root path; does not perform any I/O itself.
#[derive(Debug, Clone)]
pub struct SessionLayout {
    /// Root directory of the session.
    pub root: PathBuf,
    /// Directory for internal metadata (.symstate).
    pub meta_dir: PathBuf,
    /// Path to the session config file (JSON).
    pub config_path: PathBuf,
    /// Alternative YAML config path, used when the JSON file is absent.
    pub yaml_config_path: PathBuf,
    /// Path to the signature database file.
    pub signature_db_path: PathBuf,
    /// Directory holding `<game id>.map` files.
    pub maps_dir: PathBuf,
    /// Directory for save-state files.
    pub states_dir: PathBuf,
}

impl SessionLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let meta_dir = root.join(".symstate");
        let config_path = meta_dir.join("session.json");
        let yaml_config_path = meta_dir.join("session.yaml");
        let signature_db_path = meta_dir.join("signatures.db");
        let maps_dir = root.join("Maps");
        let states_dir = root.join("StateSaves");

        Self { root, meta_dir, config_path, yaml_config_path, signature_db_path, maps_dir, states_dir }
    }

    /// Signature DB path relative to `root`, for storing in [`crate::config::SessionConfig`].
    pub fn signature_db_relative_string(&self) -> String {
        match self.signature_db_path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_string_lossy().to_string(),
            Err(_) => self.signature_db_path.to_string_lossy().to_string(),
        }
    }

    pub fn map_path(&self, game_id: &str) -> PathBuf {
        self.maps_dir.join(format!("{game_id}.map"))
    }

    /// `StateSaves/<game id>.s<slot>`, slot zero-padded to two digits.
    pub fn state_path(&self, game_id: &str, slot: u32) -> PathBuf {
        self.states_dir.join(format!("{game_id}.s{slot:02}"))
    }

    /// Resolve a path from the config: absolute paths are kept, relative
    /// ones are taken from `root`.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_root() {
        let layout = SessionLayout::new("/tmp/session");
        assert_eq!(layout.config_path, PathBuf::from("/tmp/session/.symstate/session.json"));
        assert_eq!(layout.map_path("GALE01"), PathBuf::from("/tmp/session/Maps/GALE01.map"));
        assert_eq!(layout.state_path("GALE01", 3), PathBuf::from("/tmp/session/StateSaves/GALE01.s03"));
        assert_eq!(layout.signature_db_relative_string(), PathBuf::from(".symstate/signatures.db").to_string_lossy());
        assert_eq!(layout.resolve("/abs/main.dol"), PathBuf::from("/abs/main.dol"));
        assert_eq!(layout.resolve("main.bin"), PathBuf::from("/tmp/session/main.bin"));
    }
}
