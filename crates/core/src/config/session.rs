use serde::{Deserialize, Serialize};

use crate::guest::flat_memory::DEFAULT_BASE;
use crate::hw::HardwareConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureDbConfig {
    /// Path to the signature database (typically relative to the session root).
    pub path: String,
}

impl SignatureDbConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Where the guest memory image comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Raw big-endian memory dump (relative to the session root unless absolute).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Guest address of the first byte of `image`.
    #[serde(default = "default_base")]
    pub base: u32,
}

fn default_base() -> u32 {
    DEFAULT_BASE
}

fn is_retail(sizes: &HardwareSizes) -> bool {
    *sizes == HardwareSizes::default()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { image: None, base: DEFAULT_BASE }
    }
}

/// Optional overrides of the retail hardware sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareSizes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exram_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aram_size: Option<u32>,
}

/// Serializable configuration describing one debugging session.
///
/// Lives at `.symstate/session.json` (or `.symstate/session.yaml`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Human-friendly session name.
    pub name: String,
    /// Title identifier; selects `Maps/<game_id>.map` and the state file names.
    pub game_id: String,
    /// Config format version.
    pub config_version: String,
    /// Wii configurations add the IOS sections to save states.
    #[serde(default)]
    pub wii: bool,
    /// Load maps with the lenient (`blr`-bounded) validation.
    #[serde(default)]
    pub lenient_maps: bool,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default, skip_serializing_if = "is_retail")]
    pub hardware: HardwareSizes,
    pub signature_db: SignatureDbConfig,
}

impl SessionConfig {
    pub fn new(name: impl Into<String>, game_id: impl Into<String>, signature_db_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            game_id: game_id.into(),
            config_version: "0.1.0".to_string(),
            wii: false,
            lenient_maps: false,
            memory: MemoryConfig::default(),
            hardware: HardwareSizes::default(),
            signature_db: SignatureDbConfig::new(signature_db_path),
        }
    }

    /// Hardware sizes for the configured console family, retail unless overridden.
    pub fn hardware_config(&self) -> HardwareConfig {
        let mut config = if self.wii { HardwareConfig::wii() } else { HardwareConfig::gamecube() };
        if let Some(ram_size) = self.hardware.ram_size {
            config.ram_size = ram_size;
        }
        if let Some(aram_size) = self.hardware.aram_size {
            config.aram_size = aram_size;
        }
        if self.wii {
            if let Some(exram_size) = self.hardware.exram_size {
                config.exram_size = Some(exram_size);
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_fields_take_defaults() {
        let json = r#"{
            "name": "demo",
            "game_id": "GALE01",
            "config_version": "0.1.0",
            "signature_db": { "path": ".symstate/signatures.db" }
        }"#;
        let config: SessionConfig = serde_json::from_str(json).expect("parse");
        assert!(!config.wii);
        assert!(!config.lenient_maps);
        assert_eq!(config.memory, MemoryConfig::default());
        assert_eq!(config.memory.base, 0x8000_0000);
    }

    #[test]
    fn yaml_and_json_agree() {
        let yaml = "\
name: demo
game_id: RMGE01
config_version: 0.1.0
wii: true
memory:
  image: mem1.bin
signature_db:
  path: sigs.db
";
        let config: SessionConfig = serde_yaml::from_str(yaml).expect("parse yaml");
        let round = serde_json::to_string(&config).expect("to json");
        let back: SessionConfig = serde_json::from_str(&round).expect("from json");
        assert_eq!(back, config);
        assert!(config.hardware_config().wii);
        assert_eq!(config.memory.image.as_deref(), Some("mem1.bin"));
    }

    #[test]
    fn hardware_overrides_replace_retail_sizes() {
        let mut config = SessionConfig::new("demo", "GALE01", "sigs.db");
        assert_eq!(config.hardware_config(), HardwareConfig::gamecube());

        config.hardware.ram_size = Some(0x1000);
        config.hardware.exram_size = Some(0x800);
        let hw = config.hardware_config();
        assert_eq!(hw.ram_size, 0x1000);
        // Extra RAM only exists on Wii.
        assert_eq!(hw.exram_size, None);

        config.wii = true;
        assert_eq!(config.hardware_config().exram_size, Some(0x800));
    }
}
