use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory searched for `DMG_ROM.bin` / `CGB_ROM.bin`
    #[serde(default = "default_boot_rom_dir")]
    pub boot_rom_dir: PathBuf,
    /// Explicit DMG boot ROM, takes precedence over `boot_rom_dir`
    #[serde(default)]
    pub dmg_boot_rom: Option<PathBuf>,
    #[serde(default)]
    pub cgb_boot_rom: Option<PathBuf>,
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
    #[serde(default = "default_true")]
    pub use_boot_rom: bool,
    #[serde(default)]
    pub output_serial: bool,
}

fn default_boot_rom_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("saves")
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            boot_rom_dir: default_boot_rom_dir(),
            dmg_boot_rom: None,
            cgb_boot_rom: None,
            save_dir: default_save_dir(),
            use_boot_rom: true,
            output_serial: false,
        }
    }
}

impl Settings {
    /// Get the config file path relative to the executable
    pub fn config_path() -> PathBuf {
        let mut path = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("config.json");
        path
    }

    /// Load settings from config.json next to the executable
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`, falling back to defaults on error
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!(
                        "Failed to parse {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            // File doesn't exist or can't be read, use defaults
            Err(_) => Self::default(),
        }
    }

    /// Configured boot ROM file for the given hardware, if any
    pub fn boot_rom_path(&self, cgb: bool) -> Option<&Path> {
        if cgb {
            self.cgb_boot_rom.as_deref()
        } else {
            self.dmg_boot_rom.as_deref()
        }
    }
}
