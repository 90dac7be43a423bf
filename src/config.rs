use std::{
    fs::{create_dir_all, File},
    io::{BufReader, Write},
    path::PathBuf,
};

use home::home_dir;
use serde::{Deserialize, Serialize};
use smfxml::writer::xml_writer::DEFAULT_INDENT;
use smfxml::SmfError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Omit repeated status bytes when writing MIDI files.
    running_status: bool,
    /// Indentation of the XML output.
    indent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            running_status: true,
            indent: DEFAULT_INDENT.to_string(),
        }
    }
}

impl Config {
    // folder placed in $HOME directory
    const FOLDER: &'static str = ".smfxml";

    pub const fn running_status(&self) -> bool {
        self.running_status
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    fn get_base_path() -> Result<PathBuf, SmfError> {
        let home = home_dir()
            .ok_or_else(|| SmfError::ConfigError("Could not find home directory".to_string()))?;
        let path = home.join(Self::FOLDER);
        Ok(path)
    }

    fn get_path() -> Result<PathBuf, SmfError> {
        let base = Self::get_base_path()?;
        Ok(base.join("config.json"))
    }

    /// Creates config if it does not exist
    pub fn read_config() -> Result<Self, SmfError> {
        let base_path = Self::get_base_path()?;
        if !base_path.exists() {
            create_dir_all(base_path)?;
        }
        let config_path = Self::get_path()?;
        if !config_path.exists() {
            // create default config
            Self::default().save_config()?;
        }
        let file = File::open(config_path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader).map_err(|err| {
            SmfError::ConfigError(format!("Could not read local configuration {err:}"))
        })?;
        log::debug!("{config:?}");
        Ok(config)
    }

    /// Assumes the config folder exists
    pub fn save_config(&self) -> Result<(), SmfError> {
        let config_path = Self::get_path()?;
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            SmfError::ConfigError(format!("Could not save local configuration {err:}"))
        })?;
        let mut file = File::create(config_path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_json::from_str(r#"{ "running_status": false }"#).unwrap();
        assert!(!config.running_status());
        assert_eq!(config.indent(), "\t");
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = Config {
            running_status: false,
            indent: "    ".to_string(),
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
