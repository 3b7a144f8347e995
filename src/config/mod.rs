use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::board::{Driver, TimeWindow, DEFAULT_HISTORY_LIMIT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_font_scale")]
    pub font_scale: f32,
    #[serde(default = "default_day_start")]
    pub day_start: String,
    #[serde(default = "default_last_start")]
    pub last_start: String,
    #[serde(default = "default_day_end")]
    pub day_end: String,
    /// Pixel height of one 15-minute slot
    #[serde(default = "default_slot_height")]
    pub slot_height: f32,
    #[serde(default = "default_column_width")]
    pub column_width: f32,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
    /// Where board files live; platform data dir when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Driver columns for a date that has no saved board yet
    #[serde(default = "default_roster")]
    pub roster: Vec<Driver>,
}

fn default_font_scale() -> f32 {
    1.0
}

fn default_day_start() -> String {
    "06:00".to_string()
}

fn default_last_start() -> String {
    "17:45".to_string()
}

fn default_day_end() -> String {
    "18:00".to_string()
}

fn default_slot_height() -> f32 {
    18.0
}

fn default_column_width() -> f32 {
    150.0
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_save_debounce_ms() -> u64 {
    1500
}

fn default_roster() -> Vec<Driver> {
    vec![
        Driver::new("D1", "Driver 1", "Truck 1"),
        Driver::new("D2", "Driver 2", "Truck 2"),
        Driver::new("D3", "Driver 3", "Truck 3"),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            font_scale: default_font_scale(),
            day_start: default_day_start(),
            last_start: default_last_start(),
            day_end: default_day_end(),
            slot_height: default_slot_height(),
            column_width: default_column_width(),
            history_limit: default_history_limit(),
            save_debounce_ms: default_save_debounce_ms(),
            data_dir: None,
            roster: default_roster(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            serde_json::from_str(&contents)
                .context("Failed to parse config file")
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "dispatch", "dispatch-board")
            .context("Could not determine config directory")
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.json"))
    }

    /// Directory holding one board file per date
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("boards")),
        }
    }

    /// Operating window from the configured bounds
    pub fn time_window(&self) -> Result<TimeWindow> {
        TimeWindow::from_strings(&self.day_start, &self.last_start, &self.day_end)
            .context("Invalid operating window in config")
    }

    /// Pixels per minute on the board grid
    pub fn pixels_per_minute(&self) -> f32 {
        (self.slot_height / crate::board::SLOT_MINUTES as f32).max(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = serde_json::from_str(r#"{"font_scale": 1.25}"#).unwrap();
        assert_eq!(config.font_scale, 1.25);
        assert_eq!(config.day_start, "06:00");
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.roster.len(), 3);
        assert_eq!(config.time_window().unwrap(), TimeWindow::default());
    }

    #[test]
    fn round_trips_through_json() {
        let config = Config {
            data_dir: Some(PathBuf::from("/tmp/boards")),
            roster: vec![Driver::new("D1", "Sato", "2025PK")],
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<Config>(&json).unwrap(), config);
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/boards"));
    }

    #[test]
    fn rejects_an_inverted_window() {
        let config = Config {
            day_start: "12:00".to_string(),
            last_start: "08:00".to_string(),
            ..Default::default()
        };
        assert!(config.time_window().is_err());

        let config = Config {
            day_end: "25:00".to_string(),
            ..Default::default()
        };
        assert!(config.time_window().is_err());
    }

    #[test]
    fn slot_height_maps_to_pixels_per_minute() {
        let config = Config::default();
        assert_eq!(config.pixels_per_minute(), 1.2);
    }
}
