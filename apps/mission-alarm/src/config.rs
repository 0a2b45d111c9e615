//! Configuration for mission alarm.

use crate::quiz::{DecoyPool, DEFAULT_DECOYS, DEFAULT_MAX_DECOYS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "mission-alarm";

/// Name of the data file.
pub const DATA_FILE: &str = "mission_alarm_data.json";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Display settings.
    #[serde(default)]
    pub display: DisplayConfig,
    /// Quiz settings.
    #[serde(default)]
    pub quiz: QuizConfig,
    /// Media page links.
    #[serde(default)]
    pub media: MediaConfig,
    /// Backup settings.
    #[serde(default)]
    pub backup: BackupConfig,
}

impl Config {
    /// Load configuration from default path.
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|p| std::fs::read_to_string(&p).ok().map(|s| (p, s)))
            .map(|(path, content)| Self::parse(&path, &content))
            .unwrap_or_default()
    }

    /// Parse config text, falling back to defaults when it is malformed.
    fn parse(path: &Path, content: &str) -> Self {
        toml::from_str(content).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), %err, "invalid config, using defaults");
            Self::default()
        })
    }

    /// Save configuration to default path.
    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(self)?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    /// Get configuration file path.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME)
            .map(|d| d.config_dir().join("config.toml"))
    }

    /// Get data file path.
    pub fn data_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.data_dir().join(DATA_FILE))
    }

    /// Get log file path.
    pub fn log_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME)
            .map(|d| d.data_dir().join("mission-alarm.log"))
    }

    /// Directory backups are written to.
    pub fn backup_dir(&self) -> PathBuf {
        self.backup
            .dir
            .clone()
            .or_else(|| directories::UserDirs::new().map(|d| d.home_dir().to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// First day of week in the calendar.
    #[serde(default)]
    pub week_start: WeekStart,
    /// Date format string.
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            week_start: WeekStart::Monday,
            date_format: default_date_format(),
        }
    }
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

/// First day of week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

/// Quiz settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    /// Maximum number of decoys mixed into a quiz.
    #[serde(default = "default_max_decoys")]
    pub max_decoys: usize,
    /// Decoy task texts.
    #[serde(default = "default_decoys")]
    pub decoys: Vec<String>,
}

impl QuizConfig {
    pub fn decoy_pool(&self) -> DecoyPool {
        DecoyPool::new(self.decoys.iter().cloned())
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            max_decoys: DEFAULT_MAX_DECOYS,
            decoys: default_decoys(),
        }
    }
}

fn default_max_decoys() -> usize {
    DEFAULT_MAX_DECOYS
}

fn default_decoys() -> Vec<String> {
    DEFAULT_DECOYS.iter().map(|d| d.to_string()).collect()
}

/// Media page links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Video shown on the deadline page.
    #[serde(default = "default_deadline_video")]
    pub deadline_video: String,
    /// Google Drive share links for the MP3 page.
    #[serde(default = "default_mp3_links")]
    pub mp3_links: Vec<String>,
    /// Google Drive share links for the MP4 page.
    #[serde(default = "default_mp4_links")]
    pub mp4_links: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            deadline_video: default_deadline_video(),
            mp3_links: default_mp3_links(),
            mp4_links: default_mp4_links(),
        }
    }
}

fn default_deadline_video() -> String {
    "https://www.youtube.com/watch?v=C3p4QDW3-g8".to_string()
}

fn default_mp3_links() -> Vec<String> {
    vec![
        "https://drive.google.com/file/d/1XmZFMM36-p8E26BE9o0GhcPGhiglhEsS/view?usp=sharing".to_string(),
    ]
}

fn default_mp4_links() -> Vec<String> {
    vec![
        "https://drive.google.com/file/d/1OCudWUdyzNNxQVu6R1HH4M1wc-3uDvSM/view?usp=sharing".to_string(),
    ]
}

/// Backup settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Backup directory. Defaults to the home directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [quiz]
            max_decoys = 5

            [display]
            week_start = "sunday"
            "#,
        )
        .unwrap();

        assert_eq!(config.quiz.max_decoys, 5);
        assert_eq!(config.quiz.decoys.len(), DEFAULT_DECOYS.len());
        assert_eq!(config.display.week_start, WeekStart::Sunday);
        assert_eq!(config.display.date_format, "%Y-%m-%d");
        assert_eq!(config.media.mp3_links.len(), 1);
        assert!(config.backup.dir.is_none());
    }

    #[test]
    fn test_custom_decoys() {
        let config: Config = toml::from_str(
            r#"
            [quiz]
            decoys = ["nap", "Nap", "tv"]
            "#,
        )
        .unwrap();

        assert_eq!(config.quiz.max_decoys, DEFAULT_MAX_DECOYS);
        assert_eq!(config.quiz.decoy_pool().len(), 2);
    }

    #[test]
    fn test_malformed_config_falls_back_to_defaults() {
        let config = Config::parse(Path::new("config.toml"), "[quiz\nmax_decoys = ");
        assert_eq!(config.quiz.max_decoys, DEFAULT_MAX_DECOYS);

        let config = Config::parse(Path::new("config.toml"), "[quiz]\nmax_decoys = 1\n");
        assert_eq!(config.quiz.max_decoys, 1);
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.quiz.decoys, config.quiz.decoys);
        assert_eq!(parsed.media.deadline_video, config.media.deadline_video);
    }
}
