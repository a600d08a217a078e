//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::actuation::ActuationSettings;
use crate::gesture::DEFAULT_ACCEPTANCE_THRESHOLD;

/// Tunables for classification, stabilization and actuation
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Confidence a gesture check must exceed
    pub acceptance_threshold: f32,
    /// Samples kept by the stabilizer
    pub history_capacity: usize,
    /// Consecutive agreeing samples needed to confirm a gesture
    pub consensus_window: usize,
    /// Hands below this detector score are treated as absent
    pub min_detection_score: f32,
    pub actuation: ActuationSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            history_capacity: 5,
            consensus_window: 3,
            min_detection_score: 0.5,
            actuation: ActuationSettings::default(),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Log key events instead of posting them
    pub dry_run: bool,

    pub pipeline: PipelineSettings,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let home = lookup("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("gesture-keys");

        let socket_path = lookup("GESTURE_KEYS_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));

        let dry_run = match lookup("GESTURE_KEYS_DRY_RUN") {
            Some(value) => parse_flag(&value)
                .with_context(|| format!("invalid GESTURE_KEYS_DRY_RUN: {value:?}"))?,
            None => false,
        };

        let mut pipeline = PipelineSettings::default();

        if let Some(value) = lookup("GESTURE_KEYS_REPEAT_MS") {
            let ms: u64 = value
                .parse()
                .with_context(|| format!("invalid GESTURE_KEYS_REPEAT_MS: {value:?}"))?;
            anyhow::ensure!(ms > 0, "GESTURE_KEYS_REPEAT_MS must be positive");
            pipeline.actuation.repeat_interval = Duration::from_millis(ms);
        }

        if let Some(value) = lookup("GESTURE_KEYS_MIN_DETECTION") {
            let score: f32 = value
                .parse()
                .with_context(|| format!("invalid GESTURE_KEYS_MIN_DETECTION: {value:?}"))?;
            anyhow::ensure!(
                (0.0..=1.0).contains(&score),
                "GESTURE_KEYS_MIN_DETECTION must be within [0, 1]"
            );
            pipeline.min_detection_score = score;
        }

        Ok(Self {
            socket_path,
            data_dir,
            dry_run,
            pipeline,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[("HOME", "/home/tester")]).unwrap();
        assert_eq!(
            config.socket_path,
            PathBuf::from("/home/tester/.local/share/gesture-keys/daemon.sock")
        );
        assert!(!config.dry_run);
        assert_eq!(config.pipeline, PipelineSettings::default());
        assert_eq!(
            config.pipeline.actuation.repeat_interval,
            Duration::from_millis(100)
        );
    }

    #[test]
    fn test_config_overrides() {
        let config = load(&[
            ("HOME", "/home/tester"),
            ("GESTURE_KEYS_SOCKET", "/tmp/gk.sock"),
            ("GESTURE_KEYS_DRY_RUN", "yes"),
            ("GESTURE_KEYS_REPEAT_MS", "50"),
            ("GESTURE_KEYS_MIN_DETECTION", "0.7"),
        ])
        .unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/tmp/gk.sock"));
        assert!(config.dry_run);
        assert_eq!(config.pipeline.actuation.repeat_interval, Duration::from_millis(50));
        assert_eq!(config.pipeline.min_detection_score, 0.7);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(load(&[]).is_err());
        assert!(load(&[("HOME", "/h"), ("GESTURE_KEYS_REPEAT_MS", "0")]).is_err());
        assert!(load(&[("HOME", "/h"), ("GESTURE_KEYS_REPEAT_MS", "fast")]).is_err());
        assert!(load(&[("HOME", "/h"), ("GESTURE_KEYS_DRY_RUN", "maybe")]).is_err());
        assert!(load(&[("HOME", "/h"), ("GESTURE_KEYS_MIN_DETECTION", "2")]).is_err());
    }
}
