use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, VrtError};
use crate::Viewport;

/// Tool-wide configuration, loadable from a TOML file. CLI flags override these
/// values; anything absent from the file falls back to the defaults below.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub viewport: Viewport,
    pub threshold: f32,
    pub timeouts: Timeouts,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    /// Page navigation bound (goto + network idle).
    #[serde(with = "humantime_serde")]
    pub navigation: Duration,
    /// One-time browser download bound.
    #[serde(with = "humantime_serde")]
    pub provisioning: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(60),
            provisioning: Duration::from_secs(300),
        }
    }
}

/// Supervisor settings for the desktop-hosting mode.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub port: u16,
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub startup_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 5002,
            probe_timeout: Duration::from_secs(1),
            retry_delay: Duration::from_secs(5),
            startup_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            threshold: 0.1,
            timeouts: Timeouts::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl Config {
    /// Load config from an explicit TOML path, or return defaults when no path
    /// is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VrtError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let cfg: Config = toml::from_str(&raw).map_err(|e| {
            VrtError::Config(format!("Invalid config {}: {}", path.display(), e))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(VrtError::Config(format!(
                "threshold must be within 0.0..=1.0, got {}",
                self.threshold
            )));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(VrtError::Config("viewport dimensions must be positive".into()));
        }
        if self.timeouts.navigation.is_zero() {
            return Err(VrtError::Config("navigation timeout must be positive".into()));
        }
        if self.service.probe_timeout.is_zero() {
            return Err(VrtError::Config("probe timeout must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults_match_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.viewport.width, 1280);
        assert_eq!(cfg.viewport.height, 800);
        assert!((cfg.threshold - 0.1).abs() < f32::EPSILON);
        assert_eq!(cfg.timeouts.navigation, Duration::from_secs(60));
        assert_eq!(cfg.timeouts.provisioning, Duration::from_secs(300));
        assert_eq!(cfg.service.port, 5002);
        assert_eq!(cfg.service.probe_timeout, Duration::from_secs(1));
        assert_eq!(cfg.service.retry_delay, Duration::from_secs(5));
    }

    #[test]
    fn load_without_path_returns_defaults() {
        let cfg = Config::load(None).expect("defaults");
        assert_eq!(cfg.service.port, 5002);
    }

    #[test]
    fn load_parses_partial_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vrt.toml");
        std::fs::write(
            &path,
            r#"
threshold = 0.25

[viewport]
width = 1920
height = 1080

[timeouts]
navigation = "30s"

[service]
port = 6001
retry_delay = "2s"
"#,
        )
        .expect("write config");

        let cfg = Config::load(Some(&path)).expect("load config");
        assert!((cfg.threshold - 0.25).abs() < f32::EPSILON);
        assert_eq!(cfg.viewport.width, 1920);
        assert_eq!(cfg.timeouts.navigation, Duration::from_secs(30));
        // Unspecified values keep defaults.
        assert_eq!(cfg.timeouts.provisioning, Duration::from_secs(300));
        assert_eq!(cfg.service.port, 6001);
        assert_eq!(cfg.service.retry_delay, Duration::from_secs(2));
        assert_eq!(cfg.service.probe_timeout, Duration::from_secs(1));
    }

    #[test]
    fn load_rejects_out_of_range_threshold() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vrt.toml");
        std::fs::write(&path, "threshold = 1.5\n").expect("write config");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn load_rejects_missing_file() {
        assert!(Config::load(Some(Path::new("/nonexistent/vrt.toml"))).is_err());
    }
}
