//! Drowsiness detection configuration

use std::path::Path;

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::landmark::{EyeIndices, FACE_MESH_LANDMARKS, LEFT_EYE, RIGHT_EYE};
use crate::tracker::Thresholds;
use crate::DrowsinessError;

/// Environment variable prefix, e.g. `DROWSY_EAR_THRESH=0.2`
pub const ENV_PREFIX: &str = "DROWSY";

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX).try_parsing(true)
}

/// Drowsiness detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrowsinessConfig {
    /// Average EAR below which the eyes count as closed
    pub ear_thresh: f32,

    /// Seconds the eyes must stay closed before the alarm fires
    pub wait_time_secs: f64,

    /// Landmarks per face reported by the landmark source
    pub landmark_count: usize,

    /// Eye contour indices
    pub left_eye: EyeIndices,
    pub right_eye: EyeIndices,
}

impl Default for DrowsinessConfig {
    fn default() -> Self {
        Self {
            ear_thresh: 0.18,
            wait_time_secs: 1.0,
            landmark_count: FACE_MESH_LANDMARKS,
            left_eye: LEFT_EYE,
            right_eye: RIGHT_EYE,
        }
    }
}

impl DrowsinessConfig {
    /// Create strict config (alarm sooner)
    pub fn strict() -> Self {
        Self {
            ear_thresh: 0.22,
            wait_time_secs: 0.5,
            ..Default::default()
        }
    }

    /// Create lenient config (alarm later)
    pub fn lenient() -> Self {
        Self {
            ear_thresh: 0.15,
            wait_time_secs: 2.5,
            ..Default::default()
        }
    }

    /// Load from an optional file, overridden by `DROWSY_*` environment variables.
    ///
    /// The file format follows its extension (toml, json, yaml, ...). Missing
    /// keys fall back to [`DrowsinessConfig::default`]. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, DrowsinessError> {
        Self::load_with_env(path, env_source())
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, DrowsinessError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            info!("Loading drowsiness config from {}", path.display());
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(env);

        let config: Self = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| DrowsinessError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Runtime thresholds
    pub fn thresholds(&self) -> Result<Thresholds, DrowsinessError> {
        Thresholds::new(self.ear_thresh, self.wait_time_secs)
    }

    /// Check thresholds and eye indices against `landmark_count`
    pub fn validate(&self) -> Result<(), DrowsinessError> {
        self.thresholds()?;
        self.left_eye.validate(self.landmark_count)?;
        self.right_eye.validate(self.landmark_count)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::config::Map;
    use std::io::Write;

    fn write_config(ext: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(ext).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_is_valid() {
        let config = DrowsinessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.left_eye, LEFT_EYE);

        let thresholds = config.thresholds().unwrap();
        assert_eq!(thresholds.wait_time().as_secs_f64(), 1.0);
    }

    #[test]
    fn test_presets() {
        let strict = DrowsinessConfig::strict();
        let lenient = DrowsinessConfig::lenient();
        assert!(strict.wait_time_secs < lenient.wait_time_secs);
        assert!(strict.validate().is_ok());
        assert!(lenient.validate().is_ok());
    }

    #[test]
    fn test_load_file_with_env_override() {
        let file = write_config(
            ".toml",
            "ear_thresh = 0.25\nwait_time_secs = 3.0\nleft_eye = [362, 385, 387, 263, 373, 380]\n",
        );

        let env = env_source().source(Some(Map::from([(
            "DROWSY_LANDMARK_COUNT".to_string(),
            "468".to_string(),
        )])));

        let config = DrowsinessConfig::load_with_env(Some(file.path()), env).unwrap();
        assert_eq!(config.ear_thresh, 0.25);
        assert_eq!(config.wait_time_secs, 3.0);
        assert_eq!(config.landmark_count, 468);
        assert_eq!(config.right_eye, RIGHT_EYE);
    }

    #[test]
    fn test_load_json() {
        let file = write_config(".json", r#"{"ear_thresh": 0.3}"#);
        let config = DrowsinessConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.ear_thresh, 0.3);
        assert_eq!(config.wait_time_secs, 1.0);
    }

    #[test]
    fn test_load_rejects_invalid_threshold() {
        let file = write_config(".toml", "ear_thresh = -0.1\n");
        let err = DrowsinessConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, DrowsinessError::InvalidThreshold { name: "ear_thresh", .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = DrowsinessConfig::load(Some(Path::new("/nonexistent/drowsy.toml"))).unwrap_err();
        assert!(matches!(err, DrowsinessError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_short_mesh() {
        let config = DrowsinessConfig {
            landmark_count: 200,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DrowsinessError::InvalidEyeIndices(_))));
    }
}
