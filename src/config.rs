//! Build-time configuration, loadable from a TOML file or filled in with
//! defaults, mirroring the settings-persistence pattern in
//! `ssoj13-alembic-rs`'s `alembic-viewer` (`serde` + a plain `Default` impl).

use serde::{Deserialize, Serialize};

use crate::error::{BspError, BspResult};
use crate::kdtree::SubdivisionMode;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub subdivision_mode: SubdivisionMode,
    pub max_depth: u32,
    pub max_list_length: u32,
    /// Ratio of empty-space volume to total volume below which an
    /// empty-space split is still considered worthwhile.
    pub empty_subdivide_ratio: f32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            subdivision_mode: SubdivisionMode::Normal,
            max_depth: 30,
            max_list_length: 4,
            empty_subdivide_ratio: 0.25,
        }
    }
}

impl BuildConfig {
    /// Loads a config from a TOML file, falling back to [`Default`] fields
    /// for anything the file omits.
    pub fn load(path: &std::path::Path) -> BspResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| BspError::IoOpenFailed {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| BspError::Config(e.to_string()))
    }

    pub fn to_kd_config(self) -> crate::kdtree::KdBuilderConfig {
        crate::kdtree::KdBuilderConfig {
            mode: self.subdivision_mode,
            max_depth: self.max_depth,
            max_list_length: self.max_list_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_original_constants() {
        let c = BuildConfig::default();
        assert_eq!(c.max_depth, 30);
        assert_eq!(c.max_list_length, 4);
    }

    #[test]
    fn loads_partial_toml_with_defaults_filled_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.toml");
        std::fs::write(&path, "max_depth = 12\n").unwrap();
        let c = BuildConfig::load(&path).unwrap();
        assert_eq!(c.max_depth, 12);
        assert_eq!(c.max_list_length, 4);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = BuildConfig::load(std::path::Path::new("/nonexistent/build.toml"));
        assert!(matches!(err, Err(BspError::IoOpenFailed { .. })));
    }
}
