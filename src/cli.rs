//! Command-line argument definitions for `accelbuild`, the CLI front end
//! over this crate's builders. Rewritten against `clap`'s derive API (the
//! teacher's original `cli.rs` targeted `clap` 2's builder API plus a
//! hand-rolled `regex`/`lazy_static` validator pair, both superseded here by
//! derive-level `value_parser`/`value_enum`).

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::BuildConfig;
use crate::error::BspResult;
use crate::kdtree::SubdivisionMode;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StructureKind {
    Kdtree,
    Bvh,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CliSubdivisionMode {
    Simple,
    Normal,
    Balanced,
}

impl From<CliSubdivisionMode> for SubdivisionMode {
    fn from(m: CliSubdivisionMode) -> Self {
        match m {
            CliSubdivisionMode::Simple => SubdivisionMode::Simple,
            CliSubdivisionMode::Normal => SubdivisionMode::Normal,
            CliSubdivisionMode::Balanced => SubdivisionMode::Balanced,
        }
    }
}

/// Builds a spatial acceleration structure from an OBJ mesh.
#[derive(Parser, Debug)]
#[command(name = "accelbuild", version, about)]
pub struct Cli {
    /// OBJ file to build an acceleration structure over.
    pub input: PathBuf,

    /// Base path for the output file triad (`<output>`, `<output>.node`, `<output>.idx`).
    #[arg(short, long, default_value = "scene.bsp")]
    pub output: PathBuf,

    /// Optional TOML file overriding the build defaults.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Tree kind to build.
    #[arg(long, value_enum, default_value_t = StructureKind::Kdtree)]
    pub structure: StructureKind,

    /// k-d tree subdivision policy; ignored for `--structure bvh`.
    #[arg(long, value_enum)]
    pub subdivision_mode: Option<CliSubdivisionMode>,

    /// Maximum recursion depth.
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Maximum primitive count per leaf before the builder stops splitting.
    #[arg(long)]
    pub max_list_length: Option<u32>,
}

impl Cli {
    /// Loads `--config` (if given) and layers the other flags' explicit
    /// overrides on top, falling back to [`BuildConfig::default`] for
    /// anything neither source touched.
    pub fn resolve_config(&self) -> BspResult<BuildConfig> {
        let mut config = match &self.config {
            Some(path) => BuildConfig::load(path)?,
            None => BuildConfig::default(),
        };
        if let Some(mode) = self.subdivision_mode {
            config.subdivision_mode = mode.into();
        }
        if let Some(depth) = self.max_depth {
            config.max_depth = depth;
        }
        if let Some(len) = self.max_list_length {
            config.max_list_length = len;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn flag_overrides_layer_on_top_of_defaults() {
        let cli = Cli::parse_from(["accelbuild", "mesh.obj", "--max-depth", "12"]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.max_depth, 12);
        assert_eq!(config.max_list_length, BuildConfig::default().max_list_length);
    }

    #[test]
    fn default_structure_is_kdtree() {
        let cli = Cli::parse_from(["accelbuild", "mesh.obj"]);
        assert!(matches!(cli.structure, StructureKind::Kdtree));
    }
}
