use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

/// Runtime settings, layered as: defaults, then an optional `placedb.*`
/// file (toml, json or yaml), then `PLACEDB_*` environment variables, then
/// whatever the command line overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root of the raw dumps, laid out as `<map_type>/<map_name>.json`.
    pub content_dir: PathBuf,
    pub store_path: PathBuf,
    pub icon_dir: PathBuf,
    pub bind: String,
}

/// Command line values that take precedence over every other layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub content_dir: Option<PathBuf>,
    pub store_path: Option<PathBuf>,
    pub icon_dir: Option<PathBuf>,
    pub bind: Option<String>,
}

fn path_text(path: Option<PathBuf>) -> Option<String> {
    path.map(|p| p.to_string_lossy().into_owned())
}

impl Settings {
    pub fn load(config_name: &str, overrides: Overrides) -> Result<Self> {
        let settings = Config::builder()
            .set_default("content_dir", "content/map")?
            .set_default("store_path", "map.db")?
            .set_default("icon_dir", "icons")?
            .set_default("bind", "0.0.0.0:3007")?
            .add_source(File::with_name(config_name).required(false))
            .add_source(Environment::with_prefix("PLACEDB"))
            .set_override_option("content_dir", path_text(overrides.content_dir))?
            .set_override_option("store_path", path_text(overrides.store_path))?
            .set_override_option("icon_dir", path_text(overrides.icon_dir))?
            .set_override_option("bind", overrides.bind)?
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
