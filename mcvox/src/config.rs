use std::{
    error::Error,
    path::{Path, PathBuf},
};

use serde::Deserialize;

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Emission {
    /// One grid file per chunk, `<world>.<chunkX>.<chunkZ>.mvx`.
    #[default]
    Chunks,
    /// One grid file per region, `<world>.<regionX>.<regionZ>.mvx`.
    Regions,
}

fn config_default_minimum_section_y() -> i8 {
    0
}

fn config_default_workers() -> usize {
    1
}

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Directory of world saves; each subdirectory is one world.
    pub saves: PathBuf,
    /// Where grid files go, under a `chunks/` or `regions/` subdirectory.
    pub output: PathBuf,
    /// The global palette: one block name per line, id = line number.
    #[serde(rename = "block-list")]
    pub block_list: PathBuf,
    #[serde(default)]
    pub emission: Emission,
    /// Sections below this y index are not decoded.
    #[serde(
        default = "config_default_minimum_section_y",
        rename = "minimum-section-y"
    )]
    pub minimum_section_y: i8,
    /// Worker threads for region conversion. Regions are independent, so
    /// each worker gets its own reader and grids; only the palette is shared.
    #[serde(default = "config_default_workers")]
    pub workers: usize,
}

impl Config {
    /// First file that is found is loaded as config.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Config, Box<dyn Error + Send + Sync>> {
        for path in paths {
            match std::fs::read_to_string(path) {
                Ok(str) => return Ok(toml::from_str(&str)?),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(Box::new(err)),
            }
        }
        Err("Could not find config file.".into())
    }
}
