use crate::{Anchor, Encoding, Frame, Layer, Overlay, Target};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid config {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

/// Everything the three binaries need to agree on. Every field has a default,
/// so a config file only has to name what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub dataset: PathBuf,
    pub encoding: Encoding,
    /// Where `analyze` writes the report and `graph` reads it back.
    pub report: PathBuf,
    pub graphs: PathBuf,
    pub assets: PathBuf,
    /// Pseudo-character used for stage directions.
    pub excluded_character: String,
    pub important_characters: Vec<String>,
    pub top_characters: usize,
    pub top_chapters: usize,
    pub histogram_bins: usize,
    pub overlays: Vec<Overlay>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("data/avatar.csv"),
            encoding: Encoding::Latin1,
            report: PathBuf::from("analysis/avatar_report.json"),
            graphs: PathBuf::from("graphs"),
            assets: PathBuf::from("assets"),
            excluded_character: "Scene Description".to_string(),
            important_characters: ["Aang", "Katara", "Zuko", "Sokka", "Toph", "Iroh", "Azula"]
                .map(String::from)
                .to_vec(),
            top_characters: 10,
            top_chapters: 20,
            histogram_bins: 40,
            overlays: default_overlays(),
        }
    }
}

impl Config {
    /// Read `path` if given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn overlays_for(&self, target: Target) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter().filter(move |overlay| overlay.target == target)
    }
}

fn portrait(name: &str, url: &str, x: f64, y: f64) -> Overlay {
    Overlay {
        name: name.to_string(),
        url: url.to_string(),
        target: Target::ImportantCharacters,
        frame: Frame::Figure,
        layer: Layer::Above,
        x,
        y,
        size_x: 0.09,
        size_y: 0.09,
        anchor: Anchor::BottomRight,
        opacity: 1.0,
    }
}

fn default_overlays() -> Vec<Overlay> {
    vec![
        Overlay {
            name: "seasons-background.jpg".to_string(),
            url: "https://i.imgur.com/QWoqOZd.jpg".to_string(),
            target: Target::SeriesRatings,
            frame: Frame::Plot,
            layer: Layer::Below,
            x: 0.0,
            y: 1.0,
            size_x: 1.0,
            size_y: 1.0,
            anchor: Anchor::TopLeft,
            opacity: 0.7,
        },
        portrait("azula.png", "https://vignette.wikia.nocookie.net/avatar/images/1/12/Azula.png", 0.25, 0.9),
        portrait("toph.png", "https://vignette.wikia.nocookie.net/avatar/images/4/46/Toph_Beifong.png", 0.42, 0.77),
        portrait("iroh.png", "https://vignette.wikia.nocookie.net/avatar/images/c/c1/Iroh_smiling.png", 0.35, 0.6),
        portrait("zuko.png", "https://vignette.wikia.nocookie.net/avatar/images/4/4b/Zuko.png", 0.62, 0.47),
        portrait("sokka.png", "https://vignette.wikia.nocookie.net/avatar/images/cc/Sokka.png", 0.85, 0.32),
        portrait(
            "katara.jpg",
            "https://static.wikia.nocookie.net/loveinterest/images/c/cb/Avatar_Last_Airbender_Book_1_Screenshot_0047.jpg",
            0.85,
            0.18,
        ),
        portrait(
            "aang.jpg",
            "https://comicvine1.cbsistatic.com/uploads/scale_small/11138/111385676/7212562-5667359844-41703.jpg",
            1.05,
            0.052,
        ),
    ]
}
