use crate::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fs::{create_dir_all, read_to_string, write}, path::{Path, PathBuf}};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("could not access {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("could not (de)serialize {path}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
}

/// Something that can be written to disk as JSON and read back.
pub trait Data: Sized {
    fn save(&self, file: &Path) -> Result<(), DataError>;
    fn restore(file: &Path) -> Result<Self, DataError>;
}

impl<T> Data for T
where
    T: Serialize + DeserializeOwned,
{
    fn save(&self, file: &Path) -> Result<(), DataError> {
        let io = |source: std::io::Error| DataError::Io { path: file.to_path_buf(), source };
        if let Some(parent) = file.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            create_dir_all(parent).map_err(io)?;
        }
        let output_json = serde_json::to_string_pretty(self).map_err(|source| DataError::Json {
            path: file.to_path_buf(),
            source,
        })?;
        write(file, output_json).map_err(io)
    }

    fn restore(file: &Path) -> Result<Self, DataError> {
        let input_json = read_to_string(file).map_err(|source| DataError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&input_json).map_err(|source| DataError::Json {
            path: file.to_path_buf(),
            source,
        })
    }
}

/// Every table the charts are drawn from, computed once by `analyze`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub rows: usize,
    /// Rows whose missing rating was replaced by the mean.
    pub filled_ratings: usize,
    pub mean_rating: f64,
    pub episodes: Vec<Episode>,
    pub series_ratings: Vec<SeriesRating>,
    pub director_counts: Vec<DirectorCount>,
    pub director_ratings: Vec<DirectorRating>,
    pub character_dialogues: Vec<CharacterDialogues>,
    pub chapter_dialogues: Vec<ChapterDialogues>,
    pub sentiment: Distribution,
}

impl Report {
    /// Derive every table from an imputed and sentiment-scored dataset.
    pub fn build(dataset: &Dataset, filled_ratings: usize, config: &Config) -> Self {
        let episodes = dataset.episodes();
        Self {
            rows: dataset.len(),
            filled_ratings,
            mean_rating: dataset.rating_mean().unwrap_or_default(),
            series_ratings: series_ratings(&episodes),
            director_counts: director_counts(&episodes),
            director_ratings: director_ratings(&episodes),
            character_dialogues: dataset.character_dialogues(&config.excluded_character),
            chapter_dialogues: dataset.chapter_dialogues(&config.excluded_character),
            sentiment: Distribution::new(&dataset.sentiments(), config.histogram_bins, (-1.0, 1.0)),
            episodes,
        }
    }

    /// The summary tables, as printed after analysis.
    pub fn summary(&self, config: &Config) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{} rows, {} episodes, {} missing ratings filled with {:.3}\n\n",
            self.rows,
            self.episodes.len(),
            self.filled_ratings,
            self.mean_rating
        ));

        out.push_str("Average IMDb ratings for each season:\n");
        for series in &self.series_ratings {
            out.push_str(&format!("  {:<8}{:.3}\n", series.book.to_string(), series.rating));
        }

        out.push_str("\nEpisodes per director:\n");
        for count in &self.director_counts {
            out.push_str(&format!("  {:<24}{}\n", count.director, count.episodes));
        }

        out.push_str("\nAverage rating per director:\n");
        for rating in &self.director_ratings {
            out.push_str(&format!("  {:<24}{:.3}\n", rating.director, rating.rating));
        }

        for book in Book::VALUES {
            out.push_str(&format!("\nMost dialogues in book {}:\n", book.to_string()));
            for row in top_characters(&self.character_dialogues, book, config.top_characters) {
                out.push_str(&format!("  {:<24}{}\n", row.character, row.dialogues));
            }
        }

        out.push_str(&format!(
            "\nSentiment: {} lines, mean compound score {:.3}\n",
            self.sentiment.count, self.sentiment.mean
        ));
        out
    }
}
