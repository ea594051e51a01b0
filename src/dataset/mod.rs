mod aggregate;
pub use aggregate::*;

use csv::ReaderBuilder;
use serde::{Deserialize, Deserializer, Serialize};
use std::{fs, io::Read, path::{Path, PathBuf}};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("dataset is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("malformed row {row}: {source}")]
    Row { row: usize, source: csv::Error },
    #[error("no row has an IMDb rating, so there is no mean to impute with")]
    NoRatings,
}

/// Character encoding of the dataset file on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Utf8,
    /// The published transcript export is Latin-1.
    #[default]
    Latin1,
}

impl Encoding {
    pub fn decode(&self, bytes: Vec<u8>) -> Result<String, DatasetError> {
        Ok(match self {
            Self::Utf8 => String::from_utf8(bytes)?,
            // Every Latin-1 byte is the code point of the same value.
            Self::Latin1 => bytes.into_iter().map(char::from).collect(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Book {
    Water,
    Earth,
    Fire,
}

impl Book {
    /// Season order.
    pub const VALUES: [Self; 3] = [Self::Water, Self::Earth, Self::Fire];

    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            Self::Water => (0x33, 0x99, 0xff),
            Self::Earth => (0x66, 0x33, 0x07),
            Self::Fire => (0xcd, 0x00, 0x00),
        }
    }
}

impl ToString for Book {
    fn to_string(&self) -> String {
        format!("{:?}", self)
    }
}

/// One row of the transcript: a line of dialogue or a scene description.
#[derive(Clone, Debug, Deserialize)]
pub struct Line {
    #[serde(default)]
    pub id: u64,
    pub book: Book,
    #[serde(default)]
    pub book_num: u32,
    /// The episode title.
    pub chapter: String,
    #[serde(default)]
    pub chapter_num: u32,
    /// Who speaks the line, or the scene-description marker.
    pub character: String,
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub character_words: String,
    #[serde(default)]
    pub writer: String,
    #[serde(default)]
    pub director: String,
    /// Episode rating, repeated on every line of the episode. Unparseable or non-finite values count as missing.
    #[serde(default, deserialize_with = "finite_rating")]
    pub imdb_rating: Option<f64>,
    /// Compound polarity of `character_words`, once scored.
    #[serde(skip)]
    pub sentiment: Option<f64>,
}

fn finite_rating<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    let rating: Option<f64> = csv::invalid_option(de)?;
    Ok(rating.filter(|rating| rating.is_finite()))
}

fn has_rating(line: &Line) -> bool {
    line.imdb_rating.is_some_and(f64::is_finite)
}

#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub lines: Vec<Line>,
}

impl Dataset {
    pub fn load(path: &Path, encoding: Encoding) -> Result<Self, DatasetError> {
        let bytes = fs::read(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let text = encoding.decode(bytes)?;
        let dataset = Self::from_reader(text.as_bytes())?;
        info!(path = %path.display(), rows = dataset.len(), "loaded dataset");
        Ok(dataset)
    }

    /// Parse CSV with a header row. Columns are matched by name and unknown columns are ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
        let mut lines = vec![];
        for (i, result) in reader.deserialize::<Line>().enumerate() {
            // Row numbers count the header as row 1.
            lines.push(result.map_err(|source| DatasetError::Row { row: i + 2, source })?);
        }
        Ok(Self { lines })
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Mean of the ratings that are present.
    pub fn rating_mean(&self) -> Option<f64> {
        let ratings = self
            .lines
            .iter()
            .filter(|line| has_rating(line))
            .filter_map(|line| line.imdb_rating)
            .collect::<Vec<_>>();
        (!ratings.is_empty()).then(|| ratings.iter().sum::<f64>() / ratings.len() as f64)
    }

    /// Replace every missing rating with the mean of the present ones.
    /// Returns how many rows were filled.
    pub fn fill_missing_ratings(&mut self) -> Result<usize, DatasetError> {
        let missing = self.lines.iter().filter(|line| !has_rating(line)).count();
        if missing == 0 {
            return Ok(0);
        }
        let mean = self.rating_mean().ok_or(DatasetError::NoRatings)?;
        for line in self.lines.iter_mut().filter(|line| !has_rating(line)) {
            line.imdb_rating = Some(mean);
        }
        debug!(missing, mean, "imputed missing ratings");
        Ok(missing)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const FIXTURE: &str = "\
,id,book,book_num,chapter,chapter_num,character,full_text,character_words,writer,director,imdb_rating
0,1,Water,1,The Boy in the Iceberg,1,Katara,Water. Earth.,Water. Earth.,Michael Dante DiMartino,Dave Filoni,8.1
1,2,Water,1,The Boy in the Iceberg,1,Scene Description,Sokka is fishing.,,Michael Dante DiMartino,Dave Filoni,8.1
2,3,Water,1,The Boy in the Iceberg,1,Sokka,It's not getting away from me this time.,It's not getting away from me this time.,Michael Dante DiMartino,Dave Filoni,8.1
3,4,Water,1,The Boy in the Iceberg,1,Katara,I love this place!,I love this place!,Michael Dante DiMartino,Dave Filoni,8.1
4,5,Water,1,The Avatar Returns,2,Aang,Hi!,Hi!,Michael Dante DiMartino,Dave Filoni,
5,6,Earth,2,The Avatar State,1,Zuko,This is terrible.,This is terrible.,Aaron Ehasz,Giancarlo Volpe,8.4
6,7,Earth,2,The Avatar State,1,Iroh,Tea is nice.,Tea is nice.,Aaron Ehasz,Giancarlo Volpe,8.4
7,8,Fire,3,The Awakening,1,Zuko,I'm home.,I'm home.,Aaron Ehasz,Giancarlo Volpe,8.9
8,9,Fire,3,The Awakening,1,Zuko,Honor.,Honor.,Aaron Ehasz,Giancarlo Volpe,8.9
";

    pub fn fixture() -> Dataset {
        Dataset::from_reader(FIXTURE.as_bytes()).unwrap()
    }

    #[test]
    fn test_from_reader_matches_columns_by_name() {
        let dataset = fixture();
        assert_eq!(dataset.len(), 9);
        let first = &dataset.lines[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.book, Book::Water);
        assert_eq!(first.chapter, "The Boy in the Iceberg");
        assert_eq!(first.character, "Katara");
        assert_eq!(first.director, "Dave Filoni");
        assert_eq!(first.imdb_rating, Some(8.1));
        assert_eq!(first.sentiment, None);
        assert_eq!(dataset.lines[1].character_words, "");
        assert_eq!(dataset.lines[4].imdb_rating, None);
    }

    #[test]
    fn test_garbage_rating_is_missing() {
        let csv = "book,chapter,character,imdb_rating\nFire,Sozin's Comet,Aang,n/a\n";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(dataset.lines[0].imdb_rating, None);
    }

    #[test]
    fn test_unknown_book_is_an_error() {
        let csv = "book,chapter,character\nAir,Unaired,Gyatso\n";
        match Dataset::from_reader(csv.as_bytes()) {
            Err(DatasetError::Row { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected row error, got {other:?}"),
        }
    }

    #[test]
    fn test_latin1_decoding() {
        let bytes = b"book,chapter,character\nWater,Caf\xe9,Pakku\n".to_vec();
        let text = Encoding::Latin1.decode(bytes.clone()).unwrap();
        let dataset = Dataset::from_reader(text.as_bytes()).unwrap();
        assert_eq!(dataset.lines[0].chapter, "Café");
        assert!(matches!(Encoding::Utf8.decode(bytes), Err(DatasetError::Encoding(_))));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("avatar.csv");
        fs::write(&path, FIXTURE).unwrap();
        let dataset = Dataset::load(&path, Encoding::Utf8).unwrap();
        assert_eq!(dataset.len(), 9);

        let missing = dir.path().join("missing.csv");
        assert!(matches!(Dataset::load(&missing, Encoding::Utf8), Err(DatasetError::Read { .. })));
    }

    #[test]
    fn test_fill_missing_ratings() {
        let mut dataset = fixture();
        let before = dataset.lines.iter().map(|line| line.imdb_rating).collect::<Vec<_>>();
        let present = before.iter().flatten().copied().collect::<Vec<_>>();
        let mean = present.iter().sum::<f64>() / present.len() as f64;

        assert_eq!(dataset.fill_missing_ratings().unwrap(), 1);
        for (line, original) in dataset.lines.iter().zip(before) {
            match original {
                Some(rating) => assert_eq!(line.imdb_rating, Some(rating)),
                None => assert!((line.imdb_rating.unwrap() - mean).abs() < 1e-12),
            }
        }
        assert!(dataset.lines.iter().all(|line| line.imdb_rating.is_some()));
        assert_eq!(dataset.fill_missing_ratings().unwrap(), 0);
    }

    #[test]
    fn test_nan_rating_is_filled() {
        let csv = "book,chapter,character,imdb_rating\n\
            Water,The Storm,Aang,8.0\n\
            Water,The Storm,Katara,NaN\n\
            Water,The Storm,Sokka,\n\
            Water,The Storm,Appa,inf\n";
        let mut dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(dataset.lines[1].imdb_rating, None);
        assert_eq!(dataset.lines[3].imdb_rating, None);
        assert_eq!(dataset.rating_mean(), Some(8.0));

        assert_eq!(dataset.fill_missing_ratings().unwrap(), 3);
        assert!(dataset.lines.iter().all(|line| line.imdb_rating == Some(8.0)));

        // Rows built in code can still carry NaN.
        dataset.lines[2].imdb_rating = Some(f64::NAN);
        assert_eq!(dataset.rating_mean(), Some(8.0));
        assert_eq!(dataset.fill_missing_ratings().unwrap(), 1);
        assert_eq!(dataset.lines[2].imdb_rating, Some(8.0));
    }

    #[test]
    fn test_fill_without_any_rating() {
        let csv = "book,chapter,character,imdb_rating\nWater,The Storm,Aang,\n";
        let mut dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(dataset.rating_mean(), None);
        assert!(matches!(dataset.fill_missing_ratings(), Err(DatasetError::NoRatings)));
    }
}
