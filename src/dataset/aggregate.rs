use super::{Book, Dataset};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::HashMap, hash::Hash};

/// Count occurrences of each key, most frequent first.
/// Keys with equal counts keep the order in which they first appeared.
pub fn value_counts<K, I>(items: I) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut order = vec![];
    let mut counts = HashMap::new();
    for item in items {
        let count = counts.entry(item.clone()).or_insert_with(|| {
            order.push(item);
            0
        });
        *count += 1;
    }
    let mut result = order
        .into_iter()
        .map(|key| {
            let count = counts[&key];
            (key, count)
        })
        .collect::<Vec<_>>();
    // Stable, so ties stay in first-appearance order.
    result.sort_by(|(_, a), (_, b)| b.cmp(a));
    result
}

/// Arithmetic mean of the values of each key, in first-appearance order.
pub fn group_mean<K, I>(items: I) -> Vec<(K, f64)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = (K, f64)>,
{
    let mut groups: Vec<(K, f64, usize)> = vec![];
    let mut index = HashMap::new();
    for (key, value) in items {
        let i = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, 0.0, 0));
            groups.len() - 1
        });
        groups[i].1 += value;
        groups[i].2 += 1;
    }
    groups.into_iter().map(|(key, sum, count)| (key, sum / count as f64)).collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Running episode number across the whole series, starting at zero.
    pub index: usize,
    pub book: Book,
    pub chapter_num: u32,
    pub chapter: String,
    pub director: String,
    pub imdb_rating: Option<f64>,
}

impl Episode {
    /// Hover label such as "Water 1: The Boy in the Iceberg".
    pub fn label(&self) -> String {
        format!("{} {}: {}", self.book.to_string(), self.chapter_num, self.chapter)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesRating {
    pub book: Book,
    pub rating: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectorCount {
    pub director: String,
    pub episodes: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectorRating {
    pub director: String,
    pub rating: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterDialogues {
    pub character: String,
    pub dialogues: usize,
    pub book: Book,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChapterDialogues {
    pub chapter: String,
    pub dialogues: usize,
    pub book: Book,
    pub imdb_rating: Option<f64>,
}

impl Dataset {
    /// One entry per distinct (book, chapter), in transcript order.
    /// Director and rating come from the first line of the episode that has one.
    pub fn episodes(&self) -> Vec<Episode> {
        let mut episodes: Vec<Episode> = vec![];
        let mut index = HashMap::new();
        for line in &self.lines {
            let i = *index.entry((line.book, line.chapter.as_str())).or_insert_with(|| {
                episodes.push(Episode {
                    index: episodes.len(),
                    book: line.book,
                    chapter_num: line.chapter_num,
                    chapter: line.chapter.clone(),
                    director: String::new(),
                    imdb_rating: None,
                });
                episodes.len() - 1
            });
            let episode = &mut episodes[i];
            if episode.director.is_empty() {
                episode.director = line.director.clone();
            }
            if episode.imdb_rating.is_none() {
                episode.imdb_rating = line.imdb_rating;
            }
        }
        episodes
    }

    /// Lines spoken per character in each book, most talkative first within a book.
    /// Rows attributed to `excluded` (the scene-description marker) are skipped.
    pub fn character_dialogues(&self, excluded: &str) -> Vec<CharacterDialogues> {
        Book::VALUES
            .iter()
            .flat_map(|&book| {
                value_counts(
                    self.lines
                        .iter()
                        .filter(|line| line.book == book && line.character != excluded)
                        .map(|line| line.character.as_str()),
                )
                .into_iter()
                .map(move |(character, dialogues)| CharacterDialogues {
                    character: character.to_string(),
                    dialogues,
                    book,
                })
            })
            .collect()
    }

    /// Dialogue lines per chapter in each book, joined with the chapter's rating.
    pub fn chapter_dialogues(&self, excluded: &str) -> Vec<ChapterDialogues> {
        let ratings = self
            .episodes()
            .into_iter()
            .map(|episode| ((episode.book, episode.chapter), episode.imdb_rating))
            .collect::<HashMap<_, _>>();

        Book::VALUES
            .iter()
            .flat_map(|&book| {
                value_counts(
                    self.lines
                        .iter()
                        .filter(|line| line.book == book && line.character != excluded)
                        .map(|line| line.chapter.as_str()),
                )
                .into_iter()
                .map(move |(chapter, dialogues)| (book, chapter, dialogues))
            })
            .map(|(book, chapter, dialogues)| ChapterDialogues {
                chapter: chapter.to_string(),
                dialogues,
                book,
                imdb_rating: ratings.get(&(book, chapter.to_string())).copied().flatten(),
            })
            .collect()
    }
}

/// Mean episode rating of each book, in season order. Books without rated episodes are left out.
pub fn series_ratings(episodes: &[Episode]) -> Vec<SeriesRating> {
    let means = group_mean(
        episodes
            .iter()
            .filter_map(|episode| episode.imdb_rating.map(|rating| (episode.book, rating))),
    )
    .into_iter()
    .collect::<HashMap<_, _>>();

    Book::VALUES
        .iter()
        .filter_map(|book| means.get(book).map(|&rating| SeriesRating { book: *book, rating }))
        .collect()
}

/// Episodes directed by each director, most prolific first.
pub fn director_counts(episodes: &[Episode]) -> Vec<DirectorCount> {
    value_counts(
        episodes
            .iter()
            .filter(|episode| !episode.director.is_empty())
            .map(|episode| episode.director.as_str()),
    )
    .into_iter()
    .map(|(director, episodes)| DirectorCount {
        director: director.to_string(),
        episodes,
    })
    .collect()
}

/// Mean episode rating of each director, lowest first.
pub fn director_ratings(episodes: &[Episode]) -> Vec<DirectorRating> {
    let mut ratings = group_mean(episodes.iter().filter(|episode| !episode.director.is_empty()).filter_map(
        |episode| episode.imdb_rating.map(|rating| (episode.director.as_str(), rating)),
    ))
    .into_iter()
    .map(|(director, rating)| DirectorRating {
        director: director.to_string(),
        rating,
    })
    .collect::<Vec<_>>();
    ratings.sort_by(|a, b| a.rating.partial_cmp(&b.rating).unwrap_or(Ordering::Equal));
    ratings
}

pub fn top_characters(table: &[CharacterDialogues], book: Book, n: usize) -> Vec<CharacterDialogues> {
    let mut rows = table.iter().filter(|row| row.book == book).cloned().collect::<Vec<_>>();
    rows.sort_by(|a, b| b.dialogues.cmp(&a.dialogues));
    rows.truncate(n);
    rows
}

/// Rows for the named characters, in the order the names are given and then by book.
pub fn important_characters<S: AsRef<str>>(table: &[CharacterDialogues], names: &[S]) -> Vec<CharacterDialogues> {
    names
        .iter()
        .flat_map(|name| {
            Book::VALUES.into_iter().filter_map(move |book| {
                table
                    .iter()
                    .find(|row| row.book == book && row.character == name.as_ref())
                    .cloned()
            })
        })
        .collect()
}

/// The `n` chapters with the most dialogue, most first.
pub fn most_dialogues(table: &[ChapterDialogues], n: usize) -> Vec<ChapterDialogues> {
    let mut rows = table.to_vec();
    rows.sort_by(|a, b| b.dialogues.cmp(&a.dialogues));
    rows.truncate(n);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::fixture;

    const SCENE: &str = "Scene Description";

    #[test]
    fn test_value_counts_orders_by_count_then_first_seen() {
        let counts = value_counts(["b", "a", "c", "a", "b", "a"]);
        assert_eq!(counts, vec![("a", 3), ("b", 2), ("c", 1)]);

        let ties = value_counts(["z", "y", "x"]);
        assert_eq!(ties, vec![("z", 1), ("y", 1), ("x", 1)]);

        assert!(value_counts(Vec::<&str>::new()).is_empty());
    }

    #[test]
    fn test_value_counts_sum_to_row_count() {
        let dataset = fixture();
        for book in Book::VALUES {
            let rows = dataset.lines.iter().filter(|line| line.book == book).count();
            let counts = value_counts(
                dataset
                    .lines
                    .iter()
                    .filter(|line| line.book == book)
                    .map(|line| line.character.clone()),
            );
            assert_eq!(counts.iter().map(|(_, count)| count).sum::<usize>(), rows);
        }
    }

    #[test]
    fn test_group_mean() {
        let means = group_mean([("x", 1.0), ("y", 10.0), ("x", 2.0), ("x", 6.0)]);
        assert_eq!(means, vec![("x", 3.0), ("y", 10.0)]);
    }

    #[test]
    fn test_episodes() {
        let mut dataset = fixture();
        let episodes = dataset.episodes();
        assert_eq!(episodes.len(), 4);
        assert_eq!(episodes.iter().map(|e| e.index).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(episodes[0].label(), "Water 1: The Boy in the Iceberg");
        assert_eq!(episodes[1].imdb_rating, None);
        assert_eq!(episodes[2].director, "Giancarlo Volpe");

        dataset.fill_missing_ratings().unwrap();
        assert!(dataset.episodes().iter().all(|e| e.imdb_rating.is_some()));
    }

    #[test]
    fn test_series_ratings_in_season_order() {
        let episodes = fixture().episodes();
        let series = series_ratings(&episodes);
        assert_eq!(
            series,
            vec![
                SeriesRating { book: Book::Water, rating: 8.1 },
                SeriesRating { book: Book::Earth, rating: 8.4 },
                SeriesRating { book: Book::Fire, rating: 8.9 },
            ]
        );
    }

    #[test]
    fn test_directors() {
        let mut dataset = fixture();
        dataset.fill_missing_ratings().unwrap();
        let episodes = dataset.episodes();

        let counts = director_counts(&episodes);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.iter().map(|c| c.episodes).sum::<usize>(), episodes.len());

        let ratings = director_ratings(&episodes);
        assert_eq!(ratings[0].director, "Dave Filoni");
        assert_eq!(ratings[1].director, "Giancarlo Volpe");
        assert!((ratings[1].rating - (8.4 + 8.9) / 2.0).abs() < 1e-12);
        assert!(ratings[0].rating <= ratings[1].rating);
    }

    #[test]
    fn test_character_dialogues_skip_scene_descriptions() {
        let dataset = fixture();
        let table = dataset.character_dialogues(SCENE);
        assert!(table.iter().all(|row| row.character != SCENE));

        let water = top_characters(&table, Book::Water, 10);
        assert_eq!(water[0].character, "Katara");
        assert_eq!(water[0].dialogues, 2);
        let spoken = dataset
            .lines
            .iter()
            .filter(|line| line.book == Book::Water && line.character != SCENE)
            .count();
        assert_eq!(water.iter().map(|row| row.dialogues).sum::<usize>(), spoken);

        assert_eq!(top_characters(&table, Book::Water, 1).len(), 1);
    }

    #[test]
    fn test_important_characters() {
        let table = fixture().character_dialogues(SCENE);
        let rows = important_characters(&table, &["Zuko", "Toph", "Aang"]);
        let found = rows.iter().map(|row| (row.character.as_str(), row.book)).collect::<Vec<_>>();
        assert_eq!(found, vec![("Zuko", Book::Earth), ("Zuko", Book::Fire), ("Aang", Book::Water)]);
    }

    #[test]
    fn test_chapter_dialogues() {
        let dataset = fixture();
        let table = dataset.chapter_dialogues(SCENE);
        assert_eq!(table.len(), 4);
        assert_eq!(table.iter().map(|row| row.dialogues).sum::<usize>(), 8);

        let top = most_dialogues(&table, 2);
        assert_eq!(top[0].chapter, "The Boy in the Iceberg");
        assert_eq!(top[0].dialogues, 3);
        assert_eq!(top[0].imdb_rating, Some(8.1));
        assert_eq!(top.len(), 2);

        let unrated = table.iter().find(|row| row.chapter == "The Avatar Returns").unwrap();
        assert_eq!(unrated.imdb_rating, None);
    }
}
