mod distribution;
pub use distribution::*;

use crate::Dataset;
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("sentiment model failed: {0}")]
    SentimentError(String),
    #[error("sentiment model returned no score for {0:?}")]
    MissingScore(String),
}

/// Compound polarity of a piece of text, from -1 (most negative) to 1 (most positive).
pub trait Sentiment {
    fn sentiment(&self) -> Result<f64, AnalysisError>;
}

#[cfg(not(feature = "bert"))]
impl Sentiment for &str {
    fn sentiment(&self) -> Result<f64, AnalysisError> {
        if self.trim().is_empty() {
            return Ok(0.0);
        }
        let analyzer = vader_sentiment::SentimentIntensityAnalyzer::new();
        let scores = analyzer.polarity_scores(self);
        scores
            .get("compound")
            .copied()
            .ok_or_else(|| AnalysisError::MissingScore(self.to_string()))
    }
}

#[cfg(feature = "bert")]
mod bert {
    use super::AnalysisError;
    use lazy_static::lazy_static;
    use rust_bert::pipelines::sentiment::{SentimentModel, SentimentPolarity};
    use std::sync::Mutex;

    lazy_static! {
        static ref SENTIMENT_MODEL: Mutex<SentimentModel> =
            Mutex::new(SentimentModel::new(Default::default()).expect("failed to load sentiment model"));
    }

    /// Signed confidence of the transformer's polarity label.
    pub fn score(text: &str) -> Result<f64, AnalysisError> {
        let model = SENTIMENT_MODEL
            .lock()
            .map_err(|err| AnalysisError::SentimentError(err.to_string()))?;
        let output = model.predict([text]);
        let sentiment = output
            .first()
            .ok_or_else(|| AnalysisError::MissingScore(text.to_string()))?;
        Ok(match sentiment.polarity {
            SentimentPolarity::Positive => sentiment.score,
            SentimentPolarity::Negative => -sentiment.score,
        })
    }
}

#[cfg(feature = "bert")]
impl Sentiment for &str {
    fn sentiment(&self) -> Result<f64, AnalysisError> {
        if self.trim().is_empty() {
            return Ok(0.0);
        }
        bert::score(self)
    }
}

impl Dataset {
    /// Score every line's spoken words, ticking `bar` once per line.
    pub fn score_sentiment(&mut self, bar: &ProgressBar) -> Result<(), AnalysisError> {
        bar.set_length(self.len() as u64);
        let scores = self
            .lines
            .par_iter()
            .progress_with(bar.clone())
            .map(|line| line.character_words.as_str().sentiment())
            .collect::<Result<Vec<_>, _>>()?;
        for (line, score) in self.lines.iter_mut().zip(scores) {
            line.sentiment = Some(score);
        }
        info!(lines = self.len(), "scored dialogue sentiment");
        Ok(())
    }

    pub fn sentiments(&self) -> Vec<f64> {
        self.lines.iter().filter_map(|line| line.sentiment).collect()
    }
}

#[cfg(all(test, not(feature = "bert")))]
mod tests {
    use super::*;
    use crate::dataset::tests::fixture;

    #[test]
    fn test_sentiment_is_deterministic() {
        let text = "I love this place, but the Fire Nation attacked and it was terrible.";
        let first = text.sentiment().unwrap();
        for _ in 0..5 {
            assert_eq!(text.sentiment().unwrap(), first);
        }
    }

    #[test]
    fn test_sentiment_polarity() {
        assert!("I love this place!".sentiment().unwrap() > 0.0);
        assert!("This is terrible.".sentiment().unwrap() < 0.0);
        for score in ["Honor.", "Tea is nice.", "I hate you"].map(|text| text.sentiment().unwrap()) {
            assert!((-1.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_empty_text_is_neutral() {
        assert_eq!("".sentiment().unwrap(), 0.0);
        assert_eq!("   ".sentiment().unwrap(), 0.0);
    }

    #[test]
    fn test_score_dataset() {
        let mut dataset = fixture();
        dataset.score_sentiment(&ProgressBar::hidden()).unwrap();
        assert!(dataset.lines.iter().all(|line| line.sentiment.is_some()));
        assert_eq!(dataset.sentiments().len(), dataset.len());
        // Scene descriptions carry no spoken words.
        assert_eq!(dataset.lines[1].sentiment, Some(0.0));

        let again = {
            let mut dataset = fixture();
            dataset.score_sentiment(&ProgressBar::hidden()).unwrap();
            dataset.sentiments()
        };
        assert_eq!(dataset.sentiments(), again);
    }
}
