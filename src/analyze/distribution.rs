use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Points at which the density curve is evaluated.
const DENSITY_POINTS: usize = 200;

/// Histogram of scores over a fixed range, with a kernel density estimate
/// scaled so it can be drawn on the same axes as the bin counts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub min: f64,
    pub max: f64,
    pub bins: Vec<usize>,
    /// `(score, expected count per bin)` samples of the smoothed density.
    pub density: Vec<(f64, f64)>,
    pub count: usize,
    pub mean: f64,
}

impl Distribution {
    pub fn new(scores: &[f64], bins: usize, range: (f64, f64)) -> Self {
        let (min, max) = range;
        let bins = bins.max(1);
        let width = (max - min) / bins as f64;

        let mut counts = vec![0; bins];
        for score in scores.iter().filter(|score| score.is_finite()) {
            let i = ((score - min) / width).floor().max(0.0) as usize;
            counts[i.min(bins - 1)] += 1;
        }

        let count = counts.iter().sum::<usize>();
        let mean = if count == 0 {
            0.0
        } else {
            scores.iter().filter(|score| score.is_finite()).sum::<f64>() / count as f64
        };

        Self {
            min,
            max,
            bins: counts,
            density: kde(scores, (min, max), width),
            count,
            mean,
        }
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.bins.len().max(1) as f64
    }

    /// `(lower edge, upper edge, count)` of every bin.
    pub fn edges(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        let width = self.bin_width();
        self.bins.iter().enumerate().map(move |(i, &count)| {
            let lower = self.min + i as f64 * width;
            (lower, lower + width, count)
        })
    }

    pub fn peak(&self) -> f64 {
        let bins = self.bins.iter().copied().max().unwrap_or(0) as f64;
        self.density.iter().map(|(_, y)| *y).fold(bins, f64::max)
    }
}

/// Gaussian kernel density with Scott's bandwidth, scaled by `n * bin_width`.
/// Empty when there are fewer than two distinct scores.
fn kde(scores: &[f64], range: (f64, f64), bin_width: f64) -> Vec<(f64, f64)> {
    let scores = scores.iter().copied().filter(|score| score.is_finite()).collect::<Vec<_>>();
    let n = scores.len() as f64;
    if scores.len() < 2 {
        return vec![];
    }
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let bandwidth = variance.sqrt() * n.powf(-0.2);
    if bandwidth <= 0.0 {
        return vec![];
    }

    let norm = 1.0 / (n * bandwidth * (2.0 * PI).sqrt());
    let step = (range.1 - range.0) / (DENSITY_POINTS - 1) as f64;
    (0..DENSITY_POINTS)
        .map(|i| {
            let x = range.0 + i as f64 * step;
            let density = scores
                .iter()
                .map(|xi| (-0.5 * ((x - xi) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                * norm;
            (x, density * n * bin_width)
        })
        .collect()
}
