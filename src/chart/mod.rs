mod overlay;
pub use overlay::*;

use crate::{important_characters, most_dialogues, top_characters, Book, Config, Report};
use plotters::{
    coord::Shift,
    drawing::DrawingAreaErrorKind,
    prelude::*,
    style::{
        colors::full_palette::PURPLE,
        text_anchor::{HPos, Pos, VPos},
    },
};
use std::{fs, path::PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("drawing failed: {0}")]
    Drawing(String),
    #[error("could not create {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}

impl<E> From<DrawingAreaErrorKind<E>> for ChartError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        Self::Drawing(err.to_string())
    }
}

const RATING_COLOR: RGBColor = RGBColor(0xf1, 0x89, 0x30);
const DIRECTOR_COLOR: RGBColor = RGBColor(0xad, 0xbc, 0xe6);
const DIRECTOR_HIGHLIGHT: RGBColor = RGBColor(0xba, 0x72, 0xd4);
/// Position of the highlighted bar in the director ratings, counted from the lowest rated.
const HIGHLIGHTED_DIRECTOR: usize = 5;

type Plot = fn(&Report, &Config) -> Result<PathBuf, ChartError>;

/// Render every chart into `config.graphs`, returning the files written.
pub fn render_all(report: &Report, config: &Config) -> Result<Vec<PathBuf>, ChartError> {
    fs::create_dir_all(&config.graphs).map_err(|source| ChartError::Io {
        path: config.graphs.clone(),
        source,
    })?;

    let plots: [(&str, Plot); 8] = [
        ("series ratings", plot_series_ratings),
        ("episode ratings", plot_episode_ratings),
        ("directors", plot_directors),
        ("top characters", plot_top_characters),
        ("sentiment", plot_sentiment),
        ("important characters", plot_important_characters),
        ("most dialogues", plot_most_dialogues),
        ("dialogues vs rating", plot_dialogues_vs_rating),
    ];

    let mut written = vec![];
    for (name, plot) in plots {
        let path = plot(report, config)?;
        info!(chart = name, path = %path.display(), "rendered chart");
        written.push(path);
    }
    Ok(written)
}

fn book_color(book: Book) -> RGBColor {
    let (r, g, b) = book.rgb();
    RGBColor(r, g, b)
}

fn rgb(r: f64, g: f64, b: f64) -> RGBColor {
    RGBColor((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

/// `h` is a fraction of the colour wheel.
fn hsv_to_rgb(h: f64, s: f64, v: f64) -> RGBColor {
    let h = h.rem_euclid(1.0);
    if s <= 0.01 {
        return rgb(v, v, v);
    }
    let i = (h * 6.0) as i32;
    let f = (h * 6.0) - i as f64;
    let p = v * (1. - s);
    let q = v * (1. - s * f);
    let t = v * (1. - s * (1. - f));
    match i % 6 {
        0 => rgb(v, t, p),
        1 => rgb(q, v, p),
        2 => rgb(p, v, t),
        3 => rgb(p, q, v),
        4 => rgb(t, p, v),
        _ => rgb(v, p, q),
    }
}

/// Upper bound for a segmented axis holding `n` bars.
fn last_index(n: usize) -> i32 {
    (n as i32 - 1).max(0)
}

fn segment_index(value: &SegmentValue<i32>) -> Option<usize> {
    match value {
        SegmentValue::Exact(n) | SegmentValue::CenterOf(n) => usize::try_from(*n).ok(),
        SegmentValue::Last => None,
    }
}

fn label_at(labels: &[String], value: &SegmentValue<i32>) -> String {
    segment_index(value)
        .and_then(|i| labels.get(i))
        .cloned()
        .unwrap_or_default()
}

/// Draw the overlays of `target` on `layer`, each into the frame it is positioned against.
fn decorate<DB: DrawingBackend>(
    figure: &DrawingArea<DB, Shift>,
    plot: &DrawingArea<DB, Shift>,
    config: &Config,
    target: Target,
    layer: Layer,
) -> Result<(), ChartError> {
    let (on_plot, on_figure): (Vec<&Overlay>, Vec<&Overlay>) = config
        .overlays_for(target)
        .filter(|overlay| overlay.layer == layer)
        .partition(|overlay| overlay.frame == Frame::Plot);
    draw_overlays(plot, on_plot, &config.assets)?;
    draw_overlays(figure, on_figure, &config.assets)?;
    Ok(())
}

pub fn plot_series_ratings(report: &Report, config: &Config) -> Result<PathBuf, ChartError> {
    let path = config.graphs.join("imdb-rating-across-seasons.png");
    let series = &report.series_ratings;
    let labels = series.iter().map(|s| s.book.to_string()).collect::<Vec<_>>();

    let root = BitMapBackend::new(&path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(35)
        .set_left_and_bottom_label_area_size(60)
        .caption("IMDb Rating Across Seasons", ("sans-serif", 40))
        .build_cartesian_2d((0..last_index(series.len())).into_segmented(), 0.0..10.0_f64)?;

    let plot = chart.plotting_area().strip_coord_spec();
    decorate(&root, &plot, config, Target::SeriesRatings, Layer::Below)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Book")
        .y_desc("IMDb Rating")
        .x_labels(series.len() * 2)
        .x_label_formatter(&|x| label_at(&labels, x))
        .y_label_formatter(&|v| format!("{:.1}", v))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(RATING_COLOR.mix(0.6).filled())
            .margin(40)
            .data(series.iter().enumerate().map(|(i, s)| (i as i32, s.rating))),
    )?;

    let value_style = TextStyle::from(("sans-serif", 24).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart.draw_series(series.iter().enumerate().map(|(i, s)| {
        Text::new(
            format!("{:.2}", s.rating),
            (SegmentValue::CenterOf(i as i32), s.rating + 0.1),
            value_style.clone(),
        )
    }))?;

    decorate(&root, &plot, config, Target::SeriesRatings, Layer::Above)?;
    root.present()?;
    Ok(path.clone())
}

pub fn plot_episode_ratings(report: &Report, config: &Config) -> Result<PathBuf, ChartError> {
    let path = config.graphs.join("episode-ratings.svg");
    let episodes = &report.episodes;

    let root = SVGBackend::new(&path, (1600, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(35)
        .set_left_and_bottom_label_area_size(60)
        .caption("IMDb Rating of Every Episode", ("sans-serif", 40))
        .build_cartesian_2d((0..last_index(episodes.len())).into_segmented(), 0.0..10.0_f64)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Episode")
        .y_desc("IMDb Rating")
        .x_labels(20)
        .x_label_formatter(&|x| segment_index(x).map(|i| (i + 1).to_string()).unwrap_or_default())
        .draw()?;

    for book in Book::VALUES {
        let color = book_color(book);
        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(color.filled())
                    .margin(1)
                    .data(
                        episodes
                            .iter()
                            .filter(|episode| episode.book == book)
                            .filter_map(|episode| episode.imdb_rating.map(|rating| (episode.index as i32, rating))),
                    ),
            )?
            .label(book.to_string())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 20))
        .draw()?;

    root.present()?;
    Ok(path.clone())
}

/// Mean rating per director as bars, next to a pie of how many episodes each directed.
pub fn plot_directors(report: &Report, config: &Config) -> Result<PathBuf, ChartError> {
    let path = config.graphs.join("directors.svg");
    let ratings = &report.director_ratings;
    let names = ratings.iter().map(|r| r.director.clone()).collect::<Vec<_>>();

    let root = SVGBackend::new(&path, (1800, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Directors and Their Average Rating", ("sans-serif", 40))?;
    let (bar_area, pie_area) = root.split_horizontally(1000);

    let mut chart = ChartBuilder::on(&bar_area)
        .margin(35)
        .x_label_area_size(50)
        .y_label_area_size(220)
        .build_cartesian_2d(0.0..10.0_f64, (0..last_index(ratings.len())).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("Average IMDb Rating")
        .y_labels(ratings.len() * 2)
        .y_label_formatter(&|y| label_at(&names, y))
        .x_label_formatter(&|v| format!("{:.1}", v))
        .label_style(("sans-serif", 18))
        .draw()?;

    chart.draw_series(
        Histogram::horizontal(&chart)
            .style_func(|y, _rating| {
                if segment_index(y) == Some(HIGHLIGHTED_DIRECTOR) {
                    DIRECTOR_HIGHLIGHT.filled()
                } else {
                    DIRECTOR_COLOR.filled()
                }
            })
            .margin(6)
            .data(ratings.iter().enumerate().map(|(i, r)| (i as i32, r.rating))),
    )?;

    let counts = &report.director_counts;
    if !counts.is_empty() {
        let pie_area = pie_area.margin(35, 35, 35, 35);
        let pie_area = pie_area.titled("Episodes per Director", ("sans-serif", 28))?;
        let dims = pie_area.dim_in_pixel();
        let plotters::coord::Shift(pos) = pie_area.as_coord_spec();
        let center = (pos.0 + dims.0 as i32 / 2, pos.1 + dims.1 as i32 / 2);
        let radius = dims.0.min(dims.1) as f64 * 0.35;

        let sizes = counts.iter().map(|c| c.episodes as f64).collect::<Vec<_>>();
        let labels = counts.iter().map(|c| c.director.clone()).collect::<Vec<_>>();
        let colors = (0..counts.len())
            .map(|i| hsv_to_rgb(i as f64 / counts.len() as f64, 0.45, 0.95))
            .collect::<Vec<_>>();
        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.start_angle(-90.0);
        pie.label_offset(radius * 0.075);
        pie.label_style((("sans-serif", 18).into_font()).color(&BLACK));
        pie.percentages((("sans-serif", radius * 0.06).into_font()).color(&BLACK));
        pie_area.draw(&pie)?;
    }

    root.present()?;
    Ok(path.clone())
}

pub fn plot_top_characters(report: &Report, config: &Config) -> Result<PathBuf, ChartError> {
    let path = config.graphs.join("top-characters-by-book.svg");

    let root = SVGBackend::new(&path, (1800, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Characters with Most Dialogues in Each Book", ("sans-serif", 40))?;

    for (area, book) in root.split_evenly((1, Book::VALUES.len())).iter().zip(Book::VALUES) {
        let mut rows = top_characters(&report.character_dialogues, book, config.top_characters);
        // Bars are drawn bottom-up; put the most talkative on top.
        rows.reverse();
        let names = rows.iter().map(|r| r.character.clone()).collect::<Vec<_>>();
        let max = rows.iter().map(|r| r.dialogues).max().unwrap_or(0) as i32;

        let mut chart = ChartBuilder::on(area)
            .margin(20)
            .caption(book.to_string(), ("sans-serif", 30))
            .x_label_area_size(40)
            .y_label_area_size(130)
            .build_cartesian_2d(0..(max + max / 10 + 1), (0..last_index(rows.len())).into_segmented())?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .x_desc("Number of Dialogues")
            .y_labels(rows.len() * 2)
            .y_label_formatter(&|y| label_at(&names, y))
            .draw()?;

        chart.draw_series(
            Histogram::horizontal(&chart)
                .style(book_color(book).mix(0.8).filled())
                .margin(4)
                .data(rows.iter().enumerate().map(|(i, r)| (i as i32, r.dialogues as i32))),
        )?;
    }

    root.present()?;
    Ok(path.clone())
}

pub fn plot_sentiment(report: &Report, config: &Config) -> Result<PathBuf, ChartError> {
    let path = config.graphs.join("sentiment-distribution.svg");
    let distribution = &report.sentiment;

    let root = SVGBackend::new(&path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(30)
        .set_left_and_bottom_label_area_size(60)
        .caption("Sentiment Distribution of Character Dialogues", ("sans-serif", 30))
        .build_cartesian_2d(distribution.min..distribution.max, 0.0..(distribution.peak() * 1.1).max(1.0))?;

    chart
        .configure_mesh()
        .x_desc("Sentiment Score")
        .y_desc("Frequency")
        .x_label_formatter(&|v| format!("{:.1}", v))
        .y_label_formatter(&|v| format!("{:.0}", v))
        .draw()?;

    chart.draw_series(
        distribution
            .edges()
            .map(|(lower, upper, count)| Rectangle::new([(lower, 0.0), (upper, count as f64)], PURPLE.mix(0.45).filled())),
    )?;
    chart.draw_series(
        distribution
            .edges()
            .map(|(lower, upper, count)| Rectangle::new([(lower, 0.0), (upper, count as f64)], PURPLE.stroke_width(1))),
    )?;
    if !distribution.density.is_empty() {
        chart.draw_series(LineSeries::new(distribution.density.iter().copied(), PURPLE.stroke_width(2)))?;
    }

    root.present()?;
    Ok(path.clone())
}

/// Grouped bars of the configured characters per book, decorated with their portraits.
pub fn plot_important_characters(report: &Report, config: &Config) -> Result<PathBuf, ChartError> {
    let path = config.graphs.join("important-characters.png");
    let names = &config.important_characters;
    let rows = important_characters(&report.character_dialogues, names);
    let n = names.len();
    let max = rows.iter().map(|r| r.dialogues).max().unwrap_or(0) as f64;

    let root = BitMapBackend::new(&path, (1200, 900)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(35)
        .margin_right(140)
        .x_label_area_size(50)
        .y_label_area_size(100)
        .caption("Important Characters Number of Dialogues each Season", ("sans-serif", 32))
        .build_cartesian_2d(0.0..(max * 1.1).max(1.0), -0.5..(n as f64 - 0.5))?;

    let plot = chart.plotting_area().strip_coord_spec();
    decorate(&root, &plot, config, Target::ImportantCharacters, Layer::Below)?;

    // The first configured name sits at the top.
    let band = |name: &str| names.iter().position(|candidate| candidate == name).map(|j| (n - 1 - j) as f64);

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("Number of Dialogues")
        .y_desc("Character")
        .y_labels(n + 1)
        .y_label_formatter(&|y| {
            let rounded = y.round();
            if (y - rounded).abs() > 1e-6 || rounded < 0.0 || rounded as usize >= n {
                return String::new();
            }
            names[n - 1 - rounded as usize].clone()
        })
        .x_label_formatter(&|v| format!("{:.0}", v))
        .draw()?;

    for (k, book) in Book::VALUES.into_iter().enumerate() {
        let color = book_color(book);
        chart
            .draw_series(rows.iter().filter(|r| r.book == book).filter_map(|r| {
                let lower = band(&r.character)? - 0.4 + k as f64 * 0.27;
                Some(Rectangle::new([(0.0, lower), (r.dialogues as f64, lower + 0.25)], color.filled()))
            }))?
            .label(book.to_string())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 20))
        .draw()?;

    decorate(&root, &plot, config, Target::ImportantCharacters, Layer::Above)?;
    root.present()?;
    Ok(path.clone())
}

pub fn plot_most_dialogues(report: &Report, config: &Config) -> Result<PathBuf, ChartError> {
    let path = config.graphs.join("most-dialogues.svg");
    let mut rows = most_dialogues(&report.chapter_dialogues, config.top_chapters);
    rows.reverse();
    let names = rows.iter().map(|r| r.chapter.clone()).collect::<Vec<_>>();
    let max = rows.iter().map(|r| r.dialogues).max().unwrap_or(0) as i32;

    let root = SVGBackend::new(&path, (1200, 900)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(35)
        .x_label_area_size(50)
        .y_label_area_size(260)
        .caption(
            format!("Top {} Episodes with the Most Number of Dialogues", rows.len()),
            ("sans-serif", 32),
        )
        .build_cartesian_2d(0..(max + max / 10 + 1), (0..last_index(rows.len())).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("Number of Dialogues")
        .y_desc("Chapter Name")
        .y_labels(rows.len() * 2)
        .y_label_formatter(&|y| label_at(&names, y))
        .draw()?;

    for book in Book::VALUES {
        let color = book_color(book);
        chart
            .draw_series(
                Histogram::horizontal(&chart)
                    .style(color.filled())
                    .margin(3)
                    .data(
                        rows.iter()
                            .enumerate()
                            .filter(|(_, r)| r.book == book)
                            .map(|(i, r)| (i as i32, r.dialogues as i32)),
                    ),
            )?
            .label(book.to_string())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(path.clone())
}

pub fn plot_dialogues_vs_rating(report: &Report, config: &Config) -> Result<PathBuf, ChartError> {
    let path = config.graphs.join("dialogues-vs-rating.svg");
    let rows = report
        .chapter_dialogues
        .iter()
        .filter_map(|r| r.imdb_rating.map(|rating| (r, rating)))
        .collect::<Vec<_>>();
    let max = rows.iter().map(|(r, _)| r.dialogues).max().unwrap_or(0) as f64;
    let (low, high) = rows
        .iter()
        .map(|(_, rating)| *rating)
        .fold(None, |range: Option<(f64, f64)>, rating| match range {
            Some((low, high)) => Some((low.min(rating), high.max(rating))),
            None => Some((rating, rating)),
        })
        .unwrap_or((0.0, 10.0));

    let root = SVGBackend::new(&path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(35)
        .set_left_and_bottom_label_area_size(60)
        .caption("Dialogues per Episode against IMDb Rating", ("sans-serif", 32))
        .build_cartesian_2d(0.0..(max * 1.1 + 1.0), (low - 0.2)..(high + 0.2))?;

    chart
        .configure_mesh()
        .x_desc("Number of Dialogues")
        .y_desc("IMDb Rating")
        .x_label_formatter(&|v| format!("{:.0}", v))
        .y_label_formatter(&|v| format!("{:.1}", v))
        .draw()?;

    for book in Book::VALUES {
        let color = book_color(book);
        chart
            .draw_series(
                rows.iter()
                    .filter(|(r, _)| r.book == book)
                    .map(|(r, rating)| Circle::new((r.dialogues as f64, *rating), 5, color.mix(0.7).filled())),
            )?
            .label(book.to_string())
            .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(path.clone())
}
