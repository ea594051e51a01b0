use super::ChartError;
use image::{imageops::FilterType, RgbaImage};
use plotters::{coord::Shift, element::BitMapElement, prelude::*};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Which chart an overlay decorates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    SeriesRatings,
    ImportantCharacters,
}

/// What the normalized coordinates are relative to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frame {
    /// The plotting area inside the axes.
    Plot,
    /// The whole image.
    Figure,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Below,
    Above,
}

/// The point of the overlay placed at `(x, y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopRight,
    Center,
    BottomLeft,
    BottomRight,
}

fn full_opacity() -> f64 {
    1.0
}

/// A decorative image drawn on a chart. Coordinates are normalized so that
/// `(0, 0)` is the bottom-left and `(1, 1)` the top-right corner of the frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    /// File name inside the asset directory.
    pub name: String,
    pub url: String,
    pub target: Target,
    pub frame: Frame,
    pub layer: Layer,
    pub x: f64,
    pub y: f64,
    pub size_x: f64,
    pub size_y: f64,
    pub anchor: Anchor,
    #[serde(default = "full_opacity")]
    pub opacity: f64,
}

/// Pixel rectangle as `(left, top, width, height)`.
pub type Placement = (i32, i32, u32, u32);

impl Overlay {
    /// Where the overlay lands inside a `width` x `height` frame, clamped so it stays inside.
    /// `None` when it would be less than a pixel wide or tall.
    pub fn placement(&self, (width, height): (u32, u32)) -> Option<Placement> {
        let w = (self.size_x * width as f64).round().min(width as f64);
        let h = (self.size_y * height as f64).round().min(height as f64);
        if w < 1.0 || h < 1.0 {
            return None;
        }
        let px = self.x * width as f64;
        let py = (1.0 - self.y) * height as f64;
        let (left, top) = match self.anchor {
            Anchor::TopLeft => (px, py),
            Anchor::TopRight => (px - w, py),
            Anchor::Center => (px - w / 2.0, py - h / 2.0),
            Anchor::BottomLeft => (px, py - h),
            Anchor::BottomRight => (px - w, py - h),
        };
        let left = left.round().clamp(0.0, width as f64 - w);
        let top = top.round().clamp(0.0, height as f64 - h);
        Some((left as i32, top as i32, w as u32, h as u32))
    }
}

/// Flatten RGBA onto a white page, scaling alpha by `opacity`, into packed RGB.
pub fn blend_on_white(image: &RgbaImage, opacity: f64) -> Vec<u8> {
    let opacity = opacity.clamp(0.0, 1.0);
    let mut buffer = Vec::with_capacity((image.width() * image.height() * 3) as usize);
    for pixel in image.pixels() {
        let alpha = pixel[3] as f64 / 255.0 * opacity;
        for channel in &pixel.0[..3] {
            let value = *channel as f64 * alpha + 255.0 * (1.0 - alpha);
            buffer.push(value.round() as u8);
        }
    }
    buffer
}

/// Blit every overlay whose asset is readable onto `area`. Missing or
/// undecodable assets are skipped. Returns how many were drawn.
pub fn draw_overlays<'a, DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    overlays: impl IntoIterator<Item = &'a Overlay>,
    assets: &Path,
) -> Result<usize, ChartError> {
    let mut drawn = 0;
    for overlay in overlays {
        let path = assets.join(&overlay.name);
        let image = match image::open(&path) {
            Ok(image) => image,
            Err(err) => {
                warn!(asset = %path.display(), %err, "skipping overlay");
                continue;
            }
        };
        let Some((left, top, width, height)) = overlay.placement(area.dim_in_pixel()) else {
            continue;
        };
        let pixels = image.resize_exact(width, height, FilterType::Triangle).to_rgba8();
        let buffer = blend_on_white(&pixels, overlay.opacity);
        let element: Option<BitMapElement<(i32, i32)>> =
            BitMapElement::with_owned_buffer((left, top), (width, height), buffer);
        if let Some(element) = element {
            area.draw(&element)?;
            debug!(overlay = %overlay.name, left, top, width, height, "drew overlay");
            drawn += 1;
        }
    }
    Ok(drawn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn overlay(x: f64, y: f64, anchor: Anchor) -> Overlay {
        Overlay {
            name: "test.png".to_string(),
            url: String::new(),
            target: Target::ImportantCharacters,
            frame: Frame::Figure,
            layer: Layer::Above,
            x,
            y,
            size_x: 0.1,
            size_y: 0.2,
            anchor,
            opacity: 1.0,
        }
    }

    #[test]
    fn test_placement_anchors() {
        let frame = (1000, 500);
        assert_eq!(overlay(0.5, 0.5, Anchor::TopLeft).placement(frame), Some((500, 250, 100, 100)));
        assert_eq!(overlay(0.5, 0.5, Anchor::BottomRight).placement(frame), Some((400, 150, 100, 100)));
        assert_eq!(overlay(0.5, 0.5, Anchor::Center).placement(frame), Some((450, 200, 100, 100)));
    }

    #[test]
    fn test_placement_stays_in_frame() {
        let frame = (1000, 500);
        // Right edge past the frame, as some portrait positions are.
        assert_eq!(overlay(1.05, 0.0, Anchor::BottomLeft).placement(frame), Some((900, 400, 100, 100)));

        let mut background = overlay(0.0, 1.0, Anchor::TopLeft);
        background.size_x = 1.0;
        background.size_y = 1.0;
        assert_eq!(background.placement(frame), Some((0, 0, 1000, 500)));

        let mut tiny = overlay(0.5, 0.5, Anchor::Center);
        tiny.size_x = 0.0001;
        assert_eq!(tiny.placement(frame), None);
    }

    #[test]
    fn test_blend_on_white() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        assert_eq!(blend_on_white(&image, 1.0), vec![0, 0, 0, 255, 255, 255]);
        assert_eq!(blend_on_white(&image, 0.5), vec![128, 128, 128, 255, 255, 255]);
    }

    #[test]
    fn test_missing_assets_are_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut buffer = vec![0u8; 40 * 30 * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (40, 30)).into_drawing_area();
            let overlays = [overlay(0.5, 0.5, Anchor::Center)];
            assert_eq!(draw_overlays(&root, &overlays, dir.path()).unwrap(), 0);

            let mut red = RgbaImage::new(4, 4);
            for pixel in red.pixels_mut() {
                *pixel = Rgba([255, 0, 0, 255]);
            }
            red.save(dir.path().join("test.png")).unwrap();
            assert_eq!(draw_overlays(&root, &overlays, dir.path()).unwrap(), 1);
            root.present().unwrap();
        }
        // Centre pixel of the frame is now red.
        let centre = (15 * 40 + 20) * 3;
        assert_eq!(&buffer[centre..centre + 3], &[255, 0, 0]);
    }
}
