use std::{collections::VecDeque, fmt, str::FromStr};

use image::{RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::{geometry::Point2, SculptError};

/// Rolling history length used unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

const NEAR_WHITE: f32 = 245.0;
const NEAR_BLACK: f32 = 10.0;

/// 24-bit RGB color, serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Rounds and clamps each channel independently.
    pub fn from_channels(channels: [f32; 3]) -> Self {
        let [r, g, b] = channels.map(|c| c.round().clamp(0.0, 255.0) as u8);
        Self { r, g, b }
    }

    pub fn is_white(&self) -> bool {
        *self == Self::WHITE
    }

    pub fn is_black(&self) -> bool {
        *self == Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = SculptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .filter(|hex| hex.len() == 6 && hex.is_ascii())
            .ok_or_else(|| SculptError::msg(format!("`{s}` is not a #rrggbb color")))?;

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| SculptError::msg(format!("`{s}` is not a #rrggbb color")))
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl TryFrom<String> for Color {
    type Error = SculptError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

/// Read access to a frame of pixels.
pub trait PixelSource {
    fn dimensions(&self) -> (u32, u32);

    /// RGB value at `(x, y)`, or `None` when the pixel cannot be read.
    fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]>;
}

impl PixelSource for RgbImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbImage::dimensions(self)
    }

    fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.get_pixel_checked(x, y).map(|p| p.0)
    }
}

impl PixelSource for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbaImage::dimensions(self)
    }

    fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.get_pixel_checked(x, y).map(|p| [p.0[0], p.0[1], p.0[2]])
    }
}

/// Temporally smoothed color picker.
///
/// Each successful read pushes the window mean into a bounded history and the
/// mean of that history is reported, which damps flicker from hand jitter and
/// lighting noise. The history belongs to the sampler instance and survives
/// pauses and mode changes; call [`ColorSampler::reset`] to start over.
#[derive(Debug, Clone)]
pub struct ColorSampler {
    history: VecDeque<[f32; 3]>,
    capacity: usize,
}

impl Default for ColorSampler {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ColorSampler {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Samples a `(2 * radius + 1)²` window centred on `point`, given in
    /// normalized video coordinates. The window is clipped to the frame.
    pub fn sample<P>(&mut self, source: &P, point: Point2, radius: u32) -> Option<Color>
    where
        P: PixelSource + ?Sized,
    {
        let mean = window_mean(source, point, radius)?;

        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(mean);

        let averaged = self.averaged();
        if averaged.iter().all(|c| *c > NEAR_WHITE) || averaged.iter().all(|c| *c < NEAR_BLACK) {
            return None;
        }

        Some(Color::from_channels(averaged))
    }

    fn averaged(&self) -> [f32; 3] {
        let mut sum = [0.0f32; 3];
        for entry in &self.history {
            for (acc, value) in sum.iter_mut().zip(entry) {
                *acc += value;
            }
        }
        let count = self.history.len().max(1) as f32;
        sum.map(|c| c / count)
    }
}

fn window_mean<P>(source: &P, point: Point2, radius: u32) -> Option<[f32; 3]>
where
    P: PixelSource + ?Sized,
{
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let nx = if point.x.is_finite() { point.x.clamp(0.0, 1.0) } else { 0.0 };
    let ny = if point.y.is_finite() { point.y.clamp(0.0, 1.0) } else { 0.0 };
    let cx = ((nx * width as f32).floor() as i64).min(width as i64 - 1);
    let cy = ((ny * height as f32).floor() as i64).min(height as i64 - 1);
    let radius = radius as i64;

    let x0 = (cx - radius).max(0);
    let y0 = (cy - radius).max(0);
    let x1 = (cx + radius).min(width as i64 - 1);
    let y1 = (cy + radius).min(height as i64 - 1);

    let mut sum = [0.0f32; 3];
    let mut count = 0u32;
    for y in y0..=y1 {
        for x in x0..=x1 {
            if let Some(rgb) = source.pixel(x as u32, y as u32) {
                for (acc, value) in sum.iter_mut().zip(rgb) {
                    *acc += value as f32;
                }
                count += 1;
            }
        }
    }

    if count == 0 {
        return None;
    }

    Some(sum.map(|c| c / count as f32))
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(rgb))
    }

    struct Unreadable;

    impl PixelSource for Unreadable {
        fn dimensions(&self) -> (u32, u32) {
            (16, 16)
        }

        fn pixel(&self, _x: u32, _y: u32) -> Option<[u8; 3]> {
            None
        }
    }

    #[test]
    fn color_round_trips_through_hex() {
        let color: Color = "#06b6d4".parse().unwrap();
        assert_eq!(color, Color::rgb(0x06, 0xb6, 0xd4));
        assert_eq!(color.to_string(), "#06b6d4");
        assert!("06b6d4".parse::<Color>().is_err());
        assert!("#06b6dz".parse::<Color>().is_err());
    }

    #[test]
    fn channels_are_clamped_before_encoding() {
        let color = Color::from_channels([300.0, -5.0, 127.6]);
        assert_eq!(color.to_string(), "#ff0080");
    }

    #[test]
    fn samples_solid_frame() {
        let frame = solid(64, 48, [200, 40, 10]);
        let mut sampler = ColorSampler::default();

        let color = sampler.sample(&frame, Point2::new(0.5, 0.5), 8);
        assert_eq!(color, Some(Color::rgb(200, 40, 10)));
        assert_eq!(sampler.history_len(), 1);
    }

    #[test]
    fn window_is_clipped_at_the_corner() {
        let mut frame = solid(10, 10, [0, 0, 0]);
        frame.put_pixel(0, 0, Rgb([90, 90, 90]));
        frame.put_pixel(1, 0, Rgb([90, 90, 90]));
        frame.put_pixel(0, 1, Rgb([90, 90, 90]));
        frame.put_pixel(1, 1, Rgb([90, 90, 90]));

        let mut sampler = ColorSampler::default();
        // Out of range coordinates clamp to the top-left pixel; the 3x3 window
        // clips to the 2x2 block of grey.
        let color = sampler.sample(&frame, Point2::new(-3.0, -1.0), 1);
        assert_eq!(color, Some(Color::rgb(90, 90, 90)));
    }

    #[test]
    fn history_averages_recent_frames() {
        let mut sampler = ColorSampler::new(2);
        let red = solid(8, 8, [200, 20, 20]);
        let blue = solid(8, 8, [20, 20, 200]);

        sampler.sample(&red, Point2::new(0.5, 0.5), 2);
        let mixed = sampler.sample(&blue, Point2::new(0.5, 0.5), 2);
        assert_eq!(mixed, Some(Color::rgb(110, 20, 110)));

        // Capacity two evicts the red entry.
        let settled = sampler.sample(&blue, Point2::new(0.5, 0.5), 2);
        assert_eq!(settled, Some(Color::rgb(20, 20, 200)));
        assert_eq!(sampler.history_len(), 2);
    }

    #[test]
    fn rejects_near_white_and_near_black_averages() {
        let mut sampler = ColorSampler::default();
        assert_eq!(sampler.sample(&solid(8, 8, [250, 250, 250]), Point2::new(0.5, 0.5), 1), None);

        sampler.reset();
        assert_eq!(sampler.sample(&solid(8, 8, [3, 5, 8]), Point2::new(0.5, 0.5), 1), None);

        // A bright but tinted surface is a real material.
        sampler.reset();
        assert!(sampler.sample(&solid(8, 8, [250, 250, 200]), Point2::new(0.5, 0.5), 1).is_some());
    }

    #[test]
    fn rejection_uses_the_averaged_color() {
        let mut sampler = ColorSampler::default();
        sampler.sample(&solid(8, 8, [120, 60, 30]), Point2::new(0.5, 0.5), 1);

        // A single white frame is absorbed by the history.
        let color = sampler.sample(&solid(8, 8, [255, 255, 255]), Point2::new(0.5, 0.5), 1);
        assert!(color.is_some());
    }

    #[test]
    fn unreadable_sources_yield_nothing() {
        let mut sampler = ColorSampler::default();
        assert_eq!(sampler.sample(&Unreadable, Point2::new(0.5, 0.5), 4), None);
        assert_eq!(sampler.sample(&RgbImage::new(0, 0), Point2::new(0.5, 0.5), 4), None);
        assert_eq!(sampler.history_len(), 0);
    }
}
