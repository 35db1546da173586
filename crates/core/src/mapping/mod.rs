use serde::{Deserialize, Serialize};

use crate::{geometry::Point2, world::GridCoord};

/// Video and screen dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub video_width: f32,
    pub video_height: f32,
    pub screen_width: f32,
    pub screen_height: f32,
}

impl Viewport {
    pub fn new(video_width: f32, video_height: f32, screen_width: f32, screen_height: f32) -> Self {
        Self {
            video_width,
            video_height,
            screen_width,
            screen_height,
        }
    }

    /// Projects a normalized video point onto normalized screen space.
    pub fn to_screen(&self, point: Point2) -> Point2 {
        let (x, y) = cover_fit_to_screen(
            point.x,
            point.y,
            self.video_width,
            self.video_height,
            self.screen_width,
            self.screen_height,
        );
        Point2::new(x, y)
    }
}

/// Maps a normalized video coordinate to a normalized screen coordinate when
/// the video is drawn with aspect-fill and centre crop.
///
/// A screen wider than the video crops the video vertically, so only `y` is
/// rescaled; otherwise only `x` is. Degenerate dimensions pass the point
/// through unchanged. The renderer must crop the video the same way so that
/// overlays line up with the picture.
pub fn cover_fit_to_screen(
    x: f32,
    y: f32,
    video_width: f32,
    video_height: f32,
    screen_width: f32,
    screen_height: f32,
) -> (f32, f32) {
    if video_width <= 0.0 || video_height <= 0.0 || screen_width <= 0.0 || screen_height <= 0.0 {
        return (x, y);
    }

    let video_aspect = video_width / video_height;
    let screen_aspect = screen_width / screen_height;

    if screen_aspect > video_aspect {
        let rendered_height = screen_width / video_aspect;
        let offset = (rendered_height - screen_height) / 2.0;
        (x, (y * rendered_height - offset) / screen_height)
    } else {
        let rendered_width = screen_height * video_aspect;
        let offset = (rendered_width - screen_width) / 2.0;
        ((x * rendered_width - offset) / screen_width, y)
    }
}

/// Maps a normalized screen cursor onto a flat grid of cells centred on the
/// origin, with `y` growing upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridProjector {
    pub columns: u32,
    pub rows: u32,
    pub layer: i32,
}

impl Default for GridProjector {
    fn default() -> Self {
        Self {
            columns: 32,
            rows: 18,
            layer: 0,
        }
    }
}

impl GridProjector {
    pub fn cell_at(&self, cursor: Point2) -> GridCoord {
        let columns = self.columns.max(1) as i32;
        let rows = self.rows.max(1) as i32;

        let column = ((cursor.x.clamp(0.0, 1.0) * columns as f32).floor() as i32).min(columns - 1);
        let row = ((cursor.y.clamp(0.0, 1.0) * rows as f32).floor() as i32).min(rows - 1);

        GridCoord::new(column - columns / 2, rows / 2 - 1 - row, self.layer)
    }
}
