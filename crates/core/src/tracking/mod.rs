//! Per-frame reduction of detector output into [`TrackingState`] events.

use std::{
    fmt,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    geometry::{planar_centroid, Landmark, Point2},
    gesture::{classify, landmark, Gesture, GestureSettings, LANDMARK_COUNT},
    mapping::Viewport,
    sampler::{Color, ColorSampler, PixelSource},
};

/// Raw detector output for one frame: zero or one hand poses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorFrame {
    #[serde(default)]
    pub hands: Vec<Vec<Landmark>>,
}

impl DetectorFrame {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_hand(landmarks: Vec<Landmark>) -> Self {
        Self {
            hands: vec![landmarks],
        }
    }

    /// The tracked pose. Only the first hand is used. A pose that is not
    /// exactly [`LANDMARK_COUNT`] points long, or that holds a non-finite
    /// coordinate, counts as absent.
    pub fn pose(&self) -> Option<&[Landmark]> {
        self.hands
            .first()
            .map(Vec::as_slice)
            .filter(|pose| pose.len() == LANDMARK_COUNT)
            .filter(|pose| pose.iter().all(Landmark::is_finite))
    }
}

/// Snapshot handed to consumers whenever the reducer decides to emit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackingState {
    pub is_tracking: bool,
    /// Empty when no hand is visible.
    pub landmarks: Vec<Landmark>,
    pub gesture: Gesture,
    pub confidence: f32,
    pub sampled_color: Option<Color>,
    /// Smoothed navigation cursor in normalized screen coordinates.
    pub cursor: Option<Point2>,
    /// Unsmoothed sampling point in normalized screen coordinates.
    pub scan_point: Option<Point2>,
}

impl TrackingState {
    /// Emitted once when the hand disappears after a gesture.
    pub fn hand_lost() -> Self {
        Self {
            is_tracking: true,
            ..Self::default()
        }
    }
}

/// Decides whether a freshly reduced state should reach consumers.
///
/// Emits on a gesture change, on every frame of a continuous gesture, and on
/// every frame while colors are being sampled.
pub fn should_emit(previous: Gesture, current: &TrackingState, sampling_active: bool) -> bool {
    current.gesture != previous || current.gesture.is_continuous() || sampling_active
}

/// Detector problems that stop tracking until the user retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorFault {
    PermissionDenied,
    ModelLoadFailed,
}

impl fmt::Display for DetectorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => f.write_str("camera permission denied"),
            Self::ModelLoadFailed => f.write_str("hand landmark model failed to load"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackingStatus {
    #[default]
    Running,
    Paused,
    Faulted(DetectorFault),
}

impl TrackingStatus {
    pub fn accepts_frames(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Sampler radii and smoothing used by the reducer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReducerOptions {
    pub cursor_smoothing: f32,
    pub object_radius_px: u32,
    pub point_radius_px: u32,
}

impl Default for ReducerOptions {
    fn default() -> Self {
        Self {
            cursor_smoothing: 0.6,
            object_radius_px: 30,
            point_radius_px: 8,
        }
    }
}

/// Turns detector frames into edge-triggered [`TrackingState`] events.
#[derive(Debug)]
pub struct TrackingReducer {
    options: ReducerOptions,
    sampler: ColorSampler,
    sampling: bool,
    last_emitted: Gesture,
    cursor: Option<Point2>,
}

impl TrackingReducer {
    pub fn new(options: ReducerOptions, sampler: ColorSampler) -> Self {
        Self {
            options,
            sampler,
            sampling: false,
            last_emitted: Gesture::None,
            cursor: None,
        }
    }

    pub fn set_sampling(&mut self, enabled: bool) {
        if self.sampling != enabled {
            debug!(enabled, "color sampling toggled");
        }
        self.sampling = enabled;
    }

    pub fn is_sampling(&self) -> bool {
        self.sampling
    }

    pub fn sampler(&self) -> &ColorSampler {
        &self.sampler
    }

    /// Reduces one frame. Returns the state to publish, if any.
    pub fn reduce(
        &mut self,
        frame: &DetectorFrame,
        pixels: Option<&dyn PixelSource>,
        viewport: &Viewport,
        settings: &GestureSettings,
    ) -> Option<TrackingState> {
        let Some(pose) = frame.pose() else {
            if self.last_emitted == Gesture::None {
                return None;
            }
            self.last_emitted = Gesture::None;
            return Some(TrackingState::hand_lost());
        };

        let classification = classify(Some(pose), settings);
        let gesture = classification.gesture;

        let pinch_mid = planar_centroid([&pose[landmark::THUMB_TIP], &pose[landmark::INDEX_TIP]]);
        let scan_center = match gesture {
            Gesture::Grab => planar_centroid(landmark::PALM.iter().map(|&i| &pose[i])),
            Gesture::Point => pose[landmark::INDEX_TIP].planar(),
            _ => pinch_mid,
        };

        let target = viewport.to_screen(pinch_mid);
        let cursor = match self.cursor {
            Some(previous) => previous.approach(target, self.options.cursor_smoothing),
            None => target,
        };
        self.cursor = Some(cursor);

        let sampled_color = if self.sampling {
            let radius = if gesture == Gesture::Grab {
                self.options.object_radius_px
            } else {
                self.options.point_radius_px
            };
            pixels.and_then(|source| self.sampler.sample(source, scan_center, radius))
        } else {
            None
        };

        let state = TrackingState {
            is_tracking: true,
            landmarks: pose.to_vec(),
            gesture,
            confidence: classification.confidence,
            sampled_color,
            cursor: Some(cursor),
            scan_point: Some(viewport.to_screen(scan_center)),
        };

        if !should_emit(self.last_emitted, &state, self.sampling) {
            return None;
        }

        if state.gesture != self.last_emitted {
            debug!(from = %self.last_emitted, to = %state.gesture, "gesture changed");
        }
        self.last_emitted = state.gesture;
        Some(state)
    }
}

/// Counts frame intervals per one-second window.
#[derive(Debug, Clone, Default)]
pub struct FrameRateMeter {
    window_start: Option<Instant>,
    frames: u32,
    fps: u32,
}

impl FrameRateMeter {
    const WINDOW: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, now: Instant) {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return;
        };
        self.frames += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed >= Self::WINDOW {
            self.fps = (self.frames as f32 / elapsed.as_secs_f32()).round() as u32;
            self.frames = 0;
            self.window_start = Some(now);
            info!(fps = self.fps, "tracking frame rate");
        }
    }

    /// Rate measured over the last completed window.
    pub fn fps(&self) -> u32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;
    use crate::gesture::fixtures::{fist, open_hand, pinch, point};

    fn reducer() -> TrackingReducer {
        TrackingReducer::new(ReducerOptions::default(), ColorSampler::default())
    }

    fn square() -> Viewport {
        Viewport::new(100.0, 100.0, 100.0, 100.0)
    }

    fn reduce(reducer: &mut TrackingReducer, frame: &DetectorFrame) -> Option<TrackingState> {
        reducer.reduce(frame, None, &square(), &GestureSettings::default())
    }

    #[test]
    fn partial_pose_counts_as_absent() {
        let mut hand = open_hand();
        hand.pop();
        assert!(DetectorFrame::with_hand(hand).pose().is_none());
        assert!(DetectorFrame::empty().pose().is_none());
        assert!(DetectorFrame::with_hand(open_hand()).pose().is_some());
    }

    #[test]
    fn non_finite_pose_counts_as_absent() {
        let mut reducer = reducer();
        let first = reduce(&mut reducer, &DetectorFrame::with_hand(pinch())).unwrap();

        let mut corrupt = pinch();
        corrupt[landmark::THUMB_TIP].x = f32::NAN;
        let frame = DetectorFrame::with_hand(corrupt);
        assert!(frame.pose().is_none());
        assert_eq!(reduce(&mut reducer, &frame), Some(TrackingState::hand_lost()));

        let next = reduce(&mut reducer, &DetectorFrame::with_hand(pinch())).unwrap();
        let cursor = next.cursor.unwrap();
        assert!(cursor.x.is_finite() && cursor.y.is_finite());
        assert_eq!(next.cursor, first.cursor);
    }

    #[test]
    fn emission_predicate() {
        let mut state = TrackingState {
            is_tracking: true,
            gesture: Gesture::Victory,
            ..TrackingState::default()
        };
        assert!(should_emit(Gesture::None, &state, false));
        assert!(!should_emit(Gesture::Victory, &state, false));
        assert!(should_emit(Gesture::Victory, &state, true));

        state.gesture = Gesture::Pinch;
        assert!(should_emit(Gesture::Pinch, &state, false));
        state.gesture = Gesture::Grab;
        assert!(should_emit(Gesture::Grab, &state, false));
    }

    #[test]
    fn static_gestures_emit_once() {
        let mut reducer = reducer();
        let frame = DetectorFrame::with_hand(open_hand());

        let first = reduce(&mut reducer, &frame).unwrap();
        assert_eq!(first.gesture, Gesture::OpenHand);
        assert!(reduce(&mut reducer, &frame).is_none());
    }

    #[test]
    fn continuous_gestures_emit_every_frame() {
        let mut reducer = reducer();
        let frame = DetectorFrame::with_hand(pinch());
        for _ in 0..3 {
            let state = reduce(&mut reducer, &frame).unwrap();
            assert_eq!(state.gesture, Gesture::Pinch);
        }
    }

    #[test]
    fn hand_loss_emits_none_once() {
        let mut reducer = reducer();
        assert!(reduce(&mut reducer, &DetectorFrame::empty()).is_none());

        reduce(&mut reducer, &DetectorFrame::with_hand(point())).unwrap();
        let lost = reduce(&mut reducer, &DetectorFrame::empty()).unwrap();
        assert_eq!(lost, TrackingState::hand_lost());
        assert!(lost.landmarks.is_empty());
        assert_eq!(lost.confidence, 0.0);

        assert!(reduce(&mut reducer, &DetectorFrame::empty()).is_none());
    }

    #[test]
    fn cursor_is_smoothed_and_scan_point_is_not() {
        let mut reducer = reducer();
        let first = reduce(&mut reducer, &DetectorFrame::with_hand(pinch())).unwrap();
        let start = first.cursor.unwrap();

        let mut moved = pinch();
        for landmark in &mut moved {
            landmark.x += 0.1;
        }
        let second = reduce(&mut reducer, &DetectorFrame::with_hand(moved)).unwrap();

        let cursor = second.cursor.unwrap();
        assert!((cursor.x - (start.x + 0.06)).abs() < 1e-5);
        let scan = second.scan_point.unwrap();
        assert!((scan.x - (start.x + 0.1)).abs() < 1e-5);
    }

    #[test]
    fn scan_point_follows_gesture() {
        let mut reducer = reducer();
        let hand = point();
        let state = reduce(&mut reducer, &DetectorFrame::with_hand(hand.clone())).unwrap();
        assert_eq!(state.scan_point, Some(hand[landmark::INDEX_TIP].planar()));

        let hand = fist();
        let state = reduce(&mut reducer, &DetectorFrame::with_hand(hand.clone())).unwrap();
        let palm = planar_centroid(landmark::PALM.iter().map(|&i| &hand[i]));
        assert_eq!(state.scan_point, Some(palm));
    }

    #[test]
    fn sampling_emits_continuously_with_color() {
        let frame_pixels = RgbImage::from_pixel(64, 64, Rgb([30, 140, 60]));
        let mut reducer = reducer();
        reducer.set_sampling(true);

        let frame = DetectorFrame::with_hand(open_hand());
        for _ in 0..2 {
            let state = reducer
                .reduce(&frame, Some(&frame_pixels), &square(), &GestureSettings::default())
                .unwrap();
            assert_eq!(state.sampled_color, Some(Color::rgb(30, 140, 60)));
        }
        assert_eq!(reducer.sampler().history_len(), 2);

        reducer.set_sampling(false);
        assert!(reducer
            .reduce(&frame, Some(&frame_pixels), &square(), &GestureSettings::default())
            .is_none());
    }

    #[test]
    fn grab_samples_a_wider_window_than_point() {
        // Red patches sit under the palm centre and the pointing index tip on
        // a blue frame. Each patch covers the 8 px window but not the 30 px one.
        let red = Rgb([200, 40, 40]);
        let frame_pixels = RgbImage::from_fn(200, 200, |x, y| {
            let palm = (92..=108).contains(&x) && (92..=108).contains(&y);
            let index_tip = (88..=112).contains(&x) && (28..=52).contains(&y);
            if palm || index_tip {
                red
            } else {
                Rgb([40, 40, 200])
            }
        });
        let settings = GestureSettings::default();

        let mut pointing = reducer();
        pointing.set_sampling(true);
        let frame = DetectorFrame::with_hand(point());
        let state = pointing.reduce(&frame, Some(&frame_pixels), &square(), &settings).unwrap();
        assert_eq!(state.gesture, Gesture::Point);
        assert_eq!(state.sampled_color, Some(Color::rgb(200, 40, 40)));

        // 289 red pixels out of a 61 x 61 window.
        let mut grabbing = reducer();
        grabbing.set_sampling(true);
        let frame = DetectorFrame::with_hand(fist());
        let state = grabbing.reduce(&frame, Some(&frame_pixels), &square(), &settings).unwrap();
        assert_eq!(state.gesture, Gesture::Grab);
        assert_eq!(state.sampled_color, Some(Color::rgb(52, 40, 188)));
    }

    #[test]
    fn sampler_history_survives_sampling_toggles() {
        let red = RgbImage::from_pixel(64, 64, Rgb([200, 40, 40]));
        let blue = RgbImage::from_pixel(64, 64, Rgb([40, 40, 200]));
        let settings = GestureSettings::default();
        let frame = DetectorFrame::with_hand(open_hand());

        let mut reducer = reducer();
        reducer.set_sampling(true);
        reducer.reduce(&frame, Some(&red), &square(), &settings).unwrap();
        reducer.set_sampling(false);
        reducer.set_sampling(true);
        assert_eq!(reducer.sampler().history_len(), 1);

        let state = reducer.reduce(&frame, Some(&blue), &square(), &settings).unwrap();
        assert_eq!(state.sampled_color, Some(Color::rgb(120, 40, 120)));
    }

    #[test]
    fn frame_rate_meter_counts_intervals() {
        let start = Instant::now();
        let mut meter = FrameRateMeter::new();
        assert_eq!(meter.fps(), 0);

        for i in 0..=30u64 {
            meter.tick(start + Duration::from_millis(i * 1000 / 30));
        }
        assert_eq!(meter.fps(), 30);

        for i in 31..=60u64 {
            meter.tick(start + Duration::from_millis(i * 1000 / 30));
        }
        assert_eq!(meter.fps(), 30);
    }
}
