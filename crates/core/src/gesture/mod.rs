//! Geometric gesture classification from a single hand pose.
//!
//! Rules are evaluated from [`RULES`] in priority order and the first match
//! wins. Confidence is fixed per rule and acts as a policy knob for the
//! interaction layer rather than a probability.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{distance, Landmark};

/// Number of landmarks in a complete hand pose.
pub const LANDMARK_COUNT: usize = 21;

/// Extension below which ring and pinky count as curled.
pub const CURL_THRESHOLD: f32 = 0.2;

/// Anatomical landmark indices used by the classifier and the tracker.
pub mod landmark {
    pub const WRIST: usize = 0;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_TIP: usize = 20;

    /// Wrist plus the four finger MCP joints.
    pub const PALM: [usize; 5] = [WRIST, INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP];
}

/// Discrete gesture recognised for one pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gesture {
    #[default]
    None,
    OpenHand,
    Pinch,
    Victory,
    Grab,
    ThumbsUp,
    Point,
}

impl Gesture {
    /// Label shown to the user.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::OpenHand => "OPEN_HAND",
            Self::Pinch => "PINCH",
            Self::Victory => "VICTORY",
            Self::Grab => "GRAB",
            Self::ThumbsUp => "THUMBS_UP",
            Self::Point => "POINT",
        }
    }

    /// Gestures that drive continuous place/delete attempts and therefore
    /// must reach the dispatcher on every frame.
    pub fn is_continuous(&self) -> bool {
        matches!(self, Self::Pinch | Self::Grab)
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds read by the classifier and the dispatcher on every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    /// Thumb-tip to index-tip distance below which the hand pinches.
    pub pinch_threshold: f32,
    /// Wrist-to-fingertip extension separating curled from extended fingers.
    pub grab_threshold: f32,
    /// Minimum classification confidence before an edit is allowed.
    pub min_confidence: f32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            pinch_threshold: 0.05,
            grab_threshold: 0.15,
            min_confidence: 0.6,
        }
    }
}

/// Output of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Classification {
    pub gesture: Gesture,
    pub confidence: f32,
}

impl Classification {
    pub const NONE: Classification = Classification {
        gesture: Gesture::None,
        confidence: 0.0,
    };
}

/// Wrist-relative measurements a rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandFeatures {
    pub thumb: f32,
    pub index: f32,
    pub middle: f32,
    pub ring: f32,
    pub pinky: f32,
    /// Thumb-tip to index-tip distance.
    pub pinch: f32,
}

impl HandFeatures {
    /// Extracts features from a pose. Returns `None` unless the pose holds
    /// exactly [`LANDMARK_COUNT`] landmarks.
    pub fn from_pose(pose: &[Landmark]) -> Option<Self> {
        if pose.len() != LANDMARK_COUNT {
            return None;
        }

        let wrist = &pose[landmark::WRIST];
        Some(Self {
            thumb: distance(wrist, &pose[landmark::THUMB_TIP]),
            index: distance(wrist, &pose[landmark::INDEX_TIP]),
            middle: distance(wrist, &pose[landmark::MIDDLE_TIP]),
            ring: distance(wrist, &pose[landmark::RING_TIP]),
            pinky: distance(wrist, &pose[landmark::PINKY_TIP]),
            pinch: distance(&pose[landmark::THUMB_TIP], &pose[landmark::INDEX_TIP]),
        })
    }

    fn ring_and_pinky_curled(&self) -> bool {
        self.ring < CURL_THRESHOLD && self.pinky < CURL_THRESHOLD
    }
}

/// One row of the priority table.
#[derive(Clone, Copy)]
pub struct GestureRule {
    pub gesture: Gesture,
    pub confidence: f32,
    pub matches: fn(&HandFeatures, &GestureSettings) -> bool,
}

impl fmt::Debug for GestureRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GestureRule")
            .field("gesture", &self.gesture)
            .field("confidence", &self.confidence)
            .finish()
    }
}

/// Priority-ordered rule table. GRAB precedes PINCH so a closed fist, whose
/// thumb and index tips also touch, is not read as a pinch.
pub const RULES: [GestureRule; 6] = [
    GestureRule {
        gesture: Gesture::Grab,
        confidence: 0.9,
        matches: is_grab,
    },
    GestureRule {
        gesture: Gesture::Pinch,
        confidence: 0.95,
        matches: is_pinch,
    },
    GestureRule {
        gesture: Gesture::Victory,
        confidence: 0.85,
        matches: is_victory,
    },
    GestureRule {
        gesture: Gesture::Point,
        confidence: 0.8,
        matches: is_point,
    },
    GestureRule {
        gesture: Gesture::ThumbsUp,
        confidence: 0.8,
        matches: is_thumbs_up,
    },
    GestureRule {
        gesture: Gesture::OpenHand,
        confidence: 0.95,
        matches: is_open_hand,
    },
];

fn is_grab(f: &HandFeatures, s: &GestureSettings) -> bool {
    f.index < s.grab_threshold
        && f.middle < s.grab_threshold
        && f.ring < s.grab_threshold
        && f.pinky < s.grab_threshold
}

fn is_pinch(f: &HandFeatures, s: &GestureSettings) -> bool {
    f.pinch < s.pinch_threshold
}

fn is_victory(f: &HandFeatures, s: &GestureSettings) -> bool {
    f.index > s.grab_threshold && f.middle > s.grab_threshold && f.ring_and_pinky_curled()
}

fn is_point(f: &HandFeatures, s: &GestureSettings) -> bool {
    f.index > s.grab_threshold && f.middle <= s.grab_threshold && f.ring_and_pinky_curled()
}

fn is_thumbs_up(f: &HandFeatures, s: &GestureSettings) -> bool {
    f.thumb > CURL_THRESHOLD
        && f.index <= s.grab_threshold
        && f.middle <= s.grab_threshold
        && f.ring <= CURL_THRESHOLD
        && f.pinky <= CURL_THRESHOLD
}

fn is_open_hand(f: &HandFeatures, s: &GestureSettings) -> bool {
    f.index > s.grab_threshold
        && f.middle > s.grab_threshold
        && f.ring > CURL_THRESHOLD
        && f.pinky > CURL_THRESHOLD
}

/// Evaluates the rule table against already extracted features.
pub fn classify_features(features: &HandFeatures, settings: &GestureSettings) -> Classification {
    RULES
        .iter()
        .find(|rule| (rule.matches)(features, settings))
        .map(|rule| Classification {
            gesture: rule.gesture,
            confidence: rule.confidence,
        })
        .unwrap_or(Classification::NONE)
}

/// Classifies a pose. Absent or malformed poses yield [`Classification::NONE`].
pub fn classify(pose: Option<&[Landmark]>, settings: &GestureSettings) -> Classification {
    pose.and_then(HandFeatures::from_pose)
        .map(|features| classify_features(&features, settings))
        .unwrap_or(Classification::NONE)
}
