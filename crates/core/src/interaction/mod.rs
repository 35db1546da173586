use std::{
    fmt,
    str::FromStr,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    editor::WorldEditor,
    gesture::{Gesture, GestureSettings},
    sampler::Color,
    tracking::TrackingState,
    world::GridCoord,
    SculptError,
};

/// Default debounce between two accepted edits.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(150);

/// Editing mode chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    View,
    #[default]
    Build,
    Delete,
    Color,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "VIEW",
            Self::Build => "BUILD",
            Self::Delete => "DELETE",
            Self::Color => "COLOR",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = SculptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "view" => Ok(Self::View),
            "build" => Ok(Self::Build),
            "delete" => Ok(Self::Delete),
            "color" | "colour" => Ok(Self::Color),
            _ => Err(SculptError::msg(format!("unknown mode `{s}`"))),
        }
    }
}

/// World edit a gesture asks for in a given mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditIntent {
    Place,
    Delete,
}

/// Mode × gesture rule table. GRAB in BUILD mode is reserved for color
/// sampling and never edits.
pub fn edit_intent(mode: Mode, gesture: Gesture) -> Option<EditIntent> {
    match (mode, gesture) {
        (Mode::Build | Mode::Color, Gesture::Pinch) => Some(EditIntent::Place),
        (Mode::Delete, Gesture::Grab) => Some(EditIntent::Delete),
        _ => None,
    }
}

/// Whether a sampled color is adopted as the selected color.
pub fn should_pick_color(mode: Mode, gesture: Gesture, color: Color) -> bool {
    if color.is_white() || color.is_black() {
        return false;
    }
    mode == Mode::Color || (mode == Mode::Build && gesture == Gesture::Grab)
}

/// What happened to the edit part of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The state did not ask for an edit.
    Idle,
    BelowConfidence,
    CoolingDown,
    /// Place target already occupied.
    Occupied(GridCoord),
    /// Delete target already empty.
    Vacant(GridCoord),
    Placed(GridCoord),
    Deleted(GridCoord),
}

impl EditOutcome {
    pub fn changed_world(&self) -> bool {
        matches!(self, Self::Placed(_) | Self::Deleted(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub picked_color: Option<Color>,
    pub edit: EditOutcome,
}

impl DispatchOutcome {
    fn idle() -> Self {
        Self {
            picked_color: None,
            edit: EditOutcome::Idle,
        }
    }
}

/// Gates tracking states into world edits under mode, confidence and
/// cooldown rules.
#[derive(Debug, Clone)]
pub struct InteractionDispatcher {
    mode: Mode,
    selected_color: Color,
    cooldown: Duration,
    last_action: Option<Instant>,
}

impl InteractionDispatcher {
    pub fn new(mode: Mode, selected_color: Color, cooldown: Duration) -> Self {
        Self {
            mode,
            selected_color,
            cooldown,
            last_action: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            info!(from = %self.mode, to = %mode, "mode changed");
        }
        self.mode = mode;
    }

    pub fn selected_color(&self) -> Color {
        self.selected_color
    }

    pub fn set_selected_color(&mut self, color: Color) {
        self.selected_color = color;
    }

    pub fn last_action(&self) -> Option<Instant> {
        self.last_action
    }

    fn cooling_down(&self, now: Instant) -> bool {
        self.last_action
            .map(|last| now.saturating_duration_since(last) < self.cooldown)
            .unwrap_or(false)
    }

    /// Handles one emitted state against the cursor cell.
    pub fn dispatch(
        &mut self,
        state: &TrackingState,
        cell: Option<GridCoord>,
        settings: &GestureSettings,
        editor: &mut WorldEditor,
        now: Instant,
    ) -> DispatchOutcome {
        if !state.is_tracking {
            return DispatchOutcome::idle();
        }

        let picked_color = state
            .sampled_color
            .filter(|color| should_pick_color(self.mode, state.gesture, *color));
        if let Some(color) = picked_color {
            if color != self.selected_color {
                debug!(%color, "picked sampled color");
            }
            self.selected_color = color;
        }

        let edit = self.attempt_edit(state, cell, settings, editor, now);
        DispatchOutcome { picked_color, edit }
    }

    fn attempt_edit(
        &mut self,
        state: &TrackingState,
        cell: Option<GridCoord>,
        settings: &GestureSettings,
        editor: &mut WorldEditor,
        now: Instant,
    ) -> EditOutcome {
        let (Some(intent), Some(cell)) = (edit_intent(self.mode, state.gesture), cell) else {
            return EditOutcome::Idle;
        };

        if state.confidence < settings.min_confidence {
            debug!(confidence = state.confidence, "edit dropped below confidence");
            return EditOutcome::BelowConfidence;
        }

        if self.cooling_down(now) {
            return EditOutcome::CoolingDown;
        }

        let outcome = match intent {
            EditIntent::Place => match editor.place(cell, self.selected_color, true, now) {
                Some(_) => EditOutcome::Placed(cell),
                None => EditOutcome::Occupied(cell),
            },
            EditIntent::Delete => match editor.delete(cell, true, now) {
                Some(_) => EditOutcome::Deleted(cell),
                None => EditOutcome::Vacant(cell),
            },
        };

        if outcome.changed_world() {
            self.last_action = Some(now);
        }
        outcome
    }
}
