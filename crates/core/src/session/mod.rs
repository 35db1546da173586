//! Per-frame facade tying the tracking, interaction and world layers together.
//!
//! Everything runs on the caller's thread inside [`SculptSession::tick`]; the
//! tick never fails and degrades to "no change this frame" instead.

use std::time::Instant;

use tracing::{info, warn};

use crate::{
    config::AppConfig,
    editor::WorldEditor,
    gesture::{Gesture, GestureSettings},
    history::{HistoryAction, HistoryManager},
    interaction::{DispatchOutcome, InteractionDispatcher, Mode},
    mapping::{GridProjector, Viewport},
    persistence::{load_world, SnapshotStore, WorldOrigin, WorldService},
    sampler::{Color, ColorSampler, PixelSource},
    tracking::{
        DetectorFault, DetectorFrame, FrameRateMeter, ReducerOptions, TrackingReducer,
        TrackingState, TrackingStatus,
    },
    world::{GridCoord, WorldStore},
    Result,
};

/// Result of one tick, for the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// State emitted this frame, if the reducer decided to emit.
    pub state: Option<TrackingState>,
    pub cursor_cell: Option<GridCoord>,
    pub dispatch: Option<DispatchOutcome>,
    /// Whether a debounced snapshot was written during this tick.
    pub saved: bool,
}

#[derive(Debug)]
pub struct SculptSession {
    settings: GestureSettings,
    viewport: Viewport,
    grid: GridProjector,
    reducer: TrackingReducer,
    dispatcher: InteractionDispatcher,
    editor: WorldEditor,
    status: TrackingStatus,
    fps: FrameRateMeter,
    gesture: Gesture,
    cursor_cell: Option<GridCoord>,
}

impl SculptSession {
    /// Builds a session around an already loaded world.
    pub fn new(
        config: &AppConfig,
        world: WorldStore,
        snapshots: Box<dyn SnapshotStore>,
        remote: Option<Box<dyn WorldService>>,
    ) -> Self {
        let history = match config.persistence.history_capacity {
            Some(capacity) => HistoryManager::with_capacity(capacity),
            None => HistoryManager::new(),
        };
        let mut reducer = TrackingReducer::new(
            ReducerOptions::from(config),
            ColorSampler::new(config.sampling.history_capacity),
        );
        reducer.set_sampling(config.sampling.enabled);

        Self {
            settings: config.gesture,
            viewport: config.tracking.viewport(),
            grid: config.grid.projector(),
            reducer,
            dispatcher: InteractionDispatcher::new(
                config.interaction.initial_mode,
                config.interaction.initial_color,
                config.interaction.cooldown(),
            ),
            editor: WorldEditor::new(
                world,
                history,
                snapshots,
                remote,
                config.persistence.save_debounce(),
            ),
            status: TrackingStatus::Running,
            fps: FrameRateMeter::new(),
            gesture: Gesture::None,
            cursor_cell: None,
        }
    }

    /// Loads the world (local snapshot, then remote, then empty) and builds a
    /// session around it.
    pub fn open(
        config: &AppConfig,
        snapshots: Box<dyn SnapshotStore>,
        mut remote: Option<Box<dyn WorldService>>,
    ) -> (Self, WorldOrigin) {
        let (world, origin) = load_world(
            snapshots.as_ref(),
            remote
                .as_mut()
                .map(|service| service.as_mut() as &mut dyn WorldService),
            &config.persistence.world_id,
        );
        (Self::new(config, world, snapshots, remote), origin)
    }

    /// Processes one detector frame.
    pub fn tick(
        &mut self,
        frame: &DetectorFrame,
        pixels: Option<&dyn PixelSource>,
        now: Instant,
    ) -> TickReport {
        let mut report = TickReport::default();

        if self.status.accepts_frames() {
            self.fps.tick(now);

            let reduced = self.reducer.reduce(frame, pixels, &self.viewport, &self.settings);
            if let Some(state) = reduced {
                self.gesture = state.gesture;
                self.cursor_cell = state.cursor.map(|cursor| self.grid.cell_at(cursor));

                let outcome = self.dispatcher.dispatch(
                    &state,
                    self.cursor_cell,
                    &self.settings,
                    &mut self.editor,
                    now,
                );
                report.dispatch = Some(outcome);
                report.state = Some(state);
            }
            report.cursor_cell = self.cursor_cell;
        }

        report.saved = self.editor.flush_if_due(now);
        report
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    /// Stops tracking until [`SculptSession::retry`] is called.
    pub fn report_fault(&mut self, fault: DetectorFault) {
        warn!(%fault, "tracking disabled");
        self.status = TrackingStatus::Faulted(fault);
        self.gesture = Gesture::None;
    }

    pub fn retry(&mut self) {
        if let TrackingStatus::Faulted(fault) = self.status {
            info!(%fault, "retrying detector");
        }
        self.status = TrackingStatus::Running;
    }

    pub fn pause(&mut self) {
        self.status = TrackingStatus::Paused;
    }

    pub fn resume(&mut self) {
        if self.status == TrackingStatus::Paused {
            self.status = TrackingStatus::Running;
        }
    }

    pub fn mode(&self) -> Mode {
        self.dispatcher.mode()
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.dispatcher.set_mode(mode);
    }

    pub fn selected_color(&self) -> Color {
        self.dispatcher.selected_color()
    }

    pub fn set_selected_color(&mut self, color: Color) {
        self.dispatcher.set_selected_color(color);
    }

    pub fn settings(&self) -> &GestureSettings {
        &self.settings
    }

    /// Thresholds take effect on the next tick.
    pub fn update_settings(&mut self, settings: GestureSettings) {
        self.settings = settings;
    }

    pub fn set_sampling(&mut self, enabled: bool) {
        self.reducer.set_sampling(enabled);
    }

    pub fn is_sampling(&self) -> bool {
        self.reducer.is_sampling()
    }

    pub fn undo(&mut self, now: Instant) -> Option<HistoryAction> {
        self.editor.undo(now)
    }

    pub fn redo(&mut self, now: Instant) -> Option<HistoryAction> {
        self.editor.redo(now)
    }

    /// Writes any pending snapshot immediately.
    pub fn flush(&mut self) -> Result<()> {
        if self.editor.has_pending_save() {
            self.editor.flush()?;
        }
        Ok(())
    }

    pub fn world(&self) -> &WorldStore {
        self.editor.world()
    }

    pub fn history(&self) -> &HistoryManager {
        self.editor.history()
    }

    /// Label of the most recently emitted gesture.
    pub fn gesture_label(&self) -> &'static str {
        self.gesture.as_str()
    }

    pub fn cursor_cell(&self) -> Option<GridCoord> {
        self.cursor_cell
    }

    pub fn fps(&self) -> u32 {
        self.fps.fps()
    }
}
