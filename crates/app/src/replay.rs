use std::{
    fs,
    path::Path,
    time::{Duration, Instant},
};

use gesture_sculpt_core::{
    Color, DetectorFault, DetectorFrame, Landmark, Mode, PixelSource, Result, SculptSession,
};
use serde::{Deserialize, Serialize};

/// Detector output captured from a live session, one entry per frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recording {
    pub frames: Vec<RecordedFrame>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Milliseconds since the start of the recording.
    pub at_ms: u64,
    /// The tracked hand, if one was visible.
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
    /// UI action taken just before this frame was processed.
    #[serde(default)]
    pub command: Option<Command>,
}

/// User interface actions that can be interleaved with frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    SetMode(Mode),
    SetColor(Color),
    Sampling(bool),
    Undo,
    Redo,
    Fault(DetectorFault),
    Retry,
    Pause,
    Resume,
}

impl Recording {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub emitted: usize,
    pub edits: usize,
}

/// Feeds every frame through the session on a synthetic clock anchored at
/// `start`.
pub fn replay(
    session: &mut SculptSession,
    recording: &Recording,
    pixels: Option<&dyn PixelSource>,
    start: Instant,
) -> ReplaySummary {
    let mut summary = ReplaySummary::default();

    for frame in &recording.frames {
        let now = start + Duration::from_millis(frame.at_ms);
        if let Some(command) = &frame.command {
            apply(session, command, now);
        }

        let detector = frame
            .landmarks
            .clone()
            .map(DetectorFrame::with_hand)
            .unwrap_or_default();
        let report = session.tick(&detector, pixels, now);

        summary.frames += 1;
        if report.state.is_some() {
            summary.emitted += 1;
        }
        if report
            .dispatch
            .as_ref()
            .is_some_and(|outcome| outcome.edit.changed_world())
        {
            summary.edits += 1;
        }
    }

    summary
}

fn apply(session: &mut SculptSession, command: &Command, now: Instant) {
    tracing::debug!(?command, "replaying command");
    match command {
        Command::SetMode(mode) => session.set_mode(*mode),
        Command::SetColor(color) => session.set_selected_color(*color),
        Command::Sampling(enabled) => session.set_sampling(*enabled),
        Command::Undo => {
            session.undo(now);
        }
        Command::Redo => {
            session.redo(now);
        }
        Command::Fault(fault) => session.report_fault(*fault),
        Command::Retry => session.retry(),
        Command::Pause => session.pause(),
        Command::Resume => session.resume(),
    }
}

#[cfg(test)]
mod tests {
    use gesture_sculpt_core::{AppConfig, GridCoord, MemorySnapshotStore, WorldStore};

    use super::*;

    fn pinch_pose() -> Vec<Landmark> {
        let mut pose = vec![Landmark::new(0.5, 0.5, 0.0); 21];
        pose[4] = Landmark::new(0.51, 0.2, 0.0);
        pose[8] = Landmark::new(0.52, 0.2, 0.0);
        pose[12] = Landmark::new(0.51, 0.12, 0.0);
        pose[16] = Landmark::new(0.52, 0.17, 0.0);
        pose[20] = Landmark::new(0.53, 0.22, 0.0);
        pose
    }

    fn session() -> SculptSession {
        SculptSession::new(
            &AppConfig::default(),
            WorldStore::new(),
            Box::new(MemorySnapshotStore::new()),
            None,
        )
    }

    #[test]
    fn parses_recording_json() {
        let json = r##"{
            "frames": [
                { "at_ms": 0, "command": { "set_mode": "COLOR" } },
                { "at_ms": 16, "command": "undo" },
                { "at_ms": 33, "command": { "set_color": "#ff8800" }, "landmarks": null }
            ]
        }"##;
        let recording: Recording = serde_json::from_str(json).unwrap();
        assert_eq!(recording.frames.len(), 3);
        assert_eq!(recording.frames[0].command, Some(Command::SetMode(Mode::Color)));
        assert_eq!(recording.frames[1].command, Some(Command::Undo));
        assert_eq!(
            recording.frames[2].command,
            Some(Command::SetColor(Color::rgb(0xff, 0x88, 0x00)))
        );
    }

    #[test]
    fn replays_place_then_undo() {
        let recording = Recording {
            frames: vec![
                RecordedFrame {
                    at_ms: 0,
                    landmarks: Some(pinch_pose()),
                    command: None,
                },
                RecordedFrame {
                    at_ms: 33,
                    landmarks: None,
                    command: None,
                },
                RecordedFrame {
                    at_ms: 66,
                    landmarks: None,
                    command: Some(Command::Undo),
                },
            ],
        };

        let mut session = session();
        let start = Instant::now();
        let summary = replay(&mut session, &recording, None, start);
        assert_eq!(
            summary,
            ReplaySummary {
                frames: 3,
                emitted: 2,
                edits: 1
            }
        );
        assert!(session.world().is_empty());

        session.redo(start);
        assert_eq!(
            session.world().get(GridCoord::new(0, 7, 0)).map(|voxel| voxel.color),
            Some(session.selected_color())
        );
    }

    #[test]
    fn paused_frames_are_not_processed() {
        let hand = RecordedFrame {
            at_ms: 0,
            landmarks: Some(pinch_pose()),
            command: Some(Command::Pause),
        };
        let resumed = RecordedFrame {
            at_ms: 500,
            command: Some(Command::Resume),
            ..hand.clone()
        };
        let recording = Recording {
            frames: vec![hand, resumed],
        };

        let mut session = session();
        let summary = replay(&mut session, &recording, None, Instant::now());
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.emitted, 1);
        assert_eq!(summary.edits, 1);
        assert_eq!(session.world().len(), 1);
    }
}
