//! Core library for the Gesture Sculpt voxel editor.
//!
//! A camera-tracked hand drives edits to a sparse voxel world. Each module
//! owns one stage of the per-frame pipeline: landmarks are classified into
//! gestures, reduced into edge-triggered tracking states, gated by the
//! interaction dispatcher and finally applied to the world with undo/redo
//! history and debounced persistence. Rendering, camera capture and the
//! landmark model itself live outside this crate.

pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod history;
pub mod interaction;
pub mod mapping;
pub mod persistence;
pub mod sampler;
pub mod session;
pub mod tracking;
pub mod world;

pub use config::{AppConfig, InteractionConfig, PersistenceConfig, SamplingConfig, TrackingConfig};
pub use editor::WorldEditor;
pub use error::{Result, SculptError};
pub use geometry::{Landmark, Point2};
pub use gesture::{classify, Classification, Gesture, GestureSettings};
pub use history::{HistoryAction, HistoryManager};
pub use interaction::{DispatchOutcome, EditOutcome, InteractionDispatcher, Mode};
pub use mapping::{cover_fit_to_screen, GridProjector, Viewport};
pub use persistence::{
    load_world, InMemoryWorldService, JsonFileStore, MemorySnapshotStore, SnapshotStore,
    WorldOrigin, WorldService,
};
pub use sampler::{Color, ColorSampler, PixelSource};
pub use session::{SculptSession, TickReport};
pub use tracking::{DetectorFault, DetectorFrame, TrackingReducer, TrackingState, TrackingStatus};
pub use world::{GridCoord, VoxelRecord, WorldStore};
