//! Saving and loading the voxel world.
//!
//! The in-memory [`WorldStore`] is the source of truth. Local snapshots are
//! full rewrites coalesced by [`SaveDebouncer`]; the remote service is told
//! about each edit and its failures are only logged.

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::PathBuf,
    time::{Duration, Instant},
};

use tracing::{info, warn};

use crate::{
    world::{GridCoord, VoxelRecord, WorldStore},
    Result, SculptError,
};

/// Fixed key the local snapshot is stored under.
pub const WORLD_STORAGE_KEY: &str = "gesture-sculpt.world";

/// Local snapshot storage.
pub trait SnapshotStore {
    /// Returns `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Vec<VoxelRecord>>>;

    fn save(&mut self, records: &[VoxelRecord]) -> Result<()>;
}

/// Remote world service.
pub trait WorldService {
    fn get_world(&mut self, world_id: &str) -> Result<Vec<VoxelRecord>>;

    fn place_voxel(&mut self, record: &VoxelRecord) -> Result<bool>;

    fn delete_voxel(&mut self, id: &str) -> Result<bool>;
}

/// Snapshot store backed by a JSON file holding an array of voxel records.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<VoxelRecord>>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let records = serde_json::from_slice(&bytes)
            .map_err(|err| SculptError::MalformedSnapshot(err.to_string()))?;
        Ok(Some(records))
    }

    fn save(&mut self, records: &[VoxelRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(records)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Snapshot store that keeps the last save in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    records: Option<Vec<VoxelRecord>>,
    saves: usize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<VoxelRecord>) -> Self {
        Self {
            records: Some(records),
            saves: 0,
        }
    }

    /// Number of times [`SnapshotStore::save`] has been called.
    pub fn saves(&self) -> usize {
        self.saves
    }

    pub fn records(&self) -> Option<&[VoxelRecord]> {
        self.records.as_deref()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<Vec<VoxelRecord>>> {
        Ok(self.records.clone())
    }

    fn save(&mut self, records: &[VoxelRecord]) -> Result<()> {
        self.records = Some(records.to_vec());
        self.saves += 1;
        Ok(())
    }
}

/// In-process stand-in for the remote world service, keyed by world id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorldService {
    world_id: String,
    worlds: HashMap<String, WorldStore>,
}

impl InMemoryWorldService {
    /// Service whose edits land in `world_id`.
    pub fn new(world_id: impl Into<String>) -> Self {
        Self {
            world_id: world_id.into(),
            worlds: HashMap::new(),
        }
    }

    pub fn with_world(mut self, world_id: impl Into<String>, records: Vec<VoxelRecord>) -> Self {
        self.worlds
            .insert(world_id.into(), WorldStore::from_records(records));
        self
    }

    pub fn world(&self, world_id: &str) -> Option<&WorldStore> {
        self.worlds.get(world_id)
    }
}

impl WorldService for InMemoryWorldService {
    fn get_world(&mut self, world_id: &str) -> Result<Vec<VoxelRecord>> {
        self.worlds
            .get(world_id)
            .map(WorldStore::snapshot)
            .ok_or_else(|| SculptError::Remote(format!("unknown world `{world_id}`")))
    }

    fn place_voxel(&mut self, record: &VoxelRecord) -> Result<bool> {
        let world = self.worlds.entry(self.world_id.clone()).or_default();
        Ok(world.insert_new(record.clone()))
    }

    fn delete_voxel(&mut self, id: &str) -> Result<bool> {
        let coord: GridCoord = id.parse()?;
        let world = self.worlds.entry(self.world_id.clone()).or_default();
        Ok(world.remove(coord).is_some())
    }
}

/// Coalesces bursts of mutations into a single save after a quiet period.
#[derive(Debug, Clone)]
pub struct SaveDebouncer {
    quiet: Duration,
    last_change: Option<Instant>,
}

impl SaveDebouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last_change: None,
        }
    }

    /// Records a mutation at `now`, restarting the quiet period.
    pub fn touch(&mut self, now: Instant) {
        self.last_change = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_change.is_some()
    }

    /// Whether a pending save has been quiet for long enough.
    pub fn is_due(&self, now: Instant) -> bool {
        self.last_change
            .map(|changed| now.saturating_duration_since(changed) >= self.quiet)
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.last_change = None;
    }
}

/// Where a loaded world came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldOrigin {
    Local,
    Remote,
    Empty,
}

/// Loads the initial world: the local snapshot if present and well formed,
/// otherwise the remote world, otherwise an empty world.
pub fn load_world(
    local: &dyn SnapshotStore,
    remote: Option<&mut dyn WorldService>,
    world_id: &str,
) -> (WorldStore, WorldOrigin) {
    match local.load() {
        Ok(Some(records)) => {
            info!(voxels = records.len(), "loaded local world snapshot");
            return (WorldStore::from_records(records), WorldOrigin::Local);
        }
        Ok(None) => {}
        Err(err) => warn!(%err, "discarding unreadable local world snapshot"),
    }

    if let Some(remote) = remote {
        match remote.get_world(world_id) {
            Ok(records) => {
                info!(world_id, voxels = records.len(), "loaded remote world");
                return (WorldStore::from_records(records), WorldOrigin::Remote);
            }
            Err(err) => warn!(world_id, %err, "remote world fetch failed"),
        }
    }

    info!("starting with an empty world");
    (WorldStore::new(), WorldOrigin::Empty)
}
