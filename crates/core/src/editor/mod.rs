use std::{
    fmt,
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use crate::{
    history::{HistoryAction, HistoryManager},
    persistence::{SaveDebouncer, SnapshotStore, WorldService},
    sampler::Color,
    world::{GridCoord, VoxelRecord, WorldStore},
    Result,
};

/// Owns the world and its history and keeps persistence informed of every
/// change. Remote notifications are fire-and-forget and local snapshots are
/// written once edits have been quiet for the debounce interval.
pub struct WorldEditor {
    world: WorldStore,
    history: HistoryManager,
    snapshots: Box<dyn SnapshotStore>,
    remote: Option<Box<dyn WorldService>>,
    debouncer: SaveDebouncer,
}

impl WorldEditor {
    pub fn new(
        world: WorldStore,
        history: HistoryManager,
        snapshots: Box<dyn SnapshotStore>,
        remote: Option<Box<dyn WorldService>>,
        save_debounce: Duration,
    ) -> Self {
        Self {
            world,
            history,
            snapshots,
            remote,
            debouncer: SaveDebouncer::new(save_debounce),
        }
    }

    pub fn world(&self) -> &WorldStore {
        &self.world
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn has_pending_save(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Places a voxel unless the cell is occupied. Returns the new record.
    pub fn place(
        &mut self,
        coord: GridCoord,
        color: Color,
        record: bool,
        now: Instant,
    ) -> Option<VoxelRecord> {
        let voxel = VoxelRecord::new(coord, color);
        if !self.world.insert_new(voxel.clone()) {
            debug!(%coord, "place skipped, cell occupied");
            return None;
        }

        info!(%coord, %color, "voxel placed");
        if record {
            self.history.record(HistoryAction::Place(voxel.clone()));
        }
        self.notify_place(&voxel);
        self.debouncer.touch(now);
        Some(voxel)
    }

    /// Deletes the voxel in `coord`, if any. Returns the removed record.
    pub fn delete(&mut self, coord: GridCoord, record: bool, now: Instant) -> Option<VoxelRecord> {
        let Some(voxel) = self.world.remove(coord) else {
            debug!(%coord, "delete skipped, cell empty");
            return None;
        };

        info!(%coord, "voxel deleted");
        if record {
            self.history.record(HistoryAction::Delete(voxel.clone()));
        }
        self.notify_delete(&voxel.id());
        self.debouncer.touch(now);
        Some(voxel)
    }

    pub fn undo(&mut self, now: Instant) -> Option<HistoryAction> {
        let action = self.history.undo(&mut self.world)?;
        info!(?action, "undo");
        match &action {
            HistoryAction::Place(voxel) => self.notify_delete(&voxel.id()),
            HistoryAction::Delete(voxel) => self.notify_place(voxel),
        }
        self.debouncer.touch(now);
        Some(action)
    }

    pub fn redo(&mut self, now: Instant) -> Option<HistoryAction> {
        let action = self.history.redo(&mut self.world)?;
        info!(?action, "redo");
        match &action {
            HistoryAction::Place(voxel) => self.notify_place(voxel),
            HistoryAction::Delete(voxel) => self.notify_delete(&voxel.id()),
        }
        self.debouncer.touch(now);
        Some(action)
    }

    /// Writes the snapshot if edits have settled. Failures are logged and the
    /// save stays pending. Returns whether a snapshot was written.
    pub fn flush_if_due(&mut self, now: Instant) -> bool {
        if !self.debouncer.is_due(now) {
            return false;
        }

        match self.flush() {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "saving world snapshot failed");
                self.debouncer.touch(now);
                false
            }
        }
    }

    /// Writes the full snapshot immediately.
    pub fn flush(&mut self) -> Result<()> {
        let records = self.world.snapshot();
        self.snapshots.save(&records)?;
        self.debouncer.clear();
        debug!(voxels = records.len(), "world snapshot saved");
        Ok(())
    }

    fn notify_place(&mut self, voxel: &VoxelRecord) {
        if let Some(remote) = self.remote.as_mut() {
            match remote.place_voxel(voxel) {
                Ok(true) => {}
                Ok(false) => warn!(id = %voxel.id(), "remote service rejected place"),
                Err(err) => {
                    warn!(id = %voxel.id(), %err, "remote place failed, keeping local edit")
                }
            }
        }
    }

    fn notify_delete(&mut self, id: &str) {
        if let Some(remote) = self.remote.as_mut() {
            match remote.delete_voxel(id) {
                Ok(true) => {}
                Ok(false) => warn!(id, "remote service rejected delete"),
                Err(err) => warn!(id, %err, "remote delete failed, keeping local edit"),
            }
        }
    }
}

impl fmt::Debug for WorldEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldEditor")
            .field("voxels", &self.world.len())
            .field("history", &self.history)
            .field("remote", &self.remote.is_some())
            .field("debouncer", &self.debouncer)
            .finish()
    }
}
