use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::world::{VoxelRecord, WorldStore};

/// A recorded world edit. Each variant carries a full snapshot of the
/// affected voxel so it can be restored after deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "voxel", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Place(VoxelRecord),
    Delete(VoxelRecord),
}

impl HistoryAction {
    /// Applies the action to `world` without guards.
    fn apply(&self, world: &mut WorldStore) {
        match self {
            Self::Place(voxel) => {
                world.put(voxel.clone());
            }
            Self::Delete(voxel) => {
                world.remove(voxel.coord());
            }
        }
    }

    /// Applies the inverse of the action to `world` without guards.
    fn revert(&self, world: &mut WorldStore) {
        match self {
            Self::Place(voxel) => {
                world.remove(voxel.coord());
            }
            Self::Delete(voxel) => {
                world.put(voxel.clone());
            }
        }
    }
}

/// Linear undo/redo stacks.
///
/// Recording a new action discards the redo stack. With a capacity set, the
/// oldest undo entry is dropped once the bound is exceeded.
#[derive(Debug, Clone, Default)]
pub struct HistoryManager {
    past: VecDeque<HistoryAction>,
    future: Vec<HistoryAction>,
    capacity: Option<usize>,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    pub fn record(&mut self, action: HistoryAction) {
        self.future.clear();
        self.past.push_back(action);
        if let Some(capacity) = self.capacity {
            while self.past.len() > capacity {
                self.past.pop_front();
            }
        }
    }

    /// Reverts the most recent action. Returns the action that was undone.
    pub fn undo(&mut self, world: &mut WorldStore) -> Option<HistoryAction> {
        let action = self.past.pop_back()?;
        action.revert(world);
        self.future.push(action.clone());
        Some(action)
    }

    /// Reapplies the most recently undone action.
    pub fn redo(&mut self, world: &mut WorldStore) -> Option<HistoryAction> {
        let action = self.future.pop()?;
        action.apply(world);
        self.past.push_back(action.clone());
        Some(action)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past(&self) -> impl Iterator<Item = &HistoryAction> {
        self.past.iter()
    }

    pub fn future(&self) -> &[HistoryAction] {
        &self.future
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sampler::Color, world::GridCoord};

    fn voxel(x: i32) -> VoxelRecord {
        VoxelRecord::new(GridCoord::new(x, 0, 0), Color::rgb(10, 20, 30))
    }

    fn place(world: &mut WorldStore, history: &mut HistoryManager, record: VoxelRecord) {
        assert!(world.insert_new(record.clone()));
        history.record(HistoryAction::Place(record));
    }

    #[test]
    fn undo_on_empty_history_is_noop() {
        let mut world = WorldStore::new();
        let mut history = HistoryManager::new();
        assert!(history.undo(&mut world).is_none());
        assert!(history.redo(&mut world).is_none());
        assert!(world.is_empty());
    }

    #[test]
    fn place_undo_redo_round_trip() {
        let mut world = WorldStore::new();
        let mut history = HistoryManager::new();
        place(&mut world, &mut history, voxel(1));
        let after_place = world.clone();

        let undone = history.undo(&mut world).unwrap();
        assert_eq!(undone, HistoryAction::Place(voxel(1)));
        assert!(world.is_empty());
        assert_eq!(history.future(), &[HistoryAction::Place(voxel(1))]);

        history.redo(&mut world).unwrap();
        assert_eq!(world, after_place);
        assert!(!history.can_redo());
        assert!(history.can_undo());
    }

    #[test]
    fn undoing_a_delete_restores_the_snapshot() {
        let mut world = WorldStore::new();
        let mut history = HistoryManager::new();
        place(&mut world, &mut history, voxel(4));

        let removed = world.remove(GridCoord::new(4, 0, 0)).unwrap();
        history.record(HistoryAction::Delete(removed));
        assert!(world.is_empty());

        history.undo(&mut world);
        assert_eq!(world.get(GridCoord::new(4, 0, 0)), Some(&voxel(4)));

        history.redo(&mut world);
        assert!(world.is_empty());
    }

    #[test]
    fn new_action_after_undo_clears_future() {
        let mut world = WorldStore::new();
        let mut history = HistoryManager::new();
        place(&mut world, &mut history, voxel(1));
        place(&mut world, &mut history, voxel(2));
        history.undo(&mut world);
        assert!(history.can_redo());

        place(&mut world, &mut history, voxel(3));
        assert!(history.future().is_empty());
        assert_eq!(history.past().count(), 2);
    }

    #[test]
    fn bounded_history_drops_oldest() {
        let mut world = WorldStore::new();
        let mut history = HistoryManager::with_capacity(2);
        for x in 0..3 {
            place(&mut world, &mut history, voxel(x));
        }

        let kept: Vec<&HistoryAction> = history.past().collect();
        assert_eq!(kept, vec![&HistoryAction::Place(voxel(1)), &HistoryAction::Place(voxel(2))]);

        history.undo(&mut world);
        history.undo(&mut world);
        assert!(history.undo(&mut world).is_none());
        assert_eq!(world.len(), 1);
        assert!(world.contains(GridCoord::new(0, 0, 0)));
    }

    #[test]
    fn serializes_as_tagged_action() {
        let json = serde_json::to_value(HistoryAction::Delete(voxel(1))).unwrap();
        assert_eq!(json["type"], "DELETE");
        assert_eq!(json["voxel"]["id"], "1,0,0");
    }
}
