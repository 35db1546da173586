use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{sampler::Color, SculptError};

/// Integer grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Store key for this cell, `"x,y,z"`.
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

impl FromStr for GridCoord {
    type Err = SculptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',').map(|part| part.trim().parse::<i32>());
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) => Ok(Self::new(x, y, z)),
            _ => Err(SculptError::msg(format!("`{s}` is not an x,y,z voxel id"))),
        }
    }
}

/// Serialized shape of a voxel. Kept separate so deserialization can check
/// that the id agrees with the coordinates.
#[derive(Serialize, Deserialize)]
struct RawVoxel {
    id: String,
    x: i32,
    y: i32,
    z: i32,
    color: Color,
}

/// A single placed voxel. The id is always derived from the coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVoxel", into = "RawVoxel")]
pub struct VoxelRecord {
    coord: GridCoord,
    pub color: Color,
}

impl VoxelRecord {
    pub fn new(coord: GridCoord, color: Color) -> Self {
        Self { coord, color }
    }

    pub fn id(&self) -> String {
        self.coord.id()
    }

    pub fn coord(&self) -> GridCoord {
        self.coord
    }
}

impl TryFrom<RawVoxel> for VoxelRecord {
    type Error = SculptError;

    fn try_from(raw: RawVoxel) -> Result<Self, Self::Error> {
        let coord = GridCoord::new(raw.x, raw.y, raw.z);
        if raw.id != coord.id() {
            return Err(SculptError::MalformedSnapshot(format!(
                "voxel id `{}` does not match coordinates {coord}",
                raw.id
            )));
        }
        Ok(Self::new(coord, raw.color))
    }
}

impl From<VoxelRecord> for RawVoxel {
    fn from(record: VoxelRecord) -> Self {
        Self {
            id: record.id(),
            x: record.coord.x,
            y: record.coord.y,
            z: record.coord.z,
            color: record.color,
        }
    }
}

/// Sparse voxel map keyed by cell. Holds at most one record per cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldStore {
    voxels: HashMap<GridCoord, VoxelRecord>,
}

impl WorldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from persisted records. Later duplicates of a cell
    /// replace earlier ones.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = VoxelRecord>,
    {
        let voxels = records
            .into_iter()
            .map(|record| (record.coord(), record))
            .collect();
        Self { voxels }
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        self.voxels.contains_key(&coord)
    }

    pub fn get(&self, coord: GridCoord) -> Option<&VoxelRecord> {
        self.voxels.get(&coord)
    }

    /// Looks a voxel up by its `"x,y,z"` id.
    pub fn get_by_id(&self, id: &str) -> Option<&VoxelRecord> {
        id.parse().ok().and_then(|coord| self.get(coord))
    }

    /// Inserts `record` unless its cell is occupied. Returns whether the
    /// store changed.
    pub fn insert_new(&mut self, record: VoxelRecord) -> bool {
        if self.voxels.contains_key(&record.coord()) {
            return false;
        }
        self.voxels.insert(record.coord(), record);
        true
    }

    /// Writes `record` regardless of what occupies its cell. Used when
    /// replaying history, which restores a known snapshot.
    pub fn put(&mut self, record: VoxelRecord) -> Option<VoxelRecord> {
        self.voxels.insert(record.coord(), record)
    }

    pub fn remove(&mut self, coord: GridCoord) -> Option<VoxelRecord> {
        self.voxels.remove(&coord)
    }

    /// All records ordered by coordinate, for persistence and display.
    pub fn snapshot(&self) -> Vec<VoxelRecord> {
        let mut records: Vec<VoxelRecord> = self.voxels.values().cloned().collect();
        records.sort_by_key(|record| record.coord());
        records
    }
}
