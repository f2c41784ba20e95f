use elytra_common::{ElytraError, Result};
use elytra_logger::{log, LogSeverity::Warning};
use elytra_nbt::Tag;
use std::collections::HashMap;

/// Packed local position of a block entity: `y << 8 | z << 4 | x`, the same value as the
/// chunk index of the cell it belongs to.
pub fn local_position(chunk_x: i32, chunk_z: i32, x: i32, y: i32, z: i32) -> Option<u16> {
    if !(0..256).contains(&y) {
        return None;
    }
    let local_x = x.wrapping_sub(chunk_x.wrapping_mul(16)) & 15;
    let local_z = z.wrapping_sub(chunk_z.wrapping_mul(16)) & 15;
    Some(((y as u16) << 8) | ((local_z as u16) << 4) | local_x as u16)
}

/// The chunk's block entities, indexed by local position.
///
/// Records keep the order they were first seen in. Records that cannot be placed in the
/// chunk (no integer coordinates or a height outside 0..=255) are kept aside and written
/// back after the indexed ones.
#[derive(Debug, Default)]
pub struct BlockEntities {
    by_position: HashMap<u16, Tag>,
    order: Vec<u16>,
    stray: Vec<Tag>,
}

fn coordinate(record: &Tag, key: &str) -> Option<i32> {
    record.get(key).and_then(Tag::as_int_lenient)
}

impl BlockEntities {
    pub fn new() -> Self {
        BlockEntities::default()
    }

    /// Indexes a `TileEntities` list for the chunk at `(chunk_x, chunk_z)`.
    pub fn from_list(chunk_x: i32, chunk_z: i32, records: &[Tag]) -> Result<Self> {
        let mut entities = BlockEntities::new();
        for record in records {
            if record.as_compound().is_none() {
                return Err(ElytraError::malformed("TileEntities entry is not a compound"));
            }
            let position = match (
                coordinate(record, "x"),
                coordinate(record, "y"),
                coordinate(record, "z"),
            ) {
                (Some(x), Some(y), Some(z)) => {
                    let position = local_position(chunk_x, chunk_z, x, y, z);
                    if position.is_none() {
                        log(
                            format!(
                                "Block entity at ({}, {}, {}) lies outside the chunk height, keeping it unindexed",
                                x, y, z
                            ),
                            Warning,
                        );
                    }
                    position
                }
                _ => {
                    log(
                        "Block entity without integer coordinates, keeping it unindexed".to_owned(),
                        Warning,
                    );
                    None
                }
            };

            match position {
                Some(position) => entities.insert(position, record.clone()),
                None => entities.stray.push(record.clone()),
            }
        }
        Ok(entities)
    }

    /// Indexes a record. A second record at the same position replaces the first but keeps
    /// its place in the output order.
    pub fn insert(&mut self, position: u16, record: Tag) {
        if self.by_position.insert(position, record).is_some() {
            log(
                format!(
                    "Duplicate block entity at local position {:#06x}, keeping the last one",
                    position
                ),
                Warning,
            );
        } else {
            self.order.push(position);
        }
    }

    pub fn get(&self, position: u16) -> Option<&Tag> {
        self.by_position.get(&position)
    }

    pub fn take(&mut self, position: u16) -> Option<Tag> {
        self.by_position.remove(&position)
    }

    /// Number of records still held, indexed or not.
    pub fn len(&self) -> usize {
        self.by_position.len() + self.stray.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining records in first-seen order, followed by the unindexed ones.
    pub fn into_records(mut self) -> Vec<Tag> {
        let mut records = Vec::with_capacity(self.len());
        for position in &self.order {
            if let Some(record) = self.by_position.remove(position) {
                records.push(record);
            }
        }
        records.append(&mut self.stray);
        records
    }
}
