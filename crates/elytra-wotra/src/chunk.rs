use crate::block_entity::BlockEntities;
use crate::block_state::BlockState;
use crate::fixes::{ChunkCells, FixRule};
use crate::position::{chunk_index, split_chunk_index, Sides, SECTIONS_PER_CHUNK};
use crate::section::SectionUpgrader;
use crate::serialize::{UpgradeData, UpgradedSection};
use elytra_common::{ElytraError, Result};
use elytra_logger::{enabled, log, LogSeverity::*};
use elytra_nbt::Tag;
use std::collections::{BTreeMap, HashMap};

/// One legacy chunk column being flattened.
///
/// Construction does all the work: every section is decoded, then the deferred fix rules run
/// across the whole column in ascending section and block id order. [`ChunkUpgrader::write`]
/// consumes the result into the new `Level` compound.
#[derive(Debug)]
pub struct ChunkUpgrader {
    chunk_x: i32,
    chunk_z: i32,
    sides: Sides,
    sections: [Option<SectionUpgrader>; SECTIONS_PER_CHUNK],
    block_entities: BlockEntities,
    alpha: bool,
    /// Level fields other than `Sections` and `TileEntities`.
    level: HashMap<String, Tag>,
    consumed: usize,
}

fn chunk_coordinate(level: &Tag, key: &str) -> Result<i32> {
    match level.get(key) {
        None => Ok(0),
        Some(tag) => tag
            .as_int_lenient()
            .ok_or_else(|| ElytraError::malformed(format!("{} is not an integer", key))),
    }
}

fn list<'a>(level: &'a Tag, key: &str) -> Result<&'a [Tag]> {
    match level.get(key) {
        None => Ok(&[]),
        Some(tag) => tag
            .as_list()
            .map(Vec::as_slice)
            .ok_or_else(|| ElytraError::malformed(format!("{} is not a list", key))),
    }
}

impl ChunkUpgrader {
    pub fn new(level: &Tag) -> Result<Self> {
        let mut fields = level
            .as_compound()
            .ok_or_else(|| ElytraError::malformed("Level is not a compound"))?
            .clone();
        let chunk_x = chunk_coordinate(level, "xPos")?;
        let chunk_z = chunk_coordinate(level, "zPos")?;
        let alpha = level
            .get("convertedFromAlphaFormat")
            .and_then(Tag::as_bool)
            .unwrap_or(false);

        let block_entities =
            BlockEntities::from_list(chunk_x, chunk_z, list(level, "TileEntities")?)?;

        let mut sections: [Option<SectionUpgrader>; SECTIONS_PER_CHUNK] = Default::default();
        for (i, section) in list(level, "Sections")?.iter().enumerate() {
            let section = SectionUpgrader::new(section).map_err(|err| {
                log(
                    format!(
                        "Rejected section {} of chunk ({}, {}): {}",
                        i, chunk_x, chunk_z, err
                    ),
                    Error,
                );
                err
            })?;
            let y = section.y() as usize;
            if sections[y].replace(section).is_some() {
                log(
                    format!(
                        "Duplicate section Y={} in chunk ({}, {}), keeping the last one",
                        y, chunk_x, chunk_z
                    ),
                    Warning,
                );
            }
        }

        fields.remove("Sections");
        fields.remove("TileEntities");

        let mut chunk = ChunkUpgrader {
            chunk_x,
            chunk_z,
            sides: Sides::NONE,
            sections,
            block_entities,
            alpha,
            level: fields,
            consumed: 0,
        };

        for section in chunk.sections.iter_mut().flatten() {
            chunk.sides |= section.upgrade();
        }
        chunk.run_fixes();

        if enabled(Debug) {
            log(chunk.summary(), Debug);
        }
        Ok(chunk)
    }

    fn run_fixes(&mut self) {
        for section_y in 0..SECTIONS_PER_CHUNK {
            let pending = match &mut self.sections[section_y] {
                Some(section) => section.take_pending(),
                None => continue,
            };
            for (block_id, cells) in pending {
                let Some(rule) = FixRule::for_block(block_id) else {
                    continue;
                };
                let indices: Vec<u16> = cells
                    .iter()
                    .map(|&cell| chunk_index(section_y as u8, cell))
                    .collect();
                rule.apply(self, &indices);
            }
        }
    }

    fn summary(&self) -> String {
        let upgraded = self
            .sections
            .iter()
            .flatten()
            .filter(|s| s.has_blocks())
            .count();
        let lazy: usize = self
            .sections
            .iter()
            .flatten()
            .map(|s| s.lazy_cells().len())
            .sum();
        format!(
            "Upgraded chunk ({}, {}): {} sections, sides {}, {} lazy cells, {} block entities consumed",
            self.chunk_x, self.chunk_z, upgraded, self.sides, lazy, self.consumed
        )
    }

    /// Chunk coordinates `(xPos, zPos)`.
    pub fn position(&self) -> (i32, i32) {
        (self.chunk_x, self.chunk_z)
    }

    /// World block coordinates of the chunk's north-west corner.
    pub fn origin(&self) -> (i32, i32) {
        (self.chunk_x.wrapping_mul(16), self.chunk_z.wrapping_mul(16))
    }

    pub fn sides(&self) -> Sides {
        self.sides
    }

    pub fn section(&self, y: u8) -> Option<&SectionUpgrader> {
        self.sections.get(y as usize)?.as_ref()
    }

    pub fn block_entities(&self) -> &BlockEntities {
        &self.block_entities
    }

    /// Block entities folded into block states so far.
    pub fn consumed_block_entities(&self) -> usize {
        self.consumed
    }

    pub fn upgrade_data(&self) -> UpgradeData {
        let indices: BTreeMap<u8, Vec<u16>> = self
            .sections
            .iter()
            .flatten()
            .map(|s| (s.y(), s.lazy_cells().to_vec()))
            .collect();
        UpgradeData {
            sides: self.sides,
            indices,
        }
    }

    /// Emits the upgraded `Level` compound: packed sections, the remaining block entities and
    /// `UpgradeData`. Every other level field is carried over.
    pub fn write(self) -> Tag {
        let upgrade_data = self.upgrade_data();
        let mut level = self.level;

        let sections = self
            .sections
            .into_iter()
            .flatten()
            .map(|section| {
                let (y, fields, decoded) = section.into_parts();
                match decoded {
                    Some((palette, cells)) => {
                        UpgradedSection::from_cells(y, palette, &cells).to_tag(fields)
                    }
                    None => Tag::Compound(fields),
                }
            })
            .collect();
        level.insert("Sections".to_owned(), Tag::List(sections));

        let records = self.block_entities.into_records();
        if !records.is_empty() {
            level.insert("TileEntities".to_owned(), Tag::List(records));
        }

        level.insert("UpgradeData".to_owned(), upgrade_data.to_tag());
        Tag::Compound(level)
    }
}

impl ChunkCells for ChunkUpgrader {
    fn block(&self, index: u16) -> BlockState {
        let (section_y, cell) = split_chunk_index(index);
        match self.section(section_y) {
            Some(section) => section.block(cell),
            None => BlockState::air(),
        }
    }

    fn set_block(&mut self, index: u16, state: &BlockState) {
        let (section_y, cell) = split_chunk_index(index);
        if let Some(Some(section)) = self.sections.get_mut(section_y as usize) {
            section.set_block(cell, state);
        }
    }

    fn take_block_entity(&mut self, index: u16) -> Option<Tag> {
        let record = self.block_entities.take(index);
        if record.is_some() {
            self.consumed += 1;
        }
        record
    }

    fn is_alpha(&self) -> bool {
        self.alpha
    }
}
