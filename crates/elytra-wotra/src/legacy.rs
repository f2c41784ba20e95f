use crate::block_state::BlockState;
use once_cell::sync::Lazy;
use std::collections::HashMap;

mod generated {
    include!(concat!(env!("OUT_DIR"), "/legacy_blocks.rs"));
}
use generated::{LEGACY_BLOCK_NAMES, LEGACY_BLOCK_STATES};

/// `add << 12 | id << 4 | data`: a 12-bit block id followed by its 4-bit data value.
pub type LegacyId = u16;

const TABLE_SIZE: usize = 1 << 16;

static TABLE: Lazy<LegacyTable> = Lazy::new(LegacyTable::build);

pub fn decode(id: u8, data: u8, add: u8) -> LegacyId {
    ((add as u16 & 15) << 12) | ((id as u16) << 4) | (data as u16 & 15)
}

/// The 12-bit block id of a legacy id, without its data value.
pub fn block_id(legacy: LegacyId) -> u16 {
    legacy >> 4
}

pub fn data_value(legacy: LegacyId) -> u8 {
    (legacy & 15) as u8
}

/// Context-free legacy id to flattened state table.
///
/// Every one of the 65536 legacy ids resolves: a data value the block never used falls back to
/// data 0 of the same block, and an unknown block falls back to air.
pub struct LegacyTable {
    states: Vec<BlockState>,
    names: HashMap<u16, &'static str>,
}

impl LegacyTable {
    pub fn get() -> &'static LegacyTable {
        &TABLE
    }

    fn build() -> LegacyTable {
        let mut explicit: Vec<Option<BlockState>> = vec![None; TABLE_SIZE];
        for &(legacy, name, properties) in LEGACY_BLOCK_STATES {
            explicit[legacy as usize] = Some(BlockState::with_properties(
                name,
                properties.iter().copied(),
            ));
        }

        let air = BlockState::air();
        let mut states = Vec::with_capacity(TABLE_SIZE);
        for legacy in 0..TABLE_SIZE {
            let state = explicit[legacy]
                .as_ref()
                .or_else(|| explicit[legacy & !15].as_ref())
                .unwrap_or(&air);
            states.push(state.clone());
        }

        LegacyTable {
            states,
            names: LEGACY_BLOCK_NAMES.iter().copied().collect(),
        }
    }

    pub fn state(&self, legacy: LegacyId) -> &BlockState {
        &self.states[legacy as usize]
    }

    /// Pre-flattening registry name of a block id, e.g. `minecraft:red_flower` for 38.
    pub fn block_name(&self, block_id: u16) -> Option<&'static str> {
        self.names.get(&block_id).copied()
    }
}
