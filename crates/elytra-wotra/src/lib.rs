//! World-storage transforms. Currently the flattening upgrade of legacy chunks: id, data and
//! add nibble arrays become a per-section palette with bit-packed indices.

pub mod block_entity;
pub mod block_state;
pub mod chunk;
pub mod fixes;
pub mod legacy;
pub mod nibble;
pub mod packed;
pub mod palette;
pub mod position;
pub mod section;
pub mod serialize;

pub use block_state::BlockState;
pub use chunk::ChunkUpgrader;
pub use packed::PackedArray;
pub use palette::PaletteRegistry;
pub use position::Sides;
pub use serialize::{UpgradeData, UpgradedSection};

use elytra_common::Result;
use elytra_nbt::Tag;

/// Upgrades a legacy `Level` compound and returns its replacement. The input is not modified.
pub fn upgrade_level(level: &Tag) -> Result<Tag> {
    Ok(ChunkUpgrader::new(level)?.write())
}

/// Whether any section of a level still carries legacy `Blocks`. A `Sections` tag that is not
/// a list counts, so the upgrader gets to reject it.
fn has_legacy_blocks(level: &Tag) -> bool {
    match level.get("Sections") {
        Some(Tag::List(sections)) => sections.iter().any(|s| s.get("Blocks").is_some()),
        Some(_) => true,
        None => false,
    }
}

/// Upgrades the `Level` of a chunk root compound in place.
///
/// Returns `Ok(false)` and leaves the chunk alone when it has no `Level`, or when no section
/// carries legacy `Blocks` (an already flattened chunk keeps its `UpgradeData`).
/// On error the chunk is left exactly as it was.
pub fn upgrade_chunk(chunk: &mut Tag) -> Result<bool> {
    let upgraded = match chunk.get("Level") {
        Some(level) if has_legacy_blocks(level) => upgrade_level(level)?,
        _ => return Ok(false),
    };
    chunk.insert("Level", upgraded);
    Ok(true)
}
