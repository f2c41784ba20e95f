use crate::block_state::BlockState;
use crate::fixes::{is_boundary_sensitive, FixRule};
use crate::legacy::{self, LegacyTable};
use crate::nibble::NibbleLayer;
use crate::palette::PaletteRegistry;
use crate::position::{cell_coords, Sides, SECTION_CELLS};
use elytra_common::{ElytraError, Result};
use elytra_nbt::Tag;
use std::collections::{BTreeMap, HashMap};
use std::mem;

/// The raw pre-flattening arrays of one section.
#[derive(Debug)]
struct LegacyLayers {
    ids: Vec<u8>,
    data: NibbleLayer,
    add: NibbleLayer,
}

impl LegacyLayers {
    fn legacy_id(&self, cell: u16) -> legacy::LegacyId {
        legacy::decode(
            self.ids[cell as usize],
            self.data.get_index(cell),
            self.add.get_index(cell),
        )
    }
}

/// Decoded cells of a section while the chunk's fix rules still run.
#[derive(Debug)]
struct SectionBlocks {
    palette: PaletteRegistry,
    cells: Vec<u32>,
    pending_by_id: BTreeMap<u16, Vec<u16>>,
    lazy_cells: Vec<u16>,
}

/// One 16x16x16 section on its way from id/data/add arrays to a palette.
///
/// Built from the legacy section compound, decoded once by [`SectionUpgrader::upgrade`], then
/// mutated by the chunk's fix rules until it is written out.
#[derive(Debug)]
pub struct SectionUpgrader {
    y: u8,
    /// The section compound without the legacy arrays.
    fields: HashMap<String, Tag>,
    layers: Option<LegacyLayers>,
    blocks: Option<SectionBlocks>,
}

fn section_y(section: &Tag) -> Result<u8> {
    let y = section
        .get("Y")
        .ok_or_else(|| ElytraError::malformed("section without Y"))?
        .as_integer()
        .ok_or_else(|| ElytraError::malformed("section Y is not an integer"))?;
    if !(0..16).contains(&y) {
        return Err(ElytraError::malformed(format!(
            "section Y {} outside 0..15",
            y
        )));
    }
    Ok(y as u8)
}

fn byte_array<'a>(fields: &'a HashMap<String, Tag>, key: &str) -> Result<Option<&'a [i8]>> {
    match fields.get(key) {
        None => Ok(None),
        Some(tag) => tag
            .as_byte_array()
            .map(Some)
            .ok_or_else(|| ElytraError::malformed(format!("{} is not a byte array", key))),
    }
}

impl SectionUpgrader {
    /// Validates a legacy section compound. A section without `Blocks` is carried through as is.
    pub fn new(section: &Tag) -> Result<Self> {
        let mut fields = section
            .as_compound()
            .ok_or_else(|| ElytraError::malformed("section is not a compound"))?
            .clone();
        let y = section_y(section)?;

        let layers = match byte_array(&fields, "Blocks")? {
            None => None,
            Some(ids) if ids.len() != SECTION_CELLS => {
                return Err(ElytraError::malformed(format!(
                    "Blocks must be {} bytes, got {}",
                    SECTION_CELLS,
                    ids.len()
                )));
            }
            Some(ids) => Some(LegacyLayers {
                ids: ids.iter().map(|&b| b as u8).collect(),
                data: NibbleLayer::from_bytes("Data", byte_array(&fields, "Data")?)?,
                add: NibbleLayer::from_bytes("Add", byte_array(&fields, "Add")?)?,
            }),
        };

        if layers.is_some() {
            for key in ["Blocks", "Data", "Add"] {
                fields.remove(key);
            }
        }

        Ok(SectionUpgrader {
            y,
            fields,
            layers,
            blocks: None,
        })
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    /// Whether this section carries block data.
    pub fn has_blocks(&self) -> bool {
        self.layers.is_some() || self.blocks.is_some()
    }

    /// Decodes every cell to its context-free state, queues cells for the fix rules and
    /// classifies boundary-sensitive cells. Returns the sides touched by this section.
    /// Calling it again is a no-op.
    pub fn upgrade(&mut self) -> Sides {
        let Some(layers) = self.layers.take() else {
            return Sides::NONE;
        };
        let table = LegacyTable::get();
        let mut blocks = SectionBlocks {
            palette: PaletteRegistry::with_air(),
            cells: vec![0; SECTION_CELLS],
            pending_by_id: BTreeMap::new(),
            lazy_cells: Vec::new(),
        };
        let mut sides = Sides::NONE;

        for cell in 0..SECTION_CELLS as u16 {
            let legacy_id = layers.legacy_id(cell);
            let block_id = legacy::block_id(legacy_id);

            if FixRule::for_block(block_id).is_some() {
                blocks.pending_by_id.entry(block_id).or_default().push(cell);
            }

            if is_boundary_sensitive(block_id) {
                let (x, _, z) = cell_coords(cell);
                let edge = Sides::for_edge(x, z);
                if edge.is_empty() {
                    blocks.lazy_cells.push(cell);
                } else {
                    sides |= edge;
                }
            }

            blocks.cells[cell as usize] = blocks.palette.id_for(table.state(legacy_id));
        }

        self.blocks = Some(blocks);
        sides
    }

    /// Current state of a cell; air for sections without block data.
    pub fn block(&self, cell: u16) -> BlockState {
        self.blocks
            .as_ref()
            .and_then(|blocks| blocks.palette.get(blocks.cells[cell as usize]))
            .cloned()
            .unwrap_or_else(BlockState::air)
    }

    /// Overwrites a decoded cell, growing the palette if needed. Sections without block data
    /// ignore writes.
    pub fn set_block(&mut self, cell: u16, state: &BlockState) {
        if let Some(blocks) = &mut self.blocks {
            blocks.cells[cell as usize] = blocks.palette.id_for(state);
        }
    }

    /// Drains the cells waiting on fix rules, grouped by block id in ascending order.
    pub fn take_pending(&mut self) -> BTreeMap<u16, Vec<u16>> {
        self.blocks
            .as_mut()
            .map(|blocks| mem::take(&mut blocks.pending_by_id))
            .unwrap_or_default()
    }

    /// Interior boundary-sensitive cells, in cell order.
    pub fn lazy_cells(&self) -> &[u16] {
        self.blocks
            .as_ref()
            .map(|blocks| blocks.lazy_cells.as_slice())
            .unwrap_or(&[])
    }

    pub fn palette(&self) -> Option<&PaletteRegistry> {
        self.blocks.as_ref().map(|blocks| &blocks.palette)
    }

    /// `(y, remaining fields, decoded palette and cells)`. The last part is `None` for sections
    /// that never had block data.
    pub(crate) fn into_parts(
        self,
    ) -> (u8, HashMap<String, Tag>, Option<(PaletteRegistry, Vec<u32>)>) {
        let decoded = self.blocks.map(|blocks| (blocks.palette, blocks.cells));
        (self.y, self.fields, decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::cell_index;
    use assert_matches::assert_matches;

    fn section(y: i8, ids: &[(u16, u8)], data: &[(u16, u8)]) -> Tag {
        let mut blocks = vec![0u8; SECTION_CELLS];
        for &(cell, id) in ids {
            blocks[cell as usize] = id;
        }
        let mut nibbles = vec![0u8; SECTION_CELLS / 2];
        for &(cell, value) in data {
            let byte = &mut nibbles[cell as usize >> 1];
            if cell & 1 == 0 {
                *byte = (*byte & 0xF0) | value;
            } else {
                *byte = (*byte & 0x0F) | (value << 4);
            }
        }
        let mut tag = Tag::new_compound();
        tag.insert("Y", Tag::Byte(y));
        tag.insert("Blocks", Tag::byte_array(&blocks));
        tag.insert("Data", Tag::byte_array(&nibbles));
        tag.insert("SkyLight", Tag::byte_array(&[0xFF; 2048]));
        tag
    }

    #[test]
    fn test_all_air_section() {
        let mut upgrader = SectionUpgrader::new(&section(3, &[], &[])).unwrap();
        assert_eq!(upgrader.upgrade(), Sides::NONE);
        assert_eq!(upgrader.palette().unwrap().len(), 1);
        assert!(upgrader.take_pending().is_empty());
        assert!(upgrader.lazy_cells().is_empty());

        let (y, fields, decoded) = upgrader.into_parts();
        assert_eq!(y, 3);
        assert!(fields.contains_key("SkyLight"));
        assert!(!fields.contains_key("Blocks"));
        assert!(!fields.contains_key("Data"));
        let (_, cells) = decoded.unwrap();
        assert!(cells.iter().all(|&c| c == 0));
    }

    #[test]
    fn test_decode_with_data() {
        let cell = cell_index(1, 2, 3);
        let mut upgrader = SectionUpgrader::new(&section(0, &[(cell, 35)], &[(cell, 14)])).unwrap();
        upgrader.upgrade();
        assert_eq!(upgrader.block(cell).to_string(), "minecraft:red_wool");
        assert!(upgrader.block(0).is_air());
    }

    #[test]
    fn test_pending_grouped_by_block_id() {
        let a = cell_index(4, 0, 4);
        let b = cell_index(5, 0, 4);
        let c = cell_index(6, 0, 4);
        let mut upgrader =
            SectionUpgrader::new(&section(0, &[(a, 110), (b, 2), (c, 2)], &[])).unwrap();
        upgrader.upgrade();
        let pending = upgrader.take_pending();
        let groups: Vec<(u16, Vec<u16>)> = pending.into_iter().collect();
        assert_eq!(groups, vec![(2, vec![b, c]), (110, vec![a])]);
        assert!(upgrader.take_pending().is_empty());
    }

    #[test]
    fn test_corner_sets_side_and_skips_lazy() {
        let corner = cell_index(0, 7, 0);
        let mut upgrader = SectionUpgrader::new(&section(0, &[(corner, 85)], &[])).unwrap();
        let sides = upgrader.upgrade();
        assert_eq!(sides, Sides::NORTH_WEST);
        assert!(upgrader.lazy_cells().is_empty());
    }

    #[test]
    fn test_interior_is_lazy() {
        let interior = cell_index(8, 7, 8);
        let mut upgrader = SectionUpgrader::new(&section(0, &[(interior, 85)], &[])).unwrap();
        assert_eq!(upgrader.upgrade(), Sides::NONE);
        assert_eq!(upgrader.lazy_cells(), &[interior]);
    }

    #[test]
    fn test_set_block_grows_palette() {
        let mut upgrader = SectionUpgrader::new(&section(0, &[(0, 1)], &[])).unwrap();
        upgrader.upgrade();
        assert_eq!(upgrader.palette().unwrap().len(), 2);
        upgrader.set_block(0, &BlockState::new("minecraft:pumpkin"));
        assert_eq!(upgrader.block(0).name(), "minecraft:pumpkin");
        assert_eq!(upgrader.palette().unwrap().len(), 3);
    }

    #[test]
    fn test_section_without_blocks_passes_through() {
        let mut tag = Tag::new_compound();
        tag.insert("Y", Tag::Byte(2));
        tag.insert("BlockLight", Tag::byte_array(&[0; 2048]));
        let mut upgrader = SectionUpgrader::new(&tag).unwrap();
        assert!(!upgrader.has_blocks());
        assert_eq!(upgrader.upgrade(), Sides::NONE);
        assert!(upgrader.block(100).is_air());

        let (_, fields, decoded) = upgrader.into_parts();
        assert!(decoded.is_none());
        assert_eq!(Tag::Compound(fields), tag);
    }

    #[test]
    fn test_malformed_sections() {
        let mut short_blocks = section(0, &[], &[]);
        short_blocks.insert("Blocks", Tag::byte_array(&[0; 4095]));
        assert_matches!(
            SectionUpgrader::new(&short_blocks),
            Err(ElytraError::MalformedChunk(_))
        );

        let mut short_data = section(0, &[], &[]);
        short_data.insert("Data", Tag::byte_array(&[0; 100]));
        assert_matches!(
            SectionUpgrader::new(&short_data),
            Err(ElytraError::MalformedChunk(_))
        );

        let mut wrong_add = section(0, &[], &[]);
        wrong_add.insert("Add", Tag::Int(0));
        assert_matches!(
            SectionUpgrader::new(&wrong_add),
            Err(ElytraError::MalformedChunk(_))
        );

        let mut no_y = section(0, &[], &[]);
        no_y.remove("Y");
        assert_matches!(
            SectionUpgrader::new(&no_y),
            Err(ElytraError::MalformedChunk(_))
        );

        assert_matches!(
            SectionUpgrader::new(&section(16, &[], &[])),
            Err(ElytraError::MalformedChunk(_))
        );
        assert_matches!(
            SectionUpgrader::new(&section(-1, &[], &[])),
            Err(ElytraError::MalformedChunk(_))
        );
    }
}
