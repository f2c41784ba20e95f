use crate::block_state::BlockState;
use crate::packed::PackedArray;
use crate::palette::PaletteRegistry;
use crate::position::{Sides, SECTION_CELLS};
use elytra_common::{ElytraError, Result};
use elytra_nbt::Tag;
use std::collections::{BTreeMap, HashMap};

/// Bookkeeping for the neighbor consistency pass that runs once adjacent chunks exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeData {
    pub sides: Sides,
    /// Interior boundary-sensitive cells per section Y.
    pub indices: BTreeMap<u8, Vec<u16>>,
}

impl UpgradeData {
    /// `{Sides: Byte, Indices: {"<y>": IntArray}}`
    pub fn to_tag(&self) -> Tag {
        let indices = self
            .indices
            .iter()
            .map(|(y, cells)| {
                (
                    y.to_string(),
                    Tag::IntArray(cells.iter().map(|&c| c as i32).collect()),
                )
            })
            .collect();

        let mut tag = Tag::new_compound();
        tag.insert("Sides", Tag::Byte(self.sides.bits() as i8));
        tag.insert("Indices", Tag::Compound(indices));
        tag
    }

    pub fn from_tag(tag: &Tag) -> Option<UpgradeData> {
        let sides = Sides::from_bits(tag.get("Sides")?.as_integer()? as u8);
        let mut indices = BTreeMap::new();
        for (y, cells) in tag.get("Indices")?.as_compound()? {
            let Tag::IntArray(cells) = cells else {
                return None;
            };
            let cells = cells
                .iter()
                .map(|&c| u16::try_from(c).ok())
                .collect::<Option<Vec<u16>>>()?;
            indices.insert(y.parse().ok()?, cells);
        }
        Some(UpgradeData { sides, indices })
    }
}

/// A section in its flattened form: a palette and one packed palette index per cell.
#[derive(Debug, Clone)]
pub struct UpgradedSection {
    y: u8,
    palette: Vec<BlockState>,
    block_states: PackedArray,
}

impl UpgradedSection {
    /// Packs decoded cells once the palette is final.
    pub fn from_cells(y: u8, palette: PaletteRegistry, cells: &[u32]) -> Self {
        let bits = PackedArray::bits_for_palette(palette.len());
        let mut block_states = PackedArray::new(bits, cells.len());
        for (i, &index) in cells.iter().enumerate() {
            block_states.set(i, index);
        }
        UpgradedSection {
            y,
            palette: palette.into_states(),
            block_states,
        }
    }

    /// Reads an upgraded section back from its compound.
    pub fn from_tag(tag: &Tag) -> Result<Self> {
        let y = tag
            .get("Y")
            .and_then(Tag::as_integer)
            .filter(|y| (0..16).contains(y))
            .ok_or_else(|| ElytraError::malformed("section Y missing or out of range"))?
            as u8;

        let palette = tag
            .get("Palette")
            .and_then(Tag::as_list)
            .ok_or_else(|| ElytraError::malformed("section without Palette"))?
            .iter()
            .map(BlockState::from_tag)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ElytraError::malformed("invalid Palette entry"))?;
        if palette.is_empty() {
            return Err(ElytraError::malformed("empty Palette"));
        }

        let Some(Tag::LongArray(words)) = tag.get("BlockStates") else {
            return Err(ElytraError::malformed("section without BlockStates"));
        };
        let bits = PackedArray::bits_for_palette(palette.len());
        let block_states = PackedArray::from_words(
            bits,
            SECTION_CELLS,
            words.iter().map(|&w| w as u64).collect(),
        )
        .ok_or_else(|| {
            ElytraError::malformed(format!(
                "BlockStates has {} words, expected {} bits per entry",
                words.len(),
                bits
            ))
        })?;

        if let Some(index) = block_states.iter().find(|&i| i as usize >= palette.len()) {
            return Err(ElytraError::malformed(format!(
                "BlockStates references palette entry {} of {}",
                index,
                palette.len()
            )));
        }

        Ok(UpgradedSection {
            y,
            palette,
            block_states,
        })
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn palette(&self) -> &[BlockState] {
        &self.palette
    }

    pub fn block_states(&self) -> &PackedArray {
        &self.block_states
    }

    pub fn bits(&self) -> u8 {
        self.block_states.bits()
    }

    pub fn block(&self, cell: u16) -> &BlockState {
        &self.palette[self.block_states.get(cell as usize) as usize]
    }

    /// Writes `Y`, `Palette` and `BlockStates` over the remaining section fields.
    pub fn to_tag(&self, mut fields: HashMap<String, Tag>) -> Tag {
        fields.insert("Y".to_owned(), Tag::Byte(self.y as i8));
        fields.insert(
            "Palette".to_owned(),
            Tag::List(self.palette.iter().map(BlockState::to_tag).collect()),
        );
        fields.insert(
            "BlockStates".to_owned(),
            Tag::LongArray(self.block_states.words().iter().map(|&w| w as i64).collect()),
        );
        Tag::Compound(fields)
    }
}
