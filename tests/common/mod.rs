#![allow(dead_code)]

use elytra::Tag;

/// Builder for one legacy section compound.
pub struct LegacySection {
    y: i8,
    ids: Vec<u8>,
    data: Vec<u8>,
    add: Option<Vec<u8>>,
}

impl LegacySection {
    pub fn new(y: i8) -> Self {
        LegacySection {
            y,
            ids: vec![0; 4096],
            data: vec![0; 2048],
            add: None,
        }
    }

    /// Every cell set to one id and data value.
    pub fn filled(y: i8, id: u8, data: u8) -> Self {
        let mut section = LegacySection::new(y);
        for cell in 0..4096 {
            section = section.set(cell, id, data);
        }
        section
    }

    pub fn set(mut self, cell: u16, id: u8, data: u8) -> Self {
        self.ids[cell as usize] = id;
        set_nibble(&mut self.data, cell, data);
        self
    }

    pub fn set_add(mut self, cell: u16, add: u8) -> Self {
        let layer = self.add.get_or_insert_with(|| vec![0; 2048]);
        set_nibble(layer, cell, add);
        self
    }

    pub fn at(self, x: u8, y: u8, z: u8, id: u8, data: u8) -> Self {
        self.set(cell(x, y, z), id, data)
    }

    pub fn build(self) -> Tag {
        let mut section = Tag::new_compound();
        section.insert("Y", Tag::Byte(self.y));
        section.insert("Blocks", Tag::byte_array(&self.ids));
        section.insert("Data", Tag::byte_array(&self.data));
        if let Some(add) = &self.add {
            section.insert("Add", Tag::byte_array(add));
        }
        section.insert("BlockLight", Tag::byte_array(&[0; 2048]));
        section.insert("SkyLight", Tag::byte_array(&[0xFF; 2048]));
        section
    }
}

fn set_nibble(layer: &mut [u8], cell: u16, value: u8) {
    let byte = &mut layer[cell as usize >> 1];
    *byte = if cell & 1 == 0 {
        (*byte & 0xF0) | (value & 0x0F)
    } else {
        (*byte & 0x0F) | (value << 4)
    };
}

/// Section cell index of local `(x, y, z)`.
pub fn cell(x: u8, y: u8, z: u8) -> u16 {
    ((y as u16) << 8) | ((z as u16) << 4) | x as u16
}

pub fn block_entity(id: &str, x: i32, y: i32, z: i32, fields: Vec<(&str, Tag)>) -> Tag {
    let mut tag = Tag::new_compound();
    tag.insert("id", Tag::String(id.to_owned()));
    tag.insert("x", Tag::Int(x));
    tag.insert("y", Tag::Int(y));
    tag.insert("z", Tag::Int(z));
    for (key, value) in fields {
        tag.insert(key, value);
    }
    tag
}

/// Root chunk compound `{Level: {...}}` at chunk `(x, z)`.
pub fn legacy_chunk(x: i32, z: i32, sections: Vec<Tag>, block_entities: Vec<Tag>) -> Tag {
    let mut level = Tag::new_compound();
    level.insert("xPos", Tag::Int(x));
    level.insert("zPos", Tag::Int(z));
    level.insert("LastUpdate", Tag::Long(0));
    level.insert("TerrainPopulated", Tag::Byte(1));
    level.insert("Sections", Tag::List(sections));
    level.insert("TileEntities", Tag::List(block_entities));

    let mut root = Tag::new_compound();
    root.insert("Level", level);
    root
}

pub fn level(chunk: &Tag) -> &Tag {
    chunk.get("Level").expect("chunk without Level")
}

/// The upgraded section with the given Y.
pub fn upgraded_section(chunk: &Tag, y: u8) -> elytra::UpgradedSection {
    let section = level(chunk)
        .get("Sections")
        .and_then(Tag::as_list)
        .expect("Sections list")
        .iter()
        .find(|s| s.get("Y").and_then(Tag::as_integer) == Some(y as i64))
        .expect("section present");
    elytra::UpgradedSection::from_tag(section).expect("valid upgraded section")
}

pub fn upgrade_data(chunk: &Tag) -> elytra::UpgradeData {
    elytra::UpgradeData::from_tag(level(chunk).get("UpgradeData").expect("UpgradeData"))
        .expect("valid UpgradeData")
}
