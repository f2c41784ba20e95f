//! Second-pass rules for legacy blocks whose flattened state depends on a neighbor cell or on
//! the block entity stored at the same position.
//!
//! Rules only ever read and write cells of the chunk being upgraded. Anything a rule cannot
//! settle keeps the context-free state assigned during decoding.

use crate::block_state::BlockState;
use crate::legacy::LegacyTable;
use crate::position::{relative, Direction};
use elytra_logger::{enabled, log, LogSeverity::Debug};
use elytra_nbt::Tag;

/// Dye colors in wool order, as used by bed `color` and flattened block names.
pub const COLORS: [&str; 16] = [
    "white",
    "orange",
    "magenta",
    "light_blue",
    "yellow",
    "lime",
    "pink",
    "gray",
    "light_gray",
    "cyan",
    "purple",
    "blue",
    "brown",
    "green",
    "red",
    "black",
];

const DOUBLE_PLANTS: [&str; 6] = [
    "minecraft:sunflower",
    "minecraft:lilac",
    "minecraft:tall_grass",
    "minecraft:large_fern",
    "minecraft:rose_bush",
    "minecraft:peony",
];

const SKULL_KINDS: [(&str, &str); 6] = [
    ("skeleton", "skull"),
    ("wither_skeleton", "skull"),
    ("zombie", "head"),
    ("player", "head"),
    ("creeper", "head"),
    ("dragon", "head"),
];

const fn id_set(ids: &[u16]) -> [u64; 64] {
    let mut set = [0u64; 64];
    let mut i = 0;
    while i < ids.len() {
        let id = ids[i] as usize;
        set[id >> 6] |= 1 << (id & 63);
        i += 1;
    }
    set
}

const fn id_set_contains(set: &[u64; 64], id: u16) -> bool {
    let id = id as usize & 0x0FFF;
    set[id >> 6] & (1 << (id & 63)) != 0
}

/// Blocks whose shape follows their horizontal neighbors: chests, redstone wire, stairs,
/// fences, panes, walls, vines, fence gates, tripwire, chorus plants, plus note blocks and beds.
const BOUNDARY_SENSITIVE: [u64; 64] = id_set(&[
    54, 146, 25, 26, 51, 53, 67, 108, 109, 114, 128, 134, 135, 136, 156, 163, 164, 180, 203, 55,
    85, 113, 188, 189, 190, 191, 192, 131, 132, 139, 199, 101, 102, 160, 106, 107, 183, 184, 185,
    186, 187,
]);

/// Whether a block id may need a neighbor outside its own chunk to settle its final shape.
pub fn is_boundary_sensitive(block_id: u16) -> bool {
    id_set_contains(&BOUNDARY_SENSITIVE, block_id)
}

/// The view of a chunk a rule works against. Indices are chunk indices,
/// `section_y << 12 | y << 8 | z << 4 | x`.
pub trait ChunkCells {
    /// Current state of a cell. Cells of absent sections read as air.
    fn block(&self, index: u16) -> BlockState;

    fn set_block(&mut self, index: u16, state: &BlockState);

    /// Removes and returns the block entity at `index`.
    fn take_block_entity(&mut self, index: u16) -> Option<Tag>;

    /// The chunk was converted from the alpha format.
    fn is_alpha(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixRule {
    SnowyGround,
    NoteBlock,
    Bed,
    Door,
    Pumpkin,
    FlowerPot,
    Skull,
    DoublePlant,
    Banner,
}

impl FixRule {
    /// The rule a legacy block id is deferred to, if any.
    pub fn for_block(block_id: u16) -> Option<FixRule> {
        match block_id {
            2 | 3 | 110 => Some(FixRule::SnowyGround),
            25 => Some(FixRule::NoteBlock),
            26 => Some(FixRule::Bed),
            64 | 71 | 193..=197 => Some(FixRule::Door),
            86 => Some(FixRule::Pumpkin),
            140 => Some(FixRule::FlowerPot),
            144 => Some(FixRule::Skull),
            175 => Some(FixRule::DoublePlant),
            176 | 177 => Some(FixRule::Banner),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            FixRule::SnowyGround => "snowy ground",
            FixRule::NoteBlock => "note block",
            FixRule::Bed => "bed",
            FixRule::Door => "door",
            FixRule::Pumpkin => "pumpkin",
            FixRule::FlowerPot => "flower pot",
            FixRule::Skull => "skull",
            FixRule::DoublePlant => "double plant",
            FixRule::Banner => "banner",
        }
    }

    /// Runs the rule over one group of cells, in the order given.
    pub fn apply<C: ChunkCells + ?Sized>(self, chunk: &mut C, cells: &[u16]) {
        for &index in cells {
            let resolved = match self {
                FixRule::SnowyGround => snowy_ground(chunk, index),
                FixRule::NoteBlock => note_block(chunk, index),
                FixRule::Bed => bed(chunk, index),
                FixRule::Door => door(chunk, index),
                FixRule::Pumpkin => pumpkin(chunk, index),
                FixRule::FlowerPot => flower_pot(chunk, index),
                FixRule::Skull => skull(chunk, index),
                FixRule::DoublePlant => double_plant(chunk, index),
                FixRule::Banner => banner(chunk, index),
            };
            if let Err(reason) = resolved {
                unresolved(self, index, reason);
            }
        }
    }
}

fn unresolved(rule: FixRule, index: u16, reason: &str) {
    if enabled(Debug) {
        log(
            format!(
                "Left {} at chunk index {:#06x} unresolved: {}",
                rule.name(),
                index,
                reason
            ),
            Debug,
        );
    }
}

/// Outcome of one rule on one cell. `Ok` covers "nothing to change"; `Err` carries the reason
/// an expected partner was missing.
type Resolution = std::result::Result<(), &'static str>;

fn block_at<C: ChunkCells + ?Sized>(
    chunk: &C,
    index: u16,
    direction: Direction,
) -> Option<BlockState> {
    relative(index, direction).map(|neighbor| chunk.block(neighbor))
}

fn int_field(record: &Tag, key: &str) -> Option<i32> {
    record.get(key).and_then(Tag::as_int_lenient)
}

fn snowy_ground<C: ChunkCells + ?Sized>(chunk: &mut C, index: u16) -> Resolution {
    let state = chunk.block(index);
    if !matches!(
        state.name(),
        "minecraft:grass_block" | "minecraft:podzol" | "minecraft:mycelium"
    ) {
        return Ok(());
    }
    let Some(above) = block_at(chunk, index, Direction::Up) else {
        return Ok(());
    };
    if matches!(above.name(), "minecraft:snow" | "minecraft:snow_block") {
        chunk.set_block(index, &state.with("snowy", "true"));
    }
    Ok(())
}

fn note_block<C: ChunkCells + ?Sized>(chunk: &mut C, index: u16) -> Resolution {
    let record = chunk
        .take_block_entity(index)
        .ok_or("no note block entity")?;
    let state = chunk.block(index);
    let note = int_field(&record, "note").unwrap_or(0).clamp(0, 24);
    let powered = record
        .get("powered")
        .and_then(Tag::as_bool)
        .unwrap_or(false);
    let instrument = state.property("instrument").unwrap_or("harp");

    let resolved = BlockState::with_properties(
        "minecraft:note_block",
        [
            ("instrument", instrument.to_owned()),
            ("note", note.to_string()),
            ("powered", powered.to_string()),
        ],
    );
    chunk.set_block(index, &resolved);
    Ok(())
}

fn bed<C: ChunkCells + ?Sized>(chunk: &mut C, index: u16) -> Resolution {
    let record = chunk.take_block_entity(index).ok_or("no bed entity")?;
    let state = chunk.block(index);
    let color = int_field(&record, "color").unwrap_or(14);
    if color == 14 || !(0..16).contains(&color) || !state.name().ends_with("_bed") {
        return Ok(());
    }
    let resolved = state.renamed(format!("minecraft:{}_bed", COLORS[color as usize]));
    chunk.set_block(index, &resolved);
    Ok(())
}

fn door<C: ChunkCells + ?Sized>(chunk: &mut C, index: u16) -> Resolution {
    let lower = chunk.block(index);
    if !lower.name().ends_with("_door") || lower.property("half") != Some("lower") {
        return Ok(());
    }
    let upper_index = relative(index, Direction::Up).ok_or("door at the top of the chunk")?;
    let upper = chunk.block(upper_index);
    if upper.name() != lower.name() {
        return Err("no matching upper half");
    }

    let (hinge, powered) = if chunk.is_alpha() {
        ("left", "false")
    } else {
        (
            upper.property("hinge").unwrap_or("left"),
            upper.property("powered").unwrap_or("false"),
        )
    };
    let facing = lower.property("facing").unwrap_or("east");
    let open = lower.property("open").unwrap_or("false");

    let half = |half: &str| {
        BlockState::with_properties(
            lower.name(),
            [
                ("facing", facing),
                ("half", half),
                ("hinge", hinge),
                ("open", open),
                ("powered", powered),
            ],
        )
    };
    let resolved_lower = half("lower");
    let resolved_upper = half("upper");
    chunk.set_block(index, &resolved_lower);
    chunk.set_block(upper_index, &resolved_upper);
    Ok(())
}

fn pumpkin<C: ChunkCells + ?Sized>(chunk: &mut C, index: u16) -> Resolution {
    if chunk.block(index).name() != "minecraft:carved_pumpkin" {
        return Ok(());
    }
    let Some(below) = block_at(chunk, index, Direction::Down) else {
        return Ok(());
    };
    if matches!(below.name(), "minecraft:grass_block" | "minecraft:dirt") {
        chunk.set_block(index, &BlockState::new("minecraft:pumpkin"));
    }
    Ok(())
}

fn namespaced(name: &str) -> String {
    if name.contains(':') {
        name.to_owned()
    } else {
        format!("minecraft:{}", name)
    }
}

/// Flattened name of a pot holding `item` with data value `data`.
fn potted_plant(item: &str, data: i32) -> Option<&'static str> {
    let potted = match (item, data) {
        ("minecraft:red_flower", 0) => "minecraft:potted_poppy",
        ("minecraft:red_flower", 1) => "minecraft:potted_blue_orchid",
        ("minecraft:red_flower", 2) => "minecraft:potted_allium",
        ("minecraft:red_flower", 3) => "minecraft:potted_azure_bluet",
        ("minecraft:red_flower", 4) => "minecraft:potted_red_tulip",
        ("minecraft:red_flower", 5) => "minecraft:potted_orange_tulip",
        ("minecraft:red_flower", 6) => "minecraft:potted_white_tulip",
        ("minecraft:red_flower", 7) => "minecraft:potted_pink_tulip",
        ("minecraft:red_flower", 8) => "minecraft:potted_oxeye_daisy",
        ("minecraft:yellow_flower", 0) => "minecraft:potted_dandelion",
        ("minecraft:sapling", 0) => "minecraft:potted_oak_sapling",
        ("minecraft:sapling", 1) => "minecraft:potted_spruce_sapling",
        ("minecraft:sapling", 2) => "minecraft:potted_birch_sapling",
        ("minecraft:sapling", 3) => "minecraft:potted_jungle_sapling",
        ("minecraft:sapling", 4) => "minecraft:potted_acacia_sapling",
        ("minecraft:sapling", 5) => "minecraft:potted_dark_oak_sapling",
        ("minecraft:red_mushroom", 0) => "minecraft:potted_red_mushroom",
        ("minecraft:brown_mushroom", 0) => "minecraft:potted_brown_mushroom",
        ("minecraft:deadbush", 0) => "minecraft:potted_dead_bush",
        ("minecraft:tallgrass", 2) => "minecraft:potted_fern",
        ("minecraft:cactus", 0) => "minecraft:potted_cactus",
        _ => return None,
    };
    Some(potted)
}

fn flower_pot<C: ChunkCells + ?Sized>(chunk: &mut C, index: u16) -> Resolution {
    let record = chunk
        .take_block_entity(index)
        .ok_or("no flower pot entity")?;
    let item = match record.get("Item") {
        Some(Tag::String(name)) => Some(namespaced(name)),
        Some(other) => other
            .as_int_lenient()
            .and_then(|id| u16::try_from(id).ok())
            .and_then(|id| LegacyTable::get().block_name(id))
            .map(str::to_owned),
        None => None,
    };
    let data = int_field(&record, "Data").unwrap_or(0);

    let name = item
        .as_deref()
        .and_then(|item| potted_plant(item, data))
        .unwrap_or("minecraft:flower_pot");
    chunk.set_block(index, &BlockState::new(name));
    Ok(())
}

fn skull<C: ChunkCells + ?Sized>(chunk: &mut C, index: u16) -> Resolution {
    let record = chunk.take_block_entity(index).ok_or("no skull entity")?;
    let state = chunk.block(index);
    let skull_type = int_field(&record, "SkullType")
        .and_then(|t| usize::try_from(t).ok())
        .filter(|&t| t < SKULL_KINDS.len())
        .unwrap_or(0);
    let (mob, kind) = SKULL_KINDS[skull_type];

    let on_wall = state.name().ends_with("_wall_skull") || state.name().ends_with("_wall_head");
    let resolved = if on_wall {
        BlockState::with_properties(
            format!("minecraft:{}_wall_{}", mob, kind),
            [("facing", state.property("facing").unwrap_or("north"))],
        )
    } else {
        let rotation = int_field(&record, "Rot").unwrap_or(0).rem_euclid(16);
        BlockState::with_properties(
            format!("minecraft:{}_{}", mob, kind),
            [("rotation", rotation.to_string())],
        )
    };
    chunk.set_block(index, &resolved);
    Ok(())
}

fn double_plant<C: ChunkCells + ?Sized>(chunk: &mut C, index: u16) -> Resolution {
    if chunk.block(index).property("half") != Some("upper") {
        return Ok(());
    }
    let lower = block_at(chunk, index, Direction::Down).ok_or("upper half at the bottom")?;
    if !DOUBLE_PLANTS.contains(&lower.name()) {
        return Err("no double plant below");
    }
    chunk.set_block(
        index,
        &BlockState::with_properties(lower.name(), [("half", "upper")]),
    );
    Ok(())
}

fn banner<C: ChunkCells + ?Sized>(chunk: &mut C, index: u16) -> Resolution {
    let record = chunk.take_block_entity(index).ok_or("no banner entity")?;
    let state = chunk.block(index);
    let base = int_field(&record, "Base").unwrap_or(15);
    if base == 15 || !(0..16).contains(&base) {
        return Ok(());
    }
    let color = COLORS[(15 - base) as usize];
    let name = if state.name().ends_with("_wall_banner") {
        format!("minecraft:{}_wall_banner", color)
    } else {
        format!("minecraft:{}_banner", color)
    };
    chunk.set_block(index, &state.renamed(name));
    Ok(())
}
