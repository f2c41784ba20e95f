use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// One pre-flattening block id and the flattened state of each data value it used.
#[derive(Deserialize, Debug)]
struct LegacyBlock {
    id: u16,
    /// Pre-flattening registry name, e.g. `minecraft:red_flower`.
    name: String,
    /// Data nibble (as a decimal string) to `namespace:name[key=value,...]`.
    states: BTreeMap<String, String>,
}

/// Splits `minecraft:oak_door[facing=east,half=lower]` into its name and properties.
fn split_state(state: &str) -> (String, Vec<(String, String)>) {
    let (name, rest) = match state.find('[') {
        Some(open) => (&state[..open], Some(&state[open + 1..])),
        None => (state, None),
    };
    assert!(
        name.contains(':') && !name.is_empty(),
        "State name must be namespaced: {}",
        state
    );

    let mut properties = Vec::new();
    if let Some(rest) = rest {
        let body = rest
            .strip_suffix(']')
            .unwrap_or_else(|| panic!("Unterminated property list: {}", state));
        for pair in body.split(',').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .unwrap_or_else(|| panic!("Property without value in {}", state));
            properties.push((key.to_owned(), value.to_owned()));
        }
        properties.sort();
    }
    (name.to_owned(), properties)
}

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let table_path = Path::new(&manifest_dir).join("legacy_blocks.json");
    let table_json = fs::read_to_string(&table_path).expect("Failed to read legacy_blocks.json");

    let blocks: Vec<LegacyBlock> =
        serde_json::from_str(&table_json).expect("Failed to parse legacy_blocks.json");

    let out_dir = env::var_os("OUT_DIR").expect("OUT_DIR not set");
    let dest_path = Path::new(&out_dir).join("legacy_blocks.rs");
    let mut out = BufWriter::new(File::create(&dest_path).expect("Failed to create legacy_blocks.rs"));

    let mut seen_ids = HashSet::new();
    let mut names = Vec::new();
    let mut states = Vec::new();

    for block in &blocks {
        assert!(block.id < 4096, "Block id {} does not fit in 12 bits", block.id);
        assert!(seen_ids.insert(block.id), "Block id {} listed twice", block.id);
        names.push((block.id, block.name.clone()));

        for (data, state) in &block.states {
            let data: u16 = data
                .parse()
                .unwrap_or_else(|_| panic!("Bad data value {:?} for block {}", data, block.id));
            assert!(data < 16, "Data value {} out of range for block {}", data, block.id);
            states.push(((block.id << 4) | data, split_state(state)));
        }
    }
    states.sort_by_key(|(legacy, _)| *legacy);

    writeln!(out, "pub static LEGACY_BLOCK_NAMES: &[(u16, &str)] = &[").unwrap();
    for (id, name) in &names {
        writeln!(out, "    ({}, {:?}),", id, name).unwrap();
    }
    writeln!(out, "];").unwrap();

    writeln!(
        out,
        "pub static LEGACY_BLOCK_STATES: &[(u16, &str, &[(&str, &str)])] = &["
    )
    .unwrap();
    for (legacy, (name, properties)) in &states {
        let properties: Vec<String> = properties
            .iter()
            .map(|(k, v)| format!("({:?}, {:?})", k, v))
            .collect();
        writeln!(
            out,
            "    ({}, {:?}, &[{}]),",
            legacy,
            name,
            properties.join(", ")
        )
        .unwrap();
    }
    writeln!(out, "];").unwrap();

    println!("cargo:rerun-if-changed=legacy_blocks.json");
    println!("cargo:rerun-if-changed=build.rs");
}
