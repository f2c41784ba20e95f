use elytra_nbt::Tag;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

pub const AIR_NAME: &str = "minecraft:air";

static AIR: Lazy<BlockState> = Lazy::new(|| BlockState::new(AIR_NAME));

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct StateData {
    name: String,
    properties: BTreeMap<String, String>,
}

/// A flattened block state: a namespaced name plus a sorted property map.
///
/// Immutable and cheap to clone. Equality and hashing are by value, so two states
/// built independently from the same name and properties share one palette entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockState(Arc<StateData>);

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        BlockState(Arc::new(StateData {
            name: name.into(),
            properties: BTreeMap::new(),
        }))
    }

    pub fn with_properties<I, K, V>(name: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        BlockState(Arc::new(StateData {
            name: name.into(),
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }))
    }

    /// The shared air state. Palette index 0 of every upgraded section.
    pub fn air() -> BlockState {
        AIR.clone()
    }

    /// Parses `namespace:name[key=value,...]`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (name, properties) = match s.find('[') {
            Some(open) => {
                let body = s[open + 1..]
                    .strip_suffix(']')
                    .ok_or_else(|| format!("Unterminated property list in {:?}", s))?;
                let mut properties = BTreeMap::new();
                for pair in body.split(',').filter(|p| !p.is_empty()) {
                    let (key, value) = pair
                        .split_once('=')
                        .ok_or_else(|| format!("Property without value in {:?}", s))?;
                    properties.insert(key.to_owned(), value.to_owned());
                }
                (&s[..open], properties)
            }
            None => (s, BTreeMap::new()),
        };

        if name.is_empty() {
            return Err(format!("Empty block name in {:?}", s));
        }

        Ok(BlockState(Arc::new(StateData {
            name: name.to_owned(),
            properties,
        })))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.0.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.0.properties
    }

    pub fn is_air(&self) -> bool {
        self.0.name == AIR_NAME
    }

    /// A copy of this state with one property set.
    pub fn with(&self, key: &str, value: impl Into<String>) -> BlockState {
        let mut properties = self.0.properties.clone();
        properties.insert(key.to_owned(), value.into());
        BlockState(Arc::new(StateData {
            name: self.0.name.clone(),
            properties,
        }))
    }

    /// A copy of this state under another name, keeping every property.
    pub fn renamed(&self, name: impl Into<String>) -> BlockState {
        BlockState(Arc::new(StateData {
            name: name.into(),
            properties: self.0.properties.clone(),
        }))
    }

    /// Palette entry form: `{Name: "...", Properties: {...}}`, Properties omitted when empty.
    pub fn to_tag(&self) -> Tag {
        let mut compound = HashMap::new();
        compound.insert("Name".to_owned(), Tag::String(self.0.name.clone()));
        if !self.0.properties.is_empty() {
            let properties = self
                .0
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), Tag::String(v.clone())))
                .collect();
            compound.insert("Properties".to_owned(), Tag::Compound(properties));
        }
        Tag::Compound(compound)
    }

    pub fn from_tag(tag: &Tag) -> Option<BlockState> {
        let name = tag.get("Name")?.as_string()?;
        let mut properties = BTreeMap::new();
        if let Some(props) = tag.get("Properties") {
            for (key, value) in props.as_compound()? {
                properties.insert(key.clone(), value.as_string()?.clone());
            }
        }
        Some(BlockState(Arc::new(StateData {
            name: name.clone(),
            properties,
        })))
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)?;
        if !self.0.properties.is_empty() {
            let pairs: Vec<String> = self
                .0
                .properties
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "[{}]", pairs.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_and_display() {
        let door = BlockState::parse("minecraft:oak_door[half=lower,facing=east]").unwrap();
        assert_eq!(door.name(), "minecraft:oak_door");
        assert_eq!(door.property("facing"), Some("east"));
        assert_eq!(door.property("hinge"), None);
        assert_eq!(door.to_string(), "minecraft:oak_door[facing=east,half=lower]");

        let stone = BlockState::parse("minecraft:stone").unwrap();
        assert!(stone.properties().is_empty());
        assert_eq!(stone.to_string(), "minecraft:stone");
    }

    #[test]
    fn test_parse_errors() {
        assert!(BlockState::parse("minecraft:oak_door[facing=east").is_err());
        assert!(BlockState::parse("minecraft:oak_door[facing]").is_err());
        assert!(BlockState::parse("[facing=east]").is_err());
    }

    #[test]
    fn test_value_equality() {
        let a = BlockState::with_properties("minecraft:grass_block", [("snowy", "true")]);
        let b = BlockState::parse("minecraft:grass_block[snowy=true]").unwrap();
        let c = BlockState::parse("minecraft:grass_block[snowy=false]").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<BlockState> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_with_and_renamed() {
        let grass = BlockState::parse("minecraft:grass_block[snowy=false]").unwrap();
        assert_eq!(grass.with("snowy", "true").to_string(), "minecraft:grass_block[snowy=true]");
        // The original is untouched
        assert_eq!(grass.property("snowy"), Some("false"));

        let bed = BlockState::parse("minecraft:red_bed[facing=north,occupied=false,part=head]").unwrap();
        let blue = bed.renamed("minecraft:blue_bed");
        assert_eq!(blue.name(), "minecraft:blue_bed");
        assert_eq!(blue.properties(), bed.properties());
    }

    #[test]
    fn test_tag_round_trip() {
        let wall = BlockState::parse("minecraft:white_wall_banner[facing=south]").unwrap();
        let tag = wall.to_tag();
        assert_eq!(
            tag.get("Name"),
            Some(&Tag::String("minecraft:white_wall_banner".into()))
        );
        assert_eq!(BlockState::from_tag(&tag), Some(wall));

        let air_tag = BlockState::air().to_tag();
        assert!(air_tag.get("Properties").is_none());
        assert!(BlockState::from_tag(&air_tag).unwrap().is_air());
    }
}
