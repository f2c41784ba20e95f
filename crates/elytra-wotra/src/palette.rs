use crate::block_state::BlockState;
use std::collections::HashMap;

/// Append-only, insertion-ordered palette of block states for one section.
#[derive(Debug, Clone, Default)]
pub struct PaletteRegistry {
    states: Vec<BlockState>,
    state_to_index: HashMap<BlockState, u32>,
}

impl PaletteRegistry {
    pub fn new() -> Self {
        PaletteRegistry::default()
    }

    /// A registry whose index 0 is air.
    pub fn with_air() -> Self {
        let mut palette = PaletteRegistry::new();
        palette.id_for(&BlockState::air());
        palette
    }

    /// Index of `state`, appending it if this is its first use.
    pub fn id_for(&mut self, state: &BlockState) -> u32 {
        if let Some(&index) = self.state_to_index.get(state) {
            return index;
        }
        let index = self.states.len() as u32;
        self.states.push(state.clone());
        self.state_to_index.insert(state.clone(), index);
        index
    }

    pub fn get(&self, index: u32) -> Option<&BlockState> {
        self.states.get(index as usize)
    }

    pub fn index_of(&self, state: &BlockState) -> Option<u32> {
        self.state_to_index.get(state).copied()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[BlockState] {
        &self.states
    }

    pub fn into_states(self) -> Vec<BlockState> {
        self.states
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air_first() {
        let palette = PaletteRegistry::with_air();
        assert_eq!(palette.len(), 1);
        assert!(palette.get(0).unwrap().is_air());
    }

    #[test]
    fn test_insertion_order_and_dedup() {
        let mut palette = PaletteRegistry::with_air();
        let stone = BlockState::new("minecraft:stone");
        let dirt = BlockState::new("minecraft:dirt");

        assert_eq!(palette.id_for(&stone), 1);
        assert_eq!(palette.id_for(&dirt), 2);
        assert_eq!(palette.id_for(&BlockState::new("minecraft:stone")), 1);
        assert_eq!(palette.id_for(&BlockState::air()), 0);

        let names: Vec<&str> = palette.states().iter().map(BlockState::name).collect();
        assert_eq!(names, ["minecraft:air", "minecraft:stone", "minecraft:dirt"]);
        assert_eq!(palette.index_of(&dirt), Some(2));
        assert_eq!(palette.index_of(&BlockState::new("minecraft:sand")), None);
    }
}
