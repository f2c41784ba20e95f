pub use elytra_common as common;
pub use elytra_logger as logger;
pub use elytra_nbt as nbt;
pub use elytra_wotra as wotra;

// Re-export commonly used items
pub use elytra_common::{ElytraError, Result};
pub use elytra_logger::{log, LogSeverity};
pub use elytra_nbt::{NBTFile, Tag};
pub use elytra_wotra::{
    upgrade_chunk, upgrade_level, BlockState, ChunkUpgrader, UpgradeData, UpgradedSection,
};
