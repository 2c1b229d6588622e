// lectern-core/src/install/mod.rs
pub mod extract;
pub mod patch;
pub mod plugin;

pub use patch::install_patches;
pub use plugin::install_plugins;
