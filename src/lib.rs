pub mod assets;
pub mod config;
pub mod definitions;
pub mod git;
pub mod packs;
pub mod reconcile;
pub mod remote;
pub mod state;
pub mod sync;
pub mod telegram;
pub mod utils;
