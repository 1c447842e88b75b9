pub mod config;
pub mod consensus;
pub mod rule;
pub mod strong_block;
