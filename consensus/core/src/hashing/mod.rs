pub mod header;
pub mod strong_block;
pub mod tx;
