pub mod chain_state;
pub mod dag;
pub mod orphans;
pub mod strong_blocks;

pub use bobtail_database::prelude::DB;
