use bobtail_hashes::Hash;
use std::collections::{HashMap, HashSet};

pub mod api;
pub mod blockhash;
pub mod chain;
pub mod config;
pub mod errors;
pub mod hashing;
pub mod header;
pub mod notify;
pub mod status;
pub mod strong_block;
pub mod subblock;
pub mod tx;

/// The number of subblocks aggregated into a strong block
pub type KType = u16;

pub type BlockHashSet = HashSet<Hash>;
pub type BlockHashMap<V> = HashMap<Hash, V>;
