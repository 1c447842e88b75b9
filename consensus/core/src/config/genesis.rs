use bobtail_hashes::Hash;
use serde::{Deserialize, Serialize};

/// The strong block every chain starts from. It aggregates no subblocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBlock {
    pub hash: Hash,
    pub version: u16,
    pub timestamp: u64,
}

pub const DEVNET_GENESIS: GenesisBlock = GenesisBlock {
    hash: Hash::from_bytes([
        0x3c, 0x1e, 0x7a, 0x55, 0x0b, 0x9f, 0x42, 0xd8, 0x61, 0x2e, 0xa4, 0x17, 0xc3, 0x88, 0x05, 0xfe, 0x9d, 0x34, 0x70, 0xb2, 0x1c,
        0x6f, 0xe8, 0x43, 0x92, 0x0a, 0xd5, 0x7b, 0x26, 0xcc, 0x81, 0x4f,
    ]),
    version: 1,
    timestamp: 1_700_000_000_000,
};

pub const SIMNET_GENESIS: GenesisBlock = GenesisBlock {
    hash: Hash::from_bytes([
        0x91, 0x3a, 0xc0, 0x5d, 0x27, 0xe4, 0x68, 0x0f, 0xb3, 0x4c, 0x19, 0xa7, 0x52, 0xde, 0x86, 0x3b, 0x0e, 0xf1, 0x74, 0x29, 0xc8,
        0x5a, 0x13, 0x9e, 0x67, 0xb0, 0x2d, 0xf6, 0x48, 0x83, 0x1c, 0xe5,
    ]),
    version: 1,
    timestamp: 1_700_000_000_000,
};
