use bobtail_consensus_core::{strong_block::StrongBlock, subblock::Subblock};

pub mod infra;
pub mod miner;
pub mod network;
pub mod node;

#[derive(Clone)]
pub enum SimMessage {
    Subblock(Subblock),
    /// A block finalized by the sending node
    StrongBlock(StrongBlock),
}
