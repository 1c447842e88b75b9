use bobtail_consensus_core::{notify::Notification, strong_block::StrongBlock};
use bobtail_hashes::Hash;
use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

#[allow(dead_code)] // Usage by integration tests is ignored by the compiler
pub fn shuffled<T: Clone>(items: &[T], seed: u64) -> Vec<T> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut items = items.to_vec();
    items.shuffle(&mut rng);
    items
}

#[allow(dead_code)]
pub fn finalized_blocks(notifications: &[Notification]) -> Vec<Arc<StrongBlock>> {
    notifications
        .iter()
        .filter_map(|notification| match notification {
            Notification::StrongBlockFinalized(n) => Some(n.block.clone()),
            _ => None,
        })
        .collect()
}

#[allow(dead_code)]
pub fn expired_orphans(notifications: &[Notification]) -> Vec<Hash> {
    notifications
        .iter()
        .filter_map(|notification| match notification {
            Notification::OrphanExpired(n) => Some(n.hash),
            _ => None,
        })
        .collect()
}
