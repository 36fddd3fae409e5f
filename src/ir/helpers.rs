use ahash::{AHasher, RandomState};
use std::hash::BuildHasher;

/// Hasher builder with fixed seeds: the same values hash the same way
/// in every run.
#[derive(Clone, Copy, Debug, Default)]
pub struct RepeatableState;

impl BuildHasher for RepeatableState {
    type Hasher = AHasher;

    fn build_hasher(&self) -> Self::Hasher {
        RandomState::with_seeds(0, 0, 0, 0).build_hasher()
    }
}
