//! Random ordering of a round's responses.
//!
//! The shuffle is a trait so tests and replays can plug in a seeded source.
//! Scoring only ever looks at `is_llm` and `author_id`, never at positions.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::types::Response;

pub trait ResponseShuffler: Send + Sync {
    /// Permute `responses` in place
    fn shuffle(&self, responses: &mut [Response]);
}

/// Production shuffler backed by the thread-local OS-seeded generator
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomShuffler;

impl ResponseShuffler for RandomShuffler {
    fn shuffle(&self, responses: &mut [Response]) {
        responses.shuffle(&mut rand::rng());
    }
}

/// Reproducible shuffler for tests
pub struct SeededShuffler {
    rng: Mutex<StdRng>,
}

impl SeededShuffler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl ResponseShuffler for SeededShuffler {
    fn shuffle(&self, responses: &mut [Response]) {
        responses.shuffle(&mut *self.rng.lock());
    }
}

/// Leaves the submission order untouched (LLM response last)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoShuffle;

impl ResponseShuffler for NoShuffle {
    fn shuffle(&self, _responses: &mut [Response]) {}
}
