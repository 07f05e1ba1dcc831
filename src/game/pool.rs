//! Shuffle-and-draw card pools.

use rand::Rng;
use std::sync::Arc;

use super::errors::{SessionError, SessionResult};

/// A pool of cards drawn without replacement.
///
/// Drawing removes a uniformly random card from the working set. Once the
/// working set runs dry it is refilled from the full source set before the
/// next draw, so a card never repeats within one cycle.
#[derive(Clone, Debug)]
pub struct CardPool {
    source: Arc<[String]>,
    working: Vec<String>,
    refills: usize,
}

impl CardPool {
    /// Create a pool from its full source set
    ///
    /// # Arguments
    ///
    /// * `label` - Name used in the error when `source` is empty
    /// * `source` - Every card the pool can ever hand out
    pub fn new(label: &'static str, source: Vec<String>) -> SessionResult<Self> {
        if source.is_empty() {
            return Err(SessionError::EmptyPool(label));
        }
        let source: Arc<[String]> = source.into();
        Ok(Self {
            working: source.to_vec(),
            source,
            refills: 0,
        })
    }

    /// Remove and return one random card, refilling first if needed
    pub fn draw(&mut self) -> String {
        if self.working.is_empty() {
            self.reset();
            self.refills += 1;
            log::debug!("Pool refilled with {} cards", self.working.len());
        }
        let idx = rand::rng().random_range(0..self.working.len());
        self.working.swap_remove(idx)
    }

    /// Draw `n` cards
    pub fn draw_many(&mut self, n: usize) -> Vec<String> {
        (0..n).map(|_| self.draw()).collect()
    }

    /// Put every card back
    pub fn reset(&mut self) {
        self.working = self.source.to_vec();
    }

    /// Cards left before the next refill
    pub fn remaining(&self) -> usize {
        self.working.len()
    }

    /// How many times the working set ran dry and was refilled
    pub fn refills(&self) -> usize {
        self.refills
    }

    pub fn contains(&self, card: &str) -> bool {
        self.source.iter().any(|c| c == card)
    }
}

/// The two pools a session draws from.
#[derive(Clone, Debug)]
pub struct Decks {
    pub prompts: CardPool,
    pub responses: CardPool,
}

impl Decks {
    pub fn new(prompts: Vec<String>, responses: Vec<String>) -> SessionResult<Self> {
        Ok(Self {
            prompts: CardPool::new("prompt", prompts)?,
            responses: CardPool::new("response", responses)?,
        })
    }

    pub fn reset(&mut self) {
        self.prompts.reset();
        self.responses.reset();
    }
}
