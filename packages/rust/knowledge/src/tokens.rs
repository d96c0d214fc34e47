//! Token accounting for uploaded content.
//!
//! Counts use the `o200k_base` byte-pair encoding, so they match what the
//! store's models see.

use tiktoken_rs::CoreBPE;

use kbimport_shared::{ImportError, Result};

/// Anything that can count how many tokens a text costs.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

impl<T: TokenCounter + ?Sized> TokenCounter for &T {
    fn count(&self, text: &str) -> usize {
        (**self).count(text)
    }
}

/// Exact counts with the `o200k_base` encoding.
pub struct O200kTokenCounter {
    bpe: CoreBPE,
}

impl O200kTokenCounter {
    /// Load the encoding tables.
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::o200k_base()
            .map_err(|e| ImportError::parse(format!("failed to load o200k_base encoding: {e}")))?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for O200kTokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Per-batch list of token counts.
#[derive(Debug, Clone)]
pub struct TokenAccountant<C = O200kTokenCounter> {
    counter: C,
    counts: Vec<usize>,
}

impl<C: TokenCounter> TokenAccountant<C> {
    pub fn new(counter: C) -> Self {
        Self {
            counter,
            counts: Vec::new(),
        }
    }

    /// Count `text` and remember the result.
    pub fn record(&mut self, text: &str) -> usize {
        let n = self.counter.count(text);
        self.counts.push(n);
        n
    }

    /// Count `text` without recording it.
    pub fn count(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Mean of every recorded count, `0.0` when nothing was recorded.
    pub fn average(&self) -> f64 {
        if self.counts.is_empty() {
            return 0.0;
        }
        self.counts.iter().sum::<usize>() as f64 / self.counts.len() as f64
    }
}
