//! Row batching
//!
//! Buffers rows in arrival order and detaches a full batch whenever the
//! configured threshold is reached. The end-of-input flush detaches
//! whatever remains, including an empty batch, so every import submits at
//! least one write task.

use super::parser::RawRow;

/// A detached, ordered group of rows ready for one write task.
pub type Batch = Vec<RawRow>;

/// Accumulates rows into fixed-size batches.
#[derive(Debug)]
pub struct BatchAccumulator {
    buffer: Vec<RawRow>,
    batch_size: usize,
    total_rows: u64,
}

impl BatchAccumulator {
    pub fn new(batch_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(batch_size),
            batch_size,
            total_rows: 0,
        }
    }

    /// Append a row; returns a detached batch once the threshold is hit.
    pub fn push(&mut self, row: RawRow) -> Option<Batch> {
        self.buffer.push(row);
        self.total_rows += 1;

        if self.buffer.len() >= self.batch_size {
            let full = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
            Some(full)
        } else {
            None
        }
    }

    /// Detach the remainder at end of input (possibly empty).
    pub fn finish(&mut self) -> Batch {
        std::mem::take(&mut self.buffer)
    }

    /// Monotonic count of every row pushed so far.
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }
}
