//! Batch accumulation

use contracts::ClassifiedReading;

/// Accumulates classified readings into fixed-size batches
#[derive(Debug)]
pub struct BatchBuffer {
    batch_size: usize,
    pending: Vec<ClassifiedReading>,
}

impl BatchBuffer {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            pending: Vec::with_capacity(batch_size),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Add a reading; returns the full batch once `batch_size` is reached
    pub fn push(&mut self, reading: ClassifiedReading) -> Option<Vec<ClassifiedReading>> {
        self.pending.push(reading);
        if self.pending.len() >= self.batch_size {
            Some(self.take())
        } else {
            None
        }
    }

    /// Flush whatever is pending (possibly empty)
    pub fn take(&mut self) -> Vec<ClassifiedReading> {
        std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
