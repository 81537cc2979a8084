use super::RawAudioChunk;
use std::{collections::VecDeque, mem};

/// FIFO of captured chunks awaiting the next update tick.
///
/// The queue is owned behind its own lock by the engine: the capture
/// callback pushes single chunks, and the update loop swaps out the whole
/// backlog in one step so neither side holds the lock for long.
#[derive(Debug, Default)]
pub struct CaptureQueue {
    chunks: VecDeque<RawAudioChunk>,
    samples: usize,
    max_samples: usize,
}

impl CaptureQueue {
    /// Creates a queue which holds at most `max_samples` unread samples.
    pub fn new(max_samples: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            samples: 0,
            max_samples,
        }
    }

    /// Appends a chunk, evicting the oldest chunks beyond the sample limit.
    ///
    /// Returns the number of chunks evicted.
    pub fn push(&mut self, chunk: RawAudioChunk) -> usize {
        self.samples += chunk.remaining();
        self.chunks.push_back(chunk);

        let mut evicted = 0;
        while self.samples > self.max_samples && self.chunks.len() > 1 {
            if let Some(old) = self.chunks.pop_front() {
                self.samples -= old.remaining();
                evicted += 1;
            }
        }

        evicted
    }

    /// Moves all queued chunks out, in arrival order.
    pub fn drain(&mut self) -> VecDeque<RawAudioChunk> {
        self.samples = 0;
        mem::take(&mut self.chunks)
    }

    /// Number of queued samples.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Number of queued chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunks are queued.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(v: i16, len: usize) -> RawAudioChunk {
        RawAudioChunk::new(vec![v; len].into_boxed_slice())
    }

    #[test]
    fn drain_preserves_arrival_order() {
        let mut q = CaptureQueue::new(100);
        q.push(chunk(1, 4));
        q.push(chunk(2, 4));
        assert_eq!(q.samples(), 8);

        let out: Vec<i16> = q.drain().iter().map(|c| c.samples()[0]).collect();
        assert_eq!(out, vec![1, 2]);
        assert!(q.is_empty());
        assert_eq!(q.samples(), 0);
    }

    #[test]
    fn oldest_chunks_are_evicted_past_limit() {
        let mut q = CaptureQueue::new(10);
        assert_eq!(q.push(chunk(1, 6)), 0);
        assert_eq!(q.push(chunk(2, 6)), 1);
        assert_eq!(q.len(), 1);
        assert_eq!(q.drain()[0].samples()[0], 2);
    }

    #[test]
    fn oversized_chunk_is_kept() {
        let mut q = CaptureQueue::new(2);
        assert_eq!(q.push(chunk(1, 6)), 0);
        assert_eq!(q.len(), 1);
    }
}
