/// What happens right after a [`Chunk`] has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkEnd {
    /// All declared bytes are written, the response completes normally.
    Done,
    /// Flush and wait one pacing interval before the next chunk.
    Pace,
    /// Flush and sever the connection, leaving `Content-Length` unfulfilled.
    Sever,
}

/// One logical write of the delivery loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub len: u64,
    pub end: ChunkEnd,
}

/// Chunk schedule of a single response body.
///
/// Pure bookkeeping: it decides how many bytes each write carries and what
/// follows it, the I/O is driven by the delivery stream.
#[derive(Debug, Clone)]
pub struct DeliveryPlan {
    remaining: u64,
    chunk_size: u64,
    cut_off: Option<u64>,
    finished: bool,
}

impl DeliveryPlan {
    /// Create a plan for `size` bytes.
    ///
    /// Without a `chunk_size` the whole body is a single unpaced write.
    #[must_use]
    pub fn new(size: u64, chunk_size: Option<u64>, cut_off: Option<u64>) -> Self {
        Self {
            remaining: size,
            chunk_size: chunk_size.unwrap_or(size).max(1),
            cut_off,
            finished: false,
        }
    }

    /// Size of the largest write this plan will ever produce.
    #[must_use]
    pub fn max_chunk_len(&self) -> u64 {
        self.chunk_size.min(self.remaining)
    }
}

impl Iterator for DeliveryPlan {
    type Item = Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.remaining == 0 {
            return None;
        }

        let mut len = self.remaining.min(self.chunk_size);
        if let Some(cut_off) = self.cut_off.as_mut() {
            len = len.min(*cut_off);
            *cut_off -= len;
        }
        self.remaining -= len;

        let end = if self.remaining == 0 {
            self.finished = true;
            ChunkEnd::Done
        } else if self.cut_off == Some(0) {
            self.finished = true;
            ChunkEnd::Sever
        } else {
            ChunkEnd::Pace
        };

        Some(Chunk { len, end })
    }
}
