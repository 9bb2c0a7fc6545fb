//! Worker pool for off-thread decoding.
//!
//! Decode jobs run on a dedicated rayon pool. Workers never touch request or
//! surface state: each finished job is posted back over a channel together
//! with an opaque tag, and the owner applies the result on its own thread.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::trace;

use super::decoder::TileDecoder;
use super::error::DecodeError;
use super::tile::DecodedImage;

/// Result of one pooled decode, tagged with the submitter's context.
pub struct DecodeOutcome<T> {
    pub tag: T,
    pub result: Result<DecodedImage, DecodeError>,
}

/// Fixed-size pool of decode workers.
pub struct DecodePool {
    pool: rayon::ThreadPool,
}

impl DecodePool {
    /// Start a pool with `workers` threads.
    pub fn new(workers: usize) -> Result<Self, DecodeError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|index| format!("tile-decode-{}", index))
            .build()
            .map_err(|e| DecodeError::Pool(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Decode `bytes` on a worker and post the outcome to `results`.
    pub fn submit<T: Send + 'static>(
        &self,
        decoder: Arc<dyn TileDecoder>,
        bytes: Bytes,
        format: String,
        tag: T,
        results: mpsc::UnboundedSender<DecodeOutcome<T>>,
    ) {
        self.pool.spawn(move || {
            let result = decoder.decode(&bytes, &format);
            if results.send(DecodeOutcome { tag, result }).is_err() {
                trace!("Decode result dropped, owner is gone");
            }
        });
    }
}

impl std::fmt::Debug for DecodePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodePool")
            .field("workers", &self.workers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ImageTileDecoder;

    struct FixedDecoder;

    impl TileDecoder for FixedDecoder {
        fn decode(&self, bytes: &[u8], _format_hint: &str) -> Result<DecodedImage, DecodeError> {
            if bytes == b"bad" {
                return Err(DecodeError::Malformed("bad".to_string()));
            }
            DecodedImage::new(1, 1, vec![bytes[0], 0, 0, 255])
        }
    }

    #[test]
    fn test_pool_reports_workers() {
        let pool = DecodePool::new(2).unwrap();
        assert_eq!(pool.workers(), 2);
    }

    #[test]
    fn test_zero_workers_still_runs() {
        let pool = DecodePool::new(0).unwrap();
        assert_eq!(pool.workers(), 1);
    }

    #[test]
    fn test_outcomes_come_back_tagged() {
        let pool = DecodePool::new(2).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let decoder: Arc<dyn TileDecoder> = Arc::new(FixedDecoder);

        pool.submit(
            Arc::clone(&decoder),
            Bytes::from_static(b"\x07"),
            "png".to_string(),
            1u32,
            tx.clone(),
        );
        pool.submit(decoder, Bytes::from_static(b"bad"), "png".to_string(), 2u32, tx);

        let mut outcomes = vec![rx.blocking_recv().unwrap(), rx.blocking_recv().unwrap()];
        outcomes.sort_by_key(|o| o.tag);

        assert_eq!(outcomes[0].tag, 1);
        assert_eq!(outcomes[0].result.as_ref().unwrap().pixels[0], 7);
        assert_eq!(outcomes[1].tag, 2);
        assert!(outcomes[1].result.is_err());
    }

    #[test]
    fn test_pool_with_image_decoder_reports_malformed() {
        let pool = DecodePool::new(1).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        pool.submit(
            Arc::new(ImageTileDecoder::new()),
            Bytes::from_static(b"nope"),
            "png".to_string(),
            (),
            tx,
        );

        let outcome = rx.blocking_recv().unwrap();
        assert!(matches!(outcome.result, Err(DecodeError::Malformed(_))));
    }
}
