use crate::error::MiningError;
use crate::pow::{digest_meets_target, digest_with_nonce};
use crate::Hash;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Shared stop flag for an in-flight nonce search. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Searches nonces in parallel until a digest has `difficulty` leading zero hex
/// characters, or until `cancel` fires. `workers` sizes a dedicated pool;
/// `None` runs on rayon's global pool.
///
/// A solution found at the same moment as a cancellation is still returned.
/// Running out of nonces without a solution yields [`MiningError::Exhausted`].
pub fn search_nonce_parallel(
    prefix: &[u8],
    difficulty: usize,
    workers: Option<usize>,
    cancel: &CancelToken,
) -> Result<(u64, Hash), MiningError> {
    let search = || {
        // Rayon splits the full u64 range across threads.
        (0u64..u64::MAX).into_par_iter().find_any(|nonce| {
            cancel.is_cancelled() || digest_meets_target(&digest_with_nonce(prefix, *nonce), difficulty)
        })
    };

    let found = match workers {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| MiningError::WorkerPool(e.to_string()))?
            .install(search),
        None => search(),
    };

    match found {
        Some(nonce) => {
            let hash = digest_with_nonce(prefix, nonce);
            if digest_meets_target(&hash, difficulty) {
                Ok((nonce, hash))
            } else {
                debug!("nonce search cancelled at nonce {}", nonce);
                Err(MiningError::Cancelled)
            }
        }
        None => Err(MiningError::Exhausted),
    }
}
