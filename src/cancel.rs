use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation handle for one source adapter run.
///
/// Every adapter start gets a fresh token stamped with the session generation.
/// Cloning shares the flag, so worker threads that outlive the adapter observe
/// `stop()` and drop their results instead of reporting them. The generation
/// lets the receiving side reject anything produced by an earlier run.
#[derive(Clone, Debug)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    generation: u64,
}

impl CancelToken {
    pub fn new(generation: u64) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            generation,
        }
    }

    /// Request cancellation. Non-blocking; workers check cooperatively.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a result tagged with `generation` may still be applied.
    pub fn accepts(&self, generation: u64) -> bool {
        !self.is_cancelled() && generation == self.generation
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_new_token_not_cancelled() {
        let token = CancelToken::new(3);
        assert!(!token.is_cancelled());
        assert_eq!(token.generation(), 3);
    }

    #[test]
    fn test_clone_shares_state() {
        let token1 = CancelToken::new(1);
        let token2 = token1.clone();

        token2.cancel();

        assert!(token1.is_cancelled());
        assert!(token2.is_cancelled());
    }

    #[test]
    fn test_accepts_only_own_generation() {
        let token = CancelToken::new(2);
        assert!(token.accepts(2));
        assert!(!token.accepts(1));
        assert!(!token.accepts(3));

        token.cancel();
        assert!(!token.accepts(2));
    }

    #[test]
    fn test_cancel_observed_by_worker() {
        let token = CancelToken::new(1);
        let worker_token = token.clone();

        let handle = thread::spawn(move || {
            let mut spins = 0u64;
            while !worker_token.is_cancelled() {
                spins += 1;
                thread::yield_now();
            }
            spins
        });

        thread::sleep(Duration::from_millis(5));
        token.cancel();
        handle.join().unwrap();
        assert!(token.is_cancelled());
    }
}
