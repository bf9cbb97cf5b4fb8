//! Ctrl+C / SIGTERM handling for the viewer loop.
//!
//! The first signal only raises a flag so the loop can stop the session and
//! print its summary. A second signal while the flag is raised exits with code 1.

use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    /// Register handlers for every termination signal.
    pub fn install() -> Result<Self, std::io::Error> {
        let shutdown = Self::default();

        for sig in TERM_SIGNALS {
            // Order matters: the conditional exit must see the flag before this signal sets it
            flag::register_conditional_shutdown(*sig, 1, Arc::clone(&shutdown.requested))?;
            flag::register(*sig, Arc::clone(&shutdown.requested))?;
        }

        Ok(shutdown)
    }

    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
