use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Returned from a suspension point once the run has been cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

#[derive(Debug, Default)]
struct Flags {
    paused: bool,
    cancelled: bool,
}

#[derive(Debug, Default)]
struct Shared {
    flags: Mutex<Flags>,
    wake: Condvar,
}

///
/// Pause and cancel state shared between a run and whoever controls it.
///
/// Each run gets a fresh token. Cancellation is monotonic; pausing only blocks
/// the run at its next suspension point and never touches tree or random state.
#[derive(Debug, Clone, Default)]
pub struct RunToken {
    shared: Arc<Shared>,
}

impl RunToken {
    pub fn new() -> RunToken {
        RunToken::default()
    }

    fn flags(&self) -> MutexGuard<'_, Flags> {
        self.shared
            .flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pause(&self) {
        self.flags().paused = true;
    }

    pub fn resume(&self) {
        self.flags().paused = false;
        self.shared.wake.notify_all();
    }

    pub fn cancel(&self) {
        self.flags().cancelled = true;
        self.shared.wake.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.flags().paused
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags().cancelled
    }

    /// Blocks while paused. Fails once cancelled, including while paused.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        let mut flags = self.flags();
        while flags.paused && !flags.cancelled {
            flags = self
                .shared
                .wake
                .wait(flags)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if flags.cancelled {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `delay` as an animation pause. Returns early on cancel; time
    /// spent paused does not count towards the delay.
    pub fn wait(&self, delay: Duration) -> Result<(), Cancelled> {
        if delay.is_zero() {
            return self.checkpoint();
        }
        let mut remaining = delay;
        let mut flags = self.flags();
        loop {
            if flags.cancelled {
                return Err(Cancelled);
            }
            if flags.paused {
                flags = self
                    .shared
                    .wake
                    .wait(flags)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            }
            if remaining.is_zero() {
                return Ok(());
            }
            let started = Instant::now();
            let (guard, _) = self
                .shared
                .wake
                .wait_timeout(flags, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            flags = guard;
            remaining = remaining.saturating_sub(started.elapsed());
        }
    }
}
