use std::sync::atomic::{AtomicBool, Ordering};

/// At most one holder at a time; a second caller is turned away instead of
/// waiting.
#[derive(Debug, Default)]
pub struct SingleFlight {
    running: AtomicBool,
}

impl SingleFlight {
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    /// `None` while another guard is alive.
    pub fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| FlightGuard {
                running: &self.running,
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Releases the flight when dropped, including on early return, panic or
/// cancellation of the owning future.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
