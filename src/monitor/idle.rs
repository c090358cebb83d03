//! Idle countdown loop
//!
//! Two states: ACTIVE (a session is attached, counter at zero) and
//! COUNTING (no session, counter advancing one interval per tick). When
//! the counter reaches the idle timeout the loop returns to the caller,
//! which triggers shutdown. The transition function is separate from the
//! sleeping loop so tests can drive ticks directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::error::Result;
use crate::monitor::probe::SessionProbe;

/// Outcome of one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// A session is attached; the counter was reset
    Active,
    /// No session; the counter advanced
    Idle { idle: Duration, remaining: Duration },
    /// The counter reached the timeout
    TimedOut,
}

/// Why the monitor loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// Continuous inactivity reached the idle timeout
    IdleTimeout,
    /// The stop flag was set (signal path)
    Interrupted,
}

/// Sleep-and-poll idle monitor. One instance runs per container, for the
/// lifetime of the remote-access service.
pub struct IdleMonitor {
    probe: Box<dyn SessionProbe>,
    timeout: Duration,
    interval: Duration,
    idle: Duration,
    stop: Arc<AtomicBool>,
}

impl IdleMonitor {
    pub fn new(probe: Box<dyn SessionProbe>, timeout: Duration, interval: Duration) -> Self {
        Self {
            probe,
            timeout,
            interval,
            idle: Duration::ZERO,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the loop from another context (the signal handler).
    /// Setting it makes `run` return `MonitorExit::Interrupted` after the
    /// current tick.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Share a caller-provided stop flag instead of the internal one.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = flag;
        self
    }

    /// Accumulated idle time. Always a multiple of the check interval.
    pub fn idle(&self) -> Duration {
        self.idle
    }

    /// Advance the state machine by one observation.
    pub fn observe(&mut self, session_attached: bool) -> Tick {
        if session_attached {
            self.idle = Duration::ZERO;
            return Tick::Active;
        }

        self.idle += self.interval;
        if self.idle >= self.timeout {
            Tick::TimedOut
        } else {
            Tick::Idle {
                idle: self.idle,
                remaining: self.timeout - self.idle,
            }
        }
    }

    /// Block until the idle timeout fires or the stop flag is set.
    ///
    /// A failing probe counts the tick as idle rather than aborting: a
    /// transient probe failure should bias toward eventual shutdown, not
    /// toward a container that never goes away.
    pub fn run(&mut self) -> Result<MonitorExit> {
        info!(
            "Idle monitor started (timeout {}s, interval {}s)",
            self.timeout.as_secs(),
            self.interval.as_secs()
        );

        while !self.stop.load(Ordering::SeqCst) {
            thread::sleep(self.interval);

            let attached = match self.probe.active_sessions() {
                Ok(count) => count > 0,
                Err(e) => {
                    warn!(
                        "{} probe failed ({}); counting tick as idle",
                        self.probe.name(),
                        e
                    );
                    false
                }
            };

            match self.observe(attached) {
                Tick::Active => {}
                Tick::Idle { remaining, .. } => {
                    info!(
                        "No active session. Shutting down in {}s...",
                        remaining.as_secs()
                    );
                }
                Tick::TimedOut => {
                    info!(
                        "Idle timeout of {}s reached. Shutting down instance.",
                        self.timeout.as_secs()
                    );
                    return Ok(MonitorExit::IdleTimeout);
                }
            }
        }

        info!("Idle monitor interrupted");
        Ok(MonitorExit::Interrupted)
    }
}
