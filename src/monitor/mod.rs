//! Idle/liveness monitoring
//!
//! The monitor polls a `SessionProbe` on a fixed interval and signals
//! shutdown after a configurable stretch of continuous inactivity.

pub mod idle;
pub mod probe;

pub use idle::{IdleMonitor, MonitorExit, Tick};
pub use probe::{ProcessTableProbe, SessionManagerCountProbe, SessionProbe};
