//! Mirror daemon: periodic scheduling of sync passes, tracing setup, and
//! process lifecycle.

mod error;
mod runtime;
pub mod scheduler;

pub use error::DaemonError;
pub use runtime::{init_tracing, run, run_until_shutdown, start_blocking};
pub use scheduler::{PassRunner, Scheduler, SchedulerStats};
