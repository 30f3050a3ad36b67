//! Process lifecycle: the stop hook and OS signal handling.
//!
//! ```text
//! SIGINT / SIGTERM → wait_for_signal() → Shutdown::trigger() → Scheduler stops, final stats
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
