mod capture;
mod clean;
mod diff;
mod supervise;

pub use capture::run_capture;
pub use clean::run_clean;
pub use diff::run_diff;
pub use supervise::run_supervise;
