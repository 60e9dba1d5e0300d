//! Domain types for remindr
//!
//! - Task: a deadline, an importance-driven daily quota and the eligibility rules
//! - Frequency: which calendar days a task is reminded on
//! - User: chat identity, timezone and working-hour window

pub mod frequency;
pub mod task;
pub mod user;

pub use frequency::Frequency;
pub use task::{MAX_IMPORTANCE, MIN_IMPORTANCE, NewTask, Task};
pub use user::{DEFAULT_TIMEZONE, User, UserDefaults, resolve_timezone};
