//! Remindr - deadline reminders paced by task importance
//!
//! Each open task gets up to `importance` reminders per day, spread evenly
//! over its owner's working hours in the owner's timezone. A polling daemon
//! sends whichever reminder is due and resets the daily counters at midnight.

pub mod conversation;
pub mod daemon;
pub mod domain;
pub mod error;
pub mod render;
pub mod scheduler;
pub mod sender;
pub mod service;
pub mod store;

pub use error::{RemindrError, Result};
