//! Multi-step task creation, one draft per user.

mod draft;
mod store;

pub use draft::{Step, TaskDraft, parse_deadline, parse_frequency};
pub use store::{ConversationStore, Progress};
