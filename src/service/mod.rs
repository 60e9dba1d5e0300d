//! Application services: validated task and user operations over the store.

mod tasks;
mod users;

pub use tasks::{TaskService, validate_importance};
pub use users::{SettingsUpdate, UserService, validate_work_window};
