pub mod pomodoro;
pub mod tag;
pub mod task;
pub mod user;

pub use pomodoro::{CancelSessionRequest, CompleteSessionRequest, PomodoroSession, StartSessionRequest};
pub use tag::{NewTagRequest, Tag};
pub use task::{NewTaskRequest, Priority, ReorderEntry, Task, TaskWithTags, UpdateTaskRequest};
pub use user::{LoginRequest, RegisterRequest, User};
