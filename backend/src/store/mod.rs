// Task records and the task store

pub mod migration;
pub mod models;
pub mod task_store;

pub use models::{Priority, Task, TaskStatus};
pub use task_store::{
    find_task, find_task_mut, next_id, JsonTaskStore, MemoryTaskStore, StoreError, TaskStore,
};
