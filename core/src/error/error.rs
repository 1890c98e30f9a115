use thiserror::Error;

use crate::task::transitions::TransitionError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("task failed: {0}")]
    Task(#[from] TaskError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("task {task_id}: {source}")]
    Transition {
        task_id: String,
        #[source]
        source: TransitionError,
    },
    #[error("no urls supplied")]
    EmptyUrls,
    #[error("scheduler error: {0}")]
    Scheduler(String),
}

impl TaskError {
    pub fn transition(task_id: &str, source: TransitionError) -> Self {
        Self::Transition {
            task_id: task_id.to_string(),
            source,
        }
    }
}
