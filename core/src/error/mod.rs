#[allow(clippy::module_inception)]
pub mod error;
pub mod kind;
pub mod pipeline;

pub use error::{CliError, TaskError};
pub use kind::{ErrorKind, Stage};
pub use pipeline::{ClassifyError, FetchError};
