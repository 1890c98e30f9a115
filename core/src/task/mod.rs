pub mod abort;
pub mod events;
pub mod processor;
pub mod registry;
pub mod snapshot;
pub mod sweeper;
pub mod transitions;
pub mod types;

pub use abort::AbortSignal;
pub use events::TaskEvent;
pub use processor::{BatchPlan, BatchProcessor};
pub use registry::{CreateOutcome, FinishOutcome, RetentionLimits, SweepReport, TaskRegistry};
pub use snapshot::{
    ConfigStatus, RealtimeSnapshot, RealtimeSummary, RegistrySummary, ResultsSnapshot,
    ResultsSummary, StatusSnapshot, TaskSummary,
};
pub use sweeper::spawn_sweeper;
pub use transitions::{TaskTransition, TransitionError};
pub use types::{
    ErrorRecord, ExtractedSummary, Progress, ProducedCounts, ResultRecord, Task, TaskKind,
    TaskStatus, CANCELLED_MESSAGE,
};
