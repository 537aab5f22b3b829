mod context;
mod invocation;
mod runner;
mod sequencer;
mod step;
mod summary;

pub use context::PipelineContext;
pub use invocation::{Invocation, StdoutTarget};
pub use runner::{stderr_tail, DryRunner, Execution, ProcessRunner, Runner};
pub use sequencer::Pipeline;
pub use step::Step;
pub use summary::{write_summary, StepRecord, StepStatus};
