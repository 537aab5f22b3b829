pub mod command;
pub mod pipeline;
pub mod runtime;
pub mod utils;

pub use pipeline::{Pipeline, PipelineContext, Step};
pub use runtime::{Config, Error};
