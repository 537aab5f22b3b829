pub mod constants;
pub mod pipeline;

pub use pipeline::PipelineCMD;
