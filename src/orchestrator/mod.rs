pub mod attempt_processor;
pub mod batch_processor;

pub use attempt_processor::{process_attempt, ProcessResult};
pub use batch_processor::App;
