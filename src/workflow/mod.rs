pub mod attempt_ctx;
pub mod attempt_flow;
pub mod submission;

pub use attempt_ctx::AttemptCtx;
pub use attempt_flow::{AttemptFlow, AttemptOutcome};
pub use submission::{SubmissionCoordinator, SubmitOutcome};
