pub mod apply_flow;
pub mod job_ctx;
pub mod questions;

pub use apply_flow::{ApplyFlow, ApplyOutcome, ApplySettings, ApplyState, ApplyVerdict};
pub use job_ctx::JobCtx;
pub use questions::{answer_questions, AnswerStats};
