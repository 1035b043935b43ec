//! Service layer
//!
//! Services contain the engine's business logic: launching one attempt of
//! a job as an external process, capturing its output, and driving the
//! retry policy across attempts.
//!
//! Execution sits behind traits so the retry controller can be exercised
//! without spawning processes.

mod capture;
mod execution;
mod retry;
mod runnable;

// Re-export traits
pub use execution::ExecutionService;
pub use runnable::Runnable;

// Re-export implementations
pub use capture::CaptureBuffer;
pub use execution::StandardExecutionService;
pub use retry::{RetryController, RunState};
pub use runnable::ScriptCommand;
