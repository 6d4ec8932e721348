// Agent: the validate-and-retry loop around generation, plus batch fan-out.

pub mod batch;
pub mod executor;
pub mod validator;

pub use batch::{discover_jobs, run_batch, BatchJobResult, BatchOptions, BatchPair};
pub use executor::{AgentExecutor, AttemptRecord, RunReport, RunStatus};
pub use validator::{ValidationIssue, Validator, ValidatorConfig};
