pub mod coordinator;
pub mod extract;
pub mod placeholder;
pub mod transform;
pub mod traverse;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("a conversion task is already running")]
        TaskAlreadyRunning,
        #[error("no conversion task has been started")]
        NotStarted,
        #[error("failed to spawn conversion worker: {0}")]
        Spawn(#[source] std::io::Error),
    }

    /// 流水线内部错误，不会越过协调器边界；对外统一折算为 [`crate::coordinator::ConversionOutcome`]。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum PipelineError {
        #[error("conversion cancelled")]
        Cancelled,
        #[error("non-finite coordinate produced while extracting {kind}")]
        NonFinite { kind: &'static str },
    }
}

pub use coordinator::{
    CancellationToken, ConversionCoordinator, ConversionOutcome, ConversionRequest,
    ConversionState, convert, convert_with_rng,
};
pub use errors::{EngineError, PipelineError};
