use sdxf_engine::EngineError;
use sdxf_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("conversion failed: {0}")]
    Failed(String),
    #[error("conversion cancelled")]
    Cancelled,
}

impl AppError {
    /// 取消与失败使用不同的退出码，便于脚本区分。
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Cancelled => 2,
            _ => 1,
        }
    }
}
