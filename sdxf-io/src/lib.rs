mod dxf;
mod scene;
mod summary;

use std::fs;
use std::path::{Path, PathBuf};

use sdxf_core::entity::Entity;
use sdxf_core::scene::SceneInput;
use sdxf_core::strategy::ConversionStrategy;
use thiserror::Error;
use tracing::info;

pub use dxf::{DxfEncoder, format_real, layer_color};
pub use scene::SceneLoader;
pub use summary::{DxfSummary, GroupPair, LayerRecord, read_pairs};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scene JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid scene document: {0}")]
    InvalidDocument(String),
    #[error("invalid drawing: {0}")]
    InvalidDrawing(String),
}

/// 从磁盘读取输入文档并解释为转换输入。
pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<SceneInput, IoError>;
}

/// 把有序实体列表编码为绘图交换文本。实现不得重排、合并或去重实体。
pub trait DrawingEncoder {
    fn encode(&self, entities: &[Entity], strategy: &ConversionStrategy) -> String;
}

/// 将编码后的文本写入目标路径，必要时创建父目录。
pub fn write_drawing(path: &Path, content: &str) -> Result<(), IoError> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| IoError::WriteError {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, content).map_err(|source| IoError::WriteError {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), bytes = content.len(), "已写出 DXF 文件");
    Ok(())
}
