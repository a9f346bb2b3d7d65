use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// 终止整个运行的错误
#[derive(Error, Debug)]
pub enum Error {
    /// 目标文件缺失、不可读或已损坏
    #[error("无法解压 {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    /// 输出目录不可写
    #[error("无法写入输出 {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("配置无效: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidInput(String),
}

impl Error {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn extraction(path: &Path, reason: impl ToString) -> Self {
        Error::Extraction {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn persist(path: &Path, source: io::Error) -> Self {
        Error::Persist {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// 单个镜像解包失败，记录到摘要中，不终止运行
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{tool}: {reason}")]
pub struct UnpackError {
    pub tool: String,
    pub reason: String,
}

impl UnpackError {
    pub fn new(tool: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }
}
