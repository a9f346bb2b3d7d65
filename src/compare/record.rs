use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::utils::{HashResult, extension_bucket};

/// 节点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    File,
    Directory,
    Symlink,
    /// 设备节点、FIFO、socket
    Special,
    /// 可以解包的镜像或容器
    Image,
}

/// 差异类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffStatus {
    Differing,
    OnlyLeft,
    OnlyRight,
    /// 结构异常：一侧能解包另一侧不能，或文件与目录不一致
    Anomaly(String),
    UnpackError(String),
}

impl DiffStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            DiffStatus::Differing => "*",
            DiffStatus::OnlyLeft => "-",
            DiffStatus::OnlyRight => "+",
            DiffStatus::Anomaly(_) => "!",
            DiffStatus::UnpackError(_) => "?",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DiffStatus::Differing => "differing",
            DiffStatus::OnlyLeft => "only-left",
            DiffStatus::OnlyRight => "only-right",
            DiffStatus::Anomaly(_) => "anomaly",
            DiffStatus::UnpackError(_) => "unpack-error",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            DiffStatus::Anomaly(detail) | DiffStatus::UnpackError(detail) => Some(detail),
            _ => None,
        }
    }
}

/// 一侧文件在磁盘上的位置和信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideInfo {
    pub location: Option<PathBuf>,
    pub size: Option<u64>,
    pub digest: Option<HashResult>,
    /// 最内层容器 (例如 apk) 在磁盘上的位置
    pub container: Option<PathBuf>,
}

impl SideInfo {
    pub fn at(location: &Path, size: Option<u64>) -> Self {
        Self {
            location: Some(location.to_path_buf()),
            size,
            digest: None,
            container: None,
        }
    }

    pub fn with_digest(mut self, digest: HashResult) -> Self {
        self.digest = Some(digest);
        self
    }
}

/// 一条差异记录，路径为目标文件内部的逻辑路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRecord {
    pub path: PathBuf,
    pub extension: String,
    pub kind: NodeKind,
    pub status: DiffStatus,
    pub left: SideInfo,
    pub right: SideInfo,
}

impl DiffRecord {
    pub fn new(path: &Path, kind: NodeKind, status: DiffStatus) -> Self {
        Self {
            path: path.to_path_buf(),
            extension: extension_bucket(path),
            kind,
            status,
            left: SideInfo::default(),
            right: SideInfo::default(),
        }
    }

    pub fn with_sides(mut self, left: SideInfo, right: SideInfo) -> Self {
        self.left = left;
        self.right = right;
        self
    }

    /// 写入 diffs/ 时使用的文件，优先使用右侧 (较新) 版本
    pub fn artifact(&self) -> Option<&Path> {
        self.right
            .location
            .as_deref()
            .or(self.left.location.as_deref())
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, DiffStatus::UnpackError(_))
    }
}
