//! 镜像解包适配层
//!
//! 每个 [`Unpacker`] 判断自己能否处理某个文件：
//!
//! - 不认识的文件返回 [`UnpackOutcome::NotAnImage`]，由比较器当作普通文件处理
//! - 成功时返回解包目录
//! - 认识但解包失败时返回 [`UnpackError`]，记录到摘要中，不终止运行

mod archive;
mod boot_editor;
pub mod external;
mod gzip;
mod lz4;
mod seven_zip;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ToolsConfig;
pub use crate::error::UnpackError;

pub use archive::ArchiveUnpacker;
pub use boot_editor::BootImageEditor;
pub use gzip::GzipUnpacker;
pub use lz4::Lz4Unpacker;
pub use seven_zip::SevenZipUnpacker;

/// 一次解包尝试的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpackOutcome {
    NotAnImage,
    Unpacked(PathBuf),
    Failed(UnpackError),
}

pub trait Unpacker {
    fn name(&self) -> &'static str;

    /// 将 `file` 解包到 `dest` 目录
    fn try_unpack(&self, file: &Path, dest: &Path) -> UnpackOutcome;
}

/// 按顺序尝试多个解包器，第一个不是 `NotAnImage` 的结果生效
pub struct UnpackerChain {
    unpackers: Vec<Box<dyn Unpacker>>,
}

impl UnpackerChain {
    pub fn new(unpackers: Vec<Box<dyn Unpacker>>) -> Self {
        Self { unpackers }
    }

    /// 只包含进程内解包器 (zip 系列与 gzip)
    pub fn in_process() -> Self {
        Self::new(vec![Box::new(ArchiveUnpacker), Box::new(GzipUnpacker)])
    }

    pub fn from_config(tools: &ToolsConfig) -> Self {
        let mut chain = Self::in_process();
        if tools.external {
            chain.push(Box::new(Lz4Unpacker::new(tools)));
            chain.push(Box::new(SevenZipUnpacker::new(tools)));
            chain.push(Box::new(BootImageEditor::new(tools)));
        }
        chain
    }

    pub fn push(&mut self, unpacker: Box<dyn Unpacker>) {
        self.unpackers.push(unpacker);
    }
}

impl Unpacker for UnpackerChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn try_unpack(&self, file: &Path, dest: &Path) -> UnpackOutcome {
        for unpacker in &self.unpackers {
            if dest.exists()
                && let Err(err) = fs::remove_dir_all(dest)
            {
                return UnpackOutcome::Failed(UnpackError::new(unpacker.name(), err));
            }

            match unpacker.try_unpack(file, dest) {
                UnpackOutcome::NotAnImage => continue,
                outcome => {
                    debug!("{} 处理了 {}: {:?}", unpacker.name(), file.display(), outcome);
                    return outcome;
                }
            }
        }
        UnpackOutcome::NotAnImage
    }
}

/// 文件名是否在列表中，或扩展名匹配
pub(crate) fn matches_name_or_extension(file: &Path, names: &[String], extensions: &[String]) -> bool {
    let name_matches = file
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| names.iter().any(|candidate| candidate == n));

    let ext_matches = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|candidate| candidate.eq_ignore_ascii_case(e)));

    name_matches || ext_matches
}

/// 去掉最后一个扩展名后的文件名，作为解压后的文件名
pub(crate) fn decompressed_name(file: &Path, suffixes: &[&str]) -> String {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "content".to_string());

    let has_suffix = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| suffixes.iter().any(|s| s.eq_ignore_ascii_case(e)));

    match file.file_stem() {
        Some(stem) if has_suffix => stem.to_string_lossy().to_string(),
        _ => format!("{}.out", name),
    }
}
