use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::error::{Error, Result};

/// 对比的哪一侧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn dir_name(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// 一次运行独占的工作目录
///
/// - `targets/<side>/<archive>/` 存放解压后的目标文件
/// - `unpacked/<side>/<slot>/` 存放嵌套镜像的解包结果
///
/// 释放时删除上述目录，除非设置了保留。
pub struct RunWorkspace {
    root: PathBuf,
    keep: bool,
}

impl RunWorkspace {
    pub fn create(root: &Path, keep: bool) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| Error::io(root, e))?;
        let workspace = Self {
            root: root.to_path_buf(),
            keep,
        };

        // 嵌套解包的结果从不复用
        for side in [Side::Left, Side::Right] {
            let scratch = workspace.scratch_dir(side);
            if scratch.exists() {
                fs::remove_dir_all(&scratch).map_err(|e| Error::io(&scratch, e))?;
            }
            fs::create_dir_all(&scratch).map_err(|e| Error::io(&scratch, e))?;
        }

        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn target_dir(&self, side: Side, archive: &Path) -> PathBuf {
        let name = archive
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "target".into());
        self.root.join("targets").join(side.dir_name()).join(name)
    }

    pub fn scratch_dir(&self, side: Side) -> PathBuf {
        self.root.join("unpacked").join(side.dir_name())
    }
}

impl Drop for RunWorkspace {
    fn drop(&mut self) {
        if self.keep {
            info!("保留工作目录: {}", self.root.display());
            return;
        }

        for dir in ["targets", "unpacked"] {
            let path = self.root.join(dir);
            if path.exists()
                && let Err(err) = fs::remove_dir_all(&path)
            {
                warn!("无法清理 {}: {}", path.display(), err);
            }
        }
        // 目录可能非空，忽略错误
        let _ = fs::remove_dir(&self.root);
    }
}

/// 将 zip 归档解压到 `dest`，失败时不留下部分结果
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    if !archive.is_file() {
        return Err(Error::extraction(archive, "文件不存在"));
    }

    let result = unzip_into(archive, dest);
    if result.is_err() && dest.exists() {
        let _ = fs::remove_dir_all(dest);
    }
    result
}

fn unzip_into(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| Error::extraction(archive, e))?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| Error::extraction(archive, e))?;

    fs::create_dir_all(dest).map_err(|e| Error::extraction(archive, e))?;
    zip.extract(dest).map_err(|e| Error::extraction(archive, e))?;

    debug!("{} 个条目解压到 {}", zip.len(), dest.display());
    Ok(())
}

/// 记录解压来源，用于判断能否复用之前的解压结果
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
struct ExtractionStamp {
    source: String,
    size: u64,
    modified: String,
}

impl ExtractionStamp {
    fn of(archive: &Path) -> Result<Self> {
        let metadata = fs::metadata(archive).map_err(|_| Error::extraction(archive, "文件不存在"))?;
        let source = fs::canonicalize(archive).unwrap_or_else(|_| archive.to_path_buf());
        let modified = metadata
            .modified()
            .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
            .unwrap_or_default();

        Ok(Self {
            source: source.to_string_lossy().to_string(),
            size: metadata.len(),
            modified,
        })
    }

    fn load(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        toml::from_str(&content).ok()
    }
}

fn stamp_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".stamp.toml");
    dest.with_file_name(name)
}

/// 准备目标文件的解压目录，来源未变化时复用已有结果
pub fn prepare_target(archive: &Path, dest: &Path, force_clean: bool) -> Result<PathBuf> {
    let stamp = ExtractionStamp::of(archive)?;
    let stamp_file = stamp_path(dest);

    if !force_clean && dest.is_dir() && ExtractionStamp::load(&stamp_file).as_ref() == Some(&stamp)
    {
        info!("发现 {} 已解压，直接复用", archive.display());
        return Ok(dest.to_path_buf());
    }

    if dest.exists() {
        fs::remove_dir_all(dest).map_err(|e| Error::io(dest, e))?;
    }
    let _ = fs::remove_file(&stamp_file);

    info!("正在解压 {} ...", archive.display());
    extract_archive(archive, dest)?;

    let content = toml::to_string_pretty(&stamp).map_err(|e| Error::extraction(archive, e))?;
    fs::write(&stamp_file, content).map_err(|e| Error::io(&stamp_file, e))?;

    Ok(dest.to_path_buf())
}
