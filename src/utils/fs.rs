use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// 目录项类型，符号链接不解引用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// 设备节点、FIFO、socket，不能打开读取
    Special,
}

impl EntryKind {
    fn from_file_type(file_type: fs::FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Special
        }
    }
}

/// 特殊文件的类型与设备号，用于不打开文件的比较
#[cfg(unix)]
pub fn special_identity(path: &Path) -> io::Result<(&'static str, u64)> {
    use std::os::unix::fs::{FileTypeExt, MetadataExt};

    let metadata = fs::symlink_metadata(path)?;
    let file_type = metadata.file_type();
    let kind = if file_type.is_char_device() {
        "char-device"
    } else if file_type.is_block_device() {
        "block-device"
    } else if file_type.is_fifo() {
        "fifo"
    } else if file_type.is_socket() {
        "socket"
    } else {
        "unknown"
    };
    Ok((kind, metadata.rdev()))
}

#[cfg(not(unix))]
pub fn special_identity(path: &Path) -> io::Result<(&'static str, u64)> {
    fs::symlink_metadata(path)?;
    Ok(("unknown", 0))
}

/// 列出目录下一层的所有条目，按文件名排序
pub fn list_entries(dir: &Path) -> Result<BTreeMap<OsString, EntryKind>> {
    let mut entries = BTreeMap::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| Error::io(dir, e.into()))?;
        entries.insert(
            entry.file_name().to_os_string(),
            EntryKind::from_file_type(entry.file_type()),
        );
    }

    Ok(entries)
}

/// 归类用的扩展名，不含点号；没有扩展名时为 `no-extension`
pub fn extension_bucket(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "no-extension".to_string())
}

/// 读取文件开头最多 `len` 个字节
pub fn read_magic(path: &Path, len: usize) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut buffer = Vec::with_capacity(len);
    file.take(len as u64).read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// 普通文件的大小，目录和符号链接返回 `None`
pub fn file_size(path: &Path) -> Option<u64> {
    fs::symlink_metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

/// 复制文件、目录树或符号链接
pub fn copy_path(source: &Path, dest: &Path) -> io::Result<()> {
    let file_type = fs::symlink_metadata(source)?.file_type();

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    if file_type.is_symlink() {
        return copy_symlink(source, dest);
    }
    if file_type.is_file() {
        fs::copy(source, dest)?;
        return Ok(());
    }
    // 特殊文件读取时可能阻塞，不复制
    if !file_type.is_dir() {
        return Ok(());
    }

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry?;
        let relative_path = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = dest.join(relative_path);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, dest: &Path) -> io::Result<()> {
    let link = fs::read_link(source)?;
    std::os::unix::fs::symlink(link, dest)
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, dest: &Path) -> io::Result<()> {
    let link = fs::read_link(source)?;
    fs::write(dest, link.to_string_lossy().as_bytes())
}

/// 判断文件是否为文本文件
pub fn is_text_file(path: &Path) -> bool {
    const TEXT_EXTENSIONS: &[&str] = &[
        "txt", "prop", "xml", "json", "html", "rc", "cfg", "conf", "sh", "map", "mk", "bp",
        "ini", "toml", "yaml", "yml", "csv", "pem", "te", "fc", "contexts", "list", "md",
    ];

    if let Some(ext) = path.extension()
        && let Some(ext_str) = ext.to_str()
        && TEXT_EXTENSIONS.contains(&ext_str.to_lowercase().as_str())
    {
        return true;
    }

    // 尝试读取文件头部判断
    if let Ok(file) = File::open(path) {
        let mut reader = BufReader::new(file);
        let mut buffer = [0u8; 512];
        if let Ok(bytes_read) = reader.read(&mut buffer) {
            // 检查是否包含空字节，如果包含则可能是二进制文件
            return !buffer[..bytes_read].contains(&0);
        }
    }

    false
}
