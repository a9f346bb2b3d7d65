#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use target_files_diff::compare::{CompareStats, Comparator, DiffRecord, NoiseFilter};
use target_files_diff::config::{CompareConfig, Config};
use target_files_diff::unpack::Unpacker;

pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    // 固定时间戳，相同内容得到相同字节
    let options = SimpleFileOptions::default().last_modified_time(zip::DateTime::default());
    for (name, contents) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn write_zip(root: &Path, relative: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    write_file(root, relative, &zip_bytes(entries))
}

pub fn gzip_bytes(contents: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(contents).unwrap();
    encoder.finish().unwrap()
}

/// 只使用进程内解包器的配置，所有目录都在 `root` 下
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.output_dir = root.join("out");
    config.work_dir = root.join("work");
    config.tools.external = false;
    config
}

/// 两棵待比较的目录树和解包用的临时目录
pub struct Trees {
    pub left: TempDir,
    pub right: TempDir,
    pub scratch: TempDir,
}

impl Trees {
    pub fn new() -> Self {
        Self {
            left: TempDir::new().unwrap(),
            right: TempDir::new().unwrap(),
            scratch: TempDir::new().unwrap(),
        }
    }

    pub fn left(&self) -> &Path {
        self.left.path()
    }

    pub fn right(&self) -> &Path {
        self.right.path()
    }

    pub fn compare(&self, unpacker: &dyn Unpacker) -> (Vec<DiffRecord>, CompareStats) {
        self.compare_with(&CompareConfig::default(), unpacker)
    }

    pub fn compare_with(
        &self,
        config: &CompareConfig,
        unpacker: &dyn Unpacker,
    ) -> (Vec<DiffRecord>, CompareStats) {
        let noise = NoiseFilter::new(config).unwrap();
        let comparator = Comparator::new(
            config,
            &noise,
            unpacker,
            &self.scratch.path().join("left"),
            &self.scratch.path().join("right"),
        );
        comparator.compare(self.left(), self.right()).unwrap()
    }
}

pub fn paths(records: &[DiffRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.path.to_string_lossy().to_string())
        .collect()
}
