use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::noise::NoiseFilter;
use super::record::{DiffRecord, DiffStatus, NodeKind, SideInfo};
use crate::config::CompareConfig;
use crate::error::{Error, Result};
use crate::unpack::{UnpackOutcome, Unpacker};
use crate::utils::{EntryKind, compute_file_hash, file_size, list_entries, special_identity};

/// 比较过程的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareStats {
    /// 访问过的节点数
    pub nodes: usize,
    pub identical: usize,
    /// 两侧都成功解包并递归比较的容器数
    pub containers: usize,
}

/// 同步遍历两棵目录树，遇到可解包的文件时解包后递归比较
pub struct Comparator<'a> {
    config: &'a CompareConfig,
    noise: &'a NoiseFilter,
    unpacker: &'a dyn Unpacker,
    left_scratch: PathBuf,
    right_scratch: PathBuf,
    next_slot: usize,
    /// 当前所在的容器文件 (左, 右)
    enclosing: Option<(PathBuf, PathBuf)>,
    stats: CompareStats,
    records: Vec<DiffRecord>,
}

impl<'a> Comparator<'a> {
    pub fn new(
        config: &'a CompareConfig,
        noise: &'a NoiseFilter,
        unpacker: &'a dyn Unpacker,
        left_scratch: &Path,
        right_scratch: &Path,
    ) -> Self {
        Self {
            config,
            noise,
            unpacker,
            left_scratch: left_scratch.to_path_buf(),
            right_scratch: right_scratch.to_path_buf(),
            next_slot: 0,
            enclosing: None,
            stats: CompareStats::default(),
            records: Vec::new(),
        }
    }

    /// 比较两棵树，返回按路径字典序排列的差异
    pub fn compare(
        mut self,
        left_root: &Path,
        right_root: &Path,
    ) -> Result<(Vec<DiffRecord>, CompareStats)> {
        self.compare_dirs(left_root, right_root, Path::new(""))?;
        Ok((self.records, self.stats))
    }

    fn compare_dirs(&mut self, left: &Path, right: &Path, logical: &Path) -> Result<()> {
        let left_entries = list_entries(left)?;
        let right_entries = list_entries(right)?;

        let names: BTreeSet<_> = left_entries.keys().chain(right_entries.keys()).collect();

        for name in names {
            if self.config.skip_names.iter().any(|skip| name.as_os_str() == skip.as_str()) {
                debug!("跳过 {}", logical.join(name).display());
                continue;
            }

            let path = logical.join(name);
            let left_path = left.join(name);
            let right_path = right.join(name);
            self.stats.nodes += 1;

            match (left_entries.get(name), right_entries.get(name)) {
                (Some(&kind), None) => {
                    let side = SideInfo::at(&left_path, file_size(&left_path));
                    self.push(
                        DiffRecord::new(&path, node_kind(kind), DiffStatus::OnlyLeft)
                            .with_sides(side, SideInfo::default()),
                    );
                }
                (None, Some(&kind)) => {
                    let side = SideInfo::at(&right_path, file_size(&right_path));
                    self.push(
                        DiffRecord::new(&path, node_kind(kind), DiffStatus::OnlyRight)
                            .with_sides(SideInfo::default(), side),
                    );
                }
                (Some(&left_kind), Some(&right_kind)) => {
                    self.compare_entries(&left_path, &right_path, left_kind, right_kind, &path)?;
                }
                (None, None) => unreachable!("名称来自两侧条目的并集"),
            }
        }
        Ok(())
    }

    fn compare_entries(
        &mut self,
        left: &Path,
        right: &Path,
        left_kind: EntryKind,
        right_kind: EntryKind,
        path: &Path,
    ) -> Result<()> {
        match (left_kind, right_kind) {
            (EntryKind::Directory, EntryKind::Directory) => self.compare_dirs(left, right, path),
            (EntryKind::File, EntryKind::File) => self.compare_files(left, right, path),
            (EntryKind::Symlink, EntryKind::Symlink) => self.compare_links(left, right, path),
            (EntryKind::Special, EntryKind::Special) => self.compare_special(left, right, path),
            _ => {
                let detail = format!("左侧为 {:?}，右侧为 {:?}", left_kind, right_kind);
                warn!("{}: {}", path.display(), detail);
                self.push(
                    DiffRecord::new(path, node_kind(right_kind), DiffStatus::Anomaly(detail))
                        .with_sides(
                            SideInfo::at(left, file_size(left)),
                            SideInfo::at(right, file_size(right)),
                        ),
                );
                Ok(())
            }
        }
    }

    fn compare_files(&mut self, left: &Path, right: &Path, path: &Path) -> Result<()> {
        let left_size = file_size(left);
        let right_size = file_size(right);
        let left_hash = compute_file_hash(left)?;
        let right_hash = compute_file_hash(right)?;

        if left_size == right_size && left_hash == right_hash {
            self.stats.identical += 1;
            return Ok(());
        }

        info!("正在比较 {} ...", path.display());
        let left_side = SideInfo::at(left, left_size).with_digest(left_hash);
        let right_side = SideInfo::at(right, right_size).with_digest(right_hash);

        let slot = self.allocate_slot();
        let left_outcome = self.unpacker.try_unpack(left, &self.left_scratch.join(&slot));
        let right_outcome = self.unpacker.try_unpack(right, &self.right_scratch.join(&slot));

        match (left_outcome, right_outcome) {
            (UnpackOutcome::Unpacked(left_dir), UnpackOutcome::Unpacked(right_dir)) => {
                self.stats.containers += 1;
                let outer = self
                    .enclosing
                    .replace((left.to_path_buf(), right.to_path_buf()));
                let result = self.compare_dirs(&left_dir, &right_dir, path);
                self.enclosing = outer;
                result
            }
            (UnpackOutcome::NotAnImage, UnpackOutcome::NotAnImage) => {
                if self.noise.equivalent(left, right)? {
                    debug!("{} 仅有噪声差异", path.display());
                    self.stats.identical += 1;
                } else {
                    self.push(
                        DiffRecord::new(path, NodeKind::File, DiffStatus::Differing)
                            .with_sides(left_side, right_side),
                    );
                }
                Ok(())
            }
            (UnpackOutcome::Failed(err), _) | (_, UnpackOutcome::Failed(err)) => {
                warn!("无法解包 {}: {}", path.display(), err);
                self.push(
                    DiffRecord::new(path, NodeKind::Image, DiffStatus::UnpackError(err.to_string()))
                        .with_sides(left_side, right_side),
                );
                Ok(())
            }
            (UnpackOutcome::Unpacked(_), UnpackOutcome::NotAnImage) => {
                self.push_asymmetric(path, "仅左侧可以解包", left_side, right_side);
                Ok(())
            }
            (UnpackOutcome::NotAnImage, UnpackOutcome::Unpacked(_)) => {
                self.push_asymmetric(path, "仅右侧可以解包", left_side, right_side);
                Ok(())
            }
        }
    }

    fn compare_links(&mut self, left: &Path, right: &Path, path: &Path) -> Result<()> {
        let left_target = fs::read_link(left).map_err(|e| Error::io(left, e))?;
        let right_target = fs::read_link(right).map_err(|e| Error::io(right, e))?;

        if left_target == right_target {
            self.stats.identical += 1;
        } else {
            self.push(
                DiffRecord::new(path, NodeKind::Symlink, DiffStatus::Differing).with_sides(
                    SideInfo::at(left, file_size(left)),
                    SideInfo::at(right, file_size(right)),
                ),
            );
        }
        Ok(())
    }

    /// 只比较类型和设备号，不打开文件
    fn compare_special(&mut self, left: &Path, right: &Path, path: &Path) -> Result<()> {
        let left_id = special_identity(left).map_err(|e| Error::io(left, e))?;
        let right_id = special_identity(right).map_err(|e| Error::io(right, e))?;

        if left_id == right_id {
            self.stats.identical += 1;
        } else {
            self.push(
                DiffRecord::new(path, NodeKind::Special, DiffStatus::Differing)
                    .with_sides(SideInfo::at(left, None), SideInfo::at(right, None)),
            );
        }
        Ok(())
    }

    fn push_asymmetric(&mut self, path: &Path, detail: &str, left: SideInfo, right: SideInfo) {
        warn!("{}: {}", path.display(), detail);
        self.push(
            DiffRecord::new(path, NodeKind::Image, DiffStatus::Anomaly(detail.to_string()))
                .with_sides(left, right),
        );
    }

    fn push(&mut self, mut record: DiffRecord) {
        if let Some((left, right)) = &self.enclosing {
            record.left.container = Some(left.clone());
            record.right.container = Some(right.clone());
        }
        debug!("{} {}", record.status.symbol(), record.path.display());
        self.records.push(record);
    }

    fn allocate_slot(&mut self) -> String {
        self.next_slot += 1;
        format!("{:06}", self.next_slot)
    }
}

fn node_kind(kind: EntryKind) -> NodeKind {
    match kind {
        EntryKind::File => NodeKind::File,
        EntryKind::Directory => NodeKind::Directory,
        EntryKind::Symlink => NodeKind::Symlink,
        EntryKind::Special => NodeKind::Special,
    }
}
