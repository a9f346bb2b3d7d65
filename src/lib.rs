//! # Target Files Diff
//!
//! 递归对比两个 AOSP target files 的工具库
//!
//! ## 功能
//!
//! - 解压两个目标文件，逐层对比目录树
//! - 遇到镜像、apk、apex、zip、gz、lz4 等容器时解包后继续递归比较
//! - 过滤时间戳、主机名、空白等构建噪声
//! - 按扩展名汇总差异，生成 `summary.txt` 和只包含差异的 `diffs/` 目录
//!
//! ## 使用示例
//!
//! ```no_run
//! use target_files_diff::config::Config;
//! use target_files_diff::run::compare_targets;
//! use std::path::Path;
//!
//! let config = Config::default();
//! let outcome = compare_targets(
//!     &config,
//!     Path::new("target_files_1.zip"),
//!     Path::new("target_files_2.zip"),
//! )
//! .unwrap();
//! println!("{}", outcome.report.summary());
//! ```

pub mod cli;
pub mod compare;
pub mod config;
pub mod error;
pub mod extract;
pub mod report;
pub mod run;
pub mod unpack;
pub mod utils;

// 重新导出常用类型
pub use compare::{DiffRecord, DiffStatus, NodeKind};
pub use error::{Error, Result, UnpackError};
pub use report::SummaryReport;
pub use run::{compare_targets, extract_build_info};
pub use unpack::{UnpackOutcome, Unpacker, UnpackerChain};
