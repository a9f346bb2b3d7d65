use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// 递归解包并对比两个 AOSP target files
#[derive(Parser)]
#[command(name = "tfdiff", version)]
#[command(about = "递归解包并对比两个 AOSP target files", long_about = None)]
pub struct Cli {
    /// 输出更多日志 (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// TOML 配置文件
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 对比两个目标文件
    Compare(CompareArgs),
    /// 从目标文件中读取构建信息
    Extract {
        /// 目标文件
        target_file: PathBuf,
        /// 要输出的属性，默认为 ro.system.build.date.utc
        #[arg(long = "prop")]
        props: Vec<String>,
    },
}

#[derive(clap::Args)]
pub struct CompareArgs {
    /// 第一个目标文件
    pub target1: PathBuf,
    /// 第二个目标文件
    pub target2: PathBuf,
    /// summary.txt 与 diffs/ 的输出目录
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// 解压与解包的工作目录
    #[arg(long)]
    pub work_dir: Option<PathBuf>,
    /// Android boot image editor 的安装目录 (默认 ~/gradlew)
    #[arg(long)]
    pub editor_path: Option<PathBuf>,
    /// 外部工具的超时时间 (秒)
    #[arg(long)]
    pub timeout: Option<u64>,
    /// 不复用之前解压好的目标文件
    #[arg(long)]
    pub force_clean: bool,
    /// 结束后保留工作目录
    #[arg(long)]
    pub keep_workspace: bool,
    /// 不过滤重复的差异
    #[arg(long)]
    pub no_filter_duplicates: bool,
    /// 只使用进程内解包 (zip, gzip)
    #[arg(long)]
    pub no_external_tools: bool,
    /// 只输出警告和错误
    #[arg(short, long)]
    pub quiet: bool,
}

impl CompareArgs {
    /// 命令行参数覆盖配置文件
    pub fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(work_dir) = &self.work_dir {
            config.work_dir = work_dir.clone();
        }
        if let Some(editor_path) = &self.editor_path {
            config.tools.editor_dir = editor_path.clone();
        }
        if let Some(timeout) = self.timeout {
            config.tools.timeout_secs = timeout;
        }
        config.force_clean |= self.force_clean;
        config.keep_workspace |= self.keep_workspace;
        if self.no_filter_duplicates {
            config.filter_duplicates = false;
        }
        if self.no_external_tools {
            config.tools.external = false;
        }
    }
}
