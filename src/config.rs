use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// 一次对比运行的全部配置，显式传入各个组件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `summary.txt`、`report.toml` 与 `diffs/` 的输出目录
    pub output_dir: PathBuf,
    /// 解压与解包的工作目录
    pub work_dir: PathBuf,
    /// 不复用之前解压好的目标文件
    pub force_clean: bool,
    /// 运行结束后保留工作目录以便检查
    pub keep_workspace: bool,
    /// 过滤内容完全相同的重复差异
    pub filter_duplicates: bool,
    pub tools: ToolsConfig,
    pub compare: CompareConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            work_dir: std::env::temp_dir().join("tfdiff"),
            force_clean: false,
            keep_workspace: false,
            filter_duplicates: true,
            tools: ToolsConfig::default(),
            compare: CompareConfig::default(),
        }
    }
}

impl Config {
    /// 读取 TOML 配置文件，未给出路径时使用默认值
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}

/// 外部工具的位置与行为
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// 关闭后只使用进程内解包 (zip, gzip)
    pub external: bool,
    /// Android boot image editor 的安装目录，包含 `gradlew`
    pub editor_dir: PathBuf,
    pub seven_zip: PathBuf,
    pub simg2img: PathBuf,
    pub lz4: PathBuf,
    /// 比较 apk 签名证书时使用，找不到时只记录文件位置
    pub apksigner: PathBuf,
    pub timeout_secs: u64,
    /// 交给 boot image editor 的扩展名
    pub editor_extensions: Vec<String>,
    /// editor 无法处理、改用 7z 解包的镜像
    pub seven_zip_names: Vec<String>,
    pub seven_zip_extensions: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            external: true,
            editor_dir: PathBuf::from("~/gradlew"),
            seven_zip: PathBuf::from("7z"),
            simg2img: PathBuf::from("simg2img"),
            lz4: PathBuf::from("lz4"),
            apksigner: PathBuf::from("apksigner"),
            timeout_secs: 600,
            editor_extensions: vec!["img".to_string()],
            seven_zip_names: vec![
                "system.img".to_string(),
                "product.img".to_string(),
                "ramdisk.img".to_string(),
            ],
            seven_zip_extensions: vec!["ext4".to_string()],
        }
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn editor_dir(&self) -> PathBuf {
        expand_home(&self.editor_dir)
    }
}

/// 比较时的噪声过滤规则
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// 忽略行内空白与空行
    pub ignore_whitespace: bool,
    /// 匹配的文本行不参与比较
    pub ignore_line_patterns: Vec<String>,
    /// 按行排序后再比较的扩展名
    pub sort_line_extensions: Vec<String>,
    /// 完全跳过的文件名
    pub skip_names: Vec<String>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            ignore_whitespace: true,
            ignore_line_patterns: vec![
                r"^\s*ro\.([\w-]+\.)*build\.date(\.utc)?\s*=".to_string(),
                r"^\s*ro\.([\w-]+\.)*build\.(host|user)\s*=".to_string(),
                r"^#\s*autogenerated".to_string(),
            ],
            sort_line_extensions: vec!["map".to_string()],
            skip_names: vec!["userdata.img".to_string()],
        }
    }
}

/// 展开开头的 `~/`
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(rest);
    }
    path.to_path_buf()
}
