use similar::TextDiff;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::warn;

use crate::compare::DiffRecord;
use crate::config::ToolsConfig;
use crate::unpack::external::run_tool;

/// 用 `apksigner verify -v --print-certs` 比较 apk 的签名证书
///
/// `CERT.RSA` 的字节差异不易阅读，改为对比两侧证书信息 (SHA-256 摘要等)。
pub struct ApkCertDiff {
    program: PathBuf,
    timeout: Duration,
}

impl ApkCertDiff {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            program: tools.apksigner.clone(),
            timeout: tools.timeout(),
        }
    }

    /// 关闭外部工具时不比较证书
    pub fn from_config(tools: &ToolsConfig) -> Option<Self> {
        tools.external.then(|| Self::new(tools))
    }

    /// 对 `*.apk/META-INF/CERT.RSA` 记录生成证书差异，无法获取时返回 `None`
    pub fn diff(&self, record: &DiffRecord) -> Option<String> {
        if !is_apk_cert(&record.path) {
            return None;
        }
        let left_apk = record.left.container.as_deref()?;
        let right_apk = record.right.container.as_deref()?;

        let left = self.print_certs(left_apk)?;
        let right = self.print_certs(right_apk)?;

        let apk = record
            .path
            .parent()
            .and_then(Path::parent)
            .unwrap_or(record.path.as_path())
            .to_string_lossy();
        Some(
            TextDiff::from_lines(left.as_str(), right.as_str())
                .unified_diff()
                .header(&format!("a/{}", apk), &format!("b/{}", apk))
                .to_string(),
        )
    }

    fn print_certs(&self, apk: &Path) -> Option<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["verify", "-v", "--print-certs"]).arg(apk);

        match run_tool(cmd, self.timeout) {
            Ok(output) if output.status.success() => Some(output.stdout),
            Ok(output) => {
                warn!("apksigner 无法读取 {}: {}", apk.display(), output.last_line());
                None
            }
            Err(err) => {
                warn!("无法比较 {} 的证书: {}", apk.display(), err);
                None
            }
        }
    }
}

/// 路径形如 `.../<name>.apk/META-INF/CERT.RSA`
pub fn is_apk_cert(path: &Path) -> bool {
    let meta_inf = path.parent();
    let apk = meta_inf.and_then(Path::parent);

    path.file_name().is_some_and(|n| n == "CERT.RSA")
        && meta_inf.and_then(Path::file_name).is_some_and(|n| n == "META-INF")
        && apk.and_then(Path::extension).is_some_and(|e| e == "apk")
}
