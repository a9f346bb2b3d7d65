use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::external::{classify, run_tool};
use super::{UnpackError, UnpackOutcome, Unpacker, matches_name_or_extension};
use crate::config::ToolsConfig;
use crate::utils::copy_path;

/// Android boot image editor (`gradlew unpack`)
///
/// 编辑器只处理安装目录下的镜像，因此每次解包：
///
/// 1. 清理安装目录中残留的镜像和上次的 `build/unzip_boot`
/// 2. 复制镜像到安装目录并运行 `gradlew unpack`
/// 3. 将 `build/unzip_boot` 移动到目标目录并删除 `.log` 文件
pub struct BootImageEditor {
    dir: PathBuf,
    extensions: Vec<String>,
    timeout: Duration,
}

impl BootImageEditor {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            dir: tools.editor_dir(),
            extensions: tools.editor_extensions.clone(),
            timeout: tools.timeout(),
        }
    }

    fn output_dir(&self) -> PathBuf {
        self.dir.join("build").join("unzip_boot")
    }

    fn clear_stale(&self) -> io::Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && matches_name_or_extension(&path, &[], &self.extensions) {
                fs::remove_file(&path)?;
            }
        }

        let output = self.output_dir();
        if output.exists() {
            fs::remove_dir_all(&output)?;
        }
        Ok(())
    }

    fn unpack(&self, file: &Path, dest: &Path) -> io::Result<UnpackOutcome> {
        self.clear_stale()?;

        let file_name = file
            .file_name()
            .ok_or_else(|| io::Error::other("镜像路径没有文件名"))?;
        let staged = self.dir.join(file_name);
        fs::copy(file, &staged)?;

        let mut cmd = Command::new(self.dir.join("gradlew"));
        cmd.arg("unpack").current_dir(&self.dir);
        let result = run_tool(cmd, self.timeout);
        let _ = fs::remove_file(&staged);

        match classify(self.name(), result, dest) {
            UnpackOutcome::Unpacked(_) => {}
            other => return Ok(other),
        }

        let output = self.output_dir();
        if !output.is_dir() {
            return Ok(UnpackOutcome::Failed(UnpackError::new(
                self.name(),
                format!("未生成 {}", output.display()),
            )));
        }

        move_dir(&output, dest)?;
        remove_logs(dest)?;
        Ok(UnpackOutcome::Unpacked(dest.to_path_buf()))
    }
}

impl Unpacker for BootImageEditor {
    fn name(&self) -> &'static str {
        "boot-image-editor"
    }

    fn try_unpack(&self, file: &Path, dest: &Path) -> UnpackOutcome {
        if !matches_name_or_extension(file, &[], &self.extensions) {
            return UnpackOutcome::NotAnImage;
        }

        let gradlew = self.dir.join("gradlew");
        if !gradlew.is_file() {
            return UnpackOutcome::Failed(UnpackError::new(
                self.name(),
                format!("找不到 {}", gradlew.display()),
            ));
        }

        self.unpack(file, dest)
            .unwrap_or_else(|err| UnpackOutcome::Failed(UnpackError::new(self.name(), err)))
    }
}

fn move_dir(source: &Path, dest: &Path) -> io::Result<()> {
    if dest.exists() {
        fs::remove_dir_all(dest)?;
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    // 跨文件系统时 rename 会失败，改为复制
    if fs::rename(source, dest).is_err() {
        copy_path(source, dest)?;
        fs::remove_dir_all(source)?;
    }
    Ok(())
}

/// editor 调用 7z 时会留下以 uuid 命名的日志
fn remove_logs(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "log") {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
