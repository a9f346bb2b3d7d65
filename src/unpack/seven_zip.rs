use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::external::{classify, run_tool};
use super::{UnpackError, UnpackOutcome, Unpacker, matches_name_or_extension};
use crate::config::ToolsConfig;
use crate::utils::read_magic;

/// Android sparse image 文件头
const SPARSE_MAGIC: &[u8] = &[0x3a, 0xff, 0x26, 0xed];

/// boot image editor 无法处理的分区镜像 (system, product, ext4 等)
///
/// sparse 格式先用 `simg2img` 转为原始镜像，再用 `7z` 解压。
pub struct SevenZipUnpacker {
    seven_zip: PathBuf,
    simg2img: PathBuf,
    names: Vec<String>,
    extensions: Vec<String>,
    timeout: Duration,
}

impl SevenZipUnpacker {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            seven_zip: tools.seven_zip.clone(),
            simg2img: tools.simg2img.clone(),
            names: tools.seven_zip_names.clone(),
            extensions: tools.seven_zip_extensions.clone(),
            timeout: tools.timeout(),
        }
    }

    /// 配置给 7z 的镜像不再交给后面的解包器，无法识别即为失败
    fn claim(&self, outcome: UnpackOutcome) -> UnpackOutcome {
        match outcome {
            UnpackOutcome::NotAnImage => {
                UnpackOutcome::Failed(UnpackError::new(self.name(), "无法识别的镜像格式"))
            }
            other => other,
        }
    }

    fn desparse(&self, file: &Path, raw: &Path) -> UnpackOutcome {
        let mut cmd = Command::new(&self.simg2img);
        cmd.arg(file).arg(raw);
        classify("simg2img", run_tool(cmd, self.timeout), raw)
    }
}

impl Unpacker for SevenZipUnpacker {
    fn name(&self) -> &'static str {
        "7z"
    }

    fn try_unpack(&self, file: &Path, dest: &Path) -> UnpackOutcome {
        if !matches_name_or_extension(file, &self.names, &self.extensions) {
            return UnpackOutcome::NotAnImage;
        }
        if let Err(err) = fs::create_dir_all(dest) {
            return UnpackOutcome::Failed(UnpackError::new(self.name(), err));
        }

        let sparse = read_magic(file, 4).is_ok_and(|magic| magic == SPARSE_MAGIC);
        let raw = dest.with_extension("raw");
        let source = if sparse {
            match self.desparse(file, &raw) {
                UnpackOutcome::Unpacked(_) => raw.as_path(),
                other => {
                    let _ = fs::remove_file(&raw);
                    return self.claim(other);
                }
            }
        } else {
            file
        };

        let mut output_flag = OsString::from("-o");
        output_flag.push(dest);

        let mut cmd = Command::new(&self.seven_zip);
        cmd.args(["x", "-bb0", "-bd", "-y"]).arg(output_flag).arg(source);
        let outcome = classify(self.name(), run_tool(cmd, self.timeout), dest);

        if sparse {
            let _ = fs::remove_file(&raw);
        }
        self.claim(outcome)
    }
}
