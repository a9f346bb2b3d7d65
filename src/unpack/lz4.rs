use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::external::{classify, run_tool};
use super::{UnpackError, UnpackOutcome, Unpacker, decompressed_name};
use crate::config::ToolsConfig;
use crate::utils::read_magic;

const LZ4_FRAME_MAGIC: &[u8] = &[0x04, 0x22, 0x4d, 0x18];
const LZ4_LEGACY_MAGIC: &[u8] = &[0x02, 0x21, 0x4c, 0x18];

/// lz4 压缩数据 (内核、ramdisk)，通过 `lz4` 命令解压
pub struct Lz4Unpacker {
    program: PathBuf,
    timeout: Duration,
}

impl Lz4Unpacker {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            program: tools.lz4.clone(),
            timeout: tools.timeout(),
        }
    }
}

impl Unpacker for Lz4Unpacker {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn try_unpack(&self, file: &Path, dest: &Path) -> UnpackOutcome {
        match read_magic(file, 4) {
            Ok(magic) if magic == LZ4_FRAME_MAGIC || magic == LZ4_LEGACY_MAGIC => {}
            _ => return UnpackOutcome::NotAnImage,
        }

        if let Err(err) = fs::create_dir_all(dest) {
            return UnpackOutcome::Failed(UnpackError::new(self.name(), err));
        }
        let output = dest.join(decompressed_name(file, &["lz4"]));

        let mut cmd = Command::new(&self.program);
        cmd.args(["-d", "-f", "-q"]).arg(file).arg(&output);

        classify(self.name(), run_tool(cmd, self.timeout), dest)
    }
}
