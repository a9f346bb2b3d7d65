use std::path::Path;

use super::{UnpackError, UnpackOutcome, Unpacker};
use crate::extract::extract_archive;
use crate::utils::read_magic;

const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_ARCHIVE: &[u8] = b"PK\x05\x06";

/// zip 系列容器 (zip, apk, apex, capex, jar)，按文件头识别
pub struct ArchiveUnpacker;

impl Unpacker for ArchiveUnpacker {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn try_unpack(&self, file: &Path, dest: &Path) -> UnpackOutcome {
        let magic = match read_magic(file, 4) {
            Ok(magic) => magic,
            Err(_) => return UnpackOutcome::NotAnImage,
        };
        if magic != ZIP_LOCAL_HEADER && magic != ZIP_EMPTY_ARCHIVE {
            return UnpackOutcome::NotAnImage;
        }

        match extract_archive(file, dest) {
            Ok(()) => UnpackOutcome::Unpacked(dest.to_path_buf()),
            Err(err) => UnpackOutcome::Failed(UnpackError::new(self.name(), err)),
        }
    }
}
