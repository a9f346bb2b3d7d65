use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use super::{UnpackError, UnpackOutcome, Unpacker, decompressed_name};
use crate::utils::read_magic;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];

/// gzip 数据流，解压为单个文件
pub struct GzipUnpacker;

impl Unpacker for GzipUnpacker {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn try_unpack(&self, file: &Path, dest: &Path) -> UnpackOutcome {
        match read_magic(file, GZIP_MAGIC.len()) {
            Ok(magic) if magic == GZIP_MAGIC => {}
            _ => return UnpackOutcome::NotAnImage,
        }

        match decompress(file, dest) {
            Ok(()) => UnpackOutcome::Unpacked(dest.to_path_buf()),
            Err(err) => UnpackOutcome::Failed(UnpackError::new(self.name(), err)),
        }
    }
}

fn decompress(file: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    let output = dest.join(decompressed_name(file, &["gz", "gzip"]));

    let mut decoder = GzDecoder::new(BufReader::new(File::open(file)?));
    let mut writer = BufWriter::new(File::create(&output)?);
    io::copy(&mut decoder, &mut writer)?;
    Ok(())
}
