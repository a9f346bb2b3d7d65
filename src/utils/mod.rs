mod fs;
mod hash;

pub use fs::{
    EntryKind, copy_path, extension_bucket, file_size, is_text_file, list_entries, read_magic,
    special_identity,
};
pub use hash::{HashResult, compute_file_hash};
