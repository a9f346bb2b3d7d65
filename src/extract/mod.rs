mod archive;
mod build_info;

pub use archive::{RunWorkspace, Side, extract_archive, prepare_target};
pub use build_info::{BUILD_PROP_PATH, format_build_date, parse_build_props, read_build_props};
