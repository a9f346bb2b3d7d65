mod cert;
mod metadata;
mod persist;
mod summary;

pub use cert::{ApkCertDiff, is_apk_cert};
pub use metadata::{Metadata, REPORT_FILE, write_report_file};
pub use persist::{DIFFS_DIR, SUMMARY_FILE, persist};
pub use summary::{SummaryReport, render_summary, report};
