mod common;

use std::path::Path;

use common::{Trees, gzip_bytes, paths, write_file, write_zip, zip_bytes};
use target_files_diff::compare::{DiffStatus, NodeKind};
use target_files_diff::config::CompareConfig;
use target_files_diff::error::UnpackError;
use target_files_diff::report::{render_summary, report};
use target_files_diff::unpack::{UnpackOutcome, Unpacker, UnpackerChain};

/// 对名为 broken.img 的文件报告解包失败，其余交给进程内解包器
struct BrokenImageUnpacker {
    inner: UnpackerChain,
}

impl Unpacker for BrokenImageUnpacker {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn try_unpack(&self, file: &Path, dest: &Path) -> UnpackOutcome {
        if file.file_name().is_some_and(|n| n == "broken.img") {
            return UnpackOutcome::Failed(UnpackError::new("broken", "exit status: 3"));
        }
        self.inner.try_unpack(file, dest)
    }
}

#[test]
fn identical_trees_produce_no_records() {
    let trees = Trees::new();
    for root in [trees.left(), trees.right()] {
        write_file(root, "SYSTEM/build.prop", b"ro.build.id=AP1A\n");
        write_zip(root, "IMAGES/system.img", &[("a.txt", b"x")]);
        write_file(root, "META/misc_info.txt", b"key=value\n");
    }

    let (records, stats) = trees.compare(&UnpackerChain::in_process());

    assert!(records.is_empty());
    assert_eq!(stats.identical, 3);

    let summary = render_summary(&report(records, stats, true));
    assert!(summary.contains("(无)"));
    assert!(summary.contains("差异: 0 个文件, 无法比较: 0 个文件, 重复差异: 0 个"));
}

#[test]
fn single_leaf_change_is_bucketed_by_extension() {
    let trees = Trees::new();
    write_file(trees.left(), "SYSTEM/etc/config.xml", b"<a>1</a>");
    write_file(trees.right(), "SYSTEM/etc/config.xml", b"<a>2</a>");
    write_file(trees.left(), "SYSTEM/etc/same.xml", b"<b/>");
    write_file(trees.right(), "SYSTEM/etc/same.xml", b"<b/>");

    let (records, stats) = trees.compare(&UnpackerChain::in_process());

    assert_eq!(paths(&records), vec!["SYSTEM/etc/config.xml"]);
    assert_eq!(records[0].status, DiffStatus::Differing);
    assert_eq!(records[0].extension, "xml");
    assert_eq!(records[0].left.size, Some(8));

    let summary = report(records, stats, true);
    assert_eq!(summary.counts, vec![("xml".to_string(), 1)]);
}

#[test]
fn nested_image_difference_is_reported_inside_container() {
    let trees = Trees::new();
    write_zip(trees.left(), "IMAGES/system.img", &[("a.txt", b"x"), ("b.txt", b"same")]);
    write_zip(trees.right(), "IMAGES/system.img", &[("a.txt", b"y"), ("b.txt", b"same")]);

    let (records, stats) = trees.compare(&UnpackerChain::in_process());

    assert_eq!(paths(&records), vec!["IMAGES/system.img/a.txt"]);
    assert_eq!(records[0].extension, "txt");
    assert_eq!(records[0].kind, NodeKind::File);
    assert_eq!(stats.containers, 1);
}

#[test]
fn containers_nest_recursively() {
    let trees = Trees::new();
    let left_apk = zip_bytes(&[("classes.dex", b"dex-1")]);
    let right_apk = zip_bytes(&[("classes.dex", b"dex-2")]);
    write_zip(trees.left(), "IMAGES/system.img", &[("app/Foo/Foo.apk", &left_apk)]);
    write_zip(trees.right(), "IMAGES/system.img", &[("app/Foo/Foo.apk", &right_apk)]);

    let (records, stats) = trees.compare(&UnpackerChain::in_process());

    assert_eq!(
        paths(&records),
        vec!["IMAGES/system.img/app/Foo/Foo.apk/classes.dex"]
    );
    assert_eq!(records[0].extension, "dex");
    assert_eq!(stats.containers, 2);
}

#[test]
fn gzip_streams_are_decompressed_before_comparison() {
    let trees = Trees::new();
    write_file(trees.left(), "assets/NOTICE.html.gz", &gzip_bytes(b"<p>one</p>"));
    write_file(trees.right(), "assets/NOTICE.html.gz", &gzip_bytes(b"<p>two</p>"));

    let (records, _) = trees.compare(&UnpackerChain::in_process());

    assert_eq!(paths(&records), vec!["assets/NOTICE.html.gz/NOTICE.html"]);
    assert_eq!(records[0].extension, "html");
}

#[test]
fn asymmetric_unpackability_is_an_anomaly() {
    let trees = Trees::new();
    write_zip(trees.left(), "IMAGES/vendor.img", &[("a.txt", b"x")]);
    write_file(trees.right(), "IMAGES/vendor.img", b"raw partition bytes");

    let (records, _) = trees.compare(&UnpackerChain::in_process());

    assert_eq!(paths(&records), vec!["IMAGES/vendor.img"]);
    assert!(matches!(records[0].status, DiffStatus::Anomaly(_)));
    assert_eq!(records[0].kind, NodeKind::Image);
    assert_eq!(records[0].extension, "img");
}

#[test]
fn only_left_container_is_not_recursed() {
    let trees = Trees::new();
    write_zip(trees.left(), "SYSTEM/app/Extra.apk", &[("classes.dex", b"dex")]);
    write_file(trees.left(), "SYSTEM/app/Common.txt", b"same");
    write_file(trees.right(), "SYSTEM/app/Common.txt", b"same");
    write_file(trees.right(), "SYSTEM/priv-app/New/New.txt", b"new");

    let (records, stats) = trees.compare(&UnpackerChain::in_process());

    assert_eq!(paths(&records), vec!["SYSTEM/app/Extra.apk", "SYSTEM/priv-app"]);
    assert_eq!(records[0].status, DiffStatus::OnlyLeft);
    assert_eq!(records[0].extension, "apk");
    assert_eq!(records[1].status, DiffStatus::OnlyRight);
    assert_eq!(records[1].kind, NodeKind::Directory);
    assert_eq!(stats.containers, 0);
}

#[test]
fn file_and_directory_mismatch_is_an_anomaly() {
    let trees = Trees::new();
    write_file(trees.left(), "VENDOR/firmware", b"blob");
    write_file(trees.right(), "VENDOR/firmware/fw.bin", b"blob");

    let (records, _) = trees.compare(&UnpackerChain::in_process());

    assert_eq!(paths(&records), vec!["VENDOR/firmware"]);
    assert!(matches!(records[0].status, DiffStatus::Anomaly(_)));
}

#[test]
fn unpack_failure_is_recorded_and_comparison_continues() {
    let trees = Trees::new();
    write_file(trees.left(), "IMAGES/broken.img", b"left image");
    write_file(trees.right(), "IMAGES/broken.img", b"right image");
    write_file(trees.left(), "IMAGES/zz.txt", b"1");
    write_file(trees.right(), "IMAGES/zz.txt", b"2");

    let unpacker = BrokenImageUnpacker {
        inner: UnpackerChain::in_process(),
    };
    let (records, stats) = trees.compare(&unpacker);

    assert_eq!(paths(&records), vec!["IMAGES/broken.img", "IMAGES/zz.txt"]);
    assert_eq!(
        records[0].status,
        DiffStatus::UnpackError("broken: exit status: 3".to_string())
    );
    assert_eq!(records[1].status, DiffStatus::Differing);

    let summary = render_summary(&report(records, stats, true));
    assert!(summary.contains("=== 无法比较的文件 (1) ==="));
    assert!(summary.contains("IMAGES/broken.img: broken: exit status: 3"));
}

#[test]
fn whitespace_and_build_metadata_noise_is_ignored() {
    let trees = Trees::new();
    write_file(
        trees.left(),
        "SYSTEM/build.prop",
        b"# autogenerated 2023\nro.build.id=AP1A\nro.system.build.date.utc=1690000000\nro.build.host=builder-1\n",
    );
    write_file(
        trees.right(),
        "SYSTEM/build.prop",
        b"# autogenerated 2024\nro.build.id = AP1A\n\nro.system.build.date.utc=1700000000\nro.build.host=builder-2\n",
    );

    let (records, stats) = trees.compare(&UnpackerChain::in_process());

    assert!(records.is_empty());
    assert_eq!(stats.identical, 1);
}

#[test]
fn real_property_change_is_not_noise() {
    let trees = Trees::new();
    write_file(trees.left(), "SYSTEM/build.prop", b"ro.build.id=AP1A\n");
    write_file(trees.right(), "SYSTEM/build.prop", b"ro.build.id=AP2A\n");

    let (records, _) = trees.compare(&UnpackerChain::in_process());

    assert_eq!(paths(&records), vec!["SYSTEM/build.prop"]);
    assert_eq!(records[0].extension, "prop");
}

#[test]
fn whitespace_is_significant_when_configured() {
    let trees = Trees::new();
    write_file(trees.left(), "etc/init.rc", b"service foo /bin/foo\n");
    write_file(trees.right(), "etc/init.rc", b"service  foo /bin/foo\n");

    let config = CompareConfig {
        ignore_whitespace: false,
        ..CompareConfig::default()
    };
    let (records, _) = trees.compare_with(&config, &UnpackerChain::in_process());

    assert_eq!(paths(&records), vec!["etc/init.rc"]);
}

#[test]
fn map_files_are_compared_with_sorted_lines() {
    let trees = Trees::new();
    write_file(trees.left(), "kernel/System.map", b"b 0002\na 0001\n");
    write_file(trees.right(), "kernel/System.map", b"a 0001\nb 0002\n");

    let (records, _) = trees.compare(&UnpackerChain::in_process());

    assert!(records.is_empty());
}

#[test]
fn skipped_names_are_ignored() {
    let trees = Trees::new();
    write_file(trees.left(), "IMAGES/userdata.img", b"one");
    write_file(trees.right(), "IMAGES/userdata.img", b"two");

    let (records, stats) = trees.compare(&UnpackerChain::in_process());

    assert!(records.is_empty());
    assert_eq!(stats.nodes, 1);
}

#[test]
fn records_follow_lexicographic_order() {
    let trees = Trees::new();
    for name in ["c.txt", "a.txt", "b/z.txt", "b/a.txt"] {
        write_file(trees.left(), name, b"left");
        write_file(trees.right(), name, b"right");
    }

    let (first, _) = trees.compare(&UnpackerChain::in_process());
    let (second, _) = trees.compare(&UnpackerChain::in_process());

    assert_eq!(paths(&first), vec!["a.txt", "b/a.txt", "b/z.txt", "c.txt"]);
    assert_eq!(paths(&first), paths(&second));
}

#[cfg(unix)]
#[test]
fn symlinks_are_compared_by_target() {
    use std::os::unix::fs::symlink;

    let trees = Trees::new();
    write_file(trees.left(), "SYSTEM/bin/toybox", b"bin");
    write_file(trees.right(), "SYSTEM/bin/toybox", b"bin");
    symlink("toybox", trees.left().join("SYSTEM/bin/ls")).unwrap();
    symlink("toybox2", trees.right().join("SYSTEM/bin/ls")).unwrap();
    symlink("/missing", trees.left().join("SYSTEM/bin/dangling")).unwrap();
    symlink("/missing", trees.right().join("SYSTEM/bin/dangling")).unwrap();

    let (records, _) = trees.compare(&UnpackerChain::in_process());

    assert_eq!(paths(&records), vec!["SYSTEM/bin/ls"]);
    assert_eq!(records[0].kind, NodeKind::Symlink);
    assert_eq!(records[0].status, DiffStatus::Differing);
}

#[test]
fn non_utf8_bytes_are_never_noise() {
    let trees = Trees::new();
    write_file(trees.left(), "vendor/firmware/blob.bin", b"\xff\xfe header\n");
    write_file(trees.right(), "vendor/firmware/blob.bin", b"\xfe\xff header\n");

    let (records, _) = trees.compare(&UnpackerChain::in_process());

    assert_eq!(paths(&records), vec!["vendor/firmware/blob.bin"]);
    assert_eq!(records[0].status, DiffStatus::Differing);
}

#[cfg(unix)]
mod special_files {
    use super::*;
    use std::process::Command;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use target_files_diff::compare::DiffRecord;

    fn mkfifo(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let status = Command::new("mkfifo").arg(&path).status().unwrap();
        assert!(status.success());
    }

    /// 在线程中比较，读取 FIFO 会阻塞，超时视为失败
    fn compare_with_deadline(trees: Trees) -> Vec<DiffRecord> {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (records, _) = trees.compare(&UnpackerChain::in_process());
            let _ = tx.send(records);
        });
        rx.recv_timeout(Duration::from_secs(10))
            .expect("比较在特殊文件上阻塞")
    }

    #[test]
    fn fifos_are_compared_without_opening() {
        let trees = Trees::new();
        mkfifo(trees.left(), "dev/pipe");
        mkfifo(trees.right(), "dev/pipe");
        write_file(trees.left(), "dev/z.txt", b"1");
        write_file(trees.right(), "dev/z.txt", b"2");

        let records = compare_with_deadline(trees);

        assert_eq!(paths(&records), vec!["dev/z.txt"]);
    }

    #[test]
    fn fifo_against_regular_file_is_an_anomaly() {
        let trees = Trees::new();
        mkfifo(trees.left(), "dev/pipe");
        write_file(trees.right(), "dev/pipe", b"not a pipe");

        let records = compare_with_deadline(trees);

        assert_eq!(paths(&records), vec!["dev/pipe"]);
        assert!(matches!(records[0].status, DiffStatus::Anomaly(_)));
    }

    #[test]
    fn only_left_fifo_is_recorded() {
        let trees = Trees::new();
        mkfifo(trees.left(), "dev/pipe");
        std::fs::create_dir_all(trees.right().join("dev")).unwrap();

        let records = compare_with_deadline(trees);

        assert_eq!(paths(&records), vec!["dev/pipe"]);
        assert_eq!(records[0].status, DiffStatus::OnlyLeft);
        assert_eq!(records[0].kind, NodeKind::Special);
        assert_eq!(records[0].left.size, None);
    }
}
