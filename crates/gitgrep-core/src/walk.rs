//! 目录遍历与逐文件驱动
//!
//! 发现规则：root 之下任意深度、路径中含有 `*.git` 组件的常规文件都算候选
//! （同时覆盖工作区的 `.git` 与裸仓库的 `foo.git`）。不做文件名排除——
//! `index`/`config`/`HEAD` 一并扫描。
//! 文件之间严格串行：扫完一个再开下一个，句柄与解压上下文不跨文件保留。

use std::path::{Component, Path};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use regex::Regex;
use tracing::error;
use walkdir::WalkDir;

use crate::matcher::scan_file;
use crate::options::{ScanOptions, ScanStats};
use crate::report::Report;

/// 路径（目录部分）是否落在某个 `*.git` 组件之下
fn under_git_dir(dir: &Path) -> bool {
    dir.components().any(|c| match c {
        Component::Normal(os) => os.to_string_lossy().ends_with(".git"),
        _ => false,
    })
}

/// 顺序扫描 root 下所有 `*.git` 目录内的文件。
/// 单文件错误只记录并计数，整体遍历继续；`cancel` 在文件间检查，
/// 置位后带着已有统计提前返回（调用方以退出码 0 收尾）。
pub fn scan_tree(
    root: &Path,
    pattern: &Regex,
    opts: &ScanOptions,
    reporter: &mut dyn Report,
    cancel: &AtomicBool,
) -> Result<ScanStats> {
    let mut stats = ScanStats::default();

    for entry in WalkDir::new(root) {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                error!(error = %e, "walk entry failed");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        // 只看 root 之下的相对目录部分；root 自身是否叫 .git 不影响判定
        let rel = path.strip_prefix(root).unwrap_or(path);
        let dir_part = match rel.parent() {
            Some(p) => p,
            None => continue,
        };
        if !under_git_dir(dir_part) {
            continue;
        }

        match scan_file(path, pattern, opts, reporter) {
            Ok(n) => {
                stats.files_scanned += 1;
                stats.matches_found += n;
            }
            Err(e) => {
                // 下游管道关闭时向上传递，由调用方静默退出
                if is_broken_pipe(&e) {
                    return Err(e);
                }
                stats.files_failed += 1;
                error!(path = %path.display(), error = %e, "error reading file");
            }
        }
    }

    Ok(stats)
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .map(|e| e.kind() == std::io::ErrorKind::BrokenPipe)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::compile_pattern;
    use crate::report::AnsiReporter;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_file(root: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn strip_ansi(s: &str) -> String {
        let re = Regex::new("\u{1b}\\[[0-9;]*m").unwrap();
        re.replace_all(s, "").into_owned()
    }

    fn run_tree(root: &Path, pattern: &str, opts: &ScanOptions) -> (ScanStats, String) {
        let re = compile_pattern(pattern, opts).unwrap();
        let mut reporter = AnsiReporter::new(Vec::new());
        let cancel = AtomicBool::new(false);
        let stats = scan_tree(root, &re, opts, &mut reporter, &cancel).unwrap();
        let raw = String::from_utf8(reporter.into_inner()).unwrap();
        (stats, strip_ansi(&raw))
    }

    #[test]
    fn under_git_dir_matches_any_depth() {
        assert!(under_git_dir(Path::new("repo/.git/objects/ab")));
        assert!(under_git_dir(Path::new("mirror/bare.git/refs")));
        assert!(!under_git_dir(Path::new("repo/src")));
        assert!(!under_git_dir(Path::new("")));
    }

    #[test]
    fn end_to_end_match_with_context() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "repo/.git/objects/ab/cdef0123",
            b"hello\nsecretkey123\nworld\n",
        );
        // .git 之外的文件不在扫描范围内
        write_file(dir.path(), "repo/src/main.rs", b"secretkey123\n");

        let opts = ScanOptions { before: 1, after: 1, ..ScanOptions::default() };
        let (stats, out) = run_tree(dir.path(), r"secret\w+", &opts);

        assert_eq!(stats.files_scanned, 1);
        assert_eq!(stats.matches_found, 1);
        assert!(out.contains("Found: "));
        assert!(out.contains("cdef0123"));
        assert!(out.contains("   1 hello"));
        assert!(out.contains("   2 secretkey123"));
        assert!(out.contains("   3 world"));
        assert!(!out.contains("main.rs"));
    }

    #[test]
    fn compressed_loose_object_is_searched_transparently() {
        let dir = TempDir::new().unwrap();
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"blob 24\x00token=deadbeefcafe\n").unwrap();
        write_file(dir.path(), "repo/.git/objects/11/22334455", &enc.finish().unwrap());

        let (stats, out) = run_tree(dir.path(), "deadbeef", &ScanOptions::default());
        assert_eq!(stats.matches_found, 1);
        assert!(out.contains("deadbeefcafe"));
    }

    #[test]
    fn malformed_zlib_is_reported_and_walk_continues() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a/.git/objects/00/bad", &[0x78, 0x9c, 0xde, 0xad, 0xbe, 0xef]);
        write_file(dir.path(), "b/.git/objects/00/good", b"needle\n");

        let (stats, out) = run_tree(dir.path(), "needle", &ScanOptions::default());
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.files_scanned, 1);
        assert_eq!(stats.matches_found, 1);
        assert!(out.contains("needle"));
    }

    #[test]
    fn empty_git_file_produces_no_output_and_no_error() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "repo/.git/objects/ef/empty", b"");

        let (stats, out) = run_tree(dir.path(), "anything", &ScanOptions::default());
        assert_eq!(stats.files_scanned, 1);
        assert_eq!(stats.files_failed, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn cancel_flag_stops_the_walk_early() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "repo/.git/objects/ab/cd", b"needle\n");

        let opts = ScanOptions::default();
        let re = compile_pattern("needle", &opts).unwrap();
        let mut reporter = AnsiReporter::new(Vec::new());
        let cancel = AtomicBool::new(true);
        let stats = scan_tree(dir.path(), &re, &opts, &mut reporter, &cancel).unwrap();
        assert_eq!(stats.files_scanned, 0);
        assert!(reporter.into_inner().is_empty());
    }
}
