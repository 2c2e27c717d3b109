//! 上下文窗口匹配器（单向游标 + 有界回看环形缓冲）
//!
//! 游标语义：整个文件只有一个前进游标。被当作 after 上下文消费掉的行
//! 不会再参与后续匹配，也不会进入回看缓冲——消费即丢弃。

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use crate::options::ScanOptions;
use crate::report::{truncate_line, LineRole, MatchSpan, Report};
use crate::stream::LineReader;

/// 编译用户提供的正则（大小写开关来自选项）。
/// 编译失败属致命错误，由调用方报告一次并以非零码退出，不进入任何扫描。
pub fn compile_pattern(pattern: &str, opts: &ScanOptions) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(opts.ignore_case)
        .build()
        .with_context(|| format!("invalid regex: {pattern}"))
}

/// 扫描单个文件，逐行匹配并即时产出事件，返回命中次数。
///
/// - 回看缓冲容量固定为 `before`，装满后先逐出最旧的行再追加；
/// - 命中时先产出文件头事件，再自旧向新倾空回看缓冲，打印命中行，
///   最后从同一游标继续拉取至多 `after` 行作为前看上下文；
/// - 序列提前结束时 after 上下文有多少打多少，不算错误。
pub fn scan_file(
    path: &Path,
    pattern: &Regex,
    opts: &ScanOptions,
    reporter: &mut dyn Report,
) -> Result<usize> {
    let mut lines = LineReader::open(path)?;
    let mut lookback: VecDeque<(usize, String)> = VecDeque::with_capacity(opts.before);
    let mut matches_found = 0usize;
    let mut linenum = 0usize;

    while let Some(item) = lines.next() {
        linenum += 1;
        let text = item?;

        if !pattern.is_match(&text) {
            if opts.before > 0 {
                if lookback.len() == opts.before {
                    lookback.pop_front();
                }
                lookback.push_back((linenum, text));
            }
            continue;
        }

        matches_found += 1;
        reporter.file_header(path)?;

        while let Some((n, prev)) = lookback.pop_front() {
            reporter.line(LineRole::Before, n, &truncate_line(&prev, opts.max_line), &[])?;
        }

        // 截断策略：先截断、再在截断文本上重新取命中区间。
        // 命中判定用的是完整行，因此区间可能落在截断边界之外而消失，
        // 但绝不会产生越界区间。
        let shown = truncate_line(&text, opts.max_line);
        let spans: Vec<MatchSpan> = pattern
            .find_iter(&shown)
            .map(|m| MatchSpan { start: m.start(), end: m.end() })
            .collect();
        reporter.line(LineRole::Match, linenum, &shown, &spans)?;

        for _ in 0..opts.after {
            match lines.next() {
                Some(item) => {
                    linenum += 1;
                    let next = item?;
                    reporter.line(LineRole::After, linenum, &truncate_line(&next, opts.max_line), &[])?;
                }
                None => break,
            }
        }
    }

    Ok(matches_found)
}
