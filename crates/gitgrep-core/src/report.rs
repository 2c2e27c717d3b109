//! 扫描事件与 ANSI 渲染
//!
//! 核心只产出结构化事件（文件头 / 带角色的行），渲染由 `Report` 的实现方决定；
//! 终端渲染走 `colored`，测试可以换成收集器而不碰任何转义序列。

use std::io::{self, Write};
use std::path::Path;

use colored::Colorize;

/// 行在输出中的角色（决定配色）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    /// 命中前的回看上下文
    Before,
    /// 命中行本身
    Match,
    /// 命中后的前看上下文
    After,
}

/// 单行文本内的命中区间：字节偏移的半开区间，互不重叠、自左向右。
/// 区间指向的是截断后的展示文本，因此永远不会越过截断边界。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

/// 扫描事件接收端
pub trait Report {
    /// 命中时的文件头事件。每次命中都会触发一次（沿用原始行为，不按文件去重）。
    fn file_header(&mut self, path: &Path) -> io::Result<()>;
    /// 单行输出事件；`spans` 仅在 `LineRole::Match` 时可能非空
    fn line(&mut self, role: LineRole, linenum: usize, text: &str, spans: &[MatchSpan]) -> io::Result<()>;
}

/// ANSI 终端渲染器：绿色下划线文件头，蓝色右对齐行号，
/// 回看上下文青色、前看上下文品红、命中区间红底加粗。
pub struct AnsiReporter<W: Write> {
    out: W,
}

impl<W: Write> AnsiReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Report for AnsiReporter<W> {
    fn file_header(&mut self, path: &Path) -> io::Result<()> {
        let header = format!("Found: {}", path.display());
        writeln!(self.out, "{}", header.green().underline())
    }

    fn line(&mut self, role: LineRole, linenum: usize, text: &str, spans: &[MatchSpan]) -> io::Result<()> {
        let body = match role {
            LineRole::Before => text.cyan().to_string(),
            LineRole::Match => highlight_spans(text, spans),
            LineRole::After => text.magenta().to_string(),
        };
        writeln!(self.out, "{} {}", format!("{linenum:>4}").blue(), body)
    }
}

/// 自后向前插入高亮标记，避免先插入的序列让后续偏移失效
pub(crate) fn highlight_spans(text: &str, spans: &[MatchSpan]) -> String {
    let mut out = text.to_string();
    for sp in spans.iter().rev() {
        let marked = text[sp.start..sp.end].bold().on_red().to_string();
        out.replace_range(sp.start..sp.end, &marked);
    }
    out
}

/// 按码点截断：超长行保留前 `max_line - 1` 个码点并补一个省略号，
/// 截断结果恰好 `max_line` 个码点；不超长的行原样返回。
pub(crate) fn truncate_line(s: &str, max_line: usize) -> String {
    if s.chars().count() > max_line {
        let mut t: String = s.chars().take(max_line.saturating_sub(1)).collect();
        t.push('…');
        t
    } else {
        s.to_string()
    }
}
