//! gitgrep 核心库：对 `.git` 内部存储做字节/文本级正则搜索
//!
//! 设计要点：
//! - 不解析 git 对象模型（无 commit/tree/blob 语义、无 delta、无 pack 索引），
//!   把 `.git` 当作一袋不透明文件：有的是裸文本，有的是 zlib 压缩流。
//! - 流式行解码：按 64 KiB 块增量 inflate，内存占用与文件大小无关。
//! - 单向游标 + 有界回看环形缓冲：before/after 上下文不会重复消费行。
//! - 核心只产出结构化事件（角色/行号/文本/命中区间），ANSI 渲染与扫描逻辑分离。
//! - 单文件错误只终止该文件的扫描，整体遍历继续；退出码不受影响。

mod matcher;
mod options;
mod report;
mod stream;
mod walk;

pub use matcher::{compile_pattern, scan_file};
pub use options::{ScanOptions, ScanStats};
pub use report::{AnsiReporter, LineRole, MatchSpan, Report};
pub use stream::LineReader;
pub use walk::scan_tree;
