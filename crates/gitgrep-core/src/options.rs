//! 扫描选项与统计信息（模块）

/// 扫描选项
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// 命中前回看的上下文行数
    pub before: usize,
    /// 命中后继续输出的上下文行数
    pub after: usize,
    /// 单行输出的最大码点数；超出部分以省略号截断（必须 > 0）
    pub max_line: usize,
    /// 是否忽略大小写（编译正则时生效）
    pub ignore_case: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            before: 0,
            after: 0,
            max_line: 256,
            ignore_case: false,
        }
    }
}

/// 扫描统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub files_failed: usize,
    pub matches_found: usize,
}
