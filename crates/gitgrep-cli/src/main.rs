use anyhow::{Context, Result};
use clap::Parser;
use gitgrep_core::{compile_pattern, scan_tree, AnsiReporter, ScanOptions};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "gitgrep", version, about = "Search recursively for a regex pattern in .git files")]
struct Cli {
    /// 要搜索的正则表达式
    pattern: String,

    /// 搜索根目录（默认当前目录）
    #[arg(default_value = ".")]
    path: PathBuf,

    /// 匹配时忽略大小写
    #[arg(short = 'i', long = "ignore")]
    ignore: bool,

    /// 命中前显示的上下文行数
    #[arg(short = 'B', short_alias = 'b', long = "before", default_value_t = 0)]
    before: usize,

    /// 命中后显示的上下文行数
    #[arg(short = 'A', short_alias = 'a', long = "after", default_value_t = 0)]
    after: usize,

    /// 单行最大显示宽度（码点数）
    #[arg(short = 'L', long = "maxline", default_value_t = 256, value_parser = parse_maxline)]
    maxline: usize,
}

/// maxline 必须为正整数
fn parse_maxline(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(String::from("maxline must be a positive integer")),
    }
}

fn main() {
    // 初始化日志（支持通过 RUST_LOG 控制等级，例如 info、debug）
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        // 下游管道关闭属正常终止，静默退出且不改变退出码
        if is_broken_pipe(&e) {
            return;
        }
        error!(error = %e, "fatal");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let opts = ScanOptions {
        before: cli.before,
        after: cli.after,
        max_line: cli.maxline,
        ignore_case: cli.ignore,
    };
    // 非法正则在任何扫描开始前致命退出
    let pattern = compile_pattern(&cli.pattern, &opts)?;

    // Ctrl-C 只置位取消标志；遍历循环在文件间检查并干净收尾（退出码 0）
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed))
            .context("install interrupt handler")?;
    }

    let mut reporter = AnsiReporter::new(io::stdout().lock());
    let stats = scan_tree(&cli.path, &pattern, &opts, &mut reporter, &cancel)?;

    info!(
        files_scanned = stats.files_scanned,
        files_failed = stats.files_failed,
        matches_found = stats.matches_found,
        "scan finished"
    );
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 支持通过环境变量 RUST_LOG 控制日志等级，如：RUST_LOG=debug
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(env_filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.downcast_ref::<io::Error>()
        .map(|e| e.kind() == io::ErrorKind::BrokenPipe)
        .unwrap_or(false)
}
