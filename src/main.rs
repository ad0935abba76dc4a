//! # sstap-rules
//!
//! 合并 SSTap 规则文件的 CLI 工具。
//!
//! ## 功能
//! - 从本地目录、git 仓库或 GitHub API 读取规则文件
//! - 列出所有规则（索引 + 显示名称）
//! - 按索引合并多条规则：网段取并集并聚合为最小 CIDR 集合
//! - 输出 `<name>.rules`，格式与原规则文件一致
//!
//! ## 使用
//! ```bash
//! # 列出默认仓库 (FQrabbit/SSTap-Rule) 中的规则
//! sstap-rules list
//!
//! # 使用本地目录，JSON 输出
//! sstap-rules --dir ./rules list --format json
//!
//! # 合并 0、3、5 号规则，写入当前目录
//! sstap-rules --dir ./rules combine 0,3,5
//!
//! # 不给索引时交互输入
//! sstap-rules --github FQrabbit/SSTap-Rule combine
//! ```

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{info, warn};
use serde::Serialize;

mod error;
mod output;
mod rule;
mod source;

use output::ListFormat;
use rule::{parse_index_list, AddressCount, Rule, RuleSet};
use source::{SourceKind, DEFAULT_GIT_URL, DEFAULT_SUBDIR};

// ========================================
// CLI 参数定义
// ========================================

/// SSTap 规则合并工具
#[derive(Parser)]
#[command(name = "sstap-rules")]
#[command(version)]
#[command(about = "Merge SSTap rule files into one aggregated CIDR rule")]
struct Cli {
    /// 规则来源
    #[command(flatten)]
    source: SourceArgs,

    /// 显示调试日志
    #[arg(long)]
    debug: bool,

    /// 子命令
    #[command(subcommand)]
    command: Commands,
}

/// 规则来源参数，三选一；都不指定时克隆默认仓库
#[derive(Args)]
struct SourceArgs {
    /// 本地规则目录
    #[arg(long, env = "SSTAP_RULES_DIR", conflicts_with_all = ["git", "github"])]
    dir: Option<PathBuf>,

    /// git 仓库地址（浅克隆到临时目录）
    #[arg(long, env = "SSTAP_RULES_GIT", conflicts_with = "github")]
    git: Option<String>,

    /// GitHub 仓库 owner/repo（通过 contents API 下载）
    #[arg(long, env = "SSTAP_RULES_GITHUB")]
    github: Option<String>,

    /// 仓库中规则文件所在的子目录
    #[arg(long, default_value = DEFAULT_SUBDIR)]
    subdir: String,
}

impl SourceArgs {
    fn kind(&self) -> SourceKind {
        if let Some(ref dir) = self.dir {
            SourceKind::Dir(dir.clone())
        } else if let Some(ref url) = self.git {
            SourceKind::Git(url.clone())
        } else if let Some(ref repo) = self.github {
            SourceKind::GitHub(repo.clone())
        } else {
            SourceKind::Git(DEFAULT_GIT_URL.to_string())
        }
    }
}

/// 支持的子命令
#[derive(Subcommand)]
enum Commands {
    /// 列出所有规则
    List {
        /// 输出格式
        #[arg(long, value_enum, default_value_t = ListFormat::Table)]
        format: ListFormat,
    },
    /// 显示单条规则的聚合结果
    Show {
        /// 规则索引
        index: usize,

        /// JSON 格式输出
        #[arg(long)]
        json: bool,
    },
    /// 合并多条规则并写出 <name>.rules
    Combine {
        /// 逗号分隔的索引列表，如 "0,3,5"；省略时交互输入
        indices: Option<String>,

        /// 输出目录
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// 输出到标准输出，不写文件
        #[arg(long)]
        stdout: bool,
    },
}

// ========================================
// 主函数
// ========================================

fn main() {
    // 解析命令行参数
    let cli = Cli::parse();

    // 初始化日志，RUST_LOG 优先
    let level = if cli.debug { "debug" } else { "info" };
    env_logger::init_from_env(Env::default().default_filter_or(level));

    // 处理错误
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // 来源持有的临时目录在本函数返回时释放
    let source = source::open_source(cli.source.kind(), &cli.source.subdir)?;
    let rules = RuleSet::load(source.as_ref())?;
    if rules.is_empty() {
        warn!("No rule files found in {}", source.describe());
    }

    match cli.command {
        Commands::List { format } => run_list(&rules, format),
        Commands::Show { index, json } => run_show(&rules, index, json),
        Commands::Combine {
            indices,
            out_dir,
            stdout,
        } => run_combine(&rules, indices, &out_dir, stdout),
    }
}

// ========================================
// 子命令实现
// ========================================

/// 列出规则
fn run_list(rules: &RuleSet, format: ListFormat) -> Result<()> {
    let entries = rules.list()?;
    print!("{}", output::render_entries(&entries, format)?);
    if format == ListFormat::Json {
        println!();
    }
    Ok(())
}

/// 显示单条规则
fn run_show(rules: &RuleSet, index: usize, json: bool) -> Result<()> {
    let rule = rules.get(index)?;
    let addresses = rule.address_count();

    if json {
        #[derive(Serialize)]
        struct ShowOutput<'a> {
            rule: &'a Rule,
            addresses: AddressCount,
        }

        let json = serde_json::to_string_pretty(&ShowOutput {
            rule: &rule,
            addresses,
        })?;
        println!("{}", json);
    } else {
        println!("{}", rule);
        info!(
            "{} prefixes, {} IPv4 addresses, {} IPv6 addresses",
            rule.prefixes().len(),
            addresses.ipv4,
            addresses.ipv6
        );
    }

    Ok(())
}

/// 合并规则
fn run_combine(
    rules: &RuleSet,
    indices: Option<String>,
    out_dir: &Path,
    stdout: bool,
) -> Result<()> {
    let raw = match indices {
        Some(raw) => raw,
        None => prompt_indices(rules)?,
    };
    let selection = parse_index_list(&raw)?;
    info!("Combining rules {:?}", selection);

    // 出错时直接返回，不会留下部分写入的文件
    let rule = rules.combine_by_indices(&selection)?;

    if stdout {
        println!("{}", rule);
    } else {
        let path = output::write_rule(out_dir, &rule)?;
        println!(
            "Wrote {} ({} prefixes)",
            path.display(),
            rule.prefixes().len()
        );
    }

    Ok(())
}

/// 打印规则列表并从标准输入读取索引
fn prompt_indices(rules: &RuleSet) -> Result<String> {
    let entries = rules.list()?;
    for entry in &entries {
        println!("{}: {}", entry.index, entry.friendly_name);
    }

    print!("Index List: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read index list from stdin")?;
    Ok(line)
}
