//! # 输出
//!
//! 规则列表的多种渲染方式，以及合并结果的写出。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::rule::{Rule, RuleEntry};

/// 规则列表的输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ListFormat {
    /// 对齐的文本表格
    #[default]
    Table,
    /// JSON 数组
    Json,
    /// CSV（带表头）
    Csv,
}

/// 按指定格式渲染规则列表
pub fn render_entries(entries: &[RuleEntry], format: ListFormat) -> Result<String> {
    match format {
        ListFormat::Table => Ok(render_table(entries)),
        ListFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
        ListFormat::Csv => render_csv(entries),
    }
}

fn render_table(entries: &[RuleEntry]) -> String {
    let mut out = format!("{:<6}\t{:<30}\t{}\n", "INDEX", "NAME", "FILE");
    for entry in entries {
        out.push_str(&format!(
            "{:<6}\t{:<30}\t{}\n",
            entry.index, entry.friendly_name, entry.file
        ));
    }
    out.push_str(&format!("\nTotal: {} rules\n", entries.len()));
    out
}

fn render_csv(entries: &[RuleEntry]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for entry in entries {
        writer.serialize(entry)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// 合并结果的文件名：`<name>.rules`
///
/// 路径分隔符替换为 `_`，避免写到输出目录之外。
pub fn output_file_name(rule: &Rule) -> String {
    let name: String = rule
        .name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}.rules", name)
}

/// 把规则写入 `<dir>/<name>.rules`，返回写入的路径
pub fn write_rule(dir: &Path, rule: &Rule) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = dir.join(output_file_name(rule));
    fs::write(&path, rule.serialize())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<RuleEntry> {
        vec![
            RuleEntry {
                index: 0,
                name: "steam".to_string(),
                friendly_name: "Steam".to_string(),
                file: "Steam.rules".to_string(),
            },
            RuleEntry {
                index: 1,
                name: "lol".to_string(),
                friendly_name: "英雄联盟, 台服".to_string(),
                file: "LoL.rules".to_string(),
            },
        ]
    }

    #[test]
    fn test_render_table() {
        let out = render_entries(&entries(), ListFormat::Table).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert!(lines[0].starts_with("INDEX"));
        assert!(lines[1].starts_with("0 "));
        assert!(lines[1].contains("Steam"));
        assert!(out.ends_with("Total: 2 rules\n"));
    }

    #[test]
    fn test_render_json() {
        let out = render_entries(&entries(), ListFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value[1]["index"], 1);
        assert_eq!(value[1]["friendly_name"], "英雄联盟, 台服");
    }

    #[test]
    fn test_render_csv_quotes_commas() {
        let out = render_entries(&entries(), ListFormat::Csv).unwrap();
        assert_eq!(
            out,
            "index,name,friendly_name,file\n0,steam,Steam,Steam.rules\n1,lol,\"英雄联盟, 台服\",LoL.rules\n"
        );
    }

    #[test]
    fn test_write_rule() {
        let dir = tempfile::tempdir().unwrap();
        let rule = Rule::parse("#a,A,0,0,1,0,1,0,x\n10.0.0.0/25\n10.0.0.128/25\n").unwrap();
        let combined = rule.combine(&Rule::parse("#b/c,B,0,0,1,0,1,0,y\n").unwrap());

        let path = write_rule(&dir.path().join("out"), &combined).unwrap();
        assert_eq!(path.file_name().unwrap(), "a && b_c.rules");
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "#a && b/c,A && B,0,0,1,0,1,0,x && y\n10.0.0.0/24"
        );
    }
}
