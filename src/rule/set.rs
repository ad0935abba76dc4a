//! # 规则集合
//!
//! 持有一组规则文件（文件名 + 原始文本），按索引解析、列出和合并。
//! 规则不常驻内存，每次访问时从原始文本重新解析。

use anyhow::Context;
use log::{error, info};
use rayon::prelude::*;
use serde::Serialize;

use super::model::Rule;
use crate::error::{Result, RuleError};
use crate::source::{RuleFile, RuleSource};

/// 列表展示用的规则条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleEntry {
    pub index: usize,
    pub name: String,
    pub friendly_name: String,
    pub file: String,
}

/// 规则文件集合，索引顺序与来源的枚举顺序一致
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    files: Vec<RuleFile>,
}

impl RuleSet {
    pub fn new(files: Vec<RuleFile>) -> Self {
        Self { files }
    }

    /// 从规则来源加载全部文件
    pub fn load(source: &dyn RuleSource) -> anyhow::Result<Self> {
        let files = source
            .files()
            .with_context(|| format!("Failed to load rule files from {}", source.describe()))?;
        info!("Loaded {} rule files from {}", files.len(), source.describe());
        Ok(Self::new(files))
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// 解析指定索引的规则
    pub fn get(&self, index: usize) -> Result<Rule> {
        let file = self.files.get(index).ok_or(RuleError::IndexOutOfRange {
            index,
            len: self.files.len(),
        })?;

        Rule::parse(&file.content).inspect_err(|e| {
            error!("Failed to parse rule file '{}': {}", file.name, e);
        })
    }

    /// 列出全部规则（并行解析）
    pub fn list(&self) -> Result<Vec<RuleEntry>> {
        (0..self.files.len())
            .into_par_iter()
            .map(|index| -> Result<RuleEntry> {
                let rule = self.get(index)?;
                Ok(RuleEntry {
                    index,
                    name: rule.name,
                    friendly_name: rule.friendly_name,
                    file: self.files[index].name.clone(),
                })
            })
            .collect()
    }

    /// 按索引顺序左折叠合并规则
    ///
    /// ## 错误
    /// - 索引列表为空: [`RuleError::EmptySelection`]
    /// - 任一索引越界: [`RuleError::IndexOutOfRange`]（在解析任何文件之前检查）
    pub fn combine_by_indices(&self, indices: &[usize]) -> Result<Rule> {
        if indices.is_empty() {
            return Err(RuleError::EmptySelection);
        }
        if let Some(&index) = indices.iter().find(|&&i| i >= self.files.len()) {
            return Err(RuleError::IndexOutOfRange {
                index,
                len: self.files.len(),
            });
        }

        // 解析可以并行，合并必须按给定顺序串行进行
        let rules: Vec<Rule> = indices.par_iter().map(|&i| self.get(i)).collect::<Result<_>>()?;

        rules
            .into_iter()
            .reduce(|acc, rule| acc.combine(&rule))
            .ok_or(RuleError::EmptySelection)
    }
}

/// 解析逗号分隔的索引列表，如 "0, 3,5"
///
/// 空项会被忽略，负数或非数字返回 [`RuleError::InvalidIndex`]。
pub fn parse_index_list(raw: &str) -> Result<Vec<usize>> {
    let indices = raw
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.parse::<usize>().map_err(|_| RuleError::InvalidIndex {
                raw: token.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if indices.is_empty() {
        return Err(RuleError::EmptySelection);
    }
    Ok(indices)
}
