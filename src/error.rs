//! # 错误类型
//!
//! 规则解析与合并过程中可能出现的错误。
//! CLI 层统一用 anyhow 包装，这里保留具体类型方便调用方匹配。

use std::path::PathBuf;

use thiserror::Error;

/// 规则核心错误
#[derive(Debug, Error)]
pub enum RuleError {
    /// 头部行字段数不足 9 个
    #[error("malformed rule header: expected 9 comma-separated fields, found {fields} in {line:?}")]
    MalformedHeader { fields: usize, line: String },

    /// 选择的索引超出规则数量
    #[error("rule index {index} is out of range (0..{len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// 没有选择任何规则
    #[error("no rule index selected")]
    EmptySelection,

    /// 索引列表中有无法解析为整数的项
    #[error("invalid rule index {raw:?}")]
    InvalidIndex { raw: String },

    /// 读取规则文件失败
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, RuleError>;
