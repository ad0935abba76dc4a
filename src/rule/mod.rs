//! # 规则模块
//!
//! 此模块负责：
//! 1. 解析 / 序列化 SSTap 风格的规则文件（头部元数据 + 网段列表）
//! 2. 聚合网段为最小的 CIDR 集合
//! 3. 管理规则集合并按索引合并多条规则

pub mod cidr;
mod model;
mod set;

pub use cidr::AddressCount;
pub use model::Rule;
pub use set::{parse_index_list, RuleEntry, RuleSet};
