//! # 规则数据模型
//!
//! 一条规则 = 头部元数据 + 聚合后的网段列表。
//!
//! ## 文件格式
//! ```text
//! #name,friendly_name,proxy_type,proxy_type_2,flag_a,flag_b,writable,dns_mode,comment
//! 1.0.1.0/24
//! 1.0.2.0/23
//! 2001:db8::/32
//! ```
//!
//! 头部的 `#` 可选，字段之间不支持转义逗号。
//! 代理类型、DNS 模式等字段不做解释，原样保存为 [`Token`]。

use std::fmt;
use std::net::IpAddr;
use std::ops::BitAnd;
use std::str::FromStr;

use ipnet::IpNet;
use log::{debug, warn};
use serde::Serialize;

use super::cidr::{self, AddressCount};
use crate::error::{Result, RuleError};

/// 头部字段数量
pub const HEADER_FIELDS: usize = 9;

/// 合并规则时名称之间的连接符
pub const JOINER: &str = " && ";

// ========================================
// 不透明字段
// ========================================

/// 不解释含义的头部字段（代理类型、标志位、DNS 模式等）
///
/// 保存去掉首尾空白后的原始文本，保证序列化时逐字还原。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Token(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::new(value)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ========================================
// 规则
// ========================================

/// 单条分流规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    /// 短标识
    pub name: String,
    /// 显示名称
    pub friendly_name: String,
    pub proxy_type: Token,
    pub proxy_type_2: Token,
    pub flag_a: Token,
    pub flag_b: Token,
    pub writable: Token,
    pub dns_mode: Token,
    /// 备注
    pub comment: String,
    /// 聚合后的网段，只能通过 [`Rule::set_prefixes`] 修改
    prefixes: Vec<IpNet>,
}

impl Default for Rule {
    /// 新建规则的默认元数据，合并出的规则也使用这组值
    fn default() -> Self {
        Self {
            name: String::new(),
            friendly_name: String::new(),
            proxy_type: Token::from("0"),
            proxy_type_2: Token::from("0"),
            flag_a: Token::from("1"),
            flag_b: Token::from("0"),
            writable: Token::from("1"),
            dns_mode: Token::from("0"),
            comment: String::new(),
            prefixes: Vec::new(),
        }
    }
}

impl Rule {
    /// 从规则文件文本解析
    ///
    /// ## 规则
    /// - 第一行是头部，去掉一个开头的 `#` 后按逗号切分，至少 9 个字段
    /// - 之后每行一个地址或 CIDR，无法解析的行直接丢弃
    /// - 网段在解析后立即聚合
    ///
    /// ## 错误
    /// 头部字段不足 9 个时返回 [`RuleError::MalformedHeader`]
    pub fn parse(text: &str) -> Result<Rule> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut lines = text.lines();

        let header_line = lines.next().unwrap_or_default();
        let header = header_line.strip_prefix('#').unwrap_or(header_line);
        let fields: Vec<&str> = header.split(',').map(str::trim).collect();

        if fields.len() < HEADER_FIELDS {
            return Err(RuleError::MalformedHeader {
                fields: fields.len(),
                line: header_line.to_string(),
            });
        }
        if fields.len() > HEADER_FIELDS {
            warn!(
                "Rule header has {} fields, ignoring everything after the ninth: {}",
                fields.len(),
                header_line
            );
        }

        let mut rule = Rule {
            name: fields[0].to_string(),
            friendly_name: fields[1].to_string(),
            proxy_type: Token::from(fields[2]),
            proxy_type_2: Token::from(fields[3]),
            flag_a: Token::from(fields[4]),
            flag_b: Token::from(fields[5]),
            writable: Token::from(fields[6]),
            dns_mode: Token::from(fields[7]),
            comment: fields[8].to_string(),
            prefixes: Vec::new(),
        };
        rule.set_prefixes(lines.filter_map(parse_prefix_line));

        debug!(
            "Parsed rule '{}' with {} prefixes",
            rule.name,
            rule.prefixes.len()
        );
        Ok(rule)
    }

    /// 序列化为规则文件文本（[`Rule::parse`] 的逆操作）
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// 合并两条规则
    ///
    /// 名称、显示名称、备注用 ` && ` 拼接，其余元数据保持默认值；
    /// 网段取并集后重新聚合。两条输入规则都不会被修改。
    pub fn combine(&self, other: &Rule) -> Rule {
        Rule {
            name: format!("{}{}{}", self.name, JOINER, other.name),
            friendly_name: format!("{}{}{}", self.friendly_name, JOINER, other.friendly_name),
            comment: format!("{}{}{}", self.comment, JOINER, other.comment),
            prefixes: cidr::aggregate(self.prefixes.iter().chain(&other.prefixes).copied()),
            ..Rule::default()
        }
    }

    /// 聚合后的网段（IPv4 在前，各自按地址升序）
    pub fn prefixes(&self) -> &[IpNet] {
        &self.prefixes
    }

    /// 替换网段列表，输入会先聚合
    pub fn set_prefixes<I>(&mut self, prefixes: I)
    where
        I: IntoIterator<Item = IpNet>,
    {
        self.prefixes = cidr::aggregate(prefixes);
    }

    /// 覆盖的地址数量
    pub fn address_count(&self) -> AddressCount {
        cidr::count_addresses(&self.prefixes)
    }
}

/// 解析正文中的一行，支持 `addr` 与 `addr/len` 两种写法
///
/// 主机位不为 0 的网段（如 10.0.0.1/24）会被截断为网络地址。
fn parse_prefix_line(line: &str) -> Option<IpNet> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let parsed = line
        .parse::<IpNet>()
        .map(|net| net.trunc())
        .or_else(|_| line.parse::<IpAddr>().map(IpNet::from));

    match parsed {
        Ok(net) => Some(net),
        Err(_) => {
            debug!("Skipping unparseable rule line: {:?}", line);
            None
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "#{},{},{},{},{},{},{},{},{}",
            self.name,
            self.friendly_name,
            self.proxy_type,
            self.proxy_type_2,
            self.flag_a,
            self.flag_b,
            self.writable,
            self.dns_mode,
            self.comment
        )?;

        for (i, net) in self.prefixes.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", net)?;
        }
        Ok(())
    }
}

impl FromStr for Rule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self> {
        Rule::parse(s)
    }
}

impl BitAnd<&Rule> for &Rule {
    type Output = Rule;

    fn bitand(self, rhs: &Rule) -> Rule {
        self.combine(rhs)
    }
}
