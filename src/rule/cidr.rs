//! # CIDR 聚合
//!
//! 把任意一组网段合并成覆盖相同地址空间的最小网段集合。
//!
//! ## 算法
//! 1. 每个网段转换为数值闭区间 `[first, last]`（IPv4 / IPv6 都用 u128 表示）
//! 2. 按 (地址族, 起始地址) 排序
//! 3. 从左到右扫描，重叠或相邻（间隔为 0）的区间合并为一个区间
//! 4. 合并后的区间不一定能用单个 CIDR 表示，再拆分成最少的对齐块
//!
//! IPv4 与 IPv6 永远不会相互合并，输出中 IPv4 在前、IPv6 在后，各自按地址升序。

use std::net::{Ipv4Addr, Ipv6Addr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

// ========================================
// 地址族与数值区间
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Family {
    V4,
    V6,
}

impl Family {
    /// 地址位宽
    fn width(self) -> u32 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }
}

/// 闭区间，`last` 是最后一个地址（避免 ::/0 的上界溢出 u128）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Span {
    family: Family,
    first: u128,
    last: u128,
}

impl From<&IpNet> for Span {
    fn from(net: &IpNet) -> Self {
        match net {
            IpNet::V4(n) => Span {
                family: Family::V4,
                first: u128::from(u32::from(n.network())),
                last: u128::from(u32::from(n.broadcast())),
            },
            IpNet::V6(n) => Span {
                family: Family::V6,
                first: u128::from(n.network()),
                last: u128::from(n.broadcast()),
            },
        }
    }
}

impl Span {
    /// `next` 与当前区间重叠或紧邻（调用方保证已排序）
    fn touches(&self, next: &Span) -> bool {
        self.family == next.family && next.first <= self.last.saturating_add(1)
    }

    /// 拆分成最少的 CIDR 块，按地址升序
    fn into_blocks(self) -> Vec<IpNet> {
        let width = self.family.width();
        let mut blocks = Vec::new();
        let mut first = self.first;

        loop {
            // 起始地址的对齐决定块的上限，剩余长度决定另一个上限
            let align = first.trailing_zeros().min(width);
            let fit = match (self.last - first).checked_add(1) {
                Some(size) => 127 - size.leading_zeros(),
                None => 128,
            };
            let host_bits = align.min(fit);
            blocks.push(to_net(self.family, first, (width - host_bits) as u8));

            // 整个 IPv6 空间
            if host_bits >= 128 {
                break;
            }
            let block_last = first + ((1u128 << host_bits) - 1);
            if block_last >= self.last {
                break;
            }
            first = block_last + 1;
        }

        blocks
    }
}

fn to_net(family: Family, addr: u128, prefix_len: u8) -> IpNet {
    let net = match family {
        Family::V4 => Ipv4Net::new(Ipv4Addr::from(addr as u32), prefix_len).map(IpNet::V4),
        Family::V6 => Ipv6Net::new(Ipv6Addr::from(addr), prefix_len).map(IpNet::V6),
    };
    // host_bits <= width，前缀长度不会越界
    net.expect("prefix length within address width")
}

// ========================================
// 公共接口
// ========================================

/// 聚合网段
///
/// 返回覆盖相同地址集合的最小、互不重叠的网段列表。
/// 重复网段去重，被包含的网段被吸收，相邻的兄弟块合并为超网。
pub fn aggregate<I>(prefixes: I) -> Vec<IpNet>
where
    I: IntoIterator<Item = IpNet>,
{
    let mut spans: Vec<Span> = prefixes.into_iter().map(|net| Span::from(&net)).collect();
    spans.sort_unstable();

    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(current) if current.touches(&span) => {
                current.last = current.last.max(span.last);
            }
            _ => merged.push(span),
        }
    }

    merged.into_iter().flat_map(Span::into_blocks).collect()
}

/// 各地址族覆盖的地址数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct AddressCount {
    pub ipv4: u64,
    /// 超过 u128 时饱和（仅 ::/0）
    pub ipv6: u128,
}

/// 统计网段覆盖的地址数量（输入应已聚合，否则重叠部分会被重复计算）
pub fn count_addresses(prefixes: &[IpNet]) -> AddressCount {
    prefixes
        .iter()
        .fold(AddressCount::default(), |mut count, net| {
            let host_bits = u32::from(net.max_prefix_len() - net.prefix_len());
            match net {
                IpNet::V4(_) => count.ipv4 += 1u64 << host_bits,
                IpNet::V6(_) => {
                    let size = 1u128.checked_shl(host_bits).unwrap_or(u128::MAX);
                    count.ipv6 = count.ipv6.saturating_add(size);
                }
            }
            count
        })
}
