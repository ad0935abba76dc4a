//! # 规则来源
//!
//! 提供规则文件的外部协作方：本地目录、git 仓库、GitHub API。
//! 核心只消费已经读入内存的 (文件名, 文本) 列表，不关心来源。

pub mod git;
pub mod github;
pub mod local;

use std::path::PathBuf;

use anyhow::Result;

pub use git::GitRepo;
pub use github::GitHubRepo;
pub use local::LocalDir;

/// 默认规则仓库
pub const DEFAULT_GIT_URL: &str = "https://github.com/FQrabbit/SSTap-Rule.git";

/// 仓库中规则文件所在的子目录
pub const DEFAULT_SUBDIR: &str = "rules";

/// 单个规则文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFile {
    /// 文件名（不含目录）
    pub name: String,
    /// 完整文本
    pub content: String,
}

/// 规则来源 trait
pub trait RuleSource {
    /// 用于日志和错误信息的描述
    fn describe(&self) -> String;

    /// 枚举全部规则文件，顺序由来源决定
    fn files(&self) -> Result<Vec<RuleFile>>;
}

/// 规则来源选择
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// 本地目录
    Dir(PathBuf),
    /// git 仓库 URL（克隆到临时目录）
    Git(String),
    /// GitHub 仓库 "owner/repo"
    GitHub(String),
}

/// 根据来源类型打开规则来源
///
/// 返回的对象持有的资源（如临时目录）在 drop 时释放。
pub fn open_source(kind: SourceKind, subdir: &str) -> Result<Box<dyn RuleSource>> {
    match kind {
        SourceKind::Dir(path) => Ok(Box::new(LocalDir::new(path))),
        SourceKind::Git(url) => Ok(Box::new(GitRepo::clone_shallow(&url, subdir)?)),
        SourceKind::GitHub(repo) => Ok(Box::new(GitHubRepo::new(&repo, subdir)?)),
    }
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_local_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rules"), "#a,A,0,0,1,0,1,0,x\n").unwrap();

        let source = open_source(SourceKind::Dir(dir.path().to_path_buf()), DEFAULT_SUBDIR).unwrap();
        let files = source.files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.rules");
    }
}
