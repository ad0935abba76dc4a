//! # GitHub API 来源
//!
//! 不依赖 git，直接通过 contents API 列出规则目录并逐个下载文件。
//!
//! ```text
//! GET https://api.github.com/repos/{owner}/{repo}/contents/{subdir}
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use rayon::prelude::*;
use reqwest::blocking::Client;
use serde::Deserialize;

use super::{RuleFile, RuleSource};

const API_BASE: &str = "https://api.github.com";

/// GitHub API 要求请求带 User-Agent
const USER_AGENT: &str = concat!("sstap-rules/", env!("CARGO_PKG_VERSION"));

/// contents API 返回的目录条目
#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    download_url: Option<String>,
}

/// GitHub 上的规则仓库
pub struct GitHubRepo {
    /// "owner/repo"
    repo: String,
    subdir: String,
    client: Client,
}

impl GitHubRepo {
    pub fn new(repo: &str, subdir: &str) -> Result<Self> {
        let parts: Vec<&str> = repo.split('/').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
            anyhow::bail!("GitHub repository must look like owner/repo, got {:?}", repo);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            repo: repo.to_string(),
            subdir: subdir.trim_matches('/').to_string(),
            client,
        })
    }

    fn contents_url(&self) -> String {
        format!("{}/repos/{}/contents/{}", API_BASE, self.repo, self.subdir)
    }

    fn download(&self, name: String, url: &str) -> Result<RuleFile> {
        debug!("Downloading {}", url);
        let content = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .with_context(|| format!("Failed to download {}", url))?;
        Ok(RuleFile { name, content })
    }
}

/// 过滤出可下载的普通文件，返回 (文件名, 下载地址)
fn downloadable(entries: Vec<ContentEntry>) -> Vec<(String, String)> {
    entries
        .into_iter()
        .filter(|e| e.kind == "file" && !e.name.starts_with('.'))
        .filter_map(|e| e.download_url.map(|url| (e.name, url)))
        .collect()
}

impl RuleSource for GitHubRepo {
    fn describe(&self) -> String {
        format!("github:{}/{}", self.repo, self.subdir)
    }

    fn files(&self) -> Result<Vec<RuleFile>> {
        let url = self.contents_url();
        let entries: Vec<ContentEntry> = self
            .client
            .get(&url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json())
            .with_context(|| format!("Failed to list {}", url))?;

        let targets = downloadable(entries);
        info!("Downloading {} rule files from {}", targets.len(), self.repo);

        // 并行下载，collect 保持 API 返回的顺序
        targets
            .into_par_iter()
            .map(|(name, url)| self.download(name, &url))
            .collect()
    }
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_name_validation() {
        assert!(GitHubRepo::new("FQrabbit/SSTap-Rule", "rules").is_ok());
        assert!(GitHubRepo::new("FQrabbit", "rules").is_err());
        assert!(GitHubRepo::new("a/b/c", "rules").is_err());
        assert!(GitHubRepo::new("/repo", "rules").is_err());
    }

    #[test]
    fn test_contents_url() {
        let repo = GitHubRepo::new("FQrabbit/SSTap-Rule", "/rules/").unwrap();
        assert_eq!(
            repo.contents_url(),
            "https://api.github.com/repos/FQrabbit/SSTap-Rule/contents/rules"
        );
    }

    #[test]
    fn test_downloadable_entries() {
        let json = r#"[
            {"name": "Steam.rules", "type": "file", "download_url": "https://raw.example/Steam.rules"},
            {"name": "archive", "type": "dir", "download_url": null},
            {"name": ".keep", "type": "file", "download_url": "https://raw.example/.keep"},
            {"name": "LoL.rules", "type": "file", "download_url": "https://raw.example/LoL.rules"}
        ]"#;
        let entries: Vec<ContentEntry> = serde_json::from_str(json).unwrap();

        assert_eq!(
            downloadable(entries),
            vec![
                ("Steam.rules".to_string(), "https://raw.example/Steam.rules".to_string()),
                ("LoL.rules".to_string(), "https://raw.example/LoL.rules".to_string()),
            ]
        );
    }
}
