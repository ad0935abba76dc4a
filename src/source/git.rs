//! # git 仓库来源
//!
//! 通过 `git clone --depth 1` 把仓库克隆到临时目录，再按本地目录读取。
//! 临时目录随 [`GitRepo`] 一起释放，任何退出路径都会清理。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use log::{info, warn};
use tempfile::TempDir;

use super::{LocalDir, RuleFile, RuleSource};

/// 克隆到临时目录的 git 仓库
pub struct GitRepo {
    url: String,
    rules_dir: PathBuf,
    /// drop 时删除
    checkout: TempDir,
}

impl GitRepo {
    /// 克隆仓库
    ///
    /// 需要系统中有 `git` 可执行文件。
    pub fn clone_shallow(url: &str, subdir: &str) -> Result<Self> {
        let checkout = tempfile::Builder::new()
            .prefix("sstap-rules-")
            .tempdir()
            .context("Failed to create temp dir for git clone")?;

        info!("Cloning {} into {}", url, checkout.path().display());

        let output = Command::new("git")
            .args(["clone", "--depth", "1", "--quiet", url])
            .arg(checkout.path())
            .output()
            .context("Failed to run git (is it installed?)")?;

        if !output.status.success() {
            anyhow::bail!(
                "git clone {} failed: {}",
                url,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let rules_dir = checkout.path().join(subdir);
        Ok(Self {
            url: url.to_string(),
            rules_dir,
            checkout,
        })
    }
}

impl RuleSource for GitRepo {
    fn describe(&self) -> String {
        format!("{} ({})", self.url, self.rules_dir.display())
    }

    fn files(&self) -> Result<Vec<RuleFile>> {
        LocalDir::new(&self.rules_dir).files()
    }
}

impl Drop for GitRepo {
    fn drop(&mut self) {
        // Windows 上 .git/objects 是只读文件，删除前先去掉只读位
        if cfg!(windows) {
            if let Err(e) = clear_readonly(self.checkout.path()) {
                warn!(
                    "Failed to clear read-only bits under {}: {}",
                    self.checkout.path().display(),
                    e
                );
            }
        }
    }
}

/// 递归清除目录下文件的只读位
#[allow(clippy::permissions_set_readonly_false)]
fn clear_readonly(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            clear_readonly(&entry.path())?;
        } else if file_type.is_file() {
            let mut perms = entry.metadata()?.permissions();
            if perms.readonly() {
                perms.set_readonly(false);
                fs::set_permissions(entry.path(), perms)?;
            }
        }
    }
    Ok(())
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-repo");

        // git 不存在或仓库不存在都应返回错误，而不是 panic
        let result = GitRepo::clone_shallow(&missing.to_string_lossy(), "rules");
        assert!(result.is_err());
    }

    #[test]
    fn test_clear_readonly() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("objects").join("ab");
        fs::create_dir_all(&nested).unwrap();
        let file = nested.join("cdef");
        fs::write(&file, "x").unwrap();

        let mut perms = fs::metadata(&file).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&file, perms).unwrap();

        clear_readonly(dir.path()).unwrap();
        assert!(!fs::metadata(&file).unwrap().permissions().readonly());
    }
}
