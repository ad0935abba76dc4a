//! # 本地目录来源
//!
//! 读取目录下的所有普通文件（不递归），隐藏文件跳过。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::debug;

use super::{RuleFile, RuleSource};
use crate::error::RuleError;

/// 本地规则目录
#[derive(Debug, Clone)]
pub struct LocalDir {
    path: PathBuf,
}

impl LocalDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RuleSource for LocalDir {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn files(&self) -> Result<Vec<RuleFile>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path).map_err(io_error(&self.path))? {
            let entry = entry.map_err(io_error(&self.path))?;
            let path = entry.path();

            if !entry.file_type().map_err(io_error(&path))?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                debug!("Skipping hidden file {}", path.display());
                continue;
            }

            // 非 UTF-8 字节替换为 U+FFFD，不中断读取
            let bytes = fs::read(&path).map_err(io_error(&path))?;
            let content = String::from_utf8_lossy(&bytes).into_owned();
            files.push(RuleFile { name, content });
        }

        Ok(files)
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> RuleError + '_ {
    move |source| RuleError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_regular_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("steam.rules"), "#steam,Steam,0,0,1,0,1,0,x\n").unwrap();
        fs::write(dir.path().join(".gitkeep"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("inner.rules"), "#i,I,0,0,1,0,1,0,x\n").unwrap();

        let files = LocalDir::new(dir.path()).files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "steam.rules");
        assert!(files[0].content.starts_with("#steam"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.rules"), b"#a,\xff,0,0,1,0,1,0,x\n").unwrap();

        let files = LocalDir::new(dir.path()).files().unwrap();
        assert_eq!(files[0].content, "#a,\u{fffd},0,0,1,0,1,0,x\n");
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let err = LocalDir::new(&missing).files().unwrap_err();
        match err.downcast_ref::<RuleError>() {
            Some(RuleError::Io { path, .. }) => assert_eq!(path, &missing),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
