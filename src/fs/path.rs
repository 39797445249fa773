//! '/' 分隔的绝对路径。

use crate::fs::{
    config::FILE_NAME_MAX_LEN,
    error::{FileSystemError, Result},
};

/// 取出路径的第一段（去掉前导 '/'），段的长度即返回值的 `len()`。
///
/// ```text
/// "/a/b/c" -> "a"
/// "/c"     -> "c"
/// ```
pub fn path_head(path: &str) -> Result<&str> {
    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| FileSystemError::InvalidPath(path.to_string()))?;
    let head = rest.split('/').next().unwrap_or_default();
    if head.is_empty() || head.len() > FILE_NAME_MAX_LEN {
        return Err(FileSystemError::InvalidPath(path.to_string()));
    }
    Ok(head)
}

/// 去掉第一段后剩下的路径（仍以 '/' 开头）；第一段已是最后一段时返回 `None`
pub fn path_rest<'a>(path: &'a str, head: &str) -> Option<&'a str> {
    let rest = &path[1 + head.len()..];
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// 检查整条路径：必须以 '/' 开头，每段非空且不超过 `FILE_NAME_MAX_LEN`。
/// 根目录 "/" 本身是合法的。
pub fn validate(path: &str) -> Result<()> {
    if path == "/" {
        return Ok(());
    }
    let mut rest = path;
    loop {
        let head = path_head(rest).map_err(|_| FileSystemError::InvalidPath(path.to_string()))?;
        match path_rest(rest, head) {
            Some(next) => rest = next,
            None => return Ok(()),
        }
    }
}

/// 拼接父目录与名字
pub fn join(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}
