//! 文件名和保存路径的生成规则

use chrono::Local;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// 文件名最长保留的字符数
pub const MAX_FILENAME_CHARS: usize = 200;

/// 没有可用扩展名时使用
pub const DEFAULT_EXTENSION: &str = "bin";

static ILLEGAL_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("illegal chars pattern"));
static COLUMN_LETTERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{1,3}$").expect("column letters pattern"));

/// 替换非法字符，去掉首尾空格和点，截断到 200 个字符
pub fn clean_filename(name: &str) -> String {
    let replaced = ILLEGAL_CHARS_RE.replace_all(name, "_");
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    trimmed.chars().take(MAX_FILENAME_CHARS).collect()
}

/// 把多列的值拼成文件名，空值和清理后为空的值跳过
///
/// 全部为空时返回 None，由调用方生成默认名。
pub fn join_name_parts<'a, I>(parts: I, separator: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let cleaned: Vec<String> = parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(clean_filename)
        .filter(|part| !part.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join(separator))
    }
}

/// `file_<时间戳>_<序号>`
pub fn default_filename(seq: usize) -> String {
    format!("file_{}_{}", Local::now().format("%Y%m%d_%H%M%S"), seq)
}

/// 优先使用配置的扩展名，其次从链接推断，最后退回 `bin`
pub fn determine_extension(configured: Option<&str>, url: &str) -> String {
    if let Some(ext) = configured.map(|e| e.trim().trim_start_matches('.')) {
        if !ext.is_empty() {
            return ext.to_string();
        }
    }

    let Some((_, last)) = url.rsplit_once('.') else {
        return DEFAULT_EXTENSION.to_string();
    };
    let ext = last
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    if !ext.is_empty() && ext.chars().count() <= 6 && ext.chars().all(char::is_alphanumeric) {
        ext
    } else {
        DEFAULT_EXTENSION.to_string()
    }
}

/// 文件名里没有点时才追加扩展名
pub fn build_save_path(output_dir: &Path, filename: &str, extension: &str) -> PathBuf {
    if filename.contains('.') || extension.is_empty() {
        output_dir.join(filename)
    } else {
        output_dir.join(format!("{}.{}", filename, extension))
    }
}

/// 表格列号转为从 0 开始的下标：A=0, Z=25, AA=26
pub fn column_to_index(column: &str) -> Option<usize> {
    let column = column.trim();
    if !COLUMN_LETTERS_RE.is_match(column) {
        return None;
    }
    let index = column
        .to_ascii_uppercase()
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A') as usize + 1);
    Some(index - 1)
}

/// 下标转回列号：0=A, 26=AA
pub fn index_to_column(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}
