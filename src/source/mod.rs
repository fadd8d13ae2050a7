//! Source: 从表格文件生成下载任务
//!
//! 支持 Excel/ODS 工作簿（只读第一个工作表）和逗号或制表符分隔的文本表格。
//! 第一行是表头，表头算作第 1 行，任务的行号与表格中的行号一致。

pub mod filename;
mod sheet;

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{DownloadError, Result};
use crate::core::task::DownloadTask;
use filename::{build_save_path, column_to_index, default_filename, determine_extension, join_name_parts};

/// 生成任务时的列映射和命名规则
#[derive(Debug, Clone)]
pub struct TaskSpec {
    /// 链接所在列，表头名或列号
    pub url_column: String,
    /// 文件名列，逗号分隔，按顺序拼接
    pub name_columns: String,
    pub separator: String,
    /// 为空时从链接推断
    pub extension: Option<String>,
    pub output_dir: PathBuf,
}

impl TaskSpec {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url_column: "A".to_string(),
            name_columns: "B".to_string(),
            separator: "_".to_string(),
            extension: None,
            output_dir: output_dir.into(),
        }
    }
}

/// 已读入内存的表格
#[derive(Debug, Clone)]
pub struct TableSource {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableSource {
    /// 读取表格文件
    ///
    /// `.xlsx`/`.xlsm`/`.xlsb`/`.xls`/`.ods` 读第一个工作表；
    /// 其余按文本读取，`.tsv`/`.tab` 按制表符分隔，其它按逗号分隔。
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = if sheet::is_workbook(path) {
            Self::from_records(sheet::read_first_sheet(path)?)?
        } else {
            let text = fs::read_to_string(path)
                .map_err(|e| DownloadError::Source(format!("无法读取表格文件 {}: {}", path.display(), e)))?;
            Self::parse(&text, delimiter_for(path))?
        };
        log::info!(
            "读取表格 {}: {} 列, {} 行数据",
            path.display(),
            source.headers.len(),
            source.rows.len()
        );
        Ok(source)
    }

    pub fn parse(text: &str, delimiter: char) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Self::from_records(parse_delimited(text, delimiter))
    }

    /// 第一条记录是表头，其余是数据行
    fn from_records(records: Vec<Vec<String>>) -> Result<Self> {
        let mut records = records.into_iter();
        let headers = records
            .next()
            .ok_or_else(|| DownloadError::Source("表格文件为空".to_string()))?;
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(DownloadError::Source("表头为空".to_string()));
        }
        let rows: Vec<Vec<String>> = records.collect();
        if rows.is_empty() {
            return Err(DownloadError::Source("表格没有数据行".to_string()));
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// 前 `max` 行数据，0 表示全部
    pub fn sample_rows(&self, max: usize) -> &[Vec<String>] {
        if max == 0 {
            &self.rows
        } else {
            &self.rows[..max.min(self.rows.len())]
        }
    }

    /// 先按表头名精确匹配，找不到再当作列号解析
    pub fn resolve_column(&self, column: &str) -> Option<usize> {
        let column = column.trim();
        self.headers
            .iter()
            .position(|h| h.trim() == column)
            .or_else(|| column_to_index(column))
    }

    /// 解析逗号分隔的多个列，无法识别的跳过
    pub fn resolve_columns(&self, columns: &str) -> Vec<usize> {
        columns
            .split(',')
            .filter_map(|c| self.resolve_column(c))
            .collect()
    }

    /// 为每个链接不为空的数据行生成一个任务
    pub fn tasks(&self, spec: &TaskSpec) -> Result<Vec<DownloadTask>> {
        let url_index = self
            .resolve_column(&spec.url_column)
            .ok_or_else(|| DownloadError::Source(format!("无效的URL列: {}", spec.url_column)))?;
        let name_indices = self.resolve_columns(&spec.name_columns);
        if name_indices.is_empty() {
            return Err(DownloadError::Source(format!("无效的文件名列: {}", spec.name_columns)));
        }

        let mut tasks = Vec::new();
        let mut unnamed = 0usize;
        for (i, row) in self.rows.iter().enumerate() {
            let url = row.get(url_index).map(|u| u.trim()).unwrap_or_default();
            if url.is_empty() {
                continue;
            }

            let parts = name_indices
                .iter()
                .map(|&idx| row.get(idx).map(String::as_str).unwrap_or_default());
            let filename = join_name_parts(parts, &spec.separator).unwrap_or_else(|| {
                unnamed += 1;
                default_filename(unnamed)
            });
            let ext = determine_extension(spec.extension.as_deref(), url);
            let save_path = build_save_path(&spec.output_dir, &filename, &ext);

            // 表头是第 1 行
            tasks.push(DownloadTask::new(url, filename, save_path, ext, i + 2));
        }

        if tasks.is_empty() {
            return Err(DownloadError::NoTasks);
        }
        log::info!("生成 {} 个下载任务", tasks.len());
        Ok(tasks)
    }
}

fn delimiter_for(path: &Path) -> char {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase) {
        Some(ext) if ext == "tsv" || ext == "tab" => '\t',
        _ => ',',
    }
}

/// 按行和分隔符切分，支持双引号包裹的字段和 `""` 转义
fn parse_delimited(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                c => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const TABLE: &str = "\
链接,编号,名称
https://example.com/a.pdf,001,报告
,002,空链接
https://example.com/b?x=1,003,
https://example.com/c.JPG,,
";

    #[test]
    fn test_parse_quoted_fields() {
        let records = parse_delimited("a,\"b,c\",\"say \"\"hi\"\"\"\r\n\"multi\nline\",x\n", ',');
        assert_eq!(
            records,
            vec![
                vec!["a".to_string(), "b,c".to_string(), "say \"hi\"".to_string()],
                vec!["multi\nline".to_string(), "x".to_string()],
            ]
        );
    }

    #[test]
    fn test_open_rejects_bad_tables() {
        assert!(matches!(TableSource::parse("", ','), Err(DownloadError::Source(_))));
        assert!(matches!(TableSource::parse(",,\n", ','), Err(DownloadError::Source(_))));
        assert!(matches!(TableSource::parse("url,name\n", ','), Err(DownloadError::Source(_))));
        assert!(matches!(
            TableSource::open("/definitely/not/here.csv"),
            Err(DownloadError::Source(_))
        ));
    }

    #[test]
    fn test_headers_and_samples() {
        let table = TableSource::parse(TABLE, ',').unwrap();
        assert_eq!(table.headers(), &["链接", "编号", "名称"]);
        assert_eq!(table.sample_rows(2).len(), 2);
        assert_eq!(table.sample_rows(0).len(), 4);
        assert_eq!(table.sample_rows(100).len(), 4);
    }

    #[test]
    fn test_resolve_columns() {
        let table = TableSource::parse(TABLE, ',').unwrap();
        assert_eq!(table.resolve_column("链接"), Some(0));
        assert_eq!(table.resolve_column(" 名称 "), Some(2));
        assert_eq!(table.resolve_column("B"), Some(1));
        assert_eq!(table.resolve_column("不存在"), None);
        assert_eq!(table.resolve_columns("编号, C,不存在"), vec![1, 2]);
    }

    #[test]
    fn test_tasks_from_table() {
        let table = TableSource::parse(TABLE, ',').unwrap();
        let mut spec = TaskSpec::new("/out");
        spec.url_column = "链接".to_string();
        spec.name_columns = "编号,名称".to_string();
        let tasks = table.tasks(&spec).unwrap();

        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].row_index(), 2);
        assert_eq!(tasks[0].filename(), "001_报告");
        assert_eq!(tasks[0].save_path(), Path::new("/out/001_报告.pdf"));

        assert_eq!(tasks[1].row_index(), 4);
        assert_eq!(tasks[1].filename(), "003");
        assert_eq!(tasks[1].file_type(), "bin");

        assert_eq!(tasks[2].row_index(), 5);
        assert!(tasks[2].filename().starts_with("file_"));
        assert_eq!(tasks[2].file_type(), "jpg");
    }

    #[test]
    fn test_configured_extension_and_separator() {
        let table = TableSource::parse(TABLE, ',').unwrap();
        let mut spec = TaskSpec::new("/out");
        spec.name_columns = "B,C".to_string();
        spec.separator = "-".to_string();
        spec.extension = Some(".png".to_string());
        let tasks = table.tasks(&spec).unwrap();
        assert_eq!(tasks[0].save_path(), Path::new("/out/001-报告.png"));
    }

    #[test]
    fn test_invalid_columns_and_no_tasks() {
        let table = TableSource::parse(TABLE, ',').unwrap();
        let mut spec = TaskSpec::new("/out");
        spec.url_column = "不存在".to_string();
        assert!(matches!(table.tasks(&spec), Err(DownloadError::Source(_))));

        let mut spec = TaskSpec::new("/out");
        spec.name_columns = "不存在,也没有".to_string();
        assert!(matches!(table.tasks(&spec), Err(DownloadError::Source(_))));

        let empty = TableSource::parse("url,name\n,a\n  ,b\n", ',').unwrap();
        assert!(matches!(empty.tasks(&TaskSpec::new("/out")), Err(DownloadError::NoTasks)));
    }

    #[test]
    fn test_open_workbook_first_sheet() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/links.xlsx");
        let table = TableSource::open(&path).unwrap();
        assert_eq!(table.headers(), &["链接", "编号", "名称"]);
        assert_eq!(table.sample_rows(0).len(), 3);
        // 数字单元格按整数输出，空单元格为空串
        assert_eq!(table.sample_rows(1)[0], vec!["https://example.com/a.pdf", "1", "报告"]);
        assert_eq!(table.sample_rows(0)[1][0], "");

        let mut spec = TaskSpec::new("/out");
        spec.url_column = "链接".to_string();
        spec.name_columns = "编号,名称".to_string();
        let tasks = table.tasks(&spec).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].row_index(), 2);
        assert_eq!(tasks[0].save_path(), Path::new("/out/1_报告.pdf"));
        assert_eq!(tasks[1].row_index(), 4);
        assert_eq!(tasks[1].filename(), "3");
        assert_eq!(tasks[1].file_type(), "jpg");
        // 第二个工作表不参与
        assert!(tasks.iter().all(|t| !t.url().contains("other.zip")));
    }

    #[test]
    fn test_open_unreadable_workbook() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        fs::write(&path, "url,name\nhttps://example.com/a.zip,a\n").unwrap();
        assert!(matches!(TableSource::open(&path), Err(DownloadError::Source(_))));
    }

    #[test]
    fn test_open_tsv_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("links.tsv");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "\u{feff}url\tname\nhttps://example.com/x.zip\tx,y\n").unwrap();

        let table = TableSource::open(&path).unwrap();
        assert_eq!(table.headers(), &["url", "name"]);
        let tasks = table.tasks(&TaskSpec::new(dir.path())).unwrap();
        assert_eq!(tasks[0].filename(), "x,y");
        assert_eq!(tasks[0].file_type(), "zip");
    }
}
