//! 工作簿读取：只读第一个工作表

use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;

use crate::core::error::{DownloadError, Result};

/// 按工作簿读取的扩展名
const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)))
}

/// 读出第一个工作表的所有行，行列都从 A1 算起
pub fn read_first_sheet(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| DownloadError::Source(format!("无法打开工作簿 {}: {}", path.display(), e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DownloadError::Source(format!("工作簿没有工作表: {}", path.display())))?
        .map_err(|e| DownloadError::Source(format!("无法读取工作表 {}: {}", path.display(), e)))?;
    Ok(range_records(&range))
}

/// 已用区域不从 A1 开始时补齐前面的空行和空列，保证行号、列号与表格一致
fn range_records(range: &Range<Data>) -> Vec<Vec<String>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let mut records = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut record = vec![String::new(); start_col as usize];
        record.extend(row.iter().map(cell_text));
        records.push(record);
    }
    records
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        // 整数不带小数点：1.0 -> "1"
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}
