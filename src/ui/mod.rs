mod progress;

use std::fmt;
use std::time::Duration;
pub use progress::ProgressManager;

use crate::core::{RunSummary, TaskReport};

pub fn print_success(message: &str) {
    println!("✓ {}", message);
}

pub fn print_error(message: &str) {
    println!("✗ {}", message);
}

/// 运行结束后打印的摘要
pub struct DownloadSummary {
    pub total_files: usize,
    pub total_size: u64,
    pub elapsed_time: Duration,
    pub success_count: usize,
    pub failed_count: usize,
    pub invalid_links: usize,
    pub cancelled: bool,
}

impl DownloadSummary {
    /// `total_size` 由调用方累计成功文件的大小
    pub fn from_run(summary: &RunSummary, total_size: u64) -> Self {
        Self {
            total_files: summary.total,
            total_size,
            elapsed_time: summary.elapsed,
            success_count: summary.success,
            failed_count: summary.failed,
            invalid_links: summary.invalid_links,
            cancelled: summary.cancelled,
        }
    }
}

impl fmt::Display for DownloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n下载摘要:")?;
        if self.cancelled {
            writeln!(f, "状态: 已取消")?;
        }
        writeln!(f, "总文件数: {}", self.total_files)?;
        writeln!(f, "总大小: {}", format_size(self.total_size))?;
        writeln!(f, "耗时: {:.2}秒", self.elapsed_time.as_secs_f64())?;
        writeln!(f, "成功: {}", self.success_count)?;
        writeln!(f, "失败: {}", self.failed_count)?;
        writeln!(f, "空链接: {}", self.invalid_links)?;
        Ok(())
    }
}

/// 失败任务的一行说明，带表格行号方便回查
pub fn failure_line(report: &TaskReport) -> String {
    format!(
        "第 {} 行 {}: {}",
        report.row_index,
        report.filename,
        report.error.as_deref().unwrap_or("未知错误")
    )
}

pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024 * 1024), "5120.00 GB");
    }

    #[test]
    fn test_summary_display() {
        let run = RunSummary {
            run_id: Uuid::nil(),
            total: 5,
            completed: 2,
            success: 1,
            failed: 1,
            invalid_links: 1,
            elapsed: Duration::from_millis(1500),
            cancelled: true,
        };
        let text = DownloadSummary::from_run(&run, 2048).to_string();
        assert!(text.contains("状态: 已取消"));
        assert!(text.contains("总大小: 2.00 KB"));
        assert!(text.contains("耗时: 1.50秒"));
        assert!(text.contains("空链接: 1"));
    }
}
