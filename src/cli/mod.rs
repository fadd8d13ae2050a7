//! CLI: 命令行接口和参数解析模块
//!
//! ## 支持的命令
//!
//! - 批量下载：`tabledown links.csv` 或 `tabledown links.xlsx`
//! - 指定列：`tabledown links.csv --url-column 链接 --name-columns 编号,名称`
//! - 查看表头：`tabledown links.csv --headers`
//! - 编辑配置：`tabledown -e`
//! - 指定配置：`tabledown -c config.conf links.csv`
//!
//! ## 平台支持
//!
//! - Windows: `%APPDATA%/tabledown/tabledown.conf`
//! - macOS: `~/Library/Application Support/tabledown/tabledown.conf`
//! - Linux: `~/.config/tabledown/tabledown.conf`

use clap::Parser;
use std::env;
use std::path::PathBuf;

use crate::config::Config;
use crate::core::error::DownloadError;
use crate::source::TaskSpec;

/// `--version` 输出：版本号、git 提交和构建时间（由 vergen 在构建时写入）
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_SHA"),
    ", 构建于 ",
    env!("VERGEN_BUILD_TIMESTAMP"),
    ")"
);

/// 获取平台默认配置文件路径
pub fn default_config_path() -> String {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        format!("{}/tabledown/tabledown.conf", appdata)
    }
    #[cfg(target_os = "macos")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/Library/Application Support/tabledown/tabledown.conf", home)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/.config/tabledown/tabledown.conf", home)
    }
}

/// 打开配置文件编辑器
pub fn open_config_in_editor(config_path: &str) {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("notepad").arg(config_path).status().ok();
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg("-e").arg(config_path).status().ok();
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // 优先 xdg-open，否则 nano
        if std::process::Command::new("xdg-open").arg(config_path).status().is_err() {
            let _ = std::process::Command::new("nano").arg(config_path).status();
        }
    }
}

/// TableDown 命令行参数
///
/// 示例用法：
///   tabledown links.csv
///   tabledown links.csv --url-column 链接 --name-columns 编号,名称 --separator -
///   tabledown -e  # 编辑配置文件
///
/// 更多用法请加 --help 查看
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tabledown",
    author = "panzhifu",
    version = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION,
    about = "按表格批量下载文件",
    long_about = "读取 Excel 工作簿（第一个工作表）或 CSV/TSV 表格，按指定列的链接并发下载文件，用其它列拼接文件名。\n\n示例：\n  tabledown links.csv\n  tabledown links.csv --url-column 链接 --name-columns 编号,名称\n  tabledown links.csv --headers\n  tabledown -e\n"
)]
pub struct Args {
    /// 表格文件（xlsx/xls/ods、CSV 或 TSV）
    #[arg(required_unless_present = "edit_config", help = "包含下载链接的表格文件。xlsx/xlsm/xlsb/xls/ods 读第一个工作表，.tsv/.tab 按制表符分隔，其它按逗号分隔。")]
    pub input: Option<PathBuf>,

    #[arg(long, default_value = "A", help = "链接所在列，表头名称或列号（A、B、AA…）。")]
    pub url_column: String,

    #[arg(long, default_value = "B", help = "用于拼接文件名的列，逗号分隔多个列。")]
    pub name_columns: String,

    #[arg(long, default_value = "_", help = "拼接文件名时使用的分隔符。")]
    pub separator: String,

    #[arg(long, help = "强制使用的扩展名，默认从链接推断。")]
    pub ext: Option<String>,

    /// 配置文件路径，默认为平台推荐路径
    #[arg(short = 'c', long, default_value_t = default_config_path(), help = "配置文件路径，默认为平台推荐路径。")]
    pub config: String,

    /// 编辑配置文件（-e 或 --edit）
    #[arg(short = 'e', long = "edit", help = "用系统默认编辑器打开配置文件并退出。")]
    pub edit_config: bool,

    #[arg(long, help = "只打印表头和前几行数据，不下载。")]
    pub headers: bool,

    /// 指定下载目录
    #[arg(long, short = 'd', help = "指定下载目录，覆盖配置文件中的设置。")]
    pub download_dir: Option<String>,

    #[arg(long, short = 't', help = "同时下载的文件数，覆盖配置文件中的设置。")]
    pub concurrency: Option<usize>,

    #[arg(long, short = 'r', help = "每个文件最多尝试次数，覆盖配置文件中的设置。")]
    pub retry_count: Option<u32>,

    #[arg(long, help = "单个请求超时（秒），覆盖配置文件中的设置。")]
    pub timeout: Option<u64>,
}

impl Args {
    pub fn parse_args() -> Result<(Self, Config), DownloadError> {
        let args = Args::parse();

        // --edit 逻辑
        if args.edit_config {
            // 不存在时先写入带说明的默认配置
            Config::load(&args.config)?;
            open_config_in_editor(&args.config);
            std::process::exit(0); // 退出程序
        }

        let config = args.load_config()?;
        Ok((args, config))
    }

    /// 加载配置文件并合并命令行参数
    pub fn load_config(&self) -> Result<Config, DownloadError> {
        let mut config = Config::load(&self.config)?;
        config.merge_from_args(self);
        config.validate()?;
        Ok(config)
    }

    pub fn task_spec(&self, output_dir: PathBuf) -> TaskSpec {
        TaskSpec {
            url_column: self.url_column.clone(),
            name_columns: self.name_columns.clone(),
            separator: self.separator.clone(),
            extension: self.ext.clone().filter(|e| !e.trim().is_empty()),
            output_dir,
        }
    }
}

// 测试模块
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["tabledown", "links.csv"]).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("links.csv")));
        assert_eq!(args.url_column, "A");
        assert_eq!(args.name_columns, "B");
        assert_eq!(args.separator, "_");
        assert!(args.ext.is_none());
        assert!(!args.headers);
        assert!(args.concurrency.is_none());
    }

    #[test]
    fn test_long_version_carries_build_info() {
        use clap::CommandFactory;
        let version = Args::command().render_long_version();
        assert!(version.contains(env!("CARGO_PKG_VERSION")));
        assert!(version.contains(env!("VERGEN_GIT_SHA")));
        assert!(version.contains(env!("VERGEN_BUILD_TIMESTAMP")));
    }

    #[test]
    fn test_input_required_unless_editing() {
        assert!(Args::try_parse_from(["tabledown"]).is_err());
        assert!(Args::try_parse_from(["tabledown", "-e"]).is_ok());
    }

    #[test]
    fn test_config_merge() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("tabledown.conf");
        let config_path = config_path.to_str().unwrap();

        let args = Args::try_parse_from([
            "tabledown", "-c", config_path, "-d", "/tmp/out", "-t", "4", "-r", "5", "--timeout", "9",
            "links.csv",
        ])
        .unwrap();
        let config = args.load_config().unwrap();
        assert_eq!(config.output_dir, "/tmp/out");
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.retry_count, 5);
        assert_eq!(config.timeout, 9);
        // 缺失的配置文件会被创建
        assert!(std::path::Path::new(config_path).exists());
    }

    #[test]
    fn test_invalid_concurrency_rejected() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("tabledown.conf");
        let args = Args::try_parse_from([
            "tabledown", "-c", config_path.to_str().unwrap(), "-t", "0", "links.csv",
        ])
        .unwrap();
        assert!(matches!(args.load_config(), Err(DownloadError::Config(_))));
    }

    #[test]
    fn test_task_spec() {
        let args = Args::try_parse_from([
            "tabledown", "links.csv", "--url-column", "链接", "--name-columns", "编号,名称",
            "--separator", "-", "--ext", "pdf",
        ])
        .unwrap();
        let spec = args.task_spec(PathBuf::from("/out"));
        assert_eq!(spec.url_column, "链接");
        assert_eq!(spec.name_columns, "编号,名称");
        assert_eq!(spec.separator, "-");
        assert_eq!(spec.extension.as_deref(), Some("pdf"));
        assert_eq!(spec.output_dir, PathBuf::from("/out"));
    }
}
