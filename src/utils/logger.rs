use chrono::Local; // 用于获取本地时间
use log::LevelFilter; // 用于设置日志级别
use std::io::{Write, BufWriter};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use actix::prelude::*;

/// 日志消息
pub struct LogMsg {
    pub level: LevelFilter,
    pub message: String,
}
impl Message for LogMsg { type Result = (); }

/// 把缓冲区写入磁盘
pub struct Flush;
impl Message for Flush { type Result = std::io::Result<()>; }

/// 运行日志 Actor：写入文件，超过大小后轮转为 `.backup`
pub struct LoggerActor {
    writer: BufWriter<File>,
    level: LevelFilter,
    file_path: PathBuf,
    max_size: u64, // 最大文件大小 (bytes)
    current_size: u64,
}

impl LoggerActor {
    pub fn new(file_path: impl AsRef<Path>, level: LevelFilter, max_size: u64) -> Result<Self, std::io::Error> {
        let file_path = file_path.as_ref().to_path_buf();
        // 确保日志目录存在
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = open_append(&file_path)?;
        // 追加写入，从已有大小开始计算
        let current_size = file.metadata()?.len();

        Ok(Self {
            writer: BufWriter::new(file),
            level,
            file_path,
            max_size,
            current_size,
        })
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.file_path.clone().into_os_string();
        name.push(".backup");
        PathBuf::from(name)
    }

    /// 检查并执行日志轮转
    fn check_rotation(&mut self) -> Result<(), std::io::Error> {
        if self.current_size < self.max_size {
            return Ok(());
        }
        self.writer.flush()?;

        let backup_path = self.backup_path();
        if backup_path.exists() {
            std::fs::remove_file(&backup_path)?;
        }
        std::fs::rename(&self.file_path, &backup_path)?;

        self.writer = BufWriter::new(open_append(&self.file_path)?);
        self.current_size = 0;
        Ok(())
    }

    fn write_log(&mut self, level: LevelFilter, message: &str) -> Result<(), std::io::Error> {
        if level > self.level {
            return Ok(());
        }
        let log_entry = format!(
            "{} [{}] - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            level,
            message
        );

        self.check_rotation()?;
        self.writer.write_all(log_entry.as_bytes())?;
        self.current_size += log_entry.len() as u64;

        // 错误立即落盘
        if level <= LevelFilter::Error {
            self.writer.flush()?;
        }
        Ok(())
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl Actor for LoggerActor {
    type Context = Context<Self>;

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Err(e) = self.writer.flush() {
            eprintln!("日志写入失败: {}", e);
        }
    }
}

impl Handler<LogMsg> for LoggerActor {
    type Result = ();
    fn handle(&mut self, msg: LogMsg, _ctx: &mut Self::Context) {
        if let Err(e) = self.write_log(msg.level, &msg.message) {
            eprintln!("日志写入失败: {}", e);
        }
    }
}

impl Handler<Flush> for LoggerActor {
    type Result = std::io::Result<()>;
    fn handle(&mut self, _msg: Flush, _ctx: &mut Self::Context) -> Self::Result {
        self.writer.flush()
    }
}

// 便捷的日志方法 - 为Addr<LoggerActor>提供扩展方法
pub trait LoggerExt {
    fn log_at(&self, level: LevelFilter, message: &str);

    fn info(&self, message: &str) {
        self.log_at(LevelFilter::Info, message);
    }

    fn error(&self, message: &str) {
        self.log_at(LevelFilter::Error, message);
    }

    fn warn(&self, message: &str) {
        self.log_at(LevelFilter::Warn, message);
    }

    fn debug(&self, message: &str) {
        self.log_at(LevelFilter::Debug, message);
    }
}

impl LoggerExt for Addr<LoggerActor> {
    fn log_at(&self, level: LevelFilter, message: &str) {
        self.do_send(LogMsg {
            level,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[actix_rt::test]
    async fn test_logger_writes_and_filters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("run.log");
        let logger = LoggerActor::new(&path, LevelFilter::Info, 1024 * 1024).unwrap().start();

        logger.info("开始下载 3 个文件");
        logger.debug("不应写入");
        logger.warn("第 2 行重试");
        logger.send(Flush).await.unwrap().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[INFO] - 开始下载 3 个文件"));
        assert!(content.contains("[WARN] - 第 2 行重试"));
        assert!(!content.contains("不应写入"));
    }

    #[actix_rt::test]
    async fn test_logger_rotates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.log");
        let logger = LoggerActor::new(&path, LevelFilter::Info, 64).unwrap().start();

        for i in 0..10 {
            logger.info(&format!("第 {} 条比较长的日志内容", i));
        }
        logger.send(Flush).await.unwrap().unwrap();

        let backup = dir.path().join("run.log.backup");
        assert!(backup.exists());
        let current = std::fs::read_to_string(&path).unwrap();
        assert!(current.contains("第 9 条"));
    }
}
