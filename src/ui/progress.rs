use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) 剩余 {eta} {msg}";

// 结构体：ProgressManager
// 整次运行一个进度条，按完成的文件数推进
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// 不绘制的进度条，非终端输出时使用
    pub fn hidden(total: usize) -> Self {
        Self {
            bar: ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::hidden()),
        }
    }

    /// 标准输出是终端时画进度条，被重定向时不画
    pub fn for_stdout(total: usize) -> Self {
        if std::io::stdout().is_terminal() {
            Self::new(total)
        } else {
            Self::hidden(total)
        }
    }

    // 方法：更新完成数和当前速度
    pub fn update(&self, completed: usize, rate: f64) {
        self.bar.set_position(completed as u64);
        self.bar.set_message(format!("{:.1} 个/秒", rate));
    }

    /// 在进度条上方打印一行，不打乱进度条；隐藏时直接输出
    pub fn println(&self, line: &str) {
        if self.bar.is_hidden() {
            println!("{}", line);
        } else {
            self.bar.println(line);
        }
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }
}
