use std::sync::atomic::{AtomicU8, Ordering};

/// 下载管理器的运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Idle = 0,
    Running = 1,
    Cancelling = 2,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunState::Running,
            2 => RunState::Cancelling,
            _ => RunState::Idle,
        }
    }
}

/// 只能通过 compare-and-swap 迁移的状态值
#[derive(Debug)]
pub struct AtomicRunState(AtomicU8);

impl AtomicRunState {
    pub fn new() -> Self {
        Self(AtomicU8::new(RunState::Idle as u8))
    }

    pub fn load(&self) -> RunState {
        RunState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// `from -> to`，当前状态不是 `from` 时返回 false
    pub fn transition(&self, from: RunState, to: RunState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// 运行结束，从任何状态回到 Idle
    pub fn finish(&self) -> RunState {
        RunState::from_u8(self.0.swap(RunState::Idle as u8, Ordering::SeqCst))
    }
}

impl Default for AtomicRunState {
    fn default() -> Self {
        Self::new()
    }
}
