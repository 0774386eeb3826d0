//! 帧级并行的逐行解码进度.
//!
//! 每个帧缓冲携带两个进度计数 (顶场/帧 与 底场), 解码线程在完成宏块行时
//! 单调推进, 引用该帧的线程阻塞等待所需的行号.

use std::sync::{Condvar, Mutex, PoisonError};

/// 进度完成标记
pub const PROGRESS_DONE: i32 = i32::MAX;

/// 初始进度 (尚未解码任何行)
pub const PROGRESS_NONE: i32 = -1;

/// 解码进度计数
#[derive(Debug)]
pub struct DecodeProgress {
    rows: Mutex<[i32; 2]>,
    cond: Condvar,
}

impl Default for DecodeProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeProgress {
    /// 创建新的进度计数
    pub fn new() -> Self {
        Self {
            rows: Mutex::new([PROGRESS_NONE; 2]),
            cond: Condvar::new(),
        }
    }

    /// 报告场 `field` 已解码到第 `row` 行, 进度只增不减
    pub fn report(&self, row: i32, field: usize) {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = &mut rows[field & 1];
        if row > *slot {
            *slot = row;
            self.cond.notify_all();
        }
    }

    /// 阻塞直到场 `field` 的进度不小于 `row`
    pub fn wait_for(&self, row: i32, field: usize) {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        while rows[field & 1] < row {
            rows = self
                .cond
                .wait(rows)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// 当前进度
    pub fn get(&self, field: usize) -> i32 {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)[field & 1]
    }

    /// 两个场均已完成
    pub fn is_done(&self) -> bool {
        let rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        rows[0] == PROGRESS_DONE && rows[1] == PROGRESS_DONE
    }

    /// 将两个场标记为完成
    pub fn finish(&self) {
        self.report(PROGRESS_DONE, 0);
        self.report(PROGRESS_DONE, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_progress_is_monotonic() {
        let p = DecodeProgress::new();
        assert_eq!(p.get(0), PROGRESS_NONE);
        p.report(3, 0);
        p.report(1, 0);
        assert_eq!(p.get(0), 3);
        assert_eq!(p.get(1), PROGRESS_NONE);
    }

    #[test]
    fn test_wait_unblocks_on_report() {
        let p = Arc::new(DecodeProgress::new());
        let waiter = {
            let p = Arc::clone(&p);
            thread::spawn(move || {
                p.wait_for(5, 0);
                p.get(0)
            })
        };
        p.report(2, 0);
        p.report(5, 0);
        assert!(waiter.join().unwrap() >= 5);
    }

    #[test]
    fn test_finish_marks_both_fields() {
        let p = DecodeProgress::new();
        p.report(PROGRESS_DONE, 0);
        assert!(!p.is_done());
        p.finish();
        assert!(p.is_done());
    }
}
