//! 统一错误类型定义.
//!
//! 帧缓冲生命周期管理与重建核心共用的错误类型. 除 `InvalidArgument` 与
//! `Internal` 外, 每个变体都只对当前图像致命, 上下文在之后仍可继续使用.

use thiserror::Error;

/// mpegvideo 统一错误类型
#[derive(Debug, Error)]
pub enum MpvError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 帧缓冲池已满, 没有可用槽位 (仅对当前图像致命)
    #[error("没有可用的帧缓冲")]
    NoBufferAvailable,

    /// 内存分配失败 (不可重试)
    #[error("内存分配失败: {0}")]
    AllocationFailure(String),

    /// 图像尺寸非法
    #[error("无效尺寸: {width}x{height}")]
    InvalidDimensions {
        /// 宽度
        width: u32,
        /// 高度
        height: u32,
    },

    /// 无法从像素格式推导色度子采样
    #[error("不支持的像素格式: {0}")]
    UnsupportedFormat(String),

    /// 无效数据 (上游解析器提供的数据不一致)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

impl MpvError {
    /// 是否要求上下文在继续解码前重新初始化
    pub fn requires_reinit(&self) -> bool {
        matches!(
            self,
            Self::InvalidDimensions { .. } | Self::UnsupportedFormat(_)
        )
    }
}

impl From<std::collections::TryReserveError> for MpvError {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::AllocationFailure(err.to_string())
    }
}

/// mpegvideo 统一 Result 类型
pub type MpvResult<T> = Result<T, MpvError>;
