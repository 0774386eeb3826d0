//! # mpegvideo-core
//!
//! mpegvideo 的核心基础库, 提供统一错误类型与像素格式定义.
//!
//! 上层的 `mpegvideo-codec` 在此基础上实现帧缓冲池, 运动补偿与宏块重建.

pub mod error;
pub mod pixel_format;

// 重导出常用类型
pub use error::{MpvError, MpvResult};
pub use pixel_format::PixelFormat;
