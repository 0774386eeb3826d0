//! # mpegvideo
//!
//! 纯 Rust 实现的 MPEG 系列视频解码核心, 对标 FFmpeg libavcodec 的 mpegvideo 公共代码.
//!
//! 提供块编码视频解码器 (MPEG-1/2, H.261/H.263, MPEG-4 Part 2) 共用的部分:
//! - **帧缓冲池**: 固定容量槽位, 参考角色轮换, 缺失参考的哑帧合成
//! - **帧级并行**: 上下文状态快照与逐行解码进度
//! - **运动补偿**: 全分辨率与 lowres, 边缘模拟, 场预测
//! - **宏块重建**: 预测叠加残差
//!
//! # 快速开始
//!
//! ```rust
//! use mpegvideo::codec::{CodecId, DecoderConfig, MpegContext};
//! use mpegvideo::codec::mpegvideo::DspKernels;
//!
//! let config = DecoderConfig::new(CodecId::Mpeg1Video, 352, 288);
//! let mut ctx = MpegContext::new(config, DspKernels::reference());
//! ctx.common_init().expect("初始化失败");
//! println!("{}x{} 宏块", ctx.mb_width(), ctx.mb_height());
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `mpegvideo-core` | 错误类型与像素格式 |
//! | `mpegvideo-codec` | 解码上下文, 缓冲池, 运动补偿与重建 |

/// 核心类型与工具 (对标 libavutil)
pub use mpegvideo_core as core;

/// 解码核心 (对标 libavcodec/mpegvideo)
pub use mpegvideo_codec as codec;

pub mod logging;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
