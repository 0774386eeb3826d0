//! # mpegvideo-codec
//!
//! 块编码视频解码器族 (MPEG-1/2, H.263 系, MPEG-4 Part 2) 共用的解码核心.
//!
//! 本 crate 对标 FFmpeg libavcodec 中的 mpegvideo 解码公共代码, 负责:
//! - 固定容量的帧缓冲池, 引用计数复用, B 帧重排序与缺失参考帧的哑帧合成
//! - 帧级并行解码时的上下文状态传递
//! - 运动补偿 (多种 MV 几何, 边缘模拟, 色度子采样寻址, lowres)
//! - 宏块重建 (预测 + 残差)
//!
//! 码流解析, IDCT/反量化内核与像素插值原语均作为外部协作者, 通过
//! [`mpegvideo::DspKernels`] 中的 trait 对象注入.
//!
//! ## 使用示例
//!
//! ```rust
//! use mpegvideo_codec::{CodecId, DecoderConfig, MpegContext};
//! use mpegvideo_codec::mpegvideo::DspKernels;
//!
//! let config = DecoderConfig::new(CodecId::Mpeg2Video, 64, 48);
//! let mut ctx = MpegContext::new(config, DspKernels::reference());
//! ctx.common_init().unwrap();
//! assert_eq!(ctx.mb_width(), 4);
//! ```

pub mod codec_id;
pub mod config;
pub mod frame;
pub mod mpegvideo;

// 重导出常用类型
pub use codec_id::{CodecId, OutputFormat};
pub use config::{BugFlags, CodecFlags, DebugFlags, DecoderConfig, ExportFlags};
pub use frame::{PictureType, VideoFrame};
pub use mpegvideo::MpegContext;
