//! 解码器配置.
//!
//! 对标 FFmpeg `AVCodecContext` 中与 mpegvideo 解码核心相关的字段
//! (`flags`, `debug`, `workaround_bugs`, `export_side_data`, `lowres` 等).

use bitflags::bitflags;
use mpegvideo_core::{MpvError, MpvResult, PixelFormat};

use crate::codec_id::CodecId;

bitflags! {
    /// 编解码器通用标志 (对标 AV_CODEC_FLAG_*)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CodecFlags: u32 {
        /// 只解码亮度, 跳过色度运动补偿与残差
        const GRAY = 1 << 13;
    }
}

bitflags! {
    /// 调试输出标志 (对标 FF_DEBUG_*)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DebugFlags: u32 {
        /// 打印图像信息
        const PICT_INFO = 1;
        /// 打印宏块类型图
        const MB_TYPE = 1 << 3;
        /// 打印量化参数图
        const QP = 1 << 4;
        /// 打印 DCT 系数
        const DCT_COEFF = 1 << 6;
        /// 打印跳过宏块图
        const SKIP = 1 << 7;
        /// 新图像以灰度填充, 便于观察未补偿区域
        const NOMC = 1 << 24;
    }
}

bitflags! {
    /// 编码器缺陷规避标志 (对标 FF_BUG_*)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BugFlags: u32 {
        /// 自动检测
        const AUTODETECT = 1;
        /// XviD 隔行缺陷
        const XVID_ILACE = 1 << 2;
        /// UMP4 缺陷
        const UMP4 = 1 << 3;
        /// 缺失填充
        const NO_PADDING = 1 << 4;
        /// AMV
        const AMV = 1 << 5;
        /// 四分之一像素色度取整缺陷
        const QPEL_CHROMA = 1 << 6;
        /// 标准 qpel
        const STD_QPEL = 1 << 7;
        /// 四分之一像素色度取整缺陷 (第二种)
        const QPEL_CHROMA2 = 1 << 8;
        /// direct 块大小缺陷
        const DIRECT_BLOCKSIZE = 1 << 9;
        /// 边缘缺陷
        const EDGE = 1 << 10;
        /// 半像素色度缺陷
        const HPEL_CHROMA = 1 << 11;
        /// DC 截断缺陷
        const DC_CLIP = 1 << 12;
        /// Microsoft 编码器缺陷
        const MS = 1 << 13;
        /// 截断码流
        const TRUNCATED = 1 << 14;
        /// 隔行边缘缺陷
        const IEDGE = 1 << 15;
    }
}

bitflags! {
    /// 边数据导出标志 (对标 AV_CODEC_EXPORT_DATA_*)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExportFlags: u32 {
        /// 导出逐块量化参数
        const VIDEO_ENC_PARAMS = 1 << 2;
    }
}

/// 最大 lowres 级别
pub const MAX_LOWRES: u8 = 3;

/// 解码器配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// 编解码器标识
    pub codec_id: CodecId,
    /// 编码宽度 (像素)
    pub width: u32,
    /// 编码高度 (像素)
    pub height: u32,
    /// 输出像素格式 (决定色度子采样)
    pub pixel_format: PixelFormat,
    /// 降分辨率级别 (0 为全分辨率, 每级宽高减半)
    pub lowres: u8,
    /// 通用标志
    pub flags: CodecFlags,
    /// 调试标志
    pub debug: DebugFlags,
    /// 编码器缺陷规避
    pub workaround_bugs: BugFlags,
    /// 边数据导出
    pub export_side_data: ExportFlags,
    /// 条带并行线程数 (按宏块行切分)
    pub slice_threads: usize,
    /// 帧并行线程数, 大于 1 时运动补偿前等待参考帧进度
    pub frame_threads: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            codec_id: CodecId::None,
            width: 0,
            height: 0,
            pixel_format: PixelFormat::Yuv420p,
            lowres: 0,
            flags: CodecFlags::empty(),
            debug: DebugFlags::empty(),
            workaround_bugs: BugFlags::AUTODETECT,
            export_side_data: ExportFlags::empty(),
            slice_threads: 1,
            frame_threads: 1,
        }
    }
}

impl DecoderConfig {
    /// 以编解码器与尺寸创建配置, 其余字段取默认值
    pub fn new(codec_id: CodecId, width: u32, height: u32) -> Self {
        Self {
            codec_id,
            width,
            height,
            ..Self::default()
        }
    }

    /// 设置像素格式
    pub fn with_pixel_format(mut self, pixel_format: PixelFormat) -> Self {
        self.pixel_format = pixel_format;
        self
    }

    /// 设置 lowres 级别
    pub fn with_lowres(mut self, lowres: u8) -> Self {
        self.lowres = lowres;
        self
    }

    /// 是否启用帧级并行
    pub fn frame_threading(&self) -> bool {
        self.frame_threads > 1
    }

    /// 校验配置
    pub fn validate(&self) -> MpvResult<()> {
        if self.lowres > MAX_LOWRES {
            return Err(MpvError::InvalidArgument(format!(
                "lowres 超出范围: {} (最大 {MAX_LOWRES})",
                self.lowres
            )));
        }
        if self.slice_threads == 0 || self.frame_threads == 0 {
            return Err(MpvError::InvalidArgument("线程数不能为 0".into()));
        }
        Ok(())
    }
}
