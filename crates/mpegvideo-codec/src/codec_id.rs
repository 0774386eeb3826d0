//! 编解码器标识符.
//!
//! 对标 FFmpeg 的 `AVCodecID`, 只保留共用 mpegvideo 解码核心的块编码视频编解码器.

use std::fmt;

/// 编解码器标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CodecId {
    /// 未知编解码器
    #[default]
    None,

    // ========================
    // MPEG-1/2 族
    // ========================
    /// MPEG-1 Video
    Mpeg1Video,
    /// MPEG-2 Video
    Mpeg2Video,

    // ========================
    // H.261 / H.263 族
    // ========================
    /// H.261
    H261,
    /// H.263 (含 H.263+ 基础部分)
    H263,
    /// H.263+ / H.263v2
    H263p,
    /// Intel H.263
    H263i,
    /// Sorenson Spark (FLV1)
    Flv1,
    /// RealVideo 1.0
    Rv10,
    /// RealVideo 2.0
    Rv20,

    // ========================
    // MPEG-4 Part 2 族
    // ========================
    /// MPEG-4 Part 2 (ASP)
    Mpeg4,
    /// Microsoft MPEG-4 v1
    Msmpeg4v1,
    /// Microsoft MPEG-4 v2
    Msmpeg4v2,
    /// Microsoft MPEG-4 v3 (DivX 3)
    Msmpeg4v3,
    /// Windows Media Video 7
    Wmv1,
    /// Windows Media Video 8
    Wmv2,
}

/// 码流族 (决定反量化方式与色度运动向量寻址)
///
/// 对标 FFmpeg `MpegEncContext.out_format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// MPEG-1/2
    #[default]
    Mpeg1,
    /// H.261
    H261,
    /// H.263 及其衍生 (含 MPEG-4 Part 2)
    H263,
}

impl CodecId {
    /// 获取编解码器所属码流族
    pub const fn output_format(&self) -> OutputFormat {
        match self {
            Self::H261 => OutputFormat::H261,
            Self::None | Self::Mpeg1Video | Self::Mpeg2Video => OutputFormat::Mpeg1,
            _ => OutputFormat::H263,
        }
    }

    /// 是否为 MPEG-1/2
    pub const fn is_mpeg12(&self) -> bool {
        matches!(self, Self::Mpeg1Video | Self::Mpeg2Video)
    }

    /// 是否为 Microsoft MPEG-4 系 (含 WMV1/2)
    pub const fn is_msmpeg4(&self) -> bool {
        matches!(
            self,
            Self::Msmpeg4v1 | Self::Msmpeg4v2 | Self::Msmpeg4v3 | Self::Wmv1 | Self::Wmv2
        )
    }

    /// 哑帧亮度填充值: FLV1 与 H.263 使用 16, 其余使用 0x80
    pub const fn dummy_luma(&self) -> u8 {
        match self {
            Self::Flv1 | Self::H263 => 16,
            _ => 0x80,
        }
    }

    /// 获取编解码器名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mpeg1Video => "mpeg1video",
            Self::Mpeg2Video => "mpeg2video",
            Self::H261 => "h261",
            Self::H263 => "h263",
            Self::H263p => "h263p",
            Self::H263i => "h263i",
            Self::Flv1 => "flv",
            Self::Rv10 => "rv10",
            Self::Rv20 => "rv20",
            Self::Mpeg4 => "mpeg4",
            Self::Msmpeg4v1 => "msmpeg4v1",
            Self::Msmpeg4v2 => "msmpeg4v2",
            Self::Msmpeg4v3 => "msmpeg4v3",
            Self::Wmv1 => "wmv1",
            Self::Wmv2 => "wmv2",
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
