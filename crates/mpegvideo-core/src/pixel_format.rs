//! 像素格式定义.
//!
//! 对标 FFmpeg 的 `AVPixelFormat`. 解码核心只处理 8 位平面 YUV,
//! 其余格式仅用于识别并报告 `UnsupportedFormat`.

use std::fmt;

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum PixelFormat {
    /// 未指定
    None,

    // ========================
    // YUV 平面格式 (Planar)
    // ========================
    /// YUV 4:2:0 平面格式, 8 位 (MPEG-1/2, H.263, MPEG-4 默认)
    #[default]
    Yuv420p,
    /// YUV 4:2:2 平面格式, 8 位 (MPEG-2 4:2:2 profile)
    Yuv422p,
    /// YUV 4:4:4 平面格式, 8 位
    Yuv444p,
    /// YUV 4:2:0 平面格式, JPEG 全范围 (MJPEG 风格输出)
    Yuvj420p,

    // ========================
    // 其他格式
    // ========================
    /// 灰度 8 位
    Gray8,
    /// RGB 各 8 位, 打包
    Rgb24,
}

impl PixelFormat {
    /// 获取色度子采样 (log2 水平, log2 垂直)
    ///
    /// 非平面 YUV 格式无法推导色度位移, 返回 `None`.
    pub const fn chroma_shift(&self) -> Option<(u32, u32)> {
        match self {
            Self::Yuv420p | Self::Yuvj420p => Some((1, 1)),
            Self::Yuv422p => Some((1, 0)),
            Self::Yuv444p => Some((0, 0)),
            _ => None,
        }
    }

    /// 平面数量
    pub const fn plane_count(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p | Self::Yuvj420p => 3,
            Self::Gray8 | Self::Rgb24 => 1,
        }
    }

    /// 计算指定平面的可见宽度 (像素), 色度按向上取整的位移计算
    ///
    /// # 返回
    /// - `Some(width)`: 该平面宽度
    /// - `None`: 非平面 YUV 格式或平面索引超出范围
    pub fn plane_width(&self, plane: usize, width: u32) -> Option<usize> {
        let (sx, _) = self.chroma_shift()?;
        match plane {
            0 => Some(width as usize),
            1 | 2 => Some(ceil_rshift(width, sx) as usize),
            _ => None,
        }
    }

    /// 计算指定平面的可见行数
    pub fn plane_height(&self, plane: usize, height: u32) -> Option<usize> {
        let (_, sy) = self.chroma_shift()?;
        match plane {
            0 => Some(height as usize),
            1 | 2 => Some(ceil_rshift(height, sy) as usize),
            _ => None,
        }
    }
}

/// 向上取整右移 (对标 AV_CEIL_RSHIFT)
pub const fn ceil_rshift(value: u32, shift: u32) -> u32 {
    (value + (1 << shift) - 1) >> shift
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Yuv420p => "yuv420p",
            Self::Yuv422p => "yuv422p",
            Self::Yuv444p => "yuv444p",
            Self::Yuvj420p => "yuvj420p",
            Self::Gray8 => "gray8",
            Self::Rgb24 => "rgb24",
        };
        write!(f, "{name}")
    }
}
