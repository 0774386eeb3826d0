//! 解码输出的帧数据.
//!
//! 对标 FFmpeg 的 `AVFrame` 与 `AVVideoEncParams` 边数据.

use mpegvideo_core::PixelFormat;

/// 视频帧
///
/// 从帧缓冲复制出的可见区域像素, 多平面存储, 每平面行距等于平面宽度.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// 各平面的像素数据
    pub data: Vec<Vec<u8>>,
    /// 各平面每行的字节数
    pub linesize: Vec<usize>,
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 像素格式
    pub pixel_format: PixelFormat,
    /// 是否为关键帧
    pub is_keyframe: bool,
    /// 图片类型 (I/P/B 帧)
    pub picture_type: PictureType,
    /// 编码顺序编号
    pub coded_picture_number: u32,
    /// 是否为隔行帧
    pub interlaced: bool,
    /// 顶场优先
    pub top_field_first: bool,
    /// 附加边数据
    pub side_data: Vec<FrameSideData>,
}

impl VideoFrame {
    /// 创建空的视频帧
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        let plane_count = pixel_format.plane_count() as usize;
        Self {
            data: vec![Vec::new(); plane_count],
            linesize: vec![0; plane_count],
            width,
            height,
            pixel_format,
            is_keyframe: false,
            picture_type: PictureType::None,
            coded_picture_number: 0,
            interlaced: false,
            top_field_first: false,
            side_data: Vec::new(),
        }
    }

    /// 读取平面 `plane` 在 (x, y) 处的采样
    pub fn sample(&self, plane: usize, x: usize, y: usize) -> Option<u8> {
        let stride = *self.linesize.get(plane)?;
        self.data.get(plane)?.get(y * stride + x).copied()
    }

    /// 查找逐块编码参数边数据
    pub fn video_enc_params(&self) -> Option<&VideoEncParams> {
        self.side_data.iter().find_map(|sd| match sd {
            FrameSideData::VideoEncParams(p) => Some(p),
        })
    }
}

/// 图片类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PictureType {
    /// 未指定
    #[default]
    None,
    /// I 帧 (关键帧, 帧内编码)
    I,
    /// P 帧 (前向预测)
    P,
    /// B 帧 (双向预测)
    B,
    /// S 帧 (GMC Sprite)
    S,
}

impl PictureType {
    /// 单字符表示
    pub const fn as_char(&self) -> char {
        match self {
            Self::None => '?',
            Self::I => 'I',
            Self::P => 'P',
            Self::B => 'B',
            Self::S => 'S',
        }
    }
}

/// 帧边数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSideData {
    /// 逐块编码参数
    VideoEncParams(VideoEncParams),
}

/// 编码参数类型 (决定 qp 的解释方式)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncParamsType {
    /// MPEG-2 风格量化参数
    Mpeg2,
}

/// 逐块编码参数 (对标 AVVideoEncParams)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEncParams {
    /// 参数类型
    pub kind: EncParamsType,
    /// 帧级基准 qp
    pub qp: i32,
    /// 每宏块参数, 按光栅顺序
    pub blocks: Vec<VideoBlockParams>,
}

/// 单个块的编码参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoBlockParams {
    /// 左上角 x (像素)
    pub src_x: u32,
    /// 左上角 y (像素)
    pub src_y: u32,
    /// 宽度
    pub w: u32,
    /// 高度
    pub h: u32,
    /// 相对帧级 qp 的偏移
    pub delta_qp: i32,
}
