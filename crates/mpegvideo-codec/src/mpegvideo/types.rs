//! 宏块级与图像级类型定义.

use bitflags::bitflags;

use crate::frame::PictureType;

/// 图像结构 (帧或单场)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PictureStructure {
    /// 顶场
    TopField = 1,
    /// 底场
    BottomField = 2,
    /// 完整帧
    #[default]
    Frame = 3,
}

impl PictureStructure {
    /// 是否为场图像
    pub const fn is_field(&self) -> bool {
        !matches!(self, Self::Frame)
    }

    /// 场选择位对应的场结构 (0: 顶场, 1: 底场)
    pub const fn from_field_select(field_select: u8) -> Self {
        if field_select & 1 == 0 {
            Self::TopField
        } else {
            Self::BottomField
        }
    }
}

/// 运动向量几何
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MvType {
    /// 整个宏块一个向量
    #[default]
    Mv16x16,
    /// 四个 8x8 亮度块各一个向量
    Mv8x8,
    /// 按场预测 (帧图像中每场一个向量; 场图像中一个向量)
    Field,
    /// 上下两半各一个向量 (场图像)
    Mv16x8,
    /// 双基预测 (dual prime)
    DualPrime,
}

bitflags! {
    /// 预测方向
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MvDir: u8 {
        /// 前向 (参考 last)
        const FORWARD = 1;
        /// 后向 (参考 next)
        const BACKWARD = 2;
    }
}

bitflags! {
    /// 宏块类型位图, 存入帧缓冲的 mb_type 表
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MbTypeFlags: u32 {
        /// 帧内
        const INTRA = 1;
        /// 16x16 运动
        const MV_16X16 = 1 << 3;
        /// 16x8 运动
        const MV_16X8 = 1 << 4;
        /// 8x8 运动
        const MV_8X8 = 1 << 6;
        /// 隔行 (场预测或场 DCT)
        const INTERLACED = 1 << 7;
        /// 全局运动补偿
        const GMC = 1 << 10;
        /// 跳过
        const SKIP = 1 << 11;
        /// 前向预测
        const FORWARD = 1 << 12;
        /// 后向预测
        const BACKWARD = 1 << 14;
        /// 带量化参数变化
        const QUANT = 1 << 16;
    }
}

/// 运动向量 (半像素或四分之一像素单位, 视 `quarter_sample` 而定)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MotionVector {
    /// 水平分量
    pub x: i32,
    /// 垂直分量
    pub y: i32,
}

impl MotionVector {
    /// 创建运动向量
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// 反量化方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DequantVariant {
    /// MPEG-1 风格
    #[default]
    Mpeg1,
    /// MPEG-2 风格 (含失配控制)
    Mpeg2,
    /// H.263 风格
    H263,
}

/// 量化参数导出类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QscaleType {
    /// MPEG-1 线性 qscale, 导出时乘 2
    #[default]
    Mpeg1,
    /// MPEG-2 非线性 qscale
    Mpeg2,
}

impl QscaleType {
    /// 导出倍率
    pub const fn multiplier(&self) -> i32 {
        match self {
            Self::Mpeg1 => 2,
            Self::Mpeg2 => 1,
        }
    }
}

/// 单个宏块的重建输入 (由码流解析器填写)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macroblock {
    /// 宏块列
    pub mb_x: usize,
    /// 宏块行 (场图像中按帧宏块行计, 奇偶位表示场)
    pub mb_y: usize,
    /// 是否帧内编码
    pub mb_intra: bool,
    /// 预测方向
    pub mv_dir: MvDir,
    /// 运动向量几何
    pub mv_type: MvType,
    /// 运动向量 `[方向][索引]`
    pub mv: [[MotionVector; 4]; 2],
    /// 场选择 `[方向][索引]`
    pub field_select: [[u8; 2]; 2],
    /// 场 DCT
    pub interlaced_dct: bool,
    /// 亮度量化参数
    pub qscale: i32,
    /// 色度量化参数
    pub chroma_qscale: i32,
    /// 每个块最后一个非零系数的索引, 负数表示无残差
    pub block_last_index: [i32; 12],
    /// 全局运动补偿选择
    pub mcsel: bool,
    /// 跳过宏块
    pub skipped: bool,
}

impl Default for Macroblock {
    fn default() -> Self {
        Self {
            mb_x: 0,
            mb_y: 0,
            mb_intra: false,
            mv_dir: MvDir::FORWARD,
            mv_type: MvType::Mv16x16,
            mv: [[MotionVector::default(); 4]; 2],
            field_select: [[0; 2]; 2],
            interlaced_dct: false,
            qscale: 1,
            chroma_qscale: 1,
            block_last_index: [-1; 12],
            mcsel: false,
            skipped: false,
        }
    }
}

impl Macroblock {
    /// 创建位于 (mb_x, mb_y) 的帧间宏块
    pub fn inter(mb_x: usize, mb_y: usize, mv_dir: MvDir) -> Self {
        Self {
            mb_x,
            mb_y,
            mv_dir,
            ..Self::default()
        }
    }

    /// 创建位于 (mb_x, mb_y) 的帧内宏块
    pub fn intra(mb_x: usize, mb_y: usize) -> Self {
        Self {
            mb_x,
            mb_y,
            mb_intra: true,
            mv_dir: MvDir::empty(),
            ..Self::default()
        }
    }

    /// 推导宏块类型位图
    pub fn type_flags(&self) -> MbTypeFlags {
        if self.mb_intra {
            return MbTypeFlags::INTRA;
        }
        let mut flags = match self.mv_type {
            MvType::Mv16x16 => MbTypeFlags::MV_16X16,
            MvType::Mv8x8 => MbTypeFlags::MV_8X8,
            MvType::Mv16x8 => MbTypeFlags::MV_16X8,
            MvType::Field | MvType::DualPrime => MbTypeFlags::MV_16X8 | MbTypeFlags::INTERLACED,
        };
        if self.interlaced_dct {
            flags |= MbTypeFlags::INTERLACED;
        }
        if self.mv_dir.contains(MvDir::FORWARD) {
            flags |= MbTypeFlags::FORWARD;
        }
        if self.mv_dir.contains(MvDir::BACKWARD) {
            flags |= MbTypeFlags::BACKWARD;
        }
        if self.mcsel {
            flags |= MbTypeFlags::GMC;
        }
        if self.skipped {
            flags |= MbTypeFlags::SKIP;
        }
        flags
    }
}

/// 图像头中与帧缓冲管理相关的字段 (由码流解析器填写)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureHeader {
    /// 图片类型
    pub pict_type: PictureType,
    /// 可丢弃 (解码后不作为参考)
    pub droppable: bool,
    /// 图像结构
    pub picture_structure: PictureStructure,
    /// 是否为场对中的第一场
    pub first_field: bool,
    /// 顶场优先
    pub top_field_first: bool,
    /// 逐行帧
    pub progressive_frame: bool,
    /// MPEG-4 MPEG 量化类型
    pub mpeg_quant: bool,
    /// 四分之一像素运动向量
    pub quarter_sample: bool,
    /// MPEG-2 非线性 qscale
    pub q_scale_type: bool,
    /// 禁止插值取整 (H.263/MPEG-4 P 帧)
    pub no_rounding: bool,
}

impl Default for PictureHeader {
    fn default() -> Self {
        Self {
            pict_type: PictureType::I,
            droppable: false,
            picture_structure: PictureStructure::Frame,
            first_field: false,
            top_field_first: false,
            progressive_frame: true,
            mpeg_quant: false,
            quarter_sample: false,
            q_scale_type: false,
            no_rounding: false,
        }
    }
}

impl PictureHeader {
    /// 以图片类型创建逐行帧头
    pub fn new(pict_type: PictureType) -> Self {
        Self {
            pict_type,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_select_to_structure() {
        assert_eq!(
            PictureStructure::from_field_select(0),
            PictureStructure::TopField
        );
        assert_eq!(
            PictureStructure::from_field_select(1),
            PictureStructure::BottomField
        );
        assert!(!PictureStructure::Frame.is_field());
    }

    #[test]
    fn test_mb_type_flags() {
        let mut mb = Macroblock::inter(0, 0, MvDir::FORWARD | MvDir::BACKWARD);
        mb.mv_type = MvType::Mv8x8;
        let flags = mb.type_flags();
        assert!(flags.contains(MbTypeFlags::MV_8X8 | MbTypeFlags::FORWARD | MbTypeFlags::BACKWARD));
        assert_eq!(Macroblock::intra(1, 1).type_flags(), MbTypeFlags::INTRA);
    }

    #[test]
    fn test_qscale_multiplier() {
        assert_eq!(QscaleType::Mpeg1.multiplier(), 2);
        assert_eq!(QscaleType::Mpeg2.multiplier(), 1);
    }
}
