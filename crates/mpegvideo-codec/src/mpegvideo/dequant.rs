//! 反量化 (MPEG-1, MPEG-2, H.263 三种方式)
//!
//! 系数按光栅顺序存放. `last_index` 为负表示块中没有非零系数.

use super::types::DequantVariant;

/// MPEG-1/2 默认帧内量化矩阵 (光栅顺序)
pub const DEFAULT_INTRA_MATRIX: [u16; 64] = [
    8, 16, 19, 22, 26, 27, 29, 34, //
    16, 16, 22, 24, 27, 29, 34, 37, //
    19, 22, 26, 27, 29, 34, 34, 38, //
    22, 22, 26, 27, 29, 34, 37, 40, //
    22, 26, 27, 29, 32, 35, 40, 48, //
    26, 27, 29, 32, 35, 40, 48, 58, //
    26, 27, 29, 34, 38, 46, 56, 69, //
    27, 29, 35, 38, 46, 56, 69, 83, //
];

/// MPEG-1/2 默认帧间量化矩阵
pub const DEFAULT_INTER_MATRIX: [u16; 64] = [16; 64];

/// MPEG-2 非线性 qscale 映射
const NON_LINEAR_QSCALE: [i32; 32] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 12, 14, 16, 18, 20, 22, 24, 28, 32, 36, 40, 44, 48, 52, 56, 64,
    72, 80, 88, 96, 104, 112,
];

/// 反量化参数 (由码流解析器按序列头/图像头更新)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantParams {
    /// 帧内量化矩阵
    pub intra_matrix: [u16; 64],
    /// 帧间量化矩阵
    pub inter_matrix: [u16; 64],
    /// 亮度 DC 缩放
    pub y_dc_scale: i32,
    /// 色度 DC 缩放
    pub c_dc_scale: i32,
    /// MPEG-2 非线性 qscale
    pub q_scale_type: bool,
    /// H.263 高级帧内编码 (DC 不缩放, 无偏置)
    pub h263_aic: bool,
}

impl Default for QuantParams {
    fn default() -> Self {
        Self {
            intra_matrix: DEFAULT_INTRA_MATRIX,
            inter_matrix: DEFAULT_INTER_MATRIX,
            y_dc_scale: 8,
            c_dc_scale: 8,
            q_scale_type: false,
            h263_aic: false,
        }
    }
}

impl QuantParams {
    fn dc_scale(&self, n: usize) -> i32 {
        if n < 4 { self.y_dc_scale } else { self.c_dc_scale }
    }

    fn mpeg2_qscale(&self, qscale: i32) -> i32 {
        if self.q_scale_type {
            NON_LINEAR_QSCALE[qscale.clamp(0, 31) as usize]
        } else {
            qscale << 1
        }
    }
}

/// 反量化内核
pub trait Dequantizer: Send + Sync {
    /// 帧内块反量化, `n` 为块序号 (0..4 亮度, 其余色度)
    fn unquantize_intra(
        &self,
        variant: DequantVariant,
        params: &QuantParams,
        block: &mut [i16; 64],
        n: usize,
        qscale: i32,
        last_index: i32,
    );

    /// 帧间块反量化
    fn unquantize_inter(
        &self,
        variant: DequantVariant,
        params: &QuantParams,
        block: &mut [i16; 64],
        n: usize,
        qscale: i32,
        last_index: i32,
    );
}

/// 标准反量化实现
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDequantizer;

#[inline]
fn signed(level: i32, magnitude: impl Fn(i32) -> i32) -> i32 {
    if level < 0 {
        -magnitude(-level)
    } else {
        magnitude(level)
    }
}

impl Dequantizer for StandardDequantizer {
    fn unquantize_intra(
        &self,
        variant: DequantVariant,
        params: &QuantParams,
        block: &mut [i16; 64],
        n: usize,
        qscale: i32,
        last_index: i32,
    ) {
        match variant {
            DequantVariant::Mpeg1 => {
                block[0] = (i32::from(block[0]) * params.dc_scale(n)) as i16;
                if last_index <= 0 {
                    return;
                }
                for (i, c) in block.iter_mut().enumerate().skip(1) {
                    let level = i32::from(*c);
                    if level != 0 {
                        let m = qscale * i32::from(params.intra_matrix[i]);
                        *c = signed(level, |l| (((l * m) >> 3) - 1) | 1) as i16;
                    }
                }
            }
            DequantVariant::Mpeg2 => {
                let q = params.mpeg2_qscale(qscale);
                block[0] = (i32::from(block[0]) * params.dc_scale(n)) as i16;
                for (i, c) in block.iter_mut().enumerate().skip(1) {
                    let level = i32::from(*c);
                    if level != 0 {
                        let m = q * i32::from(params.intra_matrix[i]);
                        *c = signed(level, |l| (l * m) >> 4) as i16;
                    }
                }
            }
            DequantVariant::H263 => {
                let qmul = qscale << 1;
                let qadd = if params.h263_aic {
                    0
                } else {
                    block[0] = (i32::from(block[0]) * params.dc_scale(n)) as i16;
                    (qscale - 1) | 1
                };
                for c in block.iter_mut().skip(1) {
                    let level = i32::from(*c);
                    if level != 0 {
                        *c = signed(level, |l| l * qmul + qadd) as i16;
                    }
                }
            }
        }
    }

    fn unquantize_inter(
        &self,
        variant: DequantVariant,
        params: &QuantParams,
        block: &mut [i16; 64],
        _n: usize,
        qscale: i32,
        last_index: i32,
    ) {
        if last_index < 0 {
            return;
        }
        match variant {
            DequantVariant::Mpeg1 => {
                for (i, c) in block.iter_mut().enumerate() {
                    let level = i32::from(*c);
                    if level != 0 {
                        let m = qscale * i32::from(params.inter_matrix[i]);
                        *c = signed(level, |l| (((((l << 1) + 1) * m) >> 4) - 1) | 1) as i16;
                    }
                }
            }
            DequantVariant::Mpeg2 => {
                let q = params.mpeg2_qscale(qscale);
                let mut sum: i32 = -1;
                for (i, c) in block.iter_mut().enumerate() {
                    let level = i32::from(*c);
                    if level != 0 {
                        let m = q * i32::from(params.inter_matrix[i]);
                        let v = signed(level, |l| (((l << 1) + 1) * m) >> 5);
                        *c = v as i16;
                        sum += v;
                    }
                }
                // 失配控制
                block[63] ^= (sum & 1) as i16;
            }
            DequantVariant::H263 => {
                let qmul = qscale << 1;
                let qadd = (qscale - 1) | 1;
                for c in block.iter_mut() {
                    let level = i32::from(*c);
                    if level != 0 {
                        *c = signed(level, |l| l * qmul + qadd) as i16;
                    }
                }
            }
        }
    }
}
