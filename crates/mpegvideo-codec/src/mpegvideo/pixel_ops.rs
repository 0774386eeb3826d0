//! 像素插值原语.
//!
//! 运动补偿引擎只依赖 [`PixelOps`] trait, 具体的滤波器由解码器注入.
//! [`BilinearPixelOps`] 是双线性参考实现: 半像素与 MPEG-1/2/H.263 的定义一致,
//! 四分之一像素与八分之一像素使用双线性加权.

/// 写入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixOp {
    /// 覆盖写入
    Put,
    /// 覆盖写入, 插值向下取整 (H.263/MPEG-4 rounding_control)
    PutNoRound,
    /// 与目标已有值取平均 (双向预测的第二个方向)
    Avg,
}

impl PixOp {
    /// 插值取整偏置: 取整时 0, 不取整时 1
    const fn rounding_bias(&self) -> u32 {
        match self {
            Self::PutNoRound => 1,
            _ => 0,
        }
    }

    #[inline]
    fn store(&self, dst: &mut u8, value: u32) {
        let v = value.min(255);
        *dst = match self {
            Self::Avg => ((u32::from(*dst) + v + 1) >> 1) as u8,
            _ => v as u8,
        };
    }
}

/// 插值原语集合
///
/// 所有函数从 `src` (行距 `src_stride`) 读取 `w` x `h` 块及其右侧一列与下方一行,
/// 结果按 `op` 写入 `dst` (行距 `dst_stride`).
#[allow(clippy::too_many_arguments)]
pub trait PixelOps: Send + Sync {
    /// 半像素插值, `dxy = (半像素 y << 1) | 半像素 x`
    fn hpel(
        &self,
        op: PixOp,
        dst: &mut [u8],
        dst_stride: usize,
        src: &[u8],
        src_stride: usize,
        w: usize,
        h: usize,
        dxy: usize,
    );

    /// 四分之一像素插值, `dxy = (y 相位 << 2) | x 相位`
    fn qpel(
        &self,
        op: PixOp,
        dst: &mut [u8],
        dst_stride: usize,
        src: &[u8],
        src_stride: usize,
        w: usize,
        h: usize,
        dxy: usize,
    );

    /// 八分之一像素双线性插值 (lowres 与色度), `x`, `y` 取值 0..8
    fn eighth_pel(
        &self,
        op: PixOp,
        dst: &mut [u8],
        dst_stride: usize,
        src: &[u8],
        src_stride: usize,
        w: usize,
        h: usize,
        x: u32,
        y: u32,
    );
}

/// 双线性参考实现
#[derive(Debug, Clone, Copy, Default)]
pub struct BilinearPixelOps;

impl BilinearPixelOps {
    /// 按四个角的权重 (总和为 `1 << shift`) 插值
    #[allow(clippy::too_many_arguments)]
    fn weighted(
        op: PixOp,
        dst: &mut [u8],
        dst_stride: usize,
        src: &[u8],
        src_stride: usize,
        w: usize,
        h: usize,
        fx: u32,
        fy: u32,
        shift: u32,
    ) {
        let one = 1u32 << (shift / 2);
        let (wa, wb) = ((one - fx) * (one - fy), fx * (one - fy));
        let (wc, wd) = ((one - fx) * fy, fx * fy);
        let round = (1u32 << (shift - 1)) - op.rounding_bias();
        for y in 0..h {
            let row = y * src_stride;
            for x in 0..w {
                let a = u32::from(src[row + x]);
                let b = if wb | wd != 0 { u32::from(src[row + x + 1]) } else { 0 };
                let (c, d) = if wc | wd != 0 {
                    let below = row + src_stride + x;
                    (
                        u32::from(src[below]),
                        if wd != 0 { u32::from(src[below + 1]) } else { 0 },
                    )
                } else {
                    (0, 0)
                };
                let v = (wa * a + wb * b + wc * c + wd * d + round) >> shift;
                op.store(&mut dst[y * dst_stride + x], v);
            }
        }
    }
}

impl PixelOps for BilinearPixelOps {
    fn hpel(
        &self,
        op: PixOp,
        dst: &mut [u8],
        dst_stride: usize,
        src: &[u8],
        src_stride: usize,
        w: usize,
        h: usize,
        dxy: usize,
    ) {
        let r = op.rounding_bias();
        for y in 0..h {
            let s = y * src_stride;
            for x in 0..w {
                let p00 = u32::from(src[s + x]);
                let v = match dxy & 3 {
                    0 => p00,
                    1 => (p00 + u32::from(src[s + x + 1]) + 1 - r) >> 1,
                    2 => (p00 + u32::from(src[s + src_stride + x]) + 1 - r) >> 1,
                    _ => {
                        let p01 = u32::from(src[s + x + 1]);
                        let p10 = u32::from(src[s + src_stride + x]);
                        let p11 = u32::from(src[s + src_stride + x + 1]);
                        (p00 + p01 + p10 + p11 + 2 - r) >> 2
                    }
                };
                op.store(&mut dst[y * dst_stride + x], v);
            }
        }
    }

    fn qpel(
        &self,
        op: PixOp,
        dst: &mut [u8],
        dst_stride: usize,
        src: &[u8],
        src_stride: usize,
        w: usize,
        h: usize,
        dxy: usize,
    ) {
        let fx = (dxy & 3) as u32;
        let fy = ((dxy >> 2) & 3) as u32;
        Self::weighted(op, dst, dst_stride, src, src_stride, w, h, fx, fy, 4);
    }

    fn eighth_pel(
        &self,
        op: PixOp,
        dst: &mut [u8],
        dst_stride: usize,
        src: &[u8],
        src_stride: usize,
        w: usize,
        h: usize,
        x: u32,
        y: u32,
    ) {
        Self::weighted(op, dst, dst_stride, src, src_stride, w, h, x & 7, y & 7, 6);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: [u8; 9] = [10, 20, 30, 40, 50, 60, 70, 80, 90];

    #[test]
    fn test_hpel_phases() {
        let ops = BilinearPixelOps;
        let mut dst = [0u8; 1];
        ops.hpel(PixOp::Put, &mut dst, 1, &SRC, 3, 1, 1, 0);
        assert_eq!(dst[0], 10);
        ops.hpel(PixOp::Put, &mut dst, 1, &SRC, 3, 1, 1, 1);
        assert_eq!(dst[0], 15);
        ops.hpel(PixOp::Put, &mut dst, 1, &SRC, 3, 1, 1, 2);
        assert_eq!(dst[0], 25);
        ops.hpel(PixOp::Put, &mut dst, 1, &SRC, 3, 1, 1, 3);
        assert_eq!(dst[0], 30);
    }

    #[test]
    fn test_no_round_truncates() {
        let ops = BilinearPixelOps;
        let src = [1u8, 2, 0, 0];
        let mut dst = [0u8; 1];
        ops.hpel(PixOp::Put, &mut dst, 1, &src, 2, 1, 1, 1);
        assert_eq!(dst[0], 2);
        ops.hpel(PixOp::PutNoRound, &mut dst, 1, &src, 2, 1, 1, 1);
        assert_eq!(dst[0], 1);
    }

    #[test]
    fn test_avg_combines_with_destination() {
        let ops = BilinearPixelOps;
        let mut dst = [100u8; 1];
        ops.hpel(PixOp::Avg, &mut dst, 1, &SRC, 3, 1, 1, 0);
        assert_eq!(dst[0], 55);
    }

    #[test]
    fn test_qpel_and_eighth_pel_agree_at_half() {
        let ops = BilinearPixelOps;
        let mut q = [0u8; 1];
        let mut e = [0u8; 1];
        let mut hp = [0u8; 1];
        ops.qpel(PixOp::Put, &mut q, 1, &SRC, 3, 1, 1, (2 << 2) | 2);
        ops.eighth_pel(PixOp::Put, &mut e, 1, &SRC, 3, 1, 1, 4, 4);
        ops.hpel(PixOp::Put, &mut hp, 1, &SRC, 3, 1, 1, 3);
        assert_eq!(q[0], 30);
        assert_eq!(e[0], 30);
        assert_eq!(hp[0], 30);
    }

    #[test]
    fn test_integer_phase_reads_only_block() {
        let ops = BilinearPixelOps;
        let src = [7u8; 4];
        let mut dst = [0u8; 4];
        ops.eighth_pel(PixOp::Put, &mut dst, 2, &src, 2, 2, 2, 0, 0);
        assert_eq!(dst, [7; 4]);
    }
}
