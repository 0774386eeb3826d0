//! 整数 IDCT (基于 FFmpeg simple_idct 实现)
//!
//! 8-bit 精度, W 常量按 2^14 缩放, 兼容 IEEE 1180.
//! lowres 下的 4/2/1 点输出由 8x8 结果按块平均得到.

/// W 常量: cos(i*π/16) * √2 * 2^14
const W1: i64 = 22725;
const W2: i64 = 21407;
const W3: i64 = 19266;
const W4: i64 = 16383;
const W5: i64 = 12873;
const W6: i64 = 8867;
const W7: i64 = 4520;

const ROW_SHIFT: u32 = 11;
const COL_SHIFT: u32 = 20;
const DC_SHIFT: u32 = 3;

/// 反变换内核
pub trait InverseTransform: Send + Sync {
    /// 反变换后覆盖写入 `size` x `size` 目标块 (帧内)
    fn idct_put(&self, dst: &mut [u8], stride: usize, block: &mut [i16; 64], size: usize);

    /// 反变换后叠加到 `size` x `size` 目标块 (帧间残差)
    fn idct_add(&self, dst: &mut [u8], stride: usize, block: &mut [i16; 64], size: usize);
}

/// 整数 simple IDCT
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleIdct;

impl InverseTransform for SimpleIdct {
    fn idct_put(&self, dst: &mut [u8], stride: usize, block: &mut [i16; 64], size: usize) {
        let spatial = transform(block, size);
        for y in 0..size {
            for x in 0..size {
                dst[y * stride + x] = spatial[y * 8 + x].clamp(0, 255) as u8;
            }
        }
    }

    fn idct_add(&self, dst: &mut [u8], stride: usize, block: &mut [i16; 64], size: usize) {
        let spatial = transform(block, size);
        for y in 0..size {
            for x in 0..size {
                let d = &mut dst[y * stride + x];
                *d = (i32::from(*d) + spatial[y * 8 + x]).clamp(0, 255) as u8;
            }
        }
    }
}

/// 反变换并降采样到 `size`, 结果按 8 列行距存放; 系数块被清零
fn transform(block: &mut [i16; 64], size: usize) -> [i32; 64] {
    let mut work = [0i32; 64];
    for (w, c) in work.iter_mut().zip(block.iter()) {
        *w = i32::from(*c);
    }
    block.fill(0);
    idct_8x8(&mut work);

    let size = size.clamp(1, 8);
    if size == 8 {
        return work;
    }
    let factor = 8 / size;
    let area = (factor * factor) as i32;
    let mut out = [0i32; 64];
    for y in 0..size {
        for x in 0..size {
            let mut sum = 0;
            for dy in 0..factor {
                for dx in 0..factor {
                    sum += work[(y * factor + dy) * 8 + x * factor + dx];
                }
            }
            out[y * 8 + x] = (sum + area / 2).div_euclid(area);
        }
    }
    out
}

/// 8 点一维 IDCT 行变换
fn idct_row(block: &mut [i32; 64], row: usize) {
    let off = row * 8;
    let x = |i: usize| i64::from(block[off + i]);
    let (x0, x1, x2, x3) = (x(0), x(1), x(2), x(3));
    let (x4, x5, x6, x7) = (x(4), x(5), x(6), x(7));

    // AC 全零时只用 DC
    if x1 == 0 && x2 == 0 && x3 == 0 && x4 == 0 && x5 == 0 && x6 == 0 && x7 == 0 {
        let val = (x0 << DC_SHIFT) as i32;
        block[off..off + 8].fill(val);
        return;
    }

    let round = 1i64 << (ROW_SHIFT - 1);

    let mut a0 = W4 * x0 + round;
    let mut a1 = a0;
    let mut a2 = a0;
    let mut a3 = a0;

    a0 += W2 * x2;
    a1 += W6 * x2;
    a2 -= W6 * x2;
    a3 -= W2 * x2;

    if x4 != 0 || x6 != 0 {
        a0 += W4 * x4 + W6 * x6;
        a1 += -W4 * x4 - W2 * x6;
        a2 += -W4 * x4 + W2 * x6;
        a3 += W4 * x4 - W6 * x6;
    }

    let mut b0 = W1 * x1 + W3 * x3;
    let mut b1 = W3 * x1 - W7 * x3;
    let mut b2 = W5 * x1 - W1 * x3;
    let mut b3 = W7 * x1 - W5 * x3;

    if x5 != 0 || x7 != 0 {
        b0 += W5 * x5 + W7 * x7;
        b1 += -W1 * x5 - W5 * x7;
        b2 += W7 * x5 + W3 * x7;
        b3 += W3 * x5 - W1 * x7;
    }

    block[off] = ((a0 + b0) >> ROW_SHIFT) as i32;
    block[off + 1] = ((a1 + b1) >> ROW_SHIFT) as i32;
    block[off + 2] = ((a2 + b2) >> ROW_SHIFT) as i32;
    block[off + 3] = ((a3 + b3) >> ROW_SHIFT) as i32;
    block[off + 4] = ((a3 - b3) >> ROW_SHIFT) as i32;
    block[off + 5] = ((a2 - b2) >> ROW_SHIFT) as i32;
    block[off + 6] = ((a1 - b1) >> ROW_SHIFT) as i32;
    block[off + 7] = ((a0 - b0) >> ROW_SHIFT) as i32;
}

/// 8 点一维 IDCT 列变换
fn idct_col(block: &mut [i32; 64], col: usize) {
    let x = |i: usize| i64::from(block[col + i * 8]);
    let (x0, x1, x2, x3) = (x(0), x(1), x(2), x(3));
    let (x4, x5, x6, x7) = (x(4), x(5), x(6), x(7));

    if x1 == 0 && x2 == 0 && x3 == 0 && x4 == 0 && x5 == 0 && x6 == 0 && x7 == 0 {
        let val = ((x0 * W4 + (1i64 << (COL_SHIFT - 1))) >> COL_SHIFT) as i32;
        for i in 0..8 {
            block[col + i * 8] = val;
        }
        return;
    }

    let col_round = 1i64 << (COL_SHIFT - 1);

    let mut a0 = W4 * x0 + col_round;
    let mut a1 = a0;
    let mut a2 = a0;
    let mut a3 = a0;

    a0 += W2 * x2;
    a1 += W6 * x2;
    a2 -= W6 * x2;
    a3 -= W2 * x2;

    if x4 != 0 {
        a0 += W4 * x4;
        a1 -= W4 * x4;
        a2 -= W4 * x4;
        a3 += W4 * x4;
    }

    if x6 != 0 {
        a0 += W6 * x6;
        a1 -= W2 * x6;
        a2 += W2 * x6;
        a3 -= W6 * x6;
    }

    let mut b0 = W1 * x1 + W3 * x3;
    let mut b1 = W3 * x1 - W7 * x3;
    let mut b2 = W5 * x1 - W1 * x3;
    let mut b3 = W7 * x1 - W5 * x3;

    if x5 != 0 {
        b0 += W5 * x5;
        b1 -= W1 * x5;
        b2 += W7 * x5;
        b3 += W3 * x5;
    }

    if x7 != 0 {
        b0 += W7 * x7;
        b1 -= W5 * x7;
        b2 += W3 * x7;
        b3 -= W1 * x7;
    }

    block[col] = ((a0 + b0) >> COL_SHIFT) as i32;
    block[col + 8] = ((a1 + b1) >> COL_SHIFT) as i32;
    block[col + 16] = ((a2 + b2) >> COL_SHIFT) as i32;
    block[col + 24] = ((a3 + b3) >> COL_SHIFT) as i32;
    block[col + 32] = ((a3 - b3) >> COL_SHIFT) as i32;
    block[col + 40] = ((a2 - b2) >> COL_SHIFT) as i32;
    block[col + 48] = ((a1 - b1) >> COL_SHIFT) as i32;
    block[col + 56] = ((a0 - b0) >> COL_SHIFT) as i32;
}

/// 完整 8x8 IDCT (行+列)
fn idct_8x8(block: &mut [i32; 64]) {
    for row in 0..8 {
        idct_row(block, row);
    }
    for col in 0..8 {
        idct_col(block, col);
    }
}
