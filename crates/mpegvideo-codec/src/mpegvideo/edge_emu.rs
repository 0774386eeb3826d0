//! 边缘模拟与运动补偿暂存区.
//!
//! 运动向量可以指向图像外部. 越界时源区域先经 [`EdgeEmulator`] 复制到暂存区,
//! 越界坐标钳位到平面边缘; 未越界时直接复制. 之后的插值只读暂存区,
//! 因此参考帧与当前帧为同一缓冲时也不会出现读写重叠.

use mpegvideo_core::MpvResult;

use super::picture::alloc_zeroed;

/// 暂存区每个平面的行数 (最大块高 17, 外加场寻址余量)
pub(crate) const EMU_ROWS: usize = 20;

/// 源平面中的一个可寻址视图 (整帧或单场)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneView {
    /// 视图第 0 行在平面数据中的偏移
    pub offset: usize,
    /// 视图行距
    pub stride: usize,
    /// 有效宽度 (边缘位置)
    pub width: i32,
    /// 有效行数 (边缘位置)
    pub height: i32,
}

impl PlaneView {
    /// 视图中 (x, y) 的数据下标, 调用方保证坐标位于视图内
    fn index(&self, x: usize, y: usize) -> usize {
        self.offset + y * self.stride + x
    }
}

/// 边缘模拟器
pub trait EdgeEmulator: Send + Sync {
    /// 将视图中以 (x, y) 为左上角的 `block_w` x `block_h` 区域复制到 `dst`,
    /// 视图外的采样取最近的边缘采样
    #[allow(clippy::too_many_arguments)]
    fn emulate(
        &self,
        dst: &mut [u8],
        dst_stride: usize,
        src: &[u8],
        view: &PlaneView,
        x: i32,
        y: i32,
        block_w: usize,
        block_h: usize,
    );
}

/// 钳位式边缘模拟
#[derive(Debug, Clone, Copy, Default)]
pub struct ClampingEdgeEmulator;

impl EdgeEmulator for ClampingEdgeEmulator {
    fn emulate(
        &self,
        dst: &mut [u8],
        dst_stride: usize,
        src: &[u8],
        view: &PlaneView,
        x: i32,
        y: i32,
        block_w: usize,
        block_h: usize,
    ) {
        let max_x = (view.width - 1).max(0);
        let max_y = (view.height - 1).max(0);
        for row in 0..block_h {
            let sy = (y + row as i32).clamp(0, max_y) as usize;
            let out = &mut dst[row * dst_stride..row * dst_stride + block_w];
            for (col, px) in out.iter_mut().enumerate() {
                let sx = (x + col as i32).clamp(0, max_x) as usize;
                *px = src[view.index(sx, sy)];
            }
        }
    }
}

/// 判断 `w` x `h` 的源区域 (已含插值余量) 是否越出视图
pub fn needs_emulation(view: &PlaneView, x: i32, y: i32, w: usize, h: usize) -> bool {
    x < 0 || y < 0 || x + w as i32 > view.width || y + h as i32 > view.height
}

/// 将源区域取入暂存区, 越界时走边缘模拟. 返回是否发生了模拟
#[allow(clippy::too_many_arguments)]
pub fn fetch_block(
    emu: &dyn EdgeEmulator,
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    view: &PlaneView,
    x: i32,
    y: i32,
    w: usize,
    h: usize,
) -> bool {
    if needs_emulation(view, x, y, w, h) {
        emu.emulate(dst, dst_stride, src, view, x, y, w, h);
        return true;
    }
    for row in 0..h {
        let s = view.index(x as usize, y as usize + row);
        dst[row * dst_stride..row * dst_stride + w].copy_from_slice(&src[s..s + w]);
    }
    false
}

/// 运动补偿暂存区 (行距随图像行距变化, 尺寸变化后重建)
#[derive(Debug, Clone)]
pub struct ScratchBuffers {
    stride: usize,
    edge_emu: Vec<u8>,
}

impl ScratchBuffers {
    /// 按图像亮度行距分配暂存区
    pub fn alloc(linesize: usize) -> MpvResult<Self> {
        let stride = Self::stride_for(linesize);
        Ok(Self {
            stride,
            edge_emu: alloc_zeroed(stride * EMU_ROWS * 3)?,
        })
    }

    /// 暂存区是否足够容纳行距为 `linesize` 的图像的取块
    pub fn fits(&self, linesize: usize) -> bool {
        self.stride >= Self::stride_for(linesize)
    }

    fn stride_for(linesize: usize) -> usize {
        (linesize + 64 + 31) & !31
    }

    /// 暂存区行距
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// 平面 `plane` 的暂存区域
    pub fn plane(&self, plane: usize) -> &[u8] {
        let size = self.stride * EMU_ROWS;
        &self.edge_emu[plane * size..(plane + 1) * size]
    }

    /// 平面 `plane` 的可写暂存区域
    pub fn plane_mut(&mut self, plane: usize) -> &mut [u8] {
        let size = self.stride * EMU_ROWS;
        &mut self.edge_emu[plane * size..(plane + 1) * size]
    }
}
