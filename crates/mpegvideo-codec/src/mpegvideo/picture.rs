//! 帧缓冲与缓冲池槽位.
//!
//! [`FrameBuffer`] 通过 `Arc` 在上下文之间共享: 最后一个持有者释放时缓冲随之回收.
//! 像素平面与宏块边表各由一把读写锁保护, 正在解码的帧写入, 引用它的帧读取,
//! 二者通过 [`DecodeProgress`] 协调可读的行范围.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};

use mpegvideo_core::pixel_format::ceil_rshift;
use mpegvideo_core::{MpvResult, PixelFormat};

use crate::frame::{PictureType, VideoFrame};

use super::progress::DecodeProgress;

/// 以 0 填充的方式分配长度为 `len` 的向量, 分配失败返回 `AllocationFailure`
pub(crate) fn alloc_zeroed<T: Clone + Default>(len: usize) -> MpvResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.resize(len, T::default());
    Ok(v)
}

/// 帧缓冲的尺寸描述 (同一上下文在两次尺寸变化之间分配的所有帧共享)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameGeometry {
    /// 编码宽度 (全分辨率)
    pub width: u32,
    /// 编码高度 (全分辨率)
    pub height: u32,
    /// 像素格式
    pub pixel_format: PixelFormat,
    /// 色度水平位移
    pub chroma_x_shift: u32,
    /// 色度垂直位移
    pub chroma_y_shift: u32,
    /// 宏块列数
    pub mb_width: usize,
    /// 宏块行数
    pub mb_height: usize,
    /// 宏块表行距
    pub mb_stride: usize,
    /// 8x8 块表行距
    pub b8_stride: usize,
    /// 降分辨率级别
    pub lowres: u8,
}

impl FrameGeometry {
    /// 平面行距 (字节)
    pub fn linesize(&self, plane: usize) -> usize {
        let luma = (self.mb_width * 16) >> self.lowres;
        if plane == 0 {
            luma
        } else {
            luma >> self.chroma_x_shift
        }
    }

    /// 平面分配行数
    pub fn rows(&self, plane: usize) -> usize {
        let luma = (self.mb_height * 16) >> self.lowres;
        if plane == 0 {
            luma
        } else {
            luma >> self.chroma_y_shift
        }
    }

    /// 平面可见宽度
    pub fn visible_width(&self, plane: usize) -> usize {
        let w = ceil_rshift(self.width, u32::from(self.lowres));
        if plane == 0 {
            w as usize
        } else {
            ceil_rshift(w, self.chroma_x_shift) as usize
        }
    }

    /// 平面可见高度
    pub fn visible_height(&self, plane: usize) -> usize {
        let h = ceil_rshift(self.height, u32::from(self.lowres));
        if plane == 0 {
            h as usize
        } else {
            ceil_rshift(h, self.chroma_y_shift) as usize
        }
    }

    /// 宏块表长度
    pub fn mb_array_size(&self) -> usize {
        self.mb_stride * self.mb_height
    }
}

/// 三个像素平面
#[derive(Debug, Default)]
pub struct Planes {
    /// Y, Cb, Cr
    pub data: [Vec<u8>; 3],
    /// 各平面行距
    pub linesize: [usize; 3],
}

/// 每宏块边表
#[derive(Debug, Default)]
pub struct MbTables {
    /// 量化参数, 按 `mb_stride` 寻址
    pub qscale_table: Vec<i8>,
    /// 宏块类型位图
    pub mb_type: Vec<u32>,
    /// 每 8x8 块的运动向量 `[方向]`, 按 `b8_stride` 寻址
    pub motion_val: [Vec<[i16; 2]>; 2],
    /// 宏块表行距
    pub mb_stride: usize,
    /// 8x8 块表行距
    pub b8_stride: usize,
}

/// 共享的帧缓冲
#[derive(Debug)]
pub struct FrameBuffer {
    geometry: FrameGeometry,
    planes: RwLock<Planes>,
    tables: RwLock<MbTables>,
    progress: DecodeProgress,
}

impl FrameBuffer {
    /// 按几何描述分配帧缓冲, 像素初始化为 0
    pub fn allocate(geometry: &FrameGeometry) -> MpvResult<Arc<Self>> {
        let mut planes = Planes::default();
        for p in 0..3 {
            let linesize = geometry.linesize(p);
            planes.linesize[p] = linesize;
            planes.data[p] = alloc_zeroed(linesize * geometry.rows(p))?;
        }

        let mb_array = geometry.mb_array_size();
        let b8_array = geometry.b8_stride * (geometry.mb_height * 2 + 1);
        let tables = MbTables {
            qscale_table: alloc_zeroed(mb_array)?,
            mb_type: alloc_zeroed(mb_array)?,
            motion_val: [alloc_zeroed(b8_array)?, alloc_zeroed(b8_array)?],
            mb_stride: geometry.mb_stride,
            b8_stride: geometry.b8_stride,
        };

        Ok(Arc::new(Self {
            geometry: *geometry,
            planes: RwLock::new(planes),
            tables: RwLock::new(tables),
            progress: DecodeProgress::new(),
        }))
    }

    /// 尺寸描述
    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    /// 只读访问像素平面
    pub fn planes(&self) -> RwLockReadGuard<'_, Planes> {
        self.planes.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// 可写访问像素平面
    pub fn planes_mut(&self) -> RwLockWriteGuard<'_, Planes> {
        self.planes.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 只读访问宏块边表
    pub fn tables(&self) -> RwLockReadGuard<'_, MbTables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// 可写访问宏块边表
    pub fn tables_mut(&self) -> RwLockWriteGuard<'_, MbTables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 解码进度
    pub fn progress(&self) -> &DecodeProgress {
        &self.progress
    }

    /// 以常量填充亮度与色度平面
    pub fn fill(&self, luma: u8, chroma: u8) {
        let mut planes = self.planes_mut();
        planes.data[0].fill(luma);
        planes.data[1].fill(chroma);
        planes.data[2].fill(chroma);
    }

    /// 复制可见区域为输出帧
    pub fn to_video_frame(&self) -> VideoFrame {
        let g = &self.geometry;
        let planes = self.planes();
        let mut frame = VideoFrame::new(
            g.visible_width(0) as u32,
            g.visible_height(0) as u32,
            g.pixel_format,
        );
        frame.data = Vec::with_capacity(3);
        frame.linesize = Vec::with_capacity(3);
        for p in 0..3 {
            let w = g.visible_width(p);
            let h = g.visible_height(p);
            let stride = planes.linesize[p];
            let mut out = Vec::with_capacity(w * h);
            for row in planes.data[p].chunks(stride.max(1)).take(h) {
                out.extend_from_slice(&row[..w.min(row.len())]);
            }
            frame.data.push(out);
            frame.linesize.push(w);
        }
        frame
    }
}

/// 参考强度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReferenceKind {
    /// 非参考帧
    #[default]
    None,
    /// 短期参考帧
    ShortTerm,
}

/// 缓冲池中的一个槽位
#[derive(Debug, Clone, Default)]
pub struct Picture {
    /// 帧缓冲, `None` 表示槽位空闲
    pub buf: Option<Arc<FrameBuffer>>,
    /// 参考强度
    pub reference: ReferenceKind,
    /// 尺寸变化后必须重新分配
    pub needs_realloc: bool,
    /// 图片类型
    pub pict_type: PictureType,
    /// 关键帧
    pub key_frame: bool,
    /// 编码顺序编号
    pub coded_picture_number: u32,
    /// 以场对方式解码
    pub field_picture: bool,
    /// 顶场优先
    pub top_field_first: bool,
    /// 隔行帧
    pub interlaced: bool,
    /// 由解码器合成的哑帧, 不输出
    pub dummy: bool,
}

impl Picture {
    /// 槽位是否持有帧缓冲
    pub fn has_data(&self) -> bool {
        self.buf.is_some()
    }

    /// 是否为参考帧
    pub fn is_reference(&self) -> bool {
        self.reference != ReferenceKind::None
    }

    /// 帧缓冲 (克隆共享引用)
    pub fn buffer(&self) -> Option<Arc<FrameBuffer>> {
        self.buf.clone()
    }

    /// 释放槽位: 放弃缓冲引用并清空全部元数据
    pub fn unref(&mut self) {
        *self = Self::default();
    }

    /// 使本槽位引用 `src` 的缓冲与元数据
    pub fn ref_from(&mut self, src: &Picture) {
        self.clone_from(src);
    }

    /// 转为输出帧
    pub fn to_video_frame(&self) -> Option<VideoFrame> {
        let buf = self.buf.as_ref()?;
        let mut frame = buf.to_video_frame();
        frame.is_keyframe = self.key_frame;
        frame.picture_type = self.pict_type;
        frame.coded_picture_number = self.coded_picture_number;
        frame.interlaced = self.interlaced;
        frame.top_field_first = self.top_field_first;
        Some(frame)
    }
}
