//! 运动补偿 (全分辨率).
//!
//! 每次块预测分两步: 先在参考帧的读锁下把源区域取入暂存区 (越界时走边缘模拟),
//! 释放读锁后再在当前帧的写锁下插值写入. 同一帧内的场间预测因此无需特殊处理.
//!
//! 坐标约定: 源与目标行号均以"视图行"表示. 帧图像中的场预测与场图像使用
//! 隔行视图 (行距加倍, 按 field_select 偏移一行).

use std::sync::Arc;

use log::{debug, trace};
use mpegvideo_core::{MpvError, MpvResult};

use crate::codec_id::OutputFormat;
use crate::config::BugFlags;
use crate::frame::PictureType;

use super::edge_emu::{EMU_ROWS, PlaneView, ScratchBuffers, fetch_block};
use super::picture::FrameBuffer;
use super::pixel_ops::PixOp;
use super::types::{Macroblock, MotionVector, MvType, PictureStructure};
use super::MpegContext;

/// H.263 4MV 色度向量取整表
const H263_CHROMA_ROUNDTAB: [i32; 16] = [0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2];

/// 四分之一像素色度向量修正表 (QPEL_CHROMA2 缺陷)
const QPEL_CHROMA2_RTAB: [i32; 8] = [0, 0, 1, 1, 0, 0, 0, 1];

/// 4MV 色度向量取整: 输入为四个亮度向量之和
pub(crate) fn h263_round_chroma(x: i32) -> i32 {
    H263_CHROMA_ROUNDTAB[(x & 0xf) as usize] + (x >> 3)
}

/// 插值方式与相位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interp {
    /// 半像素, dxy
    Hpel(usize),
    /// 四分之一像素, dxy
    Qpel(usize),
    /// 八分之一像素, (x, y)
    Eighth(u32, u32),
}

impl Interp {
    /// 插值额外读取的列数与行数
    fn margins(self) -> (usize, usize) {
        match self {
            Self::Hpel(dxy) => (dxy & 1, (dxy >> 1) & 1),
            Self::Qpel(dxy) => (usize::from(dxy & 3 != 0), usize::from(dxy & 12 != 0)),
            Self::Eighth(x, y) => (usize::from(x != 0), usize::from(y != 0)),
        }
    }
}

/// 场寻址参数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FieldSel {
    /// 帧图像中的场预测
    pub field_based: bool,
    /// 写入底场
    pub bottom_field: bool,
    /// 源场 (0 顶场, 1 底场)
    pub field_select: u8,
}

impl FieldSel {
    pub(crate) const FRAME: Self = Self {
        field_based: false,
        bottom_field: false,
        field_select: 0,
    };

    pub(crate) fn field(bottom_field: bool, field_select: u8) -> Self {
        Self {
            field_based: true,
            bottom_field,
            field_select,
        }
    }

    pub(crate) fn select(field_select: u8) -> Self {
        Self {
            field_select,
            ..Self::FRAME
        }
    }
}

/// 单个平面上的一次块预测
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockPred {
    pub plane: usize,
    pub view: PlaneView,
    pub x: i32,
    pub y: i32,
    pub w: usize,
    pub h: usize,
    pub interp: Interp,
    pub dst: usize,
    pub dst_stride: usize,
}

/// 一个宏块方向的运动补偿目标
pub(crate) struct McTarget<'a> {
    pub cur: &'a FrameBuffer,
    pub scratch: &'a mut ScratchBuffers,
    pub mb_x: usize,
    pub emulated: bool,
}

impl MpegContext {
    /// 对单个宏块的一个预测方向做运动补偿 (`dir` 0 为前向, 1 为后向)
    ///
    /// 预测结果按 `op` 写入当前图像的宏块位置. 全分辨率与 lowres 按配置分派.
    pub fn motion_compensate(&mut self, mb: &Macroblock, dir: usize, op: PixOp) -> MpvResult<()> {
        let cur = self
            .current_buffer()
            .ok_or_else(|| MpvError::InvalidData("运动补偿前未开始图像".into()))?;
        self.check_mb_position(mb)?;
        let mut scratch = self.take_scratch(mb.mb_y)?;
        let mut target = McTarget {
            cur: &cur,
            scratch: &mut scratch,
            mb_x: mb.mb_x,
            emulated: false,
        };
        let result = if self.config.lowres > 0 {
            self.mpv_motion_lowres(&mut target, mb, dir, op)
        } else {
            self.mpv_motion(&mut target, mb, dir, op)
        };
        if target.emulated && self.out_format == OutputFormat::Mpeg1 {
            debug!(
                "MPEG 运动向量越界: 宏块 ({}, {}), 方向 {dir}, 已做边缘模拟",
                mb.mb_x, mb.mb_y
            );
        }
        self.restore_scratch(mb.mb_y, scratch);
        result
    }

    /// 宏块位置校验
    pub(crate) fn check_mb_position(&self, mb: &Macroblock) -> MpvResult<()> {
        if mb.mb_x >= self.mb_width || mb.mb_y >= self.mb_height {
            return Err(MpvError::InvalidData(format!(
                "宏块位置越界: ({}, {}), 图像 {}x{} 宏块",
                mb.mb_x, mb.mb_y, self.mb_width, self.mb_height
            )));
        }
        Ok(())
    }

    /// 取出 `mb_y` 所属条带的暂存区, 条带尚未分配时临时分配
    pub(crate) fn take_scratch(&mut self, mb_y: usize) -> MpvResult<ScratchBuffers> {
        let linesize = self.linesize.max(16);
        let owned = self
            .slice_contexts
            .iter_mut()
            .find(|sc| (sc.start_mb_y..sc.end_mb_y).contains(&mb_y))
            .and_then(|sc| sc.scratch.take());
        match owned {
            Some(scratch) if scratch.fits(linesize) => Ok(scratch),
            _ => {
                trace!("条带暂存区缺失或过小, 按行距 {linesize} 重新分配");
                ScratchBuffers::alloc(linesize)
            }
        }
    }

    /// 归还暂存区
    pub(crate) fn restore_scratch(&mut self, mb_y: usize, scratch: ScratchBuffers) {
        if let Some(sc) = self
            .slice_contexts
            .iter_mut()
            .find(|sc| (sc.start_mb_y..sc.end_mb_y).contains(&mb_y))
        {
            sc.scratch = Some(scratch);
        }
    }

    /// 宏块在当前图像视图中的亮度起始行 (场图像按场行计)
    pub(crate) fn mb_base_row(&self, mb_y: usize) -> usize {
        if self.field_pic() {
            (mb_y >> 1) * 16
        } else {
            mb_y * 16
        }
    }

    /// 参考帧平面视图, 边缘位置按 lowres, 色度位移与场寻址缩放
    pub(crate) fn source_view(&self, buf: &FrameBuffer, plane: usize, fs: FieldSel) -> PlaneView {
        let g = buf.geometry();
        let linesize = g.linesize(plane);
        let shift = usize::from(self.field_pic()) + usize::from(fs.field_based);
        let lowres = u32::from(self.config.lowres);
        let (cx, cy) = if plane == 0 {
            (0, 0)
        } else {
            (self.chroma_x_shift, self.chroma_y_shift)
        };
        let width = ((self.h_edge_pos >> lowres) >> cx).min(linesize as i32);
        let height = (((self.v_edge_pos >> lowres) >> cy) >> shift).min((g.rows(plane) >> shift) as i32);
        PlaneView {
            offset: usize::from(fs.field_select & 1) * linesize,
            stride: linesize << shift,
            width,
            height,
        }
    }

    /// 当前图像中 (row, col) 的目标偏移与行距 (坐标以平面视图计)
    pub(crate) fn dest_offset(
        &self,
        buf: &FrameBuffer,
        plane: usize,
        bottom_field: bool,
        field_based: bool,
        row: usize,
        col: usize,
    ) -> (usize, usize) {
        let linesize = buf.geometry().linesize(plane);
        let shift = usize::from(self.field_pic()) + usize::from(field_based);
        let stride = linesize << shift;
        let bottom = self.interlace.picture_structure == PictureStructure::BottomField || bottom_field;
        let base = if bottom { linesize } else { 0 };
        (base + row * stride + col, stride)
    }

    /// 执行一次块预测, 边缘模拟记录在 `target.emulated`
    pub(crate) fn predict_block(
        &self,
        target: &mut McTarget<'_>,
        src: &FrameBuffer,
        op: PixOp,
        blk: &BlockPred,
    ) -> MpvResult<()> {
        if blk.w == 0 || blk.h == 0 {
            return Ok(());
        }
        let (mx, my) = blk.interp.margins();
        let (fw, fh) = (blk.w + mx, blk.h + my);
        let stride = target.scratch.stride();
        if fw > stride || fh > EMU_ROWS {
            return Err(MpvError::Internal(format!(
                "预测块 {fw}x{fh} 超出暂存区 {stride}x{EMU_ROWS}"
            )));
        }

        // 读锁内取块, 读锁在写入当前帧前释放
        let emulated = {
            let planes = src.planes();
            fetch_block(
                self.kernels.edge_emu.as_ref(),
                target.scratch.plane_mut(blk.plane),
                stride,
                &planes.data[blk.plane],
                &blk.view,
                blk.x,
                blk.y,
                fw,
                fh,
            )
        };
        target.emulated |= emulated;

        let mut planes = target.cur.planes_mut();
        let data = &mut planes.data[blk.plane];
        if blk.dst + (blk.h - 1) * blk.dst_stride + blk.w > data.len() {
            return Err(MpvError::InvalidData(format!(
                "预测目标越界: 平面 {}, 偏移 {}",
                blk.plane, blk.dst
            )));
        }
        let dst = &mut data[blk.dst..];
        let s = target.scratch.plane(blk.plane);
        let ops = self.kernels.pixel_ops.as_ref();
        match blk.interp {
            Interp::Hpel(dxy) => ops.hpel(op, dst, blk.dst_stride, s, stride, blk.w, blk.h, dxy),
            Interp::Qpel(dxy) => ops.qpel(op, dst, blk.dst_stride, s, stride, blk.w, blk.h, dxy),
            Interp::Eighth(x, y) => {
                ops.eighth_pel(op, dst, blk.dst_stride, s, stride, blk.w, blk.h, x, y)
            }
        }
        Ok(())
    }

    /// 构造一次块预测
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn block(
        &self,
        target: &McTarget<'_>,
        src: &FrameBuffer,
        plane: usize,
        fs: FieldSel,
        (x, y): (i32, i32),
        (w, h): (usize, usize),
        interp: Interp,
        (dst_row, dst_col): (usize, usize),
    ) -> BlockPred {
        let (dst, dst_stride) =
            self.dest_offset(target.cur, plane, fs.bottom_field, fs.field_based, dst_row, dst_col);
        BlockPred {
            plane,
            view: self.source_view(src, plane, fs),
            x,
            y,
            w,
            h,
            interp,
            dst,
            dst_stride,
        }
    }

    /// 方向 `dir` 的参考帧, 缺失时报错
    pub(crate) fn require_reference(&self, dir: usize) -> MpvResult<Arc<FrameBuffer>> {
        self.reference_buffer(dir)
            .ok_or_else(|| MpvError::InvalidData(format!("缺少方向 {dir} 的参考帧")))
    }

    /// 场图像中按 field_select 选择源: 第二场的非 B 预测引用相反奇偶场时取当前帧
    pub(crate) fn field_source(
        &self,
        dir: usize,
        field_select: u8,
    ) -> MpvResult<Arc<FrameBuffer>> {
        let reference = self.reference_buffer(dir);
        if !self.field_pic() {
            return reference.ok_or_else(|| MpvError::InvalidData(format!("缺少方向 {dir} 的参考帧")));
        }
        let same_parity = self.interlace.picture_structure as u8 == field_select + 1;
        match reference {
            Some(r) if same_parity || self.pict_type == PictureType::B || self.interlace.first_field => {
                Ok(r)
            }
            _ => self
                .current_buffer()
                .ok_or_else(|| MpvError::Internal("当前图像缺失".into())),
        }
    }

    /// 全分辨率运动补偿分派 (对标 ff_mpv_motion)
    fn mpv_motion(
        &self,
        target: &mut McTarget<'_>,
        mb: &Macroblock,
        dir: usize,
        op: PixOp,
    ) -> MpvResult<()> {
        let is_mpeg12 = self.out_format == OutputFormat::Mpeg1;
        let mvs = &mb.mv[dir];
        let fsel = &mb.field_select[dir];
        let base_row = self.mb_base_row(mb.mb_y);

        match mb.mv_type {
            MvType::Mv16x16 if self.field_pic() => self.field_picture_motion(target, mb, dir, op),
            MvType::Mv16x16 => {
                let src = self.require_reference(dir)?;
                if mb.mcsel {
                    return Err(MpvError::Unsupported("全局运动补偿".into()));
                }
                if !is_mpeg12 && self.quarter_sample {
                    self.qpel_motion(target, &src, op, FieldSel::FRAME, mvs[0], 16, mb.mb_y)
                } else {
                    self.mpeg_motion(target, &src, op, FieldSel::FRAME, mvs[0], 16, base_row, base_row)
                }
            }
            MvType::Mv8x8 => {
                if is_mpeg12 {
                    return Err(MpvError::InvalidData("MPEG-1/2 不支持 8x8 运动向量".into()));
                }
                let src = self.require_reference(dir)?;
                self.apply_8x8(target, &src, op, mvs, mb.mb_y, base_row)
            }
            MvType::Field if !self.field_pic() => {
                let src = self.require_reference(dir)?;
                let row = mb.mb_y * 8;
                for i in 0..2 {
                    let fs = FieldSel::field(i == 1, fsel[i]);
                    if !is_mpeg12 && self.quarter_sample {
                        self.qpel_motion(target, &src, op, fs, mvs[i], 8, mb.mb_y)?;
                    } else {
                        self.mpeg_motion(target, &src, op, fs, mvs[i], 8, row, row)?;
                    }
                }
                Ok(())
            }
            MvType::Field => self.field_picture_motion(target, mb, dir, op),
            MvType::Mv16x8 => {
                for i in 0..2 {
                    let src = self.field_source(dir, fsel[i])?;
                    let mv = MotionVector::new(mvs[i].x, mvs[i].y + 16 * i as i32);
                    self.mpeg_motion(
                        target,
                        &src,
                        op,
                        FieldSel::select(fsel[i]),
                        mv,
                        8,
                        base_row,
                        base_row + 8 * i,
                    )?;
                }
                Ok(())
            }
            MvType::DualPrime if !self.field_pic() => {
                let src = self.require_reference(dir)?;
                let row = mb.mb_y * 8;
                let mut op = op;
                for i in 0..2 {
                    for j in 0..2 {
                        let fs = FieldSel::field(j == 1, (j ^ i) as u8);
                        self.mpeg_motion(target, &src, op, fs, mvs[2 * i + j], 8, row, row)?;
                    }
                    op = PixOp::Avg;
                }
                Ok(())
            }
            MvType::DualPrime => {
                let current = self
                    .current_buffer()
                    .ok_or_else(|| MpvError::Internal("当前图像缺失".into()))?;
                let mut src = self.reference_buffer(dir).unwrap_or_else(|| current.clone());
                let mut op = op;
                for i in 0..2u8 {
                    let fs = FieldSel::select(u8::from(self.interlace.picture_structure as u8 != i + 1));
                    let mv = mvs[2 * usize::from(i)];
                    self.mpeg_motion(target, &src, op, fs, mv, 16, base_row, base_row)?;
                    op = PixOp::Avg;
                    // 第二场中相反奇偶场总在当前帧内
                    if !self.interlace.first_field {
                        src = current.clone();
                    }
                }
                Ok(())
            }
        }
    }

    /// 场图像的单向量场预测
    fn field_picture_motion(
        &self,
        target: &mut McTarget<'_>,
        mb: &Macroblock,
        dir: usize,
        op: PixOp,
    ) -> MpvResult<()> {
        let field_select = mb.field_select[dir][0];
        let src = self.field_source(dir, field_select)?;
        let row = self.mb_base_row(mb.mb_y);
        let fs = FieldSel::select(field_select);
        self.mpeg_motion(target, &src, op, fs, mb.mv[dir][0], 16, row, row)
    }

    /// 半像素运动补偿, 三个分量 (对标 mpeg_motion_internal)
    ///
    /// `src_row` 为宏块在源视图中的起始行, `dst_row` 为目标视图中的起始行.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn mpeg_motion(
        &self,
        target: &mut McTarget<'_>,
        src: &FrameBuffer,
        op: PixOp,
        fs: FieldSel,
        mv: MotionVector,
        h: usize,
        src_row: usize,
        dst_row: usize,
    ) -> MpvResult<()> {
        let is_mpeg12 = self.out_format == OutputFormat::Mpeg1;
        let (mx, my) = (mv.x, mv.y);
        let mb_x = target.mb_x as i32;
        let row = src_row as i32;

        let dxy = (((my & 1) << 1) | (mx & 1)) as usize;
        let src_x = mb_x * 16 + (mx >> 1);
        let src_y = row + (my >> 1);

        let (uvdxy, uvsrc_x, uvsrc_y) = if !is_mpeg12 && self.out_format == OutputFormat::H263 {
            if self.workaround_bugs.contains(BugFlags::HPEL_CHROMA) && fs.field_based {
                let cmx = (mx >> 1) | (mx & 1);
                let cmy = my >> 1;
                let uvdxy = (((cmy & 1) << 1) | (cmx & 1)) as usize;
                (uvdxy, mb_x * 8 + (cmx >> 1), (row >> 1) + (cmy >> 1))
            } else {
                let uvdxy = dxy | (my & 2) as usize | ((mx & 2) >> 1) as usize;
                (uvdxy, src_x >> 1, src_y >> 1)
            }
        } else if !is_mpeg12 && self.out_format == OutputFormat::H261 {
            // H.261 色度向量为整像素
            (0, mb_x * 8 + mx / 4, (row >> 1) + my / 4)
        } else if self.chroma_y_shift > 0 {
            let (cmx, cmy) = (mx / 2, my / 2);
            let uvdxy = (((cmy & 1) << 1) | (cmx & 1)) as usize;
            (uvdxy, mb_x * 8 + (cmx >> 1), (row >> 1) + (cmy >> 1))
        } else if self.chroma_x_shift > 0 {
            let cmx = mx / 2;
            let uvdxy = (((my & 1) << 1) | (cmx & 1)) as usize;
            (uvdxy, mb_x * 8 + (cmx >> 1), src_y)
        } else {
            (dxy, src_x, src_y)
        };

        let luma = self.block(
            target,
            src,
            0,
            fs,
            (src_x, src_y),
            (16, h),
            Interp::Hpel(dxy),
            (dst_row, target.mb_x * 16),
        );
        self.predict_block(target, src, op, &luma)?;

        if !self.gray_only() {
            let (cx, cy) = (self.chroma_x_shift, self.chroma_y_shift);
            for plane in 1..3 {
                let chroma = self.block(
                    target,
                    src,
                    plane,
                    fs,
                    (uvsrc_x, uvsrc_y),
                    (16 >> cx, h >> cy),
                    Interp::Hpel(uvdxy),
                    (dst_row >> cy, (target.mb_x * 16) >> cx),
                );
                self.predict_block(target, src, op, &chroma)?;
            }
        }
        Ok(())
    }

    /// 四分之一像素运动补偿 (帧图像)
    #[allow(clippy::too_many_arguments)]
    fn qpel_motion(
        &self,
        target: &mut McTarget<'_>,
        src: &FrameBuffer,
        op: PixOp,
        fs: FieldSel,
        mv: MotionVector,
        h: usize,
        mb_y: usize,
    ) -> MpvResult<()> {
        let (mx, my) = (mv.x, mv.y);
        let mb_x = target.mb_x as i32;
        let row = ((mb_y * 16) >> usize::from(fs.field_based)) as i32;

        let dxy = (((my & 3) << 2) | (mx & 3)) as usize;
        let src_x = mb_x * 16 + (mx >> 2);
        let src_y = row + (my >> 2);

        let (mut cmx, mut cmy) = if fs.field_based {
            (mx / 2, my >> 1)
        } else if self.workaround_bugs.contains(BugFlags::QPEL_CHROMA2) {
            (
                (mx >> 1) + QPEL_CHROMA2_RTAB[(mx & 7) as usize],
                (my >> 1) + QPEL_CHROMA2_RTAB[(my & 7) as usize],
            )
        } else if self.workaround_bugs.contains(BugFlags::QPEL_CHROMA) {
            ((mx >> 1) | (mx & 1), (my >> 1) | (my & 1))
        } else {
            (mx / 2, my / 2)
        };
        cmx = (cmx >> 1) | (cmx & 1);
        cmy = (cmy >> 1) | (cmy & 1);
        let uvdxy = ((cmx & 1) | ((cmy & 1) << 1)) as usize;
        cmx >>= 1;
        cmy >>= 1;
        let uvsrc_x = mb_x * 8 + cmx;
        let uvsrc_y = (row >> 1) + cmy;

        let dst_row = row as usize;
        let dst_col = target.mb_x * 16;
        if fs.field_based {
            // 场模式按两个 8 像素宽的块分别插值
            for half in 0..2 {
                let luma = self.block(
                    target,
                    src,
                    0,
                    fs,
                    (src_x + 8 * half, src_y),
                    (8, h),
                    Interp::Qpel(dxy),
                    (dst_row, dst_col + 8 * half as usize),
                );
                self.predict_block(target, src, op, &luma)?;
            }
        } else {
            let luma = self.block(
                target,
                src,
                0,
                fs,
                (src_x, src_y),
                (16, h),
                Interp::Qpel(dxy),
                (dst_row, dst_col),
            );
            self.predict_block(target, src, op, &luma)?;
        }

        if !self.gray_only() {
            for plane in 1..3 {
                let chroma = self.block(
                    target,
                    src,
                    plane,
                    fs,
                    (uvsrc_x, uvsrc_y),
                    (8, h >> 1),
                    Interp::Hpel(uvdxy),
                    (dst_row >> 1, target.mb_x * 8),
                );
                self.predict_block(target, src, op, &chroma)?;
            }
        }
        Ok(())
    }

    /// 四个 8x8 亮度向量与一个合成色度向量
    fn apply_8x8(
        &self,
        target: &mut McTarget<'_>,
        src: &FrameBuffer,
        op: PixOp,
        mvs: &[MotionVector; 4],
        mb_y: usize,
        base_row: usize,
    ) -> MpvResult<()> {
        let width = self.width as i32;
        let height = self.height as i32;
        let mb_x = target.mb_x as i32;
        let row = base_row as i32;
        let (mut sum_x, mut sum_y) = (0i32, 0i32);
        trace!("4MV 预测: 宏块 ({}, {mb_y})", target.mb_x);

        for (i, mv) in mvs.iter().enumerate() {
            let (bx, by) = ((i & 1) as i32 * 8, (i >> 1) as i32 * 8);
            let (mut src_x, mut src_y, interp);
            if self.quarter_sample {
                let mut dxy = (((mv.y & 3) << 2) | (mv.x & 3)) as usize;
                src_x = (mb_x * 16 + (mv.x >> 2) + bx).clamp(-16, width);
                if src_x == width {
                    dxy &= !3;
                }
                src_y = (row + (mv.y >> 2) + by).clamp(-16, height);
                if src_y == height {
                    dxy &= !12;
                }
                interp = Interp::Qpel(dxy);
                sum_x += mv.x / 2;
                sum_y += mv.y / 2;
            } else {
                let mut dxy = 0usize;
                src_x = (mb_x * 16 + bx + (mv.x >> 1)).clamp(-16, width);
                if src_x != width {
                    dxy |= (mv.x & 1) as usize;
                }
                src_y = (row + by + (mv.y >> 1)).clamp(-16, height);
                if src_y != height {
                    dxy |= ((mv.y & 1) << 1) as usize;
                }
                interp = Interp::Hpel(dxy);
                sum_x += mv.x;
                sum_y += mv.y;
            }
            let luma = self.block(
                target,
                src,
                0,
                FieldSel::FRAME,
                (src_x, src_y),
                (8, 8),
                interp,
                (base_row + by as usize, target.mb_x * 16 + bx as usize),
            );
            self.predict_block(target, src, op, &luma)?;
        }

        if !self.gray_only() {
            self.chroma_4mv_motion(target, src, op, sum_x, sum_y, base_row)?;
        }
        Ok(())
    }

    /// 4MV 的合成色度预测
    fn chroma_4mv_motion(
        &self,
        target: &mut McTarget<'_>,
        src: &FrameBuffer,
        op: PixOp,
        mx: i32,
        my: i32,
        base_row: usize,
    ) -> MpvResult<()> {
        let mx = h263_round_chroma(mx);
        let my = h263_round_chroma(my);
        let mut dxy = (((my & 1) << 1) | (mx & 1)) as usize;
        let (mx, my) = (mx >> 1, my >> 1);

        let half_w = (self.width >> 1) as i32;
        let half_h = (self.height >> 1) as i32;
        let src_x = (target.mb_x as i32 * 8 + mx).clamp(-8, half_w);
        if src_x == half_w {
            dxy &= !1;
        }
        let src_y = ((base_row >> 1) as i32 + my).clamp(-8, half_h);
        if src_y == half_h {
            dxy &= !2;
        }

        for plane in 1..3 {
            let chroma = self.block(
                target,
                src,
                plane,
                FieldSel::FRAME,
                (src_x, src_y),
                (8, 8),
                Interp::Hpel(dxy),
                (base_row >> 1, target.mb_x * 8),
            );
            self.predict_block(target, src, op, &chroma)?;
        }
        Ok(())
    }

    /// 方向 `dir` 的向量所引用的参考帧最低宏块行 (帧级并行等待用)
    ///
    /// 只对帧图像中的 16x16, 16x8 与 8x8 向量计算, 其余情形保守地返回最后一行.
    pub fn lowest_referenced_row(&self, mb: &Macroblock, dir: usize) -> usize {
        let last_row = self.mb_height.saturating_sub(1);
        if self.field_pic() || mb.mcsel {
            return last_row;
        }
        let mvs = match mb.mv_type {
            MvType::Mv16x16 => 1,
            MvType::Mv16x8 => 2,
            MvType::Mv8x8 => 4,
            _ => return last_row,
        };
        let (min, max) = mb.mv[dir][..mvs]
            .iter()
            .fold((i32::MAX, i32::MIN), |(lo, hi), mv| (lo.min(mv.y), hi.max(mv.y)));
        let qpel_shift = u32::from(!self.quarter_sample);
        let off = ((min.saturating_neg().max(max) << qpel_shift) + 63) >> 6;
        (mb.mb_y as i32 + off).clamp(0, last_row as i32) as usize
    }
}
