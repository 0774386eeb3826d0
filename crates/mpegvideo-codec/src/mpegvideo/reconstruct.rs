//! 宏块重建: 运动补偿预测 + 残差.
//!
//! 帧间宏块先做前向 (写入) 与后向 (平均) 预测, 再把 `block_last_index >= 0` 的
//! 残差块经 IDCT 叠加到预测上. 帧内宏块直接写入 IDCT 结果.
//!
//! 块布局:
//! - 亮度 0..4, 2x2 排列
//! - 4:2:0 色度 4 (Cb), 5 (Cr)
//! - 4:2:2 额外 6, 7 位于下半
//! - 4:4:4 额外 8..12 位于右半

use log::{Level, debug, log_enabled};
use mpegvideo_core::{MpvError, MpvResult};

use crate::codec_id::{CodecId, OutputFormat};
use crate::config::DebugFlags;
use crate::frame::PictureType;

use super::MpegContext;
use super::picture::{FrameBuffer, Planes};
use super::pixel_ops::PixOp;
use super::types::{Macroblock, MvDir, MvType, PictureStructure};

/// 单个残差块的写入位置
struct BlockDest {
    plane: usize,
    offset: usize,
    stride: usize,
}

impl MpegContext {
    /// 重建一个宏块
    ///
    /// `blocks` 为解析器输出的系数块, 处理后被清零. 帧间宏块的预测方向与向量取自 `mb`.
    pub fn reconstruct_mb(&mut self, mb: &Macroblock, blocks: &mut [[i16; 64]; 12]) -> MpvResult<()> {
        self.check_mb_position(mb)?;
        let cur_idx = self
            .roles
            .current
            .ok_or_else(|| MpvError::InvalidData("重建前未开始图像".into()))?;
        let cur = self
            .pool
            .buffer(cur_idx)
            .ok_or_else(|| MpvError::InvalidData("当前图像没有帧缓冲".into()))?;
        self.mb_x = mb.mb_x;
        self.mb_y = mb.mb_y;

        if self.config.debug.contains(DebugFlags::DCT_COEFF) && log_enabled!(Level::Debug) {
            debug!("宏块 {}x{} 的 DCT 系数:", mb.mb_x, mb.mb_y);
            for block in blocks.iter().take(6) {
                let line: String = block.iter().map(|c| format!("{c:5}")).collect();
                debug!("{line}");
            }
        }

        let is_reference = self.pool.get(cur_idx).is_some_and(|p| p.is_reference());
        self.record_mb_tables(&cur, mb, is_reference);

        let is_mpeg12 = self.out_format == OutputFormat::Mpeg1;
        if !mb.mb_intra {
            if self.config.frame_threading() {
                self.await_references(&cur, mb);
            }

            let mut op = if self.config.lowres > 0
                || is_mpeg12
                || !self.no_rounding
                || self.pict_type == PictureType::B
            {
                PixOp::Put
            } else {
                PixOp::PutNoRound
            };
            if mb.mv_dir.contains(MvDir::FORWARD) {
                self.motion_compensate(mb, 0, op)?;
                op = PixOp::Avg;
            }
            if mb.mv_dir.contains(MvDir::BACKWARD) {
                self.motion_compensate(mb, 1, op)?;
            }

            // MPEG-1/2, MSMPEG4 与 H.263 量化的 MPEG-4 在解析时已完成反量化
            let dequant = !(is_mpeg12
                || self.config.codec_id.is_msmpeg4()
                || (self.config.codec_id == CodecId::Mpeg4 && !self.mpeg_quant));
            self.add_residual(&cur, mb, blocks, dequant)
        } else {
            self.put_intra(&cur, mb, blocks, !is_mpeg12)
        }
    }

    /// 写入当前图像的宏块边表与跳过表
    fn record_mb_tables(&mut self, cur: &FrameBuffer, mb: &Macroblock, is_reference: bool) {
        let mb_xy = mb.mb_y * self.mb_stride + mb.mb_x;
        {
            let mut tables = cur.tables_mut();
            if let Some(q) = tables.qscale_table.get_mut(mb_xy) {
                *q = mb.qscale.clamp(0, 127) as i8;
            }
            if let Some(t) = tables.mb_type.get_mut(mb_xy) {
                *t = mb.type_flags().bits();
            }
            let b8_stride = tables.b8_stride;
            for (dir, flag) in [(0, MvDir::FORWARD), (1, MvDir::BACKWARD)] {
                for i in 0..4 {
                    let xy = (2 * mb.mb_x + (i & 1)) + (2 * mb.mb_y + (i >> 1)) * b8_stride;
                    let mv = if mb.mb_intra || !mb.mv_dir.contains(flag) {
                        [0, 0]
                    } else if mb.mv_type == MvType::Mv8x8 {
                        [mb.mv[dir][i].x as i16, mb.mv[dir][i].y as i16]
                    } else {
                        [mb.mv[dir][0].x as i16, mb.mv[dir][0].y as i16]
                    };
                    if let Some(slot) = tables.motion_val[dir].get_mut(xy) {
                        *slot = mv;
                    }
                }
            }
        }

        if let Some(skip) = self.mbskip_table.get_mut(mb_xy) {
            *skip = if mb.skipped || !is_reference { 1 } else { 0 };
        }
    }

    /// 帧级并行时等待参考帧解码到所需的行
    fn await_references(&self, cur: &FrameBuffer, mb: &Macroblock) {
        for (dir, flag) in [(0, MvDir::FORWARD), (1, MvDir::BACKWARD)] {
            if !mb.mv_dir.contains(flag) {
                continue;
            }
            if let Some(reference) = self.reference_buffer(dir) {
                if std::ptr::eq(reference.as_ref(), cur) {
                    continue;
                }
                let row = self.lowest_referenced_row(mb, dir);
                reference.progress().wait_for(row as i32, 0);
            }
        }
    }

    /// 当前宏块的全部块写入位置
    fn block_layout(&self, cur: &FrameBuffer, mb: &Macroblock) -> Vec<(usize, BlockDest)> {
        let g = cur.geometry();
        let lowres = self.config.lowres;
        let block_size = 8usize >> lowres;
        let mb_size = 16usize >> lowres;
        let field_pic = usize::from(self.field_pic());
        let bottom = self.interlace.picture_structure == PictureStructure::BottomField;
        let (cx, cy) = (self.chroma_x_shift, self.chroma_y_shift);

        let row = self.mb_base_row(mb.mb_y) >> lowres;
        let col = mb.mb_x * mb_size;

        let linesize = g.linesize(0) << field_pic;
        let base_y = if bottom { g.linesize(0) } else { 0 };
        let dest_y = base_y + row * linesize + col;
        let dct_linesize = linesize << usize::from(mb.interlaced_dct);
        let dct_offset = if mb.interlaced_dct {
            linesize
        } else {
            linesize * block_size
        };

        let mut layout = vec![
            (0, BlockDest { plane: 0, offset: dest_y, stride: dct_linesize }),
            (1, BlockDest { plane: 0, offset: dest_y + block_size, stride: dct_linesize }),
            (2, BlockDest { plane: 0, offset: dest_y + dct_offset, stride: dct_linesize }),
            (
                3,
                BlockDest {
                    plane: 0,
                    offset: dest_y + dct_offset + block_size,
                    stride: dct_linesize,
                },
            ),
        ];

        if self.gray_only() {
            return layout;
        }

        let uvlinesize = g.linesize(1) << field_pic;
        let base_c = if bottom { g.linesize(1) } else { 0 };
        let dest_c = base_c + (row >> cy) * uvlinesize + (col >> cx);
        if cy > 0 {
            layout.push((4, BlockDest { plane: 1, offset: dest_c, stride: uvlinesize }));
            layout.push((5, BlockDest { plane: 2, offset: dest_c, stride: uvlinesize }));
        } else {
            let uv_dct_linesize = uvlinesize << usize::from(mb.interlaced_dct);
            let uv_dct_offset = if mb.interlaced_dct {
                uvlinesize
            } else {
                uvlinesize * block_size
            };
            let mut push = |n: usize, plane: usize, offset: usize| {
                layout.push((n, BlockDest { plane, offset, stride: uv_dct_linesize }));
            };
            push(4, 1, dest_c);
            push(5, 2, dest_c);
            push(6, 1, dest_c + uv_dct_offset);
            push(7, 2, dest_c + uv_dct_offset);
            if cx == 0 {
                push(8, 1, dest_c + block_size);
                push(9, 2, dest_c + block_size);
                push(10, 1, dest_c + block_size + uv_dct_offset);
                push(11, 2, dest_c + block_size + uv_dct_offset);
            }
        }
        layout
    }

    /// 叠加帧间残差
    fn add_residual(
        &self,
        cur: &FrameBuffer,
        mb: &Macroblock,
        blocks: &mut [[i16; 64]; 12],
        dequant: bool,
    ) -> MpvResult<()> {
        let block_size = 8usize >> self.config.lowres;
        let layout = self.block_layout(cur, mb);
        let mut planes = cur.planes_mut();
        for (n, dest) in layout {
            let last_index = mb.block_last_index[n];
            if last_index < 0 {
                continue;
            }
            let qscale = if n < 4 { mb.qscale } else { mb.chroma_qscale };
            let block = &mut blocks[n];
            if dequant {
                self.kernels.dequant.unquantize_inter(
                    self.dequant_variant,
                    &self.quant,
                    block,
                    n,
                    qscale,
                    last_index,
                );
            }
            let dst = block_target(&mut planes, &dest, block_size)?;
            self.kernels.idct.idct_add(dst, dest.stride, block, block_size);
        }
        Ok(())
    }

    /// 写入帧内块
    fn put_intra(
        &self,
        cur: &FrameBuffer,
        mb: &Macroblock,
        blocks: &mut [[i16; 64]; 12],
        dequant: bool,
    ) -> MpvResult<()> {
        let block_size = 8usize >> self.config.lowres;
        let layout = self.block_layout(cur, mb);
        let mut planes = cur.planes_mut();
        for (n, dest) in layout {
            let qscale = if n < 4 { mb.qscale } else { mb.chroma_qscale };
            let block = &mut blocks[n];
            if dequant {
                self.kernels.dequant.unquantize_intra(
                    self.dequant_variant,
                    &self.quant,
                    block,
                    n,
                    qscale,
                    mb.block_last_index[n],
                );
            }
            let dst = block_target(&mut planes, &dest, block_size)?;
            self.kernels.idct.idct_put(dst, dest.stride, block, block_size);
        }
        Ok(())
    }
}

/// 块目标切片, 越界时报错
fn block_target<'a>(planes: &'a mut Planes, dest: &BlockDest, size: usize) -> MpvResult<&'a mut [u8]> {
    let data = &mut planes.data[dest.plane];
    let end = dest.offset + (size - 1) * dest.stride + size;
    if end > data.len() {
        return Err(MpvError::InvalidData(format!(
            "残差块越界: 平面 {}, 偏移 {}",
            dest.plane, dest.offset
        )));
    }
    Ok(&mut data[dest.offset..])
}
