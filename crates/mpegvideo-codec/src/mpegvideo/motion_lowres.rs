//! 降分辨率 (lowres) 运动补偿.
//!
//! 以 `1 << lowres` 倍缩小解码. 向量精度按 lowres 降低, 余下的小数部分
//! 换算为八分之一像素相位交给 [`PixelOps::eighth_pel`](super::PixelOps::eighth_pel).
//! 四分之一像素向量先减半, 不使用四分之一像素插值.

use mpegvideo_core::{MpvError, MpvResult};

use crate::codec_id::OutputFormat;

use super::MpegContext;
use super::motion::{FieldSel, Interp, McTarget, h263_round_chroma};
use super::picture::FrameBuffer;
use super::pixel_ops::PixOp;
use super::types::{Macroblock, MotionVector, MvType};

/// 子像素相位换算为八分之一像素
fn eighth_phase(s: i32, lowres: u32) -> u32 {
    ((s << 2) >> lowres) as u32
}

impl MpegContext {
    fn lowres_params(&self) -> (u32, usize, i32) {
        let lowres = u32::from(self.config.lowres);
        let block_s = 8usize >> lowres;
        let s_mask = (2 << lowres) - 1;
        (lowres, block_s, s_mask)
    }

    /// lowres 运动补偿分派
    pub(super) fn mpv_motion_lowres(
        &self,
        target: &mut McTarget<'_>,
        mb: &Macroblock,
        dir: usize,
        op: PixOp,
    ) -> MpvResult<()> {
        let (lowres, block_s, _) = self.lowres_params();
        let mvs = &mb.mv[dir];
        let fsel = &mb.field_select[dir];
        let base_row = self.mb_base_row(mb.mb_y) >> lowres;

        match mb.mv_type {
            MvType::Mv16x16 if self.field_pic() => {
                let src = self.field_source(dir, fsel[0])?;
                let fs = FieldSel::select(fsel[0]);
                self.mpeg_motion_lowres(target, &src, op, fs, mvs[0], 2 * block_s, base_row, base_row)
            }
            MvType::Mv16x16 => {
                let src = self.require_reference(dir)?;
                self.mpeg_motion_lowres(
                    target,
                    &src,
                    op,
                    FieldSel::FRAME,
                    mvs[0],
                    2 * block_s,
                    base_row,
                    base_row,
                )
            }
            MvType::Mv8x8 => {
                let src = self.require_reference(dir)?;
                let (mut sum_x, mut sum_y) = (0, 0);
                for (i, mv) in mvs.iter().enumerate() {
                    self.hpel_motion_lowres(target, &src, op, i, *mv, base_row)?;
                    sum_x += mv.x;
                    sum_y += mv.y;
                }
                if !self.gray_only() {
                    self.chroma_4mv_motion_lowres(target, &src, op, sum_x, sum_y, base_row)?;
                }
                Ok(())
            }
            MvType::Field if !self.field_pic() => {
                let src = self.require_reference(dir)?;
                let row = (mb.mb_y * 8) >> lowres;
                for i in 0..2 {
                    let fs = FieldSel::field(i == 1, fsel[i]);
                    self.mpeg_motion_lowres(target, &src, op, fs, mvs[i], block_s, row, row)?;
                }
                Ok(())
            }
            MvType::Field => {
                let src = self.field_source(dir, fsel[0])?;
                let fs = FieldSel::select(fsel[0]);
                self.mpeg_motion_lowres(target, &src, op, fs, mvs[0], 2 * block_s, base_row, base_row)
            }
            MvType::Mv16x8 => {
                for i in 0..2 {
                    let src = self.field_source(dir, fsel[i])?;
                    // 下半块向下偏移 8 个全分辨率行
                    let mv = MotionVector::new(mvs[i].x, mvs[i].y + 16 * i as i32);
                    self.mpeg_motion_lowres(
                        target,
                        &src,
                        op,
                        FieldSel::select(fsel[i]),
                        mv,
                        block_s,
                        base_row,
                        base_row + block_s * i,
                    )?;
                }
                Ok(())
            }
            MvType::DualPrime if !self.field_pic() => {
                let src = self.require_reference(dir)?;
                let row = (mb.mb_y * 8) >> lowres;
                let mut op = op;
                for i in 0..2 {
                    for j in 0..2 {
                        let fs = FieldSel::field(j == 1, (j ^ i) as u8);
                        self.mpeg_motion_lowres(target, &src, op, fs, mvs[2 * i + j], block_s, row, row)?;
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
                    self.mpeg_motion_lowres(target, &src, op, fs, mv, 2 * block_s, base_row, base_row)?;
                    op = PixOp::Avg;
                    if !self.interlace.first_field {
                        src = current.clone();
                    }
                }
                Ok(())
            }
        }
    }

    /// lowres 下单个向量的三分量预测
    ///
    /// `h` 与行号均以 lowres 后的视图行计.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn mpeg_motion_lowres(
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
        let (lowres, block_s, s_mask) = self.lowres_params();
        let (mut mx, mut my) = (mv.x, mv.y);
        if self.quarter_sample {
            mx /= 2;
            my /= 2;
        }
        if fs.field_based {
            my += (i32::from(fs.bottom_field) - i32::from(fs.field_select)) * ((1 << lowres) - 1);
        }

        let mb_x = target.mb_x as i32;
        let bs = block_s as i32;
        let row = src_row as i32;
        let sx = mx & s_mask;
        let sy = my & s_mask;
        let src_x = mb_x * 2 * bs + (mx >> (lowres + 1));
        let src_y = row + (my >> (lowres + 1));

        let (uvsx, uvsy, uvsrc_x, uvsrc_y) = match self.out_format {
            OutputFormat::H263 => (
                ((mx >> 1) & s_mask) | (sx & 1),
                ((my >> 1) & s_mask) | (sy & 1),
                src_x >> 1,
                src_y >> 1,
            ),
            OutputFormat::H261 => {
                let (cmx, cmy) = (mx / 4, my / 4);
                (
                    (2 * cmx) & s_mask,
                    (2 * cmy) & s_mask,
                    mb_x * bs + (cmx >> lowres),
                    (row >> 1) + (cmy >> lowres),
                )
            }
            OutputFormat::Mpeg1 if self.chroma_y_shift > 0 => {
                let (cmx, cmy) = (mx / 2, my / 2);
                (
                    cmx & s_mask,
                    cmy & s_mask,
                    mb_x * bs + (cmx >> (lowres + 1)),
                    (row >> 1) + (cmy >> (lowres + 1)),
                )
            }
            OutputFormat::Mpeg1 if self.chroma_x_shift > 0 => {
                let cmx = mx / 2;
                (cmx & s_mask, my & s_mask, mb_x * bs + (cmx >> (lowres + 1)), src_y)
            }
            OutputFormat::Mpeg1 => (sx, sy, src_x, src_y),
        };

        let luma = self.block(
            target,
            src,
            0,
            fs,
            (src_x, src_y),
            (2 * block_s, h),
            Interp::Eighth(eighth_phase(sx, lowres), eighth_phase(sy, lowres)),
            (dst_row, target.mb_x * 2 * block_s),
        );
        self.predict_block(target, src, op, &luma)?;

        if !self.gray_only() {
            let (cx, cy) = (self.chroma_x_shift, self.chroma_y_shift);
            let hc = if cy > 0 {
                (h + 1 - usize::from(fs.bottom_field)) >> 1
            } else {
                h
            };
            if hc > 0 {
                let interp = Interp::Eighth(eighth_phase(uvsx, lowres), eighth_phase(uvsy, lowres));
                for plane in 1..3 {
                    let chroma = self.block(
                        target,
                        src,
                        plane,
                        fs,
                        (uvsrc_x, uvsrc_y),
                        ((2 * block_s) >> cx, hc),
                        interp,
                        (dst_row >> cy, (target.mb_x * 2 * block_s) >> cx),
                    );
                    self.predict_block(target, src, op, &chroma)?;
                }
            }
        }
        Ok(())
    }

    /// lowres 4MV 中的单个亮度块
    fn hpel_motion_lowres(
        &self,
        target: &mut McTarget<'_>,
        src: &FrameBuffer,
        op: PixOp,
        i: usize,
        mv: MotionVector,
        base_row: usize,
    ) -> MpvResult<()> {
        let (lowres, block_s, s_mask) = self.lowres_params();
        let (mut mx, mut my) = (mv.x, mv.y);
        if self.quarter_sample {
            mx /= 2;
            my /= 2;
        }
        let sx = mx & s_mask;
        let sy = my & s_mask;
        let col = (2 * target.mb_x + (i & 1)) * block_s;
        let row = base_row + (i >> 1) * block_s;
        let src_x = col as i32 + (mx >> (lowres + 1));
        let src_y = row as i32 + (my >> (lowres + 1));

        let luma = self.block(
            target,
            src,
            0,
            FieldSel::FRAME,
            (src_x, src_y),
            (block_s, block_s),
            Interp::Eighth(eighth_phase(sx, lowres), eighth_phase(sy, lowres)),
            (row, col),
        );
        self.predict_block(target, src, op, &luma)
    }

    /// lowres 4MV 的合成色度预测
    fn chroma_4mv_motion_lowres(
        &self,
        target: &mut McTarget<'_>,
        src: &FrameBuffer,
        op: PixOp,
        mx: i32,
        my: i32,
        base_row: usize,
    ) -> MpvResult<()> {
        let (lowres, block_s, s_mask) = self.lowres_params();
        let (mut mx, mut my) = (mx, my);
        if self.quarter_sample {
            mx /= 2;
            my /= 2;
        }
        let mx = h263_round_chroma(mx);
        let my = h263_round_chroma(my);
        let sx = mx & s_mask;
        let sy = my & s_mask;
        let src_x = (target.mb_x * block_s) as i32 + (mx >> (lowres + 1));
        let src_y = (base_row >> 1) as i32 + (my >> (lowres + 1));
        let interp = Interp::Eighth(eighth_phase(sx, lowres), eighth_phase(sy, lowres));

        for plane in 1..3 {
            let chroma = self.block(
                target,
                src,
                plane,
                FieldSel::FRAME,
                (src_x, src_y),
                (block_s, block_s),
                interp,
                (base_row >> 1, target.mb_x * block_s),
            );
            self.predict_block(target, src, op, &chroma)?;
        }
        Ok(())
    }
}
