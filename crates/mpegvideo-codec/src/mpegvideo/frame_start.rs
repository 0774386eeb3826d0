//! 图像生命周期: 开始, 结束, 输出重排序与刷新.
//!
//! 参考角色轮换规则:
//! - 非 B 图像开始时 `last ← next`, 非丢弃图像再 `next ← current`
//! - B 图像不改变参考角色, 解码后立即输出
//! - 缺少所需参考时合成哑帧, 其进度直接标记为完成

use log::{debug, error, trace};
use mpegvideo_core::{MpvError, MpvResult};

use crate::codec_id::{CodecId, OutputFormat};
use crate::config::DebugFlags;
use crate::frame::{PictureType, VideoFrame};

use super::MpegContext;
use super::edge_emu::ScratchBuffers;
use super::picture::{FrameGeometry, ReferenceKind};
use super::types::{DequantVariant, PictureHeader, PictureStructure, QscaleType};

/// 哑帧色度填充值
const DUMMY_CHROMA: u8 = 0x80;

impl MpegContext {
    /// 预先为下一幅图像选定空闲槽位
    ///
    /// 解码器可在解析图像头之前调用; [`Self::begin_frame`] 会复用尚未分配缓冲的预选槽位.
    pub fn claim_current_slot(&mut self) -> MpvResult<usize> {
        if let Some(idx) = self.roles.current {
            if self.pool.get(idx).is_some_and(|p| !p.has_data()) {
                return Ok(idx);
            }
        }
        self.roles.current = None;
        let idx = self.pool.find_unused_slot(&self.roles)?;
        self.roles.current = Some(idx);
        Ok(idx)
    }

    /// 开始解码一幅图像 (场图像时为场对中的第一场)
    ///
    /// 选定并分配当前图像, 轮换参考角色, 必要时合成哑参考帧, 并选择反量化方式.
    /// 失败只影响本图像, 上下文保持可用.
    pub fn begin_frame(&mut self, header: &PictureHeader) -> MpvResult<()> {
        if !self.context_initialized {
            return Err(MpvError::InvalidArgument("上下文未初始化".into()));
        }
        self.apply_header(header);
        let pict_type = self.pict_type;

        // 非 B 图像: 上一个前向参考不再需要
        if pict_type != PictureType::B {
            if let Some(last) = self.roles.last {
                if self.roles.next != Some(last) && self.pool.get(last).is_some_and(|p| p.has_data()) {
                    trace!("释放前向参考槽位 {last}");
                    self.pool.release(last);
                }
            }
        }

        self.pool.retire_unreferenced(&self.roles);

        let idx = match self.roles.current {
            Some(idx) if self.pool.get(idx).is_some_and(|p| !p.has_data()) => idx,
            _ => {
                self.roles.current = None;
                match self.pool.find_unused_slot(&self.roles) {
                    Ok(idx) => idx,
                    Err(e) => {
                        error!("mpegvideo: 没有可用的帧缓冲槽位");
                        return Err(e);
                    }
                }
            }
        };
        self.roles.current = Some(idx);

        let reference = if !self.droppable && pict_type != PictureType::B {
            ReferenceKind::ShortTerm
        } else {
            ReferenceKind::None
        };
        let coded_picture_number = self.coded_picture_number;
        self.coded_picture_number += 1;

        let geometry = self.frame_geometry();
        let buf = self.pool.allocate(idx, &geometry).inspect_err(|e| {
            error!("mpegvideo: 分配当前图像失败: {e}");
        })?;

        let top_field_first = if self.config.codec_id.is_mpeg12() && self.field_pic() {
            (self.interlace.picture_structure == PictureStructure::TopField) == self.interlace.first_field
        } else {
            self.interlace.top_field_first
        };
        let interlaced = !self.interlace.progressive_frame && !self.interlace.progressive_sequence;
        let field_picture = self.field_pic();
        if let Some(pic) = self.pool.get_mut(idx) {
            pic.reference = reference;
            pic.coded_picture_number = coded_picture_number;
            pic.top_field_first = top_field_first;
            pic.interlaced = interlaced;
            pic.field_picture = field_picture;
            pic.pict_type = pict_type;
            pic.key_frame = pict_type == PictureType::I;
            pic.dummy = false;
        }

        if pict_type != PictureType::B {
            self.roles.last = self.roles.next;
            if !self.droppable {
                self.roles.next = Some(idx);
            }
        }
        trace!(
            "开始图像 {}: current={:?} last={:?} next={:?}",
            pict_type.as_char(),
            self.roles.current,
            self.roles.last,
            self.roles.next
        );

        let last_missing = self
            .roles
            .last
            .and_then(|i| self.pool.get(i))
            .is_none_or(|p| !p.has_data());
        if last_missing && pict_type != PictureType::I {
            let next_present = self
                .roles
                .next
                .and_then(|i| self.pool.get(i))
                .is_some_and(|p| p.has_data());
            if pict_type == PictureType::B && next_present {
                debug!("为 B 帧分配哑前向参考帧");
            } else {
                error!("首帧不是关键帧, 以哑参考帧代替");
            }
            self.roles.last = None;
            let dummy = self.alloc_dummy(&geometry)?;
            self.roles.last = Some(dummy);
        }

        let next_missing = self
            .roles
            .next
            .and_then(|i| self.pool.get(i))
            .is_none_or(|p| !p.has_data());
        if next_missing && pict_type == PictureType::B {
            self.roles.next = None;
            let dummy = self.alloc_dummy(&geometry)?;
            self.roles.next = Some(dummy);
        }

        self.dequant_variant =
            if self.mpeg_quant || self.config.codec_id == CodecId::Mpeg2Video {
                DequantVariant::Mpeg2
            } else if matches!(self.out_format, OutputFormat::H263 | OutputFormat::H261) {
                DequantVariant::H263
            } else {
                DequantVariant::Mpeg1
            };

        if self.config.debug.contains(DebugFlags::NOMC) {
            buf.fill(0x80, 0x80);
        }

        self.linesize = geometry.linesize(0);
        self.uvlinesize = geometry.linesize(1);
        self.ensure_scratch(self.linesize)
    }

    /// 开始场对中的第二场, 继续写入同一个当前图像
    pub fn begin_second_field(&mut self, header: &PictureHeader) -> MpvResult<()> {
        let has_data = self.current_picture().is_some_and(|p| p.has_data());
        if !has_data {
            return Err(MpvError::InvalidData("第二场之前没有第一场".into()));
        }
        if !header.picture_structure.is_field() {
            return Err(MpvError::InvalidArgument("第二场必须是场图像".into()));
        }
        self.interlace.picture_structure = header.picture_structure;
        self.interlace.first_field = false;
        self.mb_x = 0;
        self.mb_y = 0;
        Ok(())
    }

    /// 以图像头更新图像级状态
    fn apply_header(&mut self, header: &PictureHeader) {
        self.pict_type = header.pict_type;
        self.droppable = header.droppable;
        self.interlace.picture_structure = header.picture_structure;
        self.interlace.first_field = header.first_field;
        self.interlace.top_field_first = header.top_field_first;
        self.interlace.progressive_frame = header.progressive_frame;
        self.interlace.q_scale_type = header.q_scale_type;
        self.quant.q_scale_type = header.q_scale_type;
        self.mpeg_quant = header.mpeg_quant;
        self.quarter_sample = header.quarter_sample;
        self.no_rounding = header.no_rounding;
        self.error_occurred = false;
        self.mb_x = 0;
        self.mb_y = 0;
    }

    /// 分配一个进度已完成的哑参考帧 (P 类型, 参考帧)
    ///
    /// 亮度按编解码器取值 (H.263/FLV1 为 16, 其余 0x80), 色度 0x80.
    fn alloc_dummy(&mut self, geometry: &FrameGeometry) -> MpvResult<usize> {
        let idx = self.pool.find_unused_slot(&self.roles)?;
        let buf = self.pool.allocate(idx, geometry)?;
        buf.fill(self.config.codec_id.dummy_luma(), DUMMY_CHROMA);
        if let Some(pic) = self.pool.get_mut(idx) {
            pic.reference = ReferenceKind::ShortTerm;
            pic.key_frame = false;
            pic.pict_type = PictureType::P;
            pic.dummy = true;
        }
        buf.progress().finish();
        Ok(idx)
    }

    /// 为所有缺少暂存区的条带分配暂存区
    pub(crate) fn ensure_scratch(&mut self, linesize: usize) -> MpvResult<()> {
        for sc in &mut self.slice_contexts {
            if !sc.scratch.as_ref().is_some_and(|s| s.fits(linesize)) {
                sc.scratch = Some(ScratchBuffers::alloc(linesize)?);
            }
        }
        Ok(())
    }

    /// 结束当前图像: 参考图像的进度标记为完成
    pub fn frame_end(&mut self) {
        if let Some(pic) = self.current_picture() {
            if pic.is_reference() {
                if let Some(buf) = pic.buffer() {
                    buf.progress().finish();
                }
            }
        }
    }

    /// 报告当前宏块行已解码完毕
    ///
    /// 只对非 B, 非数据分区且无错误的图像报告, 进度写在顶场/帧计数上.
    pub fn report_decode_progress(&self) {
        if self.pict_type == PictureType::B || self.partitioned_frame || self.error_occurred {
            return;
        }
        if let Some(buf) = self.current_buffer() {
            buf.progress().report(self.mb_y as i32, 0);
        }
    }

    /// 完成当前图像并按显示顺序返回可输出的帧
    ///
    /// B 图像与低延迟模式输出当前图像, 否则输出上一个参考图像 (哑帧不输出).
    /// 场对的第一场结束时返回 `None`.
    pub fn finish_frame(&mut self) -> MpvResult<Option<VideoFrame>> {
        if self.field_pic() && self.interlace.first_field {
            return Ok(None);
        }
        self.frame_end();

        let slot = if self.pict_type == PictureType::B || self.low_delay {
            self.roles.current
        } else {
            self.picture_number += 1;
            self.roles.last
        };
        let Some(idx) = slot else {
            return Ok(None);
        };
        self.output_slot(idx)
    }

    /// 输出仍被持有的后向参考图像 (码流结束时调用)
    pub fn drain(&mut self) -> MpvResult<Option<VideoFrame>> {
        if self.low_delay {
            return Ok(None);
        }
        match self.roles.next.take() {
            Some(idx) => self.output_slot(idx),
            None => Ok(None),
        }
    }

    fn output_slot(&mut self, idx: usize) -> MpvResult<Option<VideoFrame>> {
        let Some(pic) = self.pool.get(idx) else {
            return Ok(None);
        };
        if pic.dummy {
            return Ok(None);
        }
        let Some(mut frame) = pic.to_video_frame() else {
            return Ok(None);
        };
        self.print_debug_info(idx);
        self.export_qp_table(&mut frame, idx, self.qscale_type())?;
        debug!(
            "输出图像: 类型 {}, 编码序号 {}",
            frame.picture_type.as_char(),
            frame.coded_picture_number
        );
        Ok(Some(frame))
    }

    /// 导出量化参数时使用的 qscale 类型
    ///
    /// MPEG-1/2 族在解析时已把 qscale 映射为实际量化步长.
    pub fn qscale_type(&self) -> QscaleType {
        if self.out_format == OutputFormat::Mpeg1 {
            QscaleType::Mpeg2
        } else {
            QscaleType::Mpeg1
        }
    }

    /// 刷新: 释放全部图像与角色, 尺寸相关的分配保持不变
    pub fn flush(&mut self) {
        debug!("mpegvideo: 刷新解码上下文 #{}", self.id);
        self.pool.release_all();
        self.roles.clear();
        self.mb_x = 0;
        self.mb_y = 0;
        self.bitstream_buffer_size = 0;
        self.timing.pp_time = 0;
    }
}
