//! 帧级并行的上下文同步 (对标 ff_mpeg_update_thread_context).
//!
//! 前驱上下文以 [`ThreadState`] 快照导出状态, 后继上下文应用快照.
//! 快照中的图像表与前驱的缓冲池逐槽位对应, 帧缓冲以 `Arc` 共享而不复制像素,
//! 角色以槽位下标直接沿用.

use log::{debug, error, trace};
use mpegvideo_core::{MpvError, MpvResult};

use crate::config::{BugFlags, DecoderConfig};
use crate::frame::PictureType;

use super::dequant::QuantParams;
use super::edge_emu::ScratchBuffers;
use super::picture::Picture;
use super::pool::RoleSet;
use super::types::DequantVariant;
use super::{InterlaceState, Mpeg4Timing, MpegContext};

/// 码流暂存区的 0 填充长度
pub const BITSTREAM_PADDING: usize = 64;

/// 逐字复制的标量状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncedScalars {
    /// 四分之一像素运动向量
    pub quarter_sample: bool,
    /// 显示顺序编号
    pub picture_number: u32,
    /// 编码顺序编号
    pub coded_picture_number: u32,
    /// 缺陷规避标志
    pub workaround_bugs: BugFlags,
    /// 填充缺陷计分
    pub padding_bug_score: i32,
    /// MPEG-4 时间戳
    pub timing: Mpeg4Timing,
    /// 最大连续 B 帧数
    pub max_b_frames: u32,
    /// 低延迟模式
    pub low_delay: bool,
    /// 可丢弃
    pub droppable: bool,
    /// DivX 打包 B 帧
    pub divx_packed: bool,
    /// 隔行状态
    pub interlace: InterlaceState,
}

/// 上下文状态快照
#[derive(Debug, Clone)]
pub struct ThreadState {
    /// 导出快照的上下文编号
    pub source_id: u64,
    /// 导出时是否已初始化
    pub initialized: bool,
    /// 配置
    pub config: DecoderConfig,
    /// 编码宽度
    pub width: u32,
    /// 编码高度
    pub height: u32,
    /// 反量化参数
    pub quant: QuantParams,
    /// 反量化方式
    pub dequant_variant: DequantVariant,
    /// 图片类型
    pub pict_type: PictureType,
    /// MPEG-4 MPEG 量化类型
    pub mpeg_quant: bool,
    /// 禁止插值取整
    pub no_rounding: bool,
    /// 缓冲池快照, 下标与槽位一致
    pub pictures: Vec<Picture>,
    /// 参考角色
    pub roles: RoleSet,
    /// 逐字复制的标量
    pub scalars: SyncedScalars,
    /// 打包码流的残余数据 (不含填充)
    pub bitstream: Vec<u8>,
    /// 前驱记录的亮度行距, 0 表示未知
    pub linesize: usize,
}

impl MpegContext {
    /// 导出当前状态快照
    pub fn export_thread_state(&self) -> ThreadState {
        let len = self.bitstream_buffer_size.min(self.bitstream_buffer.len());
        ThreadState {
            source_id: self.id,
            initialized: self.context_initialized,
            config: self.config.clone(),
            width: self.width,
            height: self.height,
            quant: self.quant.clone(),
            dequant_variant: self.dequant_variant,
            pict_type: self.pict_type,
            mpeg_quant: self.mpeg_quant,
            no_rounding: self.no_rounding,
            pictures: self.pool.iter().cloned().collect(),
            roles: self.roles,
            scalars: SyncedScalars {
                quarter_sample: self.quarter_sample,
                picture_number: self.picture_number,
                coded_picture_number: self.coded_picture_number,
                workaround_bugs: self.workaround_bugs,
                padding_bug_score: self.padding_bug_score,
                timing: self.timing,
                max_b_frames: self.max_b_frames,
                low_delay: self.low_delay,
                droppable: self.droppable,
                divx_packed: self.divx_packed,
                interlace: self.interlace,
            },
            bitstream: self.bitstream_buffer[..len].to_vec(),
            linesize: self.linesize,
        }
    }

    /// 直接从另一个上下文同步 (两者位于同一线程时使用)
    pub fn update_from(&mut self, src: &MpegContext) -> MpvResult<()> {
        let state = src.export_thread_state();
        self.update_thread_context(&state)
    }

    /// 应用前驱上下文的状态快照
    pub fn update_thread_context(&mut self, state: &ThreadState) -> MpvResult<()> {
        if state.source_id == self.id {
            return Ok(());
        }
        trace!("mpegvideo: 上下文 #{} 同步自 #{}", self.id, state.source_id);

        if !self.context_initialized {
            self.adopt_structure(state);
            if state.initialized {
                if let Err(e) = self.common_init() {
                    self.reset_uninitialized();
                    return Err(e);
                }
            }
        }

        // 重新初始化只由本上下文的标志触发
        let resized = self.width != state.width || self.height != state.height;
        if self.context_initialized && (resized || self.context_reinit) {
            self.width = state.width;
            self.height = state.height;
            self.frame_size_change()?;
        }

        let s = &state.scalars;
        self.quarter_sample = s.quarter_sample;
        self.picture_number = s.picture_number;
        self.coded_picture_number = s.coded_picture_number;
        self.workaround_bugs = s.workaround_bugs;
        self.padding_bug_score = s.padding_bug_score;
        self.timing = s.timing;
        self.max_b_frames = s.max_b_frames;
        self.low_delay = s.low_delay;
        self.droppable = s.droppable;
        self.divx_packed = s.divx_packed;
        self.interlace = s.interlace;

        self.pool.replace_from(&state.pictures);
        self.roles = state.roles;

        self.copy_bitstream(&state.bitstream)?;

        if self.slice_contexts.iter().any(|sc| !sc.has_scratch()) {
            if state.linesize != 0 {
                for sc in &mut self.slice_contexts {
                    if sc.scratch.is_none() {
                        sc.scratch = Some(ScratchBuffers::alloc(state.linesize)?);
                    }
                }
            } else if !self.slice_contexts.is_empty() {
                error!("无法分配暂存区: 尺寸未知");
            }
        }
        Ok(())
    }

    /// 未初始化的后继上下文复制结构性状态
    fn adopt_structure(&mut self, state: &ThreadState) {
        debug!(
            "mpegvideo: 上下文 #{} 从 #{} 复制结构状态",
            self.id, state.source_id
        );
        self.config = state.config.clone();
        self.out_format = state.config.codec_id.output_format();
        self.width = state.width;
        self.height = state.height;
        self.quant = state.quant.clone();
        self.dequant_variant = state.dequant_variant;
        self.pict_type = state.pict_type;
        self.mpeg_quant = state.mpeg_quant;
        self.no_rounding = state.no_rounding;
        self.interlace = state.scalars.interlace;
        self.workaround_bugs = state.scalars.workaround_bugs;
        self.bitstream_buffer = Vec::new();
        self.bitstream_buffer_size = 0;
    }

    /// 初始化失败后回到未初始化状态, 保留编号, 配置与内核
    fn reset_uninitialized(&mut self) {
        let fresh = Self::new(self.config.clone(), self.kernels.clone());
        let id = self.id;
        *self = fresh;
        self.id = id;
    }

    /// 深复制残余码流并补 0 填充
    fn copy_bitstream(&mut self, data: &[u8]) -> MpvResult<()> {
        let padded = data.len() + BITSTREAM_PADDING;
        if self.bitstream_buffer.len() < padded {
            let extra = padded - self.bitstream_buffer.len();
            self.bitstream_buffer
                .try_reserve(extra)
                .map_err(|e| MpvError::AllocationFailure(format!("码流暂存区: {e}")))?;
        }
        self.bitstream_buffer.clear();
        self.bitstream_buffer.extend_from_slice(data);
        self.bitstream_buffer.resize(padded, 0);
        self.bitstream_buffer_size = data.len();
        Ok(())
    }

    /// 保存打包码流的残余数据, 后续图像与同步快照会带上它
    pub fn set_bitstream_remainder(&mut self, data: &[u8]) -> MpvResult<()> {
        self.copy_bitstream(data)
    }

    /// 残余码流 (不含填充)
    pub fn bitstream_remainder(&self) -> &[u8] {
        &self.bitstream_buffer[..self.bitstream_buffer_size.min(self.bitstream_buffer.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec_id::CodecId;
    use crate::mpegvideo::DspKernels;

    fn context() -> MpegContext {
        MpegContext::new(
            DecoderConfig::new(CodecId::Mpeg1Video, 32, 32),
            DspKernels::reference(),
        )
    }

    #[test]
    fn test_bitstream_copy_is_padded() {
        let mut ctx = context();
        ctx.set_bitstream_remainder(&[1, 2, 3]).unwrap();
        assert_eq!(ctx.bitstream_remainder(), &[1, 2, 3]);
        assert_eq!(ctx.bitstream_buffer.len(), 3 + BITSTREAM_PADDING);
        assert!(ctx.bitstream_buffer[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_same_source_is_noop() {
        let mut ctx = context();
        ctx.set_low_delay(true);
        let mut state = ctx.export_thread_state();
        state.scalars.low_delay = false;
        ctx.update_thread_context(&state).unwrap();
        assert!(ctx.low_delay());
    }

    #[test]
    fn test_uninitialized_successor_of_uninitialized_source() {
        let src = context();
        let mut dst = src.fork();
        dst.update_from(&src).unwrap();
        assert!(!dst.is_initialized());
        assert_eq!(dst.width(), 32);
    }
}
