//! 上下文初始化与帧尺寸变化.
//!
//! 尺寸相关的状态包括宏块几何, 跳过宏块表, 宏块序号映射与条带上下文.
//! 尺寸变化时缓冲池中的旧帧只标记为需要重新分配, 由分配路径在交出槽位前释放.

use log::{debug, error, info};
use mpegvideo_core::{MpvError, MpvResult};

use crate::codec_id::CodecId;

use super::picture::alloc_zeroed;
use super::{MpegContext, SliceContext};

/// 检查图像尺寸是否可用 (对标 av_image_check_size)
///
/// 宽高必须非零, 且 `(w + 128) * (h + 128) < i32::MAX / 8`.
pub fn check_image_size(width: u32, height: u32) -> MpvResult<()> {
    let area = (u64::from(width) + 128) * (u64::from(height) + 128);
    if width > 0 && height > 0 && area < (i32::MAX / 8) as u64 {
        Ok(())
    } else {
        Err(MpvError::InvalidDimensions { width, height })
    }
}

impl MpegContext {
    /// 初始化上下文 (对标 ff_mpv_common_init)
    ///
    /// 推导宏块几何, 分配尺寸相关的表并建立条带上下文. 失败时上下文回到未初始化状态.
    pub fn common_init(&mut self) -> MpvResult<()> {
        self.config.validate()?;
        if let Err(e) = self.init_context() {
            error!("mpegvideo: 上下文初始化失败: {e}");
            self.free_context_frame();
            self.slice_contexts.clear();
            self.context_initialized = false;
            return Err(e);
        }
        self.context_initialized = true;
        info!(
            "mpegvideo: 上下文 #{} 初始化完成, {} {}x{}, {}x{} 宏块",
            self.id, self.config.codec_id, self.width, self.height, self.mb_width, self.mb_height
        );
        Ok(())
    }

    fn init_context(&mut self) -> MpvResult<()> {
        if self.width != 0 || self.height != 0 {
            check_image_size(self.width, self.height)?;
        }
        self.init_chroma_shift()?;
        self.init_context_frame()?;
        self.init_slice_contexts();
        Ok(())
    }

    /// 尺寸变化 (对标 ff_mpv_common_frame_size_change)
    ///
    /// 释放尺寸相关状态, 将池中全部图像标记为需要重新分配并清空角色,
    /// 再按新尺寸重建. 失败时释放已分配的部分并设置重新初始化标志.
    pub fn frame_size_change(&mut self) -> MpvResult<()> {
        if !self.context_initialized {
            return Err(MpvError::InvalidArgument("尺寸变化需要已初始化的上下文".into()));
        }
        debug!(
            "mpegvideo: 上下文 #{} 尺寸变化为 {}x{}",
            self.id, self.width, self.height
        );

        self.free_context_frame();
        self.pool.mark_all_needs_realloc();
        self.roles.clear();

        match self.rebuild_after_size_change() {
            Ok(()) => {
                self.context_reinit = false;
                Ok(())
            }
            Err(e) => {
                error!("mpegvideo: 尺寸变化失败: {e}");
                self.free_context_frame();
                self.context_reinit = true;
                Err(e)
            }
        }
    }

    fn rebuild_after_size_change(&mut self) -> MpvResult<()> {
        // 0x0 表示尺寸尚未确定, 允许通过
        if self.width != 0 || self.height != 0 {
            check_image_size(self.width, self.height)?;
        }
        self.init_chroma_shift()?;
        self.init_context_frame()?;
        self.init_slice_contexts();
        Ok(())
    }

    fn init_chroma_shift(&mut self) -> MpvResult<()> {
        let (cx, cy) = self
            .config
            .pixel_format
            .chroma_shift()
            .ok_or_else(|| MpvError::UnsupportedFormat(self.config.pixel_format.to_string()))?;
        self.chroma_x_shift = cx;
        self.chroma_y_shift = cy;
        Ok(())
    }

    /// 按当前尺寸推导宏块几何并分配每上下文的表
    fn init_context_frame(&mut self) -> MpvResult<()> {
        let w = self.width as usize;
        let h = self.height as usize;
        self.mb_width = w.div_ceil(16);
        // 隔行 MPEG-2 的宏块行数按场对齐
        self.mb_height = if self.config.codec_id == CodecId::Mpeg2Video
            && !self.interlace.progressive_sequence
        {
            h.div_ceil(32) * 2
        } else {
            h.div_ceil(16)
        };
        self.mb_stride = self.mb_width + 1;
        self.b8_stride = self.mb_width * 2 + 1;
        self.mb_num = self.mb_width * self.mb_height;
        self.h_edge_pos = (self.mb_width * 16) as i32;
        self.v_edge_pos = (self.mb_height * 16) as i32;

        self.mbskip_table = alloc_zeroed(self.mb_stride * self.mb_height + 2)?;

        let mut index = Vec::new();
        index.try_reserve_exact(self.mb_num + 1)?;
        index.extend(
            (0..self.mb_num).map(|i| i % self.mb_width + (i / self.mb_width) * self.mb_stride),
        );
        // 末尾哨兵: 最后一行之后的位置
        index.push(self.mb_height.saturating_sub(1) * self.mb_stride + self.mb_width);
        self.mb_index2xy = index;
        Ok(())
    }

    /// 释放尺寸相关状态
    fn free_context_frame(&mut self) {
        self.mbskip_table = Vec::new();
        self.mb_index2xy = Vec::new();
        self.slice_contexts.clear();
        self.h_edge_pos = 0;
        self.v_edge_pos = 0;
        self.linesize = 0;
        self.uvlinesize = 0;
    }

    /// 按宏块行切分条带上下文, 主上下文位于下标 0
    fn init_slice_contexts(&mut self) {
        self.slice_contexts.clear();
        if self.width == 0 || self.height == 0 {
            return;
        }
        let nb = self.config.slice_threads.min(self.mb_height).max(1);
        let start = |i: usize| (self.mb_height * i + nb / 2) / nb;
        self.slice_contexts = (0..nb).map(|i| SliceContext::new(start(i), start(i + 1))).collect();
        debug!("mpegvideo: {nb} 个条带上下文");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_image_size_limits() {
        assert!(check_image_size(1920, 1080).is_ok());
        assert!(check_image_size(1, 1).is_ok());
        assert!(matches!(
            check_image_size(0, 16),
            Err(MpvError::InvalidDimensions { width: 0, height: 16 })
        ));
        assert!(check_image_size(16, 0).is_err());
        // (w + 128) * (h + 128) 必须小于 i32::MAX / 8
        assert!(check_image_size(16384, 16384).is_err());
    }

    #[test]
    fn test_check_image_size_boundary() {
        let limit = (i32::MAX / 8) as u64;
        // 找到恰好越界的正方形边长
        let side = (1u32..).find(|&s| (u64::from(s) + 128).pow(2) >= limit).unwrap();
        assert!(check_image_size(side - 1, side - 1).is_ok());
        assert!(check_image_size(side, side).is_err());
    }
}
