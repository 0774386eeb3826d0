//! 量化参数边数据导出与逐宏块调试输出.

use log::{Level, debug, log_enabled};
use mpegvideo_core::MpvResult;

use crate::config::{DebugFlags, ExportFlags};
use crate::frame::{EncParamsType, FrameSideData, VideoBlockParams, VideoEncParams, VideoFrame};

use super::MpegContext;
use super::picture::MbTables;
use super::types::{MbTypeFlags, QscaleType};

impl MpegContext {
    /// 为输出帧附加每宏块量化参数 (对标 ff_mpv_export_qp_table)
    ///
    /// 仅在配置开启 [`ExportFlags::VIDEO_ENC_PARAMS`] 时生效. 每个宏块导出一个
    /// 16x16 块, qp 为 qscale 乘以 `qscale_type` 的倍率.
    pub fn export_qp_table(
        &self,
        frame: &mut VideoFrame,
        slot: usize,
        qscale_type: QscaleType,
    ) -> MpvResult<()> {
        if !self.config.export_side_data.contains(ExportFlags::VIDEO_ENC_PARAMS) {
            return Ok(());
        }
        let Some(buf) = self.pool.buffer(slot) else {
            return Ok(());
        };
        let g = buf.geometry();
        let tables = buf.tables();
        let mult = qscale_type.multiplier();

        let mut blocks = Vec::new();
        blocks.try_reserve_exact(g.mb_width * g.mb_height)?;
        for mb_y in 0..g.mb_height {
            for mb_x in 0..g.mb_width {
                let q = tables
                    .qscale_table
                    .get(mb_x + mb_y * g.mb_stride)
                    .copied()
                    .unwrap_or(0);
                blocks.push(VideoBlockParams {
                    src_x: (mb_x * 16) as u32,
                    src_y: (mb_y * 16) as u32,
                    w: 16,
                    h: 16,
                    delta_qp: i32::from(q) * mult,
                });
            }
        }

        frame.side_data.push(FrameSideData::VideoEncParams(VideoEncParams {
            kind: EncParamsType::Mpeg2,
            qp: 0,
            blocks,
        }));
        Ok(())
    }

    /// 按调试标志逐行打印跳过表, 量化参数与宏块类型
    pub fn print_debug_info(&self, slot: usize) {
        let wanted = DebugFlags::SKIP | DebugFlags::QP | DebugFlags::MB_TYPE;
        if !self.config.debug.intersects(wanted) || !log_enabled!(Level::Debug) {
            return;
        }
        let Some(pic) = self.pool.get(slot) else {
            return;
        };
        let Some(buf) = pic.buffer() else {
            return;
        };
        let g = buf.geometry();
        let tables = buf.tables();

        debug!("新图像, 类型 {}", pic.pict_type.as_char());
        for mb_y in 0..g.mb_height {
            let mut line = String::with_capacity(g.mb_width * 8);
            for mb_x in 0..g.mb_width {
                let xy = mb_x + mb_y * g.mb_stride;
                if self.config.debug.contains(DebugFlags::SKIP) {
                    let skip = self.mbskip_table.get(xy).copied().unwrap_or(0);
                    line.push_str(&format!("{:1}", skip.min(9)));
                }
                if self.config.debug.contains(DebugFlags::QP) {
                    let q = tables.qscale_table.get(xy).copied().unwrap_or(0);
                    line.push_str(&format!("{q:2}"));
                }
                if self.config.debug.contains(DebugFlags::MB_TYPE) {
                    line.push_str(&mb_type_chars(&tables, xy));
                }
                line.push(' ');
            }
            debug!("{line}");
        }
    }
}

/// 宏块类型的三字符表示: 预测类型, 分割方式, 隔行
fn mb_type_chars(tables: &MbTables, xy: usize) -> String {
    let flags = MbTypeFlags::from_bits_truncate(tables.mb_type.get(xy).copied().unwrap_or(0));
    let is_skip = flags.contains(MbTypeFlags::SKIP);
    let kind = if flags.contains(MbTypeFlags::INTRA) {
        'I'
    } else if flags.contains(MbTypeFlags::GMC) {
        if is_skip { 'g' } else { 'G' }
    } else if is_skip {
        'S'
    } else {
        let fwd = flags.contains(MbTypeFlags::FORWARD);
        let bwd = flags.contains(MbTypeFlags::BACKWARD);
        match (fwd, bwd) {
            (true, false) => '>',
            (false, true) => '<',
            _ => 'X',
        }
    };

    let seg = if flags.contains(MbTypeFlags::MV_8X8) {
        '+'
    } else if flags.contains(MbTypeFlags::MV_16X8) {
        '-'
    } else if flags.intersects(MbTypeFlags::INTRA | MbTypeFlags::MV_16X16) {
        ' '
    } else {
        '?'
    };

    let ilace = if flags.contains(MbTypeFlags::INTERLACED) {
        '='
    } else {
        ' '
    };
    [kind, seg, ilace].iter().collect()
}
