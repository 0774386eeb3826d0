use mpegvideo_core::PixelFormat;

use crate::codec_id::CodecId;
use crate::config::DecoderConfig;
use crate::frame::PictureType;

use super::super::{DspKernels, Macroblock, MotionVector, MpegContext, MvDir, PictureHeader};

pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn build_test_config(codec_id: CodecId, width: u32, height: u32) -> DecoderConfig {
    DecoderConfig::new(codec_id, width, height)
}

pub fn build_test_context_with(config: DecoderConfig) -> MpegContext {
    init_test_logger();
    let mut ctx = MpegContext::new(config, DspKernels::reference());
    ctx.common_init().expect("测试上下文初始化失败");
    ctx
}

pub fn build_test_context(codec_id: CodecId, width: u32, height: u32) -> MpegContext {
    build_test_context_with(build_test_config(codec_id, width, height))
}

pub fn build_test_context_422(width: u32, height: u32) -> MpegContext {
    build_test_context_with(
        build_test_config(CodecId::Mpeg2Video, width, height)
            .with_pixel_format(PixelFormat::Yuv422p),
    )
}

/// 以逐行帧头开始一幅图像, 返回当前槽位
pub fn begin(ctx: &mut MpegContext, pict_type: PictureType) -> usize {
    ctx.begin_frame(&PictureHeader::new(pict_type))
        .expect("开始图像失败");
    ctx.roles().current.expect("开始图像后应有当前槽位")
}

/// 以常量填充槽位
pub fn fill_slot(ctx: &MpegContext, slot: usize, luma: u8, chroma: u8) {
    ctx.pool().buffer(slot).expect("槽位无缓冲").fill(luma, chroma);
}

/// 亮度平面写入斜坡 `2x + 4y`, 色度写入 `x + 2y`
pub fn fill_slot_ramp(ctx: &MpegContext, slot: usize) {
    let buf = ctx.pool().buffer(slot).expect("槽位无缓冲");
    let mut planes = buf.planes_mut();
    for p in 0..3 {
        let stride = planes.linesize[p];
        let (kx, ky) = if p == 0 { (2, 4) } else { (1, 2) };
        for (i, px) in planes.data[p].iter_mut().enumerate() {
            *px = ((i % stride) * kx + (i / stride) * ky).min(255) as u8;
        }
    }
}

pub fn ramp_luma(x: usize, y: usize) -> u8 {
    (2 * x + 4 * y).min(255) as u8
}

/// 读取槽位中平面 `plane` 在 (x, y) 的采样
pub fn sample_at(ctx: &MpegContext, slot: usize, plane: usize, x: usize, y: usize) -> u8 {
    let buf = ctx.pool().buffer(slot).expect("槽位无缓冲");
    let planes = buf.planes();
    planes.data[plane][y * planes.linesize[plane] + x]
}

/// 宏块区域 (mb_x, mb_y) 的亮度采样
pub fn mb_luma(ctx: &MpegContext, slot: usize, mb_x: usize, mb_y: usize) -> Vec<u8> {
    let size = 16 >> ctx.config().lowres;
    let mut out = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            out.push(sample_at(ctx, slot, 0, mb_x * size + x, mb_y * size + y));
        }
    }
    out
}

/// 零向量的帧间宏块, 无残差
pub fn build_inter_mb(mb_x: usize, mb_y: usize, mv_dir: MvDir) -> Macroblock {
    Macroblock::inter(mb_x, mb_y, mv_dir)
}

pub fn build_inter_mb_mv(mb_x: usize, mb_y: usize, x: i32, y: i32) -> Macroblock {
    let mut mb = Macroblock::inter(mb_x, mb_y, MvDir::FORWARD);
    mb.mv[0][0] = MotionVector::new(x, y);
    mb
}

/// 只有 DC 系数的帧内宏块与系数块 (4:2:0, 6 个块)
pub fn build_intra_dc(mb_x: usize, mb_y: usize, dc: i16) -> (Macroblock, [[i16; 64]; 12]) {
    let mut mb = Macroblock::intra(mb_x, mb_y);
    let mut blocks = [[0i16; 64]; 12];
    for (n, block) in blocks.iter_mut().enumerate().take(6) {
        block[0] = dc;
        mb.block_last_index[n] = 0;
    }
    (mb, blocks)
}

/// 解码一幅只含帧内 DC 宏块的图像, 返回当前槽位
pub fn decode_intra_picture(ctx: &mut MpegContext, dc: i16) -> usize {
    let slot = begin(ctx, PictureType::I);
    for mb_y in 0..ctx.mb_height() {
        for mb_x in 0..ctx.mb_width() {
            let (mb, mut blocks) = build_intra_dc(mb_x, mb_y, dc);
            ctx.reconstruct_mb(&mb, &mut blocks).expect("帧内重建失败");
        }
    }
    slot
}

/// 解码一幅零向量, 无残差的帧间图像
pub fn decode_copy_picture(ctx: &mut MpegContext, pict_type: PictureType, mv_dir: MvDir) -> usize {
    let slot = begin(ctx, pict_type);
    for mb_y in 0..ctx.mb_height() {
        for mb_x in 0..ctx.mb_width() {
            let mb = build_inter_mb(mb_x, mb_y, mv_dir);
            let mut blocks = [[0i16; 64]; 12];
            ctx.reconstruct_mb(&mb, &mut blocks).expect("帧间重建失败");
        }
    }
    slot
}
