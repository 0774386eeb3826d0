use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mpegvideo_core::{MpvError, PixelFormat};

use crate::codec_id::CodecId;
use crate::config::CodecFlags;
use crate::frame::PictureType;

use super::super::{
    ClampingEdgeEmulator, DspKernels, EdgeEmulator, Macroblock, MotionVector, MpegContext, MvDir,
    MvType, PictureHeader, PictureStructure, PixOp, PlaneView,
};
use super::helpers::*;

/// 记录调用次数的边缘模拟器
#[derive(Debug, Default)]
struct CountingEdgeEmulator {
    calls: AtomicUsize,
}

impl CountingEdgeEmulator {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl EdgeEmulator for CountingEdgeEmulator {
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
        self.calls.fetch_add(1, Ordering::Relaxed);
        ClampingEdgeEmulator.emulate(dst, dst_stride, src, view, x, y, block_w, block_h);
    }
}

/// 以斜坡参考开始一幅 P 图像, P 帧头由调用方给出
fn setup_ramp_reference(ctx: &mut MpegContext, header: &PictureHeader) -> (usize, usize) {
    let reference = begin(ctx, PictureType::I);
    fill_slot_ramp(ctx, reference);
    ctx.finish_frame().unwrap();
    ctx.begin_frame(header).unwrap();
    (ctx.roles().current.unwrap(), reference)
}

/// 开始一幅 P 图像并把前向参考填为斜坡, 返回 (当前, 参考) 槽位
fn setup_p_with_ramp(codec_id: CodecId, w: u32, h: u32) -> (MpegContext, usize, usize) {
    let mut ctx = build_test_context(codec_id, w, h);
    let reference = begin(&mut ctx, PictureType::I);
    fill_slot_ramp(&ctx, reference);
    ctx.finish_frame().unwrap();
    let cur = begin(&mut ctx, PictureType::P);
    assert_eq!(ctx.roles().last, Some(reference));
    (ctx, cur, reference)
}

#[test]
fn test_zero_vector_copies_reference() {
    let (mut ctx, cur, reference) = setup_p_with_ramp(CodecId::Mpeg1Video, 32, 32);
    let mb = build_inter_mb(1, 1, MvDir::FORWARD);
    ctx.motion_compensate(&mb, 0, PixOp::Put).unwrap();
    assert_eq!(mb_luma(&ctx, cur, 1, 1), mb_luma(&ctx, reference, 1, 1));
    assert_eq!(sample_at(&ctx, cur, 1, 8, 8), sample_at(&ctx, reference, 1, 8, 8));
    // 未补偿的宏块保持分配时的内容
    assert_eq!(sample_at(&ctx, cur, 0, 0, 0), 0);
}

#[test]
fn test_integer_vector_shifts_source() {
    let (mut ctx, cur, _) = setup_p_with_ramp(CodecId::Mpeg1Video, 32, 32);
    // 半像素单位: (4, 2) 即右移 2, 下移 1
    let mb = build_inter_mb_mv(0, 0, 4, 2);
    ctx.motion_compensate(&mb, 0, PixOp::Put).unwrap();
    for (x, y) in [(0, 0), (5, 3), (13, 14)] {
        assert_eq!(sample_at(&ctx, cur, 0, x, y), ramp_luma(x + 2, y + 1), "({x}, {y})");
    }
}

#[test]
fn test_half_pel_vector_averages_neighbours() {
    let (mut ctx, cur, _) = setup_p_with_ramp(CodecId::Mpeg1Video, 32, 32);
    let mb = build_inter_mb_mv(0, 0, 1, 0);
    ctx.motion_compensate(&mb, 0, PixOp::Put).unwrap();
    // (2x + 4y + 2x + 2 + 4y + 1) >> 1 = 2x + 4y + 1
    assert_eq!(sample_at(&ctx, cur, 0, 3, 2), ramp_luma(3, 2) + 1);
    assert_eq!(sample_at(&ctx, cur, 0, 15, 15), ramp_luma(15, 15) + 1);
}

#[test]
fn test_out_of_bounds_vector_clamps_to_edge() {
    let (mut ctx, cur, _) = setup_p_with_ramp(CodecId::Mpeg1Video, 32, 32);
    // 左移 4 个像素, 上移 3 个像素, 超出图像左上角
    let mb = build_inter_mb_mv(0, 0, -8, -6);
    ctx.motion_compensate(&mb, 0, PixOp::Put).unwrap();
    for y in 0..16 {
        for x in 0..16 {
            let sx = (x as i32 - 4).max(0) as usize;
            let sy = (y as i32 - 3).max(0) as usize;
            assert_eq!(
                sample_at(&ctx, cur, 0, x, y),
                ramp_luma(sx, sy),
                "边缘模拟结果应等于钳位采样 ({x}, {y})"
            );
        }
    }
}

#[test]
fn test_out_of_bounds_bottom_right() {
    let (mut ctx, cur, _) = setup_p_with_ramp(CodecId::Mpeg4, 32, 32);
    let mb = build_inter_mb_mv(1, 1, 20, 20);
    ctx.motion_compensate(&mb, 0, PixOp::Put).unwrap();
    // 右下角宏块再右移 10 像素, 全部钳位到最后一列/行附近
    assert_eq!(sample_at(&ctx, cur, 0, 31, 31), ramp_luma(31, 31));
    assert_eq!(sample_at(&ctx, cur, 0, 16, 16), ramp_luma(26, 26));
    assert_eq!(sample_at(&ctx, cur, 0, 22, 16), ramp_luma(31, 26));
}

#[test]
fn test_bidirectional_average() {
    let mut ctx = build_test_context(CodecId::Mpeg2Video, 16, 16);
    let i = begin(&mut ctx, PictureType::I);
    fill_slot(&ctx, i, 40, 100);
    ctx.finish_frame().unwrap();
    let p = begin(&mut ctx, PictureType::P);
    fill_slot(&ctx, p, 80, 120);
    ctx.finish_frame().unwrap();

    let b = begin(&mut ctx, PictureType::B);
    let mb = build_inter_mb(0, 0, MvDir::FORWARD | MvDir::BACKWARD);
    ctx.motion_compensate(&mb, 0, PixOp::Put).unwrap();
    ctx.motion_compensate(&mb, 1, PixOp::Avg).unwrap();
    assert_eq!(sample_at(&ctx, b, 0, 7, 7), 60);
    assert_eq!(sample_at(&ctx, b, 1, 3, 3), 110);
}

#[test]
fn test_mpeg12_rejects_8x8_vectors() {
    let (mut ctx, _, _) = setup_p_with_ramp(CodecId::Mpeg2Video, 32, 32);
    let mb = Macroblock {
        mv_type: MvType::Mv8x8,
        ..build_inter_mb(0, 0, MvDir::FORWARD)
    };
    assert!(matches!(
        ctx.motion_compensate(&mb, 0, PixOp::Put),
        Err(MpvError::InvalidData(_))
    ));
}

#[test]
fn test_four_mv_uses_each_vector() {
    let (mut ctx, cur, _) = setup_p_with_ramp(CodecId::Mpeg4, 32, 32);
    let mut mb = build_inter_mb(0, 0, MvDir::FORWARD);
    mb.mv_type = MvType::Mv8x8;
    mb.mv[0] = [
        MotionVector::new(0, 0),
        MotionVector::new(2, 0),
        MotionVector::new(0, 2),
        MotionVector::new(2, 2),
    ];
    ctx.motion_compensate(&mb, 0, PixOp::Put).unwrap();
    assert_eq!(sample_at(&ctx, cur, 0, 0, 0), ramp_luma(0, 0));
    assert_eq!(sample_at(&ctx, cur, 0, 8, 0), ramp_luma(9, 0));
    assert_eq!(sample_at(&ctx, cur, 0, 0, 8), ramp_luma(0, 9));
    assert_eq!(sample_at(&ctx, cur, 0, 15, 15), ramp_luma(16, 16));
}

#[test]
fn test_global_motion_is_unsupported() {
    let (mut ctx, _, _) = setup_p_with_ramp(CodecId::Mpeg4, 32, 32);
    let mb = Macroblock {
        mcsel: true,
        ..build_inter_mb(0, 0, MvDir::FORWARD)
    };
    assert!(matches!(
        ctx.motion_compensate(&mb, 0, PixOp::Put),
        Err(MpvError::Unsupported(_))
    ));
}

#[test]
fn test_gray_mode_skips_chroma() {
    let mut config = build_test_config(CodecId::Mpeg1Video, 16, 16);
    config.flags = CodecFlags::GRAY;
    let mut ctx = build_test_context_with(config);
    let i = begin(&mut ctx, PictureType::I);
    fill_slot(&ctx, i, 90, 200);
    ctx.finish_frame().unwrap();
    let p = begin(&mut ctx, PictureType::P);
    ctx.motion_compensate(&build_inter_mb(0, 0, MvDir::FORWARD), 0, PixOp::Put)
        .unwrap();
    assert_eq!(sample_at(&ctx, p, 0, 4, 4), 90);
    assert_eq!(sample_at(&ctx, p, 1, 4, 4), 0, "灰度模式不应写入色度");
}

#[test]
fn test_field_prediction_in_frame_picture() {
    let mut ctx = build_test_context(CodecId::Mpeg2Video, 16, 32);
    let i = begin(&mut ctx, PictureType::I);
    {
        let buf = ctx.pool().buffer(i).unwrap();
        let mut planes = buf.planes_mut();
        for p in 0..3 {
            let stride = planes.linesize[p];
            for (row, line) in planes.data[p].chunks_mut(stride).enumerate() {
                line.fill(if row % 2 == 0 { 50 } else { 150 });
            }
        }
    }
    ctx.finish_frame().unwrap();
    let p = begin(&mut ctx, PictureType::P);

    let mut mb = build_inter_mb(0, 0, MvDir::FORWARD);
    mb.mv_type = MvType::Field;
    // 顶场取底场, 底场取顶场
    mb.field_select[0] = [1, 0];
    ctx.motion_compensate(&mb, 0, PixOp::Put).unwrap();
    for y in 0..16 {
        let expected = if y % 2 == 0 { 150 } else { 50 };
        assert_eq!(sample_at(&ctx, p, 0, 3, y), expected, "亮度行 {y}");
    }
    assert_eq!(sample_at(&ctx, p, 1, 2, 0), 150);
    assert_eq!(sample_at(&ctx, p, 1, 2, 1), 50);
    // 第二个宏块行未补偿
    assert_eq!(sample_at(&ctx, p, 0, 3, 16), 0);
}

#[test]
fn test_second_field_predicts_from_first_field_of_same_frame() {
    let mut ctx = build_test_context(CodecId::Mpeg2Video, 16, 32);
    ctx.interlace_mut().progressive_sequence = false;
    let top = PictureHeader {
        picture_structure: PictureStructure::TopField,
        first_field: true,
        progressive_frame: false,
        ..PictureHeader::new(PictureType::P)
    };
    ctx.begin_frame(&top).unwrap();
    let cur = ctx.roles().current.unwrap();
    {
        // 模拟第一场 (顶场) 已解码
        let buf = ctx.pool().buffer(cur).unwrap();
        let mut planes = buf.planes_mut();
        let stride = planes.linesize[0];
        for (row, line) in planes.data[0].chunks_mut(stride).enumerate() {
            if row % 2 == 0 {
                line.fill(77);
            }
        }
    }
    assert!(ctx.finish_frame().unwrap().is_none(), "第一场结束时不输出");

    let bottom = PictureHeader {
        picture_structure: PictureStructure::BottomField,
        first_field: false,
        ..top
    };
    ctx.begin_second_field(&bottom).unwrap();
    let mut mb = build_inter_mb(0, 0, MvDir::FORWARD);
    mb.field_select[0][0] = 0;
    ctx.motion_compensate(&mb, 0, PixOp::Put).unwrap();
    for y in (1..32).step_by(2) {
        assert_eq!(sample_at(&ctx, cur, 0, 5, y), 77, "底场行 {y} 应取自本帧顶场");
    }
}

#[test]
fn test_lowres_zero_vector_copy() {
    let mut ctx = build_test_context_with(
        build_test_config(CodecId::Mpeg4, 32, 32).with_lowres(1),
    );
    let i = begin(&mut ctx, PictureType::I);
    fill_slot_ramp(&ctx, i);
    ctx.finish_frame().unwrap();
    let p = begin(&mut ctx, PictureType::P);
    assert_eq!(ctx.linesize(), 16, "lowres 1 的行距减半");

    ctx.motion_compensate(&build_inter_mb(1, 1, MvDir::FORWARD), 0, PixOp::Put)
        .unwrap();
    assert_eq!(mb_luma(&ctx, p, 1, 1), mb_luma(&ctx, i, 1, 1));
    assert_eq!(sample_at(&ctx, p, 1, 7, 7), sample_at(&ctx, i, 1, 7, 7));
}

#[test]
fn test_lowres_integer_vector() {
    let mut ctx = build_test_context_with(
        build_test_config(CodecId::Mpeg1Video, 32, 32).with_lowres(1),
    );
    let i = begin(&mut ctx, PictureType::I);
    fill_slot_ramp(&ctx, i);
    ctx.finish_frame().unwrap();
    let p = begin(&mut ctx, PictureType::P);
    // 半像素单位 8 = 全分辨率 4 像素 = lowres 1 下 2 像素
    let mb = build_inter_mb_mv(0, 0, 8, 0);
    ctx.motion_compensate(&mb, 0, PixOp::Put).unwrap();
    assert_eq!(sample_at(&ctx, p, 0, 0, 0), ramp_luma(2, 0));
    assert_eq!(sample_at(&ctx, p, 0, 5, 3), ramp_luma(7, 3));
}

#[test]
fn test_lowest_referenced_row() {
    let mut ctx = build_test_context(CodecId::Mpeg1Video, 32, 128);
    begin(&mut ctx, PictureType::P);
    let mb = build_inter_mb_mv(0, 0, 0, 40);
    // ((40 << 1) + 63) >> 6 = 2
    assert_eq!(ctx.lowest_referenced_row(&mb, 0), 2);
    let up = build_inter_mb_mv(0, 1, 0, -70);
    assert_eq!(ctx.lowest_referenced_row(&up, 0), 1 + 3, "向上的向量按绝对值计算");
    let far = build_inter_mb_mv(0, 3, 0, 400);
    assert_eq!(ctx.lowest_referenced_row(&far, 0), 7, "结果钳位到最后一行");

    let field = Macroblock {
        mv_type: MvType::Field,
        ..build_inter_mb(0, 0, MvDir::FORWARD)
    };
    assert_eq!(ctx.lowest_referenced_row(&field, 0), 7, "场向量保守地返回最后一行");
}

#[test]
fn test_missing_reference_is_invalid_data() {
    let mut ctx = build_test_context(CodecId::Mpeg1Video, 16, 16);
    begin(&mut ctx, PictureType::I);
    // I 图像没有前向参考
    let err = ctx
        .motion_compensate(&build_inter_mb(0, 0, MvDir::FORWARD), 0, PixOp::Put)
        .unwrap_err();
    assert!(matches!(err, MpvError::InvalidData(_)));
}

#[test]
fn test_edge_emulation_starts_one_pixel_past_the_edge() {
    init_test_logger();
    let counter = Arc::new(CountingEdgeEmulator::default());
    let kernels = DspKernels {
        edge_emu: counter.clone(),
        ..DspKernels::reference()
    };
    let mut ctx = MpegContext::new(build_test_config(CodecId::Mpeg1Video, 32, 32), kernels);
    ctx.common_init().unwrap();
    let (cur, _) = setup_ramp_reference(&mut ctx, &PictureHeader::new(PictureType::P));

    // 右下角宏块: 左移半像素后插值窗口恰好结束于右边缘
    ctx.motion_compensate(&build_inter_mb_mv(1, 1, -1, 0), 0, PixOp::Put)
        .unwrap();
    assert_eq!(counter.calls(), 0, "恰好贴边的取块不需要边缘模拟");
    assert_eq!(sample_at(&ctx, cur, 0, 16, 20), ramp_luma(15, 20) + 1);
    assert_eq!(sample_at(&ctx, cur, 0, 31, 20), ramp_luma(30, 20) + 1);

    ctx.motion_compensate(&build_inter_mb_mv(1, 1, 0, -1), 0, PixOp::Put)
        .unwrap();
    assert_eq!(counter.calls(), 0);

    // 右移半像素: 亮度多读一列, 越出一个像素; 色度向量取整为 0, 不越界
    ctx.motion_compensate(&build_inter_mb_mv(1, 1, 1, 0), 0, PixOp::Put)
        .unwrap();
    assert_eq!(counter.calls(), 1, "越出一个像素即需要边缘模拟");
    assert_eq!(sample_at(&ctx, cur, 0, 30, 20), ramp_luma(30, 20) + 1);
    assert_eq!(sample_at(&ctx, cur, 0, 31, 20), ramp_luma(31, 20), "越界列取边缘采样");

    ctx.motion_compensate(&build_inter_mb_mv(1, 1, 0, 1), 0, PixOp::Put)
        .unwrap();
    assert_eq!(counter.calls(), 2);
    assert_eq!(sample_at(&ctx, cur, 0, 20, 31), ramp_luma(20, 31));
}

#[test]
fn test_dual_prime_puts_then_averages() {
    let mut ctx = build_test_context(CodecId::Mpeg2Video, 32, 32);
    let (cur, _) = setup_ramp_reference(&mut ctx, &PictureHeader::new(PictureType::P));

    let mut mb = build_inter_mb(0, 0, MvDir::FORWARD);
    mb.mv_type = MvType::DualPrime;
    mb.mv[0] = [
        // 同奇偶场
        MotionVector::new(0, 0),
        MotionVector::new(0, 0),
        // 相反奇偶场: 顶场取底场右移 1 像素, 底场取顶场下移 1 场行
        MotionVector::new(2, 0),
        MotionVector::new(0, 2),
    ];
    ctx.motion_compensate(&mb, 0, PixOp::Put).unwrap();
    for x in [0, 7, 15] {
        for r in [0, 3, 7] {
            let (top, bottom) = (2 * r, 2 * r + 1);
            // (ramp(x, 2r) + ramp(x + 1, 2r + 1) + 1) >> 1
            assert_eq!(sample_at(&ctx, cur, 0, x, top), ramp_luma(x, top) + 3, "顶场 ({x}, {top})");
            // (ramp(x, 2r + 1) + ramp(x, 2r + 2) + 1) >> 1
            assert_eq!(
                sample_at(&ctx, cur, 0, x, bottom),
                ramp_luma(x, bottom) + 2,
                "底场 ({x}, {bottom})"
            );
        }
    }
    // 色度顶场: c(x, 2r) 与底场水平半像素的平均
    assert_eq!(sample_at(&ctx, cur, 1, 3, 0), 3 + 2);
    assert_eq!(sample_at(&ctx, cur, 1, 3, 2), 3 + 4 + 2);
    // 色度底场: 两次预测相同
    assert_eq!(sample_at(&ctx, cur, 2, 3, 1), 3 + 2);
}

#[test]
fn test_16x8_halves_in_second_field() {
    let mut ctx = build_test_context(CodecId::Mpeg2Video, 32, 32);
    ctx.interlace_mut().progressive_sequence = false;
    let i = begin(&mut ctx, PictureType::I);
    fill_slot_ramp(&ctx, i);
    ctx.finish_frame().unwrap();

    let top = PictureHeader {
        picture_structure: PictureStructure::TopField,
        first_field: true,
        progressive_frame: false,
        ..PictureHeader::new(PictureType::P)
    };
    ctx.begin_frame(&top).unwrap();
    let cur = ctx.roles().current.unwrap();
    {
        let buf = ctx.pool().buffer(cur).unwrap();
        let mut planes = buf.planes_mut();
        let stride = planes.linesize[0];
        for (row, line) in planes.data[0].chunks_mut(stride).enumerate() {
            if row % 2 == 0 {
                line.fill(77);
            }
        }
    }
    ctx.finish_frame().unwrap();

    let bottom = PictureHeader {
        picture_structure: PictureStructure::BottomField,
        first_field: false,
        ..top
    };
    ctx.begin_second_field(&bottom).unwrap();
    assert_eq!(ctx.roles().last, Some(i));

    let mut mb = build_inter_mb(0, 0, MvDir::FORWARD);
    mb.mv_type = MvType::Mv16x8;
    // 上半取本帧顶场, 下半取参考帧底场并右移 1 像素
    mb.field_select[0] = [0, 1];
    mb.mv[0][1] = MotionVector::new(2, 0);
    ctx.motion_compensate(&mb, 0, PixOp::Put).unwrap();

    for y in (1..16).step_by(2) {
        assert_eq!(sample_at(&ctx, cur, 0, 4, y), 77, "上半 (行 {y}) 应取自本帧第一场");
    }
    for y in (17..32).step_by(2) {
        assert_eq!(sample_at(&ctx, cur, 0, 4, y), ramp_luma(5, y), "下半 (行 {y})");
        assert_eq!(sample_at(&ctx, cur, 0, 15, y), ramp_luma(16, y));
    }
    // 第一场不受影响
    assert_eq!(sample_at(&ctx, cur, 0, 4, 16), 77);
}

#[test]
fn test_quarter_sample_uses_qpel_interpolation() {
    let mut ctx = build_test_context(CodecId::Mpeg4, 32, 32);
    let header = PictureHeader {
        quarter_sample: true,
        ..PictureHeader::new(PictureType::P)
    };
    let (cur, _) = setup_ramp_reference(&mut ctx, &header);

    // 四分之一像素单位: (6, 4) 即右移 1.5, 下移 1
    let mb = build_inter_mb_mv(0, 0, 6, 4);
    ctx.motion_compensate(&mb, 0, PixOp::Put).unwrap();
    for (x, y) in [(0, 0), (7, 3), (15, 15)] {
        assert_eq!(sample_at(&ctx, cur, 0, x, y), ramp_luma(x + 1, y + 1) + 1, "({x}, {y})");
    }
    // 色度向量 (1.5, 1) 取整到半像素对角相位: c(x, y) + 2
    assert_eq!(sample_at(&ctx, cur, 1, 3, 3), 3 + 6 + 2);
    assert_eq!(sample_at(&ctx, cur, 2, 0, 0), 2);
}

#[test]
fn test_mpeg2_field_vectors_ignore_quarter_sample() {
    let mut ctx = build_test_context(CodecId::Mpeg2Video, 32, 32);
    let header = PictureHeader {
        quarter_sample: true,
        ..PictureHeader::new(PictureType::P)
    };
    let (cur, _) = setup_ramp_reference(&mut ctx, &header);

    let mut mb = build_inter_mb(0, 0, MvDir::FORWARD);
    mb.mv_type = MvType::Field;
    mb.field_select[0] = [0, 1];
    mb.mv[0][0] = MotionVector::new(2, 0);
    mb.mv[0][1] = MotionVector::new(2, 0);
    ctx.motion_compensate(&mb, 0, PixOp::Put).unwrap();
    // 半像素单位的 2 即整 1 像素
    for y in [0, 1, 6, 15] {
        assert_eq!(sample_at(&ctx, cur, 0, 3, y), ramp_luma(4, y), "行 {y}");
    }
}

#[test]
fn test_yuv444_chroma_uses_luma_vector() {
    let mut ctx = build_test_context_with(
        build_test_config(CodecId::Mpeg2Video, 32, 32).with_pixel_format(PixelFormat::Yuv444p),
    );
    assert_eq!(ctx.chroma_shift(), (0, 0));
    let (cur, _) = setup_ramp_reference(&mut ctx, &PictureHeader::new(PictureType::P));

    // (1.5, 1) 像素: 水平半像素
    ctx.motion_compensate(&build_inter_mb_mv(0, 0, 3, 2), 0, PixOp::Put)
        .unwrap();
    assert_eq!(sample_at(&ctx, cur, 0, 0, 0), ramp_luma(0, 0) + 7);
    assert_eq!(sample_at(&ctx, cur, 0, 15, 15), ramp_luma(15, 15) + 7);
    // 色度块为 16x16, (x + 1.5) + 2 (y + 1)
    for plane in 1..3 {
        assert_eq!(sample_at(&ctx, cur, plane, 0, 0), 4);
        assert_eq!(sample_at(&ctx, cur, plane, 15, 15), 15 + 30 + 4);
    }
    assert_eq!(sample_at(&ctx, cur, 1, 16, 0), 0, "宏块外的色度未写入");
}

#[test]
fn test_h261_chroma_is_full_pel() {
    let (mut ctx, cur, _) = setup_p_with_ramp(CodecId::H261, 32, 32);
    ctx.motion_compensate(&build_inter_mb_mv(0, 1, 6, -6), 0, PixOp::Put)
        .unwrap();
    assert_eq!(sample_at(&ctx, cur, 0, 0, 16), ramp_luma(3, 13));
    assert_eq!(sample_at(&ctx, cur, 0, 15, 31), ramp_luma(18, 28));
    // 色度向量 6 / 4 = 1, -6 / 4 = -1, 无插值
    for (cx, cy) in [(0, 0), (3, 5), (7, 7)] {
        let expected = (1 + cx) + 2 * (7 + cy);
        assert_eq!(sample_at(&ctx, cur, 1, cx, 8 + cy) as usize, expected, "({cx}, {cy})");
        assert_eq!(sample_at(&ctx, cur, 2, cx, 8 + cy) as usize, expected);
    }
}
