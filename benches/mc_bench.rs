//! mpegvideo 解码核心性能基准测试.
//!
//! 覆盖整帧运动补偿 (整像素, 半像素, 越界向量), 帧内重建与像素插值原语.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use mpegvideo::codec::mpegvideo::{
    BilinearPixelOps, DspKernels, Macroblock, MotionVector, MvDir, PictureHeader, PixOp, PixelOps,
};
use mpegvideo::codec::{CodecId, DecoderConfig, MpegContext, PictureType};

const WIDTH: u32 = 352;
const HEIGHT: u32 = 288;

/// 创建 CIF 上下文并解码一幅灰色 I 帧作为参考
fn make_context(codec_id: CodecId, lowres: u8) -> MpegContext {
    let config = DecoderConfig::new(codec_id, WIDTH, HEIGHT).with_lowres(lowres);
    let mut ctx = MpegContext::new(config, DspKernels::reference());
    ctx.common_init().unwrap();
    ctx.begin_frame(&PictureHeader::new(PictureType::I)).unwrap();
    for mb_y in 0..ctx.mb_height() {
        for mb_x in 0..ctx.mb_width() {
            let mut mb = Macroblock::intra(mb_x, mb_y);
            let mut blocks = [[0i16; 64]; 12];
            for (n, block) in blocks.iter_mut().enumerate().take(6) {
                block[0] = ((mb_x * 37 + mb_y * 11 + n * 5) % 2040) as i16;
                mb.block_last_index[n] = 0;
            }
            ctx.reconstruct_mb(&mb, &mut blocks).unwrap();
        }
    }
    ctx.finish_frame().unwrap();
    ctx
}

/// 以固定向量解码一整幅 P 帧
fn decode_p_frame(ctx: &mut MpegContext, mv: MotionVector) {
    ctx.begin_frame(&PictureHeader::new(PictureType::P)).unwrap();
    let mut blocks = [[0i16; 64]; 12];
    for mb_y in 0..ctx.mb_height() {
        for mb_x in 0..ctx.mb_width() {
            let mut mb = Macroblock::inter(mb_x, mb_y, MvDir::FORWARD);
            mb.mv[0][0] = mv;
            ctx.reconstruct_mb(&mb, &mut blocks).unwrap();
        }
    }
    ctx.finish_frame().unwrap();
}

fn bench_p_frame_mc(c: &mut Criterion) {
    let mut group = c.benchmark_group("p_frame_mc_cif");
    let cases = [
        ("integer", MotionVector::new(4, 2)),
        ("half_pel", MotionVector::new(3, 5)),
        ("edge_emu", MotionVector::new(-40, -40)),
    ];
    for (name, mv) in cases {
        group.bench_with_input(BenchmarkId::new("mpeg2", name), &mv, |b, &mv| {
            let mut ctx = make_context(CodecId::Mpeg2Video, 0);
            b.iter(|| decode_p_frame(&mut ctx, black_box(mv)));
        });
    }
    group.finish();
}

fn bench_lowres_mc(c: &mut Criterion) {
    let mut group = c.benchmark_group("p_frame_mc_lowres");
    for lowres in 1..=3u8 {
        group.bench_with_input(BenchmarkId::from_parameter(lowres), &lowres, |b, &lowres| {
            let mut ctx = make_context(CodecId::Mpeg2Video, lowres);
            b.iter(|| decode_p_frame(&mut ctx, black_box(MotionVector::new(5, 3))));
        });
    }
    group.finish();
}

fn bench_intra_frame(c: &mut Criterion) {
    c.bench_function("intra_frame_cif_mpeg1", |b| {
        b.iter(|| black_box(make_context(CodecId::Mpeg1Video, 0)));
    });
}

fn bench_pixel_ops(c: &mut Criterion) {
    let ops = BilinearPixelOps;
    let stride = 64;
    let src: Vec<u8> = (0..stride * 32).map(|i| (i * 7 % 251) as u8).collect();
    let mut dst = vec![0u8; stride * 16];

    let mut group = c.benchmark_group("pixel_ops_16x16");
    for dxy in 0..4 {
        group.bench_with_input(BenchmarkId::new("hpel", dxy), &dxy, |b, &dxy| {
            b.iter(|| {
                ops.hpel(PixOp::Put, &mut dst, stride, black_box(&src), stride, 16, 16, dxy);
            });
        });
    }
    group.bench_function("qpel_avg_5", |b| {
        b.iter(|| {
            ops.qpel(PixOp::Avg, &mut dst, stride, black_box(&src), stride, 16, 16, 5);
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_p_frame_mc,
    bench_lowres_mc,
    bench_intra_frame,
    bench_pixel_ops
);
criterion_main!(benches);
