//! mpegvideo 解码上下文
//!
//! MPEG-1/2, H.261/H.263 系与 MPEG-4 Part 2 解码器共用的帧缓冲生命周期管理与
//! 运动补偿重建核心. 码流解析由各编解码器完成, 解析结果以 [`PictureHeader`]
//! 与 [`Macroblock`] 的形式交给本上下文.
//!
//! ## 模块结构
//!
//! - `types`: 宏块与图像头类型 (MvType, PictureStructure, Macroblock 等)
//! - `progress`: 帧级并行的逐行解码进度
//! - `picture`: 共享帧缓冲与缓冲池槽位
//! - `pool`: 固定容量缓冲池与参考角色
//! - `frame_start`: 图像开始/结束, 输出重排序, 刷新
//! - `edge_emu`: 边缘模拟与暂存区
//! - `pixel_ops`: 像素插值原语
//! - `motion`, `motion_lowres`: 全分辨率与降分辨率运动补偿
//! - `idct`, `dequant`: 反变换与反量化内核
//! - `reconstruct`: 宏块重建
//! - `size_change`: 初始化与尺寸变化
//! - `thread_sync`: 帧级并行上下文同步
//! - `export`: 量化参数导出与调试输出

mod dequant;
mod edge_emu;
mod export;
mod frame_start;
mod idct;
mod motion;
mod motion_lowres;
mod picture;
mod pixel_ops;
mod pool;
mod progress;
mod reconstruct;
mod size_change;
mod thread_sync;
mod types;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

use crate::codec_id::{CodecId, OutputFormat};
use crate::config::{BugFlags, CodecFlags, DecoderConfig};
use crate::frame::PictureType;

pub use dequant::{
    DEFAULT_INTER_MATRIX, DEFAULT_INTRA_MATRIX, Dequantizer, QuantParams, StandardDequantizer,
};
pub use edge_emu::{ClampingEdgeEmulator, EdgeEmulator, PlaneView, ScratchBuffers};
pub use idct::{InverseTransform, SimpleIdct};
pub use picture::{FrameBuffer, FrameGeometry, MbTables, Picture, Planes, ReferenceKind};
pub use pixel_ops::{BilinearPixelOps, PixOp, PixelOps};
pub use pool::{MAX_PICTURE_COUNT, PicturePool, RoleSet};
pub use progress::{DecodeProgress, PROGRESS_DONE, PROGRESS_NONE};
pub use size_change::check_image_size;
pub use thread_sync::{BITSTREAM_PADDING, SyncedScalars, ThreadState};
pub use types::{
    DequantVariant, Macroblock, MbTypeFlags, MotionVector, MvDir, MvType, PictureHeader,
    PictureStructure, QscaleType,
};

/// 上下文实例编号分配器
static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// 注入的 DSP 内核
#[derive(Clone)]
pub struct DspKernels {
    /// 像素插值
    pub pixel_ops: Arc<dyn PixelOps>,
    /// 边缘模拟
    pub edge_emu: Arc<dyn EdgeEmulator>,
    /// 反变换
    pub idct: Arc<dyn InverseTransform>,
    /// 反量化
    pub dequant: Arc<dyn Dequantizer>,
}

impl DspKernels {
    /// 参考实现: 双线性插值, 钳位边缘模拟, simple IDCT, 标准反量化
    pub fn reference() -> Self {
        Self {
            pixel_ops: Arc::new(BilinearPixelOps),
            edge_emu: Arc::new(ClampingEdgeEmulator),
            idct: Arc::new(SimpleIdct),
            dequant: Arc::new(StandardDequantizer),
        }
    }
}

impl fmt::Debug for DspKernels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DspKernels").finish_non_exhaustive()
    }
}

/// MPEG-4 时间戳状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mpeg4Timing {
    /// 上一个 VOP 的时间基
    pub last_time_base: i32,
    /// 当前时间基
    pub time_base: i32,
    /// 当前 VOP 时间
    pub time: i64,
    /// 上一个非 B VOP 的时间
    pub last_non_b_time: i64,
    /// 相邻 P 帧间距
    pub pp_time: u16,
    /// B 帧到前一 P 帧的间距
    pub pb_time: u16,
    /// 场间距 (P-P)
    pub pp_field_time: u16,
    /// 场间距 (P-B)
    pub pb_field_time: u16,
}

/// MPEG-2 隔行与图像编码扩展状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterlaceState {
    /// 逐行序列
    pub progressive_sequence: bool,
    /// 逐行帧
    pub progressive_frame: bool,
    /// 图像结构
    pub picture_structure: PictureStructure,
    /// 场对中的第一场
    pub first_field: bool,
    /// 顶场优先
    pub top_field_first: bool,
    /// 交替扫描
    pub alternate_scan: bool,
    /// 非线性 qscale
    pub q_scale_type: bool,
    /// 帧内 DC 精度
    pub intra_dc_precision: u8,
    /// 仅帧预测与帧 DCT
    pub frame_pred_frame_dct: bool,
    /// 隐藏运动向量
    pub concealment_motion_vectors: bool,
    /// 重复首场
    pub repeat_first_field: bool,
    /// 4:2:0 色度类型
    pub chroma_420_type: bool,
    /// 运动向量范围码 `[方向][分量]`
    pub mpeg_f_code: [[u8; 2]; 2],
}

impl Default for InterlaceState {
    fn default() -> Self {
        Self {
            progressive_sequence: true,
            progressive_frame: true,
            picture_structure: PictureStructure::Frame,
            first_field: false,
            top_field_first: false,
            alternate_scan: false,
            q_scale_type: false,
            intra_dc_precision: 0,
            frame_pred_frame_dct: true,
            concealment_motion_vectors: false,
            repeat_first_field: false,
            chroma_420_type: false,
            mpeg_f_code: [[1; 2]; 2],
        }
    }
}

/// 条带并行的每线程上下文
#[derive(Debug, Clone)]
pub struct SliceContext {
    /// 起始宏块行
    pub start_mb_y: usize,
    /// 结束宏块行 (不含)
    pub end_mb_y: usize,
    scratch: Option<ScratchBuffers>,
}

impl SliceContext {
    fn new(start_mb_y: usize, end_mb_y: usize) -> Self {
        Self {
            start_mb_y,
            end_mb_y,
            scratch: None,
        }
    }

    /// 是否已分配暂存区
    pub fn has_scratch(&self) -> bool {
        self.scratch.is_some()
    }
}

/// mpegvideo 解码上下文
pub struct MpegContext {
    id: u64,
    config: DecoderConfig,
    kernels: DspKernels,
    out_format: OutputFormat,

    // 尺寸
    width: u32,
    height: u32,
    chroma_x_shift: u32,
    chroma_y_shift: u32,
    mb_width: usize,
    mb_height: usize,
    mb_stride: usize,
    b8_stride: usize,
    mb_num: usize,
    h_edge_pos: i32,
    v_edge_pos: i32,
    linesize: usize,
    uvlinesize: usize,
    context_initialized: bool,
    context_reinit: bool,

    // 帧缓冲
    pool: PicturePool,
    roles: RoleSet,

    // 图像级状态
    pict_type: PictureType,
    droppable: bool,
    interlace: InterlaceState,
    mpeg_quant: bool,
    quarter_sample: bool,
    no_rounding: bool,
    low_delay: bool,
    max_b_frames: u32,
    coded_picture_number: u32,
    picture_number: u32,
    workaround_bugs: BugFlags,
    padding_bug_score: i32,
    divx_packed: bool,
    timing: Mpeg4Timing,
    dequant_variant: DequantVariant,
    quant: QuantParams,

    // 宏块位置与错误状态
    mb_x: usize,
    mb_y: usize,
    partitioned_frame: bool,
    error_occurred: bool,

    // 打包码流的残余数据 (含 0 填充)
    bitstream_buffer: Vec<u8>,
    bitstream_buffer_size: usize,

    // 尺寸相关的每上下文表
    mbskip_table: Vec<u8>,
    mb_index2xy: Vec<usize>,
    slice_contexts: Vec<SliceContext>,
}

impl fmt::Debug for MpegContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpegContext")
            .field("id", &self.id)
            .field("codec_id", &self.config.codec_id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("initialized", &self.context_initialized)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

impl MpegContext {
    /// 创建未初始化的上下文 (对标 ff_mpv_decode_init)
    ///
    /// 尺寸取自配置的编码宽高, 图像结构默认为完整帧.
    pub fn new(config: DecoderConfig, kernels: DspKernels) -> Self {
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            "mpegvideo: 创建上下文 #{id}, codec={}, {}x{}",
            config.codec_id, config.width, config.height
        );
        Self {
            id,
            out_format: config.codec_id.output_format(),
            width: config.width,
            height: config.height,
            workaround_bugs: config.workaround_bugs,
            kernels,
            config,
            chroma_x_shift: 0,
            chroma_y_shift: 0,
            mb_width: 0,
            mb_height: 0,
            mb_stride: 0,
            b8_stride: 0,
            mb_num: 0,
            h_edge_pos: 0,
            v_edge_pos: 0,
            linesize: 0,
            uvlinesize: 0,
            context_initialized: false,
            context_reinit: false,
            pool: PicturePool::new(),
            roles: RoleSet::default(),
            pict_type: PictureType::None,
            droppable: false,
            interlace: InterlaceState::default(),
            mpeg_quant: false,
            quarter_sample: false,
            no_rounding: false,
            low_delay: false,
            max_b_frames: 0,
            coded_picture_number: 0,
            picture_number: 0,
            padding_bug_score: 0,
            divx_packed: false,
            timing: Mpeg4Timing::default(),
            dequant_variant: DequantVariant::Mpeg1,
            quant: QuantParams::default(),
            mb_x: 0,
            mb_y: 0,
            partitioned_frame: false,
            error_occurred: false,
            bitstream_buffer: Vec::new(),
            bitstream_buffer_size: 0,
            mbskip_table: Vec::new(),
            mb_index2xy: Vec::new(),
            slice_contexts: Vec::new(),
        }
    }

    /// 以相同配置与内核创建新实例 (用于帧级并行的工作线程)
    pub fn fork(&self) -> Self {
        Self::new(self.config.clone(), self.kernels.clone())
    }

    /// 实例编号
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 配置
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// 编解码器
    pub fn codec_id(&self) -> CodecId {
        self.config.codec_id
    }

    /// 码流族
    pub fn output_format(&self) -> OutputFormat {
        self.out_format
    }

    /// 是否已初始化
    pub fn is_initialized(&self) -> bool {
        self.context_initialized
    }

    /// 尺寸变化失败后等待重新初始化
    pub fn needs_reinit(&self) -> bool {
        self.context_reinit
    }

    /// 编码宽度
    pub fn width(&self) -> u32 {
        self.width
    }

    /// 编码高度
    pub fn height(&self) -> u32 {
        self.height
    }

    /// 设置新尺寸 (序列头变化时), 之后需调用 [`Self::frame_size_change`]
    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// 宏块列数
    pub fn mb_width(&self) -> usize {
        self.mb_width
    }

    /// 宏块行数
    pub fn mb_height(&self) -> usize {
        self.mb_height
    }

    /// 宏块表行距
    pub fn mb_stride(&self) -> usize {
        self.mb_stride
    }

    /// 色度位移 (水平, 垂直)
    pub fn chroma_shift(&self) -> (u32, u32) {
        (self.chroma_x_shift, self.chroma_y_shift)
    }

    /// 亮度行距, 0 表示尚未分配过帧
    pub fn linesize(&self) -> usize {
        self.linesize
    }

    /// 色度行距
    pub fn uvlinesize(&self) -> usize {
        self.uvlinesize
    }

    /// 运动补偿边缘位置 (水平, 垂直), 默认对齐到宏块
    pub fn edge_pos(&self) -> (i32, i32) {
        (self.h_edge_pos, self.v_edge_pos)
    }

    /// 覆盖运动补偿边缘位置 (H.263 系以可见尺寸为边缘)
    pub fn set_edge_pos(&mut self, h_edge_pos: i32, v_edge_pos: i32) {
        self.h_edge_pos = h_edge_pos;
        self.v_edge_pos = v_edge_pos;
    }

    /// 缓冲池
    pub fn pool(&self) -> &PicturePool {
        &self.pool
    }

    /// 参考角色
    pub fn roles(&self) -> RoleSet {
        self.roles
    }

    /// 当前图像槽位
    pub fn current_picture(&self) -> Option<&Picture> {
        self.roles.current.and_then(|i| self.pool.get(i))
    }

    /// 前向参考槽位
    pub fn last_picture(&self) -> Option<&Picture> {
        self.roles.last.and_then(|i| self.pool.get(i))
    }

    /// 后向参考槽位
    pub fn next_picture(&self) -> Option<&Picture> {
        self.roles.next.and_then(|i| self.pool.get(i))
    }

    /// 当前图像类型
    pub fn pict_type(&self) -> PictureType {
        self.pict_type
    }

    /// 隔行状态
    pub fn interlace(&self) -> &InterlaceState {
        &self.interlace
    }

    /// 可变隔行状态 (序列扩展与图像编码扩展由解析器写入)
    pub fn interlace_mut(&mut self) -> &mut InterlaceState {
        &mut self.interlace
    }

    /// 当前反量化方式
    pub fn dequant_variant(&self) -> DequantVariant {
        self.dequant_variant
    }

    /// 反量化参数
    pub fn quant_params(&self) -> &QuantParams {
        &self.quant
    }

    /// 可变反量化参数
    pub fn quant_params_mut(&mut self) -> &mut QuantParams {
        &mut self.quant
    }

    /// MPEG-4 时间戳
    pub fn timing(&self) -> &Mpeg4Timing {
        &self.timing
    }

    /// 可变 MPEG-4 时间戳
    pub fn timing_mut(&mut self) -> &mut Mpeg4Timing {
        &mut self.timing
    }

    /// 低延迟模式 (无 B 帧重排序)
    pub fn low_delay(&self) -> bool {
        self.low_delay
    }

    /// 设置低延迟模式
    pub fn set_low_delay(&mut self, low_delay: bool) {
        self.low_delay = low_delay;
    }

    /// 设置最大连续 B 帧数
    pub fn set_max_b_frames(&mut self, max_b_frames: u32) {
        self.max_b_frames = max_b_frames;
    }

    /// 已开始的图像数 (编码顺序)
    pub fn coded_picture_number(&self) -> u32 {
        self.coded_picture_number
    }

    /// 缺陷规避标志
    pub fn workaround_bugs(&self) -> BugFlags {
        self.workaround_bugs
    }

    /// 设置缺陷规避标志 (解析器自动检测后更新)
    pub fn set_workaround_bugs(&mut self, bugs: BugFlags) {
        self.workaround_bugs = bugs;
    }

    /// 设置 DivX 打包 B 帧标志与填充缺陷计分
    pub fn set_divx_state(&mut self, divx_packed: bool, padding_bug_score: i32) {
        self.divx_packed = divx_packed;
        self.padding_bug_score = padding_bug_score;
    }

    /// 数据分区帧 (此时逐行进度不可靠, 不报告)
    pub fn set_partitioned_frame(&mut self, partitioned: bool) {
        self.partitioned_frame = partitioned;
    }

    /// 记录当前图像出现解码错误
    pub fn set_error_occurred(&mut self, error: bool) {
        self.error_occurred = error;
    }

    /// 当前宏块位置
    pub fn mb_position(&self) -> (usize, usize) {
        (self.mb_x, self.mb_y)
    }

    /// 设置当前宏块位置 (解析器推进宏块行时调用)
    pub fn set_mb_position(&mut self, mb_x: usize, mb_y: usize) {
        self.mb_x = mb_x;
        self.mb_y = mb_y;
    }

    /// 条带上下文
    pub fn slice_contexts(&self) -> &[SliceContext] {
        &self.slice_contexts
    }

    /// 跳过宏块表
    pub fn mbskip_table(&self) -> &[u8] {
        &self.mbskip_table
    }

    /// 宏块序号到表下标的映射
    pub fn mb_index2xy(&self) -> &[usize] {
        &self.mb_index2xy
    }

    /// 宏块总数
    pub fn mb_num(&self) -> usize {
        self.mb_num
    }

    /// 是否跳过色度
    fn gray_only(&self) -> bool {
        self.config.flags.contains(CodecFlags::GRAY)
    }

    /// 当前是否为场图像
    fn field_pic(&self) -> bool {
        self.interlace.picture_structure.is_field()
    }

    /// 帧缓冲尺寸描述
    fn frame_geometry(&self) -> FrameGeometry {
        FrameGeometry {
            width: self.width,
            height: self.height,
            pixel_format: self.config.pixel_format,
            chroma_x_shift: self.chroma_x_shift,
            chroma_y_shift: self.chroma_y_shift,
            mb_width: self.mb_width,
            mb_height: self.mb_height,
            mb_stride: self.mb_stride,
            b8_stride: self.b8_stride,
            lowres: self.config.lowres,
        }
    }

    /// 当前图像的帧缓冲
    fn current_buffer(&self) -> Option<Arc<FrameBuffer>> {
        self.roles.current.and_then(|i| self.pool.buffer(i))
    }

    /// 方向 `dir` (0: 前向, 1: 后向) 的参考帧缓冲
    fn reference_buffer(&self, dir: usize) -> Option<Arc<FrameBuffer>> {
        let role = if dir == 0 {
            self.roles.last
        } else {
            self.roles.next
        };
        role.and_then(|i| self.pool.buffer(i))
    }
}
