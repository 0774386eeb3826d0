//! 固定容量的帧缓冲池与参考角色.
//!
//! 角色 (current/last/next) 以槽位索引表示, 槽位在池中的位置在上下文之间一致,
//! 因此上下文同步时无需地址换算.

use std::sync::Arc;

use log::trace;
use mpegvideo_core::{MpvError, MpvResult};

use super::picture::{FrameBuffer, FrameGeometry, Picture};

/// 缓冲池容量
pub const MAX_PICTURE_COUNT: usize = 36;

/// 三个参考角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet {
    /// 正在解码的图像
    pub current: Option<usize>,
    /// 前向参考
    pub last: Option<usize>,
    /// 后向参考
    pub next: Option<usize>,
}

impl RoleSet {
    /// 槽位是否承担任一角色
    pub fn holds(&self, idx: usize) -> bool {
        self.current == Some(idx) || self.last == Some(idx) || self.next == Some(idx)
    }

    /// 清空全部角色
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// 帧缓冲池
#[derive(Debug, Clone)]
pub struct PicturePool {
    slots: Vec<Picture>,
}

impl Default for PicturePool {
    fn default() -> Self {
        Self::new()
    }
}

impl PicturePool {
    /// 创建全部空闲的缓冲池
    pub fn new() -> Self {
        Self {
            slots: vec![Picture::default(); MAX_PICTURE_COUNT],
        }
    }

    /// 容量
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// 获取槽位
    pub fn get(&self, idx: usize) -> Option<&Picture> {
        self.slots.get(idx)
    }

    /// 获取可变槽位
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Picture> {
        self.slots.get_mut(idx)
    }

    /// 获取槽位的帧缓冲
    pub fn buffer(&self, idx: usize) -> Option<Arc<FrameBuffer>> {
        self.slots.get(idx).and_then(Picture::buffer)
    }

    /// 遍历全部槽位
    pub fn iter(&self) -> impl Iterator<Item = &Picture> {
        self.slots.iter()
    }

    /// 持有缓冲的槽位数
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|p| p.has_data()).count()
    }

    /// 查找可用槽位
    ///
    /// 空闲槽位或标记为需要重新分配的槽位均可用; 后者的旧缓冲在交出前释放.
    /// 承担角色的槽位不参与分配.
    pub fn find_unused_slot(&mut self, roles: &RoleSet) -> MpvResult<usize> {
        let idx = self
            .slots
            .iter()
            .enumerate()
            .find(|(i, p)| !roles.holds(*i) && (!p.has_data() || p.needs_realloc))
            .map(|(i, _)| i)
            .ok_or(MpvError::NoBufferAvailable)?;
        if self.slots[idx].needs_realloc {
            trace!("槽位 {idx} 尺寸已变化, 释放旧缓冲后复用");
            self.slots[idx].unref();
        }
        Ok(idx)
    }

    /// 为槽位分配新的帧缓冲 (旧缓冲引用先行释放)
    pub fn allocate(&mut self, idx: usize, geometry: &FrameGeometry) -> MpvResult<Arc<FrameBuffer>> {
        let slot = self
            .slots
            .get_mut(idx)
            .ok_or_else(|| MpvError::Internal(format!("槽位索引越界: {idx}")))?;
        slot.buf = None;
        let buf = FrameBuffer::allocate(geometry)?;
        slot.buf = Some(Arc::clone(&buf));
        slot.needs_realloc = false;
        Ok(buf)
    }

    /// 释放不再被引用的槽位
    ///
    /// 非参考帧总是释放; 参考帧在不承担角色且无需重新分配时释放.
    pub fn retire_unreferenced(&mut self, roles: &RoleSet) {
        for (i, pic) in self.slots.iter_mut().enumerate() {
            if !pic.has_data() {
                continue;
            }
            if !pic.is_reference() || (!roles.holds(i) && !pic.needs_realloc) {
                trace!("回收槽位 {i}");
                pic.unref();
            }
        }
    }

    /// 释放指定槽位
    pub fn release(&mut self, idx: usize) {
        if let Some(pic) = self.slots.get_mut(idx) {
            pic.unref();
        }
    }

    /// 释放全部槽位
    pub fn release_all(&mut self) {
        self.slots.iter_mut().for_each(Picture::unref);
    }

    /// 将全部槽位标记为需要重新分配
    pub fn mark_all_needs_realloc(&mut self) {
        for pic in &mut self.slots {
            pic.needs_realloc = true;
        }
    }

    /// 以另一个池的快照覆盖本池 (共享缓冲引用)
    pub fn replace_from(&mut self, pictures: &[Picture]) {
        for (dst, src) in self.slots.iter_mut().zip(pictures) {
            if src.has_data() {
                dst.ref_from(src);
            } else {
                dst.unref();
            }
        }
    }
}
