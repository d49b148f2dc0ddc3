pub mod task;

use std::sync::Arc;

pub use task::{Snapshot, Task, TaskClass};

/// 终端不报告像素尺寸时使用的单元格大小
pub const FALLBACK_CELL_SIZE: (u32, u32) = (8, 16);

/// 封面面板矩形（字符单元格）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WindowGeometry {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl WindowGeometry {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// 终端尺寸：字符行列 + 像素
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
    pub pixel_width: u16,
    pub pixel_height: u16,
}

impl TerminalSize {
    pub fn new(cols: u16, rows: u16, pixel_width: u16, pixel_height: u16) -> Self {
        Self { cols, rows, pixel_width, pixel_height }
    }

    /// 单个字符单元格的像素尺寸 (宽, 高)
    pub fn cell_size(&self) -> (u32, u32) {
        if self.cols == 0 || self.rows == 0 || self.pixel_width == 0 || self.pixel_height == 0 {
            return FALLBACK_CELL_SIZE;
        }
        let w = u32::from(self.pixel_width) / u32::from(self.cols);
        let h = u32::from(self.pixel_height) / u32::from(self.rows);
        if w == 0 || h == 0 {
            FALLBACK_CELL_SIZE
        } else {
            (w, h)
        }
    }
}

/// 终端尺寸查询
pub trait TerminalInfo: Send + Sync {
    fn size(&self) -> TerminalSize;
}

/// 缓存键：歌曲 + 决定渲染结果的几何参数
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    pub panel_x: u16,
    pub panel_y: u16,
}

impl CacheKey {
    /// 两个键是否对应同一份像素数据（仅面板位置不同）
    pub fn same_pixels(&self, other: &CacheKey) -> bool {
        self.uri == other.uri && self.width == other.width && self.height == other.height
    }
}

/// 缓存值：协议就绪的数据 + 居中后的像素偏移
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheValue {
    pub payload: Arc<[u8]>,
    pub x_offset: u32,
    pub y_offset: u32,
}

/// 从 MPD 或本地文件读到的原始图片
#[derive(Debug, Clone)]
pub struct RawArt {
    pub uri: String,
    pub bytes: Vec<u8>,
}

/// 交给 UI 线程写入终端的输出：先把光标移到 (x, y) 再原样写入 bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    pub bytes: Vec<u8>,
    pub x: u16,
    pub y: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_size_divides_pixels_by_cells() {
        let size = TerminalSize::new(80, 24, 640, 480);
        assert_eq!(size.cell_size(), (8, 20));
    }

    #[test]
    fn cell_size_falls_back_when_pixels_unknown() {
        let size = TerminalSize::new(80, 24, 0, 0);
        assert_eq!(size.cell_size(), FALLBACK_CELL_SIZE);
    }

    #[test]
    fn geometry_compares_structurally() {
        assert_eq!(WindowGeometry::new(1, 2, 3, 4), WindowGeometry::new(1, 2, 3, 4));
        assert_ne!(WindowGeometry::new(1, 2, 3, 4), WindowGeometry::new(1, 2, 3, 5));
    }
}
