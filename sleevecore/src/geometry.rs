//! 封面放置计算：在面板内等比缩放并居中。

use crate::model::{TerminalSize, WindowGeometry};

/// 相对面板左上角的像素放置结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub width: u32,
    pub height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
}

/// 放置结果换算到终端单元格
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAnchor {
    /// 图片左上角所在单元格（终端绝对坐标）
    pub col: u16,
    pub row: u16,
    /// 单元格内的像素偏移
    pub pixel_x: u32,
    pub pixel_y: u32,
    /// 图片覆盖的单元格数
    pub cols: u16,
    pub rows: u16,
}

/// 计算 `image` 在 `panel` 内的 contain 放置。
///
/// `scale_percent` 按比例缩小可用区域（1..=100），图片始终居中于整个面板。
/// 面板为空或图片尺寸为 0 时返回 `None`。
pub fn compute(
    panel: &WindowGeometry,
    image: (u32, u32),
    terminal: &TerminalSize,
    scale_percent: u8,
) -> Option<Placement> {
    let (img_w, img_h) = image;
    if panel.is_empty() || img_w == 0 || img_h == 0 {
        return None;
    }

    let (cell_w, cell_h) = terminal.cell_size();
    let panel_w = u32::from(panel.width) * cell_w;
    let panel_h = u32::from(panel.height) * cell_h;

    let pct = u32::from(scale_percent.clamp(1, 100));
    let box_w = (panel_w * pct / 100).max(1);
    let box_h = (panel_h * pct / 100).max(1);

    let scale = (f64::from(box_w) / f64::from(img_w)).min(f64::from(box_h) / f64::from(img_h));
    let width = ((f64::from(img_w) * scale).round() as u32).clamp(1, box_w);
    let height = ((f64::from(img_h) * scale).round() as u32).clamp(1, box_h);

    Some(Placement {
        width,
        height,
        x_offset: (panel_w - width) / 2,
        y_offset: (panel_h - height) / 2,
    })
}

impl Placement {
    pub fn anchor(&self, panel: &WindowGeometry, terminal: &TerminalSize) -> CellAnchor {
        let (cell_w, cell_h) = terminal.cell_size();
        let pixel_x = self.x_offset % cell_w;
        let pixel_y = self.y_offset % cell_h;
        CellAnchor {
            col: panel.x.saturating_add(to_u16(self.x_offset / cell_w)),
            row: panel.y.saturating_add(to_u16(self.y_offset / cell_h)),
            pixel_x,
            pixel_y,
            cols: to_u16((pixel_x + self.width).div_ceil(cell_w)),
            rows: to_u16((pixel_y + self.height).div_ceil(cell_h)),
        }
    }
}

fn to_u16(v: u32) -> u16 {
    u16::try_from(v).unwrap_or(u16::MAX)
}
