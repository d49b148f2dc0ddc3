use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

/// 封面占位：图片由图形协议画在这些格子上
pub struct ArtworkWidget;

impl Widget for ArtworkWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // 将该区域设为空格，让 ratatui buffer 拥有这些格子（以便内容切换时正确清除）
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                if let Some(cell) = buf.cell_mut((x, y)) {
                    cell.reset();
                }
            }
        }
    }
}
