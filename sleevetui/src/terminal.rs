use sleevecore::{TerminalInfo, TerminalSize};

/// 通过 crossterm 查询终端的字符与像素尺寸
pub struct CrosstermTerminal;

impl TerminalInfo for CrosstermTerminal {
    fn size(&self) -> TerminalSize {
        match crossterm::terminal::window_size() {
            Ok(size) => TerminalSize::new(size.columns, size.rows, size.width, size.height),
            // 部分终端不支持像素查询，像素为 0 时按默认单元格大小计算
            Err(_) => crossterm::terminal::size()
                .map(|(cols, rows)| TerminalSize::new(cols, rows, 0, 0))
                .unwrap_or_default(),
        }
    }
}
