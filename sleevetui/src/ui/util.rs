use ratatui::layout::Rect;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// 左右各留 `h_pad` 列边距
pub fn padded_rect(area: Rect, h_pad: u16) -> Rect {
    let pad = h_pad.min(area.width / 2);
    Rect {
        x: area.x + pad,
        width: area.width.saturating_sub(pad * 2),
        ..area
    }
}

/// 按显示宽度截断文本，超出时末尾加 ".."
pub fn truncate_with_dots(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let content_width = max_width.saturating_sub(2);
    let mut result = String::new();
    let mut width = 0;
    for c in text.chars() {
        let cw = c.width().unwrap_or(0);
        if width + cw > content_width {
            break;
        }
        result.push(c);
        width += cw;
    }
    result.push_str("..");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_with_dots("abc", 5), "abc");
    }

    #[test]
    fn wide_chars_count_double() {
        assert_eq!(truncate_with_dots("哈基米哈基米", 7), "哈基..");
        assert_eq!(truncate_with_dots("abcdefgh", 6), "abcd..");
    }

    #[test]
    fn padding_is_capped_by_width() {
        let r = padded_rect(Rect::new(0, 0, 3, 1), 4);
        assert_eq!((r.x, r.width), (1, 1));
    }
}
