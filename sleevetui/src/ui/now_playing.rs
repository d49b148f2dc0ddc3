use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use super::constants::INFO_H_PAD;
use super::util::{padded_rect, truncate_with_dots};
use crate::mpd::NowPlaying;

pub fn render(frame: &mut Frame, area: Rect, song: &NowPlaying) {
    let area = padded_rect(area, INFO_H_PAD);
    let max = usize::from(area.width);

    let lines = if song.uri.is_none() {
        vec![Line::from(Span::styled(
            "Nothing playing",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        vec![
            Line::from(Span::styled(
                truncate_with_dots(&song.title, max),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                truncate_with_dots(&song.artist, max),
                Style::default().fg(Color::Cyan),
            )),
            Line::from(Span::styled(
                truncate_with_dots(&song.album, max),
                Style::default().fg(Color::DarkGray),
            )),
        ]
    };
    frame.render_widget(Paragraph::new(lines), area);
}
