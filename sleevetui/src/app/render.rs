use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use unicode_width::UnicodeWidthStr;

use crate::ui::artwork_widget::ArtworkWidget;
use crate::ui::constants::{HEADER_HEIGHT, MAX_PANEL_PCT, MIN_PANEL_PCT, STATUS_BAR_HEIGHT};
use crate::ui::now_playing;
use crate::ui::util::truncate_with_dots;

use super::App;

const KEY_HINTS: &str = "q quit  a artwork  u reload  c clear";

impl App {
    pub(crate) fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(1),
                Constraint::Length(STATUS_BAR_HEIGHT),
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0]);

        if self.show_artwork && self.artwork.is_enabled() {
            let pct = self
                .settings
                .display
                .panel_percent
                .clamp(MIN_PANEL_PCT, MAX_PANEL_PCT);
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(pct), Constraint::Min(1)])
                .split(chunks[1]);
            frame.render_widget(ArtworkWidget, cols[0]);
            self.artwork_area = Some(cols[0]);
            now_playing::render(frame, cols[1], &self.now_playing);
        } else {
            self.artwork_area = None;
            now_playing::render(frame, chunks[1], &self.now_playing);
        }

        self.render_status(frame, chunks[2]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let title = Span::styled(
            "  SLEEVE",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        );
        let art_state = if !self.artwork.is_enabled() {
            " art off "
        } else if self.show_artwork {
            " art on "
        } else {
            " art hidden "
        };
        let right = Span::styled(art_state, Style::default().fg(Color::Black).bg(Color::DarkGray));
        let right_width = right.content.width() as u16;

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(right_width)])
            .split(area);
        frame.render_widget(Paragraph::new(Line::from(title)), cols[0]);
        frame.render_widget(
            Paragraph::new(Line::from(right)).alignment(Alignment::Right),
            cols[1],
        );
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let max = usize::from(area.width.saturating_sub(2));
        let line = match &self.status {
            Some(msg) => Span::styled(
                format!("  {}", truncate_with_dots(msg, max)),
                Style::default().fg(Color::Yellow),
            ),
            None => Span::styled(format!("  {KEY_HINTS}"), Style::default().fg(Color::DarkGray)),
        };
        frame.render_widget(Paragraph::new(Line::from(line)), area);
    }
}
