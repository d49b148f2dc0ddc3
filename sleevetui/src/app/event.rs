use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::{App, AppMessage};

impl App {
    pub(crate) fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Resize(..) => self.force_move = true,
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                self.running = false;
            }
            (_, KeyCode::Char('a')) => {
                self.show_artwork = !self.show_artwork;
                self.pending_visibility = Some(self.show_artwork);
            }
            (_, KeyCode::Char('u')) => {
                self.needs_update = true;
            }
            (_, KeyCode::Char('c')) => {
                self.artwork.request_remove(true);
                self.status = Some("Artwork cleared (u to reload)".to_string());
            }
            _ => {}
        }
    }

    pub(crate) async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::TermEvent(ev) => self.handle_event(ev),
            AppMessage::PlayerChanged => self.refresh_song().await,
            AppMessage::MpdClosed(reason) => {
                self.status = Some(format!("MPD connection closed: {reason}"));
            }
            // 仅用于唤醒主循环重绘
            AppMessage::Tick | AppMessage::ArtworkReady => {}
        }
    }
}
