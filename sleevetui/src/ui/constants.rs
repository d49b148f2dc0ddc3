pub const HEADER_HEIGHT: u16 = 1;
pub const STATUS_BAR_HEIGHT: u16 = 1;
pub const MIN_PANEL_PCT: u16 = 10;
pub const MAX_PANEL_PCT: u16 = 90;
pub const INFO_H_PAD: u16 = 2;
