pub mod artwork_widget;
pub mod constants;
pub mod now_playing;
pub mod util;
