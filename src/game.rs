pub mod beat;
pub mod chart;
pub mod easing;
pub mod event;
pub mod gameplay;
pub mod judgment;
pub mod line;
pub mod note;
pub mod timing;
pub mod value;
