//! Types shared between the window manager core and the display backends

pub mod window_state;

pub use window_state::{Geometry, WindowAttributes};
