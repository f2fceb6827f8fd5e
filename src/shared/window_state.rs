//! Snapshots of server-side window state
//!
//! Nothing here is cached between operations: every value is a fresh read
//! from the display server, valid for the operation that asked for it.

/// Window geometry (outer position, inner size)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub border_width: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            border_width: 0,
        }
    }

    /// Width including the border on both sides
    pub fn outer_width(&self) -> u32 {
        self.width + 2 * self.border_width
    }

    /// Height including the border on both sides
    pub fn outer_height(&self) -> u32 {
        self.height + 2 * self.border_width
    }
}

/// The attributes the policy engine looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowAttributes {
    pub override_redirect: bool,
    /// Mapped and all ancestors mapped
    pub viewable: bool,
}
