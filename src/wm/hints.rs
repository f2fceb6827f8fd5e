//! Hints Module
//!
//! Decoding of the program-supplied hints: `WM_NORMAL_HINTS` (XSizeHints),
//! `WM_HINTS` (XWMHints) and `_MOTIF_WM_HINTS`.

/// WM_SIZE_HINTS flag bits gridwm acts on
pub mod size_flags {
    pub const P_POSITION: u32 = 1 << 2;
    pub const P_SIZE: u32 = 1 << 3;
    pub const P_MAX_SIZE: u32 = 1 << 5;
    pub const P_RESIZE_INC: u32 = 1 << 6;
}

/// Size hints (XSizeHints equivalent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeHints {
    pub flags: u32,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub width_inc: u32,
    pub height_inc: u32,
}

impl SizeHints {
    /// Decode the 18 CARD32 values of WM_NORMAL_HINTS
    ///
    /// Pre-ICCCM clients send 15 values (no base size or gravity). Minimum
    /// size, aspect ratio, base size and gravity are not used by placement.
    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < 15 {
            return None;
        }
        let at = |i: usize| values.get(i).copied().unwrap_or(0);
        Some(Self {
            flags: at(0),
            x: at(1) as i32,
            y: at(2) as i32,
            width: at(3),
            height: at(4),
            max_width: at(7),
            max_height: at(8),
            width_inc: at(9),
            height_inc: at(10),
        })
    }

    /// Encode back to the property layout; fields gridwm ignores are zero
    #[cfg(test)]
    pub fn to_values(&self) -> [u32; 18] {
        let mut values = [0; 18];
        values[0] = self.flags;
        values[1] = self.x as u32;
        values[2] = self.y as u32;
        values[3] = self.width;
        values[4] = self.height;
        values[7] = self.max_width;
        values[8] = self.max_height;
        values[9] = self.width_inc;
        values[10] = self.height_inc;
        values
    }

    fn has(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    /// Program asked for an exact position and size
    pub fn fixed_geometry(&self) -> bool {
        self.has(size_flags::P_POSITION) && self.has(size_flags::P_SIZE)
    }

    pub fn max_size(&self) -> Option<(u32, u32)> {
        self.has(size_flags::P_MAX_SIZE)
            .then_some((self.max_width, self.max_height))
    }

    /// Resize increments; a zero increment counts as "not declared"
    pub fn resize_increments(&self) -> (Option<u32>, Option<u32>) {
        if !self.has(size_flags::P_RESIZE_INC) {
            return (None, None);
        }
        let nonzero = |v: u32| (v > 0).then_some(v);
        (nonzero(self.width_inc), nonzero(self.height_inc))
    }
}

/// WM_HINTS flag: `initial_state` is meaningful
const STATE_HINT: u32 = 1 << 1;

/// WM hints (XWMHints equivalent), only the fields the WM acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WmHints {
    pub flags: u32,
    pub initial_state: u32,
}

impl WmHints {
    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < 3 {
            return None;
        }
        Some(Self {
            flags: values[0],
            initial_state: values[2],
        })
    }

    /// The initial state requested by the client, if it declared one
    pub fn initial_state(&self) -> Option<u32> {
        (self.flags & STATE_HINT != 0).then_some(self.initial_state)
    }
}

/// MOTIF WM Hints structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotifWmHints {
    pub flags: u32,
    pub decorations: u32,
}

impl MotifWmHints {
    pub const MWM_HINTS_DECORATIONS: u32 = 1 << 1;

    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < 3 {
            return None;
        }
        Some(Self {
            flags: values[0],
            decorations: values[2],
        })
    }

    /// The client explicitly asked for no decorations at all
    pub fn suppresses_decorations(&self) -> bool {
        self.flags & Self::MWM_HINTS_DECORATIONS != 0 && self.decorations == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_hints_flags() {
        let mut hints = SizeHints {
            flags: size_flags::P_POSITION | size_flags::P_SIZE | size_flags::P_RESIZE_INC,
            width_inc: 7,
            height_inc: 0,
            ..Default::default()
        };
        assert!(hints.fixed_geometry());
        assert_eq!(hints.max_size(), None);
        assert_eq!(hints.resize_increments(), (Some(7), None));

        hints.flags = size_flags::P_SIZE;
        assert!(!hints.fixed_geometry());
        assert_eq!(SizeHints::from_values(&hints.to_values()), Some(hints));
        assert_eq!(SizeHints::from_values(&[0; 4]), None);
    }

    #[test]
    fn test_wm_hints_initial_state() {
        let hints = WmHints::from_values(&[STATE_HINT, 1, 3, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(hints.initial_state(), Some(3));

        let hints = WmHints::from_values(&[0, 1, 3]).unwrap();
        assert_eq!(hints.initial_state(), None);
    }

    #[test]
    fn test_motif_decorations() {
        let hints = MotifWmHints::from_values(&[MotifWmHints::MWM_HINTS_DECORATIONS, 0, 0, 0, 0]);
        assert!(hints.unwrap().suppresses_decorations());

        let hints = MotifWmHints::from_values(&[MotifWmHints::MWM_HINTS_DECORATIONS, 0, 1]);
        assert!(!hints.unwrap().suppresses_decorations());
    }
}
