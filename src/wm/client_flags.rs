//! Client Flags
//!
//! Typed views of the EWMH/ICCCM properties a client window carries.

use bitflags::bitflags;

use crate::wm::ewmh::AtomName;

bitflags! {
    /// `_NET_WM_STATE` atoms the window manager understands
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StateFlags: u32 {
        const FULLSCREEN        = 1 << 0;
        const ABOVE             = 1 << 1;
        const HIDDEN            = 1 << 2;
        const DEMANDS_ATTENTION = 1 << 3;
    }
}

impl StateFlags {
    /// The state atom backing a single flag
    pub fn atom_name(self) -> Option<AtomName> {
        if self == Self::FULLSCREEN {
            Some(AtomName::NetWmStateFullscreen)
        } else if self == Self::ABOVE {
            Some(AtomName::NetWmStateAbove)
        } else if self == Self::HIDDEN {
            Some(AtomName::NetWmStateHidden)
        } else if self == Self::DEMANDS_ATTENTION {
            Some(AtomName::NetWmStateDemandsAttention)
        } else {
            None
        }
    }

    /// Flag letters used in window records
    pub fn record_flags(self) -> String {
        let mut flags = String::new();
        if self.contains(Self::FULLSCREEN) {
            flags.push(gridwm_ipc::FLAG_FULLSCREEN);
        }
        if self.contains(Self::ABOVE) {
            flags.push(gridwm_ipc::FLAG_ABOVE);
        }
        if self.contains(Self::DEMANDS_ATTENTION) {
            flags.push(gridwm_ipc::FLAG_URGENT);
        }
        flags
    }
}

/// Window type (EWMH _NET_WM_WINDOW_TYPE), reduced to what placement cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    Normal,
    Dialog,
    Splash,
    Dock,
}

impl WindowType {
    pub const ALL: [WindowType; 4] = [Self::Normal, Self::Dialog, Self::Splash, Self::Dock];

    pub fn atom_name(self) -> AtomName {
        match self {
            Self::Normal => AtomName::NetWmWindowTypeNormal,
            Self::Dialog => AtomName::NetWmWindowTypeDialog,
            Self::Splash => AtomName::NetWmWindowTypeSplash,
            Self::Dock => AtomName::NetWmWindowTypeDock,
        }
    }

    /// Dialogs and splash screens keep their own size and are centered
    pub fn is_transient_like(self) -> bool {
        matches!(self, Self::Dialog | Self::Splash)
    }
}

/// ICCCM `WM_STATE` lifecycle flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Withdrawn,
    Normal,
    Iconic,
}

impl Lifecycle {
    pub fn from_wm_state(value: u32) -> Self {
        match value {
            1 => Self::Normal,
            3 => Self::Iconic,
            _ => Self::Withdrawn,
        }
    }

    pub fn wm_state(self) -> u32 {
        match self {
            Self::Withdrawn => 0,
            Self::Normal => 1,
            Self::Iconic => 3,
        }
    }
}
