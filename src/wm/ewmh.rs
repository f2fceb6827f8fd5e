//! EWMH (Extended Window Manager Hints) implementation
//!
//! Names every atom the window manager reads or writes and publishes the
//! root-window properties that identify gridwm to other clients.

use anyhow::Result;
use x11rb::protocol::xproto::{AtomEnum, Window};

use crate::wm::display::DisplayServer;

/// `_NET_WM_STATE` client message actions
pub const NET_WM_STATE_REMOVE: u32 = 0;
pub const NET_WM_STATE_ADD: u32 = 1;
pub const NET_WM_STATE_TOGGLE: u32 = 2;

/// Every atom the window manager uses, by protocol name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomName {
    // ICCCM
    WmProtocols,
    WmDeleteWindow,
    WmTakeFocus,
    WmState,
    WmChangeState,
    WmName,
    WmClass,
    WmHints,
    WmNormalHints,
    Utf8String,
    // EWMH root properties
    NetSupported,
    NetSupportingWmCheck,
    NetActiveWindow,
    NetCloseWindow,
    // EWMH client properties
    NetWmName,
    NetWmState,
    NetWmStateFullscreen,
    NetWmStateAbove,
    NetWmStateHidden,
    NetWmStateDemandsAttention,
    NetWmWindowType,
    NetWmWindowTypeNormal,
    NetWmWindowTypeDialog,
    NetWmWindowTypeDock,
    NetWmWindowTypeSplash,
    // Motif decoration hints
    MotifWmHints,
}

impl AtomName {
    pub fn name(self) -> &'static str {
        match self {
            Self::WmProtocols => "WM_PROTOCOLS",
            Self::WmDeleteWindow => "WM_DELETE_WINDOW",
            Self::WmTakeFocus => "WM_TAKE_FOCUS",
            Self::WmState => "WM_STATE",
            Self::WmChangeState => "WM_CHANGE_STATE",
            Self::WmName => "WM_NAME",
            Self::WmClass => "WM_CLASS",
            Self::WmHints => "WM_HINTS",
            Self::WmNormalHints => "WM_NORMAL_HINTS",
            Self::Utf8String => "UTF8_STRING",
            Self::NetSupported => "_NET_SUPPORTED",
            Self::NetSupportingWmCheck => "_NET_SUPPORTING_WM_CHECK",
            Self::NetActiveWindow => "_NET_ACTIVE_WINDOW",
            Self::NetCloseWindow => "_NET_CLOSE_WINDOW",
            Self::NetWmName => "_NET_WM_NAME",
            Self::NetWmState => "_NET_WM_STATE",
            Self::NetWmStateFullscreen => "_NET_WM_STATE_FULLSCREEN",
            Self::NetWmStateAbove => "_NET_WM_STATE_ABOVE",
            Self::NetWmStateHidden => "_NET_WM_STATE_HIDDEN",
            Self::NetWmStateDemandsAttention => "_NET_WM_STATE_DEMANDS_ATTENTION",
            Self::NetWmWindowType => "_NET_WM_WINDOW_TYPE",
            Self::NetWmWindowTypeNormal => "_NET_WM_WINDOW_TYPE_NORMAL",
            Self::NetWmWindowTypeDialog => "_NET_WM_WINDOW_TYPE_DIALOG",
            Self::NetWmWindowTypeDock => "_NET_WM_WINDOW_TYPE_DOCK",
            Self::NetWmWindowTypeSplash => "_NET_WM_WINDOW_TYPE_SPLASH",
            Self::MotifWmHints => "_MOTIF_WM_HINTS",
        }
    }
}

/// Hints advertised in `_NET_SUPPORTED`
const SUPPORTED: &[AtomName] = &[
    AtomName::NetSupported,
    AtomName::NetSupportingWmCheck,
    AtomName::NetActiveWindow,
    AtomName::NetCloseWindow,
    AtomName::NetWmName,
    AtomName::NetWmState,
    AtomName::NetWmStateFullscreen,
    AtomName::NetWmStateAbove,
    AtomName::NetWmStateHidden,
    AtomName::NetWmStateDemandsAttention,
    AtomName::NetWmWindowType,
    AtomName::NetWmWindowTypeNormal,
    AtomName::NetWmWindowTypeDialog,
    AtomName::NetWmWindowTypeDock,
    AtomName::NetWmWindowTypeSplash,
];

/// Set up _NET_SUPPORTED on root window
pub fn setup_supported<D: DisplayServer>(display: &mut D) -> Result<()> {
    let root = display.root();
    let supported: Vec<u32> = SUPPORTED.iter().map(|&name| display.atom(name)).collect();
    let property = display.atom(AtomName::NetSupported);
    display.set_property32(root, property, AtomEnum::ATOM.into(), &supported)
}

/// Set up _NET_SUPPORTING_WM_CHECK on root and child windows
pub fn setup_supporting_wm_check<D: DisplayServer>(
    display: &mut D,
    child: Window,
    name: &str,
) -> Result<()> {
    let root = display.root();
    let check = display.atom(AtomName::NetSupportingWmCheck);
    let net_wm_name = display.atom(AtomName::NetWmName);
    let utf8_string = display.atom(AtomName::Utf8String);

    display.set_property32(root, check, AtomEnum::WINDOW.into(), &[child])?;
    display.set_property32(child, check, AtomEnum::WINDOW.into(), &[child])?;
    display.set_property8(child, net_wm_name, utf8_string, name.as_bytes())
}
