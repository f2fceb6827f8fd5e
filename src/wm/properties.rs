//! Window state accessor
//!
//! Typed reads and writes of the per-window properties stored on the display
//! server. Nothing read here is cached: every call goes back to the server.
//! A missing or malformed property reads as "unset", never as an error.

use anyhow::Result;
use tracing::debug;
use x11rb::protocol::xproto::{AtomEnum, Window};

use crate::wm::client_flags::{Lifecycle, StateFlags, WindowType};
use crate::wm::display::DisplayServer;
use crate::wm::ewmh::AtomName;
use crate::wm::hints::{MotifWmHints, SizeHints, WmHints};

const CURRENT_TIME: u32 = 0;

const STATE_ATOMS: [StateFlags; 4] = [
    StateFlags::FULLSCREEN,
    StateFlags::ABOVE,
    StateFlags::HIDDEN,
    StateFlags::DEMANDS_ATTENTION,
];

fn flag_for_atom<D: DisplayServer>(display: &D, atom: u32) -> Option<StateFlags> {
    STATE_ATOMS.into_iter().find(|flag| {
        flag.atom_name()
            .is_some_and(|name| display.atom(name) == atom)
    })
}

pub fn state_flags<D: DisplayServer>(display: &D, window: Window) -> Result<StateFlags> {
    let property = display.atom(AtomName::NetWmState);
    let atoms = display.get_property32(window, property)?.unwrap_or_default();
    Ok(atoms
        .into_iter()
        .filter_map(|atom| flag_for_atom(display, atom))
        .fold(StateFlags::empty(), |acc, flag| acc | flag))
}

pub fn has_state<D: DisplayServer>(display: &D, window: Window, flag: StateFlags) -> Result<bool> {
    Ok(state_flags(display, window)?.contains(flag))
}

/// Add or remove one `_NET_WM_STATE` atom.
///
/// Read-modify-write of the whole list: a client changing the property
/// between our read and our write loses its change. The protocol has no
/// compare-and-swap, so the window manager relies on clients not racing it.
/// Atoms the window manager does not know about are carried over untouched.
pub fn set_state_flag<D: DisplayServer>(
    display: &mut D,
    window: Window,
    flag: StateFlags,
    present: bool,
) -> Result<()> {
    let Some(name) = flag.atom_name() else {
        return Ok(());
    };
    let property = display.atom(AtomName::NetWmState);
    let target = display.atom(name);
    let mut atoms = display.get_property32(window, property)?.unwrap_or_default();

    let had = atoms.contains(&target);
    if had == present {
        return Ok(());
    }
    if present {
        atoms.push(target);
    } else {
        atoms.retain(|&atom| atom != target);
    }

    if atoms.is_empty() {
        display.delete_property(window, property)
    } else {
        display.set_property32(window, property, AtomEnum::ATOM.into(), &atoms)
    }
}

/// The first window type atom gridwm recognizes, in the client's order of preference
pub fn window_type<D: DisplayServer>(display: &D, window: Window) -> Result<Option<WindowType>> {
    let property = display.atom(AtomName::NetWmWindowType);
    let atoms = display.get_property32(window, property)?.unwrap_or_default();
    Ok(atoms.into_iter().find_map(|atom| {
        WindowType::ALL
            .into_iter()
            .find(|kind| display.atom(kind.atom_name()) == atom)
    }))
}

pub fn lifecycle<D: DisplayServer>(display: &D, window: Window) -> Result<Lifecycle> {
    let property = display.atom(AtomName::WmState);
    let state = display
        .get_property32(window, property)?
        .and_then(|values| values.first().copied());
    Ok(state.map_or(Lifecycle::Withdrawn, Lifecycle::from_wm_state))
}

/// Write `WM_STATE` as `[state, icon window]`; gridwm never provides icon windows
pub fn set_lifecycle<D: DisplayServer>(
    display: &mut D,
    window: Window,
    lifecycle: Lifecycle,
) -> Result<()> {
    let property = display.atom(AtomName::WmState);
    display.set_property32(window, property, property, &[lifecycle.wm_state(), 0])
}

pub fn decoration_suppressed<D: DisplayServer>(display: &D, window: Window) -> Result<bool> {
    let property = display.atom(AtomName::MotifWmHints);
    Ok(display
        .get_property32(window, property)?
        .and_then(|values| MotifWmHints::from_values(&values))
        .is_some_and(|hints| hints.suppresses_decorations()))
}

pub fn size_hints<D: DisplayServer>(display: &D, window: Window) -> Result<Option<SizeHints>> {
    let property = display.atom(AtomName::WmNormalHints);
    Ok(display
        .get_property32(window, property)?
        .and_then(|values| SizeHints::from_values(&values)))
}

pub fn wm_hints<D: DisplayServer>(display: &D, window: Window) -> Result<Option<WmHints>> {
    let property = display.atom(AtomName::WmHints);
    Ok(display
        .get_property32(window, property)?
        .and_then(|values| WmHints::from_values(&values)))
}

/// Whether the client lists `protocol` in `WM_PROTOCOLS`
pub fn supports_protocol<D: DisplayServer>(
    display: &D,
    window: Window,
    protocol: AtomName,
) -> Result<bool> {
    let property = display.atom(AtomName::WmProtocols);
    let wanted = display.atom(protocol);
    Ok(display
        .get_property32(window, property)?
        .is_some_and(|atoms| atoms.contains(&wanted)))
}

/// Send an ICCCM protocol message, but only to clients that advertise it.
/// Returns whether the message went out.
pub fn send_protocol<D: DisplayServer>(
    display: &mut D,
    window: Window,
    protocol: AtomName,
) -> Result<bool> {
    if !supports_protocol(display, window, protocol)? {
        return Ok(false);
    }
    debug!("Sending {} to 0x{:x}", protocol.name(), window);
    let message_type = display.atom(AtomName::WmProtocols);
    let data = [display.atom(protocol), CURRENT_TIME, 0, 0, 0];
    display.send_client_message(window, message_type, data)?;
    Ok(true)
}

/// The Active Window, as persisted on the root
pub fn active_window<D: DisplayServer>(display: &D) -> Result<Option<Window>> {
    let property = display.atom(AtomName::NetActiveWindow);
    Ok(display
        .get_property32(display.root(), property)?
        .and_then(|values| values.first().copied())
        .filter(|&window| window != x11rb::NONE))
}

pub fn set_active_window<D: DisplayServer>(display: &mut D, window: Option<Window>) -> Result<()> {
    let root = display.root();
    let property = display.atom(AtomName::NetActiveWindow);
    let value = window.unwrap_or(x11rb::NONE);
    display.set_property32(root, property, AtomEnum::WINDOW.into(), &[value])
}

/// Window title, `_NET_WM_NAME` first, then the legacy `WM_NAME`
pub fn title<D: DisplayServer>(display: &D, window: Window) -> Result<String> {
    for name in [AtomName::NetWmName, AtomName::WmName] {
        let property = display.atom(name);
        if let Some(bytes) = display.get_property8(window, property)? {
            if !bytes.is_empty() {
                return Ok(String::from_utf8_lossy(&bytes).into_owned());
            }
        }
    }
    Ok(String::new())
}

/// `WM_CLASS` as (instance, class)
pub fn class<D: DisplayServer>(display: &D, window: Window) -> Result<(String, String)> {
    let property = display.atom(AtomName::WmClass);
    let Some(bytes) = display.get_property8(window, property)? else {
        return Ok((String::new(), String::new()));
    };
    let mut parts = bytes
        .split(|&b| b == 0)
        .map(|part| String::from_utf8_lossy(part).into_owned());
    let instance = parts.next().unwrap_or_default();
    let class = parts.next().unwrap_or_default();
    Ok((instance, class))
}
