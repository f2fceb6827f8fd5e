//! Window set query
//!
//! Live, predicate-filtered views of the root's children. Predicates are
//! evaluated against the display server every time they are asked.

use anyhow::Result;
use x11rb::protocol::xproto::Window;

use crate::wm::client_flags::{Lifecycle, StateFlags, WindowType};
use crate::wm::display::DisplayServer;
use crate::wm::properties;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Not the root, not override-redirect, not a dock
    Manageable,
    /// Manageable and either viewable or iconified
    Managed,
    /// Managed and always-above
    Above,
    /// Managed and not always-above
    NotAbove,
    /// Not above and in the normal lifecycle state
    Normal,
}

impl Predicate {
    pub fn matches<D: DisplayServer>(self, display: &D, window: Window) -> Result<bool> {
        match self {
            Self::Manageable => manageable(display, window),
            Self::Managed => managed(display, window),
            Self::Above => Ok(managed(display, window)?
                && properties::has_state(display, window, StateFlags::ABOVE)?),
            Self::NotAbove => Ok(managed(display, window)?
                && !properties::has_state(display, window, StateFlags::ABOVE)?),
            Self::Normal => Ok(Self::NotAbove.matches(display, window)?
                && properties::lifecycle(display, window)? == Lifecycle::Normal),
        }
    }
}

fn manageable<D: DisplayServer>(display: &D, window: Window) -> Result<bool> {
    if window == display.root() {
        return Ok(false);
    }
    match display.attributes(window)? {
        Some(attributes) if !attributes.override_redirect => {
            Ok(properties::window_type(display, window)? != Some(WindowType::Dock))
        }
        _ => Ok(false),
    }
}

fn managed<D: DisplayServer>(display: &D, window: Window) -> Result<bool> {
    if !manageable(display, window)? {
        return Ok(false);
    }
    let viewable = display
        .attributes(window)?
        .is_some_and(|attributes| attributes.viewable);
    Ok(viewable || properties::lifecycle(display, window)? == Lifecycle::Iconic)
}

/// Matching windows, top-most first
pub fn query<D: DisplayServer>(display: &D, predicate: Predicate) -> Result<Vec<Window>> {
    let mut matches = Vec::new();
    for window in display.children()? {
        if predicate.matches(display, window)? {
            matches.push(window);
        }
    }
    matches.reverse();
    Ok(matches)
}

/// The top-most matching window
pub fn first<D: DisplayServer>(display: &D, predicate: Predicate) -> Result<Option<Window>> {
    let mut found = None;
    for window in display.children()? {
        if predicate.matches(display, window)? {
            found = Some(window);
        }
    }
    Ok(found)
}
