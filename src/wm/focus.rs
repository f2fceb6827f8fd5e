//! Focus Module
//!
//! The active window and its handoff. The Active Window lives in the root's
//! `_NET_ACTIVE_WINDOW` property, so a restarted gridwm picks it up again.

use anyhow::Result;
use tracing::debug;
use x11rb::protocol::xproto::Window;

use crate::wm::WindowManager;
use crate::wm::client_flags::{Lifecycle, StateFlags};
use crate::wm::display::DisplayServer;
use crate::wm::ewmh::AtomName;
use crate::wm::properties;
use crate::wm::query::{self, Predicate};
use crate::wm::status;

impl<D: DisplayServer> WindowManager<'_, D> {
    /// Make `target` the active window.
    ///
    /// Without a target the current active window is kept if it is still a
    /// normal window, otherwise the top-most normal window takes over. When
    /// nothing qualifies, the active window is cleared. Activating the window
    /// that is already active only re-asserts input focus.
    pub fn activate(&mut self, target: Option<Window>) -> Result<()> {
        let active = properties::active_window(&self.display)?;

        let target = match target {
            Some(window) => Some(window),
            None => match active {
                Some(window) if Predicate::Normal.matches(&self.display, window)? => Some(window),
                _ => query::first(&self.display, Predicate::Normal)?,
            },
        };

        let target = match target {
            Some(window) if self.is_managed(window)? => window,
            _ => {
                if active.is_some() {
                    debug!("No window left to activate");
                    properties::set_active_window(&mut self.display, None)?;
                    self.status.emit(None);
                }
                return Ok(());
            }
        };

        if properties::lifecycle(&self.display, target)? == Lifecycle::Iconic {
            self.iconify(target, false)?;
        }

        if let Some(previous) = active.filter(|&previous| previous != target) {
            self.display
                .set_border_color(previous, self.config.appearance.background)?;
        }
        self.display.set_input_focus(target)?;

        if active == Some(target) {
            return Ok(());
        }

        debug!("Activating 0x{:x}", target);
        self.display
            .set_border_color(target, self.config.appearance.foreground)?;
        self.raise(target)?;
        properties::send_protocol(&mut self.display, target, AtomName::WmTakeFocus)?;
        properties::set_active_window(&mut self.display, Some(target))?;

        let record = status::describe(&self.display, self.screen, target, gridwm_ipc::FLAG_ACTIVE)?;
        self.status.emit(Some(&record));
        Ok(())
    }

    /// Move `window` into or out of the iconic state
    pub fn iconify(&mut self, window: Window, iconic: bool) -> Result<()> {
        if iconic {
            debug!("Iconifying 0x{:x}", window);
            properties::set_lifecycle(&mut self.display, window, Lifecycle::Iconic)?;
            properties::set_state_flag(&mut self.display, window, StateFlags::HIDDEN, true)?;
            self.display.unmap(window)?;
            // Focus never stays on an unmapped window
            if self.display.input_focus()? == window {
                let root = self.display.root();
                self.display.set_input_focus(root)?;
            }
        } else {
            debug!("Restoring 0x{:x}", window);
            self.display.map(window)?;
            properties::set_lifecycle(&mut self.display, window, Lifecycle::Normal)?;
            properties::set_state_flag(&mut self.display, window, StateFlags::HIDDEN, false)?;
        }
        Ok(())
    }
}
