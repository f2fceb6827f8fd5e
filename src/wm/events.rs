//! Events Module
//!
//! Display server events the window manager reacts to, and the state
//! transitions they trigger. Every event is followed by a flush so that its
//! effects reach the server before the next event is read.

use anyhow::Result;
use gridwm_ipc::TileSpec;
use tracing::debug;
use x11rb::protocol::xproto::{Atom, ConfigureWindowAux, NotifyDetail, NotifyMode, StackMode, Window};

use crate::wm::WindowManager;
use crate::wm::client_flags::{Lifecycle, StateFlags};
use crate::wm::display::DisplayServer;
use crate::wm::ewmh::{AtomName, NET_WM_STATE_ADD, NET_WM_STATE_REMOVE, NET_WM_STATE_TOGGLE};
use crate::wm::properties;
use crate::wm::query::{self, Predicate};
use crate::wm::status;

/// ICCCM `WM_STATE` values carried by `WM_CHANGE_STATE` and `WM_HINTS`
const NORMAL_STATE: u32 = 1;
const ICONIC_STATE: u32 = 3;

/// The events gridwm acts on; everything else is dropped by the backend
#[derive(Debug, Clone)]
pub enum WmEvent {
    MapRequest {
        window: Window,
    },
    ConfigureRequest {
        window: Window,
        changes: ConfigureWindowAux,
    },
    /// The root window changed size
    ScreenChange {
        width: u32,
        height: u32,
    },
    FocusIn {
        window: Window,
        mode: NotifyMode,
        detail: NotifyDetail,
    },
    PropertyChange {
        window: Window,
        atom: Atom,
    },
    ClientMessage {
        window: Window,
        message_type: Atom,
        data: [u32; 5],
    },
}

impl<D: DisplayServer> WindowManager<'_, D> {
    pub fn handle_event(&mut self, event: WmEvent) -> Result<()> {
        debug!("Event: {:?}", event);
        match event {
            WmEvent::MapRequest { window } => self.handle_map_request(window)?,
            WmEvent::ConfigureRequest { window, changes } => {
                self.handle_configure_request(window, changes)?
            }
            WmEvent::ScreenChange { width, height } => self.handle_screen_change(width, height)?,
            WmEvent::FocusIn { window, mode, detail } => self.handle_focus_in(window, mode, detail)?,
            WmEvent::PropertyChange { window, atom } => self.handle_property_change(window, atom)?,
            WmEvent::ClientMessage {
                window,
                message_type,
                data,
            } => self.handle_client_message(window, message_type, data)?,
        }
        self.display.flush()
    }

    fn handle_map_request(&mut self, window: Window) -> Result<()> {
        if !Predicate::Manageable.matches(&self.display, window)? {
            return self.display.map(window);
        }

        self.display.watch_client(window)?;
        if properties::has_state(&self.display, window, StateFlags::FULLSCREEN)? {
            self.fullscreen(window)?;
        } else {
            self.tile(window, &TileSpec::FULL)?;
        }

        let initial_state = properties::wm_hints(&self.display, window)?
            .and_then(|hints| hints.initial_state());
        if initial_state == Some(ICONIC_STATE) {
            debug!("0x{:x} starts iconic", window);
            properties::set_lifecycle(&mut self.display, window, Lifecycle::Iconic)?;
            properties::set_state_flag(&mut self.display, window, StateFlags::HIDDEN, true)
        } else {
            properties::set_lifecycle(&mut self.display, window, Lifecycle::Normal)?;
            self.display.map(window)?;
            self.activate(Some(window))
        }
    }

    fn handle_configure_request(
        &mut self,
        window: Window,
        mut changes: ConfigureWindowAux,
    ) -> Result<()> {
        let fixed = properties::size_hints(&self.display, window)?
            .is_some_and(|hints| hints.fixed_geometry());
        if fixed || !self.is_managed(window)? {
            return self.display.configure(window, &changes);
        }

        let transient_like = properties::window_type(&self.display, window)?
            .is_some_and(|kind| kind.is_transient_like());
        match self.display.geometry(window)? {
            Some(current) if transient_like => {
                // New size, same center
                let width = changes.width.unwrap_or(current.width);
                let height = changes.height.unwrap_or(current.height);
                changes.x = Some(current.x + (current.width as i32 - width as i32) / 2);
                changes.y = Some(current.y + (current.height as i32 - height as i32) / 2);
            }
            _ => {
                changes.x = None;
                changes.y = None;
                changes.width = None;
                changes.height = None;
            }
        }

        // Above windows may go to the very top; everyone else stays under the band
        if changes.stack_mode == Some(StackMode::ABOVE)
            && changes.sibling.is_none()
            && !Predicate::Above.matches(&self.display, window)?
        {
            match query::first(&self.display, Predicate::NotAbove)? {
                Some(top) if top != window => {
                    changes.sibling = Some(top);
                    changes.stack_mode = Some(StackMode::BELOW);
                }
                Some(_) => changes.stack_mode = None,
                None => {}
            }
        }

        self.display.configure(window, &changes)?;

        // The client did not get what it asked for; tell it what it got
        if let Some(actual) = self.display.geometry(window)? {
            self.display.send_configure_notify(window, actual)?;
        }
        Ok(())
    }

    fn handle_screen_change(&mut self, width: u32, height: u32) -> Result<()> {
        if self.screen.width == width && self.screen.height == height {
            return Ok(());
        }
        debug!("Screen resized to {}x{}", width, height);
        self.screen.width = width;
        self.screen.height = height;
        self.emit_root()
    }

    fn handle_focus_in(&mut self, window: Window, mode: NotifyMode, detail: NotifyDetail) -> Result<()> {
        if mode != NotifyMode::NORMAL && mode != NotifyMode::WHILE_GRABBED {
            return Ok(());
        }
        if window == self.display.root() {
            self.activate(None)
        } else if (detail == NotifyDetail::NONLINEAR || detail == NotifyDetail::NONLINEAR_VIRTUAL)
            && self.is_managed(window)?
        {
            self.activate(Some(window))
        } else {
            Ok(())
        }
    }

    fn handle_property_change(&mut self, window: Window, atom: Atom) -> Result<()> {
        let is_title = atom == self.display.atom(AtomName::WmName)
            || atom == self.display.atom(AtomName::NetWmName);
        if is_title && properties::active_window(&self.display)? == Some(window) {
            let record = status::describe(&self.display, self.screen, window, gridwm_ipc::FLAG_ACTIVE)?;
            self.status.emit(Some(&record));
        }
        Ok(())
    }

    fn handle_client_message(&mut self, window: Window, message_type: Atom, data: [u32; 5]) -> Result<()> {
        if message_type == self.display.atom(AtomName::NetActiveWindow) {
            return self.activate(Some(window));
        }
        if !self.is_managed(window)? {
            return Ok(());
        }

        if message_type == self.display.atom(AtomName::WmChangeState) {
            match data[0] {
                ICONIC_STATE => self.iconify(window, true)?,
                NORMAL_STATE => self.iconify(window, false)?,
                _ => {}
            }
        } else if message_type == self.display.atom(AtomName::NetWmState) {
            let action = data[0];
            for flag in [StateFlags::ABOVE, StateFlags::FULLSCREEN, StateFlags::DEMANDS_ATTENTION] {
                let Some(name) = flag.atom_name() else {
                    continue;
                };
                let atom = self.display.atom(name);
                if data[1] == atom || data[2] == atom {
                    self.change_state(window, flag, action)?;
                }
            }
        } else if message_type == self.display.atom(AtomName::NetCloseWindow) {
            properties::send_protocol(&mut self.display, window, AtomName::WmDeleteWindow)?;
        }
        Ok(())
    }

    /// Apply one `_NET_WM_STATE` add/remove/toggle request
    fn change_state(&mut self, window: Window, flag: StateFlags, action: u32) -> Result<()> {
        let present = properties::has_state(&self.display, window, flag)?;
        let wanted = match action {
            NET_WM_STATE_REMOVE => false,
            NET_WM_STATE_ADD => true,
            NET_WM_STATE_TOGGLE => !present,
            _ => return Ok(()),
        };

        if flag == StateFlags::FULLSCREEN {
            if wanted {
                self.fullscreen(window)
            } else {
                self.tile(window, &TileSpec::FULL)
            }
        } else {
            properties::set_state_flag(&mut self.display, window, flag, wanted)?;
            if flag == StateFlags::ABOVE && wanted != present {
                // Joining the band goes to its top, leaving it drops just below it
                self.raise(window)?;
            }
            Ok(())
        }
    }
}
