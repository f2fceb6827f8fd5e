//! Window Manager Module
//!
//! Placement, focus and stacking policy on top of a [`DisplayServer`].
//! The behavior is split across submodules, each adding an `impl` block to
//! [`WindowManager`]:
//!
//! - `placement`: grid tiling and fullscreen
//! - `stacking`: raising below the always-above band
//! - `focus`: the active window and iconification
//! - `events`: display server event dispatch
//! - `commands`: command socket verbs

pub mod client_flags;
pub mod commands;
pub mod display;
pub mod events;
pub mod ewmh;
pub mod focus;
pub mod hints;
pub mod placement;
pub mod properties;
pub mod query;
pub mod stacking;
pub mod status;
pub mod x11;

#[cfg(test)]
pub mod fake;

use anyhow::Result;
use tracing::{debug, info};
use x11rb::protocol::xproto::Window;

use crate::config::Config;
use crate::wm::client_flags::Lifecycle;
use crate::wm::display::DisplayServer;
use crate::wm::query::Predicate;
use crate::wm::status::StatusSink;

/// Pixel size of the managed screen, tracked from root ConfigureNotify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen {
    pub width: u32,
    pub height: u32,
}

/// What the event loop should do once it stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    Restart,
}

pub struct WindowManager<'a, D: DisplayServer> {
    display: D,
    config: &'a Config,
    screen: Screen,
    status: StatusSink,
    quit: bool,
    restart: bool,
}

impl<'a, D: DisplayServer> WindowManager<'a, D> {
    pub fn new(display: D, config: &'a Config, screen: Screen, status: StatusSink) -> Self {
        Self {
            display,
            config,
            screen,
            status,
            quit: false,
            restart: false,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Take over windows that were mapped before gridwm started (or restarted)
    pub fn adopt_existing(&mut self) -> Result<()> {
        let windows = query::query(&self.display, Predicate::Manageable)?;
        let mut adopted = 0;
        for window in windows {
            let viewable = self
                .display
                .attributes(window)?
                .is_some_and(|attributes| attributes.viewable);
            if !viewable {
                continue;
            }
            self.display.watch_client(window)?;
            if properties::lifecycle(&self.display, window)? == Lifecycle::Withdrawn {
                properties::set_lifecycle(&mut self.display, window, Lifecycle::Normal)?;
            }
            adopted += 1;
        }
        info!("Adopted {} existing windows", adopted);

        self.emit_root()?;
        self.display.flush()
    }

    /// Request the event loop to stop
    pub fn request_quit(&mut self) {
        debug!("Quit requested");
        self.quit = true;
    }

    pub fn request_restart(&mut self) {
        debug!("Restart requested");
        self.restart = true;
    }

    /// Checked by the event loop before blocking
    pub fn exit_requested(&self) -> Option<Exit> {
        if self.restart {
            Some(Exit::Restart)
        } else if self.quit {
            Some(Exit::Quit)
        } else {
            None
        }
    }

    fn is_managed(&self, window: Window) -> Result<bool> {
        Predicate::Managed.matches(&self.display, window)
    }

    fn emit_root(&mut self) -> Result<()> {
        let record = status::describe(
            &self.display,
            self.screen,
            self.display.root(),
            gridwm_ipc::FLAG_ROOT,
        )?;
        self.status.emit(Some(&record));
        Ok(())
    }
}
