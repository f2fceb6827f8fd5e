//! Command socket verbs
//!
//! One request is one command. Window arguments are handled one at a time:
//! an argument that does not parse or does not name a managed window is
//! skipped, and the rest still run.

use anyhow::Result;
use gridwm_ipc::{ProtocolError, Response, TileSpec, Verb};
use tracing::{debug, warn};
use x11rb::protocol::xproto::Window;

use crate::wm::WindowManager;
use crate::wm::display::DisplayServer;
use crate::wm::ewmh::AtomName;
use crate::wm::properties;
use crate::wm::query::{self, Predicate};
use crate::wm::status;

/// What a window verb does to each of its arguments
#[derive(Debug, Clone, Copy)]
enum WindowAction {
    Activate,
    Delete,
    Fullscreen,
    Tile(TileSpec),
    Iconify,
}

impl<D: DisplayServer> WindowManager<'_, D> {
    /// Run one command and build its response
    pub fn handle_command(&mut self, args: &[String]) -> Result<Response> {
        debug!("Command: {:?}", args);
        let response = match self.dispatch(args) {
            Ok(response) => response,
            Err(CommandError::Protocol(e)) => {
                debug!("Rejected command: {}", e);
                Response::failure()
            }
            Err(CommandError::Display(e)) => return Err(e),
        };
        self.display.flush()?;
        Ok(response)
    }

    fn dispatch(&mut self, args: &[String]) -> Result<Response, CommandError> {
        let verb: Verb = args.first().ok_or(ProtocolError::EmptyRequest)?.parse()?;
        let targets = &args[1..];

        let action = match verb {
            Verb::Quit => {
                self.request_quit();
                return Ok(Response::success());
            }
            Verb::Restart => {
                self.request_restart();
                return Ok(Response::success());
            }
            Verb::Root => {
                let mut response = Response::success();
                response.push(self.root_record()?);
                return Ok(response);
            }
            Verb::Windows => return Ok(self.list_windows()?),
            _ if verb.targets_windows() && targets.is_empty() => {
                return Err(ProtocolError::MissingWindows(verb).into());
            }
            Verb::Activate => WindowAction::Activate,
            Verb::Delete => WindowAction::Delete,
            Verb::Fullscreen => WindowAction::Fullscreen,
            Verb::Iconify => WindowAction::Iconify,
            Verb::Tile => match targets {
                [grid, tile, _, ..] => WindowAction::Tile(TileSpec::parse(grid, tile)?),
                _ => return Err(ProtocolError::MissingWindows(verb).into()),
            },
        };

        let windows = match action {
            WindowAction::Tile(_) => &targets[2..],
            _ => targets,
        };
        for arg in windows {
            let Ok(window) = gridwm_ipc::parse_window_id(arg) else {
                debug!("Skipping bad window argument {:?}", arg);
                continue;
            };
            if !self.is_managed(window)? {
                debug!("Skipping unmanaged window 0x{:x}", window);
                continue;
            }
            self.apply(action, window)?;
        }
        Ok(Response::success())
    }

    fn apply(&mut self, action: WindowAction, window: Window) -> Result<()> {
        match action {
            WindowAction::Activate => self.activate(Some(window)),
            WindowAction::Delete => {
                if !properties::send_protocol(&mut self.display, window, AtomName::WmDeleteWindow)? {
                    warn!("0x{:x} does not support WM_DELETE_WINDOW", window);
                }
                Ok(())
            }
            WindowAction::Fullscreen => self.fullscreen(window),
            WindowAction::Tile(spec) => self.tile(window, &spec),
            WindowAction::Iconify => self.iconify(window, true),
        }
    }

    /// Managed windows top-most first, then the root
    fn list_windows(&self) -> Result<Response> {
        let active = properties::active_window(&self.display)?;
        let pointer = self.display.pointer_child()?;

        let mut response = Response::success();
        for window in query::query(&self.display, Predicate::Managed)? {
            let mut flags = String::new();
            if Some(window) == active {
                flags.push(gridwm_ipc::FLAG_ACTIVE);
            }
            if Some(window) == pointer {
                flags.push(gridwm_ipc::FLAG_POINTER);
            }
            response.push(status::describe(&self.display, self.screen, window, flags)?);
        }
        response.push(self.root_record()?);
        Ok(response)
    }

    fn root_record(&self) -> Result<gridwm_ipc::WindowRecord> {
        status::describe(&self.display, self.screen, self.display.root(), gridwm_ipc::FLAG_ROOT)
    }
}

/// Bad input from the client, or a failure talking to the display
enum CommandError {
    Protocol(ProtocolError),
    Display(anyhow::Error),
}

impl From<ProtocolError> for CommandError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(e: anyhow::Error) -> Self {
        Self::Display(e)
    }
}
