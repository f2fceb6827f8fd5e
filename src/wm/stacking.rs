//! Stacking Module
//!
//! Always-above windows form a band at the top of the stack. Raising an
//! ordinary window puts it just under that band; fullscreen windows go over
//! it (see `placement`).

use anyhow::Result;
use tracing::debug;
use x11rb::protocol::xproto::{ConfigureWindowAux, StackMode, Window};

use crate::wm::WindowManager;
use crate::wm::display::DisplayServer;
use crate::wm::query::{self, Predicate};

impl<D: DisplayServer> WindowManager<'_, D> {
    pub fn raise(&mut self, window: Window) -> Result<()> {
        let aboves = query::query(&self.display, Predicate::Above)?;
        let lowest_above = if aboves.contains(&window) {
            // An above window moves within the band, to its top
            None
        } else {
            aboves.last().copied()
        };

        let changes = match lowest_above {
            Some(sibling) => {
                debug!("Raising 0x{:x} below 0x{:x}", window, sibling);
                ConfigureWindowAux::new()
                    .sibling(sibling)
                    .stack_mode(StackMode::BELOW)
            }
            None => {
                debug!("Raising 0x{:x} to the top", window);
                ConfigureWindowAux::new().stack_mode(StackMode::ABOVE)
            }
        };
        self.display.configure(window, &changes)
    }
}
