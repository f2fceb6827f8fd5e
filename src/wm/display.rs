//! Display Module
//!
//! The window manager never keeps its own list of windows: the display
//! server is the single source of truth, and every decision re-reads it
//! through this trait. `X11Display` talks to a real server, the test suite
//! uses an in-memory fake.
//!
//! Queries return `Ok(None)`/empty when the server rejects the request (the
//! window was destroyed a moment ago, the property is missing). Only a lost
//! connection is an error.

use anyhow::Result;
use x11rb::protocol::xproto::{Atom, ConfigureWindowAux, Window};

use crate::shared::{Geometry, WindowAttributes};
use crate::wm::ewmh::AtomName;

pub trait DisplayServer {
    /// The root window of the managed screen
    fn root(&self) -> Window;

    /// Interned atom for a well-known name
    fn atom(&self, name: AtomName) -> Atom;

    fn attributes(&self, window: Window) -> Result<Option<WindowAttributes>>;

    fn geometry(&self, window: Window) -> Result<Option<Geometry>>;

    /// Children of the root, bottom-most first
    fn children(&self) -> Result<Vec<Window>>;

    /// Top-level window under the pointer
    fn pointer_child(&self) -> Result<Option<Window>>;

    /// Current input focus owner
    fn input_focus(&self) -> Result<Window>;

    fn get_property32(&self, window: Window, property: Atom) -> Result<Option<Vec<u32>>>;

    fn get_property8(&self, window: Window, property: Atom) -> Result<Option<Vec<u8>>>;

    fn set_property32(&mut self, window: Window, property: Atom, kind: Atom, values: &[u32])
        -> Result<()>;

    fn set_property8(&mut self, window: Window, property: Atom, kind: Atom, values: &[u8])
        -> Result<()>;

    fn delete_property(&mut self, window: Window, property: Atom) -> Result<()>;

    /// Subscribe to property and focus changes of a client window
    fn watch_client(&mut self, window: Window) -> Result<()>;

    fn map(&mut self, window: Window) -> Result<()>;

    fn unmap(&mut self, window: Window) -> Result<()>;

    fn configure(&mut self, window: Window, changes: &ConfigureWindowAux) -> Result<()>;

    fn set_border_color(&mut self, window: Window, pixel: u32) -> Result<()>;

    fn set_input_focus(&mut self, window: Window) -> Result<()>;

    /// Send a 32-bit format client message to `window`
    fn send_client_message(&mut self, window: Window, message_type: Atom, data: [u32; 5])
        -> Result<()>;

    /// Tell a client its real geometry after a configure request was not honored
    fn send_configure_notify(&mut self, window: Window, geometry: Geometry) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}
