//! X11 backend
//!
//! [`DisplayServer`] over an x11rb connection. Requests that the server
//! rejects (usually because the window is already gone) are logged and
//! treated as "nothing there"; only a broken connection is an error.

use anyhow::{Context, Result};
use std::os::fd::{AsFd, BorrowedFd};
use tracing::{debug, info};
use x11rb::CURRENT_TIME;
use x11rb::atom_manager;
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::shared::{Geometry, WindowAttributes};
use crate::wm::Screen;
use crate::wm::display::DisplayServer;
use crate::wm::events::WmEvent;
use crate::wm::ewmh::{self, AtomName};

// Interned once at startup; the predefined WM_* atoms come from AtomEnum
atom_manager! {
    pub Atoms: AtomsCookie {
        WM_PROTOCOLS,
        WM_DELETE_WINDOW,
        WM_TAKE_FOCUS,
        WM_STATE,
        WM_CHANGE_STATE,
        UTF8_STRING,
        _NET_SUPPORTED,
        _NET_SUPPORTING_WM_CHECK,
        _NET_ACTIVE_WINDOW,
        _NET_CLOSE_WINDOW,
        _NET_WM_NAME,
        _NET_WM_STATE,
        _NET_WM_STATE_FULLSCREEN,
        _NET_WM_STATE_ABOVE,
        _NET_WM_STATE_HIDDEN,
        _NET_WM_STATE_DEMANDS_ATTENTION,
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_NORMAL,
        _NET_WM_WINDOW_TYPE_DIALOG,
        _NET_WM_WINDOW_TYPE_DOCK,
        _NET_WM_WINDOW_TYPE_SPLASH,
        _MOTIF_WM_HINTS,
    }
}

/// Name published on the supporting-check window
const WM_NAME: &str = "gridwm";

pub struct X11Display {
    conn: RustConnection,
    root: Window,
    atoms: Atoms,
    check_window: Window,
}

/// Turn a rejected request into `None`, keep connection failures
fn absorb<T>(result: Result<T, ReplyError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ReplyError::X11Error(e)) => {
            debug!("Ignoring X11 error: {:?}", e.error_kind);
            Ok(None)
        }
        Err(ReplyError::ConnectionError(e)) => Err(e.into()),
    }
}

impl X11Display {
    /// Connect, take the window manager role on the default screen and
    /// publish the EWMH root properties
    pub fn connect() -> Result<(Self, Screen)> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let setup_screen = &conn.setup().roots[screen_num];
        let root = setup_screen.root;
        let screen = Screen {
            width: u32::from(setup_screen.width_in_pixels),
            height: u32::from(setup_screen.height_in_pixels),
        };
        info!("Connected to X server, screen {} ({}x{})", screen_num, screen.width, screen.height);

        let atoms = Atoms::new(&conn)?
            .reply()
            .context("Failed to intern atoms")?;

        let mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::STRUCTURE_NOTIFY
            | EventMask::FOCUS_CHANGE;
        conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(mask))?
            .check()
            .context("Another window manager is already running")?;
        info!("Registered as window manager");

        let check_window = conn.generate_id()?;
        conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            check_window,
            root,
            -1,
            -1,
            1,
            1,
            0,
            WindowClass::INPUT_ONLY,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new(),
        )?;

        let mut display = Self {
            conn,
            root,
            atoms,
            check_window,
        };
        ewmh::setup_supported(&mut display)?;
        ewmh::setup_supporting_wm_check(&mut display, check_window, WM_NAME)?;
        display.flush()?;

        Ok((display, screen))
    }

    /// The display string the connection was opened with, for the socket path
    pub fn display_name() -> String {
        std::env::var("DISPLAY").unwrap_or_default()
    }

    /// Next event gridwm cares about, without blocking
    pub fn poll_event(&self) -> Result<Option<WmEvent>> {
        while let Some(event) = self.conn.poll_for_event()? {
            if let Some(event) = self.translate(event) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    fn translate(&self, event: Event) -> Option<WmEvent> {
        match event {
            Event::MapRequest(e) => Some(WmEvent::MapRequest { window: e.window }),
            Event::ConfigureRequest(e) => Some(WmEvent::ConfigureRequest {
                window: e.window,
                changes: ConfigureWindowAux::from_configure_request(&e),
            }),
            Event::ConfigureNotify(e) if e.window == self.root => Some(WmEvent::ScreenChange {
                width: u32::from(e.width),
                height: u32::from(e.height),
            }),
            Event::FocusIn(e) => Some(WmEvent::FocusIn {
                window: e.event,
                mode: e.mode,
                detail: e.detail,
            }),
            Event::PropertyNotify(e) => Some(WmEvent::PropertyChange {
                window: e.window,
                atom: e.atom,
            }),
            Event::ClientMessage(e) if e.format == 32 => Some(WmEvent::ClientMessage {
                window: e.window,
                message_type: e.type_,
                data: e.data.as_data32(),
            }),
            Event::Error(e) => {
                debug!(
                    "Ignoring X11 error {:?} (request {}, resource 0x{:x})",
                    e.error_kind, e.major_opcode, e.bad_value
                );
                None
            }
            _ => None,
        }
    }

    /// Remove the supporting-check window before the connection closes
    pub fn shutdown(&mut self) -> Result<()> {
        let check = self.atom(AtomName::NetSupportingWmCheck);
        self.conn.delete_property(self.root, check)?;
        self.conn.destroy_window(self.check_window)?;
        self.conn.flush()?;
        info!("Released the display");
        Ok(())
    }
}

impl AsFd for X11Display {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.conn.stream().as_fd()
    }
}

impl DisplayServer for X11Display {
    fn root(&self) -> Window {
        self.root
    }

    fn atom(&self, name: AtomName) -> Atom {
        let atoms = &self.atoms;
        match name {
            AtomName::WmProtocols => atoms.WM_PROTOCOLS,
            AtomName::WmDeleteWindow => atoms.WM_DELETE_WINDOW,
            AtomName::WmTakeFocus => atoms.WM_TAKE_FOCUS,
            AtomName::WmState => atoms.WM_STATE,
            AtomName::WmChangeState => atoms.WM_CHANGE_STATE,
            AtomName::WmName => AtomEnum::WM_NAME.into(),
            AtomName::WmClass => AtomEnum::WM_CLASS.into(),
            AtomName::WmHints => AtomEnum::WM_HINTS.into(),
            AtomName::WmNormalHints => AtomEnum::WM_NORMAL_HINTS.into(),
            AtomName::Utf8String => atoms.UTF8_STRING,
            AtomName::NetSupported => atoms._NET_SUPPORTED,
            AtomName::NetSupportingWmCheck => atoms._NET_SUPPORTING_WM_CHECK,
            AtomName::NetActiveWindow => atoms._NET_ACTIVE_WINDOW,
            AtomName::NetCloseWindow => atoms._NET_CLOSE_WINDOW,
            AtomName::NetWmName => atoms._NET_WM_NAME,
            AtomName::NetWmState => atoms._NET_WM_STATE,
            AtomName::NetWmStateFullscreen => atoms._NET_WM_STATE_FULLSCREEN,
            AtomName::NetWmStateAbove => atoms._NET_WM_STATE_ABOVE,
            AtomName::NetWmStateHidden => atoms._NET_WM_STATE_HIDDEN,
            AtomName::NetWmStateDemandsAttention => atoms._NET_WM_STATE_DEMANDS_ATTENTION,
            AtomName::NetWmWindowType => atoms._NET_WM_WINDOW_TYPE,
            AtomName::NetWmWindowTypeNormal => atoms._NET_WM_WINDOW_TYPE_NORMAL,
            AtomName::NetWmWindowTypeDialog => atoms._NET_WM_WINDOW_TYPE_DIALOG,
            AtomName::NetWmWindowTypeDock => atoms._NET_WM_WINDOW_TYPE_DOCK,
            AtomName::NetWmWindowTypeSplash => atoms._NET_WM_WINDOW_TYPE_SPLASH,
            AtomName::MotifWmHints => atoms._MOTIF_WM_HINTS,
        }
    }

    fn attributes(&self, window: Window) -> Result<Option<WindowAttributes>> {
        let reply = absorb(self.conn.get_window_attributes(window)?.reply())?;
        Ok(reply.map(|attrs| WindowAttributes {
            override_redirect: attrs.override_redirect,
            viewable: attrs.map_state == MapState::VIEWABLE,
        }))
    }

    fn geometry(&self, window: Window) -> Result<Option<Geometry>> {
        let reply = absorb(self.conn.get_geometry(window)?.reply())?;
        Ok(reply.map(|geom| Geometry {
            x: i32::from(geom.x),
            y: i32::from(geom.y),
            width: u32::from(geom.width),
            height: u32::from(geom.height),
            border_width: u32::from(geom.border_width),
        }))
    }

    fn children(&self) -> Result<Vec<Window>> {
        let reply = absorb(self.conn.query_tree(self.root)?.reply())?;
        Ok(reply.map(|tree| tree.children).unwrap_or_default())
    }

    fn pointer_child(&self) -> Result<Option<Window>> {
        let reply = absorb(self.conn.query_pointer(self.root)?.reply())?;
        Ok(reply
            .map(|pointer| pointer.child)
            .filter(|&child| child != x11rb::NONE))
    }

    fn input_focus(&self) -> Result<Window> {
        let reply = absorb(self.conn.get_input_focus()?.reply())?;
        Ok(reply.map_or(self.root, |focus| focus.focus))
    }

    fn get_property32(&self, window: Window, property: Atom) -> Result<Option<Vec<u32>>> {
        let reply = absorb(
            self.conn
                .get_property(false, window, property, AtomEnum::ANY, 0, u32::MAX / 4)?
                .reply(),
        )?;
        Ok(reply.and_then(|prop| prop.value32().map(|values| values.collect())))
    }

    fn get_property8(&self, window: Window, property: Atom) -> Result<Option<Vec<u8>>> {
        let reply = absorb(
            self.conn
                .get_property(false, window, property, AtomEnum::ANY, 0, u32::MAX / 4)?
                .reply(),
        )?;
        Ok(reply.and_then(|prop| prop.value8().map(|values| values.collect())))
    }

    fn set_property32(&mut self, window: Window, property: Atom, kind: Atom, values: &[u32])
        -> Result<()> {
        self.conn
            .change_property32(PropMode::REPLACE, window, property, kind, values)?;
        Ok(())
    }

    fn set_property8(&mut self, window: Window, property: Atom, kind: Atom, values: &[u8])
        -> Result<()> {
        self.conn
            .change_property8(PropMode::REPLACE, window, property, kind, values)?;
        Ok(())
    }

    fn delete_property(&mut self, window: Window, property: Atom) -> Result<()> {
        self.conn.delete_property(window, property)?;
        Ok(())
    }

    fn watch_client(&mut self, window: Window) -> Result<()> {
        let mask = EventMask::PROPERTY_CHANGE | EventMask::FOCUS_CHANGE;
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().event_mask(mask))?;
        Ok(())
    }

    fn map(&mut self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap(&mut self, window: Window) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn configure(&mut self, window: Window, changes: &ConfigureWindowAux) -> Result<()> {
        self.conn.configure_window(window, changes)?;
        Ok(())
    }

    fn set_border_color(&mut self, window: Window, pixel: u32) -> Result<()> {
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().border_pixel(pixel))?;
        Ok(())
    }

    fn set_input_focus(&mut self, window: Window) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, CURRENT_TIME)?;
        Ok(())
    }

    fn send_client_message(&mut self, window: Window, message_type: Atom, data: [u32; 5])
        -> Result<()> {
        let event = ClientMessageEvent::new(32, window, message_type, data);
        self.conn
            .send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn send_configure_notify(&mut self, window: Window, geometry: Geometry) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: x11rb::NONE,
            x: geometry.x as i16,
            y: geometry.y as i16,
            width: geometry.width as u16,
            height: geometry.height as u16,
            border_width: geometry.border_width as u16,
            override_redirect: false,
        };
        self.conn
            .send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}
