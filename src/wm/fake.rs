//! In-memory display server for tests
//!
//! Keeps just enough server state for the policy code: a stacking list,
//! per-window geometry and attributes, a property store, input focus, the
//! pointer, and a log of everything sent to clients.

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use x11rb::protocol::xproto::{Atom, ConfigureWindowAux, StackMode, Window};

use crate::shared::{Geometry, WindowAttributes};
use crate::wm::client_flags::Lifecycle;
use crate::wm::display::DisplayServer;
use crate::wm::ewmh::AtomName;
use crate::wm::hints::SizeHints;
use crate::wm::properties;

const ROOT: Window = 0x1d3;
const FIRST_WINDOW: Window = 0x0040_0001;
const FIRST_ATOM: Atom = 300;

#[derive(Debug, Clone)]
enum Property {
    Card32(Vec<u32>),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone)]
struct FakeWindow {
    geometry: Geometry,
    attributes: WindowAttributes,
}

#[derive(Debug)]
pub struct FakeDisplay {
    width: u32,
    height: u32,
    next_window: Window,
    windows: HashMap<Window, FakeWindow>,
    /// Bottom-most first, like QueryTree
    stack: Vec<Window>,
    properties: HashMap<(Window, Atom), Property>,
    watched: HashSet<Window>,
    borders: HashMap<Window, u32>,
    focus: Window,
    pointer: Option<Window>,
    messages: Vec<(Window, Atom, [u32; 5])>,
    configure_notifies: Vec<(Window, Geometry)>,
    flushes: usize,
}

impl FakeDisplay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            next_window: FIRST_WINDOW,
            windows: HashMap::new(),
            stack: Vec::new(),
            properties: HashMap::new(),
            watched: HashSet::new(),
            borders: HashMap::new(),
            focus: ROOT,
            pointer: None,
            messages: Vec::new(),
            configure_notifies: Vec::new(),
            flushes: 0,
        }
    }

    fn create(&mut self, geometry: Geometry, override_redirect: bool) -> Window {
        let window = self.next_window;
        self.next_window += 1;
        self.windows.insert(
            window,
            FakeWindow {
                geometry,
                attributes: WindowAttributes {
                    override_redirect,
                    viewable: false,
                },
            },
        );
        self.stack.push(window);
        window
    }

    /// A new top-level window that has not been mapped yet
    pub fn add_window(&mut self, geometry: Geometry) -> Window {
        self.create(geometry, false)
    }

    pub fn add_override_redirect(&mut self, geometry: Geometry) -> Window {
        let window = self.create(geometry, true);
        self.set_viewable(window, true);
        window
    }

    /// A mapped window in the normal state, as if gridwm had managed it
    pub fn add_managed(&mut self, geometry: Geometry) -> Window {
        let window = self.create(geometry, false);
        self.set_viewable(window, true);
        self.watched.insert(window);
        let state = self.atom(AtomName::WmState);
        self.set_raw32(window, state, &[Lifecycle::Normal.wm_state(), 0]);
        window
    }

    fn set_viewable(&mut self, window: Window, viewable: bool) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.attributes.viewable = viewable;
        }
    }

    pub fn set_raw32(&mut self, window: Window, property: Atom, values: &[u32]) {
        self.properties
            .insert((window, property), Property::Card32(values.to_vec()));
    }

    pub fn set_raw8(&mut self, window: Window, property: Atom, values: &[u8]) {
        self.properties
            .insert((window, property), Property::Bytes(values.to_vec()));
    }

    pub fn set_window_type(&mut self, window: Window, types: &[Atom]) {
        let property = self.atom(AtomName::NetWmWindowType);
        self.set_raw32(window, property, types);
    }

    pub fn set_size_hints(&mut self, window: Window, hints: &SizeHints) {
        let property = self.atom(AtomName::WmNormalHints);
        self.set_raw32(window, property, &hints.to_values());
    }

    pub fn advertise_protocols(&mut self, window: Window, protocols: &[AtomName]) {
        let property = self.atom(AtomName::WmProtocols);
        let atoms: Vec<Atom> = protocols.iter().map(|&name| self.atom(name)).collect();
        self.set_raw32(window, property, &atoms);
    }

    pub fn set_pointer(&mut self, window: Option<Window>) {
        self.pointer = window;
    }

    /// Number of `WM_PROTOCOLS` messages of kind `protocol` sent to `window`
    pub fn protocol_messages(&self, window: Window, protocol: AtomName) -> usize {
        let message_type = self.atom(AtomName::WmProtocols);
        let protocol = self.atom(protocol);
        self.messages
            .iter()
            .filter(|(w, kind, data)| *w == window && *kind == message_type && data[0] == protocol)
            .count()
    }

    pub fn stacking(&self) -> Vec<Window> {
        self.stack.clone()
    }

    pub fn is_watched(&self, window: Window) -> bool {
        self.watched.contains(&window)
    }

    pub fn is_viewable(&self, window: Window) -> bool {
        self.windows
            .get(&window)
            .is_some_and(|w| w.attributes.viewable)
    }

    pub fn border_color(&self, window: Window) -> Option<u32> {
        self.borders.get(&window).copied()
    }

    pub fn configure_notifies(&self, window: Window) -> Vec<Geometry> {
        self.configure_notifies
            .iter()
            .filter(|(w, _)| *w == window)
            .map(|(_, geometry)| *geometry)
            .collect()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    fn restack(&mut self, window: Window, sibling: Option<Window>, mode: StackMode) {
        if sibling == Some(window) || !self.stack.contains(&window) {
            return;
        }
        let without: Vec<Window> = self.stack.iter().copied().filter(|&w| w != window).collect();
        let index = match sibling {
            Some(sibling) => match without.iter().position(|&w| w == sibling) {
                Some(i) if mode == StackMode::ABOVE => i + 1,
                Some(i) if mode == StackMode::BELOW => i,
                _ => return,
            },
            None if mode == StackMode::ABOVE => without.len(),
            None if mode == StackMode::BELOW => 0,
            None => return,
        };
        self.stack = without;
        self.stack.insert(index, window);
    }
}

impl DisplayServer for FakeDisplay {
    fn root(&self) -> Window {
        ROOT
    }

    fn atom(&self, name: AtomName) -> Atom {
        FIRST_ATOM + name as Atom
    }

    fn attributes(&self, window: Window) -> Result<Option<WindowAttributes>> {
        if window == ROOT {
            return Ok(Some(WindowAttributes {
                override_redirect: false,
                viewable: true,
            }));
        }
        Ok(self.windows.get(&window).map(|w| w.attributes))
    }

    fn geometry(&self, window: Window) -> Result<Option<Geometry>> {
        if window == ROOT {
            return Ok(Some(Geometry::new(0, 0, self.width, self.height)));
        }
        Ok(self.windows.get(&window).map(|w| w.geometry))
    }

    fn children(&self) -> Result<Vec<Window>> {
        Ok(self.stack.clone())
    }

    fn pointer_child(&self) -> Result<Option<Window>> {
        Ok(self.pointer)
    }

    fn input_focus(&self) -> Result<Window> {
        Ok(self.focus)
    }

    fn get_property32(&self, window: Window, property: Atom) -> Result<Option<Vec<u32>>> {
        Ok(match self.properties.get(&(window, property)) {
            Some(Property::Card32(values)) => Some(values.clone()),
            _ => None,
        })
    }

    fn get_property8(&self, window: Window, property: Atom) -> Result<Option<Vec<u8>>> {
        Ok(match self.properties.get(&(window, property)) {
            Some(Property::Bytes(values)) => Some(values.clone()),
            _ => None,
        })
    }

    fn set_property32(&mut self, window: Window, property: Atom, _kind: Atom, values: &[u32])
        -> Result<()> {
        self.set_raw32(window, property, values);
        Ok(())
    }

    fn set_property8(&mut self, window: Window, property: Atom, _kind: Atom, values: &[u8])
        -> Result<()> {
        self.set_raw8(window, property, values);
        Ok(())
    }

    fn delete_property(&mut self, window: Window, property: Atom) -> Result<()> {
        self.properties.remove(&(window, property));
        Ok(())
    }

    fn watch_client(&mut self, window: Window) -> Result<()> {
        self.watched.insert(window);
        Ok(())
    }

    fn map(&mut self, window: Window) -> Result<()> {
        self.set_viewable(window, true);
        Ok(())
    }

    fn unmap(&mut self, window: Window) -> Result<()> {
        self.set_viewable(window, false);
        Ok(())
    }

    fn configure(&mut self, window: Window, changes: &ConfigureWindowAux) -> Result<()> {
        if let Some(w) = self.windows.get_mut(&window) {
            let g = &mut w.geometry;
            g.x = changes.x.unwrap_or(g.x);
            g.y = changes.y.unwrap_or(g.y);
            g.width = changes.width.unwrap_or(g.width);
            g.height = changes.height.unwrap_or(g.height);
            g.border_width = changes.border_width.unwrap_or(g.border_width);
        }
        if let Some(mode) = changes.stack_mode {
            self.restack(window, changes.sibling, mode);
        }
        Ok(())
    }

    fn set_border_color(&mut self, window: Window, pixel: u32) -> Result<()> {
        self.borders.insert(window, pixel);
        Ok(())
    }

    fn set_input_focus(&mut self, window: Window) -> Result<()> {
        self.focus = window;
        Ok(())
    }

    fn send_client_message(&mut self, window: Window, message_type: Atom, data: [u32; 5])
        -> Result<()> {
        self.messages.push((window, message_type, data));
        Ok(())
    }

    fn send_configure_notify(&mut self, window: Window, geometry: Geometry) -> Result<()> {
        self.configure_notifies.push((window, geometry));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restack_relative_to_sibling() {
        let mut display = FakeDisplay::new(100, 100);
        let a = display.add_window(Geometry::default());
        let b = display.add_window(Geometry::default());
        let c = display.add_window(Geometry::default());

        let below_a = ConfigureWindowAux::new().sibling(a).stack_mode(StackMode::BELOW);
        display.configure(c, &below_a).unwrap();
        assert_eq!(display.stacking(), vec![c, a, b]);

        let above_a = ConfigureWindowAux::new().sibling(a).stack_mode(StackMode::ABOVE);
        display.configure(b, &above_a).unwrap();
        assert_eq!(display.stacking(), vec![c, a, b]);

        display.configure(c, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE)).unwrap();
        assert_eq!(display.stacking(), vec![a, b, c]);
    }

    #[test]
    fn test_managed_helper_is_managed() {
        let mut display = FakeDisplay::new(100, 100);
        let w = display.add_managed(Geometry::default());
        assert!(display.is_viewable(w));
        assert_eq!(properties::lifecycle(&display, w).unwrap(), Lifecycle::Normal);
    }
}
