//! Placement Module
//!
//! Grid tiling and fullscreen. Every window is placed on its own: a tile is
//! computed from the screen, the grid spec and the window's own hints, with
//! no knowledge of where other windows are.

use anyhow::Result;
use gridwm_ipc::TileSpec;
use tracing::debug;
use x11rb::protocol::xproto::{ConfigureWindowAux, StackMode, Window};

use crate::config::LayoutConfig;
use crate::shared::Geometry;
use crate::wm::client_flags::StateFlags;
use crate::wm::display::DisplayServer;
use crate::wm::hints::SizeHints;
use crate::wm::properties;
use crate::wm::{Screen, WindowManager};

/// Outer rectangle of a grid cell span, gaps and top padding excluded.
///
/// Cell sizes use integer division; leftover pixels stay at the right and
/// bottom edges. A span reaching past the last column or row is cut at the
/// grid edge.
pub fn cell_geometry(screen: Screen, layout: &LayoutConfig, spec: &TileSpec) -> Geometry {
    let gap = i64::from(layout.gap_size);
    let top = i64::from(layout.top_padding);
    let cell_width = (i64::from(screen.width) - gap) / i64::from(spec.grid_width.max(1));
    let cell_height = (i64::from(screen.height) - top - gap) / i64::from(spec.grid_height.max(1));
    let span_width = spec.span_width.min(spec.grid_width.saturating_sub(spec.origin_x)).max(1);
    let span_height = spec.span_height.min(spec.grid_height.saturating_sub(spec.origin_y)).max(1);

    let x = gap + cell_width * i64::from(spec.origin_x);
    let y = top + gap + cell_height * i64::from(spec.origin_y);
    let width = cell_width * i64::from(span_width) - gap;
    let height = cell_height * i64::from(span_height) - gap;

    Geometry::new(x as i32, y as i32, clamp_size(width), clamp_size(height))
}

fn clamp_size(size: i64) -> u32 {
    size.clamp(1, i64::from(u32::MAX)) as u32
}

/// Shrink one axis to `size` and center it in the original span
fn center_axis(origin: i32, span: u32, size: u32) -> (i32, u32) {
    if size >= span {
        return (origin, span);
    }
    (origin + ((span - size) / 2) as i32, size)
}

fn round_down(size: u32, increment: Option<u32>) -> u32 {
    match increment {
        Some(inc) if size >= inc => size - size % inc,
        _ => size,
    }
}

/// Pick the extent of one axis inside the cell.
///
/// A kept size smaller than the cell is centered. Otherwise a maximum size
/// smaller than the cell is centered. Otherwise the cell span is used.
fn fit_axis(origin: i32, span: u32, keep: Option<u32>, max: Option<u32>, frame: u32) -> (i32, u32) {
    match keep.map(|size| size.saturating_add(frame)) {
        Some(size) if size < span => center_axis(origin, span, size),
        _ => match max {
            Some(max) => center_axis(origin, span, max.saturating_add(frame)),
            None => (origin, span),
        },
    }
}

/// Resolve the final geometry of a tiled window.
///
/// `cell` and the returned geometry are outer rectangles in X terms: the
/// position is the corner of the border, the size excludes it. `keep_size` is
/// the current content size of a dialog or splash window, kept on each axis
/// where it is smaller than the cell. Precedence: a fixed program position
/// and size wins outright, then the kept dialog size, then the maximum size.
/// The border always comes out of the result, and resize increments apply
/// last in every case.
pub fn resolve_geometry(
    cell: Geometry,
    hints: Option<&SizeHints>,
    keep_size: Option<(u32, u32)>,
    border: u32,
) -> Geometry {
    let frame = 2 * border;
    let mut rect = cell;

    if let Some(h) = hints.filter(|h| h.fixed_geometry()) {
        rect = Geometry::new(h.x, h.y, h.width, h.height);
    } else {
        let max = hints.and_then(SizeHints::max_size);
        (rect.x, rect.width) = fit_axis(
            cell.x,
            cell.width,
            keep_size.map(|(width, _)| width),
            max.map(|(width, _)| width),
            frame,
        );
        (rect.y, rect.height) = fit_axis(
            cell.y,
            cell.height,
            keep_size.map(|(_, height)| height),
            max.map(|(_, height)| height),
            frame,
        );
    }

    rect.width = rect.width.saturating_sub(frame).max(1);
    rect.height = rect.height.saturating_sub(frame).max(1);

    let (width_inc, height_inc) = hints.map_or((None, None), SizeHints::resize_increments);
    rect.width = round_down(rect.width, width_inc);
    rect.height = round_down(rect.height, height_inc);
    rect.border_width = border;
    rect
}

impl<D: DisplayServer> WindowManager<'_, D> {
    /// Configured border size, or none for windows that refuse decorations
    pub fn effective_border(&self, window: Window) -> Result<u32> {
        if properties::decoration_suppressed(&self.display, window)? {
            Ok(0)
        } else {
            Ok(self.config.appearance.border_size)
        }
    }

    /// Place `window` in a grid cell. Always leaves fullscreen.
    pub fn tile(&mut self, window: Window, spec: &TileSpec) -> Result<()> {
        properties::set_state_flag(&mut self.display, window, StateFlags::FULLSCREEN, false)?;

        let border = self.effective_border(window)?;
        let cell = cell_geometry(self.screen, &self.config.layout, spec);
        let hints = properties::size_hints(&self.display, window)?;
        let keep_size = match properties::window_type(&self.display, window)? {
            Some(kind) if kind.is_transient_like() => self
                .display
                .geometry(window)?
                .map(|current| (current.width, current.height)),
            _ => None,
        };

        let target = resolve_geometry(cell, hints.as_ref(), keep_size, border);
        debug!("Tiling 0x{:x} as {:?} into {:?}", window, spec, target);

        self.display.configure(
            window,
            &ConfigureWindowAux::new()
                .x(target.x)
                .y(target.y)
                .width(target.width)
                .height(target.height)
                .border_width(target.border_width),
        )
    }

    /// Cover the whole screen without a border, on top of every other window
    pub fn fullscreen(&mut self, window: Window) -> Result<()> {
        properties::set_state_flag(&mut self.display, window, StateFlags::FULLSCREEN, true)?;
        debug!("Fullscreen 0x{:x}", window);

        self.display.configure(
            window,
            &ConfigureWindowAux::new()
                .x(0)
                .y(0)
                .width(self.screen.width)
                .height(self.screen.height)
                .border_width(0)
                .stack_mode(StackMode::ABOVE),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::wm::ewmh::AtomName;
    use crate::wm::fake::FakeDisplay;
    use crate::wm::hints::size_flags;
    use crate::wm::status::StatusSink;

    const SCREEN: Screen = Screen {
        width: 1366,
        height: 768,
    };

    fn config(border_size: u32, gap_size: u32, top_padding: u32) -> Config {
        let mut config = Config::default();
        config.appearance.border_size = border_size;
        config.layout.gap_size = gap_size;
        config.layout.top_padding = top_padding;
        config
    }

    fn manager(config: &Config) -> WindowManager<'_, FakeDisplay> {
        let display = FakeDisplay::new(SCREEN.width, SCREEN.height);
        WindowManager::new(display, config, SCREEN, StatusSink::disabled())
    }

    #[test]
    fn test_every_tile_stays_inside_padding() {
        for (gap, top) in [(0, 0), (6, 0), (10, 24), (3, 17)] {
            let layout = config(0, gap, top).layout;
            for grid_width in 1..=5 {
                for grid_height in 1..=4 {
                    for span_width in 1..=grid_width {
                        for span_height in 1..=grid_height {
                            for origin_x in 0..grid_width {
                                for origin_y in 0..grid_height {
                                    let spec = TileSpec {
                                        grid_width,
                                        grid_height,
                                        span_width,
                                        span_height,
                                        origin_x,
                                        origin_y,
                                    };
                                    let g = cell_geometry(SCREEN, &layout, &spec);
                                    assert!(g.x >= gap as i32, "{:?}", spec);
                                    assert!(g.y >= (top + gap) as i32, "{:?}", spec);
                                    assert!(
                                        g.x as u32 + g.width <= SCREEN.width - gap,
                                        "{:?}",
                                        spec
                                    );
                                    assert!(
                                        g.y as u32 + g.height <= SCREEN.height - gap,
                                        "{:?}",
                                        spec
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_tile_inside_screen_with_border() {
        let config = config(2, 8, 20);
        let mut wm = manager(&config);
        let w = wm.display_mut().add_managed(Geometry::new(0, 0, 50, 50));

        let spec = TileSpec::parse("3x2", "2x1+1+1").unwrap();
        wm.tile(w, &spec).unwrap();

        let g = wm.display().geometry(w).unwrap().unwrap();
        assert_eq!(g.border_width, 2);
        assert!(g.x >= 8 && g.y >= 28);
        assert!(g.x as u32 + g.outer_width() <= SCREEN.width - 8);
        assert!(g.y as u32 + g.outer_height() <= SCREEN.height - 8);
        // (1366 - 8) / 3 = 452, (768 - 20 - 8) / 2 = 370
        assert_eq!(g, Geometry { x: 460, y: 398, width: 892, height: 358, border_width: 2 });
    }

    #[test]
    fn test_tile_fullscreen_tile_round_trip() {
        let config = config(1, 4, 0);
        let mut wm = manager(&config);
        let w = wm.display_mut().add_managed(Geometry::new(0, 0, 50, 50));

        wm.tile(w, &TileSpec::FULL).unwrap();
        let tiled = wm.display().geometry(w).unwrap();

        wm.fullscreen(w).unwrap();
        let full = wm.display().geometry(w).unwrap().unwrap();
        assert_eq!(full, Geometry::new(0, 0, SCREEN.width, SCREEN.height));
        assert!(properties::has_state(wm.display(), w, StateFlags::FULLSCREEN).unwrap());

        wm.tile(w, &TileSpec::FULL).unwrap();
        assert_eq!(wm.display().geometry(w).unwrap(), tiled);
        assert!(!properties::has_state(wm.display(), w, StateFlags::FULLSCREEN).unwrap());
    }

    #[test]
    fn test_fullscreen_outranks_above() {
        let config = Config::default();
        let mut wm = manager(&config);
        let w = wm.display_mut().add_managed(Geometry::new(0, 0, 50, 50));
        let above = wm.display_mut().add_managed(Geometry::new(0, 0, 50, 50));
        properties::set_state_flag(wm.display_mut(), above, StateFlags::ABOVE, true).unwrap();

        wm.fullscreen(w).unwrap();
        assert_eq!(wm.display().stacking().last(), Some(&w));
    }

    #[test]
    fn test_dialog_keeps_size_centered() {
        let config = config(1, 0, 0);
        let mut wm = manager(&config);
        let w = wm.display_mut().add_managed(Geometry::new(5, 5, 300, 2000));
        let dialog = wm.display().atom(AtomName::NetWmWindowTypeDialog);
        wm.display_mut().set_window_type(w, &[dialog]);

        wm.tile(w, &TileSpec::FULL).unwrap();

        // Width is kept and centered, height does not fit and fills the cell
        let g = wm.display().geometry(w).unwrap().unwrap();
        assert_eq!((g.x, g.width), ((1366 - 302) / 2, 300));
        assert_eq!((g.y, g.height), (0, 766));
    }

    #[test]
    fn test_max_size_and_increments() {
        let hints = SizeHints {
            flags: size_flags::P_MAX_SIZE | size_flags::P_RESIZE_INC,
            max_width: 400,
            max_height: 10_000,
            width_inc: 7,
            height_inc: 16,
            ..Default::default()
        };
        let cell = Geometry::new(0, 0, 1000, 500);
        let g = resolve_geometry(cell, Some(&hints), None, 0);
        assert_eq!(g.x, 300);
        assert_eq!(g.width, 399);
        assert_eq!((g.y, g.height), (0, 496));
    }

    #[test]
    fn test_fixed_program_geometry_wins() {
        let config = config(3, 10, 10);
        let mut wm = manager(&config);
        let w = wm.display_mut().add_managed(Geometry::new(0, 0, 50, 50));
        let dialog = wm.display().atom(AtomName::NetWmWindowTypeDialog);
        wm.display_mut().set_window_type(w, &[dialog]);
        let hints = SizeHints {
            flags: size_flags::P_POSITION | size_flags::P_SIZE,
            x: 40,
            y: 60,
            width: 200,
            height: 100,
            ..Default::default()
        };
        wm.display_mut().set_size_hints(w, &hints);

        wm.tile(w, &TileSpec::FULL).unwrap();
        let g = wm.display().geometry(w).unwrap().unwrap();
        assert_eq!(g, Geometry { x: 40, y: 60, width: 194, height: 94, border_width: 3 });
    }

    #[test]
    fn test_oversized_dialog_falls_back_to_max_size() {
        let config = Config::default();
        let mut wm = manager(&config);
        let w = wm.display_mut().add_managed(Geometry::new(0, 0, 2000, 2000));
        let dialog = wm.display().atom(AtomName::NetWmWindowTypeDialog);
        wm.display_mut().set_window_type(w, &[dialog]);
        let hints = SizeHints {
            flags: size_flags::P_MAX_SIZE,
            max_width: 300,
            max_height: 200,
            ..Default::default()
        };
        wm.display_mut().set_size_hints(w, &hints);

        wm.tile(w, &TileSpec::FULL).unwrap();
        let g = wm.display().geometry(w).unwrap().unwrap();
        assert_eq!((g.width, g.height), (300, 200));
        assert_eq!((g.x, g.y), ((1366 - 300) / 2, (768 - 200) / 2));
    }

    #[test]
    fn test_dialog_kept_only_where_smaller_than_cell() {
        let hints = SizeHints {
            flags: size_flags::P_MAX_SIZE,
            max_width: 500,
            max_height: 100,
            ..Default::default()
        };
        let cell = Geometry::new(0, 0, 1000, 500);
        let g = resolve_geometry(cell, Some(&hints), Some((200, 900)), 0);
        assert_eq!((g.x, g.width), (400, 200));
        assert_eq!((g.y, g.height), (200, 100));
    }

    #[test]
    fn test_decoration_suppressed_has_no_border() {
        let config = config(4, 0, 0);
        let mut wm = manager(&config);
        let w = wm.display_mut().add_managed(Geometry::new(0, 0, 50, 50));
        let motif = wm.display().atom(AtomName::MotifWmHints);
        wm.display_mut().set_raw32(w, motif, &[2, 0, 0, 0, 0]);

        assert_eq!(wm.effective_border(w).unwrap(), 0);
        wm.tile(w, &TileSpec::FULL).unwrap();
        let g = wm.display().geometry(w).unwrap().unwrap();
        assert_eq!(g, Geometry::new(0, 0, SCREEN.width, SCREEN.height));
    }
}
