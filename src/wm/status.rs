//! Status channel
//!
//! Fire-and-forget window records written to a FIFO, one line per change of
//! the active window or of the screen size. A bar reads the other end.

use anyhow::Result;
use gridwm_ipc::WindowRecord;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::Path;
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::Window;

use crate::wm::Screen;
use crate::wm::display::DisplayServer;
use crate::wm::properties;

/// Writer for status lines; silently discards them when no channel is open
pub struct StatusSink {
    writer: Option<Box<dyn Write>>,
}

impl StatusSink {
    pub fn disabled() -> Self {
        Self { writer: None }
    }

    /// Open the FIFO at `path` without blocking.
    ///
    /// The FIFO is opened read-write so the open succeeds before a reader
    /// shows up. Anything other than a FIFO disables the channel.
    pub fn open(path: &Path) -> Self {
        match Self::open_fifo(path) {
            Ok(file) => {
                info!("Status lines go to {:?}", path);
                Self {
                    writer: Some(Box::new(file)),
                }
            }
            Err(e) => {
                warn!("Status channel {:?} unavailable: {}", path, e);
                Self::disabled()
            }
        }
    }

    fn open_fifo(path: &Path) -> std::io::Result<File> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.file_type().is_fifo() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a FIFO",
            ));
        }
        OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
    }

    /// Write one line: `W` followed by the record, or a bare `W` when nothing is active
    pub fn emit(&mut self, record: Option<&WindowRecord>) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let line = gridwm_ipc::status_line(record);
        // Pipe writes up to PIPE_BUF are all-or-nothing, so a line never
        // reaches the reader half written
        if line.len() > libc::PIPE_BUF {
            debug!("Dropped oversized status line ({} bytes)", line.len());
            return;
        }
        // A full pipe means the reader is behind; drop the line rather than block
        match writer.write(line.as_bytes()) {
            Ok(n) if n == line.len() => {}
            Ok(n) => debug!("Short status write ({} of {} bytes)", n, line.len()),
            Err(e) => debug!("Dropped status line: {}", e),
        }
    }

    #[cfg(test)]
    pub fn capture() -> (Self, std::rc::Rc<std::cell::RefCell<Vec<String>>>) {
        let lines = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = Self {
            writer: Some(Box::new(Capture(lines.clone()))),
        };
        (sink, lines)
    }
}

#[cfg(test)]
struct Capture(std::rc::Rc<std::cell::RefCell<Vec<String>>>);

#[cfg(test)]
impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().push(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Build the record for `window`; the root reports the tracked screen size
pub fn describe<D: DisplayServer>(
    display: &D,
    screen: Screen,
    window: Window,
    global_flags: impl Into<String>,
) -> Result<WindowRecord> {
    let (width, height, x, y) = if window == display.root() {
        (screen.width, screen.height, 0, 0)
    } else {
        display
            .geometry(window)?
            .map_or((0, 0, 0, 0), |g| (g.width, g.height, g.x, g.y))
    };
    let (instance, class) = properties::class(display, window)?;
    Ok(WindowRecord {
        id: window,
        global_flags: global_flags.into(),
        state_flags: properties::state_flags(display, window)?.record_flags(),
        width,
        height,
        x,
        y,
        instance,
        class,
        title: properties::title(display, window)?,
    })
}
