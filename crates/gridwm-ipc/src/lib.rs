//! gridwm IPC Protocol
//!
//! Wire format shared by the `gridwm` daemon and anything that talks to its
//! command socket: NUL-terminated request arguments, a one-byte status reply
//! and tab-separated window records.

use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Capacity of a fresh request buffer
pub const INITIAL_BUFFER_SIZE: usize = 1024;

/// Prefix of every line written to the status channel
pub const STATUS_PREFIX: char = 'W';

/// Socket path for a display: `<runtime dir>/gridwm<display>`
///
/// Falls back to `/tmp` when no runtime directory is available.
pub fn socket_path(display: &str) -> PathBuf {
    let runtime_dir = dirs::runtime_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
    runtime_dir.join(format!("gridwm{}", display))
}

// ============================================================================
// Errors
// ============================================================================

/// Reasons a request (or one of its arguments) is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty request")]
    EmptyRequest,

    #[error("unknown verb: {0}")]
    UnknownVerb(String),

    #[error("{0} expects at least one window")]
    MissingWindows(Verb),

    #[error("malformed grid size '{0}', expected <width>x<height>")]
    MalformedGrid(String),

    #[error("malformed tile '{0}', expected <width>x<height>+<x>+<y>")]
    MalformedTile(String),

    #[error("tile {span_width}x{span_height}+{origin_x}+{origin_y} does not fit a {grid_width}x{grid_height} grid")]
    TileOutOfRange {
        grid_width: i64,
        grid_height: i64,
        span_width: i64,
        span_height: i64,
        origin_x: i64,
        origin_y: i64,
    },

    #[error("invalid window id: {0}")]
    InvalidWindow(String),
}

// ============================================================================
// Requests
// ============================================================================

/// Command verbs understood by the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Quit,
    Restart,
    Root,
    Windows,
    Activate,
    Delete,
    Fullscreen,
    Tile,
    Iconify,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::Restart => "restart",
            Self::Root => "root",
            Self::Windows => "windows",
            Self::Activate => "activate",
            Self::Delete => "delete",
            Self::Fullscreen => "fullscreen",
            Self::Tile => "tile",
            Self::Iconify => "iconify",
        }
    }

    /// Whether the verb takes window identifiers as arguments
    pub fn targets_windows(&self) -> bool {
        matches!(
            self,
            Self::Activate | Self::Delete | Self::Fullscreen | Self::Tile | Self::Iconify
        )
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "quit" => Self::Quit,
            "restart" => Self::Restart,
            "root" => Self::Root,
            "windows" => Self::Windows,
            "activate" => Self::Activate,
            "delete" => Self::Delete,
            "fullscreen" => Self::Fullscreen,
            "tile" => Self::Tile,
            "iconify" => Self::Iconify,
            other => return Err(ProtocolError::UnknownVerb(other.to_string())),
        })
    }
}

/// A decoded request: argument 0 is the verb
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub args: Vec<String>,
}

impl Request {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a raw request into its NUL-terminated arguments
    ///
    /// A trailing argument without its terminator is kept.
    pub fn parse(data: &[u8]) -> Self {
        let mut parts: Vec<&[u8]> = data.split(|&b| b == 0).collect();
        if data.last() == Some(&0) || data.is_empty() {
            parts.pop();
        }

        Self {
            args: parts
                .into_iter()
                .map(|part| String::from_utf8_lossy(part).into_owned())
                .collect(),
        }
    }

    /// Encode as concatenated NUL-terminated arguments
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.args.iter().map(|a| a.len() + 1).sum());
        for arg in &self.args {
            buf.extend_from_slice(arg.as_bytes());
            buf.push(0);
        }
        buf
    }

    pub fn verb(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

// ============================================================================
// Request Framing
// ============================================================================

/// The buffer is grown only when a read filled it exactly
pub fn must_grow(filled: usize, capacity: usize) -> bool {
    filled == capacity
}

/// Capacity after growing a full buffer
pub fn grown_capacity(capacity: usize) -> usize {
    capacity.max(1) * 2
}

/// Receive buffer reused across connections
///
/// There is no length prefix: a request ends at the first read that leaves
/// the buffer short of full. A client that dribbles its request in several
/// small writes may therefore be cut off after the first one.
#[derive(Debug)]
pub struct RequestBuffer {
    data: Vec<u8>,
}

impl RequestBuffer {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity.max(1)],
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Read one request, doubling the buffer each time a read fills it
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> io::Result<&[u8]> {
        let mut filled = 0;
        loop {
            let n = match reader.read(&mut self.data[filled..]) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            filled += n;

            if !must_grow(filled, self.data.len()) {
                break;
            }
            let capacity = grown_capacity(self.data.len());
            self.data.resize(capacity, 0);
        }
        Ok(&self.data[..filled])
    }
}

impl Default for RequestBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Parse a window identifier: `0x`-prefixed hexadecimal or decimal
pub fn parse_window_id(arg: &str) -> Result<u32, ProtocolError> {
    let parsed = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => arg.parse::<u32>(),
    };
    parsed.map_err(|_| ProtocolError::InvalidWindow(arg.to_string()))
}

/// Placement of one window inside a uniform grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSpec {
    pub grid_width: u32,
    pub grid_height: u32,
    pub span_width: u32,
    pub span_height: u32,
    pub origin_x: u32,
    pub origin_y: u32,
}

impl TileSpec {
    /// The whole screen as a single cell
    pub const FULL: TileSpec = TileSpec {
        grid_width: 1,
        grid_height: 1,
        span_width: 1,
        span_height: 1,
        origin_x: 0,
        origin_y: 0,
    };

    /// Validate a tile: spans in `1..=grid`, origins in `0..grid`
    pub fn new(
        grid_width: i64,
        grid_height: i64,
        span_width: i64,
        span_height: i64,
        origin_x: i64,
        origin_y: i64,
    ) -> Result<Self, ProtocolError> {
        let fits = grid_width >= 0
            && grid_height >= 0
            && span_width >= 1
            && span_height >= 1
            && span_width <= grid_width
            && span_height <= grid_height
            && origin_x >= 0
            && origin_y >= 0
            && origin_x < grid_width
            && origin_y < grid_height;

        let out_of_range = || ProtocolError::TileOutOfRange {
            grid_width,
            grid_height,
            span_width,
            span_height,
            origin_x,
            origin_y,
        };
        if !fits {
            return Err(out_of_range());
        }

        let narrow = |v: i64| u32::try_from(v).map_err(|_| out_of_range());
        Ok(Self {
            grid_width: narrow(grid_width)?,
            grid_height: narrow(grid_height)?,
            span_width: narrow(span_width)?,
            span_height: narrow(span_height)?,
            origin_x: narrow(origin_x)?,
            origin_y: narrow(origin_y)?,
        })
    }

    /// Parse `<grid_w>x<grid_h>` and `<w>x<h>+<x>+<y>`
    pub fn parse(grid: &str, tile: &str) -> Result<Self, ProtocolError> {
        let malformed_grid = || ProtocolError::MalformedGrid(grid.to_string());
        let malformed_tile = || ProtocolError::MalformedTile(tile.to_string());

        let (grid_width, grid_height) = grid.split_once('x').ok_or_else(malformed_grid)?;
        let grid_width = parse_int(grid_width).ok_or_else(malformed_grid)?;
        let grid_height = parse_int(grid_height).ok_or_else(malformed_grid)?;

        let (span_width, rest) = tile.split_once('x').ok_or_else(malformed_tile)?;
        let mut rest = rest.split('+');
        let (Some(span_height), Some(origin_x), Some(origin_y), None) =
            (rest.next(), rest.next(), rest.next(), rest.next())
        else {
            return Err(malformed_tile());
        };

        Self::new(
            grid_width,
            grid_height,
            parse_int(span_width).ok_or_else(malformed_tile)?,
            parse_int(span_height).ok_or_else(malformed_tile)?,
            parse_int(origin_x).ok_or_else(malformed_tile)?,
            parse_int(origin_y).ok_or_else(malformed_tile)?,
        )
    }
}

fn parse_int(s: &str) -> Option<i64> {
    s.trim().parse().ok()
}

// ============================================================================
// Responses
// ============================================================================

/// First byte of every response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

impl Status {
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::Success => b'0',
            Self::Failure => b'1',
        }
    }
}

/// Global flag: the window is the active window
pub const FLAG_ACTIVE: char = 'a';
/// Global flag: the window is under the pointer
pub const FLAG_POINTER: char = 'p';
/// Global flag: the record describes the root window
pub const FLAG_ROOT: char = 'r';
/// State flag: fullscreen
pub const FLAG_FULLSCREEN: char = 'f';
/// State flag: always above
pub const FLAG_ABOVE: char = 't';
/// State flag: demands attention
pub const FLAG_URGENT: char = 'u';

/// One reported window
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowRecord {
    pub id: u32,
    pub global_flags: String,
    pub state_flags: String,
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
    pub instance: String,
    pub class: String,
    pub title: String,
}

impl fmt::Display for WindowRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "0x{:08x}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.id,
            self.global_flags,
            self.state_flags,
            self.width,
            self.height,
            self.x,
            self.y,
            single_field(&self.instance),
            single_field(&self.class),
            single_field(&self.title),
        )
    }
}

/// Keep free text from breaking the record layout
fn single_field(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

/// Line written to the status channel; `None` reports "no active window"
pub fn status_line(record: Option<&WindowRecord>) -> String {
    match record {
        Some(record) => format!("{}{}", STATUS_PREFIX, record),
        None => format!("{}\n", STATUS_PREFIX),
    }
}

/// Status byte followed by zero or more records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub records: Vec<WindowRecord>,
}

impl Response {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            records: Vec::new(),
        }
    }

    pub fn failure() -> Self {
        Self {
            status: Status::Failure,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: WindowRecord) {
        self.records.push(record);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![self.status.as_byte()];
        for record in &self.records {
            buf.extend_from_slice(record.to_string().as_bytes());
        }
        buf
    }
}
