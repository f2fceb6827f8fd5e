//! Event loop
//!
//! Blocks on two sources at once: the X connection and the command socket.
//! Display events are drained in full on every wake; at most one command
//! connection is accepted, read to the end and answered before the loop
//! looks at the display again. A slow client therefore stalls event
//! processing until it finishes writing.

use anyhow::{Context, Result};
use gridwm_ipc::{Request, RequestBuffer};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::io::Write;
use std::os::fd::AsFd;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::wm::x11::X11Display;
use crate::wm::{Exit, WindowManager};

static TERMINATE: AtomicBool = AtomicBool::new(false);

extern "C" fn on_terminate(_: libc::c_int) {
    TERMINATE.store(true, Ordering::SeqCst);
}

/// SIGINT and SIGTERM stop the loop the same way the `quit` verb does.
///
/// No `SA_RESTART`: a signal arriving while blocked in poll wakes it with
/// EINTR so the flag is seen right away.
fn install_signal_handlers() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_terminate),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only stores to an atomic
        unsafe { sigaction(signal, &action) }
            .with_context(|| format!("Failed to install {} handler", signal))?;
    }
    Ok(())
}

/// Command socket, unlinked again when dropped
struct CommandSocket {
    listener: UnixListener,
    path: PathBuf,
}

impl CommandSocket {
    fn bind(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Removing stale socket {:?}", path);
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove stale socket {:?}", path))?;
        }
        let listener = UnixListener::bind(path)
            .with_context(|| format!("Failed to bind command socket {:?}", path))?;
        info!("Listening for commands on {:?}", path);
        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for CommandSocket {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove socket {:?}: {}", self.path, e);
        }
    }
}

/// Run until a quit or restart is requested, then release the display
pub fn run(mut wm: WindowManager<'_, X11Display>) -> Result<Exit> {
    let socket = CommandSocket::bind(&gridwm_ipc::socket_path(&X11Display::display_name()))?;
    install_signal_handlers()?;
    wm.adopt_existing()?;
    let screen = wm.screen();
    info!("Managing a {}x{} screen", screen.width, screen.height);

    let mut buffer = RequestBuffer::new();
    let exit = loop {
        if let Some(exit) = wm.exit_requested() {
            break exit;
        }
        if TERMINATE.load(Ordering::SeqCst) {
            info!("Terminated by signal");
            break Exit::Quit;
        }

        // Replies read while handling the last batch may have queued events
        // that will never make the socket readable again
        drain_events(&mut wm)?;

        let (display_ready, command_ready) = {
            let mut fds = [
                PollFd::new(wm.display().as_fd(), PollFlags::POLLIN),
                PollFd::new(socket.listener.as_fd(), PollFlags::POLLIN),
            ];
            match poll(&mut fds, PollTimeout::NONE) {
                Ok(_) => {}
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e).context("poll failed"),
            }
            let ready = |fd: &PollFd| {
                fd.revents()
                    .is_some_and(|r| r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP))
            };
            (ready(&fds[0]), ready(&fds[1]))
        };

        if display_ready {
            drain_events(&mut wm)?;
        }
        if command_ready {
            match socket.listener.accept() {
                Ok((stream, _)) => serve(&mut wm, stream, &mut buffer)?,
                Err(e) => warn!("Failed to accept command connection: {}", e),
            }
        }
    };

    wm.display_mut().shutdown()?;
    drop(socket);
    Ok(exit)
}

fn drain_events(wm: &mut WindowManager<'_, X11Display>) -> Result<()> {
    while let Some(event) = wm.display().poll_event()? {
        wm.handle_event(event)?;
    }
    Ok(())
}

/// Read one request from `stream`, dispatch it and write the response
fn serve(
    wm: &mut WindowManager<'_, X11Display>,
    mut stream: UnixStream,
    buffer: &mut RequestBuffer,
) -> Result<()> {
    let data = match buffer.read_from(&mut stream) {
        Ok(data) => data,
        Err(e) => {
            warn!("Failed to read command: {}", e);
            return Ok(());
        }
    };
    if data.is_empty() {
        debug!("Empty command connection");
        return Ok(());
    }

    let request = Request::parse(data);
    let response = wm.handle_command(&request.args)?;
    if let Err(e) = stream.write_all(&response.encode()) {
        warn!("Failed to send response: {}", e);
    }
    Ok(())
}
