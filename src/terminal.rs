//! Masked input for password prompts.

#[cfg(unix)]
use std::os::raw::c_int;

use tracing::debug;

/// Disables terminal echo on stdin until dropped. A no-op when stdin is not a
/// terminal.
#[derive(Debug)]
pub struct EchoGuard {
    #[cfg(unix)]
    original: Option<libc::termios>,
}

impl EchoGuard {
    #[cfg(unix)]
    pub fn disable() -> Self {
        let fd = libc::STDIN_FILENO;
        if unsafe { libc::isatty(fd) } != 1 {
            return Self { original: None };
        }
        let original = match get_termios(fd) {
            Ok(original) => original,
            Err(error) => {
                debug!(%error, "could not read terminal attributes");
                return Self { original: None };
            }
        };
        let mut masked = original;
        masked.c_lflag &= !libc::ECHO;
        masked.c_lflag |= libc::ECHONL;
        if let Err(error) = set_termios(fd, &masked) {
            debug!(%error, "could not disable terminal echo");
            return Self { original: None };
        }
        Self {
            original: Some(original),
        }
    }

    #[cfg(not(unix))]
    pub fn disable() -> Self {
        debug!("terminal echo control is unavailable on this platform");
        Self {}
    }

    /// Whether echo was actually turned off.
    pub fn is_active(&self) -> bool {
        #[cfg(unix)]
        {
            self.original.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(original) = self.original.take() {
            if let Err(error) = set_termios(libc::STDIN_FILENO, &original) {
                debug!(%error, "could not restore terminal echo");
            }
        }
    }
}

#[cfg(unix)]
fn get_termios(fd: c_int) -> std::io::Result<libc::termios> {
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    let result = unsafe { libc::tcgetattr(fd, &mut termios) };
    if result != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(termios)
}

#[cfg(unix)]
fn set_termios(fd: c_int, termios: &libc::termios) -> std::io::Result<()> {
    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) };
    if result != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
