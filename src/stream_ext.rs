use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::time::Duration;

/// Stream Extension
pub trait StreamExt: Sized + Read + Write + Send + 'static {
    /// try clone the stream
    fn try_clone(&self) -> io::Result<Self>;
    /// set read timeout, `None` blocks forever
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
    /// shut down both directions, wakes up any blocked reader of a clone
    fn shutdown(&self) -> io::Result<()>;
}

macro_rules! impl_stream_ext {
    ($name: ty) => {
        impl StreamExt for $name {
            fn try_clone(&self) -> io::Result<Self> {
                (*self).try_clone()
            }
            fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
                (*self).set_read_timeout(timeout)
            }
            fn shutdown(&self) -> io::Result<()> {
                (*self).shutdown(Shutdown::Both)
            }
        }
    };
}

impl_stream_ext!(may::net::TcpStream);
#[cfg(unix)]
impl_stream_ext!(may::os::unix::net::UnixStream);

/// read errors produced by an expired read timeout
pub(crate) fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
