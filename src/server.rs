use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
#[cfg(unix)]
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use crate::config::{resolve, ServerConfig};
use crate::request::Request;
use crate::response::Response;
use crate::session::Session;
use crate::stream_ext::StreamExt;
use crate::Error;

use co_managed::Manager;
use may::net::TcpListener;
#[cfg(unix)]
use may::os::unix::net::UnixListener;
use may::sync::{Mutex, MutexGuard};
use may::{coroutine, go};

macro_rules! t {
    ($e: expr) => {
        match $e {
            Ok(val) => val,
            Err(err) => {
                error!("call = {:?}\nerr = {:?}", stringify!($e), err);
                continue;
            }
        }
    };
}

/// must impl this trait for your server
pub trait Server: Send + Sync + Sized + 'static {
    /// answer one well formed request
    ///
    /// runs inside the session's coroutine, so it must not block for long;
    /// application faults are returned as a fault `Response`
    fn service(&self, req: &Request) -> Response;
}

type Closer = Box<dyn Fn() -> io::Result<()> + Send>;

/// the streams of the sessions that are still running
///
/// only the listener and the stop path touch it, sessions just leave it when
/// they end
#[derive(Default)]
struct LiveSessions {
    stopping: bool,
    next_id: u64,
    closers: HashMap<u64, Closer>,
}

type SessionRegistry = Arc<Mutex<LiveSessions>>;

fn lock(registry: &SessionRegistry) -> MutexGuard<'_, LiveSessions> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// removes its session from the registry when the session ends
struct SessionGuard {
    registry: SessionRegistry,
    id: u64,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        lock(&self.registry).closers.remove(&self.id);
    }
}

/// record a clone of the accepted stream so a stop can close it
///
/// returns `Ok(None)` once the server is stopping, the stream is dropped then
fn register<S: StreamExt>(
    registry: &SessionRegistry,
    stream: &S,
) -> io::Result<Option<SessionGuard>> {
    let closer = stream.try_clone()?;
    let mut live = lock(registry);
    if live.stopping {
        return Ok(None);
    }
    let id = live.next_id;
    live.next_id = live.next_id.wrapping_add(1);
    live.closers.insert(id, Box::new(move || closer.shutdown()));
    Ok(Some(SessionGuard {
        registry: registry.clone(),
        id,
    }))
}

/// service instance
///
/// dropping the instance stops the listener and every session it spawned
pub struct ServerInstance {
    handle: Option<coroutine::JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
    sessions: SessionRegistry,
}

impl ServerInstance {
    /// the bound address of a tcp listener
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// join the service, this would wait until the service is stopped
    pub fn join(mut self) -> std::thread::Result<()> {
        if let Some(handle) = self.handle.take() {
            handle.join()
        } else {
            Ok(())
        }
    }

    // a session blocked on a read only wakes up when its stream is shut down
    fn close_sessions(&self) {
        let mut live = lock(&self.sessions);
        live.stopping = true;
        for (id, close) in live.closers.drain() {
            if let Err(e) = close() {
                warn!("failed to close session {id}: err = {:?}", e);
            }
        }
    }
}

impl Drop for ServerInstance {
    fn drop(&mut self) {
        if let Some(s) = self.handle.take() {
            self.close_sessions();
            unsafe { s.coroutine().cancel() };
            s.join().ok();
            info!("server stopped");
        }
    }
}

fn serve_connection<S: StreamExt, T: Server>(
    stream: S,
    peer: String,
    server: &T,
    idle_timeout: Option<Duration>,
    _guard: SessionGuard,
) {
    match Session::new(stream, peer.clone(), idle_timeout) {
        Ok(session) => session.run(server),
        Err(e) => error!("{peer}: failed to set up session: err = {:?}", e),
    }
}

/// Provides a function for starting the tcp service.
pub trait TcpServer: Server {
    /// Spawns the service, binding to the given address
    /// sessions never time out
    fn start<L: ToSocketAddrs>(self, addr: L) -> Result<ServerInstance, Error> {
        let addrs = resolve(addr)?;
        listen_tcp(self, &addrs, None)
    }

    /// Spawns the service with the given settings
    fn start_with_config(self, config: &ServerConfig) -> Result<ServerInstance, Error> {
        let addrs = config.resolve()?;
        listen_tcp(self, &addrs, config.idle_timeout)
    }
}

#[cfg(unix)]
fn into_may_listener(listener: std::net::TcpListener) -> TcpListener {
    use std::os::unix::io::{FromRawFd, IntoRawFd};
    unsafe { TcpListener::from_raw_fd(listener.into_raw_fd()) }
}

#[cfg(windows)]
fn into_may_listener(listener: std::net::TcpListener) -> TcpListener {
    use std::os::windows::io::{FromRawSocket, IntoRawSocket};
    unsafe { TcpListener::from_raw_socket(listener.into_raw_socket()) }
}

fn listen_tcp<T: Server>(
    server: T,
    addrs: &[SocketAddr],
    idle_timeout: Option<Duration>,
) -> Result<ServerInstance, Error> {
    // may's own bind turns on port reuse, which would hide a port in use
    let listener = std::net::TcpListener::bind(addrs).map_err(|source| Error::Bind {
        addr: format!("{addrs:?}"),
        source,
    })?;
    let listener = into_may_listener(listener);
    let local_addr = listener.local_addr()?;
    info!("server started at {local_addr}");

    let sessions = SessionRegistry::new(Mutex::new(LiveSessions::default()));
    let registry = sessions.clone();
    let instance = go!(
        coroutine::Builder::new().name("CalcTcpServer".to_owned()),
        move || {
            let server = Arc::new(server);
            let manager = Manager::new();
            for stream in listener.incoming() {
                let stream = t!(stream);
                t!(stream.set_nodelay(true));
                let peer = match stream.peer_addr() {
                    Ok(addr) => addr.to_string(),
                    Err(_) => "unknown peer".to_owned(),
                };
                let Some(guard) = t!(register(&registry, &stream)) else {
                    info!("server stopping, dropping connection from {peer}");
                    continue;
                };
                info!("accepted connection from {peer}");
                let server = server.clone();
                manager.add(move || serve_connection(stream, peer, &*server, idle_timeout, guard));
            }
        }
    )?;
    Ok(ServerInstance {
        handle: Some(instance),
        local_addr: Some(local_addr),
        sessions,
    })
}

/// Provides a function for starting the unix domain socket service.
#[cfg(unix)]
pub trait UdsServer: Server {
    /// Spawns the service, binding to the given path
    /// the socket file is removed before binding and when the service stops
    fn start<P: AsRef<Path>>(self, path: P) -> Result<ServerInstance, Error> {
        struct AutoDrop(UnixListener, PathBuf);
        impl Drop for AutoDrop {
            fn drop(&mut self) {
                std::fs::remove_file(&self.1).ok();
            }
        }

        let path = path.as_ref();
        std::fs::remove_file(path).ok();
        let listener = UnixListener::bind(path).map_err(|source| Error::Bind {
            addr: path.display().to_string(),
            source,
        })?;
        let listener = AutoDrop(listener, path.to_owned());
        info!("server started at {}", path.display());

        let sessions = SessionRegistry::new(Mutex::new(LiveSessions::default()));
        let registry = sessions.clone();
        let instance = go!(
            coroutine::Builder::new().name("CalcUdsServer".to_owned()),
            move || {
                let server = Arc::new(self);
                let manager = Manager::new();
                let mut id = 0u64;
                for stream in listener.0.incoming() {
                    let stream = t!(stream);
                    id = id.wrapping_add(1);
                    let peer = format!("uds#{id}");
                    let Some(guard) = t!(register(&registry, &stream)) else {
                        info!("server stopping, dropping connection {peer}");
                        continue;
                    };
                    info!("accepted connection {peer}");
                    let server = server.clone();
                    manager.add(move || serve_connection(stream, peer, &*server, None, guard));
                }
            }
        )?;
        Ok(ServerInstance {
            handle: Some(instance),
            local_addr: None,
            sessions,
        })
    }
}

impl<T: Server> TcpServer for T {}
#[cfg(unix)]
impl<T: Server> UdsServer for T {}
