use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::Error;

/// the port the calculator service listens on unless told otherwise
pub const DEFAULT_PORT: u16 = 3000;

/// the host used by both sides unless told otherwise
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// interface to bind
    pub host: String,
    /// port to bind, `0` picks an ephemeral port
    pub port: u16,
    /// close a session after it waits this long for a request frame
    pub idle_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            idle_timeout: None,
        }
    }
}

impl ServerConfig {
    /// resolve the configured host and port
    pub fn resolve(&self) -> Result<Vec<SocketAddr>, Error> {
        resolve((self.host.as_str(), self.port))
    }
}

/// Client connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// server host
    pub host: String,
    /// server port
    pub port: u16,
    /// how long a call waits for its response
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// resolve the configured host and port
    pub fn resolve(&self) -> Result<Vec<SocketAddr>, Error> {
        resolve((self.host.as_str(), self.port))
    }
}

/// resolve an address, an empty result is an error
pub(crate) fn resolve<L: ToSocketAddrs>(addr: L) -> Result<Vec<SocketAddr>, Error> {
    let addrs: Vec<_> = addr
        .to_socket_addrs()
        .map_err(|e| Error::Resolve(e.to_string()))?
        .collect();
    if addrs.is_empty() {
        return Err(Error::Resolve("no addresses found".to_owned()));
    }
    Ok(addrs)
}
