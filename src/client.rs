use std::io::BufReader;
use std::net::ToSocketAddrs;
use std::time::Duration;

use bytes::BytesMut;
use may::net::TcpStream;

use crate::config::{resolve, ClientConfig};
use crate::frame;
use crate::request::Request;
use crate::response::Response;
use crate::stream_ext::{is_timeout, StreamExt};
use crate::Error;

/// Calculator client over one persistent connection.
///
/// Calls are strictly sequential: each one writes three frames and waits for
/// the single response frame. A transport fault leaves the stream in an
/// unknown position, so every later call returns [`Error::Closed`].
pub struct CalcClient<S: StreamExt = TcpStream> {
    // the connection
    stream: BufReader<S>,
    buf: Vec<u8>,
    broken: bool,
}

impl<S: StreamExt> std::fmt::Debug for CalcClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalcClient")
            .field("broken", &self.broken)
            .finish()
    }
}

impl CalcClient<TcpStream> {
    /// connect to the server address
    pub fn connect<L: ToSocketAddrs>(addr: L) -> Result<Self, Error> {
        let addrs = resolve(addr)?;
        let stream = TcpStream::connect(&addrs[..])?;
        stream.set_nodelay(true)?;
        info!("connected to {:?}", stream.peer_addr()?);
        Ok(CalcClient::new(stream))
    }

    /// connect with the given settings
    pub fn connect_with_config(config: &ClientConfig) -> Result<Self, Error> {
        let addrs = config.resolve()?;
        let mut client = Self::connect(&addrs[..])?;
        if let Some(timeout) = config.timeout {
            client.set_timeout(timeout)?;
        }
        Ok(client)
    }
}

impl<S: StreamExt> CalcClient<S> {
    /// wrap an already connected stream
    pub fn new(stream: S) -> Self {
        CalcClient {
            stream: BufReader::with_capacity(1024, stream),
            buf: Vec::with_capacity(128),
            broken: false,
        }
    }

    /// set how long a call waits for its response
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), Error> {
        self.stream.get_mut().set_read_timeout(Some(timeout))?;
        Ok(())
    }

    /// call `operation` with two integer operands
    ///
    /// the operation name is sent lowercase
    pub fn call(&mut self, operation: &str, a: i32, b: i32) -> Result<Response, Error> {
        self.call_raw(&operation.to_ascii_lowercase(), &a.to_string(), &b.to_string())
    }

    /// send an already parsed request and wait for the response
    pub fn call_request(&mut self, req: &Request) -> Result<Response, Error> {
        let mut buf = BytesMut::with_capacity(64);
        req.encode_into(&mut buf)?;
        self.send(&buf)
    }

    /// send the three fields as they are and wait for the response
    ///
    /// the server answers malformed fields with a fault response, not an error
    pub fn call_raw(&mut self, operation: &str, a: &str, b: &str) -> Result<Response, Error> {
        // encode the request, nothing is sent if a field can't be framed
        let mut buf = BytesMut::with_capacity(64);
        frame::encode_into(&mut buf, operation)?;
        frame::encode_into(&mut buf, a)?;
        frame::encode_into(&mut buf, b)?;
        self.send(&buf)
    }

    fn send(&mut self, req: &[u8]) -> Result<Response, Error> {
        if self.broken {
            return Err(Error::Closed);
        }
        let ret = self.round_trip(req);
        if ret.is_err() {
            self.broken = true;
        }
        ret
    }

    fn round_trip(&mut self, req: &[u8]) -> Result<Response, Error> {
        let ws = self.stream.get_mut();
        ws.write_all(req)?;
        ws.flush()?;

        match frame::decode_from(&mut self.stream, &mut self.buf) {
            Ok(Some(line)) => {
                debug!("get response: {line:?}");
                Ok(Response::decode(line))
            }
            Ok(None) => Err(Error::UnexpectedEof),
            Err(ref e) if is_timeout(e) => Err(Error::Timeout),
            Err(e) => Err(e.into()),
        }
    }
}
