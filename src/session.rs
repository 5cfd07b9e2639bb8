//! Per connection request loop.
//!
//! A session reads the three request frames, answers with one response frame
//! and starts over. Parse and dispatch faults are answered on the wire and the
//! loop goes on; only end of stream, an idle timeout or an IO error stop it.

use std::io::{self, BufReader};
use std::time::Duration;

use crate::frame;
use crate::request::Request;
use crate::response::Response;
use crate::server::Server;
use crate::stream_ext::{is_timeout, StreamExt};
use crate::Error;

#[derive(Debug)]
enum State {
    AwaitOperation,
    AwaitOperandA { operation: String },
    AwaitOperandB { operation: String, operand_a: String },
    Closed,
}

pub(crate) struct Session<S: StreamExt> {
    peer: String,
    // the read half of the stream
    rs: BufReader<S>,
    // the write half of the stream
    ws: S,
    buf: Vec<u8>,
}

impl<S: StreamExt> Session<S> {
    pub(crate) fn new(stream: S, peer: String, idle_timeout: Option<Duration>) -> io::Result<Self> {
        let mut rs = stream.try_clone()?;
        rs.set_read_timeout(idle_timeout)?;
        Ok(Session {
            peer,
            rs: BufReader::new(rs),
            ws: stream,
            buf: Vec::with_capacity(128),
        })
    }

    /// serve requests until the connection closes
    pub(crate) fn run<T: Server>(mut self, server: &T) {
        let mut state = State::AwaitOperation;
        loop {
            state = match self.step(state, server) {
                Ok(State::Closed) => {
                    info!("{}: connection closed", self.peer);
                    return;
                }
                Ok(next) => next,
                Err(Error::Io(ref e)) if is_timeout(e) => {
                    info!("{}: idle timeout, closing connection", self.peer);
                    return;
                }
                Err(e) => {
                    error!("{}: session aborted: err = {:?}", self.peer, e);
                    return;
                }
            };
        }
    }

    fn step<T: Server>(&mut self, state: State, server: &T) -> Result<State, Error> {
        let field = match frame::decode_from(&mut self.rs, &mut self.buf)? {
            Some(field) => field,
            None => {
                if !matches!(state, State::AwaitOperation) {
                    info!("{}: stream ended mid request, state = {:?}", self.peer, state);
                }
                return Ok(State::Closed);
            }
        };

        let next = match state {
            State::AwaitOperation => State::AwaitOperandA { operation: field },
            State::AwaitOperandA { operation } => State::AwaitOperandB {
                operation,
                operand_a: field,
            },
            State::AwaitOperandB {
                operation,
                operand_a,
            } => {
                let rsp = self.dispatch(server, &operation, &operand_a, &field);
                self.respond(&rsp)?;
                State::AwaitOperation
            }
            State::Closed => State::Closed,
        };
        Ok(next)
    }

    fn dispatch<T: Server>(&self, server: &T, operation: &str, a: &str, b: &str) -> Response {
        debug!("{}: operation={operation:?} a={a:?} b={b:?}", self.peer);
        match Request::parse(operation, a, b) {
            Ok(req) => server.service(&req),
            Err(fault) => {
                warn!("{}: malformed request: {:?}", self.peer, fault);
                Response::fault(fault)
            }
        }
    }

    fn respond(&mut self, rsp: &Response) -> Result<(), Error> {
        let data = rsp.encode()?;
        debug!("{}: send rsp: {}", self.peer, rsp);
        self.ws.write_all(&data)?;
        self.ws.flush()?;
        Ok(())
    }
}
