//! calc_rpc is a small line-delimited RPC calculator service based on coroutines.
//!
//! The wire protocol is plain text. A call is three frames sent by the client,
//! each terminated by `'\n'`:
//!
//! ```text
//! add\n
//! 3\n
//! 4\n
//! ```
//!
//! and the server answers with exactly one frame, either a result line such as
//! `Addition = 7` or a fault line such as `Division by zero error`,
//! `Unknown operation` or `Malformed request`. A connection carries any number
//! of calls, one after another.
//!
//! the general communication procedure is as below
//! 1. client send the operation and operand frames to server
//! 2. server recv the three frames and parse them into a `Request`
//! 3. server dispatch the request through the `OperationTable`
//! 4. server send out the response line to client
//! 5. client recv the response line from server
//!
//! Every accepted connection runs in its own coroutine. Sessions share nothing
//! but the operation table, which is read only once the server starts.
//!
//! Example usage:
//!
//! ```rust,no_run
//! use calc_rpc::{CalcClient, OperationTable, TcpServer};
//!
//! let server = OperationTable::standard().start("127.0.0.1:3000").unwrap();
//! let mut client = CalcClient::connect(server.local_addr().unwrap()).unwrap();
//! let rsp = client.call("add", 3, 4).unwrap();
//! assert_eq!(rsp.to_string(), "Addition = 7");
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate log;

pub use client::CalcClient;
pub use config::{ClientConfig, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use errors::{DispatchFault, Error, Fault, ParseFault};
pub use ops::{Handler, OperationTable};
pub use request::Request;
pub use response::{Response, Status};
#[cfg(unix)]
pub use server::UdsServer;
pub use server::{Server, ServerInstance, TcpServer};
pub use stream_ext::StreamExt;

/// Provides the client session
mod client;
/// Provides server and client settings
mod config;
/// Provides a few different error types
mod errors;
/// line frame protocol
pub mod frame;
mod ops;
mod request;
mod response;
/// Provides server framework
mod server;
/// per connection request loop
mod session;
mod stream_ext;
