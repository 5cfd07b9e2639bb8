use crate::errors::Fault;
use crate::frame;
use crate::request::is_identifier;
use crate::Error;

use bytes::Bytes;

/// response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// the call produced a result
    Ok,
    /// the call produced a fault line
    Fault,
}

/// The single line answer to a request.
///
/// On the wire a result reads `"<Label> = <result>"`. Any other line is a fault,
/// and clients keep its text as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// a computed result
    Ok {
        /// human readable operation label, e.g. `Addition`
        label: String,
        /// the computed value
        result: i32,
    },
    /// a fault reported by the server
    Fault {
        /// the fault line as sent by the server
        reason: String,
    },
}

impl Response {
    /// a successful result
    pub fn ok(label: impl Into<String>, result: i32) -> Self {
        Response::Ok {
            label: label.into(),
            result,
        }
    }

    /// a fault response carrying the fault's wire text
    pub fn fault(fault: impl Into<Fault>) -> Self {
        Response::Fault {
            reason: fault.into().to_string(),
        }
    }

    /// the response status
    pub fn status(&self) -> Status {
        match self {
            Response::Ok { .. } => Status::Ok,
            Response::Fault { .. } => Status::Fault,
        }
    }

    /// the result, if any
    pub fn result(&self) -> Option<i32> {
        match self {
            Response::Ok { result, .. } => Some(*result),
            Response::Fault { .. } => None,
        }
    }

    /// the fault line, if any
    pub fn fault_reason(&self) -> Option<&str> {
        match self {
            Response::Ok { .. } => None,
            Response::Fault { reason } => Some(reason),
        }
    }

    /// encode the response into one frame
    pub fn encode(&self) -> Result<Bytes, Error> {
        frame::encode(&self.to_string())
    }

    /// classify a response line received from the server
    pub fn decode(line: String) -> Self {
        if let Some((label, value)) = line.split_once(" = ") {
            if is_identifier(label) {
                if let Ok(result) = value.parse() {
                    return Response::ok(label, result);
                }
            }
        }
        Response::Fault { reason: line }
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Response::Ok { label, result } => write!(f, "{label} = {result}"),
            Response::Fault { reason } => f.write_str(reason),
        }
    }
}
