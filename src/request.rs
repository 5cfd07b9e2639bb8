use crate::errors::ParseFault;
use crate::frame;
use crate::Error;

use bytes::BytesMut;

/// One parsed invocation: an operation name and two operands.
///
/// The operation is stored lowercase; a `Request` can't be changed after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    operation: String,
    operand_a: i32,
    operand_b: i32,
}

impl Request {
    /// build a request from the three raw frames read off the wire
    pub fn parse(raw_operation: &str, raw_a: &str, raw_b: &str) -> Result<Self, ParseFault> {
        if !is_identifier(raw_operation) {
            return Err(ParseFault::BadOperationSyntax);
        }
        let operand_a = parse_operand(raw_a)?;
        let operand_b = parse_operand(raw_b)?;

        Ok(Request {
            operation: raw_operation.to_ascii_lowercase(),
            operand_a,
            operand_b,
        })
    }

    /// the lowercase operation name
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// the first operand
    pub fn operand_a(&self) -> i32 {
        self.operand_a
    }

    /// the second operand
    pub fn operand_b(&self) -> i32 {
        self.operand_b
    }

    /// append the three request frames to the buffer
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<(), Error> {
        frame::encode_into(buf, &self.operation)?;
        frame::encode_into(buf, &self.operand_a.to_string())?;
        frame::encode_into(buf, &self.operand_b.to_string())
    }
}

/// non-empty and ascii alphabetic, checked case-insensitively
pub(crate) fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphabetic())
}

fn parse_operand(raw: &str) -> Result<i32, ParseFault> {
    raw.parse().map_err(|_| ParseFault::BadOperandSyntax)
}
