//! The operation table maps operation names to pure integer handlers.
//!
//! A table is filled in with [`OperationTable::register`] and then handed to a
//! listener by value, after which it can only be read. Lookups ignore case.
//!
//! ```rust
//! use calc_rpc::{DispatchFault, OperationTable};
//!
//! let mut table = OperationTable::standard();
//! table
//!     .register("mod", "Modulo", |a, b| {
//!         a.checked_rem(b).ok_or(DispatchFault::DivisionByZero)
//!     })
//!     .unwrap();
//!
//! assert_eq!(table.dispatch("MOD", 7, 3), Ok(1));
//! assert_eq!(table.dispatch("pow", 2, 3), Err(DispatchFault::UnknownOperation));
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::errors::DispatchFault;
use crate::request::{is_identifier, Request};
use crate::response::Response;
use crate::server::Server;
use crate::Error;

/// handler signature, pure arithmetic over two operands
pub type Handler = Box<dyn Fn(i32, i32) -> Result<i32, DispatchFault> + Send + Sync>;

struct Entry {
    label: String,
    handler: Handler,
}

/// Registry of operation handlers.
#[derive(Default)]
pub struct OperationTable {
    entries: HashMap<String, Entry>,
}

impl fmt::Debug for OperationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("OperationTable")
            .field("operations", &names)
            .finish()
    }
}

impl OperationTable {
    /// create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// create a table with `add`, `sub`, `mul` and `div` registered
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.insert("add", "Addition", |a, b| Ok(a.wrapping_add(b)));
        table.insert("sub", "Subtraction", |a, b| Ok(a.wrapping_sub(b)));
        table.insert("mul", "Multiplication", |a, b| Ok(a.wrapping_mul(b)));
        table.insert("div", "Division", |a, b| {
            if b == 0 {
                return Err(DispatchFault::DivisionByZero);
            }
            Ok(a.wrapping_div(b))
        });
        table
    }

    /// register a handler under `name`
    ///
    /// `label` prefixes the result line sent back to clients. The name must be
    /// alphabetic and not yet registered, ignoring case.
    pub fn register<F>(&mut self, name: &str, label: &str, handler: F) -> Result<(), Error>
    where
        F: Fn(i32, i32) -> Result<i32, DispatchFault> + Send + Sync + 'static,
    {
        if !is_identifier(name) {
            return Err(Error::Registration(format!(
                "invalid operation name {name:?}"
            )));
        }
        if !is_identifier(label) {
            return Err(Error::Registration(format!("invalid label {label:?}")));
        }
        if self.entries.contains_key(&name.to_ascii_lowercase()) {
            return Err(Error::Registration(format!(
                "operation {name:?} already registered"
            )));
        }
        self.insert(name, label, handler);
        Ok(())
    }

    fn insert<F>(&mut self, name: &str, label: &str, handler: F)
    where
        F: Fn(i32, i32) -> Result<i32, DispatchFault> + Send + Sync + 'static,
    {
        let entry = Entry {
            label: label.to_owned(),
            handler: Box::new(handler),
        };
        self.entries.insert(name.to_ascii_lowercase(), entry);
    }

    fn lookup(&self, name: &str) -> Option<&Entry> {
        match self.entries.get(name) {
            Some(entry) => Some(entry),
            None => self.entries.get(&name.to_ascii_lowercase()),
        }
    }

    /// the result label for `name`, ignoring case
    pub fn label(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(|e| e.label.as_str())
    }

    /// run the handler registered under `name`
    pub fn dispatch(&self, name: &str, a: i32, b: i32) -> Result<i32, DispatchFault> {
        let entry = self.lookup(name).ok_or(DispatchFault::UnknownOperation)?;
        (entry.handler)(a, b)
    }
}

impl Server for OperationTable {
    fn service(&self, req: &Request) -> Response {
        let name = req.operation();
        match self.dispatch(name, req.operand_a(), req.operand_b()) {
            Ok(result) => Response::ok(self.label(name).unwrap_or(name), result),
            Err(fault) => Response::fault(fault),
        }
    }
}
