//! Chain of lexical scopes mapping names to runtime values.
//!
//! Each environment holds its own bindings plus an optional shared link to
//! the enclosing scope (`Rc<RefCell<_>>`: an environment stays alive as
//! long as the longest-lived closure or active call frame referencing it).
//! Lookup and assignment walk outward through enclosing links; `define`
//! always targets the innermost scope. A name that resolves nowhere in the
//! chain is a runtime error, never a default value.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::value::Value;

#[derive(Debug, Default)]
pub struct Environment<'a> {
    values: HashMap<&'a str, Value<'a>>,
    enclosing: Option<Rc<RefCell<Environment<'a>>>>,
}

impl<'a> Environment<'a> {
    /// A root scope with no enclosing environment (the globals).
    pub fn new() -> Self {
        Self::default()
    }

    /// A child scope chained to `enclosing`.
    pub fn with_enclosing(enclosing: Rc<RefCell<Environment<'a>>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind `name` in this scope. Redefinition is allowed; the new binding
    /// replaces the old one.
    pub fn define(&mut self, name: &'a str, value: Value<'a>) {
        self.values.insert(name, value);
    }

    /// Read `name`, searching this scope and then outward. `line` is only
    /// used for the error report.
    pub fn get(&self, name: &str, line: usize) -> Result<Value<'a>> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Overwrite the nearest existing binding of `name`. Assigning to a
    /// name with no binding anywhere in the chain is an error; assignment
    /// never creates a variable.
    pub fn assign(&mut self, name: &'a str, value: Value<'a>, line: usize) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }
}
