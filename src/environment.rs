//! Runtime scope chain.
//!
//! Each [`Environment`] is one frame: a name→value map plus an optional link
//! to the enclosing frame, fixed at construction and never reassigned.
//! Frames are shared through `Rc<RefCell<_>>` because any number of closures
//! may hold the same frame at once; a write through one handle is visible to
//! every other holder, which is exactly how closures observe later mutation
//! of captured variables.  A frame is reclaimed when the last closure or
//! active call drops its handle.

use crate::error::{LoxError, Result};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment<'a> {
    values: HashMap<String, Value<'a>>,
    enclosing: Option<Rc<RefCell<Environment<'a>>>>,
}

impl<'a> Environment<'a> {
    /// The outermost (global) frame.
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    /// A child frame whose lookups fall through to `enclosing`.
    pub fn with_enclosing(enclosing: Rc<RefCell<Environment<'a>>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Insert or overwrite `name` in *this* frame.
    pub fn define(&mut self, name: &str, value: Value<'a>) {
        self.values.insert(name.to_string(), value);
    }

    /// Dynamic lookup: this frame first, then the enclosing chain.
    pub fn get(&self, name: &str, line: usize) -> Result<Value<'a>> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(undefined_variable(name, line))
        }
    }

    /// Dynamic assignment: mutate the first frame along the chain that
    /// already holds `name`.  Assignment never declares.
    pub fn assign(&mut self, name: &str, value: Value<'a>, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(undefined_variable(name, line))
        }
    }

    /// Read `name` from the frame exactly `distance` hops up the chain,
    /// with no fallback search.  The resolver computed `distance`, so a
    /// miss here means the binding table and the chain disagree.
    pub fn get_at(&self, distance: usize, name: &str, line: usize) -> Result<Value<'a>> {
        if distance == 0 {
            return self
                .values
                .get(name)
                .cloned()
                .ok_or_else(|| undefined_variable(name, line));
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get_at(distance - 1, name, line),
            None => Err(undefined_variable(name, line)),
        }
    }

    /// Write `name` in the frame exactly `distance` hops up the chain.
    pub fn assign_at(
        &mut self,
        distance: usize,
        name: &str,
        value: Value<'a>,
        line: usize,
    ) -> Result<()> {
        if distance == 0 {
            self.values.insert(name.to_string(), value);
            return Ok(());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing
                .borrow_mut()
                .assign_at(distance - 1, name, value, line),
            None => Err(undefined_variable(name, line)),
        }
    }
}

impl<'a> Default for Environment<'a> {
    fn default() -> Self {
        Self::new()
    }
}

fn undefined_variable(name: &str, line: usize) -> LoxError {
    LoxError::runtime(line, format!("Undefined variable '{}'.", name))
}
