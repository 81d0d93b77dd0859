//! Instances: a class reference plus a mutable field map.
//!
//! `LoxInstance` is a clone‑cheap handle over shared state, so the same
//! instance stored in two variables stays one object: a field write through
//! either handle is visible through both, and equality is identity.

use crate::class::LoxClass;
use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub struct LoxInstance<'a> {
    data: Rc<RefCell<InstanceData<'a>>>,
}

struct InstanceData<'a> {
    class: Rc<LoxClass<'a>>,
    fields: HashMap<String, Value<'a>>,
}

impl<'a> LoxInstance<'a> {
    pub fn new(class: Rc<LoxClass<'a>>) -> Self {
        Self {
            data: Rc::new(RefCell::new(InstanceData {
                class,
                fields: HashMap::new(),
            })),
        }
    }

    /// Property read: a field shadows a method of the same name; a method is
    /// returned *bound* to this instance; anything else is an error.
    pub fn get(&self, name: &Token<'a>) -> Result<Value<'a>> {
        if let Some(field) = self.data.borrow().fields.get(name.lexeme) {
            return Ok(field.clone());
        }

        let class = self.data.borrow().class.clone();

        if let Some(method) = class.find_method(name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(self.clone()))));
        }

        Err(LoxError::runtime(
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Property write: always the field map; first write creates the field.
    pub fn set(&self, name: &str, value: Value<'a>) {
        self.data
            .borrow_mut()
            .fields
            .insert(name.to_string(), value);
    }

    /// Identity comparison (two handles on the same object).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    fn class_name(&self) -> &'a str {
        self.data.borrow().class.name()
    }
}

impl<'a> fmt::Debug for LoxInstance<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Fields may point back at this instance; show the class only.
        write!(f, "LoxInstance({})", self.class_name())
    }
}

impl<'a> fmt::Display for LoxInstance<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class_name())
    }
}
