//! Class values.
//!
//! A `LoxClass` is immutable after its declaration executes: name, optional
//! superclass link, and a frozen method table.  Method lookup walks the
//! superclass chain; instantiation is just "calling" the class value.

use crate::callable::LoxFunction;
use crate::error::Result;
use crate::instance::LoxInstance;
use crate::interpreter::Interpreter;
use crate::value::Value;
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

#[derive(Debug)]
pub struct LoxClass<'a> {
    name: &'a str,
    superclass: Option<Rc<LoxClass<'a>>>,
    methods: HashMap<String, Rc<LoxFunction<'a>>>,
}

impl<'a> LoxClass<'a> {
    pub fn new(
        name: &'a str,
        superclass: Option<Rc<LoxClass<'a>>>,
        methods: HashMap<String, Rc<LoxFunction<'a>>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Own table first, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction<'a>>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// Calling a class takes as many arguments as its initializer.
    pub fn arity(&self) -> usize {
        self.find_method("init")
            .map_or(0, |initializer| initializer.arity())
    }

    /// `Class(args…)`: create the instance, run `init` bound to it (its
    /// result is discarded), hand the instance back.
    pub fn instantiate<W: Write>(
        class: &Rc<LoxClass<'a>>,
        interpreter: &mut Interpreter<'a, W>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        debug!("Instantiating class '{}'", class.name);

        let instance = LoxInstance::new(class.clone());

        if let Some(initializer) = class.find_method("init") {
            initializer
                .bind(instance.clone())
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl<'a> fmt::Display for LoxClass<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
