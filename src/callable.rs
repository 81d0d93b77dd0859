//! Function values: user‑declared functions (with closures) and the native
//! `clock` function.
//!
//! A `LoxFunction` does not own its code; it keeps a reference to the
//! declaration node in the AST plus a handle on the environment that was
//! active when the declaration executed.  That captured handle is what makes
//! the value a *closure*: calling the function always builds a fresh frame
//! whose parent is the captured environment, never the caller's, so the
//! function keeps seeing (and mutating) the variables of its defining scope
//! long after that scope's call frame is gone.

use crate::ast::FunctionDecl;
use crate::environment::Environment;
use crate::error::Result;
use crate::instance::LoxInstance;
use crate::interpreter::{Completion, Interpreter};
use crate::value::Value;
use chrono::Utc;
use log::debug;
use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

/// A user‑declared function or bound method.
pub struct LoxFunction<'a> {
    declaration: &'a FunctionDecl<'a>,
    closure: Rc<RefCell<Environment<'a>>>,

    /// `init` methods always yield the bound instance, whatever the body does.
    is_initializer: bool,
}

impl<'a> LoxFunction<'a> {
    pub fn new(
        declaration: &'a FunctionDecl<'a>,
        closure: Rc<RefCell<Environment<'a>>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &'a str {
        self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Execute the body.  The interpreter has already checked arity.
    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<'a, W>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        debug!("Calling <fn {}>", self.name());

        // A fresh frame parented to the *closure*, never the caller's
        // environment.  Re-entrant and recursive calls each get their own.
        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.borrow_mut().define(param.lexeme, argument);
        }

        let completion = interpreter.execute_block(&self.declaration.body, environment)?;

        if self.is_initializer {
            // The instance lives in the frame `bind` wrapped around the
            // closure, zero hops up from the body's parent.
            return self
                .closure
                .borrow()
                .get_at(0, "this", self.declaration.name.line);
        }

        match completion {
            Completion::Return(value) => Ok(value),
            Completion::Normal => Ok(Value::Nil),
        }
    }

    /// A copy of this function whose closure is wrapped in one extra frame
    /// defining `this`.  Method access (`obj.m`) and `super.m` both go
    /// through here.
    pub fn bind(&self, instance: LoxInstance<'a>) -> LoxFunction<'a> {
        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));

        environment
            .borrow_mut()
            .define("this", Value::Instance(instance));

        LoxFunction {
            declaration: self.declaration,
            closure: environment,
            is_initializer: self.is_initializer,
        }
    }
}

impl<'a> fmt::Debug for LoxFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Closures can reference environments that contain this function;
        // printing the chain would recurse, so show the header only.
        write!(f, "LoxFunction({})", self.name())
    }
}

impl<'a> fmt::Display for LoxFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// A host‑provided function exposed to Lox code.
#[derive(Clone)]
pub struct NativeFunction<'a> {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value<'a>]) -> std::result::Result<Value<'a>, String>,
}

impl<'a> fmt::Debug for NativeFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

impl<'a> fmt::Display for NativeFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

/// The sole native capability: wall‑clock seconds since the Unix epoch.
pub fn clock<'a>() -> NativeFunction<'a> {
    NativeFunction {
        name: "clock",
        arity: 0,
        func: |_args| {
            let seconds: f64 = Utc::now().timestamp_micros() as f64 / 1_000_000.0;

            Ok(Value::Number(seconds))
        },
    }
}
