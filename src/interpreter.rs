//! Tree‑walking evaluator.
//!
//! Executes the AST directly, one statement at a time, over the chained
//! environment model.  Three pieces of state drive evaluation:
//!
//! - `globals`: the outermost frame, seeded with the native `clock` at
//!   construction.  Variable references the resolver left out of its table
//!   are looked up (and assigned) *here*, directly.
//! - `environment`: the currently active frame.  Blocks and calls swap a
//!   child frame in and always restore the previous one, whether the block
//!   ran to completion, returned early, or failed.
//! - `locals`: the resolver's binding table.  An entry maps a
//!   variable‑reference node to a hop count for `get_at`/`assign_at`.  The
//!   lookup is an `Option`: `Some(0)` means the innermost frame and only
//!   `None` means global — the two must never be conflated.
//!
//! Statement execution yields a [`Completion`]: either the statement ran to
//! completion or a `return` is in flight carrying its value.  `Completion`
//! values propagate up through blocks and loops as ordinary returns; only
//! the nearest function‑call frame stops one.  Runtime errors travel the
//! `Result` error channel instead and unwind the whole run.
//!
//! Output from `print` goes to the interpreter's sink (`stdout` by default,
//! any `Write` in tests), making program output part of the observable API.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::callable::{self, LoxFunction};
use crate::class::LoxClass;
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::resolver::Bindings;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished: fell through, or a `return` is unwinding.
#[derive(Debug)]
pub enum Completion<'a> {
    Normal,
    Return(Value<'a>),
}

pub struct Interpreter<'a, W: Write = io::Stdout> {
    globals: Rc<RefCell<Environment<'a>>>,
    environment: Rc<RefCell<Environment<'a>>>,
    locals: Bindings,
    out: W,
}

impl<'a> Interpreter<'a> {
    /// An interpreter printing to standard output.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl<'a> Default for Interpreter<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, W: Write> Interpreter<'a, W> {
    /// An interpreter printing to `out`.  Tests pass a `Vec<u8>` here and
    /// read it back with [`into_output`](Self::into_output).
    pub fn with_output(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals
            .borrow_mut()
            .define("clock", Value::NativeFunction(callable::clock()));

        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Install the resolver's binding table before running a program.
    pub fn set_bindings(&mut self, bindings: Bindings) {
        self.locals = bindings;
    }

    /// Reclaim the output sink.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Run a whole program.  The first runtime error aborts the remaining
    /// statements and is handed back to the driver.
    pub fn interpret(&mut self, statements: &'a [Stmt<'a>]) -> Result<()> {
        debug!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            // The resolver rejects top-level 'return'; a stray one simply
            // ends the program.
            if let Completion::Return(_) = self.execute(stmt)? {
                break;
            }
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ───────────────────────── statement execution ─────────────────────────

    pub fn execute(&mut self, stmt: &'a Stmt<'a>) -> Result<Completion<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(Completion::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;

                writeln!(self.out, "{}", value)?;

                Ok(Completion::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}'", name.lexeme);

                self.environment.borrow_mut().define(name.lexeme, value);

                Ok(Completion::Normal)
            }

            Stmt::Block(statements) => {
                let child = Rc::new(RefCell::new(Environment::with_enclosing(
                    self.environment.clone(),
                )));

                self.execute_block(statements, child)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Completion::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    match self.execute(body)? {
                        Completion::Normal => {}

                        // A return inside the loop body keeps unwinding.
                        returning => return Ok(returning),
                    }
                }

                Ok(Completion::Normal)
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                // The current environment is the closure.
                let function = LoxFunction::new(decl, self.environment.clone(), false);

                self.environment
                    .borrow_mut()
                    .define(decl.name.lexeme, Value::Function(Rc::new(function)));

                Ok(Completion::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);

                Ok(Completion::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Run `statements` inside `environment`, restoring the previous frame
    /// on **every** exit path: normal completion, an in‑flight return, or a
    /// propagating runtime error.
    pub fn execute_block(
        &mut self,
        statements: &'a [Stmt<'a>],
        environment: Rc<RefCell<Environment<'a>>>,
    ) -> Result<Completion<'a>> {
        debug!("Entering block with {} statement(s)", statements.len());

        let previous = std::mem::replace(&mut self.environment, environment);

        let mut outcome = Ok(Completion::Normal);

        for statement in statements {
            match self.execute(statement) {
                Ok(Completion::Normal) => continue,

                other => {
                    outcome = other;
                    break;
                }
            }
        }

        self.environment = previous;

        debug!("Exited block");

        outcome
    }

    fn execute_class(
        &mut self,
        name: &'a Token<'a>,
        superclass: Option<&'a Expr<'a>>,
        methods: &'a [FunctionDecl<'a>],
    ) -> Result<Completion<'a>> {
        let superclass_value: Option<Rc<LoxClass<'a>>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),

                _ => {
                    return Err(LoxError::runtime(name.line, "Superclass must be a class."));
                }
            },

            None => None,
        };

        // Two-step binding (define nil, assign the finished class) so the
        // class name is in scope while its body is being evaluated.
        self.environment.borrow_mut().define(name.lexeme, Value::Nil);

        // With a superclass, every method closes over one extra frame that
        // holds 'super'.
        let method_closure = match &superclass_value {
            Some(superclass) => {
                let env = Rc::new(RefCell::new(Environment::with_enclosing(
                    self.environment.clone(),
                )));

                env.borrow_mut()
                    .define("super", Value::Class(superclass.clone()));

                env
            }

            None => self.environment.clone(),
        };

        let mut method_table: HashMap<String, Rc<LoxFunction<'a>>> = HashMap::new();

        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function = LoxFunction::new(method, method_closure.clone(), is_initializer);

            method_table.insert(method.name.lexeme.to_string(), Rc::new(function));
        }

        let class = LoxClass::new(name.lexeme, superclass_value, method_table);

        debug!("Class '{}' declared", name.lexeme);

        self.environment
            .borrow_mut()
            .assign(name.lexeme, Value::Class(Rc::new(class)), name.line)?;

        Ok(Completion::Normal)
    }

    // ───────────────────────── expression evaluation ────────────────────────

    pub fn evaluate(&mut self, expr: &'a Expr<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                // Some(0) targets the innermost frame; only a *missing*
                // entry routes the assignment to the globals.
                match self.locals.get(id).copied() {
                    Some(distance) => self.environment.borrow_mut().assign_at(
                        distance,
                        name.lexeme,
                        value.clone(),
                        name.line,
                    )?,

                    None => self.globals.borrow_mut().assign(
                        name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value = self.evaluate(callee)?;

                // Arguments evaluate left-to-right, before dispatch.
                let mut argument_values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    argument_values.push(self.evaluate(argument)?);
                }

                self.invoke(callee_value, paren, argument_values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(name),

                _ => Err(LoxError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;

                let Value::Instance(instance) = object else {
                    return Err(LoxError::runtime(name.line, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;

                instance.set(name.lexeme, value.clone());

                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &'a Token<'a>, right: &'a Expr<'a>) -> Result<Value<'a>> {
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LoxError::runtime(operator.line, "Operand must be a number.")),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_value))),

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.")),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &'a Expr<'a>,
        operator: &'a Token<'a>,
        right: &'a Expr<'a>,
    ) -> Result<Value<'a>> {
        let left_value = self.evaluate(left)?;
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                _ => Err(numbers_required(operator)),
            },

            TokenType::STAR => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                _ => Err(numbers_required(operator)),
            },

            // Division by zero is not an error: IEEE semantics give inf/nan.
            TokenType::SLASH => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
                _ => Err(numbers_required(operator)),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left_value, &right_value))),
            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left_value, &right_value))),

            TokenType::LESS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
                _ => Err(numbers_required(operator)),
            },

            TokenType::LESS_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
                _ => Err(numbers_required(operator)),
            },

            TokenType::GREATER => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
                _ => Err(numbers_required(operator)),
            },

            TokenType::GREATER_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),
                _ => Err(numbers_required(operator)),
            },

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator.")),
        }
    }

    fn evaluate_logical(
        &mut self,
        left: &'a Expr<'a>,
        operator: &'a Token<'a>,
        right: &'a Expr<'a>,
    ) -> Result<Value<'a>> {
        let left_value = self.evaluate(left)?;

        // Short-circuit: the left operand itself is the result when it
        // decides the outcome, not a coerced boolean.
        if operator.token_type == TokenType::OR {
            if is_truthy(&left_value) {
                return Ok(left_value);
            }
        } else if !is_truthy(&left_value) {
            return Ok(left_value);
        }

        self.evaluate(right)
    }

    fn evaluate_super(
        &mut self,
        id: ExprId,
        keyword: &'a Token<'a>,
        method: &'a Token<'a>,
    ) -> Result<Value<'a>> {
        let Some(distance) = self.locals.get(&id).copied() else {
            return Err(LoxError::runtime(
                keyword.line,
                "Cannot use 'super' outside of a class",
            ));
        };

        let superclass = self
            .environment
            .borrow()
            .get_at(distance, "super", keyword.line)?;

        let Value::Class(superclass) = superclass else {
            return Err(LoxError::runtime(keyword.line, "Superclass must be a class."));
        };

        // 'this' sits exactly one frame inside the one holding 'super'.
        let object = self
            .environment
            .borrow()
            .get_at(distance - 1, "this", keyword.line)?;

        let Value::Instance(instance) = object else {
            return Err(LoxError::runtime(
                keyword.line,
                "Cannot use 'super' outside of a method",
            ));
        };

        match superclass.find_method(method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),

            None => Err(LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    /// Route a variable reference through the binding table: a recorded
    /// distance addresses the chain, no record means the globals frame.
    fn look_up_variable(&self, name: &'a Token<'a>, id: ExprId) -> Result<Value<'a>> {
        match self.locals.get(&id).copied() {
            Some(distance) => self
                .environment
                .borrow()
                .get_at(distance, name.lexeme, name.line),

            None => self.globals.borrow().get(name.lexeme, name.line),
        }
    }

    /// Dispatch a call to whatever `callee` evaluated to.
    fn invoke(
        &mut self,
        callee: Value<'a>,
        paren: &'a Token<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        match callee {
            Value::NativeFunction(native) => {
                debug!("Calling native function '{}'", native.name);

                check_arity(native.arity, arguments.len(), paren)?;

                (native.func)(&arguments).map_err(|msg| LoxError::runtime(paren.line, msg))
            }

            Value::Function(function) => {
                check_arity(function.arity(), arguments.len(), paren)?;

                function.call(self, arguments)
            }

            Value::Class(class) => {
                check_arity(class.arity(), arguments.len(), paren)?;

                LoxClass::instantiate(&class, self, arguments)
            }

            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }
}

// ───────────────────────────── free helpers ─────────────────────────────

fn literal_value<'a>(literal: &LiteralValue) -> Value<'a> {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

/// Only `nil` and `false` are falsy; `0` and `""` are truthy.  Every
/// truthiness decision in the evaluator goes through here.
fn is_truthy(value: &Value<'_>) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

/// Equality never coerces; mixed kinds are simply unequal.
fn is_equal<'a>(left: &Value<'a>, right: &Value<'a>) -> bool {
    left == right
}

fn numbers_required(operator: &Token<'_>) -> LoxError {
    LoxError::runtime(operator.line, "Operands must be numbers.")
}

fn check_arity(expected: usize, actual: usize, paren: &Token<'_>) -> Result<()> {
    if expected != actual {
        return Err(LoxError::runtime(
            paren.line,
            format!("Expected {} arguments but got {}.", expected, actual),
        ));
    }

    Ok(())
}
