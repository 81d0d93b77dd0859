//! Static resolver pass for the **Lox** interpreter.
//!
//! One walk over the AST does three things:
//! 1. Build lexical scopes (a stack of `HashMap<&str, bool>` tracking
//!    declared/defined names).
//! 2. Report static errors (redeclaration, forward‑read in an initializer,
//!    invalid `return`, `this`/`super` misuse, self‑inheritance).  Errors
//!    accumulate; resolution of sibling statements keeps going so a single
//!    pass reports everything.
//! 3. Record, for *each* variable‑reference node, how many environment hops
//!    separate the reference from its declaring scope.  References found in
//!    no scope are left out of the table and resolve against the globals at
//!    run time — the interpreter keeps "no entry" and "entry with distance
//!    zero" strictly apart.
//!
//! The pass is pure: resolving the same program twice produces an identical
//! table.

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::LoxError;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// Scope‑hop distances keyed by node identity, consumed by the interpreter.
pub type Bindings = HashMap<ExprId, usize>;

/// What kind of function body are we inside?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// What kind of class body are we inside?  Used to validate `this`/`super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances for the interpreter.
pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
    locals: Bindings,
    errors: Vec<LoxError>,
}

impl<'a> Default for Resolver<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            locals: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements.  Yields the binding table, or every
    /// diagnostic the program triggered.
    pub fn resolve(mut self, statements: &[Stmt<'a>]) -> Result<Bindings, Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        if self.errors.is_empty() {
            Ok(self.locals)
        } else {
            Err(self.errors)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt<'a>) {
        debug!("Resolving stmt: {:?}", stmt);

        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define, so the initializer
                // cannot observe the half‑created variable.
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // The name is visible *inside* its own body (recursion).
                self.declare(decl.name);
                self.define(decl.name);
                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword.line, "'return' used outside of function");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword.line, "Cannot return a value from an initializer");
                    }

                    self.resolve_expr(expr);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;

                self.declare(name);
                self.define(name);

                if let Some(expr) = superclass {
                    if let Expr::Variable {
                        name: superclass_name,
                        ..
                    } = expr
                    {
                        if superclass_name.lexeme == name.lexeme {
                            self.error(
                                superclass_name.line,
                                "A class cannot inherit from itself",
                            );
                        }
                    }

                    self.current_class = ClassType::Subclass;
                    self.resolve_expr(expr);

                    // The scope every method closure sees 'super' in.
                    self.begin_scope();
                    self.scope_insert("super");
                }

                // 'this' sits one scope inside 'super'.
                self.begin_scope();
                self.scope_insert("this");

                for method in methods {
                    let declaration = if method.name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };

                    self.resolve_function(method, declaration);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr<'a>) {
        debug!("Resolving expr: {:?}", expr);

        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                // Cannot read in own initializer
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme) == Some(&false) {
                        self.error(
                            name.line,
                            "Cannot read local variable in its own initializer",
                        );
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword.line, "Cannot use 'this' outside of a class");
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => match self.current_class {
                ClassType::None => {
                    self.error(keyword.line, "Cannot use 'super' outside of a class");
                }

                ClassType::Class => {
                    self.error(
                        keyword.line,
                        "Cannot use 'super' in a class with no superclass",
                    );
                }

                ClassType::Subclass => self.resolve_local(*id, keyword),
            },
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, decl: &FunctionDecl<'a>, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Directly mark an implicit name (`this`, `super`) as defined in the
    /// innermost scope.
    fn scope_insert(&mut self, name: &'a str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, true);
        }
    }

    fn declare(&mut self, name: &Token<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.lexeme) {
                self.errors.push(LoxError::resolve(
                    name.line,
                    "Variable already declared in this scope",
                ));
                return;
            }

            scope.insert(name.lexeme, false);
        }
    }

    fn define(&mut self, name: &Token<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, true);
        }
    }

    fn error<S: Into<String>>(&mut self, line: usize, msg: S) {
        self.errors.push(LoxError::resolve(line, msg));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as a local at some depth, or leave it
    /// out of the table entirely if no enclosing scope declares it (global).
    fn resolve_local(&mut self, id: ExprId, name: &Token<'a>) {
        // innermost → outermost
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);

                self.locals.insert(id, depth);
                return;
            }
        }

        // Not found in any local scope ⇒ global lookup at run time.
        debug!("Resolved '{}' as global", name.lexeme);
    }
}
