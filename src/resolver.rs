//! Static validity pass over the syntax tree.
//!
//! One walk, run between parsing and interpretation, that checks the
//! context-sensitive rules the grammar cannot express:
//!
//! - `return` outside any function body;
//! - `return <value>` inside an `init` method (initializers implicitly
//!   return their receiver);
//! - `this` outside a class method;
//! - `super` outside a class, or in a class with no superclass.
//!
//! Variable lookup itself stays dynamic — the interpreter walks the
//! environment chain at runtime — so this pass records nothing; it only
//! reports. Errors go into the shared [`Diagnostics`] collector, and the
//! walk continues after each one so a single pass surfaces all of them.

use log::{debug, info};

use crate::ast::{Expr, Stmt};
use crate::error::{Diagnostics, LoxError};

/// What kind of function body encloses the current node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// What kind of class body encloses the current node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver {
    current_function: FunctionType,
    current_class: ClassType,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Resolver {
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top-level statements, reporting every violation found.
    pub fn check(&mut self, statements: &[Stmt<'_>], diags: &mut Diagnostics) {
        info!("Resolving {} top-level statement(s)", statements.len());

        for stmt in statements {
            self.check_stmt(stmt, diags);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt<'_>, diags: &mut Diagnostics) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.check_expr(expr, diags),

            Stmt::Var { initializer, .. } => {
                if let Some(expr) = initializer {
                    self.check_expr(expr, diags);
                }
            }

            Stmt::Block(statements) => {
                for s in statements {
                    self.check_stmt(s, diags);
                }
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_expr(condition, diags);
                self.check_stmt(then_branch, diags);

                if let Some(else_stmt) = else_branch {
                    self.check_stmt(else_stmt, diags);
                }
            }

            Stmt::While { condition, body } => {
                self.check_expr(condition, diags);
                self.check_stmt(body, diags);
            }

            Stmt::Function { body, .. } => {
                self.check_function(FunctionType::Function, body, diags);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    debug!("'return' at top level on line {}", keyword.line);

                    diags.report(LoxError::resolve(
                        keyword.line,
                        "Cannot return from top-level code.",
                    ));
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        diags.report(LoxError::resolve(
                            keyword.line,
                            "Cannot return a value from an initializer.",
                        ));
                    }

                    self.check_expr(expr, diags);
                }
            }

            Stmt::Class {
                superclass,
                methods,
                ..
            } => {
                let enclosing: ClassType = self.current_class;
                self.current_class = if superclass.is_some() {
                    ClassType::Subclass
                } else {
                    ClassType::Class
                };

                for method in methods {
                    if let Stmt::Function { name, body, .. } = method {
                        let kind: FunctionType = if name.lexeme == "init" {
                            FunctionType::Initializer
                        } else {
                            FunctionType::Method
                        };

                        self.check_function(kind, body, diags);
                    }
                }

                self.current_class = enclosing;
            }
        }
    }

    fn check_function(&mut self, kind: FunctionType, body: &[Stmt<'_>], diags: &mut Diagnostics) {
        let enclosing: FunctionType = self.current_function;
        self.current_function = kind;

        for stmt in body {
            self.check_stmt(stmt, diags);
        }

        self.current_function = enclosing;
    }

    fn check_expr(&mut self, expr: &Expr<'_>, diags: &mut Diagnostics) {
        match expr {
            Expr::Literal(_) | Expr::Variable(_) => {}

            Expr::Grouping(inner) => self.check_expr(inner, diags),

            Expr::Unary { right, .. } => self.check_expr(right, diags),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.check_expr(left, diags);
                self.check_expr(right, diags);
            }

            Expr::Assign { value, .. } => self.check_expr(value, diags),

            Expr::Call {
                callee, arguments, ..
            } => {
                self.check_expr(callee, diags);

                for argument in arguments {
                    self.check_expr(argument, diags);
                }
            }

            Expr::Get { object, .. } => self.check_expr(object, diags),

            Expr::Set { object, value, .. } => {
                self.check_expr(object, diags);
                self.check_expr(value, diags);
            }

            Expr::This(keyword) => {
                if self.current_class == ClassType::None {
                    diags.report(LoxError::resolve(
                        keyword.line,
                        "Cannot use 'this' outside of a class.",
                    ));
                }
            }

            Expr::Super { keyword, .. } => match self.current_class {
                ClassType::None => diags.report(LoxError::resolve(
                    keyword.line,
                    "Cannot use 'super' outside of a class.",
                )),

                ClassType::Class => diags.report(LoxError::resolve(
                    keyword.line,
                    "Cannot use 'super' in a class with no superclass.",
                )),

                ClassType::Subclass => {}
            },
        }
    }
}
