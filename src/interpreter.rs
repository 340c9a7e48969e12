//! Tree-walking evaluator.
//!
//! Walks the syntax tree, evaluating expressions to [`Value`]s and executing
//! statements for effect against the environment chain. Dispatch is an
//! exhaustive `match` on the node variant, so every node kind has a rule by
//! construction.
//!
//! `return` is not modelled as an error or unwinding: statement execution
//! yields an explicit [`Flow`] outcome (`Normal` or a travelling `Return`)
//! that propagates through blocks and loops and is intercepted at the
//! nearest function-call boundary. Runtime errors travel separately as
//! `Err`.
//!
//! `print` output goes through a pluggable [`Write`] sink (stdout by
//! default) so tests can capture it; diagnostics never share that sink.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::ast::{Expr, LiteralValue, Stmt};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use crate::value::{LoxClass, LoxFunction, LoxInstance, Value};

/// Outcome of executing one statement: either control continues normally,
/// or a `return` is travelling outward to the nearest call boundary. The
/// `return` keyword's line rides along for error reporting.
#[derive(Debug)]
pub enum Flow<'a> {
    Normal,
    Return { value: Value<'a>, line: usize },
}

pub struct Interpreter<'a> {
    /// The outermost environment; native functions live here.
    globals: Rc<RefCell<Environment<'a>>>,

    /// The innermost environment currently in effect.
    environment: Rc<RefCell<Environment<'a>>>,

    /// Sink for `print` statements.
    out: Box<dyn Write>,
}

impl<'a> Default for Interpreter<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Interpreter<'a> {
    /// An interpreter printing to stdout, with the native functions
    /// predefined in the globals.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// An interpreter printing to an arbitrary sink; used by tests to
    /// capture `print` output.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing interpreter");

        let globals: Rc<RefCell<Environment<'a>>> = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock",
                arity: 0,
                func: |_args: &[Value<'a>]| {
                    let seconds: f64 = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_err(|e| format!("Clock error: {}", e))?
                        .as_secs_f64();

                    Ok(Value::Number(seconds))
                },
            },
        );

        Self {
            environment: globals.clone(),
            globals,
            out,
        }
    }

    // ───────────────────────── statements ─────────────────────────

    /// Run a program: execute top-level statements in order.
    ///
    /// A runtime error aborts the run but leaves already-produced output
    /// intact. A `return` escaping to the top level (possible only when
    /// the host skipped the resolver pass) is reported as a runtime error.
    pub fn interpret(&mut self, statements: &'a [Stmt<'a>]) -> Result<()> {
        debug!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            if let Flow::Return { line, .. } = self.execute(stmt)? {
                return Err(LoxError::runtime(
                    line,
                    "Cannot return from top-level code.",
                ));
            }
        }

        info!("Interpretation completed");

        Ok(())
    }

    /// Execute a single statement, yielding its control-flow outcome.
    pub fn execute(&mut self, stmt: &'a Stmt<'a>) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value<'a> = self.evaluate(expr)?;

                writeln!(self.out, "{}", value)?;

                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value<'a> = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(name.lexeme, value);

                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env: Environment<'a> = Environment::with_enclosing(self.environment.clone());

                self.execute_block(statements, Rc::new(RefCell::new(env)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        ret => return Ok(ret),
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Function { name, params, body } => {
                debug!("Defining function '{}'", name.lexeme);

                // Capture the *defining* environment, not the calling one.
                let function = LoxFunction {
                    name: name.lexeme,
                    params,
                    body,
                    closure: self.environment.clone(),
                    is_initializer: false,
                };

                self.environment
                    .borrow_mut()
                    .define(name.lexeme, Value::Function(Rc::new(function)));

                Ok(Flow::Normal)
            }

            Stmt::Return { keyword, value } => {
                let value: Value<'a> = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Ok(Flow::Return {
                    value,
                    line: keyword.line,
                })
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, *superclass, methods),
        }
    }

    /// Execute a statement list in `env`, restoring the previous
    /// environment afterwards even on error or early return. The discarded
    /// environment stays alive if a closure created inside captured it.
    pub fn execute_block(
        &mut self,
        statements: &'a [Stmt<'a>],
        env: Rc<RefCell<Environment<'a>>>,
    ) -> Result<Flow<'a>> {
        let previous: Rc<RefCell<Environment<'a>>> = self.environment.clone();
        self.environment = env;

        let mut outcome: Result<Flow<'a>> = Ok(Flow::Normal);

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => continue,

                other => {
                    outcome = other;
                    break;
                }
            }
        }

        self.environment = previous;

        outcome
    }

    /// Class declaration: evaluate the superclass (must be a class), build
    /// the method table, and bind the class name.
    ///
    /// When there is a superclass, method closures are chained through a
    /// synthetic environment binding `super` to it — so `super.m()` inside
    /// a method resolves relative to the class the method is *defined* in,
    /// not the runtime class of `this`.
    fn execute_class(
        &mut self,
        name: &'a Token<'a>,
        superclass: Option<&'a Token<'a>>,
        methods: &'a [Stmt<'a>],
    ) -> Result<Flow<'a>> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass: Option<Rc<LoxClass<'a>>> = match superclass {
            Some(token) => {
                let value: Value<'a> = self.environment.borrow().get(token.lexeme, token.line)?;

                match value {
                    Value::Class(class) => Some(class),

                    other => {
                        return Err(LoxError::runtime(
                            token.line,
                            format!("Superclass must be a class, got {}.", other.type_name()),
                        ));
                    }
                }
            }

            None => None,
        };

        // Two-step define/assign so methods can refer to the class by name.
        self.environment.borrow_mut().define(name.lexeme, Value::Nil);

        let method_closure: Rc<RefCell<Environment<'a>>> = match &superclass {
            Some(class) => {
                let mut env: Environment<'a> =
                    Environment::with_enclosing(self.environment.clone());
                env.define("super", Value::Class(class.clone()));

                Rc::new(RefCell::new(env))
            }

            None => self.environment.clone(),
        };

        let mut table: HashMap<&'a str, Rc<LoxFunction<'a>>> = HashMap::new();

        for method in methods {
            if let Stmt::Function {
                name: method_name,
                params,
                body,
            } = method
            {
                table.insert(
                    method_name.lexeme,
                    Rc::new(LoxFunction {
                        name: method_name.lexeme,
                        params,
                        body,
                        closure: method_closure.clone(),
                        is_initializer: method_name.lexeme == "init",
                    }),
                );
            }
        }

        let class = Rc::new(LoxClass {
            name: name.lexeme,
            superclass,
            methods: table,
        });

        self.environment
            .borrow_mut()
            .assign(name.lexeme, Value::Class(class), name.line)?;

        Ok(Flow::Normal)
    }

    // ───────────────────────── expressions ────────────────────────

    /// Evaluate an expression to a value. Total over well-formed trees;
    /// may signal a typed runtime error.
    pub fn evaluate(&mut self, expr: &'a Expr<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

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
            } => {
                // The deciding operand is returned as-is, not coerced to a
                // boolean.
                let left_value: Value<'a> = self.evaluate(left)?;

                let short_circuits: bool = match operator.token_type {
                    TokenType::OR => left_value.is_truthy(),
                    _ => !left_value.is_truthy(), // AND
                };

                if short_circuits {
                    Ok(left_value)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable(name) => self.environment.borrow().get(name.lexeme, name.line),

            Expr::Assign { name, value } => {
                let value: Value<'a> = self.evaluate(value)?;

                self.environment
                    .borrow_mut()
                    .assign(name.lexeme, value.clone(), name.line)?;

                // Assignment is an expression; it yields the assigned value.
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value<'a> = self.evaluate(callee)?;

                let mut args: Vec<Value<'a>> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.call_value(&callee, paren, &args)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),

                other => Err(LoxError::runtime(
                    name.line,
                    format!("Only instances have properties, got {}.", other.type_name()),
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value: Value<'a> = self.evaluate(value)?;

                    instance.set(name.lexeme, value.clone());

                    Ok(value)
                }

                other => Err(LoxError::runtime(
                    name.line,
                    format!("Only instances have fields, got {}.", other.type_name()),
                )),
            },

            Expr::This(keyword) => self.environment.borrow().get("this", keyword.line),

            Expr::Super { keyword, method } => self.evaluate_super(keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &'a Token<'a>, right: &'a Expr<'a>) -> Result<Value<'a>> {
        let right: Value<'a> = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),

                other => Err(LoxError::runtime(
                    operator.line,
                    format!(
                        "Operand of '-' must be a number, got {}.",
                        other.type_name()
                    ),
                )),
            },

            // `!` works on any value through truthiness.
            _ => Ok(Value::Bool(!right.is_truthy())),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &'a Expr<'a>,
        operator: &'a Token<'a>,
        right: &'a Expr<'a>,
    ) -> Result<Value<'a>> {
        let left: Value<'a> = self.evaluate(left)?;
        let right: Value<'a> = self.evaluate(right)?;

        match operator.token_type {
            // Equality never raises a type error: cross-variant compares
            // are simply unequal.
            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands of '+' must be two numbers or two strings.",
                )),
            },

            _ => {
                let (a, b): (f64, f64) = self.numeric_operands(operator, left, right)?;

                Ok(match operator.token_type {
                    TokenType::MINUS => Value::Number(a - b),
                    TokenType::STAR => Value::Number(a * b),

                    TokenType::SLASH => {
                        if b == 0.0 {
                            return Err(LoxError::runtime(operator.line, "Division by zero."));
                        }

                        Value::Number(a / b)
                    }

                    TokenType::GREATER => Value::Bool(a > b),
                    TokenType::GREATER_EQUAL => Value::Bool(a >= b),
                    TokenType::LESS => Value::Bool(a < b),
                    TokenType::LESS_EQUAL => Value::Bool(a <= b),

                    _ => {
                        return Err(LoxError::runtime(
                            operator.line,
                            format!("Invalid binary operator '{}'.", operator.lexeme),
                        ));
                    }
                })
            }
        }
    }

    fn numeric_operands(
        &self,
        operator: &'a Token<'a>,
        left: Value<'a>,
        right: Value<'a>,
    ) -> Result<(f64, f64)> {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok((a, b)),

            _ => Err(LoxError::runtime(
                operator.line,
                format!("Operands of '{}' must be numbers.", operator.lexeme),
            )),
        }
    }

    /// `super.method`: looked up starting at the superclass of the class
    /// the running method is lexically defined in, then bound to the
    /// original receiver.
    fn evaluate_super(
        &mut self,
        keyword: &'a Token<'a>,
        method: &'a Token<'a>,
    ) -> Result<Value<'a>> {
        let superclass: Value<'a> = self.environment.borrow().get("super", keyword.line)?;
        let receiver: Value<'a> = self.environment.borrow().get("this", keyword.line)?;

        let (Value::Class(superclass), Value::Instance(receiver)) = (superclass, receiver) else {
            return Err(LoxError::runtime(
                keyword.line,
                "'super' is only valid inside a subclass method.",
            ));
        };

        match superclass.find_method(method.lexeme) {
            Some(found) => Ok(Value::Function(found.bind(receiver))),

            None => Err(LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    // ───────────────────────── call machinery ─────────────────────

    /// Invoke any callable value: native function, user function, or class
    /// constructor. Anything else is a runtime error.
    fn call_value(
        &mut self,
        callee: &Value<'a>,
        paren: &'a Token<'a>,
        args: &[Value<'a>],
    ) -> Result<Value<'a>> {
        match callee {
            Value::NativeFunction { name, arity, func } => {
                debug!("Calling native function '{}'", name);

                self.check_arity(*arity, args.len(), paren)?;

                func(args).map_err(|msg| LoxError::runtime(paren.line, msg))
            }

            Value::Function(function) => self.call_function(function, paren, args),

            Value::Class(class) => {
                debug!("Constructing instance of '{}'", class.name);

                self.check_arity(class.arity(), args.len(), paren)?;

                let instance: Rc<LoxInstance<'a>> = Rc::new(LoxInstance::new(class.clone()));

                if let Some(init) = class.find_method("init") {
                    self.call_function(&init.bind(instance.clone()), paren, args)?;
                }

                Ok(Value::Instance(instance))
            }

            other => Err(LoxError::runtime(
                paren.line,
                format!(
                    "Can only call functions and classes, got {}.",
                    other.type_name()
                ),
            )),
        }
    }

    /// Call a user function: fresh environment chained to the *captured*
    /// closure, parameters bound positionally, body run until a `Return`
    /// flow is intercepted. No `return` yields `nil`; an initializer
    /// always yields its receiver.
    fn call_function(
        &mut self,
        function: &Rc<LoxFunction<'a>>,
        paren: &'a Token<'a>,
        args: &[Value<'a>],
    ) -> Result<Value<'a>> {
        debug!("Calling function '{}'", function.name);

        self.check_arity(function.arity(), args.len(), paren)?;

        let mut env: Environment<'a> = Environment::with_enclosing(function.closure.clone());

        for (param, arg) in function.params.iter().zip(args.iter()) {
            env.define(param.lexeme, arg.clone());
        }

        let flow: Flow<'a> = self.execute_block(function.body, Rc::new(RefCell::new(env)))?;

        if function.is_initializer {
            // `init` returns the receiver even on a bare `return`.
            return function.closure.borrow().get("this", paren.line);
        }

        Ok(match flow {
            Flow::Return { value, .. } => value,
            Flow::Normal => Value::Nil,
        })
    }

    fn check_arity(&self, expected: usize, got: usize, paren: &'a Token<'a>) -> Result<()> {
        if expected != got {
            return Err(LoxError::runtime(
                paren.line,
                format!("Expected {} arguments but got {}.", expected, got),
            ));
        }

        Ok(())
    }

    /// The global environment; exposed for hosts that predefine bindings.
    pub fn globals(&self) -> Rc<RefCell<Environment<'a>>> {
        self.globals.clone()
    }
}
