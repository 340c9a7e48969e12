//! Runtime value model: a closed sum type over every kind of Lox value,
//! plus the callable/class/instance structures behind the `Function`,
//! `Class`, and `Instance` variants.
//!
//! Equality: `nil == nil`; numbers, strings, and booleans compare by value
//! within the same variant; functions, classes, and instances compare by
//! identity (`Rc::ptr_eq`); any cross-variant comparison is unequal.
//! Truthiness: only `nil` and `false` are falsy — `0` and `""` are truthy.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Stmt;
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::token::Token;

/// A Lox runtime value.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    Number(f64),
    String(String),
    Bool(bool),
    Nil,

    /// Host-provided function, e.g. `clock`.
    NativeFunction {
        name: &'static str,
        arity: usize,
        func: fn(&[Value<'a>]) -> std::result::Result<Value<'a>, String>,
    },

    /// User-defined function or method, paired with its closure.
    Function(Rc<LoxFunction<'a>>),

    /// Class value; calling it constructs an instance.
    Class(Rc<LoxClass<'a>>),

    /// Instance of a class, with its own mutable field table.
    Instance(Rc<LoxInstance<'a>>),
}

impl<'a> Value<'a> {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Short noun for error messages ("Operands must be numbers" style
    /// reporting names the operator, this names the value class).
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Nil => "nil",
            Value::NativeFunction { .. } => "native function",
            Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }
}

impl<'a> PartialEq for Value<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<'a> fmt::Display for Value<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                // Integral doubles print without a fraction: 3, not 3.0.
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),

            Value::NativeFunction { name, .. } => write!(f, "<native fn {}>", name),

            Value::Function(fun) => write!(f, "<fn {}>", fun.name),

            Value::Class(class) => write!(f, "{}", class.name),

            Value::Instance(instance) => write!(f, "{} instance", instance.class.name),
        }
    }
}

/// A user-defined function: parameter tokens and body borrowed from the
/// syntax tree, plus the environment captured at the point of definition.
/// The captured environment is what makes closures work — calls chain a
/// fresh scope to it, never to the caller's environment.
#[derive(Debug)]
pub struct LoxFunction<'a> {
    pub name: &'a str,
    pub params: &'a [&'a Token<'a>],
    pub body: &'a [Stmt<'a>],
    pub closure: Rc<RefCell<Environment<'a>>>,
    /// True for a method named `init`; such a method always returns the
    /// receiver, even on a bare `return`.
    pub is_initializer: bool,
}

impl<'a> LoxFunction<'a> {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Produce a copy of this method whose closure has a synthetic layer
    /// binding `this` to `instance`. Inserted between the method's captured
    /// environment and its call-time scope.
    pub fn bind(&self, instance: Rc<LoxInstance<'a>>) -> Rc<LoxFunction<'a>> {
        let mut env: Environment<'a> = Environment::with_enclosing(self.closure.clone());
        env.define("this", Value::Instance(instance));

        Rc::new(LoxFunction {
            name: self.name,
            params: self.params,
            body: self.body,
            closure: Rc::new(RefCell::new(env)),
            is_initializer: self.is_initializer,
        })
    }
}

/// A class definition: its own method table plus an optional superclass.
#[derive(Debug)]
pub struct LoxClass<'a> {
    pub name: &'a str,
    pub superclass: Option<Rc<LoxClass<'a>>>,
    pub methods: HashMap<&'a str, Rc<LoxFunction<'a>>>,
}

impl<'a> LoxClass<'a> {
    /// Look `name` up in this class's method table, then up the superclass
    /// chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction<'a>>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// Constructing arity: the `init` method's arity, or zero.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

/// A runtime object: a reference to its class (for method lookup) and an
/// owned, mutable field table.
#[derive(Debug)]
pub struct LoxInstance<'a> {
    pub class: Rc<LoxClass<'a>>,
    fields: RefCell<HashMap<String, Value<'a>>>,
}

impl<'a> LoxInstance<'a> {
    pub fn new(class: Rc<LoxClass<'a>>) -> Self {
        LoxInstance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// Property read: fields shadow methods of the same name; a method hit
    /// is bound to the receiver. Neither found is a runtime error.
    ///
    /// Takes the `Rc` rather than `&self` because binding a method needs a
    /// shared handle on the receiver.
    pub fn get(instance: &Rc<LoxInstance<'a>>, name: &Token<'a>) -> Result<Value<'a>> {
        if let Some(value) = instance.fields.borrow().get(name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = instance.class.find_method(name.lexeme) {
            return Ok(Value::Function(method.bind(instance.clone())));
        }

        Err(LoxError::runtime(
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Property write: creates the field if absent.
    pub fn set(&self, name: &str, value: Value<'a>) {
        self.fields.borrow_mut().insert(name.to_owned(), value);
    }
}
