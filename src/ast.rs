//! Syntax-tree data model shared by the parser, resolver, and interpreter.
//!
//! Two closed node families: [`Expr`] for forms that produce a value and
//! [`Stmt`] for forms that produce an effect. Every consumer dispatches by
//! exhaustive `match`, so adding a variant is a compile error at each site
//! until it is handled.
//!
//! Nodes exclusively own their children (`Box`/`Vec`); token references are
//! borrowed from the scanner's output for error reporting, tying the whole
//! tree to the source buffer's lifetime `'a`. Trees are immutable once the
//! parser returns them.

use crate::token::Token;

/// A literal constant appearing directly in the source.
///
/// These are the terminal leaves of the expression tree; the parser copies
/// the value out of the token at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal, IEEE-754 `f64`. `"3"` parses as `3.0`.
    Number(f64),

    /// String literal without the surrounding quotes.
    Str(String),

    True,
    False,
    Nil,
}

/// Expression node: evaluates to a runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'a> {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Prefix unary operator: `!ready`, `-42`.
    Unary {
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Infix binary operator: `a + b`, `x <= y`.
    Binary {
        left: Box<Expr<'a>>,
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Short-circuiting `and` / `or`.
    Logical {
        left: Box<Expr<'a>>,
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Parenthesised sub-expression.
    Grouping(Box<Expr<'a>>),

    /// Variable access; resolves against the environment chain at runtime.
    Variable(&'a Token<'a>),

    /// Assignment to an existing binding: `name = value`.
    Assign {
        name: &'a Token<'a>,
        value: Box<Expr<'a>>,
    },

    /// Function, method, or class-constructor invocation.
    Call {
        callee: Box<Expr<'a>>,
        /// The closing `)` token, retained for error reporting.
        paren: &'a Token<'a>,
        arguments: Vec<Expr<'a>>,
    },

    /// Property read: `object.name`.
    Get {
        object: Box<Expr<'a>>,
        name: &'a Token<'a>,
    },

    /// Property write: `object.name = value`.
    Set {
        object: Box<Expr<'a>>,
        name: &'a Token<'a>,
        value: Box<Expr<'a>>,
    },

    /// The `this` keyword inside a method body.
    This(&'a Token<'a>),

    /// `super.method` inside a subclass method.
    Super {
        keyword: &'a Token<'a>,
        method: &'a Token<'a>,
    },
}

/// Statement node: executed for effect. A program is a `Vec<Stmt>`.
///
/// There is no `for` node: the parser desugars `for` loops into an
/// equivalent `While` wrapped in a `Block`.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt<'a> {
    /// Stand-alone expression terminated by a semicolon.
    Expression(Expr<'a>),

    /// `print expr ;`
    Print(Expr<'a>),

    /// `var name ( = initializer )? ;` — without an initializer the name
    /// is bound to `nil`.
    Var {
        name: &'a Token<'a>,
        initializer: Option<Expr<'a>>,
    },

    /// Braced scope; runs in a fresh child environment.
    Block(Vec<Stmt<'a>>),

    If {
        condition: Expr<'a>,
        then_branch: Box<Stmt<'a>>,
        else_branch: Option<Box<Stmt<'a>>>,
    },

    While {
        condition: Expr<'a>,
        body: Box<Stmt<'a>>,
    },

    /// Function declaration; becomes a first-class callable capturing the
    /// defining environment. Also used for class methods.
    Function {
        name: &'a Token<'a>,
        params: Vec<&'a Token<'a>>,
        body: Vec<Stmt<'a>>,
    },

    /// `return ( expr )? ;` — only valid inside a function body.
    Return {
        /// The `return` keyword token, for error locations.
        keyword: &'a Token<'a>,
        value: Option<Expr<'a>>,
    },

    /// Class declaration with an optional `< Superclass` clause. Methods
    /// are `Stmt::Function` nodes.
    Class {
        name: &'a Token<'a>,
        superclass: Option<&'a Token<'a>>,
        methods: Vec<Stmt<'a>>,
    },
}
