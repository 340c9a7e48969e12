//! Centralised error hierarchy for the interpreter.
//!
//! Every stage (scanner, parser, resolver, runtime, CLI) converts its failure
//! modes into a [`LoxError`] variant, giving the crate one `Result<T>` alias
//! and clean inter-operation with `anyhow` at the binary boundary.
//!
//! Static errors (lex/parse/resolve) are not fatal to their stage: they are
//! accumulated in a [`Diagnostics`] collector that the scanner, parser, and
//! resolver thread through their entry points. The host inspects the
//! collector afterwards to decide whether execution may proceed and which
//! exit code to use, instead of consulting a process-wide "had error" flag.

use std::io;
use std::slice;

use log::info;
use thiserror::Error;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error: unexpected character, unterminated string.
    #[error("[line {line}] Error: {message}")]
    Lex { message: String, line: usize },

    /// Syntactic (parser) error, including invalid assignment targets.
    #[error("[line {line}] Error: {message}")]
    Parse { message: String, line: usize },

    /// Static validity error (`return` at top level, stray `this`/`super`).
    #[error("[line {line}] Error: {message}")]
    Resolve { message: String, line: usize },

    /// Runtime evaluation error: type mismatch, undefined name or property,
    /// arity mismatch, calling a non-callable, invalid superclass.
    #[error("[line {line}] RuntimeError: {message}")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error`. Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF-8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        LoxError::Resolve { message, line }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        LoxError::Runtime { message, line }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// Accumulator for recoverable static errors.
///
/// The scanner keeps scanning past a bad character and the parser
/// resynchronizes past a bad statement; each occurrence lands here so one
/// pass can surface every independent problem in the source.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<LoxError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one error without interrupting the reporting stage.
    pub fn report(&mut self, err: LoxError) {
        self.errors.push(err);
    }

    /// True if at least one error was reported. Execution must not proceed
    /// when this holds after scanning/parsing/resolution.
    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, LoxError> {
        self.errors.iter()
    }

    /// Print every collected error to the error channel, in report order.
    pub fn eprint_all(&self) {
        for err in &self.errors {
            eprintln!("{}", err);
        }
    }
}

impl<'d> IntoIterator for &'d Diagnostics {
    type Item = &'d LoxError;
    type IntoIter = slice::Iter<'d, LoxError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
