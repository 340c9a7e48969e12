//! Parenthesized prefix rendering of expression trees.
//!
//! Diagnostic/test fixture only: the printed form is not re-parseable
//! source and is compared by literal string equality in tests. `1 + 2`
//! renders as `(+ 1.0 2.0)`.

use crate::ast::{Expr, LiteralValue};

pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr<'_>) -> String {
        match expr {
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),
                LiteralValue::False => "false".into(),
                LiteralValue::Nil => "nil".into(),
                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    // Integral doubles keep one decimal place: 3 → 3.0.
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            Expr::Variable(name) => name.lexeme.into(),

            Expr::Assign { name, value } => format!("(= {} {})", name.lexeme, Self::print(value)),

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s: String = format!("(call {}", Self::print(callee));

                for argument in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(argument));
                }

                s.push(')');
                s
            }

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(.= {} {} {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::This(_) => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }
}
