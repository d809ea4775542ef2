//! Best-effort repair of model-produced argument strings.
//!
//! Models occasionally emit argument strings that are not quite JSON:
//! doubly escaped newlines, unescaped quotes inside string values, raw
//! control characters, or arithmetic where a number was expected. The
//! helpers here fix the common cases before decoding.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// A string value followed by the end of the value.
static QUOTED_VALUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(:\s")(.*?)("(?:,|\s*\}))"#)
        .expect("fail to create a regex for quoted argument values")
});

/// An unquoted value containing an arithmetic operator.
static EXPRESSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(:\s)([^"]*?[+\-*/][^"]*?)(,|\s*\})"#)
        .expect("fail to create a regex for argument expressions")
});

/// Evaluates an arithmetic expression found in place of a JSON value.
pub trait ExpressionEvaluator: Send + Sync + 'static {
    /// Returns the JSON text replacing `expression`, or `None` to leave it
    /// untouched.
    fn evaluate(&self, expression: &str) -> Option<String>;
}

/// Evaluates `+ - * /` over decimal numbers, with unary minus and
/// parentheses.
///
/// # Example
///
/// ```
/// use funcall_library::{ArithmeticEvaluator, ExpressionEvaluator};
///
/// assert_eq!(ArithmeticEvaluator.evaluate("3*4+1").as_deref(), Some("13"));
/// assert_eq!(ArithmeticEvaluator.evaluate("7/2").as_deref(), Some("3.5"));
/// assert_eq!(ArithmeticEvaluator.evaluate("now - 1"), None);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ArithmeticEvaluator;

impl ExpressionEvaluator for ArithmeticEvaluator {
    fn evaluate(&self, expression: &str) -> Option<String> {
        let mut parser = Arithmetic {
            chars: expression.chars().collect(),
            pos: 0,
            depth: 0,
        };
        let value = parser.expr()?;
        parser.skip_whitespace();
        if parser.pos != parser.chars.len() || !value.is_finite() {
            return None;
        }
        Some(format_number(value))
    }
}

/// Largest magnitude printed as an integer.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

/// Deepest parenthesis nesting accepted in an expression.
const MAX_NESTING: usize = 64;

struct Arithmetic {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Arithmetic {
    fn skip_whitespace(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.chars.get(self.pos).copied()
    }

    fn expr(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Some(value)
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == '*' {
                value * rhs
            } else if rhs == 0.0 {
                return None;
            } else {
                value / rhs
            };
        }
        Some(value)
    }

    fn factor(&mut self) -> Option<f64> {
        let mut negate = false;
        loop {
            match self.peek()? {
                '-' => negate = !negate,
                '+' => {}
                _ => break,
            }
            self.pos += 1;
        }
        let value = if self.peek()? == '(' {
            if self.depth == MAX_NESTING {
                return None;
            }
            self.pos += 1;
            self.depth += 1;
            let value = self.expr()?;
            self.depth -= 1;
            if self.peek()? != ')' {
                return None;
            }
            self.pos += 1;
            value
        } else {
            self.number()?
        };
        Some(if negate { -value } else { value })
    }

    fn number(&mut self) -> Option<f64> {
        let start = self.pos;
        while self
            .chars
            .get(self.pos)
            .is_some_and(|c| c.is_ascii_digit() || *c == '.')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .parse()
            .ok()
    }
}

/// Unescapes doubly escaped newlines and escapes stray quotes inside string
/// values.
pub(crate) fn repair(arguments: &str) -> String {
    let unescaped = arguments.replace("\\n", "\n");
    QUOTED_VALUE_PATTERN
        .replace_all(&unescaped, |caps: &Captures<'_>| {
            format!("{}{}{}", &caps[1], escape_bare_quotes(&caps[2]), &caps[3])
        })
        .into_owned()
}

/// Replaces unquoted arithmetic values with their evaluated result.
pub(crate) fn evaluate_expressions(arguments: &str, evaluator: &dyn ExpressionEvaluator) -> String {
    EXPRESSION_PATTERN
        .replace_all(arguments, |caps: &Captures<'_>| {
            let expression = &caps[2];
            match evaluator.evaluate(expression) {
                Some(value) => {
                    tracing::debug!(expression, value = %value, "evaluated argument expression");
                    format!("{}{}{}", &caps[1], value, &caps[3])
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Escapes raw control characters that appear inside string literals.
pub(crate) fn escape_control_characters(arguments: &str) -> String {
    let mut out = String::with_capacity(arguments.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in arguments.chars() {
        if !in_string {
            in_string = c == '"';
            out.push(c);
            continue;
        }
        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() && (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

fn escape_bare_quotes(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut backslashes = 0_usize;
    for c in value.chars() {
        if c == '"' && backslashes % 2 == 0 {
            out.push('\\');
        }
        backslashes = if c == '\\' { backslashes + 1 } else { 0 };
        out.push(c);
    }
    out
}

/// Returns the character at a 1-based line and column, for error reports.
pub(crate) fn char_at(text: &str, line: usize, column: usize) -> String {
    text.split('\n')
        .nth(line.saturating_sub(1))
        .and_then(|l| l.get(column.saturating_sub(1)..))
        .and_then(|rest| rest.chars().next())
        .map(String::from)
        .unwrap_or_default()
}
