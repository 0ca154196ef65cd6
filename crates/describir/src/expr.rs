//! Tag expression parsing and evaluation.
//!
//! Filters select tests by evaluating a small prefix expression language
//! against each test's effective tag set:
//!
//! ```text
//! expr  := IDENT | OP '(' ( expr ( ',' expr )* )? ')'
//! OP    := 'and' | 'or' | 'not'        (case-insensitive)
//! IDENT := a run of characters other than '(', ')', and ',',
//!          trimmed of surrounding whitespace
//! ```
//!
//! Operator names only act as operators when followed by a parenthesis, so a
//! bare `and` is an ordinary tag named `and`, while `nand(a)` is a parse
//! error. Tags may contain internal whitespace. `and()` with no operands is
//! vacuously true and `or()` is vacuously false; `not` takes exactly one
//! operand.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::result::{DescribirError, DescribirResult};
use crate::tag::TagSet;

/// A parsed tag expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagExpr {
    /// True when the named tag is present
    Tag(String),
    /// True when every operand is true; true for zero operands
    And(Vec<TagExpr>),
    /// True when any operand is true; false for zero operands
    Or(Vec<TagExpr>),
    /// True when the operand is false
    Not(Box<TagExpr>),
}

impl TagExpr {
    /// Parse an expression from its textual form.
    ///
    /// ```
    /// use describir::TagExpr;
    ///
    /// let expr = TagExpr::parse("and(unit, not(slow))").unwrap();
    /// assert_eq!(expr.to_string(), "and(unit, not(slow))");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`DescribirError::ExpressionParse`] for empty input, unbalanced
    /// parentheses, a parenthesized group with no operator in front of it, an
    /// unrecognized operator name, trailing input after a complete expression,
    /// or a `not` call with an operand count other than one.
    pub fn parse(input: &str) -> DescribirResult<Self> {
        let mut parser = Parser { input, pos: 0 };
        parser.skip_whitespace();
        if parser.peek().is_none() {
            return Err(DescribirError::expression("empty expression"));
        }
        let expr = parser.parse_expr()?;
        parser.skip_whitespace();
        if let Some(ch) = parser.peek() {
            return Err(DescribirError::expression(format!(
                "unexpected {ch:?} at position {}",
                parser.pos
            )));
        }
        Ok(expr)
    }

    /// Evaluate the expression against a set of tags
    #[must_use]
    pub fn evaluate(&self, tags: &TagSet) -> bool {
        match self {
            Self::Tag(name) => tags.contains(name),
            Self::And(operands) => operands.iter().all(|e| e.evaluate(tags)),
            Self::Or(operands) => operands.iter().any(|e| e.evaluate(tags)),
            Self::Not(operand) => !operand.evaluate(tags),
        }
    }

    /// Build a tag atom
    #[must_use]
    pub fn tag(name: impl Into<String>) -> Self {
        Self::Tag(name.into())
    }

    /// Build a conjunction
    #[must_use]
    pub fn and(operands: impl IntoIterator<Item = Self>) -> Self {
        Self::And(operands.into_iter().collect())
    }

    /// Build a disjunction
    #[must_use]
    pub fn or(operands: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(operands.into_iter().collect())
    }

    /// Build a negation
    #[must_use]
    pub fn not(operand: Self) -> Self {
        Self::Not(Box::new(operand))
    }
}

impl FromStr for TagExpr {
    type Err = DescribirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TagExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(name) => f.write_str(name),
            Self::And(operands) => write_call(f, "and", operands),
            Self::Or(operands) => write_call(f, "or", operands),
            Self::Not(operand) => write!(f, "not({operand})"),
        }
    }
}

fn write_call(f: &mut fmt::Formatter<'_>, op: &str, operands: &[TagExpr]) -> fmt::Result {
    f.write_str(op)?;
    f.write_str("(")?;
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{operand}")?;
    }
    f.write_str(")")
}

#[derive(Clone, Copy)]
enum Operator {
    And,
    Or,
    Not,
}

impl Operator {
    fn from_ident(ident: &str) -> Option<Self> {
        if ident.eq_ignore_ascii_case("and") {
            Some(Self::And)
        } else if ident.eq_ignore_ascii_case("or") {
            Some(Self::Or)
        } else if ident.eq_ignore_ascii_case("not") {
            Some(Self::Not)
        } else {
            None
        }
    }
}

/// Recursive-descent parser over a borrowed input string.
///
/// `pos` is a byte offset and always sits on a char boundary.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Consume a maximal delimiter-free run and trim trailing whitespace.
    ///
    /// May return an empty string when the cursor already sits on a delimiter;
    /// callers decide whether that is an error.
    fn scan_ident(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| !matches!(ch, '(' | ')' | ','))
        {
            self.bump();
        }
        self.input[start..self.pos].trim_end().to_string()
    }

    fn parse_expr(&mut self) -> DescribirResult<TagExpr> {
        self.skip_whitespace();
        let start = self.pos;
        let ident = self.scan_ident();
        if self.peek() == Some('(') {
            return match Operator::from_ident(&ident) {
                Some(op) => self.parse_call(op),
                None if ident.is_empty() => Err(DescribirError::expression(format!(
                    "parenthesized group without an operator at position {}",
                    self.pos
                ))),
                None => Err(DescribirError::expression(format!(
                    "unrecognized operator {ident:?} at position {start}"
                ))),
            };
        }
        if ident.is_empty() {
            return Err(match self.peek() {
                Some(ch) => DescribirError::expression(format!(
                    "expected tag or operator at position {}, found {ch:?}",
                    self.pos
                )),
                None => DescribirError::expression("unexpected end of input"),
            });
        }
        Ok(TagExpr::Tag(ident))
    }

    fn parse_call(&mut self, op: Operator) -> DescribirResult<TagExpr> {
        self.bump();
        let mut operands = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.bump();
        } else {
            loop {
                operands.push(self.parse_expr()?);
                self.skip_whitespace();
                match self.bump() {
                    Some(',') => {}
                    Some(')') => break,
                    Some(ch) => {
                        return Err(DescribirError::expression(format!(
                            "expected ',' or ')' at position {}, found {ch:?}",
                            self.pos - ch.len_utf8()
                        )));
                    }
                    None => {
                        return Err(DescribirError::expression("unclosed '(' in expression"));
                    }
                }
            }
        }
        match op {
            Operator::And => Ok(TagExpr::And(operands)),
            Operator::Or => Ok(TagExpr::Or(operands)),
            Operator::Not => {
                let count = operands.len();
                let mut operands = operands.into_iter();
                match (operands.next(), operands.next()) {
                    (Some(operand), None) => Ok(TagExpr::Not(Box::new(operand))),
                    _ => Err(DescribirError::expression(format!(
                        "not() takes exactly one operand, found {count}"
                    ))),
                }
            }
        }
    }
}
