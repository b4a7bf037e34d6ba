//! Query text parser.
//!
//! Turns `attr=expr attr=expr ...` into a [`Filters`] set. An expression is
//! a literal (implicit equality) or a call `name(arg, ...)` whose arguments
//! are themselves expressions:
//!
//! ```text
//! hostname=not(empty()) num_cpu=any(4, 8) os="debian 12" tags=contains(web)
//! ```
//!
//! Function names resolve case-insensitively through [`FilterOp::lookup`].
//! Names outside the registry are kept as opaque operations.

use crate::error::{Error, Result};
use crate::filter::{Condition, Filter, FilterOp, Filters, Operand};
use crate::Value;

/// Deepest parenthesis nesting accepted in query text.
pub const MAX_NESTING: usize = 128;

/// Parse query text into a filter set.
///
/// Terms are separated by whitespace outside quotes and parentheses. A
/// repeated attribute keeps its last condition. Nesting deeper than
/// [`MAX_NESTING`] is rejected.
pub fn parse_query(query: &str) -> Result<Filters> {
    let mut filters = Filters::new();

    for (start, term) in split_terms(query)? {
        let (field, condition) = parse_term(term, start)?;
        filters.insert(field, condition);
    }

    Ok(filters)
}

fn syntax_error(token: &str, position: usize, reason: impl Into<String>) -> Error {
    Error::Parse {
        token: token.to_string(),
        position,
        reason: reason.into(),
    }
}

/// Track quotes and parenthesis depth while scanning text.
#[derive(Default)]
struct Scanner {
    quote: Option<char>,
    opens: Vec<usize>,
    prev: Option<char>,
}

enum Step {
    /// Character is inside a quoted string
    Quoted,
    Open,
    Close,
    Plain,
}

impl Scanner {
    fn step(&mut self, pos: usize, c: char, text: &str) -> Result<Step> {
        let step = if let Some(q) = self.quote {
            if c == q {
                self.quote = None;
            }
            Step::Quoted
        } else if (c == '"' || c == '\'') && self.quote_may_start() {
            self.quote = Some(c);
            Step::Quoted
        } else if c == '(' {
            if self.opens.len() == MAX_NESTING {
                return Err(syntax_error(text, pos, "nesting too deep"));
            }
            self.opens.push(pos);
            Step::Open
        } else if c == ')' {
            if self.opens.pop().is_none() {
                return Err(syntax_error(text, pos, "unmatched ) found"));
            }
            Step::Close
        } else {
            Step::Plain
        };
        self.prev = Some(c);
        Ok(step)
    }

    fn quote_may_start(&self) -> bool {
        match self.prev {
            None => true,
            Some(p) => p.is_whitespace() || matches!(p, '=' | '(' | ','),
        }
    }

    fn depth(&self) -> usize {
        self.opens.len()
    }

    fn finish(&self, text: &str, base: usize) -> Result<()> {
        if self.quote.is_some() {
            return Err(syntax_error(text, base + text.len(), "unterminated quote"));
        }
        if let Some(&open) = self.opens.last() {
            return Err(syntax_error(text, base + open, "unmatched ( found"));
        }
        Ok(())
    }
}

fn split_terms(query: &str) -> Result<Vec<(usize, &str)>> {
    let mut terms = Vec::new();
    let mut scanner = Scanner::default();
    let mut start: Option<usize> = None;

    for (pos, c) in query.char_indices() {
        let step = scanner.step(pos, c, query)?;
        let separator = matches!(step, Step::Plain) && c.is_whitespace() && scanner.depth() == 0;

        match (separator, start) {
            (true, Some(s)) => {
                terms.push((s, &query[s..pos]));
                start = None;
            }
            (false, None) => start = Some(pos),
            _ => {}
        }
    }

    scanner.finish(query, 0)?;
    if let Some(s) = start {
        terms.push((s, &query[s..]));
    }
    Ok(terms)
}

fn parse_term(term: &str, start: usize) -> Result<(String, Condition)> {
    let eq = term
        .find('=')
        .filter(|&i| !term[..i].contains(['(', '"', '\'']))
        .ok_or_else(|| syntax_error(term, start, "expected attribute=expression"))?;

    let field = term[..eq].trim();
    if field.is_empty() {
        return Err(syntax_error(term, start, "empty attribute name"));
    }

    let condition = parse_expr(&term[eq + 1..], start + eq + 1)?;
    Ok((field.to_string(), condition))
}

fn parse_expr(raw: &str, offset: usize) -> Result<Condition> {
    let lead = raw.len() - raw.trim_start().len();
    let text = raw.trim();
    let offset = offset + lead;

    if let Some(inner) = unquote(text) {
        return Ok(Condition::Value(Value::String(inner.to_string())));
    }

    match call_parts(text, offset)? {
        Some((name, args_start, args)) => {
            let filter = parse_call(name, args, offset + args_start)?;
            Ok(Condition::Filter(filter))
        }
        None => Ok(Condition::Value(parse_literal(text))),
    }
}

/// Split `name(args)` into its name, argument offset and argument text.
fn call_parts(text: &str, offset: usize) -> Result<Option<(&str, usize, &str)>> {
    let Some(open) = text.find('(') else {
        return Ok(None);
    };
    let name = &text[..open];
    if !is_identifier(name) {
        return Ok(None);
    }

    let mut scanner = Scanner::default();
    let mut close = None;
    for (pos, c) in text.char_indices().skip_while(|&(p, _)| p < open) {
        if let Step::Close = scanner.step(pos, c, text)? {
            if scanner.depth() == 0 {
                close = Some(pos);
                break;
            }
        }
    }

    let Some(close) = close else {
        return Err(syntax_error(text, offset + open, "unmatched ( found"));
    };
    if close + 1 != text.len() {
        return Err(syntax_error(
            text,
            offset + close + 1,
            "unexpected text after closing parenthesis",
        ));
    }

    Ok(Some((name, open + 1, &text[open + 1..close])))
}

fn parse_call(name: &str, args: &str, offset: usize) -> Result<Filter> {
    let op = FilterOp::lookup(name);

    let mut operands = Vec::new();
    if !args.trim().is_empty() {
        for (start, arg) in split_args(args, offset)? {
            operands.push(Operand::from(parse_expr(arg, offset + start)?));
        }
    }

    let operand = if op.is_variadic() {
        Operand::List(operands)
    } else {
        match operands.len() {
            0 => Operand::Null,
            1 => operands.remove(0),
            _ => Operand::List(operands),
        }
    };

    Ok(Filter { op, operand })
}

fn split_args(args: &str, offset: usize) -> Result<Vec<(usize, &str)>> {
    let mut parts = Vec::new();
    let mut scanner = Scanner::default();
    let mut start = 0;

    for (pos, c) in args.char_indices() {
        let step = scanner.step(pos, c, args)?;
        if matches!(step, Step::Plain) && c == ',' && scanner.depth() == 0 {
            parts.push((start, &args[start..pos]));
            start = pos + 1;
        }
    }

    scanner.finish(args, offset)?;
    parts.push((start, &args[start..]));
    Ok(parts)
}

fn unquote(text: &str) -> Option<&str> {
    let first = text.chars().next()?;
    if (first == '"' || first == '\'') && text.len() >= 2 && text.ends_with(first) {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_literal(text: &str) -> Value {
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(i) = text.parse::<i64>() {
        return Value::Int(i);
    }
    if looks_numeric(text) {
        if let Ok(f) = text.parse::<f64>() {
            return Value::Float(f);
        }
    }

    Value::String(text.to_string())
}

fn looks_numeric(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+'))
}
