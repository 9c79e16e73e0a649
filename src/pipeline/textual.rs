//! Textual form of a pipeline: an ordered list literal of `(name, args)` pairs.
//!
//! ```text
//! [('Crop', (0.0, 10.0, -5.0, 5.0)), ('Smooth', (1.0, 1.0)), ('Flip', (True,))]
//! ```
//!
//! Names may use single or double quotes. Numbers with a decimal point or
//! exponent (and `inf`/`nan`) are floats, other numbers are integers, and
//! `True`/`False` are booleans. Trailing commas are accepted.

use thiserror::Error;

use super::mods::{args_literal, ModArg};
use super::PipelineEntry;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("pipeline text, offset {position}: {reason}")]
pub struct ParseError {
    pub position: usize,
    pub reason: String,
}

/// Render entries in the textual form.
pub fn format_entries(entries: &[PipelineEntry]) -> String {
    let parts: Vec<String> = entries
        .iter()
        .map(|e| format!("({}, {})", quote(&e.kind), args_literal(&e.args)))
        .collect();
    format!("[{}]", parts.join(", "))
}

fn quote(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('\'');
    for c in name.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Parse the textual form. Anything that is not a well-formed list of
/// `(name, args)` pairs is an error; an empty list `[]` is the only way to
/// spell an empty pipeline.
pub fn parse_entries(text: &str) -> Result<Vec<PipelineEntry>, ParseError> {
    let mut parser = Parser::new(text);
    parser.skip_ws();
    let entries = parser.entry_list()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(entries)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> ParseError {
        ParseError {
            position: self.pos,
            reason: reason.into(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<(), ParseError> {
        match self.peek() {
            Some(got) if got == c => {
                self.pos += 1;
                Ok(())
            }
            Some(got) => Err(self.error(format!("expected '{}', found '{}'", c, got))),
            None => Err(self.error(format!("expected '{}', found end of input", c))),
        }
    }

    /// Parse `open item (, item)* [,] close` where `item` is produced by `f`.
    fn sequence<T>(
        &mut self,
        open: char,
        close: char,
        mut f: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(f(self)?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(c) => {
                    return Err(self.error(format!("expected ',' or '{}', found '{}'", close, c)))
                }
                None => return Err(self.error(format!("unterminated sequence, expected '{}'", close))),
            }
        }
    }

    fn entry_list(&mut self) -> Result<Vec<PipelineEntry>, ParseError> {
        match self.peek() {
            Some('[') => self.sequence('[', ']', Self::entry),
            Some(c) => Err(self.error(format!("expected '[' to start the pipeline, found '{}'", c))),
            None => Err(self.error("empty pipeline text")),
        }
    }

    fn entry(&mut self) -> Result<PipelineEntry, ParseError> {
        let start = self.pos;
        self.expect('(')?;
        self.skip_ws();
        let kind = self.string()?;
        if kind.is_empty() {
            return Err(ParseError {
                position: start,
                reason: "mod name is empty".to_string(),
            });
        }
        self.skip_ws();
        self.expect(',')?;
        self.skip_ws();
        let args = self.args()?;
        self.skip_ws();
        if self.peek() == Some(',') {
            self.pos += 1;
            self.skip_ws();
        }
        self.expect(')')?;
        Ok(PipelineEntry { kind, args })
    }

    fn args(&mut self) -> Result<Vec<ModArg>, ParseError> {
        match self.peek() {
            Some('(') => self.sequence('(', ')', Self::value),
            Some('[') => self.sequence('[', ']', Self::value),
            Some(_) => Err(self.error("expected an argument tuple")),
            None => Err(self.error("expected an argument tuple, found end of input")),
        }
    }

    fn string(&mut self) -> Result<String, ParseError> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted mod name")),
        };
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => {
                            out.push(c);
                            self.pos += 1;
                        }
                        None => return Err(self.error("unterminated string")),
                    }
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn value(&mut self) -> Result<ModArg, ParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-' | '_')) {
            self.pos += 1;
        }
        let token: String = self.chars[start..self.pos].iter().collect();
        let bad = |reason: String| ParseError {
            position: start,
            reason,
        };
        if token.is_empty() {
            return Err(bad(match self.peek() {
                Some(c) => format!("expected a value, found '{}'", c),
                None => "expected a value, found end of input".to_string(),
            }));
        }

        match token.as_str() {
            "True" => return Ok(ModArg::Bool(true)),
            "False" => return Ok(ModArg::Bool(false)),
            _ => {}
        }
        let unsigned = token.trim_start_matches(['+', '-']);
        let is_float = token.contains(['.', 'e', 'E'])
            || unsigned.eq_ignore_ascii_case("inf")
            || unsigned.eq_ignore_ascii_case("nan");
        if is_float {
            token
                .parse::<f64>()
                .map(ModArg::Float)
                .map_err(|_| bad(format!("'{}' is not a number", token)))
        } else {
            token
                .parse::<i64>()
                .map(ModArg::Int)
                .map_err(|_| bad(format!("'{}' is not a number", token)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: &str, args: Vec<ModArg>) -> PipelineEntry {
        PipelineEntry {
            kind: kind.to_string(),
            args,
        }
    }

    #[test]
    fn test_parse_reference_form() {
        let text = "[('Crop', (0.0, 10.0, -5.0, 5.0)), ('Smooth', (1.0, 1.0))]";
        let entries = parse_entries(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, "Crop");
        assert_eq!(
            entries[0].args,
            vec![
                ModArg::Float(0.0),
                ModArg::Float(10.0),
                ModArg::Float(-5.0),
                ModArg::Float(5.0)
            ]
        );
        assert_eq!(entries[1], entry("Smooth", vec![ModArg::Float(1.0), ModArg::Float(1.0)]));
    }

    #[test]
    fn test_parse_mixed_values() {
        let text = r#"[ ("Flip", (True,)), ('AdaptiveThreshold', (11, -0.05),), ('Log', ()), ('Scale', [2e3]) , ]"#;
        let entries = parse_entries(text).unwrap();
        assert_eq!(entries[0], entry("Flip", vec![ModArg::Bool(true)]));
        assert_eq!(
            entries[1],
            entry("AdaptiveThreshold", vec![ModArg::Int(11), ModArg::Float(-0.05)])
        );
        assert_eq!(entries[2], entry("Log", vec![]));
        assert_eq!(entries[3], entry("Scale", vec![ModArg::Float(2000.0)]));
    }

    #[test]
    fn test_empty_list() {
        assert!(parse_entries("[]").unwrap().is_empty());
        assert!(parse_entries("  [ ]\n").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_text_is_an_error() {
        for text in [
            "",
            "   ",
            "[('Crop', (1.0, 2.0)",
            "[('Crop' (1.0,))]",
            "[(Crop, (1.0,))]",
            "[('Crop', 1.0)]",
            "[('Scale', (two,))]",
            "[('Scale', (1.0,))] trailing",
            "{'Scale': (1.0,)}",
            "[('', ())]",
        ] {
            assert!(parse_entries(text).is_err(), "accepted malformed text {:?}", text);
        }
    }

    #[test]
    fn test_error_position() {
        let err = parse_entries("[('Scale', (1.0; 2.0))]").unwrap_err();
        assert_eq!(err.position, 15);
    }

    #[test]
    fn test_format_then_parse() {
        let entries = vec![
            entry("Crop", vec![ModArg::Float(0.5), ModArg::Float(9.25), ModArg::Float(-1e-9), ModArg::Float(3.0)]),
            entry("Rotate", vec![ModArg::Bool(false)]),
            entry("AdaptiveThreshold", vec![ModArg::Int(7), ModArg::Float(0.1)]),
            entry("Derive", vec![]),
            entry("Scale", vec![ModArg::Float(f64::INFINITY)]),
        ];
        let text = format_entries(&entries);
        assert!(text.starts_with("[('Crop', (0.5, 9.25, -1e-9, 3.0)), ('Rotate', (False,))"));
        assert_eq!(parse_entries(&text).unwrap(), entries);
    }

    #[test]
    fn test_quoted_names_escape() {
        let entries = vec![entry("it's", vec![])];
        let text = format_entries(&entries);
        assert_eq!(text, r"[('it\'s', ())]");
        assert_eq!(parse_entries(&text).unwrap(), entries);
    }
}
