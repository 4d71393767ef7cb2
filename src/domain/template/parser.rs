// Template parser using recursive descent (RFC 6570 Level 4 syntax)

use super::ast::{Template, TemplatePart, VariableReference};
use super::expansion::Expansion;
use super::operator::Operator;
use crate::error::{Result, TemplateError};

/// Longest prefix modifier RFC 6570 allows (`max-length = %x31-39 0*3DIGIT`)
const MAX_PREFIX: u16 = 9999;

pub struct TemplateParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> TemplateParser<'a> {
    pub fn parse(template: &'a str) -> Result<Template> {
        let mut parser = Self {
            input: template,
            pos: 0,
        };
        parser.parse_template()
    }

    fn parse_template(&mut self) -> Result<Template> {
        let mut parts = Vec::new();
        let mut literal_buf = String::new();

        while let Some(ch) = self.peek_char() {
            match ch {
                '{' => {
                    // Start of expression - flush literal buffer first
                    if !literal_buf.is_empty() {
                        parts.push(TemplatePart::Literal(std::mem::take(&mut literal_buf)));
                    }
                    let expansion = self.parse_expression()?;
                    parts.push(TemplatePart::Expansion(expansion));
                }
                '}' => return Err(self.error("Unexpected closing brace")),
                '%' => {
                    literal_buf.push_str(self.parse_pct_encoded()?);
                }
                ch if is_literal_char(ch) => {
                    literal_buf.push(self.consume_char()?);
                }
                ch => {
                    return Err(self.error(format!("Invalid literal character '{}'", ch.escape_default())))
                }
            }
        }

        // Flush remaining literal
        if !literal_buf.is_empty() {
            parts.push(TemplatePart::Literal(literal_buf));
        }

        Ok(Template::new(parts))
    }

    fn parse_expression(&mut self) -> Result<Expansion> {
        let start = self.pos;
        self.expect_char('{')?;

        let operator = match self.peek_char() {
            Some(ch @ ('=' | ',' | '!' | '@' | '|')) => {
                return Err(self.error(format!("Operator '{}' is reserved", ch)))
            }
            Some('}') => return Err(self.error("Empty expression")),
            None => return Err(TemplateError::syntax(start, "Unterminated expression")),
            Some(ch) => match Operator::from_sigil(ch) {
                Some(operator) => {
                    self.consume_char()?;
                    operator
                }
                None => Operator::Simple,
            },
        };

        let mut variables = Vec::new();
        loop {
            variables.push(self.parse_varspec()?);
            match self.peek_char() {
                Some(',') => {
                    self.consume_char()?;
                }
                Some('}') => {
                    self.consume_char()?;
                    break;
                }
                Some(ch) => {
                    return Err(self.error(format!("Unexpected character '{}' in expression", ch)))
                }
                None => return Err(TemplateError::syntax(start, "Unterminated expression")),
            }
        }

        Expansion::new(operator, variables)
    }

    fn parse_varspec(&mut self) -> Result<VariableReference> {
        let name = self.parse_varname()?;
        let mut var = VariableReference::new(name);

        match self.peek_char() {
            Some(':') => {
                self.consume_char()?;
                var = var.with_prefix(self.parse_prefix()?);
            }
            Some('*') => {
                self.consume_char()?;
                var = var.with_composite(true);
            }
            _ => {}
        }

        // `{x:3*}` is not a valid varspec
        if let Some(ch @ (':' | '*')) = self.peek_char() {
            return Err(self.error(format!("Unexpected modifier '{}'", ch)));
        }

        Ok(var)
    }

    /// varname = varchar *( ["."] varchar ), varchar = ALPHA / DIGIT / "_" / pct-encoded
    fn parse_varname(&mut self) -> Result<String> {
        let mut name = String::new();
        let mut after_dot = false;

        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                name.push(self.consume_char()?);
                after_dot = false;
            } else if ch == '%' {
                name.push_str(self.parse_pct_encoded()?);
                after_dot = false;
            } else if ch == '.' && !name.is_empty() && !after_dot {
                name.push(self.consume_char()?);
                after_dot = true;
            } else {
                break;
            }
        }

        if name.is_empty() {
            return Err(match self.peek_char() {
                Some(ch) => self.error(format!("Invalid character '{}' in variable name", ch)),
                None => self.error("Expected variable name"),
            });
        }
        if after_dot {
            return Err(self.error("Variable name cannot end with '.'"));
        }

        Ok(name)
    }

    fn parse_prefix(&mut self) -> Result<u16> {
        let start = self.pos;
        let mut digits = String::new();

        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() && digits.len() < 5 {
                digits.push(self.consume_char()?);
            } else {
                break;
            }
        }

        if digits.is_empty() {
            return Err(self.error("Expected prefix length after ':'"));
        }
        if digits.starts_with('0') {
            return Err(TemplateError::syntax(start, "Prefix length cannot start with 0"));
        }

        match digits.parse::<u16>() {
            Ok(prefix) if prefix <= MAX_PREFIX => Ok(prefix),
            _ => Err(TemplateError::syntax(
                start,
                format!("Prefix length must be between 1 and {}", MAX_PREFIX),
            )),
        }
    }

    fn parse_pct_encoded(&mut self) -> Result<&'a str> {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        let valid = bytes.len() >= start + 3
            && bytes[start] == b'%'
            && bytes[start + 1].is_ascii_hexdigit()
            && bytes[start + 2].is_ascii_hexdigit();

        if !valid {
            return Err(self.error("Invalid percent-encoding"));
        }

        self.pos += 3;
        Ok(&self.input[start..start + 3])
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn consume_char(&mut self) -> Result<char> {
        let ch = self
            .peek_char()
            .ok_or_else(|| self.error("Unexpected end of input"))?;
        self.pos += ch.len_utf8();
        Ok(ch)
    }

    fn expect_char(&mut self, expected: char) -> Result<()> {
        match self.peek_char() {
            Some(ch) if ch == expected => {
                self.consume_char()?;
                Ok(())
            }
            Some(ch) => Err(self.error(format!("Expected '{}' but found '{}'", expected, ch))),
            None => Err(self.error(format!("Expected '{}' but found end of input", expected))),
        }
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::syntax(self.pos, message)
    }
}

/// Characters allowed verbatim outside expressions (RFC 6570 §2.1)
fn is_literal_char(ch: char) -> bool {
    !(ch.is_control()
        || ch.is_whitespace()
        || matches!(ch, '"' | '\'' | '<' | '>' | '\\' | '^' | '`' | '{' | '|' | '}' | '%'))
}
