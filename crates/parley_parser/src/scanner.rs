//! Scanning raw command lines into arguments and tokens.
//!
//! Scanning happens in two phases. [`split_arguments`] cuts a line into raw
//! arguments on whitespace outside of delimiters, so `tag [a, b] "x y"` yields
//! three arguments. [`Scanner::scan`] then turns one raw argument into exactly
//! one [`Token`], recursing into collections and dictionaries and substituting
//! `${name}` properties.
//!
//! [`split_line`] is the forgiving form the engine uses: it records the first
//! delimiter problem instead of failing, so a remainder argument can still
//! take text such as `:]` verbatim.
//!
//! Every error carries the offending fragment and its byte position in the
//! original line.

use parley_foundation::{Error, PropertySource, Result};

use crate::token::Token;

/// One whitespace-separated argument of a command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawArgument {
    /// The argument text, delimiters included.
    pub text: String,
    /// Byte offset of the argument in the line.
    pub start: usize,
}

impl RawArgument {
    /// Byte offset one past the end of the argument.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// A line cut into raw arguments, with the first delimiter problem found.
///
/// Splitting never gives up: a stray closer is kept as an ordinary character
/// and an unterminated delimiter runs to the end of the line. Whether the
/// problem matters is decided later, since a remainder argument takes its
/// text verbatim.
#[derive(Debug)]
pub struct SplitLine {
    /// The raw arguments, command name included.
    pub args: Vec<RawArgument>,
    /// The first unbalanced or unterminated delimiter, if any.
    pub error: Option<Error>,
}

impl SplitLine {
    /// Byte position of the delimiter problem.
    #[must_use]
    pub fn error_position(&self) -> Option<usize> {
        self.error.as_ref().and_then(Error::scan_position)
    }

    /// The arguments, or the delimiter problem if there was one.
    ///
    /// # Errors
    ///
    /// Returns the recorded scan error.
    pub fn into_strict(self) -> Result<Vec<RawArgument>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.args),
        }
    }
}

/// Splits a line into raw arguments, recording rather than rejecting
/// delimiter problems.
///
/// Whitespace inside `"…"`, `[…]`, and `{…}` does not split.
#[must_use]
pub fn split_line(line: &str) -> SplitLine {
    let mut args = Vec::new();
    let mut error = None;
    let mut open: Vec<(char, usize)> = Vec::new();
    let mut quote_start: Option<usize> = None;
    let mut current_start: Option<usize> = None;

    for (i, c) in line.char_indices() {
        if quote_start.is_some() {
            if c == '"' {
                quote_start = None;
            }
            continue;
        }

        if c.is_whitespace() && open.is_empty() {
            if let Some(start) = current_start.take() {
                args.push(RawArgument {
                    text: line[start..i].to_owned(),
                    start,
                });
            }
            continue;
        }

        if current_start.is_none() {
            current_start = Some(i);
        }

        match c {
            '"' => quote_start = Some(i),
            '[' | '{' => open.push((c, i)),
            ']' | '}' => {
                let expected = if c == ']' { '[' } else { '{' };
                if open.last().is_some_and(|&(opener, _)| opener == expected) {
                    open.pop();
                } else if error.is_none() {
                    error = Some(Error::scan(format!("unexpected '{c}'"), &line[i..], i));
                }
            }
            _ => {}
        }
    }

    if error.is_none() {
        if let Some(pos) = quote_start {
            error = Some(Error::scan("unterminated '\"'", &line[pos..], pos));
        } else if let Some(&(opener, pos)) = open.first() {
            error = Some(Error::scan(
                format!("unterminated '{opener}'"),
                &line[pos..],
                pos,
            ));
        }
    }
    if let Some(start) = current_start {
        args.push(RawArgument {
            text: line[start..].to_owned(),
            start,
        });
    }

    SplitLine { args, error }
}

/// Splits a line into raw arguments.
///
/// Whitespace inside `"…"`, `[…]`, and `{…}` does not split. Brackets and
/// braces must balance and quotes must close.
///
/// # Errors
///
/// Returns a scan error naming the first unterminated delimiter, or a stray
/// or mismatched closing delimiter.
pub fn split_arguments(line: &str) -> Result<Vec<RawArgument>> {
    split_line(line).into_strict()
}

/// Scans one raw argument into a token.
pub struct Scanner<'src, 'p> {
    /// Argument text being scanned.
    source: &'src str,
    /// Remaining text.
    rest: &'src str,
    /// Current byte offset in `source`.
    position: usize,
    /// Byte offset of `source` in the full line.
    offset: usize,
    /// Table for `${name}` substitution.
    properties: &'p dyn PropertySource,
}

impl<'src, 'p> Scanner<'src, 'p> {
    /// Creates a scanner over `source`, which starts at byte `offset` of its line.
    #[must_use]
    pub fn new(source: &'src str, offset: usize, properties: &'p dyn PropertySource) -> Self {
        Self {
            source,
            rest: source,
            position: 0,
            offset,
            properties,
        }
    }

    /// Scans `source` into exactly one token.
    ///
    /// # Errors
    ///
    /// Returns a scan error for unterminated or unexpected delimiters, empty
    /// items, dictionary pairs without `:`, duplicate dictionary keys, unknown
    /// properties, and trailing text after a complete token.
    pub fn scan(source: &str, offset: usize, properties: &dyn PropertySource) -> Result<Token> {
        let mut scanner = Scanner::new(source, offset, properties);
        let token = scanner.scan_token(&[])?;
        scanner.skip_whitespace();
        if let Some(c) = scanner.peek_char() {
            return Err(scanner.error_here(format!(
                "unexpected '{c}' after {}",
                token.kind_name()
            )));
        }
        Ok(token)
    }

    /// Scans a raw argument produced by [`split_arguments`].
    ///
    /// # Errors
    ///
    /// See [`Scanner::scan`].
    pub fn scan_argument(arg: &RawArgument, properties: &dyn PropertySource) -> Result<Token> {
        Self::scan(&arg.text, arg.start, properties)
    }

    /// Scans the next token, stopping before any terminator at depth zero.
    fn scan_token(&mut self, terminators: &[char]) -> Result<Token> {
        self.skip_whitespace();
        match self.peek_char() {
            None => Err(self.error_here("expected a value")),
            Some('"') => self.scan_string(),
            Some('[') => self.scan_collection(),
            Some('{') => self.scan_dictionary(),
            Some('$') if self.peek_char_n(1) == Some('{') => self.scan_property(),
            Some(c) if terminators.contains(&c) => Err(self.error_here("expected a value")),
            Some(_) => self.scan_plain(terminators),
        }
    }

    fn scan_plain(&mut self, terminators: &[char]) -> Result<Token> {
        let start = self.position;
        while let Some(c) = self.peek_char() {
            if terminators.contains(&c) {
                break;
            }
            if matches!(c, '"' | '[' | ']' | '{' | '}') {
                return Err(self.error_here(format!("unexpected '{c}'")));
            }
            self.advance();
        }
        let text = self.source[start..self.position].trim_end();
        Ok(Token::Plain(text.to_owned()))
    }

    /// Scans a string literal. No escape processing.
    fn scan_string(&mut self) -> Result<Token> {
        let start = self.position;
        self.advance(); // consume opening '"'
        let body = self.position;
        loop {
            match self.peek_char() {
                Some('"') => {
                    let text = self.source[body..self.position].to_owned();
                    self.advance();
                    return Ok(Token::StringLiteral(text));
                }
                Some(_) => self.advance(),
                None => return Err(self.error_at("unterminated '\"'", start)),
            }
        }
    }

    fn scan_collection(&mut self) -> Result<Token> {
        let start = self.position;
        self.advance(); // consume '['
        let mut items = Vec::new();

        self.skip_whitespace();
        if self.peek_char() == Some(']') {
            self.advance();
            return Ok(Token::Collection(items));
        }

        loop {
            self.skip_whitespace();
            if self.peek_char().is_none() {
                return Err(self.error_at("unterminated '['", start));
            }
            items.push(self.scan_token(&[',', ']'])?);
            self.skip_whitespace();
            match self.peek_char() {
                Some(',') => self.advance(),
                Some(']') => {
                    self.advance();
                    return Ok(Token::Collection(items));
                }
                Some(c) => {
                    return Err(self.error_here(format!("expected ',' or ']', found '{c}'")));
                }
                None => return Err(self.error_at("unterminated '['", start)),
            }
        }
    }

    fn scan_dictionary(&mut self) -> Result<Token> {
        let start = self.position;
        self.advance(); // consume '{'
        let mut pairs: Vec<(Token, Token)> = Vec::new();

        self.skip_whitespace();
        if self.peek_char() == Some('}') {
            self.advance();
            return Ok(Token::Dictionary(pairs));
        }

        loop {
            self.skip_whitespace();
            if self.peek_char().is_none() {
                return Err(self.error_at("unterminated '{'", start));
            }

            let key_start = self.position;
            let key = self.scan_token(&[':', ',', '}'])?;
            self.skip_whitespace();
            match self.peek_char() {
                Some(':') => self.advance(),
                None => return Err(self.error_at("unterminated '{'", start)),
                Some(_) => return Err(self.error_here("expected ':' after dictionary key")),
            }

            let identity = key_identity(&key);
            if pairs.iter().any(|(k, _)| key_identity(k) == identity) {
                return Err(self.error_at(format!("duplicate key `{identity}`"), key_start));
            }

            let value = self.scan_token(&[',', '}'])?;
            pairs.push((key, value));

            self.skip_whitespace();
            match self.peek_char() {
                Some(',') => self.advance(),
                Some('}') => {
                    self.advance();
                    return Ok(Token::Dictionary(pairs));
                }
                Some(c) => {
                    return Err(self.error_here(format!("expected ',' or '}}', found '{c}'")));
                }
                None => return Err(self.error_at("unterminated '{'", start)),
            }
        }
    }

    /// Scans `${name}` and substitutes the property's value.
    fn scan_property(&mut self) -> Result<Token> {
        let start = self.position;
        self.advance(); // consume '$'
        self.advance(); // consume '{'
        let name_start = self.position;
        loop {
            match self.peek_char() {
                Some('}') => break,
                Some(_) => self.advance(),
                None => return Err(self.error_at("unterminated '${'", start)),
            }
        }
        let name = self.source[name_start..self.position].trim().to_owned();
        self.advance(); // consume '}'

        if name.is_empty() {
            return Err(self.error_at("empty property name", start));
        }
        match self.properties.resolve(&name) {
            Some(value) => Ok(Token::Property { name, value }),
            None => Err(self.error_at(format!("unknown property `{name}`"), start)),
        }
    }

    /// Peeks at the next character without consuming it.
    fn peek_char(&self) -> Option<char> {
        self.rest.chars().next()
    }

    /// Peeks at the character `n` positions ahead.
    fn peek_char_n(&self, n: usize) -> Option<char> {
        self.rest.chars().nth(n)
    }

    /// Advances past the next character.
    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            let len = c.len_utf8();
            self.rest = &self.rest[len..];
            self.position += len;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn error_here(&self, message: impl Into<String>) -> Error {
        let fragment = if self.rest.is_empty() {
            "end of input"
        } else {
            self.rest
        };
        Error::scan(message, fragment, self.offset + self.position)
    }

    fn error_at(&self, message: impl Into<String>, start: usize) -> Error {
        Error::scan(message, &self.source[start..], self.offset + start)
    }
}

/// The text a dictionary key is compared by when checking for duplicates.
fn key_identity(key: &Token) -> String {
    key.scalar_text()
        .map_or_else(|| key.to_string(), str::to_owned)
}
