use crate::error::ParseError;

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A maximal run of non-delimiter characters that is not a keyword.
    /// Quoted strings, dotted type names and option values all land here.
    Ident,

    Service,
    Rpc,
    Message,
    Syntax,
    Package,
    Import,
    Option,
    Extend,
    Returns,
    Stream,
    String,
    Uint32,
    Int32,
    Uint64,
    Int64,
    Bool,
    Bytes,
    Map,
    Repeated,
    Enum,
    Oneof,

    /// `//`
    Comment,
    /// `\n`
    Newline,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `.`
    Dot,
    /// `'`
    Tick,
    /// `=`
    Equal,
}

impl TokenKind {
    /// Exact, case-sensitive keyword lookup for an identifier's text.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        let kind = match text {
            "service" => TokenKind::Service,
            "rpc" => TokenKind::Rpc,
            "message" => TokenKind::Message,
            "syntax" => TokenKind::Syntax,
            "package" => TokenKind::Package,
            "import" => TokenKind::Import,
            "option" => TokenKind::Option,
            "extend" => TokenKind::Extend,
            "returns" => TokenKind::Returns,
            "stream" => TokenKind::Stream,
            "string" => TokenKind::String,
            "uint32" => TokenKind::Uint32,
            "int32" => TokenKind::Int32,
            "uint64" => TokenKind::Uint64,
            "int64" => TokenKind::Int64,
            "bool" => TokenKind::Bool,
            "bytes" => TokenKind::Bytes,
            "map" => TokenKind::Map,
            "repeated" => TokenKind::Repeated,
            "enum" => TokenKind::Enum,
            "oneof" => TokenKind::Oneof,
            _ => return None,
        };
        Some(kind)
    }

    /// Declarations that are recognized but not modeled: the rest of their
    /// line is skipped.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            TokenKind::Syntax | TokenKind::Package | TokenKind::Option | TokenKind::Extend
        )
    }

    /// Built-in scalar datatype keywords.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TokenKind::String
                | TokenKind::Uint32
                | TokenKind::Int32
                | TokenKind::Uint64
                | TokenKind::Int64
                | TokenKind::Bool
                | TokenKind::Bytes
        )
    }
}

/// A token with its text and source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub line: usize,
}

/// Tokenizer for proto source text.
///
/// Produces tokens lazily through [`Iterator`]; after the first error the
/// iterator is exhausted.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    failed: bool,
}

fn is_ident_start(b: u8) -> bool {
    is_ident_continue(b) || b == b','
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'"' | b'_' | b'-' | b'[' | b']' | b'|' | b'+' | b'&' | b':' | b'/' | b'.'
        )
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            line: 1,
            failed: false,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_ignored(&mut self) {
        while let Some(b' ' | b'\t' | b'\r') = self.peek_byte() {
            self.pos += 1;
        }
    }

    fn emit(&mut self, kind: TokenKind, len: usize) -> Token<'a> {
        let text = &self.input[self.pos..self.pos + len];
        let tok = Token {
            kind,
            text,
            line: self.line,
        };
        self.pos += len;
        if kind == TokenKind::Newline {
            self.line += 1;
        }
        tok
    }

    fn read_ident(&mut self) -> Token<'a> {
        let bytes = self.input.as_bytes();
        let mut end = self.pos + 1;
        while end < bytes.len() && is_ident_continue(bytes[end]) {
            end += 1;
        }
        let text = &self.input[self.pos..end];
        let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Ident);
        self.emit(kind, end - self.pos)
    }

    /// Read the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        self.skip_ignored();

        let b = match self.peek_byte() {
            None => return Ok(None),
            Some(b) => b,
        };

        let punct = match b {
            b'/' if self.input.as_bytes().get(self.pos + 1) == Some(&b'/') => {
                return Ok(Some(self.emit(TokenKind::Comment, 2)));
            }
            b'\n' => Some(TokenKind::Newline),
            b'{' => Some(TokenKind::LBrace),
            b'}' => Some(TokenKind::RBrace),
            b'(' => Some(TokenKind::LParen),
            b')' => Some(TokenKind::RParen),
            b'<' => Some(TokenKind::Less),
            b'>' => Some(TokenKind::Greater),
            b',' => Some(TokenKind::Comma),
            b';' => Some(TokenKind::Semicolon),
            b'.' => Some(TokenKind::Dot),
            b'\'' => Some(TokenKind::Tick),
            b'=' => Some(TokenKind::Equal),
            _ => None,
        };

        if let Some(kind) = punct {
            return Ok(Some(self.emit(kind, 1)));
        }

        if is_ident_start(b) {
            return Ok(Some(self.read_ident()));
        }

        let ch = self.input[self.pos..].chars().next().unwrap_or(b as char);
        Err(ParseError::Lex {
            line: self.line,
            ch,
        })
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_token() {
            Ok(tok) => tok.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Tokenize a whole source string eagerly.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, ParseError> {
    Lexer::new(input).collect()
}
