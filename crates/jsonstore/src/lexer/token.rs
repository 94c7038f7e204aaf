use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Colon,
    Comma,
    String,
    Number,
    True,
    False,
    Null,
    /// A run of whitespace, only produced when blanks are kept.
    Blank,
    Eof,
    Error,
}

impl TokenKind {
    /// `true` for the states a lexer never leaves.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TokenKind::Eof | TokenKind::Error)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenKind::BeginObject => "'{'",
            TokenKind::EndObject => "'}'",
            TokenKind::BeginArray => "'['",
            TokenKind::EndArray => "']'",
            TokenKind::Colon => "':'",
            TokenKind::Comma => "','",
            TokenKind::String => "a string",
            TokenKind::Number => "a number",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Null => "'null'",
            TokenKind::Blank => "whitespace",
            TokenKind::Eof => "end of input",
            TokenKind::Error => "an invalid token",
        })
    }
}

/// A lexical unit borrowed from the lexer that produced it.
///
/// `raw` is the exact byte span consumed from the input. `text` is the decoded value: the
/// unescaped content for strings and the raw text for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub(crate) kind: TokenKind,
    pub(crate) offset: usize,
    pub(crate) raw: &'a [u8],
    pub(crate) text: &'a str,
    pub(crate) escaped: bool,
}

impl<'a> Token<'a> {
    pub(crate) fn terminal(kind: TokenKind, offset: usize) -> Token<'a> {
        Token {
            kind,
            offset,
            raw: &[],
            text: "",
            escaped: false,
        }
    }

    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Byte offset of the first byte of this token.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    #[must_use]
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Whether a string token contained escape sequences and was decoded into scratch space.
    #[must_use]
    pub fn is_escaped(&self) -> bool {
        self.escaped
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == TokenKind::Error
    }
}
