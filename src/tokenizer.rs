use crate::source_location::{SourceLocation, SourceSpan};
use crate::string_interner::{StringInterner, Symbol};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Token {
    pub span: SourceSpan,
    pub kind: TokenKind,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    // Declarations
    KeywordPackage,
    KeywordImport,
    KeywordConst,
    KeywordVar,
    KeywordType,
    KeywordFunc,

    // Type constructors
    KeywordStruct,
    KeywordInterface,
    KeywordMap,
    KeywordChan,

    Identifier(Symbol),

    // Literal text is kept verbatim, except for strings which are unquoted.
    IntLiteral(Symbol),
    FloatLiteral(Symbol),
    ImaginaryLiteral(Symbol),
    RuneLiteral(Symbol),
    StringLiteral(Symbol),

    BraceOpen,
    BraceClose,

    ParenOpen,
    ParenClose,

    BracketOpen,
    BracketClose,

    Semicolon,
    Colon,

    Comma,
    Period,
    Ellipsis,

    Star,
    Arrow,
    Tilde,
    EqualSign,

    Operator(&'static str),

    Invalid(char),
}

impl From<TokenKind> for &'static str {
    fn from(kind: TokenKind) -> &'static str {
        use TokenKind::*;

        match kind {
            KeywordPackage => "package",
            KeywordImport => "import",
            KeywordConst => "const",
            KeywordVar => "var",
            KeywordType => "type",
            KeywordFunc => "func",
            KeywordStruct => "struct",
            KeywordInterface => "interface",
            KeywordMap => "map",
            KeywordChan => "chan",
            Identifier(_) => "identifier",
            IntLiteral(_) => "integer literal",
            FloatLiteral(_) => "float literal",
            ImaginaryLiteral(_) => "imaginary literal",
            RuneLiteral(_) => "rune literal",
            StringLiteral(_) => "string literal",
            BraceOpen => "{",
            BraceClose => "}",
            ParenOpen => "(",
            ParenClose => ")",
            BracketOpen => "[",
            BracketClose => "]",
            Semicolon => ";",
            Colon => ":",
            Comma => ",",
            Period => ".",
            Ellipsis => "...",
            Star => "*",
            Arrow => "<-",
            Tilde => "~",
            EqualSign => "=",
            Operator(op) => op,
            Invalid(_) => "invalid character",
        }
    }
}

// Longest operators first so that prefix matching picks the longest one.
const OPERATORS: &[&str] = &[
    "<<=", ">>=", "&^=", "&&", "||", "<-", "++", "--", "==", "!=", "<=", ">=", ":=", "<<", ">>",
    "&^", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "+", "-", "*", "/", "%", "&", "|", "^",
    "<", ">", "=", "!", "~", ":",
];

enum Trivia {
    Newline(SourceLocation),
    UnterminatedComment(SourceLocation),
}

pub struct Tokenizer<'a> {
    source: &'a str,
    loc: SourceLocation,
    str_interner: &'a mut StringInterner,

    // Set after a token that ends a statement when followed by a newline.
    insert_semicolon: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str, str_interner: &'a mut StringInterner) -> Self {
        Tokenizer {
            source,
            loc: SourceLocation::start(),
            str_interner,
            insert_semicolon: false,
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.loc.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<(SourceLocation, char)> {
        let c = self.peek()?;

        let loc = self.loc;

        if c == '\n' {
            self.loc.line += 1;
            self.loc.col = 1;
        } else {
            self.loc.col += 1;
        }

        self.loc.offset += c.len_utf8();

        Some((loc, c))
    }

    fn read_while<P: Fn(char) -> bool>(&mut self, predicate: P) -> SourceLocation {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }

            self.advance();
        }

        self.loc
    }

    fn skip_trivia(&mut self) -> Option<Trivia> {
        loop {
            let rest = self.rest();

            if rest.starts_with("//") {
                self.read_while(|c| c != '\n');
            } else if rest.starts_with("/*") {
                let start = self.loc;
                self.advance();
                self.advance();

                let mut crossed_newline = false;
                loop {
                    if self.rest().starts_with("*/") {
                        self.advance();
                        self.advance();
                        break;
                    }

                    match self.advance() {
                        Some((_, '\n')) => crossed_newline = true,
                        Some(_) => {}
                        None => return Some(Trivia::UnterminatedComment(start)),
                    }
                }

                if crossed_newline && self.insert_semicolon {
                    self.insert_semicolon = false;
                    return Some(Trivia::Newline(start));
                }
            } else {
                match self.peek() {
                    Some('\n') if self.insert_semicolon => {
                        let (loc, _) = self.advance()?;
                        self.insert_semicolon = false;
                        return Some(Trivia::Newline(loc));
                    }
                    Some(c) if c.is_whitespace() => {
                        self.advance();
                    }
                    _ => return None,
                }
            }
        }
    }

    fn read_number(&mut self, start: SourceLocation) -> TokenKind {
        let is_hex = self.rest().starts_with("0x") || self.rest().starts_with("0X");

        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, '+' | '-')
                && if is_hex {
                    matches!(prev, 'p' | 'P')
                } else {
                    matches!(prev, 'e' | 'E')
                };

            if !(c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign) {
                break;
            }

            prev = c;
            self.advance();
        }

        let text = &self.source[start.offset..self.loc.offset];
        let sym = self.str_interner.add(text);

        let lower = text.to_ascii_lowercase();
        let is_float = if is_hex {
            lower.contains('.') || lower.contains('p')
        } else if lower.starts_with("0b") || lower.starts_with("0o") {
            false
        } else {
            lower.contains('.') || lower.contains('e')
        };

        if text.ends_with('i') {
            TokenKind::ImaginaryLiteral(sym)
        } else if is_float {
            TokenKind::FloatLiteral(sym)
        } else {
            TokenKind::IntLiteral(sym)
        }
    }

    // Reads an interpreted string or rune literal. The opening quote has been
    // consumed already.
    fn read_quoted(&mut self, quote: char) -> Option<String> {
        let mut contents = String::new();

        loop {
            let (_, c) = self.advance()?;

            match c {
                '\n' => return None,
                '\\' => {
                    let (_, escaped) = self.advance()?;
                    match escaped {
                        'n' => contents.push('\n'),
                        't' => contents.push('\t'),
                        'r' => contents.push('\r'),
                        'a' => contents.push('\u{07}'),
                        'b' => contents.push('\u{08}'),
                        'f' => contents.push('\u{0c}'),
                        'v' => contents.push('\u{0b}'),
                        '\\' | '"' | '\'' => contents.push(escaped),
                        other => {
                            contents.push('\\');
                            contents.push(other);
                        }
                    }
                }
                _ if c == quote => return Some(contents),
                _ => contents.push(c),
            }
        }
    }

    fn read_raw_string(&mut self) -> Option<String> {
        let mut contents = String::new();

        loop {
            match self.advance()? {
                (_, '`') => return Some(contents),
                (_, '\r') => {}
                (_, c) => contents.push(c),
            }
        }
    }
}

fn is_identifier_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_rest_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        match self.skip_trivia() {
            Some(Trivia::Newline(loc)) => {
                return Some(Token {
                    span: SourceSpan::single(loc),
                    kind: TokenKind::Semicolon,
                });
            }
            Some(Trivia::UnterminatedComment(start)) => {
                self.insert_semicolon = false;
                return Some(Token {
                    span: SourceSpan {
                        start,
                        end: self.loc,
                    },
                    kind: TokenKind::Invalid('/'),
                });
            }
            None => {}
        }

        let start = self.loc;

        let Some(c) = self.peek() else {
            // The last line of a file gets a semicolon as well.
            if self.insert_semicolon {
                self.insert_semicolon = false;
                return Some(Token {
                    span: SourceSpan::single(start),
                    kind: TokenKind::Semicolon,
                });
            }

            return None;
        };

        let starts_number = c.is_ascii_digit()
            || (c == '.' && self.rest()[1..].starts_with(|d: char| d.is_ascii_digit()));

        #[rustfmt::skip]
        let kind = if starts_number {
            self.read_number(start)
        } else if let Some(op) = OPERATORS.iter().copied().find(|op| self.rest().starts_with(op)) {
            for _ in op.chars() {
                self.advance();
            }

            match op {
                "*"  => TokenKind::Star,
                "<-" => TokenKind::Arrow,
                "~"  => TokenKind::Tilde,
                "="  => TokenKind::EqualSign,
                ":"  => TokenKind::Colon,
                _    => TokenKind::Operator(op),
            }
        } else {
            self.advance();

            match c {
                // Identifier or keyword.
                _ if is_identifier_start_char(c) => {
                    let end = self.read_while(is_identifier_rest_char);
                    let identifier = &self.source[start.offset..end.offset];

                    match identifier {
                        "package"   => TokenKind::KeywordPackage,
                        "import"    => TokenKind::KeywordImport,
                        "const"     => TokenKind::KeywordConst,
                        "var"       => TokenKind::KeywordVar,
                        "type"      => TokenKind::KeywordType,
                        "func"      => TokenKind::KeywordFunc,
                        "struct"    => TokenKind::KeywordStruct,
                        "interface" => TokenKind::KeywordInterface,
                        "map"       => TokenKind::KeywordMap,
                        "chan"      => TokenKind::KeywordChan,
                        _ => TokenKind::Identifier(self.str_interner.add(identifier)),
                    }
                }

                '"' => match self.read_quoted('"') {
                    Some(s) => TokenKind::StringLiteral(self.str_interner.add(&s)),
                    None => TokenKind::Invalid('"'),
                },
                '`' => match self.read_raw_string() {
                    Some(s) => TokenKind::StringLiteral(self.str_interner.add(&s)),
                    None => TokenKind::Invalid('`'),
                },
                '\'' => match self.read_quoted('\'') {
                    Some(_) => {
                        let text = &self.source[start.offset..self.loc.offset];
                        TokenKind::RuneLiteral(self.str_interner.add(text))
                    }
                    None => TokenKind::Invalid('\''),
                },

                '.' => {
                    if self.rest().starts_with("..") {
                        self.advance();
                        self.advance();
                        TokenKind::Ellipsis
                    } else {
                        TokenKind::Period
                    }
                }

                ';' => TokenKind::Semicolon,
                ',' => TokenKind::Comma,

                '(' => TokenKind::ParenOpen,
                ')' => TokenKind::ParenClose,
                '{' => TokenKind::BraceOpen,
                '}' => TokenKind::BraceClose,
                '[' => TokenKind::BracketOpen,
                ']' => TokenKind::BracketClose,

                _ => TokenKind::Invalid(c),
            }
        };

        self.insert_semicolon = matches!(
            kind,
            TokenKind::Identifier(_)
                | TokenKind::IntLiteral(_)
                | TokenKind::FloatLiteral(_)
                | TokenKind::ImaginaryLiteral(_)
                | TokenKind::RuneLiteral(_)
                | TokenKind::StringLiteral(_)
                | TokenKind::ParenClose
                | TokenKind::BracketClose
                | TokenKind::BraceClose
                | TokenKind::Operator("++")
                | TokenKind::Operator("--")
        );

        Some(Token {
            span: SourceSpan {
                start,
                end: self.loc,
            },
            kind,
        })
    }
}
