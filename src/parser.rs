use crate::ast::*;
use crate::source_location::{SourceLocation, SourceSpan};
use crate::string_interner::StringInterner;
use crate::tokenizer::{Token, TokenKind, Tokenizer};
use thiserror::Error;

type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected end of source during parsing")]
    UnexpectedEnd,
    #[error("unexpected token \"{1}\" at {}:{}", .0.start.line, .0.start.col)]
    UnexpectedToken(SourceSpan, &'static str),
    #[error("unbalanced \"{1}\" at {}:{}", .0.start.line, .0.start.col)]
    UnbalancedDelimiter(SourceSpan, &'static str),
}

/// Parses the type declarations of a Go source file. Everything that is not a
/// top-level `type` declaration is skipped over, only keeping track of
/// delimiter nesting.
pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    last_span: SourceSpan,
}

macro_rules! expect_token {
    // The pattern matching code for `pattern` is taken from:
    // https://doc.rust-lang.org/src/core/macros/mod.rs.html#342
    ($token:expr, $(|)? $( $pattern:pat_param )|+ $( if $guard: expr )? $(,)?) => {
        if let Some(tok) = $token {
            let token_matches_pattern = matches!(tok.kind, $( $pattern )|+ $( if $guard )?);
            if !token_matches_pattern {
                Err(ParseError::UnexpectedToken(tok.span, tok.kind.into()))
            } else {
                Ok(tok)
            }
        } else {
            Err(ParseError::UnexpectedEnd)
        }
    };
}

fn closing_delimiter(open: TokenKind) -> Option<TokenKind> {
    match open {
        TokenKind::BraceOpen => Some(TokenKind::BraceClose),
        TokenKind::ParenOpen => Some(TokenKind::ParenClose),
        TokenKind::BracketOpen => Some(TokenKind::BracketClose),
        _ => None,
    }
}

fn is_closing_delimiter(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::BraceClose | TokenKind::ParenClose | TokenKind::BracketClose
    )
}

fn starts_type(kind: TokenKind) -> bool {
    use TokenKind::*;

    matches!(
        kind,
        Identifier(_)
            | Star
            | BracketOpen
            | ParenOpen
            | Arrow
            | KeywordMap
            | KeywordChan
            | KeywordFunc
            | KeywordStruct
            | KeywordInterface
    )
}

impl Parser<'_> {
    pub fn new<'a>(source: &'a str, string_interner: &mut StringInterner) -> Parser<'a> {
        Parser {
            source,
            tokens: Tokenizer::new(source, string_interner).collect(),
            pos: 0,
            last_span: SourceSpan::single(SourceLocation::start()),
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_nth(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.pos + n).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.peek()?;
        self.pos += 1;
        self.last_span = tok.span;
        Some(tok)
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek().map_or(false, |tok| tok.kind == kind)
    }

    pub fn parse_declarations(&mut self) -> Result<Vec<Declaration>> {
        use TokenKind::*;

        let mut declarations = Vec::new();
        let mut open_delimiters: Vec<Token> = Vec::new();

        while let Some(tok) = self.peek() {
            match tok.kind {
                KeywordType if open_delimiters.is_empty() => {
                    self.next();
                    self.parse_type_declaration(&mut declarations)?;
                }
                BraceOpen | ParenOpen | BracketOpen => {
                    self.next();
                    open_delimiters.push(tok);
                }
                kind if is_closing_delimiter(kind) => {
                    self.next();
                    let open = open_delimiters.pop();
                    if open.and_then(|open| closing_delimiter(open.kind)) != Some(kind) {
                        return Err(ParseError::UnbalancedDelimiter(tok.span, kind.into()));
                    }
                }
                Invalid(_) => return Err(ParseError::UnexpectedToken(tok.span, tok.kind.into())),
                _ => {
                    self.next();
                }
            }
        }

        if let Some(open) = open_delimiters.pop() {
            return Err(ParseError::UnbalancedDelimiter(open.span, open.kind.into()));
        }

        Ok(declarations)
    }

    /// Parses a single type expression that must span the whole input.
    pub fn parse_type_expression(&mut self) -> Result<TypeExpr> {
        let ty = self.parse_type()?;

        while self.peek_is(TokenKind::Semicolon) {
            self.next();
        }

        if let Some(tok) = self.peek() {
            return Err(ParseError::UnexpectedToken(tok.span, tok.kind.into()));
        }

        Ok(ty)
    }

    fn parse_name(&mut self) -> Result<Name> {
        use TokenKind::*;

        let name_token = expect_token!(self.next(), Identifier(_))?;

        let Identifier(sym) = name_token.kind else {
            unreachable!()
        };

        Ok(Name {
            span: name_token.span,
            sym,
        })
    }

    fn parse_type_declaration(&mut self, declarations: &mut Vec<Declaration>) -> Result<()> {
        use TokenKind::*;

        if !self.peek_is(ParenOpen) {
            declarations.push(self.parse_type_spec()?);
            return Ok(());
        }

        // Grouped declaration: type ( A int; B struct { ... } )
        self.next();

        loop {
            let tok = expect_token!(self.peek(), _)?;
            match tok.kind {
                Semicolon => {
                    self.next();
                }
                ParenClose => {
                    self.next();
                    break;
                }
                _ => {
                    declarations.push(self.parse_type_spec()?);
                    expect_token!(self.peek(), Semicolon | ParenClose)?;
                }
            }
        }

        Ok(())
    }

    fn parse_type_spec(&mut self) -> Result<Declaration> {
        use TokenKind::*;

        let name = self.parse_name()?;

        let generic = self.at_type_parameters();
        if generic {
            let open = expect_token!(self.next(), BracketOpen)?;
            self.skip_balanced(open)?;
        }

        let alias = self.peek_is(EqualSign);
        if alias {
            self.next();
        }

        let kind = if self.peek_is(KeywordStruct) {
            DeclarationKind::Record(self.parse_struct_fields()?)
        } else {
            DeclarationKind::Other(self.parse_type()?)
        };

        Ok(Declaration {
            name,
            generic,
            alias,
            kind,
        })
    }

    // `type A[N]int` is an array type while `type A[T any] struct{}` declares a
    // type parameter. A parameter name is always followed by its constraint
    // or by a comma, a length expression by an operator or by `]`.
    fn at_type_parameters(&self) -> bool {
        use TokenKind::*;

        let (Some(open), Some(first), Some(second)) =
            (self.peek(), self.peek_nth(1), self.peek_nth(2))
        else {
            return false;
        };

        open.kind == BracketOpen
            && matches!(first.kind, Identifier(_))
            && matches!(
                second.kind,
                Identifier(_)
                    | Comma
                    | Tilde
                    | BracketOpen
                    | KeywordInterface
                    | KeywordFunc
                    | KeywordMap
                    | KeywordChan
                    | KeywordStruct
            )
    }

    fn parse_struct_fields(&mut self) -> Result<Vec<FieldDecl>> {
        use TokenKind::*;

        expect_token!(self.next(), KeywordStruct)?;
        expect_token!(self.next(), BraceOpen)?;

        let mut fields = Vec::new();

        loop {
            let tok = expect_token!(self.peek(), _)?;
            match tok.kind {
                Semicolon => {
                    self.next();
                }
                BraceClose => {
                    self.next();
                    break;
                }
                _ => {
                    fields.push(self.parse_field()?);
                    expect_token!(self.peek(), Semicolon | BraceClose)?;
                }
            }
        }

        Ok(fields)
    }

    fn parse_field(&mut self) -> Result<FieldDecl> {
        use TokenKind::*;

        let first = expect_token!(self.peek(), Identifier(_) | Star)?;

        let (names, ty, embedded) = if let Identifier(sym) = first.kind {
            self.next();
            let first_name = Name {
                span: first.span,
                sym,
            };

            let tok = expect_token!(self.peek(), _)?;
            match tok.kind {
                // Embedded `T` with or without a tag.
                Semicolon | BraceClose | StringLiteral(_) => {
                    let ty = TypeExpr {
                        span: first.span,
                        kind: TypeExprKind::Identifier(sym),
                    };
                    (vec![first_name], ty, true)
                }
                // Embedded `pkg.T`
                Period => {
                    self.next();
                    let selected = self.parse_name()?;
                    let ty = self.finish_named_type(
                        first.span,
                        TypeExprKind::Qualified {
                            package: sym,
                            name: selected.sym,
                        },
                    )?;
                    (vec![selected], ty, true)
                }
                // Embedded `T[A, B]`
                BracketOpen if self.at_embedded_instance() => {
                    let ty = self.finish_named_type(first.span, TypeExprKind::Identifier(sym))?;
                    (vec![first_name], ty, true)
                }
                _ => {
                    let mut names = vec![first_name];
                    while self.peek_is(Comma) {
                        self.next();
                        names.push(self.parse_name()?);
                    }

                    (names, self.parse_type()?, false)
                }
            }
        } else {
            // Embedded `*T` or `*pkg.T`
            let ty = self.parse_type()?;
            let name = match &ty.kind {
                TypeExprKind::Pointer(inner) => match inner.kind {
                    TypeExprKind::Identifier(sym) => Name {
                        span: inner.span,
                        sym,
                    },
                    TypeExprKind::Qualified { name, .. } => Name {
                        span: inner.span,
                        sym: name,
                    },
                    _ => return Err(ParseError::UnexpectedToken(inner.span, "embedded type")),
                },
                _ => unreachable!("a field starting with `*` parses as a pointer"),
            };
            (vec![name], ty, true)
        };

        let tag = match self.peek() {
            Some(Token {
                kind: StringLiteral(sym),
                ..
            }) => {
                self.next();
                Some(sym)
            }
            _ => None,
        };

        Ok(FieldDecl {
            names,
            ty,
            tag,
            embedded,
        })
    }

    // In a struct body `List[int]` embeds a generic instance while `Buf [4]byte`
    // declares an array field. Only the former ends the field after its `]`.
    fn at_embedded_instance(&self) -> bool {
        use TokenKind::*;

        let mut depth = 0usize;

        for (i, tok) in self.tokens[self.pos..].iter().enumerate() {
            match tok.kind {
                BraceOpen | ParenOpen | BracketOpen => depth += 1,
                kind if is_closing_delimiter(kind) => {
                    let Some(remaining) = depth.checked_sub(1) else {
                        return false;
                    };
                    depth = remaining;

                    if depth == 0 {
                        return matches!(
                            self.peek_nth(i + 1).map(|tok| tok.kind),
                            Some(Semicolon | BraceClose | StringLiteral(_))
                        );
                    }
                }
                _ => {}
            }
        }

        false
    }

    fn parse_type(&mut self) -> Result<TypeExpr> {
        use TokenKind::*;

        let tok = expect_token!(self.next(), _)?;

        let kind = match tok.kind {
            Identifier(sym) => {
                if self.peek_is(Period) {
                    self.next();
                    let selected = self.parse_name()?;
                    return self.finish_named_type(
                        tok.span,
                        TypeExprKind::Qualified {
                            package: sym,
                            name: selected.sym,
                        },
                    );
                }

                return self.finish_named_type(tok.span, TypeExprKind::Identifier(sym));
            }
            Star => TypeExprKind::Pointer(self.parse_type()?.into()),
            BracketOpen => {
                if self.peek_is(BracketClose) {
                    self.next();
                    TypeExprKind::Slice(self.parse_type()?.into())
                } else {
                    let length = self.parse_array_length()?;
                    TypeExprKind::Array {
                        length,
                        element: self.parse_type()?.into(),
                    }
                }
            }
            KeywordMap => {
                expect_token!(self.next(), BracketOpen)?;
                let key = self.parse_type()?;
                expect_token!(self.next(), BracketClose)?;
                let value = self.parse_type()?;
                TypeExprKind::Map {
                    key: key.into(),
                    value: value.into(),
                }
            }
            KeywordChan => {
                if self.peek_is(Arrow) {
                    self.next();
                }
                self.parse_type()?;
                TypeExprKind::Unsupported(UnsupportedForm::Channel)
            }
            Arrow => {
                expect_token!(self.next(), KeywordChan)?;
                self.parse_type()?;
                TypeExprKind::Unsupported(UnsupportedForm::Channel)
            }
            KeywordFunc => {
                self.skip_signature()?;
                TypeExprKind::Unsupported(UnsupportedForm::Function)
            }
            KeywordStruct | KeywordInterface => {
                let open = expect_token!(self.next(), BraceOpen)?;
                self.skip_balanced(open)?;
                TypeExprKind::Unsupported(if tok.kind == KeywordStruct {
                    UnsupportedForm::AnonymousStruct
                } else {
                    UnsupportedForm::Interface
                })
            }
            ParenOpen => {
                let inner = self.parse_type()?;
                expect_token!(self.next(), ParenClose)?;
                inner.kind
            }
            _ => return Err(ParseError::UnexpectedToken(tok.span, tok.kind.into())),
        };

        Ok(TypeExpr {
            span: tok.span.extend(&self.last_span),
            kind,
        })
    }

    // A named type followed by `[` is an instantiation of a generic type.
    fn finish_named_type(&mut self, start: SourceSpan, kind: TypeExprKind) -> Result<TypeExpr> {
        let kind = if self.peek_is(TokenKind::BracketOpen) {
            let open = expect_token!(self.next(), TokenKind::BracketOpen)?;
            self.skip_balanced(open)?;
            TypeExprKind::Unsupported(UnsupportedForm::GenericInstance)
        } else {
            kind
        };

        Ok(TypeExpr {
            span: start.extend(&self.last_span),
            kind,
        })
    }

    // The `[` has been consumed. Consumes up to and including the matching `]`.
    fn parse_array_length(&mut self) -> Result<LengthExpr> {
        use TokenKind::*;

        let start = self.pos;
        let mut depth = 0usize;

        let close = loop {
            let tok = self.next().ok_or(ParseError::UnexpectedEnd)?;
            match tok.kind {
                BracketClose if depth == 0 => break tok,
                BraceOpen | ParenOpen | BracketOpen => depth += 1,
                kind if is_closing_delimiter(kind) => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or(ParseError::UnbalancedDelimiter(tok.span, kind.into()))?;
                }
                Invalid(_) => return Err(ParseError::UnexpectedToken(tok.span, tok.kind.into())),
                _ => {}
            }
        };

        let inner = &self.tokens[start..self.pos - 1];

        let Some(first) = inner.first() else {
            return Err(ParseError::UnexpectedToken(close.span, close.kind.into()));
        };
        let last = inner[inner.len() - 1];

        let text = SourceSpan {
            start: first.span.start,
            end: last.span.end,
        }
        .text(self.source)
        .to_string();

        let length = match inner {
            [Token {
                kind: IntLiteral(_),
                ..
            }] => LengthExpr::Literal(text),
            [Token {
                kind: Ellipsis, ..
            }] => LengthExpr::Ellipsis,
            [Token {
                kind: Identifier(_),
                ..
            }]
            | [Token {
                kind: Identifier(_),
                ..
            }, Token { kind: Period, .. }, Token {
                kind: Identifier(_),
                ..
            }] => LengthExpr::Named(text),
            _ => LengthExpr::Expression(text),
        };

        Ok(length)
    }

    // The `func` keyword has been consumed.
    fn skip_signature(&mut self) -> Result<()> {
        use TokenKind::*;

        let params = expect_token!(self.next(), ParenOpen)?;
        self.skip_balanced(params)?;

        match self.peek() {
            Some(tok) if tok.kind == ParenOpen => {
                self.next();
                self.skip_balanced(tok)?;
            }
            Some(tok) if starts_type(tok.kind) => {
                self.parse_type()?;
            }
            _ => {}
        }

        Ok(())
    }

    // The opening delimiter has been consumed already.
    fn skip_balanced(&mut self, open: Token) -> Result<()> {
        let mut stack = vec![open];

        while let Some(top) = stack.last().copied() {
            let tok = self.next().ok_or(ParseError::UnexpectedEnd)?;

            if closing_delimiter(tok.kind).is_some() {
                stack.push(tok);
            } else if is_closing_delimiter(tok.kind) {
                if closing_delimiter(top.kind) != Some(tok.kind) {
                    return Err(ParseError::UnbalancedDelimiter(tok.span, tok.kind.into()));
                }
                stack.pop();
            } else if let TokenKind::Invalid(_) = tok.kind {
                return Err(ParseError::UnexpectedToken(tok.span, tok.kind.into()));
            }
        }

        Ok(())
    }
}
