//! jscover Lexer - Tokenization using logos
//!
//! Two things sit on top of the generated lexer:
//! - template literals, whose substitutions nest arbitrarily deep, are split
//!   into head/middle/tail pieces by tracking a brace stack
//! - every token records whether a line terminator precedes it, which the
//!   parser needs for automatic semicolon insertion
//!
//! Regular expression literals are not recognised; `/` always lexes as
//! division.

mod escape;
mod token;

pub use escape::*;
pub use token::*;

use jscover_ast::Span;
use logos::Logos;

/// Tokenize a source string into a vector of tokens, comments included
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    // `true` marks a `${` substitution, `false` an ordinary brace
    let mut braces: Vec<bool> = Vec::new();
    let mut last_end = 0;

    while let Some(result) = lexer.next() {
        let start = lexer.span().start;
        let mut kind = match result {
            Ok(kind) => kind,
            Err(_) => TokenKind::Error,
        };

        match kind {
            TokenKind::LBrace => braces.push(false),
            TokenKind::Backtick | TokenKind::RBrace => {
                let opens_piece = kind == TokenKind::Backtick || braces.pop() == Some(true);
                if opens_piece {
                    kind = match scan_template(lexer.remainder()) {
                        Some((len, TemplateEnd::Substitution)) => {
                            lexer.bump(len);
                            braces.push(true);
                            if kind == TokenKind::Backtick {
                                TokenKind::TemplateHead
                            } else {
                                TokenKind::TemplateMiddle
                            }
                        }
                        Some((len, TemplateEnd::Close)) => {
                            lexer.bump(len);
                            if kind == TokenKind::Backtick {
                                TokenKind::TemplateFull
                            } else {
                                TokenKind::TemplateTail
                            }
                        }
                        None => {
                            lexer.bump(lexer.remainder().len());
                            TokenKind::Error
                        }
                    };
                }
            }
            _ => {}
        }

        let end = lexer.span().end;
        // Comments are inside this slice, so their newlines count too
        let newline_before = source[last_end..start].contains(['\n', '\r', '\u{2028}', '\u{2029}']);
        if !kind.is_comment() {
            last_end = end;
        }
        tokens.push(Token {
            kind,
            span: Span::new(start, end),
            newline_before,
        });
    }

    // Add EOF token
    let end = source.len();
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(end, end),
        newline_before: source[last_end..].contains('\n'),
    });

    tokens
}

enum TemplateEnd {
    /// Stopped after `${`
    Substitution,
    /// Stopped after the closing backtick
    Close,
}

/// Scan template characters up to and including the next `${` or backtick.
/// Returns the number of bytes consumed, or `None` if the template never ends.
fn scan_template(rest: &str) -> Option<(usize, TemplateEnd)> {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return Some((i + 1, TemplateEnd::Close)),
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                return Some((i + 2, TemplateEnd::Substitution))
            }
            _ => i += 1,
        }
    }
    None
}

/// A token with its span
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator appears between the previous significant token and
    /// this one
    pub newline_before: bool,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start..self.span.end]
    }

    /// Text between the delimiters of a template piece
    pub fn template_raw<'a>(&self, source: &'a str) -> &'a str {
        let text = self.text(source);
        match self.kind {
            TokenKind::TemplateFull | TokenKind::TemplateTail => &text[1..text.len() - 1],
            TokenKind::TemplateHead | TokenKind::TemplateMiddle => &text[1..text.len() - 2],
            _ => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_tokens() {
        let tokens = tokenize("var x = 5;");
        assert_eq!(tokens[0].kind, TokenKind::Var);
        assert_eq!(tokens[1].kind, TokenKind::Ident);
        assert_eq!(tokens[2].kind, TokenKind::Eq);
        assert_eq!(tokens[3].kind, TokenKind::Number);
        assert_eq!(tokens[4].kind, TokenKind::Semicolon);
        assert_eq!(tokens[5].kind, TokenKind::Eof);
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(
            kinds("a >>>= b ?? c ?. d"),
            vec![
                TokenKind::Ident,
                TokenKind::UShrEq,
                TokenKind::Ident,
                TokenKind::QuestionQuestion,
                TokenKind::Ident,
                TokenKind::QuestionDot,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_forms() {
        let source = "0xC0FFEE 1.5e3 .25 0b101 0o17 10";
        let tokens = tokenize(source);
        let values: Vec<f64> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Number)
            .filter_map(|t| parse_number(t.text(source)))
            .collect();
        assert_eq!(values, vec![12648430.0, 1500.0, 0.25, 5.0, 15.0, 10.0]);
    }

    #[test]
    fn test_comments_are_tokens() {
        let tokens = tokenize("a // line\n/* block */ b");
        assert_eq!(tokens[1].kind, TokenKind::LineComment);
        assert_eq!(tokens[2].kind, TokenKind::BlockComment);
        assert_eq!(tokens[3].kind, TokenKind::Ident);
        assert!(tokens[3].newline_before);
    }

    #[test]
    fn test_newline_tracking() {
        let tokens = tokenize("return\nx");
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);

        let tokens = tokenize("a /* multi\nline */ b");
        assert!(tokens[2].newline_before);
    }

    #[test]
    fn test_block_comment_forms() {
        assert_eq!(
            kinds("a /* c */ + b"),
            vec![
                TokenKind::Ident,
                TokenKind::BlockComment,
                TokenKind::Plus,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("/** doc **/x/**/"),
            vec![
                TokenKind::BlockComment,
                TokenKind::Ident,
                TokenKind::BlockComment,
                TokenKind::Eof,
            ]
        );
        let source = "/* a */ b /* c */";
        let tokens = tokenize(source);
        assert_eq!(tokens[0].text(source), "/* a */");
        assert_eq!(tokens[2].text(source), "/* c */");
    }

    #[test]
    fn test_unterminated_block_comment_is_error() {
        assert_eq!(kinds("x /* open"), vec![TokenKind::Ident, TokenKind::Error, TokenKind::Eof]);
    }

    #[test]
    fn test_template_pieces() {
        let source = "`a${ {b: 1}.b }c${`d${e}`}f`";
        let tokens = tokenize(source);
        let pieces: Vec<(TokenKind, &str)> = tokens
            .iter()
            .filter(|t| {
                matches!(
                    t.kind,
                    TokenKind::TemplateFull
                        | TokenKind::TemplateHead
                        | TokenKind::TemplateMiddle
                        | TokenKind::TemplateTail
                )
            })
            .map(|t| (t.kind, t.template_raw(source)))
            .collect();
        assert_eq!(
            pieces,
            vec![
                (TokenKind::TemplateHead, "a"),
                (TokenKind::TemplateMiddle, "c"),
                (TokenKind::TemplateHead, "d"),
                (TokenKind::TemplateTail, ""),
                (TokenKind::TemplateTail, "f"),
            ]
        );
    }

    #[test]
    fn test_unterminated_template_is_error() {
        assert!(kinds("`abc").contains(&TokenKind::Error));
    }

    #[test]
    fn test_keywords_vs_identifiers() {
        assert_eq!(
            kinds("function functional"),
            vec![TokenKind::Function, TokenKind::Ident, TokenKind::Eof]
        );
    }
}
