// lexer for the matlab-like front-end syntax.

use std::ops::Range;

use derive_more::Display;
use logos::Logos;

// tokenizes the given string; invalid lexemes are represented with Error tokens
// in the returned vector.
pub fn lex(code: &str) -> Vec<Token> {
    let mut lexer = TokenKind::lexer(code);
    let mut tokens: Vec<Token> = vec![];

    while let Some(result) = lexer.next() {
        let start = lexer.span().start;
        let kind = match result {
            // a quote either transposes the value right before it or opens a
            // string literal.
            Ok(TokenKind::Quote) if transposes(&tokens, start) => TokenKind::Quote,
            Ok(TokenKind::Quote) => match string_len(lexer.remainder()) {
                Some(n) => {
                    lexer.bump(n);
                    TokenKind::Str
                }
                None => {
                    lexer.bump(unterminated_len(lexer.remainder()));
                    TokenKind::Error
                }
            },
            Ok(kind) => kind,
            Err(()) => TokenKind::Error,
        };
        tokens.push(Token {
            kind,
            span: start..lexer.span().end,
        });
    }

    tokens
}

// SECTION: Tokens

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

#[derive(Logos, Clone, Copy, Debug, Display, Eq, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
pub enum TokenKind {
    // represents invalid lexemes, i.e., unrecognized characters or unterminated
    // strings.
    #[display(fmt = "error")]
    Error,

    #[display(fmt = "comment")]
    #[regex(r"[%#][^\n]*", logos::skip)]
    Comment,

    // `%{` alone on a line opens a block comment running to the next `%}`; with
    // anything after it on the line it is a plain line comment.
    #[display(fmt = "block comment")]
    #[token("%{", block_comment)]
    BlockComment,

    #[display(fmt = "...")]
    #[regex(r"\.\.\.[^\n]*\n?", logos::skip)]
    Continuation,

    #[display(fmt = "num")]
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    Num,

    // single-quoted string; produced by `lex`, never by the generated lexer.
    #[display(fmt = "string")]
    Str,

    #[display(fmt = "string")]
    #[regex(r#""([^"\n]|"")*""#)]
    DqStr,

    #[display(fmt = "id")]
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Id,

    #[display(fmt = "if")]
    #[token("if")]
    If,

    #[display(fmt = "elseif")]
    #[token("elseif")]
    Elseif,

    #[display(fmt = "else")]
    #[token("else")]
    Else,

    #[display(fmt = "end")]
    #[token("end")]
    End,

    #[display(fmt = "for")]
    #[token("for")]
    For,

    #[display(fmt = "while")]
    #[token("while")]
    While,

    #[display(fmt = "switch")]
    #[token("switch")]
    Switch,

    #[display(fmt = "case")]
    #[token("case")]
    Case,

    #[display(fmt = "otherwise")]
    #[token("otherwise")]
    Otherwise,

    #[display(fmt = "function")]
    #[token("function")]
    Fn,

    #[display(fmt = "return")]
    #[token("return")]
    Return,

    #[display(fmt = "break")]
    #[token("break")]
    Break,

    #[display(fmt = "continue")]
    #[token("continue")]
    Continue,

    #[display(fmt = "global")]
    #[token("global")]
    Global,

    #[display(fmt = "persistent")]
    #[token("persistent")]
    Persistent,

    #[display(fmt = "newline")]
    #[token("\n")]
    Newline,

    #[display(fmt = ";")]
    #[token(";")]
    Semicolon,

    #[display(fmt = ",")]
    #[token(",")]
    Comma,

    #[display(fmt = "=")]
    #[token("=")]
    Gets,

    #[display(fmt = ":")]
    #[token(":")]
    Colon,

    #[display(fmt = ".")]
    #[token(".")]
    Dot,

    #[display(fmt = "+")]
    #[token("+")]
    Plus,

    #[display(fmt = "-")]
    #[token("-")]
    Dash,

    #[display(fmt = "*")]
    #[token("*")]
    Star,

    #[display(fmt = "/")]
    #[token("/")]
    Slash,

    #[display(fmt = "\\")]
    #[token("\\")]
    Backslash,

    #[display(fmt = "^")]
    #[token("^")]
    Caret,

    #[display(fmt = ".*")]
    #[token(".*")]
    DotStar,

    #[display(fmt = "./")]
    #[token("./")]
    DotSlash,

    #[display(fmt = ".\\")]
    #[token(".\\")]
    DotBackslash,

    #[display(fmt = ".^")]
    #[token(".^")]
    DotCaret,

    #[display(fmt = "'")]
    #[token("'")]
    Quote,

    #[display(fmt = ".'")]
    #[token(".'")]
    DotQuote,

    #[display(fmt = "==")]
    #[token("==")]
    Equal,

    #[display(fmt = "~=")]
    #[token("~=")]
    #[token("!=")]
    NotEq,

    #[display(fmt = "<")]
    #[token("<")]
    Lt,

    #[display(fmt = "<=")]
    #[token("<=")]
    Lte,

    #[display(fmt = ">")]
    #[token(">")]
    Gt,

    #[display(fmt = ">=")]
    #[token(">=")]
    Gte,

    #[display(fmt = "&")]
    #[token("&")]
    Amp,

    #[display(fmt = "|")]
    #[token("|")]
    Pipe,

    #[display(fmt = "&&")]
    #[token("&&")]
    AndAnd,

    #[display(fmt = "||")]
    #[token("||")]
    OrOr,

    #[display(fmt = "~")]
    #[token("~")]
    #[token("!")]
    Tilde,

    #[display(fmt = "(")]
    #[token("(")]
    OpenParen,

    #[display(fmt = ")")]
    #[token(")")]
    CloseParen,

    #[display(fmt = "[")]
    #[token("[")]
    OpenBracket,

    #[display(fmt = "]")]
    #[token("]")]
    CloseBracket,

    #[display(fmt = "{{")]
    #[token("{")]
    OpenBrace,

    #[display(fmt = "}}")]
    #[token("}")]
    CloseBrace,
}

// SECTION: helpers

// whether a quote starting at `start` is a transpose: it has to follow a value
// with no whitespace in between.
fn transposes(tokens: &[Token], start: usize) -> bool {
    use TokenKind::*;

    match tokens.last() {
        Some(prev) if prev.span.end == start => matches!(
            prev.kind,
            Id | Num | End | CloseParen | CloseBracket | CloseBrace | Quote | DotQuote
        ),
        _ => false,
    }
}

// the length of the rest of a single-quoted string (after the opening quote),
// including the closing quote.  A doubled quote is an escaped quote.
fn string_len(rest: &str) -> Option<usize> {
    let mut chars = rest.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\'' => match chars.peek() {
                Some((_, '\'')) => {
                    chars.next();
                }
                _ => return Some(idx + 1),
            },
            '\n' => return None,
            _ => {}
        }
    }
    None
}

// skips a block comment, or the rest of the input when it is never closed.
fn block_comment(lexer: &mut logos::Lexer<TokenKind>) -> logos::Skip {
    let rest = lexer.remainder();
    let len = rest.find("%}").map_or(rest.len(), |idx| idx + 2);
    lexer.bump(len);
    logos::Skip
}

// how much of the input an unterminated string swallows: the rest of the line.
fn unterminated_len(rest: &str) -> usize {
    rest.find('\n').unwrap_or(rest.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(code: &str) -> Vec<TokenKind> {
        lex(code).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn quotes_after_values_transpose() {
        assert_eq!(kinds("a'"), vec![Id, Quote]);
        assert_eq!(kinds("x(1)' + y.'"), vec![
            Id, OpenParen, Num, CloseParen, Quote, Plus, Id, DotQuote
        ]);
    }

    #[test]
    fn quotes_elsewhere_open_strings() {
        assert_eq!(kinds("disp('it''s')"), vec![Id, OpenParen, Str, CloseParen]);
        assert_eq!(kinds("[a 'b']"), vec![OpenBracket, Id, Str, CloseBracket]);
    }

    #[test]
    fn unterminated_strings_are_errors() {
        assert_eq!(kinds("x = 'abc\ny"), vec![Id, Gets, Error, Newline, Id]);
    }

    #[test]
    fn comments_and_continuations_are_skipped() {
        assert_eq!(
            kinds("x = 1 + ... more\n 2 % done\n"),
            vec![Id, Gets, Num, Plus, Num, Newline]
        );
    }

    #[test]
    fn block_comments_are_skipped() {
        assert_eq!(
            kinds("%{\nblock\n%}\nx = 1;\n"),
            vec![Newline, Id, Gets, Num, Semicolon, Newline]
        );
        // text after `%{` makes it a line comment.
        assert_eq!(kinds("%{ note\ny\n"), vec![Newline, Id, Newline]);
        assert_eq!(kinds("%{\nnever closed"), vec![]);
    }

    #[test]
    fn keywords_beat_identifiers() {
        assert_eq!(kinds("end endx elseif"), vec![End, Id, Elseif]);
    }
}
