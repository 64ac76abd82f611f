#![forbid(unsafe_code)]

//! Tokenizer for attribute expressions.
//!
//! Uses Logos for compile-time generated lexing.

use std::ops::Range;

use logos::Logos;

use super::ParseError;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub(crate) enum Token<'src> {
    // === Keywords ===
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("undefined")]
    Undefined,

    // === Literals ===
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unescape(lex.slice()))]
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    Str(String),
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident(&'src str),

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,

    // === Operators ===
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("===")]
    StrictEq,
    #[token("!==")]
    StrictNe,
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
}

pub(crate) type Spanned<'src> = (Token<'src>, Range<usize>);

/// Split `source` into tokens with byte spans.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned<'_>>, ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(next) = lexer.next() {
        match next {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                return Err(ParseError::new(
                    format!("unexpected input {:?}", lexer.slice()),
                    lexer.span().start,
                ));
            }
        }
    }
    Ok(tokens)
}

/// Strip the surrounding quotes and resolve backslash escapes.
fn unescape(quoted: &str) -> Option<String> {
    let body = quoted.get(1..quoted.len().checked_sub(1)?)?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            other => out.push(other),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token<'_>> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn keywords_win_over_identifiers() {
        assert_eq!(
            kinds("true trueish undefined"),
            vec![Token::True, Token::Ident("trueish"), Token::Undefined]
        );
    }

    #[test]
    fn numbers_and_strings() {
        assert_eq!(
            kinds("5 2.5e3 'it\\'s' \"a\\nb\""),
            vec![
                Token::Number(5.0),
                Token::Number(2500.0),
                Token::Str("it's".into()),
                Token::Str("a\nb".into()),
            ]
        );
    }

    #[test]
    fn longest_operator_match() {
        assert_eq!(
            kinds("a === b !== c <= d"),
            vec![
                Token::Ident("a"),
                Token::StrictEq,
                Token::Ident("b"),
                Token::StrictNe,
                Token::Ident("c"),
                Token::Le,
                Token::Ident("d"),
            ]
        );
    }

    #[test]
    fn unicode_escape() {
        assert_eq!(kinds("'\\u00e9'"), vec![Token::Str("é".into())]);
    }

    #[test]
    fn spans_point_into_source() {
        let tokens = tokenize("  dims.day").unwrap();
        assert_eq!(tokens[0].1, 2..6);
        assert_eq!(tokens[2].1, 7..10);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = tokenize("'open").unwrap_err();
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn stray_character_is_an_error() {
        let err = tokenize("a # b").unwrap_err();
        assert_eq!(err.offset, 2);
    }
}
