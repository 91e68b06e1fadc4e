use std::fmt;

use crate::Result;

/// A lexical element of a pointcut expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lexeme {
    /// A name, pattern or keyword
    Ident(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `&&` or `and`
    And,
    /// `||` or `or`
    Or,
    /// `!` or `not`
    Not,
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lexeme::Ident(text) => write!(f, "{text}"),
            Lexeme::LParen => write!(f, "("),
            Lexeme::RParen => write!(f, ")"),
            Lexeme::Comma => write!(f, ","),
            Lexeme::And => write!(f, "&&"),
            Lexeme::Or => write!(f, "||"),
            Lexeme::Not => write!(f, "!"),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | '*' | '+' | '[' | ']' | '@' | '#' | '-')
}

/// Split a pointcut expression into lexemes
///
/// # Errors
/// Returns [`crate::Error::Configuration`] for characters that can not start a lexeme.
pub fn tokenize(expression: &str) -> Result<Vec<Lexeme>> {
    let mut lexemes = Vec::new();
    let mut chars = expression.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => lexemes.push(Lexeme::LParen),
            ')' => lexemes.push(Lexeme::RParen),
            ',' => lexemes.push(Lexeme::Comma),
            '!' => lexemes.push(Lexeme::Not),
            '&' | '|' => {
                if chars.next_if(|(_, next)| *next == c).is_none() {
                    return Err(config_error!(
                        "Unexpected '{}' at offset {} in pointcut expression '{}'",
                        c,
                        position,
                        expression
                    ));
                }
                lexemes.push(if c == '&' { Lexeme::And } else { Lexeme::Or });
            }
            c if is_ident_char(c) => {
                let mut ident = String::from(c);
                while let Some((_, next)) = chars.next_if(|(_, next)| is_ident_char(*next)) {
                    ident.push(next);
                }
                lexemes.push(match ident.as_str() {
                    "and" => Lexeme::And,
                    "or" => Lexeme::Or,
                    "not" => Lexeme::Not,
                    _ => Lexeme::Ident(ident),
                });
            }
            other => {
                return Err(config_error!(
                    "Unexpected '{}' at offset {} in pointcut expression '{}'",
                    other,
                    position,
                    expression
                ))
            }
        }
    }

    Ok(lexemes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(text: &str) -> Lexeme {
        Lexeme::Ident(text.to_string())
    }

    #[test]
    fn test_tokenize_execution() -> Result<()> {
        let lexemes = tokenize("execution(* set*(..)) && args(x)")?;
        assert_eq!(
            lexemes,
            vec![
                ident("execution"),
                Lexeme::LParen,
                ident("*"),
                ident("set*"),
                Lexeme::LParen,
                ident(".."),
                Lexeme::RParen,
                Lexeme::RParen,
                Lexeme::And,
                ident("args"),
                Lexeme::LParen,
                ident("x"),
                Lexeme::RParen,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_word_operators() -> Result<()> {
        let lexemes = tokenize("a() and not b() or c()")?;
        assert!(lexemes.contains(&Lexeme::And));
        assert!(lexemes.contains(&Lexeme::Not));
        assert!(lexemes.contains(&Lexeme::Or));
        Ok(())
    }

    #[test]
    fn test_annotation_designators() -> Result<()> {
        let lexemes = tokenize("@annotation(app.Audited)")?;
        assert_eq!(lexemes[0], ident("@annotation"));
        assert_eq!(lexemes[2], ident("app.Audited"));
        Ok(())
    }

    #[test]
    fn test_rejects_single_ampersand() {
        assert!(tokenize("a() & b()").is_err());
        assert!(tokenize("within(a.B) ; x").is_err());
    }
}
