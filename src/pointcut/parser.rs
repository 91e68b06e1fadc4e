//! Recursive descent parser for pointcut expressions.
//!
//! ```text
//! expr       := or
//! or         := and (("||" | "or") and)*
//! and        := unary (("&&" | "and") unary)*
//! unary      := ("!" | "not") unary | "(" expr ")" | designator
//! designator := keyword "(" body ")" | qualified-name "(" [ident ("," ident)*] ")"
//! ```

use std::str::FromStr;

use crate::{
    pointcut::{
        ast::{DesignatorAst, DesignatorKind, MethodPatternAst, ModifierAst, PointcutAst},
        lexer::{tokenize, Lexeme},
    },
    Result,
};

/// Parse a pointcut expression into its syntax tree
///
/// # Errors
/// Returns [`crate::Error::Configuration`] for malformed expressions and unsupported
/// designators.
pub fn parse(expression: &str) -> Result<PointcutAst> {
    let lexemes = tokenize(expression)?;
    if lexemes.is_empty() {
        return Err(config_error!("Pointcut expression is empty"));
    }

    let mut parser = Parser {
        lexemes: &lexemes,
        position: 0,
        expression,
    };
    let ast = parser.parse_or()?;
    if let Some(trailing) = parser.peek() {
        return Err(parser.error(&format!("unexpected '{trailing}'")));
    }
    Ok(ast)
}

struct Parser<'a> {
    lexemes: &'a [Lexeme],
    position: usize,
    expression: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Lexeme> {
        self.lexemes.get(self.position)
    }

    fn advance(&mut self) -> Option<&'a Lexeme> {
        let lexeme = self.lexemes.get(self.position);
        if lexeme.is_some() {
            self.position += 1;
        }
        lexeme
    }

    fn error(&self, message: &str) -> crate::Error {
        config_error!(
            "Malformed pointcut expression '{}' at token {}: {}",
            self.expression,
            self.position,
            message
        )
    }

    fn expect(&mut self, expected: &Lexeme) -> Result<()> {
        match self.advance() {
            Some(lexeme) if lexeme == expected => Ok(()),
            Some(other) => {
                let message = format!("expected '{expected}', found '{other}'");
                Err(self.error(&message))
            }
            None => Err(self.error(&format!("expected '{expected}', found end of input"))),
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.advance() {
            Some(Lexeme::Ident(text)) => Ok(text.clone()),
            Some(other) => {
                let message = format!("expected a name, found '{other}'");
                Err(self.error(&message))
            }
            None => Err(self.error("expected a name, found end of input")),
        }
    }

    fn parse_or(&mut self) -> Result<PointcutAst> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Lexeme::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = PointcutAst::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<PointcutAst> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Lexeme::And) {
            self.advance();
            let right = self.parse_unary()?;
            left = PointcutAst::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<PointcutAst> {
        match self.peek() {
            Some(Lexeme::Not) => {
                self.advance();
                Ok(PointcutAst::Not(Box::new(self.parse_unary()?)))
            }
            Some(Lexeme::LParen) => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(&Lexeme::RParen)?;
                Ok(inner)
            }
            Some(Lexeme::Ident(_)) => Ok(PointcutAst::Designator(self.parse_designator()?)),
            Some(other) => {
                let message = format!("unexpected '{other}'");
                Err(self.error(&message))
            }
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_designator(&mut self) -> Result<DesignatorAst> {
        let name = self.expect_ident()?;
        self.expect(&Lexeme::LParen)?;

        let Ok(kind) = DesignatorKind::from_str(&name) else {
            let arguments = self.parse_ident_list()?;
            self.expect(&Lexeme::RParen)?;
            if name.contains('*') || name.starts_with('@') {
                return Err(self.error(&format!("'{name}' is not a valid pointcut name")));
            }
            return Ok(DesignatorAst::Reference { name, arguments });
        };

        if !kind.is_supported() {
            return Err(config_error!(
                "Pointcut expression '{}' contains unsupported pointcut primitive '{}'",
                self.expression,
                kind.keyword()
            ));
        }

        let designator = match kind {
            DesignatorKind::Execution => DesignatorAst::Execution(self.parse_method_pattern()?),
            DesignatorKind::WithinCode => {
                DesignatorAst::WithinCode(self.parse_method_pattern()?)
            }
            DesignatorKind::Within => DesignatorAst::Within(self.expect_ident()?),
            DesignatorKind::This => DesignatorAst::This(self.expect_ident()?),
            DesignatorKind::Target => DesignatorAst::Target(self.expect_ident()?),
            DesignatorKind::Args => DesignatorAst::Args(self.parse_ident_list()?),
            DesignatorKind::AtAnnotation => DesignatorAst::AtAnnotation(self.expect_ident()?),
            DesignatorKind::AtThis => DesignatorAst::AtThis(self.expect_ident()?),
            DesignatorKind::AtTarget => DesignatorAst::AtTarget(self.expect_ident()?),
            DesignatorKind::AtWithin => DesignatorAst::AtWithin(self.expect_ident()?),
            DesignatorKind::AtWithinCode => DesignatorAst::AtWithinCode(self.expect_ident()?),
            DesignatorKind::AtArgs => DesignatorAst::AtArgs(self.parse_ident_list()?),
            DesignatorKind::Bean => DesignatorAst::Bean(self.expect_ident()?),
            _ => return Err(self.error("unsupported designator")),
        };

        self.expect(&Lexeme::RParen)?;
        Ok(designator)
    }

    fn parse_ident_list(&mut self) -> Result<Vec<String>> {
        let mut items = Vec::new();
        if self.peek() == Some(&Lexeme::RParen) {
            return Ok(items);
        }

        loop {
            items.push(self.expect_ident()?);
            if self.peek() == Some(&Lexeme::Comma) {
                self.advance();
            } else {
                return Ok(items);
            }
        }
    }

    /// `[!]modifier* return-type [declaring-type.]name(params) [throws T, ...]`
    fn parse_method_pattern(&mut self) -> Result<MethodPatternAst> {
        let mut words: Vec<(bool, String)> = Vec::new();
        loop {
            let negated = if self.peek() == Some(&Lexeme::Not) {
                self.advance();
                true
            } else {
                false
            };
            let word = self.expect_ident()?;
            if self.peek() == Some(&Lexeme::LParen) {
                if negated {
                    return Err(self.error("a method name pattern can not be negated"));
                }
                words.push((false, word));
                break;
            }
            words.push((negated, word));
        }

        let Some((_, qualified_name)) = words.pop() else {
            return Err(self.error("missing method name pattern"));
        };
        let Some((return_negated, return_type)) = words.pop() else {
            return Err(self.error("missing return type pattern"));
        };
        if return_negated {
            return Err(self.error("a return type pattern can not be negated"));
        }

        let modifiers = words
            .into_iter()
            .map(|(negated, keyword)| ModifierAst { negated, keyword })
            .collect();

        let (declaring_type, name) = split_qualified_name(&qualified_name);

        self.expect(&Lexeme::LParen)?;
        let parameters = self.parse_ident_list()?;
        self.expect(&Lexeme::RParen)?;

        let mut throws = Vec::new();
        if matches!(self.peek(), Some(Lexeme::Ident(word)) if word == "throws") {
            self.advance();
            throws = self.parse_ident_list()?;
            if throws.is_empty() {
                return Err(self.error("'throws' requires at least one type pattern"));
            }
        }

        Ok(MethodPatternAst {
            modifiers,
            return_type,
            declaring_type,
            name,
            parameters,
            throws,
        })
    }
}

/// Split `com.example.Service.set*` into the declaring type pattern and the name pattern
fn split_qualified_name(qualified: &str) -> (Option<String>, String) {
    match qualified.rfind('.') {
        None => (None, qualified.to_string()),
        Some(split) => {
            let declaring = &qualified[..split];
            let name = &qualified[split + 1..];
            // `com..set*` names every type below `com`
            let declaring = if declaring.ends_with('.') {
                format!("{declaring}.*")
            } else {
                declaring.to_string()
            };
            (Some(declaring), name.to_string())
        }
    }
}
