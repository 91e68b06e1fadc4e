//! Token-level access to pointcut expression text.
//!
//! Parameter name discovery does not parse the expression. It works on whitespace-separated
//! tokens and reassembles designator bodies that the author spread over several tokens, as in
//! `args( name , *)`.

/// The reassembled body of one designator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignatorBody {
    /// Number of tokens after the designator token that belong to the body
    pub tokens_consumed: usize,
    /// The text between the parentheses, `None` if the body is not terminated
    pub text: Option<String>,
}

/// Split expression text into whitespace-separated tokens
#[must_use]
pub fn tokenize(expression: &str) -> Vec<&str> {
    expression.split_whitespace().collect()
}

/// Reassemble the body of the designator starting at `tokens[start]`
///
/// Bare `(` tokens after the designator are skipped and not counted. A token ending with `)`
/// terminates the body.
#[must_use]
pub fn designator_body(tokens: &[&str], start: usize) -> DesignatorBody {
    let Some(current) = tokens.get(start) else {
        return DesignatorBody {
            tokens_consumed: 0,
            text: None,
        };
    };

    let body_start = current.find('(');
    if let Some(inner) = current.strip_suffix(')') {
        let text = match body_start {
            Some(open) if open < inner.len() => &inner[open + 1..],
            Some(_) => "",
            None => inner,
        };
        return DesignatorBody {
            tokens_consumed: 0,
            text: Some(text.to_string()),
        };
    }

    let mut text = String::new();
    if let Some(open) = body_start {
        if open + 1 != current.len() {
            text.push_str(&current[open + 1..]);
            text.push(' ');
        }
    }

    let mut consumed = 1;
    let mut index = start + 1;
    while let Some(token) = tokens.get(index) {
        if *token == "(" {
            index += 1;
            continue;
        }
        if let Some(last) = token.strip_suffix(')') {
            if last.contains(')') {
                text.push_str(last);
            } else {
                text.push_str(last.strip_prefix('(').unwrap_or(last));
            }
            return DesignatorBody {
                tokens_consumed: consumed,
                text: Some(text.trim().to_string()),
            };
        }

        text.push_str(token.strip_prefix('(').unwrap_or(token));
        text.push(' ');
        index += 1;
        consumed += 1;
    }

    DesignatorBody {
        tokens_consumed: consumed,
        text: None,
    }
}

/// The designator keyword of a token, with any body stripped: `args(x)` gives `args`
#[must_use]
pub fn designator_keyword(token: &str) -> &str {
    token.find('(').map_or(token, |open| &token[..open])
}

/// Returns true if `token` is shaped like a variable name rather than a type name
///
/// Variable names start with a lowercase letter and contain only identifier characters.
/// Type names such as `String` or `app.Payload` are rejected.
#[must_use]
pub fn is_variable_name(token: &str) -> bool {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_lowercase() {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Returns true if `token` is a valid identifier
#[must_use]
pub fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// The variable-shaped entries of a comma-separated designator body
#[must_use]
pub fn variable_names(body: &str) -> Vec<String> {
    body.split(',')
        .map(str::trim)
        .filter(|entry| is_variable_name(entry))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_token_body() {
        let tokens = tokenize("args(name) && this(bean)");
        assert_eq!(
            designator_body(&tokens, 0),
            DesignatorBody {
                tokens_consumed: 0,
                text: Some("name".to_string())
            }
        );
        assert_eq!(designator_body(&tokens, 2).text, Some("bean".to_string()));
    }

    #[test]
    fn test_body_spanning_tokens() {
        let tokens = tokenize("args( a , b ) && target(t)");
        let body = designator_body(&tokens, 0);
        assert_eq!(body.text, Some("a , b".to_string()));
        assert_eq!(body.tokens_consumed, 4);
        assert_eq!(tokens[1 + body.tokens_consumed], "&&");
    }

    #[test]
    fn test_detached_parenthesis() {
        let tokens = tokenize("args ( x )");
        let body = designator_body(&tokens, 0);
        assert_eq!(body.text, Some("x".to_string()));
        assert_eq!(body.tokens_consumed, 2);

        let tokens = tokenize("args (x, y)");
        assert_eq!(designator_body(&tokens, 0).text, Some("x, y".to_string()));

        let tokens = tokenize("named (x)");
        assert_eq!(designator_body(&tokens, 0).text, Some("x".to_string()));
    }

    #[test]
    fn test_nested_parentheses() {
        let tokens = tokenize("execution(* set*(..))");
        assert_eq!(designator_body(&tokens, 0).text, Some("* set*(..)".to_string()));
    }

    #[test]
    fn test_unterminated_body() {
        let tokens = tokenize("args(a, b");
        let body = designator_body(&tokens, 0);
        assert_eq!(body.text, None);
        assert_eq!(body.tokens_consumed, 2);
    }

    #[test]
    fn test_variable_names() {
        assert!(is_variable_name("name"));
        assert!(is_variable_name("x_1"));
        assert!(!is_variable_name("_x1"));
        assert!(!is_variable_name("$x"));
        assert!(!is_variable_name("String"));
        assert!(!is_variable_name("app.Payload"));
        assert!(!is_variable_name("*"));
        assert!(!is_variable_name(""));
        assert_eq!(
            variable_names(" a, String , .., b "),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(designator_keyword("@args(a)"), "@args");
        assert_eq!(designator_keyword("bean"), "bean");
    }
}
