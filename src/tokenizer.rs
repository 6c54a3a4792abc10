use crate::span::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenType {
    // Structural delimiters
    OpenNormal,
    CloseNormal,
    OpenConditional,
    CloseConditional,

    // Operation symbols
    Plus,
    Minus,
    Up,
    Down,
    Dot,
    Comma,
    Hash,

    // End of input
    Eof,
}

impl TokenType {
    pub fn lexeme(&self) -> &'static str {
        match self {
            TokenType::OpenNormal => "(<",
            TokenType::CloseNormal => ">)",
            TokenType::OpenConditional => "(?",
            TokenType::CloseConditional => "?)",
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Up => "^",
            TokenType::Down => "v",
            TokenType::Dot => ".",
            TokenType::Comma => ",",
            TokenType::Hash => "#",
            TokenType::Eof => "",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Eof => write!(f, "end of input"),
            other => write!(f, "{}", other.lexeme()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub span: Span,
}

impl Token {
    pub fn token_type(&self) -> &TokenType {
        &self.token_type
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenizeError {
    #[error("syntax of agony: unexpected character '{character}' at {line},{column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
}

pub fn tokens(source: &str) -> Result<Vec<Token>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut cursor = Cursor::new(source);

    loop {
        let token = cursor.token()?;
        let done = token.token_type == TokenType::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }

    Ok(tokens)
}

// Two-character delimiters come first so that "(<" never lexes as a stray '('.
const LEXEMES: &[(&str, TokenType)] = &[
    ("(<", TokenType::OpenNormal),
    (">)", TokenType::CloseNormal),
    ("(?", TokenType::OpenConditional),
    ("?)", TokenType::CloseConditional),
    ("+", TokenType::Plus),
    ("-", TokenType::Minus),
    ("^", TokenType::Up),
    ("v", TokenType::Down),
    (".", TokenType::Dot),
    (",", TokenType::Comma),
    ("#", TokenType::Hash),
];

struct Cursor<'a> {
    rest: &'a str,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            rest: source,
            line: 1,
            column: 1,
        }
    }

    fn token(&mut self) -> Result<Token, TokenizeError> {
        while let Some((_, rest)) = whitespace(self.rest).or_else(|| comment(self.rest)) {
            let len = self.rest.len() - rest.len();
            self.advance(len);
        }

        if self.rest.is_empty() {
            return Ok(Token {
                token_type: TokenType::Eof,
                span: Span::single_line(self.line, self.column, 0),
            });
        }

        for (lexeme, token_type) in LEXEMES {
            if self.rest.starts_with(lexeme) {
                let span = Span::single_line(self.line, self.column, lexeme.len());
                self.advance(lexeme.len());
                return Ok(Token {
                    token_type: token_type.clone(),
                    span,
                });
            }
        }

        Err(TokenizeError::UnexpectedCharacter {
            character: self.rest.chars().next().unwrap(),
            line: self.line,
            column: self.column,
        })
    }

    fn advance(&mut self, len: usize) {
        let (consumed, rest) = self.rest.split_at(len);
        for c in consumed.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.rest = rest;
    }
}

fn whitespace(source: &str) -> Option<((), &str)> {
    let len = source
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(char::len_utf8)
        .sum();
    if len > 0 {
        Some(((), &source[len..]))
    } else {
        None
    }
}

fn comment(source: &str) -> Option<((), &str)> {
    if source.starts_with(';') {
        let len = source
            .chars()
            .take_while(|c| *c != '\n')
            .map(char::len_utf8)
            .sum();
        Some(((), &source[len..]))
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn token_types(source: &str) -> Vec<TokenType> {
        tokens(source)
            .unwrap()
            .into_iter()
            .map(|token| token.token_type)
            .collect()
    }

    #[test]
    fn test_tokens() {
        let source = "(<+->)";
        let expected = vec![
            TokenType::OpenNormal,
            TokenType::Plus,
            TokenType::Minus,
            TokenType::CloseNormal,
            TokenType::Eof,
        ];
        assert_eq!(token_types(source), expected);
    }

    #[test]
    fn test_tokens_with_comments() {
        let source = "(< ; increment twice\n++ >)";
        let expected = vec![
            TokenType::OpenNormal,
            TokenType::Plus,
            TokenType::Plus,
            TokenType::CloseNormal,
            TokenType::Eof,
        ];
        assert_eq!(token_types(source), expected);
    }

    #[test]
    fn test_tokens_with_whitespace() {
        let source = " (<\n\t^ v . , # >) ";
        let expected = vec![
            TokenType::OpenNormal,
            TokenType::Up,
            TokenType::Down,
            TokenType::Dot,
            TokenType::Comma,
            TokenType::Hash,
            TokenType::CloseNormal,
            TokenType::Eof,
        ];
        assert_eq!(token_types(source), expected);
    }

    #[test]
    fn test_delimiters_are_atomic() {
        let source = "(?v?)";
        let expected = vec![
            TokenType::OpenConditional,
            TokenType::Down,
            TokenType::CloseConditional,
            TokenType::Eof,
        ];
        assert_eq!(token_types(source), expected);
    }

    #[test]
    fn test_empty_instruction_pair() {
        let source = "(<>)";
        let expected = vec![TokenType::OpenNormal, TokenType::CloseNormal, TokenType::Eof];
        assert_eq!(token_types(source), expected);
    }

    #[test]
    fn test_unexpected_character() {
        let source = "(<*>)";
        let error = tokens(source).unwrap_err();
        assert!(matches!(
            error,
            TokenizeError::UnexpectedCharacter {
                character: '*',
                line: 1,
                column: 3,
            }
        ));
    }

    #[test]
    fn test_lone_paren_is_rejected() {
        let error = tokens("(").unwrap_err();
        assert!(matches!(
            error,
            TokenizeError::UnexpectedCharacter { character: '(', .. }
        ));
    }

    #[test]
    fn test_position_tracking_across_lines() {
        let source = "(<\n; note\n  x";
        let error = tokens(source).unwrap_err();
        assert!(matches!(
            error,
            TokenizeError::UnexpectedCharacter {
                character: 'x',
                line: 3,
                column: 3,
            }
        ));
    }

    #[test]
    fn test_spans() {
        let tokens = tokens("(<+\n->)").unwrap();
        let spans: Vec<(usize, usize)> = tokens
            .iter()
            .map(|token| (token.span.start_line, token.span.start_column))
            .collect();
        assert_eq!(spans, vec![(1, 1), (1, 3), (2, 1), (2, 2), (2, 4)]);
    }
}
