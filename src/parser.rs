use std::cell::RefCell;

use crate::{
    ast::{Element, Instruction, InstructionKind, Op, Program},
    tokenizer::{Token, TokenType},
};

#[derive(Debug)]
pub struct ParseErrors(Vec<ParseErrorWithContext>);

impl std::error::Error for ParseErrors {}

impl std::fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "syntax of agony: {} parse error(s)", self.0.len())?;
        for error in &self.0 {
            writeln!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl From<ParseErrorWithContext> for ParseErrors {
    fn from(error: ParseErrorWithContext) -> Self {
        ParseErrors(vec![error])
    }
}

#[derive(Debug)]
pub struct ParseErrorWithContext {
    pub error: ParseError,
    context: ParseContext,
    pub token: Option<Token>,
}

impl std::fmt::Display for ParseErrorWithContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "While parsing {}",
            self.context.stack.borrow().join(" > ")
        )?;
        write!(f, "{}", self.error)?;
        if let Some(token) = &self.token {
            write!(
                f,
                " at {} but found \"{}\"",
                token.span, token.token_type
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Expected \"{0}\"")]
    Expected(TokenType),
    #[error("Expected one of {0:?}")]
    ExpectedOneOf(Vec<TokenType>),
}

#[derive(Debug, Clone)]
struct ParseContext {
    stack: RefCell<Vec<String>>,
}

impl ParseContext {
    fn new() -> Self {
        Self {
            stack: RefCell::new(Vec::new()),
        }
    }

    fn push(&self, name: String) -> ParseContextGuard {
        self.stack.borrow_mut().push(name);
        ParseContextGuard::new(self)
    }

    fn pop(&self) {
        self.stack.borrow_mut().pop();
    }
}

struct ParseContextGuard<'a> {
    context: &'a ParseContext,
}

impl<'a> ParseContextGuard<'a> {
    fn new(context: &'a ParseContext) -> Self {
        Self { context }
    }
}

impl<'a> Drop for ParseContextGuard<'a> {
    fn drop(&mut self) {
        self.context.pop();
    }
}

/// Builds the instruction tree, validating the whole token stream up front.
/// A program with any structural defect is rejected in its entirety.
pub fn program(tokens: &[Token]) -> Result<Program, ParseErrors> {
    let context = ParseContext::new();
    let mut instructions = Vec::new();
    let mut tokens = tokens;
    let mut errors = Vec::new();

    let _guard = context.push("program".to_string());

    while tokens.len() > 1 {
        match instruction(&context, tokens, 0) {
            Ok((parsed, rest)) => {
                instructions.push(parsed);
                tokens = rest;
            }
            Err(err) => {
                errors.push(err);
                tokens = consume_until_after(
                    tokens,
                    &[TokenType::CloseNormal, TokenType::CloseConditional],
                );
            }
        }
    }

    if tokens.len() != 1 || tokens[0].token_type() != &TokenType::Eof {
        errors.push(ParseErrorWithContext {
            error: ParseError::Expected(TokenType::Eof),
            context: context.clone(),
            token: tokens.first().cloned(),
        });
    }

    if !errors.is_empty() {
        return Err(ParseErrors(errors));
    }

    Ok(Program(instructions))
}

fn consume_until_after<'a>(tokens: &'a [Token], token_types: &[TokenType]) -> &'a [Token] {
    let mut tokens = tokens;
    while let Some(token) = tokens.first() {
        if token.token_type() == &TokenType::Eof {
            return tokens;
        }
        if token_types.iter().any(|t| t == token.token_type()) {
            return &tokens[1..];
        }
        tokens = &tokens[1..];
    }
    tokens
}

fn instruction<'a>(
    context: &ParseContext,
    tokens: &'a [Token],
    depth: usize,
) -> Result<(Instruction, &'a [Token]), ParseErrorWithContext> {
    let opener = tokens.first();
    let (kind, closer) = match opener.map(Token::token_type) {
        Some(TokenType::OpenNormal) => (InstructionKind::Normal, TokenType::CloseNormal),
        Some(TokenType::OpenConditional) => {
            (InstructionKind::Conditional, TokenType::CloseConditional)
        }
        _ => {
            return Err(ParseErrorWithContext {
                error: ParseError::ExpectedOneOf(vec![
                    TokenType::OpenNormal,
                    TokenType::OpenConditional,
                ]),
                context: context.clone(),
                token: opener.cloned(),
            })
        }
    };

    let opener = opener.expect("opener kind was just matched");
    let _guard = context.push(format!("{} at {}", opener.token_type, opener.span));

    let mut tokens = &tokens[1..];
    let mut elements = Vec::new();

    loop {
        match tokens.first() {
            Some(token) if token.token_type() == &closer => {
                return Ok((
                    Instruction {
                        kind,
                        depth,
                        elements,
                    },
                    &tokens[1..],
                ));
            }
            Some(token) => {
                if let Some(op) = operation(token.token_type()) {
                    elements.push(Element::Symbol(op));
                    tokens = &tokens[1..];
                } else if matches!(
                    token.token_type(),
                    TokenType::OpenNormal | TokenType::OpenConditional
                ) {
                    let (child, rest) = instruction(context, tokens, depth + 1)?;
                    elements.push(Element::Nested(child));
                    tokens = rest;
                } else {
                    // A mismatched closer or end of input: the instruction
                    // closes only on the delimiter matching its opener kind.
                    return Err(ParseErrorWithContext {
                        error: ParseError::Expected(closer),
                        context: context.clone(),
                        token: Some(token.clone()),
                    });
                }
            }
            None => {
                return Err(ParseErrorWithContext {
                    error: ParseError::Expected(closer),
                    context: context.clone(),
                    token: None,
                });
            }
        }
    }
}

fn operation(token_type: &TokenType) -> Option<Op> {
    match token_type {
        TokenType::Plus => Some(Op::Plus),
        TokenType::Minus => Some(Op::Minus),
        TokenType::Up => Some(Op::Up),
        TokenType::Down => Some(Op::Down),
        TokenType::Dot => Some(Op::Print),
        TokenType::Comma => Some(Op::Read),
        TokenType::Hash => Some(Op::Clear),
        _ => None,
    }
}
