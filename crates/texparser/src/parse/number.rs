//! Number parsing.
//!
//! A number is zero or more signs followed by a decimal, octal or hexadecimal constant,
//! or by a character code like `` `a ``.
//! The full definition in the TeX grammar is in chapter 24 of the TeXBook.

use super::{describe, Parsable};
use crate::engine::{EngineState, ExpandedStream, TokenStream};
use crate::error;
use crate::prelude as txl;
use crate::token;
use crate::token::catcode::CatCode;
use crate::token::{Token, Value};

impl<S: EngineState> Parsable<S> for i32 {
    fn parse_impl(input: &mut ExpandedStream<S>) -> txl::Result<Self> {
        let (_, i) = parse_number_internal(input)?;
        Ok(i)
    }
}

impl<S: EngineState> Parsable<S> for CatCode {
    fn parse_impl(input: &mut ExpandedStream<S>) -> txl::Result<Self> {
        let (token, i) = parse_number_internal(input)?;
        match CatCode::try_from(i as i64) {
            Ok(cat_code) => Ok(cat_code),
            Err(_) => Err(input.error(
                error::SimpleTokenError::new(
                    token,
                    format!("expected a category code in the range [0, 15], got {i}"),
                )
                .with_note("category codes are between 0 (escape character) and 15 (invalid character)"),
            )),
        }
    }
}

impl<S: EngineState> Parsable<S> for char {
    fn parse_impl(input: &mut ExpandedStream<S>) -> txl::Result<Self> {
        let (token, i) = parse_number_internal(input)?;
        match u32::try_from(i).ok().and_then(char::from_u32) {
            Some(c) => Ok(c),
            None => Err(input.error(error::SimpleTokenError::new(
                token,
                format!("expected a character code, got {i}"),
            ))),
        }
    }
}

const GUIDANCE_BEGINNING: &str =
    "a number begins with zero or more + or - signs followed by one of the following:
- A decimal digit (0-9), which begins a decimal number.
- The character ', which indicates the beginning of an octal number.
- The character \", which indicates the beginning of a hexadecimal number.
- The character `, followed by a character token or single character control sequence.
    The number is the character's code.";

fn parse_number_internal<S: EngineState>(
    stream: &mut ExpandedStream<S>,
) -> txl::Result<(Token, i32)> {
    let negative = parse_optional_signs(stream)?;
    let first_token = stream.next_or_else(|| {
        error::EndOfInputError::new("parsing a number").with_note(GUIDANCE_BEGINNING)
    })?;
    let result = match first_token.value() {
        Value::Other(c @ '0'..='9') => parse_constant::<S, 10>(stream, (c as u8 - b'0') as i32)?,
        Value::Other('\'') => parse_constant::<S, 8>(stream, 0)?,
        Value::Other('"') => parse_constant::<S, 16>(stream, 0)?,
        Value::Other('`') => parse_character(stream)?,
        Value::CommandRef(_) => match S::internal_integer_hook(first_token, stream)? {
            // An internal integer is not followed by an optional space.
            Some(i) => return Ok((first_token, if negative { i.wrapping_neg() } else { i })),
            None => return Err(not_a_number_error(stream, first_token)),
        },
        _ => return Err(not_a_number_error(stream, first_token)),
    };
    get_optional_element![stream, Value::Space(_) => (),];
    let result = match negative {
        false => result,
        true => -result,
    };
    Ok((first_token, result))
}

fn not_a_number_error<S: EngineState>(
    stream: &ExpandedStream<S>,
    first_token: Token,
) -> Box<error::Error> {
    let found = describe(first_token, stream.engine().cs_name_interner());
    stream.error(
        error::SimpleTokenError::new(
            first_token,
            format!("expected the beginning of a number, found {found}"),
        )
        .with_note(GUIDANCE_BEGINNING),
    )
}

/// Parses optional signs and spaces, and returns true if the combination is negative.
fn parse_optional_signs<S: EngineState>(stream: &mut ExpandedStream<S>) -> txl::Result<bool> {
    let mut negative = false;
    while let Some(sign) = get_optional_element![
        stream,
        Value::Other('+') => false,
        Value::Other('-') => true,
        Value::Space(_) => false,
    ] {
        negative ^= sign;
    }
    Ok(negative)
}

fn parse_character<S: EngineState>(stream: &mut ExpandedStream<S>) -> txl::Result<i32> {
    let guidance = "a character is a character token or single character control sequence like \\a";
    let token = stream
        .unexpanded()
        .next_or_else(|| error::EndOfInputError::new("parsing a character").with_note(guidance))?;
    let c = match token.value() {
        Value::CommandRef(token::CommandRef::ActiveCharacter(c)) => Some(c),
        Value::CommandRef(token::CommandRef::ControlSequence(cs_name)) => {
            let name = stream
                .engine()
                .cs_name_interner()
                .resolve(cs_name)
                .unwrap_or_default();
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        }
        value => value.char(),
    };
    match c {
        Some(c) => Ok(c as i32),
        None => {
            let found = describe(token, stream.engine().cs_name_interner());
            Err(stream.error(
                error::SimpleTokenError::new(token, format!("expected a character, found {found}"))
                    .with_note(guidance),
            ))
        }
    }
}

fn parse_constant<S: EngineState, const RADIX: u32>(
    stream: &mut ExpandedStream<S>,
    mut result: i32,
) -> txl::Result<i32> {
    let mut started = RADIX == 10;
    loop {
        let next = match stream.peek()? {
            None => break,
            Some(next) => *next,
        };
        let lsd = match (next.value(), RADIX) {
            (Value::Other(c @ '0'..='9'), _) if (c as u32 - '0' as u32) < RADIX => {
                c as u32 - '0' as u32
            }
            (Value::Other(c @ 'A'..='F') | Value::Letter(c @ 'A'..='F'), 16) => {
                c as u32 - 'A' as u32 + 10
            }
            _ => break,
        };
        stream.consume()?;
        started = true;
        result = match result
            .checked_mul(RADIX as i32)
            .and_then(|n| n.checked_add(lsd as i32))
        {
            Some(n) => n,
            None => {
                return Err(stream.error(
                    error::SimpleTokenError::new(next, "number too large")
                        .with_note(format!("the largest allowed number is {}", i32::MAX)),
                ));
            }
        };
    }
    if !started {
        let (expected, guidance) = match RADIX {
            8 => (
                "an octal digit",
                "an octal digit is a token with value 0-7 and category other",
            ),
            _ => (
                "a hexadecimal digit",
                "a hexadecimal digit is either:\n- A character token with value 0-9 and category other, or\n- A character token with value A-F and category letter or other",
            ),
        };
        return match stream.peek()?.copied() {
            None => Err(stream.error(
                error::EndOfInputError::new(format!("looking for {expected}")).with_note(guidance),
            )),
            Some(token) => {
                let found = describe(token, stream.engine().cs_name_interner());
                Err(stream.error(
                    error::SimpleTokenError::new(token, format!("expected {expected}, found {found}"))
                        .with_note(guidance),
                ))
            }
        };
    }
    Ok(result)
}
