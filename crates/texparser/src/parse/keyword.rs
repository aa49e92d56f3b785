//! TeX keywords.

use super::{describe, skip_spaces, Parsable};
use crate::engine::{EngineState, ExpandedStream, TokenStream};
use crate::error;
use crate::prelude as txl;
use crate::token::Value;

/// When parsed, this type consumes an optional `by` keyword from the input stream.
///
/// Leading spaces are skipped.
/// The keyword is a `b` or `B` letter token followed by a `y` or `Y` letter token.
#[derive(Debug)]
pub struct OptionalBy;

const BY_GUIDANCE: &str = "the `by` keyword consists of a b or B letter token, then a y or Y letter token";

impl<S: EngineState> Parsable<S> for OptionalBy {
    fn parse_impl(input: &mut ExpandedStream<S>) -> txl::Result<Self> {
        skip_spaces(input)?;
        if get_optional_element![input, Value::Letter('b' | 'B') => (),].is_none() {
            return Ok(OptionalBy);
        }
        let token = input.next_or_else(|| {
            error::EndOfInputError::new("reading the `by` keyword").with_note(BY_GUIDANCE)
        })?;
        match token.value() {
            Value::Letter('y' | 'Y') => Ok(OptionalBy),
            _ => Err(input.error(
                error::SimpleTokenError::new(
                    token,
                    format!(
                        "expected the second letter of the `by` keyword, found {}",
                        describe(token, input.engine().cs_name_interner())
                    ),
                )
                .with_note(BY_GUIDANCE),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::run;
    use super::*;
    use crate::error::Kind;

    #[test]
    fn by_is_consumed() {
        let (result, rest) = run(" by 3", |input| OptionalBy::parse(input));
        assert!(result.is_ok());
        assert_eq!(rest, " 3");
    }

    #[test]
    fn uppercase_by_is_consumed() {
        let (result, rest) = run("BY3", |input| OptionalBy::parse(input));
        assert!(result.is_ok());
        assert_eq!(rest, "3");
    }

    #[test]
    fn missing_by_is_fine() {
        let (result, rest) = run("3", |input| OptionalBy::parse(input));
        assert!(result.is_ok());
        assert_eq!(rest, "3");
    }

    #[test]
    fn incomplete_by_fails() {
        let (result, _) = run("b3", |input| OptionalBy::parse(input));
        assert_eq!(result.unwrap_err().kind(), Kind::InvalidArgument);
    }
}
