use super::{describe, Parsable};
use crate::engine::{EngineState, ExpandedStream, TokenStream};
use crate::error;
use crate::prelude as txl;
use crate::token::Value;
use std::cmp::Ordering;

/// A relation, as used by `\ifnum`.
///
/// Parsed from one of the other characters `<`, `=` or `>`, after optional spaces.
impl<S: EngineState> Parsable<S> for Ordering {
    fn parse_impl(input: &mut ExpandedStream<S>) -> txl::Result<Self> {
        super::skip_spaces(input)?;
        let guidance = "a relation is one of the characters <, = or >";
        let token = input.next_or_else(|| {
            error::EndOfInputError::new("parsing a relation").with_note(guidance)
        })?;
        match token.value() {
            Value::Other('<') => Ok(Ordering::Less),
            Value::Other('=') => Ok(Ordering::Equal),
            Value::Other('>') => Ok(Ordering::Greater),
            _ => {
                let found = describe(token, input.engine().cs_name_interner());
                Err(input.error(
                    error::SimpleTokenError::new(
                        token,
                        format!("expected a relation, found {found}"),
                    )
                    .with_note(guidance),
                ))
            }
        }
    }
}
