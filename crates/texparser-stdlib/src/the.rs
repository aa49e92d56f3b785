//! The `\the` primitive and internal integers
//!
//! An internal integer is a quantity stored by the engine that can be used wherever a
//! number is expected.
//! In this library the internal integers are the registers,
//! accessed through `\count` or a command defined by `\countdef` or `\newcount`,
//! and the category codes, accessed through `\catcode`.

use crate::catcode;
use crate::registers;
use texparser::error;
use texparser::parse;
use texparser::prelude::*;
use texparser::token::Value;
use texparser::traits::*;

pub const THE_DOC: &str = "Write the value of an internal integer";

const THE_GUIDANCE: &str =
    "\\the must be followed by an internal integer like \\count1, \\catcode`\\a or a command defined by \\countdef";

/// Reads the value of an internal integer.
///
/// This is the implementation of [EngineState::internal_integer_hook] for states
/// that contain the register component.
pub fn internal_integer<S>(token: Token, input: &mut ExpandedStream<S>) -> Result<Option<i32>>
where
    S: EngineState + HasComponent<registers::Component>,
{
    let tag = match token.value() {
        Value::CommandRef(command_ref) => input.commands_map().get_tag(&command_ref),
        _ => None,
    };
    let tag = match tag {
        None => return Ok(None),
        Some(tag) => tag,
    };
    if tag == catcode::catcode_tag() {
        let c = char::parse(input)?;
        return Ok(Some(input.engine().cat_code(c).int() as i32));
    }
    match registers::register_ref(token, tag, input)? {
        None => Ok(None),
        Some(index) => Ok(Some(input.state().component().get(index))),
    }
}

/// Get the `\the` command.
pub fn get_the<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_expansion(the_primitive_fn).with_doc(THE_DOC)
}

fn the_primitive_fn<S: EngineState>(token: Token, input: &mut ExpansionInput<S>) -> Result<()> {
    let next = input.next_or_else(|| {
        error::EndOfInputError::new("reading the quantity after \\the").with_note(THE_GUIDANCE)
    })?;
    match S::internal_integer_hook(next, input.expanded())? {
        Some(value) => {
            input.push_string_tokens(token, &value.to_string());
            Ok(())
        }
        None => {
            let found = parse::describe(next, input.engine().cs_name_interner());
            Err(input.error(
                error::SimpleTokenError::new(next, format!("\\the cannot be applied to {found}"))
                    .with_note(THE_GUIDANCE),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{def, registers, StdLibState};
    use std::collections::HashMap;
    use texparser::error::Kind;
    use texparser_testing::*;

    fn built_in_commands() -> HashMap<&'static str, BuiltIn<StdLibState>> {
        HashMap::from([
            ("catcode", catcode::get_catcode()),
            ("count", registers::get_count()),
            ("countdef", registers::get_countdef()),
            ("def", def::get_def()),
            ("the", get_the()),
        ])
    }

    test_suite![
        state(StdLibState),
        options(TestOption::BuiltInCommands(built_in_commands)),
        expansion_equality_tests(
            (the_count, r"\count5=12 \the\count5", "12"),
            (the_negative_count, r"\count5=-12 \the\count5", "-12"),
            (the_countdef, r"\countdef\a=5 \a=3 \the\a", "3"),
            (the_catcode_letter, r"\the\catcode`\a", "11"),
            (the_catcode_begin_group, r"\the\catcode`\{", "1"),
            (
                the_catcode_after_assignment,
                r"\catcode`\a=12 \the\catcode`\a",
                "12"
            ),
            (the_expands_its_argument, r"\def\r{\count1}\count1=4 \the\r", "4"),
            (catcode_as_number, r"\count1=\catcode`\% \the\count1", "14"),
        ),
        failure_tests(
            (the_end_of_input, r"\the", Kind::InvalidArgument),
            (the_character, r"\the a", Kind::InvalidArgument),
            (the_execution_command, r"\the\def", Kind::InvalidArgument),
            (the_macro_to_character, r"\def\r{a}\the\r", Kind::InvalidArgument),
        ),
    ];
}
