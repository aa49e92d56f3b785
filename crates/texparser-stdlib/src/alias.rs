//! `\let` aliasing command

use texparser::command::{StaticTag, Tag};
use texparser::error;
use texparser::parse;
use texparser::prelude::*;
use texparser::traits::*;

pub const LET_DOC: &str = "Assign a command or character to a control sequence";

/// Get the `\let` command.
pub fn get_let<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(let_primitive_fn)
        .with_tag(let_tag())
        .with_doc(LET_DOC)
}

static LET_TAG: StaticTag = StaticTag::new();

pub fn let_tag() -> Tag {
    LET_TAG.get()
}

fn let_primitive_fn<S: EngineState>(let_token: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    let scope = S::variable_assignment_scope_hook(input.state_mut());
    let (_, alias) = parse::parse_command_ref(input.unexpanded())?;
    parse::OptionalEqualsUnexpanded::parse(input)?;
    let token = input.unexpanded().next_or_else(|| {
        error::EndOfInputError::new("reading the right hand side of a \\let assignment")
    })?;
    log::debug!(
        "{} {} = {}",
        let_token.text(input.engine().cs_name_interner()),
        alias.to_string(input.engine().cs_name_interner()),
        token.text(input.engine().cs_name_interner()),
    );
    // An undefined right hand side makes the alias undefined too.
    input.commands_map_mut().alias_token(alias, token, scope);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{def, prefix, StdLibState};
    use std::collections::HashMap;
    use texparser::error::Kind;
    use texparser_testing::*;

    fn built_in_commands() -> HashMap<&'static str, BuiltIn<StdLibState>> {
        HashMap::from([
            ("def", def::get_def()),
            ("global", prefix::get_global()),
            ("let", get_let()),
            ("assertGlobalIsFalse", prefix::get_assert_global_is_false()),
        ])
    }

    test_suite![
        state(StdLibState),
        options(TestOption::BuiltInCommands(built_in_commands)),
        expansion_equality_tests(
            (let_for_macro, r"\def\A{abc}\let\B\A\B", "abc"),
            (let_for_macro_equals, r"\def\A{abc}\let\B=\A\B", "abc"),
            (let_for_macro_equals_spaces, r"\def\A{abc}\let\B = \A\B", "abc"),
            (let_copies_current_meaning, r"\def\A{a}\let\B\A\def\A{b}\B\A", "ab"),
            (local, r"\def\A{a}\def\B{b}\let\C=\A{\let\C=\B \C}\C", "{b}a"),
            (
                global,
                r"\def\A{a}\def\B{b}\let\C=\A{\global\let\C=\B \C}\C",
                "{b}b"
            ),
            (let_character, r"\let\A=x\A\A", "xx"),
            (let_begin_group, r"\let\bgroup={\bgroup a}", "{a}"),
            (let_primitive, r"\let\define=\def\define\A{y}\A", "y"),
            (
                global_let_takes_global,
                r"\def\A{a}\global\let\B\A\assertGlobalIsFalse",
                ""
            ),
        ),
        failure_tests(
            (let_undefined_makes_undefined, r"\let\B=\A\B", Kind::UndefinedControlSequence),
            (let_end_of_input, r"\let\B=", Kind::InvalidArgument),
            (let_character_target, r"\let a=b", Kind::InvalidArgument),
        ),
    ];
}
