//! Semi-simple groups
//!
//! A group started by `\begingroup` must be ended by `\endgroup`,
//! and a group started by a begin group character must be ended by an end group character.
//! Unlike braces, `\begingroup` and `\endgroup` produce no output.

use texparser::engine::GroupKind;
use texparser::prelude::*;

pub const BEGINGROUP_DOC: &str = "Begin a group that must be ended by \\endgroup";
pub const ENDGROUP_DOC: &str = "End a group that was started by \\begingroup";

/// Get the `\begingroup` command.
pub fn get_begingroup<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(begingroup_primitive_fn).with_doc(BEGINGROUP_DOC)
}

/// Get the `\endgroup` command.
pub fn get_endgroup<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(endgroup_primitive_fn).with_doc(ENDGROUP_DOC)
}

fn begingroup_primitive_fn<S: EngineState>(token: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    input.begin_group(GroupKind::SemiSimple, token);
    Ok(())
}

fn endgroup_primitive_fn<S: EngineState>(token: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    input.end_group(GroupKind::SemiSimple, token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catcode, def, prefix, StdLibState};
    use std::collections::HashMap;
    use texparser::error::Kind;
    use texparser_testing::*;

    fn built_in_commands() -> HashMap<&'static str, BuiltIn<StdLibState>> {
        HashMap::from([
            ("begingroup", get_begingroup()),
            ("endgroup", get_endgroup()),
            ("catcode", catcode::get_catcode()),
            ("def", def::get_def()),
            ("global", prefix::get_global()),
        ])
    }

    test_suite![
        state(StdLibState),
        options(TestOption::BuiltInCommands(built_in_commands)),
        expansion_equality_tests(
            (empty_group, r"a\begingroup\endgroup b", "ab"),
            (
                local_definition_is_undone,
                r"\def\a{x}\begingroup\def\a{y}\a\endgroup\a",
                "yx"
            ),
            (
                global_definition_survives,
                r"\def\a{x}\begingroup\global\def\a{y}\endgroup\a",
                "y"
            ),
            (
                category_code_is_undone,
                r"\begingroup\catcode`\@=11 \def\a@{x}\a@\endgroup\def\a{y}\a@",
                "xy@"
            ),
            (
                braces_inside,
                r"\def\a{x}\begingroup{\def\a{y}\a}\a\endgroup\a",
                "{y}xx"
            ),
            (
                nested,
                r"\def\a{x}\begingroup\def\a{y}\begingroup\def\a{z}\a\endgroup\a\endgroup\a",
                "zyx"
            ),
        ),
        failure_tests(
            (endgroup_without_begingroup, r"\endgroup", Kind::UnbalancedGroup),
            (brace_ends_semisimple_group, r"\begingroup}", Kind::UnbalancedGroup),
            (endgroup_ends_brace_group, r"{\endgroup}", Kind::UnbalancedGroup),
            (unterminated, r"\begingroup a", Kind::UnterminatedGroup),
        ),
    ];
}
