//! The `\global`, `\long` and `\outer` prefix commands
//!
//! The `\long` and `\outer` commands restrict how macros may be used in TeX.
//! Those restrictions exist to catch runaway arguments and are not enforced here;
//! the prefixes are accepted and otherwise ignored.
//! However it is still an error to put any prefix before a command that is not a
//! definition, and `\long` and `\outer` may only come before `\def`, `\gdef`,
//! `\edef` and `\xdef`.
//!
//! # Developer notes
//!
//! The `\global` command changes the behavior, at run time, of the command that
//! follows it.
//! This module maintains a component with a `global` flag that `\global` sets to true.
//! Commands that can be prefixed with `\global` read the flag and act accordingly.
//!
//! The flag must be reset to false after it is read; otherwise `\global` would make
//! *all* subsequent assignments global.
//! The convention is that any command which can be prefixed by `\global` reads the flag
//! exactly once using the [Component::take_global] method, which returns the flag value
//! and resets it.
//! All code paths within the command must call [take_global](Component::take_global),
//! even if they don't use the result.
//! For example `\gdef` always creates a macro in the global scope, but it still calls
//! [take_global](Component::take_global).
//! The [assert_global_is_false](get_assert_global_is_false) command exists to verify
//! this in unit tests.
//!
//! Commands that only need to know the scope of the assignment can instead use the
//! [variable_assignment_scope_hook](EngineState::variable_assignment_scope_hook),
//! which [StdLibState](crate::StdLibState) wires to [variable_assignment_scope_hook].

use crate::alias;
use crate::catcode;
use crate::def;
use crate::expansion;
use crate::registers;
use texparser::command::{Command, StaticTag, Tag};
use texparser::error;
use texparser::parse;
use texparser::prelude::*;
use texparser::token::Value;
use texparser::traits::*;

pub const GLOBAL_DOC: &str = "Make the next assignment global";
pub const LONG_DOC: &str = "Allow the next macro's arguments to contain \\par (accepted and ignored)";
pub const OUTER_DOC: &str = "Mark the next macro as outer (accepted and ignored)";

/// Component for the prefix commands.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    global: bool,
}

impl Component {
    /// Get the value of the global flag and reset the flag to false.
    ///
    /// See the module documentation for correct usage of this method.
    pub fn take_global(&mut self) -> bool {
        let global = self.global;
        self.global = false;
        global
    }

    /// Get the scope of the next assignment and reset the global flag.
    pub fn take_scope(&mut self) -> Scope {
        match self.take_global() {
            true => Scope::Global,
            false => Scope::Local,
        }
    }
}

/// Scope hook for states that contain the prefix component.
#[inline]
pub fn variable_assignment_scope_hook<S: HasComponent<Component>>(state: &mut S) -> Scope {
    state.component_mut().take_scope()
}

static GLOBAL_TAG: StaticTag = StaticTag::new();
static LONG_TAG: StaticTag = StaticTag::new();
static OUTER_TAG: StaticTag = StaticTag::new();

/// Get the `\global` command.
pub fn get_global<S: EngineState + HasComponent<Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(global_primitive_fn)
        .with_tag(GLOBAL_TAG.get())
        .with_doc(GLOBAL_DOC)
}

/// Get the `\long` command.
pub fn get_long<S: EngineState + HasComponent<Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(long_primitive_fn)
        .with_tag(LONG_TAG.get())
        .with_doc(LONG_DOC)
}

/// Get the `\outer` command.
pub fn get_outer<S: EngineState + HasComponent<Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(outer_primitive_fn)
        .with_tag(OUTER_TAG.get())
        .with_doc(OUTER_DOC)
}

#[derive(Debug, Default, Clone, Copy)]
struct Prefix {
    global: Option<Token>,
    long: Option<Token>,
    outer: Option<Token>,
}

impl Prefix {
    // Returns one of the prefix tokens, for error messages.
    fn any(&self) -> Option<(Token, &'static str)> {
        if let Some(token) = self.global {
            Some((token, "\\global"))
        } else if let Some(token) = self.long {
            Some((token, "\\long"))
        } else {
            self.outer.map(|token| (token, "\\outer"))
        }
    }
}

fn global_primitive_fn<S: EngineState + HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    process_prefixes(
        Prefix {
            global: Some(token),
            ..Default::default()
        },
        input,
    )
}

fn long_primitive_fn<S: EngineState + HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    process_prefixes(
        Prefix {
            long: Some(token),
            ..Default::default()
        },
        input,
    )
}

fn outer_primitive_fn<S: EngineState + HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    process_prefixes(
        Prefix {
            outer: Some(token),
            ..Default::default()
        },
        input,
    )
}

// Commands other than the definitions that accept \global.
fn prefixable_with_global(tag: Tag) -> bool {
    tag == alias::let_tag() || tag == catcode::catcode_tag() || registers::accepts_global(tag)
}

fn process_prefixes<S: EngineState + HasComponent<Component>>(
    mut prefix: Prefix,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    complete_prefix(&mut prefix, input)?;
    let token = match input.peek()? {
        None => {
            let name = prefix.any().map_or("\\global", |(_, name)| name);
            return Err(input.error(
                error::EndOfInputError::new(format!("looking for the command after {name}"))
                    .with_note("a prefix must be followed by a definition like \\def"),
            ));
        }
        Some(&token) => token,
    };
    let tag = match token.value() {
        Value::CommandRef(command_ref) => match input.commands_map().resolve(&command_ref) {
            Some(Command::Execution(_, tag)) => *tag,
            _ => None,
        },
        _ => None,
    };
    match tag {
        Some(tag) if tag == def::def_tag() => {
            input.state_mut().component_mut().global = prefix.global.is_some();
            Ok(())
        }
        Some(tag) if prefixable_with_global(tag) => {
            if let Some(long_or_outer) = prefix.long.or(prefix.outer) {
                return Err(cannot_be_prefixed_error(token, long_or_outer, input));
            }
            input.state_mut().component_mut().global = prefix.global.is_some();
            Ok(())
        }
        _ => {
            let prefix_token = match prefix.any() {
                Some((prefix_token, _)) => prefix_token,
                None => token,
            };
            Err(cannot_be_prefixed_error(token, prefix_token, input))
        }
    }
}

// Reads the chain of prefixes after the first one.
//
// Spaces and \relax may appear between prefixes and after the last one.
fn complete_prefix<S: EngineState>(prefix: &mut Prefix, input: &mut ExecutionInput<S>) -> Result<()> {
    loop {
        let token = match input.peek()? {
            None => return Ok(()),
            Some(&token) => token,
        };
        let tag = match token.value() {
            Value::Space(_) => {
                input.consume()?;
                continue;
            }
            Value::CommandRef(command_ref) => input.commands_map().get_tag(&command_ref),
            _ => None,
        };
        match tag {
            Some(tag) if tag == GLOBAL_TAG.get() => prefix.global = Some(token),
            Some(tag) if tag == LONG_TAG.get() => prefix.long = Some(token),
            Some(tag) if tag == OUTER_TAG.get() => prefix.outer = Some(token),
            Some(tag) if tag == expansion::relax_tag() => {}
            _ => return Ok(()),
        }
        input.consume()?;
    }
}

fn cannot_be_prefixed_error<S>(
    token: Token,
    prefix_token: Token,
    input: &ExecutionInput<S>,
) -> Box<error::Error>
where
    S: EngineState,
{
    let interner = input.engine().cs_name_interner();
    let prefix_name = prefix_token.text(interner);
    let title = match token.value() {
        Value::CommandRef(_) => format!(
            "the command {} cannot be prefixed with {prefix_name}",
            token.text(interner)
        ),
        _ => format!(
            "{} cannot be prefixed with {prefix_name}",
            parse::describe(token, interner)
        ),
    };
    let note = match prefix_name.as_str() {
        "\\global" => "\\global can only be used with definitions, \\let, \\catcode and register assignments",
        _ => "\\long and \\outer can only be used with \\def, \\gdef, \\edef and \\xdef",
    };
    input.error(error::SimpleTokenError::new(token, title).with_note(note))
}

/// Get an execution command that checks that the global flag is off.
///
/// This command is used for unit testing.
/// It tests that commands that can be prefixed with `\global`
/// are following the convention described in the module docs.
/// To use it, create a test for the following TeX snippet:
/// ```tex
/// \global \command <input to command> \assertGlobalIsFalse
/// ```
pub fn get_assert_global_is_false<S: EngineState + HasComponent<Component>>() -> BuiltIn<S> {
    fn assert_global_is_false_fn<S: EngineState + HasComponent<Component>>(
        token: Token,
        input: &mut ExecutionInput<S>,
    ) -> Result<()> {
        match input.state_mut().component_mut().take_global() {
            true => Err(input.error(error::SimpleTokenError::new(
                token,
                "assertion failed: global is true",
            ))),
            false => Ok(()),
        }
    }
    BuiltIn::new_execution(assert_global_is_false_fn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use texparser::error::Kind;
    use texparser::implement_has_component;
    use texparser_testing::*;

    #[derive(Default)]
    struct State {
        prefix: Component,
    }

    impl EngineState for State {
        fn variable_assignment_scope_hook(state: &mut Self) -> Scope {
            variable_assignment_scope_hook(state)
        }
    }

    implement_has_component![State, (Component, prefix),];

    fn noop_expansion(_: Token, _: &mut ExpansionInput<State>) -> Result<()> {
        Ok(())
    }

    fn noop_execution(_: Token, _: &mut ExecutionInput<State>) -> Result<()> {
        Ok(())
    }

    fn built_in_commands() -> HashMap<&'static str, BuiltIn<State>> {
        HashMap::from([
            ("global", get_global()),
            ("long", get_long()),
            ("outer", get_outer()),
            ("def", def::get_def()),
            ("gdef", def::get_gdef()),
            ("let", alias::get_let()),
            ("catcode", catcode::get_catcode()),
            ("relax", expansion::get_relax()),
            ("noOpExpansion", BuiltIn::new_expansion(noop_expansion)),
            ("noOpExecution", BuiltIn::new_execution(noop_execution)),
            ("assertGlobalIsFalse", get_assert_global_is_false()),
        ])
    }

    test_suite![
        expansion_equality_tests(
            (local_def, r"\def\A{a}{\def\A{b}\A}\A", "{b}a"),
            (global_def, r"\def\A{a}{\global\def\A{b}\A}\A", "{b}b"),
            (global_squared, r"\def\A{a}{\global\global\def\A{b}\A}\A", "{b}b"),
            (global_then_relax, r"\def\A{a}{\global\relax\def\A{b}\A}\A", "{b}b"),
            (global_then_space, r"\def\A{a}{\global \def\A{b}\A}\A", "{b}b"),
            (long, r"\long\def\A{Hello}\A", "Hello"),
            (outer, r"\outer\def\A{Hello}\A", "Hello"),
            (
                many_prefixes,
                r"\long\outer\global\long\global\outer\def\A{Hello}\A",
                "Hello"
            ),
            (global_let, r"\def\A{a}\def\B{b}{\global\let\A\B}\A", "{}b"),
            (
                global_catcode,
                r"{\global\catcode`\@=11 }\def\a@b{x}\a@b",
                "{}x"
            ),
            (
                global_flag_is_reset,
                r"\global\def\A{a}\assertGlobalIsFalse",
                ""
            ),
            (
                global_flag_is_reset_by_gdef,
                r"\global\gdef\A{a}\assertGlobalIsFalse",
                ""
            ),
        ),
        failure_tests(
            (global_end_of_input, r"\global", Kind::InvalidArgument),
            (global_with_character, r"\global a", Kind::InvalidArgument),
            (
                global_with_undefined_command,
                r"\global \undefinedCommand",
                Kind::InvalidArgument
            ),
            (
                global_with_no_op_expansion_command,
                r"\global \noOpExpansion",
                Kind::InvalidArgument
            ),
            (
                global_with_no_op_execution_command,
                r"\global \noOpExecution",
                Kind::InvalidArgument
            ),
            (long_let, r"\long\let\A=a", Kind::InvalidArgument),
            (outer_catcode, r"\outer\catcode 64=11", Kind::InvalidArgument),
        ),
    ];
}
