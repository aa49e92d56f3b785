//! Branch tracking for conditionals.
//!
//! The engine keeps a stack of the conditionals currently being expanded.
//! A conditional primitive like `\ifx` evaluates its predicate and then calls
//! [true_case] or [false_case].
//! The true case pushes a branch and returns, so the true branch is expanded normally.
//! The false case skips input until the matching `\else` or `\fi`.
//! When the expansion later reaches `\else`, `\or` or `\fi`, those primitives check the stack
//! to make sure they are valid and skip the rest of the conditional.
//!
//! Skipping doesn't expand anything.
//! Nested conditionals are recognized by the tag of the command, so a control sequence
//! that was `\let` equal to `\fi` counts as a `\fi`.

use crate::command::{BuiltIn, StaticTag, Tag};
use crate::engine::{EngineState, ExpansionInput, TokenStream};
use crate::error;
use crate::prelude as txl;
use crate::token::{Token, Value};

static IF_TAG: StaticTag = StaticTag::new();
static ELSE_TAG: StaticTag = StaticTag::new();
static OR_TAG: StaticTag = StaticTag::new();
static FI_TAG: StaticTag = StaticTag::new();

/// Tag that must be attached to every conditional primitive.
pub fn if_tag() -> Tag {
    IF_TAG.get()
}

pub fn else_tag() -> Tag {
    ELSE_TAG.get()
}

pub fn or_tag() -> Tag {
    OR_TAG.get()
}

pub fn fi_tag() -> Tag {
    FI_TAG.get()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum BranchKind {
    // The true branch of an if conditional.
    True,
    // The false branch of an if conditional, or the default branch of a switch statement.
    Else,
    // A regular case branch of a switch statement.
    Switch,
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Branch {
    token: Token,
    kind: BranchKind,
}

impl Branch {
    pub(crate) fn token(&self) -> Token {
        self.token
    }
}

/// Must be called when a conditional evaluates to true.
pub fn true_case<S>(token: Token, input: &mut ExpansionInput<S>) {
    input.branches_mut().push(Branch {
        token,
        kind: BranchKind::True,
    });
}

/// Must be called when a conditional evaluates to false.
///
/// The input is skipped until the matching `\else`, in which case the else branch is expanded,
/// or the matching `\fi`.
pub fn false_case<S: EngineState>(token: Token, input: &mut ExpansionInput<S>) -> txl::Result<()> {
    let mut depth = 0_usize;
    loop {
        match next_tag(token, input)? {
            Some(tag) if tag == if_tag() => depth += 1,
            Some(tag) if tag == else_tag() && depth == 0 => {
                input.branches_mut().push(Branch {
                    token,
                    kind: BranchKind::Else,
                });
                return Ok(());
            }
            Some(tag) if tag == fi_tag() => match depth.checked_sub(1) {
                None => return Ok(()),
                Some(d) => depth = d,
            },
            _ => {}
        }
    }
}

/// Selects case `n` of a switch statement like `\ifcase`.
///
/// Case 0 begins immediately after the number.
/// If there are fewer cases than `n` the `\else` branch is used, if it exists.
/// Negative numbers always select the `\else` branch.
pub fn case_select<S: EngineState>(
    token: Token,
    n: i32,
    input: &mut ExpansionInput<S>,
) -> txl::Result<()> {
    if n == 0 {
        input.branches_mut().push(Branch {
            token,
            kind: BranchKind::Switch,
        });
        return Ok(());
    }
    let mut cases_to_skip = n;
    let mut depth = 0_usize;
    loop {
        match next_tag(token, input)? {
            Some(tag) if tag == if_tag() => depth += 1,
            Some(tag) if tag == or_tag() && depth == 0 && cases_to_skip > 0 => {
                cases_to_skip -= 1;
                if cases_to_skip == 0 {
                    input.branches_mut().push(Branch {
                        token,
                        kind: BranchKind::Switch,
                    });
                    return Ok(());
                }
            }
            Some(tag) if tag == else_tag() && depth == 0 => {
                input.branches_mut().push(Branch {
                    token,
                    kind: BranchKind::Else,
                });
                return Ok(());
            }
            Some(tag) if tag == fi_tag() => match depth.checked_sub(1) {
                None => return Ok(()),
                Some(d) => depth = d,
            },
            _ => {}
        }
    }
}

// Reads the next unexpanded token and returns its tag, if it has one.
fn next_tag<S: EngineState>(
    conditional: Token,
    input: &mut ExpansionInput<S>,
) -> txl::Result<Option<Tag>> {
    let token = match input.unexpanded().next()? {
        None => {
            return Err(input.error(UnbalancedConditionalError::unterminated(conditional)));
        }
        Some(token) => token,
    };
    Ok(match token.value() {
        Value::CommandRef(command_ref) => input.commands_map().get_tag(&command_ref),
        _ => None,
    })
}

// Skips to the matching \fi.
fn skip_to_fi<S: EngineState>(conditional: Token, input: &mut ExpansionInput<S>) -> txl::Result<()> {
    let mut depth = 0_usize;
    loop {
        match next_tag(conditional, input)? {
            Some(tag) if tag == if_tag() => depth += 1,
            Some(tag) if tag == fi_tag() => match depth.checked_sub(1) {
                None => return Ok(()),
                Some(d) => depth = d,
            },
            _ => {}
        }
    }
}

fn else_primitive_fn<S: EngineState>(token: Token, input: &mut ExpansionInput<S>) -> txl::Result<()> {
    let branch = input.branches_mut().pop();
    // \else is only valid at the end of a true branch or a switch case.
    match branch {
        Some(Branch {
            kind: BranchKind::True | BranchKind::Switch,
            ..
        }) => skip_to_fi(token, input),
        _ => Err(input.error(UnbalancedConditionalError::unexpected(token, "\\else"))),
    }
}

fn or_primitive_fn<S: EngineState>(token: Token, input: &mut ExpansionInput<S>) -> txl::Result<()> {
    let branch = input.branches_mut().pop();
    match branch {
        Some(Branch {
            kind: BranchKind::Switch,
            ..
        }) => skip_to_fi(token, input),
        _ => Err(input.error(UnbalancedConditionalError::unexpected(token, "\\or"))),
    }
}

fn fi_primitive_fn<S: EngineState>(token: Token, input: &mut ExpansionInput<S>) -> txl::Result<()> {
    match input.branches_mut().pop() {
        Some(_) => Ok(()),
        None => Err(input.error(UnbalancedConditionalError::unexpected(token, "\\fi"))),
    }
}

/// Get the `\else` primitive.
pub fn get_else<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_expansion(else_primitive_fn)
        .with_tag(else_tag())
        .with_doc("Start the else branch of a conditional or switch statement")
}

/// Get the `\or` primitive.
pub fn get_or<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_expansion(or_primitive_fn)
        .with_tag(or_tag())
        .with_doc("Begin the next case of a switch statement")
}

/// Get the `\fi` primitive.
pub fn get_fi<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_expansion(fi_primitive_fn)
        .with_tag(fi_tag())
        .with_doc("End a conditional or switch statement")
}

/// Error for a conditional that is not properly nested.
#[derive(Debug)]
pub struct UnbalancedConditionalError {
    token: Token,
    title: String,
    notes: Vec<String>,
}

impl UnbalancedConditionalError {
    /// The input ended while the conditional started by the token was still open.
    pub fn unterminated(token: Token) -> UnbalancedConditionalError {
        UnbalancedConditionalError {
            token,
            title: "the input ended inside this conditional".into(),
            notes: vec!["each conditional must be terminated by a \\fi".into()],
        }
    }

    /// The token closes or continues a conditional but none is in the right state.
    pub fn unexpected(token: Token, name: &str) -> UnbalancedConditionalError {
        let note = match name {
            "\\else" => "\\else is only valid in the true branch of a conditional or in a case of \\ifcase",
            "\\or" => "\\or is only valid in a case of \\ifcase",
            _ => "there is no conditional to end",
        };
        UnbalancedConditionalError {
            token,
            title: format!("unexpected {name}"),
            notes: vec![note.into()],
        }
    }
}

impl error::TexError for UnbalancedConditionalError {
    fn kind(&self) -> error::Kind {
        error::Kind::UnbalancedConditional
    }

    fn location(&self) -> error::Location {
        error::Location::Token(self.token)
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn notes(&self) -> Vec<String> {
        self.notes.clone()
    }
}
