//! Primitives for controlling expansion

use texparser::command::{StaticTag, Tag};
use texparser::error;
use texparser::parse;
use texparser::prelude::*;
use texparser::token::{CommandRef, Value};

pub const RELAX_DOC: &str = "Do nothing";
pub const NOEXPAND_DOC: &str = "Prevent the next token from being expanded";
pub const EXPANDAFTER_DOC: &str = "Expand the token after the next token once";
pub const CSNAME_DOC: &str = "Build a control sequence from the characters up to \\endcsname";
pub const ENDCSNAME_DOC: &str = "Terminate a \\csname or \\ifcsname name";

static RELAX_TAG: StaticTag = StaticTag::new();
static NOEXPAND_TAG: StaticTag = StaticTag::new();
static ENDCSNAME_TAG: StaticTag = StaticTag::new();

pub fn relax_tag() -> Tag {
    RELAX_TAG.get()
}

pub fn endcsname_tag() -> Tag {
    ENDCSNAME_TAG.get()
}

/// Get the `\relax` command.
pub fn get_relax<S>() -> BuiltIn<S> {
    BuiltIn::new_execution(relax_primitive_fn)
        .with_tag(relax_tag())
        .with_doc(RELAX_DOC)
}

fn relax_primitive_fn<S>(_: Token, _: &mut ExecutionInput<S>) -> Result<()> {
    Ok(())
}

/// Get the `\noexpand` command.
///
/// For states whose expansion override hook calls [noexpand_hook],
///     the primitive function here is never invoked.
/// It still works on other states, just a little more slowly.
pub fn get_noexpand<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_expansion(noexpand_fn)
        .with_tag(NOEXPAND_TAG.get())
        .with_doc(NOEXPAND_DOC)
}

fn noexpand_fn<S: EngineState>(_: Token, input: &mut ExpansionInput<S>) -> Result<()> {
    let token = next_for_noexpand(input)?;
    input.push_frozen(token);
    Ok(())
}

/// Expansion override hook that implements the `\noexpand` command.
#[inline]
pub fn noexpand_hook<S: EngineState>(
    _: Token,
    input: &mut ExpansionInput<S>,
    tag: Option<Tag>,
) -> Result<Option<Token>> {
    // Fast path: this is not the \noexpand command.
    if tag != Some(NOEXPAND_TAG.get()) {
        return Ok(None);
    }
    Ok(Some(next_for_noexpand(input)?))
}

fn next_for_noexpand<S: EngineState>(input: &mut ExpansionInput<S>) -> Result<Token> {
    input.unexpanded().next_or_else(|| {
        error::EndOfInputError::new("expanding a \\noexpand command")
            .with_note("\\noexpand must be followed by a token")
    })
}

/// Get the `\expandafter` command.
///
/// The command reads the next token without expanding it,
///     expands the token after that once,
///     and then puts the first token back in front of the result.
pub fn get_expandafter<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_expansion(expandafter_fn).with_doc(EXPANDAFTER_DOC)
}

fn expandafter_fn<S: EngineState>(_: Token, input: &mut ExpansionInput<S>) -> Result<()> {
    let first = input.unexpanded().next_or_else(|| {
        error::EndOfInputError::new("reading the first token after \\expandafter")
            .with_note("\\expandafter must be followed by two tokens")
    })?;
    if input.unexpanded().peek()?.is_none() {
        return Err(input.error(
            error::EndOfInputError::new("reading the second token after \\expandafter")
                .with_note("\\expandafter must be followed by two tokens"),
        ));
    }
    input.expanded().expand_once()?;
    input.expansions_mut().push(first);
    Ok(())
}

/// Get the `\csname` command.
pub fn get_csname<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_expansion(csname_fn).with_doc(CSNAME_DOC)
}

/// Get the `\endcsname` command.
///
/// The command only makes sense as the terminator of `\csname` or `\ifcsname`.
/// Executing it is an error.
pub fn get_endcsname<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(endcsname_primitive_fn)
        .with_tag(endcsname_tag())
        .with_doc(ENDCSNAME_DOC)
}

fn csname_fn<S: EngineState>(token: Token, input: &mut ExpansionInput<S>) -> Result<()> {
    let name = read_cs_name(input)?;
    let cs_name = input.cs_name_interner_mut().get_or_intern(&name);
    let command_ref = CommandRef::ControlSequence(cs_name);
    if input.commands_map().resolve(&command_ref).is_none() {
        log::debug!("\\csname: defining \\{name} to be \\relax");
        input.commands_map_mut().insert(
            command_ref,
            Command::Execution(relax_primitive_fn, Some(relax_tag())),
            Scope::Local,
        );
    }
    input
        .expansions_mut()
        .push(Token::new_control_sequence(cs_name, token.trace_key()));
    Ok(())
}

fn endcsname_primitive_fn<S: EngineState>(token: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    Err(input.error(
        error::SimpleTokenError::new(token, "extra \\endcsname")
            .with_note("\\endcsname may only appear after \\csname or \\ifcsname"),
    ))
}

/// Reads the name of a control sequence up to and including the terminating `\endcsname`.
///
/// The input is expanded while reading.
/// Commands that were `\let` equal to a character contribute that character.
/// Any other command is an error.
pub fn read_cs_name<S: EngineState>(input: &mut ExpansionInput<S>) -> Result<String> {
    let mut name = String::new();
    loop {
        let token = input.next_or_else(|| {
            error::EndOfInputError::new("reading a control sequence name")
                .with_note("the name must be terminated by \\endcsname")
        })?;
        let c = match token.value() {
            Value::CommandRef(command_ref) => match input.commands_map().resolve(&command_ref) {
                Some(cmd) if cmd.tag() == Some(endcsname_tag()) => return Ok(name),
                Some(Command::CharacterTokenAlias(value)) => value.char(),
                _ => None,
            },
            value => value.char(),
        };
        match c {
            Some(c) => name.push(c),
            None => {
                let description = parse::describe(token, input.engine().cs_name_interner());
                return Err(input.error(
                    error::SimpleTokenError::new(
                        token,
                        format!("unexpected {description} in a control sequence name"),
                    )
                    .with_note("only characters may appear before the \\endcsname"),
                ));
            }
        }
    }
}
