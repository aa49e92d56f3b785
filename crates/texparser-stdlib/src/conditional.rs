//! Conditional primitives
//!
//! The machinery for tracking and skipping branches lives in the core crate
//! in [texparser::conditional], along with the `\else`, `\or` and `\fi` primitives.
//! This module contains the predicates.
//!
//! # Writing new conditional primitives
//!
//! A conditional primitive evaluates its predicate and then calls
//! [true_case](texparser::conditional::true_case) or
//! [false_case](texparser::conditional::false_case).
//! It must be tagged with [if_tag](texparser::conditional::if_tag) so that it is
//! recognized as opening a new conditional when a branch is being skipped.
//! The `create_if_primitive` macro in this module does both of these things.

use crate::expansion;
use std::cmp::Ordering;
use texparser::conditional::{case_select, false_case, if_tag, true_case};
use texparser::error;
use texparser::parse;
use texparser::prelude::*;
use texparser::texmacro;
use texparser::token::catcode::CatCode;
use texparser::token::{CommandRef, Value};
use texparser::traits::*;

pub const IF_DOC: &str = "Compare the character codes of the next two expanded tokens";
pub const IFCASE_DOC: &str = "Begin a switch statement";
pub const IFCAT_DOC: &str = "Compare the category codes of the next two expanded tokens";
pub const IFCSNAME_DOC: &str = "Check if the name up to \\endcsname is a defined control sequence";
pub const IFDEFINED_DOC: &str = "Check if the next token is defined";
pub const IFFALSE_DOC: &str = "Evaluate the false branch";
pub const IFNUM_DOC: &str = "Compare two integers";
pub const IFODD_DOC: &str = "Check if an integer is odd";
pub const IFTRUE_DOC: &str = "Evaluate the true branch";
pub const IFX_DOC: &str = "Check if the next two unexpanded tokens have the same meaning";
pub const NEWIF_DOC: &str = "Define a new switch \\ifname along with \\nametrue and \\namefalse";

macro_rules! create_if_primitive {
    ($if_fn: ident, $if_primitive_fn: ident, $get_if: ident, $docs: expr) => {
        fn $if_primitive_fn<S: EngineState>(
            token: Token,
            input: &mut ExpansionInput<S>,
        ) -> Result<()> {
            match $if_fn(token, input)? {
                true => {
                    true_case(token, input);
                    Ok(())
                }
                false => false_case(token, input),
            }
        }

        pub fn $get_if<S: EngineState>() -> BuiltIn<S> {
            BuiltIn::new_expansion($if_primitive_fn)
                .with_tag(if_tag())
                .with_doc($docs)
        }
    };
}

fn if_true<S>(_: Token, _: &mut ExpansionInput<S>) -> Result<bool> {
    Ok(true)
}

fn if_false<S>(_: Token, _: &mut ExpansionInput<S>) -> Result<bool> {
    Ok(false)
}

fn if_num<S: EngineState>(_: Token, input: &mut ExpansionInput<S>) -> Result<bool> {
    let (a, ordering, b) = <(i32, Ordering, i32)>::parse(input)?;
    Ok(a.cmp(&b) == ordering)
}

fn if_odd<S: EngineState>(_: Token, input: &mut ExpansionInput<S>) -> Result<bool> {
    let n = i32::parse(input)?;
    Ok(n % 2 != 0)
}

fn if_char<S: EngineState>(_: Token, input: &mut ExpansionInput<S>) -> Result<bool> {
    let (a, b) = next_two_expanded(input)?;
    Ok(a.map(|(c, _)| c) == b.map(|(c, _)| c))
}

fn if_cat<S: EngineState>(_: Token, input: &mut ExpansionInput<S>) -> Result<bool> {
    let (a, b) = next_two_expanded(input)?;
    Ok(a.map(|(_, cat_code)| cat_code) == b.map(|(_, cat_code)| cat_code))
}

fn if_x<S: EngineState>(_: Token, input: &mut ExpansionInput<S>) -> Result<bool> {
    let mut next = |which: &str| {
        input.unexpanded().next_or_else(|| {
            error::EndOfInputError::new(format!("reading the {which} token to compare after \\ifx"))
                .with_note("\\ifx must be followed by two tokens")
        })
    };
    let a = next("first")?;
    let b = next("second")?;
    Ok(same_meaning(a, b, input))
}

fn if_defined<S: EngineState>(_: Token, input: &mut ExpansionInput<S>) -> Result<bool> {
    let next = input.unexpanded().next_or_else(|| {
        error::EndOfInputError::new("reading the token after \\ifdefined")
            .with_note("\\ifdefined must be followed by a token")
    })?;
    Ok(match next.value() {
        Value::CommandRef(command_ref) => input.commands_map().resolve(&command_ref).is_some(),
        _ => true,
    })
}

fn if_cs_name<S: EngineState>(_: Token, input: &mut ExpansionInput<S>) -> Result<bool> {
    let name = expansion::read_cs_name(input)?;
    // Unlike \csname, the name is not interned so that checking doesn't define anything.
    Ok(match input.engine().cs_name_interner().get(&name) {
        None => false,
        Some(cs_name) => input
            .commands_map()
            .resolve(&CommandRef::ControlSequence(cs_name))
            .is_some(),
    })
}

create_if_primitive![if_true, if_true_primitive_fn, get_iftrue, IFTRUE_DOC];
create_if_primitive![if_false, if_false_primitive_fn, get_iffalse, IFFALSE_DOC];
create_if_primitive![if_num, if_num_primitive_fn, get_ifnum, IFNUM_DOC];
create_if_primitive![if_odd, if_odd_primitive_fn, get_ifodd, IFODD_DOC];
create_if_primitive![if_char, if_char_primitive_fn, get_if, IF_DOC];
create_if_primitive![if_cat, if_cat_primitive_fn, get_ifcat, IFCAT_DOC];
create_if_primitive![if_x, if_x_primitive_fn, get_ifx, IFX_DOC];
create_if_primitive![if_defined, if_defined_primitive_fn, get_ifdefined, IFDEFINED_DOC];
create_if_primitive![if_cs_name, if_cs_name_primitive_fn, get_ifcsname, IFCSNAME_DOC];

fn if_case_primitive_fn<S: EngineState>(token: Token, input: &mut ExpansionInput<S>) -> Result<()> {
    let n = i32::parse(input)?;
    case_select(token, n, input)
}

/// Get the `\ifcase` primitive.
pub fn get_ifcase<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_expansion(if_case_primitive_fn)
        .with_tag(if_tag())
        .with_doc(IFCASE_DOC)
}

// Reads the next two expanded tokens and returns their character and category codes.
fn next_two_expanded<S: EngineState>(
    input: &mut ExpansionInput<S>,
) -> Result<(Option<(char, CatCode)>, Option<(char, CatCode)>)> {
    let mut next = |which: &str| {
        input.next_or_else(|| {
            error::EndOfInputError::new(format!("reading the {which} token to compare"))
                .with_note("\\if and \\ifcat must be followed by two tokens")
        })
    };
    let a = next("first")?;
    let b = next("second")?;
    Ok((char_and_cat_code(a, input), char_and_cat_code(b, input)))
}

/// Returns the character and category code that a token has for the purposes of `\if` and `\ifcat`.
///
/// A command has no character code unless it was `\let` equal to a character.
/// Commands without a character code compare equal to each other.
fn char_and_cat_code<S: EngineState>(token: Token, input: &ExpansionInput<S>) -> Option<(char, CatCode)> {
    let value = match token.value() {
        Value::CommandRef(command_ref) => match input.commands_map().resolve(&command_ref) {
            Some(Command::CharacterTokenAlias(value)) => *value,
            _ => return None,
        },
        value => value,
    };
    Some((value.char()?, value.cat_code()?))
}

/// Returns whether two tokens have the same meaning in the sense of `\ifx`.
fn same_meaning<S: EngineState>(a: Token, b: Token, input: &ExpansionInput<S>) -> bool {
    match (meaning(a, input), meaning(b, input)) {
        (Meaning::Character(a), Meaning::Character(b)) => a == b,
        (Meaning::Command(Some(a)), Meaning::Command(Some(b))) => a.same_meaning(b),
        (Meaning::Command(None), Meaning::Command(None)) => true,
        _ => false,
    }
}

enum Meaning<'a, S> {
    Character(Value),
    Command(Option<&'a Command<S>>),
}

fn meaning<S: EngineState>(token: Token, input: &ExpansionInput<S>) -> Meaning<'_, S> {
    match token.value() {
        Value::CommandRef(command_ref) => match input.commands_map().resolve(&command_ref) {
            Some(Command::CharacterTokenAlias(value)) => Meaning::Character(*value),
            command => Meaning::Command(command),
        },
        value => Meaning::Character(value),
    }
}

/// Get the `\newif` command.
///
/// `\newif\ifname` defines three control sequences, all locally:
/// `\ifname` which starts out false,
/// `\nametrue` which expands to `\let\ifname\iftrue`,
/// and `\namefalse` which expands to `\let\ifname\iffalse`.
/// The last two rely on `\let`, `\iftrue` and `\iffalse` being defined under those names,
/// exactly as in plain TeX.
pub fn get_newif<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(newif_primitive_fn).with_doc(NEWIF_DOC)
}

fn newif_primitive_fn<S: EngineState>(token: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    let (if_token, command_ref) = parse::parse_command_ref(input.unexpanded())?;
    let full_name = command_ref.to_string(input.engine().cs_name_interner());
    let name = match full_name.strip_prefix("\\if") {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return Err(input.error(
                error::SimpleTokenError::new(
                    if_token,
                    format!("cannot create a switch named {full_name}"),
                )
                .with_note("the name of a switch must be a control sequence that starts with \\if, like \\ifdraft"),
            ))
        }
    };
    log::debug!("\\newif: defining {full_name}, \\{name}true and \\{name}false");
    input.commands_map_mut().insert(
        command_ref,
        Command::Expansion(if_false_primitive_fn, Some(if_tag())),
        Scope::Local,
    );
    for (suffix, value) in [("true", "iftrue"), ("false", "iffalse")] {
        let interner = input.cs_name_interner_mut();
        let setter = interner.get_or_intern(&format!("{name}{suffix}"));
        let replacement = vec![
            Token::new_control_sequence(interner.get_or_intern("let"), token.trace_key()),
            if_token,
            Token::new_control_sequence(interner.get_or_intern(value), token.trace_key()),
        ];
        let tex_macro = texmacro::Macro::new(
            vec![],
            vec![],
            vec![texmacro::Replacement::Tokens(replacement)],
            texmacro::ExpansionKind::OnUse,
        );
        input
            .commands_map_mut()
            .insert_macro(CommandRef::ControlSequence(setter), tex_macro, Scope::Local);
    }
    Ok(())
}
