//! Commands API
//!
//! A command is whatever a control sequence or active character currently means.
//! Commands are either primitives, which are implemented in Rust and registered with
//! the engine at startup, or user defined macros created while processing a document
//! with primitives like `\def`.
//!
//! ## Expansion vs execution
//!
//! There are two kinds of primitives:
//!
//! |                                              | Expansion | Execution
//! |----------------------------------------------|-----------|-----------
//! Can read tokens from the input stream?         | Yes       | Yes
//! Can add tokens to the front of the input?      | Yes       | Yes, but it's unusual
//! Can make changes to the state?                 | No        | Yes
//! Runs when only expanding, like inside `\edef`? | Yes       | No
//!
//! Macros behave like expansion primitives.

use crate::engine;
use crate::prelude as txl;
use crate::texmacro;
use crate::token;
use std::num;
use std::rc;
use std::sync::atomic;

mod map;

pub use map::InvalidAlias;
pub use map::Map;

/// The Rust type of expansion primitive functions.
pub type ExpansionFn<S> =
    fn(token: token::Token, input: &mut engine::ExpansionInput<S>) -> txl::Result<()>;

/// The Rust type of execution primitive functions.
pub type ExecutionFn<S> =
    fn(token: token::Token, input: &mut engine::ExecutionInput<S>) -> txl::Result<()>;

/// A TeX command.
pub enum Command<S> {
    /// An expansion primitive that is implemented in the engine.
    ///
    /// Examples: `\expandafter`, `\ifnum`.
    Expansion(ExpansionFn<S>, Option<Tag>),

    /// A user defined macro.
    Macro(rc::Rc<texmacro::Macro>),

    /// A non-expansion primitive that performs operations on the state.
    ///
    /// Examples: `\def`, `\catcode`.
    Execution(ExecutionFn<S>, Option<Tag>),

    /// A command that aliases a character token.
    ///
    /// Created using `\let\cmd=<character>`.
    CharacterTokenAlias(token::Value),
}

impl<S> std::fmt::Display for Command<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Expansion(_, _) => write![f, "an expansion command"],
            Command::Macro(_) => write![f, "a user-defined macro"],
            Command::Execution(_, _) => write![f, "an execution command"],
            Command::CharacterTokenAlias(_) => write![f, "a character token alias"],
        }
    }
}

impl<S> std::fmt::Debug for Command<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Expansion(_, tag) => write![f, "Expansion(tag={tag:?})"],
            Command::Macro(m) => write![f, "Macro({m:?})"],
            Command::Execution(_, tag) => write![f, "Execution(tag={tag:?})"],
            Command::CharacterTokenAlias(v) => write![f, "CharacterTokenAlias({v:?})"],
        }
    }
}

impl<S> Command<S> {
    /// Gets the tag associated to this command, or [None] if the command has no tag.
    pub fn tag(&self) -> Option<Tag> {
        match self {
            Command::Expansion(_, tag) => *tag,
            Command::Execution(_, tag) => *tag,
            Command::Macro(_) | Command::CharacterTokenAlias(_) => None,
        }
    }

    /// Returns true if the command is expanded rather than executed.
    pub fn is_expandable(&self) -> bool {
        matches!(self, Command::Expansion(_, _) | Command::Macro(_))
    }

    /// Returns true if the two commands have the same meaning in the sense of `\ifx`.
    ///
    /// Primitives are the same if they run the same function with the same tag.
    /// Macros are the same if they have the same parameter and replacement texts.
    pub fn same_meaning(&self, other: &Command<S>) -> bool {
        match (self, other) {
            (Command::Expansion(f, t), Command::Expansion(g, u)) => {
                *f as usize == *g as usize && t == u
            }
            (Command::Execution(f, t), Command::Execution(g, u)) => {
                *f as usize == *g as usize && t == u
            }
            (Command::Macro(a), Command::Macro(b)) => rc::Rc::ptr_eq(a, b) || a == b,
            (Command::CharacterTokenAlias(a), Command::CharacterTokenAlias(b)) => a == b,
            _ => false,
        }
    }
}

// Deriving Clone would require S: Clone.
impl<S> Clone for Command<S> {
    fn clone(&self) -> Self {
        match self {
            Command::Expansion(e, t) => Command::Expansion::<S>(*e, *t),
            Command::Macro(m) => Command::Macro(m.clone()),
            Command::Execution(e, t) => Command::Execution(*e, *t),
            Command::CharacterTokenAlias(tv) => Command::CharacterTokenAlias(*tv),
        }
    }
}

/// A built-in command. This is a command provided when the engine is initialized.
///
/// This struct is a combination of a [Command] and a documentation string for the command.
pub struct BuiltIn<S> {
    cmd: Command<S>,
    doc: Option<&'static str>,
}

impl<S> BuiltIn<S> {
    /// Create a new expansion built-in command with no tag or documentation.
    pub fn new_expansion(f: ExpansionFn<S>) -> BuiltIn<S> {
        Command::Expansion(f, None).into()
    }

    /// Create a new execution built-in command with no tag or documentation.
    pub fn new_execution(f: ExecutionFn<S>) -> BuiltIn<S> {
        Command::Execution(f, None).into()
    }

    /// Set the tag for this built-in command.
    ///
    /// Tags can only be attached to primitives; for other commands this is a no-op.
    pub fn with_tag(mut self, tag: Tag) -> BuiltIn<S> {
        match &mut self.cmd {
            Command::Expansion(_, t) => *t = Some(tag),
            Command::Execution(_, t) => *t = Some(tag),
            Command::Macro(_) | Command::CharacterTokenAlias(_) => {}
        }
        self
    }

    /// Set the doc for this built-in command.
    pub fn with_doc(mut self, doc: &'static str) -> BuiltIn<S> {
        self.doc = Some(doc);
        self
    }

    pub fn cmd(&self) -> &Command<S> {
        &self.cmd
    }

    pub fn doc(&self) -> Option<&'static str> {
        self.doc
    }
}

impl<S> Clone for BuiltIn<S> {
    fn clone(&self) -> Self {
        Self {
            cmd: self.cmd.clone(),
            doc: self.doc,
        }
    }
}

impl<S> From<Command<S>> for BuiltIn<S> {
    fn from(cmd: Command<S>) -> Self {
        BuiltIn { cmd, doc: None }
    }
}

/// A tag is a piece of metadata that is optionally attached to a primitive.
///
/// Tags are used to implement TeX semantics that depend on which primitive a token refers
/// to without running it.
/// An example is conditionals.
/// When a conditional evaluates to false the input is skipped until the matching `\else`
/// or `\fi`.
/// The skipping code checks the tag of each command it sees against the tags of `\if...`,
/// `\else` and `\fi`.
/// Because the tag travels with the command, `\let\endif=\fi` works as expected.
///
/// Tags are non-zero 32 bit integers allocated from a global counter.
/// `Option<Tag>` takes up 4 bytes in memory.
#[derive(PartialEq, Eq, Clone, Copy, Debug, PartialOrd, Ord, Hash)]
pub struct Tag(num::NonZeroU32);

static NEXT_TAG_VALUE: atomic::AtomicU32 = atomic::AtomicU32::new(1);

impl Tag {
    /// Creates a new unique tag.
    ///
    /// ```
    /// # use texparser::command::Tag;
    /// let tag_1 = Tag::new();
    /// let tag_2 = Tag::new();
    /// assert_ne!(tag_1, tag_2);
    /// ```
    // Creating a tag is a global operation and shouldn't happen implicitly through Default.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Tag {
        let n = NEXT_TAG_VALUE.fetch_add(1, atomic::Ordering::Relaxed);
        match num::NonZeroU32::new(n) {
            Some(n) => Tag(n),
            None => panic!("ran out of command tags"),
        }
    }
}

/// A static tag enables creating a tag in a static variable.
///
/// ```
/// # use texparser::command::StaticTag;
/// static TAG: StaticTag = StaticTag::new();
///
/// assert_eq!(TAG.get(), TAG.get());
/// ```
pub struct StaticTag(std::sync::OnceLock<Tag>);

impl Default for StaticTag {
    fn default() -> Self {
        StaticTag::new()
    }
}

impl StaticTag {
    pub const fn new() -> StaticTag {
        StaticTag(std::sync::OnceLock::new())
    }

    /// Get the actual [Tag] out of this [StaticTag].
    /// Repeated calls to this function return the same tag.
    pub fn get(&self) -> Tag {
        *self.0.get_or_init(Tag::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_tag_size() {
        assert_eq!(std::mem::size_of::<Option<Tag>>(), 4);
    }

    static STATIC_TAG_1: StaticTag = StaticTag::new();
    static STATIC_TAG_2: StaticTag = StaticTag::new();

    #[test]
    fn tag() {
        let tag_1_val_1 = STATIC_TAG_1.get();
        let tag_2_val_1 = STATIC_TAG_2.get();
        let other_tag = Tag::new();
        assert_eq!(tag_1_val_1, STATIC_TAG_1.get());
        assert_eq!(tag_2_val_1, STATIC_TAG_2.get());
        assert_ne!(tag_1_val_1, tag_2_val_1);
        assert_ne!(tag_1_val_1, other_tag);
    }

    fn noop_1(_: token::Token, _: &mut engine::ExpansionInput<()>) -> txl::Result<()> {
        Ok(())
    }

    fn noop_2(_: token::Token, input: &mut engine::ExpansionInput<()>) -> txl::Result<()> {
        input.push_expansion(&[]);
        Ok(())
    }

    #[test]
    fn same_meaning_compares_functions_and_tags() {
        let tag = Tag::new();
        let a: Command<()> = Command::Expansion(noop_1, None);
        let b: Command<()> = Command::Expansion(noop_1, Some(tag));
        let c: Command<()> = Command::Expansion(noop_2, None);
        assert!(a.same_meaning(&a.clone()));
        assert!(!a.same_meaning(&b));
        assert!(!b.same_meaning(&c));
        assert!(Command::<()>::CharacterTokenAlias(token::Value::Letter('a'))
            .same_meaning(&Command::CharacterTokenAlias(token::Value::Letter('a'))));
    }
}
