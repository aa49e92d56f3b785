//! Map type
use super::*;
use std::collections::HashMap;
use std::fmt;
use texparser_stdext::collections::scopedmap::{Scope, ScopedMap};

/// Map from control sequence names and active characters to commands.
///
/// Both tables are scoped: a local assignment is undone when the current group ends.
/// Built-in commands are additionally kept in a flat table so that their documentation
/// can be found even after they have been copied to another name with `\let`.
pub struct Map<S> {
    commands: ScopedMap<token::CsName, Command<S>>,
    active_chars: ScopedMap<char, Command<S>>,
    built_ins: HashMap<token::CsName, BuiltIn<S>>,
}

impl<S> Default for Map<S> {
    fn default() -> Self {
        Self {
            commands: Default::default(),
            active_chars: Default::default(),
            built_ins: Default::default(),
        }
    }
}

impl<S> Map<S> {
    /// Returns the command the reference currently points to, or [None] if it's undefined.
    #[inline]
    pub fn resolve(&self, command_ref: &token::CommandRef) -> Option<&Command<S>> {
        match command_ref {
            token::CommandRef::ControlSequence(name) => self.commands.get(name),
            token::CommandRef::ActiveCharacter(c) => self.active_chars.get(c),
        }
    }

    #[inline]
    pub fn get_tag(&self, command_ref: &token::CommandRef) -> Option<Tag> {
        self.resolve(command_ref).and_then(Command::tag)
    }

    pub fn built_ins(&self) -> &HashMap<token::CsName, BuiltIn<S>> {
        &self.built_ins
    }

    /// Returns the documentation of the primitive the reference points to.
    ///
    /// This works even if the primitive has been aliased to a different name.
    pub fn doc(&self, command_ref: &token::CommandRef) -> Option<&'static str> {
        let command = self.resolve(command_ref)?;
        self.built_ins
            .values()
            .find(|built_in| built_in.cmd().same_meaning(command))
            .and_then(BuiltIn::doc)
    }

    /// Registers a primitive under the given name.
    ///
    /// Primitives are always defined globally.
    pub fn register_built_in(&mut self, name: token::CsName, built_in: BuiltIn<S>) {
        self.commands
            .insert(name, built_in.cmd().clone(), Scope::Global);
        self.built_ins.insert(name, built_in);
    }

    pub fn insert(&mut self, command_ref: token::CommandRef, command: Command<S>, scope: Scope) {
        match command_ref {
            token::CommandRef::ControlSequence(name) => {
                self.commands.insert(name, command, scope);
            }
            token::CommandRef::ActiveCharacter(c) => {
                self.active_chars.insert(c, command, scope);
            }
        }
    }

    pub fn insert_macro(
        &mut self,
        command_ref: token::CommandRef,
        texmacro: texmacro::Macro,
        scope: Scope,
    ) {
        self.insert(command_ref, Command::Macro(rc::Rc::new(texmacro)), scope);
    }

    /// Makes the reference undefined, as `\let\a=\undefined` does.
    pub fn remove(&mut self, command_ref: &token::CommandRef, scope: Scope) {
        match command_ref {
            token::CommandRef::ControlSequence(name) => {
                self.commands.remove(name, scope);
            }
            token::CommandRef::ActiveCharacter(c) => {
                self.active_chars.remove(c, scope);
            }
        }
    }

    /// Makes `alias` point to the command `command` currently points to.
    pub fn alias_control_sequence(
        &mut self,
        alias: token::CommandRef,
        command: &token::CommandRef,
        scope: Scope,
    ) -> std::result::Result<(), InvalidAlias> {
        let command = match self.resolve(command) {
            None => return Err(InvalidAlias),
            Some(command) => command.clone(),
        };
        self.insert(alias, command, scope);
        Ok(())
    }

    /// Makes `alias` an alias of the character token.
    pub fn alias_token(&mut self, alias: token::CommandRef, token: token::Token, scope: Scope) {
        match token.value() {
            token::Value::CommandRef(command_ref) => {
                // Aliasing a command token is aliasing its current meaning.
                if self.alias_control_sequence(alias, &command_ref, scope).is_err() {
                    self.remove(&alias, scope);
                }
            }
            value => self.insert(alias, Command::CharacterTokenAlias(value), scope),
        }
    }

    /// Returns the names of all defined control sequences.
    pub fn cs_names(&self) -> impl Iterator<Item = token::CsName> + '_ {
        self.commands.iter().map(|(name, _)| *name)
    }

    pub(crate) fn begin_scope(&mut self) {
        self.commands.begin_scope();
        self.active_chars.begin_scope();
    }

    pub(crate) fn end_scope(&mut self) {
        // Both tables are always in the same number of scopes as the engine's group stack.
        let _ = self.commands.end_scope();
        let _ = self.active_chars.end_scope();
    }

    pub fn len(&self) -> usize {
        self.commands.len() + self.active_chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Error returned when aliasing an undefined command.
#[derive(Debug)]
pub struct InvalidAlias;

impl fmt::Display for InvalidAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid alias: the control sequence to alias is undefined"
        )
    }
}

impl std::error::Error for InvalidAlias {}
