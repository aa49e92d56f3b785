//! Error types and error display logic.
//!
//! Every error the engine can return implements the [TexError] trait.
//! The trait describes what went wrong and where, in terms of a [Location].
//! Before the error leaves the engine it is converted into an [Error],
//! which resolves the location to a line, column and byte offset and
//! collects a stack trace as it propagates through macro and primitive calls.

mod display;

use crate::engine;
use crate::token::trace::{Position, SourceCodeTrace};
use crate::token::Token;

/// The kind of an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    /// An invalid character or byte sequence in the input.
    Lex,
    /// An end of group with no matching begin group.
    UnbalancedGroup,
    /// The input ended inside a group.
    UnterminatedGroup,
    /// A macro invocation does not match its parameter text.
    ParameterMatch,
    /// A control sequence or active character with no definition.
    UndefinedControlSequence,
    /// Expansion did not produce a token within the configured number of expansions.
    ExpansionDepthExceeded,
    /// An `\else`, `\or` or `\fi` with no conditional, or an unfinished conditional.
    UnbalancedConditional,
    /// A primitive received an argument it cannot accept.
    InvalidArgument,
}

impl Kind {
    fn default_annotation(&self) -> &'static str {
        match self {
            Kind::Lex => "invalid input",
            Kind::UnbalancedGroup => "unbalanced group",
            Kind::UnterminatedGroup => "group opened here",
            Kind::ParameterMatch => "macro invoked here",
            Kind::UndefinedControlSequence => "undefined control sequence",
            Kind::ExpansionDepthExceeded => "expansion started here",
            Kind::UnbalancedConditional => "unbalanced conditional",
            Kind::InvalidArgument => "invalid argument",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Kind::Lex => "LexError",
            Kind::UnbalancedGroup => "UnbalancedGroupError",
            Kind::UnterminatedGroup => "UnterminatedGroupError",
            Kind::ParameterMatch => "ParameterMatchError",
            Kind::UndefinedControlSequence => "UndefinedControlSequenceError",
            Kind::ExpansionDepthExceeded => "ExpansionDepthExceeded",
            Kind::UnbalancedConditional => "UnbalancedConditionalError",
            Kind::InvalidArgument => "InvalidArgumentError",
        };
        write!(f, "{s}")
    }
}

/// Where an error happened.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Location {
    Token(Token),
    EndOfInput,
}

/// Implemented by all errors the engine can return.
pub trait TexError: std::fmt::Debug + 'static {
    fn kind(&self) -> Kind;

    fn location(&self) -> Location;

    fn title(&self) -> String;

    fn notes(&self) -> Vec<String> {
        vec![]
    }

    fn source_annotation(&self) -> String {
        self.kind().default_annotation().into()
    }
}

/// What the engine was doing when an error propagated through a command.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OperationKind {
    Expansion,
    MacroExpansion,
    Execution,
}

impl OperationKind {
    fn action(&self) -> &'static str {
        match self {
            OperationKind::Expansion => "expanding this primitive",
            OperationKind::MacroExpansion => "expanding this macro",
            OperationKind::Execution => "executing this primitive",
        }
    }
}

/// One command the error propagated through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTraceElement {
    pub context: OperationKind,
    pub trace: SourceCodeTrace,
}

/// An error with its source position resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: Kind,
    title: String,
    notes: Vec<String>,
    source_annotation: String,
    trace: SourceCodeTrace,
    stack_trace: Vec<StackTraceElement>,
}

impl Error {
    pub fn new<S, E: TexError>(engine: &engine::Engine<S>, err: E) -> Box<Error> {
        let trace = match err.location() {
            Location::Token(token) => engine.trace(token),
            Location::EndOfInput => engine.trace_end_of_input(),
        };
        Box::new(Error {
            kind: err.kind(),
            title: err.title(),
            notes: err.notes(),
            source_annotation: err.source_annotation(),
            trace,
            stack_trace: vec![],
        })
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Returns where the error happened.
    pub fn position(&self) -> Position {
        self.trace.position
    }

    pub fn trace(&self) -> &SourceCodeTrace {
        &self.trace
    }

    /// Returns the commands the error propagated through, innermost first.
    pub fn stack_trace(&self) -> &[StackTraceElement] {
        &self.stack_trace
    }

    pub(crate) fn add_context(&mut self, context: OperationKind, trace: SourceCodeTrace) {
        self.stack_trace.push(StackTraceElement { context, trace });
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        display::format_error(f, self)
    }
}

impl std::error::Error for Error {}

/// Error at a token, for use by primitives.
#[derive(Debug)]
pub struct SimpleTokenError {
    kind: Kind,
    token: Token,
    title: String,
    notes: Vec<String>,
}

impl SimpleTokenError {
    /// Creates a new error of kind [Kind::InvalidArgument].
    pub fn new<T: Into<String>>(token: Token, title: T) -> SimpleTokenError {
        SimpleTokenError {
            kind: Kind::InvalidArgument,
            token,
            title: title.into(),
            notes: vec![],
        }
    }

    pub fn with_kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_note<T: Into<String>>(mut self, note: T) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl TexError for SimpleTokenError {
    fn kind(&self) -> Kind {
        self.kind
    }

    fn location(&self) -> Location {
        Location::Token(self.token)
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn notes(&self) -> Vec<String> {
        self.notes.clone()
    }
}

/// Error raised when the input ends while a command is reading its arguments.
#[derive(Debug)]
pub struct EndOfInputError {
    kind: Kind,
    doing: String,
    notes: Vec<String>,
}

impl EndOfInputError {
    /// Creates a new error of kind [Kind::InvalidArgument].
    ///
    /// The argument describes what was being done, e.g. "reading the name of a macro".
    pub fn new<T: Into<String>>(doing: T) -> EndOfInputError {
        EndOfInputError {
            kind: Kind::InvalidArgument,
            doing: doing.into(),
            notes: vec![],
        }
    }

    pub fn with_kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_note<T: Into<String>>(mut self, note: T) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl TexError for EndOfInputError {
    fn kind(&self) -> Kind {
        self.kind
    }

    fn location(&self) -> Location {
        Location::EndOfInput
    }

    fn title(&self) -> String {
        format!("unexpected end of input while {}", self.doing)
    }

    fn notes(&self) -> Vec<String> {
        self.notes.clone()
    }

    fn source_annotation(&self) -> String {
        "input ended here".into()
    }
}

/// Error for a character with category invalid, or for bytes that cannot be decoded.
#[derive(Debug)]
pub struct InvalidCharacterError {
    pub token: Token,
    pub description: String,
}

impl TexError for InvalidCharacterError {
    fn kind(&self) -> Kind {
        Kind::Lex
    }

    fn location(&self) -> Location {
        Location::Token(self.token)
    }

    fn title(&self) -> String {
        self.description.clone()
    }
}

/// Error for a control sequence or active character with no definition.
#[derive(Debug)]
pub struct UndefinedControlSequenceError {
    pub token: Token,
    pub name: String,
    pub suggestions: Vec<String>,
}

impl TexError for UndefinedControlSequenceError {
    fn kind(&self) -> Kind {
        Kind::UndefinedControlSequence
    }

    fn location(&self) -> Location {
        Location::Token(self.token)
    }

    fn title(&self) -> String {
        format!("undefined control sequence {}", self.name)
    }

    fn notes(&self) -> Vec<String> {
        match self.suggestions.as_slice() {
            [] => vec![],
            [one] => vec![format!("did you mean {one}?")],
            many => vec![format!("did you mean one of {}?", many.join(", "))],
        }
    }
}

/// Error returned when expansion runs for too long without producing a token.
#[derive(Debug)]
pub struct ExpansionDepthExceededError {
    pub token: Token,
    pub limit: usize,
}

impl TexError for ExpansionDepthExceededError {
    fn kind(&self) -> Kind {
        Kind::ExpansionDepthExceeded
    }

    fn location(&self) -> Location {
        Location::Token(self.token)
    }

    fn title(&self) -> String {
        format!(
            "exceeded the limit of {} expansions without producing a token",
            self.limit
        )
    }

    fn notes(&self) -> Vec<String> {
        vec![
            "this usually means a macro expands to itself, like \\def\\loop{\\loop}".into(),
            "the limit can be changed with the max_expansions option".into(),
        ]
    }

    fn source_annotation(&self) -> String {
        "the limit was reached while expanding this".into()
    }
}

/// Error for an end of group token or `\endgroup` that doesn't close the innermost group.
#[derive(Debug)]
pub struct UnbalancedGroupError {
    pub token: Token,
    pub got: engine::GroupKind,
    pub open: Option<engine::GroupKind>,
}

impl TexError for UnbalancedGroupError {
    fn kind(&self) -> Kind {
        Kind::UnbalancedGroup
    }

    fn location(&self) -> Location {
        Location::Token(self.token)
    }

    fn title(&self) -> String {
        match self.open {
            None => "there is no group to end".into(),
            Some(open) => format!(
                "this {} cannot end a group that was started by a {}",
                self.got.terminator(),
                open.opener()
            ),
        }
    }

    fn notes(&self) -> Vec<String> {
        match self.open {
            None => vec![],
            Some(open) => vec![format!(
                "the innermost group must be closed by a {} first",
                open.terminator()
            )],
        }
    }
}

/// Error for a group that is still open when the input ends.
#[derive(Debug)]
pub struct UnterminatedGroupError {
    pub opened_by: Token,
    pub kind: engine::GroupKind,
    pub depth: usize,
}

impl TexError for UnterminatedGroupError {
    fn kind(&self) -> Kind {
        Kind::UnterminatedGroup
    }

    fn location(&self) -> Location {
        Location::Token(self.opened_by)
    }

    fn title(&self) -> String {
        format!(
            "the input ended inside a group started by a {}",
            self.kind.opener()
        )
    }

    fn notes(&self) -> Vec<String> {
        vec![format!(
            "{} group(s) are still open; the innermost one is shown here",
            self.depth
        )]
    }
}
