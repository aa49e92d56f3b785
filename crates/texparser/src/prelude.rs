//! Types that almost every user of the engine needs.

pub use crate::command::BuiltIn;
pub use crate::command::Command;
pub use crate::engine::Engine;
pub use crate::engine::EngineState;
pub use crate::engine::ExecutionInput;
pub use crate::engine::ExpansionInput;
pub use crate::engine::TokenStream;
pub use crate::error::TexError;
pub use crate::token::Token;
pub use texparser_stdext::collections::scopedmap::Scope;

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, Box<crate::error::Error>>;
