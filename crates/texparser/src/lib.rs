//! # texparser: a TeX tokenizer and macro expansion engine.
//!
//! This crate reads TeX and LaTeX source and produces the stream of tokens left after
//! all macros and expansion primitives have been expanded.
//! It has no typesetting model: the output is tokens, not boxes.
//!
//! The main type is the [Engine](engine::Engine).
//! The engine is created with no commands defined; primitives like `\def` live in the
//! `texparser-stdlib` crate and are registered with
//! [Engine::register_primitives](engine::Engine::register_primitives).
//!
//! ```
//! use texparser::prelude::*;
//! use texparser::engine::Options;
//!
//! let mut engine = Engine::new((), Options::default());
//! engine.define_macro("greet", "#1", "Hello, #1!", Scope::Local).unwrap();
//! engine.push_source("input.tex", r"\greet{World}");
//! let tokens: Vec<Token> = engine.tokens().collect::<Result<_>>().unwrap();
//! assert_eq!(
//!     texparser::token::write_tokens(&tokens, engine.cs_name_interner()),
//!     "Hello, World!"
//! );
//! ```

extern crate self as texparser;
extern crate texparser_stdext;

pub mod command;
pub mod conditional;
pub mod engine;
pub mod error;
pub mod parse;
pub mod prelude;
pub mod texmacro;
pub mod token;

/// Module that re-exports all of the crate's traits.
///
/// This is useful for getting all of the traits in scope in a Rust module:
/// ```
/// use texparser::traits::*;
/// ```
pub mod traits {
    pub use super::engine::EngineState;
    pub use super::engine::ExpandedStream;
    pub use super::engine::HasComponent;
    pub use super::engine::TokenStream;
    pub use super::error::TexError;
    pub use super::parse::Parsable;
}
