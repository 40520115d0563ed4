//! Implementation of the template language.
//!
//! Includes the parser and runtime.
pub mod expression;
pub mod op;
pub mod program;
pub mod statement;
pub mod term;

pub use expression::{Evaluate, Expression};
pub use op::Op;
pub use program::Program;
pub use statement::Statement;
pub use term::Term;

use super::Error;

/// How deep blocks and expressions can nest inside one template.
/// Parsing and rendering both recurse, so this bounds the stack they use.
pub const MAX_DEPTH: usize = 64;

// One level deeper, unless that's too deep.
pub(crate) fn deeper(depth: usize) -> Result<usize, Error> {
    if depth >= MAX_DEPTH {
        Err(Error::TooDeep(MAX_DEPTH))
    } else {
        Ok(depth + 1)
    }
}
