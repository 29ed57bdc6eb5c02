//! Translator from the stack VM language to Hack assembly.
//!
//! A run reads one or more compilation units, emits an optional bootstrap,
//! and writes every unit's code to a single assembly stream:
//!
//! ```
//! use vm_translator::{translate_to_string, Options, Unit};
//!
//! let units = [Unit::new("Add", "push constant 7\npush constant 8\nadd\n")];
//! let options = Options { bootstrap: false, annotate: false, ..Options::default() };
//! let asm = translate_to_string(&units, options).unwrap();
//! assert!(asm.starts_with("@7\nD=A\n"));
//! ```

pub mod log;

pub mod ast;
pub mod cli;
pub mod driver;
pub mod error;
pub mod parser;
pub mod translator;

pub use ast::{ArithmeticOp, Instruction, Segment, SourceLine};
pub use driver::{translate_to_string, translate_units, Summary, Unit};
pub use error::{Location, TranslateError};
pub use translator::{Options, TranslationState, Translator};
