//! # dtbc — DTA text to DTB binary
//!
//! DTA is a LISP-like configuration text format; DTB is the fixed little-endian
//! binary form a game engine's data loader reads. This crate parses DTA into an
//! in-memory tree, numbers every nested tree, encodes it as DTB, and decodes DTB
//! back into the same tree.
//!
//! ## DTA syntax
//!
//! - `42`, `-7` integers; `3.14`, `1e2` floats
//! - `foo` or `'two words'` symbols, `$name` variables, `"text"` strings (`\q` is an
//!   embedded double quote)
//! - `( )`, `{ }`, `[ ]` nested trees
//! - `#ifdef X`, `#ifndef X`, `#define X`, `#include X`, `#merge X`, `#undef X`,
//!   `#else`, `#endif`, `#autorun` directives (kept, never evaluated)
//! - `kDataUnhandled` sentinel
//! - `;` and `//` comments to end of line
//!
//! ## Example
//!
//! ```
//! let mut doc = dtbc::parse_str("(foo 'bar' 1.5 [2 3])").unwrap();
//! doc.renumber_from(1);
//! let bytes = dtbc::encode(&doc).unwrap();
//! let back = dtbc::decode(&bytes).unwrap();
//! assert_eq!(back, doc);
//! ```
//!
//! The `dta2dtb` binary wraps this pipeline for files; `dtb2dta` prints a DTB file
//! back as text.

pub mod chunk;
pub mod codec;
pub mod dump;
pub mod native;
pub mod parser;
pub mod scanner;

pub use chunk::{Chunk, Delimiter, DirectiveKind, Document, Tag, Tree, MAX_DEPTH};
pub use codec::{decode, encode, encode_into, CodecError};
pub use parser::{parse, parse_chunk, parse_str, parse_tree, ParseError};
