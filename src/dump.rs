//! Render a tree back to DTA-like text for diagnostics.
//!
//! The output is an approximation: comments and the original spacing are gone,
//! every symbol is single-quoted and directive arguments are always quoted.
//! [`Tree`] and [`Chunk`] implement `Display` with the same rendering.

use crate::chunk::{Chunk, Delimiter, Document, Tree};
use std::fmt;

pub fn document_to_text(doc: &Document) -> String {
    doc.tree.to_string()
}

/// Chunks separated by one space.
pub fn tree_to_text(tree: &Tree) -> String {
    tree.to_string()
}

pub fn chunk_to_text(chunk: &Chunk) -> String {
    chunk.to_string()
}

impl fmt::Display for Tree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chunk) in self.chunks.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", chunk)?;
        }
        Ok(())
    }
}

impl fmt::Display for Chunk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chunk::Int(i) => write!(f, "{}", i),
            Chunk::Float(v) => write!(f, "{:.6}", *v as f64),
            Chunk::Symbol(t) => write!(f, "'{}'", String::from_utf8_lossy(t)),
            Chunk::String(t) => write!(f, "\"{}\"", String::from_utf8_lossy(t)),
            Chunk::Variable(t) => write!(f, "${}", String::from_utf8_lossy(t)),
            Chunk::Directive(kind, t) => {
                writeln!(f, "#{} '{}'", kind.keyword(), String::from_utf8_lossy(t))
            }
            Chunk::Else => writeln!(f, "#else"),
            Chunk::EndIf => writeln!(f, "#endif"),
            Chunk::AutoRun => writeln!(f, "#autorun"),
            Chunk::Unhandled => f.write_str("kDataUnhandled"),
            Chunk::SubTree(delim, tree) => {
                write!(f, "{}{}{}", delim.open() as char, tree, delim.close() as char)
            }
        }
    }
}

/// One-line outline of a tree: node id, delimiter and chunk count per nested tree,
/// indented by depth. Used by `dtb2dta --outline`.
pub fn outline(tree: &Tree) -> String {
    Outline {
        tree,
        delim: None,
        depth: 0,
    }
    .to_string()
}

struct Outline<'t, 'a> {
    tree: &'t Tree<'a>,
    delim: Option<Delimiter>,
    depth: usize,
}

impl fmt::Display for Outline<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = "  ".repeat(self.depth);
        match self.delim {
            Some(d) => write!(f, "{}{}", indent, d.open() as char)?,
            None => write!(f, "{}top", indent)?,
        }
        writeln!(f, " node {} ({} chunks)", self.tree.node_id, self.tree.len())?;
        for chunk in &self.tree.chunks {
            if let Chunk::SubTree(d, sub) = chunk {
                let nested = Outline {
                    tree: sub,
                    delim: Some(*d),
                    depth: self.depth + 1,
                };
                write!(f, "{}", nested)?;
            }
        }
        Ok(())
    }
}
