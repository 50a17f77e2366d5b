//! In-memory model shared by the parser, the codecs and the debug printer.
//!
//! A [`Document`] is a version marker plus one top-level [`Tree`]; a tree is an
//! ordered list of [`Chunk`]s; nested forms are [`Chunk::SubTree`] chunks that own
//! their child tree. Text payloads are `Cow<[u8]>` so the parser can borrow spans of
//! the input while the decoders hand back owned bytes.

use std::borrow::Cow;

/// Deepest nesting accepted below the top-level tree by the parser and both
/// codecs. Each level is one recursive call.
pub const MAX_DEPTH: usize = 128;

/// Wire tag of a chunk in the DTB format. The discriminants are the on-disk codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Tag {
    Int = 0x00,
    Float = 0x01,
    Variable = 0x02,
    Symbol = 0x05,
    Unhandled = 0x06,
    IfDef = 0x07,
    Else = 0x08,
    EndIf = 0x09,
    Parens = 0x10,
    Braces = 0x11,
    String = 0x12,
    Brackets = 0x13,
    Define = 0x20,
    Include = 0x21,
    Merge = 0x22,
    IfNDef = 0x23,
    AutoRun = 0x24,
    Undef = 0x25,
}

impl Tag {
    pub fn from_u32(code: u32) -> Option<Tag> {
        Some(match code {
            0x00 => Tag::Int,
            0x01 => Tag::Float,
            0x02 => Tag::Variable,
            0x05 => Tag::Symbol,
            0x06 => Tag::Unhandled,
            0x07 => Tag::IfDef,
            0x08 => Tag::Else,
            0x09 => Tag::EndIf,
            0x10 => Tag::Parens,
            0x11 => Tag::Braces,
            0x12 => Tag::String,
            0x13 => Tag::Brackets,
            0x20 => Tag::Define,
            0x21 => Tag::Include,
            0x22 => Tag::Merge,
            0x23 => Tag::IfNDef,
            0x24 => Tag::AutoRun,
            0x25 => Tag::Undef,
            _ => return None,
        })
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Bracket kind of a nested tree: `( )`, `{ }` or `[ ]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    Parens,
    Braces,
    Brackets,
}

impl Delimiter {
    pub fn from_open(c: u8) -> Option<Delimiter> {
        match c {
            b'(' => Some(Delimiter::Parens),
            b'{' => Some(Delimiter::Braces),
            b'[' => Some(Delimiter::Brackets),
            _ => None,
        }
    }

    pub fn open(self) -> u8 {
        match self {
            Delimiter::Parens => b'(',
            Delimiter::Braces => b'{',
            Delimiter::Brackets => b'[',
        }
    }

    pub fn close(self) -> u8 {
        match self {
            Delimiter::Parens => b')',
            Delimiter::Braces => b'}',
            Delimiter::Brackets => b']',
        }
    }

    pub fn tag(self) -> Tag {
        match self {
            Delimiter::Parens => Tag::Parens,
            Delimiter::Braces => Tag::Braces,
            Delimiter::Brackets => Tag::Brackets,
        }
    }
}

/// Directives that carry one symbol-like argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    IfDef,
    IfNDef,
    Define,
    Include,
    Merge,
    Undef,
}

impl DirectiveKind {
    /// Matches the keyword after `#`. `else`, `endif` and `autorun` are not
    /// argument-taking and are handled by the parser separately.
    pub fn from_keyword(word: &[u8]) -> Option<DirectiveKind> {
        match word {
            b"ifdef" => Some(DirectiveKind::IfDef),
            b"ifndef" => Some(DirectiveKind::IfNDef),
            b"define" => Some(DirectiveKind::Define),
            b"include" => Some(DirectiveKind::Include),
            b"merge" => Some(DirectiveKind::Merge),
            b"undef" => Some(DirectiveKind::Undef),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            DirectiveKind::IfDef => "ifdef",
            DirectiveKind::IfNDef => "ifndef",
            DirectiveKind::Define => "define",
            DirectiveKind::Include => "include",
            DirectiveKind::Merge => "merge",
            DirectiveKind::Undef => "undef",
        }
    }

    pub fn tag(self) -> Tag {
        match self {
            DirectiveKind::IfDef => Tag::IfDef,
            DirectiveKind::IfNDef => Tag::IfNDef,
            DirectiveKind::Define => Tag::Define,
            DirectiveKind::Include => Tag::Include,
            DirectiveKind::Merge => Tag::Merge,
            DirectiveKind::Undef => Tag::Undef,
        }
    }
}

/// One tagged value or nested form within a [`Tree`].
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk<'a> {
    Int(i32),
    Float(f32),
    Symbol(Cow<'a, [u8]>),
    Variable(Cow<'a, [u8]>),
    /// Raw text between the double quotes; `\q` is still unresolved here.
    String(Cow<'a, [u8]>),
    Directive(DirectiveKind, Cow<'a, [u8]>),
    Else,
    EndIf,
    AutoRun,
    /// The literal token `kDataUnhandled`.
    Unhandled,
    SubTree(Delimiter, Tree<'a>),
}

impl<'a> Chunk<'a> {
    pub fn tag(&self) -> Tag {
        match self {
            Chunk::Int(_) => Tag::Int,
            Chunk::Float(_) => Tag::Float,
            Chunk::Symbol(_) => Tag::Symbol,
            Chunk::Variable(_) => Tag::Variable,
            Chunk::String(_) => Tag::String,
            Chunk::Directive(kind, _) => kind.tag(),
            Chunk::Else => Tag::Else,
            Chunk::EndIf => Tag::EndIf,
            Chunk::AutoRun => Tag::AutoRun,
            Chunk::Unhandled => Tag::Unhandled,
            Chunk::SubTree(delim, _) => delim.tag(),
        }
    }

    /// Text payload of symbol, variable, string and directive chunks.
    pub fn text(&self) -> Option<&[u8]> {
        match self {
            Chunk::Symbol(t) | Chunk::Variable(t) | Chunk::String(t) | Chunk::Directive(_, t) => {
                Some(t.as_ref())
            }
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree<'a>> {
        match self {
            Chunk::SubTree(_, tree) => Some(tree),
            _ => None,
        }
    }

    pub fn symbol(text: &'a str) -> Self {
        Chunk::Symbol(Cow::Borrowed(text.as_bytes()))
    }

    pub fn variable(text: &'a str) -> Self {
        Chunk::Variable(Cow::Borrowed(text.as_bytes()))
    }

    pub fn string(text: &'a str) -> Self {
        Chunk::String(Cow::Borrowed(text.as_bytes()))
    }

    pub fn directive(kind: DirectiveKind, text: &'a str) -> Self {
        Chunk::Directive(kind, Cow::Borrowed(text.as_bytes()))
    }

    /// Detach from the input buffer by copying every borrowed span.
    pub fn into_owned(self) -> Chunk<'static> {
        match self {
            Chunk::Int(i) => Chunk::Int(i),
            Chunk::Float(f) => Chunk::Float(f),
            Chunk::Symbol(t) => Chunk::Symbol(Cow::Owned(t.into_owned())),
            Chunk::Variable(t) => Chunk::Variable(Cow::Owned(t.into_owned())),
            Chunk::String(t) => Chunk::String(Cow::Owned(t.into_owned())),
            Chunk::Directive(kind, t) => Chunk::Directive(kind, Cow::Owned(t.into_owned())),
            Chunk::Else => Chunk::Else,
            Chunk::EndIf => Chunk::EndIf,
            Chunk::AutoRun => Chunk::AutoRun,
            Chunk::Unhandled => Chunk::Unhandled,
            Chunk::SubTree(delim, tree) => Chunk::SubTree(delim, tree.into_owned()),
        }
    }
}

/// Ordered sequence of chunks. `node_id` is 0 until [`Tree::renumber`] runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree<'a> {
    pub node_id: u32,
    pub chunks: Vec<Chunk<'a>>,
}

impl<'a> Tree<'a> {
    pub fn new(chunks: Vec<Chunk<'a>>) -> Self {
        Tree { node_id: 0, chunks }
    }

    /// Assigns `next` to this tree, then numbers every nested tree in pre-order.
    /// Returns the first unused id.
    pub fn renumber(&mut self, mut next: u32) -> u32 {
        self.node_id = next;
        next = next.wrapping_add(1);
        for chunk in &mut self.chunks {
            if let Chunk::SubTree(_, tree) = chunk {
                next = tree.renumber(next);
            }
        }
        next
    }

    /// Number of trees reachable from here, this one included.
    pub fn node_count(&self) -> usize {
        1 + self
            .chunks
            .iter()
            .filter_map(Chunk::as_tree)
            .map(Tree::node_count)
            .sum::<usize>()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn into_owned(self) -> Tree<'static> {
        Tree {
            node_id: self.node_id,
            chunks: self.chunks.into_iter().map(Chunk::into_owned).collect(),
        }
    }
}

/// A complete DTA/DTB document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document<'a> {
    /// Format marker copied verbatim; never interpreted.
    pub byte_zero: u8,
    pub tree: Tree<'a>,
}

impl<'a> Document<'a> {
    pub fn new(byte_zero: u8, tree: Tree<'a>) -> Self {
        Document { byte_zero, tree }
    }

    /// Renumber every tree starting at `start`; returns the next free id.
    pub fn renumber_from(&mut self, start: u32) -> u32 {
        let next = self.tree.renumber(start);
        log::debug!("renumbered node ids {}..{}", start, next);
        next
    }

    pub fn into_owned(self) -> Document<'static> {
        Document {
            byte_zero: self.byte_zero,
            tree: self.tree.into_owned(),
        }
    }
}
