//! Addressing nodes inside an [`EditorSurface`](crate::EditorSurface).
//!
//! A `NodePath` is a list of child indices starting at the top-level block
//! list. Table rows count the header row as row 0.

use std::fmt;

use crate::tree::{Block, FootnoteDef, Inline, ListItem};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = Vec::with_capacity(self.0.len() + 1);
        indices.extend_from_slice(&self.0);
        indices.push(index);
        Self(indices)
    }

    pub fn join(&self, rest: &[usize]) -> Self {
        let mut indices = self.0.clone();
        indices.extend_from_slice(rest);
        Self(indices)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{index}")?;
        }
        Ok(())
    }
}

/// Borrowed view of any addressable node.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Block(&'a Block),
    Item(&'a ListItem),
    Row(&'a [Vec<Inline>]),
    Cell(&'a Vec<Inline>),
    Footnote(&'a FootnoteDef),
    Inline(&'a Inline),
}

impl<'a> Node<'a> {
    pub fn child(self, index: usize) -> Option<Node<'a>> {
        match self {
            Node::Block(block) => match block {
                Block::Paragraph(inlines) => inlines.get(index).map(Node::Inline),
                Block::Heading(heading) => heading.content.get(index).map(Node::Inline),
                Block::List(list) => list.items.get(index).map(Node::Item),
                Block::BlockQuote(blocks) => blocks.get(index).map(Node::Block),
                Block::Alert(alert) => alert.blocks.get(index).map(Node::Block),
                Block::Table(table) => table.row(index).map(|row| Node::Row(row)),
                Block::Footnotes(defs) => defs.get(index).map(Node::Footnote),
                Block::CodeBlock(_) | Block::Rule | Block::Html(_) => None,
            },
            Node::Item(item) => item.blocks.get(index).map(Node::Block),
            Node::Row(cells) => cells.get(index).map(|cell| Node::Cell(cell)),
            Node::Cell(inlines) => inlines.get(index).map(Node::Inline),
            Node::Footnote(def) => def.content.get(index).map(Node::Inline),
            Node::Inline(inline) => inline.children()?.get(index).map(Node::Inline),
        }
    }
}

/// Mutable view of any addressable node.
#[derive(Debug)]
pub enum NodeMut<'a> {
    Block(&'a mut Block),
    Item(&'a mut ListItem),
    Row(&'a mut Vec<Vec<Inline>>),
    Cell(&'a mut Vec<Inline>),
    Footnote(&'a mut FootnoteDef),
    Inline(&'a mut Inline),
}

impl<'a> NodeMut<'a> {
    pub fn child(self, index: usize) -> Option<NodeMut<'a>> {
        match self {
            NodeMut::Block(block) => match block {
                Block::Paragraph(inlines) => inlines.get_mut(index).map(NodeMut::Inline),
                Block::Heading(heading) => heading.content.get_mut(index).map(NodeMut::Inline),
                Block::List(list) => list.items.get_mut(index).map(NodeMut::Item),
                Block::BlockQuote(blocks) => blocks.get_mut(index).map(NodeMut::Block),
                Block::Alert(alert) => alert.blocks.get_mut(index).map(NodeMut::Block),
                Block::Table(table) => table.row_mut(index).map(NodeMut::Row),
                Block::Footnotes(defs) => defs.get_mut(index).map(NodeMut::Footnote),
                Block::CodeBlock(_) | Block::Rule | Block::Html(_) => None,
            },
            NodeMut::Item(item) => item.blocks.get_mut(index).map(NodeMut::Block),
            NodeMut::Row(cells) => cells.get_mut(index).map(NodeMut::Cell),
            NodeMut::Cell(inlines) => inlines.get_mut(index).map(NodeMut::Inline),
            NodeMut::Footnote(def) => def.content.get_mut(index).map(NodeMut::Inline),
            NodeMut::Inline(inline) => inline.children_mut()?.get_mut(index).map(NodeMut::Inline),
        }
    }
}
