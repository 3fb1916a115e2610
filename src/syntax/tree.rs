//! Arena-owned concrete syntax tree
//!
//! Every node lives in a [`SyntaxTree`] and is addressed by a [`NodeId`].
//! Leaves own their text; composites own an ordered list of children. The
//! tree caches the text length and line break count of every node, and each
//! composite lazily caches the relative positions of its children. Offsets
//! and line numbers are computed by walking ancestors, never by scanning the
//! file.
//!
//! # Invariants
//!
//! - Concatenating the leaf texts of the root in document order yields the
//!   current source text.
//! - A node has at most one parent, and appears exactly once in that parent's
//!   children.
//! - Cached lengths of a node and all of its ancestors are refreshed by every
//!   mutation.
//! - The cached position of a child is only trusted below the `valid` mark of
//!   its parent. Mutations lower the mark, reads raise it again.
//!
//! Contract violations (for example asking for the offset of a node that was
//! removed from the tree) panic with a [`TreeError`] payload. The lint engine
//! catches these at the rule boundary and reports them as invariant
//! violations.

use crate::element_type::ElementType;
use std::cell::Cell;
use std::fmt::Write;
use thiserror::Error;

/// Handle to a node of a [`SyntaxTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {0:?} is detached from the tree")]
    DetachedNode(NodeId),

    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("node {0:?} is a leaf and can not have children")]
    NotAComposite(NodeId),

    #[error("node {0:?} is not a leaf")]
    NotALeaf(NodeId),

    #[error("node {0:?} already has a parent")]
    AlreadyAttached(NodeId),

    #[error("index {index} is out of bounds for the children of {parent:?}")]
    IndexOutOfBounds { parent: NodeId, index: usize },

    #[error("inserting {child:?} below {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
}

/// Abort the current operation with a tree contract violation.
fn violation(error: TreeError) -> ! {
    std::panic::panic_any(error)
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: ElementType,
    /// `Some` for leaves
    text: Option<String>,
    parent: Option<NodeId>,
    /// Position in the children of `parent`
    index: usize,
    children: Vec<NodeId>,
    len: usize,
    /// Line breaks in the text of the node
    newlines: usize,
    /// Offset relative to the parent
    offset: Cell<usize>,
    /// Line breaks in the preceding siblings
    newlines_before: Cell<usize>,
    /// Number of leading children with a trusted `offset`
    valid: Cell<usize>,
}

impl NodeData {
    fn new(kind: ElementType, text: Option<String>, children: Vec<NodeId>) -> Self {
        let (len, newlines) = match &text {
            Some(text) => (text.len(), count_newlines(text.as_bytes())),
            None => (0, 0),
        };
        Self {
            kind,
            text,
            parent: None,
            index: 0,
            children,
            len,
            newlines,
            offset: Cell::new(0),
            newlines_before: Cell::new(0),
            valid: Cell::new(0),
        }
    }
}

fn count_newlines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count()
}

/// Characters in a byte slice which may start or end inside a character
fn count_chars(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b & 0xC0 != 0x80).count()
}

#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    revision: u64,
    comment_revision: u64,
}

impl SyntaxTree {
    /// Create a tree consisting of an empty root composite
    pub fn new(root_kind: ElementType) -> Self {
        Self {
            nodes: vec![NodeData::new(root_kind, None, Vec::new())],
            root: NodeId(0),
            revision: 0,
            comment_revision: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Monotonic counter bumped by every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Counter bumped by the mutations which add, remove or edit a comment
    pub fn comment_revision(&self) -> u64 {
        self.comment_revision
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    // Construction

    /// Create a detached leaf
    pub fn new_leaf(&mut self, kind: ElementType, text: impl Into<String>) -> NodeId {
        let text = text.into();
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData::new(kind, Some(text), Vec::new()));
        id
    }

    /// Create a detached composite owning `children`, which must all be
    /// detached themselves.
    pub fn new_composite(&mut self, kind: ElementType, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let (mut len, mut newlines) = (0, 0);
        for &child in &children {
            if child == self.root {
                violation(TreeError::Cycle { parent: id, child });
            }
            if self.data(child).parent.is_some() {
                violation(TreeError::AlreadyAttached(child));
            }
            len += self.data(child).len;
            newlines += self.data(child).newlines;
        }
        let mut data = NodeData::new(kind, None, children.clone());
        data.len = len;
        data.newlines = newlines;
        self.nodes.push(data);
        for (index, child) in children.into_iter().enumerate() {
            let child = self.data_mut(child);
            child.parent = Some(id);
            child.index = index;
        }
        id
    }

    // Reads

    pub fn kind(&self, id: NodeId) -> ElementType {
        self.data(id).kind
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.data(id).text.is_some()
    }

    /// Text of a leaf. Composites have no own text, see [`SyntaxTree::text`].
    pub fn leaf_text(&self, id: NodeId) -> &str {
        match &self.data(id).text {
            Some(text) => text,
            None => violation(TreeError::NotALeaf(id)),
        }
    }

    /// Text of the node, concatenated from its leaves for composites
    pub fn text(&self, id: NodeId) -> String {
        let mut buffer = String::with_capacity(self.text_len(id));
        self.write_text(id, &mut buffer);
        buffer
    }

    fn write_text(&self, id: NodeId, buffer: &mut String) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let data = self.data(current);
            match &data.text {
                Some(text) => buffer.push_str(text),
                None => stack.extend(data.children.iter().rev()),
            }
        }
    }

    pub fn text_len(&self, id: NodeId) -> usize {
        self.data(id).len
    }

    pub fn text_contains(&self, id: NodeId, needle: char) -> bool {
        self.leaves(id)
            .into_iter()
            .any(|leaf| self.leaf_text(leaf).contains(needle))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).children.last().copied()
    }

    fn index_in_parent(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let data = self.data(id);
        Some((data.parent?, data.index))
    }

    /// Offset and preceding line breaks of the `index`-th child relative to
    /// `parent`, extending the trusted prefix of cached positions as needed
    fn child_position(&self, parent: NodeId, index: usize) -> (usize, usize) {
        let data = self.data(parent);
        let mut valid = data.valid.get();
        while valid <= index {
            let (offset, newlines) = match valid.checked_sub(1) {
                Some(prev) => {
                    let prev = self.data(data.children[prev]);
                    (prev.offset.get() + prev.len, prev.newlines_before.get() + prev.newlines)
                }
                None => (0, 0),
            };
            let child = self.data(data.children[valid]);
            child.offset.set(offset);
            child.newlines_before.set(newlines);
            valid += 1;
        }
        data.valid.set(valid);
        let child = self.data(data.children[index]);
        (child.offset.get(), child.newlines_before.get())
    }

    /// Index of the child of `parent` whose text contains the relative offset
    fn child_index_at(&self, parent: NodeId, local: usize) -> Option<usize> {
        let data = self.data(parent);
        if local >= data.len {
            return None;
        }
        let valid = data.valid.get();
        if let Some(last) = valid.checked_sub(1) {
            let child = self.data(data.children[last]);
            if local < child.offset.get() + child.len {
                let after = data.children[..valid]
                    .partition_point(|&c| self.data(c).offset.get() <= local);
                return Some(after - 1);
            }
        }
        (valid..data.children.len()).find(|&index| {
            let (start, _) = self.child_position(parent, index);
            local < start + self.data(data.children[index]).len
        })
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.index_in_parent(id)?;
        self.data(parent).children.get(index + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.index_in_parent(id)?;
        if index == 0 {
            None
        } else {
            Some(self.data(parent).children[index - 1])
        }
    }

    /// Next sibling which is neither whitespace nor a comment
    pub fn next_code_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(node) = current {
            if !self.kind(node).is_trivia() {
                return Some(node);
            }
            current = self.next_sibling(node);
        }
        None
    }

    pub fn prev_code_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.prev_sibling(id);
        while let Some(node) = current {
            if !self.kind(node).is_trivia() {
                return Some(node);
            }
            current = self.prev_sibling(node);
        }
        None
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&node| self.parent(node))
    }

    pub fn find_ancestor(
        &self,
        id: NodeId,
        predicate: impl Fn(ElementType) -> bool,
    ) -> Option<NodeId> {
        self.ancestors(id).find(|&node| predicate(self.kind(node)))
    }

    pub fn find_child_by_type(&self, id: NodeId, kind: ElementType) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.kind(child) == kind)
    }

    /// Whether the node or one of its ancestors has the given type
    pub fn is_part_of(&self, id: NodeId, kind: ElementType) -> bool {
        self.kind(id) == kind || self.find_ancestor(id, |k| k == kind).is_some()
    }

    pub fn is_part_of_comment(&self, id: NodeId) -> bool {
        self.kind(id).is_comment() || self.find_ancestor(id, ElementType::is_comment).is_some()
    }

    /// Not whitespace and not (part of) a comment
    pub fn is_code(&self, id: NodeId) -> bool {
        !self.kind(id).is_whitespace() && !self.is_part_of_comment(id)
    }

    /// First leaf of the subtree, or the node itself when it is a leaf or
    /// an empty composite
    pub fn first_leaf(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(child) = self.first_child(current) {
            current = child;
        }
        current
    }

    /// Last leaf of the subtree, or the node itself
    pub fn last_leaf(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(child) = self.last_child(current) {
            current = child;
        }
        current
    }

    /// First leaf after the subtree of `id`
    pub fn next_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            if let Some(sibling) = self.next_sibling(current) {
                let leaf = self.first_leaf(sibling);
                if self.is_leaf(leaf) {
                    return Some(leaf);
                }
                // Empty composite, keep looking behind it
                current = leaf;
                continue;
            }
            current = self.parent(current)?;
        }
    }

    /// Last leaf before the subtree of `id`
    pub fn prev_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            if let Some(sibling) = self.prev_sibling(current) {
                let leaf = self.last_leaf(sibling);
                if self.is_leaf(leaf) {
                    return Some(leaf);
                }
                current = leaf;
                continue;
            }
            current = self.parent(current)?;
        }
    }

    pub fn next_code_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_leaf(id);
        while let Some(leaf) = current {
            if self.is_code(leaf) {
                return Some(leaf);
            }
            current = self.next_leaf(leaf);
        }
        None
    }

    pub fn prev_code_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.prev_leaf(id);
        while let Some(leaf) = current {
            if self.is_code(leaf) {
                return Some(leaf);
            }
            current = self.prev_leaf(leaf);
        }
        None
    }

    /// Leaves of the subtree in document order
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.is_leaf(current) {
                leaves.push(current);
            } else {
                stack.extend(self.children(current).iter().rev());
            }
        }
        leaves
    }

    /// All nodes of the subtree in pre-order, including `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            nodes.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        nodes
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current == self.root
    }

    pub fn try_start_offset(&self, id: NodeId) -> Result<usize, TreeError> {
        let mut offset = 0;
        let mut current = id;
        while let Some((parent, index)) = self.index_in_parent(current) {
            offset += self.child_position(parent, index).0;
            current = parent;
        }
        if current == self.root {
            Ok(offset)
        } else {
            Err(TreeError::DetachedNode(id))
        }
    }

    /// Absolute offset of the node in the current text
    ///
    /// # Panics
    ///
    /// Panics with [`TreeError::DetachedNode`] when the node is not part of
    /// the tree.
    pub fn start_offset(&self, id: NodeId) -> usize {
        self.try_start_offset(id)
            .unwrap_or_else(|error| violation(error))
    }

    pub fn end_offset(&self, id: NodeId) -> usize {
        self.start_offset(id) + self.text_len(id)
    }

    /// Line breaks before `offset` plus the bytes and characters between the
    /// start of its line and `offset`
    fn line_position(&self, offset: usize) -> (usize, usize, usize) {
        let mut node = self.root;
        let mut local = offset;
        let mut newlines = 0;
        while !self.is_leaf(node) {
            let Some(index) = self.child_index_at(node, local) else {
                // End of the text
                let end = self.last_leaf(self.root);
                let last = if self.is_leaf(end) { Some(end) } else { self.prev_leaf(end) };
                let (bytes, chars) = last
                    .map(|leaf| self.line_prefix(leaf, self.text_len(leaf)))
                    .unwrap_or((0, 0));
                return (self.data(self.root).newlines, bytes, chars);
            };
            let (start, before) = self.child_position(node, index);
            node = self.data(node).children[index];
            local -= start;
            newlines += before;
        }
        let text = self.leaf_text(node).as_bytes();
        let (bytes, chars) = self.line_prefix(node, local);
        (newlines + count_newlines(&text[..local]), bytes, chars)
    }

    /// Bytes and characters between the last line break before position
    /// `local` of `leaf` and that position
    fn line_prefix(&self, leaf: NodeId, local: usize) -> (usize, usize) {
        let mut text = &self.leaf_text(leaf).as_bytes()[..local];
        let (mut bytes, mut chars) = (0, 0);
        let mut current = leaf;
        loop {
            if let Some(newline) = text.iter().rposition(|&b| b == b'\n') {
                let tail = &text[newline + 1..];
                return (bytes + tail.len(), chars + count_chars(tail));
            }
            bytes += text.len();
            chars += count_chars(text);
            match self.prev_leaf(current) {
                Some(prev) => {
                    current = prev;
                    text = self.leaf_text(prev).as_bytes();
                }
                None => return (bytes, chars),
            }
        }
    }

    /// Line and column (both one-based, column counted in characters) of a
    /// byte offset in the current text. Offsets past the end are clamped.
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        let (newlines, _, chars) = self.line_position(offset);
        (newlines + 1, chars + 1)
    }

    /// Offset of the start of the line containing `offset`
    pub fn line_start(&self, offset: usize) -> usize {
        let offset = offset.min(self.text_len(self.root));
        offset - self.line_position(offset).1
    }

    // Mutations

    /// Refresh the cached sizes of `from` and its ancestors after its text
    /// grew by `len.0` and shrank by `len.1` bytes, same for line breaks
    fn adjust_len(&mut self, from: NodeId, len: (usize, usize), newlines: (usize, usize)) {
        let mut current = from;
        loop {
            let data = self.data_mut(current);
            data.len = data.len + len.0 - len.1;
            data.newlines = data.newlines + newlines.0 - newlines.1;
            let Some((parent, index)) = data.parent.map(|parent| (parent, data.index)) else {
                break;
            };
            self.invalidate(parent, index + 1);
            current = parent;
        }
    }

    /// Distrust the cached positions of the children of `parent` from `index` on
    fn invalidate(&self, parent: NodeId, index: usize) {
        let valid = &self.data(parent).valid;
        valid.set(valid.get().min(index));
    }

    fn renumber(&mut self, parent: NodeId, from: usize) {
        for index in from..self.data(parent).children.len() {
            let child = self.data(parent).children[index];
            self.data_mut(child).index = index;
        }
    }

    fn contains_comment(&self, id: NodeId) -> bool {
        self.descendants(id)
            .into_iter()
            .any(|node| self.kind(node).is_comment())
    }

    fn bump(&mut self, touches_comment: bool) {
        self.revision += 1;
        if touches_comment {
            self.comment_revision += 1;
        }
    }

    fn checked_index(&self, parent: NodeId, child: NodeId) -> usize {
        match self.index_in_parent(child) {
            Some((actual, index)) if actual == parent => index,
            _ => violation(TreeError::NotAChild { parent, child }),
        }
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) {
        if self.is_leaf(parent) {
            violation(TreeError::NotAComposite(parent));
        }
        if self.data(child).parent.is_some() {
            violation(TreeError::AlreadyAttached(child));
        }
        if child == parent || child == self.root || self.ancestors(parent).any(|a| a == child) {
            violation(TreeError::Cycle { parent, child });
        }
    }

    /// Insert a detached node as the `index`-th child of `parent`
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.check_insertable(parent, child);
        if index > self.children(parent).len() {
            violation(TreeError::IndexOutOfBounds { parent, index });
        }
        self.data_mut(parent).children.insert(index, child);
        self.data_mut(child).parent = Some(parent);
        self.renumber(parent, index);
        self.invalidate(parent, index);
        let data = self.data(child);
        let (len, newlines) = (data.len, data.newlines);
        self.adjust_len(parent, (len, 0), (newlines, 0));
        let touches_comment = self.contains_comment(child);
        self.bump(touches_comment);
    }

    /// Insert a detached node before `anchor`, or as last child when there is
    /// no anchor
    pub fn add_child_before(&mut self, parent: NodeId, child: NodeId, anchor: Option<NodeId>) {
        let index = match anchor {
            Some(anchor) => self.checked_index(parent, anchor),
            None => self.children(parent).len(),
        };
        self.insert_child(parent, index, child);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.add_child_before(parent, child, None);
    }

    /// Detach `child` from `parent`. The removed subtree can be inserted again.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.checked_index(parent, child);
        self.data_mut(parent).children.remove(index);
        self.data_mut(child).parent = None;
        self.renumber(parent, index);
        self.invalidate(parent, index);
        let data = self.data(child);
        let (len, newlines) = (data.len, data.newlines);
        self.adjust_len(parent, (0, len), (0, newlines));
        let touches_comment = self.contains_comment(child);
        self.bump(touches_comment);
    }

    /// Detach a node from whatever parent it has
    pub fn remove(&mut self, node: NodeId) {
        match self.parent(node) {
            Some(parent) => self.remove_child(parent, node),
            None => violation(TreeError::DetachedNode(node)),
        }
    }

    /// Put the detached node `new` in the place of `old`, which becomes detached
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        let index = self.checked_index(parent, old);
        self.check_insertable(parent, new);
        self.data_mut(parent).children[index] = new;
        self.data_mut(old).parent = None;
        let data = self.data_mut(new);
        data.parent = Some(parent);
        data.index = index;
        self.invalidate(parent, index);
        let (old_data, new_data) = (self.data(old), self.data(new));
        let len = (new_data.len, old_data.len);
        let newlines = (new_data.newlines, old_data.newlines);
        self.adjust_len(parent, len, newlines);
        let touches_comment = self.contains_comment(old) || self.contains_comment(new);
        self.bump(touches_comment);
    }

    pub fn replace_leaf_text(&mut self, leaf: NodeId, text: impl Into<String>) {
        let text = text.into();
        let (old_len, old_newlines) = match &self.data(leaf).text {
            Some(old) if *old == text => return,
            Some(old) => (old.len(), count_newlines(old.as_bytes())),
            None => violation(TreeError::NotALeaf(leaf)),
        };
        let (new_len, new_newlines) = (text.len(), count_newlines(text.as_bytes()));
        self.data_mut(leaf).text = Some(text);
        self.adjust_len(leaf, (new_len, old_len), (new_newlines, old_newlines));
        let touches_comment = self.kind(leaf).is_comment();
        self.bump(touches_comment);
    }

    /// Indented dump of the subtree, one node per line
    pub fn debug_tree(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![(id, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            let _ = write!(out, "{}{}", "  ".repeat(depth), self.kind(node));
            if self.is_leaf(node) {
                let _ = write!(out, " {:?}", self.leaf_text(node));
            }
            out.push('\n');
            for &child in self.children(node).iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }
}

/// Converts byte offsets into one-based line and column numbers
#[derive(Debug, Clone)]
pub struct LineIndex {
    text: String,
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            text: text.to_string(),
            line_starts,
        }
    }

    /// Line and column (both one-based, column counted in characters)
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = self
            .text
            .get(line_start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(offset - line_start);
        (line + 1, column + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::AssertUnwindSafe;

    fn sample() -> (SyntaxTree, NodeId, NodeId, NodeId) {
        // FILE { CALL { foo, ARGS { "(", ")" } }, "\n" }
        let mut tree = SyntaxTree::new(ElementType::File);
        let name = tree.new_leaf(ElementType::Identifier, "foo");
        let lpar = tree.new_leaf(ElementType::LPar, "(");
        let rpar = tree.new_leaf(ElementType::RPar, ")");
        let args = tree.new_composite(ElementType::ValueArgumentList, vec![lpar, rpar]);
        let call = tree.new_composite(ElementType::CallExpression, vec![name, args]);
        let newline = tree.new_leaf(ElementType::WhiteSpace, "\n");
        let root = tree.root();
        tree.append_child(root, call);
        tree.append_child(root, newline);
        (tree, args, lpar, rpar)
    }

    #[test]
    fn test_text_and_offsets() {
        let (tree, args, lpar, rpar) = sample();
        assert_eq!(tree.text(tree.root()), "foo()\n");
        assert_eq!(tree.text_len(tree.root()), 6);
        assert_eq!(tree.start_offset(args), 3);
        assert_eq!(tree.start_offset(rpar), 4);
        assert_eq!(tree.next_leaf(lpar), Some(rpar));
        assert_eq!(tree.prev_leaf(args).map(|l| tree.leaf_text(l).to_string()), Some("foo".to_string()));
    }

    #[test]
    fn test_mutations_keep_text_consistent() {
        let (mut tree, args, lpar, rpar) = sample();
        let one = tree.new_leaf(ElementType::IntegerLiteral, "1");
        let argument = tree.new_composite(ElementType::ValueArgument, vec![one]);
        tree.add_child_before(args, argument, Some(rpar));
        assert_eq!(tree.text(tree.root()), "foo(1)\n");
        assert_eq!(tree.start_offset(rpar), 5);

        tree.replace_leaf_text(lpar, "( ");
        assert_eq!(tree.text(tree.root()), "foo( 1)\n");
        assert_eq!(tree.text_len(tree.root()), 8);

        let two = tree.new_leaf(ElementType::IntegerLiteral, "22");
        tree.replace_child(argument, one, two);
        assert_eq!(tree.text(tree.root()), "foo( 22)\n");
        assert!(!tree.is_attached(one));

        tree.remove_child(args, argument);
        assert_eq!(tree.text(tree.root()), "foo( )\n");
        assert_eq!(tree.try_start_offset(two), Err(TreeError::DetachedNode(two)));

        // A removed node can be inserted again
        tree.insert_child(args, 1, argument);
        assert_eq!(tree.text(tree.root()), "foo( 22)\n");
    }

    #[test]
    fn test_identical_leaf_text_is_not_a_mutation() {
        let (mut tree, _, lpar, _) = sample();
        let revision = tree.revision();
        tree.replace_leaf_text(lpar, "(");
        assert_eq!(tree.revision(), revision);
        tree.replace_leaf_text(lpar, "((");
        assert_eq!(tree.revision(), revision + 1);
    }

    #[test]
    fn test_detached_offset_panics_with_tree_error() {
        let (mut tree, args, lpar, _) = sample();
        tree.remove_child(args, lpar);
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| tree.start_offset(lpar)));
        let payload = result.unwrap_err();
        assert_eq!(
            payload.downcast_ref::<TreeError>(),
            Some(&TreeError::DetachedNode(lpar))
        );
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("ab\ncd\n\nü x");
        assert_eq!(index.line_column(0), (1, 1));
        assert_eq!(index.line_column(3), (2, 1));
        assert_eq!(index.line_column(4), (2, 2));
        assert_eq!(index.line_column(6), (3, 1));
        assert_eq!(index.line_column(10), (4, 3));
    }

    #[test]
    fn test_line_column_from_tree() {
        let (mut tree, _, lpar, _) = sample();
        assert_eq!(tree.line_column(0), (1, 1));
        assert_eq!(tree.line_column(4), (1, 5));
        assert_eq!(tree.line_column(6), (2, 1));
        assert_eq!(tree.line_column(100), (2, 1));

        tree.replace_leaf_text(lpar, "(\nü ");
        assert_eq!(tree.text(tree.root()), "foo(\nü )\n");
        assert_eq!(tree.line_column(5), (2, 1));
        // `)` after a two byte character
        assert_eq!(tree.line_column(8), (2, 3));
        assert_eq!(tree.line_start(8), 5);
        assert_eq!(tree.line_column(10), (3, 1));
    }

    #[test]
    fn test_cached_positions_follow_mutations() {
        let mut tree = SyntaxTree::new(ElementType::File);
        let root = tree.root();
        let lines: Vec<NodeId> = (0..50)
            .map(|i| {
                let leaf = tree.new_leaf(ElementType::Identifier, format!("line{i}\n"));
                tree.append_child(root, leaf);
                leaf
            })
            .collect();
        assert_eq!(tree.start_offset(lines[49]), tree.text(root).rfind("line49").unwrap_or(0));

        // Edit front to back, reading positions in between
        for (i, &line) in lines.iter().enumerate().step_by(7) {
            tree.replace_leaf_text(line, format!("  line{i}\n"));
            let text = tree.text(root);
            assert_eq!(tree.start_offset(line), text.find(&format!("  line{i}\n")).unwrap_or(0));
            assert_eq!(tree.line_column(tree.start_offset(line)), (i + 1, 1));
        }

        tree.remove_child(root, lines[10]);
        assert_eq!(tree.next_sibling(lines[9]), Some(lines[11]));
        assert_eq!(tree.prev_sibling(lines[11]), Some(lines[9]));
        assert_eq!(tree.line_column(tree.start_offset(lines[11])), (11, 1));

        tree.add_child_before(root, lines[10], Some(lines[5]));
        assert_eq!(tree.next_sibling(lines[10]), Some(lines[5]));
        let text = tree.text(root);
        for &line in &lines {
            let offset = tree.start_offset(line);
            assert_eq!(&text[offset..tree.end_offset(line)], tree.leaf_text(line));
        }
    }

    #[test]
    fn test_comment_revision_ignores_code_edits() {
        let (mut tree, args, lpar, rpar) = sample();
        tree.replace_leaf_text(lpar, "( ");
        assert_eq!(tree.comment_revision(), 0);

        let comment = tree.new_leaf(ElementType::BlockComment, "/* x */");
        tree.add_child_before(args, comment, Some(rpar));
        assert_eq!(tree.comment_revision(), 1);
        tree.replace_leaf_text(comment, "/* y */");
        assert_eq!(tree.comment_revision(), 2);
        tree.remove_child(args, comment);
        assert_eq!(tree.comment_revision(), 3);
        assert_eq!(tree.revision(), 4);
    }
}
