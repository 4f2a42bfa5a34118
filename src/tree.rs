//! Turns a tag into display nodes for the tree view.
//!
//! The walk uses an explicit stack and writes into a flat arena, so documents of any
//! depth are rendered (and dropped) without recursion.

use crate::tag::{Tag, TagId};
use std::borrow::Cow;
use std::collections::HashSet;

/// One step from a container to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a node relative to the rendered root. Used as the key of expansion state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend_from_slice(&self.0);
        segments.push(segment);
        Self(segments)
    }

    pub fn key(self, key: &str) -> Self {
        self.child(PathSegment::Key(key.to_string()))
    }

    pub fn index(self, index: usize) -> Self {
        self.child(PathSegment::Index(index))
    }
}

/// Which containers the user has opened. Containers start collapsed; `render` keeps a
/// root container open whatever is recorded here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    open: HashSet<NodePath>,
}

impl Expansion {
    pub fn is_open(&self, path: &NodePath) -> bool {
        self.open.contains(path)
    }

    /// Flips a container's open state and returns the new state.
    pub fn toggle(&mut self, path: &NodePath) -> bool {
        if !self.open.remove(path) {
            self.open.insert(path.clone());
            return true;
        }
        false
    }

    pub fn set_open(&mut self, path: &NodePath, open: bool) {
        if open {
            self.open.insert(path.clone());
        } else {
            self.open.remove(path);
        }
    }

    pub fn clear(&mut self) {
        self.open.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayNode {
    Primitive {
        kind: TagId,
        path: NodePath,
        /// `"<name>: <value>"`, both escaped.
        text: String,
    },
    Container {
        kind: TagId,
        path: NodePath,
        /// Escaped name; `None` when the container is unnamed.
        name: Option<String>,
        /// Entry count, absent for compounds.
        count: Option<usize>,
        open: bool,
        children: Vec<NodeId>,
    },
}

impl DisplayNode {
    pub fn kind(&self) -> TagId {
        match self {
            DisplayNode::Primitive { kind, .. } | DisplayNode::Container { kind, .. } => *kind,
        }
    }

    pub fn path(&self) -> &NodePath {
        match self {
            DisplayNode::Primitive { path, .. } | DisplayNode::Container { path, .. } => path,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match self {
            DisplayNode::Primitive { .. } => &[],
            DisplayNode::Container { children, .. } => children,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, DisplayNode::Container { open: true, .. })
    }

    pub fn label(&self) -> String {
        match self {
            DisplayNode::Primitive { text, .. } => text.clone(),
            DisplayNode::Container { name, count, .. } => {
                let mut label = match name.as_deref() {
                    None => crate::statics::EN_TREE_UNNAMED.to_string(),
                    Some("") => crate::statics::EN_TREE_EMPTY_NAME.to_string(),
                    Some(name) => name.to_string(),
                };
                if let Some(count) = count {
                    label.push_str(&format!(" [{count}]"));
                }
                label
            }
        }
    }
}

/// A visible node with its nesting depth, in top-to-bottom display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRow {
    pub id: NodeId,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTree {
    nodes: Vec<DisplayNode>,
}

impl DisplayTree {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &DisplayNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Labels of the direct children of `id`, in display order.
    pub fn child_labels(&self, id: NodeId) -> Vec<String> {
        self.node(id)
            .children()
            .iter()
            .map(|child| self.node(*child).label())
            .collect()
    }

    pub fn rows(&self) -> Vec<DisplayRow> {
        let mut rows = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![DisplayRow {
            id: self.root(),
            depth: 0,
        }];
        while let Some(row) = stack.pop() {
            rows.push(row);
            for child in self.node(row.id).children().iter().rev() {
                stack.push(DisplayRow {
                    id: *child,
                    depth: row.depth + 1,
                });
            }
        }
        rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{kind} tag must have a name provided by its parent container")]
pub struct NameRequired {
    pub kind: TagId,
}

/// Replaces backspace, form feed, newline, carriage return and tab with their escapes.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

struct Work<'t> {
    parent: Option<NodeId>,
    name: Option<Cow<'t, str>>,
    tag: Cow<'t, Tag>,
    path: NodePath,
    is_root: bool,
}

/// Entries of a container in canonical order. Array elements become width-tagged atoms.
fn entries<'t>(tag: &'t Tag, parent: NodeId, path: &NodePath) -> Vec<Work<'t>> {
    fn indexed<'t>(
        parent: NodeId,
        path: &NodePath,
        items: impl Iterator<Item = Cow<'t, Tag>>,
    ) -> Vec<Work<'t>> {
        items
            .enumerate()
            .map(|(i, tag)| Work {
                parent: Some(parent),
                name: Some(Cow::Owned(i.to_string())),
                tag,
                path: path.child(PathSegment::Index(i)),
                is_root: false,
            })
            .collect()
    }

    match tag {
        Tag::Compound(map) => map
            .iter()
            .map(|(key, value)| Work {
                parent: Some(parent),
                name: Some(Cow::Borrowed(key.as_str())),
                tag: Cow::Borrowed(value),
                path: path.child(PathSegment::Key(key.clone())),
                is_root: false,
            })
            .collect(),
        Tag::List(list) => indexed(parent, path, list.iter().map(Cow::Borrowed)),
        Tag::ByteArray(values) => {
            indexed(parent, path, values.iter().map(|v| Cow::Owned(Tag::Byte(*v))))
        }
        Tag::IntArray(values) => {
            indexed(parent, path, values.iter().map(|v| Cow::Owned(Tag::Int(*v))))
        }
        Tag::LongArray(values) => {
            indexed(parent, path, values.iter().map(|v| Cow::Owned(Tag::Long(*v))))
        }
        _ => Vec::new(),
    }
}

/// Renders `tag` and every entry of its open containers.
///
/// A root container is always open. Otherwise the top node is an ordinary entry: it sits
/// at `NodePath::root()` and opens only when `expansion` says so.
pub fn render(
    name: Option<&str>,
    tag: &Tag,
    is_root: bool,
    expansion: &Expansion,
) -> Result<DisplayTree, NameRequired> {
    let mut nodes: Vec<DisplayNode> = Vec::new();
    let mut stack = vec![Work {
        parent: None,
        name: name.map(Cow::Borrowed),
        tag: Cow::Borrowed(tag),
        path: NodePath::root(),
        is_root,
    }];

    while let Some(work) = stack.pop() {
        let id = NodeId(nodes.len());
        let kind = work.tag.id();

        let node = if work.tag.is_container() {
            let open = work.is_root || expansion.is_open(&work.path);
            if open && let Cow::Borrowed(container) = &work.tag {
                let mut children = entries(*container, id, &work.path);
                children.reverse();
                stack.extend(children);
            }
            DisplayNode::Container {
                kind,
                name: work.name.as_deref().map(escape),
                count: match kind {
                    TagId::Compound => None,
                    _ => work.tag.entry_count(),
                },
                open,
                children: Vec::new(),
                path: work.path,
            }
        } else {
            let Some(name) = work.name else {
                return Err(NameRequired { kind });
            };
            let value = work.tag.value_string().unwrap_or_default();
            DisplayNode::Primitive {
                kind,
                text: format!("{}: {}", escape(&name), escape(&value)),
                path: work.path,
            }
        };

        nodes.push(node);
        if let Some(parent) = work.parent
            && let DisplayNode::Container { children, .. } = &mut nodes[parent.0]
        {
            children.push(id);
        }
    }

    Ok(DisplayTree { nodes })
}
