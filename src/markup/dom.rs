//! Parse-tree abstraction over the html5ever reference-counted DOM.
//!
//! [`NodeRef`] exposes typed node-kind queries (element, text, attributes) and
//! an explicit rewrite contract: [`NodeRef::replace_with`],
//! [`NodeRef::insert_before`], [`NodeRef::insert_after`], [`NodeRef::unwrap`],
//! [`NodeRef::detach`] and [`NodeRef::append`]. Every rewrite keeps the
//! parent back-pointers consistent, so a node moved by one transform can be
//! queried safely by the next.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use html5ever::driver::ParseOpts;
use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{Attribute, LocalName, QualName, namespace_url, ns, parse_document};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

/// Coarse node classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Comment,
    Other,
}

/// Cheap, clonable reference to a node in a parsed document
#[derive(Clone)]
pub struct NodeRef(Handle);

impl std::fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            NodeKind::Element => write!(f, "<{}>", self.tag().unwrap_or_default()),
            NodeKind::Text => write!(f, "{:?}", self.text().unwrap_or_default()),
            kind => write!(f, "{:?}", kind),
        }
    }
}

impl NodeRef {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Create a detached HTML element
    pub fn element(tag: &str) -> Self {
        Self(Node::new(NodeData::Element {
            name: QualName::new(None, ns!(html), LocalName::from(tag)),
            attrs: RefCell::new(Vec::new()),
            template_contents: RefCell::new(None),
            mathml_annotation_xml_integration_point: false,
        }))
    }

    /// Create a detached text node
    pub fn text_node(text: &str) -> Self {
        Self(Node::new(NodeData::Text {
            contents: RefCell::new(StrTendril::from_slice(text)),
        }))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn kind(&self) -> NodeKind {
        match &self.0.data {
            NodeData::Document => NodeKind::Document,
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text { .. } => NodeKind::Text,
            NodeData::Comment { .. } => NodeKind::Comment,
            _ => NodeKind::Other,
        }
    }

    /// Local tag name of an element
    pub fn tag(&self) -> Option<&str> {
        match &self.0.data {
            NodeData::Element { name, .. } => Some(&*name.local),
            _ => None,
        }
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag().is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Attribute value of an element
    pub fn attr(&self, name: &str) -> Option<String> {
        match &self.0.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .find(|a| &*a.name.local == name)
                .map(|a| a.value.to_string()),
            _ => None,
        }
    }

    pub fn has_attr(&self, name: &str) -> bool {
        match &self.0.data {
            NodeData::Element { attrs, .. } => attrs.borrow().iter().any(|a| &*a.name.local == name),
            _ => false,
        }
    }

    /// Set (or overwrite) an attribute; no-op on non-elements
    pub fn set_attr(&self, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &self.0.data {
            let mut attrs = attrs.borrow_mut();
            if let Some(existing) = attrs.iter_mut().find(|a| &*a.name.local == name) {
                existing.value = StrTendril::from_slice(value);
            } else {
                attrs.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(name)),
                    value: StrTendril::from_slice(value),
                });
            }
        }
    }

    /// Whitespace-separated tokens of the `class` attribute
    pub fn classes(&self) -> Vec<String> {
        self.attr("class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|token| token == class))
    }

    /// Contents of a text node
    pub fn text(&self) -> Option<String> {
        match &self.0.data {
            NodeData::Text { contents } => Some(contents.borrow().to_string()),
            _ => None,
        }
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let NodeData::Text { contents } = &self.0.data {
            out.push_str(&contents.borrow());
        }
        for child in self.children() {
            child.collect_text(out);
        }
    }

    /// Descendant text nodes, each trimmed, empty ones dropped
    pub fn stripped_strings(&self) -> Vec<String> {
        std::iter::once(self.clone())
            .chain(self.descendants())
            .filter_map(|n| n.text())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Inline formatting flattened to plain text: stripped strings joined
    pub fn flattened_text(&self) -> String {
        self.stripped_strings().concat()
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn parent(&self) -> Option<NodeRef> {
        let weak = self.0.parent.take();
        let parent = weak.as_ref().and_then(Weak::upgrade);
        self.0.parent.set(weak);
        parent.map(NodeRef)
    }

    pub fn children(&self) -> Vec<NodeRef> {
        self.0.children.borrow().iter().cloned().map(NodeRef).collect()
    }

    /// All descendants in document order (pre-order), excluding `self`
    pub fn descendants(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeRef> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
        out
    }

    /// First descendant matching `pred`
    pub fn find(&self, pred: impl Fn(&NodeRef) -> bool) -> Option<NodeRef> {
        self.descendants().into_iter().find(|n| pred(n))
    }

    /// All descendants matching `pred`, in document order
    pub fn find_all(&self, pred: impl Fn(&NodeRef) -> bool) -> Vec<NodeRef> {
        self.descendants().into_iter().filter(|n| pred(n)).collect()
    }

    /// Nearest ancestor with the given tag
    pub fn closest(&self, tag: &str) -> Option<NodeRef> {
        let mut current = self.parent();
        while let Some(node) = current {
            if node.is_tag(tag) {
                return Some(node);
            }
            current = node.parent();
        }
        None
    }

    pub fn prev_sibling(&self) -> Option<NodeRef> {
        let parent = self.parent()?;
        let index = parent.index_of(self)?;
        index.checked_sub(1).and_then(|i| parent.child_at(i))
    }

    pub fn next_sibling(&self) -> Option<NodeRef> {
        let parent = self.parent()?;
        let index = parent.index_of(self)?;
        parent.child_at(index + 1)
    }

    pub fn ptr_eq(&self, other: &NodeRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn index_of(&self, child: &NodeRef) -> Option<usize> {
        self.0
            .children
            .borrow()
            .iter()
            .position(|c| Rc::ptr_eq(c, &child.0))
    }

    fn child_at(&self, index: usize) -> Option<NodeRef> {
        self.0.children.borrow().get(index).cloned().map(NodeRef)
    }

    // =========================================================================
    // Rewrites
    // =========================================================================

    /// Remove from the parent; the subtree stays usable
    pub fn detach(&self) {
        if let Some(parent) = self.parent()
            && let Some(index) = parent.index_of(self)
        {
            parent.0.children.borrow_mut().remove(index);
        }
        self.0.parent.set(None);
    }

    /// Append `child` as the last child (moving it if attached elsewhere)
    pub fn append(&self, child: &NodeRef) {
        child.detach();
        child.0.parent.set(Some(Rc::downgrade(&self.0)));
        self.0.children.borrow_mut().push(child.0.clone());
    }

    fn insert_child(&self, index: usize, child: &NodeRef) {
        child.0.parent.set(Some(Rc::downgrade(&self.0)));
        self.0.children.borrow_mut().insert(index, child.0.clone());
    }

    /// Insert `new` immediately before `self`; no-op when `self` is detached
    pub fn insert_before(&self, new: &NodeRef) {
        new.detach();
        if let Some(parent) = self.parent()
            && let Some(index) = parent.index_of(self)
        {
            parent.insert_child(index, new);
        }
    }

    /// Insert `new` immediately after `self`; no-op when `self` is detached
    pub fn insert_after(&self, new: &NodeRef) {
        new.detach();
        if let Some(parent) = self.parent()
            && let Some(index) = parent.index_of(self)
        {
            parent.insert_child(index + 1, new);
        }
    }

    /// Put `new` where `self` is and detach `self`
    pub fn replace_with(&self, new: &NodeRef) {
        self.insert_before(new);
        self.detach();
    }

    /// Replace `self` by its children, in order
    pub fn unwrap(&self) {
        let Some(parent) = self.parent() else {
            return;
        };
        let Some(index) = parent.index_of(self) else {
            return;
        };

        let children = std::mem::take(&mut *self.0.children.borrow_mut());
        parent.0.children.borrow_mut().remove(index);
        self.0.parent.set(None);

        for (offset, child) in children.into_iter().enumerate() {
            parent.insert_child(index + offset, &NodeRef(child));
        }
    }
}

// =============================================================================
// Document
// =============================================================================

/// A parsed document body
pub struct Markup {
    // Owns the ancestors of `body`; parent links are weak.
    _dom: RcDom,
    body: NodeRef,
}

impl Markup {
    /// Parse an HTML document or fragment. Parsing never fails; malformed
    /// input is recovered the way browsers do.
    pub fn parse(html: &str) -> Self {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                drop_doctype: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let dom = parse_document(RcDom::default(), opts)
            .from_utf8()
            .one(html.as_bytes());

        let document = NodeRef(dom.document.clone());
        let body = document
            .find(|n| n.is_tag("body"))
            .unwrap_or_else(|| document.clone());

        Self { _dom: dom, body }
    }

    /// The `<body>` element holding the content
    pub fn root(&self) -> &NodeRef {
        &self.body
    }

    /// All elements with the given tag, in document order
    pub fn elements(&self, tag: &str) -> Vec<NodeRef> {
        self.body.find_all(|n| n.is_tag(tag))
    }

    /// Serialize the body's children back to HTML
    pub fn to_html(&self) -> String {
        let mut bytes = Vec::new();
        let opts = SerializeOpts {
            traversal_scope: TraversalScope::ChildrenOnly(None),
            ..Default::default()
        };
        if serialize(&mut bytes, &SerializableHandle::from(self.body.0.clone()), opts).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
