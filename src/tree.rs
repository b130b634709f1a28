use std::fmt;

use indexmap::IndexMap;

/// The role a node plays in the parsed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Service,
    Rpc,
    Request,
    Response,
    Message,
    /// A message field or an enum definition.
    Parameter,
    Oneof,
    MapName,
    MapValue,
    Enum,
    /// Container for the `rpcs`, `enums` and `messages` lists under the root.
    Group,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Service => "service",
            NodeKind::Rpc => "rpc",
            NodeKind::Request => "request",
            NodeKind::Response => "response",
            NodeKind::Message => "message",
            NodeKind::Parameter => "parameter",
            NodeKind::Oneof => "oneof",
            NodeKind::MapName => "map_name",
            NodeKind::MapValue => "map_value",
            NodeKind::Enum => "enum",
            NodeKind::Group => "group",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value half of an option entry: an enum value name, or a literal
/// boolean for the options attached to `bool` fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Name(String),
    Bool(bool),
}

/// One `(index, value, comment)` entry of an enum or bool option list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumOption {
    pub index: String,
    pub value: OptionValue,
    pub comment: String,
}

impl EnumOption {
    pub fn new(index: impl Into<String>, value: OptionValue, comment: impl Into<String>) -> Self {
        EnumOption {
            index: index.into(),
            value,
            comment: comment.into(),
        }
    }

    /// The fixed option pair every `bool` field carries.
    pub fn bool_pair() -> Vec<EnumOption> {
        vec![
            EnumOption::new("true", OptionValue::Bool(true), ""),
            EnumOption::new("false", OptionValue::Bool(false), ""),
        ]
    }
}

/// Descriptive data attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub comment: String,
    pub name: String,
    /// Field tag or enum value number, kept as written.
    pub index: String,
    pub datatype: String,
    pub repeated: bool,
    pub stream: bool,
    pub options: Vec<EnumOption>,
    /// The type reference as written, set once the resolution pass matched it.
    pub messagetype: Option<String>,
    pub service: Option<String>,
    pub rpc: Option<String>,
    /// Owning message of a field or oneof.
    pub message: Option<String>,
    pub oneof: Option<String>,
    /// Field name a map key/value slot belongs to.
    pub map: Option<String>,
}

/// An element of the parsed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: u64,
    pub label: String,
    pub kind: NodeKind,
    pub attrs: Attributes,
    /// Children in source declaration order.
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(id: u64, kind: NodeKind, label: impl Into<String>) -> Self {
        let label = label.into();
        Node {
            id,
            attrs: Attributes {
                name: label.clone(),
                ..Attributes::default()
            },
            label,
            kind,
            children: Vec::new(),
        }
    }

    /// Find a direct child by label.
    pub fn child(&self, label: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.label == label)
    }

    /// Depth-first search for the first node (including `self`) with this label.
    pub fn find(&self, label: &str) -> Option<&Node> {
        if self.label == label {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(label))
    }

    /// Visit this node and every descendant in pre-order.
    pub fn visit<F: FnMut(&Node)>(&self, f: &mut F) {
        f(self);
        for c in &self.children {
            c.visit(f);
        }
    }

    /// Structural equality that ignores node ids.
    pub fn same_shape(&self, other: &Node) -> bool {
        self.label == other.label
            && self.kind == other.kind
            && self.attrs == other.attrs
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.same_shape(b))
    }

    /// Deep copy of this subtree where every node receives a fresh id.
    pub fn clone_with_fresh_ids(&self, ids: &mut IdGenerator) -> Node {
        Node {
            id: ids.next_id(),
            label: self.label.clone(),
            kind: self.kind,
            attrs: self.attrs.clone(),
            children: self
                .children
                .iter()
                .map(|c| c.clone_with_fresh_ids(ids))
                .collect(),
        }
    }
}

/// Monotonic node id source shared by a root parse and all of its imports.
#[derive(Debug)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        IdGenerator { next: 1 }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Declared message name to its node, in first-declaration order.
pub type MessageTable = IndexMap<String, Node>;

/// Declared enum name to its node, in first-declaration order.
pub type EnumTable = IndexMap<String, Node>;

/// Everything a root parse produces.
#[derive(Debug, Clone)]
pub struct ParsedProto {
    /// The root `service` node.
    pub root: Node,
    /// Messages from the root file and its whole import closure.
    pub messages: MessageTable,
    /// Enums from the root file and its whole import closure.
    pub enums: EnumTable,
    /// File names registered in the import closure, root first when parsed from a file.
    pub imports: Vec<String>,
}

impl ParsedProto {
    pub fn get_message(&self, name: &str) -> Option<&Node> {
        self.messages.get(name)
    }

    pub fn get_enum(&self, name: &str) -> Option<&Node> {
        self.enums.get(name)
    }

    /// All rpc nodes under the root, in declaration order.
    pub fn rpcs(&self) -> &[Node] {
        match self.root.child("rpcs") {
            Some(group) => &group.children,
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_keep_shape() {
        let mut ids = IdGenerator::new();
        let mut msg = Node::new(ids.next_id(), NodeKind::Message, "Ping");
        msg.children
            .push(Node::new(ids.next_id(), NodeKind::Parameter, "name"));

        let copy = msg.clone_with_fresh_ids(&mut ids);
        assert!(copy.same_shape(&msg));
        assert_ne!(copy.id, msg.id);
        assert_ne!(copy.children[0].id, msg.children[0].id);
        assert_eq!(ids.next_id(), 5);
    }

    #[test]
    fn test_find_descends() {
        let mut root = Node::new(1, NodeKind::Service, "S");
        let mut rpc = Node::new(2, NodeKind::Rpc, "Do");
        rpc.children.push(Node::new(3, NodeKind::Request, "Req"));
        root.children.push(rpc);

        assert_eq!(root.find("Req").map(|n| n.id), Some(3));
        assert!(root.child("Req").is_none());
        assert!(root.find("Missing").is_none());
    }
}
