//! Block contexts tracked while walking the token stream.
//!
//! Blocks nest (a oneof or enum inside a message), so the parser keeps a
//! stack of them. Each block owns the fragment it is currently building;
//! fragments are completed one token late, on the next sibling name or on
//! the block's closing brace.

use crate::tree::Node;

/// An open `{ ... }` region, or a declaration whose body has not started yet.
#[derive(Debug)]
pub(crate) enum Block {
    Service,
    Rpc(RpcBuilder),
    Message(MessageBody),
    Oneof(OneofBody),
    Enum(EnumBody),
}

impl Block {
    /// Short human description used in end-of-input errors and logs.
    pub(crate) fn describe(&self) -> String {
        fn named(kind: &str, name: Option<&str>) -> String {
            match name {
                Some(n) => format!("{} '{}'", kind, n),
                None => kind.to_string(),
            }
        }
        match self {
            Block::Service => "service".to_string(),
            Block::Rpc(rpc) => named("rpc", rpc.node.as_ref().map(|n| n.label.as_str())),
            Block::Message(body) => named("message", body.name.as_deref()),
            Block::Oneof(body) => named("oneof", body.node.as_ref().map(|n| n.label.as_str())),
            Block::Enum(body) => named("enum", body.name.as_deref()),
        }
    }

    /// The field builder of a message or oneof body.
    pub(crate) fn fields_mut(&mut self) -> Option<&mut FieldBuilder> {
        match self {
            Block::Message(body) => Some(&mut body.fields),
            Block::Oneof(body) => Some(&mut body.fields),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RpcBuilder {
    /// Created on the rpc name; request and response become its children.
    pub node: Option<Node>,
    /// One-shot `stream` marker for the next request/response type.
    pub stream: bool,
    /// Set once the `{` of the rpc body is seen.
    pub body_open: bool,
}

#[derive(Debug, Default)]
pub(crate) struct MessageBody {
    pub name: Option<String>,
    pub fields: FieldBuilder,
}

#[derive(Debug)]
pub(crate) struct OneofBody {
    /// Enclosing message name.
    pub message: String,
    pub node: Option<Node>,
    pub fields: FieldBuilder,
}

#[derive(Debug, Default)]
pub(crate) struct EnumBody {
    pub name: Option<String>,
    /// Value name waiting for its index and comment.
    pub pending: Option<String>,
}

/// Type and modifier state for the field currently being declared.
#[derive(Debug, Default)]
pub(crate) struct FieldBuilder {
    /// A scalar keyword, a type reference, or `map` once both map slots are filled.
    pub datatype: Option<String>,
    pub repeated: bool,
    pub map: Option<MapSlots>,
    /// The previous field, completed on the next name or the closing brace.
    pub pending: Option<Node>,
}

impl FieldBuilder {
    /// Record a datatype token. Inside an unfilled `map<K, V>` the token
    /// fills the key slot, then the value slot.
    pub(crate) fn accept_type(&mut self, text: &str) {
        if let Some(slots) = self.map.as_mut() {
            if slots.key.is_none() {
                slots.key = Some(text.to_string());
                return;
            }
            if slots.value.is_none() {
                slots.value = Some(text.to_string());
                self.datatype = Some("map".to_string());
                return;
            }
        }
        self.datatype = Some(text.to_string());
    }

    /// True while a `map<` has been opened but not both slots are known.
    pub(crate) fn awaiting_map_type(&self) -> bool {
        matches!(&self.map, Some(slots) if !slots.is_complete())
    }
}

/// Key and value type of a `map<K, V>` field.
#[derive(Debug, Default)]
pub(crate) struct MapSlots {
    pub key: Option<String>,
    pub value: Option<String>,
}

impl MapSlots {
    pub(crate) fn is_complete(&self) -> bool {
        self.key.is_some() && self.value.is_some()
    }
}
