//! Tree-view JSON output.
//!
//! Every node serializes as `{id, text, data, children}`. `children` is
//! left out for leaves and `data` only carries the attributes that are set.
//! Option entries become `[index, value, comment]` arrays.

use serde::ser::{SerializeMap, SerializeTuple};
use serde::{Serialize, Serializer};

use crate::tree::{EnumOption, Node, NodeKind, OptionValue};

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.children.is_empty() { 3 } else { 4 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("text", &self.label)?;
        map.serialize_entry("data", &NodeData(self))?;
        if !self.children.is_empty() {
            map.serialize_entry("children", &self.children)?;
        }
        map.end()
    }
}

struct NodeData<'a>(&'a Node);

impl Serialize for NodeData<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.0;
        let attrs = &node.attrs;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("nodetype", node.kind.as_str())?;
        map.serialize_entry("name", &attrs.name)?;
        map.serialize_entry("comment", &attrs.comment)?;
        if node.kind == NodeKind::Parameter || !attrs.index.is_empty() {
            map.serialize_entry("index", &attrs.index)?;
        }
        if !attrs.datatype.is_empty() {
            map.serialize_entry("datatype", &attrs.datatype)?;
        }
        if attrs.repeated {
            map.serialize_entry("repeated", &true)?;
        }
        if attrs.stream || matches!(node.kind, NodeKind::Request | NodeKind::Response) {
            map.serialize_entry("stream", &attrs.stream)?;
        }
        if !attrs.options.is_empty() || attrs.datatype == "enum" {
            map.serialize_entry("options", &attrs.options)?;
        }
        let optional = [
            ("messagetype", &attrs.messagetype),
            ("service", &attrs.service),
            ("rpc", &attrs.rpc),
            ("message", &attrs.message),
            ("oneof", &attrs.oneof),
            ("map", &attrs.map),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                map.serialize_entry(key, v)?;
            }
        }
        map.end()
    }
}

impl Serialize for EnumOption {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(&self.index)?;
        tup.serialize_element(&self.value)?;
        tup.serialize_element(&self.comment)?;
        tup.end()
    }
}

impl Serialize for OptionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OptionValue::Name(name) => serializer.serialize_str(name),
            OptionValue::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

impl Node {
    /// Serialize this subtree to tree-view JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
