//! Resolution of type references and assembly of the final tree.

use super::grammar::Definitions;
use crate::tree::{EnumTable, IdGenerator, MessageTable, Node, NodeKind};

/// The bare type name of a possibly package-qualified reference.
pub fn type_name(datatype: &str) -> &str {
    match datatype.rfind('.') {
        Some(pos) => &datatype[pos + 1..],
        None => datatype,
    }
}

/// Replace type references with the definitions they name.
///
/// Messages are visited in table order, and a referencing field receives a
/// copy of the referenced message's children as they stand at that point.
/// Copies get fresh ids, so a type used in several places never shares
/// nodes or ids between them.
pub(crate) fn resolve(defs: &mut Definitions, ids: &mut IdGenerator) {
    let keys: Vec<String> = defs.messages.keys().cloned().collect();
    for key in &keys {
        let children = match defs.messages.get(key) {
            Some(message) => message
                .children
                .iter()
                .map(|field| resolve_field(field, &defs.messages, &defs.enums, ids))
                .collect(),
            None => continue,
        };
        if let Some(message) = defs.messages.get_mut(key) {
            message.children = children;
        }
    }

    for rpc in &mut defs.rpcs {
        for child in &mut rpc.children {
            if let Some(message) = defs.messages.get(&child.label) {
                let mut embedded = message.clone_with_fresh_ids(ids);
                embedded.attrs.rpc = child.attrs.rpc.take();
                embedded.attrs.stream = child.attrs.stream;
                *child = embedded;
            }
        }
    }
}

fn resolve_field(
    field: &Node,
    messages: &MessageTable,
    enums: &EnumTable,
    ids: &mut IdGenerator,
) -> Node {
    let mut field = field.clone();
    match field.kind {
        NodeKind::Parameter => {
            let name = type_name(&field.attrs.datatype);
            if let Some(message) = messages.get(name) {
                field.children = message
                    .children
                    .iter()
                    .map(|c| c.clone_with_fresh_ids(ids))
                    .collect();
                field.attrs.messagetype = Some(field.attrs.datatype.clone());
            } else if let Some(entry) = enums.get(name) {
                field.attrs.messagetype = Some(field.attrs.datatype.clone());
                field.attrs.options = entry.attrs.options.clone();
                field.attrs.datatype = entry.attrs.datatype.clone();
            }
        }
        NodeKind::Oneof => {
            for choice in &mut field.children {
                if let Some(message) = messages.get(type_name(&choice.attrs.datatype)) {
                    choice.attrs.messagetype = Some(choice.attrs.datatype.clone());
                    choice.children = vec![message.clone_with_fresh_ids(ids)];
                }
            }
        }
        _ => {}
    }
    field
}

/// Build the root node handed back to callers.
///
/// With rpcs present the root is the service holding an `rpcs` group.
/// Otherwise the root lists the `enums` and `messages` groups.
pub(crate) fn assemble(defs: &Definitions, ids: &mut IdGenerator) -> Node {
    let mut root = Node::new(ids.next_id(), NodeKind::Service, defs.service_label.as_str());
    root.attrs.comment = defs.service_comment.clone();

    if !defs.rpcs.is_empty() {
        let mut rpcs = Node::new(ids.next_id(), NodeKind::Group, "rpcs");
        rpcs.children = defs.rpcs.clone();
        root.children.push(rpcs);
        return root;
    }

    if !defs.enums.is_empty() {
        let mut enums = Node::new(ids.next_id(), NodeKind::Group, "enums");
        enums.attrs.comment = "Defined enums".to_string();
        enums.children = defs.enums.values().cloned().collect();
        root.children.push(enums);
    }
    if !defs.messages.is_empty() {
        let mut messages = Node::new(ids.next_id(), NodeKind::Group, "messages");
        messages.attrs.comment = "Defined messages".to_string();
        messages.children = defs.messages.values().cloned().collect();
        root.children.push(messages);
    }
    root
}
