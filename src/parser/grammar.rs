//! The single structural pass over the token stream.
//!
//! Tokens are consumed once, left to right. Line-scoped flags (comment,
//! skip, `=`) live on the parser; everything block-scoped lives on the
//! [`Block`] stack.

use std::mem;

use super::context::{Block, EnumBody, MessageBody, OneofBody, RpcBuilder};
use super::imports::{self, ParseSession};
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::ParseError;
use crate::tree::{EnumOption, EnumTable, MessageTable, Node, NodeKind, OptionValue};

/// What one file contributes before resolution.
#[derive(Debug)]
pub(crate) struct Definitions {
    /// Declared service name, or the fallback label.
    pub service_label: String,
    pub service_comment: String,
    pub rpcs: Vec<Node>,
    pub messages: MessageTable,
    pub enums: EnumTable,
}

/// Parse one source text within `session`. Imports met along the way are
/// parsed recursively and their tables merged into the result.
pub(crate) fn parse_definitions(
    text: &str,
    fallback_label: &str,
    session: &mut ParseSession<'_>,
) -> Result<Definitions, ParseError> {
    let mut parser = StructuralParser::new(fallback_label, session);
    for tok in Lexer::new(text) {
        parser.step(tok?)?;
    }
    parser.finish()
}

struct StructuralParser<'s, 'a> {
    session: &'s mut ParseSession<'a>,
    fallback_label: String,
    declared_service: Option<String>,
    service_comment: String,
    rpcs: Vec<Node>,
    messages: MessageTable,
    enums: EnumTable,
    stack: Vec<Block>,

    comment: String,
    index: String,
    in_comment: bool,
    in_skip: bool,
    in_equal: bool,
    in_import: bool,
    /// `{` opened on skipped lines whose `}` has not been seen yet.
    skipped_braces: usize,
}

impl<'s, 'a> StructuralParser<'s, 'a> {
    fn new(fallback_label: &str, session: &'s mut ParseSession<'a>) -> Self {
        StructuralParser {
            session,
            fallback_label: fallback_label.to_string(),
            declared_service: None,
            service_comment: String::new(),
            rpcs: Vec::new(),
            messages: MessageTable::new(),
            enums: EnumTable::new(),
            stack: Vec::new(),
            comment: String::new(),
            index: String::new(),
            in_comment: false,
            in_skip: false,
            in_equal: false,
            in_import: false,
            skipped_braces: 0,
        }
    }

    fn service_label(&self) -> String {
        self.declared_service
            .clone()
            .unwrap_or_else(|| self.fallback_label.clone())
    }

    fn step(&mut self, tok: Token<'_>) -> Result<(), ParseError> {
        log::trace!("line {}: {:?} {:?}", tok.line, tok.kind, tok.text);

        // Inside a braced option value only the braces matter.
        if self.skipped_braces > 0 {
            match tok.kind {
                TokenKind::Newline => self.end_line(),
                _ if self.in_comment => {}
                TokenKind::Comment => self.in_comment = true,
                TokenKind::LBrace => self.skipped_braces += 1,
                TokenKind::RBrace => self.skipped_braces -= 1,
                _ => {}
            }
            return Ok(());
        }

        if tok.kind == TokenKind::Comment {
            self.in_comment = true;
            return Ok(());
        }
        if self.in_comment && tok.kind != TokenKind::Newline {
            if !self.in_skip {
                self.comment.push_str(tok.text);
                self.comment.push(' ');
            }
            return Ok(());
        }

        match tok.kind {
            TokenKind::Newline => {
                self.end_line();
                return Ok(());
            }
            k if k.is_skip() => {
                self.in_skip = true;
                self.comment.clear();
                return Ok(());
            }
            TokenKind::Equal => {
                self.in_equal = true;
                return Ok(());
            }
            TokenKind::Import => {
                self.in_import = true;
                return Ok(());
            }
            TokenKind::Semicolon => {
                // `rpc Do (A) returns (B);` has no body.
                let ends_rpc = matches!(
                    self.stack.last(),
                    Some(Block::Rpc(rpc)) if rpc.node.is_some() && !rpc.body_open
                );
                if ends_rpc {
                    self.close_block();
                }
                return Ok(());
            }
            _ => {}
        }

        // A `}` after a skipped declaration still closes the enclosing block.
        if self.in_skip && tok.kind != TokenKind::RBrace {
            if tok.kind == TokenKind::LBrace {
                self.skipped_braces += 1;
            }
            return Ok(());
        }

        match tok.kind {
            TokenKind::Service => {
                self.service_comment = mem::take(&mut self.comment);
                self.open(Block::Service);
            }
            TokenKind::Rpc => {
                if matches!(self.stack.last(), Some(Block::Service)) {
                    self.open(Block::Rpc(RpcBuilder::default()));
                }
            }
            TokenKind::Stream => {
                if let Some(Block::Rpc(rpc)) = self.stack.last_mut() {
                    rpc.stream = true;
                }
            }
            TokenKind::Message => {
                self.flush_pending();
                self.open(Block::Message(MessageBody::default()));
            }
            k if k.is_scalar() => {
                if let Some(fields) = self.stack.last_mut().and_then(Block::fields_mut) {
                    fields.accept_type(tok.text);
                }
            }
            TokenKind::Enum => {
                self.flush_pending();
                self.open(Block::Enum(EnumBody::default()));
            }
            TokenKind::Oneof => {
                if let Some(Block::Message(body)) = self.stack.last() {
                    let message = body.name.clone().unwrap_or_default();
                    self.flush_pending();
                    self.open(Block::Oneof(OneofBody {
                        message,
                        node: None,
                        fields: Default::default(),
                    }));
                }
            }
            TokenKind::Repeated => {
                if let Some(fields) = self.stack.last_mut().and_then(Block::fields_mut) {
                    fields.repeated = true;
                }
            }
            TokenKind::Map => {
                if let Some(fields) = self.stack.last_mut().and_then(Block::fields_mut) {
                    fields.map = Some(Default::default());
                }
            }
            TokenKind::Ident => self.ident(tok.text)?,
            TokenKind::LBrace => match self.stack.last_mut() {
                Some(Block::Service) => {
                    if !self.comment.is_empty() {
                        self.service_comment = mem::take(&mut self.comment);
                    }
                }
                Some(Block::Rpc(rpc)) => {
                    rpc.body_open = true;
                    self.comment.clear();
                }
                _ => {}
            },
            TokenKind::RBrace => {
                if self.stack.is_empty() {
                    log::debug!("line {}: stray '}}' ignored", tok.line);
                } else {
                    self.close_block();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn end_line(&mut self) {
        self.in_comment = false;
        self.in_equal = false;
        self.in_skip = false;
    }

    fn open(&mut self, block: Block) {
        log::debug!("open {}", block.describe());
        self.stack.push(block);
    }

    fn ident(&mut self, text: &str) -> Result<(), ParseError> {
        let in_body = matches!(
            self.stack.last(),
            Some(Block::Message(_) | Block::Oneof(_) | Block::Enum(_))
        );
        if self.in_equal && in_body {
            self.index = text.to_string();
            self.in_equal = false;
            return Ok(());
        }

        if self.in_import {
            if text == "public" || text == "weak" {
                return Ok(());
            }
            self.in_import = false;
            self.comment.clear();
            if let Some(defs) = imports::load_import(text, self.session)? {
                self.messages.extend(defs.messages);
                self.enums.extend(defs.enums);
            }
            return Ok(());
        }

        match self.stack.last() {
            Some(Block::Rpc(_)) => self.rpc_ident(text),
            Some(Block::Service) => {
                self.declared_service = Some(text.to_string());
                Ok(())
            }
            Some(Block::Enum(_)) => {
                self.enum_ident(text);
                Ok(())
            }
            Some(Block::Message(_)) | Some(Block::Oneof(_)) => {
                self.body_ident(text);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn rpc_ident(&mut self, text: &str) -> Result<(), ParseError> {
        // Identifiers inside an rpc body only come from option values.
        if matches!(self.stack.last(), Some(Block::Rpc(rpc)) if rpc.body_open) {
            return Ok(());
        }
        let service = self.service_label();
        let id = self.session.next_id();
        let comment = mem::take(&mut self.comment);

        let rpc = match self.stack.last_mut() {
            Some(Block::Rpc(rpc)) => rpc,
            _ => return Ok(()),
        };

        if rpc.node.is_none() {
            let mut node = Node::new(id, NodeKind::Rpc, text);
            node.attrs.service = Some(service);
            node.attrs.comment = comment;
            rpc.node = Some(node);
            return Ok(());
        }
        let node = match rpc.node.as_mut() {
            Some(node) => node,
            None => return Ok(()),
        };

        let kind = match node.children.len() {
            0 => NodeKind::Request,
            1 => NodeKind::Response,
            _ => {
                return Err(ParseError::malformed(format!(
                    "unexpected identifier '{}' after the response type of rpc '{}'",
                    text, node.label
                )))
            }
        };
        let mut child = Node::new(id, kind, text);
        child.attrs.rpc = Some(node.label.clone());
        child.attrs.service = Some(service);
        child.attrs.comment = comment;
        child.attrs.stream = mem::take(&mut rpc.stream);
        node.children.push(child);
        Ok(())
    }

    fn enum_ident(&mut self, text: &str) {
        let has_name = matches!(self.stack.last(), Some(Block::Enum(body)) if body.name.is_some());
        if !has_name {
            let mut node = Node::new(self.session.next_id(), NodeKind::Parameter, text);
            node.attrs.comment = mem::take(&mut self.comment);
            node.attrs.datatype = "enum".to_string();
            self.enums.insert(text.to_string(), node);
            if let Some(Block::Enum(body)) = self.stack.last_mut() {
                body.name = Some(text.to_string());
            }
            return;
        }

        self.flush_pending();
        self.index.clear();
        self.comment.clear();
        if let Some(Block::Enum(body)) = self.stack.last_mut() {
            body.pending = Some(text.to_string());
        }
    }

    /// An identifier inside a message or oneof body: the block's own name,
    /// a map slot type, a type reference, or a field name.
    fn body_ident(&mut self, text: &str) {
        match self.stack.last() {
            Some(Block::Message(body)) if body.name.is_none() => {
                let mut node = Node::new(self.session.next_id(), NodeKind::Message, text);
                node.attrs.comment = mem::take(&mut self.comment);
                self.messages.insert(text.to_string(), node);
                if let Some(Block::Message(body)) = self.stack.last_mut() {
                    body.name = Some(text.to_string());
                }
                return;
            }
            Some(Block::Oneof(body)) if body.node.is_none() => {
                let mut node = Node::new(self.session.next_id(), NodeKind::Oneof, text);
                node.attrs.oneof = Some(text.to_string());
                node.attrs.datatype = "oneof".to_string();
                node.attrs.message = Some(body.message.clone());
                if let Some(Block::Oneof(body)) = self.stack.last_mut() {
                    body.node = Some(node);
                }
                return;
            }
            _ => {}
        }

        let (message, oneof) = match self.stack.last() {
            Some(Block::Message(body)) => (body.name.clone(), None),
            Some(Block::Oneof(body)) => (
                Some(body.message.clone()),
                body.node.as_ref().map(|n| n.label.clone()),
            ),
            _ => return,
        };

        let ready = match self.stack.last_mut().and_then(Block::fields_mut) {
            Some(fields) if fields.awaiting_map_type() => {
                fields.accept_type(text);
                return;
            }
            Some(fields) if fields.datatype.is_none() => {
                fields.accept_type(text);
                return;
            }
            Some(_) => true,
            None => false,
        };
        if !ready {
            return;
        }

        self.flush_pending();

        let fields = match self.stack.last_mut().and_then(Block::fields_mut) {
            Some(fields) => fields,
            None => return,
        };
        let datatype = fields.datatype.take().unwrap_or_default();

        let mut node = Node::new(self.session.next_id(), NodeKind::Parameter, text);
        node.attrs.message = message;
        node.attrs.oneof = oneof;
        if datatype == "bool" {
            node.attrs.options = EnumOption::bool_pair();
        }
        if let Some(slots) = fields.map.take() {
            let mut key = Node::new(self.session.next_id(), NodeKind::MapName, "name");
            key.attrs.datatype = slots.key.unwrap_or_default();
            key.attrs.map = Some(text.to_string());
            let mut value = Node::new(self.session.next_id(), NodeKind::MapValue, "value");
            value.attrs.datatype = slots.value.unwrap_or_default();
            value.attrs.map = Some(text.to_string());
            node.children = vec![key, value];
        }
        node.attrs.datatype = datatype;
        node.attrs.repeated = mem::take(&mut fields.repeated);
        fields.pending = Some(node);
        self.comment.clear();
    }

    /// Complete the fragment pending in the innermost block, attaching the
    /// index and comment gathered since it was started.
    fn flush_pending(&mut self) {
        match self.stack.last_mut() {
            Some(Block::Message(body)) => {
                if let Some(mut node) = body.fields.pending.take() {
                    node.attrs.index = mem::take(&mut self.index);
                    node.attrs.comment = mem::take(&mut self.comment);
                    let name = body.name.as_deref().unwrap_or_default();
                    if let Some(message) = self.messages.get_mut(name) {
                        message.children.push(node);
                    }
                }
            }
            Some(Block::Oneof(body)) => {
                if let Some(mut node) = body.fields.pending.take() {
                    node.attrs.index = mem::take(&mut self.index);
                    node.attrs.comment = mem::take(&mut self.comment);
                    if let Some(oneof) = body.node.as_mut() {
                        oneof.children.push(node);
                    }
                }
            }
            Some(Block::Enum(body)) => {
                if let Some(value) = body.pending.take() {
                    let option = EnumOption::new(
                        mem::take(&mut self.index),
                        OptionValue::Name(value),
                        mem::take(&mut self.comment),
                    );
                    let name = body.name.as_deref().unwrap_or_default();
                    if let Some(entry) = self.enums.get_mut(name) {
                        entry.attrs.options.push(option);
                    }
                }
            }
            _ => {}
        }
    }

    /// Close the innermost block, flushing whatever it still holds.
    fn close_block(&mut self) {
        self.flush_pending();
        let block = match self.stack.pop() {
            Some(block) => block,
            None => return,
        };
        log::debug!("close {}", block.describe());

        match block {
            Block::Rpc(rpc) => {
                if let Some(node) = rpc.node {
                    self.rpcs.push(node);
                }
            }
            Block::Oneof(body) => {
                if let Some(node) = body.node {
                    if let Some(message) = self.messages.get_mut(&body.message) {
                        message.children.push(node);
                    }
                }
            }
            Block::Service | Block::Message(_) | Block::Enum(_) => {}
        }
        self.index.clear();
        self.comment.clear();
    }

    fn finish(self) -> Result<Definitions, ParseError> {
        if let Some(open) = self.stack.last() {
            return Err(ParseError::UnexpectedEndOfInput {
                open: open.describe(),
            });
        }
        Ok(Definitions {
            service_label: self.service_label(),
            service_comment: self.service_comment,
            rpcs: self.rpcs,
            messages: self.messages,
            enums: self.enums,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::parser::ParseOptions;

    fn parse(text: &str) -> Result<Definitions, ParseError> {
        let sources: HashMap<String, String> = HashMap::new();
        let options = ParseOptions::default();
        let mut session = ParseSession::new(&sources, &options);
        parse_definitions(text, "test", &mut session)
    }

    fn labels(node: &Node) -> Vec<&str> {
        node.children.iter().map(|c| c.label.as_str()).collect()
    }

    #[test]
    fn test_message_fields() {
        let defs = parse(
            "message Ping {\n  string name = 1;\n  repeated int64 ids = 2; // the ids\n  Peer peer = 3;\n}\n",
        )
        .unwrap();
        let ping = &defs.messages["Ping"];
        assert_eq!(ping.kind, NodeKind::Message);
        assert_eq!(labels(ping), vec!["name", "ids", "peer"]);

        let name = &ping.children[0];
        assert_eq!(name.attrs.datatype, "string");
        assert_eq!(name.attrs.index, "1");
        assert_eq!(name.attrs.message.as_deref(), Some("Ping"));

        let ids = &ping.children[1];
        assert!(ids.attrs.repeated);
        assert_eq!(ids.attrs.index, "2");
        assert_eq!(ids.attrs.comment, "the ids ");

        assert_eq!(ping.children[2].attrs.datatype, "Peer");
        assert!(!ping.children[2].attrs.repeated);
    }

    #[test]
    fn test_last_field_flushed_once() {
        let defs = parse("message A { string x = 1; bool y = 2; }").unwrap();
        let a = &defs.messages["A"];
        assert_eq!(labels(a), vec!["x", "y"]);
        assert_eq!(a.children[1].attrs.options, EnumOption::bool_pair());
    }

    #[test]
    fn test_enum_options() {
        let defs = parse("// colours\nenum Color {\n  RED = 0;\n  GREEN = 1; // go\n}\n").unwrap();
        let color = &defs.enums["Color"];
        assert_eq!(color.kind, NodeKind::Parameter);
        assert_eq!(color.attrs.datatype, "enum");
        assert_eq!(color.attrs.comment, "colours ");
        assert_eq!(
            color.attrs.options,
            vec![
                EnumOption::new("0", OptionValue::Name("RED".into()), ""),
                EnumOption::new("1", OptionValue::Name("GREEN".into()), "go "),
            ]
        );
    }

    #[test]
    fn test_map_field() {
        let defs = parse("message M {\n  map<string, Peer> peers = 4;\n  int32 n = 5;\n}\n").unwrap();
        let m = &defs.messages["M"];
        assert_eq!(labels(m), vec!["peers", "n"]);
        let peers = &m.children[0];
        assert_eq!(peers.attrs.datatype, "map");
        assert_eq!(peers.attrs.index, "4");
        assert_eq!(peers.children.len(), 2);
        assert_eq!(peers.children[0].kind, NodeKind::MapName);
        assert_eq!(peers.children[0].attrs.datatype, "string");
        assert_eq!(peers.children[1].kind, NodeKind::MapValue);
        assert_eq!(peers.children[1].attrs.datatype, "Peer");
        assert_eq!(peers.children[1].attrs.map.as_deref(), Some("peers"));
        assert_eq!(m.children[1].attrs.datatype, "int32");
    }

    #[test]
    fn test_oneof_stays_in_message() {
        let defs = parse(
            "message M {\n  string a = 1;\n  oneof choice {\n    string b = 2;\n    Peer c = 3;\n  }\n  int32 d = 4;\n}\n",
        )
        .unwrap();
        let m = &defs.messages["M"];
        assert_eq!(labels(m), vec!["a", "choice", "d"]);
        assert_eq!(m.children[0].attrs.index, "1");

        let choice = &m.children[1];
        assert_eq!(choice.kind, NodeKind::Oneof);
        assert_eq!(choice.attrs.datatype, "oneof");
        assert_eq!(labels(choice), vec!["b", "c"]);
        assert_eq!(choice.children[1].attrs.index, "3");
        assert_eq!(choice.children[1].attrs.oneof.as_deref(), Some("choice"));
        assert_eq!(m.children[2].attrs.index, "4");
    }

    #[test]
    fn test_nested_enum_in_message() {
        let defs = parse(
            "message M {\n  int32 a = 1;\n  enum Kind {\n    X = 0;\n  }\n  Kind k = 2;\n}\n",
        )
        .unwrap();
        assert_eq!(labels(&defs.messages["M"]), vec!["a", "k"]);
        assert_eq!(defs.messages["M"].children[0].attrs.index, "1");
        assert_eq!(defs.enums["Kind"].attrs.options.len(), 1);
    }

    #[test]
    fn test_service_and_rpcs() {
        let defs = parse(
            "// pings things\nservice Pinger {\n  // does it\n  rpc Do (stream Ping) returns (Pong) {}\n  rpc Other (Ping) returns (stream Pong);\n}\n",
        )
        .unwrap();
        assert_eq!(defs.service_label, "Pinger");
        assert_eq!(defs.service_comment, "pings things ");
        assert_eq!(defs.rpcs.len(), 2);

        let rpc = &defs.rpcs[0];
        assert_eq!(rpc.label, "Do");
        assert_eq!(rpc.attrs.comment, "does it ");
        assert_eq!(rpc.attrs.service.as_deref(), Some("Pinger"));
        assert_eq!(rpc.children[0].kind, NodeKind::Request);
        assert!(rpc.children[0].attrs.stream);
        assert_eq!(rpc.children[1].kind, NodeKind::Response);
        assert!(!rpc.children[1].attrs.stream);

        let other = &defs.rpcs[1];
        assert!(!other.children[0].attrs.stream);
        assert!(other.children[1].attrs.stream);
        assert_eq!(other.children[1].attrs.rpc.as_deref(), Some("Other"));
    }

    #[test]
    fn test_rpc_option_body_is_skipped() {
        let defs = parse(
            "service S {\n  rpc Get (Req) returns (Resp) {\n    option (google.api.http) = {\n      get: \"/v1/x\"\n    };\n  }\n  rpc Put (Req) returns (Resp) {}\n}\n",
        )
        .unwrap();
        let names: Vec<&str> = defs.rpcs.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(names, vec!["Get", "Put"]);
        assert_eq!(defs.rpcs[0].children.len(), 2);
    }

    #[test]
    fn test_nested_option_value_keeps_later_rpcs() {
        let defs = parse(
            "service S {\n  rpc Get (Req) returns (Resp) {\n    option (x) = {\n      inner: { v: 1 }\n      // stray } in a comment\n    };\n  }\n  rpc Put (Req) returns (Resp) {}\n}\n",
        )
        .unwrap();
        let names: Vec<&str> = defs.rpcs.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(names, vec!["Get", "Put"]);
    }

    #[test]
    fn test_option_value_in_message_adds_no_fields() {
        let defs = parse(
            "message M {\n  option (x) = {\n    foo: 1\n    bar: { baz: 2 }\n  };\n  string y = 2;\n}\nmessage N { option deprecated = true; }\n",
        )
        .unwrap();
        let m = &defs.messages["M"];
        assert_eq!(labels(m), vec!["y"]);
        assert_eq!(m.children[0].attrs.index, "2");
        assert!(defs.messages["N"].children.is_empty());
    }

    #[test]
    fn test_third_rpc_identifier_is_malformed() {
        let err = parse("service S {\n  rpc Do (A) returns (B) C {}\n}\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedSource { .. }));
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse("message A {\n  string x = 1;\n").unwrap_err();
        match err {
            ParseError::UnexpectedEndOfInput { open } => assert_eq!(open, "message 'A'"),
            other => panic!("expected end of input error, got {:?}", other),
        }
    }

    #[test]
    fn test_skip_lines_do_not_leak_comments() {
        let defs = parse("syntax = \"proto3\"; // header\npackage a.b;\nmessage A {\n  option deprecated = true;\n  string x = 1;\n}\n").unwrap();
        let a = &defs.messages["A"];
        assert_eq!(a.attrs.comment, "");
        assert_eq!(labels(a), vec!["x"]);
    }

    #[test]
    fn test_ids_are_unique() {
        let defs = parse("message A { string x = 1; map<string, int32> m = 2; }\nenum E { Z = 0; }\n").unwrap();
        let mut seen = Vec::new();
        for node in defs.messages.values().chain(defs.enums.values()) {
            node.visit(&mut |n| seen.push(n.id));
        }
        let len = seen.len();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), len);
    }
}
