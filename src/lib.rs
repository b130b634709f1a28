//! Prototree: turns `.proto` interface definitions into a browsable tree.
//!
//! A single left-to-right pass over the token stream builds services, rpcs,
//! messages, enums, oneofs and maps. Imports are parsed recursively and
//! their types merged in, then field type references are replaced with the
//! definitions they name.
//!
//! # Quick Start
//!
//! ```rust
//! use prototree::parser;
//! use prototree::tree::NodeKind;
//!
//! let parsed = parser::parse_from_str(r#"
//! syntax = "proto3";
//! package demo.pkg;
//! message Ping { string name = 1; }
//! service Pinger {
//!   rpc Do (Ping) returns (Ping) {}
//! }
//! "#).unwrap();
//!
//! assert_eq!(parsed.root.label, "Pinger");
//! let rpc = &parsed.rpcs()[0];
//! assert_eq!(rpc.label, "Do");
//! assert_eq!(rpc.children[0].kind, NodeKind::Message);
//! assert_eq!(rpc.children[0].children[0].label, "name");
//! ```

pub mod error;
pub mod tree;
pub mod parser;

#[cfg(feature = "serde")]
pub mod json;

pub use error::ParseError;
pub use parser::{parse_from_file, parse_from_str, parse_with_loader, ParseOptions};
pub use tree::{Node, NodeKind, ParsedProto};
