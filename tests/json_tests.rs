//! Tree-view JSON output of whole parses.
#![cfg(feature = "serde")]

use pretty_assertions::assert_eq;
use prototree::parser;
use serde_json::{json, Value};

const SOURCE: &str = r#"syntax = "proto3";
package demo.pkg;
// A ping.
message Ping { string name = 1; }
service Pinger {
  rpc Do (Ping) returns (stream Ping) {}
}
"#;

#[test]
fn test_service_tree_shape() {
    let parsed = parser::parse_from_str(SOURCE).unwrap();
    let value: Value = serde_json::from_str(&parsed.root.to_json().unwrap()).unwrap();

    assert_eq!(value["text"], "Pinger");
    assert_eq!(value["data"]["nodetype"], "service");
    assert_eq!(value["children"][0]["text"], "rpcs");

    let rpc = &value["children"][0]["children"][0];
    assert_eq!(rpc["text"], "Do");
    assert_eq!(rpc["data"]["nodetype"], "rpc");
    assert_eq!(rpc["data"]["service"], "Pinger");

    let response = &rpc["children"][1];
    assert_eq!(response["text"], "Ping");
    assert_eq!(response["data"]["nodetype"], "message");
    assert_eq!(response["data"]["comment"], "A ping. ");
    assert_eq!(response["data"]["stream"], true);

    let field = &response["children"][0];
    assert_eq!(field["text"], "name");
    assert_eq!(
        field["data"],
        json!({
            "nodetype": "parameter",
            "name": "name",
            "comment": "",
            "index": "1",
            "datatype": "string",
            "message": "Ping"
        })
    );
    assert!(field.get("children").is_none());
}

#[test]
fn test_enum_options_serialize_as_triples() {
    let src = "syntax = \"proto3\";\npackage demo;\nenum Mode {\n  ON = 0; // lit\n  OFF = 1;\n}\n";
    let parsed = parser::parse_from_str(src).unwrap();
    let value = parsed.root.to_json_value().unwrap();

    let mode = &value["children"][0]["children"][0];
    assert_eq!(mode["text"], "Mode");
    assert_eq!(mode["data"]["datatype"], "enum");
    assert_eq!(
        mode["data"]["options"],
        json!([["0", "ON", "lit "], ["1", "OFF", ""]])
    );
}
