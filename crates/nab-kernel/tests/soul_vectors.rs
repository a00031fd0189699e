//! Soul codec vectors.
//!
//! `tests/fixtures/soul_vectors.json` lists exact encodings, params the codec
//! must refuse, and strings that must decode to nothing.

use nab_kernel::soul::{NodeType, SoulParams, decode};
use serde_json::Value;
use std::path::PathBuf;

fn load_vectors() -> Value {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/soul_vectors.json");
    let raw = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_str(&raw).unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display()))
}

fn node_type(case: &Value) -> NodeType {
    let name = case["type"].as_str().expect("missing type");
    name.parse()
        .unwrap_or_else(|e| panic!("unknown node type {name}: {e}"))
}

fn params(case: &Value) -> SoulParams {
    serde_json::from_value(case["params"].clone()).expect("params should be a string map")
}

#[test]
fn encodings_match_and_decode_back() {
    let vectors = load_vectors();
    for case in vectors["encode"].as_array().expect("encode cases") {
        let ty = node_type(case);
        let params = params(case);
        let expected = case["soul"].as_str().expect("missing soul");

        let soul = ty.soul(&params).unwrap_or_else(|e| panic!("{ty}: {e}"));
        assert_eq!(soul.as_str(), expected);
        assert_eq!(ty.is_match(expected), Some(params.clone()));
        assert_eq!(decode(expected), Some((ty, params)));
    }
}

#[test]
fn malformed_params_are_refused() {
    let vectors = load_vectors();
    for case in vectors["reject"].as_array().expect("reject cases") {
        let ty = node_type(case);
        assert!(
            ty.soul(&params(case)).is_err(),
            "{ty} accepted {}",
            case["params"]
        );
    }
}

#[test]
fn unrelated_strings_decode_to_nothing() {
    let vectors = load_vectors();
    for raw in vectors["unrelated"].as_array().expect("unrelated cases") {
        let raw = raw.as_str().expect("string");
        assert_eq!(decode(raw), None, "{raw:?} decoded");
    }
}
