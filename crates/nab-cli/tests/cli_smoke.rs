use serde_json::Value;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Command, Output};

const NOW: &str = "2024-03-10T12:00:00Z";

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .display()
        .to_string()
}

fn run_nab<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_nab");
    Command::new(bin)
        .args(args)
        .env_remove("NAB_LOG")
        .output()
        .expect("nab command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be valid json")
}

#[test]
fn query_json_emits_the_listing_payload() {
    let graph = fixture("listing_graph.json");
    let output = run_nab([
        "query",
        "nab/t/programming/new@~ix.pub.",
        "--graph",
        graph.as_str(),
        "--now",
        NOW,
        "--json",
    ]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["name"], "programming");
    assert_eq!(payload["ids"], "b+c+a");
    assert_eq!(payload["includeRanks"], true);
    assert_eq!(payload["submitTopic"], "programming");
}

#[test]
fn query_human_output_lists_ids_and_tabs() {
    let graph = fixture("listing_graph.json");
    let output = run_nab([
        "query",
        "nab/things/a/comments/best@~ix.pub.",
        "--graph",
        graph.as_str(),
        "--now",
        NOW,
    ]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Listing: programming (3 ids)"));
    assert!(stdout.contains("  r1\n  r2\n  a\n"));
    assert!(stdout.contains("Op: a"));
}

#[test]
fn query_vote_counts() {
    let graph = fixture("listing_graph.json");
    let output = run_nab([
        "query",
        "nab/things/a/votecounts@~ix.pub.",
        "--graph",
        graph.as_str(),
        "--json",
    ]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["up"], 3);
    assert_eq!(payload["down"], 1);
    assert_eq!(payload["comment"], 2);
    assert_eq!(payload["score"], 2);
}

#[test]
fn query_unmatched_path_fails_with_kind() {
    let graph = fixture("listing_graph.json");
    let output = run_nab(["query", "nab/nowhere", "--graph", graph.as_str()]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no_route_match"), "stderr: {stderr}");
}

#[test]
fn query_rejects_a_bad_clock() {
    let graph = fixture("listing_graph.json");
    let output = run_nab([
        "query",
        "nab/t/programming/new@~ix.pub.",
        "--graph",
        graph.as_str(),
        "--now",
        "yesterday",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid --now"));
}

#[test]
fn routes_json_lists_both_oracles_by_priority() {
    let output = run_nab(["routes", "--json"]);
    assert_success(&output);

    let rows = parse_json_stdout(&output);
    let rows = rows.as_array().expect("rows array");
    let indexer: Vec<i64> = rows
        .iter()
        .filter(|row| row["oracle"] == "indexer")
        .map(|row| row["priority"].as_i64().expect("priority"))
        .collect();
    assert!(!indexer.is_empty());
    assert!(indexer.windows(2).all(|pair| pair[0] >= pair[1]));

    let votecounts = rows
        .iter()
        .find(|row| row["route"] == "votecounts")
        .expect("votecounts route");
    assert_eq!(votecounts["oracle"], "tabulator");
    assert_eq!(votecounts["cacheTtlMs"], 14_400_000);
}

#[test]
fn soul_decodes_known_types() {
    let output = run_nab(["soul", "nab/things/abc/comments", "--json"]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["type"], "thingComments");
    assert_eq!(payload["params"]["thingid"], "abc");

    let output = run_nab(["soul", "not-a-soul"]);
    assert!(!output.status.success());
}
