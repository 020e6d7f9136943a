//! End-to-end interview runs against a mocked chat-completions endpoint.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUESTION: &str = "Why can a tuple be used as a dictionary key?";
const FEEDBACK: &str = "Good: you mentioned immutability. Also mention hashing.";

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}, "index": 0}],
        "model": "gpt-4o-mini",
        "usage": {"prompt_tokens": 40, "completion_tokens": 12, "total_tokens": 52}
    })
}

async fn mock_openai() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("Candidate answer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(FEEDBACK)))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(QUESTION)))
        .mount(&server)
        .await;
    server
}

fn write_workspace(dir: &Path, base_url: &str) -> PathBuf {
    std::fs::write(
        dir.join("corpus.toml"),
        r#"
[corpus]
id = "python"
name = "Python"

[[passages]]
id = "tuples"
text = "Tuples are immutable and hashable, so they can be dictionary keys."
"#,
    )
    .unwrap();

    let config = dir.join("mockview.toml");
    std::fs::write(
        &config,
        format!(
            r#"
default_generator = "openai"
database = "{db}"

[generators.openai]
type = "openai"
api_key = "sk-test"
base_url = "{base_url}"

[retriever]
type = "corpus"
path = "{corpus}"

[interview]
max_attempts = 2
request_timeout_secs = 5
"#,
            db = dir.join("mockview.db").display(),
            corpus = dir.join("corpus.toml").display(),
        ),
    )
    .unwrap();
    config
}

fn mockview(dir: &Path, config: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("mockview").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("RUST_LOG", "off")
        .arg("--config")
        .arg(config);
    cmd
}

/// Run a blocking CLI invocation without stalling the mock server's runtime.
async fn run(mut cmd: Command, stdin: &'static str) -> assert_cmd::assert::Assert {
    tokio::task::spawn_blocking(move || cmd.write_stdin(stdin).assert())
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn answered_interview_is_saved_and_reviewable() {
    let server = mock_openai().await;
    let dir = TempDir::new().unwrap();
    let config = write_workspace(dir.path(), &server.uri());

    mockview(dir.path(), &config)
        .args(["user", "add", "ada"])
        .assert()
        .success();

    let mut cmd = mockview(dir.path(), &config);
    cmd.args(["interview", "--user", "ada"]);
    run(cmd, "Because tuples are immutable.\nn\n")
        .await
        .success()
        .stdout(predicate::str::contains(QUESTION))
        .stdout(predicate::str::contains(FEEDBACK))
        .stdout(predicate::str::contains("Saved session 1"));

    mockview(dir.path(), &config)
        .args(["history", "--user", "ada"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 session(s)."));

    mockview(dir.path(), &config)
        .args(["records", "--user", "ada", "--filter", "TUPLE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 record(s)."));

    let export = dir.path().join("out/transcript.json");
    mockview(dir.path(), &config)
        .args(["history", "--user", "ada", "--session", "1", "--export"])
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("Interviewer"))
        .stdout(predicate::str::contains("(3 messages)"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(json["username"], "ada");
    assert_eq!(json["turns"].as_array().unwrap().len(), 3);
    assert_eq!(json["turns"][0]["content"], QUESTION);
}

#[tokio::test(flavor = "multi_thread")]
async fn quitting_before_answering_saves_nothing() {
    let server = mock_openai().await;
    let dir = TempDir::new().unwrap();
    let config = write_workspace(dir.path(), &server.uri());

    mockview(dir.path(), &config)
        .args(["user", "add", "bob"])
        .assert()
        .success();

    let mut cmd = mockview(dir.path(), &config);
    cmd.args(["interview", "--user", "bob"]);
    run(cmd, ":quit\n")
        .await
        .success()
        .stdout(predicate::str::contains("not saved"));

    mockview(dir.path(), &config)
        .args(["records", "--user", "bob"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No records"));
}

#[tokio::test(flavor = "multi_thread")]
async fn quitting_mid_interview_reports_discarded_answers() {
    let server = mock_openai().await;
    let dir = TempDir::new().unwrap();
    let config = write_workspace(dir.path(), &server.uri());

    mockview(dir.path(), &config)
        .args(["user", "add", "dee"])
        .assert()
        .success();

    let mut cmd = mockview(dir.path(), &config);
    cmd.args(["interview", "--user", "dee"]);
    run(cmd, "Because tuples are immutable.\ny\n:quit\n")
        .await
        .success()
        .stdout(predicate::str::contains(FEEDBACK))
        .stdout(predicate::str::contains(
            "1 evaluated answer(s) from this session are discarded",
        ));

    mockview(dir.path(), &config)
        .args(["records", "--user", "dee"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No records"));
}

#[tokio::test(flavor = "multi_thread")]
async fn generator_outage_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let config = write_workspace(dir.path(), &server.uri());

    mockview(dir.path(), &config)
        .args(["user", "add", "cy"])
        .assert()
        .success();

    let mut cmd = mockview(dir.path(), &config);
    cmd.args(["interview", "--user", "cy"]);
    run(cmd, "n\n")
        .await
        .success()
        .stderr(predicate::str::contains("Could not get a question"));
}
