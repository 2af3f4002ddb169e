use assert_cmd::Command;

#[test]
fn cli_help_runs() {
    let mut cmd = Command::cargo_bin("foa-tagger").expect("binary exists");
    cmd.arg("--help").assert().success();
}

#[test]
fn validate_reports_shipped_vocabulary() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut cmd = Command::cargo_bin("foa-tagger").expect("binary exists");
    cmd.env("DATA_DIR", tmp.path().join("data"))
        .env("OUTPUTS_DIR", tmp.path().join("outputs"))
        .env("ONTOLOGY_PATH", "config/ontology.yaml")
        .arg("validate");
    let output = cmd.output().expect("command runs");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ontology valid"));
    assert!(stdout.contains("research_domains"));
}

#[test]
fn tag_rejects_out_of_range_threshold() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("documents.jsonl");
    std::fs::write(
        &input,
        concat!(r#"{"doc_id":"doc-1","title":"AI","body":""}"#, "\n"),
    )
    .expect("write input");

    let mut cmd = Command::cargo_bin("foa-tagger").expect("binary exists");
    cmd.env("DATA_DIR", tmp.path().join("data"))
        .env("OUTPUTS_DIR", tmp.path().join("outputs"))
        .env("ONTOLOGY_PATH", "config/ontology.yaml")
        .arg("tag")
        .arg("--input")
        .arg(&input)
        .arg("--threshold")
        .arg("1.5");
    let output = cmd.output().expect("command runs");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--threshold"), "stderr: {stderr}");
}

#[test]
fn tag_command_writes_both_artefacts() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("documents.jsonl");
    std::fs::write(
        &input,
        concat!(
            r#"{"doc_id":"doc-1","title":"AI for rural health","body":"Machine learning for underserved communities."}"#,
            "\n",
        ),
    )
    .expect("write input");
    let out = tmp.path().join("tagged.jsonl");

    let mut cmd = Command::cargo_bin("foa-tagger").expect("binary exists");
    cmd.env("DATA_DIR", tmp.path().join("data"))
        .env("OUTPUTS_DIR", tmp.path().join("outputs"))
        .env("ONTOLOGY_PATH", "config/ontology.yaml")
        .env("HIGH_CONFIDENCE_CUTOFF", "0.3")
        .arg("tag")
        .arg("--input")
        .arg(&input)
        .arg("--out")
        .arg(&out)
        .arg("--lexical-only");
    let output = cmd.output().expect("command runs");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let tagged = std::fs::read_to_string(&out).expect("tagged jsonl written");
    assert!(tagged.contains("\"doc-1\""));
    assert!(tagged.contains("populations/underserved_communities"));
    assert!(out.with_extension("csv").exists());
}
