use assert_cmd::Command;
use predicates::prelude::*;

fn plagscan(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("plagscan"));
    // Keep the run hermetic: no ./config lookups outside the temp dir.
    cmd.current_dir(dir)
        .env_remove("PLAGSCAN_CONFIG")
        .env_remove("PLAGSCAN_SEARCH_ENDPOINT");
    cmd
}

#[test]
fn segment_reads_stdin_up_to_the_sentinel() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("config"), "delimiters=。,！,？\nmax_length=100\n").unwrap();

    plagscan(tmp.path())
        .args(["-q", "segment", "--stdin"])
        .write_stdin("你好。世界！\n第二行？\nendinput\n忽略这一行。\n")
        .assert()
        .success()
        .stdout("你好\n世界\n第二行\n");
}

#[test]
fn segment_accepts_the_spaced_sentinel() {
    let tmp = tempfile::tempdir().unwrap();
    plagscan(tmp.path())
        .args(["-q", "segment", "--stdin"])
        .write_stdin("甲。乙\nend input\n丙\n")
        .assert()
        .success()
        .stdout("甲\n乙\n");
}

#[test]
fn segment_resplits_long_pieces_from_a_file() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("plagscan.conf");
    std::fs::write(&config, "delimiters=\nmax_length=5\n").unwrap();
    let article = tmp.path().join("article.txt");
    std::fs::write(&article, "a b c d e f g h").unwrap();

    plagscan(tmp.path())
        .args(["-q", "segment", "--config"])
        .arg(&config)
        .arg("--article")
        .arg(&article)
        .assert()
        .success()
        .stdout("a b c\nd e f\ng h\n");
}

#[test]
fn malformed_config_fails_before_any_search() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("config"), "max_length=64\nthis line has no pair\n").unwrap();
    std::fs::write(tmp.path().join("article.txt"), "你好。").unwrap();

    plagscan(tmp.path())
        .args(["-q", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
    assert!(!tmp.path().join("plagiarism_results.html").exists());
}

#[test]
fn relative_endpoint_override_fails_before_any_search() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("article.txt"), "这是一段足够长的用于检查的测试文字内容。").unwrap();

    plagscan(tmp.path())
        .env("PLAGSCAN_SEARCH_ENDPOINT", "/search")
        .args(["-q", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("search_endpoint"));
    assert!(!tmp.path().join("plagiarism_results.html").exists());

    // The override is checked on top of a config file too.
    std::fs::write(tmp.path().join("config"), "delay=0\n").unwrap();
    plagscan(tmp.path())
        .env("PLAGSCAN_SEARCH_ENDPOINT", "/search")
        .args(["-q", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("search_endpoint"));
    assert!(!tmp.path().join("plagiarism_results.html").exists());
}

#[test]
fn wrongly_typed_config_values_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("config"), "length_threshold=thirty\n").unwrap();

    plagscan(tmp.path())
        .args(["-q", "segment", "--stdin"])
        .write_stdin("endinput\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("length_threshold"));
}

#[test]
fn missing_article_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    plagscan(tmp.path())
        .args(["-q", "segment", "--article", "nope.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.txt"));
}
