use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const PAGE: &str = "{{Infobox Céréale|image=Blé.jpg|nom=Blé}}\n\
Le blé est une céréale.\n\
\n\
== Histoire ==\n\
Cultivé depuis le néolithique.\n";

#[allow(deprecated)]
fn wikitrans(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wikitrans").expect("binary");
    cmd.current_dir(workdir)
        .env("WIKITRANS_TRANSLATOR", "stub")
        .env("LOG_CSV_PATH", workdir.join("logs/audit.csv"))
        .env_remove("OPENAI_API_KEY")
        .env_remove("MEDIAWIKI_API_ENDPOINT")
        .env_remove("MAX_TOKENS_PER_CHUNK");
    cmd
}

#[test]
fn chunk_json_lists_chunks_in_order() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::write(root.join("page.wiki"), PAGE).unwrap();

    let output = wikitrans(root)
        .args(["chunk", "page.wiki", "--max-tokens", "20", "--json"])
        .output()
        .expect("command run");
    assert!(output.status.success());

    let chunks: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let chunks = chunks.as_array().expect("array");
    assert!(chunks.len() > 1);
    assert!(chunks[0]["content"].as_str().unwrap().starts_with("{{Infobox"));
    assert!(chunks
        .last()
        .and_then(|c| c["content"].as_str())
        .unwrap()
        .contains("néolithique"));
}

#[test]
fn chunk_reads_stdin_and_prints_stats() {
    let temp = tempdir().unwrap();
    wikitrans(temp.path())
        .args(["chunk", "-"])
        .write_stdin(PAGE)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Chunks: 1"))
        .stdout(predicate::str::contains("[1] sections"));
}

#[test]
fn mask_hides_names_and_keys() {
    let temp = tempdir().unwrap();
    let output = wikitrans(temp.path())
        .args(["mask", "-"])
        .write_stdin(PAGE)
        .output()
        .expect("command run");
    assert!(output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let masked = body["masked"].as_str().unwrap();
    assert_eq!(body["protected"], true);
    assert!(!masked.contains("Infobox Céréale"));
    assert!(!masked.contains("image="));
    assert!(masked.contains("Blé.jpg"));
    assert!(body["mapping"]
        .as_object()
        .unwrap()
        .values()
        .any(|v| v == "Infobox Céréale"));
}

#[test]
fn translate_between_directories() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("fr")).unwrap();
    fs::write(root.join("fr/Blé.wiki"), PAGE).unwrap();

    let run = || {
        wikitrans(root)
            .args([
                "translate", "--page", "Blé", "--target-lang", "en", "--source-dir", "fr",
                "--target-dir", "en",
            ])
            .assert()
            .success()
    };

    run().stdout(predicate::str::contains("Translated: 1"));
    let published = fs::read_to_string(root.join("en/Blé.wiki")).unwrap();
    assert!(published.starts_with(PAGE.trim_end()));
    assert!(published.ends_with("[[fr:Blé]]\n"));
    assert!(fs::read_to_string(root.join("fr/Blé.wiki"))
        .unwrap()
        .ends_with("[[en:Blé]]\n"));

    // Second run sees the interwiki link
    run().stdout(predicate::str::contains("Skipped: 1"));

    let audit = fs::read_to_string(root.join("logs/audit.csv")).unwrap();
    let mut lines = audit.lines();
    assert_eq!(
        lines.next(),
        Some("source_page,target_page,source_lang,target_lang,status,date_iso,notes")
    );
    assert!(lines.next().unwrap().starts_with("Blé,Blé,fr,en,translated,"));
    assert!(lines.next().unwrap().starts_with("Blé,Blé,fr,en,skipped,"));
}

#[test]
fn dry_run_leaves_directories_untouched() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("fr")).unwrap();
    fs::write(root.join("fr/Blé.wiki"), PAGE).unwrap();
    fs::write(root.join("pages.txt"), "# wheat\nBlé\n\nAbsent\n").unwrap();

    wikitrans(root)
        .args([
            "translate", "--input", "pages.txt", "--target-lang", "en", "--source-dir", "fr",
            "--target-dir", "en", "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Pages: 2 | Translated: 1 | Linked: 0 | Skipped: 0 | Errors: 1",
        ));
    assert!(!root.join("en").exists());
    assert_eq!(fs::read_to_string(root.join("fr/Blé.wiki")).unwrap(), PAGE);
}

#[test]
fn translate_requires_a_page_source() {
    let temp = tempdir().unwrap();
    wikitrans(temp.path())
        .args(["translate", "--target-lang", "en"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--page"));
}

#[test]
fn openai_mode_requires_a_key() {
    let temp = tempdir().unwrap();
    wikitrans(temp.path())
        .env("WIKITRANS_TRANSLATOR", "openai")
        .args(["translate", "--page", "Blé", "--target-lang", "en", "--source-dir", "fr", "--target-dir", "en"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}
