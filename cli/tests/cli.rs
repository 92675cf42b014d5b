use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn kmarket(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kmarket").unwrap();
    cmd.arg("--home")
        .arg(home.path())
        .env_remove("RUST_LOG")
        .env_remove("KMARKET_EMBEDDING_KEY")
        .env_remove("OPENAI_API_KEY");
    cmd
}

fn sell(home: &TempDir, id: &str, name: &str, description: &str, tags: &str) {
    kmarket(home)
        .args(["sell", "--id", id, "--name", name])
        .args(["--description", description, "--tags", tags])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Listed {id} (keyword search only)")))
        .stderr(predicate::str::contains("WARN").not());
}

#[test]
fn test_sell_search_show_delist() {
    let home = TempDir::new().unwrap();
    sell(&home, "ts", "TS Handbook", "Patterns for large codebases", "typescript,guide");
    sell(&home, "py", "Model Zoo", "Notes on training pipelines", "python,ml");

    kmarket(&home)
        .args(["search", "python"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Model Zoo [py]  1.000 keyword"))
        .stdout(predicate::str::contains("TS Handbook").not());

    kmarket(&home)
        .args(["show", "ts", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tags\": [\n    \"typescript\",\n    \"guide\"\n  ]"));

    kmarket(&home).args(["delist", "ts"]).assert().success();

    kmarket(&home)
        .args(["show", "ts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no package with id \"ts\""));
}

#[test]
fn test_search_json_and_empty() {
    let home = TempDir::new().unwrap();
    sell(&home, "sol", "Contract Audits", "Checklist for auditors", "solidity");

    kmarket(&home)
        .args(["search", "solidity", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"match_type\": \"keyword\""))
        .stdout(predicate::str::contains("\"score\": 1.0"));

    kmarket(&home)
        .args(["search", "haskell"])
        .assert()
        .success()
        .stdout("No packages matched \"haskell\"\n");
}

#[test]
fn test_record_sale_for_missing_listing_fails() {
    let home = TempDir::new().unwrap();
    kmarket(&home)
        .args(["record-sale", "nope"])
        .assert()
        .failure();
}

#[test]
fn test_rejects_negative_price() {
    let home = TempDir::new().unwrap();
    kmarket(&home)
        .args(["sell", "--id", "x", "--name", "X", "--price=-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--price must be a non-negative number"));
}

#[test]
fn test_blank_query_is_rejected() {
    let home = TempDir::new().unwrap();
    sell(&home, "ts", "TS Handbook", "Patterns for large codebases", "typescript");

    for query in ["", "   "] {
        kmarket(&home)
            .args(["search", query])
            .assert()
            .failure()
            .stdout("")
            .stderr(predicate::str::contains("search query must not be empty"));
    }
}

#[test]
fn test_search_falls_back_to_keywords_when_embeddings_fail() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("config.toml"),
        "[embeddings]\nenabled = true\napi_endpoint = \"http://127.0.0.1:1/v1/embeddings\"\n",
    )
    .unwrap();
    let index = serde_json::json!({
        "entries": [{ "id": "ts", "embedding": vec![0.5f32; 1536], "metadata": { "packageId": "ts" } }],
        "dimensions": 1536,
    });
    std::fs::write(home.path().join("summary-index.json"), index.to_string()).unwrap();

    kmarket(&home)
        .args(["sell", "--id", "ts", "--name", "TS Handbook", "--tags", "typescript"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Listed ts (keyword search only)"));

    kmarket(&home)
        .args(["search", "typescript"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TS Handbook [ts]  1.000 keyword"))
        .stderr(predicate::str::contains("Semantic search failed"));
}
