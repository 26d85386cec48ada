// Integration tests for the `shopmerge` binary.
// Run with: cargo test -p shopmerge-cli --test cli_tests

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn shopmerge(cwd: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_shopmerge"));
    cmd.current_dir(cwd);
    // keep the user's real settings out of the tests
    cmd.env_remove("SHOPMERGE_MAPPING");
    cmd
}

fn write_settings(dir: &Path) -> String {
    let path = dir.join("settings.json");
    fs::write(&path, "{}").unwrap();
    path.to_string_lossy().into_owned()
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid JSON ({e}): {stdout}"))
}

fn store_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

#[test]
fn merge_writes_artifact_and_json_report() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("src");
    store_file(&source, "StoreX/订单导出-美国.csv", "订单号,金额\nA1,1\nA2,2\n");
    let (gbk, _, _) = encoding_rs::GBK.encode("订单号,金额\nB1,3\n");
    fs::create_dir_all(source.join("StoreY")).unwrap();
    fs::write(source.join("StoreY/订单导出-英国.csv"), gbk).unwrap();

    let settings = write_settings(dir.path());
    let output = shopmerge(dir.path())
        .args(["merge", "--source", "src", "--output", "out", "--task-id", "T1"])
        .args(["--category", "order", "--settings", &settings, "--json", "--quiet"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report = stdout_json(&output);
    assert_eq!(report["task_id"], "T1");
    assert_eq!(report["categories"].as_array().unwrap().len(), 1);
    assert_eq!(report["categories"][0]["category"], "order");
    assert_eq!(report["categories"][0]["rows_merged"], 3);
    assert_eq!(report["categories"][0]["rows_by_store"][1]["country"], "英国");
    assert!(dir.path().join("out").join("TEMU订单数据-T1.xlsx").is_file());
}

#[test]
fn merge_defaults_to_dated_task_dir() {
    let dir = tempdir().unwrap();
    store_file(&dir.path().join("src"), "StoreA/订单导出.csv", "订单号\n1\n");
    let settings = write_settings(dir.path());

    let output = shopmerge(dir.path())
        .args(["merge", "-s", "src", "--task-id", "T9", "-c", "order", "--settings", &settings])
        .output()
        .unwrap();
    assert!(output.status.success());

    let results = dir.path().join("处理结果");
    let dates: Vec<_> = fs::read_dir(&results).unwrap().collect();
    assert_eq!(dates.len(), 1);
    let task_dir = dates[0].as_ref().unwrap().path().join("TASK_T9");
    assert!(task_dir.join("TEMU订单数据-T9.xlsx").is_file());
}

#[test]
fn default_selection_runs_without_mapping() {
    let dir = tempdir().unwrap();
    store_file(&dir.path().join("src"), "StoreA/订单导出-美国.csv", "订单号\nA1\n");
    let settings = write_settings(dir.path());

    let output = shopmerge(dir.path())
        .args(["merge", "--source", "src", "--output", "out", "--task-id", "T2"])
        .args(["--settings", &settings, "--json"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("out").join("TEMU订单数据-T2.xlsx").is_file());
    let report = stdout_json(&output);
    let ran: Vec<&str> = report["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["category"].as_str().unwrap())
        .collect();
    assert_eq!(ran.len(), 10);
    assert!(!ran.contains(&"amazon-settlement"));
}

#[test]
fn missing_source_exits_3() {
    let dir = tempdir().unwrap();
    let settings = write_settings(dir.path());
    let output = shopmerge(dir.path())
        .args(["merge", "--source", "nope", "--output", "out", "--settings", &settings])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("source directory not found"), "stderr: {stderr}");
    assert!(!dir.path().join("out").exists());
}

#[test]
fn amazon_without_mapping_exits_4() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    let settings = write_settings(dir.path());
    let output = shopmerge(dir.path())
        .args(["merge", "--source", "src", "-c", "amazon-settlement", "--settings", &settings])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--mapping"));
}

#[test]
fn malformed_settings_exits_5() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
    let output = shopmerge(dir.path())
        .args(["merge", "--source", "src", "--settings", "bad.json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn unknown_category_is_a_usage_error() {
    let dir = tempdir().unwrap();
    let output = shopmerge(dir.path())
        .args(["merge", "--source", "src", "--category", "orders"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown category"));
}

// ---------------------------------------------------------------------------
// rename-details
// ---------------------------------------------------------------------------

#[test]
fn rename_details_renames_files() {
    let dir = tempdir().unwrap();
    store_file(dir.path(), "src/StoreA/对账中心-明细-美国.xlsx", "x");

    let output = shopmerge(dir.path())
        .args(["rename-details", "src"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("1 files renamed"));
    assert!(dir.path().join("src/StoreA/账务中心-明细-美国.xlsx").is_file());
}

// ---------------------------------------------------------------------------
// categories
// ---------------------------------------------------------------------------

#[test]
fn categories_json_lists_every_category() {
    let dir = tempdir().unwrap();
    let output = shopmerge(dir.path()).args(["categories", "--json"]).output().unwrap();

    assert!(output.status.success());
    let list = stdout_json(&output);
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 11);
    assert_eq!(ids[0], "order");
    assert_eq!(ids[10], "amazon-settlement");
    assert_eq!(list[3]["keywords"].as_array().unwrap().len(), 3);
}
