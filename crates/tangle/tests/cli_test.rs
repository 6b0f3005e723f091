use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn tangle_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tangle"))
}

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn run_config(dir: &Path) -> Output {
    tangle_cmd()
        .args(["run", dir.join("tangle.toml").to_str().unwrap()])
        .env("TANGLE_LOG", "error")
        .output()
        .expect("failed to run tangle")
}

fn read_json(path: &Path) -> serde_json::Value {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("missing {}: {e}", path.display()));
    serde_json::from_str(&text).unwrap()
}

fn node_ids(doc: &serde_json::Value) -> Vec<String> {
    doc["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap().to_string())
        .collect()
}

fn csharp_project(dir: &Path, formats: &str) {
    write(
        dir,
        "src/A.cs",
        "using System.Text;\nusing Project.C;\n\nnamespace Project\n{\n    class A\n    {\n        void Run() { }\n    }\n}\n",
    );
    write(dir, "src/C.cs", "namespace Project\n{\n    class C { }\n}\n");
    write(
        dir,
        "tangle.toml",
        &format!(
            r#"project_name = "demo"

[[analyses]]
analysis_name = "csharp"
source_directory = "src"
only_permit_languages = ["cs"]
ignore_dependencies_matching = ["System\\..*"]
file_scan = ["number_of_methods", "source_lines_of_code", "dependency_graph", "louvain_modularity", "fan_in_out"]

[analyses.export]
directory = "out"
formats = [{formats}]
"#
        ),
    );
}

#[test]
fn test_run_ignored_using_yields_single_edge() {
    let dir = TempDir::new().unwrap();
    csharp_project(dir.path(), "\"json\"");

    let output = run_config(dir.path());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "tangle run failed: {stderr}");

    let doc = read_json(&dir.path().join("out/csharp_file.json"));
    assert_eq!(doc["meta"]["project_name"], "demo");
    assert_eq!(node_ids(&doc), vec!["A.cs", "C.cs"]);
    let edges = doc["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["source"], "A.cs");
    assert_eq!(edges[0]["target"], "C.cs");
    assert_eq!(edges[0]["statement"], "Project.C");
    assert_eq!(doc["nodes"][0]["fan_out"], 1);
    assert_eq!(doc["nodes"][1]["fan_in"], 1);
    assert_eq!(doc["summary"]["ignored_dependencies"], 1);
}

#[test]
fn test_run_skips_ignored_directories() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "src/main/App.java",
        "package app;\n\nimport app.util.Helper;\n\npublic class App {\n    public void run() {\n    }\n}\n",
    );
    write(
        dir.path(),
        "src/test/AppTest.java",
        "package app;\n\nimport app.App;\n\nclass AppTest {\n}\n",
    );
    write(
        dir.path(),
        "tangle.toml",
        r#"[[analyses]]
analysis_name = "java"
source_directory = "src"
ignore_directories_containing = ["test"]
file_scan = ["dependency_graph", "fan_in_out"]

[analyses.export]
directory = "out"
formats = ["json"]
"#,
    );

    let output = run_config(dir.path());
    assert!(output.status.success());

    let doc = read_json(&dir.path().join("out/java_file.json"));
    let ids = node_ids(&doc);
    assert!(ids.contains(&"main/App.java".to_string()));
    assert!(ids.iter().all(|id| !id.starts_with("test/")));
    let kinds: Vec<&str> = doc["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds.iter().filter(|k| **k == "file").count(), 1);
}

#[test]
fn test_empty_directory_writes_every_format() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    write(
        dir.path(),
        "tangle.toml",
        r#"[[analyses]]
analysis_name = "empty"
source_directory = "src"
file_scan = ["dependency_graph", "louvain_modularity", "fan_in_out"]

[analyses.export]
directory = "out"
formats = ["graphml", "dot", "json", "tabular_file", "tabular_console", "tabular_console_overall", "d3"]
"#,
    );

    let output = run_config(dir.path());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("No nodes found."));
    assert!(stdout.contains("0 nodes, 0 external, 0 edges"));

    let out = dir.path().join("out");
    let graphml = fs::read_to_string(out.join("empty_file.graphml")).unwrap();
    assert!(graphml.trim_end().ends_with("</graphml>"));
    let dot = fs::read_to_string(out.join("empty_file.dot")).unwrap();
    assert!(dot.starts_with("digraph empty_file {"));
    let tsv = fs::read_to_string(out.join("empty_file.tsv")).unwrap();
    assert_eq!(tsv.lines().count(), 1);

    let doc = read_json(&out.join("empty_file.json"));
    assert!(doc["nodes"].as_array().unwrap().is_empty());
    assert_eq!(doc["summary"]["modularity"], 0.0);
    let d3 = read_json(&out.join("empty_file_d3.json"));
    assert!(d3["links"].as_array().unwrap().is_empty());
}

#[test]
fn test_json_export_reads_back_identically() {
    let dir = TempDir::new().unwrap();
    csharp_project(dir.path(), "\"json\"");
    assert!(run_config(dir.path()).status.success());

    let path = dir.path().join("out/csharp_file.json");
    let text = fs::read_to_string(&path).unwrap();
    let snapshot = tangle_export::json::read_snapshot_file(&path).unwrap();
    assert_eq!(snapshot.nodes.len(), 2);
    assert_eq!(tangle_export::json::format_snapshot(&snapshot).unwrap(), text);
}

#[test]
fn test_invalid_config_exits_with_2() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    write(
        dir.path(),
        "tangle.toml",
        r#"[[analyses]]
analysis_name = "bad"
source_directory = "src"
file_scan = ["halstead"]
"#,
    );

    let output = run_config(dir.path());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stderr.matches("unknown metric 'halstead'").count(), 1, "stderr: {stderr}");
    assert!(stderr.contains("analysis 'bad': unknown metric 'halstead'"), "stderr: {stderr}");
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_missing_config_exits_with_2() {
    let dir = TempDir::new().unwrap();
    let output = run_config(dir.path());
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read config file"));
}

#[test]
fn test_failed_export_exits_with_1() {
    let dir = TempDir::new().unwrap();
    csharp_project(dir.path(), "\"json\", \"tabular_console_overall\"");
    // A file where the export directory should be.
    fs::write(dir.path().join("out"), "occupied").unwrap();

    let output = run_config(dir.path());
    assert_eq!(output.status.code(), Some(1));
    // The console format still ran.
    assert!(String::from_utf8_lossy(&output.stdout).contains("demo / csharp (file scan)"));
}

#[test]
fn test_scan_directory() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "code/main.go", "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"hi\")\n}\n");
    let out = dir.path().join("out");

    let output = tangle_cmd()
        .args([
            "scan",
            dir.path().join("code").to_str().unwrap(),
            "--format",
            "json,tsv",
            "--output",
            out.to_str().unwrap(),
            "--log-level",
            "error",
        ])
        .output()
        .expect("failed to run tangle scan");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let doc = read_json(&out.join("code_file.json"));
    assert_eq!(doc["meta"]["analysis_name"], "code");
    assert!(node_ids(&doc).contains(&"main.go".to_string()));
    assert!(out.join("code_file.tsv").exists());
}

#[test]
fn test_scan_missing_directory_exits_with_2() {
    let dir = TempDir::new().unwrap();
    let output = tangle_cmd()
        .args(["scan", dir.path().join("nope").to_str().unwrap()])
        .output()
        .expect("failed to run tangle scan");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_init_creates_config() {
    let dir = TempDir::new().unwrap();
    let output = tangle_cmd()
        .arg("init")
        .current_dir(dir.path())
        .output()
        .expect("failed to run tangle init");
    assert!(output.status.success());
    let content = fs::read_to_string(dir.path().join("tangle.toml")).unwrap();
    assert!(content.contains("[[analyses]]"));

    // The generated config runs as-is.
    let output = run_config(dir.path());
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("tangle-out/main_file.json").exists());
}

#[test]
fn test_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("tangle.toml"), "# mine\n").unwrap();

    let output = tangle_cmd()
        .arg("init")
        .current_dir(dir.path())
        .output()
        .expect("failed to run tangle init");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(fs::read_to_string(dir.path().join("tangle.toml")).unwrap(), "# mine\n");

    let output = tangle_cmd()
        .args(["init", "--force"])
        .current_dir(dir.path())
        .output()
        .expect("failed to run tangle init --force");
    assert!(output.status.success());
}
