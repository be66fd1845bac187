use std::io::Write;
use std::process::Command;

fn modelrun() -> Command {
    Command::new(env!("CARGO_BIN_EXE_modelrun"))
}

#[test]
fn missing_arguments_print_usage_and_exit_nonzero() {
    let output = modelrun().output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(doc["error"].as_str().unwrap().starts_with("Usage:"));
}

#[test]
fn unsupported_technique_still_exits_zero() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "x,y\n1,2\n3,4").unwrap();

    let output = modelrun()
        .arg("not_a_real_technique")
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(doc["stats"]["error"]
        .as_str()
        .unwrap()
        .contains("not_a_real_technique"));
    assert!(doc["supported_techniques"].is_array());
}

#[test]
fn dbscan_run_prints_one_parseable_envelope() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "x,y").unwrap();
    for i in 0..10 {
        writeln!(file, "{},{}", i as f64 * 0.1, i as f64 * 0.1).unwrap();
    }

    let output = modelrun()
        .arg("dbscan")
        .arg(file.path())
        .arg("eps=0.5")
        .arg("min_samples=2")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    for key in ["charts", "stats", "tables", "explanation"] {
        assert!(doc.get(key).is_some(), "envelope key {key} missing");
    }
    assert_eq!(
        doc["tables"]["cluster_assignments"].as_array().unwrap().len(),
        10
    );
}

#[test]
fn technique_failures_are_data_not_crashes() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "value,tag\n1,a\n2,b").unwrap();

    let output = modelrun()
        .arg("kernel_pca")
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        doc["stats"]["error"],
        serde_json::json!("At least 2 numeric columns required")
    );
}

#[test]
fn dataset_is_read_from_stdin_for_dash() {
    use std::process::Stdio;

    let mut child = modelrun()
        .arg("kmeans")
        .arg("-")
        .arg("n_clusters=2")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut csv = String::from("a,b\n");
    for i in 0..6 {
        csv.push_str(&format!("{},{}\n", i, i * 2));
    }
    child.stdin.take().unwrap().write_all(csv.as_bytes()).unwrap();
    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(0));

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["stats"]["n_clusters"], serde_json::json!(2));
}
