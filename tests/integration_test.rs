use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn stepflow() -> Command {
    Command::new(env!("CARGO_BIN_EXE_stepflow"))
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("stepflow-{}-{name}", std::process::id()))
}

#[test]
fn test_basic_script_execution() {
    let script = r#"
var n = 0
while n < 3
  set n += 1
  log "tick {$n}"
  wait 10ms
end
"#;

    let script_path = temp_path("basic.flow");
    fs::write(&script_path, script).expect("Failed to write test script");

    let output = stepflow()
        .arg("--script")
        .arg(&script_path)
        .arg("--no-input")
        .output()
        .expect("Failed to execute stepflow");

    assert!(
        output.status.success(),
        "stepflow failed with stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), ["tick 1", "tick 2", "tick 3"]);

    let _ = fs::remove_file(script_path);
}

#[test]
fn test_save_and_restore() {
    let script = "var n = 0\nset n += 1\nawait \"checkpoint\"\nlog \"n={$n}\"\n";
    let script_path = temp_path("resume.flow");
    let snapshot_path = temp_path("resume.json");
    fs::write(&script_path, script).expect("Failed to write test script");

    let output = stepflow()
        .arg("--script")
        .arg(&script_path)
        .arg("--save")
        .arg(&snapshot_path)
        .arg("--no-input")
        .output()
        .expect("Failed to execute stepflow");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "n=1");

    let saved = fs::read_to_string(&snapshot_path).expect("snapshot should be written");
    let json: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(json["flowcharts"]["main"]["variables"]["n"]["value"], 1);
    assert_eq!(json["flowcharts"]["main"]["sequences"]["main"]["run_count"], 1);

    let output = stepflow()
        .arg("--script")
        .arg(&script_path)
        .arg("--restore")
        .arg(&snapshot_path)
        .arg("--no-input")
        .output()
        .expect("Failed to execute stepflow");
    // The saved run had finished, so this is a fresh run on restored values.
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "n=2");

    let _ = fs::remove_file(script_path);
    let _ = fs::remove_file(snapshot_path);
}

#[test]
fn test_parse_error_is_reported() {
    let script_path = temp_path("broken.flow");
    fs::write(&script_path, "log \"ok\"\nfrobnicate\n").expect("Failed to write test script");

    let output = stepflow()
        .arg("--script")
        .arg(&script_path)
        .output()
        .expect("Failed to execute stepflow");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "unexpected stderr: {stderr}");

    let _ = fs::remove_file(script_path);
}

#[test]
fn test_list_demo() {
    let demo = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/quest.flow");
    let output = stepflow()
        .arg("--script")
        .arg(demo)
        .arg("--list")
        .output()
        .expect("Failed to execute stepflow");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("village:main"));
    assert!(stdout.contains("village:shop"));
}
