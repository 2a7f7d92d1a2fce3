use std::process::Command;

fn path_defence(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_path-defence"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch path-defence");
    assert!(
        output.status.success(),
        "path-defence {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout is utf-8")
}

#[test]
fn json_report_describes_a_capped_run() {
    let stdout = path_defence(&[
        "--tower",
        "archer@180,60",
        "--tower",
        "archer@0,0",
        "--max-ticks",
        "600",
        "--json",
    ]);
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("stdout is json");

    assert_eq!(report["level"], "grass");
    assert_eq!(report["finished"], false);
    assert_eq!(report["ticks"], 600);
    assert_eq!(report["towers_placed"], 1);
    assert_eq!(report["towers_rejected"], 1);
    assert_eq!(report["summary"]["lives"], 20);
    assert_eq!(report["summary"]["outcome"], "in_progress");
}

#[test]
fn exported_layouts_can_be_replayed() {
    let stdout = path_defence(&[
        "--level",
        "desert",
        "--tower",
        "archer@200,200",
        "--export-layout",
        "--max-ticks",
        "1",
    ]);
    let layout = stdout
        .lines()
        .find(|line| line.starts_with("path:v1:desert:"))
        .expect("layout string printed");

    let replayed = path_defence(&["--layout", layout, "--max-ticks", "1", "--json"]);
    let report: serde_json::Value = serde_json::from_str(&replayed).expect("stdout is json");
    assert_eq!(report["level"], "desert");
    assert_eq!(report["towers_placed"], 1);
}
