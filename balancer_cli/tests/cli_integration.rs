use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal config for the sim backend with short tuning trials.
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[pins]
# pins are unused in sim backend
trigger = 23
echo = 24
servo = 18

[control]
target_cm = 15.0
kp = 0.5

[scheduler]
tick_ms = 20

[tune]
settle_ms = 100
measure_ms = 300
poll_ms = 100

[sim]
jitter_cm = 0.0
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "OK (sim)", "stdout")]
#[case(&["run", "--duration-ms", "150"], 0, "Stopped after", "stdout")]
#[case(&["run", "--duration-ms", "150", "--stats"], 0, "Latency min/avg/max/stdev", "stderr")]
#[case(&["tune"], 0, "Best:", "stdout")]
#[case(&["launch"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("balancer").unwrap();
    cmd.arg("--config").arg(&cfg).arg("--sim");
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case("[scheduler]\ntick_ms = 0\n", "scheduler.tick_ms")]
#[case("[actuator]\nmin_deg = 100.0\nmax_deg = 50.0\n", "actuator.max_deg")]
#[case("[sensor]\nmax_cm = \"far\"\n", "parse")]
fn invalid_config_exits_with_code_3(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, toml).unwrap();

    Command::cargo_bin("balancer")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("balancer")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("self-check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("What happened"));
}

#[test]
fn cli_reports_bad_candidate_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("cands.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "p,i,d").unwrap();
    writeln!(f, "0.5,0.0,0.1").unwrap();

    Command::cargo_bin("balancer")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--sim")
        .arg("tune")
        .arg("--candidates")
        .arg(&bad_csv)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid headers"));
}

#[test]
fn tune_saves_results_file() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let csv = dir.path().join("cands.csv");
    fs::write(&csv, "kp,ki,kd\n0.32,0.02,0.02\n0.52,0.02,0.22\n").unwrap();
    let out = dir.path().join("results.json");

    Command::cargo_bin("balancer")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--sim")
        .arg("tune")
        .arg("--candidates")
        .arg(&csv)
        .arg("--save")
        .arg(&out)
        .assert()
        .success();

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert!(v["best_params"]["kP"].is_f64());
    assert!(v["best_result"]["score"].is_f64());
    assert_eq!(v["all_results"].as_array().unwrap().len(), 2);
}
