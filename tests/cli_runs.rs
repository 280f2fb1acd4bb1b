use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_smart-ems"))
        .args(args)
        .env("SMART_EMS_LOG", "off")
        .output()
        .expect("smart-ems process should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("stdout should be valid UTF-8")
}

#[test]
fn preset_run_prints_one_line_per_tick() {
    let output = run(&["--preset", "baseline", "--ticks", "5"]);
    assert!(
        output.status.success(),
        "run failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let out = stdout(&output);
    let tick_lines = out.lines().filter(|l| l.starts_with("t=")).count();
    assert_eq!(tick_lines, 5);
    assert!(out.contains("recommendation:"));
    assert!(out.contains("training: 5 episodes"));
}

#[test]
fn feed_reading_raises_battery_alerts() {
    let output = run(&[
        "--scenario",
        "scenarios/baseline.toml",
        "--reading",
        "scenarios/faulted_reading.json",
        "--ticks",
        "1",
    ]);
    assert!(output.status.success());
    let out = stdout(&output);
    let first = out.lines().next().unwrap_or_default();
    assert!(first.contains("[feed "), "unexpected first line: {first}");
    assert!(first.contains("BATTERY_CRITICAL_SOC"));
    assert!(first.contains("BATTERY_OVERHEAT"));
}

#[test]
fn emergency_run_skips_generated_ticks() {
    let output = run(&["--emergency", "--ticks", "3"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(!out.lines().any(|l| l.starts_with("t=")));
    assert!(out.contains("mode=emergency"));
    assert!(out.contains("FIRE_EMERGENCY_ACTIVATED"));
}

#[test]
fn invalid_inputs_exit_non_zero() {
    assert!(!run(&["--preset", "nope"]).status.success());
    assert!(!run(&["--ticks", "0"]).status.success());
    assert!(!run(&["--reading", "{\"grid\": {}}"]).status.success());
}

#[test]
fn telemetry_is_exported_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ticks.csv");
    let output = run(&[
        "--inject-fault",
        "--ticks",
        "2",
        "--telemetry-out",
        path.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let csv = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("tick,origin,reading_time,processed_at"));
    assert!(lines[1].starts_with("1,fault,"));
}
