use std::process::Command;

#[derive(Debug)]
struct Metrics {
    nadir_hz: f64,
    final_hz: f64,
    events_applied: usize,
}

#[test]
fn scenario_files_run_via_cli_and_produce_distinct_dynamics() {
    let two_area = run_and_parse("scenarios/two_area.toml");
    let load_step = run_and_parse("scenarios/load_step.toml");
    let islanding = run_and_parse("scenarios/islanding.toml");

    for (name, m) in [
        ("two_area", &two_area),
        ("load_step", &load_step),
        ("islanding", &islanding),
    ] {
        assert!(m.nadir_hz < 50.0, "{name}: expected a frequency dip, got {m:?}");
        assert!(m.nadir_hz <= m.final_hz, "{name}: nadir above final value: {m:?}");
        assert_eq!(m.events_applied, 2, "{name}: {m:?}");
    }

    assert!(
        (two_area.nadir_hz - load_step.nadir_hz).abs() > 1e-3,
        "expected two_area and load_step nadirs to differ: {two_area:?} vs {load_step:?}"
    );
    assert!(
        (load_step.nadir_hz - islanding.nadir_hz).abs() > 1e-3,
        "expected load_step and islanding nadirs to differ: {load_step:?} vs {islanding:?}"
    );
}

#[test]
fn preset_flag_matches_scenario_file() {
    let from_file = run_and_parse("scenarios/load_step.toml");
    let from_preset = run_cli(&["--preset", "load_step"]);
    let from_preset = parse_metrics(&from_preset);
    assert!((from_file.nadir_hz - from_preset.nadir_hz).abs() < 1e-9);
    assert!((from_file.final_hz - from_preset.final_hz).abs() < 1e-9);
}

#[test]
fn unknown_preset_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_transient-sim"))
        .args(["--preset", "nope"])
        .output()
        .expect("transient-sim process should run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown preset"));
}

#[test]
fn invalid_override_reports_every_field_once() {
    let output = Command::new(env!("CARGO_BIN_EXE_transient-sim"))
        .args(["--preset", "two_area", "--end-time=-1"])
        .output()
        .expect("transient-sim process should run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid scenario"), "{stderr}");
    assert_eq!(stderr.matches("simulation.end_time_s").count(), 1, "{stderr}");
}

fn run_and_parse(path: &str) -> Metrics {
    parse_metrics(&run_cli(&["--scenario", path]))
}

fn run_cli(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_transient-sim"))
        .args(args)
        .output()
        .expect("transient-sim process should run");

    assert!(
        output.status.success(),
        "run failed for {args:?}: stderr={} ",
        String::from_utf8_lossy(&output.stderr)
    );

    String::from_utf8(output.stdout).expect("stdout should be valid UTF-8")
}

fn parse_metrics(stdout: &str) -> Metrics {
    Metrics {
        nadir_hz: parse_metric(stdout, "Nadir:", "Hz"),
        final_hz: parse_metric(stdout, "Final frequency:", "Hz"),
        events_applied: parse_metric(stdout, "Events applied:", "") as usize,
    }
}

fn parse_metric(stdout: &str, label: &str, unit: &str) -> f64 {
    let line = stdout
        .lines()
        .find(|line| line.trim_start().starts_with(label))
        .unwrap_or_else(|| panic!("missing line `{label}` in output: {stdout}"));

    let raw = line
        .split_once(':')
        .map(|(_, right)| right.trim())
        .unwrap_or_else(|| panic!("invalid format for line `{line}`"));

    let value = raw.split_whitespace().next().unwrap_or_default();
    if !unit.is_empty() {
        assert!(
            raw[value.len()..].trim_start().starts_with(unit),
            "expected unit `{unit}` in line `{line}`"
        );
    }
    value
        .parse::<f64>()
        .unwrap_or_else(|e| panic!("failed to parse `{value}` from `{line}`: {e}"))
}
