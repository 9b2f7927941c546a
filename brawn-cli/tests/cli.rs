use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "brawn-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn read_json(path: &std::path::Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).expect("read output");
    serde_json::from_str(&content).expect("valid json")
}

#[test]
fn cli_calc_writes_json_levels() {
    let exe = env!("CARGO_BIN_EXE_brawn-levels");
    let output_path = temp_path("calc");
    let status = Command::new(exe)
        .args([
            "calc",
            "--age",
            "25",
            "--weight",
            "190lb",
            "--gender",
            "male",
            "--perf",
            "BenchPress=225lb",
            "--perf",
            "Deadlift=270lb",
            "--perf",
            "BackSquat=190lb",
            "--perf",
            "BroadJump=10ft11in",
            "--perf",
            "Run=7:15",
            "--perf",
            "ConeDrill=9000",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let value = read_json(&output_path);
    let player = value["player"].as_u64().expect("player level");
    assert!((1..=100).contains(&player), "{value}");
    for attribute in ["Strength", "Power", "Endurance", "Agility"] {
        let level = value["attributes"][attribute].as_u64().expect("attribute level");
        assert!((1..=100).contains(&level), "{attribute}: {level}");
    }
    assert_eq!(value["activities"].as_array().map(Vec::len), Some(6));
}

#[test]
fn cli_table_prints_markdown() {
    let exe = env!("CARGO_BIN_EXE_brawn-levels");
    let output_path = temp_path("table");
    let status = Command::new(exe)
        .args([
            "table",
            "--activity",
            "BenchPress",
            "--gender",
            "female",
            "--age",
            "30",
            "--lb",
            "--report",
            "markdown",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Standards"));
    assert!(content.contains("| Body weight | L1 |"));
    assert!(content.contains("L100 |"));
}

#[test]
fn cli_fit_reports_bounded_parameters() {
    let exe = env!("CARGO_BIN_EXE_brawn-levels");
    let output_path = temp_path("fit");
    let status = Command::new(exe)
        .args([
            "fit", "--activity", "Run", "--gender", "female", "--age", "30", "--report", "json",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let value = read_json(&output_path);
    let a = value["a"].as_f64().expect("a");
    let b = value["b"].as_f64().expect("b");
    let c = value["c"].as_f64().expect("c");
    assert!((0.0..=1.0).contains(&a));
    assert!((0.0..=2.0).contains(&b));
    assert!((1.02..=1.2).contains(&c));
    assert_eq!(value["increasing"], false);
}

#[test]
fn cli_activities_console_lists_everything() {
    let exe = env!("CARGO_BIN_EXE_brawn-levels");
    let output = Command::new(exe)
        .args(["activities"])
        .env("NO_COLOR", "1")
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Brawn Levels"));
    for activity in ["BackSquat", "Deadlift", "BenchPress", "Run", "BroadJump", "ConeDrill"] {
        assert!(stdout.contains(activity), "{activity} missing from {stdout}");
    }
}

#[test]
fn cli_reads_data_dir_and_config() {
    let exe = env!("CARGO_BIN_EXE_brawn-levels");
    let dir = temp_path("data");
    std::fs::create_dir_all(&dir).expect("create data dir");
    std::fs::write(
        dir.join("standards.json"),
        r#"{
            "Deadlift": {
                "metadata": {"attribute": "Strength", "generators": [], "unit": "kg", "name": "Deadlift"},
                "standards": [
                    {"metrics": {"age": 27, "weight": 80, "gender": "Male"},
                     "levels": {"1": 60, "2": 100, "3": 140, "4": 180, "5": 220}}
                ]
            }
        }"#,
    )
    .expect("write standards");
    std::fs::write(
        dir.join("avg-weights.json"),
        r#"{"metadata": {"unit": "kg"}, "weights": []}"#,
    )
    .expect("write weights");
    let config = dir.join("config.json");
    std::fs::write(&config, r#"{"global": {"max_level": 5}}"#).expect("write config");
    let output_path = temp_path("data-out");

    let status = Command::new(exe)
        .args(["--data-dir"])
        .arg(&dir)
        .args(["--config"])
        .arg(&config)
        .args([
            "table",
            "--activity",
            "Deadlift",
            "--gender",
            "male",
            "--age",
            "27",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let value = read_json(&output_path);
    let levels = &value["rows"][0]["levels"];
    assert_eq!(levels.as_object().map(serde_json::Map::len), Some(5));
    assert_eq!(levels["3"].as_f64(), Some(140.0));
}

#[test]
fn cli_rejects_mismatched_units() {
    let exe = env!("CARGO_BIN_EXE_brawn-levels");
    let output = Command::new(exe)
        .args([
            "calc", "--age", "30", "--weight", "80kg", "--gender", "female", "--perf", "Run=100kg",
        ])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Run"), "{stderr}");
}
