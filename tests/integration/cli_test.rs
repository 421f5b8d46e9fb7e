// tests/integration/cli_test.rs

use std::process::Command;

#[test]
fn test_version_reports_build_profile_and_target() {
    let output = Command::new(env!("CARGO_BIN_EXE_ippdme"))
        .arg("--version")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let line = stdout.trim();
    assert!(line.starts_with("ippdme version "), "got {line:?}");
    // `<version> (<profile>, <target>)`
    let (version, build) = line["ippdme version ".len()..]
        .split_once(" (")
        .unwrap();
    assert!(!version.is_empty());
    let build = build.strip_suffix(')').unwrap();
    let (profile, target) = build.split_once(", ").unwrap();
    assert!(!profile.is_empty() && profile != "unknown", "got {line:?}");
    assert!(target.contains('-'), "got {line:?}");
}
