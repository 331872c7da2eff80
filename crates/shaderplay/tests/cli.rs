use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn shaderplay() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_shaderplay"));
    command.env("RUST_LOG", "off");
    command
}

#[test]
fn help_lists_launch_flags() {
    let output = shaderplay()
        .arg("--help")
        .output()
        .expect("failed to run shaderplay --help");
    assert!(output.status.success());

    let help = String::from_utf8_lossy(&output.stdout);
    for flag in [
        "--photo",
        "--mask",
        "--size",
        "--color-space",
        "--gpu-power",
        "--surface-format",
        "--still-time",
    ] {
        assert!(help.contains(flag), "help is missing {flag}:\n{help}");
    }
}

#[test]
fn missing_photo_fails_before_opening_a_window() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("nowhere.png");

    let output = shaderplay()
        .arg("--photo")
        .arg(&missing)
        .output()
        .expect("failed to run shaderplay");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to open photo"), "{stderr}");
}

#[test]
fn undecodable_photo_is_rejected() {
    let root = TempDir::new().unwrap();
    let photo = root.path().join("photo.png");
    fs::write(&photo, b"not an image at all").unwrap();

    let output = shaderplay()
        .arg("--photo")
        .arg(&photo)
        .output()
        .expect("failed to run shaderplay");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to open photo"), "{stderr}");
}

#[test]
fn missing_mask_file_is_reported() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("mask.png");

    let output = shaderplay()
        .arg("--mask")
        .arg(&missing)
        .output()
        .expect("failed to run shaderplay");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read mask"), "{stderr}");
}

#[test]
fn invalid_size_is_a_usage_error() {
    let status = shaderplay()
        .args(["--size", "0x600"])
        .status()
        .expect("failed to run shaderplay");
    assert!(!status.success());
}
