//! Runs the built `dex` binary without a usable mode flag.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::process::{Command, Output};

fn dex(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dex"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to spawn dex")
}

fn assert_notice(output: &Output) {
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PLEASE PROVIDE A FLAG"), "{stdout}");
}

#[test]
fn no_flags_prints_notice() {
    assert_notice(&dex(&[]));
}

#[test]
fn empty_clf_prints_notice() {
    assert_notice(&dex(&["--clf", ""]));
}

#[test]
fn conflicting_modes_are_usage_errors() {
    let output = dex(&["-t", "--train2"]);
    assert_eq!(output.status.code(), Some(2));
}
