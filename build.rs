// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=CAMERA_PHOTO_VERSION");

    // Packagers can pin the version string
    let version = match std::env::var("CAMERA_PHOTO_VERSION") {
        Ok(v) if !v.is_empty() => v,
        _ => git_version().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// `git describe` output without the leading `v`
///
/// - "0.1.0" at a tag becomes "0.1.0-abcdef1"
/// - "0.1.0-5-gabcdef1" after a tag becomes "0.1.0-dirty-abcdef1"
/// - no tags at all gives "<pkg version>-abcdef1"
fn git_version() -> Option<String> {
    let hash = git(&["rev-parse", "--short", "HEAD"])?;

    let Some(described) = git(&["describe", "--tags", "--match", "v*"]) else {
        return Some(format!("{}-{}", env!("CARGO_PKG_VERSION"), hash));
    };
    let described = described.strip_prefix('v').unwrap_or(&described);

    let parts: Vec<&str> = described.rsplitn(3, '-').collect();
    if parts.len() == 3 {
        let tag_hash = parts[0].strip_prefix('g').unwrap_or(parts[0]);
        Some(format!("{}-dirty-{}", parts[2], tag_hash))
    } else {
        Some(format!("{}-{}", described, hash))
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}
