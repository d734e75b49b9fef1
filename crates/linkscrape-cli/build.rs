use chrono::Utc;
use std::process::Command;

/// Short commit hash, or `None` outside a git checkout.
fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// True when tracked files differ from HEAD.
fn has_local_changes() -> bool {
    Command::new("git")
        .args(["diff", "--quiet", "HEAD"])
        .status()
        .is_ok_and(|status| !status.success())
}

fn main() {
    let build_hash = match git_short_hash() {
        Some(hash) if has_local_changes() => {
            format!("{hash}-dirty-{}", Utc::now().format("%Y%m%dT%H%MZ"))
        }
        Some(hash) => hash,
        None => "unknown".to_string(),
    };

    println!("cargo:rustc-env=BUILD_HASH={build_hash}");

    // The repository root sits two levels above this crate
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");
}
