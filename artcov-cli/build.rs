//! Build script for artcov-cli
//!
//! Exposes build identification to the startup banner:
//! - `GIT_HASH`: short commit hash, `unknown` outside a git checkout
//! - `BUILD_TIMESTAMP`: RFC 3339 local time of the last build script run
//! - `BUILD_PROFILE`: cargo profile (debug/release)
//!
//! The script reruns when the checked-out commit moves, not on every build.

use std::path::Path;
use std::process::Command;

fn main() {
    let git_hash = git_short_hash().unwrap_or_else(|| "unknown".to_string());
    let build_timestamp = chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);

    println!("cargo:rerun-if-changed=build.rs");
    if let Some(git_dir) = git_dir() {
        let head = Path::new(&git_dir).join("HEAD");
        println!("cargo:rerun-if-changed={}", head.display());
        // branch commits move the ref, not HEAD itself
        if let Ok(head_contents) = std::fs::read_to_string(&head) {
            if let Some(reference) = head_contents.trim().strip_prefix("ref: ") {
                println!(
                    "cargo:rerun-if-changed={}",
                    Path::new(&git_dir).join(reference).display()
                );
            }
        }
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn git_short_hash() -> Option<String> {
    git(&["rev-parse", "--short=8", "HEAD"])
}

fn git_dir() -> Option<String> {
    git(&["rev-parse", "--absolute-git-dir"])
}
