use std::process::Command;

/// Short commit hash for `/health`. Builds outside a checkout (release
/// tarballs, container images) can pass it in as `HERALD_GIT_SHA`.
fn git_sha() -> String {
    if let Ok(sha) = std::env::var("HERALD_GIT_SHA") {
        if !sha.trim().is_empty() {
            return sha.trim().to_string();
        }
    }

    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|sha| sha.trim().to_string())
        .filter(|sha| !sha.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    println!("cargo:rustc-env=HERALD_GIT_SHA={}", git_sha());

    // Re-embed after a commit or checkout, or when the override changes.
    println!("cargo:rerun-if-env-changed=HERALD_GIT_SHA");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/");
}
