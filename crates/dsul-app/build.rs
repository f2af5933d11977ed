use chrono::Utc;
use std::process::Command;

fn git_short_sha() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!sha.is_empty()).then_some(sha)
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");

    // Stamped into `dsuld --version` / `dsulc --version`
    let build_id = match git_short_sha() {
        Some(sha) => format!("{}+g{}", Utc::now().format("%Y.%m.%d"), sha),
        None => "unknown".to_string(),
    };

    println!("cargo:rustc-env=DSUL_BUILD_ID={build_id}");
}
