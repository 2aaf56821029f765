use std::env;
use std::process::Command;

const PREFIX: &str = "CASHFLOW_CORE_BUILD";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");

    let hash = run("git", &["rev-parse", "--short", "HEAD"]).unwrap_or_else(unknown);
    let status = match run("git", &["status", "--porcelain"]) {
        Some(out) if out.is_empty() => "clean".to_string(),
        Some(_) => "dirty".to_string(),
        None => unknown(),
    };
    let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let target = env::var("TARGET").unwrap_or_else(|_| unknown());
    let profile = env::var("PROFILE").unwrap_or_else(|_| unknown());
    let rustc = run("rustc", &["--version"]).unwrap_or_else(unknown);

    for (key, value) in [
        ("HASH", hash),
        ("STATUS", status),
        ("TIMESTAMP", timestamp),
        ("TARGET", target),
        ("PROFILE", profile),
        ("RUSTC", rustc),
    ] {
        println!("cargo:rustc-env={PREFIX}_{key}={value}");
    }
}

/// Runs a command and returns its trimmed stdout when it exits successfully.
fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn unknown() -> String {
    "unknown".to_string()
}
