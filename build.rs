use std::process::Command;

/// Короткий хеш коммита, из которого собран бинарь, или `unknown` вне
/// git-репозитория.
fn git_commit() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=FRAMEBUS_BUILD_TIME");

    println!("cargo:rustc-env=FRAMEBUS_GIT_COMMIT={}", git_commit());

    // Воспроизводимые сборки могут зафиксировать время снаружи.
    let built_at = std::env::var("FRAMEBUS_BUILD_TIME")
        .unwrap_or_else(|_| chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());
    println!("cargo:rustc-env=FRAMEBUS_BUILD_TIME={built_at}");
}
