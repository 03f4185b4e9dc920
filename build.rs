use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=RUSTC");

    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let target = env::var("TARGET").unwrap_or_default();
    let version = rustc_version(&rustc).unwrap_or_else(|| "rustc unknown".to_string());
    let runtime = if target.is_empty() {
        version
    } else {
        format!("{version} [{target}]")
    };

    println!("cargo:rustc-env=FAILGUARD_RUNTIME_VERSION={}", runtime);
}

fn rustc_version(rustc: &str) -> Option<String> {
    let output = Command::new(rustc).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8(output.stdout).ok()?.trim().to_string();
    if version.is_empty() { None } else { Some(version) }
}
