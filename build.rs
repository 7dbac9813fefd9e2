use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");

    let version = describe().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    println!("cargo:rustc-env=GIT_VERSION={version}");
}

/// `git describe` output with the leading `v` stripped, or `<pkg>-g<hash>`
/// when the repository carries no release tags.
fn describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--tags", "--match", "v[0-9]*"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8(output.stdout).ok()?;
    match raw.trim() {
        "" => None,
        tagged if tagged.starts_with('v') => Some(tagged[1..].to_string()),
        hash => Some(format!("{}-g{hash}", env!("CARGO_PKG_VERSION"))),
    }
}
