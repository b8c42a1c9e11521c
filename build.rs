//! Bakes the git revision into `BUILD_HASH` and `BUILD_DIRTY`.
//!
//! Source tarballs carry no `.git`; set `AGENT_CHAT_REVISION` there.

use std::process::Command;

fn git(args: &[&str]) -> Option<Vec<u8>> {
    let output = Command::new("git").args(args).output().ok()?;
    output.status.success().then_some(output.stdout)
}

fn main() {
    println!("cargo:rerun-if-env-changed=AGENT_CHAT_REVISION");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let pinned = std::env::var("AGENT_CHAT_REVISION")
        .ok()
        .filter(|revision| !revision.is_empty());

    let (hash, dirty) = match pinned {
        Some(revision) => (revision, false),
        None => {
            let hash = git(&["rev-parse", "--short=7", "HEAD"])
                .and_then(|out| String::from_utf8(out).ok())
                .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string());
            let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
                .is_some_and(|out| !out.is_empty());
            (hash, dirty)
        }
    };

    println!("cargo:rustc-env=BUILD_HASH={hash}");
    println!("cargo:rustc-env=BUILD_DIRTY={dirty}");
}
