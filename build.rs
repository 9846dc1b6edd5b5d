
use std::error::Error;
use vergen_gitcl::{Emitter, GitclBuilder};

/// Emits the git describe instructions used in the version string.
/// # Errors
/// * if `git` is not installed
/// * if there is no .git folder, e.g. when building from a release tarball
fn emit_git() -> Result<(), Box<dyn Error>> {
    let gitcl = GitclBuilder::default()
        .all()
        .describe(false, true, Some("ThisPatternShouldNotMatchAnythingEver"))
        .build()?;

    Emitter::default()
        .fail_on_error()
        .add_instructions(&gitcl)?
        .emit()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    if emit_git().is_err() {
        // packaged builds have no .git folder, so fall back to a user override or "unknown"
        let git_desc = option_env!("CUSTOM_VERGEN_GIT_DESCRIBE")
            .unwrap_or("unknown");
        println!("cargo:rustc-env=VERGEN_GIT_DESCRIBE={git_desc}");
    }

    // the emitter only tracks git state, so track the manifest and sources ourselves
    for tracked in ["Cargo.toml", "src"] {
        println!("cargo:rerun-if-changed={tracked}");
    }

    Ok(())
}