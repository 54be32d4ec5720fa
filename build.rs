use std::env;
use std::path::Path;

const DEFAULT_PATH_VAR: &str = "ICONIFY_DEFAULT_PATH";

// Bakes the default icon-set directory into the library. Blank values are
// ignored so `config::default_paths` falls back to an empty search list.
fn main() {
    println!("cargo:rerun-if-env-changed={DEFAULT_PATH_VAR}");

    let Some(raw) = env::var_os(DEFAULT_PATH_VAR) else {
        return;
    };
    let raw = raw.to_string_lossy();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }

    let dir = Path::new(trimmed);
    match dir.canonicalize() {
        Ok(canonical) if canonical.is_dir() => {
            println!("cargo:rustc-env={DEFAULT_PATH_VAR}={}", canonical.display());
        }
        Ok(canonical) => {
            println!(
                "cargo:warning={DEFAULT_PATH_VAR}={} is not a directory; ignoring it",
                canonical.display()
            );
        }
        Err(_) => {
            println!(
                "cargo:warning={DEFAULT_PATH_VAR}={trimmed} does not exist yet; using it as given"
            );
            println!("cargo:rustc-env={DEFAULT_PATH_VAR}={trimmed}");
        }
    }
}
