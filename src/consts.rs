//! Project-wide constants.

use std::path::PathBuf;

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Default Gemini model when none is specified.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default address the web surface listens on.
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

/// Largest accepted upload.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Instruction sent alongside every photo.
pub const ANALYSIS_PROMPT: &str = "Analyze the jawline. Rate: Blade/Max, Medium, or Tomato. \
     Return ONLY the rating and 1 short sentence explanation.";

/// Text shown in place of a verdict whenever the model call fails.
pub const FALLBACK_TEXT: &str = "Analysis failed. Please try a clearer photo.";

/// Upload extensions the intake accepts (lowercase, no dot).
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "png", "jpeg"];

/// Secrets file looked up in the working directory first.
pub const SECRETS_FILE: &str = "secrets.toml";

/// Fallback secrets path: `~/.jawline/secrets.toml`.
pub fn default_secrets_path() -> Option<PathBuf> {
    let local = PathBuf::from(SECRETS_FILE);
    if local.exists() {
        return Some(local);
    }
    dirs::home_dir().map(|home| home.join(".jawline").join(SECRETS_FILE))
}

/// Format a byte count for humans (e.g. 10 MiB).
pub fn format_bytes(n: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    if n >= MIB && n.is_multiple_of(MIB) {
        format!("{} MiB", n / MIB)
    } else if n >= KIB && n.is_multiple_of(KIB) {
        format!("{} KiB", n / KIB)
    } else {
        format!("{n} B")
    }
}
