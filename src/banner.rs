//! Startup banner and configuration summary display.

use crate::consts::{AUTHOR, HOMEPAGE, REPO, format_bytes};

/// Service configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    /// `None` when nothing is bound (`check`).
    pub listen: Option<&'a str>,
    pub model: &'a str,
    pub subscribers: usize,
    pub allow_list: &'a str,
    pub inference: bool,
    pub notifications: bool,
    pub admin_copy: bool,
    pub max_upload_bytes: u64,
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}

/// Render the banner text.
pub fn render_banner(info: &BannerInfo) -> String {
    format!(
        r#"
   ╔═══════════════════════════════════════╗
   ║         J A W L I N E   💎            ║
   ║     photo in, verdict out, by DM      ║
   ╚═══════════════════════════════════════╝

   version   {}
   by        {}
   home      {}
   repo      {}
   listen    {}
   model     {} ({})
   allow     {} subscriber(s) from {}
   telegram  {}
   admin     {}
   uploads   up to {}
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        HOMEPAGE,
        REPO,
        info.listen
            .map(|addr| format!("http://{addr}"))
            .unwrap_or_else(|| "not started (check only)".to_string()),
        info.model,
        if info.inference { "key set" } else { "no key, every analysis falls back" },
        info.subscribers,
        info.allow_list,
        on_off(info.notifications),
        on_off(info.admin_copy),
        format_bytes(info.max_upload_bytes),
    )
}

/// Print the startup banner with service info.
pub fn print_banner(info: &BannerInfo) {
    println!("{}", render_banner(info));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> BannerInfo<'static> {
        BannerInfo {
            listen: Some("127.0.0.1:8501"),
            model: "gemini-1.5-flash",
            subscribers: 3,
            allow_list: "secrets.toml",
            inference: true,
            notifications: true,
            admin_copy: false,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }

    #[test]
    fn banner_lists_configuration() {
        let text = render_banner(&info());
        assert!(text.contains("http://127.0.0.1:8501"));
        assert!(text.contains("gemini-1.5-flash (key set)"));
        assert!(text.contains("3 subscriber(s) from secrets.toml"));
        assert!(text.contains("telegram  enabled"));
        assert!(text.contains("admin     disabled"));
        assert!(text.contains("10 MiB"));
    }

    #[test]
    fn banner_flags_missing_key() {
        let text = render_banner(&BannerInfo {
            inference: false,
            ..info()
        });
        assert!(text.contains("every analysis falls back"));
    }

    #[test]
    fn check_banner_does_not_claim_an_address() {
        let text = render_banner(&BannerInfo {
            listen: None,
            ..info()
        });
        assert!(!text.contains("http://127.0.0.1"));
        assert!(text.contains("listen    not started (check only)"));
    }

    #[test]
    fn print_banner_does_not_panic() {
        print_banner(&info());
    }
}
