//! HTML pages. Templates are compiled into the binary; `.html` names get
//! minijinja's HTML auto-escaping, so model output and display names are
//! safe to interpolate.

use anyhow::Result;
use minijinja::{Environment, Value, context};

use crate::auth::{AccessDenied, Identity};
use crate::consts::ALLOWED_EXTENSIONS;
use crate::session::{Report, Status};

pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("base.html", include_str!("../../templates/base.html"))?;
        env.add_template("denied.html", include_str!("../../templates/denied.html"))?;
        env.add_template("upload.html", include_str!("../../templates/upload.html"))?;
        env.add_template("result.html", include_str!("../../templates/result.html"))?;
        Ok(Self { env })
    }

    pub fn denied(&self) -> Result<String> {
        let tmpl = self.env.get_template("denied.html")?;
        Ok(tmpl.render(context! {
            title => AccessDenied::TITLE,
            reason => AccessDenied::REASON,
            contact => AccessDenied::CONTACT,
        })?)
    }

    /// The upload form. `welcome` shows the greeting toast on first entry.
    pub fn upload(&self, identity: &Identity, welcome: bool, error: Option<&str>) -> Result<String> {
        let tmpl = self.env.get_template("upload.html")?;
        Ok(tmpl.render(context! {
            name => &identity.name,
            welcome,
            error,
            action => Value::from_safe_string(analyze_action(&identity.id)),
            accept => accept_attr(),
        })?)
    }

    pub fn result(&self, identity: &Identity, photo_uri: &str, report: &Report) -> Result<String> {
        let delivery_error = match report.status() {
            Status::Success => None,
            Status::PartialFailure(message) => Some(message),
        };
        let tmpl = self.env.get_template("result.html")?;
        Ok(tmpl.render(context! {
            name => &identity.name,
            welcome => false,
            action => Value::from_safe_string(analyze_action(&identity.id)),
            accept => accept_attr(),
            photo => Value::from_safe_string(photo_uri.to_string()),
            delivery_error,
            preview => report.preview(),
        })?)
    }
}

fn accept_attr() -> String {
    ALLOWED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Built only from [`urlencoded`] output, so it needs no HTML escaping.
fn analyze_action(uid: &str) -> String {
    format!("/analyze?uid={}", urlencoded(uid))
}

/// Minimal URL encoding for query parameters.
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push_str(&format!("%{:02X}", b));
            }
        }
    }
    out
}
