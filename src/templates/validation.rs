use std::sync::LazyLock;

use regex::Regex;

use crate::{
    error::{NotificationError, Result},
    models::template::NotificationTemplate,
};

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]*)\}").expect("token pattern is valid"));

static VARIABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.]+$").expect("variable name pattern is valid"));

/// Syntax sanity check for a template before it is stored.
///
/// Checks that subject and body are present and that every `{...}` token is a
/// plausible variable name. `{if key}` / `{foreach key}` are accepted when `key`
/// is, and closing markers are accepted as-is. Block pairing and nesting are
/// not verified.
pub fn validate_template(template: Option<&NotificationTemplate>) -> Result<()> {
    let template = template
        .ok_or_else(|| NotificationError::InvalidInput("template is required".to_string()))?;

    if template.subject.trim().is_empty() {
        return Err(NotificationError::Template(format!(
            "template '{}' has an empty subject",
            template.name
        )));
    }

    if template.body.trim().is_empty() {
        return Err(NotificationError::Template(format!(
            "template '{}' has an empty body",
            template.name
        )));
    }

    let parts = [
        Some(template.subject.as_str()),
        Some(template.body.as_str()),
        template.body_html.as_deref(),
    ];

    for text in parts.into_iter().flatten() {
        for caps in TOKEN.captures_iter(text) {
            let token = &caps[1];
            if !is_valid_token(token) {
                return Err(NotificationError::Template(format!(
                    "invalid variable '{{{}}}' in template '{}'",
                    token, template.name
                )));
            }
        }
    }

    Ok(())
}

fn is_valid_token(token: &str) -> bool {
    if token == "/if" || token == "/foreach" {
        return true;
    }

    let name = token
        .strip_prefix("if ")
        .or_else(|| token.strip_prefix("foreach "))
        .unwrap_or(token);

    VARIABLE_NAME.is_match(name)
}
