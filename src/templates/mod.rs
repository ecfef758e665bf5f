//! Template rendering.
//!
//! Syntax: `{name}` substitutes a variable, `{if name}...{/if}` keeps its body
//! only when the variable is truthy, `{foreach name}...{/foreach}` repeats its
//! body for every `", "`-separated element of the variable with `{item}` bound
//! to the element.
//!
//! Rendering runs in four fixed phases: substitution, conditionals, loops,
//! cleanup. Conditionals and loops look their key up in the context map built
//! from the message, never in the partially rendered text. Anything still
//! shaped like `{...}` after the loops is dropped.

pub mod context;
pub mod defaults;
pub mod validation;
pub mod variables;

use std::{collections::BTreeMap, sync::LazyLock};

use regex::{Captures, Regex};
use tracing::debug;

use crate::{
    error::{NotificationError, Result},
    models::{
        event::EventType,
        message::NotificationMessage,
        template::{NotificationTemplate, RenderedTemplate},
    },
};

pub use context::{TemplateContext, build_context};

static LEFTOVER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("leftover token pattern is valid"));

const IF_OPEN: &str = "{if ";
const IF_CLOSE: &str = "{/if}";
const FOREACH_OPEN: &str = "{foreach ";
const FOREACH_CLOSE: &str = "{/foreach}";
const ITEM_PLACEHOLDER: &str = "{item}";

/// Stateless renderer; safe to share across tasks without locking.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateEngine;

impl TemplateEngine {
    pub fn new() -> Self {
        Self
    }

    /// Renders subject, body and optional HTML body of `template` against `message`.
    ///
    /// Only a missing template is an error; malformed markup degrades to text.
    pub fn render(
        &self,
        template: Option<&NotificationTemplate>,
        message: &NotificationMessage,
    ) -> Result<RenderedTemplate> {
        let template = template
            .ok_or_else(|| NotificationError::InvalidInput("template is required".to_string()))?;

        let ctx = build_context(message);

        let mut subject = self.render_text(&template.subject, &ctx);
        if subject.trim().is_empty() {
            subject = self.render_text(&template.default_subject, &ctx);
        }

        let mut body = self.render_text(&template.body, &ctx);
        if body.trim().is_empty() {
            body = self.render_text(&template.default_body, &ctx);
        }

        let body_html = template
            .body_html
            .as_deref()
            .map(|html| self.render_text(html, &ctx));

        debug!(
            template = %template.name,
            event_type = %template.event_type,
            "Template rendered"
        );

        Ok(RenderedTemplate {
            subject,
            body,
            body_html,
        })
    }

    /// Runs the four rendering phases over a single piece of text.
    pub fn render_text(&self, text: &str, ctx: &TemplateContext) -> String {
        let substituted = substitute(text, ctx);
        let conditioned = expand_blocks(&substituted, IF_OPEN, IF_CLOSE, |key, inner| {
            if is_truthy(ctx, key) {
                inner.to_string()
            } else {
                String::new()
            }
        });
        let looped = expand_blocks(&conditioned, FOREACH_OPEN, FOREACH_CLOSE, |key, inner| {
            match ctx.get(key) {
                Some(value) => value
                    .split(", ")
                    .map(|item| inner.replace(ITEM_PLACEHOLDER, item))
                    .collect(),
                None => String::new(),
            }
        });
        strip_leftovers(&looped)
    }

    pub fn validate(&self, template: Option<&NotificationTemplate>) -> Result<()> {
        validation::validate_template(template)
    }

    pub fn available_variables(&self, event_type: EventType) -> BTreeMap<String, String> {
        variables::available_variables(event_type)
    }
}

/// Phase 1: replaces every `{key}` found in `ctx` in one left-to-right pass.
/// Substituted values are not rescanned; unknown keys stay as they are.
fn substitute(text: &str, ctx: &TemplateContext) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(close) = rest.find('}') {
        let head = &rest[..close];
        match head.rfind('{') {
            Some(open) => {
                out.push_str(&head[..open]);
                match ctx.get(&head[open + 1..]) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str(&head[open..]);
                        out.push('}');
                    }
                }
            }
            None => {
                out.push_str(head);
                out.push('}');
            }
        }
        rest = &rest[close + 1..];
    }

    out.push_str(rest);
    out
}

/// Phases 2 and 3: repeatedly replaces the first complete `open key}inner close`
/// block with `expand(key, inner)` until none is left. Each pass consumes one
/// closing marker, so the loop always terminates.
fn expand_blocks<F>(text: &str, open: &str, close: &str, expand: F) -> String
where
    F: Fn(&str, &str) -> String,
{
    let mut text = text.to_string();

    loop {
        let Some(start) = text.find(open) else { break };
        let key_start = start + open.len();
        let Some(key_len) = text[key_start..].find('}') else { break };
        let inner_start = key_start + key_len + 1;
        let Some(inner_len) = text[inner_start..].find(close) else { break };
        let end = inner_start + inner_len + close.len();

        let key = text[key_start..key_start + key_len].trim();
        let inner = &text[inner_start..inner_start + inner_len];
        let replacement = expand(key, inner);

        text.replace_range(start..end, &replacement);
    }

    text
}

fn is_truthy(ctx: &TemplateContext, key: &str) -> bool {
    match ctx.get(key) {
        Some(value) => !matches!(value.as_str(), "" | "0" | "false"),
        None => false,
    }
}

/// Phase 4: drops every remaining `{...}` token.
fn strip_leftovers(text: &str) -> String {
    LEFTOVER_TOKEN
        .replace_all(text, |caps: &Captures| {
            debug!(token = %&caps[0], "Removing unresolved template token");
            ""
        })
        .into_owned()
}
