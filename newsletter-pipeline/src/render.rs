use chrono::{DateTime, NaiveDate, Utc};
use handlebars::{
    html_escape, Context, Handlebars, Helper, HelperResult, Output, RenderContext,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, error};

use crate::clean::clean_text;
use crate::config::NewsletterConfig;
use crate::digest::RenderPayload;
use crate::types::Result;

const NEWSLETTER_TEMPLATE: &str = include_str!("../templates/newsletter.hbs");
const ARTICLE_PARTIAL: &str = include_str!("../templates/article.hbs");
const TEMPLATE_NAME: &str = "newsletter";

pub const DEFAULT_TRUNCATE_LENGTH: usize = 150;

/// Payload plus branding, flattened into the shape the template reads.
#[derive(Debug, Serialize)]
pub struct TemplateContext<'a> {
    #[serde(flatten)]
    pub payload: &'a RenderPayload,
    pub title: &'a str,
    pub date: String,
    pub time: String,
    pub brand_color: &'a str,
    pub brand_logo: &'a str,
    pub social_links: &'a BTreeMap<String, String>,
    pub unsubscribe_url: &'a str,
    pub manage_preferences_url: &'a str,
    pub forward_url: &'a str,
}

impl<'a> TemplateContext<'a> {
    pub fn new(
        payload: &'a RenderPayload,
        branding: &'a NewsletterConfig,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            payload,
            title: &branding.name,
            date: generated_at.to_rfc3339(),
            time: generated_at.format("%H:%M UTC").to_string(),
            brand_color: &branding.brand_color,
            brand_logo: &branding.logo_url,
            social_links: &branding.social_links,
            unsubscribe_url: &branding.unsubscribe_url,
            manage_preferences_url: &branding.preferences_url,
            forward_url: &branding.forward_url,
        }
    }
}

pub struct NewsletterRenderer {
    handlebars: Handlebars<'static>,
}

impl NewsletterRenderer {
    pub fn new() -> Result<Self> {
        Self::with_template(NEWSLETTER_TEMPLATE)
    }

    /// Same helpers and partials around a different top-level template.
    pub fn with_template(template: &str) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.register_helper("format_date", Box::new(format_date_helper));
        handlebars.register_helper("truncate", Box::new(truncate_helper));
        handlebars.register_partial("article", ARTICLE_PARTIAL)?;
        handlebars.register_template_string(TEMPLATE_NAME, template)?;
        Ok(Self { handlebars })
    }

    pub fn render(
        &self,
        payload: &RenderPayload,
        branding: &NewsletterConfig,
        generated_at: DateTime<Utc>,
    ) -> Result<String> {
        let context = TemplateContext::new(payload, branding, generated_at);

        match self.handlebars.render(TEMPLATE_NAME, &context) {
            Ok(html) => {
                debug!("Rendered newsletter ({} bytes)", html.len());
                Ok(html)
            }
            Err(e) => {
                error!(
                    "Failed to render newsletter issue #{} with {} articles: {}",
                    payload.issue_number, payload.article_count, e
                );
                Err(e.into())
            }
        }
    }
}

/// Text alternative for mail clients that do not show HTML.
pub fn plain_text(html: &str) -> String {
    clean_text(html)
}

/// "2025-03-03T09:00:00Z" or an RFC 2822 stamp becomes "March 03, 2025".
/// Anything unparseable is printed unchanged.
pub fn format_date(value: &str) -> String {
    let value = value.trim();
    let parsed = DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"));

    match parsed {
        Ok(date) => date.format("%B %d, %Y").to_string(),
        Err(_) => value.to_string(),
    }
}

/// Cut to `length` characters and mark the cut with "...".
pub fn truncate(text: &str, length: usize) -> String {
    if text.chars().count() <= length {
        return text.to_string();
    }
    let cut: String = text.chars().take(length).collect();
    format!("{}...", cut.trim_end())
}

fn format_date_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    out.write(&html_escape(&format_date(value)))?;
    Ok(())
}

fn truncate_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let text = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    let length = h
        .param(1)
        .and_then(|v| v.value().as_u64())
        .map(|n| n as usize)
        .unwrap_or(DEFAULT_TRUNCATE_LENGTH);
    out.write(&html_escape(&truncate(text, length)))?;
    Ok(())
}
