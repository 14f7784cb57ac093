/// Form validation for each content collection.
///
/// Submitted fields are decoded into a typed form, normalized (text trimmed,
/// tags de-duplicated) and checked. Every failing field is reported, not
/// just the first one. Fields a form does not know about are dropped.
use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Collection;
use crate::youtube;

static HTTP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid url pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {}", join_errors(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError {
                field: field.into(),
                message: message.into(),
            }],
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// Accumulates field errors while a form checks itself.
#[derive(Default)]
pub struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &str, message: String) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message,
        });
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) {
        if value.chars().count() < min {
            self.fail(field, format!("must be at least {min} characters"));
        }
    }

    pub fn http_url(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !HTTP_URL.is_match(v) {
                self.fail(field, "must be a valid http(s) URL".to_string());
            }
        }
    }

    pub fn youtube_url(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !youtube::validate_youtube_url(v) {
                self.fail(field, "must be a valid YouTube URL".to_string());
            }
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                errors: self.errors,
            })
        }
    }
}

/// A typed submission form for one collection.
pub trait Form: DeserializeOwned + Serialize {
    /// Trim and tidy the submitted values in place.
    fn normalize(&mut self);
    fn check(&self, checker: &mut Checker);
}

/// Validate submitted fields for `collection`, returning the normalized
/// field map to store.
pub fn validate_fields(
    collection: Collection,
    fields: &Map<String, Value>,
) -> Result<Map<String, Value>, ValidationError> {
    match collection {
        Collection::Blogs | Collection::FeatureStories => run::<ArticleForm>(fields),
        Collection::Photos => run::<PhotoForm>(fields),
        Collection::Videos => run::<VideoForm>(fields),
        Collection::Pdfs => run::<PdfForm>(fields),
        Collection::TeamMembers => run::<TeamMemberForm>(fields),
        Collection::Banners => run::<BannerForm>(fields),
        Collection::Tags => run::<TagForm>(fields),
    }
}

fn run<F: Form>(fields: &Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
    let mut form: F = serde_json::from_value(Value::Object(fields.clone()))
        .map_err(|e| ValidationError::single("document", e.to_string()))?;
    form.normalize();

    let mut checker = Checker::default();
    form.check(&mut checker);
    checker.finish()?;

    match serde_json::to_value(&form) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ValidationError::single("document", "expected an object")),
        Err(e) => Err(ValidationError::single("document", e.to_string())),
    }
}

fn trim(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}

fn trim_opt(s: &mut Option<String>) {
    *s = s
        .take()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
}

/// Trim tags, drop blanks and keep the first occurrence of each.
pub fn normalize_tags(tags: &mut Vec<String>) {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags.drain(..) {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    *tags = seen;
}

/// Impact stories and feature stories.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Form for ArticleForm {
    fn normalize(&mut self) {
        trim(&mut self.title);
        trim(&mut self.content);
        trim_opt(&mut self.author);
        normalize_tags(&mut self.tags);
    }

    fn check(&self, c: &mut Checker) {
        c.min_len("title", &self.title, 3);
        c.min_len("content", &self.content, 10);
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoForm {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Form for PhotoForm {
    fn normalize(&mut self) {
        trim(&mut self.title);
        trim_opt(&mut self.caption);
        normalize_tags(&mut self.tags);
    }

    fn check(&self, c: &mut Checker) {
        c.min_len("title", &self.title, 2);
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoForm {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Form for VideoForm {
    fn normalize(&mut self) {
        trim(&mut self.title);
        trim_opt(&mut self.description);
        trim_opt(&mut self.youtube_url);
        normalize_tags(&mut self.tags);
    }

    fn check(&self, c: &mut Checker) {
        c.min_len("title", &self.title, 3);
        c.youtube_url("youtubeUrl", self.youtube_url.as_deref());
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfForm {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Form for PdfForm {
    fn normalize(&mut self) {
        trim(&mut self.title);
        trim_opt(&mut self.description);
        normalize_tags(&mut self.tags);
    }

    fn check(&self, c: &mut Checker) {
        c.min_len("title", &self.title, 3);
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub bio: String,
    /// Position on the team page, lowest first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl Form for TeamMemberForm {
    fn normalize(&mut self) {
        trim(&mut self.name);
        trim(&mut self.role);
        trim(&mut self.bio);
    }

    fn check(&self, c: &mut Checker) {
        c.min_len("name", &self.name, 2);
        c.min_len("role", &self.role, 2);
        c.min_len("bio", &self.bio, 10);
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerForm {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Form for BannerForm {
    fn normalize(&mut self) {
        trim(&mut self.title);
        trim_opt(&mut self.link);
    }

    fn check(&self, c: &mut Checker) {
        c.min_len("title", &self.title, 3);
        c.http_url("link", self.link.as_deref());
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagForm {
    #[serde(default)]
    pub name: String,
}

impl Form for TagForm {
    fn normalize(&mut self) {
        trim(&mut self.name);
    }

    fn check(&self, c: &mut Checker) {
        c.min_len("name", &self.name, 2);
    }
}
