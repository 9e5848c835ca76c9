use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use super::message::{Attachment, ClassifiedRecipient};
use super::rule::Rule;

/// What fired a rule, handed to the confirm/alert collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptTargets<'a> {
    Recipients(Vec<&'a ClassifiedRecipient>),
    Attachments(Vec<&'a Attachment>),
    Terms(Vec<&'a str>),
}

impl PromptTargets<'_> {
    /// Addresses, attachment names or matched terms, in order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        match self {
            PromptTargets::Recipients(recipients) => {
                recipients.iter().map(|r| r.address.as_str()).collect()
            }
            PromptTargets::Attachments(attachments) => {
                attachments.iter().map(|a| a.name.as_str()).collect()
            }
            PromptTargets::Terms(terms) => terms.clone(),
        }
    }
}

/// One confirmation or alert request for a firing rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt<'a> {
    pub rule: &'a Rule,
    pub title: &'a str,
    /// `rule.confirm_message` with its placeholder filled in.
    pub message: String,
    pub targets: PromptTargets<'a>,
}

impl<'a> Prompt<'a> {
    #[must_use]
    pub fn new(rule: &'a Rule, targets: PromptTargets<'a>) -> Self {
        let message = fill_placeholder(&rule.confirm_message, &targets.labels().join("\n"));
        Self {
            rule,
            title: &rule.confirm_title,
            message,
            targets,
        }
    }
}

static PLACEHOLDER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)[%$]s").ok());

/// Replace the first `%s` or `$s` (case-insensitive) in `template`.
pub(crate) fn fill_placeholder(template: &str, value: &str) -> String {
    match PLACEHOLDER.as_ref() {
        Some(placeholder) => placeholder
            .replacen(template, 1, NoExpand(value))
            .into_owned(),
        None => template.to_owned(),
    }
}

/// Asks the user to reconfirm sending because of a rule.
///
/// `Ok(false)` and `Err(_)` both count as "not confirmed".
#[allow(async_fn_in_trait)]
pub trait Confirm {
    type Error: fmt::Display;

    async fn confirm(&mut self, prompt: &Prompt<'_>) -> Result<bool, Self::Error>;
}

/// Tells the user a rule blocks sending. Failures are logged and ignored.
#[allow(async_fn_in_trait)]
pub trait Alert {
    type Error: fmt::Display;

    async fn alert(&mut self, prompt: &Prompt<'_>) -> Result<(), Self::Error>;
}

/// Reads the contents of an items file for rules whose source is a file.
///
/// An error or empty contents resolve the rule's items to an empty list.
#[allow(async_fn_in_trait)]
pub trait ItemsReader {
    type Error: fmt::Display;

    async fn read(&self, path: &str) -> Result<String, Self::Error>;
}

/// A reader for sessions with no file access: every file reads as empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFiles;

impl ItemsReader for NoFiles {
    type Error = Infallible;

    async fn read(&self, _path: &str) -> Result<String, Infallible> {
        Ok(String::new())
    }
}

/// In-memory files keyed by path.
impl ItemsReader for HashMap<String, String> {
    type Error = Infallible;

    async fn read(&self, path: &str) -> Result<String, Infallible> {
        Ok(self.get(path).cloned().unwrap_or_default())
    }
}
