use serde::{Deserialize, Serialize};

use super::rule::MessageFacts;

/// A recipient string split into its address and lower-cased domain.
///
/// Produced by [`parse_recipient`](crate::parse::parse_recipient) and by
/// [`RecipientClassifier`](crate::RecipientClassifier). Mailing-list style
/// entries carry an empty address and domain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassifiedRecipient {
    pub recipient: String,
    pub address: String,
    pub domain: String,
    pub is_attention_domain: bool,
}

/// Attachment metadata. Classification only groups references to it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl Attachment {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// The parts of an outgoing message the rules look at. Borrowed from the caller
/// for the duration of one classification or workflow call.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutgoingMessage<'a> {
    pub internals: &'a [ClassifiedRecipient],
    pub externals: &'a [ClassifiedRecipient],
    pub attachments: &'a [Attachment],
    pub subject: Option<&'a str>,
    pub body: Option<&'a str>,
}

impl<'a> OutgoingMessage<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn internals(mut self, internals: &'a [ClassifiedRecipient]) -> Self {
        self.internals = internals;
        self
    }

    #[must_use]
    pub fn externals(mut self, externals: &'a [ClassifiedRecipient]) -> Self {
        self.externals = externals;
        self
    }

    #[must_use]
    pub fn attachments(mut self, attachments: &'a [Attachment]) -> Self {
        self.attachments = attachments;
        self
    }

    #[must_use]
    pub fn subject(mut self, subject: &'a str) -> Self {
        self.subject = Some(subject);
        self
    }

    #[must_use]
    pub fn body(mut self, body: &'a str) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn facts(&self) -> MessageFacts {
        MessageFacts {
            has_attachment: !self.attachments.is_empty(),
            has_external: !self.externals.is_empty(),
        }
    }

    /// Internals then externals, each paired with whether it came from the
    /// externals bucket.
    pub(crate) fn recipients(&self) -> impl Iterator<Item = (&'a ClassifiedRecipient, bool)> {
        self.internals
            .iter()
            .map(|r| (r, false))
            .chain(self.externals.iter().map(|r| (r, true)))
    }
}
