use std::collections::HashSet;

use tracing::debug;

use crate::parse::parse_recipient;
use crate::{ClassifiedRecipient, OutgoingMessage};

/// Sorts recipients into internal, external and blocked buckets by exact,
/// case-insensitive domain membership.
///
/// # Example
///
/// ```
/// use sendcheck::RecipientClassifier;
///
/// let classifier = RecipientClassifier::new()
///     .internal_domains(["@example.com"])
///     .blocked_domains(["spam.example"]);
/// let classified = classifier.classify(&["a@EXAMPLE.com", "b@other.example", "c@spam.example"]);
/// assert_eq!(classified.internals.len(), 1);
/// assert_eq!(classified.externals.len(), 1);
/// assert_eq!(classified.blocked.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecipientClassifier {
    internal: HashSet<String>,
    attention: HashSet<String>,
    blocked: HashSet<String>,
}

impl RecipientClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn internal_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.internal.extend(normalize(domains));
        self
    }

    #[must_use]
    pub fn attention_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.attention.extend(normalize(domains));
        self
    }

    #[must_use]
    pub fn blocked_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.blocked.extend(normalize(domains));
        self
    }

    /// Parse and bucket each recipient, keeping input order.
    ///
    /// A blocked domain wins over internal membership. With no internal
    /// domains configured every unblocked recipient is external.
    pub fn classify<S: AsRef<str>>(&self, recipients: &[S]) -> ClassifiedRecipients {
        let mut classified = ClassifiedRecipients::default();
        for recipient in recipients {
            let mut parsed = parse_recipient(recipient.as_ref());
            parsed.is_attention_domain = self.attention.contains(&parsed.domain);
            if self.blocked.contains(&parsed.domain) {
                classified.blocked.push(parsed);
            } else if self.internal.contains(&parsed.domain) {
                classified.internals.push(parsed);
            } else {
                classified.externals.push(parsed);
            }
        }
        debug!(
            internals = classified.internals.len(),
            externals = classified.externals.len(),
            blocked = classified.blocked.len(),
            "classified recipients"
        );
        classified
    }
}

fn normalize<I, S>(domains: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    domains.into_iter().filter_map(|domain| {
        let domain = domain.as_ref().trim();
        let domain = domain.strip_prefix('@').unwrap_or(domain);
        (!domain.is_empty()).then(|| domain.to_lowercase())
    })
}

/// Recipients split by [`RecipientClassifier::classify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedRecipients {
    pub internals: Vec<ClassifiedRecipient>,
    pub externals: Vec<ClassifiedRecipient>,
    pub blocked: Vec<ClassifiedRecipient>,
}

impl ClassifiedRecipients {
    /// Concatenate the buckets of several address fields (To, Cc, Bcc),
    /// preserving field order.
    pub fn merge(fields: impl IntoIterator<Item = ClassifiedRecipients>) -> Self {
        fields
            .into_iter()
            .fold(Self::default(), |mut merged, mut field| {
                merged.internals.append(&mut field.internals);
                merged.externals.append(&mut field.externals);
                merged.blocked.append(&mut field.blocked);
                merged
            })
    }

    /// Every recipient across the three buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.internals.len() + self.externals.len() + self.blocked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A message over the internal and external buckets, ready for the rule
    /// engine. Attachments, subject and body can be chained on.
    #[must_use]
    pub fn message(&self) -> OutgoingMessage<'_> {
        OutgoingMessage::new()
            .internals(&self.internals)
            .externals(&self.externals)
    }
}
