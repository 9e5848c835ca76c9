use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ClassifiedRecipients;

/// Decides whether an outgoing message needs the confirmation flow at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendPolicy {
    /// Skip confirmation when no recipient is external.
    pub skip_confirmation_for_internal_mail: bool,
    /// Skip confirmation when there are at most this many recipients.
    pub min_confirmation_recipients_count: usize,
    /// Report the external domains when there are two or more of them.
    pub confirm_multiple_recipient_domains: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InternalOnly,
    TooFewRecipients { count: usize, minimum: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InternalOnly => f.write_str("there is no external recipient"),
            SkipReason::TooFewRecipients { count, minimum } => {
                write!(f, "too few recipients ({count} <= {minimum})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Skip(SkipReason),
    Confirm {
        /// Distinct external domains in first-seen order, set only when
        /// multiple-domain confirmation is enabled and two or more exist.
        external_domains: Vec<String>,
    },
}

impl PolicyDecision {
    #[must_use]
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, PolicyDecision::Confirm { .. })
    }
}

impl SendPolicy {
    /// Blocked recipients count toward the total and are never "internal".
    #[must_use]
    pub fn decide(&self, recipients: &ClassifiedRecipients) -> PolicyDecision {
        let outside = recipients.externals.len() + recipients.blocked.len();
        if self.skip_confirmation_for_internal_mail && outside == 0 {
            debug!(reason = %SkipReason::InternalOnly, "skipping confirmation");
            return PolicyDecision::Skip(SkipReason::InternalOnly);
        }
        let count = recipients.len();
        if count <= self.min_confirmation_recipients_count {
            let reason = SkipReason::TooFewRecipients {
                count,
                minimum: self.min_confirmation_recipients_count,
            };
            debug!(%reason, "skipping confirmation");
            return PolicyDecision::Skip(reason);
        }

        let mut external_domains: Vec<String> = Vec::new();
        if self.confirm_multiple_recipient_domains {
            for recipient in &recipients.externals {
                if !recipient.domain.is_empty() && !external_domains.contains(&recipient.domain) {
                    external_domains.push(recipient.domain.clone());
                }
            }
            if external_domains.len() < 2 {
                external_domains.clear();
            }
        }
        PolicyDecision::Confirm { external_domains }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecipientClassifier;

    fn classify(recipients: &[&str]) -> ClassifiedRecipients {
        RecipientClassifier::new()
            .internal_domains(["example.com"])
            .blocked_domains(["blocked.example"])
            .classify(recipients)
    }

    #[test]
    fn internal_only_skips_when_enabled() {
        let policy = SendPolicy {
            skip_confirmation_for_internal_mail: true,
            ..SendPolicy::default()
        };
        assert_eq!(
            policy.decide(&classify(&["a@example.com"])),
            PolicyDecision::Skip(SkipReason::InternalOnly)
        );
        assert!(policy.decide(&classify(&["a@blocked.example"])).needs_confirmation());
        assert!(!SendPolicy::default().decide(&classify(&[])).needs_confirmation());
    }

    #[test]
    fn too_few_recipients_skip() {
        let policy = SendPolicy {
            min_confirmation_recipients_count: 2,
            ..SendPolicy::default()
        };
        assert_eq!(
            policy.decide(&classify(&["a@example.com", "b@x.example"])),
            PolicyDecision::Skip(SkipReason::TooFewRecipients { count: 2, minimum: 2 })
        );
        assert!(policy
            .decide(&classify(&["a@example.com", "b@x.example", "c@y.example"]))
            .needs_confirmation());
    }

    #[test]
    fn multiple_external_domains_are_reported() {
        let policy = SendPolicy {
            confirm_multiple_recipient_domains: true,
            ..SendPolicy::default()
        };
        assert_eq!(
            policy.decide(&classify(&["a@x.example", "b@X.example", "c@y.example"])),
            PolicyDecision::Confirm {
                external_domains: vec!["x.example".into(), "y.example".into()]
            }
        );
        assert_eq!(
            policy.decide(&classify(&["a@x.example", "b@x.example"])),
            PolicyDecision::Confirm {
                external_domains: Vec::new()
            }
        );
    }

    #[test]
    fn skip_reason_messages() {
        assert_eq!(SkipReason::InternalOnly.to_string(), "there is no external recipient");
        assert_eq!(
            SkipReason::TooFewRecipients { count: 1, minimum: 3 }.to_string(),
            "too few recipients (1 <= 3)"
        );
    }
}
