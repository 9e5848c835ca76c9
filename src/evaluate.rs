use crate::compile::Matcher;
use crate::{Attachment, Classified, ClassifiedRecipient, MessageFacts, OutgoingMessage, Rule};

/// Group recipients under every enabled rule whose address matcher hits and
/// whose `filter` accepts the recipient's facts.
///
/// The facts carry the message's attachment state and whether this particular
/// recipient came from the externals bucket.
pub(crate) fn classify_recipients<'m>(
    rules: &[Rule],
    matchers: &[Matcher],
    message: &OutgoingMessage<'m>,
    filter: impl Fn(&Rule, MessageFacts) -> bool,
) -> Classified<'m, ClassifiedRecipient> {
    let has_attachment = !message.attachments.is_empty();
    let mut classified = Classified::default();
    for matcher in matchers {
        let rule = &rules[matcher.rule];
        if !rule.enabled {
            continue;
        }
        let mut bucket: Vec<&ClassifiedRecipient> = Vec::new();
        for (recipient, is_external) in message.recipients() {
            let facts = MessageFacts {
                has_attachment,
                has_external: is_external,
            };
            if matcher.is_match(&recipient.address)
                && filter(rule, facts)
                && !bucket.iter().any(|seen| std::ptr::eq(*seen, recipient))
            {
                bucket.push(recipient);
            }
        }
        classified.push(&rule.id, bucket);
    }
    classified
}

/// Group attachments under every enabled rule whose name or suffix matcher
/// hits and whose `filter` accepts the message facts.
pub(crate) fn classify_attachments<'m>(
    rules: &[Rule],
    matchers: &[Matcher],
    message: &OutgoingMessage<'m>,
    filter: impl Fn(&Rule, MessageFacts) -> bool,
) -> Classified<'m, Attachment> {
    let facts = MessageFacts {
        has_attachment: true,
        has_external: !message.externals.is_empty(),
    };
    let mut classified = Classified::default();
    for matcher in matchers {
        let rule = &rules[matcher.rule];
        if !rule.enabled || !filter(rule, facts) {
            continue;
        }
        let mut bucket: Vec<&Attachment> = Vec::new();
        for attachment in message.attachments {
            if matcher.is_match(&attachment.name)
                && !bucket.iter().any(|seen| std::ptr::eq(*seen, attachment))
            {
                bucket.push(attachment);
            }
        }
        classified.push(&rule.id, bucket);
    }
    classified
}

/// Enabled rules accepted by `filter` whose matcher finds terms in `text`,
/// with the distinct matched terms.
pub(crate) fn match_text<'r, 't>(
    rules: &'r [Rule],
    matchers: &[Matcher],
    text: &'t str,
    facts: MessageFacts,
    filter: impl Fn(&Rule, MessageFacts) -> bool,
) -> Vec<(&'r Rule, Vec<&'t str>)> {
    matchers
        .iter()
        .filter_map(|matcher| {
            let rule = &rules[matcher.rule];
            if !rule.enabled || !filter(rule, facts) {
                return None;
            }
            let terms = matcher.terms(text);
            (!terms.is_empty()).then_some((rule, terms))
        })
        .collect()
}

/// Flatten a classification into distinct labels, first occurrence order.
pub(crate) fn distinct<'a, T: 'a>(
    classified: &Classified<'a, T>,
    label: impl Fn(&T) -> &str,
) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for (_, items) in classified.iter() {
        for item in items {
            let value = label(*item);
            if !labels.iter().any(|seen| seen == value) {
                labels.push(value.to_owned());
            }
        }
    }
    labels
}
