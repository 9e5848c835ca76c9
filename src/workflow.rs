use std::collections::HashSet;

use tracing::{debug, warn};

use crate::compile::Matcher;
use crate::evaluate::match_text;
use crate::{Alert, Confirm, MatchingRules, OutgoingMessage, Prompt, PromptTargets, Rule};

pub(crate) async fn try_reconfirm<C: Confirm>(
    rules: &MatchingRules,
    message: &OutgoingMessage<'_>,
    confirm: &mut C,
) -> bool {
    let mut processed: HashSet<&str> = HashSet::new();

    for (id, recipients) in rules.classify_reconfirm_recipients(message).iter() {
        let Some(rule) = rules.get(id) else { continue };
        processed.insert(rule.id.as_str());
        let prompt = Prompt::new(rule, PromptTargets::Recipients(recipients.to_vec()));
        if !ask(confirm, &prompt).await {
            return false;
        }
    }

    for (id, attachments) in rules.classify_reconfirm_attachments(message).iter() {
        let Some(rule) = rules.get(id) else { continue };
        processed.insert(rule.id.as_str());
        let prompt = Prompt::new(rule, PromptTargets::Attachments(attachments.to_vec()));
        if !ask(confirm, &prompt).await {
            return false;
        }
    }

    let matchers = rules.matchers();
    for (text, matchers) in [
        (message.subject, &matchers.subjects),
        (message.body, &matchers.bodies),
    ] {
        let Some(text) = text else { continue };
        for (rule, terms) in reconfirm_terms(rules, matchers, text, message) {
            if !processed.insert(rule.id.as_str()) {
                debug!(rule = %rule.id, "already reconfirmed in this call");
                continue;
            }
            let prompt = Prompt::new(rule, PromptTargets::Terms(terms));
            if !ask(confirm, &prompt).await {
                return false;
            }
        }
    }

    true
}

fn reconfirm_terms<'r, 't>(
    rules: &'r MatchingRules,
    matchers: &[Matcher],
    text: &'t str,
    message: &OutgoingMessage<'_>,
) -> Vec<(&'r Rule, Vec<&'t str>)> {
    match_text(rules.all(), matchers, text, message.facts(), Rule::should_reconfirm)
}

async fn ask<C: Confirm>(confirm: &mut C, prompt: &Prompt<'_>) -> bool {
    debug!(rule = %prompt.rule.id, targets = prompt.targets.labels().len(), "requesting reconfirmation");
    match confirm.confirm(prompt).await {
        Ok(true) => true,
        Ok(false) => {
            debug!(rule = %prompt.rule.id, "not confirmed, stopping");
            false
        }
        Err(error) => {
            warn!(rule = %prompt.rule.id, %error, "confirmation failed, treating as not confirmed");
            false
        }
    }
}

pub(crate) async fn try_block<A: Alert>(
    rules: &MatchingRules,
    message: &OutgoingMessage<'_>,
    alert: &mut A,
) -> bool {
    let Some(prompt) = first_blocking(rules, message) else {
        return false;
    };
    debug!(rule = %prompt.rule.id, "blocking send");
    if let Err(error) = alert.alert(&prompt).await {
        warn!(rule = %prompt.rule.id, %error, "alert failed, send is still blocked");
    }
    true
}

/// The prompt for the first blocking rule, searching recipients, attachments,
/// subject and body in that order.
fn first_blocking<'a>(
    rules: &'a MatchingRules,
    message: &OutgoingMessage<'a>,
) -> Option<Prompt<'a>> {
    let recipients = rules.classify_block_recipients(message);
    if let Some((id, matched)) = recipients.iter().next() {
        let rule = rules.get(id)?;
        return Some(Prompt::new(rule, PromptTargets::Recipients(matched.to_vec())));
    }

    let attachments = rules.classify_block_attachments(message);
    if let Some((id, matched)) = attachments.iter().next() {
        let rule = rules.get(id)?;
        return Some(Prompt::new(rule, PromptTargets::Attachments(matched.to_vec())));
    }

    let matchers = rules.matchers();
    [
        (message.subject, &matchers.subjects),
        (message.body, &matchers.bodies),
    ]
    .into_iter()
    .filter_map(|(text, matchers)| Some((text?, matchers)))
    .find_map(|(text, matchers)| {
        match_text(rules.all(), matchers, text, message.facts(), Rule::should_block)
            .into_iter()
            .next()
    })
    .map(|(rule, terms)| Prompt::new(rule, PromptTargets::Terms(terms)))
}
