use regex::Regex;
use tracing::debug;

use crate::compile::PatternKind;
use crate::{CompileError, MatchTarget, Rule};

/// Tests attachment file names against name and suffix rules and against
/// the configured attention lists.
///
/// A simpler sibling of [`MatchingRules`](crate::MatchingRules): it answers
/// "which rules match this file name" without any highlight or action gate.
#[derive(Debug, Clone, Default)]
pub struct AttachmentClassifier {
    rules: Vec<(String, Option<Regex>)>,
    attention_suffix: Option<Regex>,
    attention_suffix2: Option<Regex>,
    attention_term: Option<Regex>,
}

/// Builder for [`AttachmentClassifier`].
#[derive(Debug, Clone, Default)]
pub struct AttachmentClassifierBuilder {
    rules: Vec<Rule>,
    attention_suffixes: Vec<String>,
    attention_suffixes2: Vec<String>,
    attention_terms: Vec<String>,
}

impl AttachmentClassifierBuilder {
    /// Enabled attachment-name and attachment-suffix rules are compiled from
    /// their resolved `items`. Other rules are ignored.
    #[must_use]
    pub fn rules<'r>(mut self, rules: impl IntoIterator<Item = &'r Rule>) -> Self {
        self.rules.extend(rules.into_iter().cloned());
        self
    }

    #[must_use]
    pub fn attention_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attention_suffixes.extend(suffixes.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn attention_suffixes2<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attention_suffixes2.extend(suffixes.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn attention_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attention_terms.extend(terms.into_iter().map(Into::into));
        self
    }

    /// # Errors
    ///
    /// [`CompileError::Pattern`] naming the rule (or attention list) whose
    /// patterns do not compile.
    pub fn build(self) -> Result<AttachmentClassifier, CompileError> {
        let mut rules = Vec::new();
        for rule in self.rules.iter().filter(|rule| rule.enabled) {
            let kind = match rule.match_target {
                MatchTarget::AttachmentName => PatternKind::Term,
                MatchTarget::AttachmentSuffix => PatternKind::Suffix,
                _ => continue,
            };
            rules.push((rule.id.clone(), compile(&rule.id, kind, &rule.items)?));
        }
        let classifier = AttachmentClassifier {
            rules,
            attention_suffix: compile("attentionSuffixes", PatternKind::Suffix, &self.attention_suffixes)?,
            attention_suffix2: compile("attentionSuffixes2", PatternKind::Suffix, &self.attention_suffixes2)?,
            attention_term: compile("attentionTerms", PatternKind::Term, &self.attention_terms)?,
        };
        debug!(rules = classifier.rules.len(), "built attachment classifier");
        Ok(classifier)
    }
}

fn compile(name: &str, kind: PatternKind, items: &[String]) -> Result<Option<Regex>, CompileError> {
    kind.compile(items).map_err(|source| CompileError::Pattern {
        rule: name.to_owned(),
        source,
    })
}

fn matches(regex: Option<&Regex>, filename: &str) -> bool {
    regex.is_some_and(|re| re.is_match(filename))
}

impl AttachmentClassifier {
    #[must_use]
    pub fn builder() -> AttachmentClassifierBuilder {
        AttachmentClassifierBuilder::default()
    }

    /// Ids of every rule whose pattern matches `filename`, in rule order.
    #[must_use]
    pub fn get_matched_rules(&self, filename: &str) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|(_, regex)| matches(regex.as_ref(), filename))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    #[must_use]
    pub fn has_attention_suffix(&self, filename: &str) -> bool {
        matches(self.attention_suffix.as_ref(), filename)
    }

    #[must_use]
    pub fn has_attention_suffix2(&self, filename: &str) -> bool {
        matches(self.attention_suffix2.as_ref(), filename)
    }

    #[must_use]
    pub fn has_attention_term(&self, filename: &str) -> bool {
        matches(self.attention_term.as_ref(), filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_lists_never_match() {
        let classifier = AttachmentClassifier::builder().build().unwrap();
        assert!(!classifier.has_attention_suffix("a.png"));
        assert!(!classifier.has_attention_suffix2(""));
        assert!(!classifier.has_attention_term("anything"));
        assert!(classifier.get_matched_rules("a.png").is_empty());
    }

    #[test]
    fn disabled_and_other_targets_are_skipped() {
        let mut name = Rule::new("name");
        name.match_target = MatchTarget::AttachmentName;
        name.items = vec!["secret".into()];
        let mut disabled = name.clone();
        disabled.id = "disabled".into();
        disabled.enabled = false;
        let mut subject = name.clone();
        subject.id = "subject".into();
        subject.match_target = MatchTarget::Subject;

        let classifier = AttachmentClassifier::builder()
            .rules([&name, &disabled, &subject])
            .build()
            .unwrap();
        assert_eq!(classifier.get_matched_rules("top-SECRET.doc"), ["name"]);
    }
}
