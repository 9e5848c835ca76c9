use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::{CompileError, MatchTarget, Rule};

/// Upper bound for one compiled alternation. Item files can list thousands of
/// domains.
const SIZE_LIMIT: usize = 64 * (1 << 20);

/// How a rule's items are turned into a regular expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PatternKind {
    /// Full address, anchored: `^(p1|p2)$`. Bare domains become `*@domain`.
    Address,
    /// Substring anywhere: `(p1|p2)`.
    Term,
    /// File suffix: `\.(p1|p2)$`.
    Suffix,
}

impl PatternKind {
    /// Compile `items` into one case-insensitive matcher.
    ///
    /// Returns `Ok(None)` when no usable pattern remains, which never matches.
    pub(crate) fn compile(self, items: &[String]) -> Result<Option<Regex>, regex::Error> {
        let alternatives: Vec<String> = match self {
            PatternKind::Address => address_patterns(items),
            PatternKind::Term => dedup(items.iter().map(|item| item.trim().to_owned())),
            PatternKind::Suffix => dedup(items.iter().map(|item| {
                let item = item.trim();
                item.strip_prefix('.').unwrap_or(item).to_owned()
            })),
        }
        .iter()
        .map(|pattern| wildcard_to_regex(pattern))
        .collect();

        if alternatives.is_empty() {
            return Ok(None);
        }
        let joined = alternatives.join("|");
        let source = match self {
            PatternKind::Address => format!("^(?:{joined})$"),
            PatternKind::Term => format!("(?:{joined})"),
            PatternKind::Suffix => format!(r"\.(?:{joined})$"),
        };
        RegexBuilder::new(&source)
            .case_insensitive(true)
            .size_limit(SIZE_LIMIT)
            .build()
            .map(Some)
    }
}

/// A rule's items compiled for one [`PatternKind`].
#[derive(Debug, Clone)]
pub(crate) struct Matcher {
    /// Index of the rule in the engine's rule list.
    pub(crate) rule: usize,
    regex: Option<Regex>,
}

impl Matcher {
    pub(crate) fn new(rule: usize, regex: Option<Regex>) -> Self {
        Self { rule, regex }
    }

    pub(crate) fn is_match(&self, haystack: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(haystack))
    }

    /// Every matched substring, first occurrence order, duplicates removed.
    pub(crate) fn terms<'t>(&self, haystack: &'t str) -> Vec<&'t str> {
        let Some(regex) = &self.regex else {
            return Vec::new();
        };
        let mut terms: Vec<&str> = Vec::new();
        for found in regex.find_iter(haystack) {
            let term = found.as_str();
            if !term.is_empty() && !terms.contains(&term) {
                terms.push(term);
            }
        }
        terms
    }
}

/// Compiled matchers for every rule, grouped by what they are tested against.
#[derive(Debug, Default)]
pub(crate) struct Matchers {
    pub(crate) addresses: Vec<Matcher>,
    pub(crate) attachments: Vec<Matcher>,
    pub(crate) subjects: Vec<Matcher>,
    pub(crate) bodies: Vec<Matcher>,
}

pub(crate) fn compile(rules: &[Rule]) -> Matchers {
    let mut matchers = Matchers::default();
    for (index, rule) in rules.iter().enumerate() {
        match rule.match_target {
            MatchTarget::RecipientDomain => {
                matchers
                    .addresses
                    .push(build(index, rule, PatternKind::Address));
            }
            MatchTarget::AttachmentName => {
                matchers
                    .attachments
                    .push(build(index, rule, PatternKind::Term));
            }
            MatchTarget::AttachmentSuffix => {
                matchers
                    .attachments
                    .push(build(index, rule, PatternKind::Suffix));
            }
            MatchTarget::Subject => matchers.subjects.push(build(index, rule, PatternKind::Term)),
            MatchTarget::Body => matchers.bodies.push(build(index, rule, PatternKind::Term)),
            MatchTarget::SubjectOrBody => {
                let matcher = build(index, rule, PatternKind::Term);
                matchers.subjects.push(matcher.clone());
                matchers.bodies.push(matcher);
            }
            MatchTarget::Unknown => {
                debug!(rule = %rule.id, "unknown match target, rule never fires");
            }
        }
    }
    debug!(
        addresses = matchers.addresses.len(),
        attachments = matchers.attachments.len(),
        subjects = matchers.subjects.len(),
        bodies = matchers.bodies.len(),
        "compiled rule matchers"
    );
    matchers
}

/// Check that every rule's items compile.
pub(crate) fn validate(rules: &[Rule]) -> Result<(), CompileError> {
    for rule in rules {
        if let Some(kind) = kind_of(rule.match_target) {
            try_build(rule, kind)?;
        }
    }
    Ok(())
}

fn kind_of(target: MatchTarget) -> Option<PatternKind> {
    match target {
        MatchTarget::RecipientDomain => Some(PatternKind::Address),
        MatchTarget::AttachmentSuffix => Some(PatternKind::Suffix),
        MatchTarget::AttachmentName
        | MatchTarget::Subject
        | MatchTarget::Body
        | MatchTarget::SubjectOrBody => Some(PatternKind::Term),
        MatchTarget::Unknown => None,
    }
}

fn try_build(rule: &Rule, kind: PatternKind) -> Result<Option<Regex>, CompileError> {
    kind.compile(&rule.items)
        .map_err(|source| CompileError::Pattern {
            rule: rule.id.clone(),
            source,
        })
}

fn build(index: usize, rule: &Rule, kind: PatternKind) -> Matcher {
    match try_build(rule, kind) {
        Ok(regex) => Matcher::new(index, regex),
        Err(error) => {
            warn!(%error, ?kind, "rule disabled for this session");
            Matcher::new(index, None)
        }
    }
}

/// Normalize recipient-domain items into full-address wildcard patterns.
///
/// `#` starts a comment. `-pattern` cancels `pattern`, whether or not the
/// positive entry is listed.
fn address_patterns(items: &[String]) -> Vec<String> {
    let mut positives = Vec::new();
    let mut negatives = HashSet::new();
    for item in items {
        let item = item.trim();
        if item.is_empty() || item.starts_with('#') {
            continue;
        }
        match item.strip_prefix('-') {
            Some(negative) => {
                if let Some(pattern) = normalize_address(negative) {
                    negatives.insert(pattern.to_lowercase());
                }
            }
            None => positives.extend(normalize_address(item)),
        }
    }
    dedup(positives.into_iter())
        .into_iter()
        .filter(|pattern| !negatives.contains(&pattern.to_lowercase()))
        .collect()
}

fn normalize_address(item: &str) -> Option<String> {
    let item = item.trim();
    let item = item.strip_prefix('@').unwrap_or(item);
    if item.is_empty() {
        None
    } else if item.contains('@') {
        Some(item.to_owned())
    } else {
        Some(format!("*@{item}"))
    }
}

/// Drop empty entries and case-insensitive duplicates, keeping first occurrence.
fn dedup(patterns: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    patterns
        .filter(|pattern| !pattern.is_empty() && seen.insert(pattern.to_lowercase()))
        .collect()
}

/// Escape everything literally except `*` (any run) and `?` (any one char).
fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut buf = [0_u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            c => out.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    fn compiled(kind: PatternKind, list: &[&str]) -> Matcher {
        Matcher::new(0, kind.compile(&items(list)).unwrap())
    }

    #[test]
    fn bare_domain_matches_whole_domain_only() {
        let m = compiled(PatternKind::Address, &["me.com"]);
        assert!(m.is_match("bbb@me.com"));
        assert!(m.is_match("BBB@ME.COM"));
        assert!(!m.is_match("bbb@sub.me.com"));
        assert!(!m.is_match("me.com@outsider.com"));
        assert!(!m.is_match(""));
    }

    #[test]
    fn at_prefixed_domain_is_a_domain() {
        let m = compiled(PatternKind::Address, &["@clear-code.com"]);
        assert!(m.is_match("a@clear-code.com"));
        assert!(!m.is_match("a@unclear-code.com"));
    }

    #[test]
    fn full_address_and_wildcards() {
        let m = compiled(PatternKind::Address, &["boss@example.com", "ops-?@*.example.org"]);
        assert!(m.is_match("boss@example.com"));
        assert!(!m.is_match("other@example.com"));
        assert!(m.is_match("ops-1@eu.example.org"));
        assert!(!m.is_match("ops-12@eu.example.org"));
    }

    #[test]
    fn negative_cancels_positive() {
        let m = compiled(
            PatternKind::Address,
            &["x.example.com", "@x.clear-code.com", "-x.clear-code.com"],
        );
        assert!(m.is_match("a@x.example.com"));
        assert!(!m.is_match("a@x.clear-code.com"));
    }

    #[test]
    fn stray_negative_and_comments_are_harmless() {
        let m = compiled(PatternKind::Address, &["# internal", "-foo.com", "bar.com"]);
        assert!(m.is_match("a@bar.com"));
        assert!(!m.is_match("a@foo.com"));
        assert!(!m.is_match("#@internal"));
    }

    #[test]
    fn empty_items_never_match() {
        for kind in [PatternKind::Address, PatternKind::Term, PatternKind::Suffix] {
            assert!(kind.compile(&[]).unwrap().is_none());
            assert!(kind.compile(&items(&["", "  "])).unwrap().is_none());
        }
        assert!(PatternKind::Address
            .compile(&items(&["# only a comment", "-gone.com"]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let m = compiled(PatternKind::Term, &["a+b", "(x)"]);
        assert!(m.is_match("file-a+b.txt"));
        assert!(!m.is_match("file-aab.txt"));
        assert!(m.is_match("report(x).doc"));
    }

    #[test]
    fn suffix_strips_leading_dot_and_anchors() {
        let m = compiled(PatternKind::Suffix, &["png", ".txt"]);
        assert!(m.is_match("a.PNG"));
        assert!(m.is_match("a.txt"));
        assert!(!m.is_match("a.png.zip"));
        assert!(!m.is_match("apng"));
    }

    #[test]
    fn terms_are_collected_once() {
        let m = compiled(PatternKind::Term, &["secret", "confidential"]);
        assert_eq!(
            m.terms("Secret plan, secret budget, CONFIDENTIAL"),
            vec!["Secret", "secret", "CONFIDENTIAL"]
        );
        assert!(m.terms("nothing here").is_empty());
    }

    #[test]
    fn unknown_target_gets_no_matcher() {
        let mut rule = Rule::new("odd");
        rule.match_target = MatchTarget::Unknown;
        rule.items = items(&["x"]);
        let matchers = compile(&[rule]);
        assert!(matchers.addresses.is_empty());
        assert!(matchers.attachments.is_empty());
        assert!(matchers.subjects.is_empty());
        assert!(matchers.bodies.is_empty());
    }

    #[test]
    fn subject_or_body_registers_both() {
        let mut rule = Rule::new("both");
        rule.match_target = MatchTarget::SubjectOrBody;
        rule.items = items(&["x"]);
        let matchers = compile(&[rule]);
        assert_eq!(matchers.subjects.len(), 1);
        assert_eq!(matchers.bodies.len(), 1);
        assert_eq!(matchers.subjects[0].rule, 0);
    }
}
