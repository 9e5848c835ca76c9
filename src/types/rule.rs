use std::fmt;

use serde::{Deserialize, Serialize};

/// What part of an outgoing message a rule's items are matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchTarget {
    #[default]
    RecipientDomain,
    AttachmentName,
    AttachmentSuffix,
    Subject,
    Body,
    SubjectOrBody,
    /// Any value this crate does not know. Such rules never fire.
    #[serde(other)]
    Unknown,
}

/// The gate shared by highlight, reconfirm and block modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    WithAttachments,
    Externals,
    ExternalsWithAttachments,
}

/// Message-level facts a [`Condition`] is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageFacts {
    pub has_attachment: bool,
    pub has_external: bool,
}

impl Condition {
    #[must_use]
    pub const fn holds(self, facts: MessageFacts) -> bool {
        match self {
            Condition::Always => true,
            Condition::WithAttachments => facts.has_attachment,
            Condition::Externals => facts.has_external,
            Condition::ExternalsWithAttachments => facts.has_external && facts.has_attachment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Highlight {
    #[default]
    Never,
    Always,
    OnlyWithAttachments,
    OnlyExternals,
    OnlyExternalsWithAttachments,
}

impl Highlight {
    #[must_use]
    pub const fn condition(self) -> Option<Condition> {
        match self {
            Highlight::Never => None,
            Highlight::Always => Some(Condition::Always),
            Highlight::OnlyWithAttachments => Some(Condition::WithAttachments),
            Highlight::OnlyExternals => Some(Condition::Externals),
            Highlight::OnlyExternalsWithAttachments => Some(Condition::ExternalsWithAttachments),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    #[default]
    None,
    ReconfirmAlways,
    ReconfirmOnlyWithAttachments,
    ReconfirmOnlyExternals,
    ReconfirmOnlyExternalsWithAttachments,
    BlockAlways,
    BlockOnlyWithAttachments,
    BlockOnlyExternals,
    BlockOnlyExternalsWithAttachments,
}

impl Action {
    #[must_use]
    pub const fn reconfirm_condition(self) -> Option<Condition> {
        match self {
            Action::ReconfirmAlways => Some(Condition::Always),
            Action::ReconfirmOnlyWithAttachments => Some(Condition::WithAttachments),
            Action::ReconfirmOnlyExternals => Some(Condition::Externals),
            Action::ReconfirmOnlyExternalsWithAttachments => {
                Some(Condition::ExternalsWithAttachments)
            }
            _ => None,
        }
    }

    #[must_use]
    pub const fn block_condition(self) -> Option<Condition> {
        match self {
            Action::BlockAlways => Some(Condition::Always),
            Action::BlockOnlyWithAttachments => Some(Condition::WithAttachments),
            Action::BlockOnlyExternals => Some(Condition::Externals),
            Action::BlockOnlyExternalsWithAttachments => Some(Condition::ExternalsWithAttachments),
            _ => None,
        }
    }
}

/// Where a rule's items come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemsSource {
    #[default]
    LocalConfig,
    File,
}

/// Names of the configurable rule properties, as they appear in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKey {
    Name,
    Enabled,
    MatchTarget,
    Highlight,
    Action,
    ItemsSource,
    ItemsLocal,
    ItemsFile,
    ConfirmTitle,
    ConfirmMessage,
}

impl RuleKey {
    pub const ALL: [RuleKey; 10] = [
        RuleKey::Name,
        RuleKey::Enabled,
        RuleKey::MatchTarget,
        RuleKey::Highlight,
        RuleKey::Action,
        RuleKey::ItemsSource,
        RuleKey::ItemsLocal,
        RuleKey::ItemsFile,
        RuleKey::ConfirmTitle,
        RuleKey::ConfirmMessage,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RuleKey::Name => "name",
            RuleKey::Enabled => "enabled",
            RuleKey::MatchTarget => "matchTarget",
            RuleKey::Highlight => "highlight",
            RuleKey::Action => "action",
            RuleKey::ItemsSource => "itemsSource",
            RuleKey::ItemsLocal => "itemsLocal",
            RuleKey::ItemsFile => "itemsFile",
            RuleKey::ConfirmTitle => "confirmTitle",
            RuleKey::ConfirmMessage => "confirmMessage",
        }
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A merged, effective rule.
///
/// Produced by overlaying the configured rule layers (see
/// [`RuleLayers`](super::RuleLayers)). `items` stays empty until
/// [`MatchingRules::populate`](super::MatchingRules::populate) resolves it from
/// `items_local` or `items_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub match_target: MatchTarget,
    pub highlight: Highlight,
    pub action: Action,
    pub items_source: ItemsSource,
    pub items_local: Vec<String>,
    pub items_file: String,
    pub confirm_title: String,
    /// Template whose first `%s` / `$s` (any case) is replaced by the matched
    /// targets joined with newlines.
    pub confirm_message: String,
    pub items: Vec<String>,
    pub(crate) locked_keys: Vec<RuleKey>,
}

impl Rule {
    /// A rule carrying the factory defaults: enabled, recipient-domain target,
    /// never highlighted, no action, local items.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            enabled: true,
            match_target: MatchTarget::default(),
            highlight: Highlight::default(),
            action: Action::default(),
            items_source: ItemsSource::default(),
            items_local: Vec::new(),
            items_file: String::new(),
            confirm_title: String::new(),
            confirm_message: String::new(),
            items: Vec::new(),
            locked_keys: Vec::new(),
        }
    }

    /// Keys assigned by the admin-locked override layer.
    #[must_use]
    pub fn locked_keys(&self) -> &[RuleKey] {
        &self.locked_keys
    }

    #[must_use]
    pub fn is_locked(&self, key: RuleKey) -> bool {
        self.locked_keys.contains(&key)
    }

    pub(crate) fn lock(&mut self, keys: impl IntoIterator<Item = RuleKey>) {
        for key in keys {
            if !self.locked_keys.contains(&key) {
                self.locked_keys.push(key);
            }
        }
    }

    #[must_use]
    pub fn should_highlight(&self, facts: MessageFacts) -> bool {
        self.highlight.condition().is_some_and(|c| c.holds(facts))
    }

    #[must_use]
    pub fn should_reconfirm(&self, facts: MessageFacts) -> bool {
        self.action.reconfirm_condition().is_some_and(|c| c.holds(facts))
    }

    #[must_use]
    pub fn should_block(&self, facts: MessageFacts) -> bool {
        self.action.block_condition().is_some_and(|c| c.holds(facts))
    }

    /// Assign every property present on `patch` and return the keys that were
    /// assigned. The patch's `id` is never applied.
    pub(crate) fn apply(&mut self, patch: &RulePatch) -> Vec<RuleKey> {
        let mut assigned = Vec::new();
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
            assigned.push(RuleKey::Name);
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
            assigned.push(RuleKey::Enabled);
        }
        if let Some(match_target) = patch.match_target {
            self.match_target = match_target;
            assigned.push(RuleKey::MatchTarget);
        }
        if let Some(highlight) = patch.highlight {
            self.highlight = highlight;
            assigned.push(RuleKey::Highlight);
        }
        if let Some(action) = patch.action {
            self.action = action;
            assigned.push(RuleKey::Action);
        }
        if let Some(items_source) = patch.items_source {
            self.items_source = items_source;
            assigned.push(RuleKey::ItemsSource);
        }
        if let Some(items_local) = &patch.items_local {
            self.items_local.clone_from(items_local);
            assigned.push(RuleKey::ItemsLocal);
        }
        if let Some(items_file) = &patch.items_file {
            self.items_file.clone_from(items_file);
            assigned.push(RuleKey::ItemsFile);
        }
        if let Some(confirm_title) = &patch.confirm_title {
            self.confirm_title.clone_from(confirm_title);
            assigned.push(RuleKey::ConfirmTitle);
        }
        if let Some(confirm_message) = &patch.confirm_message {
            self.confirm_message.clone_from(confirm_message);
            assigned.push(RuleKey::ConfirmMessage);
        }
        assigned
    }

    /// Every configurable property of this rule as a patch.
    #[must_use]
    pub fn to_patch(&self) -> RulePatch {
        RulePatch {
            id: Some(self.id.clone()),
            name: Some(self.name.clone()),
            enabled: Some(self.enabled),
            match_target: Some(self.match_target),
            highlight: Some(self.highlight),
            action: Some(self.action),
            items_source: Some(self.items_source),
            items_local: Some(self.items_local.clone()),
            items_file: Some(self.items_file.clone()),
            confirm_title: Some(self.confirm_title.clone()),
            confirm_message: Some(self.confirm_message.clone()),
        }
    }

    pub(crate) fn same_value(&self, other: &Rule, key: RuleKey) -> bool {
        match key {
            RuleKey::Name => self.name == other.name,
            RuleKey::Enabled => self.enabled == other.enabled,
            RuleKey::MatchTarget => self.match_target == other.match_target,
            RuleKey::Highlight => self.highlight == other.highlight,
            RuleKey::Action => self.action == other.action,
            RuleKey::ItemsSource => self.items_source == other.items_source,
            RuleKey::ItemsLocal => self.items_local == other.items_local,
            RuleKey::ItemsFile => self.items_file == other.items_file,
            RuleKey::ConfirmTitle => self.confirm_title == other.confirm_title,
            RuleKey::ConfirmMessage => self.confirm_message == other.confirm_message,
        }
    }
}

/// A rule as configured on one layer: every property is optional, and an
/// absent property leaves the value from lower layers untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_target: Option<MatchTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_source: Option<ItemsSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_local: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_message: Option<String>,
}

impl RulePatch {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn match_target(mut self, match_target: MatchTarget) -> Self {
        self.match_target = Some(match_target);
        self
    }

    #[must_use]
    pub fn highlight(mut self, highlight: Highlight) -> Self {
        self.highlight = Some(highlight);
        self
    }

    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn items_source(mut self, items_source: ItemsSource) -> Self {
        self.items_source = Some(items_source);
        self
    }

    #[must_use]
    pub fn items_local<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items_local = Some(items.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn items_file(mut self, path: impl Into<String>) -> Self {
        self.items_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn confirm_title(mut self, title: impl Into<String>) -> Self {
        self.confirm_title = Some(title.into());
        self
    }

    #[must_use]
    pub fn confirm_message(mut self, message: impl Into<String>) -> Self {
        self.confirm_message = Some(message.into());
        self
    }

    /// The keys present on this patch, excluding `id`.
    #[must_use]
    pub fn keys(&self) -> Vec<RuleKey> {
        RuleKey::ALL
            .into_iter()
            .filter(|&key| self.has(key))
            .collect()
    }

    /// `true` when nothing but (at most) the id is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !RuleKey::ALL.into_iter().any(|key| self.has(key))
    }

    #[must_use]
    pub fn has(&self, key: RuleKey) -> bool {
        match key {
            RuleKey::Name => self.name.is_some(),
            RuleKey::Enabled => self.enabled.is_some(),
            RuleKey::MatchTarget => self.match_target.is_some(),
            RuleKey::Highlight => self.highlight.is_some(),
            RuleKey::Action => self.action.is_some(),
            RuleKey::ItemsSource => self.items_source.is_some(),
            RuleKey::ItemsLocal => self.items_local.is_some(),
            RuleKey::ItemsFile => self.items_file.is_some(),
            RuleKey::ConfirmTitle => self.confirm_title.is_some(),
            RuleKey::ConfirmMessage => self.confirm_message.is_some(),
        }
    }

    pub fn clear(&mut self, key: RuleKey) {
        match key {
            RuleKey::Name => self.name = None,
            RuleKey::Enabled => self.enabled = None,
            RuleKey::MatchTarget => self.match_target = None,
            RuleKey::Highlight => self.highlight = None,
            RuleKey::Action => self.action = None,
            RuleKey::ItemsSource => self.items_source = None,
            RuleKey::ItemsLocal => self.items_local = None,
            RuleKey::ItemsFile => self.items_file = None,
            RuleKey::ConfirmTitle => self.confirm_title = None,
            RuleKey::ConfirmMessage => self.confirm_message = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditions_gate_on_message_facts() {
        let none = MessageFacts::default();
        let attached = MessageFacts {
            has_attachment: true,
            has_external: false,
        };
        let external = MessageFacts {
            has_attachment: false,
            has_external: true,
        };
        let both = MessageFacts {
            has_attachment: true,
            has_external: true,
        };

        assert!(Condition::Always.holds(none));
        assert!(!Condition::WithAttachments.holds(none));
        assert!(Condition::WithAttachments.holds(attached));
        assert!(!Condition::Externals.holds(attached));
        assert!(Condition::Externals.holds(external));
        assert!(!Condition::ExternalsWithAttachments.holds(external));
        assert!(!Condition::ExternalsWithAttachments.holds(attached));
        assert!(Condition::ExternalsWithAttachments.holds(both));
    }

    #[test]
    fn reconfirm_and_block_do_not_overlap() {
        assert_eq!(Action::None.reconfirm_condition(), None);
        assert_eq!(Action::None.block_condition(), None);
        assert_eq!(
            Action::ReconfirmOnlyExternals.reconfirm_condition(),
            Some(Condition::Externals)
        );
        assert_eq!(Action::ReconfirmOnlyExternals.block_condition(), None);
        assert_eq!(
            Action::BlockOnlyWithAttachments.block_condition(),
            Some(Condition::WithAttachments)
        );
        assert_eq!(Action::BlockOnlyWithAttachments.reconfirm_condition(), None);
    }

    #[test]
    fn apply_assigns_only_present_keys() {
        let mut rule = Rule::new("r");
        rule.name = "kept".into();
        let assigned = rule.apply(&RulePatch::new("ignored").items_file("/x").enabled(false));
        assert_eq!(assigned, vec![RuleKey::Enabled, RuleKey::ItemsFile]);
        assert_eq!(rule.id, "r");
        assert_eq!(rule.name, "kept");
        assert_eq!(rule.items_file, "/x");
        assert!(!rule.enabled);
    }

    #[test]
    fn patch_keys_and_clear() {
        let mut patch = RulePatch::new("r").name("n").action(Action::BlockAlways);
        assert_eq!(patch.keys(), vec![RuleKey::Name, RuleKey::Action]);
        patch.clear(RuleKey::Name);
        patch.clear(RuleKey::Action);
        assert!(patch.is_empty());
        assert_eq!(patch.id.as_deref(), Some("r"));
    }

    #[test]
    fn unknown_match_target_deserializes() {
        let patch: RulePatch =
            serde_json::from_str(r#"{"id":"x","matchTarget":"sender-domain"}"#).unwrap();
        assert_eq!(patch.match_target, Some(MatchTarget::Unknown));
    }

    #[test]
    fn patch_serializes_without_absent_keys() {
        let patch = RulePatch::new("x").items_local(["a", "b"]);
        assert_eq!(
            serde_json::to_string(&patch).unwrap(),
            r#"{"id":"x","itemsLocal":["a","b"]}"#
        );
    }
}
