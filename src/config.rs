use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    AttachmentClassifier, CompileError, MatchingRules, RecipientClassifier, Rule, RuleLayers,
    RulePatch, RulePermissions, SendPolicy, SendcheckError,
};

/// The persisted settings the engine pieces are built from.
///
/// Keys are camelCase and every key is optional.
///
/// # Example
///
/// ```
/// use sendcheck::Configs;
///
/// let configs = Configs::from_json(r#"{
///     "internalDomains": ["example.com"],
///     "baseRules": [{ "id": "partners", "highlight": "always", "itemsLocal": ["partner.example"] }]
/// }"#).unwrap();
/// let rules = configs.matching_rules();
/// assert!(rules.get("partners").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configs {
    pub internal_domains: Vec<String>,
    pub attention_domains: Vec<String>,
    pub blocked_domains: Vec<String>,
    pub attention_suffixes: Vec<String>,
    pub attention_suffixes2: Vec<String>,
    pub attention_terms: Vec<String>,
    pub base_rules: Vec<RulePatch>,
    pub override_base_rules: Vec<RulePatch>,
    pub user_rules: Vec<RulePatch>,
    pub override_rules: Vec<RulePatch>,
    pub allow_add_rules: bool,
    pub allow_remove_rules: bool,
    pub allow_rearrange_rules: bool,
    pub skip_confirmation_for_internal_mail: bool,
    pub min_confirmation_recipients_count: usize,
    pub confirm_multiple_recipient_domains: bool,
}

impl Default for Configs {
    fn default() -> Self {
        Self {
            internal_domains: Vec::new(),
            attention_domains: Vec::new(),
            blocked_domains: Vec::new(),
            attention_suffixes: Vec::new(),
            attention_suffixes2: Vec::new(),
            attention_terms: Vec::new(),
            base_rules: Vec::new(),
            override_base_rules: Vec::new(),
            user_rules: Vec::new(),
            override_rules: Vec::new(),
            allow_add_rules: true,
            allow_remove_rules: true,
            allow_rearrange_rules: true,
            skip_confirmation_for_internal_mail: false,
            min_confirmation_recipients_count: 0,
            confirm_multiple_recipient_domains: false,
        }
    }
}

impl Configs {
    /// # Errors
    ///
    /// Returns [`SendcheckError::Json`] if `input` is not a valid settings
    /// document.
    pub fn from_json(input: &str) -> Result<Self, SendcheckError> {
        let configs: Self = serde_json::from_str(input)?;
        debug!(
            base = configs.base_rules.len(),
            override_base = configs.override_base_rules.len(),
            user = configs.user_rules.len(),
            overrides = configs.override_rules.len(),
            "loaded configs"
        );
        Ok(configs)
    }

    /// # Errors
    ///
    /// Returns [`SendcheckError`] on I/O or JSON failure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SendcheckError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_json(&input)
    }

    /// # Errors
    ///
    /// Returns [`SendcheckError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SendcheckError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub fn rule_layers(&self) -> RuleLayers {
        RuleLayers {
            base_rules: self.base_rules.clone(),
            override_base_rules: self.override_base_rules.clone(),
            user_rules: self.user_rules.clone(),
            override_rules: self.override_rules.clone(),
        }
    }

    #[must_use]
    pub fn permissions(&self) -> RulePermissions {
        RulePermissions {
            allow_add: self.allow_add_rules,
            allow_remove: self.allow_remove_rules,
            allow_rearrange: self.allow_rearrange_rules,
        }
    }

    /// The merged rule engine, not yet populated.
    #[must_use]
    pub fn matching_rules(&self) -> MatchingRules {
        self.rule_layers()
            .build()
            .with_permissions(self.permissions())
    }

    /// Store the user customizations of `rules` as the user layer.
    pub fn save_user_rules(&mut self, rules: &MatchingRules) {
        self.user_rules = rules.export_user_rules();
    }

    #[must_use]
    pub fn recipient_classifier(&self) -> RecipientClassifier {
        RecipientClassifier::new()
            .internal_domains(&self.internal_domains)
            .attention_domains(&self.attention_domains)
            .blocked_domains(&self.blocked_domains)
    }

    /// An attachment classifier over `rules`, which should already be
    /// populated.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if a pattern list does not compile.
    pub fn attachment_classifier(&self, rules: &[Rule]) -> Result<AttachmentClassifier, CompileError> {
        AttachmentClassifier::builder()
            .rules(rules)
            .attention_suffixes(self.attention_suffixes.iter().cloned())
            .attention_suffixes2(self.attention_suffixes2.iter().cloned())
            .attention_terms(self.attention_terms.iter().cloned())
            .build()
    }

    #[must_use]
    pub fn send_policy(&self) -> SendPolicy {
        SendPolicy {
            skip_confirmation_for_internal_mail: self.skip_confirmation_for_internal_mail,
            min_confirmation_recipients_count: self.min_confirmation_recipients_count,
            confirm_multiple_recipient_domains: self.confirm_multiple_recipient_domains,
        }
    }
}
