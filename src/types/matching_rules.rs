use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::classification::Classified;
use super::error::{CompileError, RuleError};
use super::message::{Attachment, ClassifiedRecipient, OutgoingMessage};
use super::prompt::{Alert, Confirm, ItemsReader};
use super::rule::{ItemsSource, Rule, RulePatch};
use crate::compile::{self, Matchers};
use crate::evaluate;
use crate::parse::parse_items;

/// One of the four rule layers, lowest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Factory defaults.
    Base,
    /// Admin-provided defaults.
    OverrideBase,
    /// End-user customizations.
    User,
    /// Admin-locked policy. Keys it assigns become locked.
    Override,
}

/// The four configured rule layers a [`MatchingRules`] engine is merged from.
///
/// # Example
///
/// ```
/// use sendcheck::{Highlight, RuleLayers, RulePatch};
///
/// let rules = RuleLayers::new()
///     .base(vec![RulePatch::new("partners").highlight(Highlight::Always)])
///     .user(vec![RulePatch::new("partners").items_local(["example.com"])])
///     .build();
/// assert_eq!(rules.get("partners").unwrap().items_local, ["example.com"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleLayers {
    pub base_rules: Vec<RulePatch>,
    pub override_base_rules: Vec<RulePatch>,
    pub user_rules: Vec<RulePatch>,
    pub override_rules: Vec<RulePatch>,
}

impl RuleLayers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn base(mut self, rules: impl IntoIterator<Item = RulePatch>) -> Self {
        self.base_rules.extend(rules);
        self
    }

    #[must_use]
    pub fn override_base(mut self, rules: impl IntoIterator<Item = RulePatch>) -> Self {
        self.override_base_rules.extend(rules);
        self
    }

    #[must_use]
    pub fn user(mut self, rules: impl IntoIterator<Item = RulePatch>) -> Self {
        self.user_rules.extend(rules);
        self
    }

    #[must_use]
    pub fn overrides(mut self, rules: impl IntoIterator<Item = RulePatch>) -> Self {
        self.override_rules.extend(rules);
        self
    }

    /// Layers in merge order.
    pub fn iter(&self) -> impl Iterator<Item = (Layer, &[RulePatch])> {
        [
            (Layer::Base, self.base_rules.as_slice()),
            (Layer::OverrideBase, self.override_base_rules.as_slice()),
            (Layer::User, self.user_rules.as_slice()),
            (Layer::Override, self.override_rules.as_slice()),
        ]
        .into_iter()
    }

    /// Merge the layers into an engine that allows every rule operation.
    #[must_use]
    pub fn build(&self) -> MatchingRules {
        MatchingRules::new(self)
    }
}

/// Which rule management operations the user may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RulePermissions {
    pub allow_add: bool,
    pub allow_remove: bool,
    pub allow_rearrange: bool,
}

impl Default for RulePermissions {
    fn default() -> Self {
        Self {
            allow_add: true,
            allow_remove: true,
            allow_rearrange: true,
        }
    }
}

/// The merged, effective rule list and everything derived from it.
///
/// Built from [`RuleLayers`]. Rule items must be resolved with
/// [`populate`](Self::populate) (or [`populate_with`](Self::populate_with))
/// before classification; until then every rule has an empty item list and
/// never matches.
///
/// Matchers are compiled once per populated state, eagerly at the end of
/// `populate` and otherwise on first use, so a shared `&MatchingRules` can be
/// queried from several threads.
#[derive(Debug, Default)]
pub struct MatchingRules {
    rules: Vec<Rule>,
    base_by_id: HashMap<String, Rule>,
    permissions: RulePermissions,
    populated: bool,
    matchers: OnceLock<Matchers>,
    generated: u64,
}

impl MatchingRules {
    #[must_use]
    pub fn new(layers: &RuleLayers) -> Self {
        let merged = crate::merge::merge(layers);
        Self {
            rules: merged.rules,
            base_by_id: merged.base_by_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_permissions(mut self, permissions: RulePermissions) -> Self {
        self.permissions = permissions;
        self
    }

    #[must_use]
    pub fn permissions(&self) -> RulePermissions {
        self.permissions
    }

    /// Every rule in evaluation order.
    #[must_use]
    pub fn all(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn position(&self, id: &str) -> Result<usize, RuleError> {
        self.rules
            .iter()
            .position(|rule| rule.id == id)
            .ok_or_else(|| RuleError::UnknownRule { id: id.to_owned() })
    }

    /// Append a new rule built from `patch` on top of the factory defaults.
    ///
    /// The patch's id is used when present; otherwise a fresh one is
    /// generated.
    ///
    /// # Errors
    ///
    /// [`RuleError::NotAllowed`] when adding is forbidden, and
    /// [`RuleError::DuplicateRule`] when the id is already taken.
    pub fn add(&mut self, patch: &RulePatch) -> Result<&Rule, RuleError> {
        if !self.permissions.allow_add {
            return Err(RuleError::NotAllowed {
                operation: "adding",
            });
        }
        let id = match patch.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) if self.get(id).is_some() => {
                return Err(RuleError::DuplicateRule { id: id.to_owned() });
            }
            Some(id) => id.to_owned(),
            None => self.generate_id(),
        };
        let mut rule = Rule::new(id);
        rule.apply(patch);
        debug!(rule = %rule.id, "added rule");
        self.rules.push(rule);
        self.reset_items();
        Ok(&self.rules[self.rules.len() - 1])
    }

    fn generate_id(&mut self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        loop {
            self.generated += 1;
            let id = format!("rule-{millis}-{}", self.generated);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Assign the keys present on `patch` to rule `id`.
    ///
    /// # Errors
    ///
    /// [`RuleError::UnknownRule`] for a missing rule and
    /// [`RuleError::LockedKey`] when the patch touches a key locked by the
    /// override layer. Nothing is assigned on error.
    pub fn update(&mut self, id: &str, patch: &RulePatch) -> Result<&Rule, RuleError> {
        let position = self.position(id)?;
        let rule = &mut self.rules[position];
        if let Some(key) = patch.keys().into_iter().find(|&key| rule.is_locked(key)) {
            return Err(RuleError::LockedKey {
                id: id.to_owned(),
                key,
            });
        }
        let assigned = rule.apply(patch);
        debug!(rule = %id, ?assigned, "updated rule");
        self.reset_items();
        Ok(&self.rules[position])
    }

    /// # Errors
    ///
    /// [`RuleError::NotAllowed`] when removing is forbidden and
    /// [`RuleError::UnknownRule`] for a missing rule.
    pub fn remove(&mut self, id: &str) -> Result<Rule, RuleError> {
        if !self.permissions.allow_remove {
            return Err(RuleError::NotAllowed {
                operation: "removing",
            });
        }
        let position = self.position(id)?;
        let removed = self.rules.remove(position);
        self.matchers.take();
        debug!(rule = %id, "removed rule");
        Ok(removed)
    }

    /// Swap rule `id` with its predecessor. A no-op for the first rule.
    ///
    /// # Errors
    ///
    /// [`RuleError::NotAllowed`] when rearranging is forbidden and
    /// [`RuleError::UnknownRule`] for a missing rule.
    pub fn move_up(&mut self, id: &str) -> Result<(), RuleError> {
        let position = self.rearrangeable(id)?;
        if position > 0 {
            self.rules.swap(position - 1, position);
            self.matchers.take();
        }
        Ok(())
    }

    /// Swap rule `id` with its successor. A no-op for the last rule.
    ///
    /// # Errors
    ///
    /// Same as [`move_up`](Self::move_up).
    pub fn move_down(&mut self, id: &str) -> Result<(), RuleError> {
        let position = self.rearrangeable(id)?;
        if position + 1 < self.rules.len() {
            self.rules.swap(position, position + 1);
            self.matchers.take();
        }
        Ok(())
    }

    fn rearrangeable(&self, id: &str) -> Result<usize, RuleError> {
        if !self.permissions.allow_rearrange {
            return Err(RuleError::NotAllowed {
                operation: "rearranging",
            });
        }
        self.position(id)
    }

    /// The user customizations to persist: for each rule, the keys whose
    /// value differs from the merged base and override-base layers, minus
    /// locked keys. Rules with no such key are left out.
    #[must_use]
    pub fn export_user_rules(&self) -> Vec<RulePatch> {
        crate::merge::export_user_rules(&self.rules, &self.base_by_id)
    }

    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Resolve every rule's `items`, reading file sources through `reader`.
    ///
    /// File reads are issued together and joined before returning. Runs
    /// once: later calls return immediately until a rule is added or
    /// updated. A failed or empty read leaves that rule with no items.
    pub async fn populate<R: ItemsReader>(&mut self, reader: &R) {
        if self.populated {
            return;
        }
        let reads = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| {
                rule.items_source == ItemsSource::File && !rule.items_file.is_empty()
            })
            .map(|(index, rule)| async move { (index, reader.read(&rule.items_file).await) });
        let contents = join_all(reads).await;

        for rule in &mut self.rules {
            rule.items = match rule.items_source {
                ItemsSource::LocalConfig => rule.items_local.clone(),
                ItemsSource::File => Vec::new(),
            };
        }
        for (index, read) in contents {
            let rule = &mut self.rules[index];
            match read {
                Ok(contents) => rule.items = parse_items(&contents),
                Err(error) => {
                    warn!(rule = %rule.id, path = %rule.items_file, %error, "cannot read items file");
                }
            }
        }
        self.finish_populate();
    }

    /// Synchronous [`populate`](Self::populate): `read` returns the contents
    /// of a file, or `None` when it cannot be read.
    pub fn populate_with(&mut self, mut read: impl FnMut(&str) -> Option<String>) {
        if self.populated {
            return;
        }
        for rule in &mut self.rules {
            rule.items = match rule.items_source {
                ItemsSource::LocalConfig => rule.items_local.clone(),
                ItemsSource::File if rule.items_file.is_empty() => Vec::new(),
                ItemsSource::File => read(&rule.items_file)
                    .map(|contents| parse_items(&contents))
                    .unwrap_or_default(),
            };
        }
        self.finish_populate();
    }

    fn finish_populate(&mut self) {
        self.populated = true;
        self.matchers.take();
        let matchers = self.matchers();
        debug!(
            rules = self.rules.len(),
            addresses = matchers.addresses.len(),
            "populated rule items"
        );
    }

    fn reset_items(&mut self) {
        self.populated = false;
        self.matchers.take();
    }

    /// Check that the items of every rule compile into a pattern.
    ///
    /// Classification never fails: a rule whose patterns do not compile simply
    /// never matches. This reports such rules up front.
    ///
    /// # Errors
    ///
    /// The first [`CompileError`] in rule order.
    pub fn validate(&self) -> Result<(), CompileError> {
        compile::validate(&self.rules)
    }

    pub(crate) fn matchers(&self) -> &Matchers {
        self.matchers.get_or_init(|| compile::compile(&self.rules))
    }

    // -- Classification ------------------------------------------------------

    pub fn classify_highlight_recipients<'m>(
        &self,
        message: &OutgoingMessage<'m>,
    ) -> Classified<'m, ClassifiedRecipient> {
        evaluate::classify_recipients(
            &self.rules,
            &self.matchers().addresses,
            message,
            Rule::should_highlight,
        )
    }

    pub fn classify_reconfirm_recipients<'m>(
        &self,
        message: &OutgoingMessage<'m>,
    ) -> Classified<'m, ClassifiedRecipient> {
        evaluate::classify_recipients(
            &self.rules,
            &self.matchers().addresses,
            message,
            Rule::should_reconfirm,
        )
    }

    pub fn classify_block_recipients<'m>(
        &self,
        message: &OutgoingMessage<'m>,
    ) -> Classified<'m, ClassifiedRecipient> {
        evaluate::classify_recipients(
            &self.rules,
            &self.matchers().addresses,
            message,
            Rule::should_block,
        )
    }

    pub fn classify_highlight_attachments<'m>(
        &self,
        message: &OutgoingMessage<'m>,
    ) -> Classified<'m, Attachment> {
        evaluate::classify_attachments(
            &self.rules,
            &self.matchers().attachments,
            message,
            Rule::should_highlight,
        )
    }

    pub fn classify_reconfirm_attachments<'m>(
        &self,
        message: &OutgoingMessage<'m>,
    ) -> Classified<'m, Attachment> {
        evaluate::classify_attachments(
            &self.rules,
            &self.matchers().attachments,
            message,
            Rule::should_reconfirm,
        )
    }

    pub fn classify_block_attachments<'m>(
        &self,
        message: &OutgoingMessage<'m>,
    ) -> Classified<'m, Attachment> {
        evaluate::classify_attachments(
            &self.rules,
            &self.matchers().attachments,
            message,
            Rule::should_block,
        )
    }

    // -- Highlighting --------------------------------------------------------

    /// Distinct addresses of recipients any rule highlights.
    #[must_use]
    pub fn get_highlighted_recipient_addresses(&self, message: &OutgoingMessage<'_>) -> Vec<String> {
        evaluate::distinct(&self.classify_highlight_recipients(message), |recipient| {
            recipient.address.as_str()
        })
    }

    /// Distinct names of attachments any rule highlights.
    #[must_use]
    pub fn get_highlighted_attachment_names(&self, message: &OutgoingMessage<'_>) -> Vec<String> {
        evaluate::distinct(&self.classify_highlight_attachments(message), |attachment| {
            attachment.name.as_str()
        })
    }

    #[must_use]
    pub fn should_highlight_subject(&self, message: &OutgoingMessage<'_>) -> bool {
        message.subject.is_some_and(|subject| {
            !evaluate::match_text(
                &self.rules,
                &self.matchers().subjects,
                subject,
                message.facts(),
                Rule::should_highlight,
            )
            .is_empty()
        })
    }

    #[must_use]
    pub fn should_highlight_body(&self, message: &OutgoingMessage<'_>) -> bool {
        message.body.is_some_and(|body| {
            !evaluate::match_text(
                &self.rules,
                &self.matchers().bodies,
                body,
                message.facts(),
                Rule::should_highlight,
            )
            .is_empty()
        })
    }

    // -- Workflows -----------------------------------------------------------

    /// Ask `confirm` about every rule that requires reconfirmation, in order:
    /// recipients, attachments, subject, body.
    ///
    /// Returns `true` when every prompt was confirmed (or none was needed).
    /// Stops at the first prompt answered `false` or failing with an error.
    pub async fn try_reconfirm<C: Confirm>(
        &self,
        message: &OutgoingMessage<'_>,
        confirm: &mut C,
    ) -> bool {
        crate::workflow::try_reconfirm(self, message, confirm).await
    }

    /// Alert about the first rule that blocks sending, in the same phase order
    /// as [`try_reconfirm`](Self::try_reconfirm).
    ///
    /// Returns `true` when a rule blocked, even if the alert itself failed.
    /// At most one alert is raised per call.
    pub async fn try_block<A: Alert>(&self, message: &OutgoingMessage<'_>, alert: &mut A) -> bool {
        crate::workflow::try_block(self, message, alert).await
    }
}

impl fmt::Display for MatchingRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MatchingRules({} rules, {} enabled, {})",
            self.rules.len(),
            self.rules.iter().filter(|rule| rule.enabled).count(),
            if self.populated { "populated" } else { "unpopulated" },
        )
    }
}
