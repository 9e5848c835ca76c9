use std::collections::HashMap;

use tracing::debug;

use crate::{Layer, Rule, RuleKey, RuleLayers, RulePatch};

/// The merged view of the rule layers.
#[derive(Debug, Default)]
pub(crate) struct Merged {
    pub(crate) rules: Vec<Rule>,
    /// State of each rule after the base and override-base layers only.
    pub(crate) base_by_id: HashMap<String, Rule>,
}

/// Overlay the layers in priority order, keyed by rule id.
///
/// Only properties present on an incoming patch are assigned. Keys assigned by
/// the override layer are recorded as locked. Patches without an id are
/// skipped.
pub(crate) fn merge(layers: &RuleLayers) -> Merged {
    let mut merged = Merged::default();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (layer, patches) in layers.iter() {
        for patch in patches {
            let Some(id) = patch.id.as_deref().filter(|id| !id.is_empty()) else {
                debug!(?layer, "skipping rule without id");
                continue;
            };
            let position = *index.entry(id.to_owned()).or_insert_with(|| {
                merged.rules.push(Rule::new(id));
                merged.rules.len() - 1
            });
            let rule = &mut merged.rules[position];
            let assigned = rule.apply(patch);
            match layer {
                Layer::Override => rule.lock(assigned),
                Layer::Base | Layer::OverrideBase => {
                    merged.base_by_id.insert(id.to_owned(), rule.clone());
                }
                Layer::User => {}
            }
        }
    }

    debug!(
        rules = merged.rules.len(),
        base = merged.base_by_id.len(),
        "merged rule layers"
    );
    merged
}

/// Diff each rule against its merged base state. Unchanged and locked keys are
/// omitted, and rules left with nothing but an id are dropped.
pub(crate) fn export_user_rules(rules: &[Rule], base_by_id: &HashMap<String, Rule>) -> Vec<RulePatch> {
    rules
        .iter()
        .filter_map(|rule| {
            let mut patch = rule.to_patch();
            if let Some(base) = base_by_id.get(&rule.id) {
                for key in RuleKey::ALL {
                    if rule.same_value(base, key) {
                        patch.clear(key);
                    }
                }
            }
            for &key in rule.locked_keys() {
                patch.clear(key);
            }
            (!patch.is_empty()).then_some(patch)
        })
        .collect()
}
