use sendcheck::{
    Action, Highlight, ItemsSource, MatchTarget, MatchingRules, RuleError, RuleKey, RuleLayers,
    RulePatch,
};

fn ids(rules: &MatchingRules) -> Vec<&str> {
    rules.all().iter().map(|rule| rule.id.as_str()).collect()
}

fn three() -> MatchingRules {
    RuleLayers::new()
        .base(vec![
            RulePatch::new("one"),
            RulePatch::new("two"),
            RulePatch::new("three"),
        ])
        .build()
}

#[test]
fn merge_follows_layer_priority() {
    let rules = RuleLayers::new()
        .base(vec![
            RulePatch::new("base").items_local(["base"]),
            RulePatch::new("user").items_local(["base"]),
        ])
        .override_base(vec![RulePatch::new("base").items_local(["overrideBase"])])
        .user(vec![RulePatch::new("user").items_local(["user"])])
        .overrides(vec![
            RulePatch::new("base").items_file("/x"),
            RulePatch::new("override").items_local(["override"]),
        ])
        .build();

    assert_eq!(ids(&rules), ["base", "user", "override"]);

    let base = rules.get("base").unwrap();
    assert_eq!(base.items_local, ["overrideBase"]);
    assert_eq!(base.items_file, "/x");
    assert_eq!(base.locked_keys(), [RuleKey::ItemsFile]);

    let user = rules.get("user").unwrap();
    assert_eq!(user.items_local, ["user"]);
    assert!(user.locked_keys().is_empty());

    let over = rules.get("override").unwrap();
    assert_eq!(over.items_local, ["override"]);
    assert_eq!(over.locked_keys(), [RuleKey::ItemsLocal]);
}

#[test]
fn merged_rules_carry_factory_defaults() {
    let rules = RuleLayers::new()
        .base(vec![RulePatch::new("plain")])
        .build();
    let rule = rules.get("plain").unwrap();
    assert_eq!(rule.name, "");
    assert!(rule.enabled);
    assert_eq!(rule.match_target, MatchTarget::RecipientDomain);
    assert_eq!(rule.highlight, Highlight::Never);
    assert_eq!(rule.action, Action::None);
    assert_eq!(rule.items_source, ItemsSource::LocalConfig);
    assert!(rule.items_local.is_empty());
    assert!(rule.items.is_empty());
}

#[test]
fn override_wins_over_every_layer() {
    let rules = RuleLayers::new()
        .base(vec![RulePatch::new("r").action(Action::None)])
        .override_base(vec![RulePatch::new("r").action(Action::ReconfirmAlways)])
        .user(vec![RulePatch::new("r").action(Action::None)])
        .overrides(vec![RulePatch::new("r").action(Action::BlockAlways)])
        .build();
    let rule = rules.get("r").unwrap();
    assert_eq!(rule.action, Action::BlockAlways);
    assert!(rule.is_locked(RuleKey::Action));
}

#[test]
fn user_layer_cannot_remove_rules() {
    let rules = RuleLayers::new()
        .base(vec![RulePatch::new("kept").name("base")])
        .user(vec![RulePatch::new("other")])
        .build();
    assert_eq!(ids(&rules), ["kept", "other"]);
    assert_eq!(rules.get("kept").unwrap().name, "base");
}

#[test]
fn add_appends_in_order() {
    let mut rules = MatchingRules::default();
    for id in ["one", "two", "three"] {
        rules.add(&RulePatch::new(id)).unwrap();
    }
    assert_eq!(ids(&rules), ["one", "two", "three"]);
}

#[test]
fn remove_drops_the_rule() {
    let mut rules = three();
    let removed = rules.remove("two").unwrap();
    assert_eq!(removed.id, "two");
    assert_eq!(ids(&rules), ["one", "three"]);
    assert!(matches!(
        rules.remove("two"),
        Err(RuleError::UnknownRule { id }) if id == "two"
    ));
}

#[test]
fn move_up_stops_at_top() {
    let mut rules = three();
    rules.move_up("three").unwrap();
    assert_eq!(ids(&rules), ["one", "three", "two"]);
    rules.move_up("three").unwrap();
    assert_eq!(ids(&rules), ["three", "one", "two"]);
    rules.move_up("three").unwrap();
    assert_eq!(ids(&rules), ["three", "one", "two"]);
}

#[test]
fn move_down_stops_at_bottom() {
    let mut rules = three();
    rules.move_down("one").unwrap();
    assert_eq!(ids(&rules), ["two", "one", "three"]);
    rules.move_down("one").unwrap();
    assert_eq!(ids(&rules), ["two", "three", "one"]);
    rules.move_down("one").unwrap();
    assert_eq!(ids(&rules), ["two", "three", "one"]);
}

#[test]
fn export_of_untouched_rules_is_empty() {
    let rules = RuleLayers::new()
        .base(vec![
            RulePatch::new("a").highlight(Highlight::Always).items_local(["a.example"]),
            RulePatch::new("b").action(Action::BlockAlways),
        ])
        .override_base(vec![RulePatch::new("a").items_local(["admin.example"])])
        .build();
    assert!(rules.export_user_rules().is_empty());
}

#[test]
fn export_keeps_only_user_changes() {
    let mut rules = RuleLayers::new()
        .base(vec![RulePatch::new("a").name("A").items_local(["a.example"])])
        .build();
    rules
        .update("a", &RulePatch::default().enabled(false))
        .unwrap();
    rules
        .add(&RulePatch::new("mine").highlight(Highlight::Always))
        .unwrap();

    let exported = rules.export_user_rules();
    assert_eq!(exported.len(), 2);
    assert_eq!(exported[0], RulePatch::new("a").enabled(false));
    assert_eq!(exported[1].id.as_deref(), Some("mine"));
    assert_eq!(exported[1].highlight, Some(Highlight::Always));
}

#[test]
fn export_reverting_to_base_drops_the_rule() {
    let mut rules = RuleLayers::new()
        .base(vec![RulePatch::new("a").name("A")])
        .user(vec![RulePatch::new("a").name("mine")])
        .build();
    assert_eq!(rules.export_user_rules(), vec![RulePatch::new("a").name("mine")]);

    rules.update("a", &RulePatch::default().name("A")).unwrap();
    assert!(rules.export_user_rules().is_empty());
}

#[test]
fn exported_user_rules_reload_to_the_same_state() {
    let base = vec![
        RulePatch::new("a").name("A").items_local(["a.example"]),
        RulePatch::new("b").action(Action::ReconfirmAlways),
    ];
    let mut rules = RuleLayers::new().base(base.clone()).build();
    rules
        .update("b", &RulePatch::default().items_local(["b.example"]))
        .unwrap();

    let reloaded = RuleLayers::new()
        .base(base)
        .user(rules.export_user_rules())
        .build();
    assert_eq!(reloaded.all(), rules.all());
}

#[test]
fn locked_keys_survive_updates() {
    let mut rules = RuleLayers::new()
        .base(vec![RulePatch::new("r")])
        .overrides(vec![RulePatch::new("r").items_local(["locked.example"])])
        .build();
    let err = rules
        .update("r", &RulePatch::default().items_local(["mine.example"]))
        .unwrap_err();
    assert_eq!(err.to_string(), "'itemsLocal' of rule 'r' is locked by policy");
    assert_eq!(rules.get("r").unwrap().items_local, ["locked.example"]);
    assert!(rules.export_user_rules().is_empty());
}
