use sendcheck::{AttachmentClassifier, MatchTarget, Rule};

fn rule(id: &str, target: MatchTarget, items: &[&str]) -> Rule {
    let mut rule = Rule::new(id);
    rule.match_target = target;
    rule.items = items.iter().map(|item| (*item).to_owned()).collect();
    rule
}

#[test]
fn matched_rules_per_file() {
    let rules = [
        rule("without period", MatchTarget::AttachmentSuffix, &["png"]),
        rule("with period", MatchTarget::AttachmentSuffix, &[".png"]),
        rule("mixed", MatchTarget::AttachmentSuffix, &[".png", ".txt"]),
        rule("terms", MatchTarget::AttachmentName, &["NAME"]),
    ];
    let classifier = AttachmentClassifier::builder().rules(&rules).build().unwrap();

    let cases: &[(&str, &[&str])] = &[
        ("filename.png", &["without period", "with period", "mixed", "terms"]),
        ("filename.zip", &["terms"]),
        ("fakable-filename.png.zip", &["terms"]),
        ("uppercase-for-ignore-case.PNG", &["without period", "with period", "mixed"]),
        ("filename.txt", &["mixed", "terms"]),
        ("filename.xpi", &["terms"]),
    ];
    for (file, expected) in cases {
        assert_eq!(classifier.get_matched_rules(file), *expected, "{file}");
    }
}

fn check(predicate: impl Fn(&str) -> bool, files: &[&str], expected: &[bool]) {
    let actual: Vec<bool> = files.iter().map(|file| predicate(*file)).collect();
    assert_eq!(actual, expected, "{files:?}");
}

#[test]
fn attention_suffix() {
    for suffixes in [["png"], [".png"]] {
        let classifier = AttachmentClassifier::builder()
            .attention_suffixes(suffixes)
            .build()
            .unwrap();
        check(
            |f| classifier.has_attention_suffix(f),
            &["filename.png", "filename.zip", "filename.png.zip", "uppercase.PNG"],
            &[true, false, false, true],
        );
    }

    let classifier = AttachmentClassifier::builder()
        .attention_suffixes([".png", "txt"])
        .build()
        .unwrap();
    check(
        |f| classifier.has_attention_suffix(f),
        &["filename.png", "filename.zip", "filename.txt", "filename.xpi"],
        &[true, false, true, false],
    );
    assert!(!classifier.has_attention_suffix2("filename.png"));
}

#[test]
fn attention_suffix2_is_independent() {
    let classifier = AttachmentClassifier::builder()
        .attention_suffixes(["png"])
        .attention_suffixes2([".zip"])
        .build()
        .unwrap();
    check(
        |f| classifier.has_attention_suffix2(f),
        &["filename.png", "filename.zip", "filename.ZIP"],
        &[false, true, true],
    );
}

#[test]
fn attention_terms_match_anywhere() {
    let classifier = AttachmentClassifier::builder()
        .attention_terms(["secret", "社外秘"])
        .build()
        .unwrap();
    check(
        |f| classifier.has_attention_term(f),
        &["TopSecret.docx", "secretary.txt", "報告_社外秘.pdf", "public.pdf"],
        &[true, true, true, false],
    );
}

#[test]
fn populated_engine_rules_feed_the_classifier() {
    use sendcheck::{RuleLayers, RulePatch};

    let mut rules = RuleLayers::new()
        .base(vec![
            RulePatch::new("archives")
                .match_target(MatchTarget::AttachmentSuffix)
                .items_local(["zip"]),
            RulePatch::new("domains").items_local(["zip"]),
        ])
        .build();
    rules.populate_with(|_| None);
    let classifier = AttachmentClassifier::builder()
        .rules(rules.all())
        .build()
        .unwrap();
    assert_eq!(classifier.get_matched_rules("a.zip"), ["archives"]);
}
