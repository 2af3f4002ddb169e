use std::collections::{BTreeMap, BTreeSet};

use foa_tagger::{
    data::gold::GoldLabels,
    eval::{annotator_agreement, evaluate, kappa::cohen_kappa},
    ontology::{OntologySnapshot, TagId},
};

fn set(paths: &[&str]) -> BTreeSet<TagId> {
    paths
        .iter()
        .map(|path| path.parse().expect("valid tag"))
        .collect()
}

fn gold(entries: &[(&str, &[&str])]) -> GoldLabels {
    let mut labels = BTreeMap::new();
    for (doc_id, paths) in entries {
        labels.insert((*doc_id).to_string(), set(paths));
    }
    GoldLabels { labels }
}

#[test]
fn one_hit_one_miss_one_extra_scores_half() {
    let mut predicted = BTreeMap::new();
    predicted.insert(
        "doc-1".to_string(),
        set(&[
            "research_domains/artificial_intelligence",
            "methods/longitudinal_study",
        ]),
    );
    let gold = gold(&[(
        "doc-1",
        [
            "research_domains/artificial_intelligence",
            "populations/veterans",
        ]
        .as_slice(),
    )]);
    let report = evaluate(&predicted, &gold);
    assert_eq!(report.documents, 1);
    let doc = &report.per_document["doc-1"];
    assert_eq!(doc.true_positives, 1);
    assert_eq!(doc.false_positives, 1);
    assert_eq!(doc.false_negatives, 1);
    assert_eq!(doc.f1, 0.5);
    insta::assert_json_snapshot!(report.micro, @r###"
    {
      "true_positives": 1,
      "false_positives": 1,
      "false_negatives": 1,
      "precision": 0.5,
      "recall": 0.5,
      "f1": 0.5
    }
    "###);
}

#[test]
fn macro_f1_averages_per_tag_rows() {
    let mut predicted = BTreeMap::new();
    predicted.insert(
        "doc-1".to_string(),
        set(&[
            "research_domains/artificial_intelligence",
            "methods/longitudinal_study",
            "populations/veterans",
        ]),
    );
    let gold = gold(&[(
        "doc-1",
        [
            "research_domains/artificial_intelligence",
            "methods/longitudinal_study",
            "sponsor_themes/open_science",
        ]
        .as_slice(),
    )]);
    let report = evaluate(&predicted, &gold);
    // two perfect tags, one false positive, one false negative
    assert_eq!(report.per_tag.len(), 4);
    assert_eq!(report.per_tag["populations/veterans"].f1, 0.0);
    assert_eq!(report.per_tag["methods/longitudinal_study"].f1, 1.0);
    assert_eq!(report.macro_f1, 0.5);
}

#[test]
fn untagged_documents_still_cost_recall() {
    let predicted = BTreeMap::new();
    let gold = gold(&[("doc-1", ["populations/veterans"].as_slice())]);
    let report = evaluate(&predicted, &gold);
    assert_eq!(report.documents, 1);
    assert_eq!(report.micro.false_negatives, 1);
    assert_eq!(report.micro.recall, 0.0);
    assert_eq!(report.micro.f1, 0.0);
}

#[test]
fn unexpected_documents_still_cost_precision() {
    let mut predicted = BTreeMap::new();
    predicted.insert("doc-9".to_string(), set(&["populations/veterans"]));
    let gold = gold(&[]);
    let report = evaluate(&predicted, &gold);
    assert_eq!(report.micro.false_positives, 1);
    assert_eq!(report.micro.precision, 0.0);
}

#[test]
fn kappa_is_one_for_identical_annotators() {
    let decisions = vec![(true, true), (false, false), (true, true)];
    assert_eq!(cohen_kappa(&decisions), 1.0);
}

#[test]
fn kappa_is_zero_at_chance_agreement() {
    let decisions = vec![(true, true), (true, false), (false, true), (false, false)];
    assert_eq!(cohen_kappa(&decisions), 0.0);
}

#[test]
fn kappa_is_negative_for_systematic_disagreement() {
    let decisions = vec![(true, false), (false, true)];
    assert_eq!(cohen_kappa(&decisions), -1.0);
}

#[test]
fn kappa_handles_degenerate_marginals() {
    // both annotators constant and agreeing: chance agreement is 1
    assert_eq!(cohen_kappa(&[(true, true), (true, true)]), 1.0);
    // both constant and never agreeing
    assert_eq!(cohen_kappa(&[(true, false), (true, false)]), 0.0);
    assert_eq!(cohen_kappa(&[]), 0.0);
}

#[test]
fn agreement_rolls_up_per_category() {
    let snapshot = OntologySnapshot::from_yaml_str(
        r#"
populations:
  - veterans
  - older_adults
"#,
    )
    .expect("valid vocab");
    let annotator_a = gold(&[
        ("doc-1", ["populations/veterans"].as_slice()),
        (
            "doc-2",
            ["populations/veterans", "populations/older_adults"].as_slice(),
        ),
    ]);
    let annotator_b = annotator_a.clone();
    let rollup = annotator_agreement(&snapshot, &[annotator_a, annotator_b]);
    let populations = &rollup["populations"];
    assert_eq!(populations.pairs, 1);
    assert_eq!(populations.items, 4);
    assert_eq!(populations.kappa, 1.0);
    // categories without entries are omitted
    assert!(!rollup.contains_key("methods"));
}

#[test]
fn partial_overlap_scores_half() {
    let snapshot = OntologySnapshot::from_yaml_str(
        r#"
populations:
  - veterans
  - older_adults
"#,
    )
    .expect("valid vocab");
    let annotator_a = gold(&[
        ("doc-1", ["populations/veterans"].as_slice()),
        (
            "doc-2",
            ["populations/veterans", "populations/older_adults"].as_slice(),
        ),
    ]);
    let annotator_b = gold(&[
        ("doc-1", ["populations/veterans"].as_slice()),
        ("doc-2", ["populations/veterans"].as_slice()),
    ]);
    let rollup = annotator_agreement(&snapshot, &[annotator_a, annotator_b]);
    assert_eq!(rollup["populations"].kappa, 0.5);
}

#[test]
fn fewer_than_two_sets_yields_no_agreement() {
    let snapshot =
        OntologySnapshot::from_yaml_str("populations:\n  - veterans\n").expect("valid vocab");
    let only = gold(&[("doc-1", ["populations/veterans"].as_slice())]);
    assert!(annotator_agreement(&snapshot, &[only]).is_empty());
}
