//! Tests for TOC cascade removal and excluded-id collection.

use doctree::query::{ContextNode, Query};
use doctree::toc::{collect_excluded_ids, remove_excluded, CascadeOutcome};
use doctree::util::testing::init_test_setup;
use doctree::xml;
use doctree::DocTree;

fn toc_tree() -> DocTree {
    xml::read_str(
        r#"<topics>
             <topic id="R:Project" file="proj">
               <topic id="N:Alpha" file="a">
                 <topic id="T:Alpha.One" file="a1"/>
                 <topic id="T:Alpha.Two" file="a2"/>
               </topic>
               <topic id="N:Beta" file="b">
                 <topic id="T:Beta.One" file="b1"/>
               </topic>
             </topic>
           </topics>"#,
    )
    .expect("valid toc document")
}

fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn topic_exists(tree: &DocTree, id: &str) -> bool {
    !Query::compile(&format!("//topic[@id='{}']", id))
        .unwrap()
        .select(tree, ContextNode::Document)
        .is_empty()
}

#[test]
fn given_leaf_topic_with_siblings_when_removing_then_cascade_stops_at_parent() {
    init_test_setup();
    let mut tree = toc_tree();

    let outcome = remove_excluded(&mut tree, &ids(&["T:Alpha.One"]));

    assert_eq!(outcome.removed, 1);
    assert!(outcome.namespaces.is_empty());
    assert!(!topic_exists(&tree, "T:Alpha.One"));
    assert!(topic_exists(&tree, "T:Alpha.Two"));
    assert!(topic_exists(&tree, "N:Alpha"));
}

#[test]
fn given_only_child_when_removing_then_parent_cascades_too() {
    let mut tree = toc_tree();

    let outcome = remove_excluded(&mut tree, &ids(&["T:Beta.One"]));

    // T:Beta.One goes first, then the now-empty N:Beta
    assert_eq!(outcome.removed, 2);
    assert_eq!(outcome.namespaces, vec!["N:Beta"]);
    assert!(!topic_exists(&tree, "T:Beta.One"));
    assert!(!topic_exists(&tree, "N:Beta"));
    assert!(topic_exists(&tree, "R:Project"));
}

#[test]
fn given_deep_chain_when_removing_then_cascade_reaches_project_topic() {
    let mut tree = xml::read_str(
        r#"<topics>
             <topic id="R:Project">
               <topic id="N:Only">
                 <topic id="T:Only.One"/>
               </topic>
             </topic>
           </topics>"#,
    )
    .unwrap();

    let outcome = remove_excluded(&mut tree, &ids(&["T:Only.One"]));

    // Cascade removes the chain up to and including the project topic,
    // stopping at the tree root
    assert_eq!(outcome.removed, 3);
    assert_eq!(outcome.namespaces, vec!["N:Only"]);
    assert!(!topic_exists(&tree, "R:Project"));
    assert!(tree.root().is_some());
}

#[test]
fn given_namespace_topic_when_removing_then_id_is_logged() {
    let mut tree = toc_tree();

    let outcome = remove_excluded(&mut tree, &ids(&["N:Alpha"]));

    // The whole subtree goes in one detach
    assert_eq!(outcome.removed, 1);
    assert_eq!(outcome.namespaces, vec!["N:Alpha"]);
    assert!(!topic_exists(&tree, "T:Alpha.One"));
    assert!(!topic_exists(&tree, "T:Alpha.Two"));
}

#[test]
fn given_non_namespace_topic_when_removing_then_log_stays_empty() {
    let mut tree = toc_tree();

    let outcome = remove_excluded(&mut tree, &ids(&["T:Alpha.One"]));

    assert!(outcome.namespaces.is_empty());
}

#[test]
fn given_unknown_id_when_removing_then_ignored_without_error() {
    let mut tree = toc_tree();

    let outcome = remove_excluded(&mut tree, &ids(&["T:Missing"]));

    assert_eq!(outcome.removed, 0);
    assert!(!outcome.is_mutated());
}

#[test]
fn given_duplicate_ids_when_removing_then_processed_once() {
    let mut tree = toc_tree();

    let outcome = remove_excluded(&mut tree, &ids(&["T:Beta.One", "T:Beta.One"]));

    assert_eq!(outcome.removed, 2);
    assert_eq!(outcome.namespaces, vec!["N:Beta"]);
}

#[test]
fn given_multiple_exclusions_when_removing_then_order_is_preserved() {
    let mut tree = toc_tree();

    let outcome = remove_excluded(&mut tree, &ids(&["N:Beta", "N:Alpha"]));

    assert_eq!(outcome.namespaces, vec!["N:Beta", "N:Alpha"]);
    // Project topic lost all children and is itself cascaded away
    assert!(!topic_exists(&tree, "R:Project"));
}

#[test]
fn given_removed_namespaces_when_serializing_then_log_is_well_formed() {
    let outcome = CascadeOutcome {
        removed: 2,
        namespaces: vec!["N:Alpha".to_string(), "N:Beta".to_string()],
    };

    let log = outcome.namespace_log();

    let parsed = xml::read_str(&log).unwrap();
    let entries = Query::compile("namespaces/namespace/@id")
        .unwrap()
        .select(&parsed, ContextNode::Document);
    assert_eq!(entries.len(), 2);
}

#[test]
fn given_empty_outcome_when_serializing_then_log_has_no_entries() {
    let outcome = CascadeOutcome::default();

    let parsed = xml::read_str(&outcome.namespace_log()).unwrap();
    let entries = Query::compile("//namespace")
        .unwrap()
        .select(&parsed, ContextNode::Document);
    assert!(entries.is_empty());
}

#[test]
fn given_comment_document_when_collecting_then_finds_marked_members() {
    let comments = xml::read_str(
        r#"<doc>
             <members>
               <member name="T:Foo"><tocexclude/></member>
               <member name="T:Bar"><summary><excludetoc/></summary></member>
               <member name="T:Baz"><summary>kept</summary></member>
             </members>
           </doc>"#,
    )
    .unwrap();

    let excluded = collect_excluded_ids(&comments);

    assert_eq!(excluded, vec!["T:Foo", "T:Bar"]);
}

#[test]
fn given_toc_without_project_topic_when_removing_then_searches_whole_tree() {
    let mut tree = xml::read_str(
        r#"<topics>
             <topic id="N:Alpha"><topic id="T:Alpha.One"/></topic>
           </topics>"#,
    )
    .unwrap();

    let outcome = remove_excluded(&mut tree, &ids(&["T:Alpha.One"]));

    assert_eq!(outcome.removed, 2);
    assert_eq!(outcome.namespaces, vec!["N:Alpha"]);
}
