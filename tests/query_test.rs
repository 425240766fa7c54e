//! Tests for the path-query engine: compilation, static typing, evaluation.

use doctree::query::{ContextNode, Query, QueryError, ReturnType, Value};
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
               <topic id="N:Beta" file="b"/>
             </topic>
           </topics>"#,
    )
    .expect("valid toc document")
}

#[test]
fn given_absolute_query_when_selecting_then_finds_descendants() {
    init_test_setup();
    let tree = toc_tree();
    let query = Query::compile("//topic[@id='T:Alpha.Two']").unwrap();

    let nodes = query.select(&tree, ContextNode::Document);

    assert_eq!(nodes.len(), 1);
    let ContextNode::Element(id) = &nodes[0] else {
        panic!("expected an element result");
    };
    assert_eq!(tree.attribute(*id, "file"), Some("a2"));
}

#[test]
fn given_position_predicate_when_selecting_then_counts_per_parent() {
    let tree = toc_tree();
    let query = Query::compile("//topic[@id='N:Alpha']/topic[2]").unwrap();

    let nodes = query.select(&tree, ContextNode::Document);

    assert_eq!(nodes.len(), 1);
    let ContextNode::Element(id) = &nodes[0] else {
        panic!("expected an element result");
    };
    assert_eq!(tree.attribute(*id, "id"), Some("T:Alpha.Two"));
}

#[test]
fn given_attribute_step_when_selecting_then_yields_attribute_nodes() {
    let tree = toc_tree();
    let query = Query::compile("//topic/@file").unwrap();

    let nodes = query.select(&tree, ContextNode::Document);

    assert_eq!(nodes.len(), 5);
    assert!(nodes
        .iter()
        .all(|n| matches!(n, ContextNode::Attribute(_, name) if name.as_str() == "file")));
}

#[test]
fn given_count_expression_when_evaluating_then_returns_number() {
    let tree = toc_tree();
    let query = Query::compile("count(//topic[starts-with(@id, 'N:')])").unwrap();

    assert_eq!(query.return_type(), ReturnType::Number);
    assert_eq!(
        query.evaluate(&tree, ContextNode::Document),
        Value::Number(2.0)
    );
}

#[test]
fn given_boolean_combinator_when_evaluating_then_returns_boolean() {
    let tree = toc_tree();
    let query =
        Query::compile("//topic[@id='N:Beta'] or //topic[@id='N:Gamma']").unwrap();

    assert_eq!(query.return_type(), ReturnType::Boolean);
    assert_eq!(
        query.evaluate(&tree, ContextNode::Document),
        Value::Boolean(true)
    );
}

#[test]
fn given_string_function_when_evaluating_then_returns_text() {
    let tree = xml::read_str("<api><name>Frob</name></api>").unwrap();
    let query = Query::compile("concat(string(api/name), '!')").unwrap();

    // Relative path from the document behaves like an absolute one
    assert_eq!(query.return_type(), ReturnType::Text);
    assert_eq!(
        query.evaluate(&tree, ContextNode::Document),
        Value::Text("Frob!".to_string())
    );
}

#[test]
fn given_union_when_selecting_then_results_are_in_document_order() {
    let tree = xml::read_str("<r><a/><b/><c/></r>").unwrap();
    let query = Query::compile("//c | //a").unwrap();

    let nodes = query.select(&tree, ContextNode::Document);

    let names: Vec<String> = nodes
        .iter()
        .filter_map(|n| match n {
            ContextNode::Element(id) => tree.node(*id).map(|e| e.name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["a", "c"]);
}

#[test]
fn given_parent_step_when_selecting_then_walks_up() {
    let tree = toc_tree();
    let query = Query::compile("//topic[@id='T:Alpha.One']/..").unwrap();

    let nodes = query.select(&tree, ContextNode::Document);

    assert_eq!(nodes.len(), 1);
    let ContextNode::Element(id) = &nodes[0] else {
        panic!("expected an element result");
    };
    assert_eq!(tree.attribute(*id, "id"), Some("N:Alpha"));
}

#[test]
fn given_relative_query_when_evaluated_from_element_then_scopes_to_subtree() {
    let tree = toc_tree();
    let alpha = Query::compile("//topic[@id='N:Alpha']")
        .unwrap()
        .select(&tree, ContextNode::Document)
        .remove(0);

    let query = Query::compile("topic").unwrap();
    let nodes = query.select(&tree, alpha);

    assert_eq!(nodes.len(), 2);
}

#[test]
fn given_numeric_comparison_when_evaluating_then_coerces_node_values() {
    let tree = xml::read_str(r#"<apis><api version="2"/><api version="3"/></apis>"#).unwrap();
    let query = Query::compile("//api[@version > 2]").unwrap();

    let nodes = query.select(&tree, ContextNode::Document);

    assert_eq!(nodes.len(), 1);
}

#[test]
fn given_malformed_expression_when_compiling_then_fails() {
    assert!(matches!(
        Query::compile("//topic[@id="),
        Err(QueryError::InvalidExpression { .. })
    ));
    assert!(matches!(
        Query::compile(""),
        Err(QueryError::InvalidExpression { .. })
    ));
    // Unknown function
    assert!(matches!(
        Query::compile("frobnicate(1, 2)"),
        Err(QueryError::InvalidExpression { .. })
    ));
}

#[test]
fn given_scalar_expression_when_compiling_selector_then_rejected() {
    let err = Query::compile_selector("count(//topic)").unwrap_err();
    assert!(matches!(
        err,
        QueryError::NotANodeSet {
            found: ReturnType::Number,
            ..
        }
    ));

    // The same expression is fine as a plain query
    assert!(Query::compile("count(//topic)").is_ok());
}

#[test]
fn given_wrong_arity_when_compiling_then_fails() {
    assert!(matches!(
        Query::compile("starts-with('a')"),
        Err(QueryError::InvalidExpression { .. })
    ));
    assert!(matches!(
        Query::compile("not()"),
        Err(QueryError::InvalidExpression { .. })
    ));
}

#[test]
fn given_evaluation_on_empty_match_when_evaluating_then_neutral_values() {
    let tree = toc_tree();

    let nodes = Query::compile("//missing")
        .unwrap()
        .select(&tree, ContextNode::Document);
    assert!(nodes.is_empty());

    let count = Query::compile("count(//missing)")
        .unwrap()
        .evaluate(&tree, ContextNode::Document);
    assert_eq!(count, Value::Number(0.0));
}
