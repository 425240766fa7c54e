//! Cascade removal of excluded topics from a table-of-contents tree.
//!
//! Removing a topic can leave its ancestors childless; those are removed
//! too, walking parent indices iteratively until an ancestor with remaining
//! children (or the tree root) stops the cascade. Removed namespace topics
//! are recorded for the later layout stage, which would otherwise re-add
//! them and duplicate namespace items.

use itertools::Itertools;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use tracing::{debug, info, instrument};

use crate::arena::{DocTree, NodeId};
use crate::query::{ContextNode, Query};

/// Topic-id prefix marking a namespace topic.
pub const NAMESPACE_PREFIX: &str = "N:";
/// Topic-id prefix marking the project (root) topic.
pub const PROJECT_PREFIX: &str = "R:";

const TOPIC: &str = "topic";
const ID_ATTRIBUTE: &str = "id";

/// Result of a cascade run: total detached topics (cascaded ancestors
/// included) and the namespace ids removed along the way, in removal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub removed: usize,
    pub namespaces: Vec<String>,
}

impl CascadeOutcome {
    /// The tree should be persisted only when this is true.
    pub fn is_mutated(&self) -> bool {
        self.removed > 0
    }

    /// Serialized removed-namespace document for the downstream
    /// reconciliation stage:
    /// `<namespaces><namespace id="N:…"/></namespaces>`.
    pub fn namespace_log(&self) -> String {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        // Writing to an in-memory buffer cannot fail
        let _ = writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)));
        let _ = writer.write_event(Event::Start(BytesStart::new("namespaces")));
        for id in &self.namespaces {
            let mut element = BytesStart::new("namespace");
            element.push_attribute((ID_ATTRIBUTE, id.as_str()));
            let _ = writer.write_event(Event::Empty(element));
        }
        let _ = writer.write_event(Event::End(BytesEnd::new("namespaces")));
        String::from_utf8(writer.into_inner()).unwrap_or_default()
    }
}

/// Removes every topic in `excluded` from the TOC tree, cascading upward
/// through ancestors left childless.
///
/// Ids are processed in order, duplicates ignored. Topics are searched under
/// the project topic's subtree when one exists, else under the whole tree;
/// ids with no matching topic are skipped without error.
#[instrument(level = "debug", skip_all, fields(excluded = excluded.len()))]
pub fn remove_excluded(tree: &mut DocTree, excluded: &[String]) -> CascadeOutcome {
    let mut outcome = CascadeOutcome::default();

    let ids: Vec<&String> = excluded.iter().unique().collect();
    for id in ids {
        let search_root = project_root(tree).or_else(|| tree.root());
        let Some(found) = find_topic(tree, search_root, id) else {
            debug!(%id, "excluded topic not present in TOC");
            continue;
        };

        let mut current = found;
        loop {
            if let Some(topic_id) = tree.attribute(current, ID_ATTRIBUTE) {
                if topic_id.starts_with(NAMESPACE_PREFIX) {
                    outcome.namespaces.push(topic_id.to_string());
                }
            }
            let parent = tree.node(current).and_then(|n| n.parent);

            tree.detach(current);
            outcome.removed += 1;

            // Climb while the vacated parent is childless and is not the
            // tree root itself.
            let Some(parent_idx) = parent else { break };
            let childless = tree
                .node(parent_idx)
                .map(|n| n.children.is_empty())
                .unwrap_or(false);
            let has_parent = tree.node(parent_idx).and_then(|n| n.parent).is_some();
            if childless && has_parent {
                current = parent_idx;
            } else {
                break;
            }
        }
    }

    info!(
        removed = outcome.removed,
        namespaces = outcome.namespaces.len(),
        "excluded topics from the TOC"
    );
    outcome
}

/// The project topic (`R:` id prefix) directly under the TOC root, if any.
pub fn project_root(tree: &DocTree) -> Option<NodeId> {
    let source = format!("topics/topic[starts-with(@id, '{PROJECT_PREFIX}')]");
    let query = Query::compile(&source).unwrap();
    query
        .select(tree, ContextNode::Document)
        .into_iter()
        .find_map(|node| match node {
            ContextNode::Element(id) => Some(id),
            _ => None,
        })
}

/// Collects topic ids flagged for TOC exclusion in an API comment document:
/// members carrying a `tocexclude` or `excludetoc` marker anywhere below
/// them.
#[instrument(level = "debug", skip_all)]
pub fn collect_excluded_ids(comments: &DocTree) -> Vec<String> {
    let query = Query::compile("//member[.//tocexclude or .//excludetoc]/@name").unwrap();
    query
        .select(comments, ContextNode::Document)
        .into_iter()
        .filter_map(|node| match node {
            ContextNode::Attribute(id, name) => {
                comments.attribute(id, &name).map(str::to_string)
            }
            _ => None,
        })
        .collect()
}

fn find_topic(tree: &DocTree, search_root: Option<NodeId>, id: &str) -> Option<NodeId> {
    let root = search_root?;
    tree.subtree(root).into_iter().find(|&node| {
        tree.node(node).is_some_and(|n| n.name == TOPIC)
            && tree.attribute(node, ID_ATTRIBUTE) == Some(id)
    })
}
