use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::arena::{DocTree, NodeId};
use crate::cli::args::{Cli, Commands};
use crate::cli::output;
use crate::config;
use crate::errors::{DocError, DocResult};
use crate::query::{ContextNode, Query, Value};
use crate::util::path::PathExt;
use crate::rules::apply_rules;
use crate::toc;
use crate::xml;

pub fn execute_command(cli: &Cli) -> DocResult<()> {
    match &cli.command {
        Some(Commands::Apply {
            rules,
            documents,
            dir,
            dry_run,
        }) => _apply(rules, documents, dir.as_deref(), *dry_run),
        Some(Commands::Prune {
            toc,
            exclude,
            exclude_file,
            comments,
            namespace_log,
            dry_run,
        }) => _prune(
            toc,
            exclude,
            exclude_file.as_deref(),
            comments,
            namespace_log.as_deref(),
            *dry_run,
        ),
        Some(Commands::Query {
            document,
            expression,
        }) => _query(document, expression),
        Some(Commands::Show { document }) => _show(document),
        Some(Commands::Completion { shell }) => {
            generate(
                *shell,
                &mut Cli::command(),
                "doctree",
                &mut io::stdout(),
            );
            Ok(())
        }
        None => Ok(()),
    }
}

#[instrument(level = "debug", skip(documents))]
fn _apply(
    rules_path: &Path,
    documents: &[PathBuf],
    dir: Option<&Path>,
    dry_run: bool,
) -> DocResult<()> {
    let rule_set = config::load_rules(rules_path)?;
    debug!(rules = rule_set.rules.len(), "loaded rule file");

    let mut paths: Vec<PathBuf> = documents.to_vec();
    if let Some(dir) = dir {
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| DocError::Io(e.into()))?;
            if entry.file_type().is_file() && entry.path().is_xml_file() {
                paths.push(entry.path().to_path_buf());
            }
        }
    }

    for path in &paths {
        let mut tree = xml::read_file(path)?;
        let scoped_root = scoped_root(&rule_set.scope, &tree);
        let outcomes = apply_rules(&rule_set.rules, &mut tree, scoped_root);

        let matched: usize = outcomes.iter().map(|o| o.matched).sum();
        let mutated: usize = outcomes.iter().map(|o| o.mutated).sum();
        if mutated > 0 {
            if !dry_run {
                xml::write_file(&tree, path)?;
            }
            output::action(
                "transformed",
                &format!("{} ({} matched, {} mutated)", path.display(), matched, mutated),
            );
        } else {
            output::unchanged(&format!("unchanged: {}", path.display()));
        }
    }
    Ok(())
}

fn scoped_root(scope: &Option<Query>, tree: &DocTree) -> Option<NodeId> {
    scope.as_ref().and_then(|query| {
        query
            .select(tree, ContextNode::Document)
            .into_iter()
            .find_map(|node| match node {
                ContextNode::Element(id) => Some(id),
                _ => None,
            })
    })
}

#[instrument(level = "debug", skip(exclude, comments))]
fn _prune(
    toc_path: &Path,
    exclude: &[String],
    exclude_file: Option<&Path>,
    comments: &[PathBuf],
    namespace_log: Option<&Path>,
    dry_run: bool,
) -> DocResult<()> {
    let mut excluded: Vec<String> = exclude.to_vec();
    if let Some(file) = exclude_file {
        for line in fs::read_to_string(file)?.lines() {
            let id = line.trim();
            if !id.is_empty() && !id.starts_with('#') {
                excluded.push(id.to_string());
            }
        }
    }
    for comment_path in comments {
        let comment_tree = xml::read_file(comment_path)?;
        excluded.extend(toc::collect_excluded_ids(&comment_tree));
    }
    debug!(ids = excluded.len(), "collected excluded topic ids");

    let mut tree = xml::read_file(toc_path)?;
    let outcome = toc::remove_excluded(&mut tree, &excluded);

    if outcome.is_mutated() && !dry_run {
        xml::write_file(&tree, toc_path)?;
    }
    if let Some(log_path) = namespace_log {
        fs::write(log_path, outcome.namespace_log())?;
    }

    output::action(
        "pruned",
        &format!(
            "{} ({} topics removed, {} namespaces logged)",
            toc_path.display(),
            outcome.removed,
            outcome.namespaces.len()
        ),
    );
    Ok(())
}

#[instrument(level = "debug")]
fn _query(document: &Path, expression: &str) -> DocResult<()> {
    let tree = xml::read_file(document)?;
    let query = Query::compile(expression)?;

    match query.evaluate(&tree, ContextNode::Document) {
        Value::Number(n) => println!("{}", n),
        Value::Text(s) => println!("{}", s),
        Value::Boolean(b) => println!("{}", b),
        Value::Nodes(nodes) => {
            output::header(&format!("{} node(s)", nodes.len()));
            for node in nodes {
                println!("{}", describe_node(&tree, &node));
            }
        }
    }
    Ok(())
}

fn describe_node(tree: &DocTree, node: &ContextNode) -> String {
    match node {
        ContextNode::Document => "#document".to_string(),
        ContextNode::Element(id) => match tree.node(*id) {
            Some(element) => {
                let attrs: String = element
                    .attributes
                    .iter()
                    .map(|(k, v)| format!(" {}=\"{}\"", k, v))
                    .collect();
                format!("<{}{}>", element.name, attrs)
            }
            None => "<gone>".to_string(),
        },
        ContextNode::Attribute(id, name) => format!(
            "@{}=\"{}\"",
            name,
            tree.attribute(*id, name).unwrap_or_default()
        ),
    }
}

#[instrument(level = "debug")]
fn _show(document: &Path) -> DocResult<()> {
    let tree = xml::read_file(document)?;
    if let Some(root) = tree.root() {
        println!("{}", render_subtree(&tree, root));
    }
    Ok(())
}

fn render_subtree(tree: &DocTree, idx: NodeId) -> termtree::Tree<String> {
    let label = tree
        .node(idx)
        .map(|n| {
            let mut label = n.name.clone();
            if let Some(id) = tree.attribute(idx, "id") {
                label.push_str(&format!(" [{}]", id));
            }
            label
        })
        .unwrap_or_default();
    let mut rendered = termtree::Tree::new(label);
    if let Some(node) = tree.node(idx) {
        for &child in &node.children {
            rendered.push(render_subtree(tree, child));
        }
    }
    rendered
}
