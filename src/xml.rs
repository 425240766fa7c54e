//! XML ⇄ arena glue over quick-xml.
//!
//! Mixed content is flattened: each element keeps one text value (its
//! character data concatenated), which round-trips the reflection and TOC
//! documents the engine targets.

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::instrument;

use crate::arena::{DocTree, NodeId};
use crate::errors::{DocError, DocResult};

/// Parses an XML string into a document tree.
#[instrument(level = "debug", skip(xml))]
pub fn read_str(xml: &str) -> DocResult<DocTree> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut tree = DocTree::new();
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let node = open_element(&mut tree, &stack, &e)?;
                stack.push(node);
            }
            Ok(Event::Empty(e)) => {
                open_element(&mut tree, &stack, &e)?;
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(e)) => {
                if let Some(&current) = stack.last() {
                    let text = e
                        .unescape()
                        .map_err(|e| DocError::Malformed(e.to_string()))?;
                    if let Some(node) = tree.node_mut(current) {
                        node.text.push_str(&text);
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(&current) = stack.last() {
                    if let Some(node) = tree.node_mut(current) {
                        node.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
            }
            Ok(Event::Eof) => break,
            // Declarations, comments and processing instructions carry no
            // tree content
            Ok(_) => {}
            Err(e) => return Err(DocError::Malformed(e.to_string())),
        }
    }

    if tree.root().is_none() {
        return Err(DocError::Malformed("no root element".to_string()));
    }
    Ok(tree)
}

fn open_element(tree: &mut DocTree, stack: &[NodeId], e: &BytesStart<'_>) -> DocResult<NodeId> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let parent = stack.last().copied();
    if parent.is_none() && tree.root().is_some() {
        return Err(DocError::Malformed("multiple root elements".to_string()));
    }
    let node = tree.insert_node(name, parent);
    for attribute in e.attributes() {
        let attribute = attribute.map_err(|e| DocError::Malformed(e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| DocError::Malformed(e.to_string()))?;
        tree.push_attribute(node, &key, &value);
    }
    Ok(node)
}

/// Serializes a document tree back to XML.
#[instrument(level = "debug", skip(tree))]
pub fn write_str(tree: &DocTree) -> DocResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|e| DocError::Malformed(e.to_string()))?;
    if let Some(root) = tree.root() {
        write_element(&mut writer, tree, root)?;
    }
    String::from_utf8(writer.into_inner())
        .map_err(|e| DocError::Malformed(e.to_string()))
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    tree: &DocTree,
    idx: NodeId,
) -> DocResult<()> {
    let Some(node) = tree.node(idx) else {
        return Ok(());
    };

    let mut start = BytesStart::new(node.name.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if node.text.is_empty() && node.children.is_empty() {
        writer
            .write_event(Event::Empty(start))
            .map_err(|e| DocError::Malformed(e.to_string()))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| DocError::Malformed(e.to_string()))?;
    if !node.text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&node.text)))
            .map_err(|e| DocError::Malformed(e.to_string()))?;
    }
    for &child in &node.children {
        write_element(writer, tree, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.name.as_str())))
        .map_err(|e| DocError::Malformed(e.to_string()))?;
    Ok(())
}

/// Loads a document tree from a file.
#[instrument(level = "debug")]
pub fn read_file(path: &Path) -> DocResult<DocTree> {
    if !path.exists() {
        return Err(DocError::FileNotFound(path.to_path_buf()));
    }
    let xml = fs::read_to_string(path)?;
    read_str(&xml)
}

/// Writes a document tree to a file, replacing its content.
#[instrument(level = "debug", skip(tree))]
pub fn write_file(tree: &DocTree, path: &Path) -> DocResult<()> {
    let xml = write_str(tree)?;
    fs::write(path, xml)?;
    Ok(())
}
