//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Declarative path-query transformations for documentation XML trees
#[derive(Parser, Debug)]
#[command(name = "doctree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short = 'd', long = "debug", action = ArgAction::Count, global = true)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply a rule file to one or more XML documents, in place
    Apply {
        /// TOML rule file
        rules: PathBuf,
        /// Documents to transform
        documents: Vec<PathBuf>,
        /// Transform every .xml file under this directory
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Report counts without writing anything back
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove excluded topics from a TOC document, cascading empty ancestors
    Prune {
        /// Table-of-contents document
        toc: PathBuf,
        /// Topic id to exclude (repeatable)
        #[arg(long = "exclude", value_name = "ID")]
        exclude: Vec<String>,
        /// File with one topic id per line
        #[arg(long)]
        exclude_file: Option<PathBuf>,
        /// API comment document scanned for tocexclude/excludetoc markers (repeatable)
        #[arg(long = "comments", value_name = "FILE")]
        comments: Vec<PathBuf>,
        /// Where to write the removed-namespace log
        #[arg(long)]
        namespace_log: Option<PathBuf>,
        /// Report counts without writing anything back
        #[arg(long)]
        dry_run: bool,
    },

    /// Evaluate a path query against a document and print the typed result
    Query {
        /// XML document
        document: PathBuf,
        /// Query expression
        expression: String,
    },

    /// Display a document as a tree
    Show {
        /// XML document
        document: PathBuf,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
