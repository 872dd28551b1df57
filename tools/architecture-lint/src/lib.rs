//! Repo-local architectural lint for the citymap crate's layering.
//!
//! The map client keeps its coordinator and ports in `domain`, the event
//! loop in `inbound`, and the HTTP and headless map adapters in `outbound`.
//! Each layer has a short list of sibling modules and third-party crates it
//! may not name:
//!
//! - `domain` stays clear of both adapter layers and of transport, rendering
//!   and configuration crates
//! - `inbound` may not reach `outbound` or the HTTP client
//! - `outbound` may not reach `inbound` or the CLI stack
//!
//! Run it with `cargo run -p architecture-lint`.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use syn::visit::Visit;

/// Architectural layer of a file under `citymap/src`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    /// Coordinator, value types and ports.
    Domain,
    /// Event translation into coordinator calls.
    Inbound,
    /// Port implementations.
    Outbound,
}

impl Layer {
    const ALL: [Self; 3] = [Self::Domain, Self::Inbound, Self::Outbound];

    /// Directory name of the layer under `citymap/src`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    fn of(file: &Path) -> Option<Self> {
        let top = file.components().next()?.as_os_str().to_str()?;
        Self::ALL.into_iter().find(|layer| layer.as_str() == top)
    }

    const fn banned_modules(self) -> &'static [&'static str] {
        match self {
            Self::Domain => &["inbound", "outbound"],
            Self::Inbound => &["outbound"],
            Self::Outbound => &["inbound"],
        }
    }

    const fn banned_crates(self) -> &'static [&'static str] {
        match self {
            Self::Domain => &[
                "actix_rt",
                "actix_web",
                "clap",
                "geo",
                "ortho_config",
                "reqwest",
                "tracing_subscriber",
            ],
            Self::Inbound => &["geo", "reqwest"],
            Self::Outbound => &["actix_web", "clap", "ortho_config", "tracing_subscriber"],
        }
    }

    fn check(self, path: &[String]) -> Option<Dependency> {
        match Root::of(path)? {
            Root::Module(name) => self
                .banned_modules()
                .iter()
                .copied()
                .find(|banned| *banned == name)
                .map(Dependency::Module),
            Root::Crate(name) => self
                .banned_crates()
                .iter()
                .copied()
                .find(|banned| *banned == name)
                .map(Dependency::Crate),
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a path points: a module of the citymap crate or another crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root<'a> {
    Module(&'a str),
    Crate(&'a str),
}

impl<'a> Root<'a> {
    fn of(path: &'a [String]) -> Option<Self> {
        let mut segments = path.iter().map(String::as_str);
        let first = segments.next()?;
        match first {
            "crate" | "self" | "super" => segments
                .find(|segment| !matches!(*segment, "crate" | "self" | "super"))
                .map(Self::Module),
            "citymap" => segments.next().map(Self::Module),
            _ if Layer::ALL.iter().any(|layer| layer.as_str() == first) => {
                Some(Self::Module(first))
            }
            _ => Some(Self::Crate(first)),
        }
    }
}

/// A dependency a layer must not take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Dependency {
    /// A sibling layer, named through `crate::` or the crate name.
    Module(&'static str),
    /// A third-party crate.
    Crate(&'static str),
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(name) => write!(f, "crate::{name}"),
            Self::Crate(name) => write!(f, "external crate `{name}`"),
        }
    }
}

/// One forbidden dependency found in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File path relative to `citymap/src`.
    pub file: PathBuf,
    /// Layer the file belongs to.
    pub layer: Layer,
    /// What the file reached for.
    pub dependency: Dependency,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} module must not depend on {}",
            self.file.display(),
            self.layer,
            self.dependency
        )
    }
}

/// Failure modes returned by the architecture lint.
#[derive(Debug, thiserror::Error)]
pub enum ArchitectureLintError {
    /// Walking or reading the source tree failed.
    #[error("failed to read citymap sources: {0}")]
    Io(#[from] io::Error),
    /// A file could not be parsed or placed in a layer.
    #[error("failed to lint {}: {message}", .file.display())]
    Parse {
        /// File path relative to `citymap/src`.
        file: PathBuf,
        /// Parser or placement message.
        message: String,
    },
    /// One or more boundary violations were found.
    #[error("architecture boundary violations:{}", bullets(.0))]
    Violations(Vec<Violation>),
}

fn bullets(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("\n- {violation}"))
        .collect()
}

/// A Rust source file to be linted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to `citymap/src`.
    pub file: PathBuf,
    /// Rust source text.
    pub contents: String,
}

/// Lint the layered modules of the citymap crate on disk.
///
/// `crate_dir` is the `citymap/` directory; files outside `domain`,
/// `inbound` and `outbound` are not checked.
///
/// # Errors
///
/// Fails on I/O or parse errors, or with every violation found.
pub fn lint_crate_sources(crate_dir: &Path) -> Result<(), ArchitectureLintError> {
    let sources = read_layer_sources(&crate_dir.join("src"))?;
    lint_sources(&sources)
}

/// Lint in-memory sources whose paths are relative to `citymap/src`.
///
/// # Errors
///
/// Fails when a file sits outside the layers or does not parse, or with
/// every violation found.
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = Vec::new();
    for source in sources {
        violations.extend(lint_source(source)?);
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(violations))
    }
}

fn lint_source(source: &LintSource) -> Result<Vec<Violation>, ArchitectureLintError> {
    let parse_error = |message: String| ArchitectureLintError::Parse {
        file: source.file.clone(),
        message,
    };
    let layer = Layer::of(&source.file).ok_or_else(|| {
        parse_error("file does not belong to an architectural layer".to_owned())
    })?;
    let parsed = syn::parse_file(&source.contents).map_err(|err| parse_error(err.to_string()))?;

    let mut scanner = PathScanner::default();
    scanner.visit_file(&parsed);
    let found: BTreeSet<Dependency> = scanner
        .paths
        .iter()
        .filter_map(|path| layer.check(path))
        .collect();
    Ok(found
        .into_iter()
        .map(|dependency| Violation {
            file: source.file.clone(),
            layer,
            dependency,
        })
        .collect())
}

/// Every path and `use` target named in a file, as identifier segments.
#[derive(Default)]
struct PathScanner {
    paths: BTreeSet<Vec<String>>,
}

impl PathScanner {
    fn add_use(&mut self, prefix: &mut Vec<String>, tree: &syn::UseTree) {
        match tree {
            syn::UseTree::Path(step) => {
                prefix.push(step.ident.to_string());
                self.add_use(prefix, &step.tree);
                prefix.pop();
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.add_use(prefix, item);
                }
            }
            syn::UseTree::Name(name) => self.add_leaf(prefix, &name.ident),
            syn::UseTree::Rename(rename) => self.add_leaf(prefix, &rename.ident),
            syn::UseTree::Glob(_) => {
                if !prefix.is_empty() {
                    self.paths.insert(prefix.clone());
                }
            }
        }
    }

    fn add_leaf(&mut self, prefix: &[String], ident: &syn::Ident) {
        let mut path = prefix.to_vec();
        path.push(ident.to_string());
        self.paths.insert(path);
    }
}

impl<'ast> Visit<'ast> for PathScanner {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        let segments: Vec<String> = node
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect();
        if !segments.is_empty() {
            self.paths.insert(segments);
        }
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.add_use(&mut Vec::new(), &node.tree);
    }
}

fn read_layer_sources(src_dir: &Path) -> Result<Vec<LintSource>, ArchitectureLintError> {
    let mut pending: Vec<PathBuf> = Layer::ALL
        .iter()
        .map(|layer| src_dir.join(layer.as_str()))
        .filter(|dir| dir.is_dir())
        .collect();
    let mut sources = Vec::new();
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                let contents = fs::read_to_string(&path)?;
                let file = path
                    .strip_prefix(src_dir)
                    .map_or_else(|_| path.clone(), Path::to_path_buf);
                sources.push(LintSource { file, contents });
            }
        }
    }
    sources.sort_by(|left, right| left.file.cmp(&right.file));
    Ok(sources)
}
