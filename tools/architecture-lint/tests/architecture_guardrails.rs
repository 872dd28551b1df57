//! On-disk behaviour tests for the architecture guardrails.

use std::fs;
use std::path::PathBuf;

use architecture_lint::{ArchitectureLintError, Violation};
use rstest::{fixture, rstest};
use tempfile::TempDir;

/// A scratch `citymap/` crate the lint can walk.
struct ScratchCrate {
    root: TempDir,
}

impl ScratchCrate {
    fn write(&self, file: &str, contents: &str) {
        let path = self.root.path().join("citymap/src").join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directories");
        }
        fs::write(&path, contents).expect("write source file");
    }

    fn lint(&self) -> Result<(), ArchitectureLintError> {
        architecture_lint::lint_crate_sources(&self.root.path().join("citymap"))
    }
}

#[fixture]
fn scratch() -> ScratchCrate {
    let crate_dir = ScratchCrate {
        root: TempDir::new().expect("tempdir"),
    };
    crate_dir.write(
        "domain/coordinator/mod.rs",
        "use super::ports::FeatureSource; pub struct ViewportCoordinator;",
    );
    crate_dir.write(
        "inbound/events.rs",
        "use crate::domain::ViewportCoordinator; use tokio::sync::mpsc; fn run() {}",
    );
    crate_dir.write(
        "outbound/http/http_source.rs",
        "use crate::domain::ports::FeatureSource; use reqwest::Client; pub struct HttpFeatureSource;",
    );
    crate_dir.write("settings.rs", "use clap::Parser; use crate::outbound::http;");
    crate_dir
}

fn violations(outcome: Result<(), ArchitectureLintError>) -> Vec<Violation> {
    match outcome {
        Ok(()) => panic!("expected violations"),
        Err(ArchitectureLintError::Violations(found)) => found,
        Err(other) => panic!("expected violations error, got: {other:?}"),
    }
}

fn assert_reported(found: &[Violation], file: &str, fragment: &str) {
    let file = PathBuf::from(file);
    assert!(
        found
            .iter()
            .any(|violation| violation.file == file && violation.to_string().contains(fragment)),
        "expected violation in '{file:?}' containing '{fragment}', got: {found:?}"
    );
}

#[rstest]
fn well_layered_crates_pass(scratch: ScratchCrate) {
    let outcome = scratch.lint();
    assert!(outcome.is_ok(), "expected success, got: {outcome:?}");
}

#[rstest]
#[case(
    "inbound/bad.rs",
    "use crate::outbound::headless::HeadlessMap;",
    "crate::outbound"
)]
#[case(
    "outbound/bad.rs",
    "use crate::inbound::MapEvent;",
    "crate::inbound"
)]
#[case(
    "domain/bad.rs",
    "use reqwest::Client;",
    "external crate `reqwest`"
)]
#[case(
    "inbound/bad.rs",
    "fn hit() -> geo::Point { geo::Point::new(0.0, 0.0) }",
    "external crate `geo`"
)]
fn boundary_breaks_are_reported(
    scratch: ScratchCrate,
    #[case] file: &str,
    #[case] contents: &str,
    #[case] fragment: &str,
) {
    scratch.write(file, contents);
    let found = violations(scratch.lint());
    assert_eq!(found.len(), 1, "got: {found:?}");
    assert_reported(&found, file, fragment);
}

#[rstest]
fn every_violation_is_reported(scratch: ScratchCrate) {
    scratch.write(
        "inbound/cross.rs",
        "use citymap::outbound::http::HttpFeatureSource;",
    );
    scratch.write("domain/framework.rs", "use actix_web::HttpResponse;");

    let found = violations(scratch.lint());
    assert_reported(&found, "inbound/cross.rs", "crate::outbound");
    assert_reported(&found, "domain/framework.rs", "external crate `actix_web`");
}

#[rstest]
fn unparsable_sources_fail_loudly(scratch: ScratchCrate) {
    scratch.write("domain/broken.rs", "fn nope( {");
    let outcome = scratch.lint();
    assert!(
        matches!(outcome, Err(ArchitectureLintError::Parse { .. })),
        "got: {outcome:?}"
    );
}
