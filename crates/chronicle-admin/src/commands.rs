//! Read-only admin commands.
//!
//! Each command writes one JSON object per line to the given writer.

use std::io::Write;

use chronicle_core::repository::AggregateRepository;
use chronicle_modules::application::query_handlers::get_module;
use chronicle_pages::application::query_handlers::get_page;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::cli::{AggregateKind, Query};
use crate::error::AppError;

fn write_line<W: Write + ?Sized, T: Serialize>(out: &mut W, value: &T) -> Result<(), AppError> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")?;
    Ok(())
}

fn write_lines<W: Write + ?Sized, T: Serialize>(out: &mut W, values: &[T]) -> Result<(), AppError> {
    for value in values {
        write_line(out, value)?;
    }
    debug!(lines = values.len(), "output written");
    Ok(())
}

/// Runs `query` against the repository's store and writes the result.
///
/// # Errors
///
/// Returns `AppError::Domain` for store and decoding failures, and
/// `AppError::Io` or `AppError::Serialization` if output cannot be written.
#[instrument(skip(repo, out))]
pub async fn execute<W: Write + ?Sized>(
    query: &Query,
    repo: &AggregateRepository,
    out: &mut W,
) -> Result<(), AppError> {
    let store = repo.store();
    match query {
        Query::Stream {
            aggregate_type,
            aggregate_id,
        } => {
            let events = store.get_events(aggregate_type, aggregate_id).await?;
            write_lines(out, &events)
        }
        Query::Version {
            aggregate_type,
            aggregate_id,
        } => {
            let version = store.current_version(aggregate_type, aggregate_id).await?;
            write_line(
                out,
                &json!({
                    "aggregate_type": aggregate_type,
                    "aggregate_id": aggregate_id,
                    "version": version,
                }),
            )
        }
        Query::Tail { from, limit } => {
            let events = store.get_all_events(*from, *limit).await?;
            write_lines(out, &events)
        }
        Query::ByType { event_type, limit } => {
            let events = store.get_events_by_type(event_type, *limit).await?;
            write_lines(out, &events)
        }
        Query::Show {
            kind: AggregateKind::Module,
            aggregate_id,
        } => write_line(out, &get_module(aggregate_id, repo).await?),
        Query::Show {
            kind: AggregateKind::Page,
            aggregate_id,
        } => write_line(out, &get_page(aggregate_id, repo).await?),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chronicle_core::error::DomainError;
    use chronicle_event_store::in_memory::InMemoryEventStore;
    use chronicle_modules::domain::aggregates::Module;
    use chronicle_pages::domain::aggregates::Page;
    use chronicle_test_support::FixedClock;
    use serde_json::Value;
    use uuid::Uuid;

    use super::*;

    async fn seeded() -> AggregateRepository {
        let repo = AggregateRepository::new(Arc::new(InMemoryEventStore::new()));
        let clock = FixedClock::default();

        let mut module = Module::default();
        module
            .install("m1", "Mod", "1.0.0", vec![], Uuid::new_v4(), &clock)
            .unwrap();
        module.enable(Uuid::new_v4(), &clock).unwrap();
        repo.save(&mut module).await.unwrap();

        let mut page = Page::default();
        page.create("p1", "About", "about", Uuid::new_v4(), &clock)
            .unwrap();
        repo.save(&mut page).await.unwrap();

        repo
    }

    async fn run(query: Query, repo: &AggregateRepository) -> Vec<Value> {
        let mut out = Vec::new();
        execute(&query, repo, &mut out).await.unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_stream_prints_one_line_per_event() {
        // Arrange
        let repo = seeded().await;

        // Act
        let lines = run(
            Query::Stream {
                aggregate_type: "module".into(),
                aggregate_id: "m1".into(),
            },
            &repo,
        )
        .await;

        // Assert
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event_type"], "module.installed");
        assert_eq!(lines[0]["aggregate_version"], 1);
        assert_eq!(lines[0]["event_data"]["name"], "Mod");
        assert_eq!(lines[1]["event_type"], "module.enabled");
    }

    #[tokio::test]
    async fn test_version_prints_committed_version() {
        let repo = seeded().await;

        let lines = run(
            Query::Version {
                aggregate_type: "module".into(),
                aggregate_id: "m1".into(),
            },
            &repo,
        )
        .await;

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["version"], 2);
    }

    #[tokio::test]
    async fn test_tail_spans_streams_in_insertion_order() {
        let repo = seeded().await;

        let lines = run(
            Query::Tail {
                from: None,
                limit: 10,
            },
            &repo,
        )
        .await;

        let types: Vec<&str> = lines
            .iter()
            .map(|line| line["event_type"].as_str().unwrap())
            .collect();
        assert_eq!(types, vec!["module.installed", "module.enabled", "page.created"]);
    }

    #[tokio::test]
    async fn test_by_type_filters() {
        let repo = seeded().await;

        let lines = run(
            Query::ByType {
                event_type: "page.created".into(),
                limit: 10,
            },
            &repo,
        )
        .await;

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["aggregate_id"], "p1");
    }

    #[tokio::test]
    async fn test_show_rebuilds_aggregates() {
        let repo = seeded().await;

        let module = run(
            Query::Show {
                kind: AggregateKind::Module,
                aggregate_id: "m1".into(),
            },
            &repo,
        )
        .await;
        let page = run(
            Query::Show {
                kind: AggregateKind::Page,
                aggregate_id: "p1".into(),
            },
            &repo,
        )
        .await;

        assert_eq!(module[0]["status"], "enabled");
        assert_eq!(page[0]["status"], "draft");
    }

    #[tokio::test]
    async fn test_show_unknown_aggregate_is_domain_error() {
        let repo = seeded().await;
        let mut out = Vec::new();

        let result = execute(
            &Query::Show {
                kind: AggregateKind::Module,
                aggregate_id: "ghost".into(),
            },
            &repo,
            &mut out,
        )
        .await;

        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::AggregateNotFound { .. }))
        ));
        assert!(out.is_empty());
    }
}
