//! `prospector run`: one task processed in-process, with terminal progress.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use prospector_core::api::{
    build_export, export_filename, items_from_task, AiConfig, AppConfig, BatchProcessor,
    CliError, ExportFormat, ProgressMonitor, TaskKind, TaskRegistry, TaskStatus,
    DEFAULT_CLASSIFY_TEMPLATE,
};
use prospector_plugins::factory::{build_classifier, build_crawler};

use crate::commands::cli::RunArgs;
use crate::events::spawn_event_logger;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Non-empty lines that are not `#` comments.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

async fn read_prompt(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(p) => Ok(tokio::fs::read_to_string(p).await?),
        None => Ok(DEFAULT_CLASSIFY_TEMPLATE.to_string()),
    }
}

pub async fn handle_run(args: RunArgs, cfg: AppConfig) -> Result<i32, CliError> {
    let urls = parse_url_list(&tokio::fs::read_to_string(&args.urls_file).await?);
    if urls.is_empty() {
        return Err(CliError::Command(format!(
            "no urls in {}",
            args.urls_file.display()
        )));
    }

    let kind = TaskKind::from(args.kind);
    let ai = AiConfig {
        api_url: args.api_url.clone().unwrap_or_default(),
        api_key: args.api_key.clone().unwrap_or_default(),
        model_name: args.model.clone().unwrap_or_default(),
        prompt_template: read_prompt(args.prompt_file.as_deref()).await?,
        ..Default::default()
    };

    let crawler = build_crawler(&cfg).map_err(|e| CliError::Config(format!("crawler: {e}")))?;
    let classifier =
        build_classifier(&cfg).map_err(|e| CliError::Config(format!("classifier: {e}")))?;

    let registry = TaskRegistry::new(&cfg.tasks);
    let processor = BatchProcessor::new(registry.clone(), crawler, classifier, &cfg);
    let _events = spawn_event_logger(registry.subscribe());

    let outcome = registry.create(urls, kind, ai).await?;
    let task_id = outcome.task_id().to_string();
    let total = registry.url_count(&task_id).await?;
    tracing::info!(task_id = %task_id, kind = %kind, total, "local run started");

    let show_progress = !args.no_progress && atty::is(atty::Stream::Stderr);
    let mut monitor = ProgressMonitor::new(total, show_progress);
    let handle = processor.spawn(task_id.clone());

    while !handle.is_finished() {
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!(task_id = %task_id, "interrupted, cancelling task");
                registry.cancel(&task_id).await?;
            }
        }
        if let Ok(snap) = registry.realtime(&task_id).await {
            monitor.update(&snap);
        }
    }
    handle
        .await
        .map_err(|e| CliError::Command(format!("task runner panicked: {e}")))?;

    let task = registry.get(&task_id).await?;
    if let Ok(snap) = registry.realtime(&task_id).await {
        monitor.update(&snap);
    }
    let completed = task.status == TaskStatus::Completed;
    monitor.finish(completed);

    let now = Utc::now();
    let doc = build_export(ExportFormat::Json, items_from_task(&task), now)
        .map_err(|e| CliError::Command(e.to_string()))?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(export_filename(now)));
    let body = serde_json::to_vec_pretty(&doc).map_err(|e| CliError::Command(e.to_string()))?;
    tokio::fs::write(&output, body).await?;

    println!(
        "{}: {} results, {} errors -> {}",
        task.status.as_str(),
        task.produced.results,
        task.produced.errors,
        output.display()
    );

    Ok(if completed { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cli::KindArg;

    #[test]
    fn test_parse_url_list() {
        let text = "# leads\nhttps://a.test\n\n  b.test  \n#skip\n";
        assert_eq!(parse_url_list(text), vec!["https://a.test", "b.test"]);
    }

    #[tokio::test]
    async fn test_empty_url_file_is_command_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "# nothing\n").unwrap();

        let args = RunArgs {
            urls_file: path,
            kind: KindArg::CrawlOnly,
            api_url: None,
            api_key: None,
            model: None,
            prompt_file: None,
            output: None,
            no_progress: true,
        };
        let err = handle_run(args, AppConfig::default()).await.unwrap_err();
        assert!(matches!(err, CliError::Command(_)));
    }

    #[tokio::test]
    async fn test_classify_without_key_exports_failed_task() {
        let dir = tempfile::tempdir().unwrap();
        let urls = dir.path().join("urls.txt");
        std::fs::write(&urls, "https://a.test\n").unwrap();
        let output = dir.path().join("out.json");

        let args = RunArgs {
            urls_file: urls,
            kind: KindArg::Classify,
            api_url: None,
            api_key: None,
            model: None,
            prompt_file: None,
            output: Some(output.clone()),
            no_progress: true,
        };
        let code = handle_run(args, AppConfig::default()).await.unwrap();
        assert_eq!(code, 1);

        let doc: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
        assert_eq!(doc["totalCount"], 0);
    }
}
