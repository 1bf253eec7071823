//! Project commands: dataset and configuration checks, task submission,
//! cancellation, watching, and file uploads.

use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use super::{AnswerArg, Clients};
use crate::api::{CreatedTask, Task, TaskApi};
use crate::core::attachments::{AttachmentSession, FileInfo, UploadStatus};
use crate::core::dataset::{self, column_stats, Dataset};
use crate::core::forms::{validate_message, validate_name, Answer, ConfirmForm};
use crate::core::issues::ValidationErrors;
use crate::core::pipeline::PipelineForm;
use crate::core::project::{ProjectSession, SubmitError};
use crate::core::task_watch::{fetch_leaderboard, watch_tasks};

const LEADERBOARD_ROWS: usize = 10;

/// Read a file, or stdin for `-`.
pub fn read_input(path: &Path) -> Result<String, Box<dyn Error>> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

pub fn validate_file(path: &Path) -> Result<(), Box<dyn Error>> {
    let text = read_input(path)?;
    match dataset::validate(&text) {
        Ok(dataset) => {
            println!(
                "✅ {} rows, value columns: {}",
                dataset.rows.len(),
                dataset.value_columns().join(", ")
            );
            for column in dataset.value_columns() {
                if let Some(stats) = column_stats(&dataset, column) {
                    println!("   {column}: {}", stats.summary());
                }
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("❌ {}: {}", err.code(), err.describe());
            Err(Box::new(err))
        }
    }
}

fn report_issues(errors: &ValidationErrors) {
    for issue in errors.issues() {
        eprintln!("❌ {}: {}", issue.path_string(), issue.code);
    }
}

pub fn check_name(name: &str) -> Result<(), Box<dyn Error>> {
    validate_name(name).map_err(|errors| {
        report_issues(&errors);
        Box::new(errors) as Box<dyn Error>
    })?;
    println!("✅ name is valid");
    Ok(())
}

pub fn check_message(path: &Path) -> Result<(), Box<dyn Error>> {
    let text = read_input(path)?;
    // a trailing newline from the editor or a heredoc is not part of the message
    let text = text.strip_suffix('\n').unwrap_or(&text);
    validate_message(text).map_err(|errors| {
        report_issues(&errors);
        Box::new(errors) as Box<dyn Error>
    })?;
    println!("✅ message is valid ({} characters)", text.chars().count());
    Ok(())
}

pub fn check_config(path: &Path, dataset_path: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let mut form: PipelineForm = serde_json::from_str(&read_input(path)?)?;
    if let Some(dataset_path) = dataset_path {
        let dataset = dataset::parse(&read_input(dataset_path)?);
        form.sync_columns(dataset.value_columns());
    }

    match form.validate() {
        Ok(config) => {
            let columns: Vec<&str> = config.evaluator.keys().map(String::as_str).collect();
            println!("✅ configuration is valid for columns: {}", columns.join(", "));
            Ok(())
        }
        Err(errors) => {
            report_issues(&errors);
            Err(Box::new(errors))
        }
    }
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks yet.");
        return;
    }
    println!("{:<28} {:<10} {:<20} {:<20}", "ID", "STATUS", "CREATED", "UPDATED");
    for task in tasks {
        println!(
            "{:<28} {:<10} {:<20} {:<20}",
            task.id,
            task.status,
            task.created_at.format("%Y-%m-%d %H:%M:%S"),
            task.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
}

pub async fn list_tasks(clients: &Clients, project_id: &str) -> Result<(), Box<dyn Error>> {
    let tasks = clients.api.list_tasks(project_id).await?;
    print_tasks(&tasks);
    Ok(())
}

pub struct RunRequest {
    pub project_id: String,
    pub dataset: Option<PathBuf>,
    pub config: Option<PathBuf>,
    /// Toxin, pathogen and virus answers, in that order.
    pub answers: [Option<AnswerArg>; 3],
    pub accept_terms: bool,
}

fn answer(arg: Option<AnswerArg>) -> Option<Answer> {
    arg.map(|arg| match arg {
        AnswerArg::Yes => Answer::Yes,
        AnswerArg::No => Answer::No,
    })
}

pub fn confirm_form(answers: [Option<AnswerArg>; 3], accept_terms: bool) -> ConfirmForm {
    let [toxin, pathogen, virus] = answers;
    let mut form = ConfirmForm::default();
    form.question.toxin = answer(toxin);
    form.question.pathogen = answer(pathogen);
    form.question.virus = answer(virus);
    form.consent.compliance = accept_terms;
    form.consent.disclaimer = accept_terms;
    form.consent.warranty = accept_terms;
    form
}

pub async fn run(clients: &Clients, request: RunRequest) -> Result<CreatedTask, Box<dyn Error>> {
    let mut session = ProjectSession::new(request.project_id);
    for notice in session.prefetch(&clients.blobs).await {
        eprintln!("⚠️  {notice}");
    }

    if let Some(path) = &request.dataset {
        session.set_dataset_text(&read_input(path)?);
    }
    if let Some(path) = &request.config {
        let form: PipelineForm = serde_json::from_str(&read_input(path)?)?;
        session.set_form(form);
    }
    session.confirm = confirm_form(request.answers, request.accept_terms);

    match session.submit(clients.api.as_ref(), &clients.blobs).await {
        Ok(task) => {
            println!("✅ Started task {}", task.id);
            Ok(task)
        }
        Err(SubmitError::Invalid(errors)) => {
            if let Some(confirm) = &errors.confirm {
                report_issues(confirm);
            }
            if let Some(err) = errors.dataset {
                eprintln!("❌ dataset: {} ({})", err.code(), err.describe());
            }
            if let Some(config) = &errors.config {
                report_issues(config);
            }
            Err(Box::new(SubmitError::Invalid(errors)))
        }
        Err(err) => {
            eprintln!("❌ {err}");
            Err(Box::new(err))
        }
    }
}

pub async fn cancel_task(clients: &Clients, task_id: &str) -> Result<(), Box<dyn Error>> {
    let task = crate::core::project::cancel(clients.api.as_ref(), task_id).await?;
    println!("✅ Task {} is now {}", task.id, task.status);
    Ok(())
}

fn print_leaderboard(table: &Dataset) {
    println!("{}", table.headers.join("\t"));
    for row in table.rows.iter().take(LEADERBOARD_ROWS) {
        println!("{}", row.join("\t"));
    }
    if table.rows.len() > LEADERBOARD_ROWS {
        println!("… {} more", table.rows.len() - LEADERBOARD_ROWS);
    }
}

pub async fn watch(
    clients: &Clients,
    project_id: &str,
    interval: Duration,
) -> Result<(), Box<dyn Error>> {
    let api: std::sync::Arc<dyn TaskApi> = clients.api.clone();
    let stream = watch_tasks(api, project_id, interval, CancellationToken::new());
    futures_util::pin_mut!(stream);

    let mut last_seen = None;
    let mut latest: Vec<Task> = Vec::new();
    while let Some(result) = stream.next().await {
        match result {
            Ok(tasks) => {
                let head = tasks.first().map(|task| (task.id.clone(), task.status));
                if head != last_seen {
                    match &head {
                        Some((id, status)) => println!("{id}: {status}"),
                        None => println!("No tasks yet."),
                    }
                    last_seen = head;
                }
                latest = tasks;
            }
            Err(err) => eprintln!("⚠️  {err}"),
        }
    }

    match fetch_leaderboard(&clients.blobs, project_id, &latest).await? {
        Some(table) => print_leaderboard(&table),
        None => println!("No results available."),
    }
    Ok(())
}

/// MIME type from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("csv") => "text/csv",
        Some("tsv") => "text/tab-separated-values",
        Some("json") => "application/json",
        Some("txt" | "fasta" | "fa" | "md") => "text/plain",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

pub async fn upload(
    clients: &Clients,
    project_id: &str,
    files: &[PathBuf],
) -> Result<(), Box<dyn Error>> {
    let mut session = AttachmentSession::new();
    for (index, path) in files.iter().enumerate() {
        let size = tokio::fs::metadata(path).await?.len();
        session.add(FileInfo::new(index.to_string(), path, content_type_for(path), size));
    }

    let failed = session.upload_pending(&clients.blobs, project_id).await;
    for file in session.drain_for_send() {
        match (file.status, file.display_url()) {
            (UploadStatus::Success, Some(url)) => println!("✅ {} → {url}", file.name),
            _ => eprintln!("❌ {} was not uploaded", file.name),
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {} uploads failed", files.len()).into());
    }
    Ok(())
}
