//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{ColoredString, Colorize, control};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use fixpulse::core::config::Config;
use fixpulse::core::errors::FxpError;
use fixpulse::gateway::types::{
    ConfidenceBucket, Event, EventPage, EventStatus, FixPage, Pagination, QueueStats, Stats,
};
use fixpulse::gateway::{DashboardApi, GatewayError, HttpGateway};
use fixpulse::health::{HealthSnapshot, ServerStatusView};
use fixpulse::logger::jsonl::{JsonlConfig, JsonlWriter, SharedLog};
use fixpulse::pagination::PageControls;
use fixpulse::query::sync::{MemoryLocation, QuerySync};
use fixpulse::query::{ConfidenceFilter, QueryState, StatusFilter};
use fixpulse::sync::{FetchState, QueryDriven, ViewHandle, ViewSource};
use fixpulse::views::{EventsView, FixesView, QueueActionError, Views};

/// fixpulse: watch CI/CD failures and AI-generated fixes from the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "fixpulse",
    author,
    version,
    about = "CI/CD failure and auto-fix monitor",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the monitoring service address.
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Show aggregate dashboard statistics.
    Stats,
    /// List failure events.
    Events(EventsArgs),
    /// Show one failure event with its fix attempts.
    Event(EventArgs),
    /// List AI fix attempts.
    Fixes(FixesArgs),
    /// Inspect or act on the work queue.
    Queue(QueueArgs),
    /// Probe server health.
    Health,
    /// Follow a live view until interrupted.
    Watch(WatchArgs),
    /// Inspect the effective configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct EventsArgs {
    /// Shareable query string to start from (e.g. `page=2&status=FAILED`).
    #[arg(long, value_name = "QUERY")]
    query: Option<String>,
    /// Page number (1-based).
    #[arg(long, value_name = "N")]
    page: Option<u32>,
    /// Status filter: ALL, DETECTED, ANALYZING, FIXING, FIXED, FAILED.
    #[arg(long, value_name = "STATUS")]
    status: Option<String>,
    /// Repository search text.
    #[arg(long, value_name = "REPO")]
    repo: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct EventArgs {
    /// Event identifier.
    #[arg(value_name = "ID")]
    id: String,
}

#[derive(Debug, Clone, Args, Default)]
struct FixesArgs {
    /// Shareable query string to start from (e.g. `page=2&confidence=HIGH`).
    #[arg(long, value_name = "QUERY")]
    query: Option<String>,
    /// Page number (1-based).
    #[arg(long, value_name = "N")]
    page: Option<u32>,
    /// Confidence filter: ALL, HIGH, MEDIUM, LOW.
    #[arg(long, value_name = "BUCKET")]
    confidence: Option<String>,
}

#[derive(Debug, Clone, Args, Default)]
struct QueueArgs {
    /// Queue operation to run.
    #[command(subcommand)]
    command: Option<QueueCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum QueueCommand {
    /// Show queue counters and recent failures.
    Status,
    /// Re-enqueue every failed job.
    RetryFailed,
    /// Remove completed and failed jobs.
    Purge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum WatchTarget {
    Dashboard,
    Events,
    Fixes,
    Queue,
    Event,
    Health,
}

#[derive(Debug, Clone, Args)]
struct WatchArgs {
    /// View to follow.
    #[arg(value_enum)]
    view: WatchTarget,
    /// Shareable query string for the events and fixes views.
    #[arg(long, value_name = "QUERY")]
    query: Option<String>,
    /// Event identifier for the event view.
    #[arg(long, value_name = "ID")]
    id: Option<String>,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print effective merged configuration.
    Show,
    /// Print the stable hash of the effective configuration.
    Hash,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Service or environment failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Json(_) | Self::Io(_) => 2,
        }
    }
}

impl From<FxpError> for CliError {
    fn from(err: FxpError) -> Self {
        // FXP-1xxx is the configuration family.
        if err.code().starts_with("FXP-1") {
            Self::User(err.to_string())
        } else {
            Self::Runtime(err.to_string())
        }
    }
}

impl From<GatewayError> for CliError {
    fn from(err: GatewayError) -> Self {
        Self::Runtime(err.to_string())
    }
}

impl From<QueueActionError> for CliError {
    fn from(err: QueueActionError) -> Self {
        Self::Runtime(err.to_string())
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
        command => {
            let session = Session::open(cli)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| CliError::Runtime(format!("failed to start runtime: {e}")))?;
            runtime.block_on(dispatch(cli, command, &session))
        }
    }
}

async fn dispatch(cli: &Cli, command: &Command, session: &Session) -> Result<(), CliError> {
    match command {
        Command::Stats => run_stats(cli, session).await,
        Command::Events(args) => run_events(cli, session, args).await,
        Command::Event(args) => run_event(cli, session, args).await,
        Command::Fixes(args) => run_fixes(cli, session, args).await,
        Command::Queue(args) => run_queue(cli, session, args).await,
        Command::Health => run_health(cli, session).await,
        Command::Watch(args) => run_watch(cli, session, args).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::User(
            "command does not talk to the service".to_owned(),
        )),
    }
}

// ──────────────────── session ────────────────────

/// Loaded configuration plus the gateway and log every command shares.
struct Session {
    config: Config,
    api: Arc<dyn DashboardApi>,
    log: Option<SharedLog>,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self, CliError> {
        let config = load_config(cli)?;
        let api: Arc<dyn DashboardApi> = Arc::new(HttpGateway::new(&config.gateway)?);
        let log = config
            .logging
            .enabled
            .then(|| JsonlWriter::open(JsonlConfig::at(&config.logging.jsonl_path)).shared());
        Ok(Self { config, api, log })
    }

    fn views(&self) -> Views {
        Views::new(
            Arc::clone(&self.api),
            self.config.polling.clone(),
            self.log.clone(),
        )
    }

    fn page_size(&self) -> u32 {
        self.config.polling.page_size
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = &cli.api_url {
        config.override_base_url(url)?;
    }
    Ok(config)
}

// ──────────────────── one-shot commands ────────────────────

async fn run_stats(cli: &Cli, session: &Session) -> Result<(), CliError> {
    let stats = session.api.fetch_summary_stats().await?;
    match output_mode(cli) {
        OutputMode::Human => print_stats(&stats),
        OutputMode::Json => {
            let payload = json!({
                "command": "stats",
                "stats": serde_json::to_value(&stats)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

async fn run_events(cli: &Cli, session: &Session, args: &EventsArgs) -> Result<(), CliError> {
    let state = events_query_state(args)?;
    let view = EventsView::new(session.page_size());
    let page = view
        .load(session.api.as_ref(), &view.params_for(&state))
        .await?;

    match output_mode(cli) {
        OutputMode::Human => {
            print_event_page(&page);
            print_page_controls(&page.pagination);
            println!("Share: ?{}", state.to_query_string());
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "events",
                "query": state.to_query_string(),
                "events": serde_json::to_value(&page.events)?,
                "pagination": pagination_json(&page.pagination),
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

async fn run_event(cli: &Cli, session: &Session, args: &EventArgs) -> Result<(), CliError> {
    let id = args.id.trim();
    if id.is_empty() {
        return Err(CliError::User("event id must not be empty".to_owned()));
    }
    let event = session.api.fetch_event(id).await?;
    match output_mode(cli) {
        OutputMode::Human => print_event(&event),
        OutputMode::Json => {
            let payload = json!({
                "command": "event",
                "event": serde_json::to_value(&event)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

async fn run_fixes(cli: &Cli, session: &Session, args: &FixesArgs) -> Result<(), CliError> {
    let state = fixes_query_state(args)?;
    let view = FixesView::new(session.page_size());
    let page = view
        .load(session.api.as_ref(), &view.params_for(&state))
        .await?;

    match output_mode(cli) {
        OutputMode::Human => {
            print_fix_page(&page);
            print_page_controls(&page.pagination);
            println!("Share: ?{}", state.to_query_string());
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "fixes",
                "query": state.to_query_string(),
                "fixes": serde_json::to_value(&page.fixes)?,
                "pagination": pagination_json(&page.pagination),
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

async fn run_queue(cli: &Cli, session: &Session, args: &QueueArgs) -> Result<(), CliError> {
    let mode = output_mode(cli);
    match args.command {
        None | Some(QueueCommand::Status) => {
            let stats = session.api.fetch_queue_stats().await?;
            match mode {
                OutputMode::Human => print_queue(&stats),
                OutputMode::Json => {
                    let payload = json!({
                        "command": "queue status",
                        "queue": serde_json::to_value(&stats)?,
                    });
                    write_json_line(&payload)?;
                }
            }
        }
        Some(QueueCommand::RetryFailed) => {
            let outcome = session.views().queue_actions().retry_failed(None).await?;
            match mode {
                OutputMode::Human => {
                    println!("{}", outcome.message.green());
                    for id in &outcome.job_ids {
                        println!("  {id}");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "queue retry-failed",
                        "message": outcome.message,
                        "job_ids": outcome.job_ids,
                    });
                    write_json_line(&payload)?;
                }
            }
        }
        Some(QueueCommand::Purge) => {
            let outcome = session.views().queue_actions().purge(None).await?;
            match mode {
                OutputMode::Human => println!("{}", outcome.message.green()),
                OutputMode::Json => {
                    let payload = json!({
                        "command": "queue purge",
                        "message": outcome.message,
                    });
                    write_json_line(&payload)?;
                }
            }
        }
    }
    Ok(())
}

async fn run_health(cli: &Cli, session: &Session) -> Result<(), CliError> {
    let snapshot = ServerStatusView::default().load(session.api.as_ref(), &()).await?;
    match output_mode(cli) {
        OutputMode::Human => println!("{}", describe_health(&snapshot)),
        OutputMode::Json => {
            let payload = json!({
                "command": "health",
                "status": snapshot.label(),
                "health": serde_json::to_value(&snapshot)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ──────────────────── watch ────────────────────

async fn run_watch(cli: &Cli, session: &Session, args: &WatchArgs) -> Result<(), CliError> {
    let views = session.views();
    // The synchronizer owns the sender side; it must outlive the view.
    let sync = QuerySync::mount(MemoryLocation::from_query_string(
        args.query.as_deref().unwrap_or_default(),
    ));

    match args.view {
        WatchTarget::Dashboard => follow(cli, views.dashboard(), describe_stats).await,
        WatchTarget::Events => follow(cli, views.events(sync.subscribe()), describe_events).await,
        WatchTarget::Fixes => follow(cli, views.fixes(sync.subscribe()), describe_fixes).await,
        WatchTarget::Queue => follow(cli, views.queue(), describe_queue).await,
        WatchTarget::Event => {
            let id = args
                .id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| CliError::User("watch event requires --id".to_owned()))?;
            follow(cli, views.event_detail(id), describe_event).await
        }
        WatchTarget::Health => follow_health(cli, &views).await,
    }
}

/// Print every published snapshot of `handle` until Ctrl-C.
async fn follow<P, T>(
    cli: &Cli,
    mut handle: ViewHandle<P, T>,
    describe: fn(&T) -> String,
) -> Result<(), CliError>
where
    T: Clone + Serialize,
{
    let mode = output_mode(cli);
    let name = handle.name();
    emit_snapshot(mode, name, &handle.snapshot(), describe)?;

    let stop = tokio::signal::ctrl_c();
    tokio::pin!(stop);
    loop {
        tokio::select! {
            _ = &mut stop => break,
            next = handle.changed() => match next {
                Some(state) => emit_snapshot(mode, name, &state, describe)?,
                None => break,
            },
        }
    }
    Ok(())
}

async fn follow_health(cli: &Cli, views: &Views) -> Result<(), CliError> {
    let mode = output_mode(cli);
    let mut monitor = views.health();

    let stop = tokio::signal::ctrl_c();
    tokio::pin!(stop);
    loop {
        tokio::select! {
            _ = &mut stop => break,
            next = monitor.changed() => match next {
                Some(snapshot) => match mode {
                    OutputMode::Human => {
                        println!("[{}] {}", clock(), describe_health(&snapshot));
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "watch",
                            "view": "health",
                            "status": snapshot.label(),
                            "health": serde_json::to_value(&snapshot)?,
                        });
                        write_json_line(&payload)?;
                    }
                },
                None => break,
            },
        }
    }
    Ok(())
}

fn emit_snapshot<T: Serialize>(
    mode: OutputMode,
    view: &str,
    state: &FetchState<T>,
    describe: fn(&T) -> String,
) -> Result<(), CliError> {
    match mode {
        OutputMode::Human => {
            let mut line = format!("[{}] {view:<9} {:<10}", clock(), state.phase.as_str());
            if let Some(error) = &state.error {
                line.push_str(&error.red().to_string());
            } else if let Some(data) = &state.data {
                line.push_str(&describe(data));
                if state.placeholder {
                    line.push_str(&" (placeholder)".dimmed().to_string());
                }
            }
            if state.error.is_none()
                && let Some(stale) = &state.last_error
            {
                line.push_str(&format!("  stale: {stale}").yellow().to_string());
            }
            println!("{line}");
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "watch",
                "view": view,
                "state": serde_json::to_value(state)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn clock() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    match args.command {
        None | Some(ConfigCommand::Show) => {
            let webhook = config.gateway.webhook_url()?;
            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                    println!("Webhook endpoint: {webhook}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                        "webhook_url": webhook.as_str(),
                    });
                    write_json_line(&payload)?;
                }
            }
        }
        Some(ConfigCommand::Hash) => {
            let hash = config.stable_hash()?;
            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{hash}");
                    println!("  Source: {}", config.paths.config_file.display());
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config hash",
                        "path": config.paths.config_file.to_string_lossy(),
                        "hash": hash,
                    });
                    write_json_line(&payload)?;
                }
            }
        }
    }
    Ok(())
}

// ──────────────────── argument mapping ────────────────────

fn events_query_state(args: &EventsArgs) -> Result<QueryState, CliError> {
    let mut sync = mount_shared_query(args.query.as_deref());
    if let Some(raw) = &args.status {
        sync.set_status_filter(parse_status(raw)?);
    }
    if let Some(repo) = &args.repo {
        sync.set_search(repo.trim());
    }
    apply_page(sync, args.page)
}

fn fixes_query_state(args: &FixesArgs) -> Result<QueryState, CliError> {
    let mut sync = mount_shared_query(args.query.as_deref());
    if let Some(raw) = &args.confidence {
        sync.set_confidence_filter(parse_confidence(raw)?);
    }
    apply_page(sync, args.page)
}

/// Filter flags go through the synchronizer first so they reset the page;
/// an explicit `--page` is applied last and wins.
fn mount_shared_query(query: Option<&str>) -> QuerySync<MemoryLocation> {
    let raw = query.unwrap_or_default();
    QuerySync::mount(MemoryLocation::from_query_string(raw))
}

fn apply_page(
    mut sync: QuerySync<MemoryLocation>,
    page: Option<u32>,
) -> Result<QueryState, CliError> {
    if let Some(page) = page {
        if page == 0 {
            return Err(CliError::User("--page must be >= 1".to_owned()));
        }
        sync.set_page(page);
    }
    Ok(sync.state().clone())
}

fn parse_status(raw: &str) -> Result<StatusFilter, CliError> {
    let label = raw.trim().to_ascii_uppercase();
    if label == StatusFilter::All.as_str() {
        return Ok(StatusFilter::All);
    }
    EventStatus::parse(&label)
        .map(StatusFilter::Only)
        .ok_or_else(|| {
            CliError::User(format!(
                "unknown status {raw:?}; expected ALL, DETECTED, ANALYZING, FIXING, FIXED, or FAILED"
            ))
        })
}

fn parse_confidence(raw: &str) -> Result<ConfidenceFilter, CliError> {
    let label = raw.trim().to_ascii_uppercase();
    if label == ConfidenceFilter::All.as_str() {
        return Ok(ConfidenceFilter::All);
    }
    ConfidenceBucket::parse(&label)
        .map(ConfidenceFilter::Only)
        .ok_or_else(|| {
            CliError::User(format!(
                "unknown confidence {raw:?}; expected ALL, HIGH, MEDIUM, or LOW"
            ))
        })
}

// ──────────────────── human rendering ────────────────────

fn paint_status(status: EventStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        EventStatus::Fixed => label.green(),
        EventStatus::Failed => label.red(),
        EventStatus::Detected => label.yellow(),
        EventStatus::Analyzing | EventStatus::Fixing => label.cyan(),
    }
}

fn paint_confidence(confidence: f64) -> ColoredString {
    let label = format!("{:>3.0}%", confidence * 100.0);
    match ConfidenceBucket::from_score(confidence) {
        ConfidenceBucket::High => label.green(),
        ConfidenceBucket::Medium => label.yellow(),
        ConfidenceBucket::Low => label.red(),
    }
}

fn print_stats(stats: &Stats) {
    println!("{}", "Dashboard".bold());
    println!("  {}", describe_stats(stats));
    if !stats.top_repos.is_empty() {
        println!("{}", "Top repositories".bold());
        for repo in &stats.top_repos {
            println!("  {:<40} {}", repo.repo, repo.count);
        }
    }
    if !stats.recent_events.is_empty() {
        println!("{}", "Recent events".bold());
        for event in &stats.recent_events {
            print_event_row(event);
        }
    }
}

fn print_event_row(event: &Event) {
    println!(
        "  {:<12} {:<10} {:<32} {:<16} {}",
        event.id,
        paint_status(event.status),
        event.repo_full_name,
        event.branch,
        event.error_type
    );
}

fn print_event_page(page: &EventPage) {
    if page.events.is_empty() {
        println!("No events found.");
        return;
    }
    for event in &page.events {
        print_event_row(event);
    }
}

fn print_event(event: &Event) {
    println!("{} {}", event.id.bold(), paint_status(event.status));
    println!("  Repository: {}", event.repo_full_name);
    println!("  Branch:     {}", event.branch);
    println!("  Commit:     {}", event.commit_sha);
    println!("  Location:   {}:{}", event.file_path, event.line_number);
    println!("  Error:      {}: {}", event.error_type, event.error_message);
    if let Some(confidence) = event.confidence {
        println!("  Confidence: {}", paint_confidence(confidence));
    }
    if let Some(url) = &event.pr_url {
        println!("  Pull request: {url}");
    }
    println!("  Updated:    {}", event.updated_at.to_rfc3339());
    if !event.fix_attempts.is_empty() {
        println!("{}", "Fix attempts".bold());
        for fix in &event.fix_attempts {
            println!(
                "  {:<12} {} {:?}  {}",
                fix.id,
                paint_confidence(fix.confidence),
                fix.status,
                fix.diff_summary
            );
        }
    }
}

fn print_fix_page(page: &FixPage) {
    if page.fixes.is_empty() {
        println!("No fixes found.");
        return;
    }
    for fix in &page.fixes {
        let repo = fix
            .failure_event
            .as_ref()
            .map_or("-", |parent| parent.repo_full_name.as_str());
        println!(
            "  {:<12} {} {:<8} {:<32} {}",
            fix.id,
            paint_confidence(fix.confidence),
            format!("{:?}", fix.status).to_lowercase(),
            repo,
            fix.diff_summary
        );
    }
}

fn print_queue(stats: &QueueStats) {
    println!("{}", "Queue".bold());
    println!("  {}", describe_queue(stats));
    println!("  Completed: {}", stats.counts.completed);
    if !stats.recent_failed.is_empty() {
        println!("{}", "Recent failures".bold());
        for job in &stats.recent_failed {
            println!(
                "  {:<12} attempts={} {}",
                job.id,
                job.attempts_made,
                job.failed_reason.red()
            );
        }
    }
}

fn print_page_controls(pagination: &Pagination) {
    let controls = PageControls::new(pagination.page, pagination.pages);
    if !controls.is_visible() {
        return;
    }
    let window = controls
        .visible_pages
        .iter()
        .map(|&n| {
            if n == controls.page {
                format!("[{n}]").bold().to_string()
            } else {
                n.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let prev = if controls.prev.is_some() { "<" } else { " " };
    let next = if controls.next.is_some() { ">" } else { " " };
    println!(
        "Page {} of {} ({} total)  {prev} {window} {next}",
        controls.page, controls.total_pages, pagination.total
    );
}

fn pagination_json(pagination: &Pagination) -> Value {
    let controls = PageControls::new(pagination.page, pagination.pages);
    json!({
        "page": controls.page,
        "pages": controls.total_pages,
        "limit": pagination.limit,
        "total": pagination.total,
        "window": controls.visible_pages,
        "prev": controls.prev,
        "next": controls.next,
    })
}

fn describe_stats(stats: &Stats) -> String {
    format!(
        "{} events: {} fixed, {} failed, {} pending ({}% success)",
        stats.total_events,
        stats.fixed_events,
        stats.failed_events,
        stats.pending_events,
        stats.success_rate
    )
}

fn describe_events(page: &EventPage) -> String {
    format!(
        "{} events on page {}/{}",
        page.events.len(),
        page.pagination.page,
        page.pagination.pages
    )
}

fn describe_fixes(page: &FixPage) -> String {
    format!(
        "{} fixes on page {}/{}",
        page.fixes.len(),
        page.pagination.page,
        page.pagination.pages
    )
}

fn describe_queue(stats: &QueueStats) -> String {
    format!(
        "active={} waiting={} failed={}",
        stats.active, stats.waiting, stats.failed
    )
}

fn describe_event(event: &Event) -> String {
    format!(
        "{} {} {}",
        event.status.as_str(),
        event.repo_full_name,
        event.error_type
    )
}

fn describe_health(snapshot: &HealthSnapshot) -> String {
    let label = match snapshot.online {
        Some(true) => snapshot.label().green(),
        Some(false) => snapshot.label().red(),
        None => snapshot.label().yellow(),
    };
    match (&snapshot.server_name, &snapshot.server_version) {
        (Some(name), Some(version)) => format!("{label} ({name} {version})"),
        _ => label.to_string(),
    }
}

// ──────────────────── output plumbing ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("FIXPULSE_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
