//! Triage CLI - classify pending GitHub issues with a language model.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use triage::ai::provider_from_config;
use triage::analysis::{LabelStatistics, QuickTriage, QuickTriageRun};
use triage::storage::{write_with_fallback, QuickReport};
use triage::{
    exit_code, BatchOutcome, Category, ClassificationResult, Classifier, GitHubClient,
    IssueSource, KnowledgeBaseStore, MarkdownReport, ModelClient, ResultStore, TriageConfig,
    TriageError, TriagePipeline,
};

/// Triage - automated classification of pending-triage GitHub issues
#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Classify pending GitHub issues with an LLM", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to the configuration file
    #[arg(long, global = true, env = "TRIAGE_CONFIG", default_value = "triage.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Triage a batch of pending issues
    Run {
        /// Maximum number of issues to process
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Classify a single issue and print the result
    Classify {
        /// Issue number
        number: u64,
    },

    /// Manage the knowledge base of triaged issues
    Kb {
        #[command(subcommand)]
        command: KbCommands,
    },

    /// Apply a category label and remove the pending label
    Label {
        /// Issue number
        number: u64,

        /// Category (bug, feature, question, usability)
        #[arg(long, value_parser = parse_category)]
        category: Category,
    },

    /// Show label statistics for pending issues
    Stats {
        /// Maximum number of issues to inspect
        #[arg(long, default_value = "1000")]
        limit: usize,
    },

    /// Categorize pending issues from title and description only
    Quick {
        /// Maximum number of issues to process
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Show the most recent batch results
    Show,

    /// Run batches on a fixed interval
    Watch {
        /// Seconds between batches
        #[arg(long, default_value = "86400", value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: u64,

        /// Maximum number of issues per batch
        #[arg(long, default_value = "100")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum KbCommands {
    /// Rebuild the knowledge base from already triaged issues
    Build {
        /// Maximum number of issues to include
        #[arg(long, default_value = "2000")]
        max_issues: usize,
    },

    /// Show knowledge base status
    Status,
}

fn parse_category(s: &str) -> Result<Category, String> {
    let name = if s.eq_ignore_ascii_case("feature") { "feature request" } else { s };
    Category::parse(name)
        .ok_or_else(|| format!("unknown category '{s}' (expected bug, feature, question or usability)"))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    if let Err(e) = run(cli).await {
        let code = e
            .downcast_ref::<TriageError>()
            .map_or(exit_code::FAILURE, TriageError::exit_code);
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(code);
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "triage=debug,info" } else { "triage=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = TriageConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    // Local-only commands work without credentials
    match &cli.command {
        Commands::Show => return cmd_show(&config),
        Commands::Kb {
            command: KbCommands::Status,
        } => {
            cmd_kb_status(&config);
            return Ok(());
        }
        _ => {}
    }

    if let Err(e) = config.validate() {
        if let TriageError::Config(problems) = &e {
            for problem in problems {
                eprintln!("  {} {problem}", "-".red());
            }
        }
        return Err(e.into());
    }

    match cli.command {
        Commands::Run { limit } => cmd_run(&config, limit).await,
        Commands::Classify { number } => cmd_classify(&config, number).await,
        Commands::Kb {
            command: KbCommands::Build { max_issues },
        } => cmd_kb_build(&config, max_issues).await,
        Commands::Label { number, category } => cmd_label(&config, number, category).await,
        Commands::Stats { limit } => cmd_stats(&config, limit).await,
        Commands::Quick { limit } => cmd_quick(&config, limit).await,
        Commands::Watch {
            interval_secs,
            limit,
        } => cmd_watch(&config, Duration::from_secs(interval_secs), limit).await,
        Commands::Show
        | Commands::Kb {
            command: KbCommands::Status,
        } => Ok(()),
    }
}

fn github_client(config: &TriageConfig) -> Result<Arc<GitHubClient>> {
    Ok(Arc::new(GitHubClient::new(&config.github, &config.pacing)?))
}

fn model_client(config: &TriageConfig) -> Result<ModelClient> {
    let provider = provider_from_config(&config.ai)?;
    Ok(ModelClient::from_config(provider, &config.ai))
}

fn knowledge_store(config: &TriageConfig) -> KnowledgeBaseStore {
    KnowledgeBaseStore::open(&config.output.knowledge_base_path)
        .with_pause(Duration::from_millis(config.pacing.kb_pause_ms))
}

fn pipeline(config: &TriageConfig) -> Result<TriagePipeline> {
    let source: Arc<dyn IssueSource> = github_client(config)?;
    let classifier = Classifier::new(model_client(config)?, Some(source.clone()))?;

    Ok(TriagePipeline::new(
        source,
        classifier,
        knowledge_store(config).into_knowledge_base(),
        ResultStore::new(&config.output.results_path, &config.output.fallback_dir),
        Some(MarkdownReport::new(&config.output.report_path)),
        config.pacing.issue_delay(),
    ))
}

async fn cmd_run(config: &TriageConfig, limit: usize) -> Result<()> {
    println!("🔍 Triaging up to {limit} pending issues\n");

    let outcome = pipeline(config)?.execute(limit).await?;
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &BatchOutcome) {
    if outcome.fetched == 0 {
        println!("📭 No pending issues");
        return;
    }

    println!("\n📊 Triage Summary");
    println!("   Fetched: {}", outcome.fetched);
    println!("   Classified: {}", outcome.results.len());
    for (category, count) in &outcome.summary.by_category {
        println!("   {} {category}: {count}", category.emoji());
    }
    if outcome.summary.flagged_for_review > 0 {
        println!(
            "   {} {}",
            "Needs manual review:".yellow(),
            outcome.summary.flagged_for_review
        );
    }
    if outcome.summary.failed > 0 {
        println!("   {} {}", "Failed:".red(), outcome.summary.failed);
    }
    if let Some(path) = &outcome.artifact {
        println!("\n✅ Results saved to {}", path.display());
    }
}

async fn cmd_classify(config: &TriageConfig, number: u64) -> Result<()> {
    let source: Arc<dyn IssueSource> = github_client(config)?;
    let classifier = Classifier::new(model_client(config)?, Some(source.clone()))?;
    let store = knowledge_store(config);

    let issue = source.fetch_issue(number).await?;
    println!("🔖 Classifying #{}: {}\n", issue.number, issue.title);

    let result = classifier.classify(&issue, store.knowledge_base()).await?;
    print_result(&result);
    Ok(())
}

fn print_result(result: &ClassificationResult) {
    println!(
        "{} #{} {}",
        result.category.emoji(),
        result.issue_number,
        result.issue_title.bold()
    );
    println!("   Category: {}", result.category.to_string().cyan());
    println!("   Confidence: {}%", result.confidence());
    println!("   Reasoning: {}", result.reasoning);
    if result.needs_manual_review() {
        println!("   {}", "Needs manual review".yellow());
    }
    if !result.suggested_labels.is_empty() {
        println!("   Labels: {}", result.suggested_labels.join(", "));
    }
    if let Some(reproducibility) = result.reproducibility {
        println!("   Reproducibility: {reproducibility}");
    }
    if result.is_duplicate {
        let refs = result
            .duplicate_of
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|n| format!("#{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("   {} {refs}", "Possible duplicate of".yellow());
    }
    if !result.suggested_response.is_empty() {
        println!("\n   Suggested response:\n   {}", result.suggested_response);
    }
    println!("   {}", result.issue_url.dimmed());
}

async fn cmd_kb_build(config: &TriageConfig, max_issues: usize) -> Result<()> {
    println!("📚 Building knowledge base from up to {max_issues} triaged issues\n");

    let source = github_client(config)?;
    let mut store = knowledge_store(config);
    let stats = store.build(source.as_ref(), max_issues).await?;

    println!("✅ Knowledge base saved to {}", config.output.knowledge_base_path.display());
    println!("   Fetched: {}", stats.fetched);
    println!("   Included: {}", stats.included);
    println!("   Skipped: {}", stats.skipped);
    Ok(())
}

fn cmd_kb_status(config: &TriageConfig) {
    let status = knowledge_store(config).status();
    if !status.exists {
        println!(
            "📭 No knowledge base at {}. Run `triage kb build` first.",
            config.output.knowledge_base_path.display()
        );
        return;
    }

    println!("📚 Knowledge base: {}", config.output.knowledge_base_path.display());
    println!("   Issues analyzed: {}", status.total_issues_analyzed);
    if let Some(created) = status.created_at {
        println!("   Created: {}", created.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(updated) = status.last_updated {
        println!("   Last updated: {}", updated.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    for (category, count) in &status.category_distribution {
        println!("   {} {category}: {count}", category.emoji());
    }
}

async fn cmd_label(config: &TriageConfig, number: u64, category: Category) -> Result<()> {
    let client = github_client(config)?;
    let add = [category.type_label().to_string()];
    let remove = [client.pending_label().to_string()];

    let labels = client.update_labels(number, &add, &remove).await?;
    println!(
        "✅ #{number} labelled {} (labels: {})",
        category.type_label().green(),
        labels.join(", ")
    );
    Ok(())
}

async fn cmd_stats(config: &TriageConfig, limit: usize) -> Result<()> {
    let client = github_client(config)?;
    let issues = client.fetch_pending_issues(limit).await?;
    let stats = LabelStatistics::from_issues(&issues);

    println!("📊 Pending issues: {}\n", stats.total);
    for (kind, count) in &stats.by_kind {
        println!("   {kind}: {count}");
    }
    Ok(())
}

async fn cmd_quick(config: &TriageConfig, limit: usize) -> Result<()> {
    println!("⚡ Quick triage of up to {limit} pending issues\n");

    let source = github_client(config)?;
    let quick = QuickTriage::new(model_client(config)?)?;
    let run = quick.run(source.as_ref(), limit).await?;

    print_quick(&run);
    if run.results.is_empty() {
        return Ok(());
    }

    let path = write_with_fallback(
        &config.output.quick_results_path,
        &config.output.fallback_dir,
        "quick-triage",
        &run,
    )?;
    if let Err(e) = QuickReport::new(&config.output.quick_report_path).append(&run) {
        tracing::warn!(error = %e, "Failed to update quick triage report");
    }
    println!("\n✅ Results saved to {}", path.display());
    Ok(())
}

fn print_quick(run: &QuickTriageRun) {
    for result in &run.results {
        println!(
            "{} #{} {} - {}",
            result.category.emoji(),
            result.issue_number,
            result.issue_title.bold(),
            result.reason
        );
    }
    println!(
        "\nCategorized {} of {} ({} failed)",
        run.results.len(),
        run.fetched,
        run.failed
    );
}

fn cmd_show(config: &TriageConfig) -> Result<()> {
    let store = ResultStore::new(&config.output.results_path, &config.output.fallback_dir);
    let run = store
        .load_latest()
        .with_context(|| format!("No results at {}", store.primary().display()))?;

    let info = &run.triage_run;
    println!(
        "📋 Triage run {} ({} issues)\n",
        info.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        info.total_issues
    );
    for (category, count) in &info.summary {
        println!("   {category}: {count}");
    }
    println!(
        "   Needs manual review: {}, failed: {}\n",
        info.flagged_for_review, info.failed
    );
    for result in &run.results {
        print_result(result);
        println!();
    }
    Ok(())
}

async fn cmd_watch(config: &TriageConfig, interval: Duration, limit: usize) -> Result<()> {
    let pipeline = pipeline(config)?;
    let mut ticker = tokio::time::interval(interval);
    info!(interval_secs = interval.as_secs(), limit, "Starting scheduled triage");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let code = pipeline.run_batch(limit).await;
                if code == exit_code::SUCCESS {
                    info!("Scheduled batch finished");
                } else {
                    error!(code, "Scheduled batch failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        }
    }
}
