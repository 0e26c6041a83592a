//! Shareable link commands.

use clap::{Args, Subcommand};
use std::io::{self, Write};
use uuid::Uuid;

use worklog_core::report::Elapsed;
use worklog_core::{
    canonical_digest, share_url, HttpShareClient, LinkView, PublishStatus, PushOutcome,
    ShareableLink, StoreError, Summary, SyncCoordinator, SyncError, SyncStatus,
};

use super::log::print_entries;
use super::OutputFormat;
use crate::config::Config;
use crate::db::Repos;

#[derive(Args)]
pub struct LinkCommand {
    #[command(subcommand)]
    command: LinkSubcommand,
}

#[derive(Subcommand)]
enum LinkSubcommand {
    /// Publish the work log as a shareable link
    Publish,

    /// Overwrite a link's content with the current work log
    Push {
        /// Link key
        key: Uuid,
    },

    /// Show a shared work log (read-only)
    Pull {
        /// Link key or view address (key[+project[+paid|not-paid]])
        view: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List known links
    List {
        /// Skip the metadata refresh from the share server
        #[arg(long)]
        offline: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show whether links match the current work log
    Status {
        /// Only this link
        key: Option<Uuid>,
    },

    /// Forget a link locally (the shared document stays online)
    Delete {
        /// Link key
        key: Uuid,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Print the address of a shared view
    Url {
        /// Link key
        key: Uuid,

        /// Only this project
        #[arg(long)]
        project: Option<String>,

        /// Only paid entries
        #[arg(long, conflicts_with = "not_paid")]
        paid: bool,

        /// Only entries waiting for payment
        #[arg(long)]
        not_paid: bool,

        /// Base URL of the viewer (default: share.server_url)
        #[arg(long)]
        base: Option<String>,
    },
}

impl LinkCommand {
    pub async fn run(&self, repos: &Repos, config: &Config) -> Result<(), LinkCommandError> {
        match &self.command {
            LinkSubcommand::Publish => self.publish(repos, config).await,
            LinkSubcommand::Push { key } => self.push(repos, config, *key).await,
            LinkSubcommand::Pull { view, format } => self.pull(repos, config, view, format).await,
            LinkSubcommand::List { offline, format } => {
                self.list(repos, config, *offline, format).await
            }
            LinkSubcommand::Status { key } => self.status(repos, *key).await,
            LinkSubcommand::Delete { key, force } => self.delete(repos, config, *key, *force).await,
            LinkSubcommand::Url {
                key,
                project,
                paid,
                not_paid,
                base,
            } => {
                let mut view = LinkView::new(*key);
                if let Some(project) = project {
                    view = view.with_project(project);
                }
                if *paid || *not_paid {
                    view = view.with_paid(*paid);
                }
                let base = base
                    .as_deref()
                    .or(config.share.server_url.as_deref())
                    .ok_or(LinkCommandError::NotConfigured)?;
                println!("{}", share_url(base, &view));
                Ok(())
            }
        }
    }

    async fn publish(&self, repos: &Repos, config: &Config) -> Result<(), LinkCommandError> {
        let entries = repos.entries.list().await?;
        if entries.is_empty() {
            return Err(LinkCommandError::NothingToPublish);
        }

        let sync = coordinator(repos, config)?;
        println!("Publishing {} entries...", entries.len());
        let outcome = sync.publish(&entries).await?;

        match outcome.status {
            PublishStatus::Created => println!("✓ Published link {}", outcome.key),
            PublishStatus::AlreadyExists => {
                println!("A link for this exact content already exists: {}", outcome.key)
            }
        }
        if let Some(base) = &config.share.server_url {
            println!("  {}", share_url(base, &LinkView::new(outcome.key)));
        }
        Ok(())
    }

    async fn push(&self, repos: &Repos, config: &Config, key: Uuid) -> Result<(), LinkCommandError> {
        let entries = repos.entries.list().await?;
        let sync = coordinator(repos, config)?;

        match sync.push(key, &entries).await? {
            PushOutcome::Disabled => {
                println!("Nothing to push: link {} matches the work log.", key);
            }
            PushOutcome::Pushed { link, .. } => {
                println!("✓ Pushed {} entries to {}", link.worklog.len(), key);
                println!("  views: {}", link.view_count);
            }
        }
        Ok(())
    }

    async fn pull(
        &self,
        repos: &Repos,
        config: &Config,
        view: &str,
        format: &OutputFormat,
    ) -> Result<(), LinkCommandError> {
        let view = LinkView::parse(view);
        let key = view.key.ok_or(LinkCommandError::InvalidView)?;
        let sync = coordinator(repos, config)?;

        let document = sync.pull_filtered(key, &view.filter()).await?;

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&document)?);
            }
            OutputFormat::Text => {
                println!("Shared work log {}", key);
                if let Some(project) = &view.project {
                    println!("Project: {}", project);
                }
                println!("Views: {}", document.view_count);
                println!();
                if document.worklog.is_empty() {
                    println!("No entries found");
                } else {
                    print_entries(&document.worklog);
                    let summary = Summary::of(&document.worklog);
                    println!();
                    println!("Total:   {}", Elapsed(summary.total_seconds));
                    println!("Paid:    {}", Elapsed(summary.paid_seconds));
                    println!("Waiting: {}", Elapsed(summary.unpaid_seconds));
                }
            }
        }
        Ok(())
    }

    async fn list(
        &self,
        repos: &Repos,
        config: &Config,
        offline: bool,
        format: &OutputFormat,
    ) -> Result<(), LinkCommandError> {
        let links = if offline || config.share.server_url.is_none() {
            repos.links.list().await?
        } else {
            match coordinator(repos, config)?.refresh_link_list().await {
                Ok(links) => links,
                Err(e) if e.is_retryable() => {
                    eprintln!("Warning: could not refresh links ({}); showing cached data", e);
                    repos.links.list().await?
                }
                Err(e) => return Err(e.into()),
            }
        };

        if links.is_empty() {
            println!("No links found");
            return Ok(());
        }

        match format {
            OutputFormat::Json => {
                let metadata: Vec<_> = links.iter().map(ShareableLink::metadata).collect();
                println!("{}", serde_json::to_string_pretty(&metadata)?);
            }
            OutputFormat::Text => {
                let digest = canonical_digest(&repos.entries.list().await?);
                println!(
                    "{:<36}  {:<16}  {:<16}  {:>6}  STATUS",
                    "KEY", "CREATED", "MODIFIED", "VIEWS"
                );
                println!("{}", "-".repeat(92));
                for link in &links {
                    println!(
                        "{:<36}  {:<16}  {:<16}  {:>6}  {}",
                        link.key,
                        link.date_creation.format("%Y-%m-%d %H:%M"),
                        link.date_modification
                            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        link.view_count,
                        status_label(link, &digest)
                    );
                }
                println!("\nTotal: {} link(s)", links.len());
            }
        }
        Ok(())
    }

    async fn status(&self, repos: &Repos, key: Option<Uuid>) -> Result<(), LinkCommandError> {
        let digest = canonical_digest(&repos.entries.list().await?);
        let links = match key {
            Some(key) => vec![repos
                .links
                .get(key)
                .await?
                .ok_or(SyncError::NotFound(key))?],
            None => repos.links.list().await?,
        };

        if links.is_empty() {
            println!("No links found");
            return Ok(());
        }
        for link in &links {
            println!("{}  {}", link.key, status_label(link, &digest));
        }
        Ok(())
    }

    async fn delete(
        &self,
        repos: &Repos,
        config: &Config,
        key: Uuid,
        force: bool,
    ) -> Result<(), LinkCommandError> {
        if repos.links.get(key).await?.is_none() {
            return Err(SyncError::NotFound(key).into());
        }

        if !force {
            print!("Forget link {}? The shared document stays online. [y/N] ", key);
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        if config.share.server_url.is_some() {
            coordinator(repos, config)?.delete(key).await?;
        } else {
            repos.links.delete(key).await?;
        }
        println!("Removed link {} from this device", key);
        Ok(())
    }
}

fn coordinator(
    repos: &Repos,
    config: &Config,
) -> Result<SyncCoordinator<HttpShareClient>, LinkCommandError> {
    let url = config
        .share
        .server_url
        .as_deref()
        .ok_or(LinkCommandError::NotConfigured)?;
    let client = HttpShareClient::new(url, config.share.timeout())?;
    Ok(SyncCoordinator::new(
        client,
        repos.links.clone(),
        config.share.timeout(),
    ))
}

fn status_label(link: &ShareableLink, current_digest: &str) -> &'static str {
    match SyncStatus::of(link, current_digest) {
        SyncStatus::InSync => "in sync",
        SyncStatus::Diverged => "changed (push available)",
    }
}

/// Errors from link commands
#[derive(Debug)]
pub enum LinkCommandError {
    NotConfigured,
    NothingToPublish,
    InvalidView,
    Sync(SyncError),
    Io(io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for LinkCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkCommandError::NotConfigured => write!(
                f,
                "Share server not configured. Set share.server_url in the config file or WORKLOG_SHARE_URL."
            ),
            LinkCommandError::NothingToPublish => write!(f, "Nothing to publish: the work log is empty"),
            LinkCommandError::InvalidView => write!(f, "Expected a link key or key+project+paid address"),
            LinkCommandError::Sync(e) => write!(f, "{}", e),
            LinkCommandError::Io(e) => write!(f, "{}", e),
            LinkCommandError::Json(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for LinkCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LinkCommandError::Sync(e) => Some(e),
            LinkCommandError::Io(e) => Some(e),
            LinkCommandError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SyncError> for LinkCommandError {
    fn from(e: SyncError) -> Self {
        LinkCommandError::Sync(e)
    }
}

impl From<StoreError> for LinkCommandError {
    fn from(e: StoreError) -> Self {
        LinkCommandError::Sync(SyncError::Storage(e))
    }
}

impl From<io::Error> for LinkCommandError {
    fn from(e: io::Error) -> Self {
        LinkCommandError::Io(e)
    }
}

impl From<serde_json::Error> for LinkCommandError {
    fn from(e: serde_json::Error) -> Self {
        LinkCommandError::Json(e)
    }
}
