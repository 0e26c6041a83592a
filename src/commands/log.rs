use clap::{Args, Subcommand};
use std::io::{self, Write};
use uuid::Uuid;

use worklog_core::report::{format_amount, Elapsed};
use worklog_core::{
    project_names, EntryChanges, EntryFilter, Summary, WorkDate, WorkLogEntry, WorkLogRepository,
};

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct LogCommand {
    #[command(subcommand)]
    pub command: LogSubcommand,
}

/// Paid-status selection shared by listing commands.
#[derive(Args, Default)]
pub struct PaidFilter {
    /// Only paid entries
    #[arg(long, conflicts_with = "unpaid")]
    paid: bool,

    /// Only entries waiting for payment
    #[arg(long)]
    unpaid: bool,
}

impl PaidFilter {
    fn value(&self) -> Option<bool> {
        match (self.paid, self.unpaid) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Subcommand)]
pub enum LogSubcommand {
    /// Record time spent on a project
    Add {
        /// Project name
        project: String,

        /// Time spent, e.g. "1h30m", "45m", "90s" or plain seconds
        duration: String,

        /// Day the work was done (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,

        /// Record as already paid
        #[arg(long)]
        paid: bool,
    },

    /// List entries in creation order
    List {
        /// Only this project
        #[arg(long)]
        project: Option<String>,

        #[command(flatten)]
        paid: PaidFilter,

        /// Include entries saved against this link
        #[arg(long, value_name = "KEY")]
        link: Option<Uuid>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Change an existing entry
    Edit {
        /// Entry ID
        id: Uuid,

        /// New project name
        #[arg(long)]
        project: Option<String>,

        /// New duration
        #[arg(long)]
        duration: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// New notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Mark entries as paid
    MarkPaid(SelectArgs),

    /// Mark entries as not paid
    MarkUnpaid(SelectArgs),

    /// Totals and earnings
    Summary {
        /// Only this project
        #[arg(long)]
        project: Option<String>,

        #[command(flatten)]
        paid: PaidFilter,

        /// Hourly rate (default: billing.rate_per_hour)
        #[arg(long)]
        rate: Option<f64>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List project names
    Projects,

    /// Delete every entry
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

/// Entry selection for bulk edits: explicit ids, or every entry of a project.
#[derive(Args)]
pub struct SelectArgs {
    /// Entry IDs
    ids: Vec<Uuid>,

    /// Every entry of this project
    #[arg(long, conflicts_with = "ids")]
    project: Option<String>,
}

impl LogCommand {
    pub async fn run(
        &self,
        repo: &WorkLogRepository,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            LogSubcommand::Add {
                project,
                duration,
                date,
                notes,
                paid,
            } => {
                if project.trim().is_empty() {
                    return Err("Project name cannot be empty".into());
                }
                let seconds = parse_duration(duration)?;
                let date = match date {
                    Some(d) => parse_date(d)?,
                    None => WorkDate::today(),
                };

                let mut entry = WorkLogEntry::new(project.trim(), seconds, date).with_paid(*paid);
                if let Some(notes) = notes {
                    entry = entry.with_notes(notes);
                }

                let created = repo.create(&entry).await?;
                println!("Logged entry {}:", created.id);
                println!("  {}", created);
                Ok(())
            }

            LogSubcommand::List {
                project,
                paid,
                link,
                format,
            } => {
                let entries = match link {
                    Some(key) => repo.list_for_link(*key).await?,
                    None => repo.list().await?,
                };
                let filter = EntryFilter {
                    project: project.clone(),
                    paid: paid.value(),
                };
                let entries = filter.apply(&entries);

                if entries.is_empty() {
                    println!("No entries found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&entries)?);
                    }
                    OutputFormat::Text => {
                        print_entries(&entries);
                        let summary = Summary::of(&entries);
                        println!(
                            "\nTotal: {} in {} entries",
                            Elapsed(summary.total_seconds),
                            summary.entry_count
                        );
                    }
                }
                Ok(())
            }

            LogSubcommand::Edit {
                id,
                project,
                duration,
                date,
                notes,
            } => {
                let has_updates =
                    project.is_some() || duration.is_some() || date.is_some() || notes.is_some();
                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let mut entry = match repo.get(*id).await? {
                    Some(e) => e,
                    None => return Err(format!("Entry not found: {}", id).into()),
                };

                if let Some(project) = project {
                    if project.trim().is_empty() {
                        return Err("Project name cannot be empty".into());
                    }
                    entry.project_name = project.trim().to_string();
                }
                if let Some(duration) = duration {
                    entry.seconds = parse_duration(duration)?;
                }
                if let Some(date) = date {
                    entry.date = parse_date(date)?;
                }
                if let Some(notes) = notes {
                    entry.notes = notes.clone();
                }

                let updated = repo.update(&entry).await?;
                println!("Updated entry:");
                println!("  {}", updated);
                Ok(())
            }

            LogSubcommand::MarkPaid(select) => mark(repo, select, true).await,
            LogSubcommand::MarkUnpaid(select) => mark(repo, select, false).await,

            LogSubcommand::Summary {
                project,
                paid,
                rate,
                format,
            } => {
                let filter = EntryFilter {
                    project: project.clone(),
                    paid: paid.value(),
                };
                let entries = filter.apply(&repo.list().await?);
                let summary = Summary::of(&entries);
                let rate = rate.unwrap_or(config.billing.rate_per_hour);
                let earnings = summary.earnings(rate);
                let currency = &config.billing.currency;

                match format {
                    OutputFormat::Json => {
                        let json = serde_json::json!({
                            "entryCount": summary.entry_count,
                            "totalSeconds": summary.total_seconds,
                            "paidSeconds": summary.paid_seconds,
                            "unpaidSeconds": summary.unpaid_seconds,
                            "ratePerHour": rate,
                            "currency": currency,
                            "paidAmount": earnings.paid,
                            "unpaidAmount": earnings.unpaid,
                        });
                        println!("{}", serde_json::to_string_pretty(&json)?);
                    }
                    OutputFormat::Text => {
                        println!("Entries:          {}", summary.entry_count);
                        println!("Total:            {}", Elapsed(summary.total_seconds));
                        println!("Paid:             {}", Elapsed(summary.paid_seconds));
                        println!("Waiting:          {}", Elapsed(summary.unpaid_seconds));
                        if rate > 0.0 {
                            println!();
                            println!("Rate per hour:    {}", format_amount(rate, currency));
                            println!("Paid amount:      {}", format_amount(earnings.paid, currency));
                            println!(
                                "Waiting payment:  {}",
                                format_amount(earnings.unpaid, currency)
                            );
                        }
                    }
                }
                Ok(())
            }

            LogSubcommand::Projects => {
                let names = project_names(&repo.list().await?);
                if names.is_empty() {
                    println!("No projects found");
                }
                for name in names {
                    println!("{}", name);
                }
                Ok(())
            }

            LogSubcommand::Clear { force } => {
                if !force {
                    print!("Delete every work-log entry? [y/N] ");
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Clear cancelled.");
                        return Ok(());
                    }
                }

                repo.clear().await?;
                println!("Cleared work log.");
                Ok(())
            }
        }
    }
}

async fn mark(
    repo: &WorkLogRepository,
    select: &SelectArgs,
    paid: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ids: Vec<Uuid> = match &select.project {
        Some(project) => EntryFilter::new()
            .with_project(project)
            .apply(&repo.list().await?)
            .iter()
            .map(|e| e.id)
            .collect(),
        None => select.ids.clone(),
    };
    if ids.is_empty() {
        return Err("No entries selected. Pass entry IDs or --project.".into());
    }

    let updated = repo.update_many(&ids, &EntryChanges::paid(paid)).await?;
    println!(
        "Marked {} entries as {}",
        updated,
        if paid { "paid" } else { "not paid" }
    );
    Ok(())
}

pub(crate) fn print_entries(entries: &[WorkLogEntry]) {
    println!(
        "{:<36}  {:<10}  {:<20}  {:>12}  PAID",
        "ID", "DATE", "PROJECT", "TIME"
    );
    println!("{}", "-".repeat(92));
    for entry in entries {
        let project = if entry.project_name.chars().count() > 20 {
            format!("{}...", entry.project_name.chars().take(17).collect::<String>())
        } else {
            entry.project_name.clone()
        };
        println!(
            "{:<36}  {:<10}  {:<20}  {:>12}  {}",
            entry.id,
            entry.date,
            project,
            Elapsed(entry.seconds).to_string(),
            if entry.is_paid { "yes" } else { "no" }
        );
    }
}

fn parse_date(s: &str) -> Result<WorkDate, String> {
    WorkDate::parse(s).ok_or_else(|| format!("Invalid date '{}'. Use YYYY-MM-DD", s))
}

/// Parses `1h30m`, `45m`, `90s`, `2h` or a plain number of seconds.
pub(crate) fn parse_duration(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let invalid = || format!("Invalid duration '{}'. Use e.g. 1h30m, 45m or 90s", s);
    if s.is_empty() {
        return Err(invalid());
    }
    if let Ok(seconds) = s.parse::<u64>() {
        return Ok(seconds);
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return Err(invalid()),
        };
        let value: u64 = digits.parse().map_err(|_| invalid())?;
        total = value
            .checked_mul(unit)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(invalid)?;
        digits.clear();
    }
    if !digits.is_empty() {
        return Err(invalid());
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("90").unwrap(), 90);
        assert_eq!(parse_duration("2h").unwrap(), 7200);
        assert_eq!(parse_duration("45m").unwrap(), 2700);
        assert_eq!(parse_duration("1h30m15s").unwrap(), 5415);
        assert_eq!(parse_duration(" 10s ").unwrap(), 10);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("1d").is_err());
        assert!(parse_duration("1h30").is_err());
        assert!(parse_duration("10000000000000000h").is_err());
        assert!(parse_duration("18446744073709551615s1s").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2023-01-15").unwrap(), WorkDate(2023, 0, 15));
        assert!(parse_date("15/01/2023").is_err());
    }

    #[test]
    fn test_paid_filter_value() {
        assert_eq!(PaidFilter::default().value(), None);
        let paid = PaidFilter {
            paid: true,
            unpaid: false,
        };
        assert_eq!(paid.value(), Some(true));
        let unpaid = PaidFilter {
            paid: false,
            unpaid: true,
        };
        assert_eq!(unpaid.value(), Some(false));
    }
}
