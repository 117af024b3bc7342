//! Data maintenance commands
//!
//! Commands: reconcile, verify-messages, expire-promotions

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use tcf_server::maintenance::{self, MaintenanceReport, TimestampDrift};
use tcf_server::AppConfig;

#[derive(Parser, Debug)]
pub struct MaintainArgs {
    #[command(subcommand)]
    pub command: MaintainCommands,
}

#[derive(Subcommand, Debug)]
pub enum MaintainCommands {
    /// Repair listing flags, conversation timestamps and due promotions
    Reconcile(ReconcileArgs),
    /// Check every conversation's last_message_at against its messages
    VerifyMessages(VerifyMessagesArgs),
    /// Expire promotions whose end time has passed
    ExpirePromotions(ExpirePromotionsArgs),
}

#[derive(Parser, Debug)]
pub struct ReconcileArgs {
    /// Report what would change without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct VerifyMessagesArgs {
    /// Rewrite drifted timestamps instead of only reporting them
    #[arg(long)]
    pub fix: bool,
}

#[derive(Parser, Debug)]
pub struct ExpirePromotionsArgs {
    /// List due promotions without expiring them
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run_maintain(args: MaintainArgs, config: AppConfig) -> Result<()> {
    let pool = super::connect(&config).await?;

    match args.command {
        MaintainCommands::Reconcile(args) => {
            let report = maintenance::run_all(&pool, Utc::now(), args.dry_run)
                .await
                .context("Reconciliation failed")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        MaintainCommands::VerifyMessages(args) => {
            let drift = maintenance::reconcile_last_message_at(&pool, !args.fix)
                .await
                .context("Message verification failed")?;
            print_drift(&drift, args.fix);
        }
        MaintainCommands::ExpirePromotions(args) => {
            let expired = maintenance::expire_promotions(&pool, Utc::now(), args.dry_run)
                .await
                .context("Promotion expiry failed")?;
            let verb = if args.dry_run { "due" } else { "expired" };
            println!("{} promotion(s) {}", expired.len(), verb);
        }
    }
    Ok(())
}

fn print_report(report: &MaintenanceReport) {
    let mode = if report.dry_run { " (dry run)" } else { "" };
    if report.is_clean() {
        println!("No inconsistencies found{}", mode);
        return;
    }

    println!("Found {} issue(s){}", report.issue_count(), mode);
    for drift in &report.sold_listings {
        println!(
            "  listing {} not marked sold (order {} is {})",
            drift.listing_id, drift.order_id, drift.order_status
        );
    }
    for drift in &report.reserved_listings {
        println!(
            "  listing {} still listed with open order {}",
            drift.listing_id, drift.order_id
        );
    }
    for drift in &report.conversations {
        println!("  {}", describe(drift));
    }
    if !report.expired_promotions.is_empty() {
        println!("  {} promotion(s) past their end time", report.expired_promotions.len());
    }
}

fn print_drift(drift: &[TimestampDrift], fixed: bool) {
    if drift.is_empty() {
        println!("All conversation timestamps match their messages");
        return;
    }
    for d in drift {
        println!("  {}", describe(d));
    }
    if fixed {
        println!("Fixed {} conversation(s)", drift.len());
    } else {
        println!("{} conversation(s) drifted; rerun with --fix to repair", drift.len());
    }
}

fn describe(drift: &TimestampDrift) -> String {
    match drift.drift_secs {
        Some(secs) => format!(
            "conversation {} last_message_at off by {}s",
            drift.conversation_id, secs
        ),
        None => format!(
            "conversation {} last_message_at is {:?}, latest message {:?}",
            drift.conversation_id, drift.stored, drift.actual
        ),
    }
}
