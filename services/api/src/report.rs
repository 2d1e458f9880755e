use crate::infra::{in_memory_service, parse_claim, ClaimArg};
use clap::Args;
use loyalty_ledger::access::{AllowAll, Caller};
use loyalty_ledger::config::AppConfig;
use loyalty_ledger::error::AppError;
use loyalty_ledger::ingest::ImportSummary;
use loyalty_ledger::ledger::{DateNormalizationSummary, SalesLedger};
use loyalty_ledger::points::{ClaimOutcome, PointsRepository, RecomputeSummary};
use loyalty_ledger::reporting::{CustomerPointsView, PointsTotals, ReportQuery};
use loyalty_ledger::service::{LoyaltyService, ServiceError};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Sales export to load (CSV with customer_code and net_weight columns).
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Claim to apply after recompute, as CODE=AMOUNT. May be repeated.
    #[arg(long = "claim", value_parser = parse_claim)]
    pub(crate) claims: Vec<ClaimArg>,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Sales export to load (CSV with customer_code and net_weight columns).
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Only list customers whose code starts with this prefix.
    #[arg(long)]
    pub(crate) prefix: Option<String>,
}

struct PreparedLedger {
    import: ImportSummary,
    dates: DateNormalizationSummary,
    recompute: RecomputeSummary,
}

fn cli_caller() -> Caller {
    Caller("cli".to_string())
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = in_memory_service(Arc::new(AllowAll), config.points);
    let caller = cli_caller();

    let prepared = prepare_ledger(&service, &caller, &args.csv)?;
    print!("{}", render_preparation(&args.csv, &prepared));

    if !args.claims.is_empty() {
        println!("\nClaims");
        for line in apply_claims(&service, &caller, &args.claims)? {
            println!("  {line}");
        }
    }

    let views = service.list_customers(&caller, &ReportQuery::default())?;
    print!("\n{}", render_points_report(&views));
    Ok(())
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = in_memory_service(Arc::new(AllowAll), config.points);
    let caller = cli_caller();

    let prepared = prepare_ledger(&service, &caller, &args.csv)?;
    if !prepared.import.rejected.is_empty()
        || !prepared.recompute.conflicts.is_empty()
        || !prepared.recompute.overflowed.is_empty()
    {
        print!("{}", render_preparation(&args.csv, &prepared));
        println!();
    }

    let query = ReportQuery {
        prefix: args.prefix,
        ..ReportQuery::default()
    };
    let views = service.list_customers(&caller, &query)?;
    print!("{}", render_points_report(&views));
    Ok(())
}

fn prepare_ledger<S>(
    service: &LoyaltyService<S>,
    caller: &Caller,
    csv: &Path,
) -> Result<PreparedLedger, AppError>
where
    S: SalesLedger + PointsRepository + 'static,
{
    let import = service.import_csv_file(caller, csv)?;
    let dates = service.normalize_dates(caller)?;
    let recompute = service.recompute(caller)?;
    Ok(PreparedLedger {
        import,
        dates,
        recompute,
    })
}

/// Apply each claim in order; rejections are reported, storage failures abort.
fn apply_claims<S>(
    service: &LoyaltyService<S>,
    caller: &Caller,
    claims: &[ClaimArg],
) -> Result<Vec<String>, AppError>
where
    S: SalesLedger + PointsRepository + 'static,
{
    let mut lines = Vec::with_capacity(claims.len());
    for claim in claims {
        let result = match service.claim(caller, &claim.customer_code, claim.amount) {
            Ok(receipt) => Ok(receipt),
            Err(ServiceError::Claim(err)) => Err(err),
            Err(err) => return Err(err.into()),
        };
        let outcome = ClaimOutcome::from_result(result).map_err(ServiceError::from)?;
        let line = match outcome {
            ClaimOutcome::Claimed { amount, balance } => format!(
                "{}: claimed {amount}, {} unclaimed",
                claim.customer_code, balance.unclaimed
            ),
            ClaimOutcome::Rejected { message, .. } => {
                format!("{}: rejected ({message})", claim.customer_code)
            }
        };
        lines.push(line);
    }
    Ok(lines)
}

fn render_preparation(csv: &Path, prepared: &PreparedLedger) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Sales import: {}", csv.display());
    let _ = writeln!(
        out,
        "  {} inserted, {} updated, {} rejected",
        prepared.import.inserted,
        prepared.import.updated,
        prepared.import.rejected.len()
    );
    for row in &prepared.import.rejected {
        let _ = writeln!(
            out,
            "  line {} ({}): {}",
            row.line, row.customer_code, row.reason
        );
    }
    let _ = writeln!(
        out,
        "Purchase dates: {} normalized, {} unrecognized, {} blank",
        prepared.dates.normalized, prepared.dates.unparseable, prepared.dates.blank
    );
    let _ = writeln!(
        out,
        "Points: {} created, {} updated, {} unchanged",
        prepared.recompute.created, prepared.recompute.updated, prepared.recompute.unchanged
    );
    for conflict in &prepared.recompute.conflicts {
        let _ = writeln!(
            out,
            "  conflict {}: derived {} below claimed {}",
            conflict.customer_code, conflict.derived_total, conflict.claimed
        );
    }
    for customer in &prepared.recompute.overflowed {
        let _ = writeln!(out, "  overflow {customer}: points too large to record");
    }
    out
}

pub(crate) fn render_points_report(views: &[CustomerPointsView]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:<20} {:>10} {:>8} {:>8} {:>10}  {}",
        "Code", "Name", "Weight(g)", "Total", "Claimed", "Unclaimed", "Last purchase"
    );

    for view in views {
        let (total, claimed) = view
            .points
            .map(|points| (points.total.to_string(), points.claimed.to_string()))
            .unwrap_or_else(|| ("-".to_string(), "-".to_string()));
        let last_purchase = match (&view.last_purchase_on, &view.last_purchase_raw) {
            (Some(date), _) => date.to_string(),
            (None, Some(raw)) => format!("{raw} (unrecognized)"),
            (None, None) => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "{:<12} {:<20} {:>10} {:>8} {:>8} {:>10}  {}",
            view.customer_code.as_str(),
            view.name.as_deref().unwrap_or("-"),
            view.net_weight.to_string(),
            total,
            claimed,
            view.unclaimed().to_string(),
            last_purchase
        );
    }

    let totals = PointsTotals::from_views(views);
    let _ = writeln!(
        out,
        "\n{} customers ({} with points): {} g, {} points total, {} claimed, {} unclaimed",
        totals.customers,
        totals.accounts,
        totals.net_weight,
        totals.total,
        totals.claimed,
        totals.unclaimed
    );
    if totals.overflowed {
        let _ = writeln!(out, "(totals exceed the largest representable value and are capped)");
    }
    out
}
