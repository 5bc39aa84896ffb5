use api_shared::startup::connect_from_env;
use api_shared::{
    ActiveStatRes, CensusTotalsRes, DailyCensusRes, DischargeReq, DischargeStatsRes,
    PatientEntryRes, ReportRowRes, SpecialtyGroupRes,
};
use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ward_core::{
    group_by_specialty, sort_entries, ActiveStat, CoreConfig, DayRange, DischargeDetails,
    DischargeService, DischargeStat, Latest, ListingService, Mrn, PatientEntry, RecordFilter,
    ReportService, SharedSource, SortDirection, SortKey, SortOrder, Specialty, StatsService,
    TimeWindow,
};

#[derive(Parser)]
#[command(name = "ward")]
#[command(about = "Ward census CLI")]
struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-specialty statistics
    Stats {
        #[command(subcommand)]
        kind: StatsCommand,
    },
    /// List admissions and consultations
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        order: SortArgs,
        /// Include discharged admissions and completed consultations
        #[arg(long)]
        all: bool,
    },
    /// Cases of every status grouped by specialty
    Specialties {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        order: SortArgs,
        /// Only active admissions and consultations
        #[arg(long)]
        active_only: bool,
    },
    /// Discharge an admission
    Discharge {
        /// Medical record number
        mrn: Mrn,
        /// Discharge date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Discharge time (HH:MM)
        #[arg(long)]
        time: String,
        /// Discharge note (optional)
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Mark a consultation as completed
    Complete {
        /// Medical record number
        mrn: Mrn,
    },
    /// Report data
    Report {
        #[command(subcommand)]
        kind: ReportCommand,
    },
    /// Refresh active and discharge statistics until interrupted
    Watch {
        /// today, week, month or all
        #[arg(long, default_value = "today")]
        window: TimeWindow,
        /// Seconds between refreshes
        #[arg(long, default_value_t = 30)]
        interval: u64,
    },
}

#[derive(Subcommand)]
enum StatsCommand {
    /// Active admissions and consultations per specialty
    Active,
    /// Ward-wide active totals
    Census,
    /// Discharges per specialty
    Discharges {
        /// today, week, month or all
        #[arg(long, default_value = "today")]
        window: TimeWindow,
    },
}

#[derive(Subcommand)]
enum ReportCommand {
    /// Admissions and consultations between two dates (inclusive)
    Period {
        /// First day (YYYY-MM-DD)
        from: NaiveDate,
        /// Last day (YYYY-MM-DD)
        to: NaiveDate,
    },
    /// Everything recorded on one day
    Daily {
        /// Day (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Restrict admissions and consultations to one specialty
        #[arg(long)]
        specialty: Option<Specialty>,
    },
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Patient name or part of the MRN
    #[arg(long)]
    search: Option<String>,
    /// Exact specialty name
    #[arg(long)]
    specialty: Option<Specialty>,
    /// Local admission date (YYYY-MM-DD)
    #[arg(long)]
    admitted_on: Option<NaiveDate>,
}

#[derive(clap::Args)]
struct SortArgs {
    /// Sort key: admitted_at, patient_name, mrn, specialty, status or updated_at
    #[arg(long, default_value = "admitted_at")]
    sort: SortKey,
    /// Sort direction: asc or desc
    #[arg(long, default_value = "desc")]
    direction: SortDirection,
}

impl From<SortArgs> for SortOrder {
    fn from(args: SortArgs) -> Self {
        SortOrder::new(args.sort, args.direction)
    }
}

impl FilterArgs {
    fn into_filter(self) -> anyhow::Result<RecordFilter> {
        Ok(RecordFilter {
            search: self.search,
            specialty: self.specialty,
            admitted_on: self
                .admitted_on
                .map(|date| DayRange::local(date, &Local))
                .transpose()?,
        })
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_active(stats: Vec<ActiveStat>, json: bool) -> anyhow::Result<()> {
    if json {
        let stats: Vec<ActiveStatRes> = stats.into_iter().map(Into::into).collect();
        return print_json(&stats);
    }
    if stats.is_empty() {
        println!("No active cases.");
    }
    for stat in stats {
        println!(
            "{:<28} {:>4} active ({} admissions, {} consultations)",
            stat.specialty, stat.active_count, stat.admissions, stat.consultations
        );
    }
    Ok(())
}

fn print_discharges(
    window: TimeWindow,
    stats: Vec<DischargeStat>,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        return print_json(&DischargeStatsRes::new(window, stats));
    }
    if stats.is_empty() {
        println!("No discharges.");
    }
    for stat in stats {
        println!(
            "{:<28} {:>4} {} ({} admissions, {} consultations), {} all time",
            stat.specialty,
            stat.discharged_in_window.total(),
            window,
            stat.discharged_in_window.admissions,
            stat.discharged_in_window.consultations,
            stat.total_discharged.total()
        );
    }
    Ok(())
}

fn print_entries(entries: Vec<PatientEntry>, json: bool) -> anyhow::Result<()> {
    if json {
        let entries: Vec<PatientEntryRes> = entries.into_iter().map(Into::into).collect();
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No patients found.");
    }
    for entry in entries {
        println!(
            "MRN: {}, Name: {}, Specialty: {}, Status: {}, Kind: {}, Admitted: {}",
            entry.mrn,
            entry.patient_name,
            entry.specialty,
            entry.patient_status.as_str(),
            entry.kind,
            entry.admitted_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

#[derive(Clone)]
struct Snapshot {
    taken_at: DateTime<Local>,
    active: Vec<ActiveStat>,
    discharges: Vec<DischargeStat>,
}

/// Refreshes on every tick. Refreshes may overlap; a result is printed only if no newer refresh
/// has already been shown.
async fn watch(
    stats: StatsService,
    window: TimeWindow,
    interval: Duration,
    json: bool,
) -> anyhow::Result<()> {
    let latest: Arc<Latest<Snapshot>> = Arc::new(Latest::new());
    let mut ticker = tokio::time::interval(interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let ticket = latest.begin();
                let stats = stats.clone();
                let latest = latest.clone();
                tokio::spawn(async move {
                    let now = Local::now();
                    let result = tokio::try_join!(
                        stats.active_stats(),
                        stats.discharge_stats_for(window, &now),
                    );
                    match result {
                        Ok((active, discharges)) => {
                            let snapshot = Snapshot { taken_at: now, active, discharges };
                            if latest.publish(ticket, snapshot.clone()) {
                                if let Err(e) = print_snapshot(snapshot, window, json) {
                                    tracing::error!("Print error: {:?}", e);
                                }
                            }
                        }
                        Err(e) => tracing::error!("Refresh error: {:?}", e),
                    }
                });
            }
            res = &mut ctrl_c => {
                res?;
                break;
            }
        }
    }
    if let Some(last) = latest.current() {
        tracing::info!("stopped; last refresh at {}", last.taken_at.format("%H:%M:%S"));
    }
    Ok(())
}

fn print_snapshot(snapshot: Snapshot, window: TimeWindow, json: bool) -> anyhow::Result<()> {
    if !json {
        println!("-- {}", snapshot.taken_at.format("%Y-%m-%d %H:%M:%S"));
    }
    print_active(snapshot.active, json)?;
    print_discharges(window, snapshot.discharges, json)
}

async fn run(
    command: Commands,
    cfg: Arc<CoreConfig>,
    source: SharedSource,
    json: bool,
) -> anyhow::Result<()> {
    match command {
        Commands::Stats { kind } => {
            let stats = StatsService::new(cfg, source);
            match kind {
                StatsCommand::Active => print_active(stats.active_stats().await?, json)?,
                StatsCommand::Census => {
                    let totals = stats.census_totals().await?;
                    if json {
                        print_json(&CensusTotalsRes::from(totals))?;
                    } else {
                        println!(
                            "Active admissions: {}, Active consultations: {}, Total: {}",
                            totals.active_admissions,
                            totals.active_consultations,
                            totals.total_active
                        );
                    }
                }
                StatsCommand::Discharges { window } => {
                    let result = stats.discharge_stats_for(window, &Local::now()).await?;
                    print_discharges(window, result, json)?;
                }
            }
        }
        Commands::List { filter, order, all } => {
            let filter = filter.into_filter()?;
            let listing = ListingService::new(source);
            let entries = if all {
                listing.all_records(&Local).await?
            } else {
                listing.active_records(&Local).await?
            };
            let mut entries = filter.apply(entries);
            sort_entries(&mut entries, order.into());
            print_entries(entries, json)?;
        }
        Commands::Specialties {
            filter,
            order,
            active_only,
        } => {
            let filter = filter.into_filter()?;
            let listing = ListingService::new(source);
            let entries = if active_only {
                listing.active_records(&Local).await?
            } else {
                listing.all_records(&Local).await?
            };
            let groups = group_by_specialty(&entries, &filter, order.into());
            if json {
                let groups: Vec<SpecialtyGroupRes> = groups.into_iter().map(Into::into).collect();
                print_json(&groups)?;
            } else {
                for group in groups {
                    println!("{} ({})", group.specialty, group.entries.len());
                    for entry in group.entries {
                        println!(
                            "  {} {} [{}, {}]",
                            entry.mrn,
                            entry.patient_name,
                            entry.kind,
                            entry.patient_status.as_str()
                        );
                    }
                }
            }
        }
        Commands::Discharge {
            mrn,
            date,
            time,
            note,
        } => {
            let details = DischargeDetails::try_from(DischargeReq { date, time, note })?;
            DischargeService::new(source)
                .discharge_admission(&mrn, details, Utc::now())
                .await?;
            println!("Discharged patient {}", mrn);
        }
        Commands::Complete { mrn } => {
            DischargeService::new(source)
                .complete_consultation(&mrn, Utc::now())
                .await?;
            println!("Completed consultation for {}", mrn);
        }
        Commands::Report { kind } => {
            let reports = ReportService::new(source);
            match kind {
                ReportCommand::Period { from, to } => {
                    let rows = reports
                        .period_report(
                            DayRange::local(from, &Local)?,
                            DayRange::local(to, &Local)?,
                            &Local,
                        )
                        .await?;
                    if json {
                        let rows: Vec<ReportRowRes> = rows.into_iter().map(Into::into).collect();
                        print_json(&rows)?;
                    } else {
                        println!("Admissions report {} to {}: {} rows", from, to, rows.len());
                        for row in rows {
                            println!(
                                "{} | {} | {} | {} | {}",
                                row.mrn,
                                row.patient_name,
                                row.specialty,
                                row.assigned_doctor.as_deref().unwrap_or("-"),
                                row.diagnosis.as_deref().unwrap_or("-")
                            );
                        }
                    }
                }
                ReportCommand::Daily { date, specialty } => {
                    let date = date.unwrap_or_else(|| Local::now().date_naive());
                    let census = reports
                        .daily_census(DayRange::local(date, &Local)?, specialty, &Local)
                        .await?;
                    if json {
                        print_json(&DailyCensusRes::from(census))?;
                    } else {
                        println!(
                            "{}: {} patients, {} clinic appointments, {} daily reports",
                            census.date,
                            census.entries.len(),
                            census.appointments.len(),
                            census.reports.len()
                        );
                        print_entries(census.entries, false)?;
                    }
                }
            }
        }
        Commands::Watch { window, interval } => {
            if interval == 0 {
                anyhow::bail!("--interval must be at least 1 second");
            }
            let stats = StatsService::new(cfg, source);
            watch(stats, window, Duration::from_secs(interval), json).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ward_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'ward --help' for commands");
        return Ok(());
    };

    let (cfg, source) = connect_from_env()?;
    run(command, Arc::new(cfg), source, cli.json).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_typed_arguments() {
        let cli = Cli::try_parse_from([
            "ward",
            "list",
            "--specialty",
            "Immunology & Allergy",
            "--sort",
            "patient_name",
            "--direction",
            "asc",
            "--all",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::List { filter, order, all }) => {
                assert_eq!(filter.specialty, Some(Specialty::ImmunologyAndAllergy));
                assert_eq!(
                    SortOrder::from(order),
                    SortOrder::new(SortKey::PatientName, SortDirection::Ascending)
                );
                assert!(all);
            }
            _ => panic!("expected list command"),
        }

        assert!(Cli::try_parse_from(["ward", "stats", "discharges", "--window", "year"]).is_err());
        assert!(Cli::try_parse_from(["ward", "watch", "--window", "week", "--json"]).is_ok());
    }

    #[test]
    fn specialties_take_sort_and_status_flags() {
        let cli = Cli::try_parse_from([
            "ward",
            "specialties",
            "--specialty",
            "Neurology",
            "--sort",
            "mrn",
            "--active-only",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Specialties {
                filter,
                order,
                active_only,
            }) => {
                assert_eq!(filter.specialty, Some(Specialty::Neurology));
                assert_eq!(
                    SortOrder::from(order),
                    SortOrder::new(SortKey::Mrn, SortDirection::Descending)
                );
                assert!(active_only);
            }
            _ => panic!("expected specialties command"),
        }

        match Cli::try_parse_from(["ward", "specialties"]).unwrap().command {
            Some(Commands::Specialties { active_only, .. }) => assert!(!active_only),
            _ => panic!("expected specialties command"),
        }
    }
}
