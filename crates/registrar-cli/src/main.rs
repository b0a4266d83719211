//! Registrar - course selection CLI
//!
//! The `registrar` command drives the enrollment engine for a trusted
//! caller. The `--student` value is taken as an already-authenticated
//! identity.
//!
//! ## Commands
//!
//! - `seed`: Load reference data (and the active semester) from TOML
//! - `evaluate`: Check the selection rules without taking a seat
//! - `enroll` / `drop`: Take or give back a seat
//! - `catalog`, `enrolled`, `timetable`: Student-facing views
//! - `roster`, `audit`: Section-level views for staff

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use registrar_core::{
    audit_seat_counts, init_tracing, AuditReport, Catalog, CourseTier, EnrollmentPolicy, ErrorKind,
    RegistrarError, SeatCoordinator, Standing, Timetable, METRICS, WEEKDAYS,
};
use seat_ledger::{
    Dataset, EnrollmentLedger, OfferedId, ReferenceLoader, ReferenceStore, Semester, SemesterId,
    StudentId, SurrealRegistrarStore,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "registrar")]
#[command(author = "Registrar Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Course selection with capacity-safe enrollment", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Enrollment policy file (TOML)
    #[arg(long, global = true, env = "REGISTRAR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Load colleges, teachers, students, courses, semesters and offerings
    ///
    /// Datetimes are quoted strings such as "2025-09-01T09:00:00".
    Seed {
        /// Dataset file (TOML)
        dataset: PathBuf,
    },

    /// Report whether a student may take a section right now
    Evaluate {
        #[arg(short, long)]
        student: String,

        #[arg(short, long)]
        offering: String,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Take a seat in a section
    Enroll {
        #[arg(short, long)]
        student: String,

        #[arg(short, long)]
        offering: String,
    },

    /// Give back a seat
    Drop {
        #[arg(short, long)]
        student: String,

        #[arg(short, long)]
        offering: String,
    },

    /// Show the course catalog for a student
    Catalog {
        #[arg(short, long)]
        student: String,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// List a student's sections in the active semester
    Enrolled {
        #[arg(short, long)]
        student: String,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Show a student's weekly timetable
    Timetable {
        #[arg(short, long)]
        student: String,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// List the students enrolled in a section
    Roster {
        #[arg(short, long)]
        offering: String,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Compare stored seat counts with enrollment rows
    Audit {
        /// Semester to audit (default: the active semester)
        #[arg(long)]
        semester: Option<String>,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
}

type Coordinator = SeatCoordinator<SurrealRegistrarStore>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let policy = load_policy(cli.config.as_deref())?;

    // Initialize database connection
    let store = Arc::new(
        SurrealRegistrarStore::from_env()
            .await
            .context("Failed to connect to registrar database")?,
    );
    let coord = SeatCoordinator::new(Arc::clone(&store)).with_policy(policy);

    match cli.command {
        Commands::Seed { dataset } => cmd_seed(&store, &dataset).await,
        Commands::Evaluate {
            student,
            offering,
            format,
        } => cmd_evaluate(&coord, &student, &offering, format).await,
        Commands::Enroll { student, offering } => cmd_enroll(&coord, &student, &offering).await,
        Commands::Drop { student, offering } => cmd_drop(&coord, &student, &offering).await,
        Commands::Catalog { student, format } => cmd_catalog(&coord, &student, format).await,
        Commands::Enrolled { student, format } => cmd_enrolled(&coord, &student, format).await,
        Commands::Timetable { student, format } => cmd_timetable(&coord, &student, format).await,
        Commands::Roster { offering, format } => cmd_roster(&store, &offering, format).await,
        Commands::Audit { semester, format } => {
            cmd_audit(&store, semester.as_deref(), format).await
        }
    }
}

/// Process exit status for a failed command.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RegistrarError>().map(RegistrarError::kind) {
        Some(ErrorKind::Validation) => 2,
        Some(ErrorKind::Eligibility) => 3,
        Some(ErrorKind::CapacityConflict) => 4,
        Some(ErrorKind::State) => 5,
        Some(ErrorKind::Storage) | None => 1,
    }
}

fn load_policy(path: Option<&Path>) -> Result<EnrollmentPolicy> {
    match path {
        Some(path) => EnrollmentPolicy::from_file(path)
            .with_context(|| format!("Failed to load policy from {:?}", path)),
        None => Ok(EnrollmentPolicy::default()),
    }
}

fn read_dataset(path: &Path) -> Result<Dataset> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset file: {:?}", path))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse dataset {:?}", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Seed reference data
async fn cmd_seed(store: &SurrealRegistrarStore, path: &Path) -> Result<()> {
    let dataset = read_dataset(path)?;
    store
        .load_dataset(&dataset)
        .await
        .context("Failed to load dataset")?;

    info!(
        offerings = dataset.offerings.len(),
        students = dataset.students.len(),
        "dataset loaded"
    );
    println!(
        "Loaded {} colleges, {} teachers, {} students, {} courses, {} semesters, {} offerings",
        dataset.colleges.len(),
        dataset.teachers.len(),
        dataset.students.len(),
        dataset.courses.len(),
        dataset.semesters.len(),
        dataset.offerings.len(),
    );
    if let Some(active) = &dataset.active_semester {
        println!("Active semester: {}", active);
    }
    Ok(())
}

async fn cmd_evaluate(
    coord: &Coordinator,
    student: &str,
    offering: &str,
    format: OutputFormat,
) -> Result<()> {
    let verdict = coord
        .evaluate(&StudentId::from(student), &OfferedId::from(offering))
        .await
        .context("Evaluation failed")?;

    if format == OutputFormat::Json {
        return print_json(&verdict);
    }
    match &verdict.reason {
        None => println!("{} may enroll in {}", student, offering),
        Some(reason) => println!("{} may not enroll in {}: {}", student, offering, reason),
    }
    Ok(())
}

async fn cmd_enroll(coord: &Coordinator, student: &str, offering: &str) -> Result<()> {
    let result = coord
        .enroll(&StudentId::from(student), &OfferedId::from(offering))
        .await;
    METRICS.flush();

    let record = result.with_context(|| format!("Failed to enroll {} in {}", student, offering))?;
    println!(
        "Enrolled {} in {} at {}",
        record.student_id,
        record.offered_id,
        record.enrolled_at.format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

async fn cmd_drop(coord: &Coordinator, student: &str, offering: &str) -> Result<()> {
    let result = coord
        .drop(&StudentId::from(student), &OfferedId::from(offering))
        .await;
    METRICS.flush();

    let record = result.with_context(|| format!("Failed to drop {} from {}", student, offering))?;
    println!("Dropped {} from {}", record.student_id, record.offered_id);
    Ok(())
}

async fn cmd_catalog(coord: &Coordinator, student: &str, format: OutputFormat) -> Result<()> {
    let catalog = coord
        .catalog(&StudentId::from(student))
        .await
        .context("Failed to build catalog")?;

    match format {
        OutputFormat::Json => print_json(&catalog),
        OutputFormat::Text => {
            print!("{}", render_catalog_text(&catalog));
            Ok(())
        }
    }
}

async fn cmd_enrolled(coord: &Coordinator, student: &str, format: OutputFormat) -> Result<()> {
    let (semester, standing) = coord
        .enrolled_sections(&StudentId::from(student))
        .await
        .context("Failed to list enrolled sections")?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "semester": semester,
            "total_credits": standing.total_credits,
            "sections": standing.sections,
        })),
        OutputFormat::Text => {
            print!("{}", render_enrolled_text(&semester, &standing));
            Ok(())
        }
    }
}

async fn cmd_timetable(coord: &Coordinator, student: &str, format: OutputFormat) -> Result<()> {
    let table = coord
        .timetable(&StudentId::from(student))
        .await
        .context("Failed to build timetable")?;

    match format {
        OutputFormat::Json => print_json(&table),
        OutputFormat::Text => {
            print!("{}", render_timetable_text(&table));
            Ok(())
        }
    }
}

async fn cmd_roster(store: &SurrealRegistrarStore, offering: &str, format: OutputFormat) -> Result<()> {
    let offered_id = OfferedId::from(offering);
    let Some(section) = store.section(&offered_id).await? else {
        bail!("Offered course not found: {}", offering);
    };
    let roster = store.roster(&offered_id).await?;

    if format == OutputFormat::Json {
        return print_json(&roster);
    }
    println!(
        "{} {} ({}) {}/{}",
        section.offered_id,
        section.course_name,
        section.time_slot,
        section.current_count,
        section.capacity
    );
    if roster.is_empty() {
        println!("  No students enrolled");
    }
    for record in roster {
        println!(
            "  {}  {}",
            record.student_id,
            record.enrolled_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn cmd_audit(
    store: &SurrealRegistrarStore,
    semester: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let semester_id = match semester {
        Some(id) => SemesterId::from(id),
        None => match store.active_semester().await? {
            Some(active) => active.semester_id,
            None => bail!("No active semester; pass --semester"),
        },
    };
    let report = audit_seat_counts(store, &semester_id)
        .await
        .context("Seat-count audit failed")?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print!("{}", render_audit_text(&report)),
    }
    if !report.is_clean() {
        bail!("{} section(s) have drifted seat counts", report.drifts.len());
    }
    Ok(())
}

// ========== Text rendering ==========

fn render_catalog_text(catalog: &Catalog) -> String {
    let mut out = String::new();
    let window = if catalog.window_open { "open" } else { "closed" };
    out.push_str(&format!(
        "{} ({}), selection window {}\n",
        catalog.semester.semester_name, catalog.semester.semester_id, window
    ));
    out.push_str(&format!(
        "Student {} (grade {}), {} credits in {} section(s)\n",
        catalog.student_id,
        catalog.student_grade,
        catalog.total_credits,
        catalog.enrolled.len()
    ));

    for group in &catalog.own_college {
        let tier = match group.tier {
            CourseTier::Selectable => "selectable",
            CourseTier::Enrolled => "enrolled",
            CourseTier::Unavailable => "unavailable",
        };
        out.push_str(&format!(
            "\n[{}] {} ({} cr, grade {})\n",
            tier, group.course_name, group.credits, group.target_grade
        ));
        for view in &group.sections {
            let s = &view.section;
            let mark = if view.is_enrolled {
                "*"
            } else if view.selectable {
                "+"
            } else {
                " "
            };
            out.push_str(&format!(
                "  {} {:<12} {:<22} {:<8} {:<12} {}/{}\n",
                mark,
                s.offered_id,
                s.time_slot,
                s.classroom,
                s.teacher_name,
                s.current_count,
                s.capacity
            ));
        }
    }

    if !catalog.other_colleges.is_empty() {
        out.push_str(&format!(
            "\nOther colleges: {}\n",
            catalog.other_colleges.join(", ")
        ));
        for group in &catalog.other_college_groups {
            out.push_str(&format!(
                "  {} / {} ({} cr, grade {}): {} section(s)\n",
                group.college_name,
                group.course_name,
                group.credits,
                group.target_grade,
                group.sections.len()
            ));
        }
    }
    out
}

fn render_enrolled_text(semester: &Semester, standing: &Standing) -> String {
    let mut out = format!(
        "{} ({}): {} credits\n",
        semester.semester_name, semester.semester_id, standing.total_credits
    );
    if standing.sections.is_empty() {
        out.push_str("  No sections\n");
    }
    for s in &standing.sections {
        out.push_str(&format!(
            "  {:<12} {:<24} {} cr  {:<22} {}\n",
            s.offered_id, s.course_name, s.credits, s.time_slot, s.classroom
        ));
    }
    out
}

fn render_timetable_text(table: &Timetable) -> String {
    const CELL: usize = 16;

    let mut out = format!("Timetable {}\n", table.semester_id);
    out.push_str(&format!("{:<13}", ""));
    for day in WEEKDAYS {
        out.push_str(&format!("{:<w$}", day.to_string(), w = CELL));
    }
    out.push('\n');

    for row in &table.rows {
        out.push_str(&format!("{:>2} {:<10}", row.period, row.label));
        for cell in &row.days {
            let names: Vec<&str> = cell.iter().map(|e| e.course_name.as_str()).collect();
            let text: String = names.join("/").chars().take(CELL - 1).collect();
            out.push_str(&format!("{:<w$}", text, w = CELL));
        }
        out.push('\n');
    }

    for s in &table.unplaced {
        out.push_str(&format!(
            "unplaced: {} {} ({})\n",
            s.offered_id, s.course_name, s.time_slot
        ));
    }
    out
}

fn render_audit_text(report: &AuditReport) -> String {
    let mut out = format!(
        "Audited {} section(s) in {}\n",
        report.sections_checked, report.semester_id
    );
    if report.is_clean() {
        out.push_str("All seat counts match their rosters\n");
    }
    for drift in &report.drifts {
        out.push_str(&format!("  {} {}\n", drift.offered_id, drift.course_name));
        for issue in &drift.issues {
            out.push_str(&format!("    {}\n", serde_json::to_string(issue).unwrap_or_default()));
        }
    }
    out
}
