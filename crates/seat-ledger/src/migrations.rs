//! SurrealDB schema migrations and initialization
//!
//! This module provides initialization functions to set up all tables
//! with their indexes. Uniqueness of offerings and enrollments comes from
//! deterministic record ids; the indexes below serve lookups.

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StateError;

/// Initialize all Registrar tables in SurrealDB
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing Registrar SurrealDB schema");

    init_reference_tables(db).await?;
    init_offered_course_table(db).await?;
    init_enrollment_table(db).await?;
    init_standing_table(db).await?;
    init_settings_table(db).await?;

    info!("Registrar schema initialization complete");
    Ok(())
}

async fn run(db: &Surreal<Any>, sql: &str) -> Result<()> {
    db.query(sql)
        .await
        .and_then(|res| res.check())
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?;
    Ok(())
}

/// Reference tables: college, teacher, student, course, semester.
///
/// Record ids equal the natural ids (`student:⟨2023001⟩`), so upserts by id
/// replace rather than duplicate.
async fn init_reference_tables(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing reference tables");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS college SCHEMALESS;
        DEFINE TABLE IF NOT EXISTS teacher SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_teacher_college ON TABLE teacher COLUMNS college_id;

        DEFINE TABLE IF NOT EXISTS student SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_student_college ON TABLE student COLUMNS college_id;

        DEFINE TABLE IF NOT EXISTS course SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_course_college ON TABLE course COLUMNS college_id;
        DEFINE INDEX IF NOT EXISTS idx_course_name ON TABLE course COLUMNS course_name;

        DEFINE TABLE IF NOT EXISTS semester SCHEMALESS;
    "#;

    run(db, sql).await?;
    info!("✓ reference tables initialized");
    Ok(())
}

/// Initialize `offered_course` table
///
/// Schema:
/// ```text
/// TABLE offered_course {
///   offered_id:     STRING (record id)
///   course_id:      STRING (indexed)
///   teacher_id:     STRING
///   semester_id:    STRING (indexed)
///   classroom:      STRING
///   time_slot:      STRING
///   capacity:       INT
///   current_count:  INT (0 <= current_count <= capacity)
/// }
/// ```
///
/// `current_count` is only written by the reserve/release transactions.
async fn init_offered_course_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing offered_course table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS offered_course SCHEMALESS;
        DEFINE FIELD IF NOT EXISTS current_count ON TABLE offered_course TYPE int DEFAULT 0
            ASSERT $value >= 0;
        DEFINE INDEX IF NOT EXISTS idx_offered_semester ON TABLE offered_course COLUMNS semester_id;
        DEFINE INDEX IF NOT EXISTS idx_offered_course ON TABLE offered_course COLUMNS course_id;
    "#;

    run(db, sql).await?;
    info!("✓ offered_course table initialized");
    Ok(())
}

/// Initialize `enrollment` table
///
/// Schema:
/// ```text
/// TABLE enrollment {
///   id:             [student_id, offered_id] (unique by construction)
///   student_id:     STRING (indexed)
///   offered_id:     STRING (indexed)
///   regular_score:  FLOAT?
///   exam_score:     FLOAT?
///   total_score:    FLOAT?
///   enrolled_at:    STRING (naive ISO-8601)
/// }
/// ```
async fn init_enrollment_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing enrollment table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS enrollment SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_enrollment_pair ON TABLE enrollment COLUMNS student_id, offered_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_enrollment_student ON TABLE enrollment COLUMNS student_id;
        DEFINE INDEX IF NOT EXISTS idx_enrollment_offered ON TABLE enrollment COLUMNS offered_id;
    "#;

    run(db, sql).await?;
    info!("✓ enrollment table initialized");
    Ok(())
}

/// Initialize `student_standing`, one row per student keyed by student id.
///
/// `version` counts committed seat writes for that student. Reservations
/// compare it against the version their eligibility check read.
async fn init_standing_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing student_standing table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS student_standing SCHEMALESS;
        DEFINE FIELD IF NOT EXISTS version ON TABLE student_standing TYPE int DEFAULT 0;
    "#;

    run(db, sql).await?;
    info!("✓ student_standing table initialized");
    Ok(())
}

/// Initialize `registrar_settings` (single row `registrar_settings:active`).
async fn init_settings_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing registrar_settings table");

    run(db, "DEFINE TABLE IF NOT EXISTS registrar_settings SCHEMALESS;").await?;
    info!("✓ registrar_settings table initialized");
    Ok(())
}
