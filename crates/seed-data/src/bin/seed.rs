//! Default seed script - resets the store to the demo dataset
//!
//! Run with:
//! ```
//! cargo run -p seed-data --bin seed
//! ```

use hospital::{Database, Settings, StorageGateway};
use seed_data::db::{Seeder, local_today};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let today = local_today();
    let settings = Settings::from_env();
    let db = Database::connect(&settings.database_url).await?;
    db.create_tables().await?;

    let summary = Seeder::new(db).with_today(today).seed().await?;

    // Summary output
    tracing::info!("Seed completed!");
    tracing::info!("  Departments: {}", summary.departments);
    tracing::info!("  Doctors: {}", summary.doctors);
    tracing::info!(
        "  Patients: {} ({} in, {} out)",
        summary.patients(),
        summary.inpatients,
        summary.outpatients
    );
    tracing::info!("  Appointments: {}", summary.appointments);
    tracing::info!("  Medical records: {}", summary.medical_records);

    Ok(())
}
