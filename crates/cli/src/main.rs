use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use hospital::models::{NewPatient, PatientKind};
use hospital::{Database, Settings};
use time::Date;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "hospital")]
#[command(about = "Hospital Management CLI")]
struct Cli {
    /// Database URL (overrides DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialise database tables
    #[command(name = "createtables")]
    CreateTables,
    /// Reset the database to the demo dataset
    Seed,
    /// Manage patients
    #[command(subcommand)]
    Patient(PatientCommands),
    /// Manage doctors
    #[command(subcommand)]
    Doctor(DoctorCommands),
    /// Manage departments
    #[command(subcommand)]
    Department(DepartmentCommands),
}

#[derive(Subcommand)]
enum PatientCommands {
    /// List all patients
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show one patient with their appointments and medical records
    Show { id: i64 },
    /// Add an inpatient (--room) or outpatient (--last-visit)
    Add(AddPatientArgs),
}

#[derive(Args)]
struct AddPatientArgs {
    #[arg(long)]
    name: String,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    dob: Date,
    #[arg(long)]
    contact: String,
    /// Admission date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    admitted: Date,
    /// Room number, for inpatients
    #[arg(long, conflicts_with = "last_visit", required_unless_present = "last_visit")]
    room: Option<String>,
    /// Last visit date (YYYY-MM-DD), for outpatients
    #[arg(long, value_parser = parse_date)]
    last_visit: Option<Date>,
}

#[derive(Subcommand)]
enum DoctorCommands {
    /// List all doctors
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Add a doctor to an existing department
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        specialization: String,
        /// Department id
        #[arg(long)]
        department: i64,
    },
}

#[derive(Subcommand)]
enum DepartmentCommands {
    /// List all departments
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Add a department
    Add {
        #[arg(long)]
        name: String,
    },
    /// Make a doctor the head of a department
    AssignHead { department_id: i64, doctor_id: i64 },
}

fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value, commands::DATE_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DD, got {value:?}: {e}"))
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let today = seed_data::db::local_today();

    let mut settings = Settings::from_env();
    if let Some(url) = cli.database_url {
        settings = settings.with_database_url(url);
    }
    let db = Database::connect(&settings.database_url).await?;

    match cli.command {
        Commands::CreateTables => commands::create_tables(&db).await,
        Commands::Seed => commands::seed(&db, today).await,
        Commands::Patient(PatientCommands::List { json }) => {
            commands::list_patients(&db, json).await
        }
        Commands::Patient(PatientCommands::Show { id }) => commands::show_patient(&db, id).await,
        Commands::Patient(PatientCommands::Add(args)) => {
            commands::add_patient(&db, args.into_new_patient()?).await
        }
        Commands::Doctor(DoctorCommands::List { json }) => commands::list_doctors(&db, json).await,
        Commands::Doctor(DoctorCommands::Add {
            name,
            specialization,
            department,
        }) => commands::add_doctor(&db, name, specialization, department).await,
        Commands::Department(DepartmentCommands::List { json }) => {
            commands::list_departments(&db, json).await
        }
        Commands::Department(DepartmentCommands::Add { name }) => {
            commands::add_department(&db, name).await
        }
        Commands::Department(DepartmentCommands::AssignHead {
            department_id,
            doctor_id,
        }) => commands::assign_head(&db, department_id, doctor_id).await,
    }
}

impl AddPatientArgs {
    fn into_new_patient(self) -> anyhow::Result<NewPatient> {
        let kind = match (self.room, self.last_visit) {
            (Some(room_number), None) => PatientKind::InPatient { room_number },
            (None, Some(last_visit_date)) => PatientKind::OutPatient { last_visit_date },
            _ => bail!("exactly one of --room or --last-visit is required"),
        };

        Ok(NewPatient {
            name: self.name,
            date_of_birth: self.dob,
            contact_info: self.contact,
            admission_date: self.admitted,
            kind,
        })
    }
}
