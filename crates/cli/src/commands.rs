//! Command handlers. Each opens what it needs from the [`Database`] and prints
//! results to stdout; logs go to stderr.

use anyhow::Context;
use hospital::models::{EntityKind, NewDepartment, NewDoctor, NewPatient, Patient, PatientKind};
use hospital::{Database, DbSession, ScopedSession, Session, StorageGateway, StoreError};
use seed_data::db::{SeedError, Seeder};
use serde::Serialize;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

pub async fn create_tables(db: &Database) -> anyhow::Result<()> {
    db.create_tables().await?;
    println!("Database tables successfully created");
    Ok(())
}

pub async fn seed(db: &Database, today: Date) -> anyhow::Result<()> {
    db.create_tables().await?;

    let seeder = Seeder::new(db.clone()).with_today(today);
    let summary = tokio::select! {
        result = seeder.seed() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::error!("Interrupted; stages committed so far are kept");
            return Err(SeedError::Interrupted.into());
        }
    };

    println!("Database seeded:");
    println!("  Departments:     {}", summary.departments);
    println!("  Doctors:         {}", summary.doctors);
    println!(
        "  Patients:        {} ({} in, {} out)",
        summary.patients(),
        summary.inpatients,
        summary.outpatients
    );
    println!("  Appointments:    {}", summary.appointments);
    println!("  Medical records: {}", summary.medical_records);
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn describe_kind(kind: &PatientKind) -> anyhow::Result<String> {
    Ok(match kind {
        PatientKind::InPatient { room_number } => format!("inpatient, room {room_number}"),
        PatientKind::OutPatient { last_visit_date } => {
            format!("outpatient, last visit {}", last_visit_date.format(DATE_FORMAT)?)
        }
    })
}

fn print_patient_line(patient: &Patient) -> anyhow::Result<()> {
    println!(
        "ID: {}, Name: {}, Born: {}, Admitted: {}, Contact: {} ({})",
        patient.id,
        patient.name,
        patient.date_of_birth.format(DATE_FORMAT)?,
        patient.admission_date.format(DATE_FORMAT)?,
        patient.contact_info,
        describe_kind(&patient.kind)?
    );
    Ok(())
}

pub async fn list_patients(db: &Database, json: bool) -> anyhow::Result<()> {
    let patients = db.list_patients().await?;
    if json {
        return print_json(&patients);
    }

    if patients.is_empty() {
        println!("No patients found.");
    }
    for patient in &patients {
        print_patient_line(patient)?;
    }
    Ok(())
}

pub async fn show_patient(db: &Database, id: i64) -> anyhow::Result<()> {
    let patient = db.get_patient(id).await?.ok_or(StoreError::NotFound {
        kind: EntityKind::Patient,
        id,
    })?;
    print_patient_line(&patient)?;

    let appointments = db.appointments_for_patient(id).await?;
    println!("Appointments ({}):", appointments.len());
    for appointment in &appointments {
        println!(
            "  {} with doctor {}: {}",
            appointment.appointment_datetime.format(DATETIME_FORMAT)?,
            appointment.doctor_id,
            appointment.reason
        );
    }

    let records = db.records_for_patient(id).await?;
    println!("Medical records ({}):", records.len());
    for record in &records {
        println!(
            "  {} by doctor {}: {} ({})",
            record.record_date.format(DATE_FORMAT)?,
            record.doctor_id,
            record.diagnosis,
            record.treatment
        );
    }
    Ok(())
}

/// Commits on success and rolls back on failure. A failed rollback is logged;
/// the original error is the one returned.
async fn finish<T>(session: &mut DbSession, result: Result<T, StoreError>) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            session.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = session.rollback().await {
                tracing::warn!("Rollback after failed write also failed: {rollback_err}");
            }
            Err(err)
        }
    }
}

async fn open(db: &Database) -> Result<ScopedSession<DbSession>, StoreError> {
    let mut session = ScopedSession::new(db.open_session().await?);
    session.begin().await?;
    Ok(session)
}

pub async fn add_patient(db: &Database, patient: NewPatient) -> anyhow::Result<()> {
    let mut session = open(db).await?;
    let result = session.insert_patient(&patient).await;
    let id = finish(&mut session, result)
        .await
        .with_context(|| format!("Failed to add patient {}", patient.name))?;

    println!("Added patient {} with ID {id}", patient.name);
    Ok(())
}

pub async fn list_doctors(db: &Database, json: bool) -> anyhow::Result<()> {
    let doctors = db.list_doctors().await?;
    if json {
        return print_json(&doctors);
    }

    if doctors.is_empty() {
        println!("No doctors found.");
    }
    for doctor in &doctors {
        println!(
            "ID: {}, Name: {}, Specialization: {}, Department: {}",
            doctor.id, doctor.name, doctor.specialization, doctor.department_id
        );
    }
    Ok(())
}

pub async fn add_doctor(
    db: &Database,
    name: String,
    specialization: String,
    department_id: i64,
) -> anyhow::Result<()> {
    let doctor = NewDoctor {
        name,
        specialization,
        department_id,
    };

    let mut session = open(db).await?;
    let result = session.insert_doctor(&doctor).await;
    let id = finish(&mut session, result).await.with_context(|| {
        format!("Failed to add doctor {} to department {department_id}", doctor.name)
    })?;

    println!("Added doctor {} with ID {id}", doctor.name);
    Ok(())
}

pub async fn list_departments(db: &Database, json: bool) -> anyhow::Result<()> {
    let departments = db.list_departments().await?;
    if json {
        return print_json(&departments);
    }

    if departments.is_empty() {
        println!("No departments found.");
    }
    for department in &departments {
        let head = department
            .head_doctor_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        println!(
            "ID: {}, Name: {}, Head doctor: {}",
            department.id, department.name, head
        );
    }
    Ok(())
}

pub async fn add_department(db: &Database, name: String) -> anyhow::Result<()> {
    let department = NewDepartment { name };

    let mut session = open(db).await?;
    let result = session.insert_department(&department).await;
    let id = finish(&mut session, result)
        .await
        .with_context(|| format!("Failed to add department {}", department.name))?;

    println!("Added department {} with ID {id}", department.name);
    Ok(())
}

pub async fn assign_head(db: &Database, department_id: i64, doctor_id: i64) -> anyhow::Result<()> {
    let mut session = open(db).await?;
    let result = session.assign_head_doctor(department_id, doctor_id).await;
    finish(&mut session, result).await.with_context(|| {
        format!("Failed to make doctor {doctor_id} head of department {department_id}")
    })?;

    println!("Doctor {doctor_id} is now head of department {department_id}");
    Ok(())
}
