//! Staged wipe-then-repopulate seeding.

use std::fmt;

use thiserror::Error;
use time::{Date, OffsetDateTime};
use tracing::{error, info, warn};

use hospital::StoreError;
use hospital::models::{EntityKind, NewAppointment, NewDoctor, NewMedicalRecord, PatientType};
use hospital::store::{ScopedSession, Session, StorageGateway};

use crate::fixtures::DemoDataset;

/// One dependency-ordered unit of work, committed before the next begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Clear,
    Departments,
    Doctors,
    HeadDoctors,
    Patients,
    Appointments,
    MedicalRecords,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Clear => "clear",
            Stage::Departments => "departments",
            Stage::Doctors => "doctors",
            Stage::HeadDoctors => "head doctors",
            Stage::Patients => "patients",
            Stage::Appointments => "appointments",
            Stage::MedicalRecords => "medical records",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Could not open a session: {0}")]
    Session(#[source] StoreError),
    #[error("Seeding {stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: StoreError,
    },
    #[error("Seeding {stage} referenced missing fixture #{index}")]
    UnknownReference { stage: Stage, index: usize },
    #[error("Seed run interrupted")]
    Interrupted,
}

impl SeedError {
    /// Stage that failed, if the failure happened inside one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            SeedError::Stage { stage, .. } | SeedError::UnknownReference { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }
}

fn at(stage: Stage) -> impl FnOnce(StoreError) -> SeedError {
    move |source| SeedError::Stage { stage, source }
}

fn resolve(ids: &[i64], index: usize, stage: Stage) -> Result<i64, SeedError> {
    ids.get(index)
        .copied()
        .ok_or(SeedError::UnknownReference { stage, index })
}

/// Rows written per entity kind by one seed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub rows_cleared: u64,
    pub departments: usize,
    pub doctors: usize,
    pub head_doctors: usize,
    pub inpatients: usize,
    pub outpatients: usize,
    pub appointments: usize,
    pub medical_records: usize,
}

impl SeedSummary {
    pub fn patients(&self) -> usize {
        self.inpatients + self.outpatients
    }
}

/// Today's date in the local time zone, or in UTC when the local offset
/// cannot be determined.
///
/// On Unix the local offset is only available while the process is single
/// threaded, so binaries should call this before opening the database.
pub fn local_today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// Resets the store to the canonical demo dataset.
///
/// Every stage runs in its own transaction so ids generated by one stage are
/// committed before later stages reference them. A failure rolls back only the
/// stage in flight; earlier stages stay committed.
pub struct Seeder<G: StorageGateway> {
    gateway: G,
    today: Date,
}

impl<G: StorageGateway> Seeder<G> {
    /// Creates a seeder that schedules appointments relative to [`local_today`].
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            today: local_today(),
        }
    }

    /// Sets the date treated as "today" for appointment scheduling.
    pub fn with_today(mut self, today: Date) -> Self {
        self.today = today;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Runs a full seed: wipe, then repopulate stage by stage.
    pub async fn seed(&self) -> Result<SeedSummary, SeedError> {
        info!("--- Seeding database ---");

        let mut session = self
            .gateway
            .open_session()
            .await
            .map(ScopedSession::new)
            .map_err(SeedError::Session)?;

        match self.run(&mut *session).await {
            Ok(summary) => {
                info!("--- Database seeding complete ---");
                Ok(summary)
            }
            Err(err) => {
                error!("An error occurred during seeding: {err}");
                if let Err(rollback_err) = session.rollback().await {
                    warn!("Rollback after failed stage also failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }

    async fn run(&self, session: &mut G::Session) -> Result<SeedSummary, SeedError> {
        let data = DemoDataset::new(self.today);
        let mut summary = SeedSummary {
            rows_cleared: self.clear(session).await.map_err(at(Stage::Clear))?,
            ..SeedSummary::default()
        };

        info!("Creating departments...");
        session.begin().await.map_err(at(Stage::Departments))?;
        let mut department_ids = Vec::with_capacity(data.departments.len());
        for department in &data.departments {
            let id = session
                .insert_department(department)
                .await
                .map_err(at(Stage::Departments))?;
            department_ids.push(id);
        }
        session.commit().await.map_err(at(Stage::Departments))?;
        summary.departments = department_ids.len();
        info!("Created {} departments", summary.departments);

        info!("Creating doctors...");
        session.begin().await.map_err(at(Stage::Doctors))?;
        let mut doctor_ids = Vec::with_capacity(data.doctors.len());
        for doctor in &data.doctors {
            let new_doctor = NewDoctor {
                name: doctor.name.to_string(),
                specialization: doctor.specialization.to_string(),
                department_id: resolve(&department_ids, doctor.department, Stage::Doctors)?,
            };
            let id = session
                .insert_doctor(&new_doctor)
                .await
                .map_err(at(Stage::Doctors))?;
            doctor_ids.push(id);
        }
        session.commit().await.map_err(at(Stage::Doctors))?;
        summary.doctors = doctor_ids.len();
        info!("Created {} doctors", summary.doctors);

        info!("Assigning head doctors...");
        session.begin().await.map_err(at(Stage::HeadDoctors))?;
        for head in &data.head_doctors {
            let department_id = resolve(&department_ids, head.department, Stage::HeadDoctors)?;
            let doctor_id = resolve(&doctor_ids, head.doctor, Stage::HeadDoctors)?;
            session
                .assign_head_doctor(department_id, doctor_id)
                .await
                .map_err(at(Stage::HeadDoctors))?;
        }
        session.commit().await.map_err(at(Stage::HeadDoctors))?;
        summary.head_doctors = data.head_doctors.len();
        info!("Assigned {} head doctors", summary.head_doctors);

        info!("Creating patients...");
        session.begin().await.map_err(at(Stage::Patients))?;
        let mut patient_ids = Vec::with_capacity(data.patients.len());
        for patient in &data.patients {
            let id = session
                .insert_patient(patient)
                .await
                .map_err(at(Stage::Patients))?;
            patient_ids.push(id);
            match patient.kind.patient_type() {
                PatientType::InPatient => summary.inpatients += 1,
                PatientType::OutPatient => summary.outpatients += 1,
            }
        }
        session.commit().await.map_err(at(Stage::Patients))?;
        info!(
            "Created {} patients ({} in, {} out)",
            summary.patients(),
            summary.inpatients,
            summary.outpatients
        );

        info!("Creating appointments...");
        session.begin().await.map_err(at(Stage::Appointments))?;
        for appointment in &data.appointments {
            let new_appointment = NewAppointment {
                patient_id: resolve(&patient_ids, appointment.patient, Stage::Appointments)?,
                doctor_id: resolve(&doctor_ids, appointment.doctor, Stage::Appointments)?,
                appointment_datetime: appointment.at,
                reason: appointment.reason.to_string(),
            };
            session
                .insert_appointment(&new_appointment)
                .await
                .map_err(at(Stage::Appointments))?;
        }
        session.commit().await.map_err(at(Stage::Appointments))?;
        summary.appointments = data.appointments.len();
        info!("Created {} appointments", summary.appointments);

        info!("Creating medical records...");
        session.begin().await.map_err(at(Stage::MedicalRecords))?;
        for record in &data.medical_records {
            let new_record = NewMedicalRecord {
                patient_id: resolve(&patient_ids, record.patient, Stage::MedicalRecords)?,
                doctor_id: resolve(&doctor_ids, record.doctor, Stage::MedicalRecords)?,
                record_date: record.record_date,
                diagnosis: record.diagnosis.to_string(),
                treatment: record.treatment.to_string(),
            };
            session
                .insert_medical_record(&new_record)
                .await
                .map_err(at(Stage::MedicalRecords))?;
        }
        session.commit().await.map_err(at(Stage::MedicalRecords))?;
        summary.medical_records = data.medical_records.len();
        info!("Created {} medical records", summary.medical_records);

        Ok(summary)
    }

    /// Deletes every row, dependents first.
    ///
    /// **WARNING**: This deletes all data from the tables.
    async fn clear(&self, session: &mut G::Session) -> Result<u64, StoreError> {
        info!("Clearing existing data...");
        session.begin().await?;

        let mut total = 0;
        for kind in EntityKind::DELETE_ORDER {
            total += session.delete_all(kind).await?;
        }

        session.commit().await?;
        info!("Existing data cleared ({total} rows)");
        Ok(total)
    }
}
