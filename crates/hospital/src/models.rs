use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime};

use crate::errors::StoreError;

/// Every persisted record kind, one per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Department,
    Doctor,
    Patient,
    InPatient,
    OutPatient,
    Appointment,
    MedicalRecord,
}

impl EntityKind {
    /// Wipe order: dependents before the rows they reference.
    pub const DELETE_ORDER: [EntityKind; 7] = [
        EntityKind::MedicalRecord,
        EntityKind::Appointment,
        EntityKind::InPatient,
        EntityKind::OutPatient,
        EntityKind::Patient,
        EntityKind::Doctor,
        EntityKind::Department,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Department => "departments",
            EntityKind::Doctor => "doctors",
            EntityKind::Patient => "patients",
            EntityKind::InPatient => "inpatients",
            EntityKind::OutPatient => "outpatients",
            EntityKind::Appointment => "appointments",
            EntityKind::MedicalRecord => "medical_records",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Department => "department",
            EntityKind::Doctor => "doctor",
            EntityKind::Patient => "patient",
            EntityKind::InPatient => "inpatient",
            EntityKind::OutPatient => "outpatient",
            EntityKind::Appointment => "appointment",
            EntityKind::MedicalRecord => "medical record",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub head_doctor_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDepartment {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialization: String,
    pub department_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDoctor {
    pub name: String,
    pub specialization: String,
    pub department_id: i64,
}

/// Discriminator stored in `patients.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PatientType {
    InPatient,
    OutPatient,
}

impl PatientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientType::InPatient => "inpatient",
            PatientType::OutPatient => "outpatient",
        }
    }
}

/// Subtype-specific patient data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PatientKind {
    InPatient { room_number: String },
    OutPatient { last_visit_date: Date },
}

impl PatientKind {
    pub fn patient_type(&self) -> PatientType {
        match self {
            PatientKind::InPatient { .. } => PatientType::InPatient,
            PatientKind::OutPatient { .. } => PatientType::OutPatient,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub date_of_birth: Date,
    pub contact_info: String,
    pub admission_date: Date,
    pub kind: PatientKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub date_of_birth: Date,
    pub contact_info: String,
    pub admission_date: Date,
    pub kind: PatientKind,
}

/// Flat row produced by joining `patients` with both subtype tables.
#[derive(Debug, FromRow)]
pub(crate) struct PatientRow {
    pub id: i64,
    pub kind: PatientType,
    pub name: String,
    pub date_of_birth: Date,
    pub contact_info: String,
    pub admission_date: Date,
    pub room_number: Option<String>,
    pub last_visit_date: Option<Date>,
}

impl TryFrom<PatientRow> for Patient {
    type Error = StoreError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let kind = match row.kind {
            PatientType::InPatient => PatientKind::InPatient {
                room_number: row.room_number.ok_or_else(|| {
                    StoreError::InvalidRow(format!("inpatient {} has no room number", row.id))
                })?,
            },
            PatientType::OutPatient => PatientKind::OutPatient {
                last_visit_date: row.last_visit_date.ok_or_else(|| {
                    StoreError::InvalidRow(format!("outpatient {} has no last visit date", row.id))
                })?,
            },
        };

        Ok(Patient {
            id: row.id,
            name: row.name,
            date_of_birth: row.date_of_birth,
            contact_info: row.contact_info,
            admission_date: row.admission_date,
            kind,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_datetime: PrimitiveDateTime,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_datetime: PrimitiveDateTime,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MedicalRecord {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub record_date: Date,
    pub diagnosis: String,
    pub treatment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMedicalRecord {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub record_date: Date,
    pub diagnosis: String,
    pub treatment: String,
}
