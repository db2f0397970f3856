//! Fixed demo dataset.
//!
//! References between fixtures are indices into the earlier lists of the same
//! [`DemoDataset`]; the seeder resolves them to store ids as each stage commits.

use time::macros::{date, time};
use time::{Date, Duration, PrimitiveDateTime, Time};

use hospital::models::{NewDepartment, NewPatient, PatientKind};

#[derive(Debug, Clone)]
pub struct DoctorFixture {
    pub name: &'static str,
    pub specialization: &'static str,
    /// Index into [`DemoDataset::departments`].
    pub department: usize,
}

/// Head doctor assignment, both sides as fixture indices.
#[derive(Debug, Clone, Copy)]
pub struct HeadDoctorFixture {
    pub department: usize,
    pub doctor: usize,
}

#[derive(Debug, Clone)]
pub struct AppointmentFixture {
    pub patient: usize,
    pub doctor: usize,
    pub at: PrimitiveDateTime,
    pub reason: &'static str,
}

#[derive(Debug, Clone)]
pub struct MedicalRecordFixture {
    pub patient: usize,
    pub doctor: usize,
    pub record_date: Date,
    pub diagnosis: &'static str,
    pub treatment: &'static str,
}

/// Canonical rows written by every seed run.
#[derive(Debug, Clone)]
pub struct DemoDataset {
    pub departments: Vec<NewDepartment>,
    pub doctors: Vec<DoctorFixture>,
    pub head_doctors: Vec<HeadDoctorFixture>,
    pub patients: Vec<NewPatient>,
    pub appointments: Vec<AppointmentFixture>,
    pub medical_records: Vec<MedicalRecordFixture>,
}

impl DemoDataset {
    /// Builds the dataset with appointments scheduled relative to `today`.
    pub fn new(today: Date) -> Self {
        let tomorrow = today.saturating_add(Duration::days(1));
        let at = |day: Date, t: Time| PrimitiveDateTime::new(day, t);

        Self {
            departments: ["Cardiology", "Pediatrics", "General Surgery"]
                .into_iter()
                .map(|name| NewDepartment {
                    name: name.to_string(),
                })
                .collect(),
            doctors: vec![
                DoctorFixture {
                    name: "Dr. Jane Smith",
                    specialization: "Cardiologist",
                    department: 0,
                },
                DoctorFixture {
                    name: "Dr. John Doe",
                    specialization: "Pediatrician",
                    department: 1,
                },
                DoctorFixture {
                    name: "Dr. Emily White",
                    specialization: "Surgeon",
                    department: 2,
                },
                // Second doctor in Cardiology
                DoctorFixture {
                    name: "Dr. Michael Green",
                    specialization: "General Practitioner",
                    department: 0,
                },
            ],
            head_doctors: vec![
                HeadDoctorFixture {
                    department: 0,
                    doctor: 0,
                },
                HeadDoctorFixture {
                    department: 1,
                    doctor: 1,
                },
                HeadDoctorFixture {
                    department: 2,
                    doctor: 2,
                },
            ],
            patients: vec![
                NewPatient {
                    name: "Alice Johnson".to_string(),
                    date_of_birth: date!(1985 - 03 - 10),
                    contact_info: "alice@example.com".to_string(),
                    admission_date: date!(2023 - 10 - 01),
                    kind: PatientKind::InPatient {
                        room_number: "101A".to_string(),
                    },
                },
                NewPatient {
                    name: "Bob Williams".to_string(),
                    date_of_birth: date!(1990 - 07 - 25),
                    contact_info: "bob@example.com".to_string(),
                    admission_date: date!(2023 - 10 - 05),
                    kind: PatientKind::OutPatient {
                        last_visit_date: date!(2024 - 01 - 15),
                    },
                },
                NewPatient {
                    name: "Carol Davis".to_string(),
                    date_of_birth: date!(1970 - 01 - 01),
                    contact_info: "carol@example.com".to_string(),
                    admission_date: date!(2024 - 01 - 10),
                    kind: PatientKind::InPatient {
                        room_number: "203B".to_string(),
                    },
                },
                NewPatient {
                    name: "David Brown".to_string(),
                    date_of_birth: date!(2000 - 05 - 20),
                    contact_info: "david@example.com".to_string(),
                    admission_date: date!(2024 - 02 - 01),
                    kind: PatientKind::OutPatient {
                        last_visit_date: date!(2024 - 02 - 28),
                    },
                },
            ],
            appointments: vec![
                AppointmentFixture {
                    patient: 0,
                    doctor: 0,
                    at: at(today, time!(10:00)),
                    reason: "Routine check-up",
                },
                AppointmentFixture {
                    patient: 1,
                    doctor: 1,
                    at: at(today, time!(11:30)),
                    reason: "Child flu symptoms",
                },
                AppointmentFixture {
                    patient: 2,
                    doctor: 2,
                    at: at(tomorrow, time!(09:00)),
                    reason: "Pre-surgery consultation",
                },
                AppointmentFixture {
                    patient: 3,
                    doctor: 3,
                    at: at(today, time!(14:00)),
                    reason: "Follow-up",
                },
            ],
            medical_records: vec![
                MedicalRecordFixture {
                    patient: 0,
                    doctor: 0,
                    record_date: date!(2023 - 10 - 01),
                    diagnosis: "Hypertension",
                    treatment: "Medication adjustment",
                },
                MedicalRecordFixture {
                    patient: 1,
                    doctor: 1,
                    record_date: date!(2023 - 10 - 05),
                    diagnosis: "Common Cold",
                    treatment: "Rest and fluids",
                },
                MedicalRecordFixture {
                    patient: 0,
                    doctor: 3,
                    record_date: date!(2024 - 01 - 20),
                    diagnosis: "Chest Pain",
                    treatment: "ECG and stress test ordered",
                },
                MedicalRecordFixture {
                    patient: 2,
                    doctor: 2,
                    record_date: date!(2024 - 01 - 10),
                    diagnosis: "Appendicitis",
                    treatment: "Scheduled for appendectomy",
                },
            ],
        }
    }
}
