//! Integration tests for the SQLite gateway.
//!
//! Each test runs against its own in-memory database with the schema applied,
//! so no external service is required. Tests that close a session mid
//! transaction use a temporary database file, since detaching the only
//! connection of an in-memory pool discards the database.

use hospital::models::{
    EntityKind, NewAppointment, NewDepartment, NewDoctor, NewMedicalRecord, NewPatient,
    PatientKind,
};
use std::time::Duration;

use hospital::{Database, Session, StorageGateway, StoreError};
use tempfile::TempDir;
use time::macros::{date, datetime};

async fn test_db() -> Database {
    let db = Database::in_memory()
        .await
        .expect("Failed to open in-memory database");
    db.create_tables().await.expect("Failed to create tables");
    db
}

async fn file_db(dir: &TempDir) -> Database {
    let url = format!("sqlite://{}", dir.path().join("hospital.db").display());
    let db = Database::connect(&url)
        .await
        .expect("Failed to open database file");
    db.create_tables().await.expect("Failed to create tables");
    db
}

async fn add_department(db: &Database, name: &str) -> i64 {
    let mut session = db.open_session().await.unwrap();
    session.begin().await.unwrap();
    let id = session
        .insert_department(&NewDepartment {
            name: name.to_string(),
        })
        .await
        .unwrap();
    session.commit().await.unwrap();
    id
}

fn inpatient(name: &str, room: &str) -> NewPatient {
    NewPatient {
        name: name.to_string(),
        date_of_birth: date!(1985 - 03 - 10),
        contact_info: format!("{}@example.com", name.to_lowercase()),
        admission_date: date!(2023 - 10 - 01),
        kind: PatientKind::InPatient {
            room_number: room.to_string(),
        },
    }
}

/// Inserts a department with one doctor, one patient, one appointment and one record.
async fn insert_chain(db: &Database) -> (i64, i64, i64) {
    let mut session = db.open_session().await.unwrap();
    session.begin().await.unwrap();

    let department_id = session
        .insert_department(&NewDepartment {
            name: "Cardiology".to_string(),
        })
        .await
        .unwrap();
    let doctor_id = session
        .insert_doctor(&NewDoctor {
            name: "Dr. Jane Smith".to_string(),
            specialization: "Cardiologist".to_string(),
            department_id,
        })
        .await
        .unwrap();
    session
        .assign_head_doctor(department_id, doctor_id)
        .await
        .unwrap();
    let patient_id = session
        .insert_patient(&inpatient("Alice", "101A"))
        .await
        .unwrap();
    session
        .insert_appointment(&NewAppointment {
            patient_id,
            doctor_id,
            appointment_datetime: datetime!(2024-03-01 10:00),
            reason: "Routine check-up".to_string(),
        })
        .await
        .unwrap();
    session
        .insert_medical_record(&NewMedicalRecord {
            patient_id,
            doctor_id,
            record_date: date!(2023 - 10 - 01),
            diagnosis: "Hypertension".to_string(),
            treatment: "Medication adjustment".to_string(),
        })
        .await
        .unwrap();

    session.commit().await.unwrap();
    (department_id, doctor_id, patient_id)
}

#[tokio::test]
async fn test_create_tables_is_repeatable() {
    let db = test_db().await;
    db.create_tables().await.expect("Second schema run failed");

    for kind in EntityKind::DELETE_ORDER {
        assert_eq!(db.count(kind).await.unwrap(), 0, "{kind} table not empty");
    }
}

#[tokio::test]
async fn test_committed_rows_are_readable() {
    let db = test_db().await;
    let (department_id, doctor_id, patient_id) = insert_chain(&db).await;

    let department = db.get_department(department_id).await.unwrap().unwrap();
    assert_eq!(department.head_doctor_id, Some(doctor_id));

    let patient = db.get_patient(patient_id).await.unwrap().unwrap();
    assert_eq!(patient.name, "Alice");
    assert_eq!(
        patient.kind,
        PatientKind::InPatient {
            room_number: "101A".to_string()
        }
    );
    assert_eq!(db.count(EntityKind::InPatient).await.unwrap(), 1);
    assert_eq!(db.count(EntityKind::OutPatient).await.unwrap(), 0);

    let appointments = db.appointments_for_patient(patient_id).await.unwrap();
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].appointment_datetime, datetime!(2024-03-01 10:00));

    let records = db.records_for_patient(patient_id).await.unwrap();
    assert_eq!(records[0].diagnosis, "Hypertension");
}

#[tokio::test]
async fn test_outpatient_round_trip() {
    let db = test_db().await;
    let mut session = db.open_session().await.unwrap();
    session.begin().await.unwrap();
    let id = session
        .insert_patient(&NewPatient {
            name: "Bob Williams".to_string(),
            date_of_birth: date!(1990 - 07 - 25),
            contact_info: "bob@example.com".to_string(),
            admission_date: date!(2023 - 10 - 05),
            kind: PatientKind::OutPatient {
                last_visit_date: date!(2024 - 01 - 15),
            },
        })
        .await
        .unwrap();
    session.commit().await.unwrap();
    drop(session);

    let patients = db.list_patients().await.unwrap();
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0].id, id);
    assert_eq!(
        patients[0].kind,
        PatientKind::OutPatient {
            last_visit_date: date!(2024 - 01 - 15)
        }
    );
}

#[tokio::test]
async fn test_rollback_discards_uncommitted_rows() {
    let db = test_db().await;
    let mut session = db.open_session().await.unwrap();

    session.begin().await.unwrap();
    session
        .insert_department(&NewDepartment {
            name: "Pediatrics".to_string(),
        })
        .await
        .unwrap();
    session.rollback().await.unwrap();
    assert!(!session.in_transaction());
    drop(session);

    assert_eq!(db.count(EntityKind::Department).await.unwrap(), 0);
}

#[tokio::test]
async fn test_writes_require_a_transaction() {
    let db = test_db().await;
    let mut session = db.open_session().await.unwrap();

    let result = session
        .insert_department(&NewDepartment {
            name: "General Surgery".to_string(),
        })
        .await;
    assert!(matches!(result, Err(StoreError::NoTransaction)));
    assert!(matches!(
        session.commit().await,
        Err(StoreError::NoTransaction)
    ));
}

#[tokio::test]
async fn test_doctor_requires_existing_department() {
    let db = test_db().await;
    let mut session = db.open_session().await.unwrap();
    session.begin().await.unwrap();

    let err = session
        .insert_doctor(&NewDoctor {
            name: "Dr. Nobody".to_string(),
            specialization: "None".to_string(),
            department_id: 999,
        })
        .await
        .unwrap_err();

    assert!(err.is_constraint_violation(), "unexpected error: {err}");
    session.rollback().await.unwrap();
}

#[tokio::test]
async fn test_deleting_dependencies_first_violates_constraints() {
    let db = test_db().await;
    insert_chain(&db).await;

    let mut session = db.open_session().await.unwrap();
    session.begin().await.unwrap();

    let err = session.delete_all(EntityKind::Patient).await.unwrap_err();
    assert!(err.is_constraint_violation(), "unexpected error: {err}");

    let err = session.delete_all(EntityKind::Department).await.unwrap_err();
    assert!(err.is_constraint_violation(), "unexpected error: {err}");

    session.rollback().await.unwrap();
    drop(session);

    assert_eq!(db.count(EntityKind::Patient).await.unwrap(), 1);
    assert_eq!(db.count(EntityKind::Department).await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_order_wipes_everything() {
    let db = test_db().await;
    insert_chain(&db).await;

    let mut session = db.open_session().await.unwrap();
    session.begin().await.unwrap();
    for kind in EntityKind::DELETE_ORDER {
        session.delete_all(kind).await.unwrap();
    }
    session.commit().await.unwrap();
    drop(session);

    for kind in EntityKind::DELETE_ORDER {
        assert_eq!(db.count(kind).await.unwrap(), 0, "{kind} rows remain");
    }
}

#[tokio::test]
async fn test_closed_session_rejects_work() {
    let db = test_db().await;
    let mut session = db.open_session().await.unwrap();

    session.close();
    assert!(session.is_closed());
    session.close();

    assert!(matches!(
        session.begin().await,
        Err(StoreError::SessionClosed)
    ));
}

#[tokio::test]
async fn test_assign_head_to_missing_department_is_not_found() {
    let db = test_db().await;
    let mut session = db.open_session().await.unwrap();
    session.begin().await.unwrap();

    let err = session.assign_head_doctor(42, 1).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            kind: EntityKind::Department,
            id: 42
        }
    ));
    session.rollback().await.unwrap();
}

#[tokio::test]
async fn test_close_with_open_transaction_discards_work() {
    let dir = TempDir::new().unwrap();
    let db = file_db(&dir).await;

    let mut session = db.open_session().await.unwrap();
    session.begin().await.unwrap();
    session
        .insert_department(&NewDepartment {
            name: "Cardiology".to_string(),
        })
        .await
        .unwrap();
    session.close();
    assert!(session.is_closed());
    assert!(!session.in_transaction());
    drop(session);

    assert_eq!(db.count(EntityKind::Department).await.unwrap(), 0);

    // The write lock went with the closed connection.
    add_department(&db, "Cardiology").await;
    assert_eq!(db.count(EntityKind::Department).await.unwrap(), 1);
}

#[tokio::test]
async fn test_dropped_begin_does_not_leave_the_store_locked() {
    let dir = TempDir::new().unwrap();
    let db = file_db(&dir).await;
    add_department(&db, "Cardiology").await;

    let mut session = db.open_session().await.unwrap();
    let _ = tokio::time::timeout(Duration::ZERO, session.begin()).await;
    assert!(session.in_transaction());
    let _ = tokio::time::timeout(
        Duration::ZERO,
        session.delete_all(EntityKind::Department),
    )
    .await;
    drop(session);

    add_department(&db, "Pediatrics").await;

    let names: Vec<_> = db
        .list_departments()
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["Cardiology", "Pediatrics"]);
}
