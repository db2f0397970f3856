use std::str::FromStr;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::errors::StoreError;
use crate::models::{
    Appointment, Department, Doctor, EntityKind, MedicalRecord, NewAppointment, NewDepartment,
    NewDoctor, NewMedicalRecord, NewPatient, Patient, PatientKind, PatientRow,
};
use crate::store::{Session, StorageGateway};

const PATIENT_SELECT: &str = r#"
    SELECT p.id, p.kind, p.name, p.date_of_birth, p.contact_info, p.admission_date,
           i.room_number, o.last_visit_date
    FROM patients p
    LEFT JOIN inpatients i ON i.patient_id = p.id
    LEFT JOIN outpatients o ON o.patient_id = p.id
"#;

/// SQLite-backed storage gateway.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to `url`, creating the database file if it does not exist.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("Connected to database at {url}");
        Ok(Self::new(pool))
    }

    /// Private in-memory database on a single long-lived connection.
    ///
    /// Closing a session with a transaction still open detaches that
    /// connection, which drops the in-memory database with it.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn count(&self, kind: EntityKind) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", kind.table()))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>, StoreError> {
        let departments = sqlx::query_as(
            r#"
            SELECT id, name, head_doctor_id
            FROM departments
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(departments)
    }

    pub async fn get_department(&self, id: i64) -> Result<Option<Department>, StoreError> {
        let department = sqlx::query_as(
            r#"
            SELECT id, name, head_doctor_id
            FROM departments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(department)
    }

    pub async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        let doctors = sqlx::query_as(
            r#"
            SELECT id, name, specialization, department_id
            FROM doctors
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(doctors)
    }

    pub async fn get_doctor(&self, id: i64) -> Result<Option<Doctor>, StoreError> {
        let doctor = sqlx::query_as(
            r#"
            SELECT id, name, specialization, department_id
            FROM doctors
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(doctor)
    }

    pub async fn list_patients(&self) -> Result<Vec<Patient>, StoreError> {
        let rows: Vec<PatientRow> = sqlx::query_as(&format!("{PATIENT_SELECT} ORDER BY p.id"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Patient::try_from).collect()
    }

    pub async fn get_patient(&self, id: i64) -> Result<Option<Patient>, StoreError> {
        let row: Option<PatientRow> = sqlx::query_as(&format!("{PATIENT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Patient::try_from).transpose()
    }

    pub async fn list_appointments(&self) -> Result<Vec<Appointment>, StoreError> {
        let appointments = sqlx::query_as(
            r#"
            SELECT id, patient_id, doctor_id, appointment_datetime, reason
            FROM appointments
            ORDER BY appointment_datetime, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(appointments)
    }

    pub async fn appointments_for_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<Appointment>, StoreError> {
        let appointments = sqlx::query_as(
            r#"
            SELECT id, patient_id, doctor_id, appointment_datetime, reason
            FROM appointments
            WHERE patient_id = $1
            ORDER BY appointment_datetime, id
            "#,
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(appointments)
    }

    pub async fn list_medical_records(&self) -> Result<Vec<MedicalRecord>, StoreError> {
        let records = sqlx::query_as(
            r#"
            SELECT id, patient_id, doctor_id, record_date, diagnosis, treatment
            FROM medical_records
            ORDER BY record_date, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn records_for_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<MedicalRecord>, StoreError> {
        let records = sqlx::query_as(
            r#"
            SELECT id, patient_id, doctor_id, record_date, diagnosis, treatment
            FROM medical_records
            WHERE patient_id = $1
            ORDER BY record_date, id
            "#,
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[async_trait]
impl StorageGateway for Database {
    type Session = DbSession;

    async fn create_tables(&self) -> Result<(), StoreError> {
        info!("Applying schema migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Schema is up to date");
        Ok(())
    }

    async fn open_session(&self) -> Result<DbSession, StoreError> {
        let conn = self.pool.acquire().await?;
        debug!("Session opened");
        Ok(DbSession {
            conn: Some(conn),
            in_transaction: false,
        })
    }
}

/// One pooled connection with explicit transaction control.
pub struct DbSession {
    conn: Option<PoolConnection<Sqlite>>,
    in_transaction: bool,
}

impl DbSession {
    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn connection(&mut self) -> Result<&mut SqliteConnection, StoreError> {
        self.conn.as_deref_mut().ok_or(StoreError::SessionClosed)
    }

    /// Connection for a write; refuses to run outside an explicit transaction.
    fn transaction(&mut self) -> Result<&mut SqliteConnection, StoreError> {
        if self.conn.is_some() && !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.connection()
    }
}

#[async_trait]
impl Session for DbSession {
    async fn begin(&mut self) -> Result<(), StoreError> {
        if self.in_transaction {
            return Ok(());
        }
        if self.is_closed() {
            return Err(StoreError::SessionClosed);
        }

        // Marked open before the await: a dropped BEGIN may still reach the
        // connection, and close must then treat the transaction as open.
        self.in_transaction = true;
        if let Err(err) = sqlx::query("BEGIN").execute(self.connection()?).await {
            self.in_transaction = false;
            return Err(err.into());
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        sqlx::query("COMMIT").execute(self.transaction()?).await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Ok(());
        }
        sqlx::query("ROLLBACK").execute(self.connection()?).await?;
        self.in_transaction = false;
        Ok(())
    }

    fn close(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        if self.in_transaction {
            // Closing the raw connection makes SQLite discard the open transaction.
            warn!("Session closed with an open transaction; discarding uncommitted work");
            drop(conn.detach());
            self.in_transaction = false;
        } else {
            drop(conn);
        }
        debug!("Session closed");
    }

    async fn delete_all(&mut self, kind: EntityKind) -> Result<u64, StoreError> {
        let result = sqlx::query(&format!("DELETE FROM {}", kind.table()))
            .execute(self.transaction()?)
            .await?;

        debug!("Deleted {} rows from {}", result.rows_affected(), kind.table());
        Ok(result.rows_affected())
    }

    async fn insert_department(&mut self, department: &NewDepartment) -> Result<i64, StoreError> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO departments (name)
            VALUES ($1)
            RETURNING id
            "#,
        )
        .bind(&department.name)
        .fetch_one(self.transaction()?)
        .await?;

        Ok(id)
    }

    async fn insert_doctor(&mut self, doctor: &NewDoctor) -> Result<i64, StoreError> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO doctors (name, specialization, department_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&doctor.name)
        .bind(&doctor.specialization)
        .bind(doctor.department_id)
        .fetch_one(self.transaction()?)
        .await?;

        Ok(id)
    }

    async fn assign_head_doctor(
        &mut self,
        department_id: i64,
        doctor_id: i64,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE departments SET head_doctor_id = $2
            WHERE id = $1
            "#,
        )
        .bind(department_id)
        .bind(doctor_id)
        .execute(self.transaction()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                kind: EntityKind::Department,
                id: department_id,
            });
        }
        Ok(())
    }

    async fn insert_patient(&mut self, patient: &NewPatient) -> Result<i64, StoreError> {
        let conn = self.transaction()?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO patients (kind, name, date_of_birth, contact_info, admission_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(patient.kind.patient_type())
        .bind(&patient.name)
        .bind(patient.date_of_birth)
        .bind(&patient.contact_info)
        .bind(patient.admission_date)
        .fetch_one(&mut *conn)
        .await?;

        match &patient.kind {
            PatientKind::InPatient { room_number } => {
                sqlx::query(
                    r#"
                    INSERT INTO inpatients (patient_id, room_number)
                    VALUES ($1, $2)
                    "#,
                )
                .bind(id)
                .bind(room_number)
                .execute(&mut *conn)
                .await?;
            }
            PatientKind::OutPatient { last_visit_date } => {
                sqlx::query(
                    r#"
                    INSERT INTO outpatients (patient_id, last_visit_date)
                    VALUES ($1, $2)
                    "#,
                )
                .bind(id)
                .bind(last_visit_date)
                .execute(&mut *conn)
                .await?;
            }
        }

        Ok(id)
    }

    async fn insert_appointment(
        &mut self,
        appointment: &NewAppointment,
    ) -> Result<i64, StoreError> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO appointments (patient_id, doctor_id, appointment_datetime, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(appointment.patient_id)
        .bind(appointment.doctor_id)
        .bind(appointment.appointment_datetime)
        .bind(&appointment.reason)
        .fetch_one(self.transaction()?)
        .await?;

        Ok(id)
    }

    async fn insert_medical_record(
        &mut self,
        record: &NewMedicalRecord,
    ) -> Result<i64, StoreError> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO medical_records (patient_id, doctor_id, record_date, diagnosis, treatment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(record.patient_id)
        .bind(record.doctor_id)
        .bind(record.record_date)
        .bind(&record.diagnosis)
        .bind(&record.treatment)
        .fetch_one(self.transaction()?)
        .await?;

        Ok(id)
    }
}

impl Drop for DbSession {
    fn drop(&mut self) {
        self.close();
    }
}
