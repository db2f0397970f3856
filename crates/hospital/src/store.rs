//! Storage gateway abstraction.
//!
//! A [`StorageGateway`] creates the schema and hands out [`Session`]s. A session
//! is one connection with explicit transaction boundaries: writes only happen
//! between [`Session::begin`] and [`Session::commit`] / [`Session::rollback`].
//! [`ScopedSession`] ties the session's lifetime to a scope so it is closed on
//! every exit path.

use std::ops::{Deref, DerefMut};

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::models::{
    EntityKind, NewAppointment, NewDepartment, NewDoctor, NewMedicalRecord, NewPatient,
};

#[async_trait]
pub trait StorageGateway: Send + Sync {
    type Session: Session;

    /// Creates every table. Safe to call on an existing schema.
    async fn create_tables(&self) -> Result<(), StoreError>;

    async fn open_session(&self) -> Result<Self::Session, StoreError>;
}

#[async_trait]
pub trait Session: Send {
    async fn begin(&mut self) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Discards the open transaction. No-op when none is open.
    async fn rollback(&mut self) -> Result<(), StoreError>;

    /// Releases the underlying connection. Further calls fail with
    /// [`StoreError::SessionClosed`].
    fn close(&mut self);

    /// Deletes every row of one kind, returning the number removed.
    async fn delete_all(&mut self, kind: EntityKind) -> Result<u64, StoreError>;

    async fn insert_department(&mut self, department: &NewDepartment) -> Result<i64, StoreError>;

    async fn insert_doctor(&mut self, doctor: &NewDoctor) -> Result<i64, StoreError>;

    async fn assign_head_doctor(
        &mut self,
        department_id: i64,
        doctor_id: i64,
    ) -> Result<(), StoreError>;

    /// Inserts the base patient row and its subtype row.
    async fn insert_patient(&mut self, patient: &NewPatient) -> Result<i64, StoreError>;

    async fn insert_appointment(
        &mut self,
        appointment: &NewAppointment,
    ) -> Result<i64, StoreError>;

    async fn insert_medical_record(
        &mut self,
        record: &NewMedicalRecord,
    ) -> Result<i64, StoreError>;
}

/// Owns a session and closes it exactly once when dropped.
pub struct ScopedSession<S: Session> {
    inner: S,
}

impl<S: Session> ScopedSession<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: Session> Deref for ScopedSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S: Session> DerefMut for ScopedSession<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: Session> Drop for ScopedSession<S> {
    fn drop(&mut self) {
        self.inner.close();
    }
}
