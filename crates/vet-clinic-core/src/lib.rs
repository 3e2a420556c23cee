//! Vet-Clinic Core Library
//!
//! Scheduling and authorization core for a veterinary clinic backend. The
//! HTTP framework, token issuance and wire serialization live outside this
//! crate; they call into [`ClinicCore`] and map [`ClinicError`] onto status
//! codes.
//!
//! # Architecture
//!
//! ```text
//! Write request ──► Access policy ──► Hours/holiday gate ──► Conflict check
//!                   (src/access)       (src/scheduling)       (src/scheduling)
//!                        │                                          │
//!                      DENY                                   ACCEPT/REJECT
//!                        │                                          │
//!                        ▼                                          ▼
//!                   403/404/401                      atomic check-and-insert
//!                                                          (src/db)
//! ```
//!
//! # Core Principle
//!
//! **No two non-cancelled appointments for the same pet may overlap.** The
//! overlap scan and the insert run in one transaction, so concurrent
//! bookings cannot both slip past the check.
//!
//! # Modules
//!
//! - [`db`]: SQLite persistence layer
//! - [`models`]: Domain types (User, Pet, Service, Appointment, ...)
//! - [`access`]: Role-based access decisions, one policy per resource
//! - [`scheduling`]: Conflict checker, hours gate and slot computation

pub mod access;
pub mod db;
pub mod models;
pub mod scheduling;

// Re-export commonly used types
pub use access::{AccessDecision, ActorContext, DenyReason, ListScope, Operation};
pub use db::Database;
pub use models::{
    Appointment, AppointmentStatus, ConsultationType, Holiday, MedicalRecord, OperatingHours,
    Pet, Role, Service, Sex, User,
};
pub use scheduling::{Scheduler, SchedulingError};

use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

use access::{AppointmentAccess, ConfigAccess, ConfigResource, PetAccess, RecordAccess};
use db::DbError;
use models::START_TIME_FORMAT;

// =========================================================================
// Error Type
// =========================================================================

/// Boundary error taxonomy. Every rejection is raised at the point of
/// detection and propagates unchanged; only the booking paths retry once on
/// a busy database before surfacing.
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    /// Actor identity missing or unknown; surfaced as 401.
    #[error("authentication required")]
    AuthenticationRequired,

    /// Authenticated but not permitted; carries a reason code; 403.
    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// Invalid input, field-scoped; 400.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// Missing, or outside the actor's visible scope (the two are
    /// deliberately indistinguishable); 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// A required server-side value cannot be resolved; never silently
    /// defaulted; 500.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("database error: {0}")]
    Database(String),
}

pub type ClinicResult<T> = Result<T, ClinicError>;

impl ClinicError {
    fn validation(field: &str, message: impl Into<String>) -> Self {
        ClinicError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// HTTP status the boundary layer should map this error to.
    pub fn http_status(&self) -> u16 {
        match self {
            ClinicError::AuthenticationRequired => 401,
            ClinicError::PermissionDenied { .. } => 403,
            ClinicError::Validation { .. } => 400,
            ClinicError::NotFound(_) => 404,
            ClinicError::Configuration(_) => 500,
            ClinicError::Database(_) => 500,
        }
    }

    /// Wire-ready body for the boundary layer. Validation errors keep their
    /// per-field shape; denials carry the machine-readable reason code.
    pub fn detail(&self) -> serde_json::Value {
        match self {
            ClinicError::AuthenticationRequired => json!({ "detail": "authentication required" }),
            ClinicError::PermissionDenied { reason } => {
                json!({ "detail": "forbidden", "code": reason })
            }
            ClinicError::Validation { field, message } => {
                let mut body = serde_json::Map::new();
                body.insert(field.clone(), json!([message]));
                serde_json::Value::Object(body)
            }
            ClinicError::NotFound(_) => json!({ "detail": "not found" }),
            ClinicError::Configuration(message) => json!({ "detail": message }),
            ClinicError::Database(_) => json!({ "detail": "internal error" }),
        }
    }
}

impl From<DbError> for ClinicError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => ClinicError::NotFound(what),
            other => ClinicError::Database(other.to_string()),
        }
    }
}

impl From<SchedulingError> for ClinicError {
    fn from(e: SchedulingError) -> Self {
        match e {
            SchedulingError::Database(db) => db.into(),
            SchedulingError::UnusableDuration(_) => ClinicError::Configuration(e.to_string()),
            SchedulingError::PastDate | SchedulingError::InvalidDate(_) => {
                ClinicError::Validation {
                    field: "date".into(),
                    message: e.to_string(),
                }
            }
            conflict_or_closed => ClinicError::Validation {
                field: "start_time".into(),
                message: conflict_or_closed.to_string(),
            },
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicError::Database(format!("Lock poisoned: {}", e))
    }
}

/// Denial on a create or explicit write: 403 with reason code.
fn denied(reason: DenyReason) -> ClinicError {
    ClinicError::PermissionDenied {
        reason: reason.code().into(),
    }
}

/// Denial on an object that should stay invisible: ownership failures
/// become 404 so resource existence does not leak; everything else is 403.
fn hidden(reason: DenyReason, what: &str) -> ClinicError {
    match reason {
        DenyReason::NotOwner => ClinicError::NotFound(what.into()),
        other => denied(other),
    }
}

// =========================================================================
// Factory Functions
// =========================================================================

/// Open or create a clinic database at the given path.
pub fn open_clinic(path: &str) -> ClinicResult<Arc<ClinicCore>> {
    let db = Database::open(path)?;
    Ok(Arc::new(ClinicCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

/// Create an in-memory clinic (for testing).
pub fn open_clinic_in_memory() -> ClinicResult<Arc<ClinicCore>> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(ClinicCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

// =========================================================================
// Request Types
// =========================================================================

/// Fields for creating a user (role assigned atomically with it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
}

/// Fields for registering a pet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPet {
    pub tutor_id: String,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub birth_date: Option<String>,
    pub sex: Sex,
    pub notes: Option<String>,
}

/// Partial pet update; absent fields stay unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PetUpdate {
    pub tutor_id: Option<String>,
    pub name: Option<String>,
    pub species: Option<String>,
    pub breed: Option<String>,
    pub birth_date: Option<String>,
    pub sex: Option<Sex>,
    pub notes: Option<String>,
}

/// Fields for creating a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewService {
    pub name: String,
    pub price: f64,
    pub duration_minutes: i64,
}

/// Partial service update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub duration_minutes: Option<i64>,
    pub active: Option<bool>,
}

/// Fields for booking an appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub pet_id: String,
    pub service_id: String,
    /// "YYYY-MM-DD HH:MM:SS" clinic wall-clock
    pub start_time: String,
    pub notes: Option<String>,
}

/// Partial appointment update. Changing the time or service re-runs the
/// hours gate and the conflict check, excluding the appointment itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    pub start_time: Option<String>,
    pub service_id: Option<String>,
    pub notes: Option<String>,
}

/// Fields for a medical record. The author is the acting user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMedicalRecord {
    pub pet_id: String,
    /// "YYYY-MM-DD HH:MM:SS"
    pub consulted_at: String,
    pub consultation_type: ConsultationType,
    pub weight_kg: Option<f64>,
    pub temperature_c: Option<f64>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
}

/// Partial medical record update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicalRecordUpdate {
    pub consulted_at: Option<String>,
    pub consultation_type: Option<ConsultationType>,
    pub weight_kg: Option<f64>,
    pub temperature_c: Option<f64>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
}

/// Hours for one weekday (0 = Monday .. 6 = Sunday).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoursSpec {
    pub weekday: u8,
    pub open_time: String,
    pub close_time: String,
    pub active: bool,
}

/// Fields for creating a holiday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHoliday {
    pub date: String,
    pub name: String,
    pub recurring: bool,
}

/// Partial holiday update. The date itself is immutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HolidayUpdate {
    pub name: Option<String>,
    pub recurring: Option<bool>,
    pub active: Option<bool>,
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe clinic core. Every operation takes the caller's user id as
/// established by the external authentication layer; `None` is an anonymous
/// caller.
pub struct ClinicCore {
    db: Arc<Mutex<Database>>,
}

/// Resolve the acting user. Unknown ids are treated the same as missing
/// credentials; a missing role record yields a client-scoped actor.
fn resolve_actor(db: &Database, user_id: Option<&str>) -> ClinicResult<ActorContext> {
    let id = user_id.ok_or(ClinicError::AuthenticationRequired)?;
    let user = db
        .get_user(id)?
        .ok_or(ClinicError::AuthenticationRequired)?;
    let role = db.get_role(&user.id)?;
    Ok(ActorContext::new(user.id, role))
}

fn parse_start(field: &str, value: &str) -> ClinicResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, START_TIME_FORMAT)
        .map_err(|_| ClinicError::validation(field, format!("invalid datetime: {value}")))
}

/// Whether a write failed on a foreign-key or uniqueness constraint.
fn is_constraint_violation(e: &DbError) -> bool {
    matches!(
        e,
        DbError::Sqlite(rusqlite::Error::SqliteFailure(inner, _))
            if inner.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl ClinicCore {
    // =========================================================================
    // User Operations
    // =========================================================================

    /// Create a user together with its role, atomically. Anyone may
    /// self-register as a client; other roles are assigned by an admin. The
    /// very first account is exempt so the system can be bootstrapped.
    pub fn create_user(&self, actor_id: Option<&str>, req: NewUser) -> ClinicResult<User> {
        let mut db = self.db.lock()?;

        if req.username.trim().is_empty() {
            return Err(ClinicError::validation("username", "username is required"));
        }
        if req.email.trim().is_empty() {
            return Err(ClinicError::validation("email", "email is required"));
        }

        let bootstrap = db.count_users()? == 0;
        if req.role != Role::Client && !bootstrap {
            let actor = resolve_actor(&db, actor_id)?;
            if !actor.is_admin() {
                return Err(denied(DenyReason::AdminOnly));
            }
        }

        if db.get_user_by_username(&req.username)?.is_some() {
            return Err(ClinicError::validation("username", "username is taken"));
        }

        let mut user = User::new(req.username, req.name, req.email);
        user.phone = req.phone;
        db.create_user_with_role(&user, req.role)?;
        log::info!("created user {} with role {}", user.id, req.role);
        Ok(user)
    }

    /// Get a user: self, admin or staff.
    pub fn get_user(&self, actor_id: Option<&str>, id: &str) -> ClinicResult<User> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if actor.user_id != id && !actor.is_admin() && !actor.is_staff() {
            return Err(ClinicError::NotFound(format!("user {id}")));
        }
        db.get_user(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("user {id}")))
    }

    /// List users: admin or staff.
    pub fn list_users(&self, actor_id: Option<&str>) -> ClinicResult<Vec<User>> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if !actor.is_admin() && !actor.is_staff() {
            return Err(denied(DenyReason::StaffOnly));
        }
        Ok(db.list_users()?)
    }

    /// Change a user's role: admin only.
    pub fn change_role(&self, actor_id: Option<&str>, user_id: &str, role: Role) -> ClinicResult<()> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if !actor.is_admin() {
            return Err(denied(DenyReason::AdminOnly));
        }
        if !db.set_role(user_id, role)? {
            return Err(ClinicError::NotFound(format!("user {user_id}")));
        }
        log::info!("changed role of user {user_id} to {role}");
        Ok(())
    }

    /// Delete a user: admin only. Blocked while pets or medical records
    /// still reference it.
    pub fn delete_user(&self, actor_id: Option<&str>, id: &str) -> ClinicResult<()> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if !actor.is_admin() {
            return Err(denied(DenyReason::AdminOnly));
        }
        match db.delete_user(id) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ClinicError::NotFound(format!("user {id}"))),
            Err(e) if is_constraint_violation(&e) => Err(ClinicError::validation(
                "user",
                "user is still referenced by pets or medical records",
            )),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Pet Operations
    // =========================================================================

    /// Register a pet. Clients register their own pets; staff and admin any.
    pub fn create_pet(&self, actor_id: Option<&str>, req: NewPet) -> ClinicResult<Pet> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;

        if db.get_user(&req.tutor_id)?.is_none() {
            return Err(ClinicError::validation("tutor_id", "unknown tutor"));
        }
        if let Some(birth_date) = req.birth_date.as_deref() {
            let parsed = chrono::NaiveDate::parse_from_str(birth_date, "%Y-%m-%d")
                .map_err(|_| ClinicError::validation("birth_date", "invalid date"))?;
            if parsed > chrono::Local::now().date_naive() {
                return Err(ClinicError::validation(
                    "birth_date",
                    "birth date cannot be in the future",
                ));
            }
        }

        let mut pet = Pet::new(req.tutor_id, req.name, req.species, req.sex);
        pet.breed = req.breed;
        pet.birth_date = req.birth_date;
        pet.notes = req.notes;

        if let AccessDecision::Deny(reason) = PetAccess::check(&actor, &pet, None, Operation::Create)
        {
            return Err(denied(reason));
        }

        db.insert_pet(&pet)?;
        log::info!("registered pet {} for tutor {}", pet.id, pet.tutor_id);
        Ok(pet)
    }

    /// Get a pet. Out-of-scope pets are indistinguishable from missing ones.
    pub fn get_pet(&self, actor_id: Option<&str>, id: &str) -> ClinicResult<Pet> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        let pet = db
            .get_pet(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("pet {id}")))?;
        if !PetAccess::check(&actor, &pet, None, Operation::Retrieve).is_allowed() {
            return Err(ClinicError::NotFound(format!("pet {id}")));
        }
        Ok(pet)
    }

    /// List pets visible to the actor.
    pub fn list_pets(&self, actor_id: Option<&str>) -> ClinicResult<Vec<Pet>> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        match PetAccess::list_scope(&actor) {
            ListScope::All => Ok(db.list_pets()?),
            ListScope::OwnedBy(tutor_id) => Ok(db.list_pets_by_tutor(&tutor_id)?),
        }
    }

    /// Update a pet. Tutor reassignment is restricted to admin/staff.
    pub fn update_pet(&self, actor_id: Option<&str>, id: &str, patch: PetUpdate) -> ClinicResult<Pet> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        let mut pet = db
            .get_pet(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("pet {id}")))?;

        if let AccessDecision::Deny(reason) = PetAccess::check(&actor, &pet, None, Operation::Update)
        {
            return Err(hidden(reason, &format!("pet {id}")));
        }

        if let Some(tutor_id) = patch.tutor_id {
            if !actor.is_admin() && !actor.is_staff() {
                return Err(denied(DenyReason::StaffOnly));
            }
            if db.get_user(&tutor_id)?.is_none() {
                return Err(ClinicError::validation("tutor_id", "unknown tutor"));
            }
            pet.tutor_id = tutor_id;
        }
        if let Some(name) = patch.name {
            pet.name = name;
        }
        if let Some(species) = patch.species {
            pet.species = species;
        }
        if let Some(breed) = patch.breed {
            pet.breed = Some(breed);
        }
        if let Some(birth_date) = patch.birth_date {
            let parsed = chrono::NaiveDate::parse_from_str(&birth_date, "%Y-%m-%d")
                .map_err(|_| ClinicError::validation("birth_date", "invalid date"))?;
            if parsed > chrono::Local::now().date_naive() {
                return Err(ClinicError::validation(
                    "birth_date",
                    "birth date cannot be in the future",
                ));
            }
            pet.birth_date = Some(birth_date);
        }
        if let Some(sex) = patch.sex {
            pet.sex = sex;
        }
        if let Some(notes) = patch.notes {
            pet.notes = Some(notes);
        }

        db.update_pet(&pet)?;
        Ok(pet)
    }

    /// Delete a pet. Veterinarians never may; staff only when the tutor is a
    /// client. Appointments cascade, medical records block the delete.
    pub fn delete_pet(&self, actor_id: Option<&str>, id: &str) -> ClinicResult<()> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        let pet = db
            .get_pet(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("pet {id}")))?;
        let tutor_role = db.get_role(&pet.tutor_id)?;

        if let AccessDecision::Deny(reason) =
            PetAccess::check(&actor, &pet, tutor_role, Operation::Delete)
        {
            return Err(hidden(reason, &format!("pet {id}")));
        }

        match db.delete_pet(id) {
            Ok(_) => {
                log::info!("deleted pet {id}");
                Ok(())
            }
            Err(e) if is_constraint_violation(&e) => Err(ClinicError::validation(
                "pet",
                "pet has medical records and cannot be deleted",
            )),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Service Operations
    // =========================================================================

    /// Create a service: admin only.
    pub fn create_service(&self, actor_id: Option<&str>, req: NewService) -> ClinicResult<Service> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if let AccessDecision::Deny(reason) =
            ConfigAccess::check(&actor, ConfigResource::Service, Operation::Create)
        {
            return Err(denied(reason));
        }

        if req.price < 0.0 {
            return Err(ClinicError::validation("price", "price cannot be negative"));
        }
        if req.duration_minutes <= 0 {
            return Err(ClinicError::validation(
                "duration_minutes",
                "duration must be positive",
            ));
        }

        let service = Service::new(req.name, req.price, req.duration_minutes);
        db.insert_service(&service)?;
        log::info!("created service {} ({})", service.id, service.name);
        Ok(service)
    }

    /// Get a service. Clients may browse the catalog.
    pub fn get_service(&self, actor_id: Option<&str>, id: &str) -> ClinicResult<Service> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if let AccessDecision::Deny(reason) =
            ConfigAccess::check(&actor, ConfigResource::Service, Operation::Retrieve)
        {
            return Err(denied(reason));
        }
        db.get_service(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("service {id}")))
    }

    /// List services. Clients may browse the catalog.
    pub fn list_services(&self, actor_id: Option<&str>) -> ClinicResult<Vec<Service>> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if let AccessDecision::Deny(reason) =
            ConfigAccess::check(&actor, ConfigResource::Service, Operation::List)
        {
            return Err(denied(reason));
        }
        Ok(db.list_services()?)
    }

    /// Update a service: admin only.
    pub fn update_service(
        &self,
        actor_id: Option<&str>,
        id: &str,
        patch: ServiceUpdate,
    ) -> ClinicResult<Service> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if let AccessDecision::Deny(reason) =
            ConfigAccess::check(&actor, ConfigResource::Service, Operation::Update)
        {
            return Err(denied(reason));
        }

        let mut service = db
            .get_service(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("service {id}")))?;

        if let Some(name) = patch.name {
            service.name = name;
        }
        if let Some(price) = patch.price {
            if price < 0.0 {
                return Err(ClinicError::validation("price", "price cannot be negative"));
            }
            service.price = price;
        }
        if let Some(duration_minutes) = patch.duration_minutes {
            if duration_minutes <= 0 {
                return Err(ClinicError::validation(
                    "duration_minutes",
                    "duration must be positive",
                ));
            }
            service.duration_minutes = duration_minutes;
        }
        if let Some(active) = patch.active {
            service.active = active;
        }

        db.update_service(&service)?;
        Ok(service)
    }

    /// Delete a service: admin only. Blocked while appointments reference it.
    pub fn delete_service(&self, actor_id: Option<&str>, id: &str) -> ClinicResult<()> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if let AccessDecision::Deny(reason) =
            ConfigAccess::check(&actor, ConfigResource::Service, Operation::Delete)
        {
            return Err(denied(reason));
        }
        match db.delete_service(id) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ClinicError::NotFound(format!("service {id}"))),
            Err(e) if is_constraint_violation(&e) => Err(ClinicError::validation(
                "service",
                "service is referenced by appointments",
            )),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Appointment Operations
    // =========================================================================

    /// Book an appointment: permission check, hours/holiday gate, conflict
    /// check, then an atomic insert that re-runs the overlap scan in its own
    /// transaction. A busy database is retried once.
    pub fn book_appointment(
        &self,
        actor_id: Option<&str>,
        req: BookingRequest,
    ) -> ClinicResult<Appointment> {
        let mut db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;

        let pet = db
            .get_pet(&req.pet_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("pet {}", req.pet_id)))?;
        if let AccessDecision::Deny(reason) = AppointmentAccess::check_create(&actor, &pet.tutor_id)
        {
            return Err(denied(reason));
        }

        let service = db
            .get_service(&req.service_id)?
            .ok_or_else(|| ClinicError::validation("service_id", "unknown service"))?;
        if !service.active {
            return Err(ClinicError::validation("service_id", "service is not available"));
        }
        let start = parse_start("start_time", &req.start_time)?;

        let duration = Scheduler::new(&db).admit(&pet.id, &service, start, None)?;

        let mut appointment = Appointment::new(req.pet_id, req.service_id, start);
        appointment.notes = req.notes;

        let mut outcome = db.insert_scheduled_if_free(&appointment, duration);
        if matches!(&outcome, Err(e) if e.is_busy()) {
            outcome = db.insert_scheduled_if_free(&appointment, duration);
        }
        if let Some(conflict_id) = outcome? {
            log::warn!(
                "booking for pet {} at {} lost the slot to {}",
                appointment.pet_id,
                appointment.start_time,
                conflict_id
            );
            return Err(SchedulingError::Conflict(conflict_id).into());
        }

        log::info!(
            "booked appointment {} for pet {} at {}",
            appointment.id,
            appointment.pet_id,
            appointment.start_time
        );
        Ok(appointment)
    }

    /// Update an appointment. Changing the time or service re-runs the
    /// hours gate and the conflict check with the appointment itself
    /// excluded from the comparison set.
    pub fn update_appointment(
        &self,
        actor_id: Option<&str>,
        id: &str,
        patch: AppointmentUpdate,
    ) -> ClinicResult<Appointment> {
        let mut db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;

        let mut appointment = db
            .get_appointment(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("appointment {id}")))?;
        let pet = db
            .get_pet(&appointment.pet_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("pet {}", appointment.pet_id)))?;

        // out-of-scope callers must not learn the appointment exists
        if !AppointmentAccess::check(&actor, &pet.tutor_id, Operation::Retrieve).is_allowed() {
            return Err(ClinicError::NotFound(format!("appointment {id}")));
        }
        if let AccessDecision::Deny(reason) =
            AppointmentAccess::check(&actor, &pet.tutor_id, Operation::Update)
        {
            return Err(denied(reason));
        }

        let reschedule = patch.start_time.is_some() || patch.service_id.is_some();
        if let Some(notes) = patch.notes.clone() {
            appointment.notes = Some(notes);
        }

        if !reschedule {
            db.update_appointment_notes(id, appointment.notes.as_deref())?;
            return Ok(appointment);
        }

        if appointment.status != AppointmentStatus::Scheduled {
            return Err(ClinicError::validation(
                "status",
                format!(
                    "cannot reschedule a {} appointment",
                    appointment.status.as_str()
                ),
            ));
        }

        if let Some(service_id) = patch.service_id {
            match db.get_service(&service_id)? {
                Some(service) if service.active => appointment.service_id = service_id,
                Some(_) => {
                    return Err(ClinicError::validation("service_id", "service is not available"))
                }
                None => return Err(ClinicError::validation("service_id", "unknown service")),
            }
        }
        let service = db
            .get_service(&appointment.service_id)?
            .ok_or_else(|| ClinicError::Configuration("appointment has no service".into()))?;

        let start = match patch.start_time {
            Some(start_time) => {
                let start = parse_start("start_time", &start_time)?;
                appointment.start_time = start.format(START_TIME_FORMAT).to_string();
                start
            }
            None => appointment
                .start()
                .ok_or_else(|| ClinicError::Configuration("unparsable stored start_time".into()))?,
        };

        let duration = Scheduler::new(&db).admit(&pet.id, &service, start, Some(id))?;

        let mut outcome = db.reschedule_if_free(&appointment, duration);
        if matches!(&outcome, Err(e) if e.is_busy()) {
            outcome = db.reschedule_if_free(&appointment, duration);
        }
        if let Some(conflict_id) = outcome? {
            return Err(SchedulingError::Conflict(conflict_id).into());
        }

        log::info!("rescheduled appointment {id} to {}", appointment.start_time);
        Ok(appointment)
    }

    /// Cancel an appointment, freeing its interval immediately. Cancelling
    /// twice is rejected, never double-processed.
    pub fn cancel_appointment(&self, actor_id: Option<&str>, id: &str) -> ClinicResult<Appointment> {
        self.transition_appointment(actor_id, id, AppointmentStatus::Cancelled)
    }

    /// Mark an appointment completed.
    pub fn complete_appointment(
        &self,
        actor_id: Option<&str>,
        id: &str,
    ) -> ClinicResult<Appointment> {
        self.transition_appointment(actor_id, id, AppointmentStatus::Completed)
    }

    fn transition_appointment(
        &self,
        actor_id: Option<&str>,
        id: &str,
        next: AppointmentStatus,
    ) -> ClinicResult<Appointment> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;

        let mut appointment = db
            .get_appointment(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("appointment {id}")))?;
        let pet = db
            .get_pet(&appointment.pet_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("pet {}", appointment.pet_id)))?;

        if !AppointmentAccess::check(&actor, &pet.tutor_id, Operation::Retrieve).is_allowed() {
            return Err(ClinicError::NotFound(format!("appointment {id}")));
        }
        if let AccessDecision::Deny(reason) =
            AppointmentAccess::check(&actor, &pet.tutor_id, Operation::Update)
        {
            return Err(denied(reason));
        }

        if !appointment.status.can_transition_to(next) {
            return Err(ClinicError::validation(
                "status",
                format!(
                    "cannot transition from {} to {}",
                    appointment.status.as_str(),
                    next.as_str()
                ),
            ));
        }

        db.update_appointment_status(id, next)?;
        appointment.status = next;
        log::info!("appointment {id} is now {}", next.as_str());
        Ok(appointment)
    }

    /// Delete an appointment: admin only. The conflict checker is not
    /// involved.
    pub fn delete_appointment(&self, actor_id: Option<&str>, id: &str) -> ClinicResult<()> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;

        let appointment = db
            .get_appointment(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("appointment {id}")))?;
        let pet = db
            .get_pet(&appointment.pet_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("pet {}", appointment.pet_id)))?;

        if !AppointmentAccess::check(&actor, &pet.tutor_id, Operation::Retrieve).is_allowed() {
            return Err(ClinicError::NotFound(format!("appointment {id}")));
        }
        if let AccessDecision::Deny(reason) =
            AppointmentAccess::check(&actor, &pet.tutor_id, Operation::Delete)
        {
            return Err(denied(reason));
        }

        db.delete_appointment(id)?;
        log::info!("deleted appointment {id}");
        Ok(())
    }

    /// Get an appointment visible to the actor.
    pub fn get_appointment(&self, actor_id: Option<&str>, id: &str) -> ClinicResult<Appointment> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;

        let appointment = db
            .get_appointment(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("appointment {id}")))?;
        let pet = db
            .get_pet(&appointment.pet_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("pet {}", appointment.pet_id)))?;

        if !AppointmentAccess::check(&actor, &pet.tutor_id, Operation::Retrieve).is_allowed() {
            return Err(ClinicError::NotFound(format!("appointment {id}")));
        }
        Ok(appointment)
    }

    /// List appointments visible to the actor.
    pub fn list_appointments(&self, actor_id: Option<&str>) -> ClinicResult<Vec<Appointment>> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        match AppointmentAccess::list_scope(&actor) {
            ListScope::All => Ok(db.list_appointments()?),
            ListScope::OwnedBy(tutor_id) => Ok(db.list_appointments_by_tutor(&tutor_id)?),
        }
    }

    /// Free hourly slots for a date, ascending "HH:MM". Rejects unparsable
    /// dates and dates in the past with distinct errors.
    pub fn available_slots(
        &self,
        actor_id: Option<&str>,
        date: &str,
        pet_id: Option<&str>,
    ) -> ClinicResult<Vec<String>> {
        let db = self.db.lock()?;
        resolve_actor(&db, actor_id)?;
        Ok(Scheduler::new(&db).available_slots(date, pet_id)?)
    }

    // =========================================================================
    // Medical Record Operations
    // =========================================================================

    /// Add a medical record authored by the acting personnel user.
    pub fn add_medical_record(
        &self,
        actor_id: Option<&str>,
        req: NewMedicalRecord,
    ) -> ClinicResult<MedicalRecord> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;

        let pet = db
            .get_pet(&req.pet_id)?
            .ok_or_else(|| ClinicError::validation("pet_id", "unknown pet"))?;
        if let AccessDecision::Deny(reason) =
            RecordAccess::check(&actor, &pet.tutor_id, Operation::Create)
        {
            return Err(denied(reason));
        }

        parse_start("consulted_at", &req.consulted_at)?;

        let mut record = MedicalRecord::new(
            req.pet_id,
            actor.user_id.clone(),
            req.consulted_at,
            req.consultation_type,
        );
        record.weight_kg = req.weight_kg;
        record.temperature_c = req.temperature_c;
        record.symptoms = req.symptoms;
        record.diagnosis = req.diagnosis;
        record.treatment = req.treatment;
        record.prescription = req.prescription;

        if !record.weight_is_valid() {
            return Err(ClinicError::validation("weight_kg", "weight must be positive"));
        }
        if !record.temperature_is_valid() {
            return Err(ClinicError::validation(
                "temperature_c",
                "temperature outside plausible range",
            ));
        }

        db.insert_record(&record)?;
        log::info!("added medical record {} for pet {}", record.id, record.pet_id);
        Ok(record)
    }

    /// Get a record visible to the actor.
    pub fn get_medical_record(
        &self,
        actor_id: Option<&str>,
        id: &str,
    ) -> ClinicResult<MedicalRecord> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;

        let record = db
            .get_record(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("medical record {id}")))?;
        let pet = db
            .get_pet(&record.pet_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("pet {}", record.pet_id)))?;

        if !RecordAccess::check(&actor, &pet.tutor_id, Operation::Retrieve).is_allowed() {
            return Err(ClinicError::NotFound(format!("medical record {id}")));
        }
        Ok(record)
    }

    /// List records visible to the actor.
    pub fn list_medical_records(&self, actor_id: Option<&str>) -> ClinicResult<Vec<MedicalRecord>> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        match RecordAccess::list_scope(&actor) {
            ListScope::All => Ok(db.list_records()?),
            ListScope::OwnedBy(tutor_id) => Ok(db.list_records_by_tutor(&tutor_id)?),
        }
    }

    /// List one pet's records: personnel, or the pet's tutor.
    pub fn list_pet_medical_records(
        &self,
        actor_id: Option<&str>,
        pet_id: &str,
    ) -> ClinicResult<Vec<MedicalRecord>> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        let pet = db
            .get_pet(pet_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("pet {pet_id}")))?;
        if !RecordAccess::check(&actor, &pet.tutor_id, Operation::List).is_allowed() {
            return Err(ClinicError::NotFound(format!("pet {pet_id}")));
        }
        Ok(db.list_records_for_pet(pet_id)?)
    }

    /// Update a record's clinical fields: personnel only.
    pub fn update_medical_record(
        &self,
        actor_id: Option<&str>,
        id: &str,
        patch: MedicalRecordUpdate,
    ) -> ClinicResult<MedicalRecord> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;

        let mut record = db
            .get_record(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("medical record {id}")))?;
        let pet = db
            .get_pet(&record.pet_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("pet {}", record.pet_id)))?;

        if !RecordAccess::check(&actor, &pet.tutor_id, Operation::Retrieve).is_allowed() {
            return Err(ClinicError::NotFound(format!("medical record {id}")));
        }
        if let AccessDecision::Deny(reason) =
            RecordAccess::check(&actor, &pet.tutor_id, Operation::Update)
        {
            return Err(denied(reason));
        }

        if let Some(consulted_at) = patch.consulted_at {
            parse_start("consulted_at", &consulted_at)?;
            record.consulted_at = consulted_at;
        }
        if let Some(consultation_type) = patch.consultation_type {
            record.consultation_type = consultation_type;
        }
        if let Some(weight_kg) = patch.weight_kg {
            record.weight_kg = Some(weight_kg);
        }
        if let Some(temperature_c) = patch.temperature_c {
            record.temperature_c = Some(temperature_c);
        }
        if let Some(symptoms) = patch.symptoms {
            record.symptoms = Some(symptoms);
        }
        if let Some(diagnosis) = patch.diagnosis {
            record.diagnosis = Some(diagnosis);
        }
        if let Some(treatment) = patch.treatment {
            record.treatment = Some(treatment);
        }
        if let Some(prescription) = patch.prescription {
            record.prescription = Some(prescription);
        }

        if !record.weight_is_valid() {
            return Err(ClinicError::validation("weight_kg", "weight must be positive"));
        }
        if !record.temperature_is_valid() {
            return Err(ClinicError::validation(
                "temperature_c",
                "temperature outside plausible range",
            ));
        }

        db.update_record(&record)?;
        Ok(record)
    }

    /// Delete a record: admin only.
    pub fn delete_medical_record(&self, actor_id: Option<&str>, id: &str) -> ClinicResult<()> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;

        let record = db
            .get_record(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("medical record {id}")))?;
        let pet = db
            .get_pet(&record.pet_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("pet {}", record.pet_id)))?;

        if !RecordAccess::check(&actor, &pet.tutor_id, Operation::Retrieve).is_allowed() {
            return Err(ClinicError::NotFound(format!("medical record {id}")));
        }
        if let AccessDecision::Deny(reason) =
            RecordAccess::check(&actor, &pet.tutor_id, Operation::Delete)
        {
            return Err(denied(reason));
        }

        db.delete_record(id)?;
        log::info!("deleted medical record {id}");
        Ok(())
    }

    // =========================================================================
    // Schedule Configuration Operations
    // =========================================================================

    /// Set (or replace) the hours for one weekday: admin only.
    pub fn set_operating_hours(
        &self,
        actor_id: Option<&str>,
        spec: HoursSpec,
    ) -> ClinicResult<OperatingHours> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if let AccessDecision::Deny(reason) =
            ConfigAccess::check(&actor, ConfigResource::OperatingHours, Operation::Update)
        {
            return Err(denied(reason));
        }

        if spec.weekday > 6 {
            return Err(ClinicError::validation("weekday", "weekday must be 0-6"));
        }
        let open = chrono::NaiveTime::parse_from_str(&spec.open_time, models::TIME_OF_DAY_FORMAT)
            .map_err(|_| ClinicError::validation("open_time", "invalid time"))?;
        let close = chrono::NaiveTime::parse_from_str(&spec.close_time, models::TIME_OF_DAY_FORMAT)
            .map_err(|_| ClinicError::validation("close_time", "invalid time"))?;
        if close <= open {
            return Err(ClinicError::validation(
                "close_time",
                "closing time must be after opening time",
            ));
        }

        let mut hours = OperatingHours::new(spec.weekday, spec.open_time, spec.close_time);
        hours.active = spec.active;
        db.upsert_operating_hours(&hours)?;
        log::info!("set operating hours for weekday {}", hours.weekday);
        Ok(hours)
    }

    /// List configured hours: personnel only.
    pub fn list_operating_hours(&self, actor_id: Option<&str>) -> ClinicResult<Vec<OperatingHours>> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if let AccessDecision::Deny(reason) =
            ConfigAccess::check(&actor, ConfigResource::OperatingHours, Operation::List)
        {
            return Err(denied(reason));
        }
        Ok(db.list_operating_hours()?)
    }

    /// Add a holiday: admin only. Past dates are rejected.
    pub fn add_holiday(&self, actor_id: Option<&str>, req: NewHoliday) -> ClinicResult<Holiday> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if let AccessDecision::Deny(reason) =
            ConfigAccess::check(&actor, ConfigResource::Holiday, Operation::Create)
        {
            return Err(denied(reason));
        }

        if req.name.trim().chars().count() < 3 {
            return Err(ClinicError::validation(
                "name",
                "name must be at least 3 characters",
            ));
        }
        let date = chrono::NaiveDate::parse_from_str(&req.date, "%Y-%m-%d")
            .map_err(|_| ClinicError::validation("date", "invalid date"))?;
        if date < chrono::Local::now().date_naive() {
            return Err(ClinicError::validation("date", "date is in the past"));
        }

        let mut holiday = Holiday::new(req.date, req.name);
        holiday.recurring = req.recurring;
        match db.insert_holiday(&holiday) {
            Ok(()) => {
                log::info!("added holiday {} on {}", holiday.name, holiday.date);
                Ok(holiday)
            }
            Err(e) if is_constraint_violation(&e) => Err(ClinicError::validation(
                "date",
                "holiday already exists for this date",
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Update a holiday's name or flags: admin only.
    pub fn update_holiday(
        &self,
        actor_id: Option<&str>,
        id: &str,
        patch: HolidayUpdate,
    ) -> ClinicResult<Holiday> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if let AccessDecision::Deny(reason) =
            ConfigAccess::check(&actor, ConfigResource::Holiday, Operation::Update)
        {
            return Err(denied(reason));
        }

        let mut holiday = db
            .get_holiday(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("holiday {id}")))?;

        if let Some(name) = patch.name {
            if name.trim().chars().count() < 3 {
                return Err(ClinicError::validation(
                    "name",
                    "name must be at least 3 characters",
                ));
            }
            holiday.name = name;
        }
        if let Some(recurring) = patch.recurring {
            holiday.recurring = recurring;
        }
        if let Some(active) = patch.active {
            holiday.active = active;
        }

        db.update_holiday(&holiday)?;
        Ok(holiday)
    }

    /// Delete a holiday: admin only.
    pub fn delete_holiday(&self, actor_id: Option<&str>, id: &str) -> ClinicResult<()> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if let AccessDecision::Deny(reason) =
            ConfigAccess::check(&actor, ConfigResource::Holiday, Operation::Delete)
        {
            return Err(denied(reason));
        }
        if !db.delete_holiday(id)? {
            return Err(ClinicError::NotFound(format!("holiday {id}")));
        }
        Ok(())
    }

    /// List holidays: personnel only.
    pub fn list_holidays(&self, actor_id: Option<&str>) -> ClinicResult<Vec<Holiday>> {
        let db = self.db.lock()?;
        let actor = resolve_actor(&db, actor_id)?;
        if let AccessDecision::Deny(reason) =
            ConfigAccess::check(&actor, ConfigResource::Holiday, Operation::List)
        {
            return Err(denied(reason));
        }
        Ok(db.list_holidays()?)
    }
}
