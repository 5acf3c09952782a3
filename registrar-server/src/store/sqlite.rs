//! SQLite-based storage implementation

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::{
    Account, AccountId, AccountStore, Challenge, PendingRegistration, Role, StoreResult,
    UpsertOutcome,
};
use crate::error::RegistrarError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// How long a statement waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ACCOUNT_COLUMNS: &str = "id, email, full_name, carnet_number, carnet_key, password_hash, \
     role, is_verified, verification_code, code_expires_at, failed_attempts, created_at, updated_at";

/// Insert, or overwrite a pending row with the same email. The `WHERE`
/// guard turns a conflict with a verified row into a no-op (0 rows changed).
const UPSERT_PENDING_SQL: &str = "
    INSERT INTO accounts (email, full_name, carnet_number, carnet_key, password_hash, role,
                          is_verified, verification_code, code_expires_at, failed_attempts,
                          created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, 0, ?9, ?9)
    ON CONFLICT(email) DO UPDATE SET
        full_name = excluded.full_name,
        carnet_number = excluded.carnet_number,
        carnet_key = excluded.carnet_key,
        password_hash = excluded.password_hash,
        verification_code = excluded.verification_code,
        code_expires_at = excluded.code_expires_at,
        failed_attempts = 0,
        updated_at = excluded.updated_at
    WHERE accounts.is_verified = 0";

fn internal(e: rusqlite::Error) -> RegistrarError {
    RegistrarError::Internal(e.to_string())
}

/// SQLite-based account store
///
/// Mutating calls run inside an `IMMEDIATE` transaction, so the read and the
/// conditional write cannot interleave with another writer, in this process
/// or another one sharing the file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, RegistrarError> {
        let conn = Connection::open(path).map_err(internal)?;
        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, RegistrarError> {
        let conn = Connection::open_in_memory().map_err(internal)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, RegistrarError> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(internal)?;

        // Run migrations
        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), RegistrarError> {
        // Check current schema version
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            // Update schema version
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(internal)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, RegistrarError> {
        // Check if schema_version table exists
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(internal)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(internal)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), RegistrarError> {
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Accounts, one per normalized email
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                full_name TEXT NOT NULL,
                carnet_number TEXT NOT NULL,
                carnet_key TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'student',
                is_verified INTEGER NOT NULL DEFAULT 0,
                verification_code TEXT,
                code_expires_at TEXT,
                failed_attempts INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK ((verification_code IS NULL) = (code_expires_at IS NULL))
            );
            "#,
        )
        .map_err(internal)?;

        Ok(())
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RegistrarError::Internal(format!("SQLite connection lock poisoned: {}", e)))
    }
}

/// Raw column values, converted to an [`Account`] outside the row callback
struct AccountRow {
    id: i64,
    email: String,
    full_name: String,
    carnet_number: String,
    carnet_key: String,
    password_hash: String,
    role: String,
    is_verified: bool,
    verification_code: Option<String>,
    code_expires_at: Option<String>,
    failed_attempts: i64,
    created_at: String,
    updated_at: String,
}

impl AccountRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            full_name: row.get(2)?,
            carnet_number: row.get(3)?,
            carnet_key: row.get(4)?,
            password_hash: row.get(5)?,
            role: row.get(6)?,
            is_verified: row.get::<_, i32>(7)? != 0,
            verification_code: row.get(8)?,
            code_expires_at: row.get(9)?,
            failed_attempts: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn into_account(self) -> StoreResult<Account> {
        let challenge = match (self.verification_code, self.code_expires_at) {
            (Some(code), Some(expires_at)) => Some(Challenge {
                code,
                expires_at: parse_timestamp(&expires_at)?,
                failed_attempts: u32::try_from(self.failed_attempts).unwrap_or(0),
            }),
            (None, None) => None,
            _ => {
                return Err(RegistrarError::Internal(format!(
                    "Account {} has a half-written challenge",
                    self.id
                )))
            }
        };

        Ok(Account {
            id: AccountId(self.id as u64),
            email: self.email,
            full_name: self.full_name,
            carnet_number: self.carnet_number,
            carnet_key: self.carnet_key,
            password_hash: self.password_hash,
            role: Role::parse(&self.role),
            is_verified: self.is_verified,
            challenge,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RegistrarError::Internal(format!("Bad timestamp {:?}: {}", s, e)))
}

fn select_account(conn: &Connection, email: &str) -> StoreResult<Option<Account>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM accounts WHERE email = ?1", ACCOUNT_COLUMNS),
            params![email],
            AccountRow::from_row,
        )
        .optional()
        .map_err(internal)?;

    row.map(AccountRow::into_account).transpose()
}

/// Persist the fields touched by a verification attempt
fn write_verification_state(conn: &Connection, account: &Account) -> StoreResult<()> {
    let (code, expires_at, attempts) = match &account.challenge {
        Some(c) => (
            Some(c.code.as_str()),
            Some(c.expires_at.to_rfc3339()),
            c.failed_attempts as i64,
        ),
        None => (None, None, 0),
    };

    conn.execute(
        "UPDATE accounts
            SET is_verified = ?1, verification_code = ?2, code_expires_at = ?3,
                failed_attempts = ?4, updated_at = ?5
          WHERE id = ?6",
        params![
            account.is_verified as i32,
            code,
            expires_at,
            attempts,
            account.updated_at.to_rfc3339(),
            account.id.0 as i64,
        ],
    )
    .map_err(internal)?;

    Ok(())
}

impl AccountStore for SqliteStore {
    fn get_account(&self, email: &str) -> StoreResult<Option<Account>> {
        let conn = self.conn()?;
        select_account(&conn, email)
    }

    fn carnet_available(&self, carnet_key: &str, email: Option<&str>) -> StoreResult<bool> {
        let conn = self.conn()?;

        let taken: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM accounts WHERE carnet_key = ?1 AND email IS NOT ?2)",
                params![carnet_key, email],
                |row| row.get(0),
            )
            .map_err(internal)?;

        Ok(!taken)
    }

    fn upsert_pending(&self, registration: PendingRegistration) -> StoreResult<UpsertOutcome> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(internal)?;
        let now = Utc::now().to_rfc3339();

        let created = select_account(&tx, &registration.email)?.is_none();

        let changed = tx
            .execute(
                UPSERT_PENDING_SQL,
                params![
                    registration.email,
                    registration.full_name,
                    registration.carnet_number,
                    registration.carnet_key,
                    registration.password_hash,
                    Role::default().as_str(),
                    registration.challenge.code,
                    registration.challenge.expires_at.to_rfc3339(),
                    now,
                ],
            )
            .map_err(|e| {
                if let rusqlite::Error::SqliteFailure(ref err, Some(ref msg)) = e {
                    if err.code == rusqlite::ErrorCode::ConstraintViolation
                        && msg.contains("carnet_key")
                    {
                        return RegistrarError::CarnetTaken;
                    }
                }
                internal(e)
            })?;

        if changed == 0 {
            return Err(RegistrarError::AlreadyRegistered);
        }

        let account = select_account(&tx, &registration.email)?
            .ok_or_else(|| RegistrarError::Internal("Upserted account not found".into()))?;

        tx.commit().map_err(internal)?;

        Ok(UpsertOutcome { account, created })
    }

    fn replace_challenge(&self, email: &str, challenge: Challenge) -> StoreResult<Account> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(internal)?;

        let changed = tx
            .execute(
                "UPDATE accounts
                    SET verification_code = ?1, code_expires_at = ?2, failed_attempts = 0,
                        updated_at = ?3
                  WHERE email = ?4 AND is_verified = 0",
                params![
                    challenge.code,
                    challenge.expires_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                    email,
                ],
            )
            .map_err(internal)?;

        let account = select_account(&tx, email)?.ok_or(RegistrarError::AccountNotFound)?;
        if changed == 0 {
            return Err(RegistrarError::AlreadyVerified);
        }

        tx.commit().map_err(internal)?;
        Ok(account)
    }

    fn verify_account(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> StoreResult<Account> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(internal)?;

        let mut account = select_account(&tx, email)?.ok_or(RegistrarError::AccountNotFound)?;
        let result = account.apply_verification(code, now, max_attempts);

        if !matches!(
            result,
            Err(RegistrarError::AlreadyVerified) | Err(RegistrarError::ChallengeExpired)
        ) {
            write_verification_state(&tx, &account)?;
        }

        tx.commit().map_err(internal)?;
        result.map(|_| account)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn registration(email: &str, carnet: &str, code: &str) -> PendingRegistration {
        PendingRegistration {
            email: email.into(),
            full_name: "Ana Ruiz".into(),
            carnet_number: carnet.into(),
            carnet_key: carnet.replace('-', ""),
            password_hash: "hash".into(),
            challenge: Challenge::new(code.into(), Utc::now() + Duration::minutes(10)),
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let store = SqliteStore::open_in_memory().unwrap();

        let outcome = store
            .upsert_pending(registration("ana@miumg.edu.gt", "0904-22-1234", "111111"))
            .unwrap();
        assert!(outcome.created);

        let account = store.get_account("ana@miumg.edu.gt").unwrap().unwrap();
        assert_eq!(account.id, outcome.account.id);
        assert_eq!(account.role, Role::Student);
        assert!(!account.is_verified);
        assert_eq!(account.challenge.unwrap().code, "111111");
    }

    #[test]
    fn test_overwrite_keeps_id_and_resets_attempts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store
            .upsert_pending(registration("ana@miumg.edu.gt", "0904-22-1234", "111111"))
            .unwrap();
        store
            .verify_account("ana@miumg.edu.gt", "000000", Utc::now(), 5)
            .unwrap_err();

        let second = store
            .upsert_pending(registration("ana@miumg.edu.gt", "0904-22-5678", "222222"))
            .unwrap();

        assert!(!second.created);
        assert_eq!(first.account.id, second.account.id);
        assert_eq!(second.account.carnet_key, "0904225678");
        let challenge = second.account.challenge.unwrap();
        assert_eq!(challenge.code, "222222");
        assert_eq!(challenge.failed_attempts, 0);
    }

    #[test]
    fn test_verified_guard() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_pending(registration("ana@miumg.edu.gt", "0904-22-1234", "111111"))
            .unwrap();
        store
            .verify_account("ana@miumg.edu.gt", "111111", Utc::now(), 5)
            .unwrap();

        let err = store
            .upsert_pending(registration("ana@miumg.edu.gt", "0904-22-1234", "222222"))
            .unwrap_err();
        assert!(matches!(err, RegistrarError::AlreadyRegistered));

        let err = store
            .replace_challenge(
                "ana@miumg.edu.gt",
                Challenge::new("333333".into(), Utc::now() + Duration::minutes(10)),
            )
            .unwrap_err();
        assert!(matches!(err, RegistrarError::AlreadyVerified));
    }

    #[test]
    fn test_carnet_unique_index() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_pending(registration("ana@miumg.edu.gt", "0904-22-1234", "111111"))
            .unwrap();

        let err = store
            .upsert_pending(registration("luis@miumg.edu.gt", "0904-22-1234", "222222"))
            .unwrap_err();
        assert!(matches!(err, RegistrarError::CarnetTaken));
        assert!(store.get_account("luis@miumg.edu.gt").unwrap().is_none());
    }

    #[test]
    fn test_attempts_persist_across_calls() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_pending(registration("ana@miumg.edu.gt", "0904-22-1234", "111111"))
            .unwrap();

        store
            .verify_account("ana@miumg.edu.gt", "000000", Utc::now(), 2)
            .unwrap_err();
        let err = store
            .verify_account("ana@miumg.edu.gt", "000000", Utc::now(), 2)
            .unwrap_err();
        assert!(matches!(err, RegistrarError::TooManyAttempts));

        let account = store.get_account("ana@miumg.edu.gt").unwrap().unwrap();
        assert!(account.challenge.is_none());
        assert!(!account.is_verified);
    }
}
