//! In-memory stand-ins for the hosted store and auth service (tests only)

use crate::api::{ApiError, DataStore, Direction, Query};
use crate::auth::{AuthBackend, AuthError};
use crate::models::Principal;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => value_text(a).cmp(&value_text(b)),
    }
}

/// Tables of JSON rows that answer the same query shapes PostgREST does
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    next_id: AtomicU64,
    failing: AtomicBool,
    writes: AtomicUsize,
    selects: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
    }

    /// Make every following call fail like an unreachable service
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(AtomicOrdering::SeqCst)
    }

    pub fn select_count(&self) -> usize {
        self.selects.load(AtomicOrdering::SeqCst)
    }

    fn check(&self) -> Result<(), ApiError> {
        if self.failing.load(AtomicOrdering::SeqCst) {
            return Err(ApiError::Status {
                status: 503,
                message: "Service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl DataStore for MemoryStore {
    fn select(&self, query: &Query) -> Result<Vec<Value>, ApiError> {
        self.check()?;
        self.selects.fetch_add(1, AtomicOrdering::SeqCst);

        let mut rows: Vec<Value> = self
            .rows(&query.table)
            .into_iter()
            .filter(|row| {
                query
                    .filters
                    .iter()
                    .all(|f| row.get(&f.column).map(value_text).as_deref() == Some(f.value.as_str()))
            })
            .collect();

        rows.sort_by(|a, b| {
            for (column, direction) in &query.order {
                let null = Value::Null;
                let ord = compare_values(a.get(column).unwrap_or(&null), b.get(column).unwrap_or(&null));
                let ord = match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn insert(&self, table: &str, record: &Value) -> Result<Value, ApiError> {
        self.check()?;
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);

        let n = self.next_id.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        let mut row = record.clone();
        if let Value::Object(map) = &mut row {
            if map.get("id").map_or(true, Value::is_null) {
                map.insert("id".to_string(), Value::String(format!("mem-{}", n)));
            }
            if map.get("created_at").map_or(true, Value::is_null) {
                let base = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
                let created = base + chrono::Duration::seconds(n as i64);
                map.insert("created_at".to_string(), Value::String(created.to_rfc3339()));
            }
        }

        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    fn update(&self, table: &str, id: &str, patch: &Value) -> Result<(), ApiError> {
        self.check()?;
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);

        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut() {
                if row.get("id").and_then(|v| v.as_str()) == Some(id) {
                    if let (Value::Object(target), Value::Object(changes)) = (row, patch) {
                        for (key, value) in changes {
                            target.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn delete(&self, table: &str, id: &str) -> Result<(), ApiError> {
        self.check()?;
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);

        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| row.get("id").and_then(|v| v.as_str()) != Some(id));
        }
        Ok(())
    }
}

/// Holds callers until opened, so a test can act while a remote call is in flight
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
    waiting: AtomicUsize,
}

impl Gate {
    pub fn pass(&self) {
        self.waiting.fetch_add(1, AtomicOrdering::SeqCst);
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
    }

    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }

    /// Block until `count` callers are held at the gate
    pub fn wait_for(&self, count: usize) {
        while self.waiting.load(AtomicOrdering::SeqCst) < count {
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

/// Auth service with a fixed set of accounts
#[derive(Default)]
pub struct FakeAuth {
    /// Remote calls wait here while the matching `hold_*` flag is set
    pub gate: Gate,
    pub hold_refresh: AtomicBool,
    pub hold_sign_out: AtomicBool,
    users: Mutex<HashMap<String, String>>,
    issued: AtomicU64,
    pub require_confirmation: AtomicBool,
    pub refuse_refresh: AtomicBool,
    pub refuse_verify: AtomicBool,
    pub fail_sign_out: AtomicBool,
    pub sign_outs: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeAuth {
    pub fn with_user(email: &str, password: &str) -> Self {
        let auth = Self::default();
        auth.users
            .lock()
            .unwrap()
            .insert(email.to_string(), password.to_string());
        auth
    }

    fn issue(&self, email: &str) -> Principal {
        let n = self.issued.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        Principal {
            user_id: format!("user-{}", email),
            email: email.to_string(),
            access_token: format!("access-{}", n),
            refresh_token: format!("refresh-{}", n),
            expires_at: Utc::now().timestamp() + 3600,
        }
    }
}

impl AuthBackend for FakeAuth {
    fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        let users = self.users.lock().unwrap();
        match users.get(email) {
            Some(stored) if stored == password => Ok(self.issue(email)),
            _ => Err(AuthError::Rejected("Invalid login credentials".to_string())),
        }
    }

    fn sign_up(&self, email: &str, password: &str) -> Result<Option<Principal>, AuthError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        let mut users = self.users.lock().unwrap();
        if users.contains_key(email) {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }
        users.insert(email.to_string(), password.to_string());

        if self.require_confirmation.load(AtomicOrdering::SeqCst) {
            Ok(None)
        } else {
            Ok(Some(self.issue(email)))
        }
    }

    fn refresh(&self, principal: &Principal) -> Result<Principal, AuthError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.hold_refresh.load(AtomicOrdering::SeqCst) {
            self.gate.pass();
        }
        if self.refuse_refresh.load(AtomicOrdering::SeqCst) {
            return Err(AuthError::Rejected("Invalid Refresh Token".to_string()));
        }
        Ok(self.issue(&principal.email))
    }

    fn verify(&self, principal: &Principal) -> Result<Principal, AuthError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.refuse_verify.load(AtomicOrdering::SeqCst) {
            return Err(AuthError::Rejected("invalid JWT".to_string()));
        }
        Ok(principal.clone())
    }

    fn sign_out(&self, _principal: &Principal) -> Result<(), AuthError> {
        self.sign_outs.fetch_add(1, AtomicOrdering::SeqCst);
        if self.hold_sign_out.load(AtomicOrdering::SeqCst) {
            self.gate.pass();
        }
        if self.fail_sign_out.load(AtomicOrdering::SeqCst) {
            return Err(AuthError::Transport("connection reset".to_string()));
        }
        Ok(())
    }
}
