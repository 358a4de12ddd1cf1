//! Shared test scaffolding: an in-memory expense backend, a manually driven
//! clock, and a one-shot HTTP server with canned responses.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use spendcache_core::{ApiError, Clock, Expense, ExpenseBackend, ExpenseDraft, NewExpense};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

// ============================================================================
// Fixtures
// ============================================================================

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn amount(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

pub fn expense(id: &str, user_id: &str, day: &str, value: &str) -> Expense {
    Expense {
        id: id.to_string(),
        user_id: user_id.to_string(),
        title: format!("Expense {}", id),
        amount: amount(value),
        date: date(day),
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    }
}

pub fn draft(title: &str, value: &str, day: &str) -> ExpenseDraft {
    ExpenseDraft::parse(title, value, day).unwrap()
}

// ============================================================================
// Clock
// ============================================================================

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ============================================================================
// Mock backend
// ============================================================================

/// Failure a mock operation should report.
#[derive(Debug, Clone)]
pub enum Failure {
    NotFound,
    Server(String),
    Decode,
}

impl Failure {
    fn to_error(&self) -> ApiError {
        match self {
            Failure::NotFound => ApiError::NotFound("Not found".to_string()),
            Failure::Server(body) => ApiError::ServerError(body.clone()),
            Failure::Decode => ApiError::Decode("unexpected end of input".to_string()),
        }
    }
}

/// Handle for a list call held open until released.
pub struct ListGate {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

impl ListGate {
    /// Resolves once the held call has taken its snapshot.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
struct MockState {
    expenses: Vec<Expense>,
    next_id: u64,
    list_failure: Option<Failure>,
    create_failure: Option<Failure>,
    delete_failure: Option<Failure>,
    empty_is_not_found: bool,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
    last_created: Option<NewExpense>,
}

/// In-memory stand-in for the remote store.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().next_id = 100;
        backend
    }

    pub fn with_expenses(self, expenses: Vec<Expense>) -> Self {
        self.state.lock().unwrap().expenses = expenses;
        self
    }

    /// Answer 404 instead of `[]` when a user has no expenses.
    pub fn with_empty_as_not_found(self) -> Self {
        self.state.lock().unwrap().empty_is_not_found = true;
        self
    }

    /// Change the store behind the service's back.
    pub fn insert(&self, expense: Expense) {
        self.state.lock().unwrap().expenses.push(expense);
    }

    pub fn fail_list(&self, failure: Option<Failure>) {
        self.state.lock().unwrap().list_failure = failure;
    }

    pub fn fail_create(&self, failure: Option<Failure>) {
        self.state.lock().unwrap().create_failure = failure;
    }

    pub fn fail_delete(&self, failure: Option<Failure>) {
        self.state.lock().unwrap().delete_failure = failure;
    }

    /// Hold the next list call open after it has read the store.
    pub fn hold_next_list(&self) -> ListGate {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        self.state.lock().unwrap().gate = Some((started.clone(), release.clone()));
        ListGate { started, release }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn last_created(&self) -> Option<NewExpense> {
        self.state.lock().unwrap().last_created.clone()
    }

    fn snapshot(&self, user_id: &str) -> (Result<Vec<Expense>, ApiError>, Option<(Arc<Notify>, Arc<Notify>)>) {
        let mut state = self.state.lock().unwrap();
        let gate = state.gate.take();
        if let Some(failure) = &state.list_failure {
            return (Err(failure.to_error()), gate);
        }
        let owned: Vec<Expense> = state
            .expenses
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        if owned.is_empty() && state.empty_is_not_found {
            return (Err(Failure::NotFound.to_error()), gate);
        }
        (Ok(owned), gate)
    }
}

#[async_trait]
impl ExpenseBackend for MockBackend {
    async fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let (result, gate) = self.snapshot(user_id);
        if let Some((started, release)) = gate {
            started.notify_one();
            release.notified().await;
        }
        result
    }

    async fn create_expense(&self, expense: &NewExpense) -> Result<Expense, ApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.last_created = Some(expense.clone());
        if let Some(failure) = &state.create_failure {
            return Err(failure.to_error());
        }
        state.next_id += 1;
        let created = Expense {
            id: state.next_id.to_string(),
            user_id: expense.user_id.clone(),
            title: expense.title.clone(),
            amount: expense.amount.clone(),
            date: expense.date,
            created_at: expense.created_at,
        };
        state.expenses.push(created.clone());
        Ok(created)
    }

    async fn delete_expense(&self, expense_id: &str) -> Result<Expense, ApiError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Some(failure) = &state.delete_failure {
            return Err(failure.to_error());
        }
        match state.expenses.iter().position(|e| e.id == expense_id) {
            Some(index) => Ok(state.expenses.remove(index)),
            None => Err(Failure::NotFound.to_error()),
        }
    }
}

// ============================================================================
// Canned HTTP server
// ============================================================================

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    /// Header block, lowercased
    pub headers: String,
    pub body: String,
}

pub struct CannedServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl CannedServer {
    /// Serve each `(status, body)` pair to one connection, in order.
    pub async fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                let request = read_request(&mut stream).await.unwrap();
                recorded.lock().unwrap().push(request);

                let response = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });

        Self {
            base_url: format!("http://{}/api/v1", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Base URL of a port nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api/v1", addr)
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    Ok(RecordedRequest {
        method: request_line.next().unwrap_or_default().to_string(),
        target: request_line.next().unwrap_or_default().to_string(),
        headers: head.to_lowercase(),
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    })
}
