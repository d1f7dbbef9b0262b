//! Scripted payment provider.

use atelier_core::error::ProviderError;
use atelier_core::payment::{PaymentProvider, ProviderFuture, RetrieveOptions};
use atelier_core::types::{
    CreateSessionRequest, CreatedSession, PaymentIntentStatus, PaymentStatus, Session, SessionId,
    SessionStatus,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct State {
    sessions: BTreeMap<SessionId, Session>,
    created: Vec<CreateSessionRequest>,
    create_failure: Option<ProviderError>,
    retrieve_failure: Option<ProviderError>,
    next_id: u64,
    create_calls: usize,
    retrieve_calls: usize,
}

/// Payment provider that keeps sessions in memory.
///
/// New sessions are `open / unpaid / requires_payment_method` until a test
/// calls [`settle`](Self::settle) or [`set_statuses`](Self::set_statuses).
/// Session ids look like `cs_test_1`, client secrets like `cs_test_1_secret_1`.
///
/// Clones share state.
#[derive(Clone, Debug, Default)]
pub struct MockPaymentProvider {
    state: Arc<Mutex<State>>,
}

impl MockPaymentProvider {
    /// Create a provider with no sessions
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every `create_session` call fail with `error`.
    pub fn fail_creates(&self, error: ProviderError) {
        self.lock().create_failure = Some(error);
    }

    /// Make every `retrieve_session` call fail with `error`.
    pub fn fail_retrieves(&self, error: ProviderError) {
        self.lock().retrieve_failure = Some(error);
    }

    /// Mark a session as fully settled: `complete / paid / succeeded`.
    pub fn settle(&self, session_id: &SessionId) {
        self.set_statuses(
            session_id,
            Some(SessionStatus::Complete),
            Some(PaymentStatus::Paid),
            Some(PaymentIntentStatus::Succeeded),
        );
    }

    /// Overwrite the three statuses of a known session.
    pub fn set_statuses(
        &self,
        session_id: &SessionId,
        status: Option<SessionStatus>,
        payment_status: Option<PaymentStatus>,
        payment_intent_status: Option<PaymentIntentStatus>,
    ) {
        if let Some(session) = self.lock().sessions.get_mut(session_id) {
            session.status = status;
            session.payment_status = payment_status;
            session.payment_intent_status = payment_intent_status;
        }
    }

    /// Register a hand-built session, e.g. one with legacy metadata.
    pub fn insert_session(&self, session: Session) {
        self.lock().sessions.insert(session.id.clone(), session);
    }

    /// Snapshot of a session
    #[must_use]
    pub fn session(&self, session_id: &SessionId) -> Option<Session> {
        self.lock().sessions.get(session_id).cloned()
    }

    /// Every request passed to `create_session`, in order
    #[must_use]
    pub fn created_requests(&self) -> Vec<CreateSessionRequest> {
        self.lock().created.clone()
    }

    /// Number of `create_session` calls, including failed ones
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    /// Number of `retrieve_session` calls, including failed ones
    #[must_use]
    pub fn retrieve_calls(&self) -> usize {
        self.lock().retrieve_calls
    }
}

impl PaymentProvider for MockPaymentProvider {
    fn create_session(&self, request: CreateSessionRequest) -> ProviderFuture<'_, CreatedSession> {
        Box::pin(async move {
            let mut state = self.lock();
            state.create_calls += 1;
            if let Some(error) = state.create_failure.clone() {
                return Err(error);
            }

            state.next_id += 1;
            let n = state.next_id;
            let session_id = SessionId::new(format!("cs_test_{n}"));
            let client_secret = format!("{session_id}_secret_{n}");

            let mut session = Session::new(session_id.clone())
                .with_statuses(
                    SessionStatus::Open,
                    PaymentStatus::Unpaid,
                    PaymentIntentStatus::RequiresPaymentMethod,
                )
                .with_customer_email(request.customer_email.clone());
            session.client_secret = Some(client_secret.clone());
            session.metadata.clone_from(&request.metadata);

            state.sessions.insert(session_id.clone(), session);
            state.created.push(request);

            Ok(CreatedSession {
                session_id,
                client_secret,
            })
        })
    }

    fn retrieve_session<'a>(
        &'a self,
        session_id: &'a SessionId,
        options: &'a RetrieveOptions,
    ) -> ProviderFuture<'a, Session> {
        Box::pin(async move {
            let mut state = self.lock();
            state.retrieve_calls += 1;
            if let Some(error) = state.retrieve_failure.clone() {
                return Err(error);
            }

            let mut session =
                state
                    .sessions
                    .get(session_id)
                    .cloned()
                    .ok_or_else(|| ProviderError::Api {
                        status: 404,
                        message: format!("No such checkout.session: '{session_id}'"),
                    })?;
            if !options.expands(RetrieveOptions::PAYMENT_INTENT) {
                session.payment_intent_status = None;
            }
            Ok(session)
        })
    }
}
