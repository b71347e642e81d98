//! Entity list controller: one paginated, filtered, sorted view kept in step
//! with a remote collection across create/update/delete.

use std::{
    collections::HashSet,
    future::Future,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use shared::{
    domain::{EntityId, SessionUser},
    protocol::MutationResponse,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

pub mod buffer;
pub mod events;

pub use buffer::{BufferPurpose, EditBuffer};
pub use events::{
    AlwaysConfirm, ConfirmRequest, ConfirmationPrompt, ListEvent, Notice, NoticeLevel, Notifier,
    TracingNotifier,
};

use crate::{
    attachment::{Attachment, AttachmentEncoder, FormEncoder},
    error::{GatewayError, ListError, ValidationError},
    gateway::RemoteEntityGateway,
    record::{EditableRecord, MutationIntent},
    session::SessionContext,
    view::{
        derive, total_pages, Derived, PageSummary, SortField, SortMode, SortOrder, ViewState,
        DEFAULT_PAGE_SIZE,
    },
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcilePolicy {
    /// Replace the collection from the list endpoint after every mutation.
    #[default]
    Refetch,
    /// Apply the record returned by the mutation by id; falls back to a
    /// refetch when the backend only acknowledges.
    MergeById,
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub page_size: usize,
    pub request_timeout: Duration,
    pub reconcile: ReconcilePolicy,
    pub sort_mode: SortMode,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconcile: ReconcilePolicy::default(),
            sort_mode: SortMode::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

/// Render-ready copy of the current view.
#[derive(Debug, Clone)]
pub struct ListView<R> {
    pub page_window: Vec<R>,
    pub filtered_len: usize,
    pub total_len: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub search_term: String,
    pub sort: SortOrder,
    pub summary: PageSummary,
    pub loading: bool,
}

struct ListState<R: EditableRecord> {
    full: Arc<Vec<R>>,
    view: ViewState,
    derived: Derived<R>,
    buffer: Option<EditBuffer<R>>,
    loading: bool,
    issued_fetches: u64,
    applied_fetch: u64,
}

impl<R: EditableRecord> ListState<R> {
    fn recompute(&mut self, mode: SortMode) {
        self.derived = derive(&self.full, &mut self.view, mode);
    }

    fn total_pages(&self) -> usize {
        total_pages(self.derived.filtered.len(), self.view.page_size)
    }
}

/// Releases the id from the in-flight set when the mutation finishes.
struct InflightGuard<'a> {
    set: &'a StdMutex<HashSet<EntityId>>,
    id: EntityId,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        set.remove(&self.id);
    }
}

pub struct EntityListController<R: EditableRecord, G: RemoteEntityGateway<R>> {
    gateway: G,
    session: SessionContext,
    prompt: Arc<dyn ConfirmationPrompt>,
    notifier: Arc<dyn Notifier>,
    encoder: Arc<dyn AttachmentEncoder>,
    config: ControllerConfig,
    inner: Mutex<ListState<R>>,
    inflight: StdMutex<HashSet<EntityId>>,
    events: broadcast::Sender<ListEvent>,
}

impl<R: EditableRecord, G: RemoteEntityGateway<R>> EntityListController<R, G> {
    pub fn new(
        gateway: G,
        session: SessionContext,
        prompt: Arc<dyn ConfirmationPrompt>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_config(gateway, session, prompt, notifier, ControllerConfig::default())
    }

    pub fn with_config(
        gateway: G,
        session: SessionContext,
        prompt: Arc<dyn ConfirmationPrompt>,
        notifier: Arc<dyn Notifier>,
        config: ControllerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            gateway,
            session,
            prompt,
            notifier,
            encoder: Arc::new(FormEncoder),
            inner: Mutex::new(ListState {
                full: Arc::new(Vec::new()),
                view: ViewState::new(config.page_size),
                derived: Derived::default(),
                buffer: None,
                loading: false,
                issued_fetches: 0,
                applied_fetch: 0,
            }),
            config,
            inflight: StdMutex::new(HashSet::new()),
            events,
        }
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn AttachmentEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub async fn viewer(&self) -> Option<SessionUser> {
        self.session.current_user().await
    }

    pub async fn snapshot(&self) -> Arc<Vec<R>> {
        Arc::clone(&self.inner.lock().await.full)
    }

    pub async fn view(&self) -> ListView<R> {
        let guard = self.inner.lock().await;
        let filtered_len = guard.derived.filtered.len();
        ListView {
            page_window: guard.derived.page_window.clone(),
            filtered_len,
            total_len: guard.full.len(),
            current_page: guard.view.current_page,
            total_pages: guard.total_pages(),
            search_term: guard.view.search_term.clone(),
            sort: guard.view.sort,
            summary: PageSummary::new(guard.view.current_page, guard.view.page_size, filtered_len),
            loading: guard.loading,
        }
    }

    pub async fn filtered(&self) -> Vec<R> {
        self.inner.lock().await.derived.filtered.clone()
    }

    pub async fn buffer(&self) -> Option<EditBuffer<R>> {
        self.inner.lock().await.buffer.clone()
    }

    // ---- fetch ----

    pub async fn load(&self) -> Result<(), ListError> {
        self.refresh().await
    }

    pub async fn refresh(&self) -> Result<(), ListError> {
        let ticket = {
            let mut guard = self.inner.lock().await;
            guard.issued_fetches += 1;
            guard.loading = true;
            guard.issued_fetches
        };

        let result = self.bounded("list", self.gateway.list()).await;

        let mut guard = self.inner.lock().await;
        if ticket == guard.issued_fetches {
            guard.loading = false;
        }
        match result {
            Ok(records) => {
                if ticket < guard.applied_fetch {
                    debug!(kind = R::KIND, ticket, "discarding stale list response");
                    return Ok(());
                }
                guard.applied_fetch = ticket;
                guard.full = Arc::new(records);
                guard.recompute(self.config.sort_mode);
                let total = guard.full.len();
                drop(guard);
                info!(kind = R::KIND, total, "collection refreshed");
                let _ = self.events.send(ListEvent::Refreshed { total });
                Ok(())
            }
            Err(err) => {
                drop(guard);
                error!(kind = R::KIND, error = %err, "failed to fetch collection");
                self.notifier.notify(Notice::new(
                    NoticeLevel::Error,
                    "Error",
                    format!("Could not load the {} list: {err}", R::KIND),
                ));
                Err(err.into())
            }
        }
    }

    // ---- view state ----

    pub async fn set_search_term(&self, term: impl Into<String>) {
        let mut guard = self.inner.lock().await;
        guard.view.search_term = term.into();
        guard.view.current_page = 1;
        guard.recompute(self.config.sort_mode);
    }

    pub async fn change_sort_field(&self, field: SortField) {
        let mut guard = self.inner.lock().await;
        guard.view.sort.select(field);
        guard.recompute(self.config.sort_mode);
    }

    pub async fn toggle_sort_direction(&self) {
        let mut guard = self.inner.lock().await;
        guard.view.sort.toggle();
        guard.recompute(self.config.sort_mode);
    }

    pub async fn first_page(&self) {
        self.go_to_page(|_, _| 1).await;
    }

    pub async fn last_page(&self) {
        self.go_to_page(|_, last| last).await;
    }

    pub async fn next_page(&self) {
        self.go_to_page(|current, last| if current < last { current + 1 } else { current })
            .await;
    }

    pub async fn previous_page(&self) {
        self.go_to_page(|current, _| current.saturating_sub(1).max(1))
            .await;
    }

    async fn go_to_page(&self, pick: impl FnOnce(usize, usize) -> usize) {
        let mut guard = self.inner.lock().await;
        let last = guard.total_pages();
        let target = pick(guard.view.current_page, last).clamp(1, last);
        if target != guard.view.current_page {
            guard.view.current_page = target;
            guard.recompute(self.config.sort_mode);
        }
    }

    /// Moves to the page whose window shows `id` and returns its row index.
    pub async fn reveal(&self, id: EntityId) -> Option<usize> {
        let mut guard = self.inner.lock().await;
        let original = guard.view.current_page;
        for page in 1..=guard.total_pages() {
            guard.view.current_page = page;
            guard.recompute(self.config.sort_mode);
            if let Some(index) = guard.derived.page_window.iter().position(|r| r.id() == id) {
                return Some(index);
            }
        }
        guard.view.current_page = original;
        guard.recompute(self.config.sort_mode);
        None
    }

    // ---- edit buffer ----

    pub async fn stage_edit(&self, index: usize) -> Result<EditBuffer<R>, ListError> {
        self.stage(index, BufferPurpose::Edit).await
    }

    pub async fn stage_view(&self, index: usize) -> Result<EditBuffer<R>, ListError> {
        self.stage(index, BufferPurpose::View).await
    }

    async fn stage(
        &self,
        index: usize,
        purpose: BufferPurpose,
    ) -> Result<EditBuffer<R>, ListError> {
        let mut guard = self.inner.lock().await;
        let len = guard.derived.page_window.len();
        let Some(record) = guard.derived.page_window.get(index).cloned() else {
            drop(guard);
            error!(kind = R::KIND, index, len, "staging index outside page window");
            let err = ListError::IndexOutOfRange { index, len };
            self.notifier
                .notify(Notice::new(NoticeLevel::Error, "Error", err.to_string()));
            return Err(err);
        };
        let buffer = EditBuffer::for_record(&record, purpose);
        guard.buffer = Some(buffer.clone());
        Ok(buffer)
    }

    pub async fn open_create(&self) {
        self.inner.lock().await.buffer = Some(EditBuffer::for_create());
    }

    pub async fn edit_draft(&self, edit: impl FnOnce(&mut R::Draft)) -> Result<(), ListError> {
        let mut guard = self.inner.lock().await;
        let buffer = guard.buffer.as_mut().ok_or(ListError::NoBuffer)?;
        if buffer.purpose == BufferPurpose::View {
            return Err(ListError::ReadOnlyBuffer);
        }
        edit(&mut buffer.draft);
        Ok(())
    }

    pub async fn attach_file(&self, file: Attachment) -> Result<(), ListError> {
        let mut guard = self.inner.lock().await;
        let buffer = guard.buffer.as_mut().ok_or(ListError::NoBuffer)?;
        if buffer.purpose == BufferPurpose::View {
            return Err(ListError::ReadOnlyBuffer);
        }
        buffer.new_file = Some(file);
        Ok(())
    }

    pub async fn cancel_edit(&self) {
        self.inner.lock().await.buffer = None;
    }

    // ---- mutations ----

    /// Submits the staged buffer as a create or an update.
    pub async fn save(&self) -> Result<(), ListError> {
        let buffer = self.buffer().await.ok_or(ListError::NoBuffer)?;
        match buffer.purpose {
            BufferPurpose::Create => self.create(buffer.draft, buffer.new_file).await,
            BufferPurpose::Edit => self.update(buffer).await,
            BufferPurpose::View => Err(ListError::ReadOnlyBuffer),
        }
    }

    pub async fn create(&self, draft: R::Draft, file: Option<Attachment>) -> Result<(), ListError> {
        if let Err(err) = R::validate(&draft, MutationIntent::Create, file.as_ref()) {
            return Err(self.reject_invalid(err));
        }

        let payload = self.encoder.encode(
            R::fields(&draft, None, MutationIntent::Create),
            R::FILE_FIELD,
            file,
        );
        let actor = self.actor().await;
        match self.bounded("create", self.gateway.create(payload)).await {
            Ok(response) => {
                info!(kind = R::KIND, actor = ?actor, "record created");
                self.clear_buffer(None).await;
                self.reconcile(response, |full, record| full.push(record))
                    .await;
                self.succeeded(None, "Created", format!("The {} was created.", R::KIND));
                Ok(())
            }
            Err(err) => Err(self.failed(None, "create", err)),
        }
    }

    pub async fn update(&self, buffer: EditBuffer<R>) -> Result<(), ListError> {
        let id = buffer.id.ok_or(ListError::NoBuffer)?;
        let present = self
            .inner
            .lock()
            .await
            .derived
            .filtered
            .iter()
            .any(|record| record.id() == id);
        if !present {
            warn!(kind = R::KIND, %id, "update target missing from current view");
            return Err(ListError::NotFoundLocally { kind: R::KIND, id });
        }
        if let Err(err) = R::validate(&buffer.draft, MutationIntent::Update, buffer.new_file.as_ref())
        {
            return Err(self.reject_invalid(err));
        }
        let _guard = self.claim(id)?;

        let payload = self.encoder.encode(
            R::fields(&buffer.draft, Some(id), MutationIntent::Update),
            R::FILE_FIELD,
            buffer.new_file,
        );
        let actor = self.actor().await;
        match self
            .bounded("update", self.gateway.submit_update(id, payload))
            .await
        {
            Ok(response) => {
                info!(kind = R::KIND, %id, actor = ?actor, "record updated");
                self.clear_buffer(Some(id)).await;
                self.reconcile(response, |full, record| {
                    if let Some(slot) = full.iter_mut().find(|r| r.id() == record.id()) {
                        *slot = record;
                    }
                })
                .await;
                self.succeeded(Some(id), "Updated", format!("The {} was updated.", R::KIND));
                Ok(())
            }
            Err(err) => Err(self.failed(Some(id), "update", err)),
        }
    }

    pub async fn delete(&self, id: EntityId) -> Result<DeleteOutcome, ListError> {
        let request = ConfirmRequest {
            title: "Are you sure?".to_string(),
            text: format!("{} {id} will be deleted. This cannot be undone.", R::KIND),
            confirm_label: "Yes, delete it!".to_string(),
        };
        if !self.prompt.confirm(&request).await {
            debug!(kind = R::KIND, %id, "delete declined");
            return Ok(DeleteOutcome::Declined);
        }
        let _guard = self.claim(id)?;

        let actor = self.actor().await;
        match self.bounded("delete", self.gateway.delete(id)).await {
            Ok(()) => {
                info!(kind = R::KIND, %id, actor = ?actor, "record deleted");
                self.clear_buffer(Some(id)).await;
                match self.config.reconcile {
                    ReconcilePolicy::Refetch => {
                        let _ = self.refresh().await;
                    }
                    ReconcilePolicy::MergeById => {
                        self.replace_full(|full| full.retain(|r| r.id() != id)).await;
                    }
                }
                self.succeeded(Some(id), "Deleted!", format!("The {} has been deleted.", R::KIND));
                Ok(DeleteOutcome::Deleted)
            }
            Err(err) => Err(self.failed(Some(id), "delete", err)),
        }
    }

    // ---- helpers ----

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        let after = self.config.request_timeout;
        match tokio::time::timeout(after, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout { operation, after }),
        }
    }

    fn claim(&self, id: EntityId) -> Result<InflightGuard<'_>, ListError> {
        let mut set = self
            .inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !set.insert(id) {
            warn!(kind = R::KIND, %id, "mutation rejected, another is in flight");
            return Err(ListError::MutationInFlight { kind: R::KIND, id });
        }
        Ok(InflightGuard {
            set: &self.inflight,
            id,
        })
    }

    async fn actor(&self) -> Option<EntityId> {
        self.session.current_user().await.map(|user| user.id)
    }

    async fn reconcile(&self, response: MutationResponse<R>, merge: impl FnOnce(&mut Vec<R>, R)) {
        match (self.config.reconcile, response.into_record()) {
            (ReconcilePolicy::MergeById, Some(record)) => {
                self.replace_full(|full| merge(full, record)).await;
            }
            _ => {
                let _ = self.refresh().await;
            }
        }
    }

    /// Copy-on-write: readers holding the previous snapshot are unaffected.
    async fn replace_full(&self, edit: impl FnOnce(&mut Vec<R>)) {
        let mut guard = self.inner.lock().await;
        let mut next = guard.full.as_ref().clone();
        edit(&mut next);
        guard.full = Arc::new(next);
        // The merge takes a ticket of its own, so list requests issued before
        // it describe an older backend state and are discarded on arrival.
        guard.issued_fetches += 1;
        guard.applied_fetch = guard.issued_fetches;
        guard.loading = false;
        guard.recompute(self.config.sort_mode);
        let total = guard.full.len();
        drop(guard);
        let _ = self.events.send(ListEvent::Refreshed { total });
    }

    async fn clear_buffer(&self, id: Option<EntityId>) {
        let mut guard = self.inner.lock().await;
        let staged_id = guard.buffer.as_ref().map(|buffer| buffer.id);
        if staged_id == Some(id) {
            guard.buffer = None;
        }
    }

    fn reject_invalid(&self, err: ValidationError) -> ListError {
        warn!(kind = R::KIND, error = %err, "mutation rejected by validation");
        self.notifier.notify(Notice::new(
            NoticeLevel::Warning,
            "Warning",
            format!("Please complete all fields: {err}"),
        ));
        err.into()
    }

    fn succeeded(&self, id: Option<EntityId>, title: &str, text: String) {
        self.notifier
            .notify(Notice::new(NoticeLevel::Success, title, text));
        let _ = self.events.send(ListEvent::MutationApplied { kind: R::KIND, id });
    }

    fn failed(
        &self,
        id: Option<EntityId>,
        operation: &'static str,
        err: GatewayError,
    ) -> ListError {
        error!(
            kind = R::KIND,
            id = ?id,
            operation,
            error = %err,
            retryable = err.is_retryable(),
            "mutation failed"
        );
        self.notifier.notify(Notice::new(
            NoticeLevel::Error,
            "Error",
            format!("Could not {operation} the {}: {err}", R::KIND),
        ));
        let _ = self.events.send(ListEvent::MutationFailed {
            kind: R::KIND,
            id,
            message: err.to_string(),
        });
        err.into()
    }
}

#[cfg(test)]
#[path = "../tests/controller_tests.rs"]
mod tests;
