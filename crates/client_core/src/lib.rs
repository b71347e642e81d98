//! Client-side core for the admin front-end: a remote gateway per entity
//! collection, the session boundary, and the list controller that keeps a
//! filtered, sorted, paginated view in step with the backend.

pub mod attachment;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod record;
pub mod session;
pub mod view;

pub use attachment::{
    Attachment, AttachmentEncoder, Encoding, FilePart, FormEncoder, TransportPayload,
};
pub use controller::{
    AlwaysConfirm, BufferPurpose, ConfirmRequest, ConfirmationPrompt, ControllerConfig,
    DeleteOutcome, EditBuffer, EntityListController, ListEvent, ListView, Notice, NoticeLevel,
    Notifier, ReconcilePolicy, TracingNotifier,
};
pub use error::{AuthError, GatewayError, ListError, ValidationError};
pub use gateway::{HttpEntityGateway, RemoteEntityGateway, UpdateVerb};
pub use record::{CatalogDraft, EditableRecord, ListRecord, MutationIntent, UserDraft};
pub use session::{AuthClient, Session, SessionContext};
pub use view::{PageSummary, SortDirection, SortField, SortMode, SortOrder, ViewState};
