//! Per-kind behavior the list controller needs from a record type.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use shared::domain::{CatalogItem, EntityId, UserAccount};

use crate::{attachment::Attachment, error::ValidationError};

pub trait ListRecord: Clone + Debug + DeserializeOwned + Send + Sync + 'static {
    /// Collection path segment under `/api/`.
    const COLLECTION: &'static str;
    /// Human label used in logs and notices.
    const KIND: &'static str;

    fn id(&self) -> EntityId;
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationIntent {
    Create,
    Update,
}

pub trait EditableRecord: ListRecord {
    type Draft: Clone + Debug + Default + Send + Sync + 'static;

    /// Multipart field carrying the attachment, for kinds that have one.
    const FILE_FIELD: Option<&'static str>;

    fn to_draft(&self) -> Self::Draft;

    fn validate(
        draft: &Self::Draft,
        intent: MutationIntent,
        file: Option<&Attachment>,
    ) -> Result<(), ValidationError>;

    fn fields(
        draft: &Self::Draft,
        id: Option<EntityId>,
        intent: MutationIntent,
    ) -> Vec<(&'static str, String)>;
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogDraft {
    pub name: String,
    pub image_ref: Option<String>,
}

impl ListRecord for CatalogItem {
    const COLLECTION: &'static str = "pokemon";
    const KIND: &'static str = "catalog item";

    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl EditableRecord for CatalogItem {
    type Draft = CatalogDraft;

    const FILE_FIELD: Option<&'static str> = Some("imagen");

    fn to_draft(&self) -> CatalogDraft {
        CatalogDraft {
            name: self.name.clone(),
            image_ref: self.image_ref.clone(),
        }
    }

    fn validate(
        draft: &CatalogDraft,
        intent: MutationIntent,
        file: Option<&Attachment>,
    ) -> Result<(), ValidationError> {
        require(&draft.name, "name")?;
        if intent == MutationIntent::Create && file.map_or(true, Attachment::is_empty) {
            return Err(ValidationError::MissingAttachment);
        }
        Ok(())
    }

    fn fields(
        draft: &CatalogDraft,
        id: Option<EntityId>,
        _intent: MutationIntent,
    ) -> Vec<(&'static str, String)> {
        let mut fields = Vec::with_capacity(2);
        if let Some(id) = id {
            fields.push(("id", id.to_string()));
        }
        fields.push(("name", draft.name.trim().to_string()));
        fields
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl ListRecord for UserAccount {
    const COLLECTION: &'static str = "users";
    const KIND: &'static str = "user";

    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl EditableRecord for UserAccount {
    type Draft = UserDraft;

    const FILE_FIELD: Option<&'static str> = None;

    fn to_draft(&self) -> UserDraft {
        UserDraft {
            name: self.name.clone(),
            email: self.email.clone(),
            password: String::new(),
        }
    }

    fn validate(
        draft: &UserDraft,
        intent: MutationIntent,
        _file: Option<&Attachment>,
    ) -> Result<(), ValidationError> {
        require(&draft.name, "name")?;
        require(&draft.email, "email")?;
        if intent == MutationIntent::Create {
            require(&draft.password, "password")?;
        }
        Ok(())
    }

    fn fields(
        draft: &UserDraft,
        _id: Option<EntityId>,
        _intent: MutationIntent,
    ) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", draft.name.trim().to_string()),
            ("email", draft.email.trim().to_string()),
        ];
        // An empty password on update keeps the current one.
        if !draft.password.is_empty() {
            fields.push(("password", draft.password.clone()));
        }
        fields
    }
}
