use shared::domain::EntityId;

use crate::{attachment::Attachment, record::EditableRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferPurpose {
    Create,
    Edit,
    View,
}

#[derive(Debug, Clone)]
pub struct EditBuffer<R: EditableRecord> {
    /// `None` for a create buffer.
    pub id: Option<EntityId>,
    pub draft: R::Draft,
    pub new_file: Option<Attachment>,
    pub purpose: BufferPurpose,
}

impl<R: EditableRecord> EditBuffer<R> {
    pub fn for_create() -> Self {
        Self {
            id: None,
            draft: R::Draft::default(),
            new_file: None,
            purpose: BufferPurpose::Create,
        }
    }

    pub fn for_record(record: &R, purpose: BufferPurpose) -> Self {
        Self {
            id: Some(record.id()),
            draft: record.to_draft(),
            new_file: None,
            purpose,
        }
    }
}
