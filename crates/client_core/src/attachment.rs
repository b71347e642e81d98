//! Attachment staging and transport payload encoding for create/update calls.

use std::path::Path;

use crate::error::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let mime_type = mime_guess::from_path(&filename)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Self {
            filename,
            mime_type,
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        Ok(Self::new(filename, bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_or_default(&self) -> &str {
        self.mime_type
            .as_deref()
            .unwrap_or("application/octet-stream")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Multipart,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub attachment: Attachment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportPayload {
    pub encoding: Encoding,
    pub fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
}

impl TransportPayload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn to_form(&self) -> Result<reqwest::multipart::Form, GatewayError> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        if let Some(file) = &self.file {
            let part = reqwest::multipart::Part::bytes(file.attachment.bytes.clone())
                .file_name(file.attachment.filename.clone())
                .mime_str(file.attachment.mime_or_default())
                .map_err(|err| GatewayError::Encode(err.to_string()))?;
            form = form.part(file.field.clone(), part);
        }
        Ok(form)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), serde_json::Value::String(value.clone())))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

pub trait AttachmentEncoder: Send + Sync {
    /// `file_field` is the kind's attachment field, if it has one; `file` is
    /// only present when a new file was chosen.
    fn encode(
        &self,
        fields: Vec<(&'static str, String)>,
        file_field: Option<&'static str>,
        file: Option<Attachment>,
    ) -> TransportPayload;
}

/// Multipart whenever the kind can carry an attachment, JSON otherwise.
pub struct FormEncoder;

impl AttachmentEncoder for FormEncoder {
    fn encode(
        &self,
        fields: Vec<(&'static str, String)>,
        file_field: Option<&'static str>,
        file: Option<Attachment>,
    ) -> TransportPayload {
        let fields = fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        match file_field {
            Some(field) => TransportPayload {
                encoding: Encoding::Multipart,
                fields,
                file: file
                    .filter(|attachment| !attachment.is_empty())
                    .map(|attachment| FilePart {
                        field: field.to_string(),
                        attachment,
                    }),
            },
            None => TransportPayload {
                encoding: Encoding::Json,
                fields,
                file: None,
            },
        }
    }
}

#[cfg(test)]
#[path = "tests/attachment_tests.rs"]
mod tests;
