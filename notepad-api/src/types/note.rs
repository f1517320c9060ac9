//! Note-related API types

use notepad_core::{Note, NoteId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::redact;

/// Request to create a new note.
#[derive(Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    /// Note text
    pub content: String,
    /// Optional password protecting the note
    #[serde(default)]
    pub password: Option<String>,
    /// Optional caller-chosen short code
    #[serde(default)]
    pub custom_code: Option<String>,
}

impl fmt::Debug for CreateNoteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateNoteRequest")
            .field("content_len", &self.content.len())
            .field("password", &redact(&self.password))
            .field("custom_code", &self.custom_code)
            .finish()
    }
}

/// Response after creating a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteResponse {
    /// Assigned short code
    pub short_code: String,
    /// Shareable URL
    pub url: String,
    /// Capability proving the caller created this note
    pub owner_token: String,
}

/// Request to update an existing note.
///
/// Only supplied fields change. On a protected note `password` must be the
/// current password. On an unprotected note `password` sets protection.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    /// New content (if changing)
    #[serde(default)]
    pub content: Option<String>,
    /// Current password, or the initial password for an unprotected note
    #[serde(default)]
    pub password: Option<String>,
    /// Replacement password (protected notes only)
    #[serde(default)]
    pub new_password: Option<String>,
    /// Drop password protection
    #[serde(default)]
    pub remove_password: Option<bool>,
    /// New short code (if changing)
    #[serde(default)]
    pub new_short_code: Option<String>,
}

impl fmt::Debug for UpdateNoteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateNoteRequest")
            .field("content_len", &self.content.as_ref().map(String::len))
            .field("password", &redact(&self.password))
            .field("new_password", &redact(&self.new_password))
            .field("remove_password", &self.remove_password)
            .field("new_short_code", &self.new_short_code)
            .finish()
    }
}

/// Note response.
///
/// For a protected note fetched without proof, `content` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NoteResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: NoteId,
    pub short_code: String,
    pub content: String,
    pub has_password: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: Timestamp,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: Timestamp,
}

impl NoteResponse {
    /// Full view, content included.
    pub fn revealed(note: Note) -> Self {
        Self {
            id: note.id,
            has_password: note.is_protected(),
            short_code: note.short_code.into_inner(),
            content: note.content,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }

    /// Public view: content withheld when the note is protected.
    pub fn public(note: Note) -> Self {
        let protected = note.is_protected();
        let mut response = Self::revealed(note);
        if protected {
            response.content.clear();
        }
        response
    }
}

/// Result of an ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipResponse {
    pub is_owner: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use notepad_core::{new_note_id, ShortCode};

    fn note(hash: Option<&str>) -> Note {
        let now = Utc::now();
        Note {
            id: new_note_id(),
            short_code: ShortCode::from_stored("abc12345".to_string()),
            content: "hello".to_string(),
            password_hash: hash.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_public_view_withholds_protected_content() {
        let response = NoteResponse::public(note(Some("$argon2id$x")));
        assert!(response.has_password);
        assert_eq!(response.content, "");

        let response = NoteResponse::public(note(None));
        assert!(!response.has_password);
        assert_eq!(response.content, "hello");
    }

    #[test]
    fn test_note_response_field_names() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(NoteResponse::revealed(note(None)))?;
        for key in ["id", "short_code", "content", "has_password", "created_at", "updated_at"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        Ok(())
    }

    #[test]
    fn test_request_debug_redacts_passwords() {
        let req = UpdateNoteRequest {
            password: Some("old-secret".to_string()),
            new_password: Some("new-secret".to_string()),
            ..UpdateNoteRequest::default()
        };
        let debug = format!("{:?}", req);
        assert!(!debug.contains("old-secret"));
        assert!(!debug.contains("new-secret"));
    }

    #[test]
    fn test_create_request_accepts_camel_case() -> Result<(), serde_json::Error> {
        let req: CreateNoteRequest = serde_json::from_str(
            r#"{"content":"hi","password":"pw","customCode":"my-code"}"#,
        )?;
        assert_eq!(req.custom_code.as_deref(), Some("my-code"));
        assert_eq!(req.password.as_deref(), Some("pw"));
        Ok(())
    }
}
