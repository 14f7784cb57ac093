use crate::document::validate::ValidationError;
use crate::document::{Collection, DocumentId};
use crate::media::MediaError;
use crate::storage::StorageError;
use crate::store::StoreError;

/// Failure of a call to the document database or object storage.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The submission failed form validation; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An uploaded file was rejected before anything was written.
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("{} {id} not found", .collection.label())]
    NotFound {
        collection: Collection,
        id: DocumentId,
    },

    #[error("failed to {action} {subject}: {source}")]
    Remote {
        action: &'static str,
        subject: &'static str,
        #[source]
        source: RemoteError,
    },
}

impl ServiceError {
    pub(crate) fn not_found(collection: Collection, id: &DocumentId) -> Self {
        ServiceError::NotFound {
            collection,
            id: id.clone(),
        }
    }

    /// Message safe to show the person who submitted the form.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Validation(e) => e.to_string(),
            ServiceError::Media(e) => e.to_string(),
            ServiceError::NotFound { collection, .. } => {
                let label = collection.label();
                let mut chars = label.chars();
                match chars.next() {
                    Some(first) => format!("{}{} not found.", first.to_uppercase(), chars.as_str()),
                    None => "Not found.".to_string(),
                }
            }
            ServiceError::Remote {
                action, subject, ..
            } => format!("Failed to {action} {subject}. Please try again."),
        }
    }
}

/// Wrap a remote failure, logging it with its context.
pub(crate) fn remote_error(
    action: &'static str,
    subject: &'static str,
    err: impl Into<RemoteError>,
) -> ServiceError {
    let source = err.into();
    tracing::error!(action, subject, error = %source, "remote operation failed");
    ServiceError::Remote {
        action,
        subject,
        source,
    }
}

pub(crate) trait RemoteResultExt<T> {
    fn or_remote(self, action: &'static str, subject: &'static str) -> Result<T, ServiceError>;
}

impl<T, E: Into<RemoteError>> RemoteResultExt<T> for Result<T, E> {
    fn or_remote(self, action: &'static str, subject: &'static str) -> Result<T, ServiceError> {
        self.map_err(|e| remote_error(action, subject, e))
    }
}
