use crate::api::models::files::{PinnedFile, UploadResponse};
use crate::errors::{Error, Result};
use crate::pinning::{FileUpload, PinReceipt, PinningService};
use crate::AppState;
use axum::{
    extract::{multipart::Field, multipart::MultipartRejection, Multipart, State},
    Json,
};
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Content type forwarded when the client did not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// File name forwarded when the client did not supply one
pub const DEFAULT_FILE_NAME: &str = "uploaded-file";

#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    summary = "List pinned files",
    description = "Returns every currently pinned file, in the order the pinning service reports them, with a public gateway URL for each.",
    responses(
        (status = 200, description = "Pinned files", body = Vec<PinnedFile>),
        (status = 500, description = "Configuration or pinning service error", body = crate::errors::ErrorBody)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<PinnedFile>>> {
    let gateway = state.gateway()?;
    state
        .pinning
        .ensure_configured()
        .map_err(|e| Error::pinning("list pins", e))?;

    let records = state
        .pinning
        .list_pinned()
        .await
        .map_err(|e| Error::pinning("list pins", e))?;

    let files: Vec<PinnedFile> = records
        .into_iter()
        .map(|record| PinnedFile::from_record(record, gateway))
        .collect();

    tracing::debug!("Listed {} pinned files", files.len());
    Ok(Json(files))
}

#[utoipa::path(
    post,
    path = "/api/files",
    tag = "files",
    summary = "Upload file",
    description = "Pin a file on IPFS. The file is streamed to the pinning service without a size ceiling. \
                   An optional `name` text field, sent before `file`, is stored as the display name.",
    request_body(
        content_type = "multipart/form-data",
        description = "Multipart form with the file under the `file` field"
    ),
    responses(
        (status = 200, description = "File pinned", body = UploadResponse),
        (status = 400, description = "No file uploaded or malformed form", body = crate::errors::ErrorBody),
        (status = 500, description = "Configuration or pinning service error", body = crate::errors::ErrorBody)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    // Configuration is checked before a single byte of the body is read
    let gateway = state.gateway()?.clone();
    state
        .pinning
        .ensure_configured()
        .map_err(|e| Error::pinning("pin file", e))?;

    let mut multipart = multipart.map_err(|e| Error::BadRequest {
        message: format!("Expected a multipart form: {}", e.body_text()),
    })?;

    let mut display_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to parse multipart data: {}", e),
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "name" => {
                let value = field.text().await.map_err(|e| Error::BadRequest {
                    message: format!("Failed to read name: {}", e),
                })?;
                display_name = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            }
            "file" => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or(DEFAULT_FILE_NAME)
                    .to_string();
                let content_type = field.content_type().unwrap_or(DEFAULT_CONTENT_TYPE).to_string();

                tracing::info!(
                    file_name = %file_name,
                    content_type = %content_type,
                    "Forwarding upload to pinning service"
                );

                let receipt = forward_file(
                    state.pinning.as_ref(),
                    field,
                    FileMeta {
                        file_name,
                        content_type,
                        display_name: display_name.take(),
                    },
                    state.config.pinata.upload_buffer_chunks,
                )
                .await?;

                if receipt.is_duplicate {
                    tracing::info!(cid = %receipt.cid, "Pinning service already held this content");
                }

                return Ok(Json(UploadResponse::new(receipt.cid, &gateway)));
            }
            _ => {
                // Ignore unknown fields (forward compatibility)
            }
        }
    }

    Err(Error::BadRequest {
        message: "No file uploaded".to_string(),
    })
}

/// Fallback for methods other than GET and POST on `/api/files`
pub async fn method_not_allowed() -> Error {
    Error::MethodNotAllowed
}

struct FileMeta {
    file_name: String,
    content_type: String,
    display_name: Option<String>,
}

/// Stream a multipart field to the pinning service.
///
/// The inbound reader and the outbound request run concurrently on this task, joined by a
/// bounded channel, so memory use stays at `buffer` chunks regardless of file size.
async fn forward_file(pinning: &dyn PinningService, mut field: Field<'_>, meta: FileMeta, buffer: usize) -> Result<PinReceipt> {
    let (tx, rx) = mpsc::channel::<std::io::Result<Bytes>>(buffer);

    let upload = FileUpload {
        file_name: meta.file_name,
        content_type: meta.content_type,
        display_name: meta.display_name,
        body: Box::pin(ReceiverStream::new(rx)),
    };

    let pump = async move {
        let mut total_size = 0u64;
        let mut chunk_number = 0u64;
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    chunk_number += 1;
                    total_size += chunk.len() as u64;
                    if tx.send(Ok(chunk)).await.is_err() {
                        // The outbound request already finished or failed
                        tracing::debug!(chunk_number, "Pinning request stopped consuming the upload");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let message = format!("Failed to read file chunk: {}", e);
                    let _ = tx.send(Err(std::io::Error::other(message.clone()))).await;
                    return Err(Error::BadRequest { message });
                }
            }
        }
        Ok(total_size)
    };

    let (pumped, pinned) = tokio::join!(pump, pinning.pin_file(upload));

    let total_size = pumped?;
    let receipt = pinned.map_err(|e| Error::pinning("pin file", e))?;

    tracing::info!(cid = %receipt.cid, total_bytes = total_size, "File pinned successfully");
    Ok(receipt)
}
