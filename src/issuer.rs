//! Credential issuance: renders the QR pass for an attendee and persists
//! it, at most once per attendee.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::Luma;
use qrcode::QrCode;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::models::Credential;
use crate::store;
use crate::utils::error::AppError;

/// Render the QR image for a payload as PNG bytes.
pub fn render_png(payload: &str) -> Result<Vec<u8>, AppError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| AppError::IssuanceFailed(format!("QR encoding failed: {e}")))?;
    let img = code.render::<Luma<u8>>().build();

    let mut bytes = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| AppError::IssuanceFailed(format!("PNG encoding failed: {e}")))?;

    Ok(bytes)
}

pub fn to_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

/// Issue a credential for one attendee.
///
/// Idempotent: an existing credential is returned unchanged, with no
/// re-render. A fresh issuance encodes the decimal id string, persists the
/// row, and returns it; render failure surfaces before anything is written,
/// so a failed issuance leaves no partial row. If a concurrent issuance
/// wins the insert race, the winner's row is adopted.
pub async fn issue(pool: &PgPool, id: i64) -> Result<Credential, AppError> {
    if !store::attendee_exists(pool, id).await? {
        return Err(AppError::NotFound(format!("No attendee with id {id}")));
    }

    if let Some(existing) = store::find_credential(pool, id).await? {
        return Ok(existing);
    }

    let png = render_png(&id.to_string())?;
    let image_uri = to_data_uri(&png);

    if !store::insert_credential(pool, id, &image_uri).await? {
        debug!(attendee_id = id, "Concurrent issuance won; adopting its credential");
    }

    store::find_credential(pool, id).await?.ok_or_else(|| {
        AppError::IssuanceFailed(format!("Credential row missing after insert for attendee {id}"))
    })
}

#[derive(Debug, Serialize)]
pub struct IssueFailure {
    pub attendee_id: i64,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct IssueSummary {
    pub issued: u32,
    pub skipped: u32,
    pub failures: Vec<IssueFailure>,
}

/// Issue credentials for every attendee that does not have one yet.
///
/// One attendee's failure never aborts the batch; it lands in the summary
/// and the loop moves on.
pub async fn issue_all(pool: &PgPool) -> Result<IssueSummary, AppError> {
    let ids = store::all_attendee_ids(pool).await?;
    let mut summary = IssueSummary::default();

    for id in ids {
        match store::find_credential(pool, id).await {
            Ok(Some(_)) => {
                summary.skipped += 1;
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(attendee_id = id, error = %e, "Skipping attendee in batch issuance");
                summary.failures.push(IssueFailure {
                    attendee_id: id,
                    reason: e.to_string(),
                });
                continue;
            }
        }

        match issue(pool, id).await {
            Ok(_) => summary.issued += 1,
            Err(e) => {
                warn!(attendee_id = id, error = %e, "Issuance failed in batch");
                summary.failures.push(IssueFailure {
                    attendee_id: id,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn rendered_artifact_is_png() {
        let png = render_png("42").unwrap();
        assert!(png.len() > PNG_MAGIC.len());
        assert_eq!(&png[..8], &PNG_MAGIC);
    }

    #[test]
    fn rendering_is_deterministic_per_payload() {
        assert_eq!(render_png("7").unwrap(), render_png("7").unwrap());
    }

    #[test]
    fn data_uri_carries_png_media_type() {
        let png = render_png("1").unwrap();
        let uri = to_data_uri(&png);
        assert!(uri.starts_with("data:image/png;base64,"));
        assert!(uri.len() > "data:image/png;base64,".len());
    }
}
