//! OpenAPI documentation for the files API, served at `/api-docs/openapi.json` and viewable at
//! `/docs`.

use utoipa::OpenApi;

use crate::{api, errors};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "pinvault",
        description = "Upload files to IPFS through a pinning service and list what is pinned."
    ),
    paths(
        api::handlers::files::list_files,
        api::handlers::files::upload_file,
    ),
    components(
        schemas(
            api::models::files::PinnedFile,
            api::models::files::UploadResponse,
            errors::ErrorBody,
        )
    ),
    tags(
        (name = "files", description = "Pinned file listing and upload"),
    )
)]
pub struct ApiDoc;
