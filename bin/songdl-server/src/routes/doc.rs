use crate::routes::{download, files, health};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "songdl-server",
    description = "Download a song by URL and fetch the resulting audio file",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(download::DownloadApi::openapi());
    root.merge(files::FilesApi::openapi());
    root
}
