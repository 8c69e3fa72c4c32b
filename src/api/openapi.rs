//! OpenAPI documentation and schema generation

use utoipa::OpenApi;

/// OpenAPI documentation for the media-cache-broker REST API
///
/// Served at `/openapi.json`, and through `/swagger-ui` when enabled.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-cache-broker REST API",
        version = "0.1.0",
        description = "Fetch-then-cache media artifacts: download tasks, artifact serving, metadata lookups and cache maintenance",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::start_download,
        crate::api::routes::get_status,
        crate::api::routes::cancel_download,

        // Files
        crate::api::routes::serve_audio,
        crate::api::routes::serve_subtitle,

        // Catalog
        crate::api::routes::get_info,
        crate::api::routes::video_info,
        crate::api::routes::channel_info,
        crate::api::routes::channel_videos,
        crate::api::routes::search_channels,
        crate::api::routes::cookies_status,

        // System
        crate::api::routes::index,
        crate::api::routes::health_check,
        crate::api::routes::debug_files,
        crate::api::routes::fix_files,
        crate::api::routes::cookies_diagnose,
        crate::api::routes::test_connection,
        crate::api::routes::admin_cleanup,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::TaskId,
        crate::types::TaskStatus,
        crate::types::TaskSnapshot,
        crate::types::VideoInfo,
        crate::types::ChannelInfo,
        crate::types::VideoSummary,
        crate::types::ChannelSearchResult,
        crate::types::TaskCounts,
        crate::types::FileCounts,
        crate::types::Directories,
        crate::types::HealthReport,
        crate::types::CleanupReport,
        crate::types::DebugFileEntry,
        crate::types::DebugTaskSummary,
        crate::types::DebugFilesReport,
        crate::types::FixAction,
        crate::types::FixFilesReport,
        crate::types::CookiesStatus,
        crate::types::CookiesDiagnosis,
        crate::types::ConnectionCheck,
        crate::types::ConnectionChecks,
        crate::types::ConnectionTest,

        crate::api::routes::IdQuery,
        crate::api::routes::ChannelVideosQuery,
        crate::api::routes::SearchQuery,

        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Download tasks - start, poll and cancel"),
        (name = "files", description = "Artifact serving - audio and subtitles"),
        (name = "catalog", description = "Metadata lookups - videos, channels and search"),
        (name = "system", description = "System endpoints - health, diagnostics, cleanup, OpenAPI"),
    )
)]
pub struct ApiDoc;
