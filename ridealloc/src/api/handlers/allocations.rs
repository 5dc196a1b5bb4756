use crate::{
    AppState,
    api::models::ErrorResponse,
    errors::{Error, Result},
    pipeline, records,
};
use axum::{
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::BytesMut;

/// Multipart field carrying the request CSV.
pub const FILE_FIELD: &str = "file";

fn upload_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { message: e.body_text() }
    } else {
        Error::InvalidUpload { message: e.body_text() }
    }
}

#[utoipa::path(
    post,
    path = "/allocate_rides",
    tag = "allocations",
    summary = "Allocate rides",
    description = "Upload a CSV of ride requests (`company_name,destination,number_of_rides_requested`) as the multipart field `file`.

Requested rides are totalled per destination and sent for approval. Each destination's approved quota is then split between the companies that asked for it, in multiples of 100 rides.

The response is a CSV attachment (`company_name,destination,number_of_rides_approved`). Each destination lists its proportional grants first, then one extra row of 100 rides per leftover top-up, so a company can appear more than once.",
    request_body(
        content_type = "multipart/form-data",
        description = "Ride request CSV in the `file` field"
    ),
    responses(
        (status = 200, description = "Allocation file", content_type = "text/csv", body = String),
        (status = 413, description = "Upload exceeds the configured size limit", body = ErrorResponse),
        (status = 500, description = "The run failed: unreadable upload, malformed CSV, or approval failure", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn allocate_rides(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let mut multipart = multipart.map_err(|rejection| Error::InvalidUpload {
        message: rejection.body_text(),
    })?;
    let max_file_size = state.config.limits.max_file_size;

    let mut upload: Option<BytesMut> = None;
    while let Some(mut field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        tracing::info!(filename = ?field.file_name(), "Receiving ride request upload");

        let mut buffer = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(upload_error)? {
            // Fail as soon as the limit is crossed rather than buffering the rest
            if (buffer.len() + chunk.len()) as u64 > max_file_size {
                tracing::warn!(
                    received = buffer.len() + chunk.len(),
                    max_file_size = max_file_size,
                    "Upload size limit exceeded, aborting"
                );
                return Err(Error::PayloadTooLarge {
                    message: format!("File size exceeds maximum allowed size of {max_file_size} bytes"),
                });
            }
            buffer.extend_from_slice(&chunk);
        }

        tracing::debug!(size = buffer.len(), "Upload received");
        upload = Some(buffer);
        break;
    }

    let upload = upload.ok_or(Error::MissingFile)?;
    let requests = records::read_requests(&upload[..])?;
    let allocations = pipeline::run_allocation(&requests, state.approval.as_ref()).await?;
    let body = records::allocations_to_csv(&allocations)?;

    let disposition = format!("attachment; filename=\"{}\"", state.config.output_filename);
    Ok((
        [(header::CONTENT_TYPE, "text/csv".to_string()), (header::CONTENT_DISPOSITION, disposition)],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use crate::{
        AppState,
        approval::create_provider,
        build_router,
        config::{ApprovalConfig, Config, FixedRatioConfig, HttpApprovalConfig},
    };
    use axum::http::StatusCode;
    use axum_test::{
        TestServer,
        multipart::{MultipartForm, Part},
    };
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const SAMPLE: &str = "company_name,destination,number_of_rides_requested\n\
                          Microsoft,11 times sq,300\n\
                          Uber,11 times sq,200\n\
                          Facebook,770 Broadway,400\n";

    fn server(config: Config) -> TestServer {
        let approval = create_provider(&config.approval).unwrap();
        let state = AppState::builder().config(config).approval(approval).build();
        TestServer::new(build_router(&state)).expect("Failed to create test server")
    }

    fn csv_upload(content: &'static str) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(content.as_bytes()).file_name("requests.csv").mime_type("text/csv"),
        )
    }

    #[test_log::test(tokio::test)]
    async fn test_allocate_rides_returns_csv_attachment() {
        let server = server(Config::default());

        let response = server.post("/allocate_rides").multipart(csv_upload(SAMPLE)).await;

        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "text/csv");
        assert_eq!(
            response.header("content-disposition"),
            "attachment; filename=\"approved_rides.csv\""
        );
        assert_eq!(
            response.text(),
            "company_name,destination,number_of_rides_approved\n\
             Microsoft,11 times sq,200\n\
             Uber,11 times sq,100\n\
             Facebook,770 Broadway,200\n"
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_configured_output_filename() {
        let server = server(Config {
            output_filename: "rides-2024-06.csv".to_string(),
            ..Default::default()
        });

        let response = server.post("/allocate_rides").multipart(csv_upload(SAMPLE)).await;

        response.assert_status_ok();
        assert_eq!(
            response.header("content-disposition"),
            "attachment; filename=\"rides-2024-06.csv\""
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_header_only_upload_returns_header_only_csv() {
        let server = server(Config::default());

        let response = server
            .post("/allocate_rides")
            .multipart(csv_upload("company_name,destination,number_of_rides_requested\n"))
            .await;

        response.assert_status_ok();
        assert_eq!(response.text(), "company_name,destination,number_of_rides_approved\n");
    }

    #[test_log::test(tokio::test)]
    async fn test_malformed_count_is_server_error() {
        let server = server(Config::default());

        let response = server
            .post("/allocate_rides")
            .multipart(csv_upload(
                "company_name,destination,number_of_rides_requested\nLyft,JFK,abc\n",
            ))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert_eq!(
            body["error"],
            "Invalid number_of_rides_requested on row 1: 'abc' is not a non-negative integer"
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_column_is_server_error() {
        let server = server(Config::default());

        let response = server
            .post("/allocate_rides")
            .multipart(csv_upload("company_name,number_of_rides_requested\nLyft,100\n"))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("destination"));
    }

    #[test_log::test(tokio::test)]
    async fn test_top_up_is_returned_as_its_own_row() {
        let server = server(Config {
            approval: ApprovalConfig::FixedRatio(FixedRatioConfig { percent: 75 }),
            ..Default::default()
        });

        let response = server
            .post("/allocate_rides")
            .multipart(csv_upload(
                "company_name,destination,number_of_rides_requested
                 Microsoft,11 times sq,200
                 Uber,11 times sq,200
",
            ))
            .await;

        // 300 approved: 100 each proportionally, then one leftover chunk to Microsoft
        response.assert_status_ok();
        assert_eq!(
            response.text(),
            "company_name,destination,number_of_rides_approved
             Microsoft,11 times sq,100
             Uber,11 times sq,100
             Microsoft,11 times sq,100
"
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_destination_total_past_u64_is_server_error() {
        let server = server(Config::default());

        let response = server
            .post("/allocate_rides")
            .multipart(csv_upload(
                "company_name,destination,number_of_rides_requested
                 Lyft,JFK,18446744073709551615
                 Uber,JFK,1
",
            ))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Total rides requested for destination 'JFK' is too large");
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_file_field() {
        let server = server(Config::default());

        let response = server
            .post("/allocate_rides")
            .multipart(MultipartForm::new().add_text("note", "no file here"))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert!(body["error"].as_str().unwrap().starts_with("No file uploaded"));
    }

    #[test_log::test(tokio::test)]
    async fn test_non_multipart_body() {
        let server = server(Config::default());

        let response = server.post("/allocate_rides").text(SAMPLE).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert!(body["error"].as_str().unwrap().starts_with("Invalid upload"));
    }

    #[test_log::test(tokio::test)]
    async fn test_oversized_upload() {
        let mut config = Config::default();
        config.limits.max_file_size = 64;
        let server = server(config);

        let response = server.post("/allocate_rides").multipart(csv_upload(SAMPLE)).await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        let body: serde_json::Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("64 bytes"));
    }

    #[test_log::test(tokio::test)]
    async fn test_remote_approval() {
        let approvals = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/approve"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "11 times sq": 500,
                "770 Broadway": 100
            })))
            .expect(1)
            .mount(&approvals)
            .await;

        let server = server(Config {
            approval: ApprovalConfig::Http(HttpApprovalConfig {
                url: format!("{}/approve", approvals.uri()).parse().unwrap(),
                api_key: None,
                timeout: Duration::from_secs(5),
            }),
            ..Default::default()
        });

        let response = server.post("/allocate_rides").multipart(csv_upload(SAMPLE)).await;

        response.assert_status_ok();
        assert_eq!(
            response.text(),
            "company_name,destination,number_of_rides_approved\n\
             Microsoft,11 times sq,300\n\
             Uber,11 times sq,200\n\
             Facebook,770 Broadway,100\n"
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_remote_approval_failure() {
        let approvals = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&approvals)
            .await;

        let server = server(Config {
            approval: ApprovalConfig::Http(HttpApprovalConfig {
                url: approvals.uri().parse().unwrap(),
                api_key: None,
                timeout: Duration::from_secs(5),
            }),
            ..Default::default()
        });

        let response = server.post("/allocate_rides").multipart(csv_upload(SAMPLE)).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert!(body["error"].as_str().unwrap().starts_with("Approval service unavailable"));
    }
}
