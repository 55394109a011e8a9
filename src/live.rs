//! Client for the remote live-capture service.
//!
//! The alternate workflow to local stitching: upload the images as one
//! `multipart/form-data` request (one `files` part per image, in order) and
//! get back URLs for a still and a motion clip. The service itself is an
//! external black box; this module only speaks its wire shape.
//!
//! ```text
//! POST <endpoint>
//! Content-Type: multipart/form-data; boundary=...
//!
//! 2xx → {"status": "...", "jpg_url": "...", "mov_url": "...", "width": 1080, "height": 1920}
//! else → error body, surfaced verbatim
//! ```

use crate::types::SourceFile;
use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Form field every uploaded image is sent under.
pub const FILES_FIELD: &str = "files";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum LiveCaptureError {
    #[error("no images to upload")]
    EmptyInput,
    #[error("service rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Successful service reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveCaptureResponse {
    pub status: String,
    pub jpg_url: String,
    pub mov_url: String,
    pub width: u32,
    pub height: u32,
}

/// Anything that can turn an ordered image set into a live capture.
pub trait LiveCaptureService {
    fn capture(&self, files: &[SourceFile]) -> Result<LiveCaptureResponse, LiveCaptureError>;
}

fn part_media_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// One `files` part per image, in input order.
fn build_form(files: &[SourceFile]) -> Result<Form, LiveCaptureError> {
    files.iter().try_fold(Form::new(), |form, file| {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(part_media_type(&file.bytes))?;
        Ok(form.part(FILES_FIELD, part))
    })
}

/// [`LiveCaptureService`] over HTTP with a blocking `reqwest` client.
pub struct HttpLiveCapture {
    endpoint: String,
    client: Client,
}

impl HttpLiveCapture {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, LiveCaptureError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(endpoint, client))
    }

    pub fn with_client(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl LiveCaptureService for HttpLiveCapture {
    fn capture(&self, files: &[SourceFile]) -> Result<LiveCaptureResponse, LiveCaptureError> {
        if files.is_empty() {
            return Err(LiveCaptureError::EmptyInput);
        }
        let total: usize = files.iter().map(|f| f.bytes.len()).sum();
        log::debug!(
            "uploading {} images ({total} bytes) to {}",
            files.len(),
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(build_form(files)?)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(LiveCaptureError::Rejected {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        Ok(response.json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn files() -> Vec<SourceFile> {
        vec![
            SourceFile::new("one.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2]),
            SourceFile::new("two.png", b"\x89PNG\r\n\x1a\nrest".to_vec()),
        ]
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    /// Answer one request with `status_line` and `body`; the thread returns
    /// the raw request it received.
    fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, thread::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/live", listener.local_addr().unwrap());

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            let header_end = loop {
                let n = stream.read(&mut buf).unwrap();
                assert!(n > 0, "client closed before sending headers");
                request.extend_from_slice(&buf[..n]);
                if let Some(pos) = find(&request, b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
            let content_length: usize = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            let chunked = headers.contains("transfer-encoding: chunked");

            loop {
                let have = request.len() - header_end;
                let complete = if chunked {
                    request.ends_with(b"0\r\n\r\n")
                } else {
                    have >= content_length
                };
                if complete {
                    break;
                }
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request
        });

        (url, server)
    }

    fn local_client(url: String) -> HttpLiveCapture {
        let client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        HttpLiveCapture::with_client(url, client)
    }

    #[test]
    fn form_part_media_types_follow_content() {
        assert_eq!(part_media_type(&files()[0].bytes), "image/jpeg");
        assert_eq!(part_media_type(&files()[1].bytes), "image/png");
        assert_eq!(part_media_type(b"plain"), "application/octet-stream");
    }

    #[test]
    fn capture_uploads_every_image_and_decodes_reply() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"status":"ok","jpg_url":"https://x/a.jpg","mov_url":"https://x/a.mov","width":2,"height":3}"#,
        );
        let input = files();
        let response = local_client(url).capture(&input).unwrap();
        let request = server.join().unwrap();

        assert_eq!(
            response,
            LiveCaptureResponse {
                status: "ok".into(),
                jpg_url: "https://x/a.jpg".into(),
                mov_url: "https://x/a.mov".into(),
                width: 2,
                height: 3,
            }
        );

        let text = String::from_utf8_lossy(&request);
        assert!(text.starts_with("POST /live "));
        assert!(
            text.to_ascii_lowercase()
                .contains("content-type: multipart/form-data; boundary=")
        );
        assert_eq!(text.matches("name=\"files\"").count(), 2);
        let one = text.find("filename=\"one.jpg\"").unwrap();
        let two = text.find("filename=\"two.png\"").unwrap();
        assert!(one < two);
        assert!(text.contains("image/jpeg"));
        assert!(text.contains("image/png"));
        assert!(find(&request, &input[0].bytes).is_some());
        assert!(find(&request, &input[1].bytes).is_some());
    }

    #[test]
    fn non_success_status_surfaces_body() {
        let (url, server) = serve_once("500 Internal Server Error", "boom");
        let err = local_client(url).capture(&files()).unwrap_err();
        server.join().unwrap();

        match err {
            LiveCaptureError::Rejected { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn malformed_reply_is_an_http_error() {
        let (url, server) = serve_once("200 OK", r#"{"status":"ok"}"#);
        let err = local_client(url).capture(&files()).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, LiveCaptureError::Http(_)));
    }

    #[test]
    fn response_json_decodes() {
        let json = r#"{"status":"ok","jpg_url":"https://x/a.jpg","mov_url":"https://x/a.mov","width":1080,"height":1920}"#;
        let response: LiveCaptureResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.width, 1080);
        assert_eq!(response.mov_url, "https://x/a.mov");
    }

    #[test]
    fn empty_upload_is_rejected_locally() {
        let client = HttpLiveCapture::new("http://127.0.0.1:9/live").unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9/live");
        assert!(matches!(
            client.capture(&[]),
            Err(LiveCaptureError::EmptyInput)
        ));
    }
}
