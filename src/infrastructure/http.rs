use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{Drive, DriveDashboard, DrivePayload};
use crate::infrastructure::repository::{DriveRepository, RepositoryError, RepositoryResult};

/// Talks to the REST backend: `POST /api/drives/`, `GET /api/drives/{id}/`
/// and `GET /api/drives/{id}/dashboard/`.
#[derive(Debug, Clone)]
pub struct HttpRepository {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRepository {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> RepositoryResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn drives_url(&self) -> String {
        format!("{}/api/drives/", self.base_url)
    }

    pub fn drive_url(&self, id: &str) -> String {
        format!("{}/api/drives/{}/", self.base_url, id)
    }

    pub fn dashboard_url(&self, id: &str) -> String {
        format!("{}/api/drives/{}/dashboard/", self.base_url, id)
    }

    /// GETs `url` as JSON; a 404 is `None`.
    fn fetch(&self, url: String) -> RepositoryResult<Option<Value>> {
        let response = self.send(self.client.get(url))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response));
        }
        Ok(Some(response.json()?))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> RepositoryResult<Response> {
        self.authorize(request).send().map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                RepositoryError::Unreachable(e.to_string())
            } else {
                RepositoryError::Transport(e)
            }
        })
    }
}

/// Rewrites a drive's `id` as a string so it deserializes into [`Drive`].
fn normalize_drive_id(drive: &mut Value) -> RepositoryResult<()> {
    let id = extract_id(drive).ok_or(RepositoryError::MissingId)?;
    drive["id"] = Value::String(id);
    Ok(())
}

/// Reads an `id` that the backend may send as a string or a number.
pub fn extract_id(body: &Value) -> Option<String> {
    match body.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn error_from_response(response: Response) -> RepositoryError {
    let status = response.status();
    let message = response
        .json::<Value>()
        .ok()
        .and_then(|body| {
            ["message", "detail"]
                .iter()
                .find_map(|key| body.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string()
        });
    RepositoryError::Status {
        status: status.as_u16(),
        message,
    }
}

impl DriveRepository for HttpRepository {
    fn save(&self, payload: &DrivePayload) -> RepositoryResult<String> {
        debug!(url = %self.drives_url(), "posting drive");
        let response = self.send(self.client.post(self.drives_url()).json(payload))?;
        if !response.status().is_success() {
            return Err(error_from_response(response));
        }

        let body: Value = response.json()?;
        extract_id(&body).ok_or_else(|| {
            warn!("drive creation response carried no id");
            RepositoryError::MissingId
        })
    }

    fn get(&self, id: &str) -> RepositoryResult<Option<Drive>> {
        let Some(mut body) = self.fetch(self.drive_url(id))? else {
            return Ok(None);
        };
        normalize_drive_id(&mut body)?;
        Ok(Some(serde_json::from_value(body)?))
    }

    fn dashboard(&self, id: &str) -> RepositoryResult<Option<DriveDashboard>> {
        debug!(url = %self.dashboard_url(id), "loading drive dashboard");
        let Some(mut body) = self.fetch(self.dashboard_url(id))? else {
            return Ok(None);
        };
        let details = body
            .get_mut("mission_details")
            .ok_or_else(|| <serde_json::Error as serde::de::Error>::missing_field("mission_details"))?;
        normalize_drive_id(details)?;
        Ok(Some(serde_json::from_value(body)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repository::test_support::sample_payload;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves one canned response and hands back the raw request.
    fn serve_once(status_line: &str, body: &str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                request.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();
            request.push_str(&String::from_utf8(body).unwrap());

            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request
        });

        (base, handle)
    }

    fn repo(base: &str, token: Option<&str>) -> HttpRepository {
        HttpRepository::new(base, token.map(str::to_string), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_extract_id_variants() {
        assert_eq!(extract_id(&json!({"id": "42"})), Some("42".to_string()));
        assert_eq!(extract_id(&json!({"id": 42})), Some("42".to_string()));
        assert_eq!(extract_id(&json!({"id": ""})), None);
        assert_eq!(extract_id(&json!({"id": null})), None);
        assert_eq!(extract_id(&json!({"title": "x"})), None);
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let repo = repo("http://localhost:8000/", None);
        assert_eq!(repo.drives_url(), "http://localhost:8000/api/drives/");
        assert_eq!(repo.drive_url("7"), "http://localhost:8000/api/drives/7/");
        assert_eq!(
            repo.dashboard_url("7"),
            "http://localhost:8000/api/drives/7/dashboard/"
        );
    }

    #[test]
    fn test_save_posts_payload_and_reads_id() {
        let (base, server) = serve_once("201 Created", r#"{"id": 42, "title": "Bandra drive"}"#);
        let id = repo(&base, Some("secret")).save(&sample_payload()).unwrap();
        assert_eq!(id, "42");

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /api/drives/ HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(request.contains(r#""range_km":2.0"#));
        assert!(request.contains(r#""type":"Polygon""#));
    }

    #[test]
    fn test_save_without_id_is_failure() {
        let (base, server) = serve_once("200 OK", r#"{"status": "ok"}"#);
        let result = repo(&base, None).save(&sample_payload());
        assert!(matches!(result, Err(RepositoryError::MissingId)));
        server.join().unwrap();
    }

    #[test]
    fn test_save_error_status_surfaces_message() {
        let (base, server) = serve_once("400 Bad Request", r#"{"message": "Date is in the past"}"#);
        match repo(&base, None).save(&sample_payload()) {
            Err(RepositoryError::Status { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Date is in the past");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        server.join().unwrap();
    }

    #[test]
    fn test_get_not_found_is_none() {
        let (base, server) = serve_once("404 Not Found", r#"{"detail": "Not found."}"#);
        assert!(repo(&base, None).get("9").unwrap().is_none());
        let request = server.join().unwrap();
        assert!(request.starts_with("GET /api/drives/9/ HTTP/1.1"));
    }

    #[test]
    fn test_get_normalizes_numeric_id() {
        let mut body = serde_json::to_value(sample_payload()).unwrap();
        body["id"] = json!(7);
        let (base, server) = serve_once("200 OK", &body.to_string());

        let drive = repo(&base, None).get("7").unwrap().unwrap();
        assert_eq!(drive.id, "7");
        assert_eq!(drive.details, sample_payload());
        server.join().unwrap();
    }

    #[test]
    fn test_dashboard_reads_kpis_and_volunteers() {
        let mut drive = serde_json::to_value(sample_payload()).unwrap();
        drive["id"] = json!(7);
        let body = json!({
            "mission_details": drive,
            "kpis": {"animals_covered": 31, "tagged_sterilized": 12, "area_coverage_km2": 3.5},
            "geo_json": {"type": "FeatureCollection", "features": []},
            "volunteers": [{"id": 3, "name": "Asha", "points": 80}]
        });
        let (base, server) = serve_once("200 OK", &body.to_string());

        let dashboard = repo(&base, Some("secret")).dashboard("7").unwrap().unwrap();
        assert_eq!(dashboard.mission_details.id, "7");
        assert_eq!(dashboard.kpis.animals_covered, 31);
        assert_eq!(dashboard.kpis.tagged_sterilized, 12);
        assert_eq!(dashboard.volunteers[0].name, "Asha");

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /api/drives/7/dashboard/ HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
    }

    #[test]
    fn test_dashboard_not_found_is_none() {
        let (base, server) = serve_once("404 Not Found", r#"{"detail": "Not found."}"#);
        assert!(repo(&base, None).dashboard("9").unwrap().is_none());
        server.join().unwrap();
    }

    #[test]
    fn test_unreachable_backend() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let result = repo(&base, None).save(&sample_payload());
        assert!(matches!(result, Err(RepositoryError::Unreachable(_))));
    }
}
