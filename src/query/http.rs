use tracing::debug;

use crate::constants::endpoints::{MAX_RESPONSE_BYTES, SPARQL_RESULTS_MIME};
use crate::enrichment::{TalkPageClient, parse_talk_page_response};
use crate::errors::AtlasError;
use crate::query::{BatchKind, QueryClient, ResultRow, parse_sparql_json};
use crate::types::{EntityId, Wikitext};

/// Blocking query client for a SPARQL endpoint.
#[derive(Clone, Debug)]
pub struct HttpQueryClient {
    endpoint: String,
    user_agent: String,
}

impl HttpQueryClient {
    /// Create a client for `endpoint`, identifying itself with `user_agent`.
    pub fn new(endpoint: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Endpoint this client queries.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn batch_label(query: &str) -> String {
    BatchKind::from_query_text(query)
        .map(|batch| batch.name().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn read_body(
    response: ureq::http::Response<ureq::Body>,
    on_error: impl FnOnce(String) -> AtlasError,
) -> Result<String, AtlasError> {
    let mut body = response.into_body();
    body.with_config()
        .limit(MAX_RESPONSE_BYTES)
        .read_to_string()
        .map_err(|err| on_error(format!("failed reading response body: {err}")))
}

impl QueryClient for HttpQueryClient {
    fn execute(&self, query: &str) -> Result<Vec<ResultRow>, AtlasError> {
        let batch = batch_label(query);
        debug!(batch = %batch, endpoint = %self.endpoint, "issuing query");
        let response = ureq::get(&self.endpoint)
            .header("Accept", SPARQL_RESULTS_MIME)
            .header("User-Agent", &self.user_agent)
            .query("query", query)
            .call()
            .map_err(|err| match err {
                ureq::Error::StatusCode(status) => AtlasError::QueryStatus {
                    batch: batch.clone(),
                    status,
                },
                other => AtlasError::QueryTransport {
                    batch: batch.clone(),
                    reason: other.to_string(),
                },
            })?;
        let body = read_body(response, |reason| AtlasError::QueryTransport {
            batch: batch.clone(),
            reason,
        })?;
        parse_sparql_json(&batch, &body)
    }
}

/// Blocking discussion-page client for a MediaWiki action API.
#[derive(Clone, Debug)]
pub struct HttpTalkPageClient {
    endpoint: String,
    user_agent: String,
}

impl HttpTalkPageClient {
    /// Create a client for `endpoint`, identifying itself with `user_agent`.
    pub fn new(endpoint: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user_agent: user_agent.into(),
        }
    }
}

impl TalkPageClient for HttpTalkPageClient {
    fn fetch_talk_page(&self, entity: &EntityId) -> Result<Option<Wikitext>, AtlasError> {
        let enrichment_error = |reason: String| AtlasError::Enrichment {
            entity: entity.clone(),
            reason,
        };
        let title = format!("Talk:{entity}");
        let response = ureq::get(&self.endpoint)
            .header("User-Agent", &self.user_agent)
            .query("action", "query")
            .query("format", "json")
            .query("prop", "revisions")
            .query("rvprop", "content")
            .query("titles", &title)
            .call()
            .map_err(|err| enrichment_error(format!("failed querying discussion page: {err}")))?;
        let body = read_body(response, enrichment_error)?;
        parse_talk_page_response(entity, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn spawn_one_shot_http(
        status_line: &str,
        payload: Vec<u8>,
    ) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let status_line = status_line.to_string();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request_buf = [0u8; 4096];
            let read = stream.read(&mut request_buf).unwrap_or(0);
            let request = String::from_utf8_lossy(&request_buf[..read]).into_owned();
            let headers = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                payload.len()
            );
            stream.write_all(headers.as_bytes()).unwrap();
            stream.write_all(&payload).unwrap();
            let _ = stream.flush();
            request
        });
        (format!("http://{addr}"), handle)
    }

    #[test]
    fn query_client_decodes_rows_and_sends_headers() {
        let payload = br#"{"head":{"vars":["marker"]},"results":{"bindings":[
            {"marker":{"type":"uri","value":"http://www.wikidata.org/entity/Q7"}}
        ]}}"#
            .to_vec();
        let (base_url, server) = spawn_one_shot_http("200 OK", payload);
        let client = HttpQueryClient::new(format!("{base_url}/sparql"), "markers-test/1.0");

        let query = BatchKind::Identity.render(None).unwrap();
        let rows = client.execute(&query).unwrap();
        let request = server.join().unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity_id("marker"), Some("Q7"));
        assert!(request.starts_with("GET /sparql?query="));
        assert!(request.contains(SPARQL_RESULTS_MIME));
        assert!(request.contains("markers-test/1.0"));
    }

    #[test]
    fn query_client_maps_http_status() {
        let (base_url, server) = spawn_one_shot_http("503 Service Unavailable", b"busy".to_vec());
        let client = HttpQueryClient::new(base_url, "markers-test/1.0");
        let query = BatchKind::Identity.render(None).unwrap();

        let err = client.execute(&query).unwrap_err();
        server.join().unwrap();
        match err {
            AtlasError::QueryStatus { batch, status } => {
                assert_eq!(batch, "identity");
                assert_eq!(status, 503);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn query_client_reports_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = HttpQueryClient::new(format!("http://{addr}"), "markers-test/1.0");

        let err = client.execute("SELECT * WHERE {}").unwrap_err();
        assert!(matches!(err, AtlasError::QueryTransport { ref batch, .. } if batch == "unknown"));
    }

    #[test]
    fn talk_page_client_returns_wikitext() {
        let payload = br#"{"query":{"pages":{"123":{"pageid":123,"title":"Talk:Q9",
            "revisions":[{"*":"{{LongInscription|langqid=Q1860|inscription=Hello}}"}]}}}}"#
            .to_vec();
        let (base_url, server) = spawn_one_shot_http("200 OK", payload);
        let client = HttpTalkPageClient::new(base_url, "markers-test/1.0");

        let text = client.fetch_talk_page(&"Q9".to_string()).unwrap();
        let request = server.join().unwrap();

        assert!(text.unwrap().contains("LongInscription"));
        assert!(request.contains("titles=Talk"));
        assert!(request.contains("Q9"));
        assert!(request.contains("rvprop=content"));
    }
}
