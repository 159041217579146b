use std::{future::Future, time::Duration};

use thiserror::Error;

use crate::data::{Envelope, MatchOutcome};

#[derive(Error, Debug)]
pub enum MatchError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),
	#[error("no response within {0:?}")]
	Timeout(Duration),
	#[error("server returned {status} {reason}: {body}")]
	Server { status: u16, reason: String, body: String },
	#[error("unreadable response ({source}): {body}")]
	Body { source: serde_json::Error, body: String },
	#[error("response breaks the match_wkt contract: {0}")]
	Protocol(String),
}

/// Anything that can map-match a WKT trajectory.
pub trait MatchService: Clone + Send + Sync + 'static {
	fn match_wkt(&self, wkt: String) -> impl Future<Output = Result<MatchOutcome, MatchError>> + Send;
}

/// Client for `GET {base}/match_wkt?wkt=...`.
#[derive(Clone, Debug)]
pub struct HttpMatcher {
	client: reqwest::Client,
	url: String,
	timeout: Duration,
}

impl HttpMatcher {
	/// `base_url` should be like `http://localhost:5000`.
	pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MatchError> {
		let client = reqwest::Client::builder().timeout(timeout).build()?;
		Ok(Self {
			client,
			url: format!("{}/match_wkt", base_url.trim_end_matches('/')),
			timeout,
		})
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub async fn fetch(&self, wkt: &str) -> Result<MatchOutcome, MatchError> {
		log::debug!("GET {} wkt={}", self.url, wkt);
		let resp = self.client.get(&self.url).query(&[("wkt", wkt)]).send().await.map_err(|e| self.classify(e))?;
		let status = resp.status();
		let body = resp.text().await.map_err(|e| self.classify(e))?;
		log::trace!("{} -> {} {}", self.url, status, body);
		if !status.is_success() {
			return Err(MatchError::Server {
				status: status.as_u16(),
				reason: status.canonical_reason().unwrap_or_default().to_string(),
				body,
			});
		}
		let envelope: Envelope = match serde_json::from_str(&body) {
			Ok(envelope) => envelope,
			Err(source) => return Err(MatchError::Body { source, body }),
		};
		envelope.outcome().map_err(MatchError::Protocol)
	}

	fn classify(&self, e: reqwest::Error) -> MatchError {
		if e.is_timeout() {
			MatchError::Timeout(self.timeout)
		} else {
			MatchError::Http(e)
		}
	}
}

impl MatchService for HttpMatcher {
	fn match_wkt(&self, wkt: String) -> impl Future<Output = Result<MatchOutcome, MatchError>> + Send {
		let this = self.clone();
		async move { this.fetch(&wkt).await }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::{collections::HashMap, sync::{Arc, Mutex}};
	use axum::{extract::{Query, State}, http::StatusCode, routing::get, Router};

	type Seen = Arc<Mutex<Vec<String>>>;

	async fn echo(State(seen): State<Seen>, Query(q): Query<HashMap<String, String>>) -> String {
		let wkt = q.get("wkt").cloned().unwrap_or_default();
		seen.lock().unwrap().push(wkt.clone());
		serde_json::json!({ "state": 1, "wkt": wkt }).to_string()
	}

	async fn unmatched() -> &'static str {
		r#"{"state":0,"wkt":null}"#
	}

	async fn crashed() -> (StatusCode, &'static str) {
		(StatusCode::INTERNAL_SERVER_ERROR, "matcher crashed")
	}

	async fn html() -> &'static str {
		"<html>oops</html>"
	}

	async fn no_geometry() -> &'static str {
		r#"{"state":1,"wkt":null}"#
	}

	async fn slow() -> &'static str {
		tokio::time::sleep(Duration::from_secs(5)).await;
		r#"{"state":0,"wkt":null}"#
	}

	async fn start() -> (String, Seen) {
		let seen = Seen::default();
		let app = Router::new()
			.route("/ok/match_wkt", get(echo))
			.route("/unmatched/match_wkt", get(unmatched))
			.route("/crashed/match_wkt", get(crashed))
			.route("/html/match_wkt", get(html))
			.route("/no-geometry/match_wkt", get(no_geometry))
			.route("/slow/match_wkt", get(slow))
			.with_state(seen.clone());
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
		(format!("http://{}", addr), seen)
	}

	fn matcher(base: &str, path: &str) -> HttpMatcher {
		HttpMatcher::new(&format!("{}/{}/", base, path), Duration::from_secs(2)).unwrap()
	}

	#[tokio::test]
	async fn sends_wkt_as_query_parameter() {
		let (base, seen) = start().await;
		let m = matcher(&base, "ok");
		assert_eq!(m.url(), format!("{}/ok/match_wkt", base));
		let wkt = "LINESTRING(18 59.3,18.05 59.33,18.1 59.35)";
		let outcome = m.match_wkt(wkt.to_string()).await.unwrap();
		assert_eq!(outcome, MatchOutcome::Matched(wkt.to_string()));
		assert_eq!(*seen.lock().unwrap(), vec![wkt.to_string()]);
	}

	#[tokio::test]
	async fn state_zero_is_not_an_error() {
		let (base, _) = start().await;
		assert_eq!(matcher(&base, "unmatched").fetch("LINESTRING(0 0,1 1)").await.unwrap(), MatchOutcome::Unmatched);
	}

	#[tokio::test]
	async fn server_error_keeps_status_and_body() {
		let (base, _) = start().await;
		match matcher(&base, "crashed").fetch("LINESTRING(0 0,1 1)").await {
			Err(MatchError::Server { status, reason, body }) => {
				assert_eq!(status, 500);
				assert_eq!(reason, "Internal Server Error");
				assert_eq!(body, "matcher crashed");
			}
			other => panic!("unexpected {:?}", other),
		}
	}

	#[tokio::test]
	async fn unparsable_and_contract_breaking_bodies() {
		let (base, _) = start().await;
		match matcher(&base, "html").fetch("LINESTRING(0 0,1 1)").await {
			Err(MatchError::Body { body, .. }) => assert_eq!(body, "<html>oops</html>"),
			other => panic!("unexpected {:?}", other),
		}
		assert!(matches!(matcher(&base, "no-geometry").fetch("LINESTRING(0 0,1 1)").await, Err(MatchError::Protocol(_))));
	}

	#[tokio::test]
	async fn slow_server_times_out() {
		let (base, _) = start().await;
		let m = HttpMatcher::new(&format!("{}/slow", base), Duration::from_millis(200)).unwrap();
		assert!(matches!(m.fetch("LINESTRING(0 0,1 1)").await, Err(MatchError::Timeout(_))));
	}

	#[tokio::test]
	async fn unreachable_server_is_a_transport_error() {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		drop(listener);
		let m = HttpMatcher::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
		assert!(matches!(m.fetch("LINESTRING(0 0,1 1)").await, Err(MatchError::Http(_))));
	}
}
