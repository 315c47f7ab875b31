use std::time::{Duration, Instant};

use reqwest::{Method, StatusCode};

use super::extensions::ReqId;

/// Request log span for one outbound call
///
/// Logs the request on creation and its outcome with latency on completion.
pub struct Intercepted {
    id: ReqId,
    start: Instant,
}

pub fn intercept(method: Method, uri: &str) -> Intercepted {
    let id = ReqId::generate();
    tracing::info!(req_id = &*id.0, message = format!("{}: {}", method, uri), method = ?method, uri = uri);

    Intercepted {
        id,
        start: Instant::now(),
    }
}

impl Intercepted {
    pub fn complete(self, status: StatusCode) {
        log_response(self.id, status, self.start.elapsed());
    }

    pub fn failed(self, err: &reqwest::Error) {
        let duration = format!("{:?}", self.start.elapsed());
        tracing::error!(req_id = &*self.id.0, message = "Request failed before a response", err = %err, duration);
    }
}

fn log_response(req_id: ReqId, status: StatusCode, duration: Duration) {
    let message = format!("Completed with status {}", status);
    let duration = format!("{:?}", duration);
    match status {
        StatusCode::OK => tracing::info!(req_id = &*req_id.0, message, duration),
        StatusCode::INTERNAL_SERVER_ERROR => {
            tracing::error!(req_id = &*req_id.0, message, duration)
        }
        _ => tracing::warn!(req_id = &*req_id.0, message, duration),
    };
}
