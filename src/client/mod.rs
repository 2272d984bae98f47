use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request for step `{route}` failed: {detail}")]
    Request { route: String, detail: String },
    #[error("step `{route}` returned status {status}")]
    Status { route: String, status: u16 },
    #[error("failed to read response body for step `{route}`: {detail}")]
    Body { route: String, detail: String },
}

// The server side of the wizard: renders step fragments and accepts the
// terminal submission. The engine only ever sees this trait.
pub trait FragmentFetcher {
    fn fetch_step(&self, route: &str, params: &[(String, String)]) -> Result<String, FetchError>;
    fn submit(&self, route: &str, fields: &[(String, String)]) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    fn endpoint(&self, route: &str) -> String {
        format!("{}/wizard/{route}", self.base_url.trim_end_matches('/'))
    }

    fn map_call_error(route: &str, err: ureq::Error) -> FetchError {
        match err {
            ureq::Error::Status(status, _) => FetchError::Status {
                route: route.to_string(),
                status,
            },
            other => FetchError::Request {
                route: route.to_string(),
                detail: other.to_string(),
            },
        }
    }
}

pub fn encode_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

impl FragmentFetcher for HttpFetcher {
    fn fetch_step(&self, route: &str, params: &[(String, String)]) -> Result<String, FetchError> {
        let mut url = self.endpoint(route);
        if !params.is_empty() {
            url = format!("{url}?{}", encode_query(params));
        }
        let response = ureq::get(&url)
            .timeout(self.timeout)
            .call()
            .map_err(|err| Self::map_call_error(route, err))?;
        response.into_string().map_err(|err| FetchError::Body {
            route: route.to_string(),
            detail: err.to_string(),
        })
    }

    fn submit(&self, route: &str, fields: &[(String, String)]) -> Result<String, FetchError> {
        let url = self.endpoint(route);
        let pairs: Vec<(&str, &str)> = fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        let response = ureq::post(&url)
            .timeout(self.timeout)
            .send_form(&pairs)
            .map_err(|err| Self::map_call_error(route, err))?;
        response.into_string().map_err(|err| FetchError::Body {
            route: route.to_string(),
            detail: err.to_string(),
        })
    }
}
