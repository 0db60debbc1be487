#![forbid(unsafe_code)]

use poem::Request;
use poem_openapi::{OpenApi, payload::Html, ApiResponse};

use log::error;

use crate::utils::forwarder::{forward, Submission};
use crate::utils::notice::{self, Notice};
use crate::utils::relay_utils::{debug_request, RequestDebug};
use crate::utils::templates::render_index;

use crate::RUNTIME_CTX;

// ***************************************************************************
//                          Request/Response Definitions
// ***************************************************************************
pub struct IndexApi;

/// Raw form fields as posted by the browser.  Absent fields stay empty so
/// validation decides the outcome, not parsing.
#[derive(Debug, Default)]
pub struct ReqSubmit {
    name: String,
    message: String,
    timestamp: String,
}

impl ReqSubmit {
    /// Decode an application/x-www-form-urlencoded body.  Unknown fields
    /// are ignored; repeated fields keep the last value.
    fn from_urlencoded(body: &[u8]) -> Self {
        let mut req = ReqSubmit::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            match &*key {
                "name" => req.name = value.into_owned(),
                "message" => req.message = value.into_owned(),
                "timestamp" => req.timestamp = value.into_owned(),
                _ => (),
            }
        }
        req
    }
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqSubmit {
    type Req = ReqSubmit;
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(255);
        s.push_str("  Request body:");
        s.push_str("\n    name: ");
        s.push_str(&self.name);
        s.push_str("\n    timestamp: ");
        s.push_str(&self.timestamp);
        s
    }
}

// ------------------- HTTP Status Codes -------------------
#[derive(ApiResponse)]
enum IndexResponse {
    /// The form page, clearing any notice that was just displayed.
    #[oai(status = 200)]
    Page(Html<String>, #[oai(header = "Set-Cookie")] Option<String>),
    /// Post/redirect/get back to the form with the outcome notice attached.
    #[oai(status = 302)]
    Redirect(
        #[oai(header = "Location")] String,
        #[oai(header = "Set-Cookie")] String,
    ),
    #[oai(status = 500)]
    Http500(Html<String>),
}

fn make_page(html: String, clear_notice: bool) -> IndexResponse {
    let cookie = if clear_notice { Some(notice::clear_cookie_header()) } else { None };
    IndexResponse::Page(Html(html), cookie)
}
fn make_redirect(n: &Notice) -> IndexResponse {
    let secret = &RUNTIME_CTX.parms.config.secret_key;
    IndexResponse::Redirect("/".to_string(), notice::set_cookie_header(n, secret))
}
fn make_http_500(msg: String) -> IndexResponse {
    IndexResponse::Http500(Html(format!("<h1>Internal error</h1><p>{}</p>", msg)))
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl IndexApi {
    // -----------------------------------------------------------------------
    // GET / : render the submission form.
    // -----------------------------------------------------------------------
    #[oai(path = "/", method = "get")]
    async fn get_index(&self, http_req: &Request) -> IndexResponse {
        let config = &RUNTIME_CTX.parms.config;

        // A notice is shown exactly once; displaying it consumes it.
        let pending = notice::take_from_request(http_req, &config.secret_key);
        match render_index(&config.title, pending.as_ref()) {
            Ok(html) => make_page(html, pending.is_some()),
            Err(e) => {
                let msg = "ERROR: ".to_owned() + e.to_string().as_str();
                error!("{}", msg);
                make_http_500(msg)
            }
        }
    }

    // -----------------------------------------------------------------------
    // POST / : validate, forward to the webhook, redirect with the outcome.
    // -----------------------------------------------------------------------
    #[oai(path = "/", method = "post")]
    async fn post_index(&self, http_req: &Request, body: poem::Body) -> IndexResponse {
        // An unreadable body is treated like an empty form.
        let bytes = body.into_vec().await.unwrap_or_default();
        let req = ReqSubmit::from_urlencoded(&bytes);

        // Conditional logging depending on log level.
        debug_request(http_req, &req);

        // Validation failures short-circuit: no outbound call is made.
        let submission = match Submission::from_form(&req.name, &req.message, &req.timestamp) {
            Ok(s) => s,
            Err(e) => return make_redirect(&Notice::from_error(&e)),
        };

        // One synchronous attempt; the client carries the 30-second timeout.
        let config = &RUNTIME_CTX.parms.config;
        let outcome = forward(&RUNTIME_CTX.client, &config.webhook_url, &submission).await;
        make_redirect(&outcome)
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::ReqSubmit;

    #[test]
    fn urlencoded_decoding() {
        let req = ReqSubmit::from_urlencoded(
            b"name=Ada+Lovelace&message=hello%20there&timestamp=2026-08-24T10%3A00%3A00Z",
        );
        assert_eq!(req.name, "Ada Lovelace");
        assert_eq!(req.message, "hello there");
        assert_eq!(req.timestamp, "2026-08-24T10:00:00Z");
    }

    #[test]
    fn missing_fields_stay_empty() {
        let req = ReqSubmit::from_urlencoded(b"name=Ada&extra=ignored");
        assert_eq!(req.name, "Ada");
        assert!(req.message.is_empty());
        assert!(req.timestamp.is_empty());
    }
}
