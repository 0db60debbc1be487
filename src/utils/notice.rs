#![forbid(unsafe_code)]

use poem::Request;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::utils::errors::Errors;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Cookie carrying the pending notice between a redirect and the next render.
pub const NOTICE_COOKIE: &str = "relay_notice";

// Notices not consumed within this window are dropped by the browser.
const NOTICE_MAX_AGE_SECS: u32 = 300;

// ***************************************************************************
//                               Notice Types
// ***************************************************************************
// ---------------------------------------------------------------------------
// NoticeCategory:
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeCategory {
    Success,
    Warning,
    Danger,
}

impl NoticeCategory {
    /// Category name as used for the alert CSS class in templates.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeCategory::Success => "success",
            NoticeCategory::Warning => "warning",
            NoticeCategory::Danger => "danger",
        }
    }
}

// ---------------------------------------------------------------------------
// Notice:
// ---------------------------------------------------------------------------
/** A one-shot, category-tagged message shown to the user on the next page
 * render.  Carried in a signed cookie set on the redirect response and
 * cleared by the render that displays it; never global state.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub category: NoticeCategory,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self { category: NoticeCategory::Success, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self { category: NoticeCategory::Warning, text: text.into() }
    }

    pub fn danger(text: impl Into<String>) -> Self {
        Self { category: NoticeCategory::Danger, text: text.into() }
    }

    /// Map a relay error to the notice shown to the submitter.  Bad upstream
    /// statuses are warnings; everything else in the taxonomy is a failure.
    pub fn from_error(err: &Errors) -> Self {
        match err {
            Errors::UpstreamBadStatus(_) => Self::warning(err.to_string()),
            _ => Self::danger(err.to_string()),
        }
    }
}

// ***************************************************************************
//                            Cookie Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// set_cookie_header:
// ---------------------------------------------------------------------------
/** Build the Set-Cookie header value that carries the notice to the next
 * render.  The value is hex(json) followed by a keyed digest so a tampered
 * cookie is ignored rather than displayed.
 */
pub fn set_cookie_header(notice: &Notice, secret: &str) -> String {
    // Serialization of a two-field struct cannot fail.
    let json = serde_json::to_string(notice).unwrap_or_default();
    let payload = hex::encode(json.as_bytes());
    let tag = sign(&payload, secret);
    format!(
        "{}={}.{}; Path=/; HttpOnly; Max-Age={}",
        NOTICE_COOKIE, payload, tag, NOTICE_MAX_AGE_SECS
    )
}

// ---------------------------------------------------------------------------
// clear_cookie_header:
// ---------------------------------------------------------------------------
/** Build the Set-Cookie header value that consumes the notice. */
pub fn clear_cookie_header() -> String {
    format!("{}=; Path=/; HttpOnly; Max-Age=0", NOTICE_COOKIE)
}

// ---------------------------------------------------------------------------
// take_from_request:
// ---------------------------------------------------------------------------
/** Extract the pending notice from the request's Cookie header, verifying
 * its digest.  Returns None when there is no cookie, the digest does not
 * match, or the payload does not decode.
 */
pub fn take_from_request(http_req: &Request, secret: &str) -> Option<Notice> {
    let raw = http_req
        .headers()
        .get("Cookie")
        .and_then(|h| h.to_str().ok())?;

    // Cookie header holds "name=value" pairs separated by "; ".
    let value = raw
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(NOTICE_COOKIE).and_then(|r| r.strip_prefix('=')))?;

    let (payload, tag) = value.split_once('.')?;
    if sign(payload, secret) != tag {
        return None;
    }

    let bytes = hex::decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

// ---------------------------------------------------------------------------
// sign:
// ---------------------------------------------------------------------------
/** Hex digest binding the payload to the configured secret. */
fn sign(payload: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn request_with_cookie(header: &str) -> Request {
        // The Set-Cookie value up to the first attribute is what the
        // browser echoes back in the Cookie header.
        let pair = header.split(';').next().unwrap().to_string();
        Request::builder().header("Cookie", pair).finish()
    }

    #[test]
    fn round_trip() {
        let notice = Notice::success("Message sent successfully to the webhook workflow!");
        let header = set_cookie_header(&notice, SECRET);
        let req = request_with_cookie(&header);
        assert_eq!(take_from_request(&req, SECRET), Some(notice));
    }

    #[test]
    fn tampered_cookie_is_ignored() {
        let header = set_cookie_header(&Notice::danger("nope"), SECRET);
        let pair = header.split(';').next().unwrap();
        // Flip one hex digit of the payload.
        let tampered = pair.replacen(
            &pair[NOTICE_COOKIE.len() + 1..NOTICE_COOKIE.len() + 3],
            "ff",
            1,
        );
        let req = Request::builder().header("Cookie", tampered).finish();
        assert_eq!(take_from_request(&req, SECRET), None);
    }

    #[test]
    fn wrong_secret_is_ignored() {
        let header = set_cookie_header(&Notice::warning("w"), SECRET);
        let req = request_with_cookie(&header);
        assert_eq!(take_from_request(&req, "other-secret"), None);
    }

    #[test]
    fn missing_cookie() {
        let req = Request::builder().finish();
        assert_eq!(take_from_request(&req, SECRET), None);
    }

    #[test]
    fn clear_header_expires_immediately() {
        assert!(clear_cookie_header().contains("Max-Age=0"));
    }

    #[test]
    fn error_mapping() {
        use crate::utils::errors::Errors;
        let n = Notice::from_error(&Errors::UpstreamBadStatus(503));
        assert_eq!(n.category, NoticeCategory::Warning);
        assert_eq!(n.text, "Failed to send message. Status: 503");

        let n = Notice::from_error(&Errors::UpstreamTimeout);
        assert_eq!(n.category, NoticeCategory::Danger);
    }
}
