#![forbid(unsafe_code)]

use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::utils::errors::Errors;
use crate::utils::notice::Notice;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Wire-compatible source tag expected by the receiving workflow.
pub const SUBMISSION_SOURCE: &str = "flask-webapp";

// Notice shown for a 200 reply whose body carries no usable reply string.
const GENERIC_SUCCESS: &str = "Message sent successfully to the webhook workflow!";

// ***************************************************************************
//                               Data Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// Submission:
// ---------------------------------------------------------------------------
/** The outbound payload for one form submission.  Transient: built, posted
 * once, dropped.  The timestamp is whatever the form supplied, verbatim.
 */
#[derive(Debug, Serialize, PartialEq)]
pub struct Submission {
    pub name: String,
    pub message: String,
    pub timestamp: String,
    pub source: &'static str,
}

impl Submission {
    // -----------------------------------------------------------------------
    // from_form:
    // -----------------------------------------------------------------------
    /** Validate and normalize raw form fields.  Name and message must be
     * non-empty after trimming; surrounding whitespace is not forwarded.
     */
    pub fn from_form(name: &str, message: &str, timestamp: &str) -> Result<Self, Errors> {
        let name = name.trim();
        let message = message.trim();
        if name.is_empty() || message.is_empty() {
            return Err(Errors::ValidationError);
        }

        Ok(Self {
            name: name.to_string(),
            message: message.to_string(),
            timestamp: timestamp.to_string(),
            source: SUBMISSION_SOURCE,
        })
    }
}

// ***************************************************************************
//                             Public Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// forward:
// ---------------------------------------------------------------------------
/** Post the submission to the configured webhook URL and turn the outcome
 * into the notice shown to the submitter.  Exactly one attempt; the client
 * carries the 30-second timeout.  Every failure is recovered into a notice
 * here, nothing propagates.
 */
pub async fn forward(client: &reqwest::Client, url: &str, submission: &Submission) -> Notice {
    info!("Forwarding submission from '{}' to {}", submission.name, url);

    let result = client.post(url).json(submission).send().await;
    match result {
        Ok(resp) => {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            interpret_reply(status, &body)
        }
        Err(e) => {
            let err = classify_send_error(&e);
            error!("Webhook POST to {} failed: {}", url, e);
            Notice::from_error(&err)
        }
    }
}

// ---------------------------------------------------------------------------
// interpret_reply:
// ---------------------------------------------------------------------------
/** Map the webhook's HTTP reply to a notice.  A 200 whose JSON body holds a
 * string under "reply" surfaces that string; any other 200 body gets the
 * generic success text; any other status is a warning carrying the code.
 */
pub fn interpret_reply(status: u16, body: &str) -> Notice {
    if status == 200 {
        let reply = serde_json::from_str::<Value>(body)
            .ok()
            .as_ref()
            .and_then(|v| v.get("reply"))
            .and_then(Value::as_str)
            .map(str::to_string);
        match reply {
            Some(text) => Notice::success(text),
            None => Notice::success(GENERIC_SUCCESS),
        }
    } else {
        warn!("Webhook answered with status {}", status);
        Notice::from_error(&Errors::UpstreamBadStatus(status))
    }
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// classify_send_error:
// ---------------------------------------------------------------------------
/** Sort a reqwest transport error into the relay taxonomy. */
fn classify_send_error(e: &reqwest::Error) -> Errors {
    if e.is_timeout() {
        Errors::UpstreamTimeout
    } else if e.is_connect() {
        Errors::UpstreamUnreachable
    } else {
        Errors::UnexpectedError(e.to_string())
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::notice::NoticeCategory;

    #[test]
    fn valid_submission_is_trimmed() {
        let s = Submission::from_form("  Ada  ", " hello ", "2026-08-24T10:00:00Z").unwrap();
        assert_eq!(s.name, "Ada");
        assert_eq!(s.message, "hello");
        assert_eq!(s.timestamp, "2026-08-24T10:00:00Z");
        assert_eq!(s.source, "flask-webapp");
    }

    #[test]
    fn whitespace_only_fields_are_rejected() {
        assert!(matches!(
            Submission::from_form("   ", "hi", ""),
            Err(Errors::ValidationError)
        ));
        assert!(matches!(
            Submission::from_form("Ada", " \t ", ""),
            Err(Errors::ValidationError)
        ));
    }

    #[test]
    fn wire_body_shape() {
        let s = Submission::from_form("Ada", "hi", "t0").unwrap();
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "name": "Ada",
                "message": "hi",
                "timestamp": "t0",
                "source": "flask-webapp",
            })
        );
    }

    #[test]
    fn reply_string_is_surfaced() {
        let n = interpret_reply(200, r#"{"reply":"X"}"#);
        assert_eq!(n.category, NoticeCategory::Success);
        assert_eq!(n.text, "X");
    }

    #[test]
    fn missing_reply_falls_back_to_generic() {
        let n = interpret_reply(200, r#"{"ok":true}"#);
        assert_eq!(n.category, NoticeCategory::Success);
        assert_eq!(n.text, GENERIC_SUCCESS);
    }

    #[test]
    fn non_json_body_falls_back_to_generic() {
        let n = interpret_reply(200, "thanks");
        assert_eq!(n.category, NoticeCategory::Success);
        assert_eq!(n.text, GENERIC_SUCCESS);
    }

    #[test]
    fn non_string_reply_falls_back_to_generic() {
        let n = interpret_reply(200, r#"{"reply":42}"#);
        assert_eq!(n.text, GENERIC_SUCCESS);
    }

    #[test]
    fn bad_status_is_reported() {
        let n = interpret_reply(503, "");
        assert_eq!(n.category, NoticeCategory::Warning);
        assert_eq!(n.text, "Failed to send message. Status: 503");
    }
}
