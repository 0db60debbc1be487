#![forbid(unsafe_code)]

use poem_openapi::Object;
use thiserror::Error;

/// Errors enumerates the errors returned by this application.  The first six
/// variants are the request-level taxonomy; the rest cover bootstrap and
/// configuration failures.  Request-level messages double as the user-facing
/// notice text.
#[derive(Error, Debug)]
pub enum Errors {
    /// A required form field was empty after trimming.
    #[error("Please fill in all fields")]
    ValidationError,

    /// The outbound webhook call did not complete within the client timeout.
    #[error("Request timeout. Please try again.")]
    UpstreamTimeout,

    /// The outbound webhook endpoint could not be reached at all.
    #[error("Unable to connect to the webhook endpoint. Please check the URL.")]
    UpstreamUnreachable,

    /// The outbound webhook endpoint answered with a non-200 status.
    #[error("Failed to send message. Status: {}", .0)]
    UpstreamBadStatus(u16),

    /// An inbound callback carried no parseable JSON body.
    #[error("No JSON data received")]
    MalformedCallback,

    /// Catch-all for failures outside the taxonomy above.
    #[error("Error occurred: {}", .0)]
    UnexpectedError(String),

    /// Input parameter logging.
    #[error("relay_server input parameters:\n{}", .0)]
    InputParms(String),

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Inaccessible logger configuration file.
    #[error("Unable to access the Log4rs configuration file: {}", .0)]
    Log4rsInitialization(String),

    #[error("Reading application configuration file: {}", .0)]
    ReadingConfigFile(String),

    #[error("Unable to parse TOML file: {}", .0)]
    TOMLParseError(String),
}

// ***************************************************************************
//                            HTTP Error Body
// ***************************************************************************
// ---------------------------------------------------------------------------
// HttpResult:
// ---------------------------------------------------------------------------
/** The JSON body returned by every non-2xx response from the callback
 * endpoints: {status: "error", message: <reason>}.
 */
#[derive(Object, Debug)]
pub struct HttpResult {
    pub status: String,
    pub message: String,
}

impl HttpResult {
    pub fn new(status: String, message: String) -> Self {
        Self { status, message }
    }

    /// Standard error body with the given reason.
    pub fn error(message: String) -> Self {
        Self::new("error".to_string(), message)
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_messages() {
        assert_eq!(Errors::ValidationError.to_string(), "Please fill in all fields");
        assert_eq!(Errors::UpstreamBadStatus(503).to_string(),
                   "Failed to send message. Status: 503");
        assert_eq!(Errors::MalformedCallback.to_string(), "No JSON data received");
    }

    #[test]
    fn error_body() {
        let r = HttpResult::error("boom".to_string());
        assert_eq!(r.status, "error");
        assert_eq!(r.message, "boom");
    }
}
