#![forbid(unsafe_code)]

use path_absolutize::Absolutize;
use std::ops::Deref;
use std::path::Path;
use chrono::{Utc, Local, DateTime, SecondsFormat};

use poem::Request;

use log::{debug, LevelFilter};

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Inbound request headers consulted when tagging callback entries.
pub const X_FORWARDED_FOR: &str = "X-Forwarded-For";
pub const USER_AGENT: &str = "User-Agent";

// Placeholder when a header or peer address is unavailable.
const UNKNOWN: &str = "unknown";

// ***************************************************************************
// GENERAL PUBLIC FUNCTIONS
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_absolute_path:
// ---------------------------------------------------------------------------
/** Replace tilde (~) and environment variable values in a path name and
 * then construct the absolute path name.  The difference between
 * absolutize and standard canonicalize methods is that absolutize does not
 * care about whether the file exists and what the file really is.
 */
pub fn get_absolute_path(path: &str) -> String {
    // Replace ~ and environment variable values if possible.
    // On error, return the string version of the original path.
    let s = match shellexpand::full(path) {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };

    // Convert to absolute path if necessary.
    // Return original input on error.
    let p = Path::new(s.deref());
    let p1 = match p.absolutize() {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };
    let p2 = match p1.to_str() {
        Some(x) => x,
        None => return path.to_owned(),
    };

    p2.to_owned()
}

// ---------------------------------------------------------------------------
// timestamp_utc:
// ---------------------------------------------------------------------------
/** Get the current UTC timestamp */
#[allow(dead_code)]
pub fn timestamp_utc() -> DateTime<Utc> {
    Utc::now()
}

// ---------------------------------------------------------------------------
// timestamp_utc_to_str:
// ---------------------------------------------------------------------------
/** Convert a UTC datetime to rfc3339 format with microsecond precision, which
 * looks like this:  2022-09-13T14:14:42.719849Z
 */
#[allow(dead_code)]
pub fn timestamp_utc_to_str(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// timestamp_local_display:
// ---------------------------------------------------------------------------
/** Get the current local time in the display format used for callback
 * entries, ex: 2026-08-24 14:14:42
 */
pub fn timestamp_local_display() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

// ---------------------------------------------------------------------------
// get_source_ip:
// ---------------------------------------------------------------------------
/** Determine the originating address of a request.  The X-Forwarded-For
 * header takes precedence since deployments typically sit behind a tunnel
 * or reverse proxy; the first address in the list is the client.  Falls
 * back to the socket peer address, then to a fixed placeholder.
 */
pub fn get_source_ip(http_req: &Request) -> String {
    if let Some(hdr) = http_req.headers().get(X_FORWARDED_FOR) {
        if let Ok(s) = hdr.to_str() {
            let first = s.split(',').next().unwrap_or("").trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    match http_req.remote_addr().as_socket_addr() {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN.to_string(),
    }
}

// ---------------------------------------------------------------------------
// get_user_agent:
// ---------------------------------------------------------------------------
/** Return the request's User-Agent header value or a fixed placeholder. */
pub fn get_user_agent(http_req: &Request) -> String {
    http_req
        .headers()
        .get(USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .unwrap_or(UNKNOWN)
        .to_string()
}

// ***************************************************************************
//                                  Traits
// ***************************************************************************
pub trait RequestDebug {
    type Req;
    fn get_request_info(&self) -> String;
}

// ---------------------------------------------------------------------------
// debug_request:
// ---------------------------------------------------------------------------
// Dump http request information to the log.
pub fn debug_request(http_req: &Request, req: &impl RequestDebug) {
    // Check that debug or higher logging is in effect.
    let level = log::max_level();
    if level < LevelFilter::Debug {
        return;
    }

    // Accumulate the output.
    let mut s = "\n".to_string();

    // Restate the URI.
    let uri = http_req.uri();
    s += format!("  URI: {:?}\n", uri).as_str();

    // Accumulate the headers
    let it = http_req.headers().iter();
    for v in it {
        s += format!("  Header: {} = {:?} \n", v.0, v.1).as_str();
    }

    // Add the request's information.
    s += req.get_request_info().as_str();

    // Write the single log record.
    debug!("{}", s);
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_path_passthrough() {
        // An already-absolute path comes back unchanged.
        assert_eq!(get_absolute_path("/tmp/relay"), "/tmp/relay");
    }

    #[test]
    fn local_display_shape() {
        let s = timestamp_local_display();
        // "YYYY-MM-DD HH:MM:SS"
        assert_eq!(s.len(), 19);
        assert_eq!(&s[4..5], "-");
        assert_eq!(&s[10..11], " ");
    }

    #[test]
    fn forwarded_for_first_hop() {
        let req = Request::builder()
            .header(X_FORWARDED_FOR, "10.0.0.1, 172.16.0.9")
            .finish();
        assert_eq!(get_source_ip(&req), "10.0.0.1");
    }

    #[test]
    fn user_agent_fallback() {
        let req = Request::builder().finish();
        assert_eq!(get_user_agent(&req), "unknown");
    }
}
