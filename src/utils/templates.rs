#![forbid(unsafe_code)]

use anyhow::Result;
use lazy_static::lazy_static;
use tera::{Context, Tera};

use crate::utils::callback_store::CallbackEntry;
use crate::utils::notice::Notice;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const INDEX_TEMPLATE     : &str = "index.html";
const VIEW_DATA_TEMPLATE : &str = "view_data.html";

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Compile the embedded templates once.  A template error here is a build
// defect, so failing loudly at first use is the right behavior.
lazy_static! {
    pub static ref TEMPLATES: Tera = init_templates();
}

fn init_templates() -> Tera {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (INDEX_TEMPLATE, include_str!("../../templates/index.html")),
        (VIEW_DATA_TEMPLATE, include_str!("../../templates/view_data.html")),
    ])
    .expect("FAILED to compile embedded templates.");
    tera
}

// ***************************************************************************
//                             Public Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// render_index:
// ---------------------------------------------------------------------------
/** Render the submission form, including the pending notice if any. */
pub fn render_index(title: &str, notice: Option<&Notice>) -> Result<String> {
    let mut ctx = Context::new();
    ctx.insert("title", title);
    if let Some(n) = notice {
        ctx.insert("notice", n);
    }
    Ok(TEMPLATES.render(INDEX_TEMPLATE, &ctx)?)
}

// ---------------------------------------------------------------------------
// render_view_data:
// ---------------------------------------------------------------------------
/** Render the received-data page.  Payloads are pretty-printed here so the
 * template stays free of JSON formatting logic.
 */
pub fn render_view_data(
    title: &str,
    entries: &[CallbackEntry],
    notice: Option<&Notice>,
) -> Result<String> {
    let rows: Vec<serde_json::Value> = entries
        .iter()
        .map(|e| {
            let pretty = serde_json::to_string_pretty(&e.data)
                .unwrap_or_else(|_| e.data.to_string());
            serde_json::json!({
                "received_at": e.received_at,
                "source_ip": e.source_ip,
                "user_agent": e.user_agent,
                "data_pretty": pretty,
            })
        })
        .collect();

    let mut ctx = Context::new();
    ctx.insert("title", title);
    ctx.insert("total_count", &entries.len());
    ctx.insert("entries", &rows);
    if let Some(n) = notice {
        ctx.insert("notice", n);
    }
    Ok(TEMPLATES.render(VIEW_DATA_TEMPLATE, &ctx)?)
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn index_renders_notice() {
        let html = render_index("Relay Server", Some(&Notice::danger("Please fill in all fields")))
            .unwrap();
        assert!(html.contains("Please fill in all fields"));
        assert!(html.contains("alert-danger"));
        assert!(html.contains("webhookForm"));
    }

    #[test]
    fn index_renders_without_notice() {
        let html = render_index("Relay Server", None).unwrap();
        assert!(!html.contains("alert alert-"));
    }

    #[test]
    fn view_data_renders_entries() {
        let entries = vec![CallbackEntry {
            data: json!({"foo": 1}),
            received_at: "2026-08-24 10:00:00".to_string(),
            source_ip: "10.0.0.1".to_string(),
            user_agent: "curl/8".to_string(),
        }];
        let html = render_view_data("Relay Server", &entries, None).unwrap();
        assert!(html.contains("10.0.0.1"));
        assert!(html.contains("&quot;foo&quot;") || html.contains("\"foo\""));
    }

    #[test]
    fn view_data_renders_empty_state() {
        let html = render_view_data("Relay Server", &[], None).unwrap();
        assert!(html.contains("No data received yet"));
    }
}
