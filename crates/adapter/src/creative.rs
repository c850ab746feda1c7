//! Creative payloads that ask the exchange SDK to paint the winning ad.
//!
//! The payload is a `<script>` snippet executed by the renderer inside the
//! ad frame. It reaches up to the top window, where the exchange SDK lives,
//! and calls `rubicontag.renderCreative(frame, targetId, sizeId)`. Both ids
//! are embedded as JSON string literals so [`parse_creative`] can recover them
//! exactly.

use error_stack::Report;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::FastlaneError;
use crate::size_codec::{self, SizeId};
use crate::types::AdSize;

const CREATIVE_START: &str =
    r#"<script type="text/javascript">;(function (w, fe) { w.rubicontag.renderCreative(fe, "#;
const CREATIVE_END: &str =
    r#"); }(window.top, (document.body || document.documentElement)));</script>"#;

static RENDER_CALL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"renderCreative\(fe, ("(?:[^"\\]|\\.)*"), ("(?:[^"\\]|\\.)*")\)"#)
        .expect("valid renderCreative regex")
});

/// Target and size recovered from a creative payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreativeRef {
    pub target_id: String,
    pub size_id: SizeId,
}

/// Build the creative payload for `target_id` rendered at `size`.
///
/// # Errors
///
/// Returns [`FastlaneError::DataQuality`] when the exchange has no size id for
/// `size`; the message names the size and the full size table.
pub fn build_creative(target_id: &str, size: AdSize) -> Result<String, Report<FastlaneError>> {
    let size_id = size_codec::encode(size.width, size.height).ok_or_else(|| {
        Report::new(FastlaneError::data_quality(format!(
            "fastlane: missing sizeId for size: {size} could not render creative (known sizes: {})",
            size_codec::describe_table()
        )))
    })?;

    Ok(format!(
        "{CREATIVE_START}{}, {}{CREATIVE_END}",
        js_string(target_id),
        js_string(&size_id.to_string())
    ))
}

/// Recover the target and size ids from a payload built by [`build_creative`].
#[must_use]
pub fn parse_creative(payload: &str) -> Option<CreativeRef> {
    let captures = RENDER_CALL_PATTERN.captures(payload)?;
    let target_id: String = serde_json::from_str(captures.get(1)?.as_str()).ok()?;
    let size_id: String = serde_json::from_str(captures.get(2)?.as_str()).ok()?;
    let size_id = SizeId(size_id.parse().ok()?);

    Some(CreativeRef { target_id, size_id })
}

/// Quote `value` as a JavaScript string literal.
fn js_string(value: &str) -> String {
    // JSON string literals are valid JS; `<` is escaped so a value can never
    // close the surrounding script element.
    serde_json::Value::from(value)
        .to_string()
        .replace('<', "\\u003c")
}
