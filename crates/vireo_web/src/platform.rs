//! Platform directives and filters
//!
//! Installed on the root constructor by [`crate::web_runtime`], so every
//! component can use them.

use serde_json::Value;
use vireo_core::{display_value, ComponentOptions, VElement};

use crate::compiler::expr::truthy;

/// Root options carrying the platform assets
pub fn platform_options() -> ComponentOptions {
    ComponentOptions::new()
        .directive("show", show)
        .filter("upper", |value| Value::String(display_value(value).to_uppercase()))
        .filter("lower", |value| Value::String(display_value(value).to_lowercase()))
        .filter("json", |value| {
            Value::String(serde_json::to_string(value).unwrap_or_default())
        })
}

/// `v-show`: hide the element with `display:none` when the value is falsy
pub fn show(element: &mut VElement, value: &Value) {
    if truthy(value) {
        return;
    }
    let style = element.attrs.entry("style".to_string()).or_default();
    if !style.is_empty() && !style.trim_end().ends_with(';') {
        style.push(';');
    }
    style.push_str("display:none");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_show_appends_to_existing_style() {
        let mut element = VElement {
            tag: "p".into(),
            ..Default::default()
        };
        element.attrs.insert("style".into(), "color:red".into());
        show(&mut element, &json!(0));
        assert_eq!(element.attrs["style"], "color:red;display:none");

        let mut visible = VElement::default();
        show(&mut visible, &json!("yes"));
        assert!(visible.attrs.get("style").is_none());
    }

    #[test]
    fn test_filters_registered() {
        let options = platform_options();
        let upper = options.filters.get("upper").unwrap();
        assert_eq!(upper(&json!("abc")), json!("ABC"));
        let json_filter = options.filters.get("json").unwrap();
        assert_eq!(json_filter(&json!({"a": 1})), json!("{\"a\":1}"));
        assert!(options.directives.get("show").is_some());
    }
}
