// Success-payload normalization
//
// Each backend emits its own legacy shapes inside the envelope's `data`.
// A `PayloadNormalizer` is an ordered list of (predicate, transform) rules;
// the first rule whose predicate matches reshapes the payload, and a payload
// no rule matches passes through untouched. Rules only ever see JSON
// objects, so normalization cannot fail.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

/// Canonical paged list result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub list: Vec<T>,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
}

/// A single reshaping rule.
#[derive(Clone, Copy)]
pub struct PayloadRule {
    name: &'static str,
    matches: fn(&Map<String, Value>) -> bool,
    apply: fn(Map<String, Value>) -> Value,
}

impl PayloadRule {
    pub const fn new(
        name: &'static str,
        matches: fn(&Map<String, Value>) -> bool,
        apply: fn(Map<String, Value>) -> Value,
    ) -> Self {
        Self {
            name,
            matches,
            apply,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for PayloadRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PayloadRule").field(&self.name).finish()
    }
}

// ── Legacy rules ─────────────────────────────────────────────────────

/// `{ Data: [...], Total: n, currentPage? }` → `{ list, total, page? }`.
pub const PAGED_LIST: PayloadRule = PayloadRule::new(
    "paged-list",
    |map| map.get("Total").is_some_and(Value::is_number),
    |mut map| {
        let list = match map.remove("Data") {
            Some(Value::Null) | None => Value::Array(Vec::new()),
            Some(data) => data,
        };
        let mut out = Map::new();
        out.insert("list".into(), list);
        out.insert("total".into(), map.remove("Total").unwrap_or(Value::Null));
        match map.remove("currentPage") {
            Some(Value::Null) | None => {}
            Some(page) => {
                out.insert("page".into(), page);
            }
        }
        Value::Object(out)
    },
);

/// `{ Info, Data }` stays as-is so both halves remain addressable.
pub const DETAIL_WITH_RELATIONS: PayloadRule = PayloadRule::new(
    "detail-with-relations",
    |map| map.contains_key("Info") && map.contains_key("Data"),
    Value::Object,
);

/// `{ Data: x }` → `x`.
pub const DATA_WRAPPER: PayloadRule = PayloadRule::new(
    "data-wrapper",
    |map| map.contains_key("Data"),
    |mut map| map.remove("Data").unwrap_or(Value::Null),
);

// ── Normalizer ───────────────────────────────────────────────────────

/// Ordered rule list with an identity fallback.
#[derive(Debug, Clone, Default)]
pub struct PayloadNormalizer {
    rules: Vec<PayloadRule>,
}

impl PayloadNormalizer {
    /// No rules: every payload passes through.
    pub fn identity() -> Self {
        Self::default()
    }

    /// The rule set spoken by the legacy gateway-style services.
    pub fn legacy() -> Self {
        Self::identity()
            .with_rule(PAGED_LIST)
            .with_rule(DETAIL_WITH_RELATIONS)
            .with_rule(DATA_WRAPPER)
    }

    /// Append a rule after the existing ones.
    pub fn with_rule(mut self, rule: PayloadRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[PayloadRule] {
        &self.rules
    }

    /// Reshape a payload. Never fails.
    pub fn normalize(&self, payload: Value) -> Value {
        let Value::Object(map) = payload else {
            return payload;
        };
        match self.rules.iter().find(|rule| (rule.matches)(&map)) {
            Some(rule) => {
                trace!(rule = rule.name, "payload rule matched");
                (rule.apply)(map)
            }
            None => Value::Object(map),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn paged_list_reshapes() {
        let out = PayloadNormalizer::legacy().normalize(json!({
            "Data": [{ "id": 1 }],
            "Total": 1,
            "currentPage": 1
        }));
        assert_eq!(out, json!({ "list": [{ "id": 1 }], "total": 1, "page": 1 }));
    }

    #[test]
    fn paged_list_without_data_yields_empty_list() {
        let out = PayloadNormalizer::legacy().normalize(json!({ "Total": 0, "Data": null }));
        assert_eq!(out, json!({ "list": [], "total": 0 }));
    }

    #[test]
    fn non_numeric_total_is_not_a_page() {
        let out = PayloadNormalizer::legacy().normalize(json!({ "Total": "3", "Data": [1, 2, 3] }));
        assert_eq!(out, json!([1, 2, 3]));
    }

    #[test]
    fn detail_with_relations_passes_through() {
        let payload = json!({ "Info": { "id": 7 }, "Data": [{ "tag": "a" }] });
        assert_eq!(PayloadNormalizer::legacy().normalize(payload.clone()), payload);
    }

    #[test]
    fn data_wrapper_unwraps() {
        let out = PayloadNormalizer::legacy().normalize(json!({ "Data": { "id": 7 } }));
        assert_eq!(out, json!({ "id": 7 }));
    }

    #[test]
    fn canonical_page_is_a_fixed_point() {
        let canonical = json!({ "list": [{ "id": 1 }], "total": 1, "page": 1 });
        let normalizer = PayloadNormalizer::legacy();
        let once = normalizer.normalize(canonical.clone());
        assert_eq!(once, canonical);
        assert_eq!(normalizer.normalize(once), canonical);
    }

    #[test]
    fn scalars_and_arrays_pass_through() {
        let normalizer = PayloadNormalizer::legacy();
        for payload in [json!(null), json!(42), json!("ok"), json!([{ "Data": 1 }])] {
            assert_eq!(normalizer.normalize(payload.clone()), payload);
        }
    }

    #[test]
    fn identity_has_no_rules() {
        let payload = json!({ "Data": { "id": 7 } });
        assert_eq!(PayloadNormalizer::identity().normalize(payload.clone()), payload);
    }

    #[test]
    fn added_rules_run_after_existing_ones() {
        const ROWS: PayloadRule = PayloadRule::new(
            "rows",
            |map| map.contains_key("rows"),
            |mut map| map.remove("rows").unwrap_or(Value::Null),
        );
        let normalizer = PayloadNormalizer::legacy().with_rule(ROWS);
        assert_eq!(normalizer.rules().len(), 4);
        assert_eq!(normalizer.normalize(json!({ "rows": [1] })), json!([1]));
        assert_eq!(
            normalizer.normalize(json!({ "rows": [1], "Data": 2 })),
            json!(2)
        );
    }

    #[test]
    fn page_deserializes_with_optional_page() {
        let page: Page<u32> = serde_json::from_value(json!({ "list": [1, 2], "total": 2 })).unwrap();
        assert_eq!(page.page, None);
        assert_eq!(page.list, vec![1, 2]);
    }
}
