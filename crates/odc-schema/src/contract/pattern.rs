//! Matcher DSL for expected bodies
//!
//! A `Pattern` produces two things for a contract file: the example value
//! and the Pact v3 matching rules keyed by JSON path. `like` matches by type
//! (cascading to children), `each_like` requires an array whose elements
//! match the example, `integer` requires any integer, and `term` requires a
//! regex match.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

/// Expected shape of a JSON value
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Value must equal the example
    Exact(Value),
    /// Value must have the example's type (and so must its children)
    Like(Value),
    /// Any integer
    Integer(i64),
    /// Array of at least `min` elements, each matching `example`
    EachLike {
        /// Element pattern
        example: Box<Pattern>,
        /// Minimum length
        min: usize,
    },
    /// String matching `regex`
    Term {
        /// Regular expression the value must match
        regex: String,
        /// Example string that matches
        example: String,
    },
    /// Object whose listed fields match their patterns
    Object(BTreeMap<String, Pattern>),
}

impl Pattern {
    #[inline]
    #[must_use]
    pub fn exact(value: impl Into<Value>) -> Self {
        Self::Exact(value.into())
    }

    #[inline]
    #[must_use]
    pub fn like(value: impl Into<Value>) -> Self {
        Self::Like(value.into())
    }

    #[inline]
    #[must_use]
    pub fn integer(example: i64) -> Self {
        Self::Integer(example)
    }

    #[inline]
    #[must_use]
    pub fn each_like(example: Pattern) -> Self {
        Self::EachLike {
            example: Box::new(example),
            min: 1,
        }
    }

    #[inline]
    #[must_use]
    pub fn term(regex: impl Into<String>, example: impl Into<String>) -> Self {
        Self::Term {
            regex: regex.into(),
            example: example.into(),
        }
    }

    /// Object pattern from `(field, pattern)` pairs
    #[must_use]
    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Pattern)>) -> Self {
        Self::Object(fields.into_iter().map(|(k, p)| (k.into(), p)).collect())
    }

    /// Example value a matching payload could have
    #[must_use]
    pub fn example(&self) -> Value {
        match self {
            Self::Exact(value) | Self::Like(value) => value.clone(),
            Self::Integer(n) => json!(n),
            Self::EachLike { example, min } => {
                let element = example.example();
                Value::Array(vec![element; (*min).max(1)])
            }
            Self::Term { example, .. } => Value::String(example.clone()),
            Self::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, p)| (k.clone(), p.example()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }

    /// Pact v3 body matching rules, keyed by JSON path from `$`
    #[must_use]
    pub fn matching_rules(&self) -> Map<String, Value> {
        let mut rules = Map::new();
        self.collect_rules("$", &mut rules);
        rules
    }

    fn collect_rules(&self, path: &str, rules: &mut Map<String, Value>) {
        match self {
            Self::Exact(_) => {}
            Self::Like(_) => {
                rules.insert(path.to_string(), matchers(json!({"match": "type"})));
            }
            Self::Integer(_) => {
                rules.insert(path.to_string(), matchers(json!({"match": "integer"})));
            }
            Self::EachLike { example, min } => {
                rules.insert(
                    path.to_string(),
                    matchers(json!({"match": "type", "min": min})),
                );
                example.collect_rules(&format!("{path}[*]"), rules);
            }
            Self::Term { regex, .. } => {
                rules.insert(
                    path.to_string(),
                    matchers(json!({"match": "regex", "regex": regex})),
                );
            }
            Self::Object(fields) => {
                for (key, pattern) in fields {
                    pattern.collect_rules(&child_path(path, key), rules);
                }
            }
        }
    }
}

impl From<Value> for Pattern {
    fn from(value: Value) -> Self {
        Self::Exact(value)
    }
}

fn matchers(rule: Value) -> Value {
    json!({ "matchers": [rule] })
}

fn child_path(parent: &str, key: &str) -> String {
    let plain = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if plain {
        format!("{parent}.{key}")
    } else {
        format!("{parent}['{key}']")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn money_like() -> Pattern {
        Pattern::object([
            ("currency_code", Pattern::like("USD")),
            ("units", Pattern::integer(10)),
            ("nanos", Pattern::integer(0)),
        ])
    }

    #[test]
    fn example_fills_in_values() {
        let pattern = Pattern::object([
            ("cost_usd", money_like()),
            ("tags", Pattern::each_like(Pattern::like("fragile"))),
        ]);
        assert_eq!(
            pattern.example(),
            json!({
                "cost_usd": {"currency_code": "USD", "units": 10, "nanos": 0},
                "tags": ["fragile"]
            })
        );
    }

    #[test]
    fn rules_follow_json_paths() {
        let pattern = Pattern::object([
            ("order_id", Pattern::like("ORDER-123")),
            (
                "items",
                Pattern::each_like(Pattern::object([("cost", money_like())])),
            ),
            ("status", Pattern::exact("PLACED")),
        ]);
        let rules = pattern.matching_rules();

        assert_eq!(rules["$.order_id"], json!({"matchers": [{"match": "type"}]}));
        assert_eq!(
            rules["$.items"],
            json!({"matchers": [{"match": "type", "min": 1}]})
        );
        assert_eq!(
            rules["$.items[*].cost.units"],
            json!({"matchers": [{"match": "integer"}]})
        );
        assert!(!rules.contains_key("$.status"));
    }

    #[test]
    fn odd_keys_use_bracket_notation() {
        let pattern = Pattern::object([("content type", Pattern::term("^a", "abc"))]);
        let rules = pattern.matching_rules();
        assert_eq!(
            rules["$['content type']"],
            json!({"matchers": [{"match": "regex", "regex": "^a"}]})
        );
    }
}
