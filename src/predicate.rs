//! Search predicates built from declarative filter inputs.
//!
//! Call sites describe which filters a user supplied; this module decides how
//! they turn into the `predicates` input of a search query. The remote applies
//! AND semantics across predicates, so the order only matters for
//! reproducibility: the output order always follows the input order.
//!
//! # Example
//!
//! ```
//! use hemmer_graphql_provider::predicate::{Operator, PredicateBuilder};
//!
//! let predicates = PredicateBuilder::new()
//!     .boolean("administrative", Some(false))
//!     .any_of("state", Some(vec!["FINISHED", "FAILED"]))
//!     .any_of("branch", Some(Vec::<String>::new()))
//!     .label_requirements("label", vec![vec!["team:infra"], vec!["env:prod", "env:stage"]])
//!     .build();
//!
//! assert_eq!(predicates.len(), 4);
//! assert_eq!(predicates[1].operator, Operator::In);
//! ```

use serde::{Deserialize, Serialize};

/// Comparison applied by a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// Field equals the single value.
    Eq,
    /// Field equals any of the values.
    In,
    /// Field contains the value as a substring.
    Contains,
}

/// A single filter condition sent to a search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    /// Remote field name. Not validated locally.
    pub field: String,
    /// The comparison.
    pub operator: Operator,
    /// Operand values, in input order.
    pub values: Vec<String>,
}

impl Predicate {
    /// Create a predicate.
    pub fn new(field: impl Into<String>, operator: Operator, values: Vec<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            values,
        }
    }
}

/// A filter value together with its type marker.
///
/// `None` means the user did not constrain this filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// A boolean filter.
    Bool(Option<bool>),
    /// A string or enum filter with a single value.
    Text(Option<String>),
    /// A string or enum filter with a set of accepted values.
    AnyOf(Option<Vec<String>>),
    /// A substring filter.
    Contains(Option<String>),
}

/// A named filter input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Remote field name.
    pub field: String,
    /// The supplied value.
    pub value: FilterValue,
}

impl Filter {
    /// Create a filter input.
    pub fn new(field: impl Into<String>, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }

    /// The predicate for this filter, if it constrains anything.
    pub fn to_predicate(&self) -> Option<Predicate> {
        let (operator, values) = match &self.value {
            FilterValue::Bool(Some(b)) => (Operator::Eq, vec![b.to_string()]),
            FilterValue::Text(Some(s)) => (Operator::Eq, vec![s.clone()]),
            FilterValue::Contains(Some(s)) => (Operator::Contains, vec![s.clone()]),
            FilterValue::AnyOf(Some(set)) => {
                let values = dedup(set.iter().cloned());
                if values.is_empty() {
                    return None;
                }
                (Operator::In, values)
            }
            _ => return None,
        };
        Some(Predicate::new(self.field.clone(), operator, values))
    }
}

/// Build the predicate list for a set of filter inputs, in input order.
pub fn build_predicates(filters: &[Filter]) -> Vec<Predicate> {
    filters.iter().filter_map(Filter::to_predicate).collect()
}

/// Fluent builder over [`Filter`] inputs.
#[derive(Debug, Clone, Default)]
pub struct PredicateBuilder {
    filters: Vec<Filter>,
    extra: Vec<(usize, Predicate)>,
}

impl PredicateBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named filter input.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Boolean filter: `Some(_)` emits one EQ predicate.
    pub fn boolean(self, field: impl Into<String>, value: Option<bool>) -> Self {
        self.filter(Filter::new(field, FilterValue::Bool(value)))
    }

    /// Single string or enum filter: `Some(_)` emits one EQ predicate.
    pub fn text(self, field: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        self.filter(Filter::new(field, FilterValue::Text(value.map(Into::into))))
    }

    /// Set filter: a non-empty set emits one IN predicate with every value.
    ///
    /// An empty set is the same as `None`.
    pub fn any_of<I, S>(self, field: impl Into<String>, values: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.map(|v| v.into_iter().map(Into::into).collect());
        self.filter(Filter::new(field, FilterValue::AnyOf(values)))
    }

    /// Substring filter: `Some(_)` emits one CONTAINS predicate.
    pub fn contains(self, field: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        self.filter(Filter::new(
            field,
            FilterValue::Contains(value.map(Into::into)),
        ))
    }

    /// Label requirements: every group must match (AND), any label within a
    /// group satisfies it (OR).
    ///
    /// Each non-empty group becomes its own IN predicate on `field`, emitted
    /// in group order. Empty groups are dropped.
    pub fn label_requirements<G, I, S>(mut self, field: impl Into<String>, groups: G) -> Self
    where
        G: IntoIterator<Item = I>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let field = field.into();
        for group in groups {
            let values: Vec<String> = group.into_iter().map(Into::into).collect();
            self = self.filter(Filter::new(field.clone(), FilterValue::AnyOf(Some(values))));
        }
        self
    }

    /// Append an already built predicate after the filters added so far.
    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.extra.push((self.filters.len(), predicate));
        self
    }

    /// Produce the predicate list.
    pub fn build(self) -> Vec<Predicate> {
        let mut extra = self.extra.into_iter().peekable();
        let mut out = Vec::with_capacity(self.filters.len());

        for (index, filter) in self.filters.iter().enumerate() {
            while let Some((_, p)) = extra.next_if(|(at, _)| *at == index) {
                out.push(p);
            }
            out.extend(filter.to_predicate());
        }
        out.extend(extra.map(|(_, p)| p));
        out
    }
}

fn dedup(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_emits_one_eq() {
        for value in [true, false] {
            let predicates = PredicateBuilder::new()
                .boolean("administrative", Some(value))
                .build();
            assert_eq!(
                predicates,
                vec![Predicate::new(
                    "administrative",
                    Operator::Eq,
                    vec![value.to_string()]
                )]
            );
        }
    }

    #[test]
    fn test_absent_filters_emit_nothing() {
        let predicates = PredicateBuilder::new()
            .boolean("administrative", None)
            .text("branch", None::<String>)
            .any_of("state", None::<Vec<String>>)
            .contains("name", None::<String>)
            .build();
        assert!(predicates.is_empty());
    }

    #[test]
    fn test_empty_set_is_same_as_absent() {
        let empty = PredicateBuilder::new()
            .any_of("state", Some(Vec::<String>::new()))
            .build();
        let absent = PredicateBuilder::new()
            .any_of("state", None::<Vec<String>>)
            .build();
        assert!(empty.is_empty());
        assert_eq!(empty, absent);
    }

    #[test]
    fn test_set_emits_in_with_all_values() {
        let predicates = PredicateBuilder::new()
            .any_of("state", Some(["FINISHED", "FAILED", "FINISHED"]))
            .build();
        assert_eq!(
            predicates,
            vec![Predicate::new(
                "state",
                Operator::In,
                vec!["FINISHED".to_string(), "FAILED".to_string()]
            )]
        );
    }

    #[test]
    fn test_single_value_set_is_still_in() {
        let predicates = PredicateBuilder::new()
            .any_of("state", Some(["FINISHED"]))
            .build();
        assert_eq!(predicates[0].operator, Operator::In);
    }

    #[test]
    fn test_text_and_contains() {
        let predicates = PredicateBuilder::new()
            .text("branch", Some("main"))
            .contains("name", Some("prod"))
            .build();
        assert_eq!(predicates[0].operator, Operator::Eq);
        assert_eq!(predicates[0].values, vec!["main"]);
        assert_eq!(predicates[1].operator, Operator::Contains);
        assert_eq!(predicates[1].values, vec!["prod"]);
    }

    #[test]
    fn test_label_requirements_are_sequential() {
        let predicates = PredicateBuilder::new()
            .label_requirements(
                "label",
                vec![vec!["team:infra"], vec![], vec!["env:prod", "env:stage"]],
            )
            .build();

        assert_eq!(predicates.len(), 2);
        assert_eq!(predicates[0].values, vec!["team:infra"]);
        assert_eq!(predicates[1].values, vec!["env:prod", "env:stage"]);
        assert!(predicates.iter().all(|p| p.field == "label"));
    }

    #[test]
    fn test_order_follows_input() {
        let build = || {
            PredicateBuilder::new()
                .text("space", Some("root"))
                .predicate(Predicate::new("id", Operator::Eq, vec!["x".into()]))
                .boolean("locked", Some(true))
                .build()
        };
        let predicates = build();
        let fields: Vec<_> = predicates.iter().map(|p| p.field.as_str()).collect();
        assert_eq!(fields, vec!["space", "id", "locked"]);
        assert_eq!(predicates, build());
    }

    #[test]
    fn test_build_predicates_from_filters() {
        let filters = vec![
            Filter::new("administrative", FilterValue::Bool(Some(false))),
            Filter::new("state", FilterValue::AnyOf(Some(vec![]))),
            Filter::new("name", FilterValue::Text(None)),
        ];
        let predicates = build_predicates(&filters);
        assert_eq!(predicates.len(), 1);
        assert_eq!(predicates[0].values, vec!["false"]);
    }

    #[test]
    fn test_wire_shape() {
        let predicate = Predicate::new("state", Operator::In, vec!["FINISHED".into()]);
        assert_eq!(
            serde_json::to_value(&predicate).unwrap(),
            json!({"field": "state", "operator": "IN", "values": ["FINISHED"]})
        );
        let contains = Predicate::new("name", Operator::Contains, vec!["a".into()]);
        assert_eq!(
            serde_json::to_value(&contains).unwrap()["operator"],
            json!("CONTAINS")
        );
    }
}
