use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Composable query specification handed to the repository: equality
/// filters, sorting, pagination and associations to include. Built per
/// request and discarded after the search call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    pub filters: Vec<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sort: Vec<Sorting>,
    /// Association property names the caller wants hydrated alongside the
    /// result rows. Interpreted by the storage layer, not by this core.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub associations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Filter {
    Equals {
        field: String,
        value: serde_json::Value,
    },
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sorting {
    pub field: String,
    pub direction: Direction,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    /// Build criteria from request query parameters. Recognized keys:
    /// `limit`, `page`, `sort` (comma separated, `-` prefix for descending),
    /// `associations` (comma separated) and `filter[<property>]=<value>`.
    /// Unknown keys are ignored so transport flags like `_response` pass
    /// through harmlessly.
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let mut criteria = Self::new();

        if let Some(limit) = params.get("limit").and_then(|v| v.parse().ok()) {
            criteria.limit = Some(limit);
        }
        if let Some(page) = params.get("page").and_then(|v| v.parse().ok()) {
            criteria.page = Some(page);
        }

        if let Some(sort) = params.get("sort") {
            for part in sort.split(',').filter(|p| !p.is_empty()) {
                let (field, direction) = match part.strip_prefix('-') {
                    Some(field) => (field, Direction::Desc),
                    None => (part, Direction::Asc),
                };
                criteria.sort.push(Sorting {
                    field: field.to_string(),
                    direction,
                });
            }
        }

        if let Some(associations) = params.get("associations") {
            criteria.associations = associations
                .split(',')
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }

        for (key, value) in params {
            if let Some(field) = key
                .strip_prefix("filter[")
                .and_then(|rest| rest.strip_suffix(']'))
            {
                criteria.add_filter(Filter::equals(field, value.clone()));
            }
        }

        criteria
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn builds_pagination_and_sort_from_query() {
        let criteria = Criteria::from_query(&params(&[
            ("limit", "25"),
            ("page", "3"),
            ("sort", "name,-price"),
        ]));

        assert_eq!(criteria.limit, Some(25));
        assert_eq!(criteria.page, Some(3));
        assert_eq!(criteria.sort.len(), 2);
        assert_eq!(criteria.sort[0].field, "name");
        assert_eq!(criteria.sort[0].direction, Direction::Asc);
        assert_eq!(criteria.sort[1].field, "price");
        assert_eq!(criteria.sort[1].direction, Direction::Desc);
    }

    #[test]
    fn builds_equals_filters_from_bracket_syntax() {
        let criteria = Criteria::from_query(&params(&[("filter[name]", "widget")]));

        assert_eq!(
            criteria.filters,
            vec![Filter::equals("name", "widget")]
        );
    }

    #[test]
    fn ignores_unknown_query_keys() {
        let criteria = Criteria::from_query(&params(&[("_response", ""), ("junk", "1")]));
        assert_eq!(criteria, Criteria::new());
    }
}
