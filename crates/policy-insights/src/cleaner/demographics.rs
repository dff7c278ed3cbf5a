//! Per-customer resolution of demographic fields that disagree across rows.

use std::collections::{BTreeMap, HashMap};

/// Label written when a customer's rows are split evenly between values.
pub const CONFLICT_LABEL: &str = "Conflict";

/// Outcome of resolving one field for one customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Every non-missing row carries this value.
    Agreed(String),
    /// Rows disagree; this value is the single most common one.
    Mode(String),
    /// Rows disagree and several values share the top count.
    Tied,
    /// No row carries a value.
    Missing,
}

impl Resolved {
    /// The value written to the standardized column.
    pub fn label<'a>(&'a self, unknown: &'a str) -> &'a str {
        match self {
            Self::Agreed(v) | Self::Mode(v) => v.as_str(),
            Self::Tied => CONFLICT_LABEL,
            Self::Missing => unknown,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Mode(_) | Self::Tied)
    }
}

/// Resolve one customer's values for a field.
pub fn resolve<'v>(values: impl IntoIterator<Item = Option<&'v str>>) -> Resolved {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }

    if counts.is_empty() {
        return Resolved::Missing;
    }
    if counts.len() == 1 {
        let value = counts.keys().next().map(|v| v.to_string()).unwrap_or_default();
        return Resolved::Agreed(value);
    }

    let top = counts.values().copied().max().unwrap_or(0);
    let modes: Vec<&str> = counts
        .iter()
        .filter(|(_, n)| **n == top)
        .map(|(v, _)| *v)
        .collect();

    match modes.as_slice() {
        [only] => Resolved::Mode(only.to_string()),
        _ => Resolved::Tied,
    }
}

/// Resolve a field for every customer. Rows without a customer id are
/// ignored.
pub fn resolve_by_customer(
    customer_ids: &[Option<String>],
    values: &[Option<String>],
) -> HashMap<String, Resolved> {
    let mut grouped: HashMap<&str, Vec<Option<&str>>> = HashMap::new();
    for (id, value) in customer_ids.iter().zip(values) {
        if let Some(id) = id.as_deref() {
            grouped.entry(id).or_default().push(value.as_deref());
        }
    }

    grouped
        .into_iter()
        .map(|(id, values)| (id.to_string(), resolve(values)))
        .collect()
}
