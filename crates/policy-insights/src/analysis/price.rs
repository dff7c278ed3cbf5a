//! Price-per-coverage statistics by product type.

use crate::types::PriceCoverageStats;
use crate::utils::{mean, quantile, sorted_floats};
use std::collections::BTreeMap;

/// Sorted price-per-coverage ratios of one product type.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSample {
    pub product_type: String,
    pub ratios: Vec<f64>,
}

/// Collect ratios per product type.
///
/// Product types listed in `preferred_order` come first, in that order; any
/// others follow alphabetically. Rows without a ratio are skipped.
pub fn group_ratios(
    product_types: &[Option<String>],
    ratios: &[Option<f64>],
    preferred_order: &[String],
) -> Vec<PriceSample> {
    let mut by_product: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (product, ratio) in product_types.iter().zip(ratios) {
        if let (Some(product), Some(ratio)) = (product.as_deref(), ratio) {
            by_product.entry(product).or_default().push(*ratio);
        }
    }

    let mut ordered: Vec<(&str, Vec<f64>)> = Vec::with_capacity(by_product.len());
    for product in preferred_order {
        if let Some(values) = by_product.remove(product.as_str()) {
            ordered.push((product.as_str(), values));
        }
    }
    ordered.extend(by_product);

    ordered
        .into_iter()
        .map(|(product, values)| PriceSample {
            product_type: product.to_string(),
            ratios: sorted_floats(values),
        })
        .collect()
}

/// Count, mean and quartiles of one product type's ratios.
pub fn summarize(sample: &PriceSample) -> Option<PriceCoverageStats> {
    let sorted = &sample.ratios;
    Some(PriceCoverageStats {
        product_type: sample.product_type.clone(),
        count: sorted.len(),
        mean: mean(sorted)?,
        median: quantile(sorted, 0.5)?,
        q1: quantile(sorted, 0.25)?,
        q3: quantile(sorted, 0.75)?,
        min: *sorted.first()?,
        max: *sorted.last()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_in_preferred_order() {
        let products = vec![
            Some("Whole".to_string()),
            Some("Term".to_string()),
            Some("Term".to_string()),
            Some("Annuity".to_string()),
            Some("Term".to_string()),
        ];
        let ratios = vec![Some(4.0), Some(3.0), Some(1.0), Some(9.0), None];
        let order = vec!["Term".to_string(), "Whole".to_string(), "Universal".to_string()];

        let samples = group_ratios(&products, &ratios, &order);
        let names: Vec<&str> = samples.iter().map(|s| s.product_type.as_str()).collect();
        assert_eq!(names, vec!["Term", "Whole", "Annuity"]);
        assert_eq!(samples[0].ratios, vec![1.0, 3.0]);

        let term = summarize(&samples[0]).unwrap();
        assert_eq!(term.count, 2);
        assert_eq!(term.mean, 2.0);
        assert_eq!(term.median, 2.0);
        assert_eq!(term.min, 1.0);
        assert_eq!(term.max, 3.0);
    }

    #[test]
    fn test_no_ratios() {
        let samples = group_ratios(&[Some("Term".to_string())], &[None], &[]);
        assert!(samples.is_empty());
    }

    #[test]
    fn test_summarize_empty_sample() {
        let sample = PriceSample {
            product_type: "Term".to_string(),
            ratios: Vec::new(),
        };
        assert_eq!(summarize(&sample), None);
    }
}
