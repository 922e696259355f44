use std::cmp::Reverse;
use std::collections::BTreeMap;
use ordered_float::OrderedFloat;

// Ordered so that sums and tie-breaks are identical from run to run.
pub type Histogram = BTreeMap<OrderedFloat<f64>, usize>;

pub fn histogram(values: impl Iterator<Item = f64>) -> (Histogram, usize) {
	let mut histogram = BTreeMap::new();
	let mut len = 0;

	for value in values {
		*histogram.entry(OrderedFloat(value)).or_default() += 1;
		len += 1;
	}

	(histogram, len)
}

pub fn gini_val(histogram: &Histogram, len: usize) -> f64 {
	1.0 - histogram
		.iter()
		.map(|(_, &n)| (n as f64 / len as f64).powi(2))
		.sum::<f64>()
}

pub fn gini(values: impl Iterator<Item = f64>) -> f64 {
	let (histogram, len) = histogram(values);
	gini_val(&histogram, len)
}

/// Most frequent value, ties resolved towards the smallest value.
/// Returns `None` for an empty iterator.
pub fn most_frequent(values: impl Iterator<Item = f64>) -> Option<f64> {
	let (histogram, _) = histogram(values);

	histogram
		.into_iter()
		.max_by_key(|&(k, v)| (v, Reverse(k)))
		.map(|(k, _)| k.into_inner())
}
