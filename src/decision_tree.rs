use std::io::{self, Read, Write};
use std::ops::Range;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use rand::Rng;
use rand::seq::SliceRandom as _;
use ordered_float::OrderedFloat;

use crate::dataset::Dataset;
use crate::node::{Node, Split};
use crate::classifier::Classifier;
use crate::functions::{self, gini, most_frequent, gini_val, Histogram};

// Sliding window of gini
// https://arxiv.org/pdf/1403.6348.pdf
struct SlidingGini {
	n: usize,
	ni: Histogram,
	g: f64
}

impl SlidingGini {
	pub fn new(targets: impl Iterator<Item = f64>) -> Self {
		let (histogram, len) = functions::histogram(targets);

		Self {
			n: len,
			g: gini_val(&histogram, len),
			ni: histogram,
		}
	}

	pub fn inc(&mut self, typ: OrderedFloat<f64>) {
		let entry = self.ni.entry(typ).or_insert(0);
		*entry += 1;
		self.n += 1;
		self.g = 1.0 - 1.0 / (self.n as f64).powi(2) * (((self.n - 1) as f64).powi(2) * (1.0 - self.g) + 2.0 * *entry as f64 - 1.0);
	}

	pub fn dec(&mut self, typ: OrderedFloat<f64>) {
		let entry = self.ni.entry(typ).or_insert(0);
		*entry -= 1;
		self.n -= 1;
		self.g = 1.0 - 1.0 / (self.n as f64).powi(2) * (((self.n + 1) as f64).powi(2) * (1.0 - self.g) - 2.0 * *entry as f64 - 1.0);
	}

	pub fn gini(&self) -> f64 {
		self.g
	}
}

// A subtree still to be grown: the rows it covers, its depth and the slot
// its node goes into.
struct Pending {
	rows: Range<usize>,
	depth: usize,
	slot: usize,
}

struct NodeBuilder<R> {
	max_features: usize,
	max_depth: Option<usize>,
	rng: R
}

impl<R: Rng> NodeBuilder<R> {
	fn leaf(dataset: &Dataset) -> Node {
		Node::Leaf(most_frequent(dataset.targets()).unwrap_or_default())
	}

	// Grows the whole tree with an explicit work stack, so degenerate data
	// (one row peeled off per level) cannot exhaust the call stack.
	fn build(&mut self, dataset: &mut Dataset) -> Vec<Node> {
		let mut nodes = vec![Node::Leaf(0.0)];
		let mut pending = vec![Pending { rows: dataset.range(), depth: 1, slot: 0 }];

		while let Some(Pending { rows, depth, slot }) = pending.pop() {
			dataset.focus(rows);

			let split = if self.max_depth.map_or(false, |max| depth > max) {
				None
			} else {
				self.best_split(dataset)
			};

			let split = match split {
				Some(split) => split,
				None => {
					nodes[slot] = Self::leaf(dataset);
					continue;
				}
			};

			dataset.sort(split.column);
			let split_row = dataset
				.column(split.column)
				.take_while(|&f| f <= split.value)
				.count();
			let (left_rows, right_rows) = dataset.split_at(split_row);

			let left = nodes.len();
			let right = left + 1;
			nodes.push(Node::Leaf(0.0));
			nodes.push(Node::Leaf(0.0));
			nodes[slot] = Node::Children { left, right, split };

			pending.push(Pending { rows: right_rows, depth: depth + 1, slot: right });
			pending.push(Pending { rows: left_rows, depth: depth + 1, slot: left });
		}

		nodes
	}

	fn best_split(&mut self, dataset: &mut Dataset) -> Option<Split> {
		if dataset.rows_len() < 2 {
			return None;
		}

		let impurity = gini(dataset.targets());
		if impurity <= std::f64::EPSILON {
			return None;
		}

		let mut best_split: Option<Split> = None;
		let mut best_gain = std::f64::MIN;
		let columns = (0..dataset.features_len()).collect::<Vec<usize>>();
		let max_features = std::cmp::min(columns.len(), self.max_features);

		for &column in columns.choose_multiple(&mut self.rng, max_features) {
			dataset.sort(column);

			let targets = dataset.targets().collect::<Vec<f64>>();
			let mut left_window = SlidingGini::new(std::iter::empty());
			let mut right_window = SlidingGini::new(targets.iter().copied());
			let mut moved = 0;

			for (left, value) in dataset.get_splits(column) {
				for &cls in &targets[moved..left.end] {
					left_window.inc(OrderedFloat(cls));
					right_window.dec(OrderedFloat(cls));
				}
				moved = left.end;

				let ratio_l = (left.end - left.start) as f64 / dataset.rows_len() as f64;
				let ratio_r = 1.0 - ratio_l;

				let gain = impurity - (ratio_l * left_window.gini() + ratio_r * right_window.gini());

				if best_gain < gain {
					best_split = Some(Split { column, value });
					best_gain = gain;
				}
			}
		}

		best_split
	}
}

/// A fitted tree, nodes in a flat vector with the root at index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
	nodes: Vec<Node>,
}

impl DecisionTree {
	fn from_nodes(nodes: Vec<Node>) -> io::Result<Self> {
		if nodes.is_empty() {
			return Err(io::Error::new(io::ErrorKind::InvalidData, "tree has no nodes"));
		}

		for (i, node) in nodes.iter().enumerate() {
			if let Node::Children { left, right, .. } = node {
				let in_bounds = |child: usize| child > i && child < nodes.len();

				if !in_bounds(*left) || !in_bounds(*right) {
					return Err(io::Error::new(
						io::ErrorKind::InvalidData,
						format!("node {} points outside the tree ({}, {})", i, left, right),
					));
				}
			}
		}

		Ok(Self { nodes })
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn depth(&self) -> usize {
		let mut deepest = 0;
		let mut stack = vec![(0, 1)];

		while let Some((i, depth)) = stack.pop() {
			deepest = std::cmp::max(deepest, depth);

			if let Node::Children { left, right, .. } = &self.nodes[i] {
				stack.push((*left, depth + 1));
				stack.push((*right, depth + 1));
			}
		}

		deepest
	}

	pub fn leaves(&self) -> usize {
		self.nodes
			.iter()
			.filter(|node| matches!(node, Node::Leaf(_)))
			.count()
	}

	/// Largest column index used by any split.
	pub fn max_column(&self) -> Option<usize> {
		self.nodes
			.iter()
			.filter_map(|node| match node {
				Node::Children { split, .. } => Some(split.column),
				Node::Leaf(_) => None,
			})
			.max()
	}
}

impl Classifier for DecisionTree {
	/// Walks down to a leaf. `x` must be at least as long as the widest split column.
	fn predict(&self, x: &[f64]) -> f64 {
		let mut i = 0;

		loop {
			match &self.nodes[i] {
				Node::Leaf(value) => return *value,
				Node::Children { left, right, split } => {
					i = if x[split.column] <= split.value { *left } else { *right };
				},
			}
		}
	}

	fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
		let len = u32::try_from(self.nodes.len())
			.map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "tree too large"))?;

		writer.write_u32::<BigEndian>(len)?;
		for node in &self.nodes {
			node.serialize(writer)?;
		}

		Ok(())
	}

	fn deserialize<R: Read>(reader: &mut R) -> io::Result<Self> {
		let len = reader.read_u32::<BigEndian>()?;

		let nodes = (0..len)
			.map(|_| Node::deserialize(reader))
			.collect::<io::Result<Vec<Node>>>()?;

		Self::from_nodes(nodes)
	}
}

/// Tree hyperparameters. `max_depth: None` grows until every leaf is pure.
#[derive(Debug, Clone, Default)]
pub struct DecisionTreeBuilder {
	pub max_features: Option<usize>,
	pub max_depth: Option<usize>,
}

impl DecisionTreeBuilder {
	pub fn fit<R: Rng + ?Sized>(&self, rng: &mut R, mut dataset: Dataset) -> DecisionTree {
		let max_features = self.max_features.unwrap_or(dataset.features_len());
		let nodes = (NodeBuilder {
			max_features,
			max_depth: self.max_depth,
			rng
		}).build(&mut dataset);

		DecisionTree { nodes }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dataset::Builder;
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	fn xor_like() -> Builder {
		let mut builder = Builder::new();
		for i in 0..40 {
			let a = (i % 2) as f64;
			let b = ((i / 2) % 2) as f64;
			let noise = (i % 5) as f64;
			builder.add(&[a, b, noise], if a == b { 0.0 } else { 1.0 });
		}
		builder
	}

	// Labels alternate along a single column, so every split peels off one row.
	fn alternating(n: usize) -> Builder {
		let mut builder = Builder::new();
		for i in 0..n {
			let x = (i * 7 % n) as f64;
			builder.add(&[x], x % 2.0);
		}
		builder
	}

	#[test]
	fn sliding_gini_matches_direct_computation() {
		let values = [0.0, 1.0, 1.0, 2.0, 0.0, 1.0];
		let mut window = SlidingGini::new(std::iter::empty());

		for (i, &v) in values.iter().enumerate() {
			window.inc(OrderedFloat(v));
			let direct = gini(values[..=i].iter().copied());
			assert!((window.gini() - direct).abs() < 1e-9);
		}

		let mut window = SlidingGini::new(values.iter().copied());
		window.dec(OrderedFloat(1.0));
		let direct = gini([0.0, 1.0, 2.0, 0.0, 1.0].iter().copied());
		assert!((window.gini() - direct).abs() < 1e-9);
	}

	#[test]
	fn fits_training_data_exactly() {
		let builder = xor_like();
		let dataset = builder.build();
		let mut rng = StdRng::seed_from_u64(42);

		let tree = DecisionTreeBuilder::default().fit(&mut rng, dataset.clone());

		assert_eq!(dataset.evaluate(&tree), Some(1.0));
		assert_eq!(tree.predict(&[1.0, 0.0, 3.0]), 1.0);
		assert_eq!(tree.predict(&[1.0, 1.0, 3.0]), 0.0);
	}

	#[test]
	fn pure_dataset_is_a_single_leaf() {
		let mut builder = Builder::new();
		for i in 0..10 {
			builder.add(&[i as f64], 2.0);
		}
		let mut rng = StdRng::seed_from_u64(42);

		let tree = DecisionTreeBuilder::default().fit(&mut rng, builder.build());

		assert_eq!(tree.nodes(), &[Node::Leaf(2.0)]);
	}

	#[test]
	fn max_depth_limits_tree() {
		let builder = xor_like();
		let mut rng = StdRng::seed_from_u64(42);

		let tree = DecisionTreeBuilder { max_features: None, max_depth: Some(1) }.fit(&mut rng, builder.build());

		assert_eq!(tree.depth(), 2);
		assert_eq!(tree.leaves(), 2);
	}

	#[test]
	fn unlimited_depth_grows_past_thirty_two_levels() {
		let builder = alternating(400);
		let dataset = builder.build();
		let mut rng = StdRng::seed_from_u64(42);

		let tree = DecisionTreeBuilder::default().fit(&mut rng, dataset.clone());

		assert!(tree.depth() > 33, "depth {}", tree.depth());
		assert_eq!(dataset.evaluate(&tree), Some(1.0));
	}

	#[test]
	fn very_deep_trees_do_not_recurse() {
		// A right-leaning chain far deeper than any call stack would allow.
		let levels = 200_000;
		let mut nodes = Vec::with_capacity(2 * levels + 1);
		for i in 0..levels {
			let slot = 2 * i;
			nodes.push(Node::Children {
				split: Split { column: 0, value: i as f64 },
				left: slot + 1,
				right: slot + 2,
			});
			nodes.push(Node::Leaf((i % 2) as f64));
		}
		nodes.push(Node::Leaf(7.0));
		let tree = DecisionTree::from_nodes(nodes).unwrap();

		assert_eq!(tree.depth(), levels + 1);
		assert_eq!(tree.predict(&[1e9]), 7.0);

		let mut bytes = Vec::new();
		tree.serialize(&mut bytes).unwrap();
		let restored = DecisionTree::deserialize(&mut &bytes[..]).unwrap();
		assert_eq!(restored.predict(&[3.0]), 1.0);
	}

	#[test]
	fn children_pointing_backwards_are_rejected() {
		let nodes = vec![
			Node::Children { split: Split { column: 0, value: 0.0 }, left: 1, right: 0 },
			Node::Leaf(0.0),
		];

		let err = DecisionTree::from_nodes(nodes).unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::InvalidData);
	}

	#[test]
	fn same_seed_gives_same_tree() {
		let builder = xor_like();

		let fit = |seed| {
			let mut rng = StdRng::seed_from_u64(seed);
			DecisionTreeBuilder::default().fit(&mut rng, builder.build())
		};

		assert_eq!(fit(42), fit(42));
	}

	#[test]
	fn serialized_tree_predicts_the_same() {
		let builder = xor_like();
		let dataset = builder.build();
		let mut rng = StdRng::seed_from_u64(42);
		let tree = DecisionTreeBuilder::default().fit(&mut rng, dataset.clone());

		let mut bytes = Vec::new();
		tree.serialize(&mut bytes).unwrap();
		let restored = DecisionTree::deserialize(&mut &bytes[..]).unwrap();

		assert_eq!(dataset.classify(&restored), dataset.classify(&tree));
	}
}
