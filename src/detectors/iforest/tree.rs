//! Isolation tree construction and traversal

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::rng::ForestRng;

/// Euler-Mascheroni constant, used by the path-length normalizer.
const EULER_GAMMA: f64 = 0.5772156649;

/// A node in an isolation tree.
///
/// Internal nodes always carry both children; leaves carry the number of
/// training samples that reached them during construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    /// Internal node with split parameters
    Internal {
        /// Feature index for the split
        feature: usize,
        /// Split value; `< split` goes left, `>= split` goes right
        split: f64,
        /// Left subtree
        left: Box<Node>,
        /// Right subtree
        right: Box<Node>,
    },
    /// Leaf node
    Leaf {
        /// Number of samples that reached this leaf
        size: usize,
    },
}

/// A single isolation tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    root: Node,
}

impl Tree {
    /// Builds a tree over the rows of `data` selected by `rows`.
    pub(crate) fn build(
        data: &Array2<f64>,
        rows: &[usize],
        max_depth: usize,
        rng: &mut ForestRng,
    ) -> Self {
        Self {
            root: build_node(data, rows, max_depth, 0, rng),
        }
    }

    /// Path length for a sample: internal-node decisions traversed plus the
    /// expected remaining depth `c(size)` at the terminal leaf.
    pub fn path_length(&self, sample: ArrayView1<'_, f64>) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                Node::Leaf { size } => {
                    return depth as f64 + average_path_length(*size as f64);
                }
                Node::Internal {
                    feature,
                    split,
                    left,
                    right,
                } => {
                    node = if sample[*feature] < *split { left } else { right };
                    depth += 1;
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Node {
        &self.root
    }
}

fn build_node(
    data: &Array2<f64>,
    rows: &[usize],
    max_depth: usize,
    depth: usize,
    rng: &mut ForestRng,
) -> Node {
    if depth >= max_depth || rows.len() <= 1 {
        return Node::Leaf { size: rows.len() };
    }

    // Draw order is fixed: feature index first, then the split fraction.
    let feature = rng.index(data.ncols());

    let column = data.column(feature);
    let mut lo = column[rows[0]];
    let mut hi = lo;
    for &r in &rows[1..] {
        let v = column[r];
        if v < lo {
            lo = v;
        }
        if v > hi {
            hi = v;
        }
    }

    // A constant column cannot separate anything further.
    if lo == hi {
        return Node::Leaf { size: rows.len() };
    }

    let split = lo + rng.unit() * (hi - lo);

    // Strict `<` goes left; equal values go right.
    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        rows.iter().partition(|&&r| column[r] < split);

    Node::Internal {
        feature,
        split,
        left: Box::new(build_node(data, &left_rows, max_depth, depth + 1, rng)),
        right: Box::new(build_node(data, &right_rows, max_depth, depth + 1, rng)),
    }
}

/// Expected path length of an unsuccessful search in a BST of `n` keys:
/// `c(n) = 2(ln(n-1) + γ) - 2(n-1)/n` for n > 1, and 0 otherwise.
///
/// Added at every terminal leaf to compensate for the sub-tree that was never
/// built.
pub fn average_path_length(n: f64) -> f64 {
    if n <= 1.0 {
        return 0.0;
    }
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_single_row_builds_leaf() {
        let data = array![[1.0, 2.0]];
        let mut rng = ForestRng::seeded(42);
        let tree = Tree::build(&data, &[0], 8, &mut rng);
        assert!(matches!(tree.root(), Node::Leaf { size: 1 }));
    }

    #[test]
    fn test_constant_feature_builds_leaf() {
        // Single column, identical values: no split can separate the rows.
        let data = array![[3.0], [3.0], [3.0], [3.0]];
        let rows: Vec<usize> = (0..4).collect();
        let mut rng = ForestRng::seeded(42);
        let tree = Tree::build(&data, &rows, 8, &mut rng);
        assert!(matches!(tree.root(), Node::Leaf { size: 4 }));
    }

    #[test]
    fn test_zero_depth_budget_builds_leaf() {
        let data = array![[1.0], [2.0], [3.0]];
        let rows: Vec<usize> = (0..3).collect();
        let mut rng = ForestRng::seeded(42);
        let tree = Tree::build(&data, &rows, 0, &mut rng);
        assert!(matches!(tree.root(), Node::Leaf { size: 3 }));
    }

    #[test]
    fn test_internal_nodes_have_both_children() {
        fn check(node: &Node) {
            if let Node::Internal { left, right, .. } = node {
                check(left);
                check(right);
            }
        }

        let data = Array2::from_shape_fn((64, 4), |(i, j)| (i * 7 + j * 13) as f64 % 29.0);
        let rows: Vec<usize> = (0..64).collect();
        let mut rng = ForestRng::seeded(42);
        let tree = Tree::build(&data, &rows, 6, &mut rng);
        check(tree.root());
    }

    #[test]
    fn test_leaf_path_is_depth_plus_correction() {
        let data = array![[3.0], [3.0], [3.0]];
        let rows: Vec<usize> = (0..3).collect();
        let mut rng = ForestRng::seeded(42);
        let tree = Tree::build(&data, &rows, 8, &mut rng);

        // Root is a leaf of size 3: depth 0 plus c(3).
        let path = tree.path_length(array![5.0].view());
        assert_eq!(path, average_path_length(3.0));
    }

    #[test]
    fn test_path_length_positive() {
        let data = Array2::from_shape_fn((32, 2), |(i, j)| (i + j) as f64);
        let rows: Vec<usize> = (0..32).collect();
        let mut rng = ForestRng::seeded(42);
        let tree = Tree::build(&data, &rows, 5, &mut rng);

        let sample = array![5.0, 6.0];
        assert!(tree.path_length(sample.view()) > 0.0);
    }

    #[test]
    fn test_average_path_length_values() {
        assert_eq!(average_path_length(0.0), 0.0);
        assert_eq!(average_path_length(1.0), 0.0);

        // c(2) = 2(ln 1 + γ) - 1 = 2γ - 1
        let c2 = average_path_length(2.0);
        assert!((c2 - (2.0 * 0.5772156649 - 1.0)).abs() < 1e-12);

        // Monotonically increasing in n.
        assert!(average_path_length(10.0) > c2);
        assert!(average_path_length(256.0) > average_path_length(10.0));
    }
}
