//! Histogram-binned regression trees
//!
//! Feature values are mapped to at most `max_bins` ordered bins once per
//! training set. Rows are stored sparsely: only features whose bin differs
//! from the bin of `0.0` are kept, which suits one-hot and multi-label
//! columns. A node histogram is accumulated from those sparse entries and the
//! zero bin of each feature is recovered from the node totals.
//!
//! Splits maximise the second-order gain
//! `G_L²/(H_L+λ) + G_R²/(H_R+λ) - G²/(H+λ)` and leaves predict `-G/(H+λ)`.

use crate::features::FeatureMatrix;

/// Largest number of bins a feature can use
pub const MAX_BINS: usize = 256;

/// Per-feature bin edges and the sparse binned rows of a training set
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    edges: Vec<Vec<f32>>,
    zero_bins: Vec<u8>,
    offsets: Vec<usize>,
    rows: Vec<Vec<(u32, u8)>>,
}

impl BinnedMatrix {
    /// Bin every column of `matrix` into at most `max_bins` bins
    #[must_use]
    pub fn from_matrix(matrix: &FeatureMatrix, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, MAX_BINS);
        let edges: Vec<Vec<f32>> = (0..matrix.columns())
            .map(|column| {
                let values: Vec<f32> = (0..matrix.rows()).map(|row| matrix.get(row, column)).collect();
                bin_edges(values, max_bins)
            })
            .collect();
        let zero_bins: Vec<u8> = edges.iter().map(|e| bin_index(e, 0.0)).collect();

        let mut offsets = Vec::with_capacity(edges.len() + 1);
        let mut total = 0;
        offsets.push(0);
        for e in &edges {
            total += e.len() + 1;
            offsets.push(total);
        }

        let rows = matrix
            .iter_rows()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter_map(|(feature, &value)| {
                        let bin = bin_index(&edges[feature], value);
                        (bin != zero_bins[feature]).then_some((feature as u32, bin))
                    })
                    .collect()
            })
            .collect();

        Self {
            edges,
            zero_bins,
            offsets,
            rows,
        }
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn features(&self) -> usize {
        self.edges.len()
    }

    /// Bin of `feature` in `row`
    #[must_use]
    pub fn bin(&self, row: usize, feature: usize) -> u8 {
        let entries = &self.rows[row];
        match entries.binary_search_by_key(&(feature as u32), |&(f, _)| f) {
            Ok(i) => entries[i].1,
            Err(_) => self.zero_bins[feature],
        }
    }

    fn total_bins(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }
}

/// Split points between bins; a value `x` falls into bin `#{edge <= x}`
fn bin_edges(mut values: Vec<f32>, max_bins: usize) -> Vec<f32> {
    values.retain(|v| v.is_finite());
    values.sort_by(f32::total_cmp);
    let mut distinct = values.clone();
    distinct.dedup();

    if distinct.len() <= max_bins {
        return distinct
            .windows(2)
            .map(|pair| pair[0] + (pair[1] - pair[0]) / 2.0)
            .collect();
    }

    let mut edges: Vec<f32> = (1..max_bins)
        .map(|k| values[k * values.len() / max_bins])
        .collect();
    edges.dedup();
    // The smallest value must stay in the first bin
    edges.retain(|&edge| edge > values[0]);
    edges
}

fn bin_index(edges: &[f32], value: f32) -> u8 {
    edges.partition_point(|&edge| edge <= value) as u8
}

/// Shape constraints of a single tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// L2 regularisation on leaf values
    pub lambda: f64,
    /// Smallest gain worth a split
    pub min_gain: f64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 4,
            min_samples_leaf: 5,
            lambda: 1.0,
            min_gain: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf {
        value: f64,
    },
    /// Rows with `bin <= bin` (equivalently `value < threshold`) go left
    Split {
        feature: usize,
        bin: u8,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

/// Regression tree stored as a node arena, root first
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Fit a tree to gradients and hessians of the rows in `indices`
    #[must_use]
    pub fn fit(
        data: &BinnedMatrix,
        gradients: &[f64],
        hessians: &[f64],
        indices: Vec<usize>,
        params: &TreeParams,
    ) -> Self {
        let mut builder = TreeBuilder {
            data,
            gradients,
            hessians,
            params,
            nodes: Vec::new(),
        };
        builder.build(indices, 0);
        Self {
            nodes: builder.nodes,
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }

    /// Multiply every leaf value by `factor`
    pub fn scale(&mut self, factor: f64) {
        for node in &mut self.nodes {
            if let Node::Leaf { value } = node {
                *value *= factor;
            }
        }
    }

    /// Predict from raw feature values
    #[must_use]
    pub fn predict(&self, row: &[f32]) -> f64 {
        self.walk(|feature, _, threshold| row.get(feature).copied().unwrap_or(0.0) < threshold)
    }

    /// Predict a training row from its bins
    #[must_use]
    pub fn predict_binned(&self, data: &BinnedMatrix, row: usize) -> f64 {
        self.walk(|feature, bin, _| data.bin(row, feature) <= bin)
    }

    fn walk(&self, goes_left: impl Fn(usize, u8, f32) -> bool) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Leaf { value }) => return *value,
                Some(&Node::Split {
                    feature,
                    bin,
                    threshold,
                    left,
                    right,
                }) => index = if goes_left(feature, bin, threshold) { left } else { right },
                None => return 0.0,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BinStats {
    gradient: f64,
    hessian: f64,
    count: usize,
}

impl BinStats {
    fn add(&mut self, gradient: f64, hessian: f64) {
        self.gradient += gradient;
        self.hessian += hessian;
        self.count += 1;
    }

    fn merge(&mut self, other: &Self) {
        self.gradient += other.gradient;
        self.hessian += other.hessian;
        self.count += other.count;
    }

    fn score(&self, lambda: f64) -> f64 {
        self.gradient * self.gradient / (self.hessian + lambda)
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    bin: u8,
    gain: f64,
}

struct TreeBuilder<'a> {
    data: &'a BinnedMatrix,
    gradients: &'a [f64],
    hessians: &'a [f64],
    params: &'a TreeParams,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let (histogram, totals) = self.histogram(&indices);
        let node_index = self.nodes.len();
        let leaf_value = -totals.gradient / (totals.hessian + self.params.lambda);
        self.nodes.push(Node::Leaf { value: leaf_value });

        if depth >= self.params.max_depth || indices.len() < 2 * self.params.min_samples_leaf {
            return node_index;
        }
        let Some(split) = self.best_split(&histogram, &totals) else {
            return node_index;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&row| self.data.bin(row, split.feature) <= split.bin);
        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);

        self.nodes[node_index] = Node::Split {
            feature: split.feature,
            bin: split.bin,
            threshold: self.data.edges[split.feature][split.bin as usize],
            left,
            right,
        };
        node_index
    }

    fn histogram(&self, indices: &[usize]) -> (Vec<BinStats>, BinStats) {
        let data = self.data;
        let mut histogram = vec![BinStats::default(); data.total_bins()];
        let mut totals = BinStats::default();
        for &row in indices {
            let (g, h) = (self.gradients[row], self.hessians[row]);
            totals.add(g, h);
            for &(feature, bin) in &data.rows[row] {
                histogram[data.offsets[feature as usize] + bin as usize].add(g, h);
            }
        }

        // Rows without a sparse entry sit in the zero bin
        for feature in 0..data.features() {
            let bins = &histogram[data.offsets[feature]..data.offsets[feature + 1]];
            let mut seen = BinStats::default();
            bins.iter().for_each(|stats| seen.merge(stats));
            let zero = &mut histogram[data.offsets[feature] + data.zero_bins[feature] as usize];
            zero.gradient = totals.gradient - seen.gradient;
            zero.hessian = totals.hessian - seen.hessian;
            zero.count = totals.count - seen.count;
        }
        (histogram, totals)
    }

    fn best_split(&self, histogram: &[BinStats], totals: &BinStats) -> Option<SplitCandidate> {
        let lambda = self.params.lambda;
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent_score = totals.score(lambda);
        let mut best: Option<SplitCandidate> = None;

        for feature in 0..self.data.features() {
            let bins = &histogram[self.data.offsets[feature]..self.data.offsets[feature + 1]];
            let mut left = BinStats::default();
            // The last bin cannot be a left side: nothing would remain on the right
            for (bin, stats) in bins.iter().enumerate().take(bins.len().saturating_sub(1)) {
                left.merge(stats);
                let right_count = totals.count - left.count;
                if left.count < min_leaf || right_count < min_leaf {
                    continue;
                }
                let right = BinStats {
                    gradient: totals.gradient - left.gradient,
                    hessian: totals.hessian - left.hessian,
                    count: right_count,
                };
                let gain = left.score(lambda) + right.score(lambda) - parent_score;
                if gain > self.params.min_gain && best.is_none_or(|b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        bin: bin as u8,
                        gain,
                    });
                }
            }
        }
        best
    }
}
