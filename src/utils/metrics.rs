//! Metric accumulators for model evaluation.
//!
//! Two accumulators mirror the evaluation adapter's needs:
//! - [`MetricSet`]: a named collection of classification metrics (accuracy,
//!   macro precision, macro recall, macro one-vs-rest AUROC), updated once
//!   per batch and computed once after the full test pass;
//! - [`ConfusionMatrix`]: per-class prediction counts (rows = actual,
//!   columns = predicted).

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Named collection of classification metrics.
///
/// Ingests per-batch `(probabilities, targets)` observations and yields the
/// final aggregate values on demand via [`MetricSet::compute`]. The metric
/// order is fixed: `accuracy`, `precision`, `recall`, `auc`.
#[derive(Debug, Clone)]
pub struct MetricSet {
    num_classes: usize,
    matrix: ConfusionMatrix,
    // AUROC needs the full score distribution, so probabilities are retained.
    probabilities: Vec<Vec<f32>>,
    targets: Vec<usize>,
}

impl MetricSet {
    /// Create an empty metric collection for `num_classes` classes
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: ConfusionMatrix::new(num_classes),
            probabilities: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Ingest one batch of per-sample class probabilities and targets.
    ///
    /// `probabilities[i]` must have `num_classes` entries; the predicted
    /// class is its argmax.
    pub fn update(&mut self, probabilities: &[Vec<f32>], targets: &[usize]) {
        assert_eq!(
            probabilities.len(),
            targets.len(),
            "probabilities and targets must have same length"
        );

        for (probs, &target) in probabilities.iter().zip(targets.iter()) {
            let predicted = argmax(probs);
            self.matrix.add(target, predicted);
            self.probabilities.push(probs.clone());
            self.targets.push(target);
        }
    }

    /// Number of observations ingested so far
    pub fn count(&self) -> usize {
        self.targets.len()
    }

    /// Compute the final metric values in insertion order.
    pub fn compute(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("accuracy", self.matrix.accuracy()),
            ("precision", self.macro_precision()),
            ("recall", self.macro_recall()),
            ("auc", self.macro_auroc()),
        ]
    }

    /// Macro-averaged precision over classes with at least one prediction
    pub fn macro_precision(&self) -> f64 {
        let col_sums = self.matrix.col_sums();
        let mut sum = 0.0;
        let mut valid = 0usize;

        for class in 0..self.num_classes {
            let predicted = col_sums[class];
            if predicted == 0 {
                continue;
            }
            sum += self.matrix.get(class, class) as f64 / predicted as f64;
            valid += 1;
        }

        if valid > 0 {
            sum / valid as f64
        } else {
            0.0
        }
    }

    /// Macro-averaged recall over classes with at least one actual sample
    pub fn macro_recall(&self) -> f64 {
        let row_sums = self.matrix.row_sums();
        let mut sum = 0.0;
        let mut valid = 0usize;

        for class in 0..self.num_classes {
            let actual = row_sums[class];
            if actual == 0 {
                continue;
            }
            sum += self.matrix.get(class, class) as f64 / actual as f64;
            valid += 1;
        }

        if valid > 0 {
            sum / valid as f64
        } else {
            0.0
        }
    }

    /// Macro-averaged one-vs-rest AUROC.
    ///
    /// Per class, the AUC is the rank-sum (Mann-Whitney) statistic over the
    /// class's probability column, with tied scores assigned average ranks.
    /// Classes without both a positive and a negative sample are skipped.
    pub fn macro_auroc(&self) -> f64 {
        let mut sum = 0.0;
        let mut valid = 0usize;

        for class in 0..self.num_classes {
            let scores: Vec<f32> = self.probabilities.iter().map(|p| p[class]).collect();
            let positives: Vec<bool> = self.targets.iter().map(|&t| t == class).collect();

            if let Some(auc) = binary_auroc(&scores, &positives) {
                sum += auc;
                valid += 1;
            }
        }

        if valid > 0 {
            sum / valid as f64
        } else {
            0.0
        }
    }
}

/// AUROC for a single binary problem, `None` if only one class is present.
fn binary_auroc(scores: &[f32], positives: &[bool]) -> Option<f64> {
    let n_pos = positives.iter().filter(|&&p| p).count();
    let n_neg = positives.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    // Sort indices by score ascending; ties get the average of their ranks.
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0f64; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1..=j+1 averaged across the tie group
        let avg_rank = (i + 1 + j + 1) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = ranks
        .iter()
        .zip(positives.iter())
        .filter(|(_, &p)| p)
        .map(|(&r, _)| r)
        .sum();

    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos as f64 * n_neg as f64))
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Confusion matrix for multi-class classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,
    /// Matrix data (row = actual, column = predicted), flat row-major
    pub matrix: Vec<usize>,
}

impl ConfusionMatrix {
    /// Create a new empty confusion matrix
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: vec![0; num_classes * num_classes],
        }
    }

    /// Ingest one batch of predictions and targets
    pub fn update(&mut self, predictions: &[usize], targets: &[usize]) {
        for (&pred, &actual) in predictions.iter().zip(targets.iter()) {
            self.add(actual, pred);
        }
    }

    /// Add a single prediction to the matrix
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted] += 1;
        }
    }

    /// Get the count at (actual, predicted)
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    /// Total observation count
    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Diagonal sum (correct predictions)
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    /// Overall accuracy
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            self.correct() as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Row sums (actual class counts)
    pub fn row_sums(&self) -> Vec<usize> {
        (0..self.num_classes)
            .map(|row| (0..self.num_classes).map(|col| self.get(row, col)).sum())
            .collect()
    }

    /// Column sums (predicted class counts)
    pub fn col_sums(&self) -> Vec<usize> {
        (0..self.num_classes)
            .map(|col| (0..self.num_classes).map(|row| self.get(row, col)).sum())
            .collect()
    }

    /// Largest single cell value (used to scale the heatmap colormap)
    pub fn max_cell(&self) -> usize {
        self.matrix.iter().copied().max().unwrap_or(0)
    }

    /// Save the matrix to CSV
    pub fn save_csv(&self, path: &Path) -> std::io::Result<()> {
        let mut content = String::new();

        content.push_str("actual\\predicted");
        for col in 0..self.num_classes {
            content.push_str(&format!(",{}", col));
        }
        content.push('\n');

        for row in 0..self.num_classes {
            content.push_str(&format!("{}", row));
            for col in 0..self.num_classes {
                content.push_str(&format!(",{}", self.get(row, col)));
            }
            content.push('\n');
        }

        std::fs::write(path, content)
    }
}
