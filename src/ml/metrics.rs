//! Evaluation metrics for the urgency classifier.

/// Confusion matrix for a `K`-class classifier.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<u32>>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            counts: vec![vec![0; n_classes]; n_classes],
        }
    }

    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if let Some(cell) = self
            .counts
            .get_mut(truth)
            .and_then(|row| row.get_mut(predicted))
        {
            *cell = cell.saturating_add(1);
        }
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts
            .get(truth)
            .and_then(|row| row.get(predicted))
            .copied()
            .unwrap_or(0)
    }

    /// Fraction of examples on the diagonal; 0.0 for an empty matrix.
    pub fn accuracy(&self) -> f32 {
        let mut correct = 0u64;
        let mut total = 0u64;
        for (truth, row) in self.counts.iter().enumerate() {
            for (predicted, &count) in row.iter().enumerate() {
                total += count as u64;
                if truth == predicted {
                    correct += count as u64;
                }
            }
        }
        if total == 0 {
            0.0
        } else {
            correct as f32 / total as f32
        }
    }

    /// Per-class `(precision, recall, support)` rows.
    pub fn per_class(&self) -> Vec<(f32, f32, u32)> {
        let k = self.n_classes();
        (0..k)
            .map(|class| {
                let tp = self.get(class, class) as f32;
                let support: u32 = (0..k).map(|j| self.get(class, j)).sum();
                let predicted: u32 = (0..k).map(|i| self.get(i, class)).sum();
                let fn_ = support as f32 - tp;
                let fp = predicted as f32 - tp;
                let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
                let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
                (precision, recall, support)
            })
            .collect()
    }
}
