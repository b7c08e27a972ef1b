// 📈 Frequency Scorer
// Weighted blend of spoken (film subtitles) and written (books) corpus frequency.

use serde::{Deserialize, Serialize};

/// Weights for `combined_frequency`. Film frequency is weighted higher
/// because oral comprehension is the priority.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyWeights {
    pub film: f64,
    pub book: f64,
}

impl Default for FrequencyWeights {
    fn default() -> Self {
        FrequencyWeights {
            film: 0.6,
            book: 0.4,
        }
    }
}

impl FrequencyWeights {
    pub fn combine(&self, film_frequency: f64, book_frequency: f64) -> f64 {
        self.film * film_frequency + self.book * book_frequency
    }

    /// Same as `combine` with absent inputs treated as zero.
    pub fn combine_opt(&self, film_frequency: Option<f64>, book_frequency: Option<f64>) -> f64 {
        self.combine(film_frequency.unwrap_or(0.0), book_frequency.unwrap_or(0.0))
    }
}

/// `0.6 * film + 0.4 * book` with the default weights.
pub fn combined_frequency(film_frequency: f64, book_frequency: f64) -> f64 {
    FrequencyWeights::default().combine(film_frequency, book_frequency)
}

/// Round to two decimals for CSV artifacts.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
