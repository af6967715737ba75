use serde::{Deserialize, Serialize};

/// Per-feature policy for bringing raw scores into a comparable range.
///
/// Applied per word, over exactly the candidates the feature scored for
/// that word. Degenerate sets (zero range, zero sum, non-positive maximum)
/// map every score to 0.0 instead of dividing by zero.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Normalization {
	/// Scores are used as they are.
	None,
	/// `x / max`.
	DivideMax,
	/// Min–max rescaling into `[0, 1]`.
	#[default]
	Rescale,
	/// `1 - rescaled`, for distance-like scores where smaller is better.
	RescaleAndNegate,
	/// `ln(1 + x)` then rescale, for counts spanning orders of magnitude.
	LogAndRescale,
	/// `x / sum`.
	ToProb,
}

impl Normalization {
	/// Normalizes `scores` in place.
	pub fn apply(self, scores: &mut [f64]) {
		match self {
			Normalization::None => {}
			Normalization::DivideMax => {
				let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
				if max > 0.0 {
					scores.iter_mut().for_each(|s| *s /= max);
				} else {
					scores.iter_mut().for_each(|s| *s = 0.0);
				}
			}
			Normalization::Rescale => rescale(scores),
			Normalization::RescaleAndNegate => {
				if has_range(scores) {
					rescale(scores);
					scores.iter_mut().for_each(|s| *s = 1.0 - *s);
				} else {
					scores.iter_mut().for_each(|s| *s = 0.0);
				}
			}
			Normalization::LogAndRescale => {
				scores.iter_mut().for_each(|s| *s = s.max(0.0).ln_1p());
				rescale(scores);
			}
			Normalization::ToProb => {
				let sum: f64 = scores.iter().sum();
				if sum > 0.0 {
					scores.iter_mut().for_each(|s| *s /= sum);
				} else {
					scores.iter_mut().for_each(|s| *s = 0.0);
				}
			}
		}
	}
}

fn bounds(scores: &[f64]) -> (f64, f64) {
	scores
		.iter()
		.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), s| (min.min(*s), max.max(*s)))
}

fn has_range(scores: &[f64]) -> bool {
	let (min, max) = bounds(scores);
	max > min
}

fn rescale(scores: &mut [f64]) {
	let (min, max) = bounds(scores);
	if max > min {
		let range = max - min;
		scores.iter_mut().for_each(|s| *s = (*s - min) / range);
	} else {
		scores.iter_mut().for_each(|s| *s = 0.0);
	}
}
