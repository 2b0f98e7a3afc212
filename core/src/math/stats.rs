pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    pub fn min(samples: &[f64]) -> Option<f64> {
        Self::argmin(samples).map(|idx| samples[idx])
    }

    pub fn max(samples: &[f64]) -> Option<f64> {
        Self::argmax(samples).map(|idx| samples[idx])
    }

    /// Index of the smallest value; the first one wins ties, NaN is skipped.
    pub fn argmin(samples: &[f64]) -> Option<usize> {
        Self::arg_by(samples.iter().copied(), |candidate, best| candidate < best)
    }

    /// Index of the largest value; the first one wins ties, NaN is skipped.
    pub fn argmax(samples: &[f64]) -> Option<usize> {
        Self::arg_by(samples.iter().copied(), |candidate, best| candidate > best)
    }

    /// Generic first-wins selection over an iterator of values.
    pub fn arg_by<I, F>(values: I, better: F) -> Option<usize>
    where
        I: IntoIterator<Item = f64>,
        F: Fn(f64, f64) -> bool,
    {
        let mut best: Option<(usize, f64)> = None;
        for (idx, value) in values.into_iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            match best {
                Some((_, current)) if !better(value, current) => {}
                _ => best = Some((idx, value)),
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Axis bound `ceil(max * 1.2)` over the given magnitudes; never below 1.
    pub fn padded_bound<I>(values: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let peak = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        let bound = (peak * 1.2).ceil();
        if bound < 1.0 {
            1.0
        } else {
            bound
        }
    }

    /// Parses a numeric cell such as `"10.2"`, `"12.5 knots"`, `"+15.2%"` or
    /// `"1,204"`. Returns `None` for non-numeric or non-finite text.
    pub fn parse_metric(text: &str) -> Option<f64> {
        let trimmed = text.trim();
        let end = trimmed
            .char_indices()
            .find(|(idx, ch)| {
                !(ch.is_ascii_digit()
                    || *ch == '.'
                    || *ch == ','
                    || ((*ch == '-' || *ch == '+') && *idx == 0)
                    || ((*ch == 'e' || *ch == 'E') && *idx > 0))
            })
            .map(|(idx, _)| idx)
            .unwrap_or(trimmed.len());
        let numeric: String = trimmed[..end].chars().filter(|ch| *ch != ',').collect();
        numeric.parse::<f64>().ok().filter(|value| value.is_finite())
    }
}
