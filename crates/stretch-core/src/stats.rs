// ── Percentile helper ─────────────────────────────────────────────────────────

/// Compute the `p`-th percentile of a **sorted** slice using standard linear
/// interpolation (the same algorithm used by NumPy's `percentile` function).
///
/// Returns `NaN` for an empty slice.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return f64::NAN;
    }
    let len = sorted_data.len();
    if len == 1 {
        return sorted_data[0];
    }
    let rank = (p / 100.0) * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted_data[lo];
    }
    let frac = rank - lo as f64;
    sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo])
}

// ── NaN-skipping reductions ───────────────────────────────────────────────────

/// Arithmetic mean of the non-NaN values, `None` when there are none.
pub fn nan_mean(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Median of the non-NaN values, `None` when there are none.
///
/// Even-length inputs average the two middle values.
pub fn nan_median(values: &[f64]) -> Option<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(|a, b| a.total_cmp(b));
    Some(percentile(&finite, 50.0))
}

/// Index of the largest non-NaN value; the first one wins on ties.
pub fn nan_argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

// ── Grids ─────────────────────────────────────────────────────────────────────

/// `n` evenly spaced samples over `[start, stop]`, endpoints included.
///
/// Mirrors NumPy's `linspace`: `n == 1` yields `[start]`, `n == 0` nothing.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        stop
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

/// Stretching-ratio steps `1 + linspace(-max_stretch, max_stretch, n_steps)`.
pub fn stretch_grid(max_stretch: f64, n_steps: usize) -> Vec<f64> {
    linspace(-max_stretch, max_stretch, n_steps)
        .into_iter()
        .map(|d| 1.0 + d)
        .collect()
}

/// Convert a stretching ratio to a percentage velocity change.
pub fn ratio_to_percent(ratio: f64) -> f64 {
    (ratio - 1.0) * 100.0
}

// ── Tests ─────────────────────────────────────────────────────────────────────
