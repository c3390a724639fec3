//! Simple Moving Average (SMA) and rolling standard deviation.
//!
//! Both use a right-aligned window of `period` values that expands at the
//! start of the series: index i averages the last min(i + 1, period) values.

/// Running-sum SMA with an expanding window before `period` values exist.
pub fn sma(series: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    let mut out = Vec::with_capacity(series.len());
    let mut running = 0.0;

    for (i, &x) in series.iter().enumerate() {
        running += x;
        if i >= period {
            running -= series[i - period];
        }
        let count = if i + 1 >= period { period } else { i + 1 };
        out.push(running / count as f64);
    }

    out
}

/// Population standard deviation over the same expanding window as [`sma`].
pub fn rolling_std(series: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    (0..series.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(period);
            let window = &series[start..=i];
            let n = window.len() as f64;
            let mean = window.iter().sum::<f64>() / n;
            let var = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            var.sqrt()
        })
        .collect()
}
