use ndarray::{ArrayView1, ArrayView2, Axis};

use ml_core::{column_quantiles, column_std, column_var};

use crate::logger::Logger;
use crate::metrics::MseMetrics;

/// Formats a vector as `<v1, v2, ...> (norm) (mean)` with every number
/// right-aligned to at least `width` characters.
pub fn format_stats(values: &[f32], width: usize) -> String {
    let cells: Vec<String> = values.iter().map(|v| format!("{v:>width$.6}")).collect();
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    let mean = values.iter().sum::<f32>() / values.len().max(1) as f32;
    format!(
        "<{}> ({norm:>width$.6}) ({mean:>width$.6})",
        cells.join(", ")
    )
}

/// Formats a list of names as `<name1, name2, ...>` with the same alignment
/// as [`format_stats`].
pub fn format_names(names: &[String], width: usize) -> String {
    let cells: Vec<String> = names.iter().map(|n| format!("{n:>width$}")).collect();
    format!("<{}>", cells.join(", "))
}

/// Picks a per-number width for a report.
///
/// Starts at 30 when the terminal width is known (13 otherwise) and
/// decreases the width until the longest rendered line fits the terminal
/// and a further decrease stops reducing the count of longest lines, or
/// the width reaches zero.
pub fn fit_width<F>(render: F, terminal_width: Option<usize>) -> usize
where
    F: Fn(usize) -> Vec<String>,
{
    let start = if terminal_width.is_some() { 30 } else { 13 };
    let mut best = start;
    let mut last_longest_count: Option<usize> = None;

    for width in (0..=start).rev() {
        let lines = render(width);
        let longest = lines.iter().map(|l| l.len()).max().unwrap_or(0);
        let longest_count = lines.iter().filter(|l| l.len() >= longest).count();

        let fits = terminal_width.is_none_or(|cols| longest <= cols);
        if fits {
            if let Some(last) = last_longest_count {
                if longest_count < last {
                    break;
                }
            }
        }

        last_longest_count = Some(longest_count);
        best = width;
    }

    best
}

fn stats_of(view: ArrayView1<f32>) -> Vec<f32> {
    view.to_vec()
}

/// Renders the end-of-training summary for a regression run.
pub fn regression_summary_lines(
    metrics: &MseMetrics,
    labels: ArrayView2<f32>,
    label_names: &[String],
    width: usize,
) -> Vec<String> {
    let last_testing = stats_of(metrics.last_testing());
    let last_training = stats_of(metrics.last_training());
    let sqrt_of = |v: &[f32]| v.iter().map(|x| x.sqrt()).collect::<Vec<_>>();

    let mean = labels.mean_axis(Axis(0)).expect("labels are non-empty");
    let var = column_var(labels, 1.0);
    let std = column_std(labels, 1.0);

    let q = |p: f32| column_quantiles(labels, p).to_vec();

    vec![
        String::new(),
        format!(
            "Last testing MSE   (norm) (mean) : {}",
            format_stats(&last_testing, width)
        ),
        format!(
            "Last testing RMSE  (norm) (mean) : {}",
            format_stats(&sqrt_of(&last_testing), width)
        ),
        format!(
            "Last training MSE  (norm) (mean) : {}",
            format_stats(&last_training, width)
        ),
        format!(
            "Last training RMSE (norm) (mean) : {}",
            format_stats(&sqrt_of(&last_training), width)
        ),
        String::new(),
        format!(
            "Label column names               : {}",
            format_names(label_names, width)
        ),
        String::new(),
        format!(
            "All labels mean    (norm) (mean) : {}",
            format_stats(&mean.to_vec(), width)
        ),
        format!(
            "All labels var     (norm) (mean) : {}",
            format_stats(&var.to_vec(), width)
        ),
        format!(
            "All labels stddev  (norm) (mean) : {}",
            format_stats(&std.to_vec(), width)
        ),
        String::new(),
        format!(
            "All labels min     (norm) (mean) : {}",
            format_stats(&q(0.0), width)
        ),
        format!(
            "...1st quartile    (norm) (mean) : {}",
            format_stats(&q(0.25), width)
        ),
        format!(
            "All labels median  (norm) (mean) : {}",
            format_stats(&q(0.5), width)
        ),
        format!(
            "...3rd quartile    (norm) (mean) : {}",
            format_stats(&q(0.75), width)
        ),
        format!(
            "All labels max     (norm) (mean) : {}",
            format_stats(&q(1.0), width)
        ),
    ]
}

/// Auto-fits the width and logs the regression summary.
pub fn print_regression_summary(
    logger: &dyn Logger,
    metrics: &MseMetrics,
    labels: ArrayView2<f32>,
    label_names: &[String],
    terminal_width: Option<usize>,
) {
    let width = fit_width(
        |w| regression_summary_lines(metrics, labels, label_names, w),
        terminal_width,
    );
    for line in regression_summary_lines(metrics, labels, label_names, width) {
        logger.info(&line);
    }
}

/// The terminal width as advertised by the `COLUMNS` environment variable.
pub fn terminal_width() -> Option<usize> {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&cols| cols > 1)
}
