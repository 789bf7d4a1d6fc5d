use crate::domain::model::{BurndownPoint, BurndownSource, MetricsSettings};

/// Synthetic burndown used when the backend keeps no daily history.
///
/// `planned` is the ideal straight line over the whole sprint. `actual` is a
/// heuristic: it burns `completed_items * factor` points spread linearly over
/// the charted days, so it counts items, not points. The series has
/// `min(total_days, max_days) + 1` entries, numbered from day 1.
pub fn synthetic_burndown(
    total_points: f64,
    completed_items: usize,
    total_days: u32,
    settings: &MetricsSettings,
) -> Vec<BurndownPoint> {
    let total_days = total_days.max(1);
    let max_days = (total_days as usize).min(settings.burndown_max_days.max(1));
    let daily_burn = total_points / total_days as f64;

    (0..=max_days)
        .map(|i| {
            let day = i as f64;
            let planned_remaining = (total_points - daily_burn * day).max(0.0);
            let progress = (day / max_days as f64).min(1.0);
            let actual_remaining = (total_points
                - completed_items as f64 * progress * settings.completed_progress_factor)
                .max(0.0);

            BurndownPoint {
                day: i as u32 + 1,
                planned: planned_remaining.round() as u64,
                actual: actual_remaining.round() as u64,
            }
        })
        .collect()
}

/// Prefers the backend's recorded snapshots (ordered by day) when allowed and
/// available, otherwise falls back to [`synthetic_burndown`].
pub fn select_burndown(
    recorded: &[BurndownPoint],
    total_points: f64,
    completed_items: usize,
    total_days: u32,
    settings: &MetricsSettings,
) -> (Vec<BurndownPoint>, BurndownSource) {
    if settings.prefer_backend_burndown && !recorded.is_empty() {
        let mut points = recorded.to_vec();
        points.sort_by_key(|point| point.day);
        return (points, BurndownSource::Backend);
    }

    (
        synthetic_burndown(total_points, completed_items, total_days, settings),
        BurndownSource::Synthetic,
    )
}
