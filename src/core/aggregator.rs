use crate::core::burndown::select_burndown;
use crate::core::workload::derive_workload;
use crate::domain::model::{
    BacklogItem, BugStats, BurndownPoint, ItemStatus, ItemType, ItemTypeCounts, MetricsSettings,
    Sprint, SprintMetrics, SprintSnapshot, TeamMember,
};
use crate::domain::ports::Clock;
use chrono::{DateTime, Utc};

const DAY_MS: f64 = 86_400_000.0;

/// Day counters of a sprint relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SprintTimeline {
    pub total_days: u32,
    pub days_elapsed: u32,
    pub days_remaining: u32,
    pub is_overdue: bool,
}

fn ceil_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    ((to - from).num_milliseconds() as f64 / DAY_MS).ceil() as i64
}

impl SprintTimeline {
    /// Missing dates never fail: no start/end gives one total day, no start
    /// gives zero elapsed days, no end is never overdue.
    pub fn compute(sprint: &Sprint, now: DateTime<Utc>) -> Self {
        let total_days = match (sprint.start_date, sprint.end_date) {
            (Some(start), Some(end)) => ceil_days(start, end).max(1),
            _ => 1,
        };
        let days_elapsed = sprint
            .start_date
            .map(|start| ceil_days(start, now).max(0))
            .unwrap_or(0);
        let is_overdue = sprint.end_date.is_some_and(|end| now > end);

        Self {
            total_days: total_days.min(u32::MAX as i64) as u32,
            days_elapsed: days_elapsed.min(u32::MAX as i64) as u32,
            days_remaining: (total_days - days_elapsed).max(0).min(u32::MAX as i64) as u32,
            is_overdue,
        }
    }
}

#[derive(Debug, Default)]
struct StatusTally {
    completed: usize,
    in_progress: usize,
    remaining: usize,
    total_points: f64,
    completed_points: f64,
    by_type: ItemTypeCounts,
    bugs: BugStats,
}

impl StatusTally {
    fn from_items(items: &[BacklogItem]) -> Self {
        let mut tally = Self::default();
        for item in items {
            tally.total_points += item.story_points;
            tally.by_type.record(item.item_type);

            match item.status {
                ItemStatus::Completed => {
                    tally.completed += 1;
                    tally.completed_points += item.story_points;
                }
                ItemStatus::InProgress => tally.in_progress += 1,
                ItemStatus::Pending => tally.remaining += 1,
            }

            if item.item_type == ItemType::Bug {
                tally.bugs.total += 1;
                match item.status {
                    ItemStatus::Completed => tally.bugs.resolved += 1,
                    ItemStatus::InProgress => tally.bugs.in_progress += 1,
                    ItemStatus::Pending => tally.bugs.open += 1,
                }
            }
        }
        tally
    }
}

/// Turns a sprint plus its backlog items into display-ready metrics.
///
/// Pure apart from the injected clock: the same inputs and the same "now"
/// always give the same output.
#[derive(Debug, Clone, Default)]
pub struct SprintMetricsAggregator {
    settings: MetricsSettings,
}

impl SprintMetricsAggregator {
    pub fn new(settings: MetricsSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MetricsSettings {
        &self.settings
    }

    pub fn compute<C: Clock + ?Sized>(
        &self,
        sprint: &Sprint,
        items: &[BacklogItem],
        clock: &C,
    ) -> SprintMetrics {
        self.compute_at(sprint, items, clock.now())
    }

    pub fn compute_at(
        &self,
        sprint: &Sprint,
        items: &[BacklogItem],
        now: DateTime<Utc>,
    ) -> SprintMetrics {
        self.build(sprint, items, &[], &[], None, now)
    }

    /// Like [`compute_at`](Self::compute_at) but also uses the roster,
    /// the backend's recorded burndown and its bug statistics.
    pub fn compute_snapshot(&self, snapshot: &SprintSnapshot, now: DateTime<Utc>) -> SprintMetrics {
        self.build(
            &snapshot.sprint,
            &snapshot.items,
            &snapshot.team,
            &snapshot.burndown,
            snapshot.bug_stats,
            now,
        )
    }

    fn build(
        &self,
        sprint: &Sprint,
        items: &[BacklogItem],
        roster: &[TeamMember],
        recorded_burndown: &[BurndownPoint],
        reported_bugs: Option<BugStats>,
        now: DateTime<Utc>,
    ) -> SprintMetrics {
        let tally = StatusTally::from_items(items);
        let timeline = SprintTimeline::compute(sprint, now);
        let planned = items.len();

        let completion_percentage = if planned == 0 {
            0
        } else {
            (tally.completed as f64 * 100.0 / planned as f64).round() as u32
        };

        let (burndown_data, burndown_source) = select_burndown(
            recorded_burndown,
            tally.total_points,
            tally.completed,
            timeline.total_days,
            &self.settings,
        );

        let bug_stats = reported_bugs.or_else(|| (tally.bugs.total > 0).then_some(tally.bugs));

        SprintMetrics {
            sprint_id: sprint.id.clone(),
            sprint_name: sprint.name.clone(),
            goal: sprint.goal.clone(),
            status: sprint.status,
            planned,
            completed: tally.completed,
            in_progress: tally.in_progress,
            remaining: tally.remaining,
            completion_percentage,
            total_story_points: tally.total_points,
            completed_story_points: tally.completed_points,
            velocity: tally.completed_points,
            total_days: timeline.total_days,
            days_elapsed: timeline.days_elapsed,
            days_remaining: timeline.days_remaining,
            is_overdue: timeline.is_overdue,
            burndown_data,
            burndown_source,
            team_members: derive_workload(items, roster),
            items_by_type: tally.by_type,
            bug_stats,
            generated_at: now,
        }
    }
}
