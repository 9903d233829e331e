use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::io::layout::DataLayout;
use crate::io::ledger_io::{LedgerError, load_project_summary};
use crate::llm::{LlmError, TextModel, extract_json_object};
use crate::model::project::{ProjectSummary, TargetDate};
use crate::model::task::Status;
use crate::ops::dashboard::{Dashboard, aggregate};

const SUMMARY_MAX_TOKENS: u32 = 512;

/// Quotes rotated through by day of year when no model writes one
const QUOTES: &[&str] = &[
    "We are what we repeatedly do. Excellence, then, is not an act, but a habit. - Will Durant",
    "The secret of getting ahead is getting started. - Mark Twain",
    "Hard choices, easy life. Easy choices, hard life. - Jerzy Gregorek",
    "A ship in harbor is safe, but that is not what ships are built for. - John A. Shedd",
    "We must all suffer from one of two pains: the pain of discipline or the pain of regret. - Jim Rohn",
    "What you seek is seeking you. - Rumi",
    "Between stimulus and response there is a space. In that space is our freedom and our power to choose. - Viktor Frankl",
    "You may encounter many defeats, but you must not be defeated. - Maya Angelou",
    "Knowing is not enough; we must apply. Wishing is not enough; we must do. - Johann Wolfgang von Goethe",
    "You can choose courage or you can choose comfort. You cannot have both. - Brene Brown",
    "Believe you can and you're halfway there. - Theodore Roosevelt",
    "Life shrinks or expands in proportion to one's courage. - Anais Nin",
    "You do not rise to the level of your goals. You fall to the level of your systems. - James Clear",
    "Every action you take is a vote for the type of person you wish to become. - James Clear",
    "Perfection is not attainable, but if we chase perfection we can catch excellence. - Vince Lombardi",
    "The best time to plant a tree was 20 years ago. The second best time is now. - Chinese Proverb",
    "Fall seven times, stand up eight. - Japanese Proverb",
    "Smooth seas do not make skillful sailors. - African Proverb",
    "The journey of a thousand miles begins with a single step. - Lao Tzu",
    "Amateurs sit and wait for inspiration, the rest of us just get up and go to work. - Stephen King",
    "It does not matter how slowly you go as long as you do not stop. - Confucius",
    "What we fear doing most is usually what we most need to do. - Tim Ferriss",
    "Focus is a matter of deciding what things you're not going to do. - John Carmack",
    "The scariest moment is always just before you start. - Stephen King",
    "The world breaks everyone, and afterward, many are strong at the broken places. - Ernest Hemingway",
    "Only in the darkness can you see the stars. - Martin Luther King Jr.",
    "Our greatest glory is not in never falling, but in rising every time we fall. - Confucius",
    "You have power over your mind, not outside events. Realize this, and you will find strength. - Marcus Aurelius",
];

const TONES: &[&str] = &[
    "encouraging and warm",
    "direct and action-oriented",
    "reflective and thoughtful",
    "energetic and motivating",
    "calm and strategic",
];

/// Counts computed from the ledgers; a model never computes these
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub overdue: usize,
    pub due_today: usize,
    pub due_this_week: usize,
    pub in_progress: usize,
    pub total_active: usize,
    pub completed_this_week: usize,
}

impl DailyStats {
    pub fn from_dashboard(dashboard: &Dashboard) -> DailyStats {
        let b = &dashboard.buckets;
        let active = || {
            b.overdue
                .iter()
                .chain(&b.today)
                .chain(&b.this_week)
                .chain(&b.later)
                .chain(&b.unscheduled)
        };
        DailyStats {
            overdue: b.overdue.len(),
            due_today: b.today.len(),
            due_this_week: b.this_week.len(),
            in_progress: active().filter(|t| t.status == Status::InProgress).count(),
            total_active: active().count(),
            completed_this_week: dashboard.completed_this_week.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub narrative: String,
    pub quote: String,
    pub stats: DailyStats,
    pub highlights: Vec<String>,
}

/// The JSON a model is asked to return
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratedSummary {
    #[serde(default)]
    pub narrative: String,
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

pub fn quote_for(date: NaiveDate) -> &'static str {
    QUOTES[date.ordinal() as usize % QUOTES.len()]
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Days until a dated target, if it falls within the coming week
fn days_to_target(project: &ProjectSummary, today: NaiveDate) -> Option<i64> {
    match project.target_date {
        Some(TargetDate::Date(target)) => {
            let days = (target - today).num_days();
            (0..=7).contains(&days).then_some(days)
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Canned summary
// ---------------------------------------------------------------------------

/// Stats-driven narrative used without a model
pub fn canned_narrative(stats: &DailyStats, projects: &[ProjectSummary], today: NaiveDate) -> String {
    let mut parts = Vec::new();

    match stats.completed_this_week {
        0 => {}
        n if n >= 5 => parts.push(format!(
            "{n} tasks knocked out this week. Keep that momentum going."
        )),
        n => parts.push(format!(
            "{n} task{} done this week. Every rep counts. Stack another one today.",
            plural(n)
        )),
    }
    match stats.overdue {
        0 => {}
        1 => parts.push(
            "One task slipped past its deadline. No guilt, just handle it first and move forward."
                .to_string(),
        ),
        n => parts.push(format!(
            "{n} tasks overdue. Pick the easiest one and knock it out right now."
        )),
    }
    match stats.due_today {
        0 => {}
        1 => parts.push("One thing due today. Give it your full focus and own it.".to_string()),
        n => parts.push(format!(
            "{n} tasks due today. You've handled harder days. Go one at a time."
        )),
    }
    for project in projects {
        if let Some(days) = days_to_target(project, today) {
            let when = if days == 0 {
                "today".to_string()
            } else {
                format!("in {days} day{}", plural(days as usize))
            };
            parts.push(format!("{} deadline is {when}. Stay locked in.", project.name));
        }
    }

    if parts.is_empty() {
        parts.push(
            "Nothing urgent today. Use this space to think ahead or level up on something that matters to you."
                .to_string(),
        );
    }
    parts.join(" ")
}

// ---------------------------------------------------------------------------
// Generated summary
// ---------------------------------------------------------------------------

pub fn summary_prompt(
    dashboard: &Dashboard,
    stats: &DailyStats,
    projects: &[ProjectSummary],
) -> String {
    let today = dashboard.date;
    let b = &dashboard.buckets;
    let mut facts = vec![
        format!("TODAY: {}, {}", today.format("%A"), today),
        format!(
            "STATS: {} overdue, {} due today, {} due this week, {} total active, {} completed this week",
            stats.overdue, stats.due_today, stats.due_this_week, stats.total_active, stats.completed_this_week
        ),
    ];
    if b.overdue.is_empty() {
        facts.push("No overdue tasks.".to_string());
    } else {
        let lines: Vec<String> = b
            .overdue
            .iter()
            .map(|t| {
                let due = t.due.map(|d| d.to_string()).unwrap_or_default();
                format!("  - \"{}\" ({}, priority: {}, due: {})", t.title, t.project, t.priority, due)
            })
            .collect();
        facts.push(format!("OVERDUE TASKS:\n{}", lines.join("\n")));
    }
    if b.today.is_empty() {
        facts.push("Nothing due today.".to_string());
    } else {
        let lines: Vec<String> = b
            .today
            .iter()
            .map(|t| format!("  - \"{}\" ({}, priority: {})", t.title, t.project, t.priority))
            .collect();
        facts.push(format!("DUE TODAY:\n{}", lines.join("\n")));
    }
    if dashboard.completed_this_week.is_empty() {
        facts.push("No completions this week yet.".to_string());
    } else {
        let titles: Vec<String> = dashboard
            .completed_this_week
            .iter()
            .map(|t| format!("\"{}\"", t.title))
            .collect();
        facts.push(format!("COMPLETED THIS WEEK: {}", titles.join(", ")));
    }
    if !projects.is_empty() {
        let lines: Vec<String> = projects
            .iter()
            .map(|p| {
                let done = p.milestones.iter().filter(|m| m.done).count();
                let target = match &p.target_date {
                    Some(TargetDate::Date(d)) => format!(" (target: {d})"),
                    _ => String::new(),
                };
                format!(
                    "  - {}: {}{} ({}/{} milestones done)",
                    p.name,
                    p.goal.as_deref().unwrap_or("No goal set"),
                    target,
                    done,
                    p.milestones.len()
                )
            })
            .collect();
        facts.push(format!("ACTIVE PROJECTS:\n{}", lines.join("\n")));
    }

    let seed = today.ordinal();
    let tone = TONES[seed as usize % TONES.len()];
    format!(
        "You are a thoughtful productivity coach writing a personalized morning briefing. Your tone today should be {tone}.\n\n\
         Help this person feel grounded and clear about their direction. Do not list individual task names; \
         talk about how their projects are progressing and what deserves focus today. If things are overdue, \
         be honest but kind. Keep the narrative to 2-4 sentences and include exactly one fitting quote.\n\n\
         CONTEXT:\n{}\n\n\
         Seed for variety: {seed}\n\n\
         Return ONLY valid JSON (no other text):\n\
         {{\n  \"narrative\": \"2-4 sentence briefing\",\n  \"quote\": \"A relevant quote - Author\",\n  \"highlights\": [\"2-3 high-level observations\"]\n}}",
        facts.join("\n\n")
    )
}

pub fn parse_generated(text: &str) -> Result<GeneratedSummary, LlmError> {
    let json = extract_json_object(text)
        .ok_or_else(|| LlmError::Malformed("no JSON object in summary reply".to_string()))?;
    serde_json::from_str(&json).map_err(|e| LlmError::Malformed(e.to_string()))
}

/// Build the morning summary for `today`. Model failures fall back to the
/// canned narrative and a rotated quote.
pub fn build_summary(
    layout: &DataLayout,
    today: NaiveDate,
    model: Option<&dyn TextModel>,
) -> Result<DailySummary, LedgerError> {
    let dashboard = aggregate(layout, today)?;
    let stats = DailyStats::from_dashboard(&dashboard);
    let projects: Vec<ProjectSummary> = layout
        .project_keys()
        .iter()
        .filter_map(|key| load_project_summary(layout, key))
        .collect();

    let generated = model.and_then(|model| {
        let prompt = summary_prompt(&dashboard, &stats, &projects);
        match model
            .complete(&prompt, SUMMARY_MAX_TOKENS)
            .and_then(|text| parse_generated(&text))
        {
            Ok(g) if !g.narrative.trim().is_empty() => Some(g),
            Ok(_) => {
                tracing::warn!("summary reply had no narrative, using canned summary");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "summary generation failed, using canned summary");
                None
            }
        }
    });

    let summary = match generated {
        Some(g) => DailySummary {
            date: today,
            narrative: g.narrative.trim().to_string(),
            quote: if g.quote.trim().is_empty() {
                quote_for(today).to_string()
            } else {
                g.quote
            },
            stats,
            highlights: g.highlights,
        },
        None => DailySummary {
            date: today,
            narrative: canned_narrative(&stats, &projects, today),
            quote: quote_for(today).to_string(),
            stats,
            highlights: Vec::new(),
        },
    };
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ledger::Month;
    use crate::ops::ledger_ops::{complete_task, insert_task, new_task};
    use crate::ops::project_ops::{NewProject, create_project};
    use tempfile::TempDir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Canned(&'static str);

    impl TextModel for Canned {
        fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    struct Down;

    impl TextModel for Down {
        fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
            Err(LlmError::EmptyResponse)
        }
    }

    fn populated() -> (TempDir, DataLayout, NaiveDate) {
        let tmp = TempDir::new().unwrap();
        let layout = DataLayout::new(tmp.path());
        let today = day(2025, 6, 10);
        create_project(
            &layout,
            &NewProject {
                key: "launch".into(),
                name: Some("Launch Site".into()),
                goal: Some("Ship".into()),
                target: TargetDate::Date(day(2025, 6, 13)),
            },
            today,
        )
        .unwrap();
        let add = |title: &str, due: NaiveDate| {
            insert_task(&layout, "launch", new_task(title, Some(due), day(2025, 6, 1)), Month::of(due))
                .unwrap();
        };
        add("Late", day(2025, 6, 8));
        add("Now", today);
        add("Done", today);
        complete_task(&layout, "launch", "Done", today).unwrap();
        (tmp, layout, today)
    }

    #[test]
    fn stats_and_canned_narrative() {
        let (_tmp, layout, today) = populated();
        let summary = build_summary(&layout, today, None).unwrap();
        assert_eq!(
            summary.stats,
            DailyStats {
                overdue: 1,
                due_today: 1,
                due_this_week: 0,
                in_progress: 0,
                total_active: 2,
                completed_this_week: 1,
            }
        );
        assert_eq!(
            summary.narrative,
            "1 task done this week. Every rep counts. Stack another one today. \
             One task slipped past its deadline. No guilt, just handle it first and move forward. \
             One thing due today. Give it your full focus and own it. \
             Launch Site deadline is in 3 days. Stay locked in."
        );
        assert_eq!(summary.quote, quote_for(today));
        assert!(summary.highlights.is_empty());
    }

    #[test]
    fn quiet_day() {
        let stats = DailyStats::default();
        assert!(canned_narrative(&stats, &[], day(2025, 6, 10)).starts_with("Nothing urgent today."));
    }

    #[test]
    fn model_reply_is_used() {
        let (_tmp, layout, today) = populated();
        let model = Canned(
            "```json\n{\"narrative\": \"Good pace.\", \"quote\": \"Q - A\", \"highlights\": [\"h1\"]}\n```",
        );
        let summary = build_summary(&layout, today, Some(&model)).unwrap();
        assert_eq!(summary.narrative, "Good pace.");
        assert_eq!(summary.quote, "Q - A");
        assert_eq!(summary.highlights, vec!["h1"]);
        assert_eq!(summary.stats.overdue, 1);
    }

    #[test]
    fn model_failure_falls_back() {
        let (_tmp, layout, today) = populated();
        let summary = build_summary(&layout, today, Some(&Down)).unwrap();
        assert_eq!(summary.quote, quote_for(today));
        assert!(summary.narrative.contains("Launch Site deadline"));

        let summary = build_summary(&layout, today, Some(&Canned("not json"))).unwrap();
        assert!(summary.narrative.contains("Launch Site deadline"));
    }

    #[test]
    fn prompt_carries_facts() {
        let (_tmp, layout, today) = populated();
        let dashboard = aggregate(&layout, today).unwrap();
        let stats = DailyStats::from_dashboard(&dashboard);
        let projects = vec![load_project_summary(&layout, "launch").unwrap()];
        let prompt = summary_prompt(&dashboard, &stats, &projects);
        assert!(prompt.contains("TODAY: Tuesday, 2025-06-10"));
        assert!(prompt.contains("\"Late\" (launch, priority: medium, due: 2025-06-08)"));
        assert!(prompt.contains("Launch Site: Ship (target: 2025-06-13) (0/1 milestones done)"));
    }
}
