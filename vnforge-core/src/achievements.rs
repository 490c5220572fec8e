//! Statistics accumulation and achievement unlocking.
//!
//! A monotonic stats record plus a rule-evaluation pass over a static
//! definition table. Definitions are data, not logic: extend
//! [`struct@ACHIEVEMENTS`] freely without touching the tracker.

use crate::storage::{today, KvStore, StorageError};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

const ACHIEVEMENTS_KEY: &str = "achievements";

/// Aggregate counters supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_scenes: u32,
    pub total_screenshots: u32,
    pub ai_generations: u32,
    pub characters_created: u32,

    /// A maximum, not a sum. The tracker performs a plain merge; callers
    /// only send values larger than the current one.
    pub longest_text: u32,

    pub consecutive_days: u32,
}

/// Partial counter update merged by [`AchievementTracker::update_stats`].
#[derive(Debug, Clone, Default)]
pub struct StatsUpdate {
    pub total_scenes: Option<u32>,
    pub total_screenshots: Option<u32>,
    pub ai_generations: Option<u32>,
    pub characters_created: Option<u32>,
    pub longest_text: Option<u32>,
}

impl StatsUpdate {
    pub fn scenes(mut self, count: u32) -> Self {
        self.total_scenes = Some(count);
        self
    }

    pub fn screenshots(mut self, count: u32) -> Self {
        self.total_screenshots = Some(count);
        self
    }

    pub fn ai_generations(mut self, count: u32) -> Self {
        self.ai_generations = Some(count);
        self
    }

    pub fn characters(mut self, count: u32) -> Self {
        self.characters_created = Some(count);
        self
    }

    pub fn longest_text(mut self, length: u32) -> Self {
        self.longest_text = Some(length);
        self
    }
}

/// Counter an achievement's progress is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Screenshots,
    Characters,
    Days,
}

impl Metric {
    fn value(self, stats: &Stats) -> u32 {
        match self {
            Metric::Screenshots => stats.total_screenshots,
            Metric::Characters => stats.characters_created,
            Metric::Days => stats.consecutive_days,
        }
    }
}

/// A static achievement definition: display data plus a pure predicate
/// over [`Stats`].
pub struct AchievementDef {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,

    /// Icon tag consumed by the UI layer.
    pub icon: &'static str,

    pub condition: fn(&Stats) -> bool,

    /// Numeric shape for progress reporting; `None` means all-or-nothing.
    pub target: Option<(Metric, u32)>,
}

lazy_static! {
    /// All achievement definitions, in unlock-evaluation order.
    pub static ref ACHIEVEMENTS: Vec<AchievementDef> = vec![
        AchievementDef {
            id: "first_scene",
            title: "First Encounter",
            description: "Create your first scene",
            icon: "Sparkles",
            condition: |s| s.total_scenes >= 1,
            target: None,
        },
        AchievementDef {
            id: "save_5",
            title: "Keepsake Novice",
            description: "Save 5 screenshots",
            icon: "Camera",
            condition: |s| s.total_screenshots >= 5,
            target: Some((Metric::Screenshots, 5)),
        },
        AchievementDef {
            id: "save_10",
            title: "Chronicler",
            description: "Save 10 screenshots",
            icon: "Camera",
            condition: |s| s.total_screenshots >= 10,
            target: Some((Metric::Screenshots, 10)),
        },
        AchievementDef {
            id: "save_50",
            title: "Screenshot Master",
            description: "Save 50 screenshots",
            icon: "Video",
            condition: |s| s.total_screenshots >= 50,
            target: Some((Metric::Screenshots, 50)),
        },
        AchievementDef {
            id: "use_ai",
            title: "AI Creator",
            description: "Use AI generation for the first time",
            icon: "Bot",
            condition: |s| s.ai_generations >= 1,
            target: None,
        },
        AchievementDef {
            id: "ai_master",
            title: "AI Master",
            description: "Use AI generation 50 times",
            icon: "Brain",
            condition: |s| s.ai_generations >= 50,
            target: None,
        },
        AchievementDef {
            id: "wordsmith",
            title: "Chatterbox",
            description: "Write a single line over 500 characters",
            icon: "MessageSquare",
            condition: |s| s.longest_text >= 500,
            target: None,
        },
        AchievementDef {
            id: "novelist",
            title: "Novelist",
            description: "Write a single line over 1000 characters",
            icon: "BookOpen",
            condition: |s| s.longest_text >= 1000,
            target: None,
        },
        AchievementDef {
            id: "character_creator",
            title: "Character Designer",
            description: "Create 3 characters",
            icon: "UserPlus",
            condition: |s| s.characters_created >= 3,
            target: Some((Metric::Characters, 3)),
        },
        AchievementDef {
            id: "character_master",
            title: "Character Master",
            description: "Create 10 characters",
            icon: "Users",
            condition: |s| s.characters_created >= 10,
            target: Some((Metric::Characters, 10)),
        },
        AchievementDef {
            id: "daily_creator",
            title: "Steady Hand",
            description: "Create on 3 consecutive days",
            icon: "Flame",
            condition: |s| s.consecutive_days >= 3,
            target: Some((Metric::Days, 3)),
        },
        AchievementDef {
            id: "weekly_creator",
            title: "Devoted Author",
            description: "Create on 7 consecutive days",
            icon: "Star",
            condition: |s| s.consecutive_days >= 7,
            target: Some((Metric::Days, 7)),
        },
    ];
}

/// Persisted tracker state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AchievementState {
    /// Unlocked achievement ids. Grows monotonically, never shrinks.
    unlocked: Vec<String>,

    stats: Stats,

    /// UTC day ordinal of the last activity, for the day-streak rule.
    last_active_day: Option<i64>,

    /// Ids unlocked by the most recent evaluation pass, cleared by explicit
    /// acknowledgement.
    newly_unlocked: Vec<String>,
}

/// The achievement/stats tracker.
pub struct AchievementTracker {
    state: AchievementState,
    kv: KvStore,
}

impl AchievementTracker {
    /// Open the tracker, loading persisted state or starting fresh.
    pub async fn open(kv: KvStore) -> Result<Self, StorageError> {
        let state = kv
            .get::<AchievementState>(ACHIEVEMENTS_KEY)
            .await?
            .unwrap_or_default();
        Ok(Self { state, kv })
    }

    pub fn stats(&self) -> &Stats {
        &self.state.stats
    }

    pub fn unlocked(&self) -> &[String] {
        &self.state.unlocked
    }

    pub fn newly_unlocked(&self) -> &[String] {
        &self.state.newly_unlocked
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.state.unlocked.iter().any(|u| u == id)
    }

    /// Merge a partial counter update and run the day-streak rule against
    /// the current calendar day.
    pub fn update_stats(&mut self, update: StatsUpdate) {
        self.update_stats_on(today(), update);
    }

    /// [`Self::update_stats`] with an explicit day, for deterministic
    /// tests.
    ///
    /// Streak rule: no-op if already active today; +1 if the previous
    /// active day was exactly yesterday; reset to 1 otherwise, including
    /// the first-ever call.
    pub fn update_stats_on(&mut self, day: i64, update: StatsUpdate) {
        let stats = &mut self.state.stats;
        if let Some(count) = update.total_scenes {
            stats.total_scenes = count;
        }
        if let Some(count) = update.total_screenshots {
            stats.total_screenshots = count;
        }
        if let Some(count) = update.ai_generations {
            stats.ai_generations = count;
        }
        if let Some(count) = update.characters_created {
            stats.characters_created = count;
        }
        if let Some(length) = update.longest_text {
            stats.longest_text = length;
        }

        if self.state.last_active_day != Some(day) {
            let was_yesterday = self.state.last_active_day == Some(day - 1);
            self.state.stats.consecutive_days = if was_yesterday {
                self.state.stats.consecutive_days + 1
            } else {
                1
            };
            self.state.last_active_day = Some(day);
        }
    }

    /// Evaluate every definition against current stats; newly satisfied
    /// ones unlock permanently and join the notification queue.
    ///
    /// Idempotent under unchanged stats: already-unlocked ids are never
    /// re-evaluated.
    pub fn check_achievements(&mut self) -> Vec<&'static AchievementDef> {
        let defs: &'static [AchievementDef] = &ACHIEVEMENTS;
        let mut fresh = Vec::new();

        for def in defs {
            if self.is_unlocked(def.id) {
                continue;
            }
            if (def.condition)(&self.state.stats) {
                self.state.unlocked.push(def.id.to_string());
                self.state.newly_unlocked.push(def.id.to_string());
                fresh.push(def);
            }
        }

        fresh
    }

    /// Acknowledge the notification queue. Does not affect `unlocked`.
    pub fn clear_newly_unlocked(&mut self) {
        self.state.newly_unlocked.clear();
    }

    /// Progress toward an achievement, 0-100.
    ///
    /// Unlocked achievements report 100; definitions without a numeric
    /// shape report 0 until unlocked.
    pub fn progress(&self, id: &str) -> u8 {
        let Some(def) = ACHIEVEMENTS.iter().find(|d| d.id == id) else {
            return 0;
        };
        if self.is_unlocked(id) {
            return 100;
        }
        match def.target {
            Some((metric, target)) => {
                let percent = u64::from(metric.value(&self.state.stats)) * 100 / u64::from(target);
                percent.min(100) as u8
            }
            None => 0,
        }
    }

    pub fn unlocked_count(&self) -> usize {
        self.state.unlocked.len()
    }

    pub fn total_count() -> usize {
        ACHIEVEMENTS.len()
    }

    /// Persist tracker state.
    pub async fn save(&self) -> Result<(), StorageError> {
        self.kv.put(ACHIEVEMENTS_KEY, &self.state).await
    }
}
