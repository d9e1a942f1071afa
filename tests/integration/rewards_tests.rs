// Points ledger, badge evaluation and weekly goal progress

use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use heartnote_app_lib::db::DbPool;
use heartnote_app_lib::models::diary::{CreateDiaryEntryRequest, Emotion};
use heartnote_app_lib::models::goal::CreateWeeklyGoalRequest;
use heartnote_app_lib::models::reward::{BadgeContext, BadgeDefinition};
use heartnote_app_lib::services::diary_service::DiaryService;
use heartnote_app_lib::services::goal_service::GoalService;
use heartnote_app_lib::services::reward_service::{BadgeRegistry, RewardService};
use heartnote_app_lib::services::settings_service::SettingsService;
use tempfile::tempdir;

struct Fixture {
    pool: DbPool,
    settings: Arc<SettingsService>,
    rewards: Arc<RewardService>,
    diary: DiaryService,
    goals: GoalService,
    _dir: tempfile::TempDir,
}

fn setup() -> Fixture {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("rewards.sqlite")).expect("db pool");
    let settings = Arc::new(SettingsService::new(pool.clone()));
    let rewards = Arc::new(RewardService::new(pool.clone(), Arc::clone(&settings)));
    let diary = DiaryService::new(pool.clone(), Arc::clone(&settings), Arc::clone(&rewards));
    let goals = GoalService::new(pool.clone());
    Fixture {
        pool,
        settings,
        rewards,
        diary,
        goals,
        _dir: dir,
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).expect("date")
}

fn entry_on(fixture: &Fixture, d: u32) {
    fixture
        .diary
        .create_entry(CreateDiaryEntryRequest {
            user_id: "kid-1".to_string(),
            emotion: Emotion::Calm,
            description: "Read a book".to_string(),
            intensity: 2,
            occurred_at: DateTime::parse_from_rfc3339(&format!("2024-06-{d:02}T10:00:00+00:00"))
                .expect("rfc3339"),
        })
        .expect("create entry");
}

#[test]
fn ledger_keeps_history_and_balance() {
    let fixture = setup();
    assert_eq!(fixture.rewards.total_points("kid-1").unwrap(), 0);

    assert_eq!(fixture.rewards.award_points("kid-1", 15, "welcome").unwrap(), 15);
    assert_eq!(fixture.rewards.award_points("kid-1", -5, "correction").unwrap(), 10);
    assert!(fixture
        .rewards
        .award_points("kid-1", 5, "   ")
        .unwrap_err()
        .is_validation());

    let history = fixture.rewards.points_history("kid-1", 10).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(fixture.rewards.total_points("kid-2").unwrap(), 0);
}

#[test]
fn badges_are_awarded_once_with_bonus_points() {
    let fixture = setup();
    entry_on(&fixture, 8);
    entry_on(&fixture, 9);
    entry_on(&fixture, 10);

    let earned = fixture.rewards.evaluate_badges("kid-1", day(10)).unwrap();
    let ids = earned.iter().map(|badge| badge.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["first_entry", "streak_3"]);

    // 3 entries x 10 points + 5 + 15 bonus.
    assert_eq!(fixture.rewards.total_points("kid-1").unwrap(), 50);

    assert!(fixture
        .rewards
        .evaluate_badges("kid-1", day(10))
        .unwrap()
        .is_empty());
    let summary = fixture.rewards.summary("kid-1").unwrap();
    assert_eq!(summary.badges.len(), 2);
    assert_eq!(summary.total_points, 50);
}

#[test]
fn completed_goal_unlocks_goal_badge() {
    let fixture = setup();
    let goal = fixture
        .goals
        .create_goal(CreateWeeklyGoalRequest {
            user_id: "kid-1".to_string(),
            title: "Walk the dog".to_string(),
            target_count: 2,
            week_of: day(12),
        })
        .unwrap();

    fixture.goals.record_progress(&goal.id, day(10)).unwrap();
    assert!(fixture
        .rewards
        .evaluate_badges("kid-1", day(12))
        .unwrap()
        .is_empty());

    fixture.goals.record_progress(&goal.id, day(11)).unwrap();
    let earned = fixture.rewards.evaluate_badges("kid-1", day(12)).unwrap();
    assert_eq!(earned.len(), 1);
    assert_eq!(earned[0].id, "first_goal");

    let listed = fixture.goals.list_goals_with_progress("kid-1", day(9)).unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].is_completed);
}

#[test]
fn custom_registry_replaces_the_default_catalogue() {
    let fixture = setup();
    let mut registry = BadgeRegistry::new();
    registry.register(
        BadgeDefinition {
            id: "early_bird".to_string(),
            title: "Early Bird".to_string(),
            description: "Collected any points".to_string(),
            points: 1,
        },
        |ctx: &BadgeContext| ctx.total_points > 0,
    );
    let rewards = RewardService::with_registry(
        fixture.pool.clone(),
        Arc::clone(&fixture.settings),
        registry,
    );

    assert_eq!(rewards.catalogue().len(), 1);
    assert!(rewards.evaluate_badges("kid-1", day(10)).unwrap().is_empty());

    rewards.award_points("kid-1", 3, "manual").unwrap();
    let earned = rewards.evaluate_badges("kid-1", day(10)).unwrap();
    assert_eq!(earned[0].id, "early_bird");
    assert_eq!(rewards.total_points("kid-1").unwrap(), 4);
}
