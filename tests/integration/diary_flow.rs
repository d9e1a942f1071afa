// Diary wizard, streaks and emotion summaries against a real database

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate};
use heartnote_app_lib::commands::diary::{diary_create, diary_list};
use heartnote_app_lib::commands::AppState;
use heartnote_app_lib::db::DbPool;
use heartnote_app_lib::models::diary::{DiaryDraft, DraftStep, Emotion};
use heartnote_app_lib::services::diary_service::DiaryService;
use heartnote_app_lib::services::reward_service::RewardService;
use heartnote_app_lib::services::settings_service::{SettingsService, SettingsUpdateInput};
use tempfile::tempdir;

fn setup() -> (DiaryService, Arc<SettingsService>, Arc<RewardService>, tempfile::TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("diary.sqlite")).expect("db pool");
    let settings = Arc::new(SettingsService::new(pool.clone()));
    let rewards = Arc::new(RewardService::new(pool.clone(), Arc::clone(&settings)));
    let diary = DiaryService::new(pool, Arc::clone(&settings), Arc::clone(&rewards));
    (diary, settings, rewards, dir)
}

fn at(value: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(value).expect("rfc3339")
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).expect("date")
}

fn write(diary: &DiaryService, emotion: Emotion, occurred_at: &str) {
    let mut draft = DiaryDraft::new("kid-1");
    draft.select_emotion(emotion);
    draft.describe("Played outside with friends").expect("describe");
    draft.set_intensity(3).expect("intensity");
    let request = draft.finish(at(occurred_at)).expect("finish");
    diary.create_entry(request).expect("create entry");
}

#[test]
fn wizard_walks_through_steps_in_order() {
    let mut draft = DiaryDraft::new("kid-1");
    assert_eq!(draft.step(), DraftStep::SelectEmotion);
    assert!(draft.describe("too early").is_err());

    draft.select_emotion(Emotion::Happy);
    draft.describe("  Sunny day  ").unwrap();
    assert_eq!(draft.step(), DraftStep::SetIntensity);
    assert!(draft.set_intensity(6).is_err());
    draft.set_intensity(4).unwrap();
    assert_eq!(draft.step(), DraftStep::Ready);

    draft.select_emotion(Emotion::Tired);
    assert_eq!(draft.step(), DraftStep::Describe);
    assert!(draft.clone().finish(at("2024-06-10T10:00:00+00:00")).is_err());
}

#[test]
fn streak_counts_consecutive_days_once_each() {
    let (diary, _settings, _rewards, _dir) = setup();
    write(&diary, Emotion::Happy, "2024-06-08T09:00:00+02:00");
    write(&diary, Emotion::Calm, "2024-06-09T09:00:00+02:00");
    write(&diary, Emotion::Sad, "2024-06-10T08:00:00+02:00");
    write(&diary, Emotion::Happy, "2024-06-10T20:00:00+02:00");

    let streak = diary.user_streak("kid-1", day(10)).unwrap();
    assert_eq!(streak.current_streak, 3);
    assert_eq!(streak.longest_streak, 3);
    assert_eq!(streak.last_entry_date, Some(day(10)));

    let later = diary.user_streak("kid-1", day(12)).unwrap();
    assert_eq!(later.current_streak, 0);
    assert_eq!(later.longest_streak, 3);
}

#[test]
fn zone_policy_moves_late_entries_to_the_next_day() {
    let (diary, settings, _rewards, _dir) = setup();
    // 23:30 UTC on the 9th is already the 10th in Berlin.
    write(&diary, Emotion::Worried, "2024-06-09T23:30:00+00:00");

    assert_eq!(
        diary.user_streak("kid-1", day(10)).unwrap().last_entry_date,
        Some(day(9))
    );

    settings
        .update(SettingsUpdateInput {
            timezone_policy: Some("Europe/Berlin".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(
        diary.user_streak("kid-1", day(10)).unwrap().last_entry_date,
        Some(day(10))
    );
}

#[test]
fn summary_counts_every_emotion_in_range() {
    let (diary, _settings, _rewards, _dir) = setup();
    write(&diary, Emotion::Happy, "2024-06-01T12:00:00+00:00");
    write(&diary, Emotion::Happy, "2024-06-05T12:00:00+00:00");
    write(&diary, Emotion::Angry, "2024-06-06T12:00:00+00:00");
    write(&diary, Emotion::Happy, "2024-06-20T12:00:00+00:00");

    let summary = diary.emotion_summary("kid-1", day(1), day(10)).unwrap();
    assert_eq!(summary.len(), Emotion::ALL.len());
    let count = |emotion: Emotion| {
        summary
            .iter()
            .find(|row| row.emotion == emotion)
            .map(|row| row.count)
            .unwrap()
    };
    assert_eq!(count(Emotion::Happy), 2);
    assert_eq!(count(Emotion::Angry), 1);
    assert_eq!(count(Emotion::Scared), 0);

    assert!(diary
        .emotion_summary("kid-1", day(10), day(1))
        .unwrap_err()
        .is_validation());
}

#[test]
fn entries_earn_configured_points() {
    let (diary, settings, rewards, _dir) = setup();
    write(&diary, Emotion::Happy, "2024-06-01T12:00:00+00:00");
    assert_eq!(rewards.total_points("kid-1").unwrap(), 10);

    settings
        .update(SettingsUpdateInput {
            points_per_entry: Some(0),
            ..Default::default()
        })
        .unwrap();
    write(&diary, Emotion::Happy, "2024-06-02T12:00:00+00:00");
    assert_eq!(rewards.total_points("kid-1").unwrap(), 10);
}

#[tokio::test]
async fn create_command_reports_first_badge() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("commands.sqlite")).expect("db pool");
    let state = AppState::new(pool).expect("app state");

    let mut draft = DiaryDraft::new("kid-1");
    draft.select_emotion(Emotion::Excited);
    draft.describe("Got a new puppy").unwrap();
    draft.set_intensity(5).unwrap();
    let request = draft.finish(at("2024-06-10T18:00:00+02:00")).unwrap();

    let created = diary_create(&state, request).await.expect("diary create");
    assert_eq!(created.entry.emotion, Emotion::Excited);
    assert!(created
        .new_badges
        .iter()
        .any(|badge| badge.id == "first_entry"));

    let listed = diary_list(&state, "kid-1".to_string(), None)
        .await
        .expect("diary list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.entry.id);
}
