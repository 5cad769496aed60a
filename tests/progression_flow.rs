use pixel_pages_lib::{
    achievements::AchievementId, db::XpSource, events::ProgressEvent,
    progression::TitleVocabulary, registry, AppState,
};

fn unlocked_ids(app_unlocks: &[pixel_pages_lib::db::UnlockedAchievement]) -> Vec<AchievementId> {
    app_unlocks.iter().map(|unlock| unlock.id).collect()
}

#[tokio::test]
async fn fresh_data_dir_is_seeded_with_branches() {
    let dir = tempfile::tempdir().unwrap();
    let app = AppState::open(dir.path()).await.unwrap();

    let progress = app.tracker.category_progress().await.unwrap();
    assert_eq!(progress.len(), TitleVocabulary::Branches.category_keys().count());
    assert!(progress.iter().all(|entry| entry.state.level == 1));
    assert!(progress.iter().all(|entry| entry.state.rank_style.rank_name == "COMMON"));

    let scholar = progress
        .iter()
        .find(|entry| entry.category.name.eq_ignore_ascii_case("scholar"))
        .unwrap();
    assert_eq!(scholar.state.title, "STUDENT");

    let board = app.tracker.achievement_board().await.unwrap();
    assert!(board.iter().all(|status| status.unlocked_at.is_none()));
}

#[tokio::test]
async fn logging_levels_up_and_unlocks_milestones() {
    let dir = tempfile::tempdir().unwrap();
    let app = AppState::open(dir.path()).await.unwrap();
    let mut events = app.tracker.events().subscribe();

    let first = app
        .tracker
        .log_minutes("programming", 200, XpSource::Manual)
        .await
        .unwrap();
    assert_eq!(first.before.level, 1);
    assert_eq!(first.after.level, 3);
    assert_eq!(first.after.title, "PROGRAMMER");
    assert_eq!(first.after.percentage, 47);
    assert_eq!(unlocked_ids(&first.unlocked), [AchievementId::FirstBlood]);

    app.tracker.log_minutes("scholar", 30, XpSource::Manual).await.unwrap();
    let third = app
        .tracker
        .log_minutes("artisan", 30, XpSource::Manual)
        .await
        .unwrap();
    assert_eq!(unlocked_ids(&third.unlocked), [AchievementId::MultiTasker]);

    // 200 + 2745 = 2945, the first minute of level 10.
    let mastery = app
        .tracker
        .log_minutes("programming", 2745, XpSource::Manual)
        .await
        .unwrap();
    assert_eq!(mastery.after.level, 10);
    assert_eq!(mastery.after.title, "HACKER");
    assert_eq!(mastery.after.percentage, 100);
    assert_eq!(mastery.after.rank_style.rank_name, "LEGENDARY");
    assert_eq!(unlocked_ids(&mastery.unlocked), [AchievementId::Perfectionist]);

    // 3005 logged so far; 100 hours is 6000 minutes.
    let grind = app
        .tracker
        .log_minutes("knowledge", 2995, XpSource::Manual)
        .await
        .unwrap();
    assert_eq!(unlocked_ids(&grind.unlocked), [AchievementId::GrindMaster]);
    assert_eq!(app.tracker.db().total_logged_minutes().await.unwrap(), 6000);

    let mut level_ups = 0;
    let mut unlocks = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            ProgressEvent::LevelUp { .. } => level_ups += 1,
            ProgressEvent::AchievementUnlocked { .. } => unlocks += 1,
            _ => {}
        }
    }
    // programming twice, knowledge once
    assert_eq!(level_ups, 3);
    assert_eq!(unlocks, 4);
}

#[tokio::test]
async fn unlocks_survive_reopening_the_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    {
        let app = AppState::open(dir.path()).await.unwrap();
        app.tracker.log_minutes("scribe", 5, XpSource::Manual).await.unwrap();
    }

    let app = AppState::open(dir.path()).await.unwrap();
    assert!(app.tracker.sync_achievements().await.unwrap().is_empty());

    let board = app.tracker.achievement_board().await.unwrap();
    let first_blood = board
        .iter()
        .find(|status| status.id == AchievementId::FirstBlood)
        .unwrap();
    assert!(first_blood.unlocked_at.is_some());

    let scribe = app.tracker.resolve_category("Scribe").await.unwrap();
    assert_eq!(scribe.xp, 5);
}

#[tokio::test]
async fn imported_snapshot_feeds_the_same_progression() {
    let dir = tempfile::tempdir().unwrap();
    let app = AppState::open(dir.path()).await.unwrap();
    app.tracker
        .settings()
        .set_title_vocabulary(TitleVocabulary::Classic)
        .unwrap();

    let records = registry::parse_snapshot(
        r##"[
            {"id": 1, "name": "Study", "xp": 144, "color": "#FFD700"},
            {"id": 2, "name": "Broken", "xp": -5, "color": "#FF0000"},
            {"id": 3, "name": "Gardening", "color": "#00FF00"}
        ]"##,
    )
    .unwrap();
    assert_eq!(records.len(), 2);

    let summary = app.tracker.db().import_snapshot(records).await.unwrap();
    assert_eq!(summary.created, 2);
    assert_eq!(summary.xp_added, 144);

    let study = app.tracker.resolve_category("study").await.unwrap();
    let state = study.level_state(app.tracker.vocabulary());
    assert_eq!(state.level, 3);
    assert_eq!(state.current_level_xp, 0);

    let gardening = app.tracker.resolve_category("gardening").await.unwrap();
    assert_eq!(gardening.xp, 0);
    assert_eq!(gardening.level_state(app.tracker.vocabulary()).title, "LEVEL 1");

    let unlocked = app.tracker.sync_achievements().await.unwrap();
    assert_eq!(unlocked_ids(&unlocked), [AchievementId::FirstBlood]);
}

#[tokio::test]
async fn browser_export_merges_into_seeded_branches() {
    let dir = tempfile::tempdir().unwrap();
    let app = AppState::open(dir.path()).await.unwrap();
    let seeded = app.tracker.resolve_category("Scholar").await.unwrap();

    let records = registry::parse_snapshot(
        r##"[
            {"id": 1, "name": "Scholar", "xp": 120},
            {"id": 2, "name": "programming", "xp": 200, "color": "#FF00FF"}
        ]"##,
    )
    .unwrap();
    let summary = app.tracker.db().import_snapshot(records).await.unwrap();
    assert_eq!(summary.created, 0);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.xp_added, 320);

    let progress = app.tracker.category_progress().await.unwrap();
    assert_eq!(progress.len(), TitleVocabulary::Branches.category_keys().count());

    let scholar = app.tracker.resolve_category("scholar").await.unwrap();
    assert_eq!(scholar.id, seeded.id);
    assert_eq!(scholar.xp, 120);
    assert_eq!(scholar.level_state(app.tracker.vocabulary()).level, 2);

    let programming = app.tracker.resolve_category("Programming").await.unwrap();
    let state = programming.level_state(app.tracker.vocabulary());
    assert_eq!(state.title, "PROGRAMMER");
    assert_eq!(state.percentage, 47);
}
