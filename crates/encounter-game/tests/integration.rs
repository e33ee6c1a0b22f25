//! Integration tests for encounter-game
//!
//! Most tests drive the scripted `MockDriver`. Those marked ignored require
//! Chrome to be installed and available.
//! Run with: cargo test --test integration -- --ignored

use std::collections::BTreeSet;

use encounter_driver::mock::MockDriver;
use encounter_driver::{BrowserConfig, Driver, Element, EokaDriver};
use encounter_game::{
    Credentials, EntityKind, Game, GameSession, Hint, Level, LevelCache, LevelName, ReplayOptions,
    ScrapeOptions, SkipSet, Timing,
};
use serde_json::json;

fn session(driver: MockDriver, domain: &str, game_id: u32) -> GameSession<MockDriver> {
    GameSession::new(driver, domain, game_id, Credentials::new("author", "secret")).with_timing(
        Timing {
            settle_ms: 0,
            level_pause_ms: 0,
        },
    )
}

fn only(kinds: &[EntityKind]) -> SkipSet {
    EntityKind::ALL
        .into_iter()
        .filter(|k| !kinds.contains(k))
        .collect()
}

#[tokio::test]
async fn test_scrape_snapshot_replay() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("spring.json");

    let mut source = MockDriver::new();
    source
        .on_script("txtLevelName_", json!(2))
        .on_script("table.bg_dark')[2]", json!(["PromptEdit.aspx?prid=11"]))
        .on_script("NewPromptTimeoutDays", json!([0, 0, 30, 0]))
        .element("#lnkEdit", Element::default())
        .element(r#"textarea[name="NewPrompt"]"#, Element::with_value("Look north"))
        .element(r#"[name="txtLevelName"]"#, Element::with_value("Harbour"));
    let mut s = session(source, "demo.en.cx", 101);
    let opts = ScrapeOptions {
        skip: only(&[EntityKind::Name, EntityKind::Hints]),
        cache: Some(LevelCache::for_destination(&snapshot)),
        ..Default::default()
    };
    let game = Game::scrape(&mut s, &opts).await.unwrap();
    game.to_file(&snapshot).unwrap();

    assert_eq!(game.n_levels(), 2);
    let first = game.level(1).unwrap();
    assert_eq!(first.name, Some(LevelName::new("Harbour")));
    assert_eq!(first.hints.as_ref().unwrap()[0].hint_text, "Look north");
    assert_eq!(first.answers, None);

    let restored = Game::from_file(&snapshot).unwrap().rebind("copy.en.cx", 555);
    let mut target = session(MockDriver::new(), "copy.en.cx", 555);
    restored
        .replay(&mut target, &ReplayOptions::default())
        .await
        .unwrap();

    let d = target.driver();
    let hint_slots: Vec<&str> = d
        .popups()
        .into_iter()
        .filter(|p| p.contains("PromptEdit"))
        .collect();
    assert_eq!(
        hint_slots,
        vec![
            "GameEditor('./PromptEdit.aspx?gid=555&level=1', 'Prompt_555_1');",
            "GameEditor('./PromptEdit.aspx?gid=555&level=2', 'Prompt_555_2');",
        ]
    );
    assert_eq!(d.popup_depth(), 0);
}

#[tokio::test]
async fn test_resave_subset_keeps_other_levels() {
    let stored = Game::new(
        "demo.en.cx",
        101,
        (1..=3)
            .map(|id| {
                let mut level = Level::new("demo.en.cx", 101, id);
                level.hints = Some(vec![Hint::default()]);
                level
            })
            .collect(),
    );

    let mut driver = MockDriver::new();
    driver
        .on_script("txtLevelName_", json!(3))
        .element(r#"[name="txtLevelName"]"#, Element::with_value("Renamed"));
    let mut s = session(driver, "demo.en.cx", 101);
    let opts = ScrapeOptions {
        levels: Some(BTreeSet::from([2])),
        skip: only(&[EntityKind::Name]),
        ..Default::default()
    };
    let fresh = Game::scrape(&mut s, &opts).await.unwrap();
    let merged = (fresh >> stored).unwrap();

    assert_eq!(merged.level_ids(), BTreeSet::from([1, 2, 3]));
    assert_eq!(merged.level(2).unwrap().hints, None);
    assert_eq!(merged.level(2).unwrap().name, Some(LevelName::new("Renamed")));
    assert!(merged.level(1).unwrap().hints.is_some());
}

/// Check if Chrome is available
fn chrome_available() -> bool {
    eoka::stealth::patcher::find_chrome().is_ok()
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_level_name_through_popup() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let mut driver = EokaDriver::launch(&BrowserConfig {
        headless: true,
        ..Default::default()
    })
    .await
    .expect("launch");
    driver
        .goto(
            r#"data:text/html,<script>function GameEditor(u, n) { window.open("data:text/html,<input name='txtLevelName' value='Harbour'>"); }</script>"#,
        )
        .await
        .expect("goto");

    let name = LevelName::read(&mut driver, 101, 1).await.expect("read name");
    assert_eq!(name, LevelName::new("Harbour"));
    assert!(driver.url().await.expect("url").starts_with("data:"));

    driver.close().await.expect("close");
}
