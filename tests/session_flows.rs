//! Cross-page session scenarios driven through the app shell

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use tokio_test::{assert_err, assert_ok};
use vidlearn::core::session::{ActiveMode, EngineStatus, StartOutcome};
use vidlearn::types::PlayerMode;
use vidlearn::ui::navigation::{App, Route};

#[tokio::test]
async fn theater_to_floating_and_back_keeps_one_engine() {
    let h = harness();
    let mut app = App::new(h.ctx.clone());

    app.open_video(lecture("a"), Arc::new(FixedSlot)).await;
    assert_eq!(h.media.opened(), 1);
    assert_eq!(h.store().snapshot().current_time, 0.0);

    let element = h.media.element(0);
    element.tick(12.0);
    settle().await;
    assert_eq!(h.store().snapshot().current_time, 12.0);

    app.navigate(Route::Catalog);
    assert_eq!(h.store().mode(), PlayerMode::Floating);
    assert!(app.floating().is_some());

    element.tick(47.5);
    settle().await;
    let last_floating = h.store().snapshot().current_time;
    assert_eq!(last_floating, 47.5);

    assert!(app.expand(Arc::new(FixedSlot)).await);
    let session = h.store().snapshot();
    assert_eq!(session.mode, PlayerMode::Theater);
    assert_eq!(session.current_time, last_floating);
    assert!(session.is_playing);
    assert_eq!(h.media.opened(), 1);
    assert_eq!(h.media.destroyed(), 0);
}

#[tokio::test]
async fn volume_and_speed_follow_the_session_between_surfaces() {
    let h = harness();
    let mut app = App::new(h.ctx.clone());
    app.open_video(lecture("a"), Arc::new(FixedSlot)).await;

    let theater = app.page().and_then(|p| p.surface()).map(|s| s.transport().clone());
    let theater = theater.expect("theater surface mounted");
    theater.set_volume(0.3);
    assert_ok!(theater.set_speed(1.5));

    app.navigate(Route::Catalog);
    let floating = app.floating().map(|f| f.transport().state()).expect("floating surface");
    assert_eq!(floating.volume, 0.3);
    assert_eq!(floating.rate, 1.5);

    assert!(app.expand(Arc::new(FixedSlot)).await);
    let expanded = app
        .page()
        .and_then(|p| p.surface())
        .map(|s| s.transport().state())
        .expect("theater surface remounted");
    assert_eq!(expanded.volume, 0.3);
    assert_eq!(expanded.rate, 1.5);
    assert_eq!(h.media.opened(), 1);
}

#[tokio::test]
async fn video_without_source_shows_fallback_and_stays_hidden() {
    let h = harness();
    let mut app = App::new(h.ctx.clone());
    let blank = vidlearn::core::session::SessionVideo::new("z", "", "Blank");
    app.open_video(blank, Arc::new(FixedSlot)).await;

    let page = app.page().expect("page mounted");
    assert_eq!(page.outcome(), Some(StartOutcome::NoSource));
    assert_eq!(page.unavailable(), Some(vidlearn::ui::theater::UNAVAILABLE_MESSAGE));
    let session = h.store().snapshot();
    assert_eq!(session.mode, PlayerMode::Hidden);
    assert!(!session.is_loaded());
    assert_eq!(h.media.opened(), 0);

    app.navigate(Route::Catalog);
    assert!(app.floating().is_none());
}

#[tokio::test]
async fn other_video_while_floating_replaces_session() {
    let h = harness();
    h.ctx.progress.save_progress("b", 30.0, 100.0);
    let mut app = App::new(h.ctx.clone());

    app.open_video(lecture("a"), Arc::new(FixedSlot)).await;
    h.media.element(0).tick(80.0);
    settle().await;
    app.navigate(Route::Catalog);
    assert_eq!(h.store().mode(), PlayerMode::Floating);

    app.open_video(lecture("b"), Arc::new(FixedSlot)).await;
    assert_eq!(app.page().and_then(|p| p.outcome()), Some(StartOutcome::NewSession));
    assert_eq!(h.media.destroyed(), 1);
    assert_eq!(h.media.opened(), 2);

    let session = h.store().snapshot();
    assert_eq!(session.video_id, "b");
    assert_eq!(session.current_time, 30.0);
    assert!(session.is_playing);
    assert_eq!(session.mode, PlayerMode::Theater);
    assert!(app.floating().is_none());
}

#[tokio::test]
async fn late_events_from_replaced_engine_are_ignored() {
    let h = harness();
    let mut app = App::new(h.ctx.clone());
    app.open_video(lecture("a"), Arc::new(FixedSlot)).await;
    let old = h.media.element(0);

    app.open_video(lecture("b"), Arc::new(FixedSlot)).await;
    old.tick(99.0);
    settle().await;

    let session = h.store().snapshot();
    assert_eq!(session.video_id, "b");
    assert_eq!(session.current_time, 0.0);
}

#[tokio::test]
async fn same_video_in_another_mode_is_not_rebuilt() {
    let h = harness();
    let store = h.store();
    store.start_or_resume(&lecture("a"), ActiveMode::Theater, None, None);
    assert_ok!(store.ensure_engine(&h.ctx.engines));
    store.start_or_resume(&lecture("a"), ActiveMode::Floating, Some(50.0), None);
    store.start_or_resume(&lecture("a"), ActiveMode::Theater, None, None);
    assert_ok!(store.ensure_engine(&h.ctx.engines));
    assert_eq!(h.media.opened(), 1);
    assert_eq!(store.snapshot().current_time, 0.0);
}

#[tokio::test]
async fn operations_after_close_are_noops() {
    let h = harness();
    let store = h.store();
    store.start_or_resume(&lecture("a"), ActiveMode::Floating, Some(10.0), None);
    assert_ok!(store.ensure_engine(&h.ctx.engines));
    store.close();
    assert_eq!(h.media.destroyed(), 1);

    store.seek(40.0);
    store.set_playing(true);
    store.switch_mode(ActiveMode::Theater, None);
    let session = store.snapshot();
    assert_eq!(session.mode, PlayerMode::Hidden);
    assert!(!session.is_loaded());
    assert!(!session.is_playing);
    assert_eq!(store.engine_status(), EngineStatus::Detached);
}

#[tokio::test]
async fn invalid_link_shows_unavailable_without_breaking_navigation() {
    let h = harness();
    let mut app = App::new(h.ctx.clone());
    let broken = vidlearn::core::session::SessionVideo::new("x", "not a url", "Broken");
    app.open_video(broken, Arc::new(FixedSlot)).await;

    let surface = app.page().and_then(|p| p.surface()).map(|s| s.unavailable());
    assert_eq!(surface, Some(Some(vidlearn::ui::theater::UNAVAILABLE_MESSAGE)));
    assert_err!(h.ctx.engines.create(
        &vidlearn::core::source::resolve("not a url"),
        Default::default()
    ));

    app.navigate(Route::Catalog);
    assert_eq!(app.route(), &Route::Catalog);
}

#[tokio::test(start_paused = true)]
async fn embedded_time_is_polled_across_mode_switches() {
    let h = harness();
    let mut app = App::new(h.ctx.clone());

    app.open_video(hosted("dQw4w9WgXcQ"), Arc::new(FixedSlot)).await;
    settle().await;
    assert_eq!(h.embeds.created(), 1);
    assert_eq!(h.store().engine_status(), EngineStatus::Ready);

    h.embeds.set_time(0, 20.0);
    tokio::time::advance(Duration::from_millis(300)).await;
    settle().await;
    assert_eq!(h.store().snapshot().current_time, 20.0);

    app.navigate(Route::Catalog);
    h.embeds.set_time(0, 35.0);
    tokio::time::advance(Duration::from_millis(300)).await;
    settle().await;
    assert_eq!(h.store().snapshot().current_time, 35.0);

    assert!(app.expand(Arc::new(FixedSlot)).await);
    assert_eq!(h.store().snapshot().current_time, 35.0);
    assert_eq!(h.embeds.created(), 1);
    assert_eq!(h.embeds.destroyed(), 0);
}

#[tokio::test]
async fn platform_script_loads_once_for_many_players() {
    let h = harness();
    let mut app = App::new(h.ctx.clone());

    app.open_video(hosted("aaaaaaaaaaa"), Arc::new(FixedSlot)).await;
    settle().await;
    app.open_video(hosted("bbbbbbbbbbb"), Arc::new(FixedSlot)).await;
    settle().await;

    assert_eq!(h.embeds.script_loads(), 1);
    assert_eq!(h.embeds.created(), 2);
    assert_eq!(h.embeds.destroyed(), 1);
    assert_eq!(h.store().snapshot().video_id, "bbbbbbbbbbb");
}

#[tokio::test]
async fn progress_is_saved_while_watching() {
    let h = harness();
    let mut app = App::new(h.ctx.clone());
    app.open_video(lecture("a"), Arc::new(FixedSlot)).await;
    h.media.element(0).tick(120.0);
    settle().await;

    let saved = h.ctx.progress.progress("a").expect("progress saved");
    assert_eq!(saved.current_time, 120.0);
    assert_eq!(saved.duration, 600.0);
    assert!(!saved.completed);

    app.navigate(Route::Catalog);
    h.media.element(0).tick(150.0);
    settle().await;
    assert_eq!(h.ctx.progress.resume_time("a"), 150.0);
}
