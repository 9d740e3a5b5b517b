use iptv_lineup_lib::api::{Channel, RemoteRequest, RemoteResponse};
use iptv_lineup_lib::app::{App, AsyncAction};
use iptv_lineup_lib::config::AppConfig;
use iptv_lineup_lib::demo::MemoryChannelService;
use iptv_lineup_lib::errors::{Command, GestureRejection, LineupError};
use iptv_lineup_lib::flex_id::ChannelId;
use iptv_lineup_lib::handlers::async_actions::{flush_outbox, handle_async_action};
use iptv_lineup_lib::lineup::coordinator::Applied;
use iptv_lineup_lib::lineup::drag::Modality;
use iptv_lineup_lib::lineup::ChannelList;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

fn config() -> AppConfig {
    AppConfig {
        announce_debounce_ms: 0,
        ..AppConfig::default()
    }
}

fn abcde() -> Vec<Channel> {
    ["A", "B", "C", "D", "E"]
        .iter()
        .enumerate()
        .map(|(i, name)| Channel::new(i as i64 + 1, *name, i as u32))
        .collect()
}

fn list() -> ChannelList {
    let mut list = ChannelList::with_channels(1, &config(), abcde());
    list.set_viewport(20);
    list
}

fn names(list: &ChannelList) -> Vec<String> {
    list.displayed()
        .iter()
        .map(|id| list.channel(*id).unwrap().name.clone())
        .collect()
}

fn id(n: i64) -> ChannelId {
    ChannelId(n)
}

#[test]
fn test_drop_a_onto_c_sends_one_order() {
    let mut list = list();
    let now = Instant::now();
    list.pick_up(Modality::Pointer, id(1)).unwrap();
    list.hover(Modality::Pointer, Some(id(2)), now).unwrap();
    list.hover(Modality::Pointer, Some(id(3)), now).unwrap();
    list.release(Modality::Pointer).unwrap();

    assert_eq!(names(&list), ["B", "C", "A", "D", "E"]);
    let outbox = list.take_outbox();
    assert_eq!(outbox.len(), 1, "hovering must not persist anything");
    assert_eq!(
        outbox[0].request,
        RemoteRequest::SetChannelOrder(vec![id(2), id(3), id(1), id(4), id(5)])
    );
}

#[test]
fn test_rejected_reorder_reverts_and_notifies() {
    let mut list = list();
    let req = list.commit_position(id(1), "3").unwrap().unwrap();
    list.take_outbox();
    assert_eq!(names(&list), ["B", "C", "A", "D", "E"]);

    let applied = list.handle_response(1, req, Err(LineupError::Server(500, "boom".to_string())));
    assert_eq!(applied, Applied::RolledBack);
    assert_eq!(names(&list), ["A", "B", "C", "D", "E"]);

    let notices = list.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].message.starts_with("Saving channel order failed"));
    assert!(notices[0].retry.is_some());

    // Rollback also asks for the canonical lineup
    let outbox = list.take_outbox();
    assert!(outbox.iter().any(|o| o.request == RemoteRequest::ListChannels));
}

#[test]
fn test_keyboard_move_to_position_one_of_five() {
    let mut list = list();
    let now = Instant::now();
    list.focus_last();
    list.pick_up(Modality::Keyboard, id(5)).unwrap();
    list.keyboard_step(-10, now).unwrap();
    list.release(Modality::Keyboard).unwrap();

    assert_eq!(names(&list), ["E", "A", "B", "C", "D"]);
    assert_eq!(list.live_region().text, "E dropped at position 1 of 5.");
    assert_eq!(list.focused(), Some(id(5)));
}

#[test]
fn test_keyboard_cancel_restores_order() {
    let mut list = list();
    let now = Instant::now();
    list.pick_up(Modality::Keyboard, id(2)).unwrap();
    list.keyboard_step(2, now).unwrap();
    assert!(list.cancel().is_some());

    assert_eq!(names(&list), ["A", "B", "C", "D", "E"]);
    assert!(list.take_outbox().is_empty());
    assert_eq!(list.live_region().text, "Reorder cancelled. B returned to position 2.");
}

#[test]
fn test_foreign_hover_is_refused() {
    let mut list = list();
    let now = Instant::now();
    list.pick_up(Modality::Keyboard, id(1)).unwrap();
    list.keyboard_step(1, now).unwrap();

    let result = list.hover(Modality::Pointer, Some(id(5)), now);
    assert_eq!(result, Err(GestureRejection::ForeignModality));
    assert_eq!(list.drag_session().unwrap().target, Some(id(2)));

    let result = list.release(Modality::SimulatedMouse);
    assert_eq!(result, Err(GestureRejection::ForeignModality));
    assert!(list.drag_session().is_some());
}

#[test]
fn test_second_pick_up_is_refused() {
    let mut list = list();
    list.pick_up(Modality::Pointer, id(1)).unwrap();
    assert_eq!(
        list.pick_up(Modality::Keyboard, id(2)),
        Err(GestureRejection::SessionActive)
    );
}

#[test]
fn test_disable_then_undo_makes_no_call() {
    let mut list = list();
    let now = Instant::now();
    let handle = list.schedule_disable(id(2), now).unwrap();
    assert_eq!(names(&list), ["A", "C", "D", "E"]);

    assert!(list.cancel_undo(handle));
    list.tick(now + Duration::from_secs(60));
    assert_eq!(names(&list), ["A", "B", "C", "D", "E"]);
    assert!(list.take_outbox().is_empty());
}

#[test]
fn test_disable_expiry_sends_one_toggle() {
    let mut list = list();
    let now = Instant::now();
    list.schedule_disable(id(2), now).unwrap();
    let window = config().undo_window();

    list.tick(now + window - Duration::from_millis(1));
    assert!(list.take_outbox().is_empty());

    list.tick(now + window + Duration::from_millis(1));
    list.tick(now + window + Duration::from_secs(5));
    let outbox = list.take_outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].request, RemoteRequest::ToggleChannelEnabled(id(2)));
    assert_eq!(names(&list), ["A", "C", "D", "E"]);
}

#[test]
fn test_unmount_drops_pending_disables_and_late_responses() {
    let mut list = list();
    let now = Instant::now();
    list.schedule_disable(id(3), now).unwrap();
    let req = list.commit_position(id(1), "2").unwrap().unwrap();

    let dropped = list.unmount();
    assert_eq!(dropped.len(), 1);
    assert!(list.take_outbox().is_empty());
    assert_eq!(
        list.handle_response(1, req, Ok(RemoteResponse::Ordered)),
        Applied::Ignored
    );
}

#[test]
fn test_hidden_rows_keep_their_slots() {
    let mut channels = abcde();
    channels[1].enabled = false;
    let mut list = ChannelList::with_channels(1, &config(), channels);
    assert_eq!(names(&list), ["A", "C", "D", "E"]);

    list.commit_position(id(5), "1").unwrap();
    let outbox = list.take_outbox();
    assert_eq!(
        outbox[0].request,
        RemoteRequest::SetChannelOrder(vec![id(5), id(2), id(1), id(3), id(4)])
    );
}

#[test]
fn test_out_of_range_position_is_ignored() {
    let mut list = list();
    assert_eq!(list.commit_position(id(1), "9"), Err(GestureRejection::OutOfRange));
    assert_eq!(list.commit_position(id(1), "abc"), Err(GestureRejection::OutOfRange));
    assert!(list.take_outbox().is_empty());
}

// ─── End to end through the async dispatch loop ───────────────────────────────

async fn pump(app: &mut App, tx: &mpsc::Sender<AsyncAction>, rx: &mut mpsc::Receiver<AsyncAction>) {
    loop {
        let pending = app.list.in_flight();
        flush_outbox(app, tx);
        if pending == 0 && app.list.in_flight() == 0 {
            break;
        }
        match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
            Ok(Some(action)) => handle_async_action(app, action),
            _ => break,
        }
    }
}

#[tokio::test]
async fn test_end_to_end_reorder_reaches_backend() {
    let service = Arc::new(MemoryChannelService::new(abcde()));
    let mut app = App::new(config(), service.clone(), "memory".to_string());
    let (tx, mut rx) = mpsc::channel(16);

    pump(&mut app, &tx, &mut rx).await;
    assert!(app.list.is_loaded());
    assert_eq!(names(&app.list), ["A", "B", "C", "D", "E"]);

    app.list.commit_position(id(4), "1").unwrap();
    pump(&mut app, &tx, &mut rx).await;

    let server: Vec<String> = service.channels().iter().map(|c| c.name.clone()).collect();
    assert_eq!(server, ["D", "A", "B", "C", "E"]);
    assert_eq!(names(&app.list), ["D", "A", "B", "C", "E"]);
    assert_eq!(service.calls_of(Command::SetChannelOrder).len(), 1);
    assert!(app.list.order_sync().is_clean());
}

#[tokio::test]
async fn test_end_to_end_failed_toggle_shows_notice() {
    let service = Arc::new(MemoryChannelService::new(abcde()));
    let mut app = App::new(config(), service.clone(), "memory".to_string());
    let (tx, mut rx) = mpsc::channel(16);
    pump(&mut app, &tx, &mut rx).await;

    service.fail_next(
        Command::ToggleChannelEnabled,
        LineupError::Transport("connection reset".to_string()),
    );
    let now = Instant::now();
    app.list.schedule_disable(id(1), now);
    app.tick(now + app.config.undo_window() + Duration::from_millis(1));
    pump(&mut app, &tx, &mut rx).await;

    let notice = app.current_notice().expect("failure notice");
    assert!(notice.message.starts_with("Updating channel failed"));
    assert!(app.list.channel(id(1)).unwrap().enabled);
    assert!(service.channels()[0].enabled);
}
