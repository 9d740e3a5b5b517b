use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use ratatui::{backend::TestBackend, Terminal};
use tokio::runtime::Runtime;

use iptv_lineup_lib::api::RemoteRequest;
use iptv_lineup_lib::app::App;
use iptv_lineup_lib::config::AppConfig;
use iptv_lineup_lib::demo::MemoryChannelService;
use iptv_lineup_lib::errors::{Command, LineupError};
use iptv_lineup_lib::flex_id::ChannelId;
use iptv_lineup_lib::handlers::async_actions::run_request;
use iptv_lineup_lib::handlers::input::handle_key_event;
use iptv_lineup_lib::handlers::simulated::SimulatedMouse;
use iptv_lineup_lib::ui;

/// Headless drag-and-drop QA run against the in-memory backend
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of channels in the demo lineup
    #[arg(long, default_value_t = 200)]
    channels: usize,

    /// Simulated backend latency in milliseconds
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,
}

fn make_key(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::empty(),
        kind: KeyEventKind::Press,
        state: KeyEventState::empty(),
    }
}

struct Harness {
    app: App,
    service: Arc<MemoryChannelService>,
    terminal: Terminal<TestBackend>,
    mouse: SimulatedMouse,
}

impl Harness {
    fn new(count: usize, latency: Duration) -> anyhow::Result<Self> {
        let service = Arc::new(MemoryChannelService::demo(count));
        service.set_latency(latency);
        let config = AppConfig {
            announce_debounce_ms: 0,
            ..AppConfig::default()
        };
        let app = App::new(config, service.clone(), "qa".to_string());
        let terminal = Terminal::new(TestBackend::new(100, 40))?;
        Ok(Harness {
            app,
            service,
            terminal,
            mouse: SimulatedMouse::new(),
        })
    }

    /// Run every queued call to completion, feeding results back in order
    async fn drain(&mut self) {
        loop {
            let outbox = self.app.list.take_outbox();
            if outbox.is_empty() {
                break;
            }
            let epoch = self.app.list.epoch();
            let timeout = self.app.config.request_timeout();
            for out in outbox {
                let result = run_request(self.service.as_ref(), out.request, timeout).await;
                self.app.list.handle_response(epoch, out.id, result);
            }
            self.app.collect_notices();
        }
    }

    fn render(&mut self) -> anyhow::Result<()> {
        let app = &mut self.app;
        self.terminal.draw(|f| ui::ui(f, app))?;
        Ok(())
    }

    /// Screen row of the first line of displayed row `index`
    fn row_y(&self, index: usize) -> Option<u16> {
        let scroll = self.app.list.scroll_offset();
        let item = self.app.list.virtual_items().into_iter().find(|i| i.index == index)?;
        let offset = item.start.checked_sub(scroll)?;
        let y = self.app.area_rows.y.checked_add(u16::try_from(offset).ok()?)?;
        (y < self.app.area_rows.bottom()).then_some(y)
    }

    fn grip_x(&self) -> u16 {
        self.app.area_rows.x + 1
    }

    fn displayed(&self) -> Vec<ChannelId> {
        self.app.list.displayed().to_vec()
    }

    fn order_calls(&self) -> usize {
        self.service.calls_of(Command::SetChannelOrder).len()
    }

    fn server_order(&self) -> Vec<ChannelId> {
        self.service.channels().iter().map(|c| c.id).collect()
    }

    fn local_order(&self) -> Vec<ChannelId> {
        self.app.list.channels().iter().map(|c| c.id).collect()
    }

    /// Press on displayed row `from`, sweep to `to`, release there
    fn drag(&mut self, from: usize, to_y: u16) -> anyhow::Result<()> {
        let now = Instant::now();
        let x = self.grip_x();
        let from_y = self
            .row_y(from)
            .ok_or_else(|| anyhow::anyhow!("row {} not on screen", from))?;
        self.mouse
            .press(&mut self.app.list, self.app.area_rows, x, from_y)
            .map_err(|reason| anyhow::anyhow!("pick-up refused: {}", reason.display_name()))?;
        let area = self.app.area_rows;
        let step: i32 = if to_y >= from_y { 1 } else { -1 };
        let mut y = i32::from(from_y);
        while y != i32::from(to_y) {
            y += step;
            let _ = self.mouse.move_to(&mut self.app.list, area, x, y as u16, now);
        }
        let _ = self.mouse.release(&mut self.app.list, area, x, to_y, now);
        Ok(())
    }
}

fn report(name: &str, ok: bool, detail: String, failures: &mut usize) {
    if ok {
        println!("    [PASS] {}", name);
    } else {
        println!("    [FAIL] {}: {}", name, detail);
        *failures += 1;
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let rt = Runtime::new()?;
    let failures = rt.block_on(run_qa(args))?;

    println!("\n==================================================");
    if failures == 0 {
        println!("ALL REORDER CHECKS PASSED");
        Ok(())
    } else {
        println!("{} CHECK(S) FAILED", failures);
        std::process::exit(1);
    }
}

async fn run_qa(args: Args) -> anyhow::Result<usize> {
    println!("Starting lineup reorder QA...");
    println!("==================================================");
    println!("Channels: {}  Latency: {}ms", args.channels, args.latency_ms);

    let mut failures = 0;
    let mut h = Harness::new(args.channels, Duration::from_millis(args.latency_ms))?;
    h.drain().await;
    h.render()?;

    let count = h.displayed().len();
    report(
        "Initial load",
        h.app.list.is_loaded() && count > 2,
        format!("{} rows displayed", count),
        &mut failures,
    );
    if count < 3 {
        println!("CRITICAL: Need at least three visible rows to continue.");
        return Ok(failures + 1);
    }

    // 1. Pointer drag of row 0 onto row 2
    println!("\nScenario: drag first row onto third");
    let before = h.displayed();
    let calls_before = h.order_calls();
    let target_y = h.row_y(2).ok_or_else(|| anyhow::anyhow!("row 2 not on screen"))?;
    h.drag(0, target_y)?;
    h.drain().await;
    h.render()?;
    let after = h.displayed();
    report(
        "Row lands on target slot",
        after[..3] == [before[1], before[2], before[0]],
        format!("{:?}", &after[..3]),
        &mut failures,
    );
    report(
        "Exactly one order call",
        h.order_calls() == calls_before + 1,
        format!("{} calls", h.order_calls() - calls_before),
        &mut failures,
    );
    report(
        "Backend matches local order",
        h.server_order() == h.local_order(),
        "orders differ".to_string(),
        &mut failures,
    );

    // 2. Release outside the list
    println!("\nScenario: release outside the list");
    let before = h.displayed();
    let calls_before = h.order_calls();
    let outside = h.app.area_rows.bottom() + 1;
    h.drag(1, outside)?;
    h.drain().await;
    report(
        "Order unchanged",
        h.displayed() == before,
        "order moved".to_string(),
        &mut failures,
    );
    report(
        "No order call",
        h.order_calls() == calls_before,
        format!("{} calls", h.order_calls() - calls_before),
        &mut failures,
    );
    report(
        "Drag session cleared",
        h.app.list.drag_session().is_none(),
        "session still active".to_string(),
        &mut failures,
    );

    // 3. Keyboard move of the last row to the top
    println!("\nScenario: keyboard move to the top");
    h.app.list.focus_last();
    let moving = h.app.list.focused();
    handle_key_event(&mut h.app, make_key(KeyCode::Char(' ')));
    let page = usize::from(h.app.area_rows.height.max(1));
    for _ in 0..=(count / page) {
        handle_key_event(&mut h.app, make_key(KeyCode::PageUp));
    }
    handle_key_event(&mut h.app, make_key(KeyCode::Char(' ')));
    h.drain().await;
    h.render()?;
    report(
        "Last row now first",
        moving.is_some() && h.displayed().first().copied() == moving,
        format!("first is {:?}", h.displayed().first()),
        &mut failures,
    );
    report(
        "Announcement names the position",
        h.app.list.live_region().text.contains("position 1 of"),
        h.app.list.live_region().text.clone(),
        &mut failures,
    );

    // 4. Rejected save rolls back
    println!("\nScenario: backend rejects the save");
    let before = h.displayed();
    h.service
        .fail_next(Command::SetChannelOrder, LineupError::Rejected("lineup locked".to_string()));
    let target_y = h.row_y(2).ok_or_else(|| anyhow::anyhow!("row 2 not on screen"))?;
    h.drag(0, target_y)?;
    h.drain().await;
    h.render()?;
    report(
        "Order restored",
        h.displayed() == before,
        "order not restored".to_string(),
        &mut failures,
    );
    let notice = h.app.current_notice().map(|n| n.message.clone()).unwrap_or_default();
    report(
        "Failure notice raised",
        notice.starts_with("Saving channel order failed"),
        format!("notice: {:?}", notice),
        &mut failures,
    );
    let refetched = h
        .service
        .calls()
        .iter()
        .rev()
        .take(2)
        .any(|r| *r == RemoteRequest::ListChannels);
    report(
        "Lineup refetched after rollback",
        refetched,
        "no refetch issued".to_string(),
        &mut failures,
    );

    Ok(failures)
}
