use std::sync::Arc;
use std::time::Instant;

use ratatui::layout::Rect;
use tui_input::Input;

use crate::api::{ChannelService, RemoteResponse};
use crate::config::AppConfig;
use crate::errors::LineupError;
use crate::flex_id::{ChannelId, StreamId};
use crate::lineup::coordinator::{Notice, RequestId};
use crate::lineup::ChannelList;

/// Results posted back to the main loop by spawned tasks
#[derive(Debug, Clone)]
pub enum AsyncAction {
    Remote {
        epoch: u64,
        id: RequestId,
        result: Result<RemoteResponse, LineupError>,
    },
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum CurrentScreen {
    Channels,     // Drag-and-drop lineup with matches
    TargetLineup, // Typed positions
}

impl CurrentScreen {
    pub fn title(&self) -> &'static str {
        match self {
            CurrentScreen::Channels => "CHANNELS",
            CurrentScreen::TargetLineup => "TARGET_LINEUP",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            CurrentScreen::Channels => CurrentScreen::TargetLineup,
            CurrentScreen::TargetLineup => CurrentScreen::Channels,
        }
    }
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum InputMode {
    Normal,
    Editing,
}

/// What the text input is currently collecting
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum EditTarget {
    Position,
    AddMatch(ChannelId),
}

pub struct App {
    pub config: AppConfig,
    pub current_screen: CurrentScreen,
    pub input_mode: InputMode,
    pub edit_target: Option<EditTarget>,
    pub should_quit: bool,
    pub show_help: bool,

    pub service: Arc<dyn ChannelService>,
    /// Where the backend lives, for the header
    pub backend_label: String,

    pub list: ChannelList,
    next_epoch: u64,

    /// Failure notices, oldest first; the first one is on screen
    pub notices: Vec<Notice>,
    pub last_error: Option<String>,

    /// Stream id typed for "add manual match"
    pub stream_input: Input,

    // Hit-testing areas, written by the renderer
    pub area_rows: Rect,
}

impl App {
    pub fn new(config: AppConfig, service: Arc<dyn ChannelService>, backend_label: String) -> App {
        let list = ChannelList::mount(1, &config);
        App {
            config,
            current_screen: CurrentScreen::Channels,
            input_mode: InputMode::Normal,
            edit_target: None,
            should_quit: false,
            show_help: false,
            service,
            backend_label,
            list,
            next_epoch: 2,
            notices: Vec::new(),
            last_error: None,
            stream_input: Input::default(),
            area_rows: Rect::default(),
        }
    }

    /// Unmount the current list and mount a fresh one for `screen`
    pub fn switch_screen(&mut self, screen: CurrentScreen) {
        let dropped = self.list.unmount();
        if !dropped.is_empty() {
            tracing::info!(count = dropped.len(), "pending disables dropped on screen switch");
        }
        self.stop_editing();
        self.current_screen = screen;
        self.list = ChannelList::mount(self.next_epoch, &self.config);
        self.next_epoch += 1;
        tracing::debug!(screen = screen.title(), epoch = self.list.epoch(), "switched screen");
    }

    pub fn collect_notices(&mut self) {
        self.notices.extend(self.list.take_notices());
    }

    pub fn current_notice(&self) -> Option<&Notice> {
        self.notices.first()
    }

    pub fn dismiss_notice(&mut self) {
        if !self.notices.is_empty() {
            self.notices.remove(0);
        } else {
            self.last_error = None;
        }
    }

    /// Re-issue the on-screen notice's retry hint, if any
    pub fn retry_notice(&mut self) -> bool {
        if self.notices.is_empty() {
            return false;
        }
        let notice = self.notices.remove(0);
        match notice.retry {
            Some(retry) => {
                tracing::info!(?retry, "retrying after failure notice");
                self.list.retry(retry);
                true
            }
            None => false,
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.list.tick(now);
        self.collect_notices();
    }

    pub fn begin_position_edit(&mut self, seed: Option<char>) {
        if let Some(id) = self.list.focused() {
            self.list.position_editor_mut().begin(id, seed);
            self.input_mode = InputMode::Editing;
            self.edit_target = Some(EditTarget::Position);
        }
    }

    pub fn begin_add_match(&mut self) {
        if let Some(id) = self.list.focused() {
            self.stream_input.reset();
            self.input_mode = InputMode::Editing;
            self.edit_target = Some(EditTarget::AddMatch(id));
        }
    }

    /// Submit whatever is being edited
    pub fn commit_edit(&mut self) {
        match self.edit_target.take() {
            Some(EditTarget::Position) => {
                if let Err(reason) = self.list.finish_position_edit() {
                    tracing::debug!(reason = reason.display_name(), "position entry rejected");
                }
            }
            Some(EditTarget::AddMatch(channel_id)) => {
                match self.stream_input.value().trim().parse::<i64>() {
                    Ok(stream_id) => {
                        self.list.add_manual_match(channel_id, StreamId(stream_id), false);
                    }
                    Err(_) => self.last_error = Some("Stream id must be a number".to_string()),
                }
                self.stream_input.reset();
            }
            None => {}
        }
        self.input_mode = InputMode::Normal;
    }

    pub fn stop_editing(&mut self) {
        self.list.position_editor_mut().cancel();
        self.stream_input.reset();
        self.edit_target = None;
        self.input_mode = InputMode::Normal;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::MemoryChannelService;

    fn app() -> App {
        let service = Arc::new(MemoryChannelService::demo(10));
        App::new(AppConfig::default(), service, "demo".to_string())
    }

    #[test]
    fn mount_queues_initial_fetch() {
        let mut app = app();
        let outbox = app.list.take_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].request, crate::api::RemoteRequest::ListChannels);
    }

    #[test]
    fn switching_screens_bumps_epoch() {
        let mut app = app();
        let first = app.list.epoch();
        app.switch_screen(app.current_screen.next());
        assert_eq!(app.current_screen, CurrentScreen::TargetLineup);
        assert!(app.list.epoch() > first);
        assert!(app.list.is_mounted());
    }

    #[test]
    fn bad_stream_id_sets_error() {
        let mut app = app();
        app.list = ChannelList::with_channels(1, &app.config, crate::demo::demo_lineup(3));
        app.list.focus_first();
        app.begin_add_match();
        app.stream_input = Input::new("abc".to_string());
        app.commit_edit();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.last_error.is_some());
    }
}
