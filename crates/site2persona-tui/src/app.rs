use std::time::Instant;

use ratatui::layout::Rect;
use site2persona_core::{
    AnalysisError, AnalysisLoader, ChatPlayground, CompanyAnalysis, Controller, ResultView,
    SessionId, WorkflowPhase,
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::clipboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Url,
    Result,
    Chat,
}

type AnalysisTask = JoinHandle<Result<CompanyAnalysis, AnalysisError>>;
type ChatTask = (SessionId, JoinHandle<Result<String, AnalysisError>>);
type CopyTask = JoinHandle<anyhow::Result<()>>;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub api_key_missing: bool,
    pub status_message: Option<String>,

    // URL form
    pub url_input: String,
    pub url_cursor: usize, // cursor position in url_input (chars)

    // Workflow and views
    pub controller: Controller,
    pub loader: AnalysisLoader,
    pub result_view: ResultView,
    pub playground: ChatPlayground,

    // Background requests
    pub analysis_task: Option<AnalysisTask>,
    pub chat_task: Option<ChatTask>,
    pub copy_task: Option<CopyTask>,

    // Animation state
    pub animation_frame: u8, // 0-2 for typing indicator

    // Chat area dimensions for scroll calculations (updated during render)
    pub chat_height: u16,
    pub chat_width: u16,

    // Panel areas for mouse hit-testing (updated during render)
    pub result_area: Option<Rect>,
    pub chat_area: Option<Rect>,
}

impl App {
    pub fn new(controller: Controller, api_key_missing: bool) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Url,
            api_key_missing,
            status_message: None,

            url_input: String::new(),
            url_cursor: 0,

            controller,
            loader: AnalysisLoader::new(),
            result_view: ResultView::new(),
            playground: ChatPlayground::new(),

            analysis_task: None,
            chat_task: None,
            copy_task: None,

            animation_frame: 0,

            chat_height: 0,
            chat_width: 0,

            result_area: None,
            chat_area: None,
        }
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.controller.phase()
    }

    pub fn can_submit(&self) -> bool {
        self.controller.can_submit(&self.url_input)
    }

    /// Start analyzing the URL in the form on a background task
    pub fn submit_url(&mut self) {
        let url = match self.controller.submit(&self.url_input) {
            Ok(url) => url,
            Err(e) => {
                debug!(error = %e, "Submit rejected");
                self.status_message = Some(e.to_string());
                return;
            }
        };

        self.status_message = None;
        self.loader.reset();
        self.result_view = ResultView::new();
        self.sync_playground();
        self.focus = FocusPane::Url;

        let service = self.controller.service().clone();
        self.analysis_task = Some(tokio::spawn(async move {
            service.analyze_website(&url).await
        }));
    }

    /// Send the chat input through the current session on a background task
    pub fn send_chat(&mut self) {
        // A request from a replaced session can't block the new one; its reply
        // would be dropped anyway. Dropping the handle detaches the task.
        if let Some((id, _)) = &self.chat_task {
            if Some(*id) == self.playground.session_id() {
                return;
            }
            debug!(session = ?id, "Detaching chat request for a replaced session");
            self.chat_task = None;
        }
        if let Some(pending) = self.playground.begin_send() {
            let id = pending.session.id();
            self.chat_task = Some((
                id,
                tokio::spawn(async move { pending.session.send_message(&pending.message).await }),
            ));
            self.scroll_chat_to_bottom();
        }
    }

    /// Copy the generated prompt without blocking the event loop
    pub fn copy_prompt(&mut self) {
        if self.copy_task.is_some() {
            return;
        }
        if let Some(analysis) = self.controller.analysis() {
            let text = analysis.generated_system_instruction.clone();
            self.copy_task = Some(tokio::task::spawn_blocking(move || clipboard::copy(&text)));
        }
    }

    /// Apply results of finished background requests
    pub async fn poll_tasks(&mut self) {
        if self.analysis_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.analysis_task.take() {
                let result = task
                    .await
                    .unwrap_or_else(|e| Err(AnalysisError::transport(e.to_string())));
                self.controller.complete(result);
                self.sync_playground();
                if self.phase() == WorkflowPhase::Success {
                    self.focus = FocusPane::Chat;
                    self.input_mode = InputMode::Editing;
                }
            }
        }

        if self.chat_task.as_ref().is_some_and(|(_, t)| t.is_finished()) {
            if let Some((session, task)) = self.chat_task.take() {
                let result = task.await.unwrap_or_else(|e| {
                    warn!(error = %e, "Chat task failed to complete");
                    Err(AnalysisError::transport(e.to_string()))
                });
                self.playground.finish_send(session, result);
                self.scroll_chat_to_bottom();
            }
        }

        if self.copy_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.copy_task.take() {
                match task.await.map_err(anyhow::Error::from).and_then(|r| r) {
                    Ok(()) => {
                        self.result_view.mark_copied(Instant::now());
                        self.status_message = None;
                    }
                    Err(e) => {
                        warn!(error = %e, "Clipboard copy failed");
                        self.status_message = Some(format!("Copy failed: {}", e));
                    }
                }
            }
        }
    }

    /// Keep the playground bound to the controller's current session
    pub fn sync_playground(&mut self) {
        let name = self
            .controller
            .analysis()
            .map(|a| a.name.clone())
            .unwrap_or_default();
        self.playground.sync(self.controller.chat_session(), &name);
    }

    /// Tick animation and timers (called by Tick event)
    pub fn tick(&mut self, now: Instant) {
        if self.phase() == WorkflowPhase::Analyzing {
            self.loader.tick(now);
        }
        if self.playground.is_typing || self.phase() == WorkflowPhase::Analyzing {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.result_view.tick(now);
    }

    /// Focus order: URL, then Result and Chat once an analysis is shown
    pub fn cycle_focus(&mut self) {
        let has_result = self.phase() == WorkflowPhase::Success;
        self.focus = match (self.focus, has_result) {
            (FocusPane::Url, true) => FocusPane::Result,
            (FocusPane::Result, _) => FocusPane::Chat,
            _ => FocusPane::Url,
        };
        self.input_mode = match self.focus {
            FocusPane::Result => InputMode::Normal,
            FocusPane::Url | FocusPane::Chat => InputMode::Editing,
        };
    }

    /// Scroll chat to bottom so the newest message (or typing indicator) is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.playground.messages {
            total_lines += 1; // Role line
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.playground.is_typing {
            total_lines += 2;
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.playground.scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn scroll_focused_down(&mut self, lines: u16) {
        match self.focus {
            FocusPane::Result => {
                self.result_view.scroll = self.result_view.scroll.saturating_add(lines)
            }
            FocusPane::Chat => self.playground.scroll = self.playground.scroll.saturating_add(lines),
            FocusPane::Url => {}
        }
    }

    pub fn scroll_focused_up(&mut self, lines: u16) {
        match self.focus {
            FocusPane::Result => {
                self.result_view.scroll = self.result_view.scroll.saturating_sub(lines)
            }
            FocusPane::Chat => self.playground.scroll = self.playground.scroll.saturating_sub(lines),
            FocusPane::Url => {}
        }
    }
}
