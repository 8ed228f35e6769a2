use heritage_core::{ChatController, FilterControl, HeritageClient, MessageId, QaBackend};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Country,
    Category,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Input => Focus::Country,
            Focus::Country => Focus::Category,
            Focus::Category => Focus::Input,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Input => Focus::Category,
            Focus::Country => Focus::Input,
            Focus::Category => Focus::Country,
        }
    }
}

pub struct App<B: QaBackend = HeritageClient> {
    pub should_quit: bool,
    pub focus: Focus,
    pub server_url: String,
    pub controller: ChatController<B>,

    // Input box
    pub input_cursor: usize, // cursor position in chars, not bytes

    // Message pane
    pub chat_scroll: u16,
    pub chat_height: u16, // inner size, updated during render
    pub chat_width: u16,
    pub chat_total_lines: u16, // wrapped rows of the whole conversation
    pub follow_tail: bool,
    pub chat_area: Option<Rect>,

    // Filter picker popup
    pub picker_state: ListState,

    // 0-2 for ellipsis animation
    pub animation_frame: u8,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl<B: QaBackend> App<B> {
    pub fn new(controller: ChatController<B>, server_url: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            focus: Focus::Input,
            server_url: server_url.into(),
            controller,

            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_total_lines: 0,
            follow_tail: true,
            chat_area: None,

            picker_state: ListState::default(),

            animation_frame: 0,
        }
    }

    pub fn submit(&mut self) -> Option<MessageId> {
        let placeholder = self.controller.submit();
        if placeholder.is_some() {
            self.input_cursor = 0;
            self.follow_tail = true;
        }
        placeholder
    }

    // Focus

    pub fn focus_next(&mut self) {
        self.set_focus(self.focus.next());
    }

    pub fn focus_prev(&mut self) {
        self.set_focus(self.focus.prev());
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.sync_picker();
    }

    /// The filter control under focus, if the focus is on one.
    pub fn focused_filter(&self) -> Option<&FilterControl> {
        let filters = self.controller.filters();
        match self.focus {
            Focus::Input => None,
            Focus::Country => Some(&filters.country),
            Focus::Category => Some(&filters.category),
        }
    }

    fn focused_filter_mut(&mut self) -> Option<&mut FilterControl> {
        let filters = self.controller.filters_mut();
        match self.focus {
            Focus::Input => None,
            Focus::Country => Some(&mut filters.country),
            Focus::Category => Some(&mut filters.category),
        }
    }

    pub fn filter_next(&mut self) {
        if let Some(control) = self.focused_filter_mut() {
            control.select_next();
        }
        self.sync_picker();
    }

    pub fn filter_prev(&mut self) {
        if let Some(control) = self.focused_filter_mut() {
            control.select_prev();
        }
        self.sync_picker();
    }

    fn sync_picker(&mut self) {
        let selected = self.focused_filter().map(FilterControl::selected_index);
        self.picker_state.select(selected);
    }

    // Input editing

    pub fn insert_char(&mut self, c: char) {
        let cursor = self.input_cursor;
        let input = self.controller.input_mut();
        let byte_pos = char_to_byte_index(input, cursor);
        input.insert(byte_pos, c);
        self.input_cursor += 1;
    }

    /// Insert pasted text; the input is a single line, so line breaks become spaces.
    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars() {
            self.insert_char(if c == '\n' || c == '\r' { ' ' } else { c });
        }
    }

    pub fn backspace(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let cursor = self.input_cursor;
            let input = self.controller.input_mut();
            let byte_pos = char_to_byte_index(input, cursor);
            input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        let cursor = self.input_cursor;
        let input = self.controller.input_mut();
        if cursor < input.chars().count() {
            let byte_pos = char_to_byte_index(input, cursor);
            input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.controller.input().chars().count();
        self.input_cursor = (self.input_cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.controller.input().chars().count();
    }

    // Message pane scrolling

    fn max_chat_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max_scroll = self.max_chat_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
        self.follow_tail = self.chat_scroll >= max_scroll;
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
        self.follow_tail = true;
    }

    /// Called from render once the pane size is known. Any append since the
    /// last frame brings the newest message into view.
    pub fn sync_chat_scroll(&mut self) {
        if self.controller.log_mut().take_scroll_request() || self.follow_tail {
            self.scroll_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.controller.log().has_thinking() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}
