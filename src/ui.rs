use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseEvent, MouseEventKind};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction as LayoutDirection, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use textwrap::wrap;
use tracing::{debug, warn};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::PlayerConfig;
use crate::feed::{Direction, Feedback, Phase, SessionHistory, VideoCandidate};
use crate::player;
use crate::session::Session;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const MARK_LIKED: &str = "♥";
const MARK_DISLIKED: &str = "✗";
const MARK_PLAYED: &str = "✓";

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    panel_focused_bg: Color,
    selected_bg: Color,
    border_idle: Color,
    border_focused: Color,
    text_primary: Color,
    text_secondary: Color,
    accent: Color,
    success: Color,
    error: Color,
}

impl Palette {
    fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "mono" | "monochrome" => Self {
                bg: Color::Reset,
                panel_bg: Color::Reset,
                panel_focused_bg: Color::Reset,
                selected_bg: Color::DarkGray,
                border_idle: Color::Gray,
                border_focused: Color::White,
                text_primary: Color::White,
                text_secondary: Color::Gray,
                accent: Color::White,
                success: Color::White,
                error: Color::White,
            },
            _ => Self {
                bg: Color::Rgb(30, 30, 46),
                panel_bg: Color::Rgb(24, 24, 36),
                panel_focused_bg: Color::Rgb(49, 50, 68),
                selected_bg: Color::Rgb(69, 71, 90),
                border_idle: Color::Rgb(49, 50, 68),
                border_focused: Color::Rgb(137, 180, 250),
                text_primary: Color::Rgb(205, 214, 244),
                text_secondary: Color::Rgb(166, 173, 200),
                accent: Color::Rgb(137, 180, 250),
                success: Color::Rgb(166, 227, 161),
                error: Color::Rgb(243, 139, 168),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    Advance(Direction),
    First,
    Last,
    Feedback(Feedback),
    TogglePlaying,
    OpenPlayer,
    OpenBrowser,
    CopyLink,
    Reload,
}

fn action_for_key(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('j') | KeyCode::Down | KeyCode::PageDown => {
            Some(Action::Advance(Direction::Forward))
        }
        KeyCode::Char('k') | KeyCode::Up | KeyCode::PageUp => {
            Some(Action::Advance(Direction::Backward))
        }
        KeyCode::Char('g') | KeyCode::Home => Some(Action::First),
        KeyCode::Char('G') | KeyCode::End => Some(Action::Last),
        KeyCode::Char('l') => Some(Action::Feedback(Feedback::Like)),
        KeyCode::Char('d') => Some(Action::Feedback(Feedback::Dislike)),
        KeyCode::Char(' ') => Some(Action::TogglePlaying),
        KeyCode::Enter => Some(Action::OpenPlayer),
        KeyCode::Char('o') => Some(Action::OpenBrowser),
        KeyCode::Char('y') => Some(Action::CopyLink),
        KeyCode::Char('r') => Some(Action::Reload),
        _ => None,
    }
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

fn history_marks(history: &SessionHistory, id: &str) -> String {
    let mut marks = String::new();
    match history.feedback_for(id) {
        Some(Feedback::Like) => marks.push_str(MARK_LIKED),
        Some(Feedback::Dislike) => marks.push_str(MARK_DISLIKED),
        None => marks.push(' '),
    }
    if history.is_played(id) {
        marks.push_str(MARK_PLAYED);
    } else {
        marks.push(' ');
    }
    marks
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn playing_label(playing: bool) -> &'static str {
    if playing {
        "▶ Playing"
    } else {
        "⏸ Paused"
    }
}

fn position_label(index: usize, len: usize) -> String {
    if len == 0 {
        "0/0".to_string()
    } else {
        format!("{}/{}", index + 1, len)
    }
}

pub struct Options {
    pub status_message: String,
    pub session: Session,
    pub player: PlayerConfig,
    pub theme: String,
    pub endpoint: String,
    pub config_path: String,
    pub load_on_start: bool,
}

pub struct Model {
    session: Session,
    status_message: String,
    player: PlayerConfig,
    palette: Palette,
    endpoint: String,
    config_path: String,
    needs_redraw: bool,
    spinner: Spinner,
    queue_state: ListState,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let mut model = Self {
            session: opts.session,
            status_message: opts.status_message,
            player: opts.player,
            palette: Palette::from_name(&opts.theme),
            endpoint: opts.endpoint,
            config_path: opts.config_path,
            needs_redraw: true,
            spinner: Spinner::new(),
            queue_state: ListState::default(),
        };
        if opts.load_on_start {
            model.session.load_more();
            model.status_message = format!("Loading recommendations from {}…", model.endpoint);
        }
        model
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.session.feed().is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn poll_async(&mut self) -> bool {
        if !self.session.poll() {
            return false;
        }
        self.refresh_status_after_load();
        true
    }

    fn refresh_status_after_load(&mut self) {
        if self.session.feed().is_loading() {
            return;
        }
        let feed = self.session.feed();
        self.status_message = if let Some(err) = feed.last_error() {
            err.to_string()
        } else if feed.items().is_empty() {
            "No videos available. Press r to try again.".to_string()
        } else {
            format!(
                "Loaded {} videos. j/k to scroll, l/d to rate.",
                feed.items().len()
            )
        };
    }

    fn handle_mouse(&mut self, event: MouseEvent) {
        let direction = match event.kind {
            MouseEventKind::ScrollDown => Direction::Forward,
            MouseEventKind::ScrollUp => Direction::Backward,
            _ => return,
        };
        self.advance(direction);
        self.mark_dirty();
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let Some(action) = action_for_key(code) else {
            return Ok(false);
        };
        debug!(?action, "key action");

        match action {
            Action::Quit => return Ok(true),
            Action::Advance(direction) => self.advance(direction),
            Action::First => {
                if !self.session.feed().items().is_empty() {
                    self.session.advance_to(0);
                }
            }
            Action::Last => {
                let len = self.session.feed().items().len();
                if len > 0 {
                    self.session.advance_to(len - 1);
                }
            }
            Action::Feedback(kind) => self.record_feedback(kind)?,
            Action::TogglePlaying => {
                let index = self.session.feed().current_index();
                self.session.toggle_playing(index)?;
            }
            Action::OpenPlayer => self.open_player(),
            Action::OpenBrowser => self.open_browser(),
            Action::CopyLink => self.copy_link(),
            Action::Reload => {
                self.session.load_more();
                self.status_message = "Refreshing recommendations…".to_string();
            }
        }

        self.mark_dirty();
        Ok(false)
    }

    fn advance(&mut self, direction: Direction) {
        self.session.advance(direction);
        if self.session.feed().is_loading() {
            self.status_message = "Loading more recommendations…".to_string();
        }
    }

    fn record_feedback(&mut self, kind: Feedback) -> Result<()> {
        let index = self.session.feed().current_index();
        let title = self
            .session
            .feed()
            .current()
            .map(|video| video.title.clone())
            .unwrap_or_default();
        self.session.record_feedback(index, kind)?;
        self.status_message = match kind {
            Feedback::Like => format!("Liked \"{title}\"."),
            Feedback::Dislike => format!("Disliked \"{title}\"."),
        };
        if self.session.feed().is_loading() {
            self.status_message.push_str(" Fetching more…");
        }
        Ok(())
    }

    fn current_video(&self) -> Option<VideoCandidate> {
        self.session.feed().current().cloned()
    }

    fn open_player(&mut self) {
        let Some(video) = self.current_video() else {
            self.status_message = "Nothing to play.".to_string();
            return;
        };
        let url = video.watch_url();
        match player::launch(&self.player.video_command, &url, self.player.video_detach) {
            Ok(()) => self.status_message = format!("Playing \"{}\" externally.", video.title),
            Err(err) => {
                let detail = format!("{err:#}");
                warn!(error = %detail, "player launch failed");
                self.status_message = format!("Failed to launch player: {err}");
            }
        }
    }

    fn open_browser(&mut self) {
        let Some(video) = self.current_video() else {
            self.status_message = "Nothing to open.".to_string();
            return;
        };
        let url = video.watch_url();
        match webbrowser::open(&url) {
            Ok(_) => self.status_message = format!("Opened \"{}\" in your browser.", video.title),
            Err(err) => {
                self.status_message = format!("Failed to open browser: {err} (URL: {url})");
            }
        }
    }

    fn copy_link(&mut self) {
        let Some(video) = self.current_video() else {
            self.status_message = "Nothing to copy.".to_string();
            return;
        };
        let url = video.watch_url();
        let result = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(url.clone()));
        self.status_message = match result {
            Ok(()) => format!("Copied {url}"),
            Err(err) => format!("Clipboard unavailable: {err}"),
        };
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let palette = self.palette;
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(palette.bg)), full);

        let layout = Layout::default()
            .direction(LayoutDirection::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_text = if self.session.feed().is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
                .trim()
                .to_string()
        } else {
            self.status_message.clone()
        };
        let status_fg = if self.session.feed().last_error().is_some() {
            palette.error
        } else {
            palette.text_primary
        };
        let status_line = Paragraph::new(status_text).style(
            Style::default()
                .fg(status_fg)
                .bg(palette.panel_focused_bg)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        let has_items = !self.session.feed().items().is_empty();
        match notice_message(self.session.phase(), has_items) {
            Some(message) => self.draw_notice(frame, layout[1], message),
            None => {
                let chunks = Layout::default()
                    .direction(LayoutDirection::Horizontal)
                    .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
                    .split(layout[1]);
                self.draw_card(frame, chunks[0]);
                self.draw_queue(frame, chunks[1]);
            }
        }

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(palette.text_secondary)
                    .bg(palette.panel_bg)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[2]);
    }

    fn draw_notice(&self, frame: &mut Frame<'_>, area: Rect, message: &str) {
        let palette = self.palette;
        let top_pad = area.height.saturating_sub(1) / 2;
        let mut lines: Vec<Line<'static>> = (0..top_pad).map(|_| Line::from("")).collect();
        lines.push(Line::from(Span::styled(
            message.to_string(),
            Style::default()
                .fg(palette.text_primary)
                .add_modifier(Modifier::BOLD),
        )));
        let notice = Paragraph::new(Text::from(lines))
            .alignment(Alignment::Center)
            .style(Style::default().bg(palette.bg));
        frame.render_widget(notice, area);
    }

    fn draw_card(&self, frame: &mut Frame<'_>, area: Rect) {
        let palette = self.palette;
        let feed = self.session.feed();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.border_focused))
            .title(Span::styled(
                format!(
                    " Now showing {} ",
                    position_label(feed.current_index(), feed.items().len())
                ),
                Style::default().fg(palette.accent),
            ))
            .padding(Padding::horizontal(1))
            .style(Style::default().bg(palette.panel_focused_bg));

        let Some(video) = feed.current() else {
            frame.render_widget(block, area);
            return;
        };

        let inner_width = area.width.saturating_sub(4).max(1) as usize;
        let history = self.session.history();
        let mut lines: Vec<Line<'static>> = Vec::new();
        lines.push(Line::from(""));
        for row in wrap(&video.title, inner_width) {
            lines.push(Line::from(Span::styled(
                row.into_owned(),
                Style::default()
                    .fg(palette.text_primary)
                    .add_modifier(Modifier::BOLD),
            )));
        }
        lines.push(Line::from(""));

        let playing = feed.is_playing(feed.current_index());
        lines.push(Line::from(Span::styled(
            playing_label(playing).to_string(),
            Style::default().fg(if playing {
                palette.success
            } else {
                palette.text_secondary
            }),
        )));

        let (heart, heart_style) = match history.feedback_for(&video.id) {
            Some(Feedback::Like) => (MARK_LIKED, Style::default().fg(palette.error)),
            Some(Feedback::Dislike) => (MARK_DISLIKED, Style::default().fg(palette.text_secondary)),
            None => ("♡", Style::default().fg(palette.text_primary)),
        };
        lines.push(Line::from(vec![
            Span::styled(heart.to_string(), heart_style),
            Span::raw(" "),
            Span::styled(
                video.display_score().to_string(),
                Style::default().fg(palette.text_primary),
            ),
        ]));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            truncate_to_width(&video.watch_url(), inner_width),
            Style::default().fg(palette.accent),
        )));
        lines.push(Line::from(Span::styled(
            truncate_to_width(&video.thumbnail_url(), inner_width),
            Style::default().fg(palette.text_secondary),
        )));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "♫ Original Sound".to_string(),
            Style::default().fg(palette.text_secondary),
        )));

        let card = Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(card, area);
    }

    fn draw_queue(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let palette = self.palette;
        let feed = self.session.feed();
        let history = self.session.history();
        let width = area.width.saturating_sub(2) as usize;

        let items: Vec<ListItem<'static>> = feed
            .items()
            .iter()
            .enumerate()
            .map(|(index, video)| {
                let prefix = format!(
                    "{:>3} {} ",
                    index + 1,
                    history_marks(history, &video.id)
                );
                let title_width = width.saturating_sub(UnicodeWidthStr::width(prefix.as_str()));
                let style = if index == feed.current_index() {
                    Style::default()
                        .fg(palette.text_primary)
                        .bg(palette.selected_bg)
                        .add_modifier(Modifier::BOLD)
                } else if history.is_played(&video.id) {
                    Style::default().fg(palette.text_secondary)
                } else {
                    Style::default().fg(palette.text_primary)
                };
                ListItem::new(Line::from(vec![
                    Span::raw(prefix),
                    Span::raw(truncate_to_width(&video.title, title_width)),
                ]))
                .style(style)
            })
            .collect();

        self.queue_state.select(if items.is_empty() {
            None
        } else {
            Some(feed.current_index())
        });

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.border_idle))
                .title(Span::styled(
                    " Up next ",
                    Style::default().fg(palette.text_secondary),
                ))
                .style(Style::default().bg(palette.panel_bg)),
        );
        frame.render_stateful_widget(list, area, &mut self.queue_state);
    }

    fn footer_text(&self) -> String {
        let history = self.session.history();
        let parts = [
            "j/k scroll".to_string(),
            "l like".to_string(),
            "d dislike".to_string(),
            "space play/pause".to_string(),
            "enter player".to_string(),
            "o browser".to_string(),
            "r refresh".to_string(),
            "q quit".to_string(),
            format!(
                "{} played · {} liked · {} disliked",
                history.played().len(),
                history.liked().len(),
                history.disliked().len()
            ),
            format!("{} · {}", self.endpoint, self.config_path),
        ];
        parts.join(" · ")
    }
}

fn notice_message(phase: Phase, has_items: bool) -> Option<&'static str> {
    match phase {
        Phase::Initial => Some("Press r to load recommendations"),
        Phase::Loading if !has_items => Some("Loading Recommendations..."),
        Phase::Empty => Some("No videos available"),
        Phase::Loading | Phase::Ready => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::data::ScriptedSource;
    use crate::feed::FetchOutcome;

    fn videos(ids: &[&str]) -> Vec<VideoCandidate> {
        ids.iter()
            .map(|id| VideoCandidate::new(*id, format!("Clip {id}"), 0.25))
            .collect()
    }

    fn model_with(source: Arc<ScriptedSource>) -> Model {
        let mut model = Model::new(Options {
            status_message: String::new(),
            session: Session::new(source),
            player: PlayerConfig::default(),
            theme: "default".into(),
            endpoint: "http://localhost:5000/recommendations".into(),
            config_path: "~/.config/reel-tui/config.yaml".into(),
            load_on_start: true,
        });
        let deadline = Instant::now() + Duration::from_secs(5);
        while model.session.feed().is_loading() && Instant::now() < deadline {
            model.poll_async();
            std::thread::sleep(Duration::from_millis(5));
        }
        model
    }

    #[test]
    fn idle_start_asks_for_reload() {
        let mut model = Model::new(Options {
            status_message: String::new(),
            session: Session::new(Arc::new(ScriptedSource::default())),
            player: PlayerConfig::default(),
            theme: "mono".into(),
            endpoint: "http://localhost:5000/recommendations".into(),
            config_path: "~/.config/reel-tui/config.yaml".into(),
            load_on_start: false,
        });
        assert_eq!(model.session().phase(), Phase::Initial);
        assert_eq!(
            notice_message(model.session().phase(), false),
            Some("Press r to load recommendations")
        );

        model.handle_key(KeyCode::Char('r')).unwrap();
        assert_eq!(
            notice_message(model.session().phase(), false),
            Some("Loading Recommendations...")
        );
    }

    #[test]
    fn notice_hidden_once_items_are_shown() {
        assert_eq!(notice_message(Phase::Loading, true), None);
        assert_eq!(notice_message(Phase::Ready, true), None);
        assert_eq!(notice_message(Phase::Empty, false), Some("No videos available"));
    }

    #[test]
    fn keys_map_to_actions() {
        assert_eq!(action_for_key(KeyCode::Char('q')), Some(Action::Quit));
        assert_eq!(
            action_for_key(KeyCode::Down),
            Some(Action::Advance(Direction::Forward))
        );
        assert_eq!(
            action_for_key(KeyCode::Char('k')),
            Some(Action::Advance(Direction::Backward))
        );
        assert_eq!(
            action_for_key(KeyCode::Char('d')),
            Some(Action::Feedback(Feedback::Dislike))
        );
        assert_eq!(action_for_key(KeyCode::Char('z')), None);
    }

    #[test]
    fn like_key_records_feedback_on_current() {
        let source = Arc::new(ScriptedSource::with_batches([videos(&["a", "b", "c"])]));
        let mut model = model_with(source);
        assert!(model.status_message().starts_with("Loaded 3 videos"));

        model.handle_key(KeyCode::Char('j')).unwrap();
        model.handle_key(KeyCode::Char('l')).unwrap();
        let history = model.session().history();
        assert_eq!(history.feedback_for("b"), Some(Feedback::Like));
        assert!(history.is_played("a"));
        assert_eq!(model.status_message(), "Liked \"Clip b\".");
    }

    #[test]
    fn rating_last_item_fetches_more() {
        let source = Arc::new(ScriptedSource::with_batches([videos(&["a"])]));
        let mut model = model_with(source);
        model.handle_key(KeyCode::Char('d')).unwrap();
        assert!(model.session().feed().is_loading());
        assert!(model.status_message().ends_with("Fetching more…"));
    }

    #[test]
    fn feedback_on_empty_feed_is_an_error() {
        let source = Arc::new(ScriptedSource::with_batches([Vec::<VideoCandidate>::new()]));
        let mut model = model_with(source);
        assert_eq!(model.session().phase(), Phase::Empty);
        assert!(model.handle_key(KeyCode::Char('l')).is_err());
    }

    #[test]
    fn failed_load_surfaces_error_in_status() {
        let source = Arc::new(ScriptedSource::new([FetchOutcome::Failed(
            "connection refused".into(),
        )]));
        let model = model_with(source);
        assert!(model.status_message().contains("connection refused"));
    }

    #[test]
    fn quit_key_stops_loop() {
        let source = Arc::new(ScriptedSource::with_batches([videos(&["a"])]));
        let mut model = model_with(source);
        assert!(model.handle_key(KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn marks_reflect_history() {
        let source = Arc::new(ScriptedSource::with_batches([videos(&["a", "b"])]));
        let mut model = model_with(source);
        model.handle_key(KeyCode::Char('l')).unwrap();
        let history = model.session().history();
        assert_eq!(history_marks(history, "a"), "♥✓");
        assert_eq!(history_marks(history, "b"), "  ");
    }

    #[test]
    fn truncates_with_ellipsis() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefgh", 5), "abcd…");
        assert_eq!(truncate_to_width("🦀🦀🦀", 5), "🦀🦀…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn labels() {
        assert_eq!(position_label(0, 0), "0/0");
        assert_eq!(position_label(2, 10), "3/10");
        assert_eq!(playing_label(true), "▶ Playing");
        assert_eq!(playing_label(false), "⏸ Paused");
    }
}
