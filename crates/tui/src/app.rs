use std::{future::Future, io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc};
use tracing::{debug, error, info, warn};

use gamefinder_core::{
    api::HttpTransport,
    detail::{auto_navigation_target, resolve_detail_target},
    models::ResultPresentation,
    selection::MAX_SELECTED_TAGS,
    AppConfig, CanonicalResult, DetailState, DetailView, FetchError, FetchResult, GameFinder,
    HistoryEntry, Tag, TagSelection, User, ViewScope, ViewTicket,
};

use crate::input::{Credentials, FormKind, FormState};

const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Tags,
    Results,
    Details,
    History,
    Account,
    Profile,
}

impl Screen {
    fn title(self) -> &'static str {
        match self {
            Screen::Tags => "Pick tags",
            Screen::Results => "Recommendation",
            Screen::Details => "Game details",
            Screen::History => "History",
            Screen::Account => "Account",
            Screen::Profile => "Profile",
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    TagsLoaded(FetchResult<Vec<Tag>>),
    SearchFinished(FetchResult<CanonicalResult>),
    ResultLoaded(FetchResult<CanonicalResult>),
    DetailsResolved(DetailState),
    HistoryLoaded(FetchResult<Vec<HistoryEntry>>),
    SignedIn(FetchResult<User>),
}

/// Terminal front end: one screen at a time, async work bound to the screen that started it.
pub struct GameFinderApp {
    finder: GameFinder<HttpTransport>,
    config: AppConfig,
    scope: ViewScope,
    ticket: ViewTicket,
    screen: Screen,
    state: UiState,
    selection: TagSelection,
    result: Option<CanonicalResult>,
    detail: Option<DetailView>,
    detail_return: Screen,
    history: Vec<HistoryEntry>,
    form: Option<FormState>,
    after_sign_in: Screen,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    theme: Theme,
}

impl GameFinderApp {
    pub fn new(finder: GameFinder<HttpTransport>, config: AppConfig) -> Self {
        let scope = ViewScope::new();
        let ticket = scope.enter();
        Self {
            finder,
            config,
            scope,
            ticket,
            screen: Screen::Tags,
            state: UiState::default(),
            selection: TagSelection::new(),
            result: None,
            detail: None,
            detail_return: Screen::Results,
            history: Vec::new(),
            form: None,
            after_sign_in: Screen::Profile,
            event_tx: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        self.load_tags(false);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) || self.state.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        info!("GameFinder stopped");
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    self.state.set_status(format!("Error: {err}"));
                }
            }
            Some(AppEvent::Tick) => self.state.advance_spinner(),
            Some(AppEvent::TagsLoaded(result)) => {
                self.state.loading = false;
                match result {
                    Ok(tags) => {
                        self.state
                            .set_status(format!("{} tags available", tags.len()));
                        self.state.tags = tags;
                        self.state.tag_cursor = 0;
                    }
                    Err(err) => {
                        error!(%err, "Tag listing failed");
                        self.state
                            .set_status(format!("Could not load tags: {err} (r to retry)"));
                    }
                }
            }
            Some(AppEvent::SearchFinished(result)) => {
                self.state.loading = false;
                match result {
                    Ok(result) => self.show_search_result(result),
                    Err(FetchError::Validation(message)) => self.state.set_status(message),
                    Err(err) => {
                        error!(%err, "Search failed");
                        self.state.set_status(format!("Search failed: {err}"));
                    }
                }
            }
            Some(AppEvent::ResultLoaded(result)) => {
                self.state.loading = false;
                match result {
                    Ok(result) => {
                        self.state.result_cursor = 0;
                        self.result = Some(result);
                    }
                    Err(err) => {
                        error!(%err, "Result lookup failed");
                        self.state.set_status(format!("Could not load result: {err}"));
                    }
                }
            }
            Some(AppEvent::DetailsResolved(outcome)) => {
                self.state.loading = false;
                if let Some(view) = self.detail.as_mut() {
                    if view.resolve(outcome) {
                        debug!(id = view.id(), "Detail view resolved");
                    }
                }
            }
            Some(AppEvent::HistoryLoaded(result)) => {
                self.state.loading = false;
                match result {
                    Ok(entries) => {
                        self.state
                            .set_status(format!("{} past searches", entries.len()));
                        self.history = entries;
                        self.state.history_cursor = 0;
                    }
                    Err(err) => {
                        error!(%err, "History failed");
                        self.state
                            .set_status(format!("Could not load history: {err} (r to retry)"));
                    }
                }
            }
            Some(AppEvent::SignedIn(result)) => self.finish_sign_in(result),
            None => return false,
        }
        true
    }

    /// Enter `screen`, abandoning whatever the previous screen was waiting for.
    fn navigate(&mut self, screen: Screen) {
        self.ticket = self.scope.enter();
        self.screen = screen;
        self.state.loading = false;
        debug!(screen = ?screen, generation = self.ticket.generation(), "Navigated");
    }

    /// Run `task` on behalf of the current screen; its event is dropped once the screen is left.
    fn spawn_for_view<F>(&mut self, task: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let Some(sender) = self.event_tx.clone() else {
            self.state
                .set_status("Internal error: event channel unavailable".to_string());
            error!("event_channel_missing");
            return;
        };
        let ticket = self.ticket.clone();
        self.state.loading = true;
        spawn(async move {
            match ticket.run(task).await {
                Some(event) => {
                    let _ = sender.send(event).await;
                }
                None => debug!("Discarded response for a screen that was left"),
            }
        });
    }

    fn load_tags(&mut self, refresh: bool) {
        let games = self.finder.games.clone();
        let count = Some(self.config.tag_count);
        self.state.set_status(if refresh {
            "Refreshing tags…".to_string()
        } else {
            "Loading tags…".to_string()
        });
        self.spawn_for_view(async move {
            AppEvent::TagsLoaded(games.fetch_available_tags(count, refresh).await)
        });
    }

    fn submit_search(&mut self) {
        if self.state.loading {
            self.state.set_status("Still loading…".to_string());
            return;
        }
        if self.selection.is_empty() {
            self.state
                .set_status("Select at least one tag before searching".to_string());
            return;
        }
        let request = self.selection.to_request();
        info!(tags = ?request.tags, "Submitting search");
        self.state.set_status("Finding a game…".to_string());
        let games = self.finder.games.clone();
        self.spawn_for_view(async move { AppEvent::SearchFinished(games.submit_search(&request).await) });
    }

    fn show_search_result(&mut self, result: CanonicalResult) {
        if !result.has_recommendation() {
            self.state
                .set_status("No game matched those tags".to_string());
        } else {
            self.state
                .set_status(format!("Recommended: {}", result.display_name));
        }
        let auto_target = auto_navigation_target(&result);
        self.result = Some(result);
        self.state.result_cursor = 0;
        match auto_target {
            Some(target) => self.open_details(target.id, Screen::Results),
            None => self.navigate(Screen::Results),
        }
    }

    fn open_results(&mut self) {
        let Some(result_id) = self
            .result
            .as_ref()
            .map(|result| result.internal_id.clone())
        else {
            self.go_home();
            return;
        };
        self.navigate(Screen::Results);
        if result_id.is_empty() {
            return;
        }
        let games = self.finder.games.clone();
        self.spawn_for_view(async move {
            AppEvent::ResultLoaded(games.fetch_result_by_id(&result_id).await)
        });
    }

    fn open_details(&mut self, id: String, return_to: Screen) {
        self.navigate(Screen::Details);
        self.detail_return = return_to;
        self.detail = Some(DetailView::open(id.clone()));
        self.start_detail_load(id);
    }

    fn start_detail_load(&mut self, id: String) {
        let resolver = self.finder.details.clone();
        self.spawn_for_view(async move { AppEvent::DetailsResolved(resolver.load(&id).await) });
    }

    fn retry_details(&mut self) {
        let Some(view) = self.detail.as_mut() else {
            return;
        };
        if view.retry() {
            let id = view.id().to_string();
            info!(id = %id, "Retrying detail lookup");
            self.start_detail_load(id);
        }
    }

    fn open_history(&mut self, force: bool) {
        if !self.finder.session().is_authenticated() {
            self.state
                .set_status("Sign in to see your history".to_string());
            self.open_account(FormKind::Login, Screen::History);
            return;
        }
        if self.screen != Screen::History {
            self.navigate(Screen::History);
        }
        let auth = self.finder.auth.clone();
        self.spawn_for_view(async move { AppEvent::HistoryLoaded(auth.fetch_history(force).await) });
    }

    fn open_profile(&mut self) {
        if self.finder.session().is_authenticated() {
            self.navigate(Screen::Profile);
        } else {
            self.open_account(FormKind::Login, Screen::Profile);
        }
    }

    fn open_account(&mut self, kind: FormKind, after: Screen) {
        self.navigate(Screen::Account);
        self.after_sign_in = after;
        self.form = Some(FormState::new(kind));
    }

    fn go_home(&mut self) {
        self.navigate(Screen::Tags);
        if self.state.tags.is_empty() {
            self.load_tags(false);
        }
    }

    fn submit_form(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        if form.submitting {
            return;
        }
        let credentials = match form.credentials() {
            Ok(credentials) => credentials,
            Err(err) => {
                debug!(field = ?err.field, "Form rejected locally");
                return;
            }
        };
        form.error = None;
        form.submitting = true;
        let auth = self.finder.auth.clone();
        self.spawn_for_view(async move {
            let outcome = match credentials {
                Credentials::Login(form) => auth.login(&form).await,
                Credentials::Register(form) => auth.register(&form).await,
            };
            AppEvent::SignedIn(outcome)
        });
    }

    fn finish_sign_in(&mut self, result: FetchResult<User>) {
        self.state.loading = false;
        match result {
            Ok(user) => {
                self.form = None;
                let greeting = if user.name.is_empty() {
                    user.email.clone()
                } else {
                    user.name.clone()
                };
                self.state.set_status(format!("Welcome, {greeting}"));
                match self.after_sign_in {
                    Screen::History => self.open_history(false),
                    _ => self.navigate(Screen::Profile),
                }
            }
            Err(err) => {
                warn!(%err, "Sign-in failed");
                if let Some(form) = self.form.as_mut() {
                    form.submitting = false;
                    form.error = Some(match err {
                        FetchError::Unauthorized(_) => "Invalid e-mail or password".to_string(),
                        other => other.to_string(),
                    });
                }
            }
        }
    }

    fn logout(&mut self) {
        self.finder.auth.logout();
        self.history.clear();
        self.result = None;
        self.detail = None;
        self.state.set_status("Signed out".to_string());
        self.go_home();
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return Ok(());
        }
        if self.screen == Screen::Account {
            return self.handle_form_key(key);
        }
        if self.handle_global_shortcut(&key) {
            return Ok(());
        }
        match self.screen {
            Screen::Tags => self.handle_tags_key(key),
            Screen::Results => self.handle_results_key(key),
            Screen::Details => self.handle_details_key(key),
            Screen::History => self.handle_history_key(key),
            Screen::Profile => self.handle_profile_key(key),
            Screen::Account => {}
        }
        Ok(())
    }

    fn handle_global_shortcut(&mut self, key: &KeyEvent) -> bool {
        if !key.modifiers.is_empty() && key.modifiers != KeyModifiers::SHIFT {
            return false;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.state.should_quit = true,
            KeyCode::Char('t') => self.go_home(),
            KeyCode::Char('h') => self.open_history(false),
            KeyCode::Char('p') => self.open_profile(),
            _ => return false,
        }
        true
    }

    fn handle_tags_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.state.tag_cursor = step(self.state.tag_cursor, 1, self.state.tags.len());
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.tag_cursor = step(self.state.tag_cursor, -1, self.state.tags.len());
            }
            KeyCode::Char(' ') => {
                let Some(tag) = self.state.tags.get(self.state.tag_cursor).cloned() else {
                    return;
                };
                let name = tag.name.clone();
                let was_selected = self.selection.contains(&tag.id);
                if self.selection.toggle(tag) {
                    let verb = if was_selected { "Removed" } else { "Added" };
                    self.state.set_status(format!(
                        "{verb} {name} ({}/{MAX_SELECTED_TAGS})",
                        self.selection.len()
                    ));
                } else {
                    self.state.set_status(format!(
                        "At most {MAX_SELECTED_TAGS} tags can be selected"
                    ));
                }
            }
            KeyCode::Char('c') => {
                self.selection.clear_tags();
                self.state.set_status("Selection cleared".to_string());
            }
            KeyCode::Char('r') => self.load_tags(true),
            KeyCode::Enter => self.submit_search(),
            _ => {}
        }
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        let grid_len = self
            .result
            .as_ref()
            .filter(|result| result.presentation() == ResultPresentation::SummaryGrid)
            .map(|result| result.summary_list.len())
            .unwrap_or(0);
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.state.result_cursor = step(self.state.result_cursor, 1, grid_len);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.result_cursor = step(self.state.result_cursor, -1, grid_len);
            }
            KeyCode::Enter => {
                let Some(result) = self.result.as_ref() else {
                    return;
                };
                let clicked = (grid_len > 0)
                    .then(|| result.summary_list.get(self.state.result_cursor))
                    .flatten()
                    .map(|summary| summary.id.as_str());
                match resolve_detail_target(result, clicked) {
                    Some(target) => self.open_details(target.id, Screen::Results),
                    None => self
                        .state
                        .set_status("This result has no details to show".to_string()),
                }
            }
            KeyCode::Esc => self.go_home(),
            _ => {}
        }
    }

    fn handle_details_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') => self.retry_details(),
            KeyCode::Esc | KeyCode::Backspace => match self.detail_return {
                Screen::History => self.open_history(false),
                _ => self.open_results(),
            },
            KeyCode::Home => self.go_home(),
            _ => {}
        }
    }

    fn handle_history_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.state.history_cursor = step(self.state.history_cursor, 1, self.history.len());
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.history_cursor =
                    step(self.state.history_cursor, -1, self.history.len());
            }
            KeyCode::Char('r') => self.open_history(true),
            KeyCode::Enter => {
                if let Some(entry) = self.history.get(self.state.history_cursor) {
                    let id = entry.detail_target_id().to_string();
                    self.open_details(id, Screen::History);
                }
            }
            KeyCode::Esc => self.go_home(),
            _ => {}
        }
    }

    fn handle_profile_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('o') => self.logout(),
            KeyCode::Esc => self.go_home(),
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Esc {
            self.form = None;
            self.go_home();
            return Ok(());
        }
        if key.code == KeyCode::Enter {
            self.submit_form();
            return Ok(());
        }
        let Some(form) = self.form.as_mut() else {
            self.go_home();
            return Ok(());
        };
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('t') {
            *form = form.toggled();
            return Ok(());
        }
        match key.code {
            KeyCode::Tab | KeyCode::Down => form.move_focus(1),
            KeyCode::BackTab | KeyCode::Up => form.move_focus(-1),
            code => {
                let Some(field) = form.focused_mut() else {
                    return Ok(());
                };
                match code {
                    KeyCode::Left => field.move_cursor(-1),
                    KeyCode::Right => field.move_cursor(1),
                    KeyCode::Home => field.move_home(),
                    KeyCode::End => field.move_end(),
                    KeyCode::Backspace => field.backspace(),
                    KeyCode::Delete => field.delete(),
                    KeyCode::Char(ch) => field.insert(ch),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(4),
            ])
            .split(area);

        self.render_header(frame, chunks[0]);
        match self.screen {
            Screen::Tags => self.draw_tags(frame, chunks[1]),
            Screen::Results => self.draw_results(frame, chunks[1]),
            Screen::Details => self.draw_details(frame, chunks[1]),
            Screen::History => self.draw_history(frame, chunks[1]),
            Screen::Account => self.draw_account(frame, chunks[1]),
            Screen::Profile => self.draw_profile(frame, chunks[1]),
        }
        self.render_status(frame, chunks[2]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let account = match self.finder.session().user() {
            Some(user) if !user.name.is_empty() => format!("signed in as {}", user.name),
            Some(user) => format!("signed in as {}", user.email),
            None => "not signed in".to_string(),
        };
        let line = Line::from(vec![
            Span::styled(
                "GameFinder",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  ·  "),
            Span::styled(self.screen.title(), Style::default().fg(self.theme.primary_fg)),
            Span::raw("  ·  "),
            Span::styled(account, Style::default().fg(self.theme.muted)),
        ]);
        let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, area);
    }

    fn draw_tags(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);

        let items: Vec<ListItem> = self
            .state
            .tags
            .iter()
            .map(|tag| {
                let selected = self.selection.contains(&tag.id);
                let marker = if selected { "[x] " } else { "[ ] " };
                let style = if selected {
                    Style::default()
                        .fg(self.theme.success)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.primary_fg)
                };
                ListItem::new(Line::from(vec![
                    Span::styled(marker, style),
                    Span::styled(tag.name.clone(), style),
                ]))
            })
            .collect();
        let title = if self.state.loading && self.state.tags.is_empty() {
            format!("Tags {}", self.state.spinner())
        } else {
            "Tags".to_string()
        };
        let mut list_state = ListState::default();
        if !items.is_empty() {
            list_state.select(Some(self.state.tag_cursor.min(items.len() - 1)));
        }
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, columns[0], &mut list_state);

        let mut lines: Vec<Line> = self
            .selection
            .tags()
            .iter()
            .map(|tag| Line::from(format!("• {}", tag.name)))
            .collect();
        if lines.is_empty() {
            lines.push(Line::from(Span::styled(
                "Nothing selected yet",
                Style::default().fg(self.theme.muted),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(format!(
            "{} more can be added",
            self.selection.remaining()
        )));
        if self.state.loading && !self.state.tags.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("Searching {}", self.state.spinner()),
                Style::default().fg(self.theme.warning),
            )));
        }
        let selected = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Selected {}/{MAX_SELECTED_TAGS}",
                self.selection.len()
            )))
            .wrap(Wrap { trim: true });
        frame.render_widget(selected, columns[1]);
    }

    fn draw_results(&self, frame: &mut Frame, area: Rect) {
        let Some(result) = self.result.as_ref() else {
            let placeholder = if self.state.loading {
                format!("Loading {}", self.state.spinner())
            } else {
                "No result yet".to_string()
            };
            frame.render_widget(
                Paragraph::new(placeholder)
                    .block(Block::default().borders(Borders::ALL).title("Result")),
                area,
            );
            return;
        };

        match result.presentation() {
            ResultPresentation::FullDetail => {
                let mut lines = vec![Line::from(Span::styled(
                    result.display_name.clone(),
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                ))];
                if let Some(details) = result.details.as_ref() {
                    if let Some(year) = details.release_year {
                        lines.push(Line::from(format!("Released: {year}")));
                    }
                    if !details.platforms.is_empty() {
                        lines.push(Line::from(format!(
                            "Platforms: {}",
                            details.platforms.join(", ")
                        )));
                    }
                    if let Some(art) = details.box_art.as_deref().filter(|art| !art.is_empty()) {
                        lines.push(Line::from(Span::styled(
                            format!("Box art: {art}"),
                            Style::default().fg(self.theme.muted),
                        )));
                    }
                    if let Some(summary) = details.summary.as_deref() {
                        lines.push(Line::from(""));
                        lines.push(Line::from(summary.to_string()));
                    }
                }
                lines.push(Line::from(""));
                lines.push(hint_line(&[("Enter", "view details"), ("Esc", "new search")]));
                let paragraph = Paragraph::new(lines)
                    .block(Block::default().borders(Borders::ALL).title("Recommended game"))
                    .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, area);
            }
            ResultPresentation::SummaryGrid => {
                let items: Vec<ListItem> = result
                    .summary_list
                    .iter()
                    .map(|summary| {
                        let mut spans = vec![Span::styled(
                            summary.title.clone(),
                            Style::default().add_modifier(Modifier::BOLD),
                        )];
                        if !summary.description.is_empty() {
                            spans.push(Span::styled(
                                format!(" · {}", summary.description),
                                Style::default().fg(self.theme.muted),
                            ));
                        }
                        ListItem::new(Line::from(spans))
                    })
                    .collect();
                let mut list_state = ListState::default();
                list_state.select(Some(
                    self.state
                        .result_cursor
                        .min(result.summary_list.len().saturating_sub(1)),
                ));
                let list = List::new(items)
                    .block(Block::default().borders(Borders::ALL).title("Suggestions"))
                    .highlight_style(Style::default().bg(self.theme.selection_bg))
                    .highlight_symbol("▶ ");
                frame.render_stateful_widget(list, area, &mut list_state);
            }
            ResultPresentation::NameOnly => {
                let name = if result.display_name.is_empty() {
                    "No recommendation".to_string()
                } else {
                    result.display_name.clone()
                };
                let lines = vec![
                    Line::from(Span::styled(
                        name,
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        "No further information available",
                        Style::default().fg(self.theme.muted),
                    )),
                ];
                let paragraph = Paragraph::new(lines)
                    .alignment(Alignment::Center)
                    .block(Block::default().borders(Borders::ALL).title("Result"));
                frame.render_widget(paragraph, area);
            }
        }
    }

    fn draw_details(&self, frame: &mut Frame, area: Rect) {
        let Some(view) = self.detail.as_ref() else {
            return;
        };
        let back = match self.detail_return {
            Screen::History => "back to history",
            _ => "back to result",
        };
        let mut lines = Vec::new();
        let title;
        match view.state() {
            DetailState::Loading => {
                title = "Loading".to_string();
                lines.push(Line::from(format!(
                    "Fetching game {} {}",
                    view.id(),
                    self.state.spinner()
                )));
            }
            DetailState::Full(details) => {
                title = details.name.clone();
                lines.push(Line::from(Span::styled(
                    details.name.clone(),
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                )));
                if let Some(released) = details.release_label() {
                    lines.push(Line::from(format!("Released: {released}")));
                }
                if let Some(score) = details.critic_score {
                    lines.push(Line::from(format!("Critic score: {score}")));
                }
                if !details.platforms.is_empty() {
                    lines.push(Line::from(format!(
                        "Platforms: {}",
                        details.platforms.join(", ")
                    )));
                }
                if !details.genres.is_empty() {
                    lines.push(Line::from(format!("Genres: {}", details.genres.join(", "))));
                }
                if !details.hero_image.is_empty() {
                    lines.push(Line::from(Span::styled(
                        format!("Image: {}", details.hero_image),
                        Style::default().fg(self.theme.muted),
                    )));
                }
                if !details.screenshots.is_empty() {
                    lines.push(Line::from(Span::styled(
                        format!("{} screenshots", details.screenshots.len()),
                        Style::default().fg(self.theme.muted),
                    )));
                }
                let description = details.description_text();
                if !description.is_empty() {
                    lines.push(Line::from(""));
                    lines.push(Line::from(description));
                }
            }
            DetailState::Degraded { name } => {
                title = name.clone();
                lines.push(Line::from(Span::styled(
                    name.clone(),
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(Span::styled(
                    "Only limited information is available for this game",
                    Style::default().fg(self.theme.warning),
                )));
            }
            DetailState::Error { message, retryable } => {
                title = "Unavailable".to_string();
                lines.push(Line::from(Span::styled(
                    message.clone(),
                    Style::default().fg(self.theme.danger),
                )));
                if *retryable {
                    lines.push(Line::from(""));
                    lines.push(hint_line(&[("r", "retry")]));
                }
            }
        }
        lines.push(Line::from(""));
        lines.push(hint_line(&[("Esc", back), ("Home", "new search")]));
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_history(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let items: Vec<ListItem> = self
            .history
            .iter()
            .map(|entry| {
                let mut spans = vec![Span::styled(
                    entry.display_name(),
                    Style::default().add_modifier(Modifier::BOLD),
                )];
                if let Some(created) = entry.created_label() {
                    spans.push(Span::styled(
                        format!(" · {created}"),
                        Style::default().fg(self.theme.muted),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();
        let title = if self.state.loading {
            format!("Past searches {}", self.state.spinner())
        } else {
            format!("Past searches ({})", self.history.len())
        };
        let mut list_state = ListState::default();
        if !items.is_empty() {
            list_state.select(Some(self.state.history_cursor.min(items.len() - 1)));
        }
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, columns[0], &mut list_state);

        let mut lines = Vec::new();
        match self.history.get(self.state.history_cursor) {
            Some(entry) => {
                lines.push(Line::from(Span::styled(
                    entry.display_name(),
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                )));
                if !entry.tags.is_empty() {
                    lines.push(Line::from(format!("Tags: {}", entry.tags.join(", "))));
                }
                if let Some(thumbnail) = entry.thumbnail() {
                    lines.push(Line::from(Span::styled(
                        format!("Image: {thumbnail}"),
                        Style::default().fg(self.theme.muted),
                    )));
                }
                if let Some(summary) = entry.summary() {
                    lines.push(Line::from(""));
                    lines.push(Line::from(summary.to_string()));
                }
                lines.push(Line::from(""));
                lines.push(hint_line(&[("Enter", "details"), ("r", "refresh")]));
            }
            None if !self.state.loading => {
                lines.push(Line::from("No searches yet"));
            }
            None => {}
        }
        let detail = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Entry"))
            .wrap(Wrap { trim: true });
        frame.render_widget(detail, columns[1]);
    }

    fn draw_account(&self, frame: &mut Frame, area: Rect) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let height = (form.fields.len() as u16 * 2 + 6).min(area.height);
        let width = 60.min(area.width);
        let popup = centered_rect(width, height, area);
        frame.render_widget(Clear, popup);

        let mut lines = Vec::new();
        for (idx, field) in form.fields.iter().enumerate() {
            let focused = idx == form.focus;
            let label_style = if focused {
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.muted)
            };
            lines.push(Line::from(Span::styled(field.label(), label_style)));
            lines.push(Line::from(vec![
                Span::styled("> ", label_style),
                Span::raw(field.display()),
            ]));
        }
        lines.push(Line::from(""));
        if form.submitting {
            lines.push(Line::from(format!("Please wait {}", self.state.spinner())));
        } else if let Some(error) = form.error.as_deref() {
            lines.push(Line::from(Span::styled(
                error.to_string(),
                Style::default().fg(self.theme.danger),
            )));
        } else {
            lines.push(Line::from(""));
        }
        let switch = match form.kind {
            FormKind::Login => "create account",
            FormKind::Register => "sign in instead",
        };
        lines.push(hint_line(&[
            ("Enter", "submit"),
            ("Tab", "next"),
            ("Ctrl+T", switch),
            ("Esc", "cancel"),
        ]));

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(form.title()));
        frame.render_widget(paragraph, popup);

        if let Some(field) = form.fields.get(form.focus) {
            let cursor_x = (popup.x + 3 + field.cursor() as u16)
                .min(popup.x + popup.width.saturating_sub(2));
            let cursor_y = popup.y + 2 + form.focus as u16 * 2;
            frame.set_cursor(cursor_x, cursor_y);
        }
    }

    fn draw_profile(&self, frame: &mut Frame, area: Rect) {
        let lines = match self.finder.session().user() {
            Some(user) => vec![
                Line::from(Span::styled(
                    user.name.clone(),
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(format!("E-mail: {}", user.email)),
                Line::from(format!(
                    "Nickname: {}",
                    if user.nickname.is_empty() {
                        "-"
                    } else {
                        user.nickname.as_str()
                    }
                )),
                Line::from(Span::styled(
                    format!("Id: {}", user.id),
                    Style::default().fg(self.theme.muted),
                )),
                Line::from(""),
                hint_line(&[("h", "history"), ("o", "sign out")]),
            ],
            None => vec![Line::from("Not signed in")],
        };
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Profile"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let keys = match self.screen {
            Screen::Tags => hint_line(&[
                ("Space", "toggle"),
                ("Enter", "search"),
                ("c", "clear"),
                ("r", "refresh"),
                ("h", "history"),
                ("p", "profile"),
                ("q", "quit"),
            ]),
            Screen::Account => hint_line(&[("Ctrl+C", "quit")]),
            _ => hint_line(&[("t", "tags"), ("h", "history"), ("p", "profile"), ("q", "quit")]),
        };
        let paragraph = Paragraph::new(vec![Line::from(self.state.status.clone()), keys])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn hint_line(pairs: &[(&str, &str)]) -> Line<'static> {
    let mut spans = Vec::new();
    for (key, action) in pairs {
        spans.push(Span::styled(
            key.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!(" {action}  ")));
    }
    Line::from(spans)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    tags: Vec<Tag>,
    tag_cursor: usize,
    result_cursor: usize,
    history_cursor: usize,
    status: String,
    loading: bool,
    spinner: usize,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            tag_cursor: 0,
            result_cursor: 0,
            history_cursor: 0,
            status: "Ready".to_string(),
            loading: false,
            spinner: 0,
            should_quit: false,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: String) {
        self.status = format!("[{}] {message}", Local::now().format("%H:%M:%S"));
    }

    fn advance_spinner(&mut self) {
        if self.loading {
            self.spinner = self.spinner.wrapping_add(1);
        }
    }

    fn spinner(&self) -> &'static str {
        const FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
        FRAMES[self.spinner % FRAMES.len()]
    }
}

/// Move a list cursor by `delta`, clamped to `len`.
fn step(cursor: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (cursor as isize + delta).clamp(0, len as isize - 1) as usize
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_clamps_to_list_bounds() {
        assert_eq!(step(0, -1, 3), 0);
        assert_eq!(step(2, 1, 3), 2);
        assert_eq!(step(1, 1, 3), 2);
        assert_eq!(step(5, 1, 0), 0);
    }

    #[test]
    fn centered_rect_fits_inside_area() {
        let area = Rect::new(0, 0, 40, 10);
        let rect = centered_rect(60, 6, area);
        assert_eq!(rect.width, 40);
        assert_eq!(rect.y, 2);
    }

    fn offline_app() -> GameFinderApp {
        let config = AppConfig::default();
        let finder = GameFinder::connect(&config).expect("http client");
        GameFinderApp::new(finder, config)
    }

    #[test]
    fn search_while_loading_reports_status() {
        let mut app = offline_app();
        app.selection.add_tag(Tag::new("1", "RPG"));
        app.state.loading = true;

        app.submit_search();
        assert!(app.state.status.ends_with("Still loading…"));
        assert!(app.state.loading);
    }

    #[test]
    fn empty_selection_is_not_submitted() {
        let mut app = offline_app();
        app.submit_search();
        assert!(app.state.status.ends_with("Select at least one tag before searching"));
        assert!(!app.state.loading);
    }
}
