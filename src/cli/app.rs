use super::autocomplete::Autocompleter;
use super::command::{Command, HELP, PageTarget};
use super::ui;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use dragonball_admin::{
    AdminError, Character, Console, DomainController, Entry, HttpGateway, LoadOutcome,
    PageEnvelope, PageMove, Planet, Record, RemoteSource, Session, View,
    console::LoadRequest,
    core::apply_assignments,
};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use std::{error::Error, io, sync::Arc, time::Duration};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::Level;
use tui_textarea::{Input, Key, TextArea};

/// Oldest lines are dropped once the output log grows past this.
const MAX_MESSAGES: usize = 500;

/// A listing response travelling back from a spawned fetch.
pub enum LoadResult {
    Characters(u64, dragonball_admin::Result<PageEnvelope<Character>>),
    Planets(u64, dragonball_admin::Result<PageEnvelope<Planet>>),
}

pub struct App<'a> {
    pub textarea: TextArea<'a>,
    pub messages: Vec<Line<'static>>,
    pub console: Console,
    gateway: Arc<HttpGateway>,
    loads_tx: UnboundedSender<LoadResult>,
    loads_rx: UnboundedReceiver<LoadResult>,
    pub exit: bool,

    // Autocomplete State
    pub autocompleter: Autocompleter,
    pub suggestions: Vec<String>,
    pub suggestion_index: usize,
    pub popup_open: bool,
}

fn spawn_fetch<T: Record>(
    gateway: Arc<HttpGateway>,
    request: LoadRequest,
    tx: UnboundedSender<LoadResult>,
    wrap: fn(u64, dragonball_admin::Result<PageEnvelope<T>>) -> LoadResult,
) where
    HttpGateway: RemoteSource<T>,
{
    tokio::spawn(async move {
        let result =
            RemoteSource::<T>::fetch_page(gateway.as_ref(), request.page, request.page_size, &request.filters)
                .await;
        // The receiver only goes away when the app is shutting down.
        let _ = tx.send(wrap(request.ticket, result));
    });
}

fn create_record<T: Record>(
    listing: &mut DomainController<T>,
    session: &Session,
    assignments: &[String],
) -> dragonball_admin::Result<Entry<T>> {
    listing.begin_create(session)?;
    let mut record = T::default();
    if let Err(err) = apply_assignments(&mut record, assignments) {
        listing.cancel_edit();
        return Err(err);
    }
    listing.save(session, record).inspect_err(|_| listing.cancel_edit())
}

fn edit_record<T: Record>(
    listing: &mut DomainController<T>,
    session: &Session,
    id: u64,
    assignments: &[String],
) -> dragonball_admin::Result<Entry<T>> {
    let entry = listing.begin_edit(session, id)?;
    let mut record = entry.into_record();
    if let Err(err) = apply_assignments(&mut record, assignments) {
        listing.cancel_edit();
        return Err(err);
    }
    listing.save(session, record).inspect_err(|_| listing.cancel_edit())
}

fn describe<T: Record>(listing: &DomainController<T>, id: u64) -> Option<Vec<String>> {
    let entry = listing.find(id)?;
    let mut lines = vec![format!("{} {} ({})", T::LABEL, entry.id(), entry.origin())];
    match serde_json::to_string_pretty(entry.record()) {
        Ok(json) => lines.extend(json.lines().map(str::to_string)),
        Err(err) => lines.push(format!("<unprintable: {}>", err)),
    }
    Some(lines)
}

fn delete_prompt<T: Record>(listing: &DomainController<T>, id: u64) -> Option<String> {
    let entry = listing.find(id)?;
    Some(format!(
        "Delete {} '{}' (id {})? Run 'delete {} --yes' to confirm.",
        T::LABEL,
        entry.record().name(),
        id,
        id
    ))
}

fn trim_log<L>(messages: &mut Vec<L>, cap: usize) {
    if messages.len() > cap {
        let excess = messages.len() - cap;
        messages.drain(..excess);
    }
}

fn outcome_line<T: Record>(entry: &Entry<T>, verb: &str) -> String {
    match entry {
        Entry::Local(record) => format!("{} {} '{}' (id {}).", T::LABEL, verb, record.name(), record.id()),
        Entry::Remote(record) => format!(
            "{} {} '{}' (id {}) in this listing only; the remote API is read-only.",
            T::LABEL,
            verb,
            record.name(),
            record.id()
        ),
    }
}

impl<'a> App<'a> {
    pub fn new(console: Console, gateway: Arc<HttpGateway>) -> Self {
        let textarea = Self::new_textarea();
        let (loads_tx, loads_rx) = mpsc::unbounded_channel();

        let mut app = Self {
            textarea,
            messages: vec![
                Line::from(vec![Span::styled(
                    "Dragon Ball Admin",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )]),
                Line::from("Type a command and press Enter. 'help' lists commands."),
                Line::from("--------------------------------------------------"),
            ],
            console,
            gateway,
            loads_tx,
            loads_rx,
            exit: false,
            autocompleter: Autocompleter::new(),
            suggestions: Vec::new(),
            suggestion_index: 0,
            popup_open: false,
        };

        match app.console.session.user().cloned() {
            Some(user) => {
                app.push_info(format!("Signed in as {} ({}).", user.username, user.role));
            }
            None => app.push_info("Sign in with: login <username> <password>"),
        }
        app
    }

    fn new_textarea() -> TextArea<'static> {
        let mut textarea = TextArea::default();
        textarea.set_placeholder_text(
            "Enter a command (Enter to run, Tab to complete or switch view, Esc to quit)",
        );
        textarea.set_block(
            ratatui::widgets::Block::default()
                .borders(ratatui::widgets::Borders::ALL)
                .title(" Command "),
        );
        textarea
    }

    fn reset_textarea(&mut self) {
        self.textarea = Self::new_textarea();
    }

    fn input_is_empty(&self) -> bool {
        self.textarea.lines().iter().all(|line| line.trim().is_empty())
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn Error>> {
        if self.console.session.is_authenticated() {
            self.request_load(View::Characters);
            self.request_load(View::Planets);
        }

        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let res = self.run_loop(&mut terminal).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        if let Err(err) = res {
            println!("{:?}", err);
        }

        Ok(())
    }

    async fn run_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            self.drain_loads();
            terminal.draw(|f| ui::draw(f, self))?;

            if !event::poll(Duration::from_millis(100))? {
                continue;
            }

            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    // Navigation inside Popup
                    if self.popup_open {
                        match key.code {
                            KeyCode::Down => {
                                if !self.suggestions.is_empty() {
                                    self.suggestion_index =
                                        (self.suggestion_index + 1) % self.suggestions.len();
                                }
                                continue;
                            }
                            KeyCode::Up => {
                                if !self.suggestions.is_empty() {
                                    self.suggestion_index =
                                        (self.suggestion_index + self.suggestions.len() - 1)
                                            % self.suggestions.len();
                                }
                                continue;
                            }
                            KeyCode::Enter | KeyCode::Tab => {
                                self.accept_suggestion();
                                continue;
                            }
                            KeyCode::Esc => {
                                self.popup_open = false;
                                continue;
                            }
                            _ => {
                                self.popup_open = false;
                            }
                        }
                    }

                    match key.code {
                        KeyCode::Esc => {
                            self.exit = true;
                            return Ok(());
                        }
                        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                            self.exit = true;
                            return Ok(());
                        }
                        KeyCode::Enter => {
                            self.execute_command();
                        }
                        KeyCode::PageDown => self.step_page(PageMove::Next),
                        KeyCode::PageUp => self.step_page(PageMove::Previous),
                        KeyCode::Tab if self.input_is_empty() => {
                            let view = self.console.toggle_view();
                            self.push_info(format!("Showing {}.", view.title().to_lowercase()));
                        }
                        KeyCode::Tab => {
                            self.update_suggestions();
                            if !self.suggestions.is_empty() {
                                self.popup_open = true;
                                self.suggestion_index = 0;
                            }
                        }
                        _ => {
                            self.textarea.input(key);
                            if let KeyCode::Char(c) = key.code {
                                if c.is_alphabetic() {
                                    self.update_suggestions();
                                    self.popup_open = !self.suggestions.is_empty();
                                } else {
                                    self.popup_open = false;
                                }
                            }
                        }
                    }
                }
            }
            if self.exit {
                return Ok(());
            }
        }
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    fn request_load(&mut self, view: View) {
        match view {
            View::Characters => {
                let request = self.console.characters.prepare_load();
                spawn_fetch::<Character>(
                    self.gateway.clone(),
                    request,
                    self.loads_tx.clone(),
                    LoadResult::Characters,
                );
            }
            View::Planets => {
                let request = self.console.planets.prepare_load();
                spawn_fetch::<Planet>(
                    self.gateway.clone(),
                    request,
                    self.loads_tx.clone(),
                    LoadResult::Planets,
                );
            }
        }
    }

    fn drain_loads(&mut self) {
        while let Ok(result) = self.loads_rx.try_recv() {
            let (outcome, error) = match result {
                LoadResult::Characters(ticket, result) => {
                    let outcome = self.console.characters.apply_load(ticket, result);
                    (outcome, self.console.characters.error().map(str::to_string))
                }
                LoadResult::Planets(ticket, result) => {
                    let outcome = self.console.planets.apply_load(ticket, result);
                    (outcome, self.console.planets.error().map(str::to_string))
                }
            };
            if outcome == LoadOutcome::Failed {
                if let Some(message) = error {
                    self.push_error(message);
                }
            }
        }
    }

    fn step_page(&mut self, step: PageMove) {
        if !self.console.session.is_authenticated() {
            return;
        }
        let view = self.console.view();
        let moved = match view {
            View::Characters if self.console.characters.pagination_visible() => {
                self.console.characters.move_page(step)
            }
            View::Planets if self.console.planets.pagination_visible() => {
                self.console.planets.move_page(step)
            }
            _ => {
                self.push_info("Paging is disabled while filters are active.");
                false
            }
        };
        if moved {
            self.request_load(view);
        }
    }

    // ------------------------------------------------------------------
    // Autocomplete
    // ------------------------------------------------------------------

    fn update_suggestions(&mut self) {
        let (word, start) = self.get_current_word();
        if word.is_empty() {
            self.suggestions.clear();
            self.popup_open = false;
            return;
        }

        let first_word = self.textarea.lines()[self.textarea.cursor().0]
            .chars()
            .take(start)
            .all(char::is_whitespace);
        self.suggestions =
            self.autocompleter
                .get_suggestions(&word, first_word, self.console.view());
        self.suggestion_index = 0;
    }

    fn accept_suggestion(&mut self) {
        if self.suggestions.is_empty() {
            return;
        }
        let suggestion = self.suggestions[self.suggestion_index].clone();
        let (word, _) = self.get_current_word();

        for _ in 0..word.chars().count() {
            self.textarea.input(Input {
                key: Key::Backspace,
                ctrl: false,
                alt: false,
                shift: false,
            });
        }

        self.textarea.insert_str(&suggestion);
        self.popup_open = false;
    }

    fn get_current_word(&self) -> (String, usize) {
        let (line_idx, col_idx) = self.textarea.cursor();

        if line_idx >= self.textarea.lines().len() || col_idx == 0 {
            return (String::new(), 0);
        }

        let line = &self.textarea.lines()[line_idx];
        let prefix_chars: Vec<char> = line.chars().take(col_idx).collect();

        match prefix_chars.iter().rposition(|&c| !c.is_alphanumeric() && c != '_') {
            Some(separator) => (
                prefix_chars[separator + 1..].iter().collect(),
                separator + 1,
            ),
            None => (prefix_chars.iter().collect(), 0),
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    fn push_line(&mut self, line: Line<'static>) {
        self.messages.push(line);
        trim_log(&mut self.messages, MAX_MESSAGES);
    }

    fn push_info(&mut self, text: impl Into<String>) {
        self.push_line(Line::from(text.into()));
    }

    fn push_ok(&mut self, text: impl Into<String>) {
        self.push_line(Line::from(Span::styled(
            text.into(),
            Style::default().fg(Color::Green),
        )));
    }

    fn push_error(&mut self, text: impl Into<String>) {
        self.push_line(Line::from(Span::styled(
            format!("Error: {}", text.into()),
            Style::default().fg(Color::Red),
        )));
    }

    fn execute_command(&mut self) {
        let input = self.textarea.lines().join(" ");
        if input.trim().is_empty() {
            return;
        }

        // Passwords never reach the message log.
        let echoed = match input.split_whitespace().collect::<Vec<_>>().as_slice() {
            [head, username, ..] if head.eq_ignore_ascii_case("login") => {
                format!("login {} ****", username)
            }
            _ => input.clone(),
        };
        self.push_line(Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Yellow)),
            Span::raw(echoed),
        ]));
        self.reset_textarea();

        match Command::parse(&input) {
            Ok(command) => {
                if let Err(err) = self.dispatch(command) {
                    self.push_error(err.to_string());
                }
            }
            Err(message) => self.push_error(message),
        }
        self.push_line(Line::from(Span::styled(
            "-".repeat(50),
            Style::default().fg(Color::DarkGray),
        )));
    }

    fn dispatch(&mut self, command: Command) -> dragonball_admin::Result<()> {
        let gated = !matches!(command, Command::Login { .. } | Command::Help | Command::Quit);
        if gated && !self.console.session.is_authenticated() {
            return Err(AdminError::Forbidden(
                "sign in first: login <username> <password>".to_string(),
            ));
        }

        let view = self.console.view();
        match command {
            Command::Login { username, password } => {
                let user = self.console.session.login(&username, &password)?;
                self.push_ok(format!("Signed in as {} ({}).", user.username, user.role));
                tracing::event!(Level::INFO, user = %user.username, "console login");
                self.request_load(View::Characters);
                self.request_load(View::Planets);
            }
            Command::Logout => {
                self.console.session.logout()?;
                self.push_ok("Signed out. Sign in with: login <username> <password>");
            }
            Command::Help => {
                for line in HELP {
                    self.push_info(*line);
                }
            }
            Command::Quit => self.exit = true,
            Command::Switch(target) => {
                let next = match target {
                    Some(target) => {
                        self.console.set_view(target);
                        target
                    }
                    None => self.console.toggle_view(),
                };
                self.push_info(format!("Showing {}.", next.title().to_lowercase()));
            }
            Command::Filter { field, value } => {
                let changed = match view {
                    View::Characters => self.console.characters.set_filter(&field, &value)?,
                    View::Planets => self.console.planets.set_filter(&field, &value)?,
                };
                if changed {
                    self.request_load(view);
                }
            }
            Command::Clear => {
                let changed = match view {
                    View::Characters => self.console.characters.clear_filters(),
                    View::Planets => self.console.planets.clear_filters(),
                };
                if changed {
                    self.request_load(view);
                }
            }
            Command::Page(PageTarget::Move(step)) => self.step_page(step),
            Command::Page(PageTarget::Number(page)) => {
                let moved = match view {
                    View::Characters if self.console.characters.pagination_visible() => {
                        self.console.characters.goto_page(page)
                    }
                    View::Planets if self.console.planets.pagination_visible() => {
                        self.console.planets.goto_page(page)
                    }
                    _ => {
                        self.push_info("Paging is disabled while filters are active.");
                        false
                    }
                };
                if moved {
                    self.request_load(view);
                }
            }
            Command::Reload => self.request_load(view),
            Command::Show(id) => {
                let lines = match view {
                    View::Characters => describe(&self.console.characters, id),
                    View::Planets => describe(&self.console.planets, id),
                };
                let lines = lines.ok_or(AdminError::NotFound(id))?;
                for line in lines {
                    self.push_info(line);
                }
            }
            Command::Create(assignments) => {
                let session = &self.console.session;
                let line = match view {
                    View::Characters => {
                        outcome_line(&create_record(&mut self.console.characters, session, &assignments)?, "created")
                    }
                    View::Planets => {
                        outcome_line(&create_record(&mut self.console.planets, session, &assignments)?, "created")
                    }
                };
                self.push_ok(line);
            }
            Command::Edit { id, assignments } => {
                let session = &self.console.session;
                let line = match view {
                    View::Characters => outcome_line(
                        &edit_record(&mut self.console.characters, session, id, &assignments)?,
                        "updated",
                    ),
                    View::Planets => outcome_line(
                        &edit_record(&mut self.console.planets, session, id, &assignments)?,
                        "updated",
                    ),
                };
                self.push_ok(line);
            }
            Command::Delete { id, confirmed: false } => {
                self.console
                    .session
                    .require_admin(&format!("delete {}", view.title().to_lowercase()))?;
                let prompt = match view {
                    View::Characters => delete_prompt(&self.console.characters, id),
                    View::Planets => delete_prompt(&self.console.planets, id),
                };
                self.push_info(prompt.ok_or(AdminError::NotFound(id))?);
            }
            Command::Delete { id, confirmed: true } => {
                let session = &self.console.session;
                let line = match view {
                    View::Characters => {
                        outcome_line(&self.console.characters.delete(session, id)?, "deleted")
                    }
                    View::Planets => outcome_line(&self.console.planets.delete(session, id)?, "deleted"),
                };
                self.push_ok(line);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dragonball_admin::{MemoryKeyValueStore, OverlayStore};

    #[test]
    fn delete_prompt_names_the_record_and_the_confirming_command() {
        let mut overlay =
            OverlayStore::<Character>::open(Arc::new(MemoryKeyValueStore::new())).unwrap();
        overlay
            .create(Character::named(1_000_001, "Test").race("Human"))
            .unwrap();
        let listing = DomainController::new(overlay, 10);

        let prompt = delete_prompt(&listing, 1_000_001).unwrap();
        assert!(prompt.contains("'Test'"));
        assert!(prompt.contains("delete 1000001 --yes"));
        assert!(delete_prompt(&listing, 7).is_none());
    }

    #[test]
    fn log_keeps_only_the_newest_lines() {
        let mut log: Vec<u32> = (0..510).collect();
        trim_log(&mut log, 500);
        assert_eq!(log.len(), 500);
        assert_eq!(log.first(), Some(&10));
        assert_eq!(log.last(), Some(&509));

        let mut short = vec![1, 2, 3];
        trim_log(&mut short, 500);
        assert_eq!(short, vec![1, 2, 3]);
    }
}
