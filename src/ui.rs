use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use inventaire::{AuthGate, ExportFormat, FormError, FormState, InventoryForm};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Login,
    Inventory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Identity,
    Passphrase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    References,
    Quantities,
}

impl Focus {
    fn other(&self) -> Self {
        match self {
            Focus::References => Focus::Quantities,
            Focus::Quantities => Focus::References,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Success(String),
    Error(String),
}

pub struct App {
    pub form: InventoryForm,
    gate: AuthGate,
    pub page: Page,
    pub identity: String,
    pub passphrase: String,
    pub login_field: LoginField,
    pub focus: Focus,
    pub references_state: ListState,
    pub quantities_state: TableState,
    pub status: Option<Status>,
    pub export_path: PathBuf,
}

impl App {
    pub fn new(form: InventoryForm, gate: AuthGate) -> Self {
        Self {
            form,
            gate,
            page: Page::Login,
            identity: String::new(),
            passphrase: String::new(),
            login_field: LoginField::Identity,
            focus: Focus::References,
            references_state: ListState::default(),
            quantities_state: TableState::default(),
            status: None,
            export_path: PathBuf::from(ExportFormat::Xlsx.file_name()),
        }
    }

    /// Returns true when the user asked to quit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        match self.page {
            Page::Login => self.handle_login_key(key),
            Page::Inventory => self.handle_inventory_key(key),
        }
    }

    // ========================================================================
    // LOGIN PAGE
    // ========================================================================

    fn handle_login_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => return true,
            KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
                self.login_field = match self.login_field {
                    LoginField::Identity => LoginField::Passphrase,
                    LoginField::Passphrase => LoginField::Identity,
                };
            }
            KeyCode::Backspace => {
                self.active_login_field().pop();
            }
            KeyCode::Char(c) => self.active_login_field().push(c),
            KeyCode::Enter => self.sign_in(),
            _ => {}
        }
        false
    }

    fn active_login_field(&mut self) -> &mut String {
        match self.login_field {
            LoginField::Identity => &mut self.identity,
            LoginField::Passphrase => &mut self.passphrase,
        }
    }

    fn sign_in(&mut self) {
        let result = self.form.sign_in(&self.gate, &self.identity, &self.passphrase);
        self.passphrase.clear();

        match result {
            Ok(FormState::FullyInventoried) => {
                self.enter_inventory();
                self.status = Some(Status::Info("Toutes les références ont été inventoriées.".into()));
            }
            Ok(_) => {
                self.enter_inventory();
                self.status = Some(Status::Success("Connexion réussie.".into()));
            }
            Err(FormError::Auth(e)) => self.status = Some(Status::Error(e.to_string())),
            Err(e) => {
                // Signed in, but the store could not be read
                if self.form.session().is_authenticated() {
                    self.enter_inventory();
                }
                self.status = Some(Status::Error(e.to_string()));
            }
        }
    }

    fn enter_inventory(&mut self) {
        self.page = Page::Inventory;
        self.focus = Focus::References;
        self.clamp_cursors();
    }

    // ========================================================================
    // INVENTORY PAGE
    // ========================================================================

    fn handle_inventory_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.focus = self.focus.other(),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Char(' ') if self.focus == Focus::References => self.toggle_current(),
            KeyCode::Char(d) if d.is_ascii_digit() && self.focus == Focus::Quantities => {
                let digit = d.to_digit(10).unwrap_or(0);
                self.edit_quantity(|q| q.saturating_mul(10).saturating_add(digit));
            }
            KeyCode::Backspace if self.focus == Focus::Quantities => self.edit_quantity(|q| q / 10),
            KeyCode::Char('+') if self.focus == Focus::Quantities => {
                self.edit_quantity(|q| q.saturating_add(1))
            }
            KeyCode::Char('-') if self.focus == Focus::Quantities => {
                self.edit_quantity(|q| q.saturating_sub(1))
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('o') => {
                self.form.sign_out();
                self.page = Page::Login;
                self.login_field = LoginField::Identity;
                self.status = None;
            }
            _ => {}
        }
        false
    }

    fn move_cursor(&mut self, delta: isize) {
        let (len, selected) = match self.focus {
            Focus::References => (self.form.available().len(), self.references_state.selected()),
            Focus::Quantities => (self.form.selection().len(), self.quantities_state.selected()),
        };
        if len == 0 {
            return;
        }

        let current = selected.unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(len as isize) as usize;

        match self.focus {
            Focus::References => self.references_state.select(Some(next)),
            Focus::Quantities => self.quantities_state.select(Some(next)),
        }
    }

    fn clamp_cursors(&mut self) {
        let clamp = |state_len: usize, selected: Option<usize>| {
            if state_len == 0 {
                None
            } else {
                Some(selected.unwrap_or(0).min(state_len - 1))
            }
        };

        let refs = clamp(self.form.available().len(), self.references_state.selected());
        self.references_state.select(refs);
        let qtys = clamp(self.form.selection().len(), self.quantities_state.selected());
        self.quantities_state.select(qtys);
    }

    fn toggle_current(&mut self) {
        let Some(reference) = self
            .references_state
            .selected()
            .and_then(|i| self.form.available().get(i))
            .map(|e| e.reference.clone())
        else {
            return;
        };

        if let Err(e) = self.form.toggle(&reference) {
            self.status = Some(Status::Error(e.to_string()));
        }
        self.clamp_cursors();
    }

    fn edit_quantity(&mut self, f: impl Fn(u32) -> u32) {
        let Some(current) = self
            .quantities_state
            .selected()
            .and_then(|i| self.form.selection().get(i))
            .map(|s| (s.entry.reference.clone(), s.quantity))
        else {
            return;
        };

        if let Err(e) = self.form.set_quantity(&current.0, f(current.1)) {
            self.status = Some(Status::Error(e.to_string()));
        }
    }

    fn submit(&mut self) {
        match self.form.submit() {
            Ok(outcome) => {
                let mut message = format!("Données enregistrées ({}).", outcome.appended.len());
                if !outcome.skipped.is_empty() {
                    message.push_str(&format!(
                        " Déjà inventoriées ailleurs: {}.",
                        outcome.skipped.join(", ")
                    ));
                }
                if self.form.is_fully_inventoried() {
                    message.push_str(" Toutes les références ont été inventoriées.");
                }
                self.status = Some(Status::Success(message));
            }
            Err(e) => self.status = Some(Status::Error(e.to_string())),
        }
        self.clamp_cursors();
    }

    fn refresh(&mut self) {
        match self.form.refresh() {
            Ok(FormState::FullyInventoried) => {
                self.status = Some(Status::Info("Toutes les références ont été inventoriées.".into()))
            }
            Ok(_) => self.status = None,
            Err(e) => self.status = Some(Status::Error(e.to_string())),
        }
        self.clamp_cursors();
    }

    fn export(&mut self) {
        self.status = Some(match self.form.export(ExportFormat::Xlsx) {
            Ok(Some(bytes)) => match fs::write(&self.export_path, bytes) {
                Ok(()) => Status::Success(format!("Inventaire exporté: {}", self.export_path.display())),
                Err(e) => Status::Error(format!("Export impossible: {}", e)),
            },
            Ok(None) => Status::Info("Rien à exporter pour l'instant.".into()),
            Err(e) => Status::Error(e.to_string()),
        });
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    match app.page {
        Page::Login => render_login(f, chunks[1], app),
        Page::Inventory => render_inventory(f, chunks[1], app),
    }
    render_status(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let title = match app.page {
        Page::Login => Line::from(vec![Span::styled(
            "🔐 Connexion",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )]),
        Page::Inventory => Line::from(vec![
            Span::styled(
                "📦 Application d'Inventaire",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw("   👤 Connecté en tant que "),
            Span::styled(
                app.form.session().identity.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
    };

    let header = Paragraph::new(title).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_login(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let field_style = |field: LoginField| {
        if app.login_field == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    };

    let identity = Paragraph::new(app.identity.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Nom d'utilisateur")
            .border_style(field_style(LoginField::Identity)),
    );
    let masked = "*".repeat(app.passphrase.chars().count());
    let passphrase = Paragraph::new(masked).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Mot de passe")
            .border_style(field_style(LoginField::Passphrase)),
    );

    f.render_widget(identity, rows[0]);
    f.render_widget(passphrase, rows[1]);
}

fn render_inventory(f: &mut Frame, area: Rect, app: &mut App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let focus_style = |focus: Focus| {
        if app.focus == focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    };

    let items: Vec<ListItem> = app
        .form
        .available()
        .iter()
        .map(|entry| {
            let checked = app
                .form
                .selection()
                .iter()
                .any(|s| s.entry.reference == entry.reference);
            let mark = if checked { "[x]" } else { "[ ]" };
            ListItem::new(format!("{} {}  {}", mark, entry.reference, entry.description))
        })
        .collect();

    let references = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Sélectionnez vos références")
                .border_style(focus_style(Focus::References)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let rows: Vec<Row> = app
        .form
        .selection()
        .iter()
        .map(|s| {
            Row::new(vec![
                Cell::from(s.entry.reference.clone()),
                Cell::from(s.entry.description.clone()),
                Cell::from(s.quantity.to_string()),
            ])
        })
        .collect();

    let quantities = Table::new(
        rows,
        [Constraint::Length(12), Constraint::Min(12), Constraint::Length(10)],
    )
    .header(
        Row::new(vec!["Référence", "Description", "Quantité"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Résumé à enregistrer")
            .border_style(focus_style(Focus::Quantities)),
    )
    .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    f.render_stateful_widget(references, columns[0], &mut app.references_state);
    f.render_stateful_widget(quantities, columns[1], &mut app.quantities_state);
}

fn render_status(f: &mut Frame, area: Rect, app: &App) {
    let hints = match app.page {
        Page::Login => "Tab: champ  Enter: se connecter  Esc: quitter",
        Page::Inventory => {
            "Tab: panneau  Espace: choisir  0-9/+/-: quantité  Enter: enregistrer  e: exporter  r: actualiser  o: déconnexion  q: quitter"
        }
    };

    let line = match &app.status {
        Some(Status::Success(msg)) => Line::from(Span::styled(format!("✅ {}", msg), Style::default().fg(Color::Green))),
        Some(Status::Info(msg)) => Line::from(Span::styled(format!("ℹ️  {}", msg), Style::default().fg(Color::Blue))),
        Some(Status::Error(msg)) => Line::from(Span::styled(format!("❌ {}", msg), Style::default().fg(Color::Red))),
        None => Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray))),
    };

    f.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::ALL)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventaire::{Catalog, InventoryRecord, MemoryStore, RecordStore};
    use std::sync::Arc;

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn app_with(store: Arc<dyn RecordStore>) -> App {
        let form = InventoryForm::new(Arc::new(Catalog::default()), store);
        App::new(form, AuthGate::default())
    }

    fn logged_in(store: Arc<dyn RecordStore>) -> App {
        let mut app = app_with(store);
        type_text(&mut app, "Bmehaini");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "1234");
        press(&mut app, KeyCode::Enter);
        app
    }

    #[test]
    fn test_wrong_passphrase_stays_on_login() {
        let mut app = app_with(Arc::new(MemoryStore::new()));
        type_text(&mut app, "Bmehaini");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "nope");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.page, Page::Login);
        assert_eq!(app.status, Some(Status::Error("Identifiants incorrects.".into())));
        assert!(app.passphrase.is_empty());
    }

    #[test]
    fn test_select_count_and_submit_with_keys() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let mut app = logged_in(store.clone());
        assert_eq!(app.page, Page::Inventory);

        // Ref001 is under the cursor; move to Ref003 and pick both
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));

        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "5");
        press(&mut app, KeyCode::Down);
        type_text(&mut app, "12");
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Char('+'));
        press(&mut app, KeyCode::Enter);

        let records = store.load_all().unwrap();
        let counted: Vec<(&str, u32)> = records.iter().map(|r| (r.reference.as_str(), r.quantity)).collect();
        assert_eq!(counted, [("Ref001", 5), ("Ref003", 2)]);
        assert!(matches!(app.status, Some(Status::Success(_))));
        assert_eq!(app.form.available().len(), 4);
    }

    #[test]
    fn test_last_submit_announces_completion() {
        let counted: Vec<InventoryRecord> = ["Ref001", "Ref002", "Ref003", "Ref004", "Ref005"]
            .iter()
            .map(|r| InventoryRecord::new("Clamsalla", *r, "Produit", 1).unwrap())
            .collect();
        let mut app = logged_in(Arc::new(MemoryStore::with_records(counted)));

        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.form.state(), FormState::FullyInventoried);
        match &app.status {
            Some(Status::Success(msg)) => assert!(msg.contains("Toutes les références ont été inventoriées")),
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app_with(Arc::new(MemoryStore::new()));
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert!(press(&mut app, KeyCode::Esc));
    }
}
