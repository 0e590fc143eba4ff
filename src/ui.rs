// 🖥️ Report Browser - terminal view over a ReconciliationReport

use crate::reconciliation::{FieldVerdict, KeyStatus, ReconciliationReport, ReportRow, Verdict};
use crate::record::Side;
use crate::report::ReportSummary;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Keys,
    Fields,
    Views,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Keys => Page::Fields,
            Page::Fields => Page::Views,
            Page::Views => Page::Keys,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Keys => Page::Views,
            Page::Fields => Page::Keys,
            Page::Views => Page::Fields,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Keys => "Keys",
            Page::Fields => "Fields",
            Page::Views => "Views",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Matched,
    Mismatched,
    MissingLeft,
    MissingRight,
}

impl StatusFilter {
    pub fn accepts(&self, status: &KeyStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Matched => *status == KeyStatus::Match,
            StatusFilter::Mismatched => *status == KeyStatus::Mismatch,
            StatusFilter::MissingLeft => *status == KeyStatus::Missing(Side::Left),
            StatusFilter::MissingRight => *status == KeyStatus::Missing(Side::Right),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            StatusFilter::All => "ALL",
            StatusFilter::Matched => "MATCH",
            StatusFilter::Mismatched => "MISMATCH",
            StatusFilter::MissingLeft => "MISSING_LEFT",
            StatusFilter::MissingRight => "MISSING_RIGHT",
        }
    }
}

pub struct App {
    pub report: ReconciliationReport,
    pub summary: ReportSummary,

    /// Indices into `report.rows` passing the active filter
    pub visible: Vec<usize>,
    pub state: TableState,
    pub fields_state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    pub filter: StatusFilter,
}

impl App {
    pub fn new(report: ReconciliationReport) -> Self {
        let summary = ReportSummary::from_report(&report);
        let visible: Vec<usize> = (0..report.rows.len()).collect();

        let mut state = TableState::default();
        if !visible.is_empty() {
            state.select(Some(0));
        }

        let mut fields_state = TableState::default();
        if !report.field_labels.is_empty() {
            fields_state.select(Some(0));
        }

        Self {
            report,
            summary,
            visible,
            state,
            fields_state,
            current_page: Page::Keys,
            show_detail: false,
            filter: StatusFilter::All,
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_row(&self) -> Option<&ReportRow> {
        self.state
            .selected()
            .and_then(|i| self.visible.get(i))
            .map(|&idx| &self.report.rows[idx])
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.visible.iter().map(|&idx| &self.report.rows[idx])
    }

    pub fn apply_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
        self.visible = self
            .report
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| filter.accepts(&row.status))
            .map(|(idx, _)| idx)
            .collect();

        // Reset selection to first item
        if self.visible.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn clear_filter(&mut self) {
        self.apply_filter(StatusFilter::All);
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    /// Table state and row count of the table on the current page
    fn active_table(&mut self) -> (&mut TableState, usize) {
        match self.current_page {
            Page::Fields => (&mut self.fields_state, self.report.field_labels.len()),
            Page::Keys | Page::Views => (&mut self.state, self.visible.len()),
        }
    }

    pub fn next(&mut self) {
        let (state, len) = self.active_table();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (state, len) = self.active_table();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let (state, len) = self.active_table();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => (i + 20).min(len - 1),
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let (state, len) = self.active_table();
        if len == 0 {
            return;
        }
        let i = state.selected().map_or(0, |i| i.saturating_sub(20));
        state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        let (state, len) = self.active_table();
        if len > 0 {
            state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        let (state, len) = self.active_table();
        if len > 0 {
            state.select(Some(len - 1));
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('c') => {
                    app.clear_filter();
                    app.current_page = Page::Keys;
                }
                KeyCode::Char(digit @ '1'..='5') if app.current_page == Page::Views => {
                    let filter = match digit {
                        '1' => StatusFilter::All,
                        '2' => StatusFilter::Mismatched,
                        '3' => StatusFilter::MissingLeft,
                        '4' => StatusFilter::MissingRight,
                        _ => StatusFilter::Matched,
                    };
                    app.apply_filter(filter);
                    app.current_page = Page::Keys;
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.select_first(),
                KeyCode::End => app.select_last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page == Page::Keys {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(chunks[1]);

        render_keys(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        match app.current_page {
            Page::Keys => render_keys(f, chunks[1], app),
            Page::Fields => render_fields(f, chunks[1], app),
            Page::Views => render_views(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn status_color(status: &KeyStatus) -> Color {
    match status {
        KeyStatus::Match => Color::Green,
        KeyStatus::Mismatch => Color::Red,
        KeyStatus::Missing(_) => Color::Yellow,
    }
}

fn verdict_color(verdict: Verdict) -> Color {
    match verdict {
        Verdict::Match => Color::Green,
        Verdict::NearMatch => Color::Cyan,
        Verdict::Mismatch => Color::Red,
        Verdict::Missing => Color::Yellow,
    }
}

fn header_style() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in [Page::Keys, Page::Fields, Page::Views].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    let summary = &app.summary;
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("{} vs {}", app.report.left_label, app.report.right_label),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("✓ {}", summary.matched_keys),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("✗ {}", summary.mismatched_keys),
        Style::default().fg(Color::Red),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("? {}", summary.missing_left + summary.missing_right),
        Style::default().fg(Color::Yellow),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_keys(f: &mut Frame, area: Rect, app: &mut App) {
    let header = Row::new(
        ["Key", "Status", "Mismatches"]
            .iter()
            .map(|h| Cell::from(*h).style(header_style())),
    )
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows: Vec<Row> = app
        .visible_rows()
        .map(|row| {
            let color = status_color(&row.status);
            Row::new(vec![
                Cell::from(truncate(&row.key, 48)),
                Cell::from(row.status.label().to_string()).style(Style::default().fg(color)),
                Cell::from(format!("{}", row.mismatch_count())),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [Constraint::Min(20), Constraint::Length(15), Constraint::Length(11)],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Keys "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_fields(f: &mut Frame, area: Rect, app: &mut App) {
    let header = Row::new(
        ["Field", "Mismatches"]
            .iter()
            .map(|h| Cell::from(*h).style(header_style())),
    )
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows: Vec<Row> = app
        .report
        .field_labels
        .iter()
        .map(|label| {
            let count = app
                .summary
                .field_mismatches
                .iter()
                .find(|(field, _)| field == label)
                .map_or(0, |(_, count)| *count);
            let color = if count > 0 { Color::Red } else { Color::Green };

            Row::new(vec![
                Cell::from(label.clone()),
                Cell::from(format!("{}", count)).style(Style::default().fg(color)),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(32), Constraint::Length(12)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Fields - Mismatches per Field "),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.fields_state);
}

fn render_views(f: &mut Frame, area: Rect, app: &App) {
    let summary = &app.summary;
    let options = [
        (StatusFilter::All, summary.total_keys),
        (StatusFilter::Mismatched, summary.mismatched_keys),
        (StatusFilter::MissingLeft, summary.missing_left),
        (StatusFilter::MissingRight, summary.missing_right),
        (StatusFilter::Matched, summary.matched_keys),
    ];

    let mut content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Quick Views & Filters",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    for (i, (filter, count)) in options.iter().enumerate() {
        let marker = if *filter == app.filter {
            Span::styled("→", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        } else {
            Span::raw(" ")
        };
        content.push(Line::from(vec![
            Span::raw("  "),
            marker,
            Span::styled(format!("{}", i + 1), Style::default().fg(Color::Yellow)),
            Span::raw(format!(". {:<16}", filter.name())),
            Span::styled(format!("{:>6} keys", count), Style::default().fg(Color::White)),
        ]));
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Press 1-5 to filter, c to clear",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Views - Quick Access Filters "),
    );

    f.render_widget(paragraph, area);
}

fn field_lines<'a>(field: &'a FieldVerdict, left_label: &'a str, right_label: &'a str) -> Vec<Line<'a>> {
    let label_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let similarity = field
        .similarity
        .map_or_else(|| "-".to_string(), |s| format!("{:.3}", s));

    vec![
        Line::from(vec![
            Span::styled(format!("  {} ", field.label), label_style),
            Span::styled(
                field.verdict.label().to_string(),
                Style::default().fg(verdict_color(field.verdict)),
            ),
            Span::raw(format!(" ({})", similarity)),
        ]),
        Line::from(vec![
            Span::styled(format!("    {}: ", left_label), Style::default().fg(Color::DarkGray)),
            Span::raw(truncate(field.left.as_deref().unwrap_or("MISSING"), 120)),
        ]),
        Line::from(vec![
            Span::styled(format!("    {}: ", right_label), Style::default().fg(Color::DarkGray)),
            Span::raw(truncate(field.right.as_deref().unwrap_or("MISSING"), 120)),
        ]),
    ]
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Key Details ");

    let row = match app.selected_row() {
        Some(row) => row,
        None => {
            f.render_widget(Paragraph::new("No key selected").block(block), area);
            return;
        }
    };

    let mut content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Key: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(row.key.as_str()),
        ]),
        Line::from(vec![
            Span::styled("  Status: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(
                row.status.label().to_string(),
                Style::default().fg(status_color(&row.status)),
            ),
        ]),
        Line::from("  ─────────────────────────────────────"),
    ];

    for field in &row.fields {
        content.extend(field_lines(field, &app.report.left_label, &app.report.right_label));
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Press Enter to close",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    let detail_panel = Paragraph::new(content).block(block).wrap(Wrap { trim: false });
    f.render_widget(detail_panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, app.visible.len()),
        Style::default().fg(Color::Cyan),
    )];

    if app.filter != StatusFilter::All {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("Filter: {}", app.filter.name()),
            Style::default().fg(Color::Green),
        ));
        status_spans.push(Span::raw(" ("));
        status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" clear)"));
    }

    for (key, action) in [("Enter", " Details | "), ("Tab", " Page | "), ("↑/↓", " Nav | ")] {
        status_spans.push(Span::raw(" "));
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(action));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

// ============================================================================
// TESTS
// ============================================================================
