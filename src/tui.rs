use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::collections::BTreeSet;
use std::io::stdout;
use std::time::{Duration, Instant};

use nursejobs::experience::ExperienceRangeTable;
use nursejobs::filter::FilterState;
use nursejobs::models::{FieldMap, Record};
use nursejobs::paginate::PageItem;
use nursejobs::session::{FilterSession, Phase};
use nursejobs::store::StoreBackend;

/// Idle redraw interval when no debounce is pending.
const POLL: Duration = Duration::from_millis(250);
const PAY_STEP: f64 = 5.0;
const MAX_OPTIONS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Facet {
    JobTypes,
    Shifts,
    Roles,
    Visa,
}

impl Facet {
    fn label(self) -> &'static str {
        match self {
            Facet::JobTypes => "job type",
            Facet::Shifts => "shift",
            Facet::Roles => "role",
            Facet::Visa => "visa",
        }
    }

    /// Distinct values present in `records`, first nine in sorted order.
    fn options(self, records: &[Record], fields: &FieldMap) -> Vec<String> {
        let mut values = BTreeSet::new();
        for record in records {
            let found = match self {
                Facet::JobTypes => record.list(fields.job_types).unwrap_or_default(),
                Facet::Shifts => record.list(fields.shifts).unwrap_or_default(),
                Facet::Roles => record.text(fields.role).into_iter().collect(),
                Facet::Visa => record.text(fields.residency).into_iter().collect(),
            };
            values.extend(
                found
                    .into_iter()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty()),
            );
        }
        values.into_iter().take(MAX_OPTIONS).collect()
    }

    fn selected(self, filters: &FilterState) -> &BTreeSet<String> {
        match self {
            Facet::JobTypes => &filters.job_types,
            Facet::Shifts => &filters.shifts,
            Facet::Roles => &filters.role_categories,
            Facet::Visa => &filters.visa_statuses,
        }
    }

    fn selected_mut(self, filters: &mut FilterState) -> &mut BTreeSet<String> {
        match self {
            Facet::JobTypes => &mut filters.job_types,
            Facet::Shifts => &mut filters.shifts,
            Facet::Roles => &mut filters.role_categories,
            Facet::Visa => &mut filters.visa_statuses,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Normal,
    Search,
    Location,
    Pick(Facet),
}

struct AppState<B> {
    session: FilterSession<B>,
    selected: usize,
    scroll_offset: u16,
    input: Input,
    options: Vec<String>,
    message: Option<String>,
}

impl<B: StoreBackend> AppState<B> {
    fn new(session: FilterSession<B>) -> Self {
        Self {
            session,
            selected: 0,
            scroll_offset: 0,
            input: Input::Normal,
            options: Vec::new(),
            message: None,
        }
    }

    fn current_record(&self) -> Option<&Record> {
        self.session.page().get(self.selected)
    }

    fn reset_selection(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    fn next(&mut self) {
        let len = self.session.page().len();
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn toggle_experience(&mut self, index: usize) {
        let Some(label) = ExperienceRangeTable::shared().labels().nth(index).map(str::to_string) else {
            return;
        };
        self.session
            .update(|f| {
                FilterState::toggle(&mut f.experience_labels, &label);
            });
        self.reset_selection();
    }

    fn start_pick(&mut self, facet: Facet) {
        self.options = facet.options(self.session.records(), self.session.view().fields());
        self.message = self
            .options
            .is_empty()
            .then(|| format!("No {} values in these records", facet.label()));
        self.input = Input::Pick(facet);
    }

    fn toggle_option(&mut self, facet: Facet, index: usize) {
        let Some(value) = self.options.get(index).cloned() else {
            return;
        };
        self.session.update(|f| {
            FilterState::toggle(facet.selected_mut(f), &value);
        });
        self.reset_selection();
    }

    fn adjust_pay(&mut self, delta: f64) {
        self.session.update(|f| f.pay_rate = (f.pay_rate + delta).max(0.0));
        self.reset_selection();
    }

    fn run_search(&mut self) {
        self.message = match self.session.search() {
            Ok(()) => Some("Filters saved".to_string()),
            Err(e) => Some(format!("Could not save filters: {}", e)),
        };
        self.reset_selection();
    }

    fn clear(&mut self) {
        self.message = match self.session.clear() {
            Ok(()) => Some("Filters cleared".to_string()),
            Err(e) => Some(format!("Could not clear filters: {}", e)),
        };
        self.reset_selection();
    }
}

pub fn run_browse<B: StoreBackend>(session: FilterSession<B>) -> Result<()> {
    if session.records().is_empty() {
        println!("No records for {}. Run 'nursejobs fetch {}' first.", session.view(), session.view());
        return Ok(());
    }

    let mut state = AppState::new(session);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<B: StoreBackend>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState<B>,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        if state.session.tick(Instant::now()) {
            state.reset_selection();
        }
        list_state.select(Some(state.selected));
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        let timeout = state
            .session
            .debouncer()
            .remaining(Instant::now())
            .map_or(POLL, |left| left.min(POLL));
        if !event::poll(timeout)? {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if let Input::Pick(facet) = state.input {
                match key.code {
                    KeyCode::Esc => state.input = Input::Normal,
                    KeyCode::Enter => {
                        state.input = Input::Normal;
                        state.run_search();
                    }
                    KeyCode::Char(c @ '1'..='9') => state.toggle_option(facet, c as usize - '1' as usize),
                    _ => {}
                }
                continue;
            }

            if state.input != Input::Normal {
                let now = Instant::now();
                let editing_search = state.input == Input::Search;
                match key.code {
                    KeyCode::Esc => state.input = Input::Normal,
                    KeyCode::Enter => {
                        state.input = Input::Normal;
                        state.run_search();
                    }
                    KeyCode::Backspace => state.session.edit(now, |f| {
                        if editing_search {
                            f.search.pop();
                        } else {
                            f.location.pop();
                        }
                    }),
                    KeyCode::Char(c) => state.session.edit(now, |f| {
                        if editing_search {
                            f.search.push(c);
                        } else {
                            f.location.push(c);
                        }
                    }),
                    _ => {}
                }
                continue;
            }

            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') => state.scroll_down(),
                KeyCode::Char('K') => state.scroll_up(),
                KeyCode::Right | KeyCode::PageDown | KeyCode::Char('n') => {
                    if state.session.next_page() {
                        state.reset_selection();
                    }
                }
                KeyCode::Left | KeyCode::PageUp | KeyCode::Char('p') => {
                    if state.session.prev_page() {
                        state.reset_selection();
                    }
                }
                KeyCode::Char('/') => state.input = Input::Search,
                KeyCode::Char('l') => state.input = Input::Location,
                KeyCode::Char(c @ '1'..='5') => state.toggle_experience(c as usize - '1' as usize),
                KeyCode::Char('t') => state.start_pick(Facet::JobTypes),
                KeyCode::Char('s') => state.start_pick(Facet::Shifts),
                KeyCode::Char('r') => state.start_pick(Facet::Roles),
                KeyCode::Char('v') => state.start_pick(Facet::Visa),
                KeyCode::Char('+') | KeyCode::Char('=') => state.adjust_pay(PAY_STEP),
                KeyCode::Char('-') => state.adjust_pay(-PAY_STEP),
                KeyCode::Enter => state.run_search(),
                KeyCode::Char('c') => state.clear(),
                _ => {}
            }
        }
    }
    Ok(())
}

fn draw<B: StoreBackend>(frame: &mut Frame, state: &AppState<B>, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(filter_bar(state), rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[1]);

    // Left panel: current page
    let fields = state.session.view().fields();
    let items: Vec<ListItem> = state
        .session
        .page()
        .iter()
        .map(|record| {
            let title = fields.title(record);
            let title = if title.chars().count() > 35 {
                format!("{}...", title.chars().take(32).collect::<String>())
            } else {
                title
            };
            let location = record.text(fields.location).unwrap_or_default();
            ListItem::new(format!("{} | {}", title, location))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " {} ({} of {}) ",
            state.session.view(),
            state.session.filtered().len(),
            state.session.records().len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: record detail
    let detail = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail, chunks[1]);

    frame.render_widget(page_bar(state), rows[2]);

    let help = match state.input {
        Input::Normal => {
            " j/k:select  n/p:page  /:search  l:location  1-5:experience  t/s/r/v:pick  +/-:pay  Enter:save  c:clear  q:quit"
        }
        Input::Search | Input::Location => " type to filter  Enter:save  Esc:done",
        Input::Pick(_) => " 1-9:toggle  Enter:save  Esc:done",
    };
    let footer = match &state.message {
        Some(msg) => format!("{}  [{}]", help, msg),
        None => help.to_string(),
    };
    frame.render_widget(
        Paragraph::new(footer).style(Style::default().fg(Color::DarkGray)),
        rows[3],
    );
}

fn filter_bar<B: StoreBackend>(state: &AppState<B>) -> Paragraph<'static> {
    let filters = state.session.state();
    let cursor = |input: Input| if state.input == input { "_" } else { "" };
    let phase = match state.session.phase() {
        Phase::Idle => Span::styled("idle", Style::default().fg(Color::DarkGray)),
        Phase::Editing => Span::styled("editing", Style::default().fg(Color::Yellow)),
        Phase::Applied => Span::styled("applied", Style::default().fg(Color::Green)),
    };
    let experience: Vec<Span> = ExperienceRangeTable::shared()
        .labels()
        .enumerate()
        .map(|(i, label)| {
            let style = if filters.experience_labels.contains(label) {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Span::styled(format!(" {}:{} ", i + 1, label), style)
        })
        .collect();

    let line = Line::from(vec![
        Span::raw(format!("Search: {}{}  ", filters.search, cursor(Input::Search))),
        Span::raw(format!("Location: {}{}  ", filters.location, cursor(Input::Location))),
        phase,
    ]);

    let facets = match state.input {
        Input::Pick(facet) => {
            let selected = facet.selected(filters);
            let mut spans = vec![Span::raw(format!("{}: ", facet.label()))];
            spans.extend(state.options.iter().enumerate().map(|(i, option)| {
                let style = if selected.contains(option) {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                Span::styled(format!(" {}:{} ", i + 1, option), style)
            }));
            Line::from(spans)
        }
        _ => {
            let mut chosen: Vec<String> = [Facet::JobTypes, Facet::Shifts, Facet::Roles, Facet::Visa]
                .into_iter()
                .filter(|facet| !facet.selected(filters).is_empty())
                .map(|facet| {
                    let values: Vec<&str> = facet.selected(filters).iter().map(String::as_str).collect();
                    format!("{}: {}", facet.label(), values.join(", "))
                })
                .collect();
            if filters.pay_rate > 0.0 {
                chosen.push(format!("pay from: ${}", filters.pay_rate));
            }
            Line::from(Span::styled(chosen.join("  "), Style::default().fg(Color::Cyan)))
        }
    };

    Paragraph::new(vec![line, Line::from(experience), facets])
        .block(Block::default().borders(Borders::BOTTOM).title(" Filters "))
}

fn page_bar<B: StoreBackend>(state: &AppState<B>) -> Paragraph<'static> {
    let pager = state.session.pager();
    let current = pager.current_page();
    let pages = state.session.visible_pages();
    if pages.is_empty() {
        return Paragraph::new("");
    }
    let arrow = |enabled: bool, text: &'static str| {
        if enabled {
            Span::raw(text)
        } else {
            Span::styled(text, Style::default().fg(Color::DarkGray))
        }
    };

    let mut spans = vec![arrow(pager.has_prev(), "< prev ")];
    spans.extend(pages.into_iter().map(|item| match item {
        PageItem::Page(n) if n == current => Span::styled(
            format!(" [{}] ", n),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        other => Span::raw(format!(" {} ", other)),
    }));
    spans.push(arrow(pager.has_next(), " next >"));
    Paragraph::new(Line::from(spans)).alignment(Alignment::Center)
}

fn build_detail<B: StoreBackend>(state: &AppState<B>) -> Text<'static> {
    let Some(record) = state.current_record() else {
        return Text::raw("No matching records");
    };
    let fields = state.session.view().fields();

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        fields.title(record),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if let Some(location) = record.text(fields.location) {
        lines.push(Line::from(format!("in {}", location)));
    }
    lines.push(Line::from(""));

    for (key, value) in record.fields() {
        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if rendered.is_empty() || rendered == "null" {
            continue;
        }
        lines.push(Line::from(Span::styled(
            key.clone(),
            Style::default().fg(Color::Cyan),
        )));
        for line in textwrap::fill(&rendered, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nursejobs::models::View;
    use nursejobs::session::DEFAULT_DEBOUNCE;
    use nursejobs::store::{CookieJar, FilterStore};
    use serde_json::json;

    fn app() -> AppState<CookieJar> {
        let records = vec![
            Record::from(json!({"id": 1, "title": "RN", "shifts": ["Night", "Day"], "maxPay": "45"})),
            Record::from(json!({"id": 2, "title": "EN", "shifts": "Day", "maxPay": "35"})),
            Record::from(json!({"id": 3, "title": "AIN", "maxPay": "28"})),
        ];
        let session = FilterSession::open(
            View::Jobs,
            records,
            FilterStore::new(CookieJar::in_memory()),
            10,
            DEFAULT_DEBOUNCE,
        )
        .unwrap();
        AppState::new(session)
    }

    #[test]
    fn test_pick_lists_distinct_values() {
        let mut state = app();
        state.start_pick(Facet::Shifts);
        assert_eq!(state.input, Input::Pick(Facet::Shifts));
        assert_eq!(state.options, vec!["Day".to_string(), "Night".to_string()]);
        assert!(state.message.is_none());

        state.start_pick(Facet::Visa);
        assert!(state.options.is_empty());
        assert!(state.message.is_some());
    }

    #[test]
    fn test_toggle_option_filters_immediately() {
        let mut state = app();
        state.start_pick(Facet::Shifts);
        state.toggle_option(Facet::Shifts, 1);
        assert!(state.session.state().shifts.contains("Night"));
        assert_eq!(state.session.filtered().len(), 1);

        state.toggle_option(Facet::Shifts, 1);
        assert_eq!(state.session.filtered().len(), 3);

        state.toggle_option(Facet::Shifts, 8);
        assert!(state.session.state().shifts.is_empty());
    }

    #[test]
    fn test_pay_slider_never_goes_negative() {
        let mut state = app();
        state.adjust_pay(-PAY_STEP);
        assert_eq!(state.session.state().pay_rate, 0.0);

        for _ in 0..7 {
            state.adjust_pay(PAY_STEP);
        }
        assert_eq!(state.session.state().pay_rate, 35.0);
        assert_eq!(state.session.filtered().len(), 2);
    }
}
