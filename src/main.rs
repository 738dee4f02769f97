use std::io;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::widgets::{
    Axis, Block, Borders, Cell, Chart, Clear, Dataset, GraphType, Paragraph, Row, Table,
};

use lotto_terminal::browser::{NumberHit, PastPredictionCard};
use lotto_terminal::config::Config;
use lotto_terminal::display::{
    format_ball, format_balls, format_billions, format_millions, format_percent,
    format_prize_tier,
};
use lotto_terminal::feed::{ProviderSettings, spawn_provider};
use lotto_terminal::http_client::ApiClient;
use lotto_terminal::refresh::RefreshState;
use lotto_terminal::state::{
    AppState, Delta, DrawRecord, Prediction, ProviderCommand, UNKNOWN_NUMBER, apply_delta,
};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
}

impl App {
    fn new(state: AppState, cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        Self {
            state,
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('v') | KeyCode::Char('V') => {
                self.state.cycle_variant();
                self.request_load();
            }
            KeyCode::Char(']') | KeyCode::PageDown => self.request_next_page(),
            KeyCode::Char('[') | KeyCode::PageUp => self.request_prev_page(),
            KeyCode::Char('h') | KeyCode::Left => {
                self.state.browse_back();
            }
            KeyCode::Char('l') | KeyCode::Right => {
                self.state.browse_forward();
            }
            KeyCode::Char('r') | KeyCode::Char('R') => self.request_refresh(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }

    fn send(&mut self, cmd: ProviderCommand) -> bool {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[WARN] Data provider unavailable");
            return false;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log("[ERROR] Data provider stopped");
            return false;
        }
        true
    }

    fn request_load(&mut self) {
        let tag = self.state.begin_load();
        if !self.send(ProviderCommand::LoadAll { tag }) {
            self.state.loading = false;
            self.state.accuracy_loading = false;
            self.state.history.in_flight = false;
        }
    }

    fn request_next_page(&mut self) {
        if let Some(page) = self.state.history.request_next() {
            self.request_page(page);
        }
    }

    fn request_prev_page(&mut self) {
        if let Some(page) = self.state.history.request_prev() {
            self.request_page(page);
        }
    }

    fn request_page(&mut self, page: u32) {
        let tag = self.state.current_tag();
        if !self.send(ProviderCommand::FetchHistoryPage { tag, page }) {
            self.state.history.in_flight = false;
        }
    }

    fn request_refresh(&mut self) {
        let Some(tag) = self.state.begin_refresh() else {
            self.state.push_log("[INFO] Refresh unavailable while loading or refreshing");
            return;
        };
        if !self.send(ProviderCommand::Refresh { tag }) {
            self.state.refresh = RefreshState::Idle;
        }
    }

    fn maybe_reload(&mut self) {
        if self.state.take_reload_pending() {
            self.request_load();
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = Config::from_env();
    let mut state = AppState::new(config.variants.clone(), &config.default_variant);

    let (tx, rx) = mpsc::channel::<Delta>();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let cmd_tx = match ApiClient::new(
        &config.api_base,
        config.api_token.clone(),
        config.http_timeout,
    ) {
        Ok(api) => {
            spawn_provider(Arc::new(api), ProviderSettings::from(&config), tx, cmd_rx);
            Some(cmd_tx)
        }
        Err(err) => {
            state.push_log(format!("[ERROR] HTTP client unavailable: {err:#}"));
            None
        }
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(state, cmd_tx);
    app.request_load();
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }
        app.maybe_reload();

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let state = &app.state;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(7),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_dashboard(frame, chunks[1], state);

    let console = Paragraph::new(console_lines(state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(
        "v Variant | [/] Page | ←/→ Browse | r Refresh | ? Help | q Quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let spec = state.variant_spec();
    let latest = state.history.latest.as_ref();
    let period = latest
        .map(|d| format!("#{}", d.period))
        .unwrap_or_else(|| "...".to_string());
    let mut jackpot = format!(
        "Jackpot {}",
        format_billions(latest.and_then(|d| d.jackpot_value))
    );
    if spec.has_bonus() {
        jackpot.push_str(&format!(
            " | JP2 {}",
            format_billions(latest.and_then(|d| d.jackpot2_value))
        ));
    }
    let status = if state.loading {
        "Loading...".to_string()
    } else {
        refresh_label(&state.refresh)
    };
    let line1 = format!("  LOTTO TERMINAL | {} | Latest {period}", spec.label);
    let line2 = format!("  {jackpot} | {status}");
    format!("{line1}\n{line2}")
}

fn refresh_label(refresh: &RefreshState) -> String {
    match refresh {
        RefreshState::Idle => "Ready".to_string(),
        RefreshState::Submitting => "Refresh: submitting".to_string(),
        RefreshState::Polling {
            attempt,
            max_attempts,
        } => format!("Refresh: polling {attempt}/{max_attempts}"),
        RefreshState::Done { period } => format!("Synced to #{period}"),
        RefreshState::TimedOut { .. } => "Refresh timed out".to_string(),
        RefreshState::Failed(_) => "Refresh failed".to_string(),
    }
}

fn render_dashboard(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(34),
            Constraint::Min(40),
            Constraint::Length(30),
        ])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(1)])
        .split(columns[0]);

    let middle = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(12), Constraint::Min(1)])
        .split(columns[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Min(1),
        ])
        .split(columns[2]);

    let prediction = Paragraph::new(latest_prediction_lines(state))
        .block(Block::default().title("Next Draw").borders(Borders::ALL));
    frame.render_widget(prediction, left[0]);

    render_past_prediction(frame, left[1], state);
    render_accuracy_chart(frame, middle[0], state);
    render_history(frame, middle[1], state);

    let summary = Paragraph::new(accuracy_summary_text(state))
        .block(Block::default().title("Accuracy").borders(Borders::ALL));
    frame.render_widget(summary, right[0]);

    let frequency = Paragraph::new(frequency_text(state))
        .block(Block::default().title("Hot / Cold").borders(Borders::ALL));
    frame.render_widget(frequency, right[1]);

    let combos = Paragraph::new(cooccurrence_text(state))
        .block(Block::default().title("Pairs / Triplets").borders(Borders::ALL));
    frame.render_widget(combos, right[2]);
}

fn latest_prediction_lines(state: &AppState) -> Vec<Line<'static>> {
    let Some(record) = state.latest_prediction.as_ref() else {
        let msg = if state.loading {
            "Loading prediction..."
        } else {
            "No prediction available"
        };
        return vec![Line::from(msg)];
    };

    let mut lines = vec![Line::from(Span::styled(
        format!("Period #{}", record.target_period),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    match &record.prediction {
        Prediction::Legacy {
            numbers,
            confidence,
        } => {
            lines.push(Line::from(format_balls(numbers)));
            let conf = record
                .locked_note
                .clone()
                .unwrap_or_else(|| format_percent(*confidence));
            lines.push(Line::from(format!("Confidence {conf}")));
        }
        Prediction::Ensemble { sets } => {
            for (rank, set) in sets.iter().enumerate().take(5) {
                lines.push(Line::from(format!(
                    "#{} {}  {}",
                    rank + 1,
                    format_balls(&set.numbers),
                    format_percent(set.confidence)
                )));
            }
            if let Some(note) = record.locked_note.as_deref() {
                lines.push(Line::from(note.to_string()));
            }
        }
    }
    if let Some(msg) = record.message.as_deref() {
        lines.push(Line::from(Span::styled(
            msg.to_string(),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

fn render_past_prediction(frame: &mut Frame, area: Rect, state: &AppState) {
    let title = match state.browse.index() {
        Some(idx) => format!("Past Prediction {}/{}", idx + 1, state.browse.len()),
        None => "Past Prediction".to_string(),
    };
    let lines = if state.accuracy_loading {
        vec![Line::from("Loading accuracy...")]
    } else {
        match state.past_prediction_card() {
            Some(card) => past_prediction_lines(&card),
            None => vec![Line::from("No verified predictions yet")],
        }
    };
    let widget = Paragraph::new(lines).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn past_prediction_lines(card: &PastPredictionCard) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "#{}  {} / {} matched",
            card.period, card.primary_matches, card.draw_size
        ),
        Style::default().add_modifier(Modifier::BOLD),
    ))];

    let mut actual = vec![Span::raw("Drawn ")];
    actual.extend(ball_spans(&card.actual));
    lines.push(Line::from(actual));

    for set in &card.sets {
        let mut spans = vec![Span::raw(format!("#{} ", set.rank + 1))];
        spans.extend(ball_spans(&set.numbers));
        spans.push(Span::styled(
            format!(" {}", format_percent(set.confidence)),
            Style::default().fg(Color::DarkGray),
        ));
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(format!(
        "Top set {}",
        format_percent(card.top_set_accuracy() * 100.0)
    )));
    lines
}

fn ball_spans(balls: &[NumberHit]) -> Vec<Span<'static>> {
    balls
        .iter()
        .flat_map(|ball| {
            let style = if ball.hit {
                Style::default().fg(Color::Black).bg(Color::Green)
            } else if ball.number == UNKNOWN_NUMBER {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            [Span::styled(format_ball(ball.number), style), Span::raw(" ")]
        })
        .collect()
}

fn render_accuracy_chart(frame: &mut Frame, area: Rect, state: &AppState) {
    let draw_size = state.variant_spec().draw_size.max(1) as f64;
    let points: Vec<_> = state.accuracy.chart_points().collect();
    let confidence: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(idx, p)| (idx as f64, p.confidence))
        .collect();
    let hit_rate: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(idx, p)| (idx as f64, p.matches as f64 / draw_size * 100.0))
        .collect();

    let block = Block::default().title("Confidence vs Hits").borders(Borders::ALL);
    if points.is_empty() {
        frame.render_widget(Paragraph::new("No accuracy history").block(block), area);
        return;
    }

    let x_max = (points.len().saturating_sub(1)).max(1) as f64;
    let first = points.first().map(|p| p.label.clone()).unwrap_or_default();
    let last = points.last().map(|p| p.label.clone()).unwrap_or_default();

    let datasets = vec![
        Dataset::default()
            .name("Confidence %")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&confidence),
        Dataset::default()
            .name("Hit %")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Yellow))
            .data(&hit_rate),
    ];
    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .labels(vec![Span::raw(first), Span::raw(last)]),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, 100.0])
                .labels(vec![Span::raw("0"), Span::raw("50"), Span::raw("100")]),
        );
    frame.render_widget(chart, area);
}

fn render_history(frame: &mut Frame, area: Rect, state: &AppState) {
    let spec = state.variant_spec();
    let cursor = state.history.cursor;
    let title = format!(
        "Draw History (page {} / {}){}",
        cursor.page,
        cursor.page_count(),
        if state.history.in_flight { " ..." } else { "" }
    );

    let rows: Vec<Row> = state
        .history
        .records
        .iter()
        .map(|draw| {
            Row::new(vec![
                Cell::from(format!("#{}", draw.period)),
                Cell::from(
                    draw.draw_date
                        .map(|d| d.format("%d/%m/%Y").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::from(Line::from(draw_spans(draw, spec.main_count))),
                Cell::from(format_millions(draw.jackpot_value)),
                Cell::from(draw.total_jackpot_winners().to_string()),
                Cell::from(format_prize_tier(
                    draw.first_prize_value,
                    draw.first_prize_winners,
                )),
                Cell::from(format_prize_tier(
                    draw.second_prize_value,
                    draw.second_prize_winners,
                )),
                Cell::from(format_prize_tier(
                    draw.third_prize_value,
                    draw.third_prize_winners,
                )),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Length(11),
        Constraint::Min(22),
        Constraint::Length(12),
        Constraint::Length(3),
        Constraint::Length(15),
        Constraint::Length(13),
        Constraint::Length(11),
    ];
    let header = Row::new(vec![
        "Period", "Date", "Numbers", "Jackpot", "W", "1st", "2nd", "3rd",
    ])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn draw_spans(draw: &DrawRecord, main_count: usize) -> Vec<Span<'static>> {
    draw.numbers
        .iter()
        .enumerate()
        .flat_map(|(idx, n)| {
            let style = if idx >= main_count {
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            [Span::styled(format_ball(*n), style), Span::raw(" ")]
        })
        .collect()
}

fn accuracy_summary_text(state: &AppState) -> String {
    match state.accuracy_summary.as_ref() {
        Some(summary) => format!(
            "Predictions {}\nVerified {}\nAvg matches {:.2}",
            summary.total_predictions, summary.verified_count, summary.avg_matches
        ),
        None => "...".to_string(),
    }
}

fn frequency_text(state: &AppState) -> String {
    let panels = &state.frequency;
    if panels.is_empty() {
        return "No data".to_string();
    }
    let hot = panels
        .hot
        .iter()
        .map(|s| format_ball(s.number))
        .collect::<Vec<_>>()
        .join(" ");
    let cold = panels
        .cold
        .iter()
        .map(|s| format_ball(s.number))
        .collect::<Vec<_>>()
        .join(" ");
    format!("Hot  {hot}\nCold {cold}")
}

fn cooccurrence_text(state: &AppState) -> String {
    let panels = &state.cooccurrence;
    if panels.is_empty() {
        return "No data".to_string();
    }
    let mut lines = Vec::new();
    for pair in &panels.pairs {
        lines.push(format!("{}  x{}", format_balls(&pair.numbers), pair.count));
    }
    lines.push(String::new());
    for triplet in &panels.triplets {
        lines.push(format!(
            "{}  x{}",
            format_balls(&triplet.numbers),
            triplet.count
        ));
    }
    lines.join("\n")
}

fn console_lines(state: &AppState) -> Vec<Line<'static>> {
    state
        .logs
        .iter()
        .map(|entry| {
            let style = if entry.starts_with("[ERROR]") {
                Style::default().fg(Color::Red)
            } else if entry.starts_with("[WARN]") {
                Style::default().fg(Color::Yellow)
            } else if entry.starts_with("[OK]") {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            Line::from(Span::styled(entry.to_string(), style))
        })
        .collect()
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Lotto Terminal - Help",
        "",
        "  v            Next lottery variant",
        "  [ / PgUp     Previous history page",
        "  ] / PgDn     Next history page",
        "  ← / h        Newer past prediction",
        "  → / l        Older past prediction",
        "  r            Crawl and refresh",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Past predictions: green balls were drawn.",
        "History: red ball is the bonus number.",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
