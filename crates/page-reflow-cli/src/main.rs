use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use page_reflow_config::{Config, PageSettings, PaperSize, SchedulerSettings};
use page_reflow_engine::{
    HeadlessSurface, LayoutMetrics, PageSize, PaginationConfig, Paginator, PassOutcome,
    PassReport, SchedulerConfig, SchedulerState, VisualLine,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::{
    env,
    fs::File,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
    time::{Duration, Instant},
};

type Tui = Terminal<CrosstermBackend<Stdout>>;

const FRAME: Duration = Duration::from_millis(16);
const IDLE_POLL: Duration = Duration::from_millis(500);
const DEFAULT_REPORT_COLUMNS: u16 = 80;

#[derive(Debug, PartialEq)]
enum Mode {
    View(PathBuf),
    Report { path: PathBuf, columns: u16 },
}

struct App {
    path: PathBuf,
    surface: HeadlessSurface,
    paginator: Paginator,
    scroll: usize,
    viewport_rows: usize,
    appended: usize,
}

impl App {
    fn new(path: PathBuf, text: &str, columns: u16, paginator: Paginator) -> Self {
        let mut app = Self {
            path,
            surface: HeadlessSurface::new(text, LayoutMetrics::terminal(columns)),
            paginator,
            scroll: 0,
            viewport_rows: 0,
            appended: 0,
        };
        // First layout's size notice would only delay the initial pass
        app.surface.take_notices();
        app.paginator.force_recalculate(Instant::now());
        app
    }

    /// Forward surface notices and advance the paginator one frame
    fn pump(&mut self, now: Instant) {
        for notice in self.surface.take_notices() {
            self.paginator.notify(notice, now);
        }
        if let Some(report) = self.paginator.tick(&mut self.surface, now) {
            log::info!(
                "pass {} done: {} breaks, {} pages",
                report.pass.0,
                report.applied_count(),
                report.page_map.page_count()
            );
        }
    }

    fn poll_timeout(&self, now: Instant) -> Duration {
        if self.paginator.is_measuring() {
            return FRAME;
        }
        match self.paginator.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(now).max(Duration::from_millis(1)),
            None => IDLE_POLL,
        }
    }

    fn resize(&mut self, columns: u16) {
        self.surface
            .set_width(LayoutMetrics::terminal(content_columns(columns)).width);
    }

    fn scroll_by(&mut self, delta: isize) {
        self.scroll = self.scroll.saturating_add_signed(delta);
    }

    fn toggle_pagination(&mut self, now: Instant) -> Result<()> {
        let mut config = self.paginator.config().clone();
        config.enabled = !config.enabled;
        log::info!("pagination {}", if config.enabled { "enabled" } else { "disabled" });
        self.paginator.configure(config, &mut self.surface, now)?;
        Ok(())
    }

    fn append_paragraph(&mut self) {
        self.appended += 1;
        self.surface.append_paragraph(&format!(
            "Appended paragraph {}. Every new block reflows the pages after it.",
            self.appended
        ));
    }

    fn status(&self) -> String {
        let state = match self.paginator.state() {
            SchedulerState::Idle => "idle",
            SchedulerState::Scheduled { .. } => "scheduled",
            SchedulerState::Measuring { .. } => "measuring",
        };
        let pages = match self.paginator.last_report() {
            Some(PassReport {
                outcome: PassOutcome::Applied,
                page_map,
                ..
            }) => format!("{} pages", page_map.page_count()),
            Some(PassReport {
                outcome: PassOutcome::Skipped(reason),
                ..
            }) => reason.to_string(),
            None => "not paginated yet".to_string(),
        };
        format!(" {} | {pages} | {state} ", self.path.display())
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let config = match Config::load() {
        Ok(Some(config)) => config,
        Ok(None) => Config::default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let mode = match parse_args(&args, config.default_document.as_deref()) {
        Ok(mode) => mode,
        Err(message) => {
            eprintln!("Error: {message}");
            eprintln!("Usage: {} [document.md]", args[0]);
            eprintln!("       {} --report <document.md> [columns]", args[0]);
            eprintln!(
                "Or set default_document in a config file at {}",
                config_path.display()
            );
            process::exit(1);
        }
    };

    let pagination = pagination_config(&config.page).with_context(|| {
        format!("Invalid [page] settings in '{}'", config_path.display())
    })?;
    let paginator = Paginator::new(pagination, scheduler_config(&config.scheduler));

    match mode {
        Mode::Report { path, columns } => {
            init_logging(None);
            let text = read_document(&path)?;
            print!("{}", report(&path, &text, columns, paginator));
            Ok(())
        }
        Mode::View(path) => {
            let log_path = env::temp_dir().join("page-reflow.log");
            init_logging(Some(&log_path));
            log::info!("page-reflow starting, config {}", config_path.display());
            let text = read_document(&path)?;
            view(path, &text, paginator)
        }
    }
}

fn parse_args(args: &[String], default_document: Option<&Path>) -> Result<Mode, String> {
    match args.get(1..).unwrap_or_default() {
        [] => default_document
            .map(|path| Mode::View(path.to_path_buf()))
            .ok_or_else(|| "No document provided and no default_document configured".to_string()),
        [flag, path] if flag == "--report" => Ok(Mode::Report {
            path: PathBuf::from(path),
            columns: DEFAULT_REPORT_COLUMNS,
        }),
        [flag, path, columns] if flag == "--report" => {
            let columns = columns
                .parse::<u16>()
                .ok()
                .filter(|c| *c > 0)
                .ok_or_else(|| format!("Invalid column count '{columns}'"))?;
            Ok(Mode::Report {
                path: PathBuf::from(path),
                columns,
            })
        }
        [path] if !path.starts_with("--") => Ok(Mode::View(PathBuf::from(path))),
        _ => Err("Unrecognised arguments".to_string()),
    }
}

/// Logs go to a file while the terminal is in the alternate screen
fn init_logging(file: Option<&Path>) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Info)
        .parse_default_env();
    if let Some(path) = file
        && let Ok(file) = File::create(path)
    {
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
}

fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document '{}'", path.display()))
}

fn pagination_config(settings: &PageSettings) -> Result<PaginationConfig> {
    let size = match (settings.height, settings.size) {
        (Some(height), _) => PageSize::Custom(height),
        (None, PaperSize::A4) => PageSize::A4,
        (None, PaperSize::Letter) => PageSize::Letter,
        (None, PaperSize::Legal) => PageSize::Legal,
    };
    let config = PaginationConfig {
        page_height: size.height_px(),
        gap_height: settings.gap,
        enabled: settings.enabled,
        first_page_number: settings.first_page_number,
        header_template: settings.header.clone(),
        bleed: settings.bleed,
    };
    config.validate()?;
    Ok(config)
}

fn scheduler_config(settings: &SchedulerSettings) -> SchedulerConfig {
    SchedulerConfig {
        structural_debounce: Duration::from_millis(settings.structural_debounce_ms),
        size_debounce: Duration::from_millis(settings.size_debounce_ms),
        settle_guard: Duration::from_millis(settings.settle_guard_ms),
    }
}

/// One synchronous pass, summarised as plain text
fn report(path: &Path, text: &str, columns: u16, mut paginator: Paginator) -> String {
    let mut surface = HeadlessSurface::new(text, LayoutMetrics::terminal(columns));
    let result = paginator.run_pass(&mut surface, Instant::now());

    let mut out = format!(
        "{}: {} blocks at {columns} columns\n",
        path.display(),
        surface.block_count()
    );
    if let PassOutcome::Skipped(reason) = &result.outcome {
        out.push_str(&format!("skipped: {reason}\n"));
        return out;
    }

    for brk in &result.breaks {
        out.push_str(&format!(
            "page {} ends after block {}, push {}px\n",
            brk.page_number, brk.after_block_index, brk.push_pixels
        ));
    }
    for dropped in &result.dropped {
        out.push_str(&format!(
            "dropped break after block {}: {}\n",
            dropped.point.after_block_index, dropped.reason
        ));
    }
    for page in &result.page_map.pages {
        out.push_str(&format!(
            "page {} starts at block {} ({}px)\n",
            page.number, page.first_block, page.top
        ));
    }
    out.push_str(&format!("{} pages\n", result.page_map.page_count()));
    out
}

fn view(path: PathBuf, text: &str, paginator: Paginator) -> Result<()> {
    let (columns, _) = crossterm::terminal::size()?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(path, text, content_columns(columns), paginator);
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

/// Columns left for text inside the bordered content pane
fn content_columns(columns: u16) -> u16 {
    columns.saturating_sub(2).max(1)
}

fn run_app(terminal: &mut Tui, app: &mut App) -> Result<()> {
    loop {
        app.pump(Instant::now());
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(app.poll_timeout(Instant::now()))? {
            continue;
        }
        let now = Instant::now();
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.scroll_by(1),
                KeyCode::Up | KeyCode::Char('k') => app.scroll_by(-1),
                KeyCode::PageDown => app.scroll_by(app.viewport_rows as isize),
                KeyCode::PageUp => app.scroll_by(-(app.viewport_rows as isize)),
                KeyCode::Char('r') => app.paginator.force_recalculate(now),
                KeyCode::Char('p') => app.toggle_pagination(now)?,
                KeyCode::Char('e') => app.append_paragraph(),
                _ => {}
            },
            Event::Resize(columns, _) => app.resize(columns),
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(f.area());

    let rows: Vec<Line> = app.surface.visual_lines().into_iter().map(render_row).collect();
    app.viewport_rows = chunks[0].height.saturating_sub(2) as usize;
    app.scroll = app.scroll.min(rows.len().saturating_sub(1));

    let content = Paragraph::new(rows)
        .block(Block::default().borders(Borders::ALL).title(app.status()))
        .scroll((u16::try_from(app.scroll).unwrap_or(u16::MAX), 0));
    f.render_widget(content, chunks[0]);

    let help = Paragraph::new(Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("↑↓/PgUp/PgDn: Scroll | "),
        Span::raw("r: Repaginate | p: Toggle pages | e: Append paragraph"),
    ]));
    f.render_widget(help, chunks[1]);
}

fn render_row(row: VisualLine) -> Line<'static> {
    match row {
        VisualLine::Text { text, .. } => Line::from(text),
        VisualLine::Blank => Line::default(),
        VisualLine::Gap { ended_page, header } => {
            let label = match header {
                Some(header) => format!("── end of page {ended_page} ── {header} "),
                None => format!("── end of page {ended_page} ──"),
            };
            Line::from(Span::styled(
                label,
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            ))
        }
    }
}
