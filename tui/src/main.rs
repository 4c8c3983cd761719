mod app_state;
mod ui;

use app_state::App;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use scriptkit_core::{logging, Config, ProcessRunner};
use std::{
    env, io,
    path::{Path, PathBuf},
    time::Duration,
};

/// Overrides the configured modules directory.
const MODULES_DIR_ENV: &str = "SCRIPTKIT_MODULES_DIR";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config = Config::load()?;
    let modules_dir = env::var_os(MODULES_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.modules_dir.clone());
    let (modules, warning) = app_state::load_modules(&modules_dir);
    let mut app = App::new(modules);
    if let Some(warning) = warning {
        tracing::warn!("{warning}");
        app.set_status(warning);
    }

    let bin_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app, bin_dir.as_deref());

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("scriptkit-dash error: {err}");
    }

    Ok(())
}

fn run<B: ratatui::prelude::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    bin_dir: Option<&Path>,
) -> io::Result<()> {
    let runner = ProcessRunner::new();
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if app.editing().is_some() {
            match key.code {
                KeyCode::Enter => app.commit_edit(),
                KeyCode::Esc => app.cancel_edit(),
                KeyCode::Backspace => app.edit_pop(),
                KeyCode::Char(ch) => app.edit_push(ch),
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Tab => app.focus_next(),
            KeyCode::BackTab => app.focus_prev(),
            KeyCode::Up | KeyCode::Char('k') => app.move_up(),
            KeyCode::Down | KeyCode::Char('j') => app.move_down(),
            KeyCode::Left => app.focus_prev(),
            KeyCode::Right => app.focus_next(),
            KeyCode::Char('e') => app.begin_edit(),
            KeyCode::Enter => app.activate(&runner, bin_dir),
            _ => {}
        }
    }

    Ok(())
}
