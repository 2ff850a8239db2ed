use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use obras::config::{self, Config};
use obras::db::{self, Database, EntryFilter, LedgerStore};
use obras::error::ObrasError;
use obras::import::{read_statement, ImportSession};
use obras::ledger::{record_entry, register_project};
use obras::models::ProjectForm;
use obras::reports::{money, overview};
use obras::ui::{
    entry_wizard::{EntryWizardAction, EntryWizardState, render_entry_wizard, handle_input as handle_entry_wizard_input},
    home::{HomeAction, HomeState, render_home, handle_input as handle_home_input},
    import::{ImportAction, ImportState, render_import, handle_input as handle_import_input},
    materials::{MaterialsAction, MaterialsState, render_materials, handle_input as handle_materials_input},
    project_view::{ProjectViewAction, ProjectViewState, render_project_view, handle_input as handle_project_view_input},
    project_wizard::{ProjectWizardAction, ProjectWizardState, render_project_wizard, handle_input as handle_project_wizard_input},
};

#[derive(Parser)]
#[command(name = "obras", version, about = "Construction project ledger")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the terminal UI (default)
    Tui {
        /// Start by importing this bank statement (.xlsx or .csv)
        #[arg(long)]
        statement: Option<PathBuf>,
    },
    /// Print the overview of every project
    Summary,
    /// Show how a statement would be read, without touching the ledger
    Preview { file: PathBuf },
}

// Represents the current screen in the app
enum AppScreen {
    Home,
    ProjectWizard,
    EntryWizard(Option<i32>), // Project to return to, if opened from its view
    ProjectView(i32),
    Materials,
    Import,
}

// Main application state
struct AppState {
    db: Database,
    config: Config,
    screen: AppScreen,
    home_state: Option<HomeState>,
    project_wizard_state: Option<ProjectWizardState>,
    entry_wizard_state: Option<EntryWizardState>,
    project_view_state: Option<ProjectViewState>,
    materials_state: Option<MaterialsState>,
    import_state: Option<ImportState>,
}

impl AppState {
    fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config,
            screen: AppScreen::Home,
            home_state: None,
            project_wizard_state: None,
            entry_wizard_state: None,
            project_view_state: None,
            materials_state: None,
            import_state: None,
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Tui { statement: None }) {
        Command::Tui { statement } => run_tui(statement).await,
        Command::Summary => print_summary().await,
        Command::Preview { file } => preview_statement(&file),
    }
}

/// The terminal belongs to the UI, so tracing goes to a file.
fn init_file_tracing(path: &str) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

fn init_console_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();
}

async fn run_tui(statement: Option<PathBuf>) -> Result<()> {
    // Load configuration
    let config = config::init()?;
    init_file_tracing(&config.log_file)?;
    println!("Initializing obras...");

    // Initialize database connection
    let db = db::init(&config).await?;
    info!("Database connection established");

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app_state = AppState::new(db, config);

    let result = async {
        load_home_screen(&mut app_state, None).await?;
        if let Some(path) = statement {
            start_import(&mut app_state, &path.to_string_lossy()).await?;
        }
        run_app(&mut terminal, &mut app_state).await
    }
    .await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        warn!(error = %err, "Terminal UI stopped");
        println!("Error: {}", err);
    }

    println!("Goodbye!");

    result
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        terminal.draw(|f| match app_state.screen {
            AppScreen::Home => {
                if let Some(state) = &mut app_state.home_state {
                    render_home(f, state);
                }
            }
            AppScreen::ProjectWizard => {
                if let Some(state) = &mut app_state.project_wizard_state {
                    render_project_wizard(f, state);
                }
            }
            AppScreen::EntryWizard(_) => {
                if let Some(state) = &mut app_state.entry_wizard_state {
                    render_entry_wizard(f, state);
                }
            }
            AppScreen::ProjectView(_) => {
                if let Some(state) = &mut app_state.project_view_state {
                    render_project_view(f, state);
                }
            }
            AppScreen::Materials => {
                if let Some(state) = &mut app_state.materials_state {
                    render_materials(f, state);
                }
            }
            AppScreen::Import => {
                if let Some(state) = &mut app_state.import_state {
                    render_import(f, state);
                }
            }
        })?;

        // Handle input for current screen
        let should_quit = match app_state.screen {
            AppScreen::Home => handle_home_screen(app_state).await?,
            AppScreen::ProjectWizard => handle_project_wizard_screen(app_state).await?,
            AppScreen::EntryWizard(_) => handle_entry_wizard_screen(app_state).await?,
            AppScreen::ProjectView(project_id) => handle_project_view_screen(app_state, project_id).await?,
            AppScreen::Materials => handle_materials_screen(app_state).await?,
            AppScreen::Import => handle_import_screen(app_state).await?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

async fn load_home_screen(app_state: &mut AppState, status: Option<String>) -> Result<()> {
    let projects = app_state.db.list_projects().await?;
    let entries = app_state.db.list_entries(&EntryFilter::default()).await?;

    let mut state = HomeState::new(overview(&projects, &entries));
    state.status = status;
    app_state.home_state = Some(state);
    app_state.screen = AppScreen::Home;

    Ok(())
}

async fn open_project_view(app_state: &mut AppState, project_id: i32) -> Result<()> {
    let projects = app_state.db.list_projects().await?;
    let Some(project) = projects.into_iter().find(|p| p.id == project_id) else {
        return load_home_screen(app_state, None).await;
    };
    let entries = app_state.db.list_entries(&EntryFilter::project(project_id)).await?;

    app_state.project_view_state = Some(ProjectViewState::new(project, entries));
    app_state.screen = AppScreen::ProjectView(project_id);

    Ok(())
}

async fn open_entry_wizard(app_state: &mut AppState, selected: Option<i32>, return_to: Option<i32>) -> Result<()> {
    let projects = app_state.db.list_projects().await?;
    let subcategories = app_state.config.material_subcategories.clone();

    app_state.entry_wizard_state = Some(EntryWizardState::new(projects, selected, today(), subcategories));
    app_state.screen = AppScreen::EntryWizard(return_to);

    Ok(())
}

/// Reads a statement and opens the classification grid. Unreadable files are
/// reported on the home screen.
async fn start_import(app_state: &mut AppState, path: &str) -> Result<()> {
    let rows = match read_statement(Path::new(path.trim())) {
        Ok(rows) if rows.is_empty() => Err(ObrasError::format("the statement has no rows to classify")),
        other => other,
    };

    let rows = match rows {
        Ok(rows) => rows,
        Err(err) => {
            warn!(path, error = %err, "Statement rejected");
            if let Some(home) = &mut app_state.home_state {
                home.error = Some(err.to_string());
            }
            return Ok(());
        }
    };

    info!(path, rows = rows.len(), "Statement loaded");
    let projects = app_state.db.list_projects().await?;
    let session = ImportSession::new(rows, &projects, app_state.config.material_subcategories.clone());

    app_state.import_state = Some(ImportState::new(session, path.to_string(), today()));
    app_state.screen = AppScreen::Import;

    Ok(())
}

async fn handle_home_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.home_state {
        match handle_home_input(state)? {
            Some(HomeAction::Quit) => {
                return Ok(true);
            }
            Some(HomeAction::NewProject) => {
                app_state.project_wizard_state = Some(ProjectWizardState::new(ProjectForm::new(today())));
                app_state.screen = AppScreen::ProjectWizard;
            }
            Some(HomeAction::NewEntry(selected)) => {
                open_entry_wizard(app_state, selected, None).await?;
            }
            Some(HomeAction::ViewProject(project_id)) => {
                open_project_view(app_state, project_id).await?;
            }
            Some(HomeAction::Materials) => {
                let projects = app_state.db.list_projects().await?;
                let entries = app_state.db.list_entries(&EntryFilter::default()).await?;
                let subcategories = app_state.config.material_subcategories.clone();

                app_state.materials_state = Some(MaterialsState::new(projects, entries, subcategories));
                app_state.screen = AppScreen::Materials;
            }
            Some(HomeAction::Import(path)) => {
                start_import(app_state, &path).await?;
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_project_wizard_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.project_wizard_state {
        match handle_project_wizard_input(state)? {
            Some(ProjectWizardAction::Cancel) => {
                load_home_screen(app_state, None).await?;
            }
            Some(ProjectWizardAction::Save(form)) => match register_project(&app_state.db, &form).await {
                Ok(project) => {
                    let status = format!("Project {} registered.", project.name);
                    load_home_screen(app_state, Some(status)).await?;
                }
                Err(err) => {
                    if !err.is_user_error() {
                        warn!(error = %err, "Project registration failed");
                    }
                    state.error = Some(err.to_string());
                }
            },
            None => {}
        }
    }

    Ok(false)
}

async fn handle_entry_wizard_screen(app_state: &mut AppState) -> Result<bool> {
    let return_to = match app_state.screen {
        AppScreen::EntryWizard(return_to) => return_to,
        _ => None,
    };

    if let Some(state) = &mut app_state.entry_wizard_state {
        let status = match handle_entry_wizard_input(state)? {
            Some(EntryWizardAction::Cancel) => None,
            Some(EntryWizardAction::Save(form)) => {
                match record_entry(&app_state.db, &form, &app_state.config.material_subcategories).await {
                    Ok(report) => Some(report.message()),
                    Err(err) => {
                        if !err.is_user_error() {
                            warn!(error = %err, "Manual entry failed");
                        }
                        state.error = Some(err.to_string());
                        return Ok(false);
                    }
                }
            }
            None => return Ok(false),
        };

        match return_to {
            Some(project_id) => open_project_view(app_state, project_id).await?,
            None => load_home_screen(app_state, status).await?,
        }
    }

    Ok(false)
}

async fn handle_project_view_screen(app_state: &mut AppState, project_id: i32) -> Result<bool> {
    if let Some(state) = &mut app_state.project_view_state {
        match handle_project_view_input(state)? {
            Some(ProjectViewAction::Back) => {
                load_home_screen(app_state, None).await?;
            }
            Some(ProjectViewAction::NewEntry) => {
                open_entry_wizard(app_state, Some(project_id), Some(project_id)).await?;
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_materials_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.materials_state {
        match handle_materials_input(state)? {
            Some(MaterialsAction::Back) => {
                load_home_screen(app_state, None).await?;
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_import_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.import_state else {
        return Ok(false);
    };
    let Some(action) = handle_import_input(state)? else {
        return Ok(false);
    };

    let db = &app_state.db;
    let outcome = match action {
        ImportAction::Submit => state.session.submit(db).await,
        ImportAction::ProceedOnboarding => state.session.proceed_onboarding(),
        ImportAction::Cancel => {
            state.session.cancel();
            Ok(())
        }
        ImportAction::SubmitProject(form) => state.session.submit_project(&form, db).await.map(|_| ()),
        ImportAction::ConfirmSelection => state.session.confirm_selection(db).await,
        ImportAction::SubmitItems(items) => state.session.submit_items(items, db).await,
        ImportAction::Close => {
            let status = format!("Import closed: {} new entries.", state.session.total_inserted());
            app_state.import_state = None;
            load_home_screen(app_state, Some(status)).await?;
            return Ok(false);
        }
    };

    state.sync();
    if let Err(err) = outcome {
        if !err.is_user_error() {
            warn!(error = %err, step = ?state.step(), "Import step failed");
        }
        state.show_error(err.to_string());
    }

    Ok(false)
}

async fn print_summary() -> Result<()> {
    init_console_tracing();
    let config = config::init()?;
    let db = db::init(&config).await?;

    let projects = db.list_projects().await?;
    let entries = db.list_entries(&EntryFilter::default()).await?;
    let view = overview(&projects, &entries);

    println!(
        "{:<24} {:>16} {:>16} {:>16} {:>8}",
        "Project", "Budget", "Spent", "Balance", "Used"
    );
    for project in &view.projects {
        println!(
            "{:<24} {:>16} {:>16} {:>16} {:>7.1}%",
            project.name,
            money(&project.budget),
            money(&project.spent),
            money(&project.balance),
            project.percent_used
        );
    }
    println!();
    println!(
        "Total budget {}  spent {}  balance {}  received {}",
        money(&view.total_budget),
        money(&view.total_spent),
        money(&view.balance),
        money(&view.total_received)
    );
    for (category, total) in &view.by_category {
        println!("  {:<10} {}", category.as_str(), money(total));
    }

    Ok(())
}

fn preview_statement(path: &Path) -> Result<()> {
    init_console_tracing();
    let rows = read_statement(path).with_context(|| format!("cannot read {}", path.display()))?;

    for row in &rows {
        println!(
            "{}  {:>14}  {:<9}  {}",
            row.date.format("%d/%m/%Y"),
            money(&row.amount),
            row.category.map(|c| c.as_str()).unwrap_or("-"),
            row.detail
        );
    }
    println!("{} rows", rows.len());

    Ok(())
}
