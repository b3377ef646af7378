use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;

use scene_pilot::automation::detection::SceneClassifier;
use scene_pilot::config::{Config, DEFAULT_CONFIG_FILE};
use scene_pilot::core::platform::WindowQuery;
use scene_pilot::core::{capture_to_file, create_window_system, escape_pressed};
use scene_pilot::execution::{ExecutionEvent, Supervisor};
use scene_pilot::models::Project;

#[derive(Parser, Debug)]
#[command(
    name = "scene-pilot",
    version,
    about = "Recognize what a window shows and replay scripted input into it in the background"
)]
struct Cli {
    /// Runtime configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List visible top-level windows
    Windows {
        /// Case-insensitive title filter
        #[arg(long)]
        filter: Option<String>,
    },
    /// Save the client area of a window as an image
    Capture {
        #[arg(long)]
        title: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Show which child window sits under a client-relative pixel
    Child {
        #[arg(long)]
        title: String,
        #[arg(long)]
        x: i32,
        #[arg(long)]
        y: i32,
    },
    /// Classify the current contents of a project's target window
    Recognize { project: PathBuf },
    /// Run one or more projects until they finish (ESC stops all)
    Run {
        #[arg(required = true)]
        projects: Vec<PathBuf>,
    },
    /// Write an example project file
    Init { path: PathBuf },
    /// Write the effective configuration, defaults filled in, to the config file
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = Config::load(&cli.config);
    match cli.command {
        Commands::Config => write_config(&config, &cli.config),
        Commands::Windows { filter } => list_windows(filter.as_deref()),
        Commands::Capture { title, out } => capture(&title, &out),
        Commands::Child { title, x, y } => child(&title, x, y),
        Commands::Recognize { project } => recognize(&config, &project),
        Commands::Run { projects } => run(config, &projects),
        Commands::Init { path } => init(&path),
    }
}

fn list_windows(filter: Option<&str>) -> anyhow::Result<()> {
    let system = create_window_system();
    let query = filter.map(WindowQuery::title);
    for info in system.list_windows() {
        if query.as_ref().map_or(true, |q| q.matches(&info)) {
            println!(
                "{}  {}x{}{}  [{}]  {}",
                info.handle,
                info.width(),
                info.height(),
                if info.minimized { " (minimized)" } else { "" },
                info.class_name,
                info.title
            );
        }
    }
    Ok(())
}

fn capture(title: &str, out: &Path) -> anyhow::Result<()> {
    let system = create_window_system();
    let handle = system.find_window(&WindowQuery::title(title))?;
    capture_to_file(system.as_ref(), handle, out)
}

fn child(title: &str, x: i32, y: i32) -> anyhow::Result<()> {
    let system = create_window_system();
    let handle = system.find_window(&WindowQuery::title(title))?;
    let target = system.child_at(handle, x, y);
    if target == handle {
        println!("({}, {}) -> {} (no child)", x, y, handle);
    } else {
        println!("({}, {}) -> {} (child of {})", x, y, target, handle);
    }
    Ok(())
}

fn recognize(config: &Config, path: &Path) -> anyhow::Result<()> {
    let project = Project::load(path)?;
    let system = create_window_system();
    let handle = system
        .find_window(&project.window_query())
        .with_context(|| format!("project '{}'", project.display_name()))?;
    let snapshot = system.capture(handle)?;
    let classifier =
        SceneClassifier::new(system.clone(), config.recognition).with_base_dir(project.base_dir.clone());

    let frame = snapshot.to_gray();
    for scene in project.enabled_scenes() {
        match classifier.evaluate(snapshot.image(), &frame, scene) {
            Some(found) => println!("  {:<24} {:.3} via {:?}", scene.name, found.score, found.path),
            None => println!("  {:<24} -", scene.name),
        }
    }
    match classifier.classify(&snapshot, &project.scenes) {
        Some(scene) => println!("scene: {}", scene.name),
        None => println!("scene: none"),
    }
    Ok(())
}

fn run(config: Config, paths: &[PathBuf]) -> anyhow::Result<()> {
    let projects = paths
        .iter()
        .map(|path| Project::load(path).map(Arc::new))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let supervisor = Supervisor::new(create_window_system(), config);
    let events = supervisor.subscribe();
    let mut pending = HashSet::new();
    for project in projects {
        let id = project.id.clone();
        match supervisor.start(project.clone()) {
            Ok(()) => {
                pending.insert(id);
            }
            Err(e) => log::error!("{}: {}", project.display_name(), e),
        }
    }
    if pending.is_empty() {
        bail!("no project could be started");
    }

    let mut failures = 0;
    while !pending.is_empty() {
        if escape_pressed() {
            log::info!("ESC pressed, stopping all projects");
            supervisor.stop_all();
        }
        match events.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                println!("{}", event);
                if let ExecutionEvent::Finished { success, .. } = &event {
                    pending.remove(event.project_id());
                    if !success {
                        failures += 1;
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if failures > 0 {
        bail!("{} project(s) did not complete", failures);
    }
    Ok(())
}

fn init(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    let mut project = Project::example();
    project.save(path)?;
    println!("wrote example project '{}' to {}", project.display_name(), path.display());
    Ok(())
}

fn write_config(config: &Config, path: &Path) -> anyhow::Result<()> {
    config.save(path)?;
    println!("wrote configuration to {}", path.display());
    Ok(())
}
