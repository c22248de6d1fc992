//! tldr-man CLI
//!
//! Entry point for the `tldr` command.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use tldr_man::locale::LocaleEnv;
use tldr_man::platform::{self, Platform};
use tldr_man::render;
use tldr_man::signal::{self, CancelToken};
use tldr_man::temp::TempFile;
use tldr_man::{
    logging, CacheSynchronizer, CacheView, Config, ConfigEnv, Error, PageResolver, Pager, Pandoc, Result,
    SyncObserver, SyncPhase, UpdateStats,
};

const PAGE_REQUEST_URL: &str = "https://github.com/tldr-pages/tldr/issues/new?title=page%20request:%20";

#[derive(Parser)]
#[command(name = "tldr")]
#[command(about = "Display tldr pages as man pages", disable_version_flag = true)]
struct Cli {
    /// Page to show; several words are joined with `-`
    #[arg(value_name = "PAGE", required_unless_present_any = ["update", "render", "list", "manpath", "version"])]
    page: Vec<String>,

    /// Search this platform's pages first (android, freebsd, linux, macos, netbsd, openbsd, osx, sunos, windows)
    #[arg(short, long, value_parser = parse_platform)]
    platform: Option<Platform>,

    /// Language code to show pages in, e.g. `fr` or `pt_BR`
    #[arg(short = 'L', long)]
    language: Option<String>,

    /// Download the latest pages and rebuild the cache
    #[arg(short, long)]
    update: bool,

    /// Render a local page file and display it
    #[arg(short, long, value_name = "FILE")]
    render: Option<PathBuf>,

    /// List every page available for the current platform and language
    #[arg(short, long)]
    list: bool,

    /// Print the cache directories as a MANPATH
    #[arg(long)]
    manpath: bool,

    /// Print version
    #[arg(short = 'v', short_alias = 'V', long)]
    version: bool,
}

fn parse_platform(value: &str) -> std::result::Result<Platform, String> {
    if platform::PLATFORM_NAMES.contains(&value) {
        value.parse().map_err(|err: platform::UnknownPlatform| err.to_string())
    } else {
        Err(format!(
            "expected one of: {}",
            platform::PLATFORM_NAMES.join(", ")
        ))
    }
}

/// What one invocation does.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    Version,
    Update,
    Render(PathBuf),
    List,
    Manpath,
    Show(String),
}

impl Cli {
    fn action(&self) -> Action {
        if self.version {
            Action::Version
        } else if self.update {
            Action::Update
        } else if let Some(file) = &self.render {
            Action::Render(file.clone())
        } else if self.list {
            Action::List
        } else if self.manpath {
            Action::Manpath
        } else {
            Action::Show(page_name(&self.page))
        }
    }
}

/// `git status` and `Git-Status` both become `git-status`.
fn page_name(words: &[String]) -> String {
    words.join("-").trim().to_lowercase()
}

fn main() {
    logging::init_logging();
    configure_colour();

    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        report(&err);
        process::exit(err.exit_code());
    }
}

fn configure_colour() {
    let no_color = env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    let dumb = env::var("TERM").is_ok_and(|term| term == "dumb");
    if no_color || dumb {
        colored::control::set_override(false);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let action = cli.action();
    if action == Action::Version {
        println!("tldr {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::build(&ConfigEnv::from_process())?;
    match action {
        Action::Version => Ok(()),
        Action::Update => run_update(&config),
        Action::Render(file) => run_render(&config, &file),
        Action::List => run_list(&config, cli),
        Action::Manpath => run_manpath(&config, cli),
        Action::Show(name) => run_show(&config, cli, &name),
    }
}

fn run_update(config: &Config) -> Result<()> {
    let cancel = CancelToken::new();
    if let Err(err) = signal::install_interrupt_handler(&cancel) {
        tracing::warn!(error = %err, "could not install interrupt handler");
    }

    println!("{}", "Updating tldr-pages cache...".bold());
    let synchronizer = CacheSynchronizer::new(config, Arc::new(Pandoc::new(&config.formatter)), cancel);
    let mut observer = ProgressObserver::default();
    synchronizer.update(&mut observer)?;
    println!("{}", "Done!".green().bold());
    Ok(())
}

fn run_render(config: &Config, file: &Path) -> Result<()> {
    let source = fs::read_to_string(file).map_err(|err| Error::io(file, err))?;
    let content = render::render(&source, &Pandoc::new(&config.formatter))?;

    let artifact = TempFile::with_contents("tldr-", ".1", content.as_bytes())
        .map_err(|err| Error::io(env::temp_dir(), err))?;
    Pager::new(&config.pager).show(artifact.path())
}

/// Lock the cache and pick what to search for this invocation.
fn open_cache<'a>(resolver: &PageResolver<'a>, cli: &Cli) -> Result<CacheView<'a>> {
    resolver.open(
        cli.language.as_deref(),
        &LocaleEnv::from_process(),
        platform::ordered_sections(cli.platform),
    )
}

fn run_show(config: &Config, cli: &Cli, name: &str) -> Result<()> {
    let resolver = PageResolver::new(config);
    // The lock is released before the pager starts.
    let page = open_cache(&resolver, cli)?.find_page(name)?;
    Pager::new(&config.pager).show(&page)
}

fn run_list(config: &Config, cli: &Cli) -> Result<()> {
    let resolver = PageResolver::new(config);
    for page in open_cache(&resolver, cli)?.list_pages()? {
        println!("{page}");
    }
    Ok(())
}

fn run_manpath(config: &Config, cli: &Cli) -> Result<()> {
    let resolver = PageResolver::new(config);
    println!("{}", open_cache(&resolver, cli)?.manpath());
    Ok(())
}

fn report(err: &Error) {
    eprintln!("{} {err}", "Error:".red().bold());

    match err {
        Error::PageNotFound(name) => {
            eprintln!(
                "Try updating with `{}`, or request the page at:",
                "tldr --update".cyan()
            );
            eprintln!("  {PAGE_REQUEST_URL}{}", urlencoding::encode(name));
        }
        Error::NoCache { .. } => {
            eprintln!("Run `{}` to download the pages.", "tldr --update".cyan());
        }
        Error::ToolMissing { tool } => {
            eprintln!("Install `{tool}` and make sure it is on your PATH.");
        }
        Error::UnrecognizedLocale(_) => {
            if let Ok(config) = Config::build(&ConfigEnv::from_process()) {
                if let Ok(codes) = PageResolver::new(&config).language_codes() {
                    eprintln!("Available languages: {}", codes.join(", "));
                }
            }
        }
        Error::ForeignContent {
            cache_root,
            offending,
        } => {
            for path in offending {
                eprintln!("  {}", path.display().to_string().yellow());
            }
            eprintln!(
                "Refusing to replace it. Remove {} manually to force an update.",
                cache_root.display()
            );
        }
        Error::Cancelled => eprintln!("The existing cache was left unchanged."),
        _ => {}
    }
}

/// Terminal progress for `--update`.
#[derive(Default)]
struct ProgressObserver {
    download: Option<ProgressBar>,
    section: Option<ProgressBar>,
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

impl SyncObserver for ProgressObserver {
    fn phase(&mut self, phase: SyncPhase) {
        match phase {
            SyncPhase::Downloading => {
                let bar = ProgressBar::new(0);
                bar.set_style(bar_style("Downloading [{bar:40.cyan/blue}] {bytes}/{total_bytes}"));
                self.download = Some(bar);
            }
            SyncPhase::Extracting => {
                if let Some(bar) = self.download.take() {
                    bar.finish_and_clear();
                }
            }
            SyncPhase::Staged => {
                if let Some(bar) = self.section.take() {
                    bar.finish_and_clear();
                }
            }
            _ => {}
        }
    }

    fn download_progress(&mut self, downloaded: u64, total: Option<u64>) {
        if let Some(bar) = &self.download {
            if let Some(total) = total {
                bar.set_length(total);
            }
            bar.set_position(downloaded);
        }
    }

    fn section_started(&mut self, locale: &str, section: &str, documents: usize) {
        let bar = ProgressBar::new(documents as u64);
        bar.set_style(bar_style("{msg:24} [{bar:40.cyan/blue}] {pos}/{len}"));
        bar.set_message(format!("{locale} / {section}"));
        self.section = Some(bar);
    }

    fn section_advanced(&mut self) {
        if let Some(bar) = &self.section {
            bar.inc(1);
        }
    }

    fn section_finished(&mut self, _locale: &str, _section: &str) {
        if let Some(bar) = self.section.take() {
            bar.finish();
        }
    }

    fn finished(&mut self, stats: &UpdateStats) {
        println!(
            "{} created, {} updated, {} unchanged",
            stats.created.to_string().green().bold(),
            stats.updated.to_string().yellow().bold(),
            stats.unchanged.to_string().blue().bold(),
        );
    }
}
