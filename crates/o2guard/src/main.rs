use clap::Parser;
use color_eyre::Report;
use color_eyre::Result;
use o2guard_cli::Cli;
use std::process;
use tracing_subscriber::EnvFilter;

#[cfg(not(windows))]
use jemallocator::Jemalloc;
#[cfg(windows)]
use mimalloc::MiMalloc;

#[cfg(windows)]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    color_eyre::install()?;

    match o2guard_cli::execute(cli) {
        Ok(code) => process::exit(code),
        Err(error) => handle_error(&error),
    }
}

fn handle_error(error: &Report) -> ! {
    use std::io::Write;
    let stderr = &mut std::io::stderr();

    let _ = writeln!(stderr, "\n{} o2guard could not run\n", styled_error_prefix());

    let error_string = error.to_string();
    let root_cause = error.root_cause().to_string();

    if error_string.contains("Git command failed") {
        let _ = writeln!(stderr, "  {} Could not list staged files", styled_bullet());
        let _ = writeln!(stderr, "  {root_cause}");
        let _ = writeln!(
            stderr,
            "\n  {} --staged needs git on PATH and a repository root inside a work tree",
            styled_hint()
        );
    } else if error_string.contains("threshold") {
        let _ = writeln!(stderr, "  {} {error_string}", styled_bullet());
        let _ = writeln!(
            stderr,
            "\n  {} Pass a value between 0.0 and 1.0 to --threshold or in .o2guard.yaml",
            styled_hint()
        );
    } else if error_string.contains("configuration") || error_string.contains("yaml") {
        let _ = writeln!(stderr, "  {} Configuration error", styled_bullet());
        let _ = writeln!(stderr, "  {error_string}");
        let _ = writeln!(stderr, "\n  {} Check your .o2guard.yaml syntax", styled_hint());
    } else if error_string.contains("ignore pattern") {
        let _ = writeln!(stderr, "  {} Invalid ignore pattern", styled_bullet());
        let _ = writeln!(stderr, "  {root_cause}");
        let _ = writeln!(
            stderr,
            "\n  {} Check .o2guardignore and --exclude-paths for malformed globs",
            styled_hint()
        );
    } else {
        let _ = writeln!(stderr, "  {} {}", styled_bullet(), root_cause);
    }

    if std::env::var("RUST_BACKTRACE").is_ok() || std::env::var("O2GUARD_DEBUG").is_ok() {
        let _ = writeln!(stderr, "\n{}", styled_section_header("Debug Information"));
        let _ = writeln!(stderr, "{error:?}");
    } else {
        let _ = writeln!(
            stderr,
            "\n  {} Run with O2GUARD_DEBUG=1 for more details",
            styled_info()
        );
    }

    let _ = writeln!(stderr);

    process::exit(1);
}

fn styled_error_prefix() -> String {
    if supports_color() {
        "\x1b[31m❌\x1b[0m".to_string()
    } else {
        "ERROR:".to_string()
    }
}

fn styled_bullet() -> String {
    if supports_color() {
        "\x1b[31m•\x1b[0m".to_string()
    } else {
        "•".to_string()
    }
}

fn styled_hint() -> String {
    if supports_color() {
        "\x1b[32mHint:\x1b[0m".to_string()
    } else {
        "Hint:".to_string()
    }
}

fn styled_info() -> String {
    if supports_color() {
        "\x1b[36mInfo:\x1b[0m".to_string()
    } else {
        "Info:".to_string()
    }
}

fn styled_section_header(text: &str) -> String {
    if supports_color() {
        format!("\x1b[33m=== {text} ===\x1b[0m")
    } else {
        format!("=== {text} ===")
    }
}

fn supports_color() -> bool {
    #[cfg(windows)]
    {
        std::env::var("TERM").is_ok() || std::env::var("WT_SESSION").is_ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("TERM").unwrap_or_default() != "dumb"
    }
}
