use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use loadstone_cli::{commands, init_logging, CliResult, RunOptions};

/// loadstone - read resources, run script snippets and render templates
#[derive(Parser, Debug)]
#[command(name = "loadstone")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a resource, searching the roots in order
    Cat {
        key: String,
        /// Directory to search; repeat for fallbacks
        #[arg(long = "root", required = true)]
        roots: Vec<PathBuf>,
        #[arg(long, default_value = "")]
        suffix: String,
    },

    /// Print where each root would read a key from
    Path {
        key: String,
        #[arg(long = "root", required = true)]
        roots: Vec<PathBuf>,
        #[arg(long, default_value = "")]
        suffix: String,
    },

    /// List the keys below a root
    List {
        #[arg(long)]
        root: PathBuf,
        #[arg(long, default_value = "")]
        suffix: String,
    },

    /// Compile a snippet file into a unit and run it
    Run {
        file: PathBuf,
        /// Where synthesized units are written
        #[arg(long)]
        work_dir: PathBuf,
        /// Unit id (defaults to the file stem)
        #[arg(long)]
        id: Option<String>,
        #[arg(long, default_value = "units")]
        root_package: String,
        /// Execution context as JSON
        #[arg(long)]
        context: Option<String>,
        /// Also print the context after the run
        #[arg(long)]
        show_context: bool,
    },

    /// Merge a template with a JSON context
    Render {
        key: String,
        #[arg(long = "root", required = true)]
        roots: Vec<PathBuf>,
        #[arg(long, default_value = ".tpl")]
        suffix: String,
        #[arg(long)]
        context: Option<String>,
    },
}

fn dispatch(command: Command, out: &mut dyn Write) -> CliResult<()> {
    match command {
        Command::Cat { key, roots, suffix } => commands::cat(&roots, &suffix, &key, out),
        Command::Path { key, roots, suffix } => commands::path(&roots, &suffix, &key, out),
        Command::List { root, suffix } => commands::list(&root, &suffix, out),
        Command::Run {
            file,
            work_dir,
            id,
            root_package,
            context,
            show_context,
        } => commands::run(
            &RunOptions {
                file,
                work_dir,
                id,
                root_package,
                context,
                show_context,
            },
            out,
        ),
        Command::Render {
            key,
            roots,
            suffix,
            context,
        } => commands::render(&roots, &suffix, &key, context.as_deref(), out),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = dispatch(cli.command, &mut out).and_then(|()| {
        out.flush().map_err(|source| loadstone_cli::CliError::Io {
            path: "<stdout>".to_string(),
            source,
        })
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
