use anyhow::{anyhow, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use lectern::build::build_site;
use lectern::config::Config;
use lectern::server::serve;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let project = Arg::with_name("project")
        .long("project")
        .value_name("DIR")
        .takes_value(true)
        .help("The project directory (defaults to the current directory)");
    let matches = App::new("lectern")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("serve")
                .about("Serves the site over HTTP")
                .arg(project.clone())
                .arg(
                    Arg::with_name("listen")
                        .long("listen")
                        .value_name("ADDR")
                        .takes_value(true)
                        .help("The address to listen on, e.g. 127.0.0.1:8080"),
                )
                .arg(
                    Arg::with_name("threads")
                        .long("threads")
                        .value_name("N")
                        .takes_value(true)
                        .help("The number of worker threads"),
                ),
        )
        .subcommand(
            SubCommand::with_name("build")
                .about("Renders the site into a directory of static files")
                .arg(project)
                .arg(
                    Arg::with_name("output")
                        .long("output")
                        .value_name("DIR")
                        .takes_value(true)
                        .required(true)
                        .help("The directory to write the site into"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        ("serve", Some(matches)) => {
            let threads = match matches.value_of("threads") {
                Some(threads) => Some(threads.parse::<usize>()?),
                None => None,
            };
            let mut config = load_config(matches, threads)?;
            if let Some(listen) = matches.value_of("listen") {
                config.listen = listen.to_owned();
            }
            serve(&config)
        }
        ("build", Some(matches)) => {
            let config = load_config(matches, None)?;
            let output = matches.value_of("output").map(Path::new);
            match output {
                Some(output) => Ok(build_site(&config, output)?),
                None => Err(anyhow!("Missing --output")),
            }
        }
        (command, _) => Err(anyhow!("Unknown command `{}`", command)),
    }
}

fn load_config(matches: &ArgMatches, threads: Option<usize>) -> Result<Config> {
    let project = match matches.value_of("project") {
        Some(project) => std::fs::canonicalize(PathBuf::from(project))?,
        None => std::env::current_dir()?,
    };
    Config::from_directory(&project, threads)
}
