use clap::Parser;
use resume_autofill::cli::commands::{
    cmd_fill, cmd_flatten, cmd_import, cmd_scan, cmd_serve, cmd_test_connection,
};
use resume_autofill::cli::config::{
    Cli, Commands, build_session_config, load_config, load_keyword_tables, parse_analyzer,
    resolve_classifier,
};
use resume_autofill::screen::scanner::ScanOptions;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "resume_autofill=warn",
        1 => "resume_autofill=info",
        2 => "resume_autofill=debug",
        _ => "resume_autofill=trace",
    };
    // stdout carries JSON output and the NDJSON protocol
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref());
    let classifier = resolve_classifier(&cli, &config);
    let trace_path = config.trace.as_deref();

    match &cli.command {
        Commands::Scan { page } => {
            let options = ScanOptions {
                custom_component_hosts: config.scan.custom_component_hosts.clone(),
            };
            cmd_scan(page, &options)?;
        }
        Commands::Flatten { resume } => {
            cmd_flatten(resume, &load_keyword_tables(&config)?)?;
        }
        Commands::Fill {
            page,
            resume,
            store,
            analyzer,
            output,
        } => {
            let analyzer = parse_analyzer(analyzer)?;
            let session_config = build_session_config(&config, classifier, analyzer)?;
            let filled = cmd_fill(
                page,
                resume.as_deref(),
                store.as_deref(),
                output.as_deref(),
                session_config,
                trace_path,
            )?;
            if !filled {
                std::process::exit(1);
            }
        }
        Commands::Serve {
            page,
            store,
            analyzer,
            output,
        } => {
            let analyzer = parse_analyzer(analyzer)?;
            let session_config = build_session_config(&config, classifier, analyzer)?;
            cmd_serve(page, store.as_deref(), output.as_deref(), session_config, trace_path)?;
        }
        Commands::TestConnection { store } => {
            if !cmd_test_connection(&classifier, store.as_deref())? {
                std::process::exit(1);
            }
        }
        Commands::Import { store, resume } => {
            cmd_import(store, resume)?;
        }
    }

    Ok(())
}
