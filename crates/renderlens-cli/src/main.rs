use std::fs;
use std::sync::Arc;

use facet::Facet;
use figue as args;
use renderlens::types::{Options, OptionsPatch, Report};
use renderlens::{BundleType, ConsoleLogger, DevtoolsHook, Hub, SharedFrameRate, format_report};
use tracing::info;

mod trace;

use trace::TraceFile;

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    #[facet(args::subcommand)]
    command: Command,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum Command {
    /// Replay a recorded commit trace and print the per-component report.
    Replay {
        #[facet(args::named)]
        trace: String,
        /// JSON file of option overrides.
        #[facet(args::named, default)]
        options: Option<String>,
        /// Only report this component.
        #[facet(args::named, default)]
        component: Option<String>,
        #[facet(args::named, default)]
        json: bool,
        /// Log every render while replaying.
        #[facet(args::named, default)]
        log: bool,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("renderlens")
                .description("Replay component-tree commit traces and report wasted renders")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();
    let cli = args::Driver::new(figue_config)
        .run()
        .into_result()
        .map_err(|e| e.to_string())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.value.command {
        Command::Replay {
            trace,
            options,
            component,
            json,
            log,
        } => run_replay(&trace, options.as_deref(), component.as_deref(), json, log),
    }
}

fn run_replay(
    trace_path: &str,
    options_path: Option<&str>,
    component: Option<&str>,
    json: bool,
    log: bool,
) -> Result<(), String> {
    let text = fs::read_to_string(trace_path).map_err(|e| format!("read {trace_path}: {e}"))?;
    let trace: TraceFile =
        facet_json::from_str(&text).map_err(|e| format!("decode trace {trace_path}: {e}"))?;

    let mut options = Options::default();
    if let Some(path) = options_path {
        let text = fs::read_to_string(path).map_err(|e| format!("read {path}: {e}"))?;
        let patch: OptionsPatch =
            facet_json::from_str(&text).map_err(|e| format!("decode options {path}: {e}"))?;
        options.apply(&patch);
    }
    options.log |= log;

    let report = replay(&trace, options)?;
    if json {
        println!("{}", renderlens::report::to_json(&report)?);
    } else {
        let names: Vec<&str> = component.into_iter().collect();
        print!("{}", format_report(&report, &names));
    }
    Ok(())
}

/// Feed every commit of `trace` through a fresh hook and hub.
fn replay(trace: &TraceFile, mut options: Options) -> Result<Report, String> {
    let commits = trace::load(trace)?;
    // The per-name table is the output.
    options.report = true;
    let log = options.log;

    let fps = SharedFrameRate::default();
    let hub = Hub::builder()
        .options(options)
        .frame_rate(Arc::new(fps.clone()))
        .build();
    let hook = DevtoolsHook::new();
    let bundle = if trace.production {
        BundleType::Production
    } else {
        BundleType::Development
    };
    let renderer = hook
        .register_renderer("replay", bundle)
        .map_err(|e| e.to_string())?;
    hub.start(&hook).map_err(|e| e.to_string())?;
    if log {
        hub.create_instrumentation("console", Arc::new(ConsoleLogger));
    }

    for commit in &commits {
        if let Some(rate) = commit.fps {
            fps.set(rate);
        }
        hook.on_commit_fiber_root(renderer, &commit.root);
    }
    info!(commits = commits.len(), "replay finished");
    Ok(hub.report())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggle() -> TraceFile {
        facet_json::from_str(include_str!("../traces/toggle.json")).expect("trace decodes")
    }

    #[test]
    fn replaying_the_toggle_trace_reports_every_component() {
        let report = replay(&toggle(), Options::default()).expect("replay");
        let app = report.get("App").expect("App entry");
        assert_eq!(app.render_count, 3);
        assert_eq!(app.cumulative_self_time_ms, 1.5 + 2.0 + 2.0);
        // Label unmounted in the last commit but stays in the report.
        assert_eq!(report.get("Label").map(|e| e.render_count), Some(2));
        // Button bailed out of the last commit.
        let button = report.get("Button").expect("Button entry");
        assert_eq!(button.render_count, 2);
        assert!(button.last_changes.iter().all(|change| change.unstable));
    }

    #[test]
    fn production_traces_need_the_override() {
        let mut trace = toggle();
        trace.production = true;
        assert!(replay(&trace, Options::default()).is_err());

        let forced = Options {
            dangerously_force_run_in_production: true,
            ..Options::default()
        };
        assert!(replay(&trace, forced).is_ok());
    }
}
