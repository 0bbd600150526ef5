use std::{
    io::{self, Write},
    process,
};

use postrender::{
    application::{
        error::AppError,
        factory::{RendererFactory, Renderers},
    },
    config,
    infra::{error::InfraError, input, telemetry},
};
use tracing::{Dispatch, Level, debug, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let chain = error.messages().join(": ");
    if dispatcher::has_been_set() {
        error!(error = %chain, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %chain, "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    let renderers = RendererFactory::new(settings.renderer).build()?;
    debug!(
        target = "postrender::cli",
        base_url = %renderers.standard.config().base_url,
        "Renderers ready"
    );

    match cli_args.command {
        config::Command::Render(args) => run_render(&renderers, args),
        config::Command::Extract(args) => run_extract(&renderers, args),
    }
}

fn run_render(renderers: &Renderers, args: config::RenderArgs) -> Result<(), AppError> {
    let body = input::read_body(args.file.as_deref())?;
    let renderer = renderers.select(args.images_hidden);

    if args.json {
        let document = renderer.render_document(&body)?;
        let json = serde_json::to_string_pretty(&serde_json::json!({
            "html": document.html,
            "state": document.state,
        }))
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
        write_stdout(&json)
    } else {
        let html = renderer.render(&body)?;
        write_stdout(&html)
    }
}

fn run_extract(renderers: &Renderers, args: config::ExtractArgs) -> Result<(), AppError> {
    let body = input::read_body(args.file.as_deref())?;
    let state = renderers.standard.extract_metadata(&body)?;
    let json = serde_json::to_string_pretty(&state)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    write_stdout(&json)
}

fn write_stdout(text: &str) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{text}")
        .and_then(|()| stdout.flush())
        .map_err(|err| AppError::from(InfraError::from(err)))
}
