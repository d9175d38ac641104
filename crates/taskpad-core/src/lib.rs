pub mod app;
pub mod cli;
pub mod config;
pub mod datetime;
pub mod form;
pub mod home;
pub mod observe;
pub mod render;
pub mod route;
pub mod shell;
pub mod store;
pub mod task;

use std::ffi::OsString;
use std::io::{
  self,
  IsTerminal
};

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting taskpad"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.taskpadrc.as_deref()
  )
  .context(
    "failed to load configuration"
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .iter()
        .map(|kv| {
          (kv.key.clone(), kv.value.clone())
        })
    )
  );

  let app = app::App::default();
  let mut session =
    shell::Session::new(app, &cfg)?;

  let stdout = io::stdout();
  let mut out = stdout.lock();

  let stdin = io::stdin();
  let interactive = stdin.is_terminal();

  if let Some(line) =
    cli.initial_command()
  {
    let flow =
      session.execute(&line, &mut out)?;
    // One-shot use from a terminal;
    // piped input still runs after it.
    if flow == shell::Flow::Quit
      || interactive
    {
      info!("done");
      return Ok(());
    }
  }

  let prompt = cfg.prompt();
  let prompt = interactive
    .then_some(prompt.as_str());
  session.run(
    stdin.lock(),
    &mut out,
    prompt
  )?;

  info!("done");
  Ok(())
}
