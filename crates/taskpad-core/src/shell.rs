use std::io::{BufRead, Write};

use anyhow::{Context, anyhow};
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};

use crate::app::App;
use crate::config::Config;
use crate::datetime::parse_due_expr;
use crate::form::{CreateForm, EditForm};
use crate::home::HomeView;
use crate::observe::Subscription;
use crate::render::Renderer;
use crate::route::{Navigator, Route};
use crate::store::Snapshot;
use crate::task::Task;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "help", "where", "quit", "list", "new", "edit", "info", "toggle", "delete", "export",
        "title", "desc", "due", "complete", "show", "save", "back",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Where,
    Quit,
    List,
    New,
    Edit(String),
    Info(String),
    Toggle(String),
    Delete(String),
    Export,
    Title(String),
    Desc(String),
    Due(String),
    Complete,
    Show,
    Save,
    Back,
}

impl Command {
    /// Parses one shell line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let lowered = verb.to_ascii_lowercase();
        let known = known_command_names();
        let name = expand_command_abbrev(&lowered, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {verb} (try `help`)"))?;

        let needs_arg = |what: &str| -> anyhow::Result<String> {
            if rest.is_empty() {
                Err(anyhow!("`{name}` needs {what}"))
            } else {
                Ok(rest.to_string())
            }
        };

        let command = match name {
            "help" => Self::Help,
            "where" => Self::Where,
            "quit" => Self::Quit,
            "list" => Self::List,
            "new" => Self::New,
            "edit" => Self::Edit(needs_arg("a task number or id")?),
            "info" => Self::Info(needs_arg("a task number or id")?),
            "toggle" => Self::Toggle(needs_arg("a task number or id")?),
            "delete" => Self::Delete(needs_arg("a task number or id")?),
            "export" => Self::Export,
            // An empty title or description is a legitimate draft value.
            "title" => Self::Title(rest.to_string()),
            "desc" => Self::Desc(rest.to_string()),
            "due" => Self::Due(needs_arg("a date such as `tomorrow` or `2026-11-01`")?),
            "complete" => Self::Complete,
            "show" => Self::Show,
            "save" => Self::Save,
            "back" => Self::Back,
            other => return Err(anyhow!("unhandled command: {other}")),
        };
        Ok(Some(command))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The controller behind the route on top of the back stack. Leaving a
/// screen drops its controller and with it the draft.
#[derive(Debug)]
enum Screen {
    Home(HomeView),
    Create(CreateForm),
    Edit(EditForm),
}

/// Terminal host for the three screens.
#[derive(Debug)]
pub struct Session {
    app: App,
    renderer: Renderer,
    tz: Tz,
    nav: Navigator,
    screen: Screen,
    updates: Subscription<Snapshot>,
}

impl Session {
    pub fn new(app: App, cfg: &Config) -> anyhow::Result<Self> {
        let renderer = Renderer::new(cfg).context("failed to set up renderer")?;
        let tz = cfg.timezone()?;
        let home = app.home();
        let updates = home.watch();
        // The first value is the list as it is now, not a change.
        let _ = updates.drain();
        Ok(Self {
            app,
            renderer,
            tz,
            nav: Navigator::default(),
            screen: Screen::Home(home),
            updates,
        })
    }

    pub fn route(&self) -> &Route {
        self.nav.current()
    }

    /// Reads commands until `quit` or end of input. Command errors are
    /// printed and the session keeps going.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        out: &mut W,
        prompt: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut lines = input.lines();
        loop {
            if let Some(prompt) = prompt {
                write!(out, "{prompt}")?;
                out.flush()?;
            }
            let Some(line) = lines.next() else {
                break;
            };
            let line = line.context("failed to read command")?;
            match self.execute(&line, out) {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(err) => {
                    warn!(error = %err, "command failed");
                    writeln!(out, "error: {err:#}")?;
                }
            }
        }
        info!("session ended");
        Ok(())
    }

    #[instrument(skip(self, out))]
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> anyhow::Result<Flow> {
        let Some(command) = Command::parse(line)? else {
            return Ok(Flow::Continue);
        };
        debug!(?command, route = %self.route(), "dispatching");

        let flow = match command {
            Command::Quit => Flow::Quit,
            Command::Help => {
                self.print_help(out)?;
                Flow::Continue
            }
            Command::Where => {
                writeln!(out, "{}", self.route())?;
                Flow::Continue
            }
            command => {
                let home = match &self.screen {
                    Screen::Home(home) => Some(home.clone()),
                    Screen::Create(_) | Screen::Edit(_) => None,
                };
                match home {
                    Some(home) => self.on_home(home, command, out)?,
                    None => self.on_form(command, out)?,
                }
                Flow::Continue
            }
        };

        self.report_changes(out)?;
        Ok(flow)
    }

    fn on_home<W: Write>(
        &mut self,
        home: HomeView,
        command: Command,
        out: &mut W,
    ) -> anyhow::Result<()> {
        match command {
            Command::List => {
                self.renderer
                    .print_task_table(out, &home.tasks(), self.app.clock().now_millis())?;
            }
            Command::New => {
                self.nav.navigate(Route::CreateTask);
                self.screen = Screen::Create(self.app.create_form());
                writeln!(out, "New task. Set `title`, `desc`, `due`, then `save`.")?;
            }
            Command::Edit(reference) => {
                let id = self
                    .resolve(&home, &reference)
                    .map(|task| task.id)
                    .unwrap_or(reference);
                self.nav.navigate(Route::edit(id.clone()));
                let form = self.app.edit_form();
                form.load(&id);
                self.renderer.print_edit_draft(out, &form.draft())?;
                self.screen = Screen::Edit(form);
            }
            Command::Info(reference) => match self.resolve(&home, &reference) {
                Some(task) => self.renderer.print_task_info(out, &task)?,
                None => writeln!(out, "No task matches {reference}.")?,
            },
            Command::Toggle(reference) => match self.resolve(&home, &reference) {
                Some(task) => {
                    home.toggle_task_completion(&task);
                }
                None => writeln!(out, "No task matches {reference}.")?,
            },
            Command::Delete(reference) => match self.resolve(&home, &reference) {
                Some(task) => {
                    home.delete_task(&task.id);
                }
                None => writeln!(out, "No task matches {reference}.")?,
            },
            Command::Export => {
                let json = serde_json::to_string_pretty(home.tasks().as_slice())
                    .context("failed to serialize tasks")?;
                writeln!(out, "{json}")?;
            }
            other => {
                return Err(anyhow!(
                    "{} is only available on the create and edit screens",
                    command_name(&other)
                ));
            }
        }
        Ok(())
    }

    fn on_form<W: Write>(&mut self, command: Command, out: &mut W) -> anyhow::Result<()> {
        match command {
            Command::Title(title) => match &self.screen {
                Screen::Create(form) => form.set_title(title),
                Screen::Edit(form) => form.set_title(title),
                Screen::Home(_) => {}
            },
            Command::Desc(description) => match &self.screen {
                Screen::Create(form) => form.set_description(description),
                Screen::Edit(form) => form.set_description(description),
                Screen::Home(_) => {}
            },
            Command::Due(expr) => {
                let due = parse_due_expr(&expr, self.now()?, &self.tz)?;
                match &self.screen {
                    Screen::Create(form) => form.set_due_date(due),
                    Screen::Edit(form) => form.set_due_date(due),
                    Screen::Home(_) => {}
                }
                writeln!(out, "Due {}.", self.renderer.due(due))?;
            }
            Command::Complete => match &self.screen {
                Screen::Edit(form) => {
                    form.toggle_completion();
                    let done = form.draft().is_completed;
                    writeln!(out, "Marked {}.", if done { "completed" } else { "open" })?;
                }
                _ => return Err(anyhow!("`complete` is only available on the edit screen")),
            },
            Command::Show => match &self.screen {
                Screen::Create(form) => self.renderer.print_create_draft(out, &form.draft())?,
                Screen::Edit(form) => self.renderer.print_edit_draft(out, &form.draft())?,
                Screen::Home(_) => {}
            },
            Command::Save => self.save(out)?,
            Command::Back => self.go_home(),
            other => {
                return Err(anyhow!(
                    "{} is only available on the task list; use `back` first",
                    command_name(&other)
                ));
            }
        }
        Ok(())
    }

    fn save<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        let saved = match &self.screen {
            Screen::Create(form) => {
                if !form.submit() {
                    writeln!(out, "Cannot save: the title is empty.")?;
                    return Ok(());
                }
                true
            }
            Screen::Edit(form) => {
                if !form.is_loaded() {
                    writeln!(out, "Cannot save: the task is still loading.")?;
                    return Ok(());
                }
                if !form.submit() {
                    writeln!(out, "Cannot save: the title is empty.")?;
                    return Ok(());
                }
                true
            }
            Screen::Home(_) => false,
        };
        if saved {
            writeln!(out, "Saved.")?;
            self.go_home();
        }
        Ok(())
    }

    fn go_home(&mut self) {
        while self.nav.pop_back() {}
        self.screen = Screen::Home(self.app.home());
    }

    /// A 1-based row number from `list`, or a full task id.
    fn resolve(&self, home: &HomeView, reference: &str) -> Option<Task> {
        let tasks = home.tasks();
        if let Ok(row) = reference.parse::<usize>()
            && row >= 1
            && let Some(task) = tasks.get(row - 1)
        {
            return Some(task.clone());
        }
        self.app.store().get_by_id(reference)
    }

    fn report_changes<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        let Some(snapshot) = self.updates.latest() else {
            return Ok(());
        };
        if matches!(self.screen, Screen::Home(_)) {
            let count = snapshot.len();
            let noun = if count == 1 { "task" } else { "tasks" };
            writeln!(out, "({count} {noun})")?;
        }
        Ok(())
    }

    fn now(&self) -> anyhow::Result<DateTime<Utc>> {
        let millis = self.app.clock().now_millis();
        Utc.timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| anyhow!("clock returned an invalid instant: {millis}"))
    }

    fn print_help<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        match self.screen {
            Screen::Home(_) => {
                writeln!(out, "list             show all tasks")?;
                writeln!(out, "new              create a task")?;
                writeln!(out, "edit <n|id>      edit a task")?;
                writeln!(out, "info <n|id>      show one task")?;
                writeln!(out, "toggle <n|id>    flip a task's completion")?;
                writeln!(out, "delete <n|id>    remove a task")?;
                writeln!(out, "export           print all tasks as JSON")?;
            }
            Screen::Create(_) | Screen::Edit(_) => {
                writeln!(out, "title <text>     set the title")?;
                writeln!(out, "desc <text>      set the description")?;
                writeln!(out, "due <date>       now, today, tomorrow, friday, 2026-11-01, +3d")?;
                if matches!(self.screen, Screen::Edit(_)) {
                    writeln!(out, "complete         flip the completion flag")?;
                }
                writeln!(out, "show             print the draft")?;
                writeln!(out, "save             save and go back")?;
                writeln!(out, "back             discard and go back")?;
            }
        }
        writeln!(out, "where            current screen")?;
        writeln!(out, "quit             exit")?;
        Ok(())
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Help => "`help`",
        Command::Where => "`where`",
        Command::Quit => "`quit`",
        Command::List => "`list`",
        Command::New => "`new`",
        Command::Edit(_) => "`edit`",
        Command::Info(_) => "`info`",
        Command::Toggle(_) => "`toggle`",
        Command::Delete(_) => "`delete`",
        Command::Export => "`export`",
        Command::Title(_) => "`title`",
        Command::Desc(_) => "`desc`",
        Command::Due(_) => "`due`",
        Command::Complete => "`complete`",
        Command::Show => "`show`",
        Command::Save => "`save`",
        Command::Back => "`back`",
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, expand_command_abbrev, known_command_names};

    #[test]
    fn unique_prefixes_expand() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("del", &known), Some("delete"));
        assert_eq!(expand_command_abbrev("t", &known), None);
        assert_eq!(expand_command_abbrev("ti", &known), Some("title"));
    }

    #[test]
    fn parses_arguments_verbatim() {
        assert_eq!(
            Command::parse("title   Buy milk ").expect("parse"),
            Some(Command::Title("Buy milk".to_string()))
        );
        assert_eq!(
            Command::parse("TOG 2").expect("parse"),
            Some(Command::Toggle("2".to_string()))
        );
        assert_eq!(Command::parse("  # note").expect("parse"), None);
    }

    #[test]
    fn reference_commands_need_an_argument() {
        assert!(Command::parse("edit").is_err());
        assert!(Command::parse("due").is_err());
        assert!(Command::parse("frobnicate").is_err());
    }
}
