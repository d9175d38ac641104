use std::io::{self, IsTerminal, Write};

use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::format_due;
use crate::form::{CreateDraft, EditDraft};
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    tz: Tz,
    date_format: String,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color").unwrap_or(true) && io::stdout().is_terminal();

        Ok(Self {
            color,
            tz: cfg.timezone()?,
            date_format: cfg.date_format(),
        })
    }

    pub fn due(&self, millis: i64) -> String {
        format_due(millis, &self.tz, &self.date_format)
    }

    #[tracing::instrument(skip(self, out, tasks))]
    pub fn print_task_table<W: Write>(
        &self,
        out: &mut W,
        tasks: &[Task],
        now_ms: i64,
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "No tasks yet. Use `new` to create one.")?;
            return Ok(());
        }

        let headers = vec![
            "#".to_string(),
            "Done".to_string(),
            "Due".to_string(),
            "Title".to_string(),
            "Description".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for (idx, task) in tasks.iter().enumerate() {
            let row = self.paint(&(idx + 1).to_string(), "33");
            let done = if task.is_completed { "[x]" } else { "[ ]" }.to_string();
            let due = self.due(task.due_date);
            let due = if task.is_overdue(now_ms) {
                self.paint(&due, "31")
            } else {
                due
            };
            let title = if task.is_completed {
                self.paint(&task.title, "2")
            } else {
                task.title.clone()
            };

            rows.push(vec![row, done, due, title, task.description.clone()]);
        }

        write_table(out, headers, rows)?;
        Ok(())
    }

    pub fn print_task_info<W: Write>(&self, out: &mut W, task: &Task) -> anyhow::Result<()> {
        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        writeln!(out, "description {}", task.description)?;
        writeln!(out, "due         {}", self.due(task.due_date))?;
        writeln!(out, "completed   {}", task.is_completed)?;
        Ok(())
    }

    pub fn print_create_draft<W: Write>(
        &self,
        out: &mut W,
        draft: &CreateDraft,
    ) -> anyhow::Result<()> {
        writeln!(out, "title       {}", draft.title)?;
        writeln!(out, "description {}", draft.description)?;
        writeln!(out, "due         {}", self.draft_due(draft.due_date))?;
        writeln!(out, "can save    {}", yes_no(draft.can_save))?;
        Ok(())
    }

    pub fn print_edit_draft<W: Write>(&self, out: &mut W, draft: &EditDraft) -> anyhow::Result<()> {
        let Some(loaded) = draft.loaded.as_ref() else {
            writeln!(out, "loading...")?;
            writeln!(out, "can save    {}", yes_no(draft.can_save))?;
            return Ok(());
        };
        writeln!(out, "id          {}", loaded.id)?;
        writeln!(out, "title       {}", draft.title)?;
        writeln!(out, "description {}", draft.description)?;
        writeln!(out, "due         {}", self.draft_due(draft.due_date))?;
        writeln!(out, "completed   {}", yes_no(draft.is_completed))?;
        writeln!(out, "can save    {}", yes_no(draft.can_save))?;
        Ok(())
    }

    fn draft_due(&self, due: Option<i64>) -> String {
        due.map(|ms| self.due(ms))
            .unwrap_or_else(|| "(not set, defaults to now)".to_string())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn write_table<W: Write>(
    writer: &mut W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(header, &width)| format!("{header:width$}"))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", header_line.trim_end())?;

    let rule = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{rule}")?;

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let visible = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                format!("{cell}{}", " ".repeat(width.saturating_sub(visible)))
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::Renderer;
    use crate::config::Config;
    use crate::task::Task;

    fn renderer(color: &str) -> anyhow::Result<Renderer> {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("color".to_string(), color.to_string())]);
        Renderer::new(&cfg)
    }

    #[test]
    fn color_setting_accepts_every_config_boolean_spelling() {
        for value in ["y", "yes", "on", "1", "true", "n", "off", "0"] {
            assert!(renderer(value).is_ok(), "color = {value}");
        }
    }

    #[test]
    fn color_off_prints_plain_cells() {
        let renderer = renderer("off").expect("renderer");
        let task = Task::new("late".to_string(), String::new(), 0);
        let mut out = Vec::new();
        renderer
            .print_task_table(&mut out, &[task], 1)
            .expect("render table");
        let text = String::from_utf8(out).expect("utf8 output");
        assert!(!text.contains('\x1b'));
        assert!(text.contains("late"));
    }
}
