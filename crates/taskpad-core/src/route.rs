use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::debug;

const HOME: &str = "home";
const CREATE_TASK: &str = "create_task";
const EDIT_TASK_PREFIX: &str = "edit_task/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    CreateTask,
    EditTask { task_id: String },
}

impl Route {
    pub fn edit(task_id: impl Into<String>) -> Self {
        Self::EditTask {
            task_id: task_id.into(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => f.write_str(HOME),
            Self::CreateTask => f.write_str(CREATE_TASK),
            Self::EditTask { task_id } => write!(f, "{EDIT_TASK_PREFIX}{task_id}"),
        }
    }
}

impl FromStr for Route {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.trim().trim_matches('/');
        match path {
            HOME => Ok(Self::Home),
            CREATE_TASK => Ok(Self::CreateTask),
            _ => {
                let task_id = path
                    .strip_prefix(EDIT_TASK_PREFIX)
                    .ok_or_else(|| anyhow!("unknown route: {s}"))?;
                if task_id.is_empty() || task_id.contains('/') {
                    return Err(anyhow!("invalid task id in route: {s}"));
                }
                Ok(Self::edit(task_id))
            }
        }
    }
}

/// Back stack of visited routes. The start route is never popped.
#[derive(Debug, Clone)]
pub struct Navigator {
    start: Route,
    stack: Vec<Route>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}

impl Navigator {
    pub fn new(start: Route) -> Self {
        Self {
            start,
            stack: Vec::new(),
        }
    }

    pub fn current(&self) -> &Route {
        self.stack.last().unwrap_or(&self.start)
    }

    pub fn navigate(&mut self, route: Route) {
        debug!(from = %self.current(), to = %route, "navigate");
        self.stack.push(route);
    }

    pub fn pop_back(&mut self) -> bool {
        let Some(left) = self.stack.pop() else {
            return false;
        };
        debug!(left = %left, to = %self.current(), "pop back");
        true
    }
}
