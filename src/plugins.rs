//! Command plugins.
//!
//! Plugins are extra top-level commands. Each one is registered by name in a
//! [`PluginRegistry`] and runs against the caller's [`Session`], so it sees
//! the same store, history and calendar as the built-in commands.

use std::collections::BTreeMap;

use chrono::{Days, Local, NaiveDate};

use crate::error::{Error, Result, ValidationError};
use crate::tasks::{Priority, Session, StatusFilter, TaskFilter};

/// Default look-ahead for the `upcoming` plugin.
const UPCOMING_DAYS: u64 = 7;

/// What a plugin wants shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginOutcome {
    /// Lines for stdout.
    pub stdout: Vec<String>,
    /// Lines for stderr.
    pub stderr: Vec<String>,
}

impl PluginOutcome {
    /// An outcome with the given stdout lines.
    #[must_use]
    pub fn lines(stdout: Vec<String>) -> Self {
        Self { stdout, stderr: Vec::new() }
    }
}

/// An extra command that can be dispatched by name.
pub trait CommandPlugin {
    /// Command name as typed on the command line.
    fn name(&self) -> &str;

    /// One-line description for help output.
    fn about(&self) -> &str;

    /// Run the command with its arguments (the command name excluded).
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid or a task operation fails.
    fn execute(&self, session: &mut Session, args: &[String]) -> Result<PluginOutcome>;
}

/// Plugins by name.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Box<dyn CommandPlugin>>,
}

impl PluginRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in plugins.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(FocusPlugin));
        registry.register(Box::new(UpcomingPlugin));
        registry
    }

    /// Add a plugin, replacing any plugin with the same name.
    pub fn register(&mut self, plugin: Box<dyn CommandPlugin>) {
        let name = plugin.name().to_string();
        if self.plugins.insert(name.clone(), plugin).is_some() {
            tracing::warn!(plugin = %name, "replaced existing plugin");
        }
    }

    /// Look up a plugin by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn CommandPlugin> {
        self.plugins.get(name).map(AsRef::as_ref)
    }

    /// Registered names with their descriptions, sorted by name.
    #[must_use]
    pub fn names(&self) -> Vec<(&str, &str)> {
        self.plugins.values().map(|p| (p.name(), p.about())).collect()
    }

    /// Run the plugin called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCommand`] if no plugin has that name, or the
    /// plugin's own error.
    pub fn dispatch(
        &self,
        name: &str,
        session: &mut Session,
        args: &[String],
    ) -> Result<PluginOutcome> {
        let plugin = self.get(name).ok_or_else(|| Error::UnknownCommand(name.to_string()))?;
        tracing::debug!(plugin = name, ?args, "dispatching plugin");
        plugin.execute(session, args)
    }
}

/// Lists pending High priority tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct FocusPlugin;

impl CommandPlugin for FocusPlugin {
    fn name(&self) -> &str {
        "focus"
    }

    fn about(&self) -> &str {
        "Show pending High priority tasks only"
    }

    fn execute(&self, session: &mut Session, args: &[String]) -> Result<PluginOutcome> {
        if let Some(extra) = args.first() {
            return Err(ValidationError::InvalidArgument(format!(
                "focus takes no arguments (got '{extra}')"
            ))
            .into());
        }

        let filter = TaskFilter {
            status: StatusFilter::Pending,
            priority: Some(Priority::High),
            ..TaskFilter::default()
        };
        let views = session.list(&filter)?;

        let mut lines = vec!["Focus: High priority tasks".to_string()];
        if views.is_empty() {
            lines.push("No high-priority tasks pending.".to_string());
        }
        for view in views {
            let mut line = format!("  {}. {}", view.index + 1, view.task.description);
            if !view.task.tags.is_empty() {
                let tags: Vec<&str> = view.task.tags.iter().map(String::as_str).collect();
                line.push_str(&format!(" [{}]", tags.join(", ")));
            }
            lines.push(line);
        }
        Ok(PluginOutcome::lines(lines))
    }
}

/// Lists calendar events over the next few days.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpcomingPlugin;

impl UpcomingPlugin {
    fn days(args: &[String]) -> Result<u64> {
        match args {
            [] => Ok(UPCOMING_DAYS),
            [days] => days.parse().map_err(|_| {
                ValidationError::InvalidArgument(format!("invalid number of days '{days}'")).into()
            }),
            _ => Err(ValidationError::InvalidArgument(
                "usage: upcoming [days]".to_string(),
            )
            .into()),
        }
    }

    fn render(session: &Session, from: NaiveDate, days: u64) -> Result<PluginOutcome> {
        let to = from.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
        let events = session.upcoming_events(from, to)?;
        if events.is_empty() {
            return Ok(PluginOutcome::lines(vec![format!("No events in the next {days} day(s).")]));
        }
        Ok(PluginOutcome::lines(
            events.into_iter().map(|e| format!("{}  {}", e.date, e.summary)).collect(),
        ))
    }
}

impl CommandPlugin for UpcomingPlugin {
    fn name(&self) -> &str {
        "upcoming"
    }

    fn about(&self) -> &str {
        "Show calendar events for the next days (default 7)"
    }

    fn execute(&self, session: &mut Session, args: &[String]) -> Result<PluginOutcome> {
        let days = Self::days(args)?;
        Self::render(session, Local::now().date_naive(), days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::CalendarSync;
    use crate::tasks::{normalize_tags, NewTask, TaskStore};
    use crate::testing::MockCalendar;
    use tempfile::TempDir;

    fn create_test_session() -> (TempDir, Session) {
        let dir = TempDir::new().unwrap();
        let session = Session::new(TaskStore::new(dir.path().join("tasks.json")));
        (dir, session)
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    struct Echo;

    impl CommandPlugin for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn about(&self) -> &str {
            "Echo arguments"
        }

        fn execute(&self, _session: &mut Session, args: &[String]) -> Result<PluginOutcome> {
            Ok(PluginOutcome::lines(args.to_vec()))
        }
    }

    #[test]
    fn test_registry_dispatch() {
        let (_dir, mut session) = create_test_session();
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(Echo));

        let outcome = registry.dispatch("echo", &mut session, &args(&["a", "b"])).unwrap();
        assert_eq!(outcome.stdout, vec!["a", "b"]);
        assert_eq!(registry.names(), vec![("echo", "Echo arguments")]);
    }

    #[test]
    fn test_unknown_plugin() {
        let (_dir, mut session) = create_test_session();
        let registry = PluginRegistry::with_builtins();
        let err = registry.dispatch("share", &mut session, &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownCommand(name) if name == "share"));
    }

    #[test]
    fn test_builtins_registered() {
        let registry = PluginRegistry::with_builtins();
        assert!(registry.get("focus").is_some());
        assert!(registry.get("upcoming").is_some());
    }

    #[test]
    fn test_focus_lists_pending_high_priority() {
        let (_dir, mut session) = create_test_session();
        session.add(NewTask::new("Low thing").priority(Priority::Low)).unwrap();
        session
            .add(NewTask::new("Urgent").priority(Priority::High).tags(normalize_tags(["work"])))
            .unwrap();
        session.add(NewTask::new("Done urgent").priority(Priority::High)).unwrap();
        session.complete(2).unwrap();

        let outcome = FocusPlugin.execute(&mut session, &[]).unwrap();
        assert_eq!(outcome.stdout, vec!["Focus: High priority tasks", "  2. Urgent [work]"]);
    }

    #[test]
    fn test_focus_with_nothing_pending() {
        let (_dir, mut session) = create_test_session();
        let outcome = FocusPlugin.execute(&mut session, &[]).unwrap();
        assert_eq!(outcome.stdout[1], "No high-priority tasks pending.");
        assert!(FocusPlugin.execute(&mut session, &args(&["x"])).unwrap_err().is_validation());
    }

    #[test]
    fn test_upcoming_renders_calendar_events() {
        let (_dir, session) = create_test_session();
        let calendar = MockCalendar::new();
        let session = session.with_calendar(Box::new(calendar.clone()));
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        calendar.create_event("Dentist", NaiveDate::from_ymd_opt(2026, 6, 3).unwrap()).unwrap();
        calendar.create_event("Far away", NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()).unwrap();

        let outcome = UpcomingPlugin::render(&session, today, 7).unwrap();
        assert_eq!(outcome.stdout, vec!["2026-06-03  Dentist"]);
    }

    #[test]
    fn test_upcoming_arguments() {
        assert_eq!(UpcomingPlugin::days(&[]).unwrap(), UPCOMING_DAYS);
        assert_eq!(UpcomingPlugin::days(&args(&["30"])).unwrap(), 30);
        assert!(UpcomingPlugin::days(&args(&["soon"])).unwrap_err().is_validation());

        let (_dir, mut session) = create_test_session();
        let outcome = UpcomingPlugin.execute(&mut session, &[]).unwrap();
        assert_eq!(outcome.stdout, vec!["No events in the next 7 day(s)."]);
    }
}
