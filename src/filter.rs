// Completion filter for the visible task list

use crate::models::Task;

/// Which tasks the view shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Filter {
    #[default]
    All,
    Completed,
    Incomplete,
}

impl Filter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Completed => task.completed,
            Filter::Incomplete => !task.completed,
        }
    }

    /// Project `tasks` through this filter, keeping collection order
    pub fn apply(self, tasks: &[Task]) -> Vec<&Task> {
        tasks.iter().filter(|t| self.matches(t)).collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Completed => "completed",
            Filter::Incomplete => "incomplete",
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks() -> Vec<Task> {
        let mut done = Task::new(1, "done");
        done.completed = true;
        vec![done, Task::new(2, "open"), Task::new(3, "also open")]
    }

    #[test]
    fn test_filter_all() {
        let tasks = tasks();
        let view = Filter::All.apply(&tasks);
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn test_filter_completed_and_incomplete() {
        let tasks = tasks();

        let done: Vec<&str> = Filter::Completed.apply(&tasks).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(done, vec!["done"]);

        let open: Vec<&str> = Filter::Incomplete.apply(&tasks).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(open, vec!["open", "also open"]);
    }

    #[test]
    fn test_filter_default_is_all() {
        assert_eq!(Filter::default(), Filter::All);
    }

    #[test]
    fn test_filter_display() {
        assert_eq!(Filter::Completed.to_string(), "completed");
        assert_eq!(Filter::Incomplete.to_string(), "incomplete");
    }
}
