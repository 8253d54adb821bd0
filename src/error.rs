/// Configuration errors raised before any subprocess is spawned.
///
/// Subprocess failures are never represented here: they travel as integer
/// exit statuses through the job runner and the task runners.
#[derive(Debug)]
pub enum BuildError {
    /// `render_command` was called on a task with no compiler set
    MissingCompiler { task: String },
    /// `render_command` was called on a task with no file set assigned
    MissingFiles { task: String },
    /// A named lookup was attempted with an empty name
    EmptyTaskName,
    /// A named lookup found no registered task
    UnknownTask(String),
    /// The selector has nothing to run
    NoTasks,
    /// IO error (output directory creation)
    Io(std::io::Error),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::MissingCompiler { task } => {
                write!(f, "task '{}': a compiler is required to compile", task)
            }
            BuildError::MissingFiles { task } => {
                write!(f, "task '{}': no files were provided to compile", task)
            }
            BuildError::EmptyTaskName => write!(f, "task name cannot be empty"),
            BuildError::UnknownTask(name) => write!(f, "no task named '{}' registered", name),
            BuildError::NoTasks => write!(f, "no tasks registered"),
            BuildError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BuildError {
    fn from(e: std::io::Error) -> Self {
        BuildError::Io(e)
    }
}
