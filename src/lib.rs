pub mod settings;
pub mod shell;
pub mod workspace;

pub use settings::AppSettings;
pub use shell::Shell;
pub use workspace::{Workspace, WorkspaceOptions};
