pub mod changes;
mod project;

pub use changes::Changes;
use project::GetChangesForNewProject;

pub fn get_changes_for_new_project(
    project_path: String,
    project_name: String,
) -> Result<Vec<Changes>, String> {
    let mut command = GetChangesForNewProject::new(project_path, project_name);
    command.run()
}
