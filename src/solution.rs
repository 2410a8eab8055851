//! Solution-file discovery.
//!
//! The analysis server needs a `.sln` solution file to know the root of the
//! codebase. We find one by searching upwards in the file tree from the
//! edited file, and disambiguate multiple matches by folder name: for
//! `bla/Project.sln` and an edit in `bla/Project/Folder/File.cs`, pick
//! `Project.sln`.

use std::path::{Path, PathBuf};

/// Find solution files by searching upwards in the file tree.
///
/// Returns the `.sln` file names found in the first ancestor directory that
/// contains any, together with that directory. Both are empty/unchanged if
/// the walk reaches the filesystem root without a match.
pub fn find_solution_files(filepath: &Path) -> (Vec<String>, PathBuf) {
    let mut folder = filepath.parent().unwrap_or(Path::new("")).to_path_buf();
    let mut solution_files = solution_files_in(&folder);

    while solution_files.is_empty() {
        let last_folder = folder.clone();
        folder = match folder.parent() {
            Some(parent) => parent.to_path_buf(),
            None => break,
        };
        if folder == last_folder {
            break;
        }
        solution_files = solution_files_in(&folder);
    }

    (solution_files, folder)
}

/// Locate the single solution file to hand to the analysis server.
///
/// Walks up from `filepath`, then applies the folder-name heuristic when a
/// directory contains more than one solution file. Returns the full path to
/// the chosen file.
pub fn locate_solution_file(filepath: &Path) -> Result<PathBuf, String> {
    let (solution_files, folder) = find_solution_files(filepath);

    let solution_file = match solution_files.len() {
        0 => {
            return Err(format!(
                "no solution file found for {}",
                filepath.display()
            ))
        }
        1 => solution_files.into_iter().next().unwrap_or_default(),
        _ => pick_by_folder_name(filepath, &folder, solution_files)?,
    };

    Ok(folder.join(solution_file))
}

/// Disambiguate multiple solution files in one folder.
///
/// If the edited file lives in `folder/<Name>/...` and exactly one solution
/// file has the stem `<Name>`, that one wins.
fn pick_by_folder_name(
    filepath: &Path,
    folder: &Path,
    solution_files: Vec<String>,
) -> Result<String, String> {
    let filepath_components = path_components(filepath);
    let folder_components = path_components(folder);

    let mut foldername = String::new();
    if filepath_components.len() > folder_components.len() {
        foldername = filepath_components[folder_components.len()].clone();
    }

    let mut candidates: Vec<String> = solution_files
        .iter()
        .filter(|name| file_stem(name) == foldername)
        .cloned()
        .collect();

    if candidates.len() == 1 {
        Ok(candidates.remove(0))
    } else {
        Err(format!(
            "found multiple solution files instead of one: {:?}",
            solution_files
        ))
    }
}

/// List `.sln` file names in a single directory, sorted for determinism.
fn solution_files_in(folder: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext == "sln")
                .unwrap_or(false)
        })
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

/// Split a path into its components as plain strings.
fn path_components(path: &Path) -> Vec<String> {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

/// File name without its extension.
fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_finds_solution_in_same_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("App.sln"));
        touch(&root.join("Program.cs"));

        let (files, folder) = find_solution_files(&root.join("Program.cs"));
        assert_eq!(files, vec!["App.sln".to_string()]);
        assert_eq!(folder, root);
    }

    #[test]
    fn test_walks_up_to_ancestor_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("App.sln"));
        touch(&root.join("src/deep/nested/File.cs"));

        let (files, folder) = find_solution_files(&root.join("src/deep/nested/File.cs"));
        assert_eq!(files, vec!["App.sln".to_string()]);
        assert_eq!(folder, root);
    }

    #[test]
    fn test_stops_at_first_directory_with_matches() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("Outer.sln"));
        touch(&root.join("inner/Inner.sln"));
        touch(&root.join("inner/File.cs"));

        let (files, folder) = find_solution_files(&root.join("inner/File.cs"));
        assert_eq!(files, vec!["Inner.sln".to_string()]);
        assert_eq!(folder, root.join("inner"));
    }

    #[test]
    fn test_no_solution_found_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("lonely/File.cs"));

        let result = locate_solution_file(&dir.path().join("lonely/File.cs"));
        let err = result.unwrap_err();
        assert!(err.contains("no solution file found"), "got: {}", err);
    }

    #[test]
    fn test_single_solution_is_returned_with_full_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("App.sln"));
        touch(&root.join("App/Program.cs"));

        let path = locate_solution_file(&root.join("App/Program.cs")).unwrap();
        assert_eq!(path, root.join("App.sln"));
    }

    #[test]
    fn test_multiple_solutions_resolved_by_folder_name() {
        // bla/Project.sln and bla/Other.sln with an edit under bla/Project/
        // picks Project.sln.
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("Project.sln"));
        touch(&root.join("Other.sln"));
        touch(&root.join("Project/Folder/File.cs"));

        let path = locate_solution_file(&root.join("Project/Folder/File.cs")).unwrap();
        assert_eq!(path, root.join("Project.sln"));
    }

    #[test]
    fn test_multiple_solutions_without_folder_match_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("One.sln"));
        touch(&root.join("Two.sln"));
        touch(&root.join("src/File.cs"));

        let err = locate_solution_file(&root.join("src/File.cs")).unwrap_err();
        assert!(
            err.contains("multiple solution files"),
            "got: {}",
            err
        );
        assert!(err.contains("One.sln"));
        assert!(err.contains("Two.sln"));
    }

    #[test]
    fn test_multiple_solutions_with_ambiguous_folder_match_is_an_error() {
        // Two solution files, neither stem matches the folder under the
        // solution directory.
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("Alpha.sln"));
        touch(&root.join("Beta.sln"));
        touch(&root.join("Gamma/File.cs"));

        let err = locate_solution_file(&root.join("Gamma/File.cs")).unwrap_err();
        assert!(err.contains("multiple solution files"), "got: {}", err);
    }

    #[test]
    fn test_nonexistent_directory_yields_no_matches() {
        let (files, _) = find_solution_files(Path::new("/nonexistent/path/File.cs"));
        assert!(files.is_empty());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Project.sln"), "Project");
        assert_eq!(file_stem("Project"), "Project");
        assert_eq!(file_stem(""), "");
    }
}
