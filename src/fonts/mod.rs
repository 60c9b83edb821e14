//! Font discovery for the report exporter.
//!
//! `genpdf` embeds TrueType fonts, so a usable family has to be found on disk.  Directories are
//! searched in order: the directory passed in [`crate::config::ExportOptions`], the
//! `REPORT_LAB_FONTS_DIR` environment variable, `assets/fonts` next to the executable and in the
//! crate, each expecting the Roboto family.  When none of them holds the family, common system
//! families are tried (Arial on Windows, Liberation Sans and DejaVu Sans on Linux).

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{FontData, FontFamily};
use log::{debug, warn};

/// Name of the bundled font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Roboto";

const FONTS_DIR_VAR: &str = "REPORT_LAB_FONTS_DIR";
const WINDOWS_FONTS_DIR_VAR: &str = "REPORT_LAB_WINDOWS_FONTS_DIR";

struct FamilyFiles {
    name: &'static str,
    regular: &'static str,
    bold: &'static str,
    italic: &'static str,
    bold_italic: &'static str,
}

static BUNDLED_FAMILY: FamilyFiles = FamilyFiles {
    name: DEFAULT_FONT_FAMILY_NAME,
    regular: "Roboto-Regular.ttf",
    bold: "Roboto-Bold.ttf",
    italic: "Roboto-Italic.ttf",
    bold_italic: "Roboto-BoldItalic.ttf",
};

static ARIAL_FAMILY: FamilyFiles = FamilyFiles {
    name: "Arial",
    regular: "arial.ttf",
    bold: "arialbd.ttf",
    italic: "ariali.ttf",
    bold_italic: "arialbi.ttf",
};

static LIBERATION_FAMILY: FamilyFiles = FamilyFiles {
    name: "Liberation Sans",
    regular: "LiberationSans-Regular.ttf",
    bold: "LiberationSans-Bold.ttf",
    italic: "LiberationSans-Italic.ttf",
    bold_italic: "LiberationSans-BoldItalic.ttf",
};

static DEJAVU_FAMILY: FamilyFiles = FamilyFiles {
    name: "DejaVu Sans",
    regular: "DejaVuSans.ttf",
    bold: "DejaVuSans-Bold.ttf",
    italic: "DejaVuSans-Oblique.ttf",
    bold_italic: "DejaVuSans-BoldOblique.ttf",
};

const LIBERATION_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/liberation2",
    "/usr/share/fonts/liberation-sans",
    "/usr/share/fonts/TTF",
];

const DEJAVU_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/dejavu-sans-fonts",
    "/usr/share/fonts/dejavu",
    "/usr/share/fonts/TTF",
];

impl FamilyFiles {
    fn files(&self) -> [&'static str; 4] {
        [self.regular, self.bold, self.italic, self.bold_italic]
    }

    fn missing_in(&self, directory: &Path) -> Vec<&'static str> {
        self.files()
            .into_iter()
            .filter(|file| !directory.join(file).is_file())
            .collect()
    }

    fn load(&self, directory: &Path) -> Result<FontFamily<FontData>, Error> {
        Ok(FontFamily {
            regular: self.load_face(directory, self.regular)?,
            bold: self.load_face(directory, self.bold)?,
            italic: self.load_face(directory, self.italic)?,
            bold_italic: self.load_face(directory, self.bold_italic)?,
        })
    }

    fn load_face(&self, directory: &Path, file: &str) -> Result<FontData, Error> {
        let path = directory.join(file);
        FontData::load(&path, None).map_err(|err| {
            Error::new(
                format!(
                    "Failed to load '{}' font at {}: {}",
                    self.name,
                    path.display(),
                    err
                ),
                io::Error::new(io::ErrorKind::InvalidData, err.to_string()),
            )
        })
    }
}

struct Candidate {
    directory: PathBuf,
    family: &'static FamilyFiles,
}

impl Candidate {
    fn new(directory: impl Into<PathBuf>, family: &'static FamilyFiles) -> Self {
        Self {
            directory: directory.into(),
            family,
        }
    }

    fn is_fallback(&self) -> bool {
        self.family.name != BUNDLED_FAMILY.name
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

fn bundled_directories(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut directories: Vec<PathBuf> = Vec::new();
    let mut push = |candidate: PathBuf| {
        if !directories.contains(&candidate) {
            directories.push(candidate);
        }
    };

    if let Some(explicit) = explicit {
        push(explicit.to_path_buf());
    }
    if let Some(path) = env_path(FONTS_DIR_VAR) {
        push(path);
    }
    if let Some(bin_dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        push(bin_dir.join("assets/fonts"));
    }
    push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"));

    directories
}

fn windows_font_directory() -> Option<PathBuf> {
    if let Some(path) = env_path(WINDOWS_FONTS_DIR_VAR) {
        return Some(path);
    }

    ["WINDIR", "SystemRoot"]
        .into_iter()
        .filter_map(env_path)
        .map(|root| root.join("Fonts"))
        .find(|candidate| candidate.is_dir())
}

fn candidates(explicit: Option<&Path>) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = bundled_directories(explicit)
        .into_iter()
        .map(|directory| Candidate::new(directory, &BUNDLED_FAMILY))
        .collect();

    if let Some(directory) = windows_font_directory() {
        candidates.push(Candidate::new(directory, &ARIAL_FAMILY));
    }
    candidates.extend(
        LIBERATION_DIRS
            .iter()
            .map(|directory| Candidate::new(*directory, &LIBERATION_FAMILY)),
    );
    candidates.extend(
        DEJAVU_DIRS
            .iter()
            .map(|directory| Candidate::new(*directory, &DEJAVU_FAMILY)),
    );
    candidates
}

fn resolve(explicit: Option<&Path>) -> Result<Candidate, Error> {
    let mut attempts = Vec::new();

    for candidate in candidates(explicit) {
        if !candidate.directory.is_dir() {
            attempts.push(format!("{} (directory missing)", candidate.directory.display()));
            continue;
        }
        let missing = candidate.family.missing_in(&candidate.directory);
        if missing.is_empty() {
            return Ok(candidate);
        }
        attempts.push(format!(
            "{} (missing {} files [{}])",
            candidate.directory.display(),
            candidate.family.name,
            missing.join(", ")
        ));
    }

    Err(Error::new(
        format!(
            "Unable to locate a usable font family. Checked: {}. \
             Set {} to a directory holding the {} family.",
            attempts.join(", "),
            FONTS_DIR_VAR,
            DEFAULT_FONT_FAMILY_NAME
        ),
        io::Error::new(io::ErrorKind::NotFound, "no font family found"),
    ))
}

/// Loads the first usable font family, looking in `explicit` before the default locations.
pub fn font_family(explicit: Option<&Path>) -> Result<FontFamily<FontData>, Error> {
    let candidate = resolve(explicit)?;
    if candidate.is_fallback() {
        warn!(
            "Bundled '{}' fonts unavailable; falling back to '{}' from {}",
            DEFAULT_FONT_FAMILY_NAME,
            candidate.family.name,
            candidate.directory.display()
        );
    } else {
        debug!("Loading fonts from {}", candidate.directory.display());
    }
    candidate.family.load(&candidate.directory)
}

/// Returns whether `err` means no font files were found, as opposed to unreadable ones.
pub fn fonts_missing(err: &Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::IoError(io_err)
            if io_err.kind() == io::ErrorKind::NotFound
                || io_err.kind() == io::ErrorKind::PermissionDenied
    )
}

/// Indicates whether a complete font family can be found, looking in `explicit` first.
pub fn fonts_available(explicit: Option<&Path>) -> bool {
    resolve(explicit).is_ok()
}

/// Indicates whether a complete font family can be found in the default locations.
pub fn default_fonts_available() -> bool {
    fonts_available(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directory_is_searched_first() {
        let dir = tempfile::tempdir().expect("temp dir");
        let directories = bundled_directories(Some(dir.path()));
        assert_eq!(directories.first().map(PathBuf::as_path), Some(dir.path()));
    }

    #[test]
    fn incomplete_directory_reports_missing_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("Roboto-Regular.ttf"), b"").unwrap();
        assert_eq!(
            BUNDLED_FAMILY.missing_in(dir.path()),
            ["Roboto-Bold.ttf", "Roboto-Italic.ttf", "Roboto-BoldItalic.ttf"]
        );
    }

    #[test]
    fn corrupt_font_files_are_not_treated_as_missing() {
        let dir = tempfile::tempdir().expect("temp dir");
        for file in BUNDLED_FAMILY.files() {
            std::fs::write(dir.path().join(file), b"not a font").unwrap();
        }
        let err = match font_family(Some(dir.path())) {
            Ok(_) => panic!("garbage font files must not load"),
            Err(err) => err,
        };
        assert!(!fonts_missing(&err), "{err}");
    }
}
