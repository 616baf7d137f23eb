//! Input sources and how a load target expands into them.
//!
//! A target is standard input, a single file, a directory (every regular file
//! directly inside it) or a glob pattern. Each file becomes one [`SourceUnit`],
//! opened lazily by the worker that processes it so that open failures stay
//! local to that worker.

use crate::error::{LoadError, Result};
use crate::io::compression::{SourceRead, auto_detect_reader};
use anyhow::Context;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Name used for standard input.
pub const STDIN_NAME: &str = "stdin";

enum Origin {
    Stdin,
    File(PathBuf),
    Reader(SourceRead),
}

/// One input stream, processed start to finish by one worker.
pub struct SourceUnit {
    name: String,
    origin: Origin,
}

impl SourceUnit {
    pub fn stdin() -> Self {
        Self {
            name: STDIN_NAME.to_string(),
            origin: Origin::Stdin,
        }
    }

    /// A file source, named after its final path component.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            origin: Origin::File(path),
        }
    }

    /// An already open stream.
    pub fn from_reader(name: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self {
            name: name.into(),
            origin: Origin::Reader(Box::new(reader)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            Origin::File(p) => Some(p),
            _ => None,
        }
    }

    /// Open the stream for line reading, decompressing when needed.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its codec fails.
    pub fn open(self) -> anyhow::Result<Box<dyn BufRead + Send>> {
        let reader = match self.origin {
            Origin::Stdin => auto_detect_reader(io::stdin(), STDIN_NAME)?,
            Origin::File(path) => {
                let f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
                auto_detect_reader(f, &path)
                    .with_context(|| format!("setup decompression for {}", path.display()))?
            }
            Origin::Reader(r) => auto_detect_reader(r, &self.name)?,
        };
        Ok(Box::new(BufReader::new(reader)))
    }
}

/// What to load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputTarget {
    Stdin,
    /// A file or a directory.
    Path(PathBuf),
    Glob(String),
}

impl InputTarget {
    /// `stdin` (any case) selects standard input; a pattern with glob
    /// metacharacters that is not an existing path is a glob.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case(STDIN_NAME) {
            return InputTarget::Stdin;
        }
        let path = PathBuf::from(s);
        if !path.exists() && s.contains(['*', '?', '[']) {
            return InputTarget::Glob(s.to_string());
        }
        InputTarget::Path(path)
    }

    /// Expand the target into sources.
    ///
    /// # Errors
    /// [`LoadError::InvalidInput`] for a path that is neither file nor directory,
    /// [`LoadError::EmptyDirectory`] / [`LoadError::EmptyGlob`] when nothing matches.
    pub fn resolve(&self) -> Result<Resolved> {
        match self {
            InputTarget::Stdin => Ok(Resolved::Single(SourceUnit::stdin())),
            InputTarget::Path(p) if p.is_file() => Ok(Resolved::Single(SourceUnit::file(p))),
            InputTarget::Path(p) if p.is_dir() => {
                let files = list_files(p)?;
                if files.is_empty() {
                    return Err(LoadError::EmptyDirectory(p.clone()));
                }
                Ok(Resolved::many(files.into_iter().map(SourceUnit::file).collect()))
            }
            InputTarget::Path(p) => Err(LoadError::InvalidInput(p.clone())),
            InputTarget::Glob(pattern) => {
                let files = expand_glob(pattern)?;
                if files.is_empty() {
                    return Err(LoadError::EmptyGlob(pattern.clone()));
                }
                Ok(Resolved::many(files.into_iter().map(SourceUnit::file).collect()))
            }
        }
    }
}

/// A target expanded into sources.
pub enum Resolved {
    /// Stdin or one file: one worker on the calling thread.
    Single(SourceUnit),
    /// Directory or glob: one worker per file on a pool.
    Many(Vec<SourceUnit>),
}

impl Resolved {
    /// Several sources, renamed where needed so that every name is distinct.
    pub fn many(mut units: Vec<SourceUnit>) -> Self {
        disambiguate(&mut units);
        Resolved::Many(units)
    }

    pub fn len(&self) -> usize {
        match self {
            Resolved::Single(_) => 1,
            Resolved::Many(units) => units.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Regular files directly inside `dir`, in directory order (unspecified).
///
/// # Errors
/// Returns the IO error from listing the directory.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            out.push(path);
        }
    }
    Ok(out)
}

/// Files matching a glob pattern, sorted.
///
/// # Errors
/// Returns [`LoadError::Glob`] for a bad pattern, or an IO error while walking.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|e| LoadError::Glob {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    let mut out = Vec::new();
    for entry in paths {
        let path = entry.map_err(glob::GlobError::into_error)?;
        if path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Give every unit a distinct name, since names key bad-row files and summary entries.
///
/// File units sharing a name are renamed after their path below the deepest
/// directory they have in common (`east/part.csv` becomes `east_part.csv`).
/// Whatever still collides gets a `~N` suffix.
pub fn disambiguate(units: &mut [SourceUnit]) {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, unit) in units.iter().enumerate() {
        groups.entry(unit.name.clone()).or_default().push(i);
    }

    for members in groups.into_values().filter(|m| m.len() > 1) {
        let paths: Vec<&Path> = members.iter().filter_map(|&i| units[i].path()).collect();
        if paths.len() != members.len() {
            continue;
        }
        let base = common_parent(&paths);
        let renamed: Vec<String> = paths
            .iter()
            .map(|&p| flatten(p.strip_prefix(&base).unwrap_or(p)))
            .collect();
        for (i, name) in members.into_iter().zip(renamed) {
            units[i].name = name;
        }
    }

    let mut taken = HashSet::new();
    for unit in units.iter_mut() {
        if taken.insert(unit.name.clone()) {
            continue;
        }
        let mut n = 2;
        while !taken.insert(format!("{}~{n}", unit.name)) {
            n += 1;
        }
        unit.name = format!("{}~{n}", unit.name);
    }
}

fn common_parent(paths: &[&Path]) -> PathBuf {
    let mut base = paths
        .first()
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .unwrap_or_default();
    for path in paths {
        while !path.starts_with(&base) {
            match base.parent() {
                Some(parent) => base = parent.to_path_buf(),
                None => return PathBuf::new(),
            }
        }
    }
    base
}

fn flatten(relative: &Path) -> String {
    relative
        .iter()
        .map(|c| c.to_string_lossy())
        .collect::<Vec<_>>()
        .join("_")
}
