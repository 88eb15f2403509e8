use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::env::TargetEnv;
use crate::error::Error;
use crate::model::{EnvironmentMap, KeyMode, LoadReport};
use crate::parser::parse_str_with_source;

const DEFAULT_FILE: &str = ".env";

/// Parse `.env` in the current working directory without touching the
/// process environment.
pub fn load_dotenv() -> Result<EnvironmentMap, Error> {
    EnvLoader::new().parse_only()
}

/// Load `.env` from the current working directory into the process
/// environment.
///
/// # Safety
///
/// Mutates the process environment; see [`TargetEnv::process`].
pub unsafe fn dotenv() -> Result<LoadReport, Error> {
    unsafe { from_path(DEFAULT_FILE) }
}

/// Load a `.env` file from a specific path into the process environment.
///
/// # Safety
///
/// Mutates the process environment; see [`TargetEnv::process`].
pub unsafe fn from_path(path: impl AsRef<Path>) -> Result<LoadReport, Error> {
    let target = unsafe { TargetEnv::process() };
    let mut loader = EnvLoader::new().path(path).target(target);
    loader.load()
}

/// Builder-style `.env` loader.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    paths: Vec<PathBuf>,
    required: bool,
    search_upward: bool,
    override_existing: bool,
    key_mode: KeyMode,
    target: TargetEnv,
}

impl EnvLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.paths
            .extend(paths.into_iter().map(|path| path.as_ref().to_path_buf()));
        self
    }

    /// Fail on missing files (default) or skip them.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Look for relative paths in parent directories of the working
    /// directory when they are not found in it.
    pub fn search_upward(mut self, search_upward: bool) -> Self {
        self.search_upward = search_upward;
        self
    }

    pub fn override_existing(mut self, override_existing: bool) -> Self {
        self.override_existing = override_existing;
        self
    }

    pub fn key_mode(mut self, key_mode: KeyMode) -> Self {
        self.key_mode = key_mode;
        self
    }

    pub fn target(mut self, target: TargetEnv) -> Self {
        self.target = target;
        self
    }

    pub fn target_env(&self) -> &TargetEnv {
        &self.target
    }

    pub fn into_target(self) -> TargetEnv {
        self.target
    }

    /// Read and parse every configured file; later files win.
    pub fn parse_only(&self) -> Result<EnvironmentMap, Error> {
        self.collect_entries().map(|(map, _)| map)
    }

    /// Parse every configured file and apply the result to the target.
    ///
    /// Nothing is written when a process target would receive a key or value
    /// containing NUL.
    pub fn load(&mut self) -> Result<LoadReport, Error> {
        let (map, files_read) = self.collect_entries()?;
        if self.target.is_process()
            && let Some((key, _)) = map
                .iter()
                .find(|(key, value)| key.contains('\0') || value.contains('\0'))
        {
            return Err(Error::NulByte {
                key: key.to_owned(),
            });
        }

        let mut report = LoadReport {
            files_read,
            ..LoadReport::default()
        };

        for (key, value) in map.iter() {
            if !self.override_existing && self.target.contains_key(key) {
                report.skipped_existing += 1;
                debug!(key, "skipping existing key");
                continue;
            }

            self.target.set_var(key, value);
            report.loaded += 1;
        }

        debug!(
            loaded = report.loaded,
            skipped_existing = report.skipped_existing,
            files_read = report.files_read,
            "applied dotenv entries"
        );
        Ok(report)
    }

    fn collect_entries(&self) -> Result<(EnvironmentMap, usize), Error> {
        let mut merged = EnvironmentMap::new();
        let mut files_read = 0usize;

        for path in self.effective_paths() {
            let path = self.resolve_path(path)?;
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == ErrorKind::NotFound && !self.required => {
                    debug!(path = %path.display(), "optional dotenv file not found");
                    continue;
                }
                Err(err) => return Err(Error::io(path, err)),
            };
            files_read += 1;
            debug!(path = %path.display(), bytes = bytes.len(), "read dotenv file");

            let content = std::str::from_utf8(&bytes)?;
            let parsed = parse_str_with_source(content, Some(&path), self.key_mode)
                .map_err(|err| err.with_path(Some(path.clone())))?;
            merged.extend_from(parsed);
        }

        Ok((merged, files_read))
    }

    fn effective_paths(&self) -> Vec<PathBuf> {
        if self.paths.is_empty() {
            vec![PathBuf::from(DEFAULT_FILE)]
        } else {
            self.paths.clone()
        }
    }

    fn resolve_path(&self, path: PathBuf) -> Result<PathBuf, Error> {
        if !self.search_upward || path.is_absolute() {
            return Ok(path);
        }

        let cwd = std::env::current_dir().map_err(|err| Error::io(&path, err))?;
        let found = cwd
            .ancestors()
            .map(|dir| dir.join(&path))
            .find(|candidate| candidate.is_file());
        Ok(found.unwrap_or(path))
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            required: true,
            search_upward: false,
            override_existing: false,
            key_mode: KeyMode::Verbatim,
            target: TargetEnv::memory(),
        }
    }
}
