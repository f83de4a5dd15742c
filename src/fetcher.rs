//! Downloads archive files into the temporary directory.
use log::{debug, warn};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::StreamConfig;
use crate::error::GillError;
use crate::http::HttpClient;
use crate::models::FileTask;
use crate::retry::{retry_with_backoff, Backoff, Sleeper};

/// A downloaded file. The file is deleted when the guard is dropped.
#[derive(Debug)]
pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> LocalFile {
        LocalFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LocalFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("removed {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("unable to remove {}: {}", self.path.display(), e),
        }
    }
}

pub struct FileFetcher<'a> {
    http: &'a dyn HttpClient,
    sleeper: &'a dyn Sleeper,
    tmp_dir: PathBuf,
    backoff: Backoff,
}

impl<'a> FileFetcher<'a> {
    pub fn new(
        http: &'a dyn HttpClient,
        sleeper: &'a dyn Sleeper,
        config: &StreamConfig,
    ) -> FileFetcher<'a> {
        FileFetcher {
            http,
            sleeper,
            tmp_dir: config.tmp_dir.clone(),
            backoff: config.fetch_backoff,
        }
    }

    /// `<tmp_dir>/<peer>_<token>.mrt.bz2`, where the token is the last URL segment without its
    /// `.mrt.bz2` suffix.
    ///
    /// The peer comes from the broker payload. A peer or token holding a path separator or `..`
    /// would place the file outside `tmp_dir` and is rejected with
    /// [GillError::UnsafeLocalPath].
    pub fn local_path(&self, task: &FileTask) -> Result<PathBuf, GillError> {
        let segment = task.url.rsplit('/').next().unwrap_or_default();
        let token = segment.strip_suffix(".mrt.bz2").unwrap_or(segment);

        let path = self
            .tmp_dir
            .join(format!("{}_{}.mrt.bz2", task.peer, token));
        if !is_plain_name(&task.peer)
            || !is_plain_name(token)
            || path.parent() != Some(self.tmp_dir.as_path())
        {
            return Err(GillError::UnsafeLocalPath {
                url: task.url.clone(),
                peer: task.peer.clone(),
            });
        }
        Ok(path)
    }

    /// Download `task` with retries. A task whose local path is unsafe fails without any
    /// request being made.
    pub fn fetch(&self, task: &FileTask) -> Result<LocalFile, GillError> {
        let path = self.local_path(task)?;
        std::fs::create_dir_all(&self.tmp_dir)?;
        let what = format!("download of {}", task.url);

        retry_with_backoff(&self.backoff, self.sleeper, what.as_str(), |timeout| {
            self.download(&task.url, &path, timeout)
        })
        .map_err(|(_, attempts)| GillError::FetchFailed {
            url: task.url.clone(),
            attempts,
        })
    }

    fn download(&self, url: &str, path: &Path, timeout: Duration) -> Result<LocalFile, GillError> {
        let mut response = self.http.get(url, timeout)?;
        if !response.is_success() {
            return Err(GillError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        // created before writing so that a partial download is removed on error
        let local = LocalFile::new(path);
        let mut file = File::create(path)?;
        std::io::copy(&mut response.body, &mut file)?;
        debug!("downloaded {} to {}", url, path.display());
        Ok(local)
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.contains(['/', '\\', '\0']) && !name.contains("..")
}
