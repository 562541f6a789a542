//! Shared fixtures for integration tests: report builders, a scripted
//! in-process engine and a recording trash.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use dedup_companion::services::{DeletionError, Engine, ScanError, Trash};
use dedup_companion::ScanOptions;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, watch};

/// Build a valid engine report. Each group is `(hash, size, paths)`.
pub fn report_json(groups: &[(&str, u64, &[&str])]) -> String {
    let duplicates: Vec<Value> = groups
        .iter()
        .map(|(hash, size, paths)| {
            let files: Vec<Value> = paths
                .iter()
                .map(|path| {
                    json!({
                        "Path": path,
                        "Size": size,
                        "Hash": hash,
                        "ModTime": "2024-06-01T09:30:00+02:00",
                        "PHash": ""
                    })
                })
                .collect();
            json!({ "Hash": hash, "Size": size, "Files": files, "Similarity": 100 })
        })
        .collect();

    let total: u64 = groups
        .iter()
        .map(|(_, size, paths)| size * (paths.len() as u64 - 1))
        .sum();

    json!({
        "version": "1.4.0",
        "timestamp": "2024-06-01T09:31:00+02:00",
        "config": {
            "Dir": "/data",
            "Recursive": true,
            "DryRun": false,
            "Verbose": false,
            "Workers": 8,
            "MinSize": 0,
            "Interactive": false,
            "TUI": false,
            "MoveTo": "",
            "KeepCriteria": "oldest",
            "HashAlgorithm": "sha256",
            "FilePattern": "",
            "ExportReport": false,
            "UndoLast": false,
            "PerceptualMode": false,
            "PHashAlgorithm": "",
            "SimilarityThreshold": 0,
            "JSON": true
        },
        "duplicate_count": groups.len(),
        "total_space": total,
        "duplicates": duplicates
    })
    .to_string()
}

pub fn empty_report() -> String {
    report_json(&[])
}

/// In-process engine whose replies are scripted per directory.
///
/// A directory with a gate waits until the test releases it, which makes
/// completion order controllable.
#[derive(Default)]
pub struct ScriptedEngine {
    calls: Mutex<Vec<(Utf8PathBuf, ScanOptions)>>,
    replies: Mutex<HashMap<Utf8PathBuf, Result<String, ScanError>>>,
    gates: Mutex<HashMap<Utf8PathBuf, oneshot::Receiver<Result<String, ScanError>>>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, directory: &str, reply: Result<String, ScanError>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(Utf8PathBuf::from(directory), reply);
        self
    }

    /// The next scan of `directory` blocks until the returned sender fires.
    pub fn gate(&self, directory: &str) -> oneshot::Sender<Result<String, ScanError>> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .insert(Utf8PathBuf::from(directory), rx);
        tx
    }

    pub fn calls(&self) -> Vec<(Utf8PathBuf, ScanOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Engine for ScriptedEngine {
    fn run(
        &self,
        directory: &Utf8Path,
        options: &ScanOptions,
        mut cancel: watch::Receiver<bool>,
    ) -> impl Future<Output = Result<String, ScanError>> + Send {
        self.calls
            .lock()
            .unwrap()
            .push((directory.to_path_buf(), options.clone()));

        let gate = self.gates.lock().unwrap().remove(directory);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(directory)
            .cloned()
            .unwrap_or_else(|| Ok(empty_report()));

        async move {
            let Some(gate) = gate else {
                return reply;
            };
            tokio::select! {
                released = gate => released.unwrap_or(Err(ScanError::Cancelled)),
                _ = async {
                    while cancel.changed().await.is_ok() {
                        if *cancel.borrow() {
                            return;
                        }
                    }
                    std::future::pending::<()>().await
                } => Err(ScanError::Cancelled),
            }
        }
    }
}

/// Trash that records paths and optionally fails.
///
/// The log is shared, so a test can keep a handle after the trash has been
/// moved into a coordinator.
#[derive(Default, Clone)]
pub struct RecordingTrash {
    pub trashed: Arc<Mutex<Vec<Utf8PathBuf>>>,
    pub fail_with: Option<String>,
}

impl RecordingTrash {
    pub fn failing(message: &str) -> Self {
        Self {
            trashed: Arc::default(),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn trashed(&self) -> Vec<Utf8PathBuf> {
        self.trashed.lock().unwrap().clone()
    }
}

impl Trash for RecordingTrash {
    fn move_to_trash(&self, path: &Utf8Path) -> Result<(), DeletionError> {
        if let Some(message) = &self.fail_with {
            return Err(DeletionError::Trash {
                path: path.to_string(),
                message: message.clone(),
            });
        }
        self.trashed.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// Write an executable shell script standing in for the engine.
#[cfg(unix)]
pub fn write_engine_script(dir: &Utf8Path, name: &str, body: &str) -> Utf8PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
