// ABOUTME: In-memory fakes for the host capabilities and the unit model.
// ABOUTME: Every fake records its calls into a shared journal so tests can assert ordering.

use crate::error::ModelError;
use crate::host::{
    Accounts, CommandError, CommandOutput, ContainerRuntime, Host, HostFs, PackageError,
    PackageManager, ScriptRunner, ServiceSupervisor,
};
use crate::model::{RelationData, UnitModel, UnitStatus};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

fn failed(program: &str) -> CommandError {
    CommandError::Failed {
        program: program.to_string(),
        code: Some(1),
        stderr: "injected failure".to_string(),
    }
}

/// Ordered log of calls shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e == entry)
    }
}

pub struct FakePackages {
    journal: Journal,
    missing: HashSet<String>,
}

impl FakePackages {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            missing: HashSet::new(),
        }
    }

    pub fn missing(mut self, package: &str) -> Self {
        self.missing.insert(package.to_string());
        self
    }
}

#[async_trait]
impl PackageManager for FakePackages {
    async fn update(&self) -> Result<(), PackageError> {
        self.journal.record("apt update");
        Ok(())
    }

    async fn install(&self, package: &str) -> Result<(), PackageError> {
        self.journal.record(format!("install {package}"));
        if self.missing.contains(package) {
            return Err(PackageError::NotFound {
                package: package.to_string(),
            });
        }
        Ok(())
    }
}

pub struct FakeAccounts {
    journal: Journal,
    fail: bool,
}

impl FakeAccounts {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Accounts for FakeAccounts {
    async fn ensure_group(&self, group: &str) -> Result<(), CommandError> {
        self.journal.record(format!("ensure group {group}"));
        if self.fail {
            return Err(failed("groupadd"));
        }
        Ok(())
    }

    async fn add_user_to_group(&self, user: &str, group: &str) -> Result<(), CommandError> {
        self.journal.record(format!("add {user} to {group}"));
        Ok(())
    }
}

/// Supervisor whose status answers come from a script. The last scripted
/// answer repeats; with none scripted the unit reports running.
pub struct FakeSupervisor {
    journal: Journal,
    statuses: Mutex<VecDeque<CommandOutput>>,
    fail_reload: bool,
    fail_enable: bool,
    fail_restart: bool,
    fail_status: bool,
}

impl FakeSupervisor {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            statuses: Mutex::new(VecDeque::new()),
            fail_reload: false,
            fail_enable: false,
            fail_restart: false,
            fail_status: false,
        }
    }

    pub fn with_statuses(self, statuses: Vec<CommandOutput>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn failing_reload(mut self) -> Self {
        self.fail_reload = true;
        self
    }

    pub fn failing_enable(mut self) -> Self {
        self.fail_enable = true;
        self
    }

    pub fn failing_restart(mut self) -> Self {
        self.fail_restart = true;
        self
    }

    pub fn failing_status(mut self) -> Self {
        self.fail_status = true;
        self
    }
}

#[async_trait]
impl ServiceSupervisor for FakeSupervisor {
    async fn daemon_reload(&self) -> Result<(), CommandError> {
        self.journal.record("daemon-reload");
        if self.fail_reload {
            return Err(failed("systemctl"));
        }
        Ok(())
    }

    async fn enable(&self, unit: &str) -> Result<(), CommandError> {
        self.journal.record(format!("enable {unit}"));
        if self.fail_enable {
            return Err(failed("systemctl"));
        }
        Ok(())
    }

    async fn restart(&self, unit: &str) -> Result<(), CommandError> {
        self.journal.record(format!("restart {unit}"));
        if self.fail_restart {
            return Err(failed("systemctl"));
        }
        Ok(())
    }

    async fn status(&self, unit: &str) -> Result<CommandOutput, CommandError> {
        self.journal.record(format!("status {unit}"));
        if self.fail_status {
            return Err(CommandError::Spawn {
                program: "systemctl".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no systemctl"),
            });
        }

        let mut statuses = self.statuses.lock().unwrap();
        let output = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        Ok(output.unwrap_or(CommandOutput {
            code: Some(0),
            stdout: "active (running)".to_string(),
            stderr: String::new(),
        }))
    }
}

pub struct FakeRuntime {
    journal: Journal,
    fail: bool,
}

impl FakeRuntime {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn prune_stopped_containers(&self) -> Result<(), CommandError> {
        self.journal.record("prune containers");
        if self.fail {
            return Err(failed("docker"));
        }
        Ok(())
    }
}

/// Filesystem that keeps written files in memory.
pub struct MemoryFs {
    journal: Journal,
    files: Mutex<HashMap<PathBuf, (String, u32)>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
    fail_chown: bool,
}

impl MemoryFs {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            files: Mutex::new(HashMap::new()),
            dirs: Mutex::new(BTreeSet::new()),
            fail_chown: false,
        }
    }

    pub fn failing_chown(mut self) -> Self {
        self.fail_chown = true;
        self
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|(contents, _)| contents.clone())
    }

    pub fn mode(&self, path: &Path) -> Option<u32> {
        self.files.lock().unwrap().get(path).map(|(_, mode)| *mode)
    }

    pub fn has_dir(&self, path: &Path) -> bool {
        self.dirs.lock().unwrap().contains(path)
    }
}

#[async_trait]
impl HostFs for MemoryFs {
    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        self.journal.record(format!("mkdir {}", path.display()));
        self.dirs.lock().unwrap().insert(path.to_path_buf());
        Ok(())
    }

    async fn write_file(&self, path: &Path, contents: &str, mode: u32) -> std::io::Result<()> {
        self.journal.record(format!("write {}", path.display()));
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), (contents.to_string(), mode));
        Ok(())
    }

    async fn chown(&self, path: &Path, user: &str, group: &str) -> Result<(), CommandError> {
        self.journal
            .record(format!("chown {user}:{group} {}", path.display()));
        if self.fail_chown {
            return Err(failed("chown"));
        }
        Ok(())
    }
}

pub struct FakeScripts {
    journal: Journal,
    fail: bool,
}

impl FakeScripts {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl ScriptRunner for FakeScripts {
    async fn run(&self, script: &Path) -> Result<CommandOutput, CommandError> {
        self.journal.record(format!("run {}", script.display()));
        if self.fail {
            return Err(failed("create_keys.sh"));
        }
        Ok(CommandOutput {
            code: Some(0),
            ..Default::default()
        })
    }
}

/// Every capability faked, all recording into `journal`.
pub fn test_host(journal: &Journal) -> Host {
    Host {
        packages: Arc::new(FakePackages::new(journal.clone())),
        accounts: Arc::new(FakeAccounts::new(journal.clone())),
        supervisor: Arc::new(FakeSupervisor::new(journal.clone())),
        runtime: Arc::new(FakeRuntime::new(journal.clone())),
        fs: Arc::new(MemoryFs::new(journal.clone())),
        scripts: Arc::new(FakeScripts::new(journal.clone())),
    }
}

/// Unit model kept in memory.
#[derive(Default)]
pub struct MemoryModel {
    statuses: Mutex<Vec<UnitStatus>>,
    ports: Mutex<Vec<u16>>,
    relations: Mutex<BTreeMap<String, RelationData>>,
    failing_relation: Option<String>,
}

impl MemoryModel {
    pub fn with_relations(ids: &[&str]) -> Self {
        let model = Self::default();
        {
            let mut relations = model.relations.lock().unwrap();
            for id in ids {
                relations.insert(id.to_string(), RelationData::new());
            }
        }
        model
    }

    pub fn failing_relation(mut self, id: &str) -> Self {
        self.failing_relation = Some(id.to_string());
        self
    }

    pub fn statuses(&self) -> Vec<UnitStatus> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn ports(&self) -> Vec<u16> {
        self.ports.lock().unwrap().clone()
    }

    pub fn relation(&self, id: &str) -> RelationData {
        self.relations
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl UnitModel for MemoryModel {
    async fn set_status(&self, status: UnitStatus) -> Result<(), ModelError> {
        self.statuses.lock().unwrap().push(status);
        Ok(())
    }

    async fn open_port(&self, port: u16) -> Result<(), ModelError> {
        let mut ports = self.ports.lock().unwrap();
        if !ports.contains(&port) {
            ports.push(port);
        }
        Ok(())
    }

    async fn relations(&self) -> Result<Vec<String>, ModelError> {
        Ok(self.relations.lock().unwrap().keys().cloned().collect())
    }

    async fn update_relation(&self, id: &str, data: &RelationData) -> Result<(), ModelError> {
        if self.failing_relation.as_deref() == Some(id) {
            return Err(ModelError::Io {
                path: PathBuf::from(format!("relations/{id}.json")),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.relations
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .extend(data.clone());
        Ok(())
    }
}
