#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use cartmesh::case::{MeshParameters, Point3};
use cartmesh::errors::Result;
use cartmesh::supervisor::{
    LaunchRequest, RunOutcome, Supervisor, SupervisorEvent, SupervisorOptions, SupervisorState,
};
use cartmesh::types::{MeshUtility, PlatformFamily};

use crate::fake_launcher::{FakeLauncher, FakeRun, LaunchRecord};
use crate::recording_observer::{Recorded, RecordingObserver};

/// Builder for `MeshParameters` to simplify test setup.
pub struct MeshParametersBuilder {
    params: MeshParameters,
}

impl MeshParametersBuilder {
    pub fn new() -> Self {
        Self {
            params: MeshParameters::default(),
        }
    }

    pub fn cell_size(mut self, mm: f64) -> Self {
        self.params.characteristic_length_max = mm;
        self
    }

    pub fn point_in_mesh(mut self, x: f64, y: f64, z: f64) -> Self {
        self.params.point_in_mesh = Point3::new(x, y, z);
        self
    }

    pub fn edge_refinement(mut self, levels: u32) -> Self {
        self.params.edge_refinement = levels;
        self
    }

    pub fn utility(mut self, utility: MeshUtility) -> Self {
        self.params.mesh_utility = utility;
        self
    }

    pub fn build(self) -> MeshParameters {
        self.params
    }
}

impl Default for MeshParametersBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `sh -c <script>` in `working_dir`.
pub fn sh(script: &str, working_dir: &Path) -> LaunchRequest {
    LaunchRequest::new("sh", working_dir).args(["-c", script])
}

/// Put a small STL surface where the case builder expects it.
pub fn seed_case_dir(case_dir: &Path) {
    let surface = case_dir.join("constant/triSurface/part.stl");
    std::fs::create_dir_all(surface.parent().unwrap()).unwrap();
    std::fs::write(
        &surface,
        "solid part\n  facet normal 0 0 1\n    outer loop\n      vertex 0 0 0\n      vertex 1 0 0\n      vertex 0 1 0\n    endloop\n  endfacet\nendsolid part\n",
    )
    .unwrap();
}

/// A supervisor wired to a [`FakeLauncher`] and a [`RecordingObserver`],
/// with its event channel exposed so tests pump events by hand.
pub struct Harness {
    pub supervisor: Supervisor<FakeLauncher>,
    pub events: mpsc::Receiver<SupervisorEvent>,
    pub tx: mpsc::Sender<SupervisorEvent>,
    observer: RecordingObserver,
    record: Arc<Mutex<LaunchRecord>>,
}

impl Harness {
    pub fn new(runs: impl IntoIterator<Item = FakeRun>) -> Self {
        Self::with_options(runs, Self::options())
    }

    /// Defaults for tests: Unix termination, a slow ticker so ticks do not
    /// interleave with scripted events, and a short cancel timeout.
    pub fn options() -> SupervisorOptions {
        SupervisorOptions {
            cancel_timeout: Duration::from_millis(200),
            tick_interval: Duration::from_secs(3600),
            platform: PlatformFamily::Unix,
            ..SupervisorOptions::default()
        }
    }

    pub fn with_options(runs: impl IntoIterator<Item = FakeRun>, options: SupervisorOptions) -> Self {
        let (tx, events) = mpsc::channel(64);
        let launcher = FakeLauncher::new(runs);
        let record = launcher.record();
        let observer = RecordingObserver::new();

        let host: BTreeMap<String, String> = [
            ("HOME".to_string(), "/home/mesher".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ]
        .into_iter()
        .collect();

        let supervisor = Supervisor::new(launcher, Box::new(observer.clone()), options, tx.clone())
            .with_host_environment(Box::new(host));

        Self {
            supervisor,
            events,
            tx,
            observer,
            record,
        }
    }

    /// Split off the supervisor and its receiver, e.g. for `Supervisor::run`.
    pub fn into_parts(self) -> (Supervisor<FakeLauncher>, mpsc::Receiver<SupervisorEvent>, RecordingObserver) {
        (self.supervisor, self.events, self.observer)
    }

    pub fn recorded(&self) -> Recorded {
        self.observer.snapshot()
    }

    pub fn launch_record(&self) -> Arc<Mutex<LaunchRecord>> {
        Arc::clone(&self.record)
    }

    /// Handle channel events until the supervisor is back to `Idle`.
    pub async fn pump_until_idle(&mut self) -> Result<Option<RunOutcome>> {
        while self.supervisor.state() != SupervisorState::Idle {
            let event = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
                .await
                .expect("no supervisor event within 5 seconds")
                .expect("event channel closed");
            self.supervisor.handle_event(event).await?;
        }
        Ok(self.supervisor.last_outcome().cloned())
    }

    /// Handle exactly `n` pending events.
    pub async fn pump(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            let event = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
                .await
                .expect("no supervisor event within 5 seconds")
                .expect("event channel closed");
            self.supervisor.handle_event(event).await?;
        }
        Ok(())
    }
}
