// tests/supervisor_fake_launcher.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use cartmesh::case::FoamCaseBuilder;
use cartmesh::errors::CartmeshError;
use cartmesh::exec::{EnvironmentOverlay, TerminationMode};
use cartmesh::fs::mock::MockFileSystem;
use cartmesh::supervisor::{
    Affordances, LogColor, RunOutcome, SupervisorEvent, SupervisorOptions, SupervisorState,
};
use cartmesh::types::PlatformFamily;
use cartmesh_test_utils::{FakeRun, Harness, MeshParametersBuilder, sh};

fn case_dir() -> &'static Path {
    Path::new("/work/meshCase")
}

#[tokio::test]
async fn successful_run_logs_output_and_enables_results() {
    init_tracing();
    let mut h = Harness::new([FakeRun::exits(0)
        .stdout("Creating octree\nRefin")
        .stderr("warning: open edge\n")
        .stdout("ing boundary")]);

    h.supervisor.start(sh("mesh", case_dir())).await.unwrap();
    assert_eq!(h.supervisor.state(), SupervisorState::Running);
    assert!(h.supervisor.ticker_active());

    let outcome = with_timeout(h.pump_until_idle()).await.unwrap();

    assert_eq!(outcome, Some(RunOutcome::Success));
    let rec = h.recorded();
    assert_eq!(
        rec.texts(),
        vec![
            "Creating octree",
            "warning: open edge",
            "Refining boundary",
            "Meshing completed"
        ]
    );
    assert_eq!(rec.entries[1].color, LogColor::Error);
    assert_eq!(rec.errors, vec!["warning: open edge"]);
    assert_eq!(rec.outcomes, vec![RunOutcome::Success]);
    assert_eq!(h.supervisor.affordances(), Affordances::RESULTS_READY);
    assert!(!h.supervisor.ticker_active());
}

#[tokio::test]
async fn nonzero_exit_is_failed_without_results() {
    init_tracing();
    let mut h = Harness::new([FakeRun::exits(1).stdout("Cannot open surface\n")]);

    h.supervisor.start(sh("mesh", case_dir())).await.unwrap();
    let outcome = with_timeout(h.pump_until_idle()).await.unwrap();

    assert_eq!(outcome, Some(RunOutcome::Failed(1)));
    let affordances = h.supervisor.affordances();
    assert!(affordances.start);
    assert!(!affordances.cancel);
    assert!(!affordances.view_results);

    let rec = h.recorded();
    let last = rec.entries.last().unwrap();
    assert_eq!(last.color, LogColor::Error);
    assert!(last.text.contains("exit code 1"), "{}", last.text);
}

#[tokio::test]
async fn spawn_failure_stays_idle_and_reports_reason() {
    init_tracing();
    let mut h = Harness::new([FakeRun::spawn_error("No such file or directory")]);

    let err = h
        .supervisor
        .start(sh("mesh", case_dir()))
        .await
        .unwrap_err();

    assert!(matches!(err, CartmeshError::Start { ref reason } if reason.contains("No such file")));
    assert!(!err.is_fatal());
    assert_eq!(h.supervisor.state(), SupervisorState::Idle);
    assert_eq!(h.supervisor.affordances(), Affordances::IDLE);
    assert!(!h.supervisor.ticker_active());

    let rec = h.recorded();
    assert!(matches!(rec.outcomes.as_slice(), [RunOutcome::StartFailed(r)] if r.contains("No such file")));
    assert_eq!(rec.entries.len(), 1);
    assert_eq!(rec.entries[0].color, LogColor::Error);
    assert!(h.launch_record().lock().unwrap().launches.is_empty());
}

#[tokio::test]
async fn cancel_terminates_and_logs_reason() {
    init_tracing();
    let mut h = Harness::new([FakeRun::until_cancelled().stdout("Surface mesh ready\n")]);

    let run_id = h.supervisor.start(sh("mesh", case_dir())).await.unwrap();
    h.pump(1).await.unwrap();

    let outcome = with_timeout(h.supervisor.cancel()).await.unwrap();

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(h.supervisor.state(), SupervisorState::Idle);
    assert_eq!(h.supervisor.affordances(), Affordances::IDLE);
    assert!(!h.supervisor.ticker_active());
    assert_eq!(
        h.recorded().texts(),
        vec![
            "Surface mesh ready",
            "Meshing manually stopped",
            "Meshing interrupted"
        ]
    );
    assert_eq!(
        h.launch_record().lock().unwrap().cancels,
        vec![(run_id, TerminationMode::Terminate)]
    );
}

#[tokio::test]
async fn windows_family_kills_instead_of_terminating() {
    init_tracing();
    let options = SupervisorOptions {
        platform: PlatformFamily::Windows,
        ..Harness::options()
    };
    let mut h = Harness::with_options([FakeRun::until_cancelled()], options);

    let run_id = h.supervisor.start(sh("mesh", case_dir())).await.unwrap();
    h.supervisor.cancel().await.unwrap();

    assert_eq!(
        h.launch_record().lock().unwrap().cancels,
        vec![(run_id, TerminationMode::Kill)]
    );
}

#[tokio::test]
async fn slow_process_within_timeout_is_cancelled() {
    init_tracing();
    let mut h = Harness::new([FakeRun::slow_to_stop(Duration::from_millis(50))]);

    h.supervisor.start(sh("mesh", case_dir())).await.unwrap();
    let outcome = with_timeout(h.supervisor.cancel()).await.unwrap();

    assert_eq!(outcome, RunOutcome::Cancelled);
}

#[tokio::test]
async fn cancel_timeout_is_fatal_and_blocks_new_runs() {
    init_tracing();
    let mut h = Harness::new([FakeRun::stuck(), FakeRun::exits(0)]);

    h.supervisor.start(sh("mesh", case_dir())).await.unwrap();
    let err = with_timeout(h.supervisor.cancel()).await.unwrap_err();

    assert!(matches!(err, CartmeshError::CancelTimeout { .. }));
    assert!(err.is_fatal());
    assert_eq!(h.supervisor.state(), SupervisorState::Cancelling);
    assert!(h.recorded().outcomes.is_empty());

    let again = h.supervisor.start(sh("mesh", case_dir())).await.unwrap_err();
    assert!(matches!(again, CartmeshError::CancelTimeout { .. }));
    assert_eq!(h.launch_record().lock().unwrap().launches.len(), 1);
}

#[tokio::test]
async fn second_start_while_running_is_rejected() {
    init_tracing();
    let mut h = Harness::new([FakeRun::until_cancelled().stdout("step 1\n")]);

    h.supervisor.start(sh("mesh", case_dir())).await.unwrap();
    h.pump(1).await.unwrap();

    let err = h
        .supervisor
        .start(sh("other", case_dir()))
        .await
        .unwrap_err();

    assert!(matches!(err, CartmeshError::AlreadyRunning));
    assert_eq!(h.supervisor.state(), SupervisorState::Running);
    let rec = h.recorded();
    assert_eq!(rec.cleared, 1);
    assert_eq!(rec.texts(), vec!["step 1"]);
    assert_eq!(h.launch_record().lock().unwrap().launches.len(), 1);

    h.supervisor.cancel().await.unwrap();
}

#[tokio::test]
async fn notifications_from_cancelled_run_are_ignored() {
    init_tracing();
    let mut h = Harness::new([FakeRun::until_cancelled()]);

    let run_id = h.supervisor.start(sh("mesh", case_dir())).await.unwrap();
    h.supervisor.cancel().await.unwrap();
    let before = h.recorded();

    h.supervisor
        .handle_event(SupervisorEvent::Output {
            run_id,
            stream: cartmesh::supervisor::OutputStream::Stdout,
            chunk: b"late line\n".to_vec(),
        })
        .await
        .unwrap();
    h.supervisor
        .handle_event(SupervisorEvent::ProcessExited {
            run_id,
            exit_code: 0,
        })
        .await
        .unwrap();

    let after = h.recorded();
    assert_eq!(after.texts(), before.texts());
    assert_eq!(after.outcomes, vec![RunOutcome::Cancelled]);
    assert_eq!(h.supervisor.affordances(), Affordances::IDLE);
}

#[tokio::test]
async fn restart_clears_log_and_resets_clock() {
    init_tracing();
    let mut h = Harness::new([
        FakeRun::exits(0).stdout("first\n"),
        FakeRun::exits(0).stdout("second\n"),
    ]);

    h.supervisor.start(sh("mesh", case_dir())).await.unwrap();
    h.pump_until_idle().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let second = h.supervisor.start(sh("mesh", case_dir())).await.unwrap();
    assert_eq!(second, 2);
    h.pump_until_idle().await.unwrap();

    let rec = h.recorded();
    assert_eq!(rec.cleared, 2);
    assert_eq!(rec.texts(), vec!["second", "Meshing completed"]);
    assert_eq!(rec.outcomes.len(), 2);
    assert!(h.supervisor.core().log().entries()[0].elapsed < Duration::from_secs(1));
}

#[tokio::test]
async fn environment_overlay_is_applied_on_top_of_inherited() {
    init_tracing();
    let mut h = Harness::new([FakeRun::exits(0)]);
    let overlay = EnvironmentOverlay::new()
        .with("PATH", "/opt/foam/bin")
        .with("WM_PROJECT", "OpenFOAM");

    h.supervisor
        .start(sh("mesh", case_dir()).env_overlay(overlay))
        .await
        .unwrap();
    h.pump_until_idle().await.unwrap();

    let record = h.launch_record();
    let record = record.lock().unwrap();
    let (_, spec) = &record.launches[0];
    assert_eq!(spec.env[OsStr::new("PATH")], "/opt/foam/bin");
    assert_eq!(spec.env[OsStr::new("HOME")], "/home/mesher");
    assert_eq!(spec.env[OsStr::new("WM_PROJECT")], "OpenFOAM");
    assert_eq!(spec.working_dir, case_dir());
}

#[tokio::test]
async fn malformed_overlay_fails_before_spawn() {
    init_tracing();
    let mut h = Harness::new([FakeRun::exits(0)]);
    let overlay = EnvironmentOverlay::new().with("BAD=KEY", "1");

    let err = h
        .supervisor
        .start(sh("mesh", case_dir()).env_overlay(overlay))
        .await
        .unwrap_err();

    assert!(matches!(err, CartmeshError::EnvironmentBuild(_)));
    assert_eq!(h.supervisor.state(), SupervisorState::Idle);
    assert!(h.launch_record().lock().unwrap().launches.is_empty());
    assert!(matches!(
        h.recorded().outcomes.as_slice(),
        [RunOutcome::StartFailed(_)]
    ));
}

#[tokio::test]
async fn start_case_writes_case_then_runs_allmesh() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/work/meshCase/constant/triSurface/part.stl", "solid part\nendsolid part\n");
    let builder = FoamCaseBuilder::new(fs.clone(), case_dir()).platform(PlatformFamily::Unix);
    let params = MeshParametersBuilder::new().cell_size(20.0).build();
    let mut h = Harness::new([FakeRun::exits(0)]);

    h.supervisor.start_case(&builder, &params).await.unwrap();
    h.pump_until_idle().await.unwrap();

    assert_eq!(
        h.recorded().texts(),
        vec![
            "Starting cut-cell Cartesian meshing ...",
            "Running cfMesh ...",
            "Meshing completed"
        ]
    );
    let record = h.launch_record();
    let record = record.lock().unwrap();
    let (_, spec) = &record.launches[0];
    assert_eq!(spec.program, "sh");
    assert_eq!(spec.args, vec!["./Allmesh"]);
    assert!(fs.contents("/work/meshCase/system/meshDict").is_some());
}

#[tokio::test]
async fn case_builder_error_resets_to_idle() {
    init_tracing();
    let builder = FoamCaseBuilder::new(MockFileSystem::new(), case_dir());
    let mut h = Harness::new([FakeRun::exits(0)]);

    let err = h
        .supervisor
        .start_case(&builder, &MeshParametersBuilder::new().build())
        .await
        .unwrap_err();

    assert!(matches!(err, CartmeshError::CaseBuild(_)));
    assert_eq!(h.supervisor.state(), SupervisorState::Idle);
    assert_eq!(h.supervisor.affordances(), Affordances::IDLE);
    let rec = h.recorded();
    assert_eq!(rec.texts()[0], "Starting cut-cell Cartesian meshing ...");
    assert_eq!(rec.entries.last().unwrap().color, LogColor::Error);
    assert!(h.launch_record().lock().unwrap().launches.is_empty());
}

#[tokio::test]
async fn ticker_reports_elapsed_time_while_running() {
    init_tracing();
    let options = SupervisorOptions {
        tick_interval: Duration::from_millis(20),
        ..Harness::options()
    };
    let mut h = Harness::with_options([FakeRun::until_cancelled()], options);

    h.supervisor.start(sh("mesh", case_dir())).await.unwrap();
    h.pump(2).await.unwrap();

    let timers = h.recorded().timers;
    assert_eq!(timers.len(), 2);
    assert!(timers.iter().all(|t| t.starts_with("Time: ") && t.ends_with('s')));

    h.supervisor.cancel().await.unwrap();
    assert!(!h.supervisor.ticker_active());
}

#[tokio::test]
async fn event_loop_exits_after_outcome() {
    init_tracing();
    let options = SupervisorOptions {
        exit_when_idle: true,
        completion_hint: Some("View the mesh in ParaView".to_string()),
        ..Harness::options()
    };
    let mut h = Harness::with_options([FakeRun::exits(0).stdout("done\n")], options);
    h.supervisor.start(sh("mesh", case_dir())).await.unwrap();

    let (supervisor, events, observer) = h.into_parts();
    let outcome = with_timeout(supervisor.run(events)).await.unwrap();

    assert_eq!(outcome, Some(RunOutcome::Success));
    assert_eq!(
        observer.snapshot().texts(),
        vec!["done", "Meshing completed", "View the mesh in ParaView"]
    );
}

#[tokio::test]
async fn cancel_and_shutdown_through_events() {
    init_tracing();
    let mut h = Harness::new([FakeRun::until_cancelled(), FakeRun::until_cancelled()]);

    h.supervisor.start(sh("mesh", case_dir())).await.unwrap();
    h.tx.send(SupervisorEvent::CancelRequested).await.unwrap();
    h.pump(1).await.unwrap();
    assert_eq!(h.supervisor.last_outcome(), Some(&RunOutcome::Cancelled));

    // A cancel with nothing running is ignored.
    assert!(h
        .supervisor
        .handle_event(SupervisorEvent::CancelRequested)
        .await
        .unwrap());

    h.supervisor
        .handle_event(SupervisorEvent::StartRequested(sh("mesh", case_dir())))
        .await
        .unwrap();
    assert_eq!(h.supervisor.state(), SupervisorState::Running);

    let keep_going = h
        .supervisor
        .handle_event(SupervisorEvent::ShutdownRequested)
        .await
        .unwrap();
    assert!(!keep_going);
    assert_eq!(h.supervisor.state(), SupervisorState::Idle);
    assert_eq!(h.recorded().outcomes, vec![RunOutcome::Cancelled, RunOutcome::Cancelled]);
}
