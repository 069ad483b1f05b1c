use super::*;
use crate::config::UpdateMode;
use crate::test_utils::{
    RecordingBridge, ScriptedConflict, ScriptedUpdateService, init_test_logging, preferences,
};
use tokio::time::Instant;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_classify_launch_mode() {
    assert_eq!(LaunchMode::classify::<&str>(&[]), LaunchMode::Interactive);
    assert_eq!(LaunchMode::classify(&["aerial-updater"]), LaunchMode::Interactive);
    assert_eq!(LaunchMode::classify(&["aerial-updater", "--silent"]), LaunchMode::Silent);
    assert_eq!(
        LaunchMode::classify(&["--silent", "aerial-updater", "-v"]),
        LaunchMode::Silent
    );
    assert_eq!(LaunchMode::classify(&["--silently"]), LaunchMode::Interactive);
}

#[tokio::test(start_paused = true)]
async fn test_silent_no_update_waits_then_terminates() {
    init_test_logging(None);
    let service = ScriptedUpdateService::new();
    let bridge = RecordingBridge::new();
    let prefs = preferences(UpdateMode::Automatic, true);
    let detector = ScriptedConflict::absent();

    let mut controller = LifecycleController::new(&service, &bridge, &prefs, &detector);
    let start = Instant::now();
    let outcome = controller.launch(&args(&["aerial-updater", "--silent"])).await;

    assert_eq!(outcome, LaunchOutcome::Terminate(ExitReason::NothingToDo));
    assert!(start.elapsed() >= DEFAULT_SILENT_EXIT_DELAY);
    assert_eq!(
        service.calls(),
        vec!["set_non_interactive", "refresh_now", "needs_updating", "check_for_update"]
    );
    assert_eq!(bridge.count("build_menu"), 0);
    assert_eq!(controller.state(), LifecycleState::Terminating);
}

#[tokio::test(start_paused = true)]
async fn test_custom_exit_delay() {
    let service = ScriptedUpdateService::new();
    let bridge = RecordingBridge::new();
    let prefs = preferences(UpdateMode::Automatic, true);
    let detector = ScriptedConflict::absent();

    let mut controller = LifecycleController::new(&service, &bridge, &prefs, &detector)
        .with_exit_delay(Duration::from_secs(45));
    let start = Instant::now();
    controller.launch(&args(&["--silent"])).await;

    assert!(start.elapsed() >= Duration::from_secs(45));
}

#[tokio::test]
async fn test_silent_auto_install_success_terminates() {
    let service = ScriptedUpdateService::new().with_update("3.2.1");
    let bridge = RecordingBridge::new();
    let prefs = preferences(UpdateMode::Automatic, true);
    let detector = ScriptedConflict::absent();

    let mut controller = LifecycleController::new(&service, &bridge, &prefs, &detector);
    let outcome = controller.launch(&args(&["--silent"])).await;

    assert_eq!(outcome, LaunchOutcome::Terminate(ExitReason::UpdateInstalled));
    assert_eq!(service.count("perform_unattended_install"), 1);
    assert_eq!(bridge.icons(), vec![IconState::Updating]);
    assert_eq!(bridge.count("build_menu"), 0);
}

#[tokio::test]
async fn test_silent_auto_install_failure_stays_resident() {
    let service = ScriptedUpdateService::new()
        .with_update("3.2.1")
        .failing_install();
    let bridge = RecordingBridge::new();
    let prefs = preferences(UpdateMode::Automatic, true);
    let detector = ScriptedConflict::absent();

    let mut controller = LifecycleController::new(&service, &bridge, &prefs, &detector);
    let outcome = controller.launch(&args(&["--silent"])).await;

    assert_eq!(outcome, LaunchOutcome::Resident);
    assert_eq!(bridge.count("build_menu"), 1);
    assert_eq!(
        bridge.icons(),
        vec![IconState::Updating, IconState::Normal, IconState::Notification]
    );
    assert_eq!(controller.icon(), IconState::Notification);
}

#[tokio::test]
async fn test_silent_manual_mode_notifies() {
    let service = ScriptedUpdateService::new().with_update("3.2.1");
    let bridge = RecordingBridge::new();
    let prefs = preferences(UpdateMode::Manual, true);
    let detector = ScriptedConflict::absent();

    let mut controller = LifecycleController::new(&service, &bridge, &prefs, &detector);
    let outcome = controller.launch(&args(&["--silent"])).await;

    assert_eq!(outcome, LaunchOutcome::Resident);
    assert_eq!(service.count("perform_unattended_install"), 0);
    assert_eq!(bridge.icons(), vec![IconState::Normal, IconState::Notification]);
    assert_eq!(controller.state(), LifecycleState::Resident);
}

#[tokio::test]
async fn test_outdated_updater_skips_release_check() {
    let service = ScriptedUpdateService::new().outdated().with_update("3.2.1");
    let bridge = RecordingBridge::new();
    let prefs = preferences(UpdateMode::Automatic, true);
    let detector = ScriptedConflict::absent();

    let mut controller = LifecycleController::new(&service, &bridge, &prefs, &detector);
    let outcome = controller.launch(&args(&["--silent"])).await;

    assert_eq!(outcome, LaunchOutcome::Resident);
    assert_eq!(service.count("check_for_update"), 0);
    assert_eq!(service.count("perform_unattended_install"), 0);
    assert_eq!(bridge.count("build_menu"), 1);
    assert_eq!(controller.icon(), IconState::Normal);
}

#[tokio::test]
async fn test_interactive_launch_builds_menu() {
    let service = ScriptedUpdateService::new().with_update("3.2.1");
    let bridge = RecordingBridge::new();
    let prefs = preferences(UpdateMode::Automatic, true);
    let detector = ScriptedConflict::absent();

    let mut controller = LifecycleController::new(&service, &bridge, &prefs, &detector);
    let outcome = controller.launch(&args(&["aerial-updater"])).await;

    assert_eq!(outcome, LaunchOutcome::Resident);
    assert!(service.calls().is_empty());
    assert_eq!(bridge.calls(), vec!["set_icon(Normal)", "build_menu"]);
}

#[tokio::test]
async fn test_first_run_hands_over_to_setup() {
    let service = ScriptedUpdateService::new();
    let bridge = RecordingBridge::new();
    let prefs = preferences(UpdateMode::Automatic, false);
    let detector = ScriptedConflict::absent();

    let mut controller = LifecycleController::new(&service, &bridge, &prefs, &detector);
    let outcome = controller.launch(&args(&[])).await;

    assert_eq!(outcome, LaunchOutcome::FirstRunSetup);
    assert_eq!(bridge.calls(), vec!["present_first_run_setup"]);
    assert_eq!(bridge.count("build_menu"), 0);
    assert_eq!(detector.checks(), 1);
}

#[tokio::test]
async fn test_first_run_applies_to_silent_fallback() {
    let service = ScriptedUpdateService::new().with_update("3.2.1");
    let bridge = RecordingBridge::new();
    let prefs = preferences(UpdateMode::Manual, false);
    let detector = ScriptedConflict::absent();

    let mut controller = LifecycleController::new(&service, &bridge, &prefs, &detector);
    let outcome = controller.launch(&args(&["--silent"])).await;

    assert_eq!(outcome, LaunchOutcome::FirstRunSetup);
    assert_eq!(bridge.count("present_first_run_setup"), 1);
    assert_eq!(bridge.count("build_menu"), 0);
}

#[tokio::test]
async fn test_guard_quit_stops_before_anything_else() {
    let service = ScriptedUpdateService::new();
    let bridge = RecordingBridge::new().with_choices([false]);
    let prefs = preferences(UpdateMode::Automatic, true);
    let detector = ScriptedConflict::present();

    let mut controller = LifecycleController::new(&service, &bridge, &prefs, &detector);
    let outcome = controller.launch(&args(&["--silent"])).await;

    assert_eq!(outcome, LaunchOutcome::Terminate(ExitReason::ConflictNotResolved));
    assert!(service.calls().is_empty());
    assert_eq!(bridge.count("build_menu"), 0);
}

#[tokio::test]
async fn test_guard_resolved_then_continues() {
    let service = ScriptedUpdateService::new();
    let bridge = RecordingBridge::new().with_choices([true, true]);
    let prefs = preferences(UpdateMode::Automatic, true);
    let detector = ScriptedConflict::resolved_after(2);

    let mut controller = LifecycleController::new(&service, &bridge, &prefs, &detector);
    let outcome = controller.launch(&args(&[])).await;

    assert_eq!(outcome, LaunchOutcome::Resident);
    assert_eq!(bridge.choice_count(), 2);
    assert_eq!(detector.checks(), 4);
}

#[tokio::test]
async fn test_disk_image_terminates_after_alert() {
    let service = ScriptedUpdateService::new();
    let bridge = RecordingBridge::new();
    let prefs = preferences(UpdateMode::Automatic, true);
    let detector = ScriptedConflict::absent();

    let mut controller = LifecycleController::new(&service, &bridge, &prefs, &detector)
        .with_executable_path("/Volumes/Aerial/AerialUpdater.app/Contents/MacOS/aerial-updater");
    let outcome = controller.launch(&args(&["--silent"])).await;

    assert_eq!(outcome, LaunchOutcome::Terminate(ExitReason::RunningFromDiskImage));
    assert_eq!(bridge.calls(), vec!["show_error_alert(Oops)"]);
    assert!(service.calls().is_empty());
}
