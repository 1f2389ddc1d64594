use std::cell::RefCell;
use std::rc::Rc;

use refscan_core::{DiagnosticSink, ProgressSink, ScanSettings};
use refscan_graph::{
    parse_report, write_report, CancelToken, ErrorRecord, ReportLine, ScanOrchestrator,
};
use refscan_project::ProjectSnapshot;
use tempfile::TempDir;

const PROJECT: &str = include_str!("fixtures/project.json");

fn project() -> ProjectSnapshot {
    ProjectSnapshot::from_json(PROJECT).expect("fixture should load")
}

#[derive(Clone, Default)]
struct Collected(Rc<RefCell<Vec<String>>>);

impl DiagnosticSink for Collected {
    fn emit(&mut self, message: &str) {
        self.0.borrow_mut().push(message.to_string());
    }
}

#[derive(Clone, Default)]
struct Fractions(Rc<RefCell<Vec<f32>>>);

impl ProgressSink for Fractions {
    fn report(&mut self, _label: &str, _detail: &str, fraction: f32) {
        self.0.borrow_mut().push(fraction);
    }
}

/// Cancels the scan on the first progress update it sees.
struct CancelOnFirstReport(CancelToken);

impl ProgressSink for CancelOnFirstReport {
    fn report(&mut self, _label: &str, _detail: &str, _fraction: f32) {
        self.0.cancel();
    }
}

#[test]
fn test_active_scene_reports_references_and_components() {
    let project = project();
    let diagnostics = Collected::default();
    let mut scanner = ScanOrchestrator::new(&project, ScanSettings::default())
        .with_diagnostics(diagnostics.clone());

    let outcome = scanner.scan_active_scene().unwrap();
    assert!(!outcome.cancelled);
    assert_eq!(
        diagnostics.0.borrow().as_slice(),
        &[
            "Missing REFERENCE: [Assets/Scenes/Main.unity]Player. Component: Health, Property: Health Bar"
                .to_string(),
            "Missing Component in GameObject: Camera in Assets/Scenes/Main.unity".to_string(),
        ]
    );
    // Scene passes do not check template links.
    assert!(outcome
        .errors
        .records()
        .iter()
        .all(|r| !matches!(r, ErrorRecord::MissingTemplate { .. })));
}

#[test]
fn test_batch_mode_suppresses_diagnostics() {
    let project = project();
    let diagnostics = Collected::default();
    let settings = ScanSettings {
        batch_mode: true,
        ..ScanSettings::default()
    };
    let mut scanner =
        ScanOrchestrator::new(&project, settings).with_diagnostics(diagnostics.clone());

    let outcome = scanner.scan_active_scene().unwrap();
    assert_eq!(outcome.errors.len(), 2);
    assert!(diagnostics.0.borrow().is_empty());
}

#[test]
fn test_build_scenes_skip_disabled_and_unopenable() {
    let project = project();
    let mut scanner = ScanOrchestrator::new(&project, ScanSettings::default());

    let outcome = scanner.scan_build_scenes().unwrap();
    assert_eq!(outcome.errors.len(), 2);
    assert_eq!(outcome.skipped_roots, vec!["Assets/Scenes/Deleted.unity"]);
    assert!(outcome
        .errors
        .records()
        .iter()
        .all(|r| r.context() == "Assets/Scenes/Main.unity"));
}

#[test]
fn test_template_scan_reports_references_only() {
    let project = project();
    let mut scanner = ScanOrchestrator::new(&project, ScanSettings::default());

    let outcome = scanner.scan_template("Assets/Door.prefab").unwrap();
    let records = outcome.errors.records();
    assert_eq!(records.len(), 1);
    assert!(matches!(
        &records[0],
        ErrorRecord::MissingFieldReference { field_name, .. } if field_name == "Lock"
    ));
    assert_eq!(records[0].node().full_path, "Door/Frame");

    assert!(scanner.scan_template("Assets/Textures/Wall.png").is_err());
}

#[test]
fn test_template_scan_looks_inside_nested_instances() {
    let project = project();
    let mut scanner = ScanOrchestrator::new(&project, ScanSettings::default());

    let outcome = scanner.scan_template("Assets/House.prefab").unwrap();
    assert_eq!(
        outcome.errors.messages(),
        &["Assets/House.prefab\tMissing Reference in GameObject House/Window Component: Glass, Property: Pane in Assets/House.prefab".to_string()]
    );
}

#[test]
fn test_asset_pass_is_flat_and_project_scoped() {
    let project = project();
    let mut scanner = ScanOrchestrator::new(&project, ScanSettings::default());

    let outcome = scanner.scan_assets().unwrap();
    assert_eq!(
        outcome.errors.records().iter().map(|r| r.message()).collect::<Vec<_>>(),
        vec!["Missing Component in GameObject: Settings in Project".to_string()]
    );
}

#[test]
fn test_missing_templates_release_every_instance() {
    let project = project();
    let mut scanner = ScanOrchestrator::new(&project, ScanSettings::default());

    let outcome = scanner.scan_missing_templates().unwrap();
    assert_eq!(
        outcome.errors.messages(),
        &["Assets/Door.prefab\tMissing prefab Knob\t".to_string()]
    );
    assert_eq!(project.live_instances(), 0);
}

#[test]
fn test_missing_templates_progress_never_goes_backwards() {
    let project = project();
    let fractions = Fractions::default();
    let mut scanner =
        ScanOrchestrator::new(&project, ScanSettings::default()).with_progress(fractions.clone());

    scanner.scan_missing_templates().unwrap();

    let fractions = fractions.0.borrow();
    assert!(fractions.len() > 4);
    assert!(fractions.windows(2).all(|w| w[0] <= w[1] + 1e-5));
    assert!(fractions.iter().all(|&f| (0.0..=1.0).contains(&f)));
}

#[test]
fn test_scan_all_combines_templates_and_assets() {
    let project = project();
    let mut scanner = ScanOrchestrator::new(&project, ScanSettings::default());

    let outcome = scanner.scan_all().unwrap();
    assert_eq!(outcome.errors.len(), 2);
    assert_eq!(
        outcome.summary(),
        "Finished finding missing references.\n2 missing references were found."
    );
    assert_eq!(project.live_instances(), 0);
}

#[test]
fn test_everywhere_covers_all_build_scenes_then_assets() {
    let project = project();
    let fractions = Fractions::default();
    let mut scanner =
        ScanOrchestrator::new(&project, ScanSettings::default()).with_progress(fractions.clone());

    let outcome = scanner.scan_everywhere().unwrap();
    assert_eq!(outcome.errors.len(), 4);
    assert_eq!(outcome.skipped_roots, vec!["Assets/Scenes/Deleted.unity"]);

    let contexts: Vec<&str> = outcome.errors.records().iter().map(|r| r.context()).collect();
    assert_eq!(
        contexts,
        vec![
            "Assets/Scenes/Main.unity",
            "Assets/Scenes/Main.unity",
            "Assets/Scenes/Old.unity",
            "Project"
        ]
    );

    let fractions = fractions.0.borrow();
    assert!(!fractions.is_empty());
    assert!(fractions.windows(2).all(|w| w[0] <= w[1] + 1e-5));
    assert!(fractions.iter().all(|&f| (0.0..=1.0).contains(&f)));
}

#[test]
fn test_cancel_before_start_returns_empty_outcome() {
    let project = project();
    let token = CancelToken::new();
    token.cancel();
    let mut scanner =
        ScanOrchestrator::new(&project, ScanSettings::default()).with_cancel_token(token);

    let outcome = scanner.scan_all().unwrap();
    assert!(outcome.cancelled);
    assert!(outcome.errors.is_empty());
    assert_eq!(
        outcome.summary(),
        "Process cancelled.\n0 missing references were found."
    );
    assert_eq!(project.live_instances(), 0);
}

#[test]
fn test_cancel_mid_template_scan_releases_instance() {
    let project = project();
    let token = CancelToken::new();
    let mut scanner = ScanOrchestrator::new(&project, ScanSettings::default())
        .with_cancel_token(token.clone())
        .with_progress(CancelOnFirstReport(token));

    let outcome = scanner.scan_missing_templates().unwrap();
    assert!(outcome.cancelled);
    assert!(outcome.errors.is_empty());
    assert_eq!(project.live_instances(), 0);
}

#[test]
fn test_outfile_round_trip() {
    let project = project();
    let mut scanner = ScanOrchestrator::new(&project, ScanSettings::default());
    let outcome = scanner.scan_everywhere().unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.txt");
    write_report(&path, outcome.errors.messages()).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines = parse_report(&text).unwrap();
    assert_eq!(lines.len(), outcome.errors.len());
    // Scene objects have no asset path of their own.
    assert!(lines.contains(&ReportLine::MissingAttachment {
        asset_path: String::new(),
        full_path: "Camera".to_string(),
        root_asset_path: String::new(),
    }));
    assert!(lines.contains(&ReportLine::MissingAttachment {
        asset_path: "Assets/Settings/Broken.asset".to_string(),
        full_path: "Settings".to_string(),
        root_asset_path: "Assets/Settings/Broken.asset".to_string(),
    }));
}
