// tests/pipeline.rs
use labflow::{
    DeckState, ErrorKind, Job, JobManager, JobStatus, LabflowError, Step, Transfer, compile,
    simulate, validate,
};
use serde_json::json;

fn deck() -> DeckState {
    DeckState::with_labware(["S1", "D1"])
}

#[test]
fn transfer_job_end_to_end() {
    let job: Job = serde_json::from_value(json!({
        "version": "1.0",
        "job_id": "job-e2e",
        "name": "Transfer 50 uL from plate S1 A1 to plate D1 B1",
        "steps": [{
            "id": "s1",
            "op": "transfer",
            "args": {
                "source_labware": "S1",
                "source_well": "A1",
                "dest_labware": "D1",
                "dest_well": "B1",
                "volume_uL": 50.0
            },
            "preconditions": ["robot.homed == true", "tip.attached == true"]
        }],
        "constraints": {"require_homed": true}
    }))
    .unwrap();

    let mut manager = JobManager::new(deck());
    let id = manager.submit(job).unwrap();
    assert_eq!(manager.status(&id), Some(JobStatus::Pending));

    let output = manager.run_next().unwrap();
    assert_eq!(
        output.records,
        vec!["A;S1;;;1;;50.00;Water;;;", "D;D1;;;2;;50.00;Water;;;"]
    );
    assert_eq!(output.state.volumes("S1").unwrap()[0], -50.0);
    assert_eq!(output.state.volumes("D1").unwrap()[1], 50.0);
    assert_eq!(manager.status(&id), Some(JobStatus::Completed));
}

#[test]
fn full_demo_job_compiles_in_order() {
    let job = Job::new(
        "demo",
        vec![
            Step::transfer("s1", Transfer::new("S1", "A1", "D1", "B1", 50.0)),
            Step::wash("s2", 1),
            Step::decontaminate("s3"),
        ],
    );
    assert!(validate(&job, &deck(), 1000.0).is_empty());
    assert_eq!(
        compile(&job).unwrap(),
        vec![
            "A;S1;;;1;;50.00;Water;;;",
            "D;D1;;;2;;50.00;Water;;;",
            "W1;",
            "WD;"
        ]
    );
    let state = simulate(&job, None).unwrap();
    assert_eq!(state.len(), 2);
}

#[test]
fn three_invalid_steps_report_in_step_order() {
    let job = Job::new(
        "bad",
        vec![
            Step::transfer("s1", Transfer::new("X1", "A1", "D1", "B1", 10.0)),
            Step::unknown("s2", "centrifuge"),
            Step::transfer("s3", Transfer::new("S1", "A1", "D1", "B1", 1500.0)),
        ],
    );

    let mut manager = JobManager::new(deck());
    let err = manager.submit(job).unwrap_err();
    let LabflowError::Validation(failure) = &err else {
        panic!("expected validation failure, got {err:?}");
    };

    let summary: Vec<_> = failure
        .errors
        .iter()
        .map(|e| (e.step_id.as_str(), e.kind))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("s1", ErrorKind::LabwareNotFound),
            ("s2", ErrorKind::UnknownOperation),
            ("s3", ErrorKind::VolumeOutOfRange),
        ]
    );
    assert!(err.to_string().contains("s2: UnknownOperation - Unknown op: centrifuge"));
    assert_eq!(manager.queue_len(), 0);
    assert_eq!(manager.status("bad"), None);
}

#[test]
fn aborted_job_never_runs() {
    let mut manager = JobManager::new(deck());
    let first = manager
        .submit(Job::new("first", vec![Step::wash("s1", 3)]))
        .unwrap();
    let second = manager
        .submit(Job::new("second", vec![Step::decontaminate("s1")]))
        .unwrap();

    manager.pause(&first);
    assert_eq!(manager.status(&first), Some(JobStatus::Pending));

    manager.abort(&first);
    assert_eq!(manager.status(&first), Some(JobStatus::Aborted));

    let output = manager.run_next().unwrap();
    assert_eq!(output.job_id, second);
    assert_eq!(output.records, vec!["WD;"]);
    assert!(matches!(manager.run_next(), Err(LabflowError::EmptyQueue)));
    assert_eq!(manager.status(&first), Some(JobStatus::Aborted));
    assert_eq!(manager.status("never-submitted"), None);
}
