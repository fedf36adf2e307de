use std::sync::Arc;

use async_trait::async_trait;
use nodes::{PipelineTrigger, TriggerError};
use pipeline::{
    AccessToken, ControlApiError, Credentials, CritiqueFileName, ReportFileName, RunConf,
    RunSubmission, Timestamp, WorkflowControl, WorkflowId,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;

/// Records every call and answers with configurable outcomes.
#[derive(Default)]
struct RecordingControl {
    reject_auth: Option<(u16, &'static str)>,
    reject_submit: Option<(u16, &'static str)>,
    token_calls: Mutex<u32>,
    submissions: Mutex<Vec<(String, RunSubmission)>>,
}

#[async_trait]
impl WorkflowControl for RecordingControl {
    async fn issue_token(&self, credentials: &Credentials) -> Result<AccessToken, ControlApiError> {
        *self.token_calls.lock().await += 1;
        assert_eq!(credentials.username, "airflow");
        match self.reject_auth {
            Some((status, body)) => Err(ControlApiError::Rejected {
                status,
                body: body.to_string(),
            }),
            None => Ok(AccessToken::new("tok-1")),
        }
    }

    async fn submit_run(
        &self,
        token: &AccessToken,
        workflow: &WorkflowId,
        submission: &RunSubmission,
    ) -> Result<Value, ControlApiError> {
        assert_eq!(token.expose(), "tok-1");
        self.submissions
            .lock()
            .await
            .push((workflow.to_string(), submission.clone()));
        match self.reject_submit {
            Some((status, body)) => Err(ControlApiError::Rejected {
                status,
                body: body.to_string(),
            }),
            None => Ok(json!({
                "dag_run_id": submission.dag_run_id,
                "state": "queued"
            })),
        }
    }
}

fn trigger(control: Arc<RecordingControl>) -> PipelineTrigger {
    PipelineTrigger::new(
        control,
        Credentials {
            username: "airflow".to_string(),
            password: "airflow".to_string(),
        },
        WorkflowId::new("council_review_workflow").unwrap(),
    )
}

fn pinned_conf() -> RunConf {
    RunConf {
        report_file: ReportFileName::new("report_A.json"),
        critique_file: CritiqueFileName::new("analyst_review_draft_2026-10-19T10-15-30-000000Z.json"),
    }
}

#[tokio::test]
async fn given_valid_credentials_when_triggered_then_run_is_submitted_with_pinned_conf() {
    let control = Arc::new(RecordingControl::default());
    let before = Timestamp::now();

    let handle = trigger(control.clone())
        .trigger_run(pinned_conf())
        .await
        .expect("run submitted");

    let submissions = control.submissions.lock().await;
    assert_eq!(submissions.len(), 1);
    let (workflow, submission) = &submissions[0];
    assert_eq!(workflow, "council_review_workflow");
    assert_eq!(submission.dag_run_id, handle.run_id);
    assert_eq!(submission.conf, pinned_conf());
    assert!(handle.run_id.as_str().starts_with("run_"));
    assert_eq!(handle.metadata["state"], "queued");

    // Logical date is about thirty seconds ahead, in UTC with a Z suffix.
    assert!(handle.logical_date.ends_with('Z'));
    let logical = chrono::DateTime::parse_from_rfc3339(&handle.logical_date)
        .unwrap();
    let lead = logical
        .signed_duration_since(before.as_datetime())
        .num_seconds();
    assert!((29..=31).contains(&lead), "lead was {lead}s");
}

#[tokio::test]
async fn given_two_triggers_when_submitted_then_run_ids_differ() {
    let control = Arc::new(RecordingControl::default());
    let trigger = trigger(control);

    let first = trigger.trigger_run(RunConf::default()).await.unwrap();
    let second = trigger.trigger_run(RunConf::default()).await.unwrap();

    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn given_rejected_credentials_when_triggered_then_nothing_is_submitted() {
    let control = Arc::new(RecordingControl {
        reject_auth: Some((403, "Forbidden")),
        ..Default::default()
    });

    let err = trigger(control.clone())
        .trigger_run(pinned_conf())
        .await
        .unwrap_err();

    assert!(matches!(err, TriggerError::Authentication(_)));
    assert_eq!(err.status(), Some(403));
    assert!(err.to_string().contains("Forbidden"), "{err}");
    assert_eq!(*control.token_calls.lock().await, 1);
    assert!(control.submissions.lock().await.is_empty());
}

#[tokio::test]
async fn given_rejected_submission_when_triggered_then_status_and_run_id_are_reported() {
    let control = Arc::new(RecordingControl {
        reject_submit: Some((409, "DAGRun already exists")),
        ..Default::default()
    });

    let err = trigger(control.clone())
        .trigger_run(RunConf::default())
        .await
        .unwrap_err();

    let TriggerError::Submission { run_id, .. } = &err else {
        panic!("expected submission failure, got {err}");
    };
    let submissions = control.submissions.lock().await;
    assert_eq!(&submissions[0].1.dag_run_id, run_id);
    assert_eq!(err.status(), Some(409));
    assert!(err.to_string().contains("DAGRun already exists"));
}
