mod common;

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use common::{MemoryStore, RecordingNotifier};
use recruitment_platform::dto::application_dto::{
    BulkStatusPayload, MakeOfferPayload, ScheduleInterviewPayload, StatusChangePayload,
};
use recruitment_platform::error::Error;
use recruitment_platform::models::application::ApplicationStatus;
use recruitment_platform::models::job::JobStatus;
use recruitment_platform::services::application_store::NewApplication;
use recruitment_platform::services::application_workflow::ApplicationWorkflow;

fn workflow() -> (ApplicationWorkflow<MemoryStore>, MemoryStore, Arc<RecordingNotifier>) {
    let store = MemoryStore::default();
    let notifier = Arc::new(RecordingNotifier::default());
    let workflow = ApplicationWorkflow::new(store.clone(), notifier.clone());
    (workflow, store, notifier)
}

fn offer(salary: i64) -> MakeOfferPayload {
    MakeOfferPayload {
        offer_salary: Decimal::new(salary, 0),
        offer_currency: "usd".to_string(),
        offer_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        offer_expiry_date: NaiveDate::from_ymd_opt(2024, 3, 15),
        notify_candidate: true,
        expected_version: None,
    }
}

fn draft() -> NewApplication {
    NewApplication {
        cover_letter: Some("I would like to join".to_string()),
        cv_url: None,
        source: Some("website".to_string()),
    }
}

#[tokio::test]
async fn submission_writes_one_history_row_and_counts_the_application() {
    let (workflow, store, notifier) = workflow();
    let job = store.add_job(JobStatus::Open, 1);
    let candidate = store.add_candidate();

    let submission = workflow
        .create(job.id, candidate, draft(), Uuid::new_v4())
        .await
        .unwrap();

    assert!(submission.created);
    assert_eq!(submission.application.status, ApplicationStatus::Submitted);
    assert_eq!(
        store.history_for(submission.application.id),
        vec![ApplicationStatus::Submitted]
    );
    assert_eq!(store.snapshot().application_counts[&job.id], 1);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn duplicate_submission_returns_the_existing_application() {
    let (workflow, store, notifier) = workflow();
    let job = store.add_job(JobStatus::Open, 1);
    let candidate = store.add_candidate();
    let actor = Uuid::new_v4();

    let first = workflow.create(job.id, candidate, draft(), actor).await.unwrap();
    let second = workflow.create(job.id, candidate, draft(), actor).await.unwrap();

    assert!(!second.created);
    assert_eq!(second.application.id, first.application.id);
    assert_eq!(store.history_for(first.application.id).len(), 1);
    assert_eq!(store.snapshot().application_counts[&job.id], 1);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn closed_job_refuses_applications() {
    let (workflow, store, _) = workflow();
    let job = store.add_job(JobStatus::Closed, 1);
    let candidate = store.add_candidate();

    let err = workflow
        .create(job.id, candidate, draft(), Uuid::new_v4())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidState(_)));
    assert!(store.snapshot().applications.is_empty());
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let (workflow, store, _) = workflow();
    let candidate = store.add_candidate();

    let err = workflow
        .create(Uuid::new_v4(), candidate, draft(), Uuid::new_v4())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn hiring_the_last_position_fills_the_job() {
    let (workflow, store, _) = workflow();
    let job = store.add_job(JobStatus::Open, 1);
    let candidate = store.add_candidate();
    let actor = Uuid::new_v4();
    let id = workflow
        .create(job.id, candidate, draft(), actor)
        .await
        .unwrap()
        .application
        .id;

    let path = [
        ApplicationStatus::UnderReview,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::OfferMade,
        ApplicationStatus::Hired,
    ];
    for status in path {
        workflow
            .change_status(id, StatusChangePayload::to(status), actor)
            .await
            .unwrap();
    }

    let history = store.history_for(id);
    assert_eq!(history.len(), path.len() + 1);
    assert_eq!(history.first(), Some(&ApplicationStatus::Submitted));
    assert_eq!(history.last(), Some(&ApplicationStatus::Hired));

    let snapshot = store.snapshot();
    assert_eq!(snapshot.jobs[&job.id].status, JobStatus::Filled);
    assert_eq!(snapshot.filled.len(), 1);
    assert_eq!(snapshot.filled[0].job_id, job.id);
}

#[tokio::test]
async fn job_with_open_positions_left_stays_open_after_a_hire() {
    let (workflow, store, _) = workflow();
    let job = store.add_job(JobStatus::Open, 2);
    let candidate = store.add_candidate();
    let actor = Uuid::new_v4();
    let id = workflow
        .create(job.id, candidate, draft(), actor)
        .await
        .unwrap()
        .application
        .id;

    workflow
        .change_status(id, StatusChangePayload::to(ApplicationStatus::OfferMade), actor)
        .await
        .unwrap();
    workflow
        .change_status(id, StatusChangePayload::to(ApplicationStatus::Hired), actor)
        .await
        .unwrap();

    assert_eq!(store.snapshot().jobs[&job.id].status, JobStatus::Open);
}

#[tokio::test]
async fn rejection_is_reachable_from_every_open_status() {
    let open_statuses = [
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::PresentedToEmployer,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::OfferMade,
    ];
    for start in open_statuses {
        let (workflow, store, _) = workflow();
        let job = store.add_job(JobStatus::Open, 1);
        let candidate = store.add_candidate();
        let actor = Uuid::new_v4();
        let id = workflow
            .create(job.id, candidate, draft(), actor)
            .await
            .unwrap()
            .application
            .id;
        if start != ApplicationStatus::Submitted {
            workflow
                .change_status(id, StatusChangePayload::to(start), actor)
                .await
                .unwrap();
        }

        let mut reject = StatusChangePayload::to(ApplicationStatus::Rejected);
        reject.rejection_reason = Some("Position requirements changed".to_string());
        let rejected = workflow.change_status(id, reject, actor).await.unwrap();

        assert_eq!(rejected.status, ApplicationStatus::Rejected, "from {}", start);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("Position requirements changed")
        );
    }
}

#[tokio::test]
async fn terminal_and_backward_moves_are_refused() {
    let (workflow, store, _) = workflow();
    let job = store.add_job(JobStatus::Open, 3);
    let candidate = store.add_candidate();
    let actor = Uuid::new_v4();
    let id = workflow
        .create(job.id, candidate, draft(), actor)
        .await
        .unwrap()
        .application
        .id;

    workflow
        .change_status(id, StatusChangePayload::to(ApplicationStatus::InterviewScheduled), actor)
        .await
        .unwrap();
    let backward = workflow
        .change_status(id, StatusChangePayload::to(ApplicationStatus::UnderReview), actor)
        .await
        .unwrap_err();
    assert!(matches!(backward, Error::InvalidState(_)));

    workflow
        .change_status(id, StatusChangePayload::to(ApplicationStatus::Rejected), actor)
        .await
        .unwrap();
    let after_terminal = workflow
        .change_status(id, StatusChangePayload::to(ApplicationStatus::OfferMade), actor)
        .await
        .unwrap_err();
    assert!(matches!(after_terminal, Error::InvalidState(_)));

    assert_eq!(store.history_for(id).len(), 3);
}

#[tokio::test]
async fn stale_version_is_refused_without_writing() {
    let (workflow, store, notifier) = workflow();
    let job = store.add_job(JobStatus::Open, 1);
    let candidate = store.add_candidate();
    let actor = Uuid::new_v4();
    let application = workflow
        .create(job.id, candidate, draft(), actor)
        .await
        .unwrap()
        .application;
    let read_version = application.version;

    let mut first = StatusChangePayload::to(ApplicationStatus::UnderReview);
    first.expected_version = Some(read_version);
    workflow.change_status(application.id, first, actor).await.unwrap();

    let mut second = StatusChangePayload::to(ApplicationStatus::Rejected);
    second.expected_version = Some(read_version);
    let err = workflow
        .change_status(application.id, second, actor)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::StaleVersion { expected, actual } if expected == read_version && actual == read_version + 1
    ));
    assert_eq!(store.history_for(application.id).len(), 2);
    assert_eq!(
        store.snapshot().applications[&application.id].status,
        ApplicationStatus::UnderReview
    );
    assert_eq!(notifier.count(), 2);
}

#[tokio::test]
async fn scheduling_an_interview_for_a_missing_application_is_none() {
    let (workflow, _, notifier) = workflow();
    let payload = ScheduleInterviewPayload {
        interview_date: Utc::now() + Duration::days(3),
        interview_type: "video".to_string(),
        interview_location: None,
        notify_candidate: true,
        expected_version: None,
    };

    let outcome = workflow
        .schedule_interview(Uuid::new_v4(), payload, Uuid::new_v4())
        .await
        .unwrap();

    assert!(outcome.is_none());
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn scheduling_an_interview_records_its_details() {
    let (workflow, store, _) = workflow();
    let job = store.add_job(JobStatus::Open, 1);
    let candidate = store.add_candidate();
    let actor = Uuid::new_v4();
    let id = workflow
        .create(job.id, candidate, draft(), actor)
        .await
        .unwrap()
        .application
        .id;
    let when = Utc::now() + Duration::days(2);

    let application = workflow
        .schedule_interview(
            id,
            ScheduleInterviewPayload {
                interview_date: when,
                interview_type: "onsite".to_string(),
                interview_location: Some("Head office".to_string()),
                notify_candidate: false,
                expected_version: None,
            },
            actor,
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(application.status, ApplicationStatus::InterviewScheduled);
    assert_eq!(application.interview_date, Some(when));
    assert_eq!(application.interview_location.as_deref(), Some("Head office"));
}

#[tokio::test]
async fn bulk_change_reports_each_application_separately() {
    let (workflow, store, _) = workflow();
    let job = store.add_job(JobStatus::Open, 5);
    let actor = Uuid::new_v4();
    let first = workflow
        .create(job.id, store.add_candidate(), draft(), actor)
        .await
        .unwrap()
        .application
        .id;
    let second = workflow
        .create(job.id, store.add_candidate(), draft(), actor)
        .await
        .unwrap()
        .application
        .id;
    let missing = Uuid::new_v4();

    let outcome = workflow
        .bulk_change_status(
            BulkStatusPayload {
                application_ids: vec![first, missing, second],
                status: ApplicationStatus::UnderReview,
                comment: Some("Screening".to_string()),
                notify_candidate: false,
                notify_employer: false,
            },
            actor,
        )
        .await;

    assert_eq!(outcome.updated, vec![first, second]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].id, missing);
}

#[tokio::test]
async fn repeat_application_after_the_job_fills_returns_the_original() {
    let (workflow, store, _) = workflow();
    let job = store.add_job(JobStatus::Open, 1);
    let candidate = store.add_candidate();
    let actor = Uuid::new_v4();
    let first = workflow
        .create(job.id, candidate, draft(), actor)
        .await
        .unwrap()
        .application;
    workflow
        .change_status(first.id, StatusChangePayload::to(ApplicationStatus::Hired), actor)
        .await
        .unwrap();
    assert_eq!(store.snapshot().jobs[&job.id].status, JobStatus::Filled);

    let again = workflow.create(job.id, candidate, draft(), actor).await.unwrap();

    assert!(!again.created);
    assert_eq!(again.application.id, first.id);
    assert_eq!(again.application.status, ApplicationStatus::Hired);
    assert_eq!(store.history_for(first.id).len(), 2);
}

#[tokio::test]
async fn making_an_offer_records_its_terms() {
    let (workflow, store, notifier) = workflow();
    let job = store.add_job(JobStatus::Open, 1);
    let candidate = store.add_candidate();
    let actor = Uuid::new_v4();
    let id = workflow
        .create(job.id, candidate, draft(), actor)
        .await
        .unwrap()
        .application
        .id;

    let application = workflow
        .make_offer(id, offer(90_000), actor)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(application.status, ApplicationStatus::OfferMade);
    assert_eq!(application.offer_salary, Some(Decimal::new(90_000, 0)));
    assert_eq!(application.offer_currency.as_deref(), Some("USD"));
    assert_eq!(application.offer_date, NaiveDate::from_ymd_opt(2024, 3, 1));
    assert_eq!(application.offer_expiry_date, NaiveDate::from_ymd_opt(2024, 3, 15));
    assert_eq!(
        store.history_for(id),
        vec![ApplicationStatus::Submitted, ApplicationStatus::OfferMade]
    );
    assert_eq!(notifier.count(), 2);
}

#[tokio::test]
async fn offer_expiring_before_it_is_made_is_refused() {
    let (workflow, store, _) = workflow();
    let job = store.add_job(JobStatus::Open, 1);
    let candidate = store.add_candidate();
    let actor = Uuid::new_v4();
    let id = workflow
        .create(job.id, candidate, draft(), actor)
        .await
        .unwrap()
        .application
        .id;
    let mut payload = offer(90_000);
    payload.offer_expiry_date = NaiveDate::from_ymd_opt(2024, 2, 1);

    let err = workflow.make_offer(id, payload, actor).await.unwrap_err();

    assert!(matches!(err, Error::BadRequest(_)));
    assert_eq!(
        store.snapshot().applications[&id].status,
        ApplicationStatus::Submitted
    );
    assert_eq!(store.history_for(id).len(), 1);
}

#[tokio::test]
async fn making_an_offer_on_a_missing_application_is_none() {
    let (workflow, store, notifier) = workflow();

    let outcome = workflow
        .make_offer(Uuid::new_v4(), offer(90_000), Uuid::new_v4())
        .await
        .unwrap();

    assert!(outcome.is_none());
    assert!(store.snapshot().history.is_empty());
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn hire_credits_the_job_consultant_with_the_offer_salary() {
    let (workflow, store, _) = workflow();
    let job = store.add_job(JobStatus::Open, 1);
    let consultant = Uuid::new_v4();
    store.assign_consultant(job.id, consultant);
    let candidate = store.add_candidate();
    let actor = Uuid::new_v4();
    let id = workflow
        .create(job.id, candidate, draft(), actor)
        .await
        .unwrap()
        .application
        .id;

    workflow.make_offer(id, offer(75_000), actor).await.unwrap();
    workflow
        .change_status(id, StatusChangePayload::to(ApplicationStatus::Hired), actor)
        .await
        .unwrap();

    let snapshot = store.snapshot();
    assert_eq!(
        snapshot.placements,
        vec![(consultant, Some(Decimal::new(75_000, 0)))]
    );
    assert_eq!(snapshot.filled.len(), 1);
    assert_eq!(snapshot.filled[0].consultant_id, Some(consultant));
    assert!(snapshot.filled[0].time_to_fill.is_some_and(|days| days > 0));
}
