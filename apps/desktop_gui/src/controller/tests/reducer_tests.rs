use super::*;
use chrono::Utc;
use shared::{
    domain::{CaseId, PerceptionStrategy, ThoughtPhase},
    protocol::TestCase,
};

fn thought(phase: ThoughtPhase, detail: &str) -> ReasoningStep {
    ReasoningStep {
        phase,
        detail: detail.to_string(),
        strategy: None,
    }
}

fn connected_session() -> Session {
    let mut session = Session::default();
    session.apply_connection(ConnectionState::Connected);
    session
}

#[test]
fn submit_opens_user_entry_and_agent_placeholder() {
    let mut session = connected_session();
    session.submit_user_request("go to example.com").expect("submit");

    let entries = session.log.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].role, Role::User);
    assert_eq!(entries[0].content, "go to example.com");
    assert_eq!(entries[1].role, Role::Agent);
    assert!(entries[1].in_progress);
    assert_eq!(session.processing, ProcessingStatus::Running);
}

#[test]
fn thoughts_then_response_collapse_into_one_closed_entry() {
    let mut session = connected_session();
    session.submit_user_request("log in as admin").expect("submit");

    session.apply_engine_event(EngineEvent::AgentThought(thought(
        ThoughtPhase::Plan,
        "find the login form",
    )));
    session.apply_engine_event(EngineEvent::AgentThought(thought(
        ThoughtPhase::Act,
        "click the submit button",
    )));
    session.apply_engine_event(EngineEvent::Response {
        data: "logged in".to_string(),
    });

    let entries = session.log.entries();
    assert_eq!(entries.len(), 2);
    let agent = &entries[1];
    assert!(!agent.in_progress);
    assert_eq!(agent.content, "logged in");
    assert_eq!(agent.thoughts.len(), 2);
    assert_eq!(agent.thoughts[0].detail, "find the login form");
    assert!(!session.log.has_open_entry());
}

#[test]
fn response_without_open_entry_lands_as_closed_entry() {
    let mut session = connected_session();
    session.apply_engine_event(EngineEvent::Response {
        data: "unsolicited result".to_string(),
    });

    let entries = session.log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].role, Role::Agent);
    assert!(!entries[0].in_progress);
    assert!(entries[0].thoughts.is_empty());
}

#[test]
fn late_thought_opens_a_new_entry() {
    let mut session = connected_session();
    session.submit_user_request("first task").expect("submit");
    session.apply_engine_event(EngineEvent::Response {
        data: "done".to_string(),
    });

    session.apply_engine_event(EngineEvent::AgentThought(thought(
        ThoughtPhase::Execute,
        "retrying navigation",
    )));

    let entries = session.log.entries();
    assert_eq!(entries.len(), 3);
    assert!(entries[2].in_progress);
    assert_eq!(entries[2].thoughts.len(), 1);
    assert!(session.log.has_open_entry());
}

#[test]
fn disconnect_forces_idle_and_leaves_entry_open() {
    let mut session = connected_session();
    session.submit_user_request("run checkout flow").expect("submit");
    session.apply_engine_event(EngineEvent::AgentThought(thought(
        ThoughtPhase::Plan,
        "open the cart",
    )));

    session.apply_connection(ConnectionState::Disconnected);

    assert_eq!(session.processing, ProcessingStatus::Idle);
    assert!(session.log.has_open_entry());
    assert!(session.log.entries()[1].in_progress);
    assert!(!session.can_submit());
}

#[test]
fn submit_rejected_while_running_leaves_log_untouched() {
    let mut session = connected_session();
    session.submit_user_request("first").expect("submit");

    let err = session.submit_user_request("second").unwrap_err();
    assert_eq!(err, CommandRejected::TaskRunning);
    assert_eq!(session.log.entries().len(), 2);
}

#[test]
fn submit_guards_reject_disconnected_and_blank() {
    let mut session = Session::default();
    assert_eq!(
        session.submit_user_request("anything").unwrap_err(),
        CommandRejected::NotConnected
    );

    session.apply_connection(ConnectionState::Connected);
    assert_eq!(
        session.submit_user_request("   ").unwrap_err(),
        CommandRejected::EmptyRequest
    );
    assert!(session.log.entries().is_empty());
    assert_eq!(session.processing, ProcessingStatus::Idle);
}

#[test]
fn user_prompts_preserve_submission_order() {
    let mut session = connected_session();
    session.submit_user_request("A").expect("submit A");
    session.apply_engine_event(EngineEvent::Response {
        data: "ok".to_string(),
    });
    session.apply_engine_event(EngineEvent::ProcessingState {
        status: ProcessingStatus::Idle,
    });
    session.submit_user_request("B").expect("submit B");

    assert_eq!(session.log.user_prompts(), vec!["A", "B"]);
}

#[test]
fn engine_idle_event_reopens_submission() {
    let mut session = connected_session();
    session.submit_user_request("task").expect("submit");
    assert!(!session.can_submit());

    session.apply_engine_event(EngineEvent::ProcessingState {
        status: ProcessingStatus::Idle,
    });
    assert!(session.can_submit());
}

#[test]
fn snapshot_keeps_only_latest_frame() {
    let mut session = connected_session();
    session.apply_engine_event(EngineEvent::BrowserSnapshot {
        image: "frame-one".to_string(),
    });
    session.apply_engine_event(EngineEvent::BrowserSnapshot {
        image: "frame-two".to_string(),
    });

    let frame = session.latest_snapshot.as_ref().expect("snapshot");
    assert_eq!(frame.image_b64, "frame-two");
    assert_eq!(session.snapshot_revision, 2);
}

#[test]
fn device_preset_changes_only_on_engine_ack() {
    let mut session = connected_session();
    session.pending_preset = Some("iphone-14-pro".to_string());
    assert_eq!(session.device_preset, "desktop");

    let notice = session.apply_engine_event(EngineEvent::ConfigUpdated {
        preset: "iphone-14-pro".to_string(),
    });
    assert_eq!(session.device_preset, "iphone-14-pro");
    assert!(session.pending_preset.is_none());
    assert!(notice.expect("notice").contains("iphone-14-pro"));
}

#[test]
fn submission_failure_rolls_back_and_annotates_placeholder() {
    let mut session = connected_session();
    session.submit_user_request("task").expect("submit");

    session.submission_failed("not connected to the engine");

    assert_eq!(session.processing, ProcessingStatus::Idle);
    assert!(!session.log.has_open_entry());
    let agent = &session.log.entries()[1];
    assert!(agent.content.contains("not connected to the engine"));
}

#[test]
fn strategy_tagged_thoughts_are_preserved() {
    let mut session = connected_session();
    session.submit_user_request("inspect the page").expect("submit");
    session.apply_engine_event(EngineEvent::AgentThought(ReasoningStep {
        phase: ThoughtPhase::Execute,
        detail: "falling back to screenshot analysis".to_string(),
        strategy: Some(PerceptionStrategy::Visual),
    }));

    let agent = &session.log.entries()[1];
    assert_eq!(agent.thoughts[0].strategy, Some(PerceptionStrategy::Visual));
}

#[test]
fn cases_list_replaces_library_and_save_emits_notice() {
    let mut session = connected_session();
    let notice = session.apply_engine_event(EngineEvent::SaveCaseSuccess {
        name: "checkout flow".to_string(),
        id: Some(CaseId(3)),
    });
    assert!(notice.expect("notice").contains("checkout flow"));

    session.apply_engine_event(EngineEvent::CasesList(vec![TestCase {
        id: CaseId(3),
        name: "checkout flow".to_string(),
        description: String::new(),
        prompts: vec!["add to cart".to_string()],
        created_at: Utc::now(),
    }]));
    assert_eq!(session.cases.len(), 1);
    assert_eq!(session.cases[0].name, "checkout flow");
}

#[test]
fn replay_claims_processing_like_a_submission() {
    let mut session = connected_session();
    session.begin_replay().expect("replay");
    assert_eq!(session.processing, ProcessingStatus::Running);
    assert!(!session.can_submit());
    assert_eq!(
        session.submit_user_request("another task").unwrap_err(),
        CommandRejected::TaskRunning
    );
    assert_eq!(session.begin_replay().unwrap_err(), CommandRejected::TaskRunning);

    session.submission_failed("engine link is not connected");
    assert_eq!(session.processing, ProcessingStatus::Idle);
}

#[test]
fn replay_rejected_while_disconnected() {
    let mut session = Session::default();
    assert_eq!(
        session.begin_replay().unwrap_err(),
        CommandRejected::NotConnected
    );
    assert_eq!(session.processing, ProcessingStatus::Idle);
}

#[test]
fn report_generated_yields_status_notice() {
    let mut session = connected_session();
    let notice = session.apply_engine_event(EngineEvent::ReportGenerated);
    assert!(notice.is_some());
}
