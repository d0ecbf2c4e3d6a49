mod common;

use case_status_scout::error::{SearchError, TransportError};
use case_status_scout::models::{SearchQuery, SearchType};
use case_status_scout::services::SearchExecutor;
use common::*;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn kumar_query() -> SearchQuery {
    SearchQuery::new("DL", "CC1", SearchType::PartyName, "kumar", "2024")
}

fn executor(portal: &Arc<ScriptedPortal>, captcha: &ScriptedCaptcha) -> SearchExecutor<ScriptedPortal> {
    SearchExecutor::new(portal.clone(), captcha.resolver.clone(), fast_policy())
}

fn field<'a>(form: &'a [(&'static str, String)], name: &str) -> &'a str {
    form.iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.as_str())
        .unwrap_or_else(|| panic!("表单缺少字段 {}", name))
}

#[tokio::test]
async fn test_end_to_end_kumar_search() {
    let portal = Arc::new(ScriptedPortal::with_pages(vec![results_table(&[
        ["W.P.(C) 1/2024", "Kumar vs State", "12-01-2025", "Pending"],
        ["CRL.A. 7/2024", "R. Kumar vs NCT", "", "Disposed"],
    ])]));
    let captcha = ScriptedCaptcha::answering(Some("aB3d"));

    let records = executor(&portal, &captcha)
        .execute(&kumar_query(), &tokens("abc"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].case_number, "W.P.(C) 1/2024");
    assert_eq!(records[0].party_names, "Kumar vs State");
    assert_eq!(records[0].next_hearing_date, "12-01-2025");
    assert!(records[0].next_hearing_on.is_some());
    assert_eq!(records[1].status, "Disposed");
    assert_eq!(records[1].next_hearing_on, None);
    for record in &records {
        assert_eq!(record.court_code, "DL");
        assert_eq!(record.bench_code, "CC1");
        assert_eq!(record.search_type, SearchType::PartyName);
        assert_eq!(record.query_text, "kumar");
    }

    let forms = portal.forms();
    assert_eq!(forms.len(), 1);
    assert_eq!(field(&forms[0], "state_code"), "DL");
    assert_eq!(field(&forms[0], "court_complex_code"), "CC1");
    assert_eq!(field(&forms[0], "caseStatusSearchType"), "CSpartyName");
    assert_eq!(field(&forms[0], "captcha"), "aB3d");
    assert_eq!(field(&forms[0], "petres_name"), "kumar");
    assert_eq!(field(&forms[0], "caseNo"), "");
    assert_eq!(field(&forms[0], "rgyear"), "2024");
    assert_eq!(portal.submitted_sessions(), vec!["PHPSESSID=abc".to_string()]);
}

#[tokio::test]
async fn test_header_only_table_is_empty_success() {
    let portal = Arc::new(ScriptedPortal::with_pages(vec![results_table(&[])]));
    let captcha = ScriptedCaptcha::answering(Some("wxyz"));

    let records = executor(&portal, &captcha)
        .execute(&kumar_query(), &tokens("abc"), &CancellationToken::new())
        .await
        .unwrap();

    assert!(records.is_empty());
    assert_eq!(portal.fetch_count(), 1);
    assert_eq!(portal.submit_count(), 1);
}

#[tokio::test]
async fn test_missing_table_then_present_on_third_attempt() {
    let portal = Arc::new(ScriptedPortal::with_pages(vec![
        no_table_page(),
        no_table_page(),
        results_table(&[["O.A. 3/2024", "Kumar vs Union", "05-03-2025", "Pending"]]),
    ]));
    let captcha = ScriptedCaptcha::answering(Some("wxyz"));

    let records = executor(&portal, &captcha)
        .execute(&kumar_query(), &tokens("abc"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].case_number, "O.A. 3/2024");
    assert_eq!(portal.submit_count(), 3);
}

#[tokio::test]
async fn test_every_attempt_uses_a_fresh_challenge() {
    let portal = Arc::new(ScriptedPortal::with_pages(vec![
        no_table_page(),
        "<p>Invalid Captcha</p>".to_string(),
        results_table(&[]),
    ]));
    let captcha = ScriptedCaptcha::answering(Some("wxyz"));

    executor(&portal, &captcha)
        .execute(&kumar_query(), &tokens("abc"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(portal.fetch_count(), 3);
    assert_eq!(captcha.call_count(), 3);
    let images = captcha.images.lock().unwrap().clone();
    assert_eq!(
        images,
        vec![
            b"captcha-image-1".to_vec(),
            b"captcha-image-2".to_vec(),
            b"captcha-image-3".to_vec(),
        ]
    );
}

#[tokio::test]
async fn test_unresolved_captcha_stops_after_one_cycle() {
    let portal = Arc::new(ScriptedPortal::with_pages(vec![results_table(&[])]));
    let captcha = ScriptedCaptcha::answering(None);

    let result = executor(&portal, &captcha)
        .execute(&kumar_query(), &tokens("abc"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SearchError::CaptchaUnresolved)));
    assert_eq!(portal.fetch_count(), 1);
    assert_eq!(captcha.call_count(), 1);
    assert_eq!(portal.submit_count(), 0);
}

#[tokio::test]
async fn test_exhausted_parse_attempts() {
    let portal = Arc::new(ScriptedPortal::new());
    let captcha = ScriptedCaptcha::answering(Some("wxyz"));

    let result = executor(&portal, &captcha)
        .execute(&kumar_query(), &tokens("abc"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SearchError::ParseAnomaly { attempts: 3 })));
    assert_eq!(portal.fetch_count(), 3);
}

#[tokio::test]
async fn test_rejected_captcha_on_every_attempt() {
    let rejected = "<script>alert('Invalid Captcha')</script>".to_string();
    let portal = Arc::new(ScriptedPortal::with_pages(vec![rejected.clone(), rejected.clone(), rejected]));
    let captcha = ScriptedCaptcha::answering(Some("wxyz"));

    let result = executor(&portal, &captcha)
        .execute(&kumar_query(), &tokens("abc"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SearchError::CaptchaRejected { attempts: 3 })));
}

#[tokio::test]
async fn test_challenge_failure_is_retried() {
    let portal = Arc::new(ScriptedPortal::with_pages(vec![results_table(&[[
        "C.R. 9/2024",
        "Kumar vs Rao",
        "",
        "Pending",
    ]])]));
    portal.push_challenge(Err(bad_gateway()));
    let captcha = ScriptedCaptcha::answering(Some("wxyz"));

    let records = executor(&portal, &captcha)
        .execute(&kumar_query(), &tokens("abc"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(portal.fetch_count(), 2);
    assert_eq!(portal.submit_count(), 1);
}

#[tokio::test]
async fn test_transport_errors_exhaust_budget() {
    let portal = Arc::new(ScriptedPortal::new());
    for _ in 0..3 {
        portal.push_submission(Err(bad_gateway()));
    }
    let captcha = ScriptedCaptcha::answering(Some("wxyz"));

    let result = executor(&portal, &captcha)
        .execute(&kumar_query(), &tokens("abc"), &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(SearchError::Transport(TransportError::BadStatus { status: 502, .. }))
    ));
    assert_eq!(portal.submit_count(), 3);
}

#[tokio::test]
async fn test_consecutive_forbidden_means_session_expired() {
    let portal = Arc::new(ScriptedPortal::new());
    portal.push_submission(Err(forbidden()));
    portal.push_submission(Err(forbidden()));
    let captcha = ScriptedCaptcha::answering(Some("wxyz"));

    let result = executor(&portal, &captcha)
        .execute(&kumar_query(), &tokens("abc"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SearchError::SessionExpired)));
    assert_eq!(portal.submit_count(), 2);
}

#[tokio::test]
async fn test_session_timeout_page_means_session_expired() {
    let expired = "<h3>Session has expired, please reload the page</h3>".to_string();
    let portal = Arc::new(ScriptedPortal::with_pages(vec![expired.clone(), expired]));
    let captcha = ScriptedCaptcha::answering(Some("wxyz"));

    let result = executor(&portal, &captcha)
        .execute(&kumar_query(), &tokens("abc"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SearchError::SessionExpired)));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let portal = Arc::new(ScriptedPortal::with_pages(vec![results_table(&[])]));
    let captcha = ScriptedCaptcha::answering(Some("wxyz"));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = executor(&portal, &captcha)
        .execute(&kumar_query(), &tokens("abc"), &cancel)
        .await;

    assert!(matches!(result, Err(SearchError::Cancelled)));
    assert_eq!(portal.submit_count(), 0);
}
