//! Contract Test: Route 53 Wire Behavior
//!
//! Runs the store against a local HTTP server standing in for Route 53.
//!
//! Constraints verified:
//! - Fetch is one signed, filtered list request
//! - A neighbouring record set is never mistaken for the requested one
//! - Upsert is one signed request carrying exactly one UPSERT change
//! - Dry-run never sends a change
//! - HTTP and Route 53 error codes map to the right error kinds
//! - A live upsert adds no info-level line of its own

use dnsagg_core::traits::{RecordSet, RecordStore, UpsertResult};
use dnsagg_core::{Error, ErrorKind, RecordType};
use dnsagg_provider_route53::{Credentials, Route53RecordStore};
use std::io;
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ZONE: &str = "Z0TESTZONE";
const RRSET_PATH: &str = "/2013-04-01/hostedzone/Z0TESTZONE/rrset";

fn credentials(session_token: Option<&str>) -> Credentials {
    Credentials {
        access_key_id: "AKIDEXAMPLE".to_string(),
        secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
        session_token: session_token.map(str::to_string),
    }
}

fn store(server: &MockServer, dry_run: bool) -> Route53RecordStore {
    Route53RecordStore::new(credentials(None), "us-east-1", Some(&server.uri()), dry_run)
        .expect("store construction succeeds")
}

fn list_body(name: &str, record_type: &str, values: &[&str]) -> String {
    let records: String = values
        .iter()
        .map(|v| format!("<ResourceRecord><Value>{}</Value></ResourceRecord>", v))
        .collect();
    format!(
        r#"<?xml version="1.0"?>
<ListResourceRecordSetsResponse xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
  <ResourceRecordSets>
    <ResourceRecordSet>
      <Name>{}</Name>
      <Type>{}</Type>
      <TTL>60</TTL>
      <ResourceRecords>{}</ResourceRecords>
    </ResourceRecordSet>
  </ResourceRecordSets>
  <IsTruncated>true</IsTruncated>
  <MaxItems>1</MaxItems>
</ListResourceRecordSetsResponse>"#,
        name, record_type, records
    )
}

fn error_body(code: &str, message: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<ErrorResponse xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
  <Error><Type>Sender</Type><Code>{}</Code><Message>{}</Message></Error>
  <RequestId>00000000-0000-0000-0000-000000000000</RequestId>
</ErrorResponse>"#,
        code, message
    )
}

const CHANGE_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ChangeResourceRecordSetsResponse xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
  <ChangeInfo>
    <Id>/change/C2682N5HXP0BZ4</Id>
    <Status>PENDING</Status>
    <SubmittedAt>2017-03-10T01:36:41.958Z</SubmittedAt>
  </ChangeInfo>
</ChangeResourceRecordSetsResponse>"#;

fn target(values: &[&str]) -> RecordSet {
    RecordSet::new(
        "all.example.com.",
        RecordType::A,
        Some(60),
        values.iter().map(|v| v.to_string()).collect(),
    )
}

#[tokio::test]
async fn fetch_sends_one_signed_filtered_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RRSET_PATH))
        .and(query_param("name", "all.example.com."))
        .and(query_param("type", "A"))
        .and(query_param("maxitems", "1"))
        .and(header_exists("authorization"))
        .and(header_exists("x-amz-date"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(list_body("all.example.com.", "A", &["10.0.0.1", "10.0.0.2"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let set = store(&server, false)
        .fetch_record_set(ZONE, "all.example.com", RecordType::A)
        .await
        .expect("record set exists");

    assert_eq!(set.name, "all.example.com.");
    assert_eq!(set.ttl, Some(60));
    assert_eq!(set.values, vec!["10.0.0.1", "10.0.0.2"]);

    let requests = server.received_requests().await.unwrap();
    let authorization = requests[0]
        .headers
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
    assert!(authorization.contains("/us-east-1/route53/aws4_request"));
    assert!(authorization.contains("SignedHeaders=host;x-amz-date,"));
}

#[tokio::test]
async fn fetch_of_neighbouring_record_set_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RRSET_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(list_body("b.example.com.", "A", &["10.0.0.9"])),
        )
        .mount(&server)
        .await;

    let err = store(&server, false)
        .fetch_record_set(ZONE, "all.example.com", RecordType::A)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn fetch_of_same_name_other_type_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RRSET_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(list_body("all.example.com.", "AAAA", &["fd00::1"])),
        )
        .mount(&server)
        .await;

    let err = store(&server, false)
        .fetch_record_set(ZONE, "all.example.com", RecordType::A)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn missing_hosted_zone_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RRSET_PATH))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_string(error_body("NoSuchHostedZone", "No hosted zone found with ID: Z0TESTZONE")),
        )
        .mount(&server)
        .await;

    let err = store(&server, false)
        .fetch_record_set(ZONE, "all.example.com", RecordType::A)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("NoSuchHostedZone"));
}

#[tokio::test]
async fn upsert_sends_one_full_replacement() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/", RRSET_PATH)))
        .and(header("content-type", "text/xml"))
        .and(header_exists("authorization"))
        .and(body_string_contains("<Action>UPSERT</Action>"))
        .and(body_string_contains(
            "<ResourceRecords><ResourceRecord><Value>10.0.0.1</Value></ResourceRecord>\
             <ResourceRecord><Value>10.0.0.2</Value></ResourceRecord></ResourceRecords>",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHANGE_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let result = store(&server, false)
        .upsert_record_set(ZONE, &target(&["10.0.0.1", "10.0.0.2"]))
        .await
        .expect("upsert accepted");

    assert_eq!(
        result,
        UpsertResult::Submitted {
            change_id: Some("C2682N5HXP0BZ4".to_string())
        }
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert_eq!(body.matches("<Change>").count(), 1);
}

#[tokio::test]
async fn dry_run_fetches_but_never_changes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RRSET_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(list_body("all.example.com.", "A", &["10.0.0.1"])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHANGE_BODY))
        .expect(0)
        .mount(&server)
        .await;

    let store = store(&server, true);
    let current = store
        .fetch_record_set(ZONE, "all.example.com", RecordType::A)
        .await
        .unwrap();
    let result = store
        .upsert_record_set(ZONE, &current.with_values(vec!["10.0.0.2".to_string()]))
        .await
        .unwrap();

    assert_eq!(result, UpsertResult::DryRun);
}

#[tokio::test]
async fn session_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("x-amz-security-token", "session-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(list_body("all.example.com.", "A", &["10.0.0.1"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Route53RecordStore::new(
        credentials(Some("session-token")),
        "us-east-1",
        Some(&server.uri()),
        false,
    )
    .unwrap();

    assert!(store
        .fetch_record_set(ZONE, "all.example.com", RecordType::A)
        .await
        .is_ok());
}

#[tokio::test]
async fn error_statuses_map_to_error_kinds() {
    let cases = [
        (400u16, error_body("Throttling", "Rate exceeded"), "throttled"),
        (400, error_body("PriorRequestNotComplete", "in progress"), "throttled"),
        (403, error_body("SignatureDoesNotMatch", "bad signature"), "auth"),
        (503, "Service Unavailable".to_string(), "server"),
        (400, error_body("InvalidChangeBatch", "bad batch"), "other"),
    ];

    for (status, body, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;

        let err = store(&server, false)
            .upsert_record_set(ZONE, &target(&["10.0.0.1"]))
            .await
            .unwrap_err();

        // Every API failure is transient from the loop's point of view
        assert_eq!(err.kind(), ErrorKind::Provider, "status {}", status);
        let matched = match expected {
            "throttled" => matches!(err, Error::RateLimited(_)),
            "auth" => matches!(err, Error::Authentication(_)),
            "server" => err.to_string().contains("transient"),
            _ => matches!(err, Error::Provider { .. }),
        };
        assert!(matched, "status {} mapped to {:?}", status, err);
    }
}

/// Log sink shared between the subscriber and the test
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_info_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

#[tokio::test]
async fn live_upsert_logs_nothing_at_info() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHANGE_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server, false);
    let (logs, _guard) = capture_info_logs();
    store
        .upsert_record_set(ZONE, &target(&["10.0.0.1"]))
        .await
        .expect("upsert accepted");

    let logs = logs.contents();
    assert!(!logs.contains("Upserting"), "unexpected info output: {}", logs);
    assert!(!logs.contains("dnsagg_provider_route53"), "unexpected info output: {}", logs);
}

#[tokio::test]
async fn dry_run_upsert_still_announces_itself() {
    let server = MockServer::start().await;
    let store = store(&server, true);
    let (logs, _guard) = capture_info_logs();

    let result = store
        .upsert_record_set(ZONE, &target(&["10.0.0.1"]))
        .await
        .unwrap();

    assert_eq!(result, UpsertResult::DryRun);
    assert!(logs.contents().contains("[DRY-RUN]"));
}
