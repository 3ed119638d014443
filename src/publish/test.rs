use super::*;
use std::collections::VecDeque;
use std::fmt;

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum MockErr {
    Timeout,
    WrongType,
}

impl fmt::Display for MockErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
impl std::error::Error for MockErr {}
impl Retryable for MockErr {
    fn is_transient(&self) -> bool {
        *self == MockErr::Timeout
    }
}

/// Records every successful push; fails with the queued errors first.
#[derive(Debug, Default)]
struct MockClient {
    failures: VecDeque<MockErr>,
    pushes: Vec<(String, Vec<Vec<u8>>)>,
    reconnects: usize,
    unwritable_key: Option<String>,
}

impl MockClient {
    fn failing_with(failures: &[MockErr]) -> Self {
        Self {
            failures: failures.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl QueueClient for MockClient {
    type Error = MockErr;

    fn push(&mut self, key: &str, entries: &[Vec<u8>]) -> Result<i64, MockErr> {
        if let Some(e) = self.failures.pop_front() {
            return Err(e);
        }
        if self.unwritable_key.as_deref() == Some(key) {
            return Err(MockErr::Timeout);
        }
        self.pushes.push((key.to_string(), entries.to_vec()));
        Ok(self.pushes.len() as i64)
    }

    fn reconnect(&mut self) -> Result<(), MockErr> {
        self.reconnects += 1;
        Ok(())
    }
}

fn publisher(client: MockClient) -> RetryingPublisher<MockClient> {
    RetryingPublisher::new(client, "data").with_retries(
        3,
        Duration::from_millis(1),
        Duration::from_millis(2),
    )
}

fn batch(records: &[&str]) -> Batch {
    Batch::new(records.iter().map(|r| Record::from(*r)).collect()).expect("non-empty")
}

#[test]
fn transient_failure_then_success_pushes_once() -> TestResult {
    let mut publisher = publisher(MockClient::failing_with(&[MockErr::Timeout]));

    let ack = publisher.publish(&batch(&["a", "b"]))?;

    assert_eq!(ack, Ack { entries: 2, list_len: 1 });
    assert_eq!(publisher.client().pushes.len(), 1);
    assert_eq!(publisher.client().reconnects, 1);
    Ok(())
}

#[test]
fn permanent_failure_is_not_retried() {
    let mut publisher = publisher(MockClient::failing_with(&[MockErr::WrongType]));

    let err = publisher.publish(&batch(&["a"])).unwrap_err();

    assert_eq!(err, PublishErr::Rejected("WrongType".to_string()));
    assert!(publisher.client().pushes.is_empty());
    assert_eq!(publisher.client().reconnects, 0);
}

#[test]
fn retries_are_bounded() -> TestResult {
    let mut publisher = publisher(MockClient::failing_with(&[MockErr::Timeout; 4]));
    let records = batch(&["kept"]);

    match publisher.publish(&records) {
        Err(PublishErr::Exhausted { attempts, .. }) => assert_eq!(attempts, 4),
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert!(publisher.client().pushes.is_empty());

    // the caller still owns the batch and can try again once the queue recovers
    publisher.publish(&records)?;
    assert_eq!(publisher.client().pushes.len(), 1);
    Ok(())
}

#[test]
fn backoff_doubles_up_to_the_cap() {
    let publisher = RetryingPublisher::new(MockClient::default(), "data").with_retries(
        10,
        Duration::from_millis(100),
        Duration::from_millis(500),
    );
    let delays: Vec<_> = (0..5).map(|attempt| publisher.backoff(attempt)).collect();
    assert_eq!(
        delays,
        [100, 200, 400, 500, 500]
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect::<Vec<_>>()
    );
    assert_eq!(publisher.backoff(u32::MAX), Duration::from_millis(500));
}

#[test]
fn notify_key_gets_one_entry_per_batch() -> TestResult {
    let mut publisher = publisher(MockClient::default()).with_notify_key("notify");

    publisher.publish(&batch(&["a", "b", "c"]))?;

    let pushes = &publisher.client().pushes;
    assert_eq!(pushes.len(), 2);
    assert_eq!(pushes[0].0, "data");
    assert_eq!(pushes[1], ("notify".to_string(), vec![b"1".to_vec()]));
    Ok(())
}

#[test]
fn notify_failure_does_not_fail_the_batch() -> TestResult {
    let client = MockClient {
        unwritable_key: Some("notify".to_string()),
        ..MockClient::default()
    };
    let mut publisher = publisher(client).with_notify_key("notify");

    let ack = publisher.publish(&batch(&["a"]))?;

    assert_eq!(ack.list_len, 1);
    assert_eq!(publisher.client().pushes.len(), 1);
    Ok(())
}

#[test]
fn per_record_format_writes_one_entry_per_record() {
    let entries = PayloadFormat::PerRecord.encode(&batch(&["{\"id\":1}", "{\"id\":2}"]));
    assert_eq!(entries, vec![b"{\"id\":1}".to_vec(), b"{\"id\":2}".to_vec()]);
}

#[test]
fn newline_format_joins_records() {
    let entries = PayloadFormat::Newline.encode(&batch(&["a", "b", "c"]));
    assert_eq!(entries, vec![b"a\nb\nc".to_vec()]);
}

#[test]
fn json_array_format_embeds_records_verbatim() {
    let entries = PayloadFormat::JsonArray.encode(&batch(&[
        r#"{"z":1,"a":[1.50,2]}"#,
        "not json",
    ]));
    assert_eq!(
        String::from_utf8_lossy(&entries[0]),
        r#"[{"z":1,"a":[1.50,2]},"not json"]"#
    );
}
