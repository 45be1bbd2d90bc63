use bytes::Bytes;
use chat_relay_sdk::{
    consume_event_stream, extract_artifacts, ArtifactKind, ChatSession, ClientError, Role,
    StreamEvent,
};
use futures::stream;
use tokio::test;

fn line(event: &StreamEvent) -> String {
    let mut json = serde_json::to_string(event).unwrap();
    json.push('\n');
    json
}

fn chunk(delta: &str, complete: &str) -> StreamEvent {
    StreamEvent::Chunk {
        content: delta.to_string(),
        complete_message: complete.to_string(),
        artifacts: extract_artifacts(complete),
    }
}

fn done(complete: &str) -> StreamEvent {
    StreamEvent::Done {
        complete_message: complete.to_string(),
        artifacts: extract_artifacts(complete),
    }
}

fn body(parts: Vec<String>) -> impl futures::Stream<Item = Result<Bytes, ClientError>> {
    stream::iter(parts.into_iter().map(|part| Ok(Bytes::from(part))))
}

#[test]
async fn completed_stream_keeps_assistant_message() {
    let mut session = ChatSession::new();
    session.begin_turn("write code").unwrap();

    let wire = [
        line(&chunk("Sure ", "Sure ")),
        line(&chunk("```py\nx=1\n```", "Sure ```py\nx=1\n```")),
        line(&done("Sure ```py\nx=1\n```")),
    ]
    .concat();

    let mut updates = Vec::new();
    consume_event_stream(&mut session, body(vec![wire]), |record| {
        updates.push(record.content.clone());
    })
    .await
    .unwrap();

    assert_eq!(updates, vec!["Sure ", "Sure ```py\nx=1\n```", "Sure ```py\nx=1\n```"]);
    assert!(!session.is_in_flight());

    let assistant = &session.messages()[1];
    assert_eq!(assistant.role, Role::Assistant);
    assert_eq!(assistant.artifacts.len(), 2);
    assert_eq!(assistant.artifacts[1].kind, ArtifactKind::Code);
    assert_eq!(assistant.artifacts[1].language(), Some("py"));
}

#[test]
async fn lines_split_across_reads_are_reassembled() {
    let mut session = ChatSession::new();
    session.begin_turn("hi").unwrap();

    let wire = [line(&chunk("héllo", "héllo")), line(&done("héllo"))].concat();
    let bytes = wire.into_bytes();
    let parts = bytes
        .chunks(3)
        .map(|part| Ok::<_, ClientError>(Bytes::copy_from_slice(part)))
        .collect::<Vec<_>>();

    let mut update_count = 0;
    consume_event_stream(&mut session, stream::iter(parts), |_| update_count += 1)
        .await
        .unwrap();

    assert_eq!(update_count, 2);
    assert_eq!(session.messages()[1].content, "héllo");
}

#[test]
async fn malformed_line_is_skipped() {
    let mut session = ChatSession::new();
    session.begin_turn("hi").unwrap();

    let parts = vec![
        line(&chunk("a", "a")),
        "{not json at all\n".to_string(),
        line(&chunk("b", "ab")),
        line(&done("ab")),
    ];

    let mut seen = Vec::new();
    consume_event_stream(&mut session, body(parts), |record| {
        seen.push(record.content.clone());
    })
    .await
    .unwrap();

    assert_eq!(seen, vec!["a", "ab", "ab"]);
    assert_eq!(session.messages()[1].content, "ab");
}

#[test]
async fn line_with_invalid_utf8_is_skipped() {
    let mut session = ChatSession::new();
    session.begin_turn("hi").unwrap();

    let mut corrupt = br#"{"type":"chunk","content":"b","completeMessage":"a"#.to_vec();
    corrupt.push(0xFF);
    corrupt.extend_from_slice(b"\",\"artifacts\":[]}\n");

    let parts = vec![
        Ok::<_, ClientError>(Bytes::from(line(&chunk("a", "a")))),
        Ok(Bytes::from(corrupt)),
        Ok(Bytes::from(line(&done("ok")))),
    ];

    let mut seen = Vec::new();
    consume_event_stream(&mut session, stream::iter(parts), |record| {
        seen.push(record.content.clone());
    })
    .await
    .unwrap();

    assert_eq!(seen, vec!["a", "ok"]);
    assert_eq!(session.messages()[1].content, "ok");
}

#[test]
async fn stream_without_done_fails_the_turn() {
    let mut session = ChatSession::new();
    session.begin_turn("hi").unwrap();

    let parts = vec![line(&chunk("par", "par")), line(&chunk("tial", "partial"))];
    let result = consume_event_stream(&mut session, body(parts), |_| {}).await;

    assert!(matches!(result, Err(ClientError::Interrupted)));
    assert!(!session.is_in_flight());
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].role, Role::User);
}

#[test]
async fn transport_error_fails_the_turn() {
    let mut session = ChatSession::new();
    session.begin_turn("hi").unwrap();

    let parts = vec![
        Ok(Bytes::from(line(&chunk("par", "par")))),
        Err(ClientError::Interrupted),
    ];
    let result = consume_event_stream(&mut session, stream::iter(parts), |_| {}).await;

    assert!(result.is_err());
    assert!(!session.is_in_flight());
    assert_eq!(session.messages().len(), 1);
}

#[test]
async fn done_without_trailing_newline_is_accepted() {
    let mut session = ChatSession::new();
    session.begin_turn("hi").unwrap();

    let mut wire = [line(&chunk("ok", "ok")), line(&done("ok"))].concat();
    wire.pop();

    consume_event_stream(&mut session, body(vec![wire]), |_| {})
        .await
        .unwrap();
    assert_eq!(session.messages()[1].content, "ok");
}
