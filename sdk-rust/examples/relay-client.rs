use chat_relay_sdk::{ChatSession, RelayClient, RelayClientOptions, SearchSource};

/// Talks to a running `chat-relay-server` (default `http://localhost:4000`).
#[tokio::main]
async fn main() {
    let client = RelayClient::new(RelayClientOptions {
        base_url: std::env::var("RELAY_URL").ok(),
        ..Default::default()
    });
    let vendor = std::env::var("RELAY_VENDOR").unwrap_or_else(|_| "openai".to_string());

    let mut session = ChatSession::new();

    for prompt in ["Show me a hello world in Rust.", "Now the same in Go."] {
        client
            .send_message(&mut session, &vendor, prompt, |record| {
                println!(
                    "[{} chars, {} artifacts]",
                    record.content.len(),
                    record.artifacts.len()
                );
            })
            .await
            .unwrap();
    }

    for message in session.messages() {
        println!("{:?}: {}", message.role, message.content);
    }

    let results = client
        .search("rust async streams", SearchSource::All)
        .await
        .unwrap();
    println!("{} search result(s)", results.len());
}
