use chat_relay_sdk::{
    openai::{OpenAIChatProvider, OpenAIChatProviderOptions},
    ArtifactScanner, ChatMessage, ChatProvider, StreamDelta,
};
use dotenvy::dotenv;
use futures::stream::StreamExt;

#[tokio::main]
async fn main() {
    dotenv().ok();

    let provider = OpenAIChatProvider::new(
        "gpt-4o-mini",
        OpenAIChatProviderOptions {
            api_key: std::env::var("OPENAI_API_KEY")
                .expect("OPENAI_API_KEY environment variable must be set"),
            ..Default::default()
        },
    );

    let mut stream = provider
        .stream(vec![ChatMessage::user(
            "Write a Python function that reverses a string.",
        )])
        .await
        .unwrap();

    let mut scanner = ArtifactScanner::new();

    while let Some(delta) = stream.next().await {
        match delta.unwrap() {
            StreamDelta::Text(text) => {
                let artifacts = scanner.push(&text);
                println!("{text:?} -> {} artifact(s)", artifacts.len());
            }
            StreamDelta::End => break,
        }
    }

    println!("Final artifacts: {:#?}", scanner.artifacts());
}
