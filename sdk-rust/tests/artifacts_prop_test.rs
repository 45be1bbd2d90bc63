use chat_relay_sdk::{extract_artifacts, ArtifactKind, ArtifactScanner};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Segment {
    Text(String),
    Block { language: String, body: String },
}

fn segment_strategy() -> impl Strategy<Value = Segment> {
    prop_oneof![
        "[a-z .\n]{0,12}".prop_map(Segment::Text),
        ("[a-z0-9_]{0,4}", "[a-z =()\n]{0,12}")
            .prop_map(|(language, body)| Segment::Block { language, body }),
    ]
}

fn render(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Text(text) => text.clone(),
            Segment::Block { language, body } => format!("```{language}\n{body}```"),
        })
        .collect()
}

/// The source text with every fenced block replaced by its body.
fn unfenced(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Text(text) => text.clone(),
            Segment::Block { body, .. } => format!(" {body} "),
        })
        .collect()
}

// Splits `text` at the given byte offsets. Only used with ASCII input, so any
// offset is a char boundary.
fn split_at_cuts(text: &str, mut cuts: Vec<usize>) -> Vec<&str> {
    cuts.push(0);
    cuts.push(text.len());
    cuts.sort_unstable();
    cuts.dedup();

    cuts.windows(2)
        .map(|window| &text[window[0]..window[1]])
        .collect()
}

fn text_and_cuts_strategy() -> impl Strategy<Value = (String, Vec<usize>)> {
    "[a-z `\n_]{0,60}".prop_flat_map(|text| {
        let len = text.len();
        (Just(text), proptest::collection::vec(0..=len, 0..12))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn artifacts_reconstruct_the_source(
        segments in proptest::collection::vec(segment_strategy(), 0..8)
    ) {
        let text = render(&segments);
        let artifacts = extract_artifacts(&text);

        let blocks = segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Block { language, .. } => Some(language.as_str()),
                Segment::Text(_) => None,
            })
            .collect::<Vec<_>>();

        if blocks.is_empty() {
            prop_assert!(artifacts.is_empty());
            return Ok(());
        }

        let languages = artifacts
            .iter()
            .filter(|artifact| artifact.kind == ArtifactKind::Code)
            .map(|artifact| artifact.language().unwrap_or_default())
            .collect::<Vec<_>>();
        let expected_languages = blocks
            .iter()
            .map(|language| if language.is_empty() { "plaintext" } else { *language })
            .collect::<Vec<_>>();
        prop_assert_eq!(languages, expected_languages);

        let joined = artifacts
            .iter()
            .map(|artifact| artifact.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let expected = unfenced(&segments);
        prop_assert_eq!(
            joined.split_whitespace().collect::<Vec<_>>(),
            expected.split_whitespace().collect::<Vec<_>>()
        );
    }

    #[test]
    fn extraction_is_idempotent(text in "[a-z `\n_]{0,60}") {
        prop_assert_eq!(extract_artifacts(&text), extract_artifacts(&text));
    }

    #[test]
    fn incremental_scan_matches_full_scan((text, cuts) in text_and_cuts_strategy()) {
        let mut scanner = ArtifactScanner::new();
        let mut end = 0;

        for piece in split_at_cuts(&text, cuts) {
            end += piece.len();
            prop_assert_eq!(scanner.push(piece), extract_artifacts(&text[..end]));
        }
        prop_assert_eq!(scanner.text(), text.as_str());
    }
}
