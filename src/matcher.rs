//! Matching a job's player vocabulary against transcript tokens.
//!
//! The vocabulary is compiled into a single case-insensitive, word-bounded
//! alternation, so each token costs one regex search however many names the
//! caller supplied.

use regex::Regex;
use std::collections::HashMap;
use std::future::Future;

use crate::error::TranscriptionError;
use crate::models::{NewMention, Player, format_offset, offset_ms_from_secs};
use crate::transcribe::{Transcript, WordToken};

/// Split a raw comma-separated name list into trimmed, non-empty names.
pub fn parse_player_names(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Job-scoped mapping from lowercased name to player, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    keys: Vec<String>,
    players: HashMap<String, Player>,
}

impl Vocabulary {
    /// Resolve every name in `csv` to a player via `resolve`, typically the
    /// store's get-or-create. Names differing only in case resolve once.
    pub async fn from_csv<F, Fut, E>(csv: &str, mut resolve: F) -> Result<Self, E>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<Player, E>>,
    {
        let mut vocabulary = Self::default();
        for name in parse_player_names(csv) {
            let key = name.to_lowercase();
            if vocabulary.players.contains_key(&key) {
                continue;
            }
            let player = resolve(name).await?;
            vocabulary.insert(key, player);
        }
        Ok(vocabulary)
    }

    /// Build directly from already-resolved players.
    pub fn from_players(players: impl IntoIterator<Item = Player>) -> Self {
        let mut vocabulary = Self::default();
        for player in players {
            let key = player.name.trim().to_lowercase();
            if key.is_empty() || vocabulary.players.contains_key(&key) {
                continue;
            }
            vocabulary.insert(key, player);
        }
        vocabulary
    }

    fn insert(&mut self, key: String, player: Player) {
        self.keys.push(key.clone());
        self.players.insert(key, player);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Player> {
        self.players.get(&name.to_lowercase())
    }
}

/// A compiled vocabulary matcher. Immutable once built.
#[derive(Debug, Clone)]
pub struct MentionMatcher {
    pattern: Option<Regex>,
    vocabulary: Vocabulary,
}

impl MentionMatcher {
    pub fn compile(vocabulary: Vocabulary) -> Result<Self, regex::Error> {
        let pattern = if vocabulary.is_empty() {
            None
        } else {
            let alternation = vocabulary
                .keys
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))?)
        };
        Ok(Self {
            pattern,
            vocabulary,
        })
    }

    /// The player mentioned by `token`, if any. Only the first match in the
    /// token counts.
    pub fn match_token(&self, token: &WordToken) -> Option<&Player> {
        let hit = self.pattern.as_ref()?.find(&token.text)?;
        let player = self.vocabulary.get(hit.as_str());
        if player.is_none() {
            tracing::warn!(token = %token.text, matched = %hit.as_str(), "[matcher] match has no vocabulary entry");
        }
        player
    }

    /// Consume `transcript` and collect one candidate mention per matching
    /// token, in transcript order. Offsets are clamped to `[0, duration]`.
    pub fn scan(
        &self,
        transcript: Transcript,
        video_id: i64,
        duration_secs: Option<f64>,
    ) -> Result<Vec<NewMention>, TranscriptionError> {
        let total = duration_secs
            .map(|d| format_offset(offset_ms_from_secs(d, None)))
            .unwrap_or_else(|| "?".to_string());
        let mut mentions = Vec::new();
        let mut last_logged_second = None;

        for segment in transcript {
            for token in segment?.words {
                let offset_ms = offset_ms_from_secs(token.start, duration_secs);
                let second = offset_ms / 1000;
                if last_logged_second != Some(second) {
                    tracing::debug!(video_id, at = %format_offset(offset_ms), total = %total, "[matcher] processing");
                    last_logged_second = Some(second);
                }

                if let Some(player) = self.match_token(&token) {
                    tracing::info!(
                        video_id,
                        at = %format_offset(offset_ms),
                        player = %player.name,
                        "[matcher] player matched"
                    );
                    mentions.push(NewMention {
                        video_id,
                        player_id: player.id,
                        offset_ms,
                    });
                }
            }
        }

        Ok(mentions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::Segment;

    fn player(id: i64, name: &str) -> Player {
        Player {
            id,
            name: name.to_string(),
        }
    }

    fn transcript(words: &[(&str, f64)]) -> Transcript {
        Transcript::from_segments(vec![Segment::from_words(
            words.iter().map(|(t, s)| WordToken::new(*t, *s)).collect(),
        )])
    }

    #[test]
    fn test_parse_player_names() {
        assert_eq!(
            parse_player_names(" Rossi, Bianchi ,,  De Luca ,"),
            vec!["Rossi", "Bianchi", "De Luca"]
        );
        assert!(parse_player_names("").is_empty());
        assert!(parse_player_names(" , ").is_empty());
    }

    #[tokio::test]
    async fn test_vocabulary_resolves_each_name_once() {
        let mut resolved = Vec::new();
        let vocabulary = Vocabulary::from_csv("Rossi, rossi, Bianchi", |name| {
            resolved.push(name.clone());
            let id = resolved.len() as i64;
            async move { Ok::<_, std::convert::Infallible>(player(id, &name)) }
        })
        .await
        .unwrap();

        assert_eq!(resolved, vec!["Rossi", "Bianchi"]);
        assert_eq!(vocabulary.len(), 2);
        assert_eq!(vocabulary.get("ROSSI").unwrap().name, "Rossi");
    }

    #[test]
    fn test_match_is_case_insensitive_and_word_bounded() {
        let matcher = MentionMatcher::compile(Vocabulary::from_players([
            player(1, "Rossi"),
            player(2, "Bianchi"),
        ]))
        .unwrap();

        assert_eq!(matcher.match_token(&WordToken::new(" rossi,", 0.0)).unwrap().id, 1);
        assert_eq!(matcher.match_token(&WordToken::new("BIANCHI!", 0.0)).unwrap().id, 2);
        assert!(matcher.match_token(&WordToken::new("Rossini", 0.0)).is_none());
        assert!(matcher.match_token(&WordToken::new("Bianchissimo", 0.0)).is_none());
    }

    #[test]
    fn test_names_are_matched_literally() {
        let matcher = MentionMatcher::compile(Vocabulary::from_players([
            player(1, "O.K"),
            player(2, "D'Amico"),
        ]))
        .unwrap();

        assert!(matcher.match_token(&WordToken::new("OXK", 0.0)).is_none());
        assert_eq!(matcher.match_token(&WordToken::new("o.k", 0.0)).unwrap().id, 1);
        assert_eq!(matcher.match_token(&WordToken::new("d'amico", 0.0)).unwrap().id, 2);
    }

    #[test]
    fn test_first_match_wins_within_a_token() {
        let matcher = MentionMatcher::compile(Vocabulary::from_players([
            player(1, "Rossi"),
            player(2, "Bianchi"),
        ]))
        .unwrap();

        let mentions = matcher
            .scan(transcript(&[("Bianchi-Rossi", 3.0)]), 9, None)
            .unwrap();
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].player_id, 2);
    }

    #[test]
    fn test_empty_vocabulary_matches_nothing() {
        let matcher = MentionMatcher::compile(Vocabulary::default()).unwrap();
        let mentions = matcher
            .scan(transcript(&[("Rossi", 1.0), ("", 2.0)]), 1, Some(10.0))
            .unwrap();
        assert!(mentions.is_empty());
    }

    #[test]
    fn test_scan_is_deterministic_and_ordered() {
        let vocabulary = Vocabulary::from_players([player(1, "Rossi"), player(2, "Bianchi")]);
        let words = [
            ("Rossi", 12.4),
            ("passa", 13.0),
            ("a", 13.5),
            ("bianchi", 60.0),
            ("ROSSI", 61.2),
        ];

        let first = MentionMatcher::compile(vocabulary.clone())
            .unwrap()
            .scan(transcript(&words), 5, Some(125.0))
            .unwrap();
        let second = MentionMatcher::compile(vocabulary)
            .unwrap()
            .scan(transcript(&words), 5, Some(125.0))
            .unwrap();

        assert_eq!(first, second);
        let got: Vec<(i64, i64)> = first.iter().map(|m| (m.player_id, m.offset_ms)).collect();
        assert_eq!(got, vec![(1, 12_400), (2, 60_000), (1, 61_200)]);
    }

    #[test]
    fn test_matched_player_name_equals_token_modulo_case() {
        let players = [player(1, "Rossi"), player(2, "Bianchi"), player(3, "Verdi")];
        let matcher = MentionMatcher::compile(Vocabulary::from_players(players.clone())).unwrap();
        let tokens = ["rossi", "Verdi.", "BIANCHI", "verde", "Rossi's"];

        for text in tokens {
            let token = WordToken::new(text, 0.0);
            if let Some(p) = matcher.match_token(&token) {
                let word: String = text.chars().filter(|c| c.is_alphanumeric()).collect();
                assert!(
                    word.to_lowercase().starts_with(&p.name.to_lowercase()),
                    "{} matched {}",
                    text,
                    p.name
                );
            }
        }
        assert!(matcher.match_token(&WordToken::new("verde", 0.0)).is_none());
    }

    #[test]
    fn test_scan_clamps_offsets_to_duration() {
        let matcher = MentionMatcher::compile(Vocabulary::from_players([player(1, "Rossi")])).unwrap();
        let mentions = matcher
            .scan(transcript(&[("Rossi", -0.3), ("Rossi", 130.0)]), 1, Some(125.0))
            .unwrap();
        let offsets: Vec<i64> = mentions.iter().map(|m| m.offset_ms).collect();
        assert_eq!(offsets, vec![0, 125_000]);
    }

    #[test]
    fn test_scan_propagates_transcript_errors() {
        let matcher = MentionMatcher::compile(Vocabulary::from_players([player(1, "Rossi")])).unwrap();
        let failing = Transcript::new(
            vec![
                Ok(Segment::from_words(vec![WordToken::new("Rossi", 1.0)])),
                Err(TranscriptionError::Inference {
                    message: "corrupt frame".into(),
                }),
            ]
            .into_iter(),
        );
        assert!(matches!(
            matcher.scan(failing, 1, None),
            Err(TranscriptionError::Inference { .. })
        ));
    }
}
