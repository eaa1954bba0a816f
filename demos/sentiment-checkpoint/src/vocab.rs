use std::collections::HashMap;

/// Token the vocabulary maps every unknown word to.
pub const UNKNOWN: &str = "<unk>";

/// Bidirectional mapping between words and the row they own in the embedding table.
///
/// Id 0 is always [UNKNOWN].
#[derive(Debug, Clone)]
pub struct Vocabulary {
    words: Vec<String>,
    ids: HashMap<String, usize>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let mut vocab = Self {
            words: Vec::new(),
            ids: HashMap::new(),
        };
        vocab.insert(UNKNOWN);
        vocab
    }
}

impl Vocabulary {
    /// Build a vocabulary from whitespace separated text, keeping the `max_size` most frequent
    /// words (ties broken by first occurrence), unknown token included.
    pub fn from_corpus<'a>(lines: impl IntoIterator<Item = &'a str>, max_size: usize) -> Self {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for word in lines.into_iter().flat_map(str::split_whitespace) {
            match positions.get(word) {
                Some(&position) => counts[position].1 += 1,
                None => {
                    positions.insert(word, counts.len());
                    counts.push((word, 1));
                }
            }
        }
        // Stable sort keeps first occurrences first among ties.
        counts.sort_by(|a, b| b.1.cmp(&a.1));

        let mut vocab = Self::default();
        for (word, _) in counts.into_iter() {
            if vocab.len() >= max_size {
                break;
            }
            vocab.insert(word);
        }

        vocab
    }

    /// Id of `word`, inserting it when missing.
    pub fn insert(&mut self, word: &str) -> usize {
        if let Some(&id) = self.ids.get(word) {
            return id;
        }

        let id = self.words.len();
        self.words.push(word.to_string());
        self.ids.insert(word.to_string(), id);
        id
    }

    /// Id of `word`, or the id of [UNKNOWN].
    pub fn id(&self, word: &str) -> usize {
        self.ids.get(word).copied().unwrap_or(0)
    }

    pub fn word(&self, id: usize) -> Option<&str> {
        self.words.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_keep_most_frequent_words() {
        let vocab = Vocabulary::from_corpus(["a b c b", "c b d"], 3);

        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.word(0), Some(UNKNOWN));
        assert_eq!(vocab.word(1), Some("b"));
        assert_eq!(vocab.word(2), Some("c"));
        assert_eq!(vocab.id("d"), 0);
    }

    #[test]
    fn should_not_duplicate_words() {
        let mut vocab = Vocabulary::default();

        let first = vocab.insert("good");
        let second = vocab.insert("good");

        assert_eq!(first, second);
        assert_eq!(vocab.len(), 2);
    }
}
