//! The fixed grammatical-category vocabulary.

/// Fallback category for absent or unrecognized keys.
pub const DEFAULT_KEY: &str = "noun";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartOfSpeech {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

// from http://en.wikipedia.org/wiki/Parts_of_speech
pub const PARTS_OF_SPEECH: [PartOfSpeech; 9] = [
    PartOfSpeech {
        key: "noun",
        name: "Noun",
        description: "Any abstract or concrete entity; a person (police officer, Michael), place (coastline, London), thing (necktie, television), idea (happiness), or quality (bravery)",
    },
    PartOfSpeech {
        key: "pronoun",
        name: "Pronoun",
        description: "Any substitute for a noun or noun phrase",
    },
    PartOfSpeech {
        key: "adjective",
        name: "Adjective",
        description: "Any qualifier of a noun",
    },
    PartOfSpeech {
        key: "verb",
        name: "Verb",
        description: "Any action (walk), occurrence (happen), or state of being (be)",
    },
    PartOfSpeech {
        key: "adverb",
        name: "Adverb",
        description: "Any qualifier of an adjective, verb, clause, sentence, or other adverb",
    },
    PartOfSpeech {
        key: "preposition",
        name: "Preposition",
        description: "Any establisher of relation and syntactic context",
    },
    PartOfSpeech {
        key: "conjunction",
        name: "Conjunction",
        description: "Any syntactic connector",
    },
    PartOfSpeech {
        key: "interjection",
        name: "Interjection",
        description: "Any emotional greeting (or \"exclamation\")",
    },
    PartOfSpeech {
        key: "article",
        name: "Article",
        description: "Indicates the type of reference being made by the noun",
    },
];

pub fn lookup(key: &str) -> Option<&'static PartOfSpeech> {
    PARTS_OF_SPEECH.iter().find(|part| part.key == key)
}

pub fn is_registered(key: &str) -> bool {
    lookup(key).is_some()
}
