use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mapping from a raw speaker name to a canonical character.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterAlias {
    /// Always the same character.
    Direct(String),
    /// The player switched characters mid-campaign.
    TimeGated {
        characters: [String; 2],
        cutoff_episode: u32,
    },
}

/// Resolves raw speaker names to canonical character names, with
/// time-gated aliasing for players who switched characters.
#[derive(Debug, Clone)]
pub struct CharacterResolver {
    aliases: HashMap<String, CharacterAlias>,
}

impl Default for CharacterResolver {
    /// The campaign 2 cast mapping of the reference deployment.
    fn default() -> Self {
        let mut aliases = HashMap::new();
        let direct = [
            ("travis", "fjord"),
            ("marisha", "beau"),
            ("laura", "jester"),
            ("ashley", "yasha"),
            ("liam", "caleb"),
        ];
        for (speaker, character) in direct {
            aliases.insert(
                speaker.to_string(),
                CharacterAlias::Direct(character.to_string()),
            );
        }
        aliases.insert(
            "taliesin".to_string(),
            CharacterAlias::TimeGated {
                characters: ["mollymauk".to_string(), "caduceus".to_string()],
                cutoff_episode: 26,
            },
        );
        aliases.insert(
            "sam".to_string(),
            CharacterAlias::TimeGated {
                characters: ["nott".to_string(), "veth".to_string()],
                cutoff_episode: 97,
            },
        );
        Self { aliases }
    }
}

impl CharacterResolver {
    pub fn new(aliases: HashMap<String, CharacterAlias>) -> Self {
        Self { aliases }
    }

    /// Canonicalize a raw speaker name for the given episode.
    ///
    /// Pure: same inputs always yield the same output. Lookup is
    /// case-insensitive; names without an alias pass through unchanged so
    /// already-canonical character names can be fed back in.
    ///
    /// For time-gated aliases, `cutoff < episode_number` selects the
    /// first listed character, everything else (the cutoff episode
    /// included) selects the second. That inclusive boundary is how the
    /// dataset was labeled; keep the inequality exactly as is.
    pub fn resolve(&self, episode_number: u32, raw: &str) -> String {
        match self.aliases.get(&raw.to_lowercase()) {
            None => raw.to_string(),
            Some(CharacterAlias::Direct(name)) => name.clone(),
            Some(CharacterAlias::TimeGated {
                characters,
                cutoff_episode,
            }) => {
                if *cutoff_episode < episode_number {
                    characters[0].clone()
                } else {
                    characters[1].clone()
                }
            }
        }
    }
}
